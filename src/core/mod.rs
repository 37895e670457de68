pub mod filename;
pub mod notification;
pub mod player;
pub mod session;
pub mod stream_url;
