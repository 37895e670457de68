//! The client controller: search, download, playback and notifications.
//!
//! The controller never touches the network or the audio device. Operations
//! that need either return a request value; the front-end runs it and feeds
//! the outcome back together with the ticket it was issued under. Outcomes
//! carrying an outdated ticket are dropped, so a slow response can never
//! overwrite the result of a newer request.

use std::time::Duration;

use crate::api::ApiError;
use crate::audio::PlaybackRejected;
use crate::config::Config;
use crate::core::filename;
use crate::core::notification::Notifier;
use crate::core::player::{PlaybackState, Player};
use crate::core::session::{Session, Ticket};
use crate::core::stream_url::{Endpoints, StreamMode};
use crate::downloader::DownloadJob;
use crate::models::{SearchRequest, SearchResult, Track};

pub const MSG_BAD_LIMIT: &str = "Limit must be a positive number";
pub const MSG_DOWNLOAD_STARTED: &str = "Download started via stream!";
pub const MSG_DOWNLOAD_FAILED: &str = "Error triggering download";
pub const MSG_PREPARING: &str = "Your song is getting ready... 🥳";
pub const MSG_PLAYING: &str = "Playing now!";
pub const MSG_CLICK_PLAY: &str = "Click play to start";
pub const MSG_STREAM_FAILED: &str = "Error connecting to stream";

/// What a card's button does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardAction {
    Play(usize),
    Download { url: String, title: String },
}

/// One rendered search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackCard {
    pub index: usize,
    pub title: String,
    pub source_url: String,
    pub thumbnail: Option<String>,
    pub play: CardAction,
    pub download: CardAction,
}

impl TrackCard {
    fn new(index: usize, track: &Track) -> Self {
        Self {
            index,
            title: track.title.clone(),
            source_url: track.url.clone(),
            thumbnail: track.thumbnail.clone(),
            play: CardAction::Play(index),
            download: CardAction::Download {
                url: track.url.clone(),
                title: track.title.clone(),
            },
        }
    }
}

/// Everything a front-end renders, apart from the notification.
#[derive(Debug, Clone, Default)]
pub struct View {
    pub loading: bool,
    pub results_visible: bool,
    pub header: String,
    pub cards: Vec<TrackCard>,
    pub player_visible: bool,
    pub player_title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSearch {
    pub ticket: Ticket,
    pub request: SearchRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayRequest {
    pub ticket: Ticket,
    pub index: usize,
    pub title: String,
    /// Absolute streaming URL with `mode=play`.
    pub url: String,
}

/// Work a card action hands back to the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Play(PlayRequest),
    Download(DownloadJob),
    Nothing,
}

pub struct Controller {
    endpoints: Endpoints,
    default_limit: u32,
    session: Session,
    player: Player,
    notifier: Notifier,
    view: View,
}

impl Controller {
    pub fn new(endpoints: Endpoints, default_limit: u32, notification_duration: Duration) -> Self {
        Self {
            endpoints,
            default_limit,
            session: Session::new(),
            player: Player::new(),
            notifier: Notifier::new(notification_duration),
            view: View::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Endpoints::new(config.server.base_url.clone()),
            config.search.default_limit,
            config.notification.duration(),
        )
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn playback(&self) -> PlaybackState {
        self.player.state()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    #[cfg(feature = "gui")]
    pub fn notifier_mut(&mut self) -> &mut Notifier {
        &mut self.notifier
    }

    #[cfg(feature = "gui")]
    pub fn is_latest_play(&self, ticket: Ticket) -> bool {
        self.player.is_latest(ticket)
    }

    /// Starts a search. Blank song names are ignored without any feedback.
    /// A blank limit means the configured default.
    pub fn submit_search(&mut self, song_name: &str, limit: &str) -> Option<PendingSearch> {
        let song_name = song_name.trim();
        if song_name.is_empty() {
            return None;
        }

        let limit = match parse_limit(limit, self.default_limit) {
            Some(limit) => limit,
            None => {
                self.notifier.error(MSG_BAD_LIMIT);
                return None;
            }
        };

        self.view.results_visible = false;
        self.view.loading = true;
        self.view.cards.clear();

        let ticket = self.session.begin_search();
        log::info!("searching {:?} (limit {}, ticket {})", song_name, limit, ticket);
        Some(PendingSearch {
            ticket,
            request: SearchRequest {
                song_name: song_name.to_string(),
                limit,
            },
        })
    }

    /// Applies a search outcome. Returns false if a newer search superseded it.
    pub fn complete_search(&mut self, ticket: Ticket, result: Result<SearchResult, ApiError>) -> bool {
        if !self.session.is_latest_search(ticket) {
            log::debug!("dropping stale search response (ticket {})", ticket);
            return false;
        }

        self.view.loading = false;
        match result {
            Ok(result) => {
                self.view.results_visible = true;
                self.view.header = format!("Mix based on \"{}\"", result.root_song.title);
                self.view.cards = result
                    .tracks
                    .iter()
                    .enumerate()
                    .map(|(i, t)| TrackCard::new(i, t))
                    .collect();
                log::info!(
                    "search returned {} tracks (seed {:?})",
                    result.tracks.len(),
                    result.root_song.id
                );
                self.session.replace_tracks(result.tracks);
            }
            Err(e) => {
                log::error!("search failed: {}", e);
                self.notifier.error(e.user_message());
            }
        }
        true
    }

    /// Dispatches a card button.
    pub fn activate(&mut self, action: &CardAction) -> Effect {
        match action {
            CardAction::Play(index) => self.play(*index).map_or(Effect::Nothing, Effect::Play),
            CardAction::Download { url, title } => self
                .download(url, title)
                .map_or(Effect::Nothing, Effect::Download),
        }
    }

    /// Prepares a download of `url`. Only the start is ever reported: there is
    /// no completion signal from the download itself.
    pub fn download(&mut self, url: &str, title: &str) -> Option<DownloadJob> {
        self.notifier.info(format!("Download starting for: {}...", title));

        match self.endpoints.stream(url, title, StreamMode::Download) {
            Ok(stream_url) => {
                self.notifier.info(MSG_DOWNLOAD_STARTED);
                Some(DownloadJob {
                    url: stream_url.to_string(),
                    title: title.to_string(),
                    filename: filename::download_filename(title),
                })
            }
            Err(e) => {
                log::error!("could not build download URL: {}", e);
                self.notifier.error(MSG_DOWNLOAD_FAILED);
                None
            }
        }
    }

    /// Selects track `index` and issues a play request. Out-of-range indices
    /// change nothing.
    pub fn play(&mut self, index: usize) -> Option<PlayRequest> {
        let track = self.session.track(index)?.clone();

        let url = match self.endpoints.stream(&track.url, &track.title, StreamMode::Play) {
            Ok(url) => url,
            Err(e) => {
                log::error!("could not build stream URL: {}", e);
                self.notifier.error(MSG_STREAM_FAILED);
                return None;
            }
        };

        self.session.select(index);
        let ticket = self.player.load();
        self.view.player_visible = true;
        self.view.player_title = track.title.clone();
        self.notifier.persist(MSG_PREPARING);

        log::info!("playing #{} {:?} (ticket {})", index, track.title, ticket);
        Some(PlayRequest {
            ticket,
            index,
            title: track.title,
            url: url.to_string(),
        })
    }

    /// Applies the outcome of starting the output. A rejection is not an
    /// error: the player waits for a manual start.
    pub fn play_started(&mut self, ticket: Ticket, result: Result<(), PlaybackRejected>) -> bool {
        if !self.player.started(ticket, result.is_ok()) {
            log::debug!("dropping stale playback outcome (ticket {})", ticket);
            return false;
        }
        match result {
            Ok(()) => self.notifier.info(MSG_PLAYING),
            Err(e) => {
                log::warn!("playback did not start: {}", e);
                self.notifier.info(MSG_CLICK_PLAY);
            }
        }
        true
    }

    /// Natural end of the current track: moves on to the next one, or stops
    /// at the end of the list.
    pub fn on_ended(&mut self) -> Option<PlayRequest> {
        let next = self.session.next_index().and_then(|i| self.play(i));
        if next.is_none() {
            self.player.stop();
        }
        next
    }

    /// Manual start after a rejection.
    pub fn resume(&mut self) -> Option<PlayRequest> {
        if self.player.state() != PlaybackState::Blocked {
            return None;
        }
        let index = self.session.current()?;
        self.play(index)
    }

    pub fn stop(&mut self) {
        self.player.stop();
    }
}

fn parse_limit(text: &str, default: u32) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() {
        return Some(default);
    }
    text.parse::<u32>().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::notification::NotificationKind;
    use crate::models::RootSong;

    fn controller() -> Controller {
        Controller::new(
            Endpoints::new("http://localhost:5001"),
            50,
            Duration::from_millis(4000),
        )
    }

    fn result(root: &str, n: usize) -> SearchResult {
        SearchResult {
            root_song: RootSong {
                title: root.to_string(),
                id: None,
            },
            tracks: (0..n)
                .map(|i| Track {
                    title: format!("Song {}", i),
                    url: format!("https://www.youtube.com/watch?v=id{}", i),
                    thumbnail: (i % 2 == 0).then(|| format!("https://i.ytimg.com/vi/id{}/mqdefault.jpg", i)),
                })
                .collect(),
        }
    }

    fn with_tracks(n: usize) -> Controller {
        let mut c = controller();
        let pending = c.submit_search("Hello", "").unwrap();
        assert!(c.complete_search(pending.ticket, Ok(result("Hello", n))));
        c
    }

    fn message(c: &Controller) -> (String, NotificationKind) {
        let n = c.notifier().visible().expect("a visible notification");
        (n.message.clone(), n.kind)
    }

    #[test]
    fn test_blank_song_name_issues_nothing() {
        let mut c = controller();
        for input in ["", "   ", "\t\n"] {
            assert!(c.submit_search(input, "5").is_none());
        }
        assert!(!c.view().loading);
        assert!(c.notifier().last().is_none());
    }

    #[test]
    fn test_search_request_and_loading_state() {
        let mut c = controller();
        let pending = c.submit_search("  Hello ", "5").unwrap();
        assert_eq!(pending.request.song_name, "Hello");
        assert_eq!(pending.request.limit, 5);
        assert!(c.view().loading);
        assert!(!c.view().results_visible);
    }

    #[test]
    fn test_blank_limit_uses_default_and_bad_limit_is_reported() {
        let mut c = controller();
        assert_eq!(c.submit_search("Hello", " ").unwrap().request.limit, 50);
        assert!(c.submit_search("Hello", "abc").is_none());
        assert_eq!(message(&c), (MSG_BAD_LIMIT.to_string(), NotificationKind::Error));
        assert!(c.submit_search("Hello", "0").is_none());
    }

    #[test]
    fn test_hello_scenario_renders_header_and_cards() {
        let mut c = controller();
        let pending = c.submit_search("Hello", "5").unwrap();
        c.complete_search(pending.ticket, Ok(result("Adele - Hello", 5)));

        let view = c.view();
        assert!(!view.loading);
        assert!(view.results_visible);
        assert_eq!(view.header, "Mix based on \"Adele - Hello\"");
        assert_eq!(view.cards.len(), 5);
        for (i, card) in view.cards.iter().enumerate() {
            assert_eq!(card.index, i);
            assert_eq!(card.title, format!("Song {}", i));
            assert_eq!(card.play, CardAction::Play(i));
            assert_eq!(
                card.download,
                CardAction::Download {
                    url: format!("https://www.youtube.com/watch?v=id{}", i),
                    title: format!("Song {}", i),
                }
            );
        }
        assert!(view.cards[0].thumbnail.is_some());
        assert!(view.cards[1].thumbnail.is_none());
        assert_eq!(c.session().current(), None);
    }

    #[test]
    fn test_not_found_scenario() {
        let mut c = controller();
        let pending = c.submit_search("zzzz", "5").unwrap();
        c.complete_search(
            pending.ticket,
            Err(ApiError::Server {
                status: 404,
                message: Some("No results".to_string()),
            }),
        );
        assert!(!c.view().loading);
        assert!(c.view().cards.is_empty());
        assert!(!c.view().results_visible);
        assert_eq!(message(&c), ("No results".to_string(), NotificationKind::Error));
    }

    #[test]
    fn test_transport_failure_notifies_connection_error() {
        let mut c = controller();
        let pending = c.submit_search("Hello", "").unwrap();
        c.complete_search(pending.ticket, Err(ApiError::Transport("refused".into())));
        assert!(!c.view().loading);
        assert_eq!(message(&c), ("Failed to connect to server".to_string(), NotificationKind::Error));
    }

    #[test]
    fn test_new_search_clears_previous_cards() {
        let mut c = with_tracks(3);
        c.submit_search("Other", "").unwrap();
        assert!(c.view().cards.is_empty());
        assert!(c.view().loading);
    }

    #[test]
    fn test_stale_search_response_is_dropped() {
        let mut c = controller();
        let first = c.submit_search("First", "").unwrap();
        let second = c.submit_search("Second", "").unwrap();

        assert!(c.complete_search(second.ticket, Ok(result("Second", 2))));
        assert!(!c.complete_search(first.ticket, Ok(result("First", 7))));

        assert_eq!(c.view().header, "Mix based on \"Second\"");
        assert_eq!(c.view().cards.len(), 2);
        assert_eq!(c.session().tracks().len(), 2);
    }

    #[test]
    fn test_stale_error_does_not_notify() {
        let mut c = controller();
        let first = c.submit_search("First", "").unwrap();
        let _second = c.submit_search("Second", "").unwrap();
        c.complete_search(first.ticket, Err(ApiError::Transport("late".into())));
        assert!(c.notifier().last().is_none());
        assert!(c.view().loading);
    }

    #[test]
    fn test_play_builds_inline_stream_request() {
        let mut c = with_tracks(3);
        let req = c.play(1).unwrap();
        assert_eq!(req.index, 1);
        assert_eq!(req.title, "Song 1");
        assert!(req.url.starts_with("http://localhost:5001/api/stream_download?url="));
        assert!(req.url.ends_with("&title=Song%201&mode=play"));
        assert_eq!(c.session().current(), Some(1));
        assert_eq!(c.playback(), PlaybackState::Loading);
        assert!(c.view().player_visible);
        assert_eq!(c.view().player_title, "Song 1");
        assert_eq!(message(&c).0, MSG_PREPARING);
        assert!(c.notifier().hide_at().is_none());
    }

    #[test]
    fn test_play_out_of_range_changes_nothing() {
        let mut c = with_tracks(3);
        for index in [3, 4, usize::MAX] {
            assert!(c.play(index).is_none());
        }
        assert_eq!(c.session().current(), None);
        assert_eq!(c.playback(), PlaybackState::Idle);
        assert!(!c.view().player_visible);
        assert!(c.notifier().last().is_none());
    }

    #[test]
    fn test_play_success_and_rejection() {
        let mut c = with_tracks(2);
        let req = c.play(0).unwrap();
        assert!(c.play_started(req.ticket, Ok(())));
        assert_eq!(c.playback(), PlaybackState::Playing);
        assert_eq!(message(&c), (MSG_PLAYING.to_string(), NotificationKind::Normal));

        let req = c.play(1).unwrap();
        assert!(c.play_started(req.ticket, Err(PlaybackRejected::NoDevice("busy".into()))));
        assert_eq!(c.playback(), PlaybackState::Blocked);
        assert_eq!(message(&c), (MSG_CLICK_PLAY.to_string(), NotificationKind::Normal));
    }

    #[test]
    fn test_superseded_play_outcome_is_ignored() {
        let mut c = with_tracks(3);
        let old = c.play(0).unwrap();
        let new = c.play(2).unwrap();
        assert!(!c.play_started(old.ticket, Err(PlaybackRejected::Unsupported)));
        assert_eq!(c.playback(), PlaybackState::Loading);
        assert_eq!(message(&c).0, MSG_PREPARING);
        assert!(c.play_started(new.ticket, Ok(())));
        assert_eq!(c.session().current(), Some(2));
    }

    #[cfg(feature = "gui")]
    #[test]
    fn test_only_the_newest_play_ticket_is_latest() {
        let mut c = with_tracks(3);
        let old = c.play(0).unwrap();
        let new = c.play(1).unwrap();
        assert!(!c.is_latest_play(old.ticket));
        assert!(c.is_latest_play(new.ticket));
        c.stop();
        assert!(!c.is_latest_play(new.ticket));
    }

    #[test]
    fn test_auto_advance_moves_to_next_track() {
        let mut c = with_tracks(3);
        let req = c.play(0).unwrap();
        c.play_started(req.ticket, Ok(()));
        let next = c.on_ended().unwrap();
        assert_eq!(next.index, 1);
        assert_eq!(c.session().current(), Some(1));
    }

    #[test]
    fn test_auto_advance_stops_after_last_track() {
        let mut c = with_tracks(3);
        let req = c.play(2).unwrap();
        c.play_started(req.ticket, Ok(()));
        assert!(c.on_ended().is_none());
        assert_eq!(c.playback(), PlaybackState::Idle);
        assert_eq!(c.session().current(), Some(2));
    }

    #[test]
    fn test_stream_url_error_leaves_state_untouched() {
        let mut c = Controller::new(Endpoints::new("::not a url::"), 50, Duration::from_millis(4000));
        let pending = c.submit_search("Hello", "").unwrap();
        c.complete_search(pending.ticket, Ok(result("Hello", 2)));

        assert!(c.play(0).is_none());
        assert_eq!(c.session().current(), None);
        assert_eq!(c.playback(), PlaybackState::Idle);
        assert!(!c.view().player_visible);
        assert_eq!(message(&c), (MSG_STREAM_FAILED.to_string(), NotificationKind::Error));
    }

    #[test]
    fn test_download_job_and_notifications() {
        let mut c = controller();
        let job = c
            .download("https://www.youtube.com/watch?v=id0", "Don't Stop: Live")
            .unwrap();
        assert_eq!(job.filename, "Don't Stop Live.mp3");
        assert_eq!(job.title, "Don't Stop: Live");
        assert!(job.url.contains("/api/stream_download?url=https%3A%2F%2F"));
        assert!(!job.url.contains("mode=play"));
        assert_eq!(message(&c), (MSG_DOWNLOAD_STARTED.to_string(), NotificationKind::Normal));
    }

    #[test]
    fn test_download_with_bad_base_reports_error() {
        let mut c = Controller::new(Endpoints::new(""), 50, Duration::from_millis(4000));
        assert!(c.download("https://www.youtube.com/watch?v=id0", "Song").is_none());
        assert_eq!(message(&c), (MSG_DOWNLOAD_FAILED.to_string(), NotificationKind::Error));
    }

    #[test]
    fn test_card_actions_dispatch() {
        let mut c = with_tracks(2);
        let card = c.view().cards[1].clone();
        match c.activate(&card.play) {
            Effect::Play(req) => assert_eq!(req.index, 1),
            other => panic!("unexpected effect {other:?}"),
        }
        match c.activate(&card.download) {
            Effect::Download(job) => assert_eq!(job.filename, "Song 1.mp3"),
            other => panic!("unexpected effect {other:?}"),
        }
        assert_eq!(c.activate(&CardAction::Play(9)), Effect::Nothing);
    }

    #[test]
    fn test_resume_only_from_blocked() {
        let mut c = with_tracks(2);
        assert!(c.resume().is_none());
        let req = c.play(1).unwrap();
        c.play_started(req.ticket, Err(PlaybackRejected::Unsupported));
        let again = c.resume().unwrap();
        assert_eq!(again.index, 1);
        assert_eq!(c.playback(), PlaybackState::Loading);
    }
}
