mod api;
mod audio;
mod cli;
mod config;
mod controller;
mod core;
mod downloader;
mod models;

#[cfg(feature = "gui")]
mod gui;

use clap::Parser;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("mixdl=warn"))
        .init();

    let cli = cli::Cli::parse();

    if let Err(e) = cli::run(cli) {
        log::error!("{:#}", e);
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
