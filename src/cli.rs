use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use dialoguer::{Confirm, Input, Select};

use crate::api::client::HttpBackend;
use crate::api::MixBackend;
use crate::audio::{self, AudioOutput};
use crate::config::{self, Config};
use crate::controller::{Controller, Effect, TrackCard};
use crate::core::notification::NotificationKind;
use crate::core::player::PlaybackState;
use crate::core::stream_url::Endpoints;
use crate::downloader::{self, DownloadJob};

#[derive(Parser)]
#[command(name = "mixdl", about = "Search YouTube mixes, then play or download their tracks")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Run the desktop window
    #[arg(long)]
    pub gui: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search a mix and pick tracks to play or download
    Search {
        /// Song the mix is based on
        song: String,
        /// Number of tracks to fetch
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Play a mix from start to end
    Play {
        song: String,
        #[arg(short, long)]
        limit: Option<u32>,
        /// Track number to start from (1-based)
        #[arg(long, default_value_t = 1)]
        start: usize,
    },
    /// Download a single watch URL as MP3
    Download {
        /// Source watch URL
        url: String,
        /// Title used for the file name
        #[arg(long, default_value = "audio")]
        title: String,
        /// Target directory (defaults to the configured one)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Set server URL, default limit and download directory
    Config,
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Search { song, limit }) => cmd_search(&song, limit),
        Some(Commands::Play { song, limit, start }) => cmd_play(&song, limit, start),
        Some(Commands::Download { url, title, dir }) => cmd_download(&url, &title, dir),
        Some(Commands::Config) => cmd_config(),
        None => {
            if cli.gui {
                #[cfg(feature = "gui")]
                {
                    crate::gui::launch(config::load_config());
                    Ok(())
                }
                #[cfg(not(feature = "gui"))]
                {
                    anyhow::bail!(
                        "GUI support is not enabled. Rebuild with: cargo build --features gui"
                    );
                }
            } else {
                println!("usage: mixdl <command> or mixdl --gui");
                println!("run mixdl --help for details.");
                Ok(())
            }
        }
    }
}

/// Terminal front-end: runs controller requests synchronously and prints
/// notifications as they change.
struct Terminal {
    backend: HttpBackend,
    controller: Controller,
    download_dir: PathBuf,
    last_seen: u64,
}

impl Terminal {
    fn new(cfg: &Config) -> Result<Self> {
        let backend = HttpBackend::new(Endpoints::new(cfg.server.base_url.clone()))
            .context("could not create the HTTP client")?;
        Ok(Self {
            backend,
            controller: Controller::from_config(cfg),
            download_dir: cfg.download.resolve_directory(),
            last_seen: 0,
        })
    }

    fn announce(&mut self) {
        let Some(note) = self.controller.notifier().visible() else {
            return;
        };
        if note.seq <= self.last_seen {
            return;
        }
        self.last_seen = note.seq;
        match note.kind {
            NotificationKind::Error => eprintln!("✗ {}", note.message),
            NotificationKind::Normal => println!("» {}", note.message),
        }
    }

    /// Returns true when results are on screen.
    fn search(&mut self, song: &str, limit: Option<u32>) -> bool {
        let limit = limit.map(|n| n.to_string()).unwrap_or_default();
        let Some(pending) = self.controller.submit_search(song, &limit) else {
            self.announce();
            return false;
        };

        println!("Searching mix for {:?}...", pending.request.song_name);
        let result = self.backend.search(&pending.request);
        self.controller.complete_search(pending.ticket, result);
        self.announce();

        if self.controller.view().results_visible {
            self.print_results();
        }
        self.controller.view().results_visible
    }

    fn print_results(&self) {
        let view = self.controller.view();
        println!("\n{}\n", view.header);

        let mut table = Table::new();
        table.set_header(vec!["#", "Title", "Link", "Thumbnail"]);
        for card in &view.cards {
            table.add_row(vec![
                Cell::new(card.index + 1),
                Cell::new(&card.title),
                Cell::new(&card.source_url),
                Cell::new(if card.thumbnail.is_some() { "yes" } else { "-" }),
            ]);
        }
        println!("{table}");
        println!("\n{} tracks", view.cards.len());
    }

    fn download(&mut self, job: Option<DownloadJob>) {
        self.announce();
        let Some(job) = job else {
            return;
        };
        match downloader::run(&self.backend, &job, &self.download_dir) {
            Ok(path) => println!("  saved {}", path.display()),
            Err(e) => {
                log::error!("{:#}", e);
                eprintln!("  download failed: {:#}", e);
            }
        }
    }

    /// Plays from `index` with auto-advance until the list ends or the user
    /// declines a manual start.
    fn play_from(&mut self, index: usize, output: &mut dyn AudioOutput) -> Result<()> {
        let mut next = self.controller.play(index);
        if next.is_none() {
            self.announce();
        }

        while let Some(req) = next.take() {
            self.announce();
            println!(
                "▶ {} ({}/{})",
                req.title,
                req.index + 1,
                self.controller.session().tracks().len()
            );

            let outcome =
                audio::fetch_stream(&self.backend, &req.url).and_then(|bytes| output.start(bytes));
            self.controller.play_started(req.ticket, outcome);
            self.announce();

            match self.controller.playback() {
                PlaybackState::Playing => {
                    output.wait_until_end();
                    next = self.controller.on_ended();
                }
                PlaybackState::Blocked => {
                    let retry = Confirm::new()
                        .with_prompt("Playback did not start. Try again?")
                        .default(true)
                        .interact()?;
                    if retry {
                        next = self.controller.resume();
                    } else {
                        self.controller.stop();
                    }
                }
                PlaybackState::Idle | PlaybackState::Loading => {}
            }
        }

        output.stop();
        Ok(())
    }
}

fn card_label(card: &TrackCard) -> String {
    format!("{:>3}. {}", card.index + 1, card.title)
}

fn cmd_search(song: &str, limit: Option<u32>) -> Result<()> {
    let cfg = config::load_config();
    let mut term = Terminal::new(&cfg)?;

    if !term.search(song, limit) {
        return Ok(());
    }
    if term.controller.view().cards.is_empty() {
        println!("The mix is empty.");
        return Ok(());
    }

    let mut output: Option<Box<dyn AudioOutput>> = None;

    loop {
        let cards = term.controller.view().cards.clone();
        let mut items: Vec<String> = cards.iter().map(card_label).collect();
        items.push("Quit".to_string());

        let selection = Select::new()
            .with_prompt("Pick a track")
            .items(&items)
            .default(0)
            .interact()?;

        let Some(card) = cards.get(selection) else {
            break;
        };

        let actions = ["Play from here", "Download", "Back"];
        let action = Select::new()
            .with_prompt(format!("  {}", card.title))
            .items(&actions[..])
            .default(0)
            .interact()?;

        match action {
            0 => {
                let out = output.get_or_insert_with(audio::open_default_output);
                term.play_from(card.index, out.as_mut())?;
            }
            1 => {
                let job = match term.controller.activate(&card.download) {
                    Effect::Download(job) => Some(job),
                    _ => None,
                };
                term.download(job);
            }
            _ => {}
        }
    }

    Ok(())
}

fn cmd_play(song: &str, limit: Option<u32>, start: usize) -> Result<()> {
    let cfg = config::load_config();
    let mut term = Terminal::new(&cfg)?;

    if !term.search(song, limit) {
        return Ok(());
    }

    let count = term.controller.view().cards.len();
    let index = start.saturating_sub(1);
    if index >= count {
        println!("There is no track {} in a mix of {}.", start, count);
        return Ok(());
    }

    let mut output = audio::open_default_output();
    term.play_from(index, output.as_mut())?;
    println!("End of mix.");
    Ok(())
}

fn cmd_download(url: &str, title: &str, dir: Option<PathBuf>) -> Result<()> {
    let cfg = config::load_config();
    let mut term = Terminal::new(&cfg)?;
    if let Some(dir) = dir {
        term.download_dir = dir;
    }

    let job = term.controller.download(url, title);
    term.download(job);
    Ok(())
}

fn cmd_config() -> Result<()> {
    let mut cfg = config::load_config();

    println!("mixdl settings\n");

    let base_url: String = Input::new()
        .with_prompt("Server URL")
        .with_initial_text(cfg.server.base_url.clone())
        .interact_text()?;

    let default_limit: u32 = Input::new()
        .with_prompt("Default mix size")
        .with_initial_text(cfg.search.default_limit.to_string())
        .validate_with(|n: &u32| -> Result<(), &str> {
            if *n > 0 {
                Ok(())
            } else {
                Err("must be at least 1")
            }
        })
        .interact_text()?;

    let current_dir = cfg.download.resolve_directory().display().to_string();
    let directory: String = Input::new()
        .with_prompt("Download directory")
        .with_initial_text(current_dir)
        .interact_text()?;

    cfg.server.base_url = base_url.trim().to_string();
    cfg.search.default_limit = default_limit;
    cfg.download.directory = Some(PathBuf::from(directory.trim()));

    config::save_config(&cfg).context("could not save the config file")?;
    println!("\nSaved!");
    Ok(())
}
