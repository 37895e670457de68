use std::path::PathBuf;
use std::collections::VecDeque;
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use egui::{Color32, ColorImage, TextureHandle};
use egui_extras::{Column, TableBuilder};

use crate::api::client::HttpBackend;
use crate::api::{ApiError, MixBackend};
use crate::audio::{self, AudioOutput, PlaybackRejected};
use crate::config::Config;
use crate::controller::{CardAction, Controller, Effect, PlayRequest};
use crate::core::notification::NotificationKind;
use crate::core::player::PlaybackState;
use crate::core::session::Ticket;
use crate::core::stream_url::Endpoints;
use crate::downloader::{self, DownloadJob};
use crate::models::SearchResult;

const THUMB_SIZE: f32 = 64.0;
const ROW_HEIGHT: f32 = 72.0;
const ACCENT: Color32 = Color32::from_rgb(0x00, 0xf2, 0xea);
const ERROR_ACCENT: Color32 = Color32::from_rgb(0xff, 0x00, 0x50);
/// Threads fetching thumbnails for one result list.
const THUMB_WORKERS: usize = 4;
/// How often the end of a playing track is polled.
const PLAYBACK_POLL: Duration = Duration::from_millis(250);

enum BgResult {
    SearchDone(Ticket, Result<SearchResult, ApiError>),
    StreamReady(Ticket, Result<Vec<u8>, PlaybackRejected>),
    ThumbnailDone(Ticket, usize, Vec<u8>),
    DownloadDone(String, Result<PathBuf, String>),
}

pub struct MixApp {
    // Inputs
    song_input: String,
    limit_input: String,

    controller: Controller,
    backend: Arc<HttpBackend>,
    output: Box<dyn AudioOutput>,
    download_dir: PathBuf,

    // Thumbnails of the search identified by `thumbs_ticket`
    thumbnails: Vec<Option<TextureHandle>>,
    thumbs_ticket: Ticket,
    last_search: Ticket,

    // Background tasks
    tx: mpsc::Sender<BgResult>,
    rx: mpsc::Receiver<BgResult>,
}

impl MixApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: &Config) -> Result<Self, ApiError> {
        Self::setup_cjk_fonts(&cc.egui_ctx);
        let (tx, rx) = mpsc::channel();

        let backend = HttpBackend::new(Endpoints::new(config.server.base_url.clone()))?;

        Ok(Self {
            song_input: String::new(),
            limit_input: config.search.default_limit.to_string(),
            controller: Controller::from_config(config),
            backend: Arc::new(backend),
            output: audio::open_default_output(),
            download_dir: config.download.resolve_directory(),
            thumbnails: Vec::new(),
            thumbs_ticket: 0,
            last_search: 0,
            tx,
            rx,
        })
    }

    /// Mix titles are often Korean or Japanese; egui's bundled fonts have no CJK glyphs.
    fn setup_cjk_fonts(ctx: &egui::Context) {
        let mut fonts = egui::FontDefinitions::default();

        let font_paths = [
            "/System/Library/Fonts/AppleSDGothicNeo.ttc",
            "/System/Library/Fonts/Supplemental/AppleGothic.ttf",
            "/usr/share/fonts/truetype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
            "C:\\Windows\\Fonts\\malgun.ttf",
        ];

        for path in &font_paths {
            let Ok(font_data) = std::fs::read(path) else {
                continue;
            };
            fonts
                .font_data
                .insert("cjk".to_string(), egui::FontData::from_owned(font_data));
            for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
                if let Some(list) = fonts.families.get_mut(&family) {
                    list.push("cjk".to_string());
                }
            }
            ctx.set_fonts(fonts);
            log::debug!("loaded fallback font {}", path);
            return;
        }
    }

    fn start_search(&mut self, ctx: &egui::Context) {
        let Some(pending) = self
            .controller
            .submit_search(&self.song_input, &self.limit_input)
        else {
            return;
        };
        self.last_search = pending.ticket;
        self.thumbnails.clear();

        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let result = backend.search(&pending.request);
            let _ = tx.send(BgResult::SearchDone(pending.ticket, result));
            ctx.request_repaint();
        });
    }

    fn fetch_thumbnails(&mut self, ctx: &egui::Context, ticket: Ticket) {
        let cards = &self.controller.view().cards;
        self.thumbnails = vec![None; cards.len()];
        self.thumbs_ticket = ticket;

        let jobs: Vec<(usize, String)> = cards
            .iter()
            .filter_map(|card| card.thumbnail.clone().map(|url| (card.index, url)))
            .collect();
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        spawn_pool(jobs, THUMB_WORKERS, move |(index, url)| {
            match backend.fetch_image(&url) {
                Ok(data) => {
                    let _ = tx.send(BgResult::ThumbnailDone(ticket, index, data));
                    ctx.request_repaint();
                }
                Err(e) => log::debug!("thumbnail {} failed: {}", url, e),
            }
        });
    }

    fn start_stream(&self, ctx: &egui::Context, req: PlayRequest) {
        // The previous track keeps playing until the new one is ready.
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let result = audio::fetch_stream(&*backend, &req.url);
            let _ = tx.send(BgResult::StreamReady(req.ticket, result));
            ctx.request_repaint();
        });
    }

    fn start_download(&self, ctx: &egui::Context, job: DownloadJob) {
        let backend = Arc::clone(&self.backend);
        let dir = self.download_dir.clone();
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let result = downloader::run(&*backend, &job, &dir).map_err(|e| format!("{:#}", e));
            let _ = tx.send(BgResult::DownloadDone(job.title, result));
            ctx.request_repaint();
        });
    }

    fn activate(&mut self, ctx: &egui::Context, action: &CardAction) {
        match self.controller.activate(action) {
            Effect::Play(req) => self.start_stream(ctx, req),
            Effect::Download(job) => self.start_download(ctx, job),
            Effect::Nothing => {}
        }
    }

    fn process_bg_results(&mut self, ctx: &egui::Context) {
        while let Ok(result) = self.rx.try_recv() {
            match result {
                BgResult::SearchDone(ticket, result) => {
                    if self.controller.complete_search(ticket, result)
                        && self.controller.view().results_visible
                    {
                        self.fetch_thumbnails(ctx, ticket);
                    }
                }
                BgResult::StreamReady(ticket, bytes) => {
                    if !self.controller.is_latest_play(ticket) {
                        log::debug!("discarding superseded stream (ticket {})", ticket);
                        continue;
                    }
                    let outcome = bytes.and_then(|b| self.output.start(b));
                    self.controller.play_started(ticket, outcome);
                }
                BgResult::ThumbnailDone(ticket, index, data) => {
                    if ticket != self.thumbs_ticket || ticket != self.last_search {
                        continue;
                    }
                    match image::load_from_memory(&data) {
                        Ok(img) => {
                            let rgba = img.to_rgba8();
                            let size = [rgba.width() as usize, rgba.height() as usize];
                            let pixels = rgba.into_raw();
                            let color_image = ColorImage::from_rgba_unmultiplied(size, &pixels);
                            let texture = ctx.load_texture(
                                format!("thumb_{}_{}", ticket, index),
                                color_image,
                                Default::default(),
                            );
                            if let Some(slot) = self.thumbnails.get_mut(index) {
                                *slot = Some(texture);
                            }
                        }
                        Err(e) => log::debug!("thumbnail #{} is not an image: {}", index, e),
                    }
                }
                BgResult::DownloadDone(title, result) => match result {
                    Ok(path) => log::info!("{:?} saved to {}", title, path.display()),
                    Err(e) => log::warn!("{:?} failed to download: {}", title, e),
                },
            }
        }
    }

    /// Auto-advance once the output has drained.
    fn poll_playback(&mut self, ctx: &egui::Context) {
        if self.controller.playback() != PlaybackState::Playing {
            return;
        }
        if self.output.finished() {
            match self.controller.on_ended() {
                Some(req) => self.start_stream(ctx, req),
                None => self.output.stop(),
            }
        } else {
            ctx.request_repaint_after(PLAYBACK_POLL);
        }
    }

    fn poll_notification(&mut self, ctx: &egui::Context) {
        let notifier = self.controller.notifier_mut();
        notifier.refresh();
        if let Some(deadline) = notifier.hide_at() {
            ctx.request_repaint_after(deadline.saturating_duration_since(Instant::now()));
        }
    }

    fn search_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("search_panel").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.song_input)
                        .hint_text("Song name")
                        .desired_width(320.0),
                );
                ui.add(
                    egui::TextEdit::singleline(&mut self.limit_input)
                        .hint_text("Limit")
                        .desired_width(48.0),
                );
                let enter = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if ui.button("Search").clicked() || enter {
                    self.start_search(ctx);
                }
                if self.controller.view().loading {
                    ui.spinner();
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Folder...").clicked() {
                        if let Some(folder) = rfd::FileDialog::new()
                            .set_directory(&self.download_dir)
                            .pick_folder()
                        {
                            self.download_dir = folder;
                        }
                    }
                    ui.label(format!("Downloads: {}", self.download_dir.display()));
                });
            });
            ui.add_space(6.0);
        });
    }

    fn player_bar(&mut self, ctx: &egui::Context) {
        if !self.controller.view().player_visible {
            return;
        }
        egui::TopBottomPanel::bottom("player_bar").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                let state = self.controller.playback();
                match state {
                    PlaybackState::Blocked => {
                        if ui.button("▶").clicked() {
                            if let Some(req) = self.controller.resume() {
                                self.start_stream(ctx, req);
                            }
                        }
                    }
                    PlaybackState::Playing => {
                        let label = if self.output.is_paused() { "▶" } else { "⏸" };
                        if ui.button(label).clicked() {
                            if self.output.is_paused() {
                                self.output.resume();
                            } else {
                                self.output.pause();
                            }
                        }
                    }
                    PlaybackState::Loading => {
                        ui.spinner();
                    }
                    PlaybackState::Idle => {}
                }
                if state != PlaybackState::Idle && ui.button("⏹").clicked() {
                    self.output.stop();
                    self.controller.stop();
                }
                ui.label(egui::RichText::new(&self.controller.view().player_title).strong());
            });
            ui.add_space(6.0);
        });
    }

    fn results(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let view = self.controller.view();
            if !view.results_visible {
                ui.centered_and_justified(|ui| {
                    if !view.loading {
                        ui.label("Search a song to get its mix");
                    }
                });
                return;
            }

            ui.heading(&view.header);
            ui.separator();

            let cards = view.cards.clone();
            let mut clicked: Option<CardAction> = None;

            TableBuilder::new(ui)
                .striped(true)
                .column(Column::exact(THUMB_SIZE + 8.0))
                .column(Column::remainder())
                .column(Column::auto())
                .body(|mut body| {
                    for card in &cards {
                        body.row(ROW_HEIGHT, |mut row| {
                            row.col(|ui| {
                                if let Some(Some(texture)) = self.thumbnails.get(card.index) {
                                    let size = texture.size_vec2();
                                    let scale = (THUMB_SIZE / size.x).min(THUMB_SIZE / size.y);
                                    ui.image(egui::load::SizedTexture::new(
                                        texture.id(),
                                        size * scale,
                                    ));
                                }
                            });
                            row.col(|ui| {
                                ui.vertical(|ui| {
                                    ui.label(egui::RichText::new(&card.title).strong());
                                    ui.hyperlink_to("Watch on YouTube", &card.source_url);
                                });
                            });
                            row.col(|ui| {
                                if ui.button("Play").clicked() {
                                    clicked = Some(card.play.clone());
                                }
                                if ui.button("Download").clicked() {
                                    clicked = Some(card.download.clone());
                                }
                            });
                        });
                    }
                });

            if let Some(action) = clicked {
                self.activate(ctx, &action);
            }
        });
    }

    fn notification(&self, ctx: &egui::Context) {
        let Some(note) = self.controller.notifier().visible() else {
            return;
        };
        let accent = match note.kind {
            NotificationKind::Normal => ACCENT,
            NotificationKind::Error => ERROR_ACCENT,
        };
        egui::Area::new(egui::Id::new("notification"))
            .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-16.0, 56.0))
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style())
                    .stroke(egui::Stroke::new(2.0, accent))
                    .show(ui, |ui| {
                        ui.label(&note.message);
                    });
            });
    }
}

impl eframe::App for MixApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_bg_results(ctx);
        self.poll_playback(ctx);
        self.poll_notification(ctx);

        self.search_panel(ctx);
        self.player_bar(ctx);
        self.results(ctx);
        self.notification(ctx);
    }
}

/// Runs `work` over `jobs` on at most `workers` threads draining one queue.
fn spawn_pool<T, F>(jobs: Vec<T>, workers: usize, work: F) -> Vec<JoinHandle<()>>
where
    T: Send + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    let threads = workers.min(jobs.len());
    let queue = Arc::new(Mutex::new(VecDeque::from(jobs)));
    let work = Arc::new(work);

    (0..threads)
        .map(|_| {
            let queue = Arc::clone(&queue);
            let work = Arc::clone(&work);
            std::thread::spawn(move || loop {
                let next = queue.lock().ok().and_then(|mut q| q.pop_front());
                let Some(job) = next else {
                    break;
                };
                work(job);
            })
        })
        .collect()
}
