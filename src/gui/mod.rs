#[cfg(feature = "gui")]
mod app;

#[cfg(feature = "gui")]
pub fn launch(config: crate::config::Config) {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([900.0, 700.0]),
        ..Default::default()
    };

    if let Err(e) = eframe::run_native(
        "mixdl",
        options,
        Box::new(move |cc| Ok(Box::new(app::MixApp::new(cc, &config)?))),
    ) {
        log::error!("window closed with an error: {}", e);
    }
}
