mod app;
mod color;
mod data;
mod settings;
mod state;
mod ui;

use app::WaterQualityApp;
use eframe::egui;
use settings::Settings;

fn main() -> eframe::Result {
    env_logger::init();

    let settings = Settings::load();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(settings.window_size)
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    let app = WaterQualityApp::new(settings);

    eframe::run_native(
        "Análise de Qualidade da Água",
        options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
}
