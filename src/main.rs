use eframe::egui;
use tracing_subscriber::EnvFilter;

use meshport::app::MeshportApp;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("meshport=info")),
        )
        .init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([600.0, 550.0])
            .with_min_inner_size([480.0, 400.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Meshport Mesh Converter",
        options,
        Box::new(|_cc| Ok(Box::<MeshportApp>::default())),
    )
}
