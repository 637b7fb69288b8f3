pub mod app;
pub mod asset;
pub mod demo;
pub mod error;
pub mod input;
pub mod player;
pub mod renderer;
pub mod scene;
pub mod settings;
pub mod time;

pub use error::{RenderError, SettingsError};
pub use settings::RenderSettings;

use app::App;
use winit::event_loop::EventLoop;

pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}

pub fn run() -> Result<(), winit::error::EventLoopError> {
    init_logging();

    let settings = RenderSettings::load();
    log::info!(
        "Starting shadow-frame: {}x{}, vsync {}, fullscreen {}",
        settings.window.width,
        settings.window.height,
        settings.vsync,
        settings.fullscreen
    );

    let event_loop = EventLoop::new()?;
    let mut app = App::new(settings);

    let result = event_loop.run_app(&mut app);

    if let Err(ref err) = result {
        log::error!("Application error: {}", err);
    }

    log::info!("Application shutdown complete");

    result
}
