#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

#[cfg(not(feature = "camera-nokhwa"))]
compile_error!("Enable the camera-nokhwa feature: the calculator needs a camera backend.");

mod calculator;
mod config;
mod fingers;
mod hands;
mod headless;
mod model_download;
mod pipeline;
mod selection;
mod session;
#[cfg(test)]
mod test_support;
mod types;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use gpui::Application;

use crate::{
    config::Config,
    headless::LogDisplay,
    pipeline::{CameraSource, RecognizerBackend},
    session::Session,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Config::parse();

    if config.list_cameras {
        for device in pipeline::available_cameras()? {
            println!("{}", device.label);
        }
        return Ok(());
    }

    log::info!("finger calculator: hold up 1-4 fingers to choose an operation");
    log::info!("controls: [R] reset / change operation, [Q] quit");

    let backend = RecognizerBackend::in_dir(&config.model_dir);
    backend
        .ensure_models(!config.no_download)
        .context("hand detection models are unavailable")?;
    let mut detector = backend.load(&config.detector())?;
    let mut session = Session::new(config.finger_counter(), config.hold());

    if config.headless {
        let mut camera = open_camera(&config)?;
        let mut display = LogDisplay::from_stdin();
        let result = session::run(&mut session, &mut camera, &mut detector, &mut display);
        drop(camera);
        return result.context("frame loop stopped");
    }

    // Fail fast before spawning the frame loop thread.
    drop(open_camera(&config)?);

    let (display, frames_rx, command_tx) = pipeline::display_channels();
    let worker = session::spawn_loop(
        move || open_camera(&config),
        session,
        detector,
        display,
        command_tx.clone(),
    );

    Application::new()
        .with_assets(gpui_component_assets::Assets)
        .run(move |app| {
            gpui_component::init(app);

            if let Err(err) = ui::launch_ui(app, frames_rx.clone(), command_tx.clone()) {
                log::error!("failed to launch ui: {err:?}");
                app.quit();
            }
        });

    // The window is gone; stop the loop and wait for the camera to close.
    worker.shutdown().context("frame loop stopped")
}

fn open_camera(config: &Config) -> Result<CameraSource> {
    CameraSource::open(config.camera, config.width, config.height)
        .context("cannot access the camera")
}
