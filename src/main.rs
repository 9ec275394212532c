#![windows_subsystem = "windows"]

mod app;
mod canvas;
mod capture;
mod cli;
mod config;
mod document;
mod export;
mod geometry;
mod input;
mod item;
mod overlay;
mod scene;
mod viewport;

use color_eyre::eyre::{Result, eyre};
use env_logger::Env;

use crate::app::{APP_NAME, INITIAL_SIZE, SnapInkApp};

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let plan = match cli::parse_plan(std::env::args_os()) {
        Ok(plan) => plan,
        Err(cli::CliError::Arguments(e)) if !e.use_stderr() => e.exit(),
        Err(e) => {
            eprintln!("{APP_NAME}: {e}\n\n{}", cli::USAGE);
            std::process::exit(1);
        }
    };
    let settings = config::Settings::load();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(INITIAL_SIZE)
            .with_title(APP_NAME),
        ..Default::default()
    };
    eframe::run_native(
        APP_NAME,
        options,
        Box::new(move |cc| Ok(Box::new(SnapInkApp::new(cc, settings, plan)))),
    )
    .map_err(|e| eyre!(e.to_string()))?;
    Ok(())
}
