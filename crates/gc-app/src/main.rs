use std::io;

use anyhow::Result;
use clap::Parser;
use gc_core::PipelineConfig;

pub mod cli;
pub mod commands;
pub mod render;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Charger la config
    let config = resolve_config(&cli)?;
    let recording = cli
        .command
        .recording()
        .unwrap_or(&config.recording_path)
        .clone();

    // 4. Exécuter la commande
    let mut out = io::stdout().lock();
    match cli.command {
        cli::Command::Classify { top, .. } => {
            commands::classify(&config, &recording, top, &mut out)
        }
        cli::Command::Spectrogram { scale, out: png, .. } => commands::spectrogram(
            &config,
            &recording,
            scale.unwrap_or(config.display_scale),
            &png,
            &mut out,
        ),
        cli::Command::Check => commands::check(&config, &mut out),
    }
}

/// Explicit config path if it exists, otherwise defaults.
fn resolve_config(cli: &cli::Cli) -> Result<PipelineConfig> {
    if cli.config.exists() {
        gc_core::config::load_config(&cli.config)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        let config = PipelineConfig::default();
        config.validate()?;
        Ok(config)
    }
}
