use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gc_core::Scale;

/// chordrec — guitar chord recognition from a short recording.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    pub config: PathBuf,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classifier l'enregistrement et afficher l'accord reconnu.
    Classify {
        /// Enregistrement WAV. Défaut : `[paths] recording` de la config.
        #[arg(long)]
        recording: Option<PathBuf>,

        /// Afficher aussi les N accords les plus probables.
        #[arg(long)]
        top: Option<usize>,
    },

    /// Exporter le spectrogramme mel de l'enregistrement en PNG.
    Spectrogram {
        /// Enregistrement WAV. Défaut : `[paths] recording` de la config.
        #[arg(long)]
        recording: Option<PathBuf>,

        /// Échelle : linear ou decibel. Défaut : `display_scale` de la config.
        #[arg(long)]
        scale: Option<Scale>,

        /// Fichier PNG de sortie.
        #[arg(long)]
        out: PathBuf,
    },

    /// Valider la config, charger le modèle et afficher son résumé.
    Check,
}

impl Command {
    /// Recording override, if the subcommand takes one.
    #[must_use]
    pub fn recording(&self) -> Option<&PathBuf> {
        match self {
            Self::Classify { recording, .. } | Self::Spectrogram { recording, .. } => {
                recording.as_ref()
            }
            Self::Check => None,
        }
    }
}
