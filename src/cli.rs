use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "linksentry")]
#[command(version = concat!("Ver:", env!("CARGO_PKG_VERSION")))]
#[command(about = "Concurrent endpoint watcher with Telegram notifications")]
pub struct Cli {
    /// Path to the JSON configuration document. Defaults to
    /// `~/.config/linksentry/config.json`.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Path to the rotating JSONL operational log. Defaults to
    /// `~/.config/linksentry/linksentry.log`.
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Run a single daily-report cycle and exit, instead of entering the
    /// scheduler loop.
    #[arg(long = "once")]
    pub once: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Self::default_config_path)
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file.clone()
    }

    fn default_config_path() -> PathBuf {
        let mut p = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push(".config");
        p.push("linksentry");
        p.push("config.json");
        p
    }
}
