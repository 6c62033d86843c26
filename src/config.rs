//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};

/// What happens to a timer once its completion has been logged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CompletionPolicy {
    /// Keep the timer in place at zero; starting it again runs the full duration
    #[default]
    Hold,
    /// Reset the timer to its full duration
    Rewind,
    /// Delete the timer
    Remove,
}

/// Runtime knobs of the countdown engine
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Polling cadence of each running timer's countdown task
    pub tick_interval: Duration,
    pub on_complete: CompletionPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            on_complete: CompletionPolicy::Hold,
        }
    }
}

/// CLI argument parsing structure
#[derive(Parser)]
#[command(name = "countdown-keeper")]
#[command(about = "A persistent countdown-timer manager with categories and completion history")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Directory holding timers.json and history.json
    #[arg(short, long, default_value = "./timer-data")]
    pub data_dir: PathBuf,

    /// Keep everything in memory instead of on disk
    #[arg(long)]
    pub in_memory: bool,

    /// Countdown polling interval in milliseconds
    #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(10..))]
    pub tick_ms: u64,

    /// What to do with a timer after it completes
    #[arg(long, value_enum, default_value_t = CompletionPolicy::Hold)]
    pub on_complete: CompletionPolicy,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            tick_interval: Duration::from_millis(self.tick_ms),
            on_complete: self.on_complete,
        }
    }
}
