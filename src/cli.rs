//! CLI argument parsing for tailscope

use crate::config::AnalysisConfig;
use crate::correlate::IdentityScheme;
use crate::tail::TailOrders;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for analysis results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Markdown tables (default)
    Markdown,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "tailscope")]
#[command(version)]
#[command(
    about = "Correlate archived instrumentation traces and report tail latency statistics",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file (CLI flags take precedence)
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "markdown", global = true)]
    pub format: OutputFormat,

    /// Worker threads used to scan the archives of a directory
    #[arg(short = 'j', long = "jobs", value_name = "N", global = true)]
    pub jobs: Option<usize>,

    /// How entry names become source/destination identities
    #[arg(long = "identity", value_enum, global = true)]
    pub identity: Option<IdentityScheme>,

    /// Write the merged events of the last scanned archive to FILE
    #[arg(long = "snapshot", value_name = "FILE", global = true)]
    pub snapshot: Option<PathBuf>,

    /// Enable debug tracing output (to stderr)
    #[arg(long = "debug", global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Percentile profile of every producer/consumer pair
    Pairs {
        /// Archive or directory of archives
        path: PathBuf,
    },

    /// Tail deviations (D2..D5) aggregated per group of archives
    Tails {
        /// Archive or directory of archives
        path: PathBuf,

        /// Percentile orders behind D2..D5, e.g. 99,99.9,99.99,99.999
        #[arg(long = "orders", value_name = "ORDERS")]
        orders: Option<TailOrders>,
    },

    /// Same-process round-trip summary of every archive
    Roundtrip {
        /// Archive or directory of archives
        path: PathBuf,
    },

    /// Histogram of event-loop pauses
    Pauses {
        /// Archive or directory of archives
        path: PathBuf,
    },
}

impl Command {
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Pairs { path }
            | Self::Tails { path, .. }
            | Self::Roundtrip { path }
            | Self::Pauses { path } => path,
        }
    }
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply_overrides(&self, config: &mut AnalysisConfig) {
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if let Some(identity) = self.identity {
            config.identity = identity;
        }
        if let Some(snapshot) = &self.snapshot {
            config.snapshot_path = Some(snapshot.clone());
        }
        if let Command::Tails {
            orders: Some(orders),
            ..
        } = &self.command
        {
            config.tail_orders = *orders;
        }
    }
}
