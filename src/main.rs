use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tailscope::cli::{Cli, Command, OutputFormat};
use tailscope::config::AnalysisConfig;
use tailscope::{directory, report};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` forces TRACE level
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::default(),
    };

    args.apply_overrides(&mut config);
    if let Err(e) = config.validate() {
        anyhow::bail!("Invalid configuration: {}", e);
    }
    Ok(config)
}

fn run(command: &Command, config: &AnalysisConfig, format: OutputFormat) -> Result<String> {
    let path: &Path = command.path();
    let context = || format!("Failed to analyze {}", path.display());

    let output = match command {
        Command::Pairs { .. } | Command::Tails { .. } => {
            let analysis = directory::analyze_directory(path, config).with_context(context)?;
            match (command, format) {
                (_, OutputFormat::Json) => {
                    report::JsonLatencyReport::from_analysis(&analysis).to_json()?
                }
                (Command::Pairs { .. }, OutputFormat::Markdown) => {
                    report::pairs_markdown(&analysis)
                }
                (_, OutputFormat::Markdown) => report::tails_markdown(&analysis),
            }
        }
        Command::Roundtrip { .. } => {
            let analysis = directory::analyze_round_trips(path, config).with_context(context)?;
            match format {
                OutputFormat::Json => report::round_trips_json(&analysis)?,
                OutputFormat::Markdown => report::round_trips_markdown(&analysis),
            }
        }
        Command::Pauses { .. } => {
            let analysis = directory::analyze_pauses(path, config).with_context(context)?;
            match format {
                OutputFormat::Json => report::pauses_json(&analysis)?,
                OutputFormat::Markdown => report::pauses_markdown(&analysis),
            }
        }
    };

    Ok(output)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = load_config(&args)?;
    tracing::debug!("Using configuration: {:?}", config);

    let output = run(&args.command, &config, args.format)?;
    println!("{}", output.trim_end());

    Ok(())
}
