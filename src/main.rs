//! Gesture HAL CLI
//!
//! Lists the gesture catalog, runs a control/data session against the
//! configured driver, and decodes event recordings.

use anyhow::Result;
use clap::Parser;

mod cli;
use cli::{Cli, Commands};

mod commands;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "gesture_hal=debug,gesture_transport=debug"
    } else {
        "gesture_hal=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let source = commands::ModuleSource {
        config: cli.config,
        replay: cli.replay,
    };

    match cli.command {
        Commands::List { json } => commands::list::list(&source, json),
        Commands::Monitor {
            activate,
            sensitivity,
            count,
            record,
        } => commands::monitor::monitor(
            &source,
            commands::monitor::MonitorOptions {
                activate,
                sensitivity,
                count,
                record,
            },
        ),
        Commands::Dump { file, json } => commands::dump::dump(&file, json),
    }
}
