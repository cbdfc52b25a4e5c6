// CLI definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gesture_hal")]
#[command(author, version, about = "Gesture sensor HAL")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: ~/.config/gesture-hal/gestures.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Replay a recording instead of the configured driver
    #[arg(long, global = true, value_name = "FILE")]
    pub replay: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the gestures the module exposes
    #[command(visible_alias = "ls")]
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Activate gestures and print events until interrupted
    #[command(visible_alias = "mon")]
    Monitor {
        /// Gesture handle to activate (repeatable; default: all)
        #[arg(short, long = "activate", value_name = "HANDLE")]
        activate: Vec<i32>,

        /// Sensitivity as HANDLE=VALUE (repeatable)
        #[arg(short, long = "sensitivity", value_name = "HANDLE=VALUE", value_parser = parse_sensitivity)]
        sensitivity: Vec<(i32, i32)>,

        /// Stop after this many events
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Append polled events to a recording
        #[arg(long, value_name = "FILE")]
        record: Option<PathBuf>,
    },

    /// Decode a recording
    Dump {
        file: PathBuf,

        /// One JSON object per event
        #[arg(long)]
        json: bool,
    },
}

/// Parse `HANDLE=VALUE`
fn parse_sensitivity(s: &str) -> Result<(i32, i32), String> {
    let (handle, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected HANDLE=VALUE, got '{s}'"))?;
    let handle = handle
        .trim()
        .parse()
        .map_err(|e| format!("bad handle '{handle}': {e}"))?;
    let value = value
        .trim()
        .parse()
        .map_err(|e| format!("bad sensitivity '{value}': {e}"))?;
    Ok((handle, value))
}
