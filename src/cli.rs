//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;
use harvester_core::catalog::{NONTEXT_LEVELS, TEXT_CLASSES};
use harvester_core::harvest::ALL;

/// Incrementally harvest text and non-text books from the SIBI catalog.
///
/// Every run downloads only titles that are not yet in the asset table and
/// retries titles recorded in the failure table. Item failures are recorded,
/// never fatal.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(author, version, about)]
pub struct Args {
    /// Classes of text books to harvest (1-12, or all)
    #[arg(short = 'c', long = "class", num_args = 1.., value_parser = parse_class)]
    pub classes: Option<Vec<String>>,

    /// Levels of non-text books to harvest (A, B1, B2, B3, C, D, E, transisi, or all)
    #[arg(short = 'n', long = "nontext", num_args = 1.., value_parser = parse_level)]
    pub levels: Option<Vec<String>>,

    /// Directory receiving books/, audiobooks/ and the record tables
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Config file (default: $XDG_CONFIG_HOME/harvester/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Record titles untranslated
    #[arg(long)]
    pub no_translate: bool,

    /// Seconds to pause after each attempted entry (0 to disable, max 3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=3600))]
    pub pacing_secs: Option<u64>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

fn parse_class(value: &str) -> Result<String, String> {
    parse_choice(value, &TEXT_CLASSES)
}

fn parse_level(value: &str) -> Result<String, String> {
    parse_choice(value, &NONTEXT_LEVELS)
}

fn parse_choice(value: &str, known: &[&str]) -> Result<String, String> {
    let value = value.trim();
    if value.eq_ignore_ascii_case(ALL) {
        return Ok(ALL.to_string());
    }
    known
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(value))
        .map(|candidate| (*candidate).to_string())
        .ok_or_else(|| format!("expected one of {}, or {ALL}", known.join(", ")))
}
