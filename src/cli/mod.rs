use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod formatters;

#[derive(Parser)]
#[command(name = "lookthru")]
#[command(
    version,
    about = "ETF portfolio look-through: company-level exposure across fund positions"
)]
#[command(
    long_about = "Decompose a portfolio of fund positions into consolidated company-level \
exposure: fetch each fund's reported holdings, weight them by the position's value and \
aggregate across all funds into one ranked table."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, aggregate and report company-level exposure
    Run {
        /// Path to the positions JSON file
        #[arg(long, default_value = "positions.json")]
        positions: PathBuf,

        /// Number of top holdings in the summary (default from config, 10)
        #[arg(long)]
        top: Option<usize>,

        /// Write the consolidated table to a CSV file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Holdings cache directory override
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Ignore cached holdings and refetch every fund
        #[arg(long)]
        refresh: bool,
    },

    /// Cached holdings management
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// List funds with cached holdings
    List {
        /// Holdings cache directory override
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },

    /// Delete one fund's cached holdings, or all of them
    Clear {
        /// Fund identifier; omit to clear everything
        fund: Option<String>,

        /// Holdings cache directory override
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}
