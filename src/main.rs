use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use lookthru::cli::{formatters, CacheCommands, Cli, Commands};
use lookthru::config::Config;
use lookthru::holdings::cache::{HoldingsCache, JsonFileStore};
use lookthru::pipeline::run_lookthrough;
use lookthru::positions::load_positions;
use lookthru::scraping::VanguardSource;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = Config::load()?;

    match cli.command {
        Commands::Run {
            positions,
            top,
            output,
            cache_dir,
            refresh,
        } => handle_run(&config, positions, top, output, cache_dir, refresh, cli.json).await,

        Commands::Cache { action } => handle_cache(&config, action),
    }
}

/// Precedence: CLI flag, then config file, then the platform default.
fn resolve_cache_dir(config: &Config, flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    if let Some(dir) = &config.cache_dir {
        return Ok(dir.clone());
    }
    JsonFileStore::default_dir()
}

#[allow(clippy::too_many_arguments)]
async fn handle_run(
    config: &Config,
    positions_path: PathBuf,
    top: Option<usize>,
    output: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    refresh: bool,
    json: bool,
) -> Result<()> {
    let top = top.unwrap_or(config.top_n);
    if top == 0 {
        anyhow::bail!("--top must be positive");
    }

    let positions = load_positions(&positions_path)?;
    if positions.is_empty() {
        anyhow::bail!(
            "No positions to process in '{}'",
            positions_path.display()
        );
    }
    info!(
        "Loaded {} position(s) from {}",
        positions.len(),
        positions_path.display()
    );

    let cache_dir = resolve_cache_dir(config, cache_dir)?;
    let cache =
        HoldingsCache::new(Box::new(JsonFileStore::new(&cache_dir))).with_refresh(refresh);
    let source = VanguardSource::new(config.fetch_settings());

    let outcome = run_lookthrough(&positions, &cache, &source, top).await?;

    if let Some(path) = &output {
        formatters::write_outcome_csv(&outcome, path)?;
        println!("{} Report saved to {}", "✓".green().bold(), path.display());
    }

    if json {
        println!("{}", formatters::format_outcome_json(&outcome));
    } else {
        println!("{}", formatters::format_outcome_table(&outcome));
    }

    Ok(())
}

fn handle_cache(config: &Config, action: CacheCommands) -> Result<()> {
    match action {
        CacheCommands::List { cache_dir } => {
            let dir = resolve_cache_dir(config, cache_dir)?;
            let store = JsonFileStore::new(&dir);
            let funds = store.list()?;
            if funds.is_empty() {
                println!(
                    "{} No cached holdings in {}",
                    "ℹ".blue().bold(),
                    dir.display()
                );
            } else {
                println!("Cached holdings in {}:", dir.display());
                for fund in funds {
                    println!("  {}", fund);
                }
            }
            Ok(())
        }

        CacheCommands::Clear { fund, cache_dir } => {
            let dir = resolve_cache_dir(config, cache_dir)?;
            let store = JsonFileStore::new(&dir);
            store.clear(fund.as_deref())?;
            match fund {
                Some(fund) => println!(
                    "{} Cleared cached holdings for {}",
                    "✓".green().bold(),
                    fund.to_uppercase()
                ),
                None => println!("{} Cleared all cached holdings", "✓".green().bold()),
            }
            Ok(())
        }
    }
}
