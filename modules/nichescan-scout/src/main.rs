use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nichescan_common::{load_file_config, Config, FileConfig, Locale, ScoreSubject};
use nichescan_scout::{AcquireError, Scout};

#[derive(Parser)]
#[command(name = "nichescan", about = "App catalog niche and category opportunity scanner")]
struct Cli {
    /// Catalog country code
    #[arg(long, global = true, default_value = "us")]
    country: String,

    /// Catalog language code
    #[arg(long, global = true, default_value = "en")]
    lang: String,

    /// Path to config TOML file (overrides NICHESCAN_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Fetch full detail records for listed apps before caching
    #[arg(long, global = true)]
    enrich: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Most-installed apps across general queries
    Top {
        #[arg(long, default_value_t = 100)]
        count: usize,
    },
    /// Most-installed apps in one category
    Category {
        name: String,
        #[arg(long, default_value_t = 100)]
        count: usize,
    },
    /// Keyword demand for a niche
    Keywords { niche: String },
    /// Full detail record for one app
    Details { app_id: String },
    /// Opportunity score for one niche
    NicheScore { niche: String },
    /// Opportunity scores for every niche, best first
    NicheScores,
    /// Opportunity score for one category
    CategoryScore { name: String },
    /// Description vocabulary overlap between two apps
    Compare { app_a: String, app_b: String },
    /// Proxy pool health
    PoolStatus,
    /// Cached keys with age and freshness
    CacheStatus,
    /// Known categories
    Categories,
    /// Known niches
    Niches,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("nichescan=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    config.log_redacted();

    let file_config = match cli.config.as_ref().or(config.config_path.as_ref()) {
        Some(path) => {
            info!(config = %path.display(), "Loading config");
            load_file_config(path)?
        }
        None => FileConfig::default(),
    };

    let scout = Arc::new(
        Scout::from_config(&config, &file_config, cli.enrich)
            .await
            .context("Failed to initialise scout")?,
    );

    {
        let scout = scout.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, cancelling in-flight work");
                scout.registry().cancel_all();
            }
        });
    }

    let locale = Locale::new(cli.country, cli.lang);
    match run(&scout, cli.command, &locale).await {
        Ok(()) => Ok(()),
        Err(e) => match e.downcast_ref::<AcquireError>() {
            Some(AcquireError::Blocked(reason)) => {
                eprintln!("Rate limited by the catalog, try again later ({reason})");
                std::process::exit(2);
            }
            Some(AcquireError::Cancelled) => {
                eprintln!("Cancelled");
                std::process::exit(130);
            }
            _ => Err(e),
        },
    }
}

async fn run(scout: &Scout, command: Command, locale: &Locale) -> Result<()> {
    match command {
        Command::Top { count } => print_json(&scout.fetch_general_top(count, locale).await?),
        Command::Category { name, count } => {
            print_json(&scout.fetch_category_top(&name, count, locale).await?)
        }
        Command::Keywords { niche } => {
            print_json(&scout.fetch_niche_keywords(&niche, locale).await?)
        }
        Command::Details { app_id } => print_json(&scout.app_details(&app_id, locale).await?),
        Command::NicheScore { niche } => print_json(
            &scout
                .score(&ScoreSubject::Niche(niche), locale)
                .await?,
        ),
        Command::NicheScores => print_json(&scout.score_all_niches(locale).await?),
        Command::CategoryScore { name } => print_json(
            &scout
                .score(&ScoreSubject::Category(name), locale)
                .await?,
        ),
        Command::Compare { app_a, app_b } => {
            print_json(&scout.compare_items(&app_a, &app_b, locale).await?)
        }
        Command::PoolStatus => print_json(&scout.pool_status()),
        Command::CacheStatus => print_json(&scout.cache_status().await?),
        Command::Categories => print_json(&scout.seeds().categories().collect::<Vec<_>>()),
        Command::Niches => print_json(&scout.seeds().niches().collect::<Vec<_>>()),
    }
}
