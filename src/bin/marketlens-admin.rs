use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use marketlens::cache::{self, CacheManager, EntryState};
use marketlens::config::Config;
use marketlens::dashboard::Page;
use marketlens::range::relative_time;

#[derive(Parser)]
#[command(name = "marketlens-admin")]
#[command(about = "Marketlens dashboard cache management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what is cached for a dashboard page
    Inspect {
        /// Page name (overview, ads, email, ecommerce, subscriptions)
        page: String,
    },
    /// Remove cached data for one page, or for every page
    Purge {
        /// Page name; omit to purge all pages
        page: Option<String>,
    },
    /// List all keys in the cache store
    Keys,
}

fn parse_page(raw: &str) -> Result<Page> {
    raw.parse::<Page>().map_err(anyhow::Error::msg)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    if !config.cache.backend.is_shared() {
        bail!(
            "CACHE_BACKEND=memory lives inside the server process and cannot be reached from here; \
             use DELETE /api/cache on the running server, or set CACHE_BACKEND=sqlite"
        );
    }

    let store = cache::build_store(&config.cache)
        .await
        .context("failed to open dashboard cache")?;
    let cache = CacheManager::new(store, Duration::seconds(config.cache.freshness_secs));

    match cli.command {
        Commands::Inspect { page } => {
            let page = parse_page(&page)?;
            let now = Utc::now();
            match cache.inspect(page.cache_key(), now).await? {
                EntryState::Missing => {
                    println!("No cached data for '{}' ({})", page, page.cache_key());
                }
                EntryState::Corrupt(reason) => {
                    println!(
                        "⚠ Cached data for '{}' is unreadable and will be refetched: {}",
                        page, reason
                    );
                }
                EntryState::Present { entry, fresh } => {
                    println!("Key:        {}", page.cache_key());
                    println!("Range:      {} to {}", entry.start_date, entry.end_date);
                    println!(
                        "Written:    {} ({})",
                        entry.timestamp.to_rfc3339(),
                        relative_time(now, entry.timestamp)
                    );
                    println!("Status:     {}", if fresh { "fresh" } else { "stale" });
                    println!("Size:       {} bytes", entry.data.to_string().len());
                }
            }
        }
        Commands::Purge { page } => {
            let pages = match page {
                Some(raw) => vec![parse_page(&raw)?],
                None => Page::ALL.to_vec(),
            };
            let keys: Vec<&str> = pages.iter().map(|p| p.cache_key()).collect();
            let removed = cache.purge(&keys).await?;
            println!("✓ Purged {} of {} cache entries", removed, keys.len());
        }
        Commands::Keys => {
            let keys = cache.keys().await?;
            if keys.is_empty() {
                println!("Cache is empty.");
            } else {
                for key in keys {
                    println!("{}", key);
                }
            }
        }
    }

    Ok(())
}
