use anyhow::Result;
use chrono::Duration;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use marketlens::api;
use marketlens::cache::{self, CacheManager};
use marketlens::config::Config;
use marketlens::dashboard::Dashboard;
use marketlens::insights::InsightClient;
use marketlens::sources::SourceRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("marketlens=info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize cache
    let store = cache::build_store(&config.cache).await?;
    let cache = Arc::new(CacheManager::new(
        store,
        Duration::seconds(config.cache.freshness_secs),
    ));
    info!(
        "Dashboard cache ready (freshness window {}h)",
        cache.freshness().num_hours()
    );

    // Initialize sources and pages
    let registry = SourceRegistry::from_config(&config.sources)?;
    let dashboard = Arc::new(Dashboard::new(&registry, cache));

    let insights = match config.insights.as_ref() {
        Some(insights_config) => {
            info!(
                "🧠 Insights enabled (endpoint: {}, model: {})",
                insights_config.url, insights_config.model
            );
            Some(Arc::new(InsightClient::new(insights_config)?))
        }
        None => {
            info!("Insights are disabled - set INSIGHTS_URL to enable them");
            None
        }
    };

    let api_router = api::create_api_router(dashboard, insights, &config.cors);

    // Start API server
    let api_addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("🚀 API server listening on http://{}", api_addr);
    info!("   - Dashboards available at http://{}/api/dashboard/{{page}}", api_addr);

    axum::serve(api_listener, api_router).await?;

    Ok(())
}
