//! ops-commander server entry point.
//!
//! Starts the Axum HTTP server and logs every tracker notice.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use ops_commander::api;
use ops_commander::app_state::AppState;
use ops_commander::census::CensusLookup;
use ops_commander::config::TrackerConfig;
use ops_commander::domain::NoticeBus;
use ops_commander::lookup::{CachedLookup, EntityLookup, StaticLookup};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = TrackerConfig::from_env()?;
    tracing::info!(
        addr = %config.listen_addr,
        world_id = config.world_id.0,
        home_faction = %config.home_faction,
        "starting ops-commander"
    );

    // Entity lookups are cached for the lifetime of the process
    let census: Arc<dyn EntityLookup> = match &config.census_service_id {
        Some(service_id) => {
            tracing::info!(base_url = %config.census_base_url, "using census lookups");
            Arc::new(CensusLookup::new(&config.census_base_url, service_id)?)
        }
        None => {
            tracing::warn!(
                "PS2_SERVICE_ID not set; presence checks, death allegiance and facility names are disabled"
            );
            Arc::new(StaticLookup::new())
        }
    };
    let lookup: Arc<dyn EntityLookup> = Arc::new(CachedLookup::new(census));

    // Build application state
    let app_state = AppState::new(&config, lookup);
    app_state.continents.subscribe(&app_state.feed).await;
    tokio::spawn(log_notices(app_state.notices.clone()));

    // Build router
    let app = api::build_router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn log_notices(notices: NoticeBus) {
    let mut rx = notices.subscribe();
    loop {
        match rx.recv().await {
            Ok(notice) => {
                let body = serde_json::to_string(&notice).unwrap_or_default();
                tracing::info!(
                    notice = notice.notice_type_str(),
                    operation_id = ?notice.operation_id(),
                    %body,
                    "tracker notice"
                );
            }
            Err(RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "notice logger lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
