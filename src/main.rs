mod analytics;
mod api;
mod config;
mod db;
mod error;
mod source;
mod state;
mod types;

use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::analytics::ReportAssembler;
use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::api::routes::{router, ApiState};
use crate::config::{Config, SourceKind, DB_ACQUIRE_TIMEOUT_SECS, DB_MAX_CONNECTIONS};
use crate::db::SqliteRecordSource;
use crate::error::Result;
use crate::source::RecordSource;
use crate::state::RecordStore;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Record source ---
    let source = build_source(&cfg).await?;
    if !source.is_available().await {
        warn!("Record source '{}' is not answering; reports will fail until it does", cfg.record_source);
    }

    // --- Shared API state ---
    let api_state = ApiState {
        assembler: Arc::new(ReportAssembler::new(source)),
        health: Arc::new(HealthState::new()),
        latency: Arc::new(LatencyStats::new()?),
        report_years: cfg.report_years,
    };
    info!(
        record_source = %cfg.record_source,
        report_years = cfg.report_years,
        "Analytics ready"
    );

    // --- HTTP API server ---
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_source(cfg: &Config) -> Result<Arc<dyn RecordSource>> {
    match cfg.record_source {
        SourceKind::Sqlite => {
            let pool = SqlitePoolOptions::new()
                .max_connections(DB_MAX_CONNECTIONS)
                .acquire_timeout(Duration::from_secs(DB_ACQUIRE_TIMEOUT_SECS))
                .connect(&format!("sqlite:{}?mode=rwc", cfg.db_path))
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Database ready at {}", cfg.db_path);
            Ok(Arc::new(SqliteRecordSource::new(pool)))
        }
        SourceKind::Memory => {
            let store: Arc<dyn RecordSource> = match &cfg.seed_path {
                Some(path) => RecordStore::from_seed_file(path)?,
                None => {
                    warn!("SEED_PATH not set; in-memory record source starts empty");
                    RecordStore::new()
                }
            };
            Ok(store)
        }
    }
}
