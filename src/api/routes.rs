use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::report::{Overview, ReportAssembler, YearlyDetail};
use crate::analytics::window::{validate_report_year, validate_year_count};
use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::error::{AppError, Result};
use crate::types::{Totals, YearReport};

#[derive(Clone)]
pub struct ApiState {
    pub assembler: Arc<ReportAssembler>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
    /// Year count used when a report request omits `years`.
    pub report_years: i32,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/health", get(get_health))
        .route("/api/stats/latency", get(get_stats_latency))
        .route("/api/analytics/platform", get(get_platform))
        .route("/api/analytics/users/:owner_id/report", get(get_report))
        .route("/api/analytics/users/:owner_id/yearly/:year", get(get_yearly))
        .route("/api/analytics/users/:owner_id/overview", get(get_overview))
        .fallback(not_found)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ReportQuery {
    /// Last year of the window; defaults to the current UTC year.
    pub year: Option<i32>,
    pub years: Option<i32>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub source_available: bool,
    pub reports_served: u64,
    pub source_failures: u64,
    pub last_report_at_ms: Option<u64>,
}

#[derive(Serialize)]
pub struct LatencyResponse {
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub sample_count: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_report(
    State(state): State<ApiState>,
    Path(owner_id): Path<String>,
    query: std::result::Result<Query<ReportQuery>, QueryRejection>,
) -> Result<Json<Vec<YearReport>>> {
    let Query(params) = query?;
    let reference_year = params.year.unwrap_or_else(|| Utc::now().year());
    let years = params.years.unwrap_or(state.report_years);
    validate_year_count(years)?;

    let reports = observe(
        &state,
        state.assembler.assemble(&owner_id, reference_year, years),
    )
    .await?;
    Ok(Json(reports))
}

async fn get_yearly(
    State(state): State<ApiState>,
    path: std::result::Result<Path<(String, i32)>, PathRejection>,
) -> Result<Json<YearlyDetail>> {
    let Path((owner_id, year)) =
        path.map_err(|_| AppError::BadRequest("year must be an integer".to_string()))?;
    validate_report_year(year, Utc::now().year())?;

    let detail = observe(&state, state.assembler.yearly(&owner_id, year)).await?;
    Ok(Json(detail))
}

async fn get_overview(
    State(state): State<ApiState>,
    Path(owner_id): Path<String>,
) -> Result<Json<Overview>> {
    let overview = observe(&state, state.assembler.overview(&owner_id, Utc::now())).await?;
    Ok(Json(overview))
}

async fn get_platform(State(state): State<ApiState>) -> Result<Json<Totals>> {
    let totals = observe(&state, state.assembler.platform()).await?;
    Ok(Json(totals))
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let last = state.health.last_report_at_ms();
    Json(HealthResponse {
        status: "OK",
        message: "Idea Marketplace analytics API is running",
        source_available: state.assembler.source_available().await,
        reports_served: state.health.reports_served(),
        source_failures: state.health.source_failures(),
        last_report_at_ms: (last > 0).then_some(last),
    })
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    let to_ms = |us: Option<u64>| us.map(|v| v as f64 / 1000.0);
    let (p50, p95, p99) = state.latency.percentiles();
    Json(LatencyResponse {
        p50_ms: to_ms(p50),
        p95_ms: to_ms(p95),
        p99_ms: to_ms(p99),
        sample_count: state.latency.len(),
    })
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Route not found" })),
    )
}

/// Time a report future and update the health counters with its outcome.
async fn observe<T>(state: &ApiState, fut: impl Future<Output = Result<T>>) -> Result<T> {
    let started = Instant::now();
    let result = fut.await;
    state.latency.record(started.elapsed());

    match &result {
        Ok(_) => state.health.record_report(now_ms()),
        Err(AppError::DataUnavailable(_)) => state.health.inc_source_failures(),
        Err(_) => {}
    }
    result
}

fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;
    use crate::source::RecordSource;
    use crate::state::RecordStore;
    use crate::types::{Idea, RecordBatch, Sale, TimeRange};

    /// Source whose backing store is down.
    struct OfflineSource;

    #[async_trait]
    impl RecordSource for OfflineSource {
        async fn fetch_records(&self, _owner_id: &str, _range: &TimeRange) -> Result<RecordBatch> {
            Err(AppError::DataUnavailable("connection refused".into()))
        }

        async fn fetch_platform_records(&self, _range: &TimeRange) -> Result<RecordBatch> {
            Err(AppError::DataUnavailable("connection refused".into()))
        }

        async fn is_available(&self) -> bool {
            false
        }
    }

    async fn spawn_app(source: Arc<dyn RecordSource>) -> String {
        let state = ApiState {
            assembler: Arc::new(ReportAssembler::new(source)),
            health: Arc::new(HealthState::new()),
            latency: Arc::new(LatencyStats::new().unwrap()),
            report_years: 3,
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn store() -> Arc<RecordStore> {
        let store = RecordStore::new();
        store.load(RecordBatch {
            ideas: vec![Idea {
                id: "i1".into(),
                owner_id: "alice".into(),
                title: "Compost courier".into(),
                category: "green".into(),
                price: 40.0,
                created_at: Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap(),
            }],
            sales: vec![Sale {
                id: "s1".into(),
                idea_id: "i1".into(),
                seller_id: "alice".into(),
                amount: 40.0,
                created_at: Utc.with_ymd_and_hms(2024, 4, 1, 10, 0, 0).unwrap(),
            }],
        });
        store
    }

    #[tokio::test]
    async fn report_defaults_to_configured_year_count() {
        let base = spawn_app(store()).await;
        let body: serde_json::Value = reqwest::get(format!(
            "{base}/api/analytics/users/alice/report?year=2024"
        ))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

        let years: Vec<i64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["year"].as_i64().unwrap())
            .collect();
        assert_eq!(years, vec![2022, 2023, 2024]);
        assert_eq!(body[2]["idea_count"], 1);
        assert_eq!(body[2]["total_revenue"], 40.0);
        assert_eq!(body[2]["category_counts"]["green"], 1);
        assert_eq!(body[2]["monthly"][3]["revenue"], 40.0);
    }

    #[tokio::test]
    async fn report_rejects_bad_year_counts() {
        let base = spawn_app(store()).await;
        for years in ["0", "-1", "11"] {
            let resp = reqwest::get(format!(
                "{base}/api/analytics/users/alice/report?year=2024&years={years}"
            ))
            .await
            .unwrap();
            assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST, "years={years}");
            let body: serde_json::Value = resp.json().await.unwrap();
            assert!(body["error"].as_str().unwrap().contains("years"));
        }
    }

    #[tokio::test]
    async fn yearly_validates_year_and_lists_ideas() {
        let base = spawn_app(store()).await;

        let resp = reqwest::get(format!("{base}/api/analytics/users/alice/yearly/2019"))
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

        let body: serde_json::Value =
            reqwest::get(format!("{base}/api/analytics/users/alice/yearly/2024"))
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
        assert_eq!(body["year"], 2024);
        assert_eq!(body["ideas"][0]["title"], "Compost courier");
        assert_eq!(body["monthly"][2]["label"], "Mar");
    }

    #[tokio::test]
    async fn platform_and_health_reflect_served_reports() {
        let base = spawn_app(store()).await;

        let totals: serde_json::Value = reqwest::get(format!("{base}/api/analytics/platform"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(totals["idea_count"], 1);
        assert_eq!(totals["sale_count"], 1);

        let health: serde_json::Value = reqwest::get(format!("{base}/api/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "OK");
        assert_eq!(health["source_available"], true);
        assert_eq!(health["reports_served"], 1);

        let latency: serde_json::Value = reqwest::get(format!("{base}/api/stats/latency"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(latency["sample_count"], 1);
    }

    #[tokio::test]
    async fn malformed_numbers_get_json_400() {
        let base = spawn_app(store()).await;
        for path in [
            "/api/analytics/users/alice/yearly/abc",
            "/api/analytics/users/alice/report?years=abc",
            "/api/analytics/users/alice/report?year=twenty",
        ] {
            let resp = reqwest::get(format!("{base}{path}")).await.unwrap();
            assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST, "{path}");
            let body: serde_json::Value = resp.json().await.unwrap();
            assert!(body["error"].is_string(), "{path}: {body}");
        }

        let body: serde_json::Value =
            reqwest::get(format!("{base}/api/analytics/users/alice/yearly/abc"))
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
        assert_eq!(body["error"], "Bad request: year must be an integer");
    }

    #[tokio::test]
    async fn source_failure_is_503_and_counted() {
        let base = spawn_app(Arc::new(OfflineSource)).await;

        let resp = reqwest::get(format!(
            "{base}/api/analytics/users/alice/report?year=2024"
        ))
        .await
        .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Record source unavailable: connection refused");

        let resp = reqwest::get(format!("{base}/api/analytics/platform"))
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);

        let health: serde_json::Value = reqwest::get(format!("{base}/api/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["source_failures"], 2);
        assert_eq!(health["reports_served"], 0);
        assert_eq!(health["source_available"], false);
        assert!(health["last_report_at_ms"].is_null());
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let base = spawn_app(store()).await;
        let resp = reqwest::get(format!("{base}/api/ideas")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Route not found");
    }
}
