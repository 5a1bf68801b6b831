use std::collections::BTreeMap;

use serde::Deserialize;

// ---------------------------------------------------------------------------
// API response types (mirror the analytics server's JSON)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct MonthResponse {
    pub month: u32,
    pub label: String,
    pub idea_count: u64,
    pub revenue: f64,
    pub sale_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct YearReportResponse {
    pub year: i32,
    pub idea_count: u64,
    pub total_revenue: f64,
    pub sale_count: u64,
    #[serde(default)]
    pub listed_value: f64,
    #[serde(default)]
    pub category_counts: BTreeMap<String, u64>,
    pub monthly: Vec<MonthResponse>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(dead_code)]
pub struct HealthResponse {
    pub status: Option<String>,
    pub source_available: Option<bool>,
    pub reports_served: Option<u64>,
    pub source_failures: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(dead_code)]
pub struct LatencyResponse {
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub sample_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: String,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

/// One row of the category distribution panel.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryShare {
    pub category: String,
    pub count: u64,
    /// 0.0..=100.0
    pub percent: f64,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    /// Oldest year first, as served.
    pub reports: Vec<YearReportResponse>,
    /// Index into `reports`.
    pub selected: Option<usize>,
    pub health: HealthResponse,
    pub latency: LatencyResponse,
    pub last_refresh: std::time::Instant,
    pub base_url: String,
    pub owner_id: String,
    pub years: i32,
}

impl AppState {
    pub fn new(base_url: String, owner_id: String, years: i32) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            reports: Vec::new(),
            selected: None,
            health: HealthResponse::default(),
            latency: LatencyResponse::default(),
            last_refresh: std::time::Instant::now(),
            base_url,
            owner_id,
            years,
        }
    }

    /// Report endpoint for the owner, with the id encoded as one path segment.
    pub fn report_url(&self) -> Result<reqwest::Url, String> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| format!("bad API_URL: {e}"))?;
        url.path_segments_mut()
            .map_err(|_| format!("bad API_URL: {} cannot take a path", self.base_url))?
            .pop_if_empty()
            .extend(["api", "analytics", "users", self.owner_id.as_str(), "report"]);
        url.query_pairs_mut()
            .append_pair("years", &self.years.to_string());
        Ok(url)
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let report_url = match self.report_url() {
            Ok(url) => url,
            Err(e) => {
                self.status = ConnectionStatus::Error(e);
                return;
            }
        };
        let base = self.base_url.trim_end_matches('/');
        let health_url = format!("{base}/api/health");
        let latency_url = format!("{base}/api/stats/latency");

        let (report_res, health_res, latency_res) = tokio::join!(
            client.get(report_url).send(),
            client.get(&health_url).send(),
            client.get(&latency_url).send(),
        );

        let resp = match report_res {
            Ok(r) => r,
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };

        if !resp.status().is_success() {
            let code = resp.status();
            let msg = match resp.json::<ErrorResponse>().await {
                Ok(body) => body.error,
                Err(_) => code.to_string(),
            };
            self.status = ConnectionStatus::Error(format!("{}: {msg}", code.as_u16()));
            return;
        }

        match resp.json::<Vec<YearReportResponse>>().await {
            Ok(reports) => {
                self.set_reports(reports);
                self.status = ConnectionStatus::Connected;
                self.last_refresh = std::time::Instant::now();
            }
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("parse error: {e}"));
                return;
            }
        }

        if let Ok(h) = health_res {
            if let Ok(health) = h.json::<HealthResponse>().await {
                self.health = health;
            }
        }
        if let Ok(l) = latency_res {
            if let Ok(latency) = l.json::<LatencyResponse>().await {
                self.latency = latency;
            }
        }
    }

    /// Replace the reports, keeping the selected year when it is still present
    /// and defaulting to the newest year otherwise.
    pub fn set_reports(&mut self, reports: Vec<YearReportResponse>) {
        let previous_year = self.selected_report().map(|r| r.year);
        self.reports = reports;
        self.selected = previous_year
            .and_then(|y| self.reports.iter().position(|r| r.year == y))
            .or_else(|| self.reports.len().checked_sub(1));
    }

    pub fn selected_report(&self) -> Option<&YearReportResponse> {
        self.selected.and_then(|i| self.reports.get(i))
    }

    pub fn select_next_year(&mut self) {
        let Some(max) = self.reports.len().checked_sub(1) else {
            return;
        };
        self.selected = Some(self.selected.map_or(max, |i| (i + 1).min(max)));
    }

    pub fn select_prev_year(&mut self) {
        if self.reports.is_empty() {
            return;
        }
        self.selected = Some(self.selected.map_or(0, |i| i.saturating_sub(1)));
    }

    pub fn total_ideas(&self) -> u64 {
        self.reports.iter().map(|r| r.idea_count).sum()
    }

    pub fn total_revenue(&self) -> f64 {
        self.reports.iter().map(|r| r.total_revenue).sum()
    }

    pub fn category_shares(&self) -> Vec<CategoryShare> {
        category_shares(&self.reports)
    }
}

/// Category counts summed over every year, largest first (ties by name).
pub fn category_shares(reports: &[YearReportResponse]) -> Vec<CategoryShare> {
    let mut merged: BTreeMap<&str, u64> = BTreeMap::new();
    for report in reports {
        for (category, count) in &report.category_counts {
            *merged.entry(category.as_str()).or_insert(0) += count;
        }
    }

    let total: u64 = merged.values().sum();
    let mut shares: Vec<CategoryShare> = merged
        .into_iter()
        .map(|(category, count)| CategoryShare {
            category: category.to_string(),
            count,
            percent: if total == 0 {
                0.0
            } else {
                count as f64 * 100.0 / total as f64
            },
        })
        .collect();
    shares.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
    shares
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

pub fn format_money(v: f64) -> String {
    if v.abs() >= 1_000_000.0 {
        format!("${:.2}M", v / 1_000_000.0)
    } else if v.abs() >= 10_000.0 {
        format!("${:.1}k", v / 1_000.0)
    } else {
        format!("${v:.2}")
    }
}

pub fn format_latency(ms: Option<f64>) -> String {
    match ms {
        Some(d) if d >= 1000.0 => format!("{:.1}s", d / 1000.0),
        Some(d) => format!("{d:.1}ms"),
        None => "—".to_string(),
    }
}

pub fn category_label(category: &str) -> &str {
    if category.is_empty() {
        "(none)"
    } else {
        category
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}
