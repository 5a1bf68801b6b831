use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use futures_util::future::try_join_all;
use serde::Serialize;
use tracing::{debug, warn};

use crate::analytics::aggregator::{aggregate, summarize};
use crate::analytics::window::{validate_year_count, window_years};
use crate::error::{AppError, Result};
use crate::source::RecordSource;
use crate::types::{Idea, MonthBucket, Sale, TimeRange, Totals, YearReport};

/// One `YearReport` per year of the window, oldest first, all drawn from the
/// same record set. `years_back` must be in `1..=MAX_REPORT_YEARS`.
pub fn build_report(
    reference_year: i32,
    years_back: i32,
    ideas: &[Idea],
    sales: &[Sale],
) -> Result<Vec<YearReport>> {
    validate_year_count(years_back)?;
    Ok(window_years(reference_year, years_back)?
        .into_iter()
        .map(|year| aggregate(year, ideas, sales))
        .collect())
}

#[derive(Debug, Clone, Serialize)]
pub struct YearlyDetail {
    #[serde(flatten)]
    pub report: YearReport,
    /// The year's ideas, oldest first.
    pub ideas: Vec<Idea>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    /// All-time totals for the owner.
    #[serde(flatten)]
    pub totals: Totals,
    pub year: i32,
    /// Breakdown of `year`.
    pub monthly: [MonthBucket; 12],
}

/// Pulls records from the injected source and turns them into reports.
pub struct ReportAssembler {
    source: Arc<dyn RecordSource>,
}

impl ReportAssembler {
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self { source }
    }

    /// Multi-year report for one owner. Years are fetched concurrently; the
    /// first fetch failure fails the whole report.
    pub async fn assemble(
        &self,
        owner_id: &str,
        reference_year: i32,
        years_back: i32,
    ) -> Result<Vec<YearReport>> {
        validate_year_count(years_back)?;
        let years = window_years(reference_year, years_back)?;
        let ranges = years
            .iter()
            .map(|&year| TimeRange::calendar_year(year).map(|range| (year, range)))
            .collect::<Result<Vec<_>>>()?;

        debug!(owner_id, reference_year, years_back, "assembling report");

        let fetches = ranges.iter().map(|(year, range)| async move {
            let batch = self.source.fetch_records(owner_id, range).await?;
            debug!(
                owner_id,
                year,
                ideas = batch.ideas.len(),
                sales = batch.sales.len(),
                "fetched year"
            );
            Ok::<_, AppError>(aggregate(*year, &batch.ideas, &batch.sales))
        });

        try_join_all(fetches).await.inspect_err(|e| {
            warn!(owner_id, reference_year, "report aborted: {e}");
        })
    }

    pub async fn yearly(&self, owner_id: &str, year: i32) -> Result<YearlyDetail> {
        let range = TimeRange::calendar_year(year)?;
        let batch = self.source.fetch_records(owner_id, &range).await?;
        let report = aggregate(year, &batch.ideas, &batch.sales);

        let mut ideas: Vec<Idea> = batch
            .ideas
            .into_iter()
            .filter(|i| i.created_at.year() == year)
            .collect();
        ideas.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(YearlyDetail { report, ideas })
    }

    pub async fn overview(&self, owner_id: &str, now: DateTime<Utc>) -> Result<Overview> {
        let batch = self
            .source
            .fetch_records(owner_id, &TimeRange::all_time())
            .await?;
        let year = now.year();
        let current = aggregate(year, &batch.ideas, &batch.sales);

        Ok(Overview {
            totals: summarize(&batch.ideas, &batch.sales),
            year,
            monthly: current.monthly,
        })
    }

    pub async fn platform(&self) -> Result<Totals> {
        let batch = self
            .source
            .fetch_platform_records(&TimeRange::all_time())
            .await?;
        Ok(summarize(&batch.ideas, &batch.sales))
    }

    pub async fn source_available(&self) -> bool {
        self.source.is_available().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;
    use crate::state::RecordStore;
    use crate::types::RecordBatch;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn idea(id: &str, owner: &str, category: &str, price: f64, created_at: DateTime<Utc>) -> Idea {
        Idea {
            id: id.to_string(),
            owner_id: owner.to_string(),
            title: format!("Idea {id}"),
            category: category.to_string(),
            price,
            created_at,
        }
    }

    fn sale(id: &str, seller: &str, amount: f64, created_at: DateTime<Utc>) -> Sale {
        Sale {
            id: id.to_string(),
            idea_id: "i1".to_string(),
            seller_id: seller.to_string(),
            amount,
            created_at,
        }
    }

    fn seeded_store() -> Arc<RecordStore> {
        let store = RecordStore::new();
        store.load(RecordBatch {
            ideas: vec![
                idea("i1", "alice", "tech", 10.0, at(2022, 2, 1)),
                idea("i2", "alice", "tech", 20.0, at(2024, 3, 5)),
                idea("i3", "alice", "health", 5.0, at(2024, 1, 10)),
                idea("i4", "bob", "tech", 50.0, at(2024, 3, 5)),
            ],
            sales: vec![
                sale("s1", "alice", 10.0, at(2023, 8, 1)),
                sale("s2", "alice", 5.0, at(2024, 11, 2)),
                sale("s3", "bob", 40.0, at(2024, 4, 1)),
            ],
        });
        store
    }

    /// Fails every fetch for one year and counts calls.
    struct FlakySource {
        inner: Arc<RecordStore>,
        failing_year: i32,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RecordSource for FlakySource {
        async fn fetch_records(&self, owner_id: &str, range: &TimeRange) -> Result<RecordBatch> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if range.start.year() == self.failing_year {
                return Err(AppError::DataUnavailable("replica offline".into()));
            }
            self.inner.fetch_records(owner_id, range).await
        }

        async fn fetch_platform_records(&self, range: &TimeRange) -> Result<RecordBatch> {
            self.inner.fetch_platform_records(range).await
        }
    }

    #[test]
    fn build_report_covers_window_in_order() {
        let ideas = vec![
            idea("a", "alice", "tech", 1.0, at(2022, 5, 5)),
            idea("b", "alice", "tech", 1.0, at(2024, 5, 5)),
            idea("c", "alice", "art", 1.0, at(2024, 6, 5)),
        ];
        let reports = build_report(2024, 3, &ideas, &[]).unwrap();
        let years: Vec<i32> = reports.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2022, 2023, 2024]);
        assert_eq!(reports[0].idea_count, 1);
        assert_eq!(reports[1].idea_count, 0);
        assert_eq!(reports[2].idea_count, 2);
    }

    #[test]
    fn build_report_rejects_empty_window() {
        assert!(matches!(
            build_report(2024, 0, &[], &[]),
            Err(AppError::InvalidRange(_))
        ));
    }

    #[test]
    fn build_report_rejects_oversized_window() {
        assert!(matches!(
            build_report(2024, i32::MAX, &[], &[]),
            Err(AppError::InvalidRange(_))
        ));
        assert_eq!(
            build_report(2024, crate::config::MAX_REPORT_YEARS, &[], &[])
                .unwrap()
                .len(),
            crate::config::MAX_REPORT_YEARS as usize
        );
    }

    #[tokio::test]
    async fn assemble_reports_each_year_for_owner_only() {
        let assembler = ReportAssembler::new(seeded_store());
        let reports = assembler.assemble("alice", 2024, 3).await.unwrap();

        let years: Vec<i32> = reports.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2022, 2023, 2024]);

        assert_eq!(reports[0].idea_count, 1);
        assert_eq!(reports[0].total_revenue, 0.0);
        assert_eq!(reports[1].idea_count, 0);
        assert_eq!(reports[1].total_revenue, 10.0);
        assert_eq!(reports[1].bucket(8).unwrap().sale_count, 1);
        assert_eq!(reports[2].idea_count, 2);
        assert_eq!(reports[2].total_revenue, 5.0);
        assert_eq!(reports[2].category_counts.get("tech"), 1);
        assert_eq!(reports[2].category_counts.get("health"), 1);
    }

    #[tokio::test]
    async fn assemble_for_unknown_owner_is_all_zero() {
        let assembler = ReportAssembler::new(seeded_store());
        let reports = assembler.assemble("carol", 2024, 2).await.unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.idea_count == 0 && r.sale_count == 0));
    }

    #[tokio::test]
    async fn one_failed_year_aborts_the_whole_report() {
        let source = Arc::new(FlakySource {
            inner: seeded_store(),
            failing_year: 2023,
            calls: AtomicUsize::new(0),
        });
        let assembler = ReportAssembler::new(source);
        let err = assembler.assemble("alice", 2024, 3).await.unwrap_err();
        assert!(matches!(err, AppError::DataUnavailable(ref msg) if msg == "replica offline"));
    }

    #[tokio::test]
    async fn invalid_window_never_reaches_the_source() {
        let source = Arc::new(FlakySource {
            inner: seeded_store(),
            failing_year: 0,
            calls: AtomicUsize::new(0),
        });
        let assembler = ReportAssembler::new(source.clone());
        let err = assembler.assemble("alice", 2024, 0).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRange(_)));
        let err = assembler.assemble("alice", 2024, i32::MAX).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRange(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn yearly_lists_ideas_oldest_first() {
        let assembler = ReportAssembler::new(seeded_store());
        let detail = assembler.yearly("alice", 2024).await.unwrap();
        assert_eq!(detail.report.year, 2024);
        let ids: Vec<&str> = detail.ideas.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["i3", "i2"]);
    }

    #[tokio::test]
    async fn overview_combines_all_time_totals_with_current_year() {
        let assembler = ReportAssembler::new(seeded_store());
        let overview = assembler.overview("alice", at(2024, 12, 1)).await.unwrap();
        assert_eq!(overview.year, 2024);
        assert_eq!(overview.totals.idea_count, 3);
        assert_eq!(overview.totals.sale_count, 2);
        assert_eq!(overview.totals.total_revenue, 15.0);
        assert_eq!(overview.monthly[2].idea_count, 1);
        assert_eq!(overview.monthly[10].revenue, 5.0);
        assert_eq!(overview.monthly[7].sale_count, 0);
    }

    #[tokio::test]
    async fn platform_totals_span_every_owner() {
        let assembler = ReportAssembler::new(seeded_store());
        let totals = assembler.platform().await.unwrap();
        assert_eq!(totals.idea_count, 4);
        assert_eq!(totals.sale_count, 3);
        assert_eq!(totals.total_revenue, 55.0);
        assert_eq!(totals.category_counts.get("tech"), 3);
    }

    #[test]
    fn yearly_detail_serializes_flat() {
        let detail = YearlyDetail {
            report: YearReport::empty(2024),
            ideas: Vec::new(),
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["year"], 2024);
        assert_eq!(json["monthly"].as_array().unwrap().len(), 12);
        assert_eq!(json["monthly"][0]["label"], "Jan");
        assert!(json["ideas"].as_array().unwrap().is_empty());
    }
}
