use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

// ---------------------------------------------------------------------------
// Marketplace records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub id: String,
    pub owner_id: String,
    #[serde(default)]
    pub title: String,
    /// Free-form; an empty string is a category of its own.
    #[serde(default)]
    pub category: String,
    /// Listing price, not a realized transaction.
    #[serde(default)]
    pub price: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    pub idea_id: String,
    pub seller_id: String,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

/// Raw records handed back by a record source for one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordBatch {
    #[serde(default)]
    pub ideas: Vec<Idea>,
    #[serde(default)]
    pub sales: Vec<Sale>,
}

impl RecordBatch {
    /// Prices and amounts must be finite and non-negative, matching the
    /// CHECK constraints on the SQLite tables.
    pub fn validate(&self) -> Result<()> {
        let bad = |v: f64| !v.is_finite() || v < 0.0;
        if let Some(idea) = self.ideas.iter().find(|i| bad(i.price)) {
            return Err(AppError::Config(format!(
                "idea {} has invalid price {}",
                idea.id, idea.price
            )));
        }
        if let Some(sale) = self.sales.iter().find(|s| bad(s.amount)) {
            return Err(AppError::Config(format!(
                "sale {} has invalid amount {}",
                sale.id, sale.amount
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Time ranges
// ---------------------------------------------------------------------------

/// Inclusive `[start, end]` interval in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// `year-01-01T00:00:00Z ..= year-12-31T23:59:59.999Z`.
    pub fn calendar_year(year: i32) -> Result<Self> {
        let start = Utc
            .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
            .single()
            .ok_or_else(|| AppError::InvalidRange(format!("year {year} is out of range")))?;
        let last_second = Utc
            .with_ymd_and_hms(year, 12, 31, 23, 59, 59)
            .single()
            .ok_or_else(|| AppError::InvalidRange(format!("year {year} is out of range")))?;
        Ok(Self {
            start,
            end: last_second + Duration::milliseconds(999),
        })
    }

    pub fn all_time() -> Self {
        Self {
            start: DateTime::<Utc>::MIN_UTC,
            end: DateTime::<Utc>::MAX_UTC,
        }
    }

    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        self.start <= *at && *at <= self.end
    }
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Idea counts keyed by the literal category string. Iteration is sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CategoryCounts(BTreeMap<String, u64>);

impl CategoryCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, category: &str) {
        *self.0.entry(category.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, category: &str) -> u64 {
        self.0.get(category).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthBucket {
    /// 1..=12
    pub month: u32,
    pub label: &'static str,
    pub idea_count: u64,
    pub revenue: f64,
    pub sale_count: u64,
}

impl MonthBucket {
    fn empty(month: u32) -> Self {
        Self {
            month,
            label: MONTH_LABELS[(month - 1) as usize],
            idea_count: 0,
            revenue: 0.0,
            sale_count: 0,
        }
    }

    /// All twelve months of a year, January first.
    pub fn year_of_buckets() -> [MonthBucket; 12] {
        std::array::from_fn(|i| MonthBucket::empty(i as u32 + 1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearReport {
    pub year: i32,
    pub idea_count: u64,
    /// Sum of sale amounts.
    pub total_revenue: f64,
    pub sale_count: u64,
    /// Sum of idea listing prices. Reported separately from revenue.
    pub listed_value: f64,
    pub category_counts: CategoryCounts,
    pub monthly: [MonthBucket; 12],
}

impl YearReport {
    pub fn empty(year: i32) -> Self {
        Self {
            year,
            idea_count: 0,
            total_revenue: 0.0,
            sale_count: 0,
            listed_value: 0.0,
            category_counts: CategoryCounts::new(),
            monthly: MonthBucket::year_of_buckets(),
        }
    }

    pub fn bucket(&self, month: u32) -> Option<&MonthBucket> {
        month
            .checked_sub(1)
            .and_then(|i| self.monthly.get(i as usize))
    }
}

/// Totals over an arbitrary record set, without any calendar breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub idea_count: u64,
    pub total_revenue: f64,
    pub sale_count: u64,
    pub listed_value: f64,
    pub category_counts: CategoryCounts,
}
