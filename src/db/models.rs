/// Row types for the `ideas` and `sales` tables (see migrations/).
/// Timestamps are Unix epoch milliseconds.
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::types::{Idea, Sale};

#[derive(Debug, sqlx::FromRow)]
pub struct IdeaRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub category: String,
    pub price: f64,
    pub created_at: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub struct SaleRow {
    pub id: String,
    pub idea_id: String,
    pub seller_id: String,
    pub amount: f64,
    pub created_at: i64,
}

fn timestamp(table: &str, id: &str, ms: i64) -> Result<DateTime<Utc>, AppError> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        AppError::DataUnavailable(format!("{table} row {id} has invalid created_at {ms}"))
    })
}

impl TryFrom<IdeaRow> for Idea {
    type Error = AppError;

    fn try_from(row: IdeaRow) -> Result<Self, Self::Error> {
        let created_at = timestamp("ideas", &row.id, row.created_at)?;
        Ok(Idea {
            id: row.id,
            owner_id: row.user_id,
            title: row.title,
            category: row.category,
            price: row.price,
            created_at,
        })
    }
}

impl TryFrom<SaleRow> for Sale {
    type Error = AppError;

    fn try_from(row: SaleRow) -> Result<Self, Self::Error> {
        let created_at = timestamp("sales", &row.id, row.created_at)?;
        Ok(Sale {
            id: row.id,
            idea_id: row.idea_id,
            seller_id: row.seller_id,
            amount: row.amount,
            created_at,
        })
    }
}
