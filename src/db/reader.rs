use async_trait::async_trait;
use tracing::warn;

use crate::db::models::{IdeaRow, SaleRow};
use crate::error::{AppError, Result};
use crate::source::RecordSource;
use crate::types::{Idea, RecordBatch, Sale, TimeRange};

const IDEA_COLUMNS: &str = "SELECT id, user_id, title, category, price, created_at FROM ideas";
const SALE_COLUMNS: &str = "SELECT id, idea_id, seller_id, amount, created_at FROM sales";

/// Record source backed by the marketplace SQLite database.
/// Every query failure surfaces as `DataUnavailable`.
pub struct SqliteRecordSource {
    pool: sqlx::SqlitePool,
}

impl SqliteRecordSource {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

fn into_batch(idea_rows: Vec<IdeaRow>, sale_rows: Vec<SaleRow>) -> Result<RecordBatch> {
    let ideas = idea_rows
        .into_iter()
        .map(Idea::try_from)
        .collect::<Result<Vec<_>>>()?;
    let sales = sale_rows
        .into_iter()
        .map(Sale::try_from)
        .collect::<Result<Vec<_>>>()?;
    Ok(RecordBatch { ideas, sales })
}

fn unavailable(e: sqlx::Error) -> AppError {
    warn!("Record source query failed: {e}");
    AppError::DataUnavailable(e.to_string())
}

#[async_trait]
impl RecordSource for SqliteRecordSource {
    async fn fetch_records(&self, owner_id: &str, range: &TimeRange) -> Result<RecordBatch> {
        let start = range.start.timestamp_millis();
        let end = range.end.timestamp_millis();

        let ideas_sql = format!(
            "{IDEA_COLUMNS} WHERE user_id = ? AND created_at BETWEEN ? AND ? ORDER BY created_at"
        );
        let sales_sql = format!(
            "{SALE_COLUMNS} WHERE seller_id = ? AND created_at BETWEEN ? AND ? ORDER BY created_at"
        );

        let (idea_rows, sale_rows) = tokio::try_join!(
            sqlx::query_as::<_, IdeaRow>(&ideas_sql)
                .bind(owner_id)
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool),
            sqlx::query_as::<_, SaleRow>(&sales_sql)
                .bind(owner_id)
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool),
        )
        .map_err(unavailable)?;

        into_batch(idea_rows, sale_rows)
    }

    async fn fetch_platform_records(&self, range: &TimeRange) -> Result<RecordBatch> {
        let start = range.start.timestamp_millis();
        let end = range.end.timestamp_millis();

        let ideas_sql = format!("{IDEA_COLUMNS} WHERE created_at BETWEEN ? AND ? ORDER BY created_at");
        let sales_sql = format!("{SALE_COLUMNS} WHERE created_at BETWEEN ? AND ? ORDER BY created_at");

        let (idea_rows, sale_rows) = tokio::try_join!(
            sqlx::query_as::<_, IdeaRow>(&ideas_sql)
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool),
            sqlx::query_as::<_, SaleRow>(&sales_sql)
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool),
        )
        .map_err(unavailable)?;

        into_batch(idea_rows, sale_rows)
    }

    async fn is_available(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
