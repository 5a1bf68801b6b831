//! Record source boundary: where the analytics reporter gets its raw ideas and sales.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{RecordBatch, TimeRange};

/// Supplies raw records for a time range. Implementations report transport or
/// storage failures as `AppError::DataUnavailable`; callers never retry.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Ideas owned by `owner_id` and sales where `owner_id` is the seller,
    /// created inside `range` (inclusive on both ends).
    async fn fetch_records(&self, owner_id: &str, range: &TimeRange) -> Result<RecordBatch>;

    /// Every owner's ideas and sales created inside `range`.
    async fn fetch_platform_records(&self, range: &TimeRange) -> Result<RecordBatch>;

    async fn is_available(&self) -> bool {
        true
    }
}
