use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::info;

use crate::error::Result;
use crate::source::RecordSource;
use crate::types::{Idea, RecordBatch, Sale, TimeRange};

// ---------------------------------------------------------------------------
// RecordStore
// ---------------------------------------------------------------------------

/// In-memory record source, sharded by owner so concurrent year fetches do
/// not contend on a single lock.
pub struct RecordStore {
    /// owner_id → ideas listed by that owner
    ideas: DashMap<String, Vec<Idea>>,
    /// seller_id → sales made by that seller
    sales: DashMap<String, Vec<Sale>>,
}

impl RecordStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ideas: DashMap::new(),
            sales: DashMap::new(),
        })
    }

    /// Load a `{"ideas": [...], "sales": [...]}` JSON file.
    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Arc<Self>> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let batch: RecordBatch = serde_json::from_str(&raw)?;
        batch.validate()?;
        let store = Self::new();
        store.load(batch);
        info!(
            path = %path.display(),
            ideas = store.idea_count(),
            sales = store.sale_count(),
            "Seeded in-memory record store"
        );
        Ok(store)
    }

    pub fn load(&self, batch: RecordBatch) {
        for idea in batch.ideas {
            self.add_idea(idea);
        }
        for sale in batch.sales {
            self.add_sale(sale);
        }
    }

    pub fn add_idea(&self, idea: Idea) {
        self.ideas.entry(idea.owner_id.clone()).or_default().push(idea);
    }

    pub fn add_sale(&self, sale: Sale) {
        self.sales.entry(sale.seller_id.clone()).or_default().push(sale);
    }

    pub fn idea_count(&self) -> usize {
        self.ideas.iter().map(|e| e.value().len()).sum()
    }

    pub fn sale_count(&self) -> usize {
        self.sales.iter().map(|e| e.value().len()).sum()
    }
}

#[async_trait]
impl RecordSource for RecordStore {
    async fn fetch_records(&self, owner_id: &str, range: &TimeRange) -> Result<RecordBatch> {
        let ideas: Vec<Idea> = self
            .ideas
            .get(owner_id)
            .map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|i| range.contains(&i.created_at))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let sales: Vec<Sale> = self
            .sales
            .get(owner_id)
            .map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|s| range.contains(&s.created_at))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(RecordBatch { ideas, sales })
    }

    async fn fetch_platform_records(&self, range: &TimeRange) -> Result<RecordBatch> {
        let ideas: Vec<Idea> = self
            .ideas
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|i| range.contains(&i.created_at))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        let sales: Vec<Sale> = self
            .sales
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|s| range.contains(&s.created_at))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        Ok(RecordBatch { ideas, sales })
    }
}
