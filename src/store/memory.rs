//! In-process stat store.

use super::{newest_first_page, StatPage, StatQuery, StatStore, StoreError};
use crate::models::StatRecord;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Keeps every record in memory, in append order. Lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStatStore {
    records: RwLock<Vec<StatRecord>>,
}

impl MemoryStatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total records across all tournaments.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl StatStore for MemoryStatStore {
    async fn append_stat_records(&self, records: &[StatRecord]) -> Result<(), StoreError> {
        let mut guard = self.records.write().await;
        guard.extend_from_slice(records);
        log::debug!("Appended {} stat records in memory", records.len());
        Ok(())
    }

    async fn query_stat_records(
        &self,
        query: &StatQuery,
        cursor: Option<&str>,
    ) -> Result<StatPage, StoreError> {
        let snapshot: Vec<StatRecord> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.tournament_id == query.tournament_id)
            .cloned()
            .collect();
        newest_first_page(snapshot, query, cursor)
    }
}
