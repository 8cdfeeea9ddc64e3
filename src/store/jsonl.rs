//! JSON Lines stat store: `<data_dir>/stats/<tournament_id>.jsonl`, one record per line.
//!
//! Lines are only ever appended, so file order is append order.

use super::{newest_first_page, StatPage, StatQuery, StatStore, StoreError};
use crate::models::StatRecord;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

pub struct JsonlStatStore {
    data_dir: PathBuf,
    /// Serializes appends so lines from concurrent writers never interleave.
    write_lock: Mutex<()>,
}

impl JsonlStatStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn stats_dir(&self) -> PathBuf {
        self.data_dir.join("stats")
    }

    /// File for one tournament. Ids that could escape the stats directory are rejected.
    pub fn path_for(&self, tournament_id: &str) -> Result<PathBuf, StoreError> {
        let safe = !tournament_id.is_empty()
            && tournament_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(StoreError::InvalidKey(tournament_id.to_string()));
        }
        Ok(self.stats_dir().join(format!("{}.jsonl", tournament_id)))
    }

    async fn read_all(path: &Path) -> Result<Vec<StatRecord>, StoreError> {
        let content = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StatRecord>(line) {
                Ok(r) => records.push(r),
                Err(e) => {
                    log::warn!("Failed to parse line {} in {:?}: {}", i + 1, path, e);
                }
            }
        }
        log::debug!("Read {} stat records from {:?}", records.len(), path);
        Ok(records)
    }
}

#[async_trait]
impl StatStore for JsonlStatStore {
    async fn append_stat_records(&self, records: &[StatRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut by_tournament: BTreeMap<&str, Vec<&StatRecord>> = BTreeMap::new();
        for r in records {
            by_tournament
                .entry(r.tournament_id.as_str())
                .or_default()
                .push(r);
        }

        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(self.stats_dir()).await?;
        for (tournament_id, batch) in by_tournament {
            let path = self.path_for(tournament_id)?;
            let mut buf = String::new();
            for r in &batch {
                buf.push_str(&serde_json::to_string(r)?);
                buf.push('\n');
            }
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await?;
            file.write_all(buf.as_bytes()).await?;
            file.sync_data().await?;
            log::info!("Appended {} stat records to {:?}", batch.len(), path);
        }
        Ok(())
    }

    async fn query_stat_records(
        &self,
        query: &StatQuery,
        cursor: Option<&str>,
    ) -> Result<StatPage, StoreError> {
        let path = self.path_for(&query.tournament_id)?;
        let appended = Self::read_all(&path).await?;
        newest_first_page(appended, query, cursor)
    }
}
