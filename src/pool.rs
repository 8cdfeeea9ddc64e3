//! Candidate pools from CSV: `id,name,media` with a header row.
//!
//! Media references are classified once here; nothing downstream re-inspects the URL.

use crate::models::{Candidate, CandidatePool, Media, TournamentId};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("duplicate candidate id {0}")]
    DuplicateId(String),

    #[error("row {row}: {field} is empty")]
    EmptyField { row: usize, field: &'static str },
}

#[derive(Deserialize)]
struct PoolRow {
    id: String,
    name: String,
    media: String,
}

/// Parse a pool from CSV.
pub fn read_pool<R: Read>(reader: R) -> Result<CandidatePool, PoolError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for (i, row) in rdr.deserialize::<PoolRow>().enumerate() {
        let row = row?;
        let line = i + 2;
        if row.id.is_empty() {
            return Err(PoolError::EmptyField { row: line, field: "id" });
        }
        if row.media.is_empty() {
            return Err(PoolError::EmptyField { row: line, field: "media" });
        }
        if !seen.insert(row.id.clone()) {
            return Err(PoolError::DuplicateId(row.id));
        }
        let name = if row.name.is_empty() {
            row.id.clone()
        } else {
            row.name
        };
        candidates.push(Candidate::new(row.id, name, Media::classify(row.media)));
    }
    Ok(CandidatePool::new(candidates))
}

pub fn load_pool_file(path: &Path) -> Result<CandidatePool, PoolError> {
    let file = std::fs::File::open(path)?;
    read_pool(file)
}

/// Every tournament's pool, keyed by tournament id.
#[derive(Clone, Debug, Default)]
pub struct PoolCatalog {
    pools: BTreeMap<TournamentId, CandidatePool>,
}

impl PoolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `<tournament_id>.csv` for every CSV file in `dir`. Unreadable files are skipped with a warning.
    pub fn load_dir(dir: &Path) -> Result<Self, PoolError> {
        let mut catalog = Self::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match load_pool_file(&path) {
                Ok(pool) => {
                    log::info!("Loaded pool {} ({} candidates)", id, pool.len());
                    catalog.insert(id, pool);
                }
                Err(e) => log::warn!("Skipping pool file {:?}: {}", path, e),
            }
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, tournament_id: impl Into<TournamentId>, pool: CandidatePool) {
        self.pools.insert(tournament_id.into(), pool);
    }

    pub fn get(&self, tournament_id: &str) -> Option<&CandidatePool> {
        self.pools.get(tournament_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TournamentId, &CandidatePool)> {
        self.pools.iter()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}
