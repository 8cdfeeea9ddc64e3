//! Stat record persistence.
//!
//! The core only needs two operations from a store: append records, and read them back
//! for one tournament newest first. Two implementations ship with the crate:
//! - `MemoryStatStore`: process-local, for tests and throwaway servers
//! - `JsonlStatStore`: one JSON Lines file per tournament under a data directory

mod jsonl;
mod memory;

pub use jsonl::JsonlStatStore;
pub use memory::MemoryStatStore;

use crate::models::{StatRecord, TimeRange, TournamentId};
use async_trait::async_trait;
use thiserror::Error;

/// Default number of records per page.
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid page cursor: {0}")]
    InvalidCursor(String),

    #[error("Invalid tournament id for storage: {0}")]
    InvalidKey(String),
}

/// Which records to read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatQuery {
    pub tournament_id: TournamentId,
    pub range: TimeRange,
    pub page_size: usize,
}

impl StatQuery {
    pub fn new(tournament_id: impl Into<TournamentId>) -> Self {
        Self {
            tournament_id: tournament_id.into(),
            range: TimeRange::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_range(mut self, range: TimeRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

/// One page of query results.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatPage {
    pub records: Vec<StatRecord>,
    /// Pass back to fetch the next page; `None` on the last page.
    pub next_cursor: Option<String>,
}

/// Keyed, append-only store of stat records.
#[async_trait]
pub trait StatStore: Send + Sync {
    /// Append records. Each record is durable on its own; no cross-record transaction.
    async fn append_stat_records(&self, records: &[StatRecord]) -> Result<(), StoreError>;

    /// Records of one tournament within `query.range`.
    ///
    /// Ordering contract: across all pages of one query, records come strictly in
    /// `created_at` descending order (newest first). Ties keep reverse append order.
    /// The aggregator relies on this and rejects pages that break it.
    ///
    /// A query reads a snapshot: records appended after its first page are not returned
    /// by its later pages, and nothing already returned is repeated.
    async fn query_stat_records(
        &self,
        query: &StatQuery,
        cursor: Option<&str>,
    ) -> Result<StatPage, StoreError>;
}

/// Page position: `<snapshot>.<offset>`.
///
/// `snapshot` is how many records had been appended when the first page was served.
/// Later pages only look at that prefix, so appends made mid-read never shift offsets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PageCursor {
    snapshot: usize,
    offset: usize,
}

impl PageCursor {
    fn parse(raw: &str) -> Result<Self, StoreError> {
        let invalid = || StoreError::InvalidCursor(raw.to_string());
        let (snapshot, offset) = raw.split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            snapshot: snapshot.parse().map_err(|_| invalid())?,
            offset: offset.parse().map_err(|_| invalid())?,
        })
    }

    fn encode(&self) -> String {
        format!("{}.{}", self.snapshot, self.offset)
    }
}

/// Order `appended` (oldest append first) newest first, then cut out the page at `cursor`.
///
/// `appended` must be the store's full append log for the tournament; the store only
/// ever grows it at the end.
pub(crate) fn newest_first_page(
    mut appended: Vec<StatRecord>,
    query: &StatQuery,
    cursor: Option<&str>,
) -> Result<StatPage, StoreError> {
    let position = match cursor {
        Some(c) => {
            let position = PageCursor::parse(c)?;
            if position.snapshot > appended.len() {
                return Err(StoreError::InvalidCursor(c.to_string()));
            }
            position
        }
        None => PageCursor {
            snapshot: appended.len(),
            offset: 0,
        },
    };

    appended.truncate(position.snapshot);
    appended.retain(|r| r.tournament_id == query.tournament_id && query.range.contains(r.created_at));
    appended.reverse();
    appended.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let page_size = query.page_size.max(1);
    let total = appended.len();
    let records: Vec<StatRecord> = appended
        .into_iter()
        .skip(position.offset)
        .take(page_size)
        .collect();
    let end = position.offset + records.len();
    let next_cursor = (end < total).then(|| {
        PageCursor {
            snapshot: position.snapshot,
            offset: end,
        }
        .encode()
    });
    Ok(StatPage {
        records,
        next_cursor,
    })
}
