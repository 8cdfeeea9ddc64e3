//! Stat record writer: one finished run becomes one record per candidate that played.

use crate::models::{CandidateId, ParticipantId, StatRecord, WinnerResult};
use crate::store::{StatStore, StoreError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Writing a finished run failed.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The store could not take the records. Keep the WinnerResult and try again.
    #[error("stat store unavailable, keep the result and retry: {0}")]
    Store(#[from] StoreError),
    #[error("result for tournament {0} has no recorded matches")]
    EmptyHistory(String),
}

impl WriteError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, WriteError::Store(_))
    }
}

#[derive(Default)]
struct Tally {
    match_wins: u32,
    match_count: u32,
}

/// Per-candidate records for one run, in order of first appearance in the history.
///
/// `match_count` and `match_wins` come from the history; the overall winner gets
/// `win_count = 1`; every candidate that played gets `total_games = 1`.
pub fn stat_records(
    result: &WinnerResult,
    participant: &ParticipantId,
    created_at: DateTime<Utc>,
) -> Vec<StatRecord> {
    let mut order: Vec<CandidateId> = Vec::new();
    let mut tallies: HashMap<CandidateId, Tally> = HashMap::new();

    for m in &result.match_history {
        for c in [&m.slot_a, &m.slot_b] {
            let tally = tallies.entry(c.id.clone()).or_insert_with(|| {
                order.push(c.id.clone());
                Tally::default()
            });
            tally.match_count += 1;
            if c.id == m.winner.id {
                tally.match_wins += 1;
            }
        }
    }

    order
        .into_iter()
        .map(|candidate_id| {
            let tally = tallies.remove(&candidate_id).unwrap_or_default();
            StatRecord {
                tournament_id: result.tournament_id.clone(),
                participant_id: participant.clone(),
                win_count: u32::from(candidate_id == result.winner.id),
                candidate_id,
                match_wins: tally.match_wins,
                match_count: tally.match_count,
                total_games: 1,
                created_at,
            }
        })
        .collect()
}

/// Persist a finished run. `result` is only borrowed, so on a retryable error the
/// caller still holds it and can call again without replaying the bracket.
pub async fn submit_result(
    store: &dyn StatStore,
    result: &WinnerResult,
    participant: &ParticipantId,
    created_at: DateTime<Utc>,
) -> Result<usize, WriteError> {
    let records = stat_records(result, participant, created_at);
    if records.is_empty() {
        return Err(WriteError::EmptyHistory(result.tournament_id.clone()));
    }
    if let Err(e) = store.append_stat_records(&records).await {
        log::warn!(
            "Could not store {} stat records for tournament {} ({}): {}",
            records.len(),
            result.tournament_id,
            participant,
            e
        );
        return Err(e.into());
    }
    log::info!(
        "Stored {} stat records for tournament {} ({}), winner {}",
        records.len(),
        result.tournament_id,
        participant,
        result.winner.name
    );
    Ok(records.len())
}
