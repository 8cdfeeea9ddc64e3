//! Stat aggregator: fold every stored record of a tournament into ranked standings.
//!
//! - `win_count` is summed over every record, so repeat plays all count.
//! - `match_wins`, `match_count` and `total_games` come only from the newest record per
//!   (participant, candidate), so replaying a tournament does not inflate the denominators.
//! - Rows are ranked by `win_count`, then `match_wins`, then first appearance in fetch
//!   order (stable).

use crate::models::{
    CandidateId, CandidateStanding, Leaderboard, ParticipantId, RankingView, StatRecord,
};
use crate::store::{StatQuery, StatStore, StoreError};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Rankings could not be computed. Callers show "no data", never zeroed stats.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("stat store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("store broke newest-first ordering: {later} came after {earlier}")]
    OutOfOrder {
        earlier: DateTime<Utc>,
        later: DateTime<Utc>,
    },

    #[error("store returned a record of tournament {found} while reading {expected}")]
    WrongTournament { expected: String, found: String },

    #[error("store returned an empty page with a continuation cursor")]
    StalledPagination,
}

/// Fold records, which must be newest first, into ranked standings.
pub fn fold_records<'a, I>(records: I, view: RankingView) -> Vec<CandidateStanding>
where
    I: IntoIterator<Item = &'a StatRecord>,
{
    let mut standings: Vec<CandidateStanding> = Vec::new();
    let mut index: HashMap<CandidateId, usize> = HashMap::new();
    let mut latest_seen: HashSet<(ParticipantId, CandidateId)> = HashSet::new();

    for r in records {
        if !view.admits(&r.participant_id) {
            continue;
        }
        let i = *index.entry(r.candidate_id.clone()).or_insert_with(|| {
            standings.push(CandidateStanding::new(r.candidate_id.clone()));
            standings.len() - 1
        });
        let row = &mut standings[i];
        row.win_count += u64::from(r.win_count);

        // First sighting of this pair is its newest record.
        if latest_seen.insert((r.participant_id.clone(), r.candidate_id.clone())) {
            row.match_wins += u64::from(r.match_wins);
            row.match_count += u64::from(r.match_count);
            row.total_games += u64::from(r.total_games);
        }
    }

    standings.sort_by(|a, b| {
        b.win_count
            .cmp(&a.win_count)
            .then(b.match_wins.cmp(&a.match_wins))
    });
    standings
}

/// Read every page of `query`, checking the newest-first contract as it goes.
pub async fn fetch_newest_first(
    store: &dyn StatStore,
    query: &StatQuery,
) -> Result<Vec<StatRecord>, AggregateError> {
    let mut all: Vec<StatRecord> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = store.query_stat_records(query, cursor.as_deref()).await?;
        pages += 1;

        for r in &page.records {
            if r.tournament_id != query.tournament_id {
                return Err(AggregateError::WrongTournament {
                    expected: query.tournament_id.clone(),
                    found: r.tournament_id.clone(),
                });
            }
            if let Some(prev) = all.last() {
                if r.created_at > prev.created_at {
                    return Err(AggregateError::OutOfOrder {
                        earlier: prev.created_at,
                        later: r.created_at,
                    });
                }
            }
            all.push(r.clone());
        }

        match page.next_cursor {
            Some(_) if page.records.is_empty() => return Err(AggregateError::StalledPagination),
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    log::debug!(
        "Fetched {} stat records for tournament {} in {} page(s)",
        all.len(),
        query.tournament_id,
        pages
    );
    Ok(all)
}

/// Current rankings for one tournament.
pub async fn leaderboard(
    store: &dyn StatStore,
    query: &StatQuery,
    view: RankingView,
) -> Result<Leaderboard, AggregateError> {
    let records = fetch_newest_first(store, query).await?;
    let records_read = records
        .iter()
        .filter(|r| view.admits(&r.participant_id))
        .count();
    let standings = fold_records(&records, view);
    Ok(Leaderboard {
        tournament_id: query.tournament_id.clone(),
        view,
        records_read,
        standings,
    })
}
