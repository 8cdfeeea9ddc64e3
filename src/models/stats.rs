//! Durable stat records and the rankings folded from them.

use crate::models::candidate::CandidateId;
use crate::models::participant::ParticipantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a tournament definition (the pool, not one run of it).
pub type TournamentId = String;

/// Append-only per-candidate outcome of one finished run.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    pub tournament_id: TournamentId,
    pub participant_id: ParticipantId,
    pub candidate_id: CandidateId,
    /// 1 for the run's overall winner, else 0.
    pub win_count: u32,
    pub match_wins: u32,
    pub match_count: u32,
    /// Completed runs this record stands for (always 1 when written).
    pub total_games: u32,
    pub created_at: DateTime<Utc>,
}

/// Half-open creation-time window `[from, to)`. Either bound may be open.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at < to)
    }
}

/// One row of a leaderboard.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CandidateStanding {
    pub candidate_id: CandidateId,
    /// Lifetime tournament wins, counting every run.
    pub win_count: u64,
    pub match_wins: u64,
    pub match_count: u64,
    pub total_games: u64,
}

impl CandidateStanding {
    pub fn new(candidate_id: impl Into<CandidateId>) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            ..Self::default()
        }
    }

    /// Tournament wins per completed run. None when there are no games.
    pub fn win_rate(&self) -> Option<f64> {
        ratio(self.win_count, self.total_games)
    }

    /// Matches won per match played. None when no matches were played.
    pub fn match_win_rate(&self) -> Option<f64> {
        ratio(self.match_wins, self.match_count)
    }
}

fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

/// Which participants a leaderboard is computed over.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingView {
    #[default]
    Everyone,
    MembersOnly,
}

impl RankingView {
    pub fn admits(&self, participant: &ParticipantId) -> bool {
        match self {
            RankingView::Everyone => true,
            RankingView::MembersOnly => participant.is_member(),
        }
    }
}

/// Ranked standings for one tournament.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub tournament_id: TournamentId,
    pub view: RankingView,
    /// Number of records folded (after range and view filtering).
    pub records_read: usize,
    pub standings: Vec<CandidateStanding>,
}
