//! Data structures for pick-one tournaments: candidates, matchups, runs, stat records.

mod candidate;
mod error;
mod matchup;
mod participant;
mod run;
mod stats;

pub use candidate::{Candidate, CandidateId, CandidatePool, Media};
pub use error::{BracketError, ResurrectionError, RunError};
pub use matchup::{MatchRecord, Matchup, Slot};
pub use participant::ParticipantId;
pub use run::{
    round_label_for, Progress, ResurrectionOffer, RunId, RunState, RunView, TournamentRun,
    WinnerResult,
};
pub use stats::{
    CandidateStanding, Leaderboard, RankingView, StatRecord, TimeRange, TournamentId,
};
