//! Pick-one tournaments: library with models, bracket logic, stat storage and rankings.

pub mod config;
pub mod logic;
pub mod models;
pub mod pool;
pub mod store;

pub use logic::{
    back, build_bracket, confirm_resurrection, fetch_newest_first, fold_records, leaderboard,
    make_next_round, pick, restart_run, skip_resurrection, start_run, stat_records,
    submit_result, AggregateError, Bracket, ResurrectionSelection, WriteError,
};
pub use models::{
    BracketError, Candidate, CandidateId, CandidatePool, CandidateStanding, Leaderboard,
    MatchRecord, Matchup, Media, ParticipantId, RankingView, ResurrectionError,
    ResurrectionOffer, RunError, RunId, RunState, RunView, Slot, StatRecord, TimeRange,
    TournamentId, TournamentRun, WinnerResult,
};
pub use pool::{PoolCatalog, PoolError};
pub use store::{JsonlStatStore, MemoryStatStore, StatPage, StatQuery, StatStore, StoreError};
