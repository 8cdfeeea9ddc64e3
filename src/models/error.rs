//! Errors raised by the bracket engine.

use crate::models::candidate::CandidateId;
use thiserror::Error;

/// The bracket builder refuses to produce a round it cannot pair correctly.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum BracketError {
    #[error("need at least 2 candidates, found {found}")]
    NotEnoughCandidates { found: usize },
    #[error("sample size {requested} is invalid for a pool of {available} (must be 2..={available})")]
    InvalidSampleSize { requested: usize, available: usize },
    #[error("{remaining} candidate(s) left unpaired after holding out {byes} bye(s)")]
    UnpairedCandidate { remaining: usize, byes: usize },
}

/// A run rejected a call; the run is left untouched.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum RunError {
    #[error("the run is not waiting for a pick")]
    NotRunning,
    #[error("no contested match at position {pointer} of round {round}")]
    NoContestedMatch { round: u32, pointer: usize },
    #[error("no resurrection is pending")]
    NoResurrectionPending,
}

/// Local validation failure for a resurrection selection. Keeps confirm disabled.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ResurrectionError {
    #[error("no resurrection is pending")]
    NotPending,
    #[error("select at least one candidate on each side")]
    EmptySelection,
    #[error("select at most {max} candidates on each side (selected {selected})")]
    TooMany { max: usize, selected: usize },
    #[error("revive {revive} but drop {drop}: counts must match")]
    UnequalCounts { revive: usize, drop: usize },
    #[error("candidate {0} was not eliminated in round 1")]
    NotEliminated(CandidateId),
    #[error("candidate {0} did not advance from round 1")]
    NotAdvanced(CandidateId),
    #[error("candidate {0} selected more than once")]
    Duplicate(CandidateId),
}
