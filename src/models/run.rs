//! TournamentRun: one participant's pass through a bracket.

use crate::models::candidate::{Candidate, CandidatePool};
use crate::models::matchup::{MatchRecord, Matchup};
use crate::models::stats::TournamentId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one run (one session's bracket).
pub type RunId = Uuid;

/// Everything a pick can change. Cloned onto the undo stack before every pick.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub round: Vec<Matchup>,
    /// 1-based.
    pub round_index: u32,
    /// Index of the next undecided match in `round`.
    pub match_pointer: usize,
    /// Round-1 byes, merged into the round-2 field.
    pub pending_byes: Vec<Candidate>,
    pub match_history: Vec<MatchRecord>,
}

/// The two sides offered by the resurrection event.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ResurrectionOffer {
    /// Losers of round 1.
    pub eliminated: Vec<Candidate>,
    /// The 16 round-1 survivors, in bracket order.
    pub advanced: Vec<Candidate>,
}

/// Current phase of the run.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RunState {
    /// Waiting for a pick on `progress.round[progress.match_pointer]`.
    Running,
    /// Round 1 finished with 16 survivors out of 32+; waiting for confirm or skip.
    ResurrectionPending { offer: ResurrectionOffer },
    Finished { winner: Candidate },
}

/// Terminal artifact of a run, handed to the stat writer exactly once.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct WinnerResult {
    pub tournament_id: TournamentId,
    pub winner: Candidate,
    pub match_history: Vec<MatchRecord>,
}

/// One participant's bracket. Build with `logic::start_run`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TournamentRun {
    pub(crate) id: RunId,
    pub(crate) tournament_id: TournamentId,
    /// Candidates actually entered (after sampling).
    pub(crate) entrants: CandidatePool,
    pub(crate) progress: Progress,
    pub(crate) undo_stack: Vec<Progress>,
    pub(crate) state: RunState,
    pub(crate) resurrection_used: bool,
    pub(crate) result_taken: bool,
}

/// What the presentation layer renders after every transition.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunView {
    pub run_id: RunId,
    pub tournament_id: TournamentId,
    pub round_label: String,
    pub round_index: u32,
    pub match_pointer: usize,
    pub matches: Vec<Matchup>,
    pub pending_byes: Vec<Candidate>,
    pub can_undo: bool,
    pub resurrection_offer: Option<ResurrectionOffer>,
    pub winner: Option<Candidate>,
    pub decisions: usize,
}

impl TournamentRun {
    pub(crate) fn new(
        tournament_id: TournamentId,
        entrants: CandidatePool,
        round: Vec<Matchup>,
        byes: Vec<Candidate>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            entrants,
            progress: Progress {
                round,
                round_index: 1,
                match_pointer: 0,
                pending_byes: byes,
                match_history: Vec::new(),
            },
            undo_stack: Vec::new(),
            state: RunState::Running,
            resurrection_used: false,
            result_taken: false,
        }
    }

    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn tournament_id(&self) -> &str {
        &self.tournament_id
    }

    pub fn entrants(&self) -> &CandidatePool {
        &self.entrants
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn match_history(&self) -> &[MatchRecord] {
        &self.progress.match_history
    }

    /// The match waiting for a pick, if any.
    pub fn current_match(&self) -> Option<&Matchup> {
        match self.state {
            RunState::Running => self.progress.round.get(self.progress.match_pointer),
            _ => None,
        }
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.state, RunState::Running) && !self.undo_stack.is_empty()
    }

    pub fn resurrection_offer(&self) -> Option<&ResurrectionOffer> {
        match &self.state {
            RunState::ResurrectionPending { offer } => Some(offer),
            _ => None,
        }
    }

    pub fn winner(&self) -> Option<&Candidate> {
        match &self.state {
            RunState::Finished { winner } => Some(winner),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.winner().is_some()
    }

    /// Hand out the WinnerResult. Returns `Some` at most once per run.
    pub fn take_result(&mut self) -> Option<WinnerResult> {
        if self.result_taken {
            return None;
        }
        let winner = self.winner()?.clone();
        self.result_taken = true;
        Some(WinnerResult {
            tournament_id: self.tournament_id.clone(),
            winner,
            match_history: self.progress.match_history.clone(),
        })
    }

    /// "Final", "Semifinal", "Quarterfinal" or "Round of N" for the current field.
    pub fn round_label(&self) -> String {
        if self.is_finished() {
            return "Winner".to_string();
        }
        let filled: usize = self
            .progress
            .round
            .iter()
            .map(|m| usize::from(m.slot_a.is_some()) + usize::from(m.slot_b.is_some()))
            .sum();
        round_label_for(filled + self.progress.pending_byes.len())
    }

    pub fn view(&self) -> RunView {
        RunView {
            run_id: self.id,
            tournament_id: self.tournament_id.clone(),
            round_label: self.round_label(),
            round_index: self.progress.round_index,
            match_pointer: self.progress.match_pointer,
            matches: self.progress.round.clone(),
            pending_byes: self.progress.pending_byes.clone(),
            can_undo: self.can_undo(),
            resurrection_offer: self.resurrection_offer().cloned(),
            winner: self.winner().cloned(),
            decisions: self.progress.match_history.len(),
        }
    }
}

/// Label for a round whose field (including byes) has `field` candidates.
pub fn round_label_for(field: usize) -> String {
    match field.next_power_of_two() {
        0..=2 => "Final".to_string(),
        4 => "Semifinal".to_string(),
        8 => "Quarterfinal".to_string(),
        n => format!("Round of {}", n),
    }
}
