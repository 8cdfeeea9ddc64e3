//! Matchup (one pairing), Slot, and the recorded MatchRecord.

use crate::models::candidate::Candidate;
use serde::{Deserialize, Serialize};

/// Which side of a matchup was chosen.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    #[default]
    A,
    B,
}

/// A single pairing. Exactly one filled slot makes it a bye.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Matchup {
    pub slot_a: Option<Candidate>,
    pub slot_b: Option<Candidate>,
    /// None until decided (or auto-resolved for a bye).
    pub winner: Option<Candidate>,
}

impl Matchup {
    pub fn new(slot_a: Candidate, slot_b: Candidate) -> Self {
        Self {
            slot_a: Some(slot_a),
            slot_b: Some(slot_b),
            winner: None,
        }
    }

    pub fn bye(candidate: Candidate) -> Self {
        Self {
            slot_a: Some(candidate),
            slot_b: None,
            winner: None,
        }
    }

    /// The lone candidate if this is a bye.
    pub fn bye_candidate(&self) -> Option<&Candidate> {
        match (&self.slot_a, &self.slot_b) {
            (Some(c), None) | (None, Some(c)) => Some(c),
            _ => None,
        }
    }

    pub fn is_bye(&self) -> bool {
        self.bye_candidate().is_some()
    }

    /// Both slots filled, so a participant has to choose.
    pub fn is_contested(&self) -> bool {
        self.slot_a.is_some() && self.slot_b.is_some()
    }

    pub fn is_decided(&self) -> bool {
        self.winner.is_some()
    }

    pub fn candidate(&self, slot: Slot) -> Option<&Candidate> {
        match slot {
            Slot::A => self.slot_a.as_ref(),
            Slot::B => self.slot_b.as_ref(),
        }
    }

    /// The side that did not win, once decided.
    pub fn loser(&self) -> Option<&Candidate> {
        let winner = self.winner.as_ref()?;
        [&self.slot_a, &self.slot_b]
            .into_iter()
            .flatten()
            .find(|c| c.id != winner.id)
    }
}

/// One decided, non-bye pairing as kept in the match history.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// 1-based round number.
    pub round: u32,
    pub slot_a: Candidate,
    pub slot_b: Candidate,
    pub winner: Candidate,
}

