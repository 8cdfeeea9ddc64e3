//! Resurrection: after a 32-candidate round 1, swap up to 4 eliminated candidates back in.

use crate::logic::rounds::{advance_to, settle};
use crate::models::{
    Candidate, CandidateId, ResurrectionError, ResurrectionOffer, RunError, RunState,
    TournamentRun,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Most candidates that may be picked on each side.
pub const MAX_RESURRECTIONS: usize = 4;

/// Candidates to bring back and the survivors they replace, paired by position.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ResurrectionSelection {
    /// From `offer.eliminated`.
    pub revive: Vec<CandidateId>,
    /// From `offer.advanced`.
    pub drop: Vec<CandidateId>,
}

impl ResurrectionSelection {
    /// Check the selection against an offer without touching any run.
    pub fn validate(&self, offer: &ResurrectionOffer) -> Result<(), ResurrectionError> {
        if self.revive.is_empty() || self.drop.is_empty() {
            return Err(ResurrectionError::EmptySelection);
        }
        let largest = self.revive.len().max(self.drop.len());
        if largest > MAX_RESURRECTIONS {
            return Err(ResurrectionError::TooMany {
                max: MAX_RESURRECTIONS,
                selected: largest,
            });
        }
        if self.revive.len() != self.drop.len() {
            return Err(ResurrectionError::UnequalCounts {
                revive: self.revive.len(),
                drop: self.drop.len(),
            });
        }

        let mut seen = HashSet::new();
        for id in self.revive.iter().chain(self.drop.iter()) {
            if !seen.insert(id) {
                return Err(ResurrectionError::Duplicate(id.clone()));
            }
        }
        for id in &self.revive {
            if !offer.eliminated.iter().any(|c| &c.id == id) {
                return Err(ResurrectionError::NotEliminated(id.clone()));
            }
        }
        for id in &self.drop {
            if !offer.advanced.iter().any(|c| &c.id == id) {
                return Err(ResurrectionError::NotAdvanced(id.clone()));
            }
        }
        Ok(())
    }

    /// Whether the confirm control should be enabled.
    pub fn can_confirm(&self, offer: &ResurrectionOffer) -> bool {
        self.validate(offer).is_ok()
    }
}

/// Apply a valid selection: each dropped survivor's seat goes to the revived candidate
/// paired with it, then the 16 are paired in order for round 2. Clears undo history.
pub fn confirm_resurrection(
    run: &mut TournamentRun,
    selection: &ResurrectionSelection,
) -> Result<(), ResurrectionError> {
    let offer = run
        .resurrection_offer()
        .ok_or(ResurrectionError::NotPending)?;
    selection.validate(offer)?;

    let mut field = offer.advanced.clone();
    for (drop_id, revive_id) in selection.drop.iter().zip(&selection.revive) {
        let seat = field.iter().position(|c| &c.id == drop_id);
        let revived = offer.eliminated.iter().find(|c| &c.id == revive_id);
        if let (Some(seat), Some(revived)) = (seat, revived) {
            field[seat] = revived.clone();
        }
    }

    log::info!(
        "Run {} resurrected {} candidate(s)",
        run.id,
        selection.revive.len()
    );
    leave_resurrection(run, field);
    Ok(())
}

/// Decline the offer; the natural survivors go on unchanged.
pub fn skip_resurrection(run: &mut TournamentRun) -> Result<(), RunError> {
    let field = run
        .resurrection_offer()
        .ok_or(RunError::NoResurrectionPending)?
        .advanced
        .clone();
    log::info!("Run {} skipped resurrection", run.id);
    leave_resurrection(run, field);
    Ok(())
}

fn leave_resurrection(run: &mut TournamentRun, field: Vec<Candidate>) {
    run.undo_stack.clear();
    run.state = RunState::Running;
    advance_to(run, field);
    settle(run);
}
