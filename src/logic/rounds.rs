//! Round state machine: picks, automatic byes, round transitions and undo.

use crate::logic::bracket::{build_bracket, make_next_round};
use crate::models::{
    BracketError, Candidate, CandidatePool, MatchRecord, ResurrectionOffer, RunError, RunState,
    Slot, TournamentId, TournamentRun,
};
use rand::Rng;

/// Resurrection needs at least this many entrants...
pub const RESURRECTION_MIN_ENTRANTS: usize = 32;
/// ...and exactly this many round-1 survivors.
pub const RESURRECTION_SURVIVORS: usize = 16;

/// Start a run: seed round 1 and resolve anything that needs no decision.
pub fn start_run<R: Rng + ?Sized>(
    tournament_id: impl Into<TournamentId>,
    pool: &CandidatePool,
    sample_size: Option<usize>,
    rng: &mut R,
) -> Result<TournamentRun, BracketError> {
    let bracket = build_bracket(pool, sample_size, rng)?;
    let entrants = CandidatePool::new(bracket.entrants());
    let mut run = TournamentRun::new(tournament_id.into(), entrants, bracket.matches, bracket.byes);
    settle(&mut run);
    log::info!(
        "Started run {} of tournament {} with {} candidates",
        run.id,
        run.tournament_id,
        run.entrants.len()
    );
    Ok(run)
}

/// Throw the run's progress away and start over on `pool` under the same run id.
/// Nothing from the discarded bracket is persisted. On error the run is left as it was.
pub fn restart_run<R: Rng + ?Sized>(
    run: &mut TournamentRun,
    pool: &CandidatePool,
    sample_size: Option<usize>,
    rng: &mut R,
) -> Result<(), BracketError> {
    let mut fresh = start_run(run.tournament_id.clone(), pool, sample_size, rng)?;
    fresh.id = run.id;
    log::info!("Run {} restarted with {} candidates", run.id, fresh.entrants.len());
    *run = fresh;
    Ok(())
}

/// Choose the candidate in `slot` for the current match.
///
/// Snapshots progress onto the undo stack, records the decision, then resolves
/// byes and round transitions until the next decision (or the end).
pub fn pick(run: &mut TournamentRun, slot: Slot) -> Result<(), RunError> {
    if run.state != RunState::Running {
        return Err(RunError::NotRunning);
    }
    let round = run.progress.round_index;
    let pointer = run.progress.match_pointer;
    let (slot_a, slot_b) = match run.progress.round.get(pointer) {
        Some(m) if m.is_contested() && !m.is_decided() => {
            match (m.slot_a.clone(), m.slot_b.clone()) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(RunError::NoContestedMatch { round, pointer }),
            }
        }
        _ => return Err(RunError::NoContestedMatch { round, pointer }),
    };
    let winner = match slot {
        Slot::A => slot_a.clone(),
        Slot::B => slot_b.clone(),
    };

    run.undo_stack.push(run.progress.clone());

    log::debug!(
        "Run {} round {} match {}: {} beats {}",
        run.id,
        round,
        pointer,
        winner.name,
        match slot {
            Slot::A => &slot_b.name,
            Slot::B => &slot_a.name,
        }
    );
    run.progress.round[pointer].winner = Some(winner.clone());
    run.progress.match_history.push(MatchRecord {
        round,
        slot_a,
        slot_b,
        winner,
    });
    run.progress.match_pointer += 1;

    settle(run);
    Ok(())
}

/// Undo the last pick. Returns false (and does nothing) when there is nothing to undo
/// or the run is not accepting picks.
pub fn back(run: &mut TournamentRun) -> bool {
    if run.state != RunState::Running {
        return false;
    }
    match run.undo_stack.pop() {
        Some(previous) => {
            run.progress = previous;
            log::debug!(
                "Run {} undone to round {} match {}",
                run.id,
                run.progress.round_index,
                run.progress.match_pointer
            );
            true
        }
        None => false,
    }
}

/// Resolve byes and close finished rounds until a decision is needed or the run leaves `Running`.
pub(crate) fn settle(run: &mut TournamentRun) {
    while run.state == RunState::Running {
        let pointer = run.progress.match_pointer;
        let next = run
            .progress
            .round
            .get(pointer)
            .map(|m| (m.is_contested(), m.bye_candidate().cloned()));
        match next {
            Some((true, _)) => return,
            Some((false, Some(lone))) => {
                run.progress.round[pointer].winner = Some(lone);
                run.progress.match_pointer += 1;
            }
            Some((false, None)) => {
                log::warn!("Run {} skipping empty match {}", run.id, pointer);
                run.progress.match_pointer += 1;
            }
            None => {
                if !complete_round(run) {
                    return;
                }
            }
        }
    }
}

/// The round is fully decided: finish, offer resurrection, or pair the next round.
/// Returns false if the round produced nobody to carry forward.
fn complete_round(run: &mut TournamentRun) -> bool {
    let mut survivors: Vec<Candidate> = run
        .progress
        .round
        .iter()
        .filter_map(|m| m.winner.clone())
        .collect();
    if run.progress.round_index == 1 {
        survivors.append(&mut run.progress.pending_byes);
    }

    if survivors.is_empty() {
        log::error!(
            "Run {} round {} produced no survivors",
            run.id,
            run.progress.round_index
        );
        return false;
    }
    if survivors.len() == 1 {
        let winner = survivors.remove(0);
        log::info!(
            "Run {} finished after {} decisions: {} wins",
            run.id,
            run.progress.match_history.len(),
            winner.name
        );
        run.state = RunState::Finished { winner };
        return true;
    }

    if resurrection_due(run, survivors.len()) {
        run.resurrection_used = true;
        let eliminated = run
            .progress
            .round
            .iter()
            .filter_map(|m| m.loser().cloned())
            .collect();
        log::info!("Run {} offering resurrection", run.id);
        run.state = RunState::ResurrectionPending {
            offer: ResurrectionOffer {
                eliminated,
                advanced: survivors,
            },
        };
        return true;
    }

    advance_to(run, survivors);
    true
}

fn resurrection_due(run: &TournamentRun, survivors: usize) -> bool {
    !run.resurrection_used
        && run.progress.round_index == 1
        && run.entrants.len() >= RESURRECTION_MIN_ENTRANTS
        && survivors == RESURRECTION_SURVIVORS
}

/// Begin the next round with `field`, paired in order.
pub(crate) fn advance_to(run: &mut TournamentRun, field: Vec<Candidate>) {
    run.progress.round = make_next_round(field);
    run.progress.round_index += 1;
    run.progress.match_pointer = 0;
    run.progress.pending_byes.clear();
    log::debug!(
        "Run {} starting round {} with {} matches",
        run.id,
        run.progress.round_index,
        run.progress.round.len()
    );
}
