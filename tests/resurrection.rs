//! Integration tests for the resurrection event after a 32-candidate round 1.

use pick_one_tournament::{
    back, confirm_resurrection, pick, skip_resurrection, start_run, Candidate, CandidatePool,
    Media, ResurrectionError, ResurrectionSelection, RunError, Slot, TournamentRun,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

fn pool(n: usize) -> CandidatePool {
    (0..n)
        .map(|i| {
            Candidate::new(
                format!("c{i}"),
                format!("Candidate {i}"),
                Media::Video(format!("https://cdn.example.com/{i}.mp4")),
            )
        })
        .collect::<Vec<_>>()
        .into()
}

fn start(n: usize, sample: Option<usize>) -> TournamentRun {
    start_run("big", &pool(n), sample, &mut StdRng::seed_from_u64(32)).unwrap()
}

/// Play until the run offers resurrection, finishes, or leaves round 1.
fn finish_round_one(run: &mut TournamentRun) {
    while run.current_match().is_some() && run.progress().round_index == 1 {
        pick(run, Slot::A).unwrap();
    }
}

fn ids(cs: &[Candidate]) -> Vec<String> {
    cs.iter().map(|c| c.id.clone()).collect()
}

fn field_ids(run: &TournamentRun) -> HashSet<String> {
    run.progress()
        .round
        .iter()
        .flat_map(|m| [m.slot_a.clone(), m.slot_b.clone()])
        .flatten()
        .map(|c| c.id)
        .collect()
}

#[test]
fn thirty_two_candidates_offer_sixteen_against_sixteen() {
    let mut run = start(32, None);
    finish_round_one(&mut run);
    assert_eq!(run.match_history().len(), 16);

    let offer = run.resurrection_offer().expect("offer after round 1").clone();
    assert_eq!(offer.eliminated.len(), 16);
    assert_eq!(offer.advanced.len(), 16);
    let eliminated: HashSet<_> = ids(&offer.eliminated).into_iter().collect();
    let advanced: HashSet<_> = ids(&offer.advanced).into_iter().collect();
    assert!(eliminated.is_disjoint(&advanced));
    assert!(run.current_match().is_none());
}

#[test]
fn swapping_two_for_two_keeps_fourteen_and_adds_two() {
    let mut run = start(32, None);
    finish_round_one(&mut run);
    let offer = run.resurrection_offer().unwrap().clone();

    let selection = ResurrectionSelection {
        revive: ids(&offer.eliminated[3..5]),
        drop: ids(&offer.advanced[0..2]),
    };
    assert!(selection.can_confirm(&offer));
    confirm_resurrection(&mut run, &selection).unwrap();

    assert!(run.resurrection_offer().is_none());
    assert_eq!(run.progress().round_index, 2);
    assert_eq!(run.progress().round.len(), 8);
    let field = field_ids(&run);
    assert_eq!(field.len(), 16);
    let untouched: HashSet<String> = ids(&offer.advanced[2..]).into_iter().collect();
    assert!(untouched.is_subset(&field));
    for revived in &selection.revive {
        assert!(field.contains(revived));
    }
    for dropped in &selection.drop {
        assert!(!field.contains(dropped));
    }

    // Revived candidates take the dropped ones' seats.
    assert_eq!(
        run.progress().round[0].slot_a.as_ref().unwrap().id,
        selection.revive[0]
    );
    assert_eq!(
        run.progress().round[0].slot_b.as_ref().unwrap().id,
        selection.revive[1]
    );
}

#[test]
fn leaving_resurrection_clears_undo_history() {
    let mut run = start(32, None);
    finish_round_one(&mut run);
    assert!(!run.can_undo());
    assert!(!back(&mut run), "not undoable while pending");
    assert!(run.resurrection_offer().is_some());

    skip_resurrection(&mut run).unwrap();
    assert!(!run.can_undo());
    assert!(!back(&mut run));
    assert_eq!(run.progress().round_index, 2);

    pick(&mut run, Slot::A).unwrap();
    assert!(run.can_undo());
    assert!(back(&mut run));
    assert!(!back(&mut run), "cannot undo past the resurrection");
}

#[test]
fn skip_keeps_natural_survivors() {
    let mut run = start(32, None);
    finish_round_one(&mut run);
    let advanced: HashSet<String> = ids(&run.resurrection_offer().unwrap().advanced)
        .into_iter()
        .collect();
    skip_resurrection(&mut run).unwrap();
    assert_eq!(field_ids(&run), advanced);
}

#[test]
fn offered_once_and_run_completes() {
    let mut run = start(32, None);
    finish_round_one(&mut run);
    let offer = run.resurrection_offer().unwrap().clone();
    confirm_resurrection(
        &mut run,
        &ResurrectionSelection {
            revive: ids(&offer.eliminated[..1]),
            drop: ids(&offer.advanced[..1]),
        },
    )
    .unwrap();

    while run.current_match().is_some() {
        pick(&mut run, Slot::B).unwrap();
        assert!(run.resurrection_offer().is_none());
    }
    assert!(run.is_finished());
    assert_eq!(run.match_history().len(), 16 + 15);
    assert_eq!(skip_resurrection(&mut run), Err(RunError::NoResurrectionPending));
}

#[test]
fn not_offered_without_exactly_sixteen_survivors() {
    for n in [16, 31, 33, 40, 64] {
        let mut run = start(n, None);
        finish_round_one(&mut run);
        assert!(run.resurrection_offer().is_none(), "pool of {n}");
    }
}

#[test]
fn sampled_thirty_two_from_larger_pool_is_offered() {
    let mut run = start(50, Some(32));
    finish_round_one(&mut run);
    assert!(run.resurrection_offer().is_some());
}

#[test]
fn invalid_selections_leave_the_offer_pending() {
    let mut run = start(32, None);
    finish_round_one(&mut run);
    let offer = run.resurrection_offer().unwrap().clone();
    let before = run.progress().clone();

    let cases = [
        (
            ResurrectionSelection::default(),
            ResurrectionError::EmptySelection,
        ),
        (
            ResurrectionSelection {
                revive: ids(&offer.eliminated[..2]),
                drop: ids(&offer.advanced[..1]),
            },
            ResurrectionError::UnequalCounts { revive: 2, drop: 1 },
        ),
        (
            ResurrectionSelection {
                revive: ids(&offer.eliminated[..5]),
                drop: ids(&offer.advanced[..5]),
            },
            ResurrectionError::TooMany {
                max: 4,
                selected: 5,
            },
        ),
        (
            ResurrectionSelection {
                revive: ids(&offer.advanced[..1]),
                drop: ids(&offer.advanced[1..2]),
            },
            ResurrectionError::NotEliminated(offer.advanced[0].id.clone()),
        ),
        (
            ResurrectionSelection {
                revive: ids(&offer.eliminated[..1]),
                drop: ids(&offer.eliminated[1..2]),
            },
            ResurrectionError::NotAdvanced(offer.eliminated[1].id.clone()),
        ),
        (
            ResurrectionSelection {
                revive: vec![offer.eliminated[0].id.clone(), offer.eliminated[0].id.clone()],
                drop: ids(&offer.advanced[..2]),
            },
            ResurrectionError::Duplicate(offer.eliminated[0].id.clone()),
        ),
    ];

    for (selection, expected) in cases {
        assert!(!selection.can_confirm(&offer));
        assert_eq!(confirm_resurrection(&mut run, &selection), Err(expected));
        assert!(run.resurrection_offer().is_some());
        assert_eq!(run.progress(), &before);
    }
}

#[test]
fn confirm_without_offer_is_rejected() {
    let mut run = start(8, None);
    assert_eq!(
        confirm_resurrection(&mut run, &ResurrectionSelection::default()),
        Err(ResurrectionError::NotPending)
    );
}
