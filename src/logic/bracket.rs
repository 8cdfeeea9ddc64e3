//! Bracket construction: round-1 seeding with byes, and sequential re-pairing.

use crate::models::{BracketError, Candidate, CandidatePool, Matchup};
use rand::seq::SliceRandom;
use rand::Rng;

/// Round 1 plus the candidates held out until round 2.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Bracket {
    pub matches: Vec<Matchup>,
    pub byes: Vec<Candidate>,
}

impl Bracket {
    /// Every candidate in the bracket, byes first.
    pub fn entrants(&self) -> Vec<Candidate> {
        let mut all = self.byes.clone();
        for m in &self.matches {
            all.extend(m.slot_a.iter().cloned());
            all.extend(m.slot_b.iter().cloned());
        }
        all
    }
}

/// Seed round 1.
///
/// 1. If `sample_size` is smaller than the pool, draw that many at random.
/// 2. Shuffle.
/// 3. `byes = next_power_of_two(n) - n`; the first `byes` shuffled candidates sit out round 1.
/// 4. Pair the rest in order.
pub fn build_bracket<R: Rng + ?Sized>(
    pool: &CandidatePool,
    sample_size: Option<usize>,
    rng: &mut R,
) -> Result<Bracket, BracketError> {
    let available = pool.len();
    if available < 2 {
        return Err(BracketError::NotEnoughCandidates { found: available });
    }

    let mut field: Vec<Candidate> = match sample_size {
        Some(requested) if requested < 2 || requested > available => {
            return Err(BracketError::InvalidSampleSize {
                requested,
                available,
            });
        }
        Some(requested) if requested < available => pool
            .candidates()
            .choose_multiple(rng, requested)
            .cloned()
            .collect(),
        _ => pool.candidates().to_vec(),
    };
    field.shuffle(rng);

    let n = field.len();
    let bye_count = n.next_power_of_two() - n;
    let contested = field.split_off(bye_count);
    let byes = field;

    if contested.len() % 2 != 0 {
        return Err(BracketError::UnpairedCandidate {
            remaining: contested.len() % 2,
            byes: byes.len(),
        });
    }

    let matches = contested
        .chunks_exact(2)
        .map(|pair| Matchup::new(pair[0].clone(), pair[1].clone()))
        .collect::<Vec<_>>();

    log::debug!(
        "Built bracket: {} candidates, {} round-1 matches, {} byes",
        n,
        matches.len(),
        byes.len()
    );
    Ok(Bracket { matches, byes })
}

/// Pair candidates in order: (0,1), (2,3), ... An odd one out becomes a bye.
pub fn make_next_round(candidates: Vec<Candidate>) -> Vec<Matchup> {
    let mut matches = Vec::with_capacity(candidates.len().div_ceil(2));
    let mut iter = candidates.into_iter();
    while let Some(a) = iter.next() {
        match iter.next() {
            Some(b) => matches.push(Matchup::new(a, b)),
            None => matches.push(Matchup::bye(a)),
        }
    }
    matches
}
