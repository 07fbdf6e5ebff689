//! Bounded rejection sampling of derangements.
//!
//! # Responsibility
//! - Produce a uniformly distributed permutation of `0..n` with no fixed
//!   point, or fail explicitly.
//!
//! # Invariants
//! - Every candidate is an unbiased Fisher–Yates shuffle; a candidate with
//!   any fixed point is discarded whole.
//! - At most `max_attempts` candidates are drawn; exhaustion is an error,
//!   never a partial result.
//! - `n == 0` yields an empty permutation; `n == 1` always exhausts.

use rand::Rng;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Shuffle budget per draw. A uniform permutation is fixed-point free with
/// probability ~1/e, so exhausting this for `n >= 2` does not happen in
/// practice.
pub const MAX_DERANGEMENT_ATTEMPTS: usize = 2000;

/// Source of uniform index choices for the shuffle.
pub trait RandomSource {
    /// Returns an index chosen uniformly from `0..=upper`.
    fn pick_at_most(&mut self, upper: usize) -> usize;
}

/// Adapts any [`rand::Rng`] into a [`RandomSource`].
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl<R: Rng> RandomSource for RngSource<R> {
    fn pick_at_most(&mut self, upper: usize) -> usize {
        self.0.gen_range(0..=upper)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerangementError {
    /// No fixed-point-free shuffle was found within the attempt budget.
    Unreachable { len: usize, attempts: usize },
}

impl Display for DerangementError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreachable { len, attempts } => write!(
                f,
                "no derangement of {len} element(s) found after {attempts} attempt(s)"
            ),
        }
    }
}

impl Error for DerangementError {}

/// Draws a derangement of `0..n` using the default attempt budget.
pub fn derangement<S: RandomSource + ?Sized>(
    n: usize,
    source: &mut S,
) -> Result<Vec<usize>, DerangementError> {
    derangement_with_budget(n, source, MAX_DERANGEMENT_ATTEMPTS)
}

/// Draws a derangement of `0..n` with an explicit attempt budget.
pub fn derangement_with_budget<S: RandomSource + ?Sized>(
    n: usize,
    source: &mut S,
    max_attempts: usize,
) -> Result<Vec<usize>, DerangementError> {
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut perm: Vec<usize> = (0..n).collect();
    for _ in 0..max_attempts {
        perm.iter_mut().enumerate().for_each(|(i, slot)| *slot = i);
        shuffle(&mut perm, source);
        if is_derangement(&perm) {
            return Ok(perm);
        }
    }

    Err(DerangementError::Unreachable {
        len: n,
        attempts: max_attempts,
    })
}

/// Returns whether `perm` is a permutation of `0..perm.len()` with no fixed point.
pub fn is_derangement(perm: &[usize]) -> bool {
    let mut seen = vec![false; perm.len()];
    for (i, &target) in perm.iter().enumerate() {
        if target == i || target >= perm.len() || seen[target] {
            return false;
        }
        seen[target] = true;
    }
    true
}

fn shuffle<S: RandomSource + ?Sized>(values: &mut [usize], source: &mut S) {
    for i in (1..values.len()).rev() {
        let j = source.pick_at_most(i);
        values.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Always picks `upper`, so every shuffle is the identity.
    struct Identity;

    impl RandomSource for Identity {
        fn pick_at_most(&mut self, upper: usize) -> usize {
            upper
        }
    }

    /// Replays a fixed list of picks, then falls back to identity picks.
    struct Scripted {
        picks: Vec<usize>,
        calls: usize,
    }

    impl RandomSource for Scripted {
        fn pick_at_most(&mut self, upper: usize) -> usize {
            let pick = self.picks.get(self.calls).copied().unwrap_or(upper);
            self.calls += 1;
            pick.min(upper)
        }
    }

    fn seeded(seed: u64) -> RngSource<StdRng> {
        RngSource(StdRng::seed_from_u64(seed))
    }

    #[test]
    fn empty_input_yields_empty_permutation() {
        assert_eq!(derangement(0, &mut Identity).unwrap(), Vec::<usize>::new());
    }

    #[test]
    fn single_element_always_exhausts_budget() {
        for seed in 0..5 {
            let err = derangement(1, &mut seeded(seed)).unwrap_err();
            assert_eq!(
                err,
                DerangementError::Unreachable {
                    len: 1,
                    attempts: MAX_DERANGEMENT_ATTEMPTS
                }
            );
        }
    }

    #[test]
    fn seeded_draws_are_derangements_for_many_sizes() {
        for n in 2..=40 {
            for seed in 0..25 {
                let perm = derangement(n, &mut seeded(seed * 1_000 + n as u64)).unwrap();
                assert_eq!(perm.len(), n);
                assert!(is_derangement(&perm), "n={n} seed={seed} perm={perm:?}");
            }
        }
    }

    #[test]
    fn two_elements_always_swap() {
        for seed in 0..20 {
            assert_eq!(derangement(2, &mut seeded(seed)).unwrap(), vec![1, 0]);
        }
    }

    #[test]
    fn identity_source_exhausts_with_exact_budget() {
        let mut counting = Scripted {
            picks: Vec::new(),
            calls: 0,
        };
        let err = derangement_with_budget(4, &mut counting, 7).unwrap_err();
        assert_eq!(err, DerangementError::Unreachable { len: 4, attempts: 7 });
        assert_eq!(counting.calls, 7 * 3);
    }

    #[test]
    fn retries_until_a_candidate_has_no_fixed_point() {
        // n=3: first shuffle picks (2, 1) keep identity; second picks (0, 0)
        // give [1, 2, 0].
        let mut source = Scripted {
            picks: vec![2, 1, 0, 0],
            calls: 0,
        };
        let perm = derangement(3, &mut source).unwrap();
        assert_eq!(perm, vec![1, 2, 0]);
        assert_eq!(source.calls, 4);
    }

    #[test]
    fn zero_budget_fails_for_non_empty_input() {
        let err = derangement_with_budget(3, &mut seeded(1), 0).unwrap_err();
        assert_eq!(err, DerangementError::Unreachable { len: 3, attempts: 0 });
    }

    #[test]
    fn is_derangement_rejects_fixed_points_and_repeats() {
        assert!(is_derangement(&[]));
        assert!(is_derangement(&[1, 0]));
        assert!(!is_derangement(&[0]));
        assert!(!is_derangement(&[1, 1]));
        assert!(!is_derangement(&[2, 0]));
        assert!(!is_derangement(&[1, 0, 2]));
    }

    #[test]
    fn all_derangements_of_three_are_reachable() {
        let mut seen = std::collections::HashSet::new();
        let mut source = seeded(99);
        for _ in 0..200 {
            seen.insert(derangement(3, &mut source).unwrap());
        }
        let expected: std::collections::HashSet<Vec<usize>> =
            [vec![1, 2, 0], vec![2, 0, 1]].into_iter().collect();
        assert_eq!(seen, expected);
    }
}
