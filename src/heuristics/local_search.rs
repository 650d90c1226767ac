//! Local search improvement for TSP tours.
//!
//! This module implements 3-opt segment reconnection with a
//! first-improvement strategy:
//! - three edges are cut, leaving four segments `S1 S2 S3 S4`
//! - the seven non-identity reconnections are tried in a fixed order
//! - the first improving one is adopted and the scan restarts
//!
//! The first and last segments stay in place, so the closing edge of the
//! cyclic tour is never touched by a move.

use crate::distance::DistanceMatrix;
use crate::instance::CityId;
use crate::solution::{Solution, Tour};

/// Minimum decrease for a move to count as an improvement
pub const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// Trait for local search improvement methods
pub trait LocalSearch {
    /// Return an improved copy of `solution`; the input is left untouched
    fn improve(&self, matrix: &DistanceMatrix, solution: &Solution) -> Solution;
    fn name(&self) -> &str;
}

/// Reconnection of the middle segments after cutting three edges.
///
/// Listed in evaluation order; `r` marks a reversed segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconnection {
    /// `S1 S2 S3r S4`
    ReverseThird,
    /// `S1 S2r S3 S4`
    ReverseSecond,
    /// `S1 S2r S3r S4`
    ReverseBoth,
    /// `S1 S3 S2 S4`
    Exchange,
    /// `S1 S3r S2 S4`
    ExchangeReverseThird,
    /// `S1 S3 S2r S4`
    ExchangeReverseSecond,
    /// `S1 S3r S2r S4`
    ExchangeReverseBoth,
}

impl Reconnection {
    pub const ALL: [Reconnection; 7] = [
        Reconnection::ReverseThird,
        Reconnection::ReverseSecond,
        Reconnection::ReverseBoth,
        Reconnection::Exchange,
        Reconnection::ExchangeReverseThird,
        Reconnection::ExchangeReverseSecond,
        Reconnection::ExchangeReverseBoth,
    ];

    /// Change in tour cost if applied at cut positions `(i, j, k)`.
    ///
    /// Only the three replaced edges are compared, which is exact for a
    /// symmetric matrix.
    pub fn delta(&self, matrix: &DistanceMatrix, tour: &[CityId], i: usize, j: usize, k: usize) -> f64 {
        let d = |x: CityId, y: CityId| matrix.distance(x, y);

        // S1 ends at a, S2 = b1..b2, S3 = c1..c2, S4 starts at e
        let a = tour[i];
        let (b1, b2) = (tour[i + 1], tour[j]);
        let (c1, c2) = (tour[j + 1], tour[k]);
        let e = tour[k + 1];

        let removed = d(a, b1) + d(b2, c1) + d(c2, e);
        let added = match self {
            Reconnection::ReverseThird => d(a, b1) + d(b2, c2) + d(c1, e),
            Reconnection::ReverseSecond => d(a, b2) + d(b1, c1) + d(c2, e),
            Reconnection::ReverseBoth => d(a, b2) + d(b1, c2) + d(c1, e),
            Reconnection::Exchange => d(a, c1) + d(c2, b1) + d(b2, e),
            Reconnection::ExchangeReverseThird => d(a, c2) + d(c1, b1) + d(b2, e),
            Reconnection::ExchangeReverseSecond => d(a, c1) + d(c2, b2) + d(b1, e),
            Reconnection::ExchangeReverseBoth => d(a, c2) + d(c1, b2) + d(b1, e),
        };

        added - removed
    }

    /// Build the reconnected tour for cut positions `(i, j, k)`
    pub fn apply(&self, tour: &[CityId], i: usize, j: usize, k: usize) -> Tour {
        let s1 = &tour[..=i];
        let s2 = &tour[i + 1..=j];
        let s3 = &tour[j + 1..=k];
        let s4 = &tour[k + 1..];

        let (first, first_reversed, second, second_reversed) = match self {
            Reconnection::ReverseThird => (s2, false, s3, true),
            Reconnection::ReverseSecond => (s2, true, s3, false),
            Reconnection::ReverseBoth => (s2, true, s3, true),
            Reconnection::Exchange => (s3, false, s2, false),
            Reconnection::ExchangeReverseThird => (s3, true, s2, false),
            Reconnection::ExchangeReverseSecond => (s3, false, s2, true),
            Reconnection::ExchangeReverseBoth => (s3, true, s2, true),
        };

        let mut result = Vec::with_capacity(tour.len());
        result.extend_from_slice(s1);
        push_segment(&mut result, first, first_reversed);
        push_segment(&mut result, second, second_reversed);
        result.extend_from_slice(s4);
        result
    }
}

fn push_segment(tour: &mut Tour, segment: &[CityId], reversed: bool) {
    if reversed {
        tour.extend(segment.iter().rev());
    } else {
        tour.extend_from_slice(segment);
    }
}

/// An improving 3-opt move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThreeOptMove {
    pub i: usize,
    pub j: usize,
    pub k: usize,
    pub reconnection: Reconnection,
    /// Cost change, negative for an improvement
    pub delta: f64,
}

/// 3-Opt Local Search
///
/// Cuts three edges, tries the seven reconnections and adopts the first
/// improving one, until a full scan finds nothing.
#[derive(Debug, Clone, Default)]
pub struct ThreeOptSearch {
    /// Evaluate candidates by re-costing the whole tour instead of the
    /// three-edge delta
    pub full_evaluation: bool,
    /// Upper bound on the number of adopted moves
    pub max_passes: Option<usize>,
}

impl ThreeOptSearch {
    pub fn new() -> Self {
        ThreeOptSearch {
            full_evaluation: false,
            max_passes: None,
        }
    }

    pub fn full_evaluation() -> Self {
        ThreeOptSearch {
            full_evaluation: true,
            max_passes: None,
        }
    }

    pub fn with_max_passes(mut self, max_passes: Option<usize>) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// First improving move in scan order, if any
    pub fn find_improving_move(&self, matrix: &DistanceMatrix, tour: &[CityId]) -> Option<ThreeOptMove> {
        let n = tour.len();
        if n < 4 {
            return None;
        }

        let current_cost = if self.full_evaluation { matrix.tour_cost(tour) } else { 0.0 };

        for i in 0..n - 3 {
            for j in i + 1..n - 2 {
                for k in j + 1..n - 1 {
                    for reconnection in Reconnection::ALL {
                        let delta = if self.full_evaluation {
                            let candidate = reconnection.apply(tour, i, j, k);
                            matrix.tour_cost(&candidate) - current_cost
                        } else {
                            reconnection.delta(matrix, tour, i, j, k)
                        };

                        if delta < -IMPROVEMENT_EPSILON {
                            return Some(ThreeOptMove { i, j, k, reconnection, delta });
                        }
                    }
                }
            }
        }

        None
    }

    /// Improve a tour until it is 3-opt optimal or the move cap is hit.
    ///
    /// Returns the new tour and its cost. Tours with fewer than four cities
    /// come back unchanged.
    pub fn optimize(&self, tour: &[CityId], matrix: &DistanceMatrix) -> (Tour, f64) {
        let mut current = tour.to_vec();
        if current.len() < 4 {
            let cost = matrix.tour_cost(&current);
            return (current, cost);
        }

        let initial_cost = matrix.tour_cost(&current);
        let mut moves = 0;

        while self.max_passes.map_or(true, |max| moves < max) {
            match self.find_improving_move(matrix, &current) {
                Some(mv) => {
                    current = mv.reconnection.apply(&current, mv.i, mv.j, mv.k);
                    moves += 1;
                    log::trace!(
                        "3-Opt move {}: {:?} at ({}, {}, {}) delta {:.4}",
                        moves, mv.reconnection, mv.i, mv.j, mv.k, mv.delta
                    );
                }
                None => break,
            }
        }

        // Recompute rather than accumulate deltas
        let cost = matrix.tour_cost(&current);
        log::debug!("3-Opt: {:.2} -> {:.2} after {} moves", initial_cost, cost, moves);

        (current, cost)
    }
}

impl LocalSearch for ThreeOptSearch {
    fn improve(&self, matrix: &DistanceMatrix, solution: &Solution) -> Solution {
        let start = std::time::Instant::now();
        let (tour, cost) = self.optimize(&solution.tour, matrix);

        Solution {
            tour,
            cost,
            algorithm: format!("{} + {}", solution.algorithm, self.name()),
            computation_time: start.elapsed().as_secs_f64(),
        }
    }

    fn name(&self) -> &str {
        "3-Opt"
    }
}

/// Run 3-opt with default settings
pub fn three_opt(tour: &[CityId], matrix: &DistanceMatrix) -> (Tour, f64) {
    ThreeOptSearch::new().optimize(tour, matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::construction::Method;
    use crate::heuristics::multi_start::MultiStartConstruction;
    use crate::instance::Instance;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    fn create_square() -> Instance {
        Instance::from_points("square", vec![
            (1, 0.0, 0.0),
            (2, 0.0, 10.0),
            (3, 10.0, 10.0),
            (4, 10.0, 0.0),
        ]).unwrap()
    }

    fn shuffled_tour(instance: &Instance, seed: u64) -> Tour {
        let mut tour = instance.city_ids();
        tour.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
        tour
    }

    /// Brute-force optimum, first city fixed
    fn optimal_cost(matrix: &DistanceMatrix) -> f64 {
        fn permute(matrix: &DistanceMatrix, tour: &mut Vec<CityId>, rest: &mut Vec<CityId>, best: &mut f64) {
            if rest.is_empty() {
                *best = best.min(matrix.tour_cost(tour));
                return;
            }
            for idx in 0..rest.len() {
                let city = rest.remove(idx);
                tour.push(city);
                permute(matrix, tour, rest, best);
                tour.pop();
                rest.insert(idx, city);
            }
        }

        let ids = matrix.ids();
        let mut tour = vec![ids[0]];
        let mut rest = ids[1..].to_vec();
        let mut best = f64::INFINITY;
        permute(matrix, &mut tour, &mut rest, &mut best);
        best
    }

    #[test]
    fn test_small_tours_unchanged() {
        let instance = Instance::from_points("tri", vec![
            (1, 0.0, 0.0),
            (2, 3.0, 0.0),
            (3, 3.0, 4.0),
        ]).unwrap();
        let matrix = instance.distance_matrix();

        let (tour, cost) = three_opt(&[2, 1, 3], &matrix);
        assert_eq!(tour, vec![2, 1, 3]);
        assert!((cost - 12.0).abs() < 1e-9);

        let (tour, cost) = three_opt(&[], &matrix);
        assert!(tour.is_empty());
        assert_eq!(cost, 0.0);
    }

    #[test]
    fn test_uncrosses_square() {
        let matrix = create_square().distance_matrix();
        let crossed = vec![1, 3, 2, 4];

        let (tour, cost) = three_opt(&crossed, &matrix);
        assert!((cost - 40.0).abs() < 1e-9);
        assert_eq!(tour, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_delta_matches_full_recost() {
        let instance = Instance::random(10, 100, 100, 5);
        let matrix = instance.distance_matrix();
        let tour = shuffled_tour(&instance, 9);
        let base = matrix.tour_cost(&tour);
        let n = tour.len();

        for (i, j, k) in [(0, 1, 2), (0, 4, 8), (2, 5, 7), (n - 4, n - 3, n - 2)] {
            for reconnection in Reconnection::ALL {
                let candidate = reconnection.apply(&tour, i, j, k);
                let delta = reconnection.delta(&matrix, &tour, i, j, k);

                assert_eq!(candidate.len(), n);
                assert!((matrix.tour_cost(&candidate) - base - delta).abs() < 1e-9, "{:?}", reconnection);
            }
        }
    }

    #[test]
    fn test_apply_segment_order() {
        let tour = vec![1, 2, 3, 4, 5, 6, 7];

        assert_eq!(Reconnection::ReverseThird.apply(&tour, 0, 2, 4), vec![1, 2, 3, 5, 4, 6, 7]);
        assert_eq!(Reconnection::ReverseSecond.apply(&tour, 0, 2, 4), vec![1, 3, 2, 4, 5, 6, 7]);
        assert_eq!(Reconnection::Exchange.apply(&tour, 0, 2, 4), vec![1, 4, 5, 2, 3, 6, 7]);
        assert_eq!(Reconnection::ExchangeReverseBoth.apply(&tour, 0, 2, 4), vec![1, 5, 4, 3, 2, 6, 7]);
    }

    #[test]
    fn test_never_worsens_and_keeps_permutation() {
        for seed in 0..5 {
            let instance = Instance::random(15, 1000, 1000, seed);
            let matrix = instance.distance_matrix();
            let tour = shuffled_tour(&instance, seed + 50);
            let before = tour.clone();

            let (improved, cost) = three_opt(&tour, &matrix);

            assert_eq!(tour, before);
            assert!(cost <= matrix.tour_cost(&tour) + 1e-9);
            assert!((cost - matrix.tour_cost(&improved)).abs() < 1e-9);

            let solution = Solution::trivial(&improved, "check");
            assert!(solution.is_permutation_of(matrix.ids()));
        }
    }

    #[test]
    fn test_result_is_three_opt_optimal() {
        let instance = Instance::random(12, 500, 500, 21);
        let matrix = instance.distance_matrix();
        let search = ThreeOptSearch::new();

        let (tour, _) = search.optimize(&shuffled_tour(&instance, 4), &matrix);
        assert!(search.find_improving_move(&matrix, &tour).is_none());
    }

    #[test]
    fn test_full_evaluation_agrees_with_delta() {
        for seed in 0..3 {
            let instance = Instance::random(10, 1000, 1000, 300 + seed);
            let matrix = instance.distance_matrix();
            let tour = shuffled_tour(&instance, seed);

            let (fast, fast_cost) = ThreeOptSearch::new().optimize(&tour, &matrix);
            let (full, full_cost) = ThreeOptSearch::full_evaluation().optimize(&tour, &matrix);

            assert_eq!(fast, full);
            assert!((fast_cost - full_cost).abs() < 1e-9);
        }
    }

    #[test]
    fn test_max_passes_caps_moves() {
        let instance = Instance::random(12, 1000, 1000, 8);
        let matrix = instance.distance_matrix();
        let tour = shuffled_tour(&instance, 3);

        let (same, cost) = ThreeOptSearch::new().with_max_passes(Some(0)).optimize(&tour, &matrix);
        assert_eq!(same, tour);
        assert!((cost - matrix.tour_cost(&tour)).abs() < 1e-9);

        let (one, one_cost) = ThreeOptSearch::new().with_max_passes(Some(1)).optimize(&tour, &matrix);
        let (_, full_cost) = three_opt(&tour, &matrix);
        assert_ne!(one, tour);
        assert!(one_cost < cost);
        assert!(full_cost <= one_cost + 1e-9);
    }

    #[test]
    fn test_improve_leaves_input_solution() {
        let matrix = create_square().distance_matrix();
        let solution = Solution::from_tour(&matrix, vec![1, 3, 2, 4], "Manual");

        let improved = ThreeOptSearch::new().improve(&matrix, &solution);

        assert_eq!(solution.tour, vec![1, 3, 2, 4]);
        assert!((improved.cost - 40.0).abs() < 1e-9);
        assert_eq!(improved.algorithm, "Manual + 3-Opt");
    }

    #[test]
    fn test_square_every_method_with_three_opt() {
        let matrix = create_square().distance_matrix();

        for method in Method::ALL {
            let constructed = MultiStartConstruction::for_method(method).construct(&matrix);
            let improved = ThreeOptSearch::new().improve(&matrix, &constructed);
            assert!((improved.cost - 40.0).abs() < 1e-6, "{}", method);
        }
    }

    #[test]
    fn test_insertion_within_twice_optimal() {
        for seed in 0..6 {
            let matrix = Instance::random(5, 100, 100, 40 + seed).distance_matrix();
            let optimum = optimal_cost(&matrix);

            for method in [Method::NearestInsertion, Method::CheapestInsertion] {
                let constructed = MultiStartConstruction::for_method(method).construct(&matrix);
                assert!(constructed.cost >= optimum - 1e-9);
                assert!(constructed.cost <= 2.0 * optimum + 1e-9, "{} seed {}", method, seed);

                let improved = ThreeOptSearch::new().improve(&matrix, &constructed);
                assert!(improved.cost >= optimum - 1e-9);
                assert!(improved.cost <= constructed.cost + 1e-9);
            }
        }
    }
}
