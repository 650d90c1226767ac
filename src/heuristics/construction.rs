use crate::distance::DistanceMatrix;
use crate::instance::CityId;
use crate::solution::Tour;
use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Single-start tour construction.
///
/// `cities` fixes the iteration order used for tie-breaking; callers pass
/// ids in ascending order. `rng` is only consumed by stochastic heuristics.
pub trait ConstructionHeuristic {
    fn construct_from(
        &self,
        start: CityId,
        cities: &[CityId],
        matrix: &DistanceMatrix,
        rng: &mut ChaCha8Rng,
    ) -> Tour;

    fn name(&self) -> &str;

    /// Whether repeated runs from the same start can differ
    fn is_stochastic(&self) -> bool {
        false
    }
}

/// All cities except `start`, in the given order
fn remaining(cities: &[CityId], start: CityId) -> Vec<CityId> {
    cities.iter().copied().filter(|&c| c != start).collect()
}



/// Nearest Neighbor Heuristic
///
/// Builds a tour by repeatedly moving to the closest unvisited city.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestNeighborHeuristic;

impl NearestNeighborHeuristic {
    pub fn new() -> Self {
        NearestNeighborHeuristic
    }

    /// Index in `unvisited` of the city closest to `current`, first one on ties
    fn find_nearest(&self, matrix: &DistanceMatrix, current: CityId, unvisited: &[CityId]) -> Option<usize> {
        unvisited.iter()
            .enumerate()
            .min_by_key(|&(_, &c)| OrderedFloat(matrix.distance(current, c)))
            .map(|(idx, _)| idx)
    }
}

impl ConstructionHeuristic for NearestNeighborHeuristic {
    fn construct_from(
        &self,
        start: CityId,
        cities: &[CityId],
        matrix: &DistanceMatrix,
        _rng: &mut ChaCha8Rng,
    ) -> Tour {
        let mut unvisited = remaining(cities, start);
        let mut tour = Vec::with_capacity(unvisited.len() + 1);
        tour.push(start);

        let mut current = start;
        while let Some(idx) = self.find_nearest(matrix, current, &unvisited) {
            let next = unvisited.remove(idx);
            tour.push(next);
            current = next;
        }

        tour
    }

    fn name(&self) -> &str {
        "Nearest Neighbor"
    }
}



/// Cheapest way of inserting one city into a subtour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Insertion {
    /// Index at which the city is inserted
    pub position: usize,
    /// Added length `d(c1, node) + d(node, c2) - d(c1, c2)`
    pub cost: f64,
}

/// Find the cheapest insertion position for `node` in a cyclic subtour.
///
/// Every consecutive pair, including the closing one, is tried; the first
/// minimal edge wins.
pub fn find_best_insertion(subtour: &[CityId], node: CityId, matrix: &DistanceMatrix) -> Insertion {
    let mut best = Insertion {
        position: subtour.len(),
        cost: f64::INFINITY,
    };

    for i in 0..subtour.len() {
        let c1 = subtour[i];
        let c2 = subtour[(i + 1) % subtour.len()];

        let cost = matrix.distance(c1, node) + matrix.distance(node, c2) - matrix.distance(c1, c2);

        if cost < best.cost {
            best = Insertion { position: i + 1, cost };
        }
    }

    best
}

/// Picks the city that joins `start` in the initial two-city subtour.
///
/// Returns an index into `unvisited`, or `None` when it is empty.
pub trait InitialSelector {
    fn select_initial(
        &self,
        start: CityId,
        unvisited: &[CityId],
        matrix: &DistanceMatrix,
        rng: &mut ChaCha8Rng,
    ) -> Option<usize>;
}

/// Picks the next city to insert into the subtour.
///
/// Returns an index into `unvisited`, or `None` when it is empty.
pub trait NextSelector {
    fn select_next(
        &self,
        subtour: &[CityId],
        unvisited: &[CityId],
        matrix: &DistanceMatrix,
        rng: &mut ChaCha8Rng,
    ) -> Option<usize>;
}

/// Nearest selection: closest city to the start, then the unvisited city
/// closest to any city of the subtour
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestSelection;

impl InitialSelector for NearestSelection {
    fn select_initial(
        &self,
        start: CityId,
        unvisited: &[CityId],
        matrix: &DistanceMatrix,
        _rng: &mut ChaCha8Rng,
    ) -> Option<usize> {
        unvisited.iter()
            .enumerate()
            .min_by_key(|&(_, &r)| OrderedFloat(matrix.distance(start, r)))
            .map(|(idx, _)| idx)
    }
}

impl NextSelector for NearestSelection {
    fn select_next(
        &self,
        subtour: &[CityId],
        unvisited: &[CityId],
        matrix: &DistanceMatrix,
        _rng: &mut ChaCha8Rng,
    ) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;

        for (idx, &r) in unvisited.iter().enumerate() {
            for &j in subtour {
                let dist = matrix.distance(r, j);
                if best.map_or(true, |(_, min_dist)| dist < min_dist) {
                    best = Some((idx, dist));
                }
            }
        }

        best.map(|(idx, _)| idx)
    }
}

/// Farthest selection: farthest city from the start, then the unvisited
/// city whose distance to the subtour is the largest
#[derive(Debug, Clone, Copy, Default)]
pub struct FarthestSelection;

impl InitialSelector for FarthestSelection {
    fn select_initial(
        &self,
        start: CityId,
        unvisited: &[CityId],
        matrix: &DistanceMatrix,
        _rng: &mut ChaCha8Rng,
    ) -> Option<usize> {
        // First maximum wins on ties
        let mut best: Option<(usize, f64)> = None;

        for (idx, &k) in unvisited.iter().enumerate() {
            let dist = matrix.distance(start, k);
            if best.map_or(true, |(_, max_dist)| dist > max_dist) {
                best = Some((idx, dist));
            }
        }

        best.map(|(idx, _)| idx)
    }
}

impl NextSelector for FarthestSelection {
    fn select_next(
        &self,
        subtour: &[CityId],
        unvisited: &[CityId],
        matrix: &DistanceMatrix,
        _rng: &mut ChaCha8Rng,
    ) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;

        for (idx, &k) in unvisited.iter().enumerate() {
            let min_dist_to_subtour = subtour.iter()
                .map(|&j| matrix.distance(k, j))
                .fold(f64::INFINITY, f64::min);

            if best.map_or(true, |(_, max_of_min)| min_dist_to_subtour > max_of_min) {
                best = Some((idx, min_dist_to_subtour));
            }
        }

        best.map(|(idx, _)| idx)
    }
}

/// Arbitrary selection: uniformly random unvisited city at every step
#[derive(Debug, Clone, Copy, Default)]
pub struct ArbitrarySelection;

impl ArbitrarySelection {
    fn pick(&self, unvisited: &[CityId], rng: &mut ChaCha8Rng) -> Option<usize> {
        if unvisited.is_empty() {
            None
        } else {
            Some(rng.gen_range(0..unvisited.len()))
        }
    }
}

impl InitialSelector for ArbitrarySelection {
    fn select_initial(
        &self,
        _start: CityId,
        unvisited: &[CityId],
        _matrix: &DistanceMatrix,
        rng: &mut ChaCha8Rng,
    ) -> Option<usize> {
        self.pick(unvisited, rng)
    }
}

impl NextSelector for ArbitrarySelection {
    fn select_next(
        &self,
        _subtour: &[CityId],
        unvisited: &[CityId],
        _matrix: &DistanceMatrix,
        rng: &mut ChaCha8Rng,
    ) -> Option<usize> {
        self.pick(unvisited, rng)
    }
}

/// Generic insertion loop.
///
/// Seeds the subtour with `start` and the city chosen by `initial`, then
/// repeatedly inserts the city chosen by `next` at its cheapest position.
pub fn generic_insertion(
    start: CityId,
    cities: &[CityId],
    matrix: &DistanceMatrix,
    initial: &dyn InitialSelector,
    next: &dyn NextSelector,
    rng: &mut ChaCha8Rng,
) -> Tour {
    let mut unvisited = remaining(cities, start);
    let mut subtour = Vec::with_capacity(unvisited.len() + 1);
    subtour.push(start);

    match initial.select_initial(start, &unvisited, matrix, rng) {
        Some(idx) => subtour.push(unvisited.remove(idx)),
        None => return subtour,
    }

    while let Some(idx) = next.select_next(&subtour, &unvisited, matrix, rng) {
        let node = unvisited.remove(idx);
        let insertion = find_best_insertion(&subtour, node, matrix);
        subtour.insert(insertion.position, node);
    }

    subtour
}

/// Selection policy pair of an insertion heuristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InsertionStrategy {
    Nearest,
    Farthest,
    Arbitrary,
}

impl InsertionStrategy {
    pub fn initial_selector(&self) -> &'static dyn InitialSelector {
        match self {
            InsertionStrategy::Nearest => &NearestSelection,
            InsertionStrategy::Farthest => &FarthestSelection,
            InsertionStrategy::Arbitrary => &ArbitrarySelection,
        }
    }

    pub fn next_selector(&self) -> &'static dyn NextSelector {
        match self {
            InsertionStrategy::Nearest => &NearestSelection,
            InsertionStrategy::Farthest => &FarthestSelection,
            InsertionStrategy::Arbitrary => &ArbitrarySelection,
        }
    }
}



/// Insertion Heuristic
///
/// Nearest, farthest or arbitrary insertion depending on the strategy.
#[derive(Debug, Clone, Copy)]
pub struct InsertionHeuristic {
    pub strategy: InsertionStrategy,
}

impl InsertionHeuristic {
    pub fn new(strategy: InsertionStrategy) -> Self {
        InsertionHeuristic { strategy }
    }

    pub fn nearest() -> Self {
        Self::new(InsertionStrategy::Nearest)
    }

    pub fn farthest() -> Self {
        Self::new(InsertionStrategy::Farthest)
    }

    pub fn arbitrary() -> Self {
        Self::new(InsertionStrategy::Arbitrary)
    }
}

impl ConstructionHeuristic for InsertionHeuristic {
    fn construct_from(
        &self,
        start: CityId,
        cities: &[CityId],
        matrix: &DistanceMatrix,
        rng: &mut ChaCha8Rng,
    ) -> Tour {
        generic_insertion(
            start,
            cities,
            matrix,
            self.strategy.initial_selector(),
            self.strategy.next_selector(),
            rng,
        )
    }

    fn name(&self) -> &str {
        match self.strategy {
            InsertionStrategy::Nearest => "Nearest Insertion",
            InsertionStrategy::Farthest => "Farthest Insertion",
            InsertionStrategy::Arbitrary => "Arbitrary Insertion",
        }
    }

    fn is_stochastic(&self) -> bool {
        self.strategy == InsertionStrategy::Arbitrary
    }
}



/// Cheapest Insertion Heuristic
///
/// Starts like nearest insertion, then at every step inserts the
/// (city, position) pair with the smallest added length over all
/// unvisited cities.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheapestInsertionHeuristic;

impl CheapestInsertionHeuristic {
    pub fn new() -> Self {
        CheapestInsertionHeuristic
    }
}

impl ConstructionHeuristic for CheapestInsertionHeuristic {
    fn construct_from(
        &self,
        start: CityId,
        cities: &[CityId],
        matrix: &DistanceMatrix,
        rng: &mut ChaCha8Rng,
    ) -> Tour {
        let mut unvisited = remaining(cities, start);
        let mut subtour = Vec::with_capacity(unvisited.len() + 1);
        subtour.push(start);

        match NearestSelection.select_initial(start, &unvisited, matrix, rng) {
            Some(idx) => subtour.push(unvisited.remove(idx)),
            None => return subtour,
        }

        while !unvisited.is_empty() {
            let mut best: Option<(usize, Insertion)> = None;

            for (idx, &k) in unvisited.iter().enumerate() {
                let insertion = find_best_insertion(&subtour, k, matrix);
                if best.map_or(true, |(_, b)| insertion.cost < b.cost) {
                    best = Some((idx, insertion));
                }
            }

            match best {
                Some((idx, insertion)) => {
                    let node = unvisited.remove(idx);
                    subtour.insert(insertion.position, node);
                }
                None => break,
            }
        }

        subtour
    }

    fn name(&self) -> &str {
        "Cheapest Insertion"
    }
}



/// Construction methods selectable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    NearestNeighbor,
    NearestInsertion,
    FarthestInsertion,
    CheapestInsertion,
    ArbitraryInsertion,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::NearestNeighbor,
        Method::NearestInsertion,
        Method::FarthestInsertion,
        Method::CheapestInsertion,
        Method::ArbitraryInsertion,
    ];

    pub fn heuristic(&self) -> Box<dyn ConstructionHeuristic + Send + Sync> {
        match self {
            Method::NearestNeighbor => Box::new(NearestNeighborHeuristic::new()),
            Method::NearestInsertion => Box::new(InsertionHeuristic::nearest()),
            Method::FarthestInsertion => Box::new(InsertionHeuristic::farthest()),
            Method::CheapestInsertion => Box::new(CheapestInsertionHeuristic::new()),
            Method::ArbitraryInsertion => Box::new(InsertionHeuristic::arbitrary()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Method::NearestNeighbor => "Nearest Neighbor",
            Method::NearestInsertion => "Nearest Insertion",
            Method::FarthestInsertion => "Farthest Insertion",
            Method::CheapestInsertion => "Cheapest Insertion",
            Method::ArbitraryInsertion => "Arbitrary Insertion",
        }
    }

    pub fn abbreviation(&self) -> &'static str {
        match self {
            Method::NearestNeighbor => "NN",
            Method::NearestInsertion => "NI",
            Method::FarthestInsertion => "FI",
            Method::CheapestInsertion => "CI",
            Method::ArbitraryInsertion => "AI",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.abbreviation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::Instance;
    use crate::solution::Solution;

    fn create_square() -> Instance {
        Instance::from_points("square", vec![
            (1, 0.0, 0.0),
            (2, 0.0, 10.0),
            (3, 10.0, 10.0),
            (4, 10.0, 0.0),
        ]).unwrap()
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_nearest_neighbor_square() {
        let instance = create_square();
        let matrix = instance.distance_matrix();
        let cities = instance.city_ids();

        let tour = NearestNeighborHeuristic::new().construct_from(1, &cities, &matrix, &mut rng());

        assert_eq!(tour, vec![1, 2, 3, 4]);
        assert!((matrix.tour_cost(&tour) - 40.0).abs() < 1e-6);
    }

    #[test]
    fn test_nearest_neighbor_follows_closest() {
        let instance = Instance::from_points("line", vec![
            (1, 0.0, 0.0),
            (2, 5.0, 0.0),
            (3, 1.0, 0.0),
            (4, 2.0, 0.0),
        ]).unwrap();
        let matrix = instance.distance_matrix();

        let tour = NearestNeighborHeuristic::new()
            .construct_from(1, &instance.city_ids(), &matrix, &mut rng());
        assert_eq!(tour, vec![1, 3, 4, 2]);
    }

    #[test]
    fn test_find_best_insertion() {
        let instance = Instance::from_points("line", vec![
            (1, 0.0, 0.0),
            (2, 10.0, 0.0),
            (3, 10.0, 10.0),
            (4, 5.0, 1.0),
        ]).unwrap();
        let matrix = instance.distance_matrix();

        let insertion = find_best_insertion(&[1, 2, 3], 4, &matrix);
        assert_eq!(insertion.position, 1);
        let expected = matrix.distance(1, 4) + matrix.distance(4, 2) - matrix.distance(1, 2);
        assert!((insertion.cost - expected).abs() < 1e-12);
    }

    #[test]
    fn test_find_best_insertion_prefers_first_edge_on_ties() {
        let matrix = create_square().distance_matrix();

        // Both edges of the 2-city subtour are the same segment.
        let insertion = find_best_insertion(&[1, 2], 3, &matrix);
        assert_eq!(insertion.position, 1);
    }

    #[test]
    fn test_find_best_insertion_wraps_around() {
        let instance = Instance::from_points("wrap", vec![
            (1, 0.0, 0.0),
            (2, 10.0, 0.0),
            (3, 10.0, 10.0),
            (4, 0.0, 10.0),
            (5, -1.0, 5.0),
        ]).unwrap();
        let matrix = instance.distance_matrix();

        // Closing edge 4 -> 1 is the cheapest place for city 5.
        let insertion = find_best_insertion(&[1, 2, 3, 4], 5, &matrix);
        assert_eq!(insertion.position, 4);
    }

    #[test]
    fn test_selectors_on_square() {
        let matrix = create_square().distance_matrix();
        let unvisited = vec![2, 3, 4];

        assert_eq!(NearestSelection.select_initial(1, &unvisited, &matrix, &mut rng()), Some(0));
        assert_eq!(FarthestSelection.select_initial(1, &unvisited, &matrix, &mut rng()), Some(1));

        let unvisited = vec![3, 4];
        assert_eq!(NearestSelection.select_next(&[1, 2], &unvisited, &matrix, &mut rng()), Some(0));
        assert_eq!(FarthestSelection.select_next(&[1, 2], &unvisited, &matrix, &mut rng()), Some(0));

        assert_eq!(NearestSelection.select_next(&[1, 2], &[], &matrix, &mut rng()), None);
        assert_eq!(ArbitrarySelection.select_next(&[1, 2], &[], &matrix, &mut rng()), None);
    }

    #[test]
    fn test_farthest_selection_is_max_min() {
        let instance = Instance::from_points("maxmin", vec![
            (1, 0.0, 0.0),
            (2, 10.0, 0.0),
            (3, 5.0, 1.0),
            (4, 5.0, 8.0),
        ]).unwrap();
        let matrix = instance.distance_matrix();

        // City 3 is close to the subtour; city 4 is not.
        let idx = FarthestSelection.select_next(&[1, 2], &[3, 4], &matrix, &mut rng());
        assert_eq!(idx, Some(1));
    }

    #[test]
    fn test_nearest_insertion_square() {
        let instance = create_square();
        let matrix = instance.distance_matrix();

        let tour = InsertionHeuristic::nearest()
            .construct_from(1, &instance.city_ids(), &matrix, &mut rng());
        assert_eq!(tour, vec![1, 4, 3, 2]);
        assert!((matrix.tour_cost(&tour) - 40.0).abs() < 1e-6);
    }

    #[test]
    fn test_every_heuristic_returns_permutation() {
        for seed in 0..5 {
            let instance = Instance::random(12, 1000, 1000, seed);
            let matrix = instance.distance_matrix();
            let cities = instance.city_ids();

            for method in Method::ALL {
                let heuristic = method.heuristic();
                for &start in &cities {
                    let tour = heuristic.construct_from(start, &cities, &matrix, &mut rng());
                    let solution = Solution::from_tour(&matrix, tour, heuristic.name());

                    assert!(solution.is_permutation_of(&cities), "{} from {}", method, start);
                    assert_eq!(solution.position(start), Some(0));
                }
            }
        }
    }

    #[test]
    fn test_single_and_pair() {
        let single = Instance::from_points("one", vec![(7, 1.0, 2.0)]).unwrap();
        let matrix = single.distance_matrix();
        for method in Method::ALL {
            let tour = method.heuristic().construct_from(7, &[7], &matrix, &mut rng());
            assert_eq!(tour, vec![7]);
        }

        let pair = Instance::from_points("two", vec![(1, 0.0, 0.0), (2, 3.0, 4.0)]).unwrap();
        let matrix = pair.distance_matrix();
        for method in Method::ALL {
            let tour = method.heuristic().construct_from(1, &[1, 2], &matrix, &mut rng());
            assert_eq!(tour, vec![1, 2]);
            assert!((matrix.tour_cost(&tour) - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_arbitrary_insertion_reproducible() {
        let instance = Instance::random(15, 1000, 1000, 9);
        let matrix = instance.distance_matrix();
        let cities = instance.city_ids();
        let heuristic = InsertionHeuristic::arbitrary();

        let a = heuristic.construct_from(3, &cities, &matrix, &mut ChaCha8Rng::seed_from_u64(5));
        let b = heuristic.construct_from(3, &cities, &matrix, &mut ChaCha8Rng::seed_from_u64(5));
        assert_eq!(a, b);
        assert!(heuristic.is_stochastic());
        assert!(!InsertionHeuristic::nearest().is_stochastic());
    }

    #[test]
    fn test_cheapest_insertion_picks_global_minimum() {
        let instance = Instance::from_points("ci", vec![
            (1, 0.0, 0.0),
            (2, 10.0, 0.0),
            (3, 5.0, 0.5),
            (4, 5.0, 9.0),
        ]).unwrap();
        let matrix = instance.distance_matrix();

        let tour = CheapestInsertionHeuristic::new()
            .construct_from(1, &instance.city_ids(), &matrix, &mut rng());

        // Seeded with [1, 3]; inserting 2 adds 10.0, inserting 4 adds about 13.8.
        assert_eq!(tour, vec![1, 4, 2, 3]);
        let expected = 2.0 * 5.0_f64.hypot(9.0) + 2.0 * 5.0_f64.hypot(0.5);
        assert!((matrix.tour_cost(&tour) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_method_names() {
        assert_eq!(Method::ALL.len(), 5);
        for method in Method::ALL {
            assert_eq!(method.heuristic().name(), method.name());
        }
        assert_eq!(Method::CheapestInsertion.to_string(), "Cheapest Insertion (CI)");
    }
}
