//! Multi-start driver for construction heuristics.
//!
//! Runs a single-start heuristic from every city (several times per city
//! for stochastic heuristics) and keeps the cheapest tour. Runs are
//! independent, so they can be spread over the rayon thread pool; the
//! reduction orders candidates by `(cost, job key)` so the winner does not
//! depend on scheduling.

use crate::distance::DistanceMatrix;
use crate::heuristics::construction::{ConstructionHeuristic, Method};
use crate::instance::CityId;
use crate::solution::{Solution, Tour};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::cmp::Ordering;

/// Identifies one run: position of the start city in the iteration order
/// and repeat index for that start
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobKey {
    pub start_index: usize,
    pub run: usize,
}

/// Best tour found so far, carried through the multi-start loop
#[derive(Debug, Clone)]
pub struct BestTour {
    pub tour: Tour,
    pub cost: f64,
    pub key: JobKey,
}

impl BestTour {
    /// Strictly better: lower cost, or equal cost and an earlier job
    pub fn is_better_than(&self, other: &BestTour) -> bool {
        match self.cost.total_cmp(&other.cost) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => self.key < other.key,
        }
    }

    /// Keep the better of two candidates
    pub fn merge(self, other: BestTour) -> BestTour {
        if other.is_better_than(&self) {
            other
        } else {
            self
        }
    }
}

/// Multi-Start Construction
///
/// Wraps a single-start heuristic and tries every city as a start.
pub struct MultiStartConstruction {
    heuristic: Box<dyn ConstructionHeuristic + Send + Sync>,
    /// Repeats per start city, only used by stochastic heuristics
    pub runs_per_start: usize,
    /// Base seed for the per-run random streams
    pub seed: u64,
    /// Spread runs over the rayon thread pool
    pub parallel: bool,
}

impl MultiStartConstruction {
    pub fn new(heuristic: Box<dyn ConstructionHeuristic + Send + Sync>) -> Self {
        MultiStartConstruction {
            heuristic,
            runs_per_start: 1,
            seed: 42,
            parallel: false,
        }
    }

    pub fn for_method(method: Method) -> Self {
        Self::new(method.heuristic())
    }

    pub fn with_runs_per_start(mut self, runs: usize) -> Self {
        self.runs_per_start = runs;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn name(&self) -> &str {
        self.heuristic.name()
    }

    /// Number of runs per start city
    fn runs(&self) -> usize {
        if self.heuristic.is_stochastic() {
            self.runs_per_start.max(1)
        } else {
            1
        }
    }

    /// Independent random stream for one job, derived from the base seed
    fn job_rng(&self, key: JobKey) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(((key.start_index as u64) << 32) | key.run as u64);
        rng
    }

    fn run_job(&self, key: JobKey, cities: &[CityId], matrix: &DistanceMatrix) -> BestTour {
        let mut rng = self.job_rng(key);
        let tour = self.heuristic.construct_from(cities[key.start_index], cities, matrix, &mut rng);
        let cost = matrix.tour_cost(&tour);

        log::trace!(
            "{}: start {} run {} -> {:.2}",
            self.heuristic.name(), cities[key.start_index], key.run, cost
        );

        BestTour { tour, cost, key }
    }

    /// Run the heuristic from every city and return the cheapest tour
    pub fn construct(&self, matrix: &DistanceMatrix) -> Solution {
        let start = std::time::Instant::now();
        let cities = matrix.ids();

        if cities.len() <= 1 {
            return Solution::trivial(cities, self.name());
        }

        let runs = self.runs();
        let jobs: Vec<JobKey> = (0..cities.len())
            .flat_map(|start_index| (0..runs).map(move |run| JobKey { start_index, run }))
            .collect();

        let best = if self.parallel {
            jobs.par_iter()
                .map(|&key| self.run_job(key, cities, matrix))
                .reduce_with(BestTour::merge)
        } else {
            jobs.iter()
                .map(|&key| self.run_job(key, cities, matrix))
                .reduce(BestTour::merge)
        };

        let mut solution = match best {
            Some(best) => {
                log::debug!(
                    "{}: best {:.2} from start {} (run {}) over {} runs",
                    self.name(), best.cost, cities[best.key.start_index], best.key.run, jobs.len()
                );
                Solution {
                    tour: best.tour,
                    cost: best.cost,
                    algorithm: self.name().to_string(),
                    computation_time: 0.0,
                }
            }
            None => Solution::trivial(cities, self.name()),
        };

        solution.computation_time = start.elapsed().as_secs_f64();
        solution
    }

    /// Single run from a fixed start city (first random stream for that start)
    pub fn construct_from(&self, start_city: CityId, matrix: &DistanceMatrix) -> Solution {
        let cities = matrix.ids();

        if cities.len() <= 1 {
            return Solution::trivial(cities, self.name());
        }

        let start_index = cities.iter().position(|&c| c == start_city).unwrap_or(cities.len());
        let mut rng = self.job_rng(JobKey { start_index, run: 0 });
        let tour = self.heuristic.construct_from(start_city, cities, matrix, &mut rng);

        Solution::from_tour(matrix, tour, self.name())
    }
}
