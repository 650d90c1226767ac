//! Solution representation for the TSP.
//!
//! A solution pairs a tour (a cyclic visiting order of city ids) with its
//! evaluated cost and some bookkeeping about how it was produced.

use crate::distance::DistanceMatrix;
use crate::instance::CityId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Cyclic visiting order; the last city connects back to the first
pub type Tour = Vec<CityId>;

/// Represents a solution to the TSP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// The tour as a sequence of city ids
    pub tour: Tour,
    /// Total cyclic tour length
    pub cost: f64,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
}

impl Solution {
    /// Create a new empty solution
    pub fn new() -> Self {
        Solution {
            tour: Vec::new(),
            cost: f64::INFINITY,
            algorithm: String::new(),
            computation_time: 0.0,
        }
    }

    /// Create a solution from a tour
    pub fn from_tour(matrix: &DistanceMatrix, tour: Tour, algorithm: &str) -> Self {
        let cost = matrix.tour_cost(&tour);

        Solution {
            tour,
            cost,
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
        }
    }

    /// Solution for an instance with at most one city: ids in given order, cost 0
    pub fn trivial(ids: &[CityId], algorithm: &str) -> Self {
        Solution {
            tour: ids.to_vec(),
            cost: 0.0,
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
        }
    }

    /// Re-evaluate the cost of the current tour
    pub fn validate(&mut self, matrix: &DistanceMatrix) {
        self.cost = matrix.tour_cost(&self.tour);
    }

    /// Check that every id appears exactly once and nothing else does
    pub fn is_permutation_of(&self, ids: &[CityId]) -> bool {
        if self.tour.len() != ids.len() {
            return false;
        }

        let unique: HashSet<CityId> = self.tour.iter().copied().collect();
        unique.len() == ids.len() && ids.iter().all(|id| unique.contains(id))
    }

    /// Get the position of a city in the tour
    pub fn position(&self, city: CityId) -> Option<usize> {
        self.tour.iter().position(|&c| c == city)
    }
}

impl Default for Solution {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Cost: {:.2}", self.cost)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        writeln!(f, "  Tour: {:?}", self.tour)
    }
}
