//! TSP Optimizer Library
//!
//! Heuristic solver for the planar symmetric Traveling Salesman Problem.
//!
//! # Features
//!
//! - Construction heuristics (Nearest Neighbor, Nearest/Farthest/Arbitrary Insertion, Cheapest Insertion)
//! - Multi-start driver, sequential or on the rayon thread pool
//! - 3-opt local search
//! - Benchmark pipeline with CSV and JSON export
//!
//! # Example
//!
//! ```
//! use tsp_optimizer::instance::Instance;
//! use tsp_optimizer::heuristics::construction::Method;
//! use tsp_optimizer::heuristics::multi_start::MultiStartConstruction;
//! use tsp_optimizer::heuristics::local_search::{LocalSearch, ThreeOptSearch};
//!
//! let instance = Instance::random(30, 1000, 1000, 42);
//! let matrix = instance.distance_matrix();
//!
//! // Construct initial solution
//! let multi_start = MultiStartConstruction::for_method(Method::CheapestInsertion);
//! let solution = multi_start.construct(&matrix);
//!
//! // Improve with 3-opt
//! let improved = ThreeOptSearch::new().improve(&matrix, &solution);
//! assert!(improved.cost <= solution.cost + 1e-9);
//!
//! println!("Solution cost: {:.2}", improved.cost);
//! ```

pub mod instance;
pub mod distance;
pub mod solution;
pub mod heuristics;
pub mod benchmark;

pub use distance::DistanceMatrix;
pub use instance::{CityId, Instance};
pub use solution::{Solution, Tour};
