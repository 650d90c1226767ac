//! Heuristics module for the TSP.
//! 
//! This module exports the construction heuristics, the multi-start driver
//! and the 3-opt improvement.

pub mod construction;
pub mod multi_start;
pub mod local_search;

pub use construction::*;
pub use multi_start::*;
pub use local_search::*;
