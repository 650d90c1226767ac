//! Run pipeline for comparing construction methods.
//!
//! Runs each selected method through multi-start construction and an
//! optional 3-opt pass, times both phases, and exports the results as CSV,
//! a JSON run report or a plain-text summary.

use crate::distance::DistanceMatrix;
use crate::heuristics::construction::Method;
use crate::heuristics::local_search::{LocalSearch, ThreeOptSearch};
use crate::heuristics::multi_start::MultiStartConstruction;
use crate::solution::Tour;

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Result of running one method on an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodResult {
    /// Method name
    pub method: String,
    /// Tour length after construction
    pub initial_distance: f64,
    /// Tour length after 3-opt (equal to the initial one when disabled)
    pub final_distance: f64,
    /// Relative gain of 3-opt over construction, in percent
    pub improvement_pct: f64,
    /// Construction time in seconds
    pub construction_time: f64,
    /// 3-opt time in seconds
    pub refinement_time: f64,
    /// Construction plus 3-opt time
    pub total_time: f64,
    /// Final tour
    pub tour: Tour,
}

/// Flat CSV row, values rounded for display
#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    #[serde(rename = "Method")]
    method: &'a str,
    #[serde(rename = "Initial Distance")]
    initial_distance: f64,
    #[serde(rename = "Final Distance")]
    final_distance: f64,
    #[serde(rename = "Improvement (%)")]
    improvement_pct: f64,
    #[serde(rename = "Construction Time (s)")]
    construction_time: f64,
    #[serde(rename = "3-Opt Time (s)")]
    refinement_time: f64,
    #[serde(rename = "Total Time (s)")]
    total_time: f64,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

impl<'a> From<&'a MethodResult> for ResultRow<'a> {
    fn from(result: &'a MethodResult) -> Self {
        ResultRow {
            method: &result.method,
            initial_distance: round_to(result.initial_distance, 2),
            final_distance: round_to(result.final_distance, 2),
            improvement_pct: round_to(result.improvement_pct, 2),
            construction_time: round_to(result.construction_time, 3),
            refinement_time: round_to(result.refinement_time, 3),
            total_time: round_to(result.total_time, 3),
        }
    }
}

/// Percentage gain of `final_distance` over `initial_distance`
pub fn improvement_percentage(initial_distance: f64, final_distance: f64, use_three_opt: bool) -> f64 {
    if use_three_opt && initial_distance > 0.0 {
        (initial_distance - final_distance) / initial_distance * 100.0
    } else {
        0.0
    }
}

/// One run over all selected methods, ready for JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Local time of the run, RFC 3339
    pub timestamp: String,
    pub num_cities: usize,
    pub use_three_opt: bool,
    pub results: Vec<MethodResult>,
}

impl RunReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write the report as pretty JSON
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let mut file = File::create(path)?;
        let json = self.to_json()?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Methods to run, in order
    pub methods: Vec<Method>,
    /// Runs per start city for Arbitrary Insertion
    pub arbitrary_runs: usize,
    /// Refine each constructed tour with 3-opt
    pub use_three_opt: bool,
    /// Seed for stochastic methods
    pub seed: u64,
    /// Spread multi-start runs over the thread pool
    pub parallel: bool,
    /// Cap on adopted 3-opt moves
    pub max_three_opt_passes: Option<usize>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            methods: vec![
                Method::NearestNeighbor,
                Method::NearestInsertion,
                Method::FarthestInsertion,
                Method::CheapestInsertion,
            ],
            arbitrary_runs: 5,
            use_three_opt: true,
            seed: 42,
            parallel: true,
            max_three_opt_passes: None,
        }
    }
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<MethodResult>,
    num_cities: usize,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            results: Vec::new(),
            num_cities: 0,
        }
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Construct with one method, refine if enabled, and record the result
    pub fn run_method(&mut self, matrix: &DistanceMatrix, method: Method) -> &MethodResult {
        self.num_cities = matrix.len();

        let construction = MultiStartConstruction::for_method(method)
            .with_runs_per_start(self.config.arbitrary_runs)
            .with_seed(self.config.seed)
            .with_parallel(self.config.parallel);
        let initial = construction.construct(matrix);

        let (tour, final_distance, refinement_time) = if self.config.use_three_opt {
            let search = ThreeOptSearch::new().with_max_passes(self.config.max_three_opt_passes);
            let refined = search.improve(matrix, &initial);
            (refined.tour, refined.cost, refined.computation_time)
        } else {
            (initial.tour.clone(), initial.cost, 0.0)
        };

        let result = MethodResult {
            method: method.name().to_string(),
            initial_distance: initial.cost,
            final_distance,
            improvement_pct: improvement_percentage(initial.cost, final_distance, self.config.use_three_opt),
            construction_time: initial.computation_time,
            refinement_time,
            total_time: initial.computation_time + refinement_time,
            tour,
        };

        log::info!(
            "{}: {:.2} -> {:.2} ({:.2}%) in {:.3}s",
            result.method, result.initial_distance, result.final_distance,
            result.improvement_pct, result.total_time
        );

        self.results.push(result);
        &self.results[self.results.len() - 1]
    }

    /// Run every configured method
    pub fn run_all(&mut self, matrix: &DistanceMatrix) {
        log::info!(
            "Running {} methods on {} cities (3-opt: {})",
            self.config.methods.len(), matrix.len(), self.config.use_three_opt
        );

        let methods = self.config.methods.clone();
        for method in methods {
            self.run_method(matrix, method);
        }
    }

    /// Get all results
    pub fn results(&self) -> &[MethodResult] {
        &self.results
    }

    /// Result with the shortest final tour, first one on ties
    pub fn best_result(&self) -> Option<&MethodResult> {
        self.results.iter().reduce(|best, r| {
            if r.final_distance < best.final_distance { r } else { best }
        })
    }

    /// Write one flat row per result
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(writer);

        for result in &self.results {
            writer.serialize(ResultRow::from(result))?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        self.write_csv(file)?;
        Ok(())
    }

    /// Snapshot of the run for JSON export
    pub fn report(&self) -> RunReport {
        RunReport {
            timestamp: chrono::Local::now().to_rfc3339(),
            num_cities: self.num_cities,
            use_three_opt: self.config.use_three_opt,
            results: self.results.clone(),
        }
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("         TSP Heuristics Report\n");
        report.push_str("========================================\n\n");

        report.push_str(&format!("Cities: {}\n", self.num_cities));
        report.push_str(&format!("3-Opt: {}\n\n", if self.config.use_three_opt { "yes" } else { "no" }));

        report.push_str("-".repeat(80).as_str());
        report.push('\n');
        report.push_str(&format!("{:<22} {:>12} {:>12} {:>10} {:>10} {:>10}\n",
            "Method", "Initial", "Final", "Improv%", "Constr(s)", "3-Opt(s)"));
        report.push_str("-".repeat(80).as_str());
        report.push('\n');

        let mut sorted: Vec<&MethodResult> = self.results.iter().collect();
        sorted.sort_by(|a, b| a.final_distance.total_cmp(&b.final_distance));

        for result in &sorted {
            report.push_str(&format!("{:<22} {:>12.2} {:>12.2} {:>10.2} {:>10.3} {:>10.3}\n",
                result.method,
                result.initial_distance,
                result.final_distance,
                result.improvement_pct,
                result.construction_time,
                result.refinement_time));
        }

        report.push_str("-".repeat(80).as_str());
        report.push('\n');

        if let Some(best) = sorted.first() {
            report.push_str(&format!("\nBest method: {} ({:.2})\n", best.method, best.final_distance));
        }

        report
    }
}
