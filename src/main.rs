//! TSP Optimizer - Command Line Interface
//!
//! Compares construction heuristics with optional 3-opt refinement on a
//! planar TSP instance.

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tsp_optimizer::benchmark::{Benchmark, BenchmarkConfig};
use tsp_optimizer::heuristics::construction::Method;
use tsp_optimizer::heuristics::local_search::{LocalSearch, ThreeOptSearch};
use tsp_optimizer::heuristics::multi_start::MultiStartConstruction;
use tsp_optimizer::instance::Instance;

use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tsp-optimizer")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "Construction heuristics and 3-opt for the planar TSP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the selected methods on an instance and compare them
    Solve {
        /// CSV file with columns city_id,x,y
        #[arg(short, long, conflicts_with = "random")]
        input: Option<PathBuf>,

        /// Generate a random instance with this many cities
        #[arg(short, long)]
        random: Option<usize>,

        /// Largest x coordinate for random instances
        #[arg(long, default_value = "1000")]
        max_x: u32,

        /// Largest y coordinate for random instances
        #[arg(long, default_value = "1000")]
        max_y: u32,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Construction methods to run
        #[arg(short, long, value_enum, value_delimiter = ',', default_values = ["nn", "ni", "fi", "ci"])]
        methods: Vec<MethodArg>,

        /// Runs per start city for Arbitrary Insertion
        #[arg(long, default_value = "5")]
        arbitrary_runs: usize,

        /// Skip 3-opt refinement
        #[arg(long)]
        no_three_opt: bool,

        /// Cap on adopted 3-opt moves
        #[arg(long)]
        max_passes: Option<usize>,

        /// Run multi-start on a single thread
        #[arg(long)]
        sequential: bool,

        /// Export results to CSV
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Generate a random instance and write it as CSV
    Generate {
        /// Number of cities
        #[arg(short, long)]
        cities: usize,

        #[arg(long, default_value = "1000")]
        max_x: u32,

        #[arg(long, default_value = "1000")]
        max_y: u32,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Analyze an instance
    Analyze {
        /// CSV file with columns city_id,x,y
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum MethodArg {
    /// Nearest Neighbor
    Nn,
    /// Nearest Insertion
    Ni,
    /// Farthest Insertion
    Fi,
    /// Cheapest Insertion
    Ci,
    /// Arbitrary Insertion
    Ai,
}

impl From<MethodArg> for Method {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Nn => Method::NearestNeighbor,
            MethodArg::Ni => Method::NearestInsertion,
            MethodArg::Fi => Method::FarthestInsertion,
            MethodArg::Ci => Method::CheapestInsertion,
            MethodArg::Ai => Method::ArbitraryInsertion,
        }
    }
}

struct SolveOptions {
    methods: Vec<Method>,
    arbitrary_runs: usize,
    use_three_opt: bool,
    max_passes: Option<usize>,
    seed: u64,
    parallel: bool,
    output: Option<PathBuf>,
    report: Option<PathBuf>,
    verbose: bool,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            input, random, max_x, max_y, seed, methods, arbitrary_runs,
            no_three_opt, max_passes, sequential, output, report, verbose,
        } => {
            let instance = load_or_generate(input, random, max_x, max_y, seed);
            let options = SolveOptions {
                methods: methods.into_iter().map(Method::from).collect(),
                arbitrary_runs,
                use_three_opt: !no_three_opt,
                max_passes,
                seed,
                parallel: !sequential,
                output,
                report,
                verbose,
            };
            solve_instance(&instance, options);
        }

        Commands::Generate { cities, max_x, max_y, seed, output } => {
            let instance = Instance::random(cities, max_x, max_y, seed);
            if let Err(e) = instance.save_csv(&output) {
                eprintln!("Error writing instance: {}", e);
                std::process::exit(1);
            }
            println!("Generated {} cities into {:?}", instance.len(), output);
        }

        Commands::Analyze { input } => {
            analyze_instance(&input);
        }
    }
}

fn load_instance(path: &PathBuf) -> Instance {
    match Instance::from_csv_file(path) {
        Ok(inst) => inst,
        Err(e) => {
            eprintln!("Error loading instance: {}", e);
            std::process::exit(1);
        }
    }
}

fn load_or_generate(input: Option<PathBuf>, random: Option<usize>, max_x: u32, max_y: u32, seed: u64) -> Instance {
    match (input, random) {
        (Some(path), _) => {
            println!("Loading instance from {:?}...", path);
            load_instance(&path)
        }
        (None, Some(n)) => Instance::random(n, max_x, max_y, seed),
        (None, None) => {
            eprintln!("Either --input or --random is required");
            std::process::exit(1);
        }
    }
}

fn solve_instance(instance: &Instance, options: SolveOptions) {
    if options.verbose {
        println!("{}", instance.statistics());
    }

    let matrix = instance.distance_matrix();
    let config = BenchmarkConfig {
        methods: options.methods.clone(),
        arbitrary_runs: options.arbitrary_runs,
        use_three_opt: options.use_three_opt,
        seed: options.seed,
        parallel: options.parallel,
        max_three_opt_passes: options.max_passes,
    };
    let mut benchmark = Benchmark::new(config);

    let progress = ProgressBar::new(options.methods.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("[{bar:30}] {pos}/{len} {msg}") {
        progress.set_style(style);
    }

    for method in &options.methods {
        progress.set_message(method.name());
        let result = benchmark.run_method(&matrix, *method);
        if options.verbose {
            progress.println(format!("{}: tour {:?}", result.method, result.tour));
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    println!("{}", benchmark.generate_report());

    if let Some(path) = options.output {
        match benchmark.export_to_csv(&path) {
            Ok(()) => println!("Results exported to {:?}", path),
            Err(e) => {
                eprintln!("Error exporting results: {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Some(path) = options.report {
        match benchmark.report().save_json(&path) {
            Ok(()) => println!("Report saved to {:?}", path),
            Err(e) => {
                eprintln!("Error saving report: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn analyze_instance(path: &PathBuf) {
    let instance = load_instance(path);

    println!("{}", instance.statistics());

    if instance.len() < 2 {
        return;
    }

    let matrix = instance.distance_matrix();

    let nn_sol = MultiStartConstruction::for_method(Method::NearestNeighbor)
        .with_parallel(true)
        .construct(&matrix);
    let improved = ThreeOptSearch::new().improve(&matrix, &nn_sol);

    println!("Quick Solution Estimates:");
    println!("  Nearest Neighbor: {:.2}", nn_sol.cost);
    println!("  Nearest Neighbor + 3-Opt: {:.2}", improved.cost);
}
