use anyhow::Context;
use clap::{Parser, Subcommand};
use gs_core::ParamRange;
use gs_store::DatasetStore;
use gs_sweep::{run_sweep, FailurePolicy, SweepConfig};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gridscan")]
#[command(about = "Gridscan - concurrent (p, a) parameter sweep tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a parameter sweep and write the dataset
    Run {
        /// Lower bound of the p range
        p_min: f64,
        /// Upper bound of the p range
        p_max: f64,
        /// Output dataset file
        output: PathBuf,
        /// Number of p grid points
        #[arg(long, default_value_t = 10)]
        np: usize,
        /// Number of a grid points
        #[arg(long, default_value_t = 10)]
        na: usize,
        /// Lower bound of the a range
        #[arg(long, default_value_t = 0.0)]
        a_min: f64,
        /// Upper bound of the a range
        #[arg(long, default_value_t = 1.0)]
        a_max: f64,
        /// Time step; omit for a single sample at t = 0
        #[arg(long)]
        dt: Option<f64>,
        /// Time horizon (exclusive)
        #[arg(long, default_value_t = 500.0)]
        horizon: f64,
        /// Requested worker count (clamped to available processors)
        #[arg(long, default_value_t = 10)]
        workers: usize,
        /// Number of spatial points per state vector
        #[arg(long, default_value_t = 1024)]
        spatial: usize,
        /// Uniform initial state value
        #[arg(long, default_value_t = 1.0)]
        init_value: f64,
        /// Replace an existing output file
        #[arg(long)]
        overwrite: bool,
        /// Abort the whole sweep on the first failed cell
        #[arg(long)]
        fail_fast: bool,
    },
    /// Show dataset dimensions, coordinates and fill status
    Info {
        /// Path to the dataset file
        file: PathBuf,
    },
    /// Export the time series of one spatial point of one cell
    Export {
        /// Path to the dataset file
        file: PathBuf,
        /// p grid index
        p_index: usize,
        /// a grid index
        a_index: usize,
        /// Spatial index
        x_index: usize,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            p_min,
            p_max,
            output,
            np,
            na,
            a_min,
            a_max,
            dt,
            horizon,
            workers,
            spatial,
            init_value,
            overwrite,
            fail_fast,
        } => cmd_run(RunArgs {
            p_min,
            p_max,
            output,
            np,
            na,
            a_min,
            a_max,
            dt,
            horizon,
            workers,
            spatial,
            init_value,
            overwrite,
            fail_fast,
        }),
        Commands::Info { file } => cmd_info(&file),
        Commands::Export {
            file,
            p_index,
            a_index,
            x_index,
            output,
        } => cmd_export(&file, p_index, a_index, x_index, output.as_deref()),
    }
}

struct RunArgs {
    p_min: f64,
    p_max: f64,
    output: PathBuf,
    np: usize,
    na: usize,
    a_min: f64,
    a_max: f64,
    dt: Option<f64>,
    horizon: f64,
    workers: usize,
    spatial: usize,
    init_value: f64,
    overwrite: bool,
    fail_fast: bool,
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = SweepConfig::new(args.p_min, args.p_max, args.output);
    config.p_range = ParamRange {
        min: args.p_min,
        max: args.p_max,
        points: args.np,
    };
    config.a_range = ParamRange {
        min: args.a_min,
        max: args.a_max,
        points: args.na,
    };
    config.dt = args.dt;
    config.horizon = args.horizon;
    config.workers = args.workers;
    config.spatial_extent = args.spatial;
    config.initial_state = vec![args.init_value; args.spatial];
    config.overwrite = args.overwrite;
    config.failure_policy = if args.fail_fast {
        FailurePolicy::FailFast
    } else {
        FailurePolicy::SkipCell
    };

    println!(
        "Running {}x{} sweep over p=[{}, {}], a=[{}, {}]",
        config.p_range.points,
        config.a_range.points,
        config.p_range.min,
        config.p_range.max,
        config.a_range.min,
        config.a_range.max
    );

    let report = run_sweep(&config).context("sweep failed")?;

    println!("✓ Sweep completed: {}", config.output.display());
    println!("  Workers: {}", report.workers);
    println!(
        "  Cells:   {}/{} written",
        report.cells_written, report.cells_total
    );
    if !report.skipped.is_empty() {
        println!("  Skipped cells:");
        for cell in &report.skipped {
            println!(
                "    (p={}, a={}): {}",
                cell.p_index, cell.a_index, cell.error
            );
        }
    }
    println!("  Elapsed: {:.3}s", report.elapsed.as_secs_f64());

    Ok(())
}

fn cmd_info(file: &Path) -> anyhow::Result<()> {
    let dataset = DatasetStore::open(file)
        .and_then(|store| store.read())
        .with_context(|| format!("failed to load dataset {}", file.display()))?;

    println!("Dataset: {}", file.display());
    println!("  Description: {}", dataset.description);
    println!("  History: {}", dataset.history);
    println!(
        "  Dimensions: p={} a={} time={} x={}",
        dataset.dims.p, dataset.dims.a, dataset.dims.time, dataset.dims.x
    );
    print_coord("p", &dataset.p);
    print_coord("a", &dataset.a);
    print_coord("time", &dataset.time);
    print_coord("x", &dataset.x);
    println!(
        "  Cells written: {}/{}",
        dataset.complete_cells(),
        dataset.dims.p * dataset.dims.a
    );

    Ok(())
}

fn print_coord(name: &str, coord: &gs_store::Coordinate) {
    let written: Vec<f64> = coord.values.iter().copied().flatten().collect();
    match (written.first(), written.last()) {
        (Some(first), Some(last)) => println!(
            "  {}: {} values in [{}, {}] {}",
            name,
            written.len(),
            first,
            last,
            coord.units
        ),
        _ => println!("  {}: no values written ({})", name, coord.units),
    }
}

fn cmd_export(
    file: &Path,
    p_index: usize,
    a_index: usize,
    x_index: usize,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let dataset = DatasetStore::open(file)
        .and_then(|store| store.read())
        .with_context(|| format!("failed to load dataset {}", file.display()))?;

    anyhow::ensure!(
        x_index < dataset.dims.x,
        "x index {} out of bounds (extent {})",
        x_index,
        dataset.dims.x
    );

    // Build CSV
    let mut csv = String::from("time,value\n");
    let mut rows = 0;
    for time_index in 0..dataset.dims.time {
        let (Some(time), Some(state)) = (
            dataset.time.value(time_index),
            dataset.slice(p_index, a_index, time_index),
        ) else {
            continue;
        };
        csv.push_str(&format!("{},{}\n", time, state[x_index]));
        rows += 1;
    }
    anyhow::ensure!(
        rows > 0,
        "cell (p={}, a={}) has no written time slices",
        p_index,
        a_index
    );

    // Write to file or stdout
    if let Some(path) = output {
        std::fs::write(path, csv)?;
        println!("✓ Exported {} data points to {}", rows, path.display());
    } else {
        print!("{}", csv);
    }

    Ok(())
}
