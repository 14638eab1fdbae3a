//! GeoFuse CLI - multi-sensor incident classification

mod manifest;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use geofuse_algorithms::classification::{BandImportance, ConfusionMatrix};
use geofuse_algorithms::pipeline::{ExtractionSummary, Pipeline, PipelineOutput};
use geofuse_algorithms::sampling::SplitSummary;
use geofuse_core::io::{read_band, write_classified};
use geofuse_core::{ClassDef, Raster};

use manifest::RunFile;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "geofuse")]
#[command(author, version, about = "Multi-sensor incident classification", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Run the classification pipeline described by a JSON run file
    Run {
        /// Run file (inputs, pipeline configuration, outputs)
        config: PathBuf,
        /// Override the run file's seed
        #[arg(short, long)]
        seed: Option<u64>,
    },
}

// ─── Report ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct MatrixReport {
    accuracy: f64,
    kappa: f64,
    producers_accuracy: Vec<f64>,
    consumers_accuracy: Vec<f64>,
    /// Rows are true classes, columns predicted classes
    matrix: Vec<Vec<u64>>,
}

impl From<&ConfusionMatrix> for MatrixReport {
    fn from(m: &ConfusionMatrix) -> Self {
        Self {
            accuracy: m.accuracy(),
            kappa: m.kappa(),
            producers_accuracy: m.producers_accuracy(),
            consumers_accuracy: m.consumers_accuracy(),
            matrix: m.rows(),
        }
    }
}

#[derive(Serialize)]
struct RunReport {
    seed: u64,
    bands: Vec<String>,
    classes: Vec<ClassDef>,
    extraction: ExtractionSummary,
    split: SplitSummary,
    training: MatrixReport,
    validation: MatrixReport,
    num_trees: usize,
    oob_error: Option<f64>,
    importance: Vec<BandImportance>,
}

impl RunReport {
    fn new(seed: u64, out: &PipelineOutput) -> Self {
        Self {
            seed,
            bands: out.band_names.clone(),
            classes: out.model.classes().iter().cloned().collect(),
            extraction: out.extraction,
            split: out.split,
            training: MatrixReport::from(&out.accuracy.training),
            validation: MatrixReport::from(&out.accuracy.validation),
            num_trees: out.explanation.num_trees,
            oob_error: out.explanation.oob_error,
            importance: out.explanation.importance.clone(),
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install the log subscriber")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_raster(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster = read_band(path).context("Failed to read raster")?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn render_json<T: Serialize>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string_pretty(value).with_context(|| format!("Failed to serialize {}", what))
}

fn save_text(text: &str, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}

fn print_matrix(title: &str, m: &ConfusionMatrix) {
    println!("{}: accuracy {:.4}, kappa {:.4}", title, m.accuracy(), m.kappa());
    for (class, row) in m.classes().iter().zip(m.rows()) {
        let cells: Vec<String> = row.iter().map(|c| format!("{:>6}", c)).collect();
        println!("  {:>3} {:<28}{}", class.code, class.name, cells.join(""));
    }
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Commands ───────────────────────────────────────────────────────────

fn info_command(input: &Path) -> Result<()> {
    let raster = read_raster(input)?;
    let (rows, cols) = raster.shape();
    let extent = raster.extent();
    let stats = raster.statistics();

    println!("File: {}", input.display());
    println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
    println!("Cell size: {}", raster.cell_size());
    println!(
        "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
        extent.min_x, extent.min_y, extent.max_x, extent.max_y
    );
    if let Some(crs) = raster.crs() {
        println!("CRS: {}", crs);
    }
    if let Some(nodata) = raster.nodata() {
        println!("NoData: {}", nodata);
    }
    println!("\nStatistics:");
    if let Some(min) = stats.min {
        println!("  Min: {:.4}", min);
    }
    if let Some(max) = stats.max {
        println!("  Max: {:.4}", max);
    }
    if let Some(mean) = stats.mean {
        println!("  Mean: {:.4}", mean);
    }
    if !raster.is_empty() {
        println!(
            "  Valid cells: {} ({:.1}%)",
            stats.valid_count,
            100.0 * stats.valid_count as f64 / raster.len() as f64
        );
    }
    Ok(())
}

fn run_command(config: &Path, seed: Option<u64>) -> Result<()> {
    let mut run = RunFile::load(config)?;
    if let Some(seed) = seed {
        run.pipeline.seed = seed;
    }

    let pb = spinner("Reading inputs...");
    let inputs = run.read_inputs();
    pb.finish_and_clear();
    let inputs = inputs?;

    let start = Instant::now();
    let out = Pipeline::run(&inputs, &run.pipeline).context("Pipeline failed")?;
    let elapsed = start.elapsed();

    // Everything is rendered before the first file is created
    let report = render_json(&RunReport::new(run.pipeline.seed, &out), "report")?;
    let model = match &run.output.model {
        Some(path) => Some((path, render_json(&out.model, "model")?)),
        None => None,
    };

    let pb = spinner("Writing output...");
    let written = write_classified(&out.classified, &run.output.classified, &run.pipeline.export)
        .context("Failed to write classified raster");
    pb.finish_and_clear();
    written?;

    save_text(&report, &run.output.report)?;
    if let Some((path, text)) = model {
        save_text(&text, path)?;
        println!("Model saved to: {}", path.display());
    }

    println!(
        "Samples: {} ({} outside extent, {} no-data), {} training / {} validation",
        out.extraction.samples,
        out.extraction.dropped_outside,
        out.extraction.nodata_dropped,
        out.split.training,
        out.split.validation
    );
    print_matrix("Training", &out.accuracy.training);
    print_matrix("Validation", &out.accuracy.validation);
    println!("Report saved to: {}", run.output.report.display());
    done("Classification", &run.output.classified, elapsed);
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input } => info_command(&input),
        Commands::Run { config, seed } => run_command(&config, seed),
    }
}
