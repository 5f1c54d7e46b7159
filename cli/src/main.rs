//! flowpdf CLI - reading-order extraction from PDF page geometry

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use flowpdf::{
    compare_output, run_batch, Comparison, Config, GeometrySource, IngestEvent, IngestOutcome,
    JsonGeometrySource, LocalStorage, PipelineOptions, TaskReport,
};

#[derive(Parser)]
#[command(name = "flowpdf")]
#[command(version)]
#[command(about = "Build reading-order elements from PDF page geometry", long_about = None)]
struct Cli {
    /// Input geometry file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output directory
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one document
    Process {
        /// Input geometry file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Page worker threads (0 = one per CPU)
        #[arg(short, long, default_value = "0")]
        threads: usize,

        /// Stage cache directory
        #[arg(long, value_name = "DIR")]
        cache_dir: Option<PathBuf>,

        /// Disable the stage cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Process every document listed in a YAML configuration
    Batch {
        /// Configuration file
        #[arg(value_name = "CONFIG", default_value = "config.yaml")]
        config: PathBuf,
    },

    /// Process the objects named by a storage event
    Ingest {
        /// Directory holding one subdirectory per bucket
        #[arg(value_name = "ROOT")]
        root: PathBuf,

        /// Event payload (JSON)
        #[arg(long, env = "FC_CUSTOM_CONTAINER_EVENT")]
        event: String,

        /// Local working directory
        #[arg(long, value_name = "DIR")]
        work_dir: Option<PathBuf>,
    },

    /// Compare a document's body blocks against a reference output
    Compare {
        /// Output directory of the document
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Reference output root
        #[arg(value_name = "TARGET")]
        target: PathBuf,
    },

    /// Show document information
    Info {
        /// Input geometry file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Process {
            input,
            output,
            threads,
            cache_dir,
            no_cache,
        }) => {
            let mut options = PipelineOptions::new()
                .with_threads(threads)
                .with_cache(!no_cache);
            if let Some(dir) = cache_dir {
                options = options.with_cache_dir(dir);
            }
            cmd_process(&input, output.as_deref(), &options)
        }
        Some(Commands::Batch { config }) => cmd_batch(&config),
        Some(Commands::Ingest {
            root,
            event,
            work_dir,
        }) => cmd_ingest(&root, &event, work_dir),
        Some(Commands::Compare { output, target }) => cmd_compare(&output, &target),
        Some(Commands::Info { input }) => cmd_info(&input),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: process if input is provided
            if let Some(input) = cli.input {
                cmd_process(&input, cli.output.as_deref(), &PipelineOptions::new())
            } else {
                println!("{}", "Usage: flowpdf <FILE> [OUTPUT]".yellow());
                println!("       flowpdf --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_process(
    input: &Path,
    output: Option<&Path>,
    options: &PipelineOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = output.map(|p| p.to_path_buf()).unwrap_or_else(|| {
        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        PathBuf::from(format!("{}_output", stem))
    });

    let report = flowpdf::process_file(input, &output_dir, options)?;

    println!("{}", "Stages".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for stage in &report.stages {
        let cached = if stage.cache_hit {
            " (cached)".dimmed().to_string()
        } else {
            String::new()
        };
        println!("  {:<22} {:>10.2?}{}", stage.name, stage.elapsed, cached);
    }
    println!("{}", "─".repeat(40).dimmed());
    println!("  {:<22} {:>10.2?}", "total", report.total_elapsed());

    println!("\n{}", "Output files:".green().bold());
    println!("  {} toc.json", "├─".dimmed());
    println!("  {} big_blocks_id.json", "├─".dimmed());
    println!("  {} output/elements.json", "├─".dimmed());
    println!("  {} output/assets/", "└─".dimmed());

    Ok(())
}

fn cmd_batch(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_yaml_file(config_path)?;
    let documents = config.documents();
    let options = config.pipeline_options();
    log::info!(
        "Loaded {} documents from {}",
        documents.len(),
        config_path.display()
    );

    let pb = if config.processbar.enabled {
        let pb = ProgressBar::new(documents.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let reports = run_batch(&documents, &options, config.pipeline.documents, |report| {
        match &pb {
            Some(pb) => {
                pb.set_message(report.name());
                pb.inc(1);
            }
            None => print_report(report),
        }
    })?;
    if let Some(pb) = &pb {
        pb.finish_with_message("Done!");
    }

    let failed: Vec<&TaskReport> = reports.iter().filter(|r| !r.is_success()).collect();
    println!(
        "\n{} {} processed, {} failed",
        "Done!".green().bold(),
        reports.len() - failed.len(),
        failed.len()
    );
    for report in &failed {
        println!("  {} {}", "✗".red(), report.name());
    }

    if config.compare.enabled {
        if let Some(target) = &config.compare.target {
            println!();
            for report in reports.iter().filter(|r| r.is_success()) {
                print_comparison(&report.output, compare_output(&report.output, target)?);
            }
        }
    }

    Ok(())
}

fn print_report(report: &TaskReport) {
    match &report.outcome {
        Ok(_) => println!(
            "{} {} ({:.2?})",
            "✓".green(),
            report.name(),
            report.elapsed
        ),
        Err(e) => println!("{} {}: {}", "✗".red(), report.name(), e),
    }
}

fn cmd_ingest(
    root: &Path,
    event: &str,
    work_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let event = IngestEvent::from_json(event)?;
    let mut storage = LocalStorage::new(root);
    if let Some(dir) = work_dir {
        storage = storage.with_work_dir(dir);
    }

    let mut failures = 0;
    for (object, outcome) in storage.handle_event(&event, &PipelineOptions::new()) {
        let name = format!("{}/{}", object.bucket, object.key);
        match outcome {
            Ok(IngestOutcome::Skipped) => println!("{} {}", "Skipped".dimmed(), name),
            Ok(IngestOutcome::Done(report)) => println!(
                "{} {} ({:.2?})",
                "Done".green(),
                name,
                report.total_elapsed()
            ),
            Ok(IngestOutcome::Failed(e)) => {
                failures += 1;
                println!("{} {}: {}", "Failed".red(), name, e);
            }
            Err(e) => {
                failures += 1;
                println!("{} {}: {}", "Storage error".red(), name, e);
            }
        }
    }

    if failures > 0 {
        return Err(format!("{} object(s) failed", failures).into());
    }
    Ok(())
}

fn cmd_compare(output: &Path, target: &Path) -> Result<(), Box<dyn std::error::Error>> {
    print_comparison(output, compare_output(output, target)?);
    Ok(())
}

fn print_comparison(output: &Path, comparison: Comparison) {
    let name = output.file_name().unwrap_or_default().to_string_lossy();
    match comparison {
        Comparison::MissingTarget(path) => {
            println!("{} {}: {} not found", "?".yellow(), name, path.display())
        }
        Comparison::Same => println!("{} {}", "=".green(), name),
        Comparison::Changed(diffs) => {
            println!("{} {}", "≠".red(), name);
            for diff in diffs {
                println!(
                    "    page {}, add: {:?}, del: {:?}",
                    diff.page, diff.added, diff.removed
                );
            }
        }
    }
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let source = JsonGeometrySource::open(input)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Pages".bold(), source.page_count());

    let mut blocks = 0;
    let mut drawings = 0;
    let mut images = 0;
    for index in 0..source.page_count() {
        let page = source.page(index)?;
        blocks += page.blocks.len();
        drawings += page.drawings.len();
        images += page.images.len();
    }

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Blocks".bold(), blocks);
    println!("{}: {}", "Drawings".bold(), drawings);
    println!("{}: {}", "Images".bold(), images);
    println!("{}: {}", "TOC entries".bold(), source.toc()?.len());

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "flowpdf".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Reading-order extraction from PDF page geometry");
    println!();
    println!("License: MIT");
}
