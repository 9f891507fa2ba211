use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use webpbatch::{
    BatchCore, ConversionOptions, ConversionReport, FileConfig, ReportFormat,
    progress::ConsoleProgress, write_report,
};

/// webpbatch - mirror a JPEG/PNG directory tree as WebP
///
/// Converts every image under DIR into the sibling directory DIR_webp, keeping
/// the subdirectory layout. Already converted files are skipped; files that
/// cannot be converted are copied unchanged.
#[derive(Parser)]
#[command(name = "webpbatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "webpbatch - batch JPEG/PNG to WebP converter")]
pub struct Args {
    /// Input directory path
    #[arg(value_name = "DIR")]
    pub input: PathBuf,

    /// WebP compression quality (0-100) [default: 80]
    #[arg(short, long, value_name = "QUALITY", value_parser = clap::value_parser!(u8).range(0..=100))]
    pub quality: Option<u8>,

    /// Number of parallel workers [default: CPU core count]
    #[arg(short, long, value_name = "NUM", value_parser = clap::value_parser!(u64).range(1..))]
    pub workers: Option<u64>,

    /// Input extensions to convert [default: jpg,jpeg,png]
    #[arg(long, value_delimiter = ',', value_name = "EXT")]
    pub extensions: Option<Vec<String>>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbose output mode
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode (results only)
    #[arg(long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write a report file into the current directory
    #[arg(long, value_enum, value_name = "FORMAT")]
    pub report: Option<ReportFormatArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReportFormatArg {
    Json,
    Csv,
}

impl From<ReportFormatArg> for ReportFormat {
    fn from(format: ReportFormatArg) -> Self {
        match format {
            ReportFormatArg::Json => ReportFormat::Json,
            ReportFormatArg::Csv => ReportFormat::Csv,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else if !args.quiet {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    let file_config = FileConfig::discover(args.config.as_deref())?;
    let options = build_options(&args, &file_config);

    let core = BatchCore::new(options);
    let report = if args.quiet {
        core.run()?
    } else {
        run_with_progress_bar(&core)?
    };

    if let Some(format) = args.report {
        let cwd = std::env::current_dir().context("Cannot determine current directory")?;
        let path = write_report(&report, format.into(), &cwd)?;
        println!("Report saved to: {}", path.display());
    }

    print_results_summary(&report);
    Ok(())
}

/// Defaults < config file < command line
fn build_options(args: &Args, file_config: &FileConfig) -> ConversionOptions {
    let mut options = ConversionOptions::new(args.input.clone()).apply_file(file_config);

    if let Some(quality) = args.quality {
        options = options.with_quality(quality);
    }
    if let Some(workers) = args.workers {
        options = options.with_workers(usize::try_from(workers).unwrap_or(usize::MAX));
    }
    if let Some(extensions) = &args.extensions {
        options = options.with_extensions(extensions.clone());
    }
    options
}

/// Run on a scoped thread while this thread polls the progress counters.
fn run_with_progress_bar(core: &BatchCore) -> Result<ConversionReport> {
    let progress = core.progress();
    let bar = ConsoleProgress::new();

    let result = thread::scope(|scope| {
        let handle = scope.spawn(|| core.run());
        while !handle.is_finished() {
            bar.update(&progress);
            thread::sleep(Duration::from_millis(100));
        }
        bar.update(&progress);
        handle.join()
    });
    bar.finish();

    let report = result.map_err(|_| anyhow!("conversion thread panicked"))??;
    Ok(report)
}

fn print_results_summary(report: &ConversionReport) {
    println!("\n🎉 Conversion completed!");
    println!("📂 Output directory: {}", report.output_dir.display());
    println!("🧵 Workers: {}  Quality: {}\n", report.workers, report.quality);
    println!("{}", report.summary);
}
