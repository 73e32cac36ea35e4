use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use zipsum_common::{
    ensure_config, load_config, AppConfig, ArchiveEntryRecord, ArchiveSource, ChecksumAlgorithm,
    ComparisonRecord, ComparisonReport, ComparisonStatus, ComparisonSummary, ZipsumError,
};
use zipsum_core::{
    checksum_report_name, comparison_report_name, write_checksum_csv, write_comparison_csv,
    ArchiveProcessor,
};

#[derive(Parser)]
#[command(name = "zipsum")]
#[command(author = "zipsum Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Per-entry checksum reports and comparisons for ZIP archives", long_about = None)]
struct Cli {
    /// Read and write the config file next to the executable
    #[arg(long, global = true)]
    portable: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a checksum report for every file in an archive
    Checksum {
        /// ZIP archive to read
        archive: PathBuf,

        #[command(flatten)]
        processing: ProcessingArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Compare the contents of two archives
    Compare {
        /// First ZIP archive
        first: PathBuf,

        /// Second ZIP archive
        second: PathBuf,

        #[command(flatten)]
        processing: ProcessingArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Show only differences (hide MATCH rows)
        #[arg(short = 'd', long)]
        diff_only: bool,

        /// Print a per-status summary to stderr
        #[arg(short, long)]
        summary: bool,
    },

    /// Show the active configuration file
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

#[derive(Args)]
struct ProcessingArgs {
    /// Checksum algorithm (sha1 or blake3)
    #[arg(short, long)]
    algorithm: Option<ChecksumAlgorithm>,

    /// Number of hashing threads
    #[arg(short = 'j', long)]
    threads: Option<usize>,
}

#[derive(Args)]
struct OutputArgs {
    /// Write the report to this file instead of stdout
    #[arg(short, long, conflicts_with = "output_dir")]
    output: Option<PathBuf>,

    /// Write the report into this directory under its conventional name
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long)]
    json: bool,
}

/// Where a report ends up
#[derive(Debug, PartialEq, Eq)]
enum OutputTarget {
    Stdout,
    File(PathBuf),
}

fn main() {
    // Initialize tracing to stderr (so reports can go cleanly to stdout)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Checksum {
            archive,
            processing,
            output,
        } => match run_checksum(&archive, processing, output, cli.portable) {
            Ok(()) => 0,
            Err(e) => {
                error!("Checksum failed: {}", e);
                1
            }
        },
        Commands::Compare {
            first,
            second,
            processing,
            output,
            diff_only,
            summary,
        } => match run_compare(
            &first,
            &second,
            processing,
            output,
            diff_only,
            summary,
            cli.portable,
        ) {
            Ok(true) => 0,
            Ok(false) => 2,
            Err(e) => {
                error!("Compare failed: {}", e);
                1
            }
        },
        Commands::Config { init } => match run_config(init, cli.portable) {
            Ok(()) => 0,
            Err(e) => {
                error!("Config failed: {}", e);
                1
            }
        },
    };

    std::process::exit(code);
}

fn run_checksum(
    archive: &Path,
    processing: ProcessingArgs,
    output: OutputArgs,
    portable: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(&processing, false, portable)?;
    let source = read_source(archive)?;

    let processor = ArchiveProcessor::from_config(&config);
    info!(
        "Generating {} checksums for {}",
        processor.engine().algorithm(),
        archive.display()
    );
    let report = processor.checksum_archive(&source)?;
    info!(
        "Checksums generated successfully for {} files in {}",
        report.records.len(),
        report.source
    );

    let target = resolve_target(
        &output,
        config.output_dir.as_deref(),
        &checksum_report_name(&source.name),
    );

    write_report(&target, |writer| {
        if output.json {
            let json = JsonChecksumReport {
                source: &report.source,
                algorithm: report.algorithm,
                generated_at: generated_at(),
                entries: &report.records,
            };
            write_json(writer, &json)
        } else {
            write_checksum_csv(writer, &report.records)
        }
    })?;

    Ok(())
}

/// Returns whether every entry matched
fn run_compare(
    first: &Path,
    second: &Path,
    processing: ProcessingArgs,
    output: OutputArgs,
    diff_only: bool,
    summary: bool,
    portable: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let config = resolve_config(&processing, diff_only, portable)?;

    info!("Comparing:");
    info!("  First:  {}", first.display());
    info!("  Second: {}", second.display());

    let first_source = read_source(first)?;
    let second_source = read_source(second)?;

    let processor = ArchiveProcessor::from_config(&config);
    let report = processor.compare_archives(&first_source, &second_source)?;

    if summary {
        print_summary(&report.summary);
    }

    let entries = visible_records(&report.records, config.diff_only);
    let target = resolve_target(
        &output,
        config.output_dir.as_deref(),
        &comparison_report_name(&first_source.name, &second_source.name),
    );

    write_report(&target, |writer| {
        if output.json {
            write_json(writer, &build_json_comparison(&report, &entries))
        } else {
            write_comparison_csv(writer, &entries)
        }
    })?;

    Ok(report.summary.is_identical())
}

fn run_config(init: bool, portable: bool) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = if init {
        ensure_config(portable)?
    } else {
        load_config(portable)?
    };

    let state = if loaded.exists || init {
        ""
    } else {
        " (not created, defaults in effect)"
    };
    println!("# {}{}", loaded.path.display(), state);
    print!("{}", toml::to_string_pretty(&loaded.config)?);
    Ok(())
}

/// Load the config file and apply command-line overrides
fn resolve_config(
    processing: &ProcessingArgs,
    diff_only: bool,
    portable: bool,
) -> Result<AppConfig, ZipsumError> {
    let mut config = load_config(portable)?.config;

    if let Some(algorithm) = processing.algorithm {
        config.algorithm = algorithm;
    }
    if processing.threads.is_some() {
        config.threads = processing.threads;
    }
    if diff_only {
        config.diff_only = true;
    }

    config.validate()?;
    Ok(config)
}

fn read_source(path: &Path) -> Result<ArchiveSource, Box<dyn std::error::Error>> {
    if !path.is_file() {
        return Err(format!("Archive does not exist: {}", path.display()).into());
    }
    Ok(ArchiveSource::from_path(path)?)
}

fn resolve_target(output: &OutputArgs, config_dir: Option<&Path>, default_name: &str) -> OutputTarget {
    if let Some(path) = &output.output {
        return OutputTarget::File(path.clone());
    }

    match output.output_dir.as_deref().or(config_dir) {
        Some(dir) => {
            let path = dir.join(default_name);
            if output.json {
                OutputTarget::File(path.with_extension("json"))
            } else {
                OutputTarget::File(path)
            }
        }
        None => OutputTarget::Stdout,
    }
}

fn write_report<F>(target: &OutputTarget, write: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(&mut dyn Write) -> Result<(), ZipsumError>,
{
    match target {
        OutputTarget::Stdout => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            write(&mut lock)?;
            lock.flush()?;
        }
        OutputTarget::File(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let mut writer = BufWriter::new(File::create(path)?);
            write(&mut writer)?;
            writer.flush()?;
            info!("Report written to {}", path.display());
        }
    }
    Ok(())
}

fn write_json<T: Serialize>(writer: &mut dyn Write, value: &T) -> Result<(), ZipsumError> {
    serde_json::to_writer_pretty(&mut *writer, value)
        .map_err(|e| ZipsumError::Serialization(e.to_string()))?;
    writeln!(writer)?;
    Ok(())
}

fn visible_records(records: &[ComparisonRecord], diff_only: bool) -> Vec<ComparisonRecord> {
    records
        .iter()
        .filter(|r| !(diff_only && r.status == ComparisonStatus::Match))
        .cloned()
        .collect()
}

fn print_summary(summary: &ComparisonSummary) {
    eprintln!(
        "Comparison complete. Found {} differences/matches.",
        summary.total
    );
    eprintln!("  Match:          {}", summary.matched);
    eprintln!("  Mismatch:       {}", summary.mismatched);
    eprintln!("  Only in first:  {}", summary.only_in_first);
    eprintln!("  Only in second: {}", summary.only_in_second);
}

fn generated_at() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[derive(Serialize)]
struct JsonChecksumReport<'a> {
    source: &'a str,
    algorithm: ChecksumAlgorithm,
    generated_at: String,
    entries: &'a [ArchiveEntryRecord],
}

#[derive(Serialize)]
struct JsonComparisonReport<'a> {
    first: &'a str,
    second: &'a str,
    algorithm: ChecksumAlgorithm,
    generated_at: String,
    summary: ComparisonSummary,
    entries: &'a [ComparisonRecord],
}

fn build_json_comparison<'a>(
    report: &'a ComparisonReport,
    entries: &'a [ComparisonRecord],
) -> JsonComparisonReport<'a> {
    JsonComparisonReport {
        first: &report.first,
        second: &report.second,
        algorithm: report.algorithm,
        generated_at: generated_at(),
        summary: report.summary,
        entries,
    }
}
