//! JAMWATCH: A batch detector for GPS jamming and spoofing signatures in ADS-B data.
//!
//! This program scans one or more CSV tables of ADS-B position/integrity
//! reports for abrupt transitions in navigation integrity (NIC) and writes:
//!
//! 1. A JSON file per input table listing every detected zero crossing with
//!    its supporting NIC window.
//! 2. Optionally, a single KML overlay in which each detection contributes a
//!    semi-transparent visibility circle derived from the radio horizon at
//!    the aircraft's altitude.
//!
//! Detection thresholds, the window size, the minimum-altitude cutoff, and
//! the maximum allowed gap between samples are all adjustable from the
//! command line. Multiple input files can be processed in parallel.

use clap::Parser;
use jamwatch::export::{write_events_json, write_overlay_kml};
use jamwatch::geofence::GeofenceEvent;
use jamwatch::records::AdsbRecord;
use jamwatch::window::{
    DEFAULT_BUFFER_SIZE, DEFAULT_MAX_SAMPLE_DELTA_S, DEFAULT_MIN_ALT_FEET, DEFAULT_THRESHOLD_HIGH,
    DEFAULT_THRESHOLD_LOW, DetectorConfig, ZeroCrossingDetector,
};
use log::{error, info, warn};
use rayon::prelude::*;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

const LONG_ABOUT: &str =
    "JAMWATCH: A batch detector for GPS jamming and spoofing signatures in ADS-B data.

Scans CSV tables of ADS-B position/integrity reports for abrupt transitions in
navigation integrity (NIC). A window of recent samples per aircraft is split in
half; when the mean NIC of the halves jumps from below the low threshold to at
or above the high threshold (or the reverse), a zero-crossing event is emitted
at the window midpoint.

Detected events are written as a JSON array per input file. With --kml, every
event additionally contributes a visibility circle to a single map overlay,
sized to the radio horizon at the aircraft's altitude.";

/// Command line arguments
#[derive(Parser)]
#[command(author, version, about = "Detects GPS jamming and spoofing signatures in ADS-B data.", long_about = LONG_ABOUT)]
struct Cli {
    /// Input CSV file path or directory containing CSV files
    /// If a directory is provided, all CSV files in it will be processed
    #[arg(short, long, value_parser)]
    input: PathBuf,

    /// Output directory for the per-file JSON event listings
    #[arg(short, long, value_parser)]
    output: PathBuf,

    /// Optional path for a single KML overlay accumulating all detections
    #[arg(long)]
    kml: Option<PathBuf>,

    /// Samples held per aircraft before a window is evaluated (must be even)
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,

    /// Maximum spacing between adjacent samples in a window (seconds)
    #[arg(long, default_value_t = DEFAULT_MAX_SAMPLE_DELTA_S)]
    max_sample_delta_s: f64,

    /// Minimum barometric altitude for a sample to be admitted (feet)
    #[arg(long, default_value_t = DEFAULT_MIN_ALT_FEET)]
    min_alt_feet: i32,

    /// NIC mean below which a window half counts as "integrity lost"
    #[arg(long, default_value_t = DEFAULT_THRESHOLD_LOW)]
    threshold_low: f64,

    /// NIC mean at or above which a window half counts as "integrity good"
    #[arg(long, default_value_t = DEFAULT_THRESHOLD_HIGH)]
    threshold_high: f64,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log file path (if not specified, logs to stderr)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Process multiple input files in parallel
    #[arg(long)]
    parallel: bool,
}

/// Per-file processing counters rolled up into the run summary.
#[derive(Clone, Copy, Debug, Default)]
struct FileSummary {
    records: usize,
    admitted: u64,
    crossings: usize,
    gap_flushes: u64,
    out_of_order: u64,
}

impl FileSummary {
    fn merge(&mut self, other: &FileSummary) {
        self.records += other.records;
        self.admitted += other.admitted;
        self.crossings += other.crossings;
        self.gap_flushes += other.gap_flushes;
        self.out_of_order += other.out_of_order;
    }
}

/// Initialize the logger with the specified configuration.
///
/// # Errors
/// Returns an error if the log file cannot be opened or logger initialization fails.
fn init_logger(log_level: &str, log_file: Option<&PathBuf>) -> Result<(), Box<dyn Error>> {
    use std::io::Write;

    let level = log_level.parse::<log::LevelFilter>().unwrap_or_else(|_| {
        eprintln!("Invalid log level '{log_level}', defaulting to 'info'");
        log::LevelFilter::Info
    });

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] - {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.args()
        )
    });

    if let Some(log_path) = log_file {
        if let Some(parent) = log_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let target = Box::new(
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path)?,
        );
        builder.target(env_logger::Target::Pipe(target));
    }

    builder.try_init()?;
    Ok(())
}

/// Get all CSV files from a path (either single file or all CSVs in directory).
///
/// # Errors
/// Returns an error if the input file is not a CSV, no CSV files are found in
/// the directory, or the path is neither a file nor a directory.
fn get_csv_files(input: &Path) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    if input.is_file() {
        if input.extension().and_then(|s| s.to_str()) != Some("csv") {
            return Err(format!("Input file '{}' is not a CSV file.", input.display()).into());
        }
        Ok(vec![input.to_path_buf()])
    } else if input.is_dir() {
        let mut csv_files: Vec<PathBuf> = std::fs::read_dir(input)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("csv")
            })
            .collect();

        if csv_files.is_empty() {
            return Err(format!("No CSV files found in directory '{}'.", input.display()).into());
        }

        // Sort for consistent ordering
        csv_files.sort();
        Ok(csv_files)
    } else {
        Err(format!(
            "Input path '{}' does not exist or is neither a file nor a directory.",
            input.display()
        )
        .into())
    }
}

/// Process a single CSV file: detect crossings, derive geofences, write the
/// per-file JSON listing, and return the geofenced events for the overlay.
fn process_file(
    input_file: &Path,
    output_dir: &Path,
    config: &DetectorConfig,
) -> Result<(Vec<GeofenceEvent>, FileSummary), Box<dyn Error>> {
    info!("Processing file: {}", input_file.display());

    let records = AdsbRecord::from_csv(input_file)?;
    info!(
        "Read {} records from {}",
        records.len(),
        input_file.display()
    );

    let mut detector = ZeroCrossingDetector::new(config.clone())?;
    let crossings: Vec<_> = records
        .iter()
        .filter_map(|record| detector.process(record))
        .collect();

    let summary = FileSummary {
        records: records.len(),
        admitted: detector.admitted(),
        crossings: crossings.len(),
        gap_flushes: detector.gap_flushes(),
        out_of_order: detector.out_of_order(),
    };
    info!(
        "Found {} zero crossings across {} aircraft ({} gap flushes)",
        summary.crossings,
        detector.tracked_aircraft(),
        summary.gap_flushes
    );
    if summary.out_of_order > 0 {
        warn!(
            "{} samples arrived out of time order in {}; the source table may not be sorted by timestamp",
            summary.out_of_order,
            input_file.display()
        );
    }

    let output_file = output_dir
        .join(input_file.file_name().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Input file path '{}' has no filename", input_file.display()),
            )
        })?)
        .with_extension("json");
    write_events_json(&crossings, &output_file)?;
    info!("Events written to {}", output_file.display());

    let geofenced = crossings
        .into_iter()
        .map(GeofenceEvent::from_crossing)
        .collect();
    Ok((geofenced, summary))
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let config = DetectorConfig {
        buffer_size: cli.buffer_size,
        max_sample_delta_s: cli.max_sample_delta_s,
        min_alt_feet: cli.min_alt_feet,
        threshold_low: cli.threshold_low,
        threshold_high: cli.threshold_high,
    };
    // Fail fast on an invalid configuration before touching any file.
    ZeroCrossingDetector::new(config.clone())?;

    std::fs::create_dir_all(&cli.output)?;
    let csv_files = get_csv_files(&cli.input)?;
    let is_multiple = csv_files.len() > 1;

    if is_multiple {
        info!("Processing {} CSV files from directory", csv_files.len());
        if cli.parallel {
            info!("Running in parallel mode");
        }
    }

    let start = Instant::now();
    let all_events = Mutex::new(Vec::new());
    let totals = Mutex::new(FileSummary::default());

    if cli.parallel && is_multiple {
        let errors = Mutex::new(Vec::new());

        csv_files.par_iter().for_each(|input_file| {
            match process_file(input_file, &cli.output, &config) {
                Ok((events, summary)) => {
                    all_events
                        .lock()
                        .expect("Failed to acquire lock on event collection - another thread panicked")
                        .extend(events);
                    totals
                        .lock()
                        .expect("Failed to acquire lock on run totals - another thread panicked")
                        .merge(&summary);
                }
                Err(e) => {
                    error!("Error processing {}: {}", input_file.display(), e);
                    errors
                        .lock()
                        .expect("Failed to acquire lock on error collection - another thread panicked")
                        .push((input_file.clone(), e.to_string()));
                }
            }
        });

        let errors = errors
            .into_inner()
            .expect("Failed to extract errors from mutex - another thread panicked");
        if !errors.is_empty() {
            error!("{} file(s) failed to process", errors.len());
            for (file, err) in &errors {
                error!("  {}: {}", file.display(), err);
            }
            return Err(format!("{} file(s) failed to process", errors.len()).into());
        }
    } else {
        let mut failures = 0usize;
        for input_file in &csv_files {
            match process_file(input_file, &cli.output, &config) {
                Ok((events, summary)) => {
                    all_events
                        .lock()
                        .expect("Failed to acquire lock on event collection")
                        .extend(events);
                    totals
                        .lock()
                        .expect("Failed to acquire lock on run totals")
                        .merge(&summary);
                }
                Err(e) => {
                    if !is_multiple {
                        return Err(e);
                    }
                    failures += 1;
                    error!("Error processing {}: {}", input_file.display(), e);
                }
            }
        }
        if failures > 0 {
            error!("{} file(s) failed to process", failures);
        }
    }

    let all_events = all_events
        .into_inner()
        .expect("Failed to extract events from mutex - another thread panicked");
    let totals = totals
        .into_inner()
        .expect("Failed to extract totals from mutex - another thread panicked");

    if let Some(kml_path) = &cli.kml {
        write_overlay_kml(&all_events, kml_path)?;
        info!(
            "Overlay with {} visibility circles written to {}",
            all_events.len(),
            kml_path.display()
        );
    }

    let elapsed = start.elapsed();
    info!(
        "Run complete: {} records ({} admitted), {} zero crossings, {:.3} s",
        totals.records,
        totals.admitted,
        totals.crossings,
        elapsed.as_secs_f64()
    );
    println!(
        "Processed {} records in {:.3} s: {} zero crossings",
        totals.records,
        elapsed.as_secs_f64(),
        totals.crossings
    );

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logger(&cli.log_level, cli.log_file.as_ref()) {
        eprintln!("Failed to initialize logger: {e}");
    }

    if let Err(e) = run(&cli) {
        error!("{e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
