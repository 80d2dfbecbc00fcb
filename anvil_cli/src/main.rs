mod load;

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use anvil_core::format::RECORD_HEADER_SIZE;
use anvil_core::{DecodeOptions, RecordHeader, RegionReader, DEFAULT_MAX_DEPTH};

use load::load_whole_file;

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "anvil",
    about = "Decode region files: scan paths from stdin, inspect headers, dump single cells",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// Maximum Compound/List nesting allowed inside one cell
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
    /// Decode cells one at a time instead of on the thread pool
    #[arg(long, global = true)]
    sequential: bool,
    /// Log per-region debug detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Read region file paths from stdin, one per line, and decode every cell
    ///
    /// This is the default when no subcommand is given.
    Scan,
    /// Print header statistics for a region file
    Inspect {
        /// Region file to inspect
        file: PathBuf,
        /// Print one row per present cell
        #[arg(long)]
        cells: bool,
    },
    /// Decode one cell and print its tag tree as JSON
    Dump {
        /// Region file
        file: PathBuf,
        /// Cell x coordinate within the region (0–31)
        #[arg(short, value_parser = clap::value_parser!(u8).range(0..32))]
        x: u8,
        /// Cell z coordinate within the region (0–31)
        #[arg(short, value_parser = clap::value_parser!(u8).range(0..32))]
        z: u8,
        /// Print single-line JSON
        #[arg(long)]
        compact: bool,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

// ── Subcommand implementations ─────────────────────────────────────────────

/// Decode one region file and report it. Failures are logged, never returned:
/// one bad file must not stop the scan.
fn scan_file(path: &Path, options: DecodeOptions) {
    let data = match load_whole_file(path) {
        Ok(data) => data,
        Err(e) => {
            log::error!("{}", e);
            return;
        }
    };

    let reader = match RegionReader::new(&data, options) {
        Ok(reader) => reader,
        Err(e) => {
            log::error!("{}: {}", path.display(), e);
            return;
        }
    };

    let t0 = Instant::now();
    let results = reader.decode_all();
    let elapsed = t0.elapsed();

    let mut failed = 0usize;
    for cell in &results {
        if let Err(e) = &cell.result {
            failed += 1;
            log::error!("{}: chunk {} {}: {}", path.display(), cell.x, cell.z, e);
        }
    }

    log::debug!(
        "{}: {} in {:.3}ms",
        path.display(),
        human_bytes(data.len() as u64),
        elapsed.as_secs_f64() * 1000.0
    );
    println!(
        "Loaded region from file {} completely ({} cells, {} failed)",
        path.display(),
        results.len() - failed,
        failed
    );
}

/// Paths are raw bytes on unix; elsewhere a line must be UTF-8 to name a file.
#[cfg(unix)]
fn path_from_line(line: Vec<u8>) -> Option<PathBuf> {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;
    Some(PathBuf::from(OsString::from_vec(line)))
}

#[cfg(not(unix))]
fn path_from_line(line: Vec<u8>) -> Option<PathBuf> {
    match String::from_utf8(line) {
        Ok(line) => Some(PathBuf::from(line)),
        Err(e) => {
            log::error!("skipping path line that is not UTF-8: {:?}", e.as_bytes());
            None
        }
    }
}

/// Scan every path listed in `input`, one per line. Returns how many paths
/// were attempted. Only the end of `input` stops the scan.
fn scan_paths<R: BufRead>(input: R, options: DecodeOptions) -> usize {
    let mut attempted = 0;
    for line in input.split(b'\n') {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::error!("reading file paths: {}", e);
                break;
            }
        };
        if line.is_empty() {
            continue;
        }
        if let Some(path) = path_from_line(line) {
            scan_file(&path, options);
            attempted += 1;
        }
    }
    attempted
}

fn run_scan(options: DecodeOptions) -> anyhow::Result<()> {
    let paths = scan_paths(io::stdin().lock(), options);
    log::debug!("scanned {} paths", paths);
    Ok(())
}

fn run_inspect(file: PathBuf, show_cells: bool, options: DecodeOptions) -> anyhow::Result<()> {
    let data = load_whole_file(&file)?;
    let reader = RegionReader::new(&data, options)
        .with_context(|| format!("opening region {:?}", file))?;
    let header = reader.header();

    let sectors_used: u64 = header.present().map(|(_, _, e)| e.sector_count as u64).sum();
    let newest = header.timestamps().iter().copied().max().unwrap_or(0);

    println!("=== Region File: {:?} ===", file);
    println!();
    println!("  file on disk   : {}", human_bytes(reader.file_len() as u64));
    println!("  present cells  : {} / 1024", header.present_count());
    println!("  sectors used   : {}", sectors_used);
    println!("  newest stamp   : {}", newest);

    if show_cells {
        println!();
        println!(
            "  {:>3} {:>3}  {:>8}  {:>7}  {:>10}  {:>11}  {:>12}",
            "x", "z", "sector", "sectors", "length", "scheme", "timestamp"
        );
        println!("  {}", "-".repeat(64));
        for (x, z, entry) in header.present() {
            let (length, scheme) = match entry.validate(data.len() as u64) {
                Ok(span) => {
                    let mut raw = [0u8; RECORD_HEADER_SIZE];
                    raw.copy_from_slice(&data[span.start..span.start + RECORD_HEADER_SIZE]);
                    let record = RecordHeader::from_bytes(raw);
                    (
                        human_bytes(record.length as u64),
                        format!("{} ({})", record.scheme.name(), record.scheme.tag()),
                    )
                }
                Err(_) => ("-".to_string(), "corrupt".to_string()),
            };
            println!(
                "  {:>3} {:>3}  {:>8}  {:>7}  {:>10}  {:>11}  {:>12}",
                x,
                z,
                entry.sector_offset,
                entry.sector_count,
                length,
                scheme,
                header.timestamp(x, z)
            );
        }
    }

    Ok(())
}

fn run_dump(
    file: PathBuf,
    x: u8,
    z: u8,
    compact: bool,
    options: DecodeOptions,
) -> anyhow::Result<()> {
    let data = load_whole_file(&file)?;
    let reader = RegionReader::new(&data, options)
        .with_context(|| format!("opening region {:?}", file))?;

    let tag = reader
        .decode_cell(x as usize, z as usize)
        .with_context(|| format!("decoding chunk {} {} of {:?}", x, z, file))?
        .ok_or_else(|| anyhow::anyhow!("chunk {} {} is not present in {:?}", x, z, file))?;

    let json = if compact {
        serde_json::to_string(&tag)?
    } else {
        serde_json::to_string_pretty(&tag)?
    };
    println!("{}", json);
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = DecodeOptions {
        max_depth: cli.max_depth,
        parallel: !cli.sequential,
    };

    match cli.command.unwrap_or(Commands::Scan) {
        Commands::Scan => run_scan(options),
        Commands::Inspect { file, cells } => run_inspect(file, cells, options),
        Commands::Dump {
            file,
            x,
            z,
            compact,
        } => run_dump(file, x, z, compact, options),
    }
}
