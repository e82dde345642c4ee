//! avred - locate the minimal byte ranges in a file that trigger an
//! antivirus scanner, by recursive bisection against a scanner oracle.
//!
//! # Usage
//!
//! ```bash
//! # Reduce against a local scanner binary
//! avred sample.exe --scanner process --scanner-cmd clamscan
//!
//! # Reduce against a remote scanning endpoint, isolate strategy
//! avred sample.docx --scanner http --scanner-url http://localhost:8080/scan --isolate
//! ```

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use avred::analyzer::{analyze_with_reporter, AnalyzeOptions};
use avred::reducer::ScanSpeed;
use avred::reporter::ThrottledReporter;
use avred::scanner::{HttpScanner, ProcessScanner, Scanner};
use avred::section::{FileAdapter, PeAdapter, RawAdapter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input file to reduce
    input: PathBuf,

    /// Where to write the JSON outcome (defaults to `<input>.outcome.json`)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Bisection throttling preset
    #[arg(long, value_enum, default_value_t = CliScanSpeed::Normal)]
    scan_speed: CliScanSpeed,

    /// Use mask-all-others section attribution instead of zero-section
    #[arg(long)]
    isolate: bool,

    /// Hide Resources/VersionInfo sections before attribution
    #[arg(long)]
    remove_noise: bool,

    /// Skip .text sections when reducing (code sections tend to be noisy)
    #[arg(long)]
    ignore_text: bool,

    /// Skip the final verification pass
    #[arg(long)]
    no_verify: bool,

    /// Use the legacy linear-byte reducer instead of bisection
    #[arg(long)]
    legacy_algorithm: bool,

    /// Treat the input as a raw blob instead of parsing a PE section table
    #[arg(long)]
    raw: bool,

    /// Which scanner transport to use
    #[arg(long, value_enum, default_value_t = ScannerKind::Process)]
    scanner: ScannerKind,

    /// Remote scanning endpoint (scanner = http)
    #[arg(long)]
    scanner_url: Option<String>,

    /// Local scanner binary to invoke (scanner = process)
    #[arg(long, default_value = "clamscan")]
    scanner_cmd: String,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliScanSpeed {
    Fast,
    Normal,
    Slow,
    Complete,
}

impl From<CliScanSpeed> for ScanSpeed {
    fn from(value: CliScanSpeed) -> Self {
        match value {
            CliScanSpeed::Fast => ScanSpeed::Fast,
            CliScanSpeed::Normal => ScanSpeed::Normal,
            CliScanSpeed::Slow => ScanSpeed::Slow,
            CliScanSpeed::Complete => ScanSpeed::Complete,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ScannerKind {
    Process,
    Http,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let bytes = fs::read(&args.input).context("failed to read input file")?;
    let filename = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.input.to_string_lossy().into_owned());

    let adapter: Box<dyn FileAdapter> = if args.raw {
        Box::new(RawAdapter::new(filename, bytes))
    } else {
        match PeAdapter::parse(filename.clone(), bytes.clone()) {
            Ok(pe) => Box::new(pe),
            Err(_) => {
                tracing::warn!("not a recognizable PE, falling back to raw section model");
                Box::new(RawAdapter::new(filename, bytes))
            }
        }
    };

    let scanner: Box<dyn Scanner> = match args.scanner {
        ScannerKind::Process => Box::new(ProcessScanner::new(args.scanner_cmd.clone(), Vec::new())),
        ScannerKind::Http => {
            let url = args
                .scanner_url
                .context("--scanner-url is required when --scanner=http")?;
            Box::new(HttpScanner::new(url).with_retries(3, Duration::from_millis(250)))
        }
    };

    let options = AnalyzeOptions {
        isolate: args.isolate,
        remove_noise: args.remove_noise,
        ignore_text: args.ignore_text,
        verify: !args.no_verify,
        new_algorithm: !args.legacy_algorithm,
        scan_speed: args.scan_speed.into(),
    };

    let reporter = Box::new(ThrottledReporter::new(Duration::from_secs(2)));
    let (outcome, matches) =
        analyze_with_reporter(adapter.as_ref(), scanner.as_ref(), options, reporter)?;

    if matches.is_empty() {
        println!("No matches found.");
        return Ok(());
    }

    for m in &matches {
        println!(
            "[*] Signature between {} and {} size {}",
            m.begin,
            m.end,
            m.len()
        );
    }

    let output_path = args.output.unwrap_or_else(|| args.input.clone());
    outcome
        .save_to_file(&output_path)
        .context("failed to save outcome")?;

    if outcome.is_verified {
        println!("Success, not detected!");
    } else {
        println!("Still detected? :-(");
    }

    Ok(())
}
