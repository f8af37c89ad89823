use std::io::{self, Write};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Error, Result};
use camino::Utf8PathBuf;
use clap::Parser;

use chattyhosts::input::FileOrStdin;
use chattyhosts::{AddrExtractor, Emitter, IgnoreList, Locator, Tracker};

/// Check if the error chain contains a broken pipe error.
#[inline(always)]
fn is_broken_pipe(err: &Error) -> bool {
    for cause in err.chain() {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::BrokenPipe {
                return true;
            }
        }
    }
    false
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// GeoLite2 City database. May be downloaded from MaxMind. If it
    /// cannot be opened, no geolocation data will be displayed.
    #[clap(
        short = 'g',
        long,
        value_name = "FILE",
        value_hint = clap::ValueHint::FilePath,
        env = "GEOIP_CITY_DB",
        default_value = "/var/db/GeoLite/GeoLite2-City.mmdb"
    )]
    geoip_db: Utf8PathBuf,

    /// Print a line after an address has been seen this many times
    /// within the idle window
    #[clap(short = 'p', long, value_name = "N", default_value_t = 32)]
    print_after: u32,

    /// Comma-separated list of regular expressions describing addresses
    /// to ignore. Each is surrounded with '^' and '$' to prevent
    /// accidental matches.
    #[clap(
        short = 'x',
        long,
        value_name = "LIST",
        default_value = r"127.*,255.255.255.0,192.168.*,10\..*"
    )]
    ignore: String,

    /// Reset an address's count if no packets have been seen in this
    /// long. Suffixes ms, s, m, and h may be used; a bare number means
    /// seconds.
    #[clap(
        short = 't',
        long,
        value_name = "DURATION",
        default_value = "2s",
        value_parser = parse_window
    )]
    timeout: Duration,

    /// Enable debug logging
    #[clap(short, long)]
    verbose: bool,

    /// Input file(s) to process. Leave empty or use "-" to read from stdin
    #[clap(value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    input: Vec<Utf8PathBuf>,
}

/// Parse an idle-window duration such as "2s", "500ms", or "5m".
fn parse_window(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let (num, unit) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => s.split_at(idx),
        None => (s, "s"),
    };
    let value: f64 = num
        .parse()
        .map_err(|_| format!("invalid duration: {s:?}"))?;
    let secs = match unit {
        "ms" => value / 1000.0,
        "s" => value,
        "m" => value * 60.0,
        "h" => value * 3600.0,
        other => return Err(format!("unknown duration unit: {other:?}")),
    };
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("invalid duration: {s:?}"));
    }
    Ok(Duration::from_secs_f64(secs))
}

fn main() -> ExitCode {
    // Use a separate run function to handle the actual work
    let err = match run_main() {
        Ok(code) => return code,
        Err(err) => err,
    };

    // Handle broken pipe errors gracefully
    if is_broken_pipe(&err) {
        return ExitCode::SUCCESS;
    }

    if std::env::var("RUST_BACKTRACE").is_ok_and(|v| v == "1")
        && std::env::var("RUST_LIB_BACKTRACE").map_or(true, |v| v == "1")
    {
        writeln!(&mut io::stderr(), "{:?}", err).unwrap();
    } else {
        writeln!(&mut io::stderr(), "{:#}", err).unwrap();
    }

    ExitCode::FAILURE
}

fn run_main() -> Result<ExitCode> {
    let mut args = Args::parse();

    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    // if no files specified, read stdin
    if args.input.is_empty() {
        args.input.push(Utf8PathBuf::from("-"));
    }

    run(args)?;

    Ok(ExitCode::SUCCESS)
}

fn run(args: Args) -> Result<()> {
    // a bad ignore pattern aborts before any input is read
    let ignore = IgnoreList::parse(&args.ignore)?;
    let extractor = AddrExtractor::new()?;

    // a missing database is degraded mode, not an error
    let locator = Locator::open(args.geoip_db.clone());

    let mut tracker = Tracker::new(args.print_after, args.timeout);
    let mut emitter = Emitter::new(locator);
    let mut out = io::stdout();

    for path in args.input {
        let source = FileOrStdin::from_path(path);
        let mut reader = source.reader()?;
        reader.for_byte_line(|line| {
            for addr in extractor.candidates(line) {
                if ignore.is_ignored(addr) {
                    continue;
                }
                if tracker.observe(addr, Instant::now()) {
                    emitter
                        .emit(addr, &mut out)
                        .context("failed to write emission")?;
                    // emissions are rare and meant for live watching
                    out.flush().context("failed to flush stdout")?;
                }
            }
            Ok(true)
        })?;
    }

    Ok(())
}
