use anyhow::{Context, Result};
use batsd_core::timeutils::duration_from_std;
use batsd_core::{
    parse_range, Config, Connection, DataSet, DataType, Kind, LoggingConfig, Measure, TimeRange,
};
use clap::{Parser, Subcommand, ValueEnum};
use once_cell::sync::OnceCell;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "batsd: query a batsd metrics daemon")]
struct Args {
    /// Path to config TOML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override daemon host
    #[arg(long)]
    host: Option<String>,
    /// Override daemon port
    #[arg(long)]
    port: Option<u16>,
    /// Override I/O timeout
    #[arg(long)]
    timeout: Option<humantime::Duration>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the daemon answers
    Ping,
    /// List known keys
    Available {
        #[arg(long)]
        kind: Option<Kind>,
    },
    /// Fetch one series
    Values(ValuesArgs),
}

#[derive(clap::Args, Debug)]
struct ValuesArgs {
    /// counter, gauge or timer
    kind: Kind,
    name: String,
    #[arg(long)]
    subname: Option<String>,
    /// Timer measure (mean, min, max, count, upper_90, stddev)
    #[arg(long)]
    measure: Option<Measure>,
    /// Lookback window ending now, e.g. 15m or 1d
    #[arg(long, conflicts_with_all = ["start", "end"])]
    range: Option<String>,
    #[arg(long, requires = "end")]
    start: Option<i64>,
    #[arg(long, requires = "start")]
    end: Option<i64>,
    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
    Csv,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    apply_overrides(&mut config, &args);
    init_logging(&config.logging)?;

    let conn = Connection::new(config.connection.clone())
        .with_context(|| format!("connecting to {}", config.connection.addr()))?;

    let stdout = io::stdout();
    let result = run(&conn, &args.command, &config, stdout.lock());

    if conn.is_connected() {
        if let Err(err) = conn.quit() {
            warn!("quit failed: {err}");
        }
    }
    result
}

fn run<W: Write>(conn: &Connection, command: &Command, config: &Config, mut out: W) -> Result<()> {
    match command {
        Command::Ping => {
            if !conn.ping()? {
                anyhow::bail!("daemon at {} did not answer PONG", config.connection.addr());
            }
            writeln!(out, "PONG")?;
        }
        Command::Available { kind } => {
            let keys = conn.available()?;
            for key in filter_keys(&keys, *kind) {
                writeln!(out, "{key}")?;
            }
        }
        Command::Values(values) => {
            let range = resolve_range(values, config)?;
            let set = fetch(conn, values, range)?;
            match values.format {
                Format::Table => render_table(&set, &mut out)?,
                Format::Json => writeln!(out, "{}", set.export().to_json_pretty()?)?,
                Format::Csv => set.write_csv(&mut out)?,
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn fetch(conn: &Connection, args: &ValuesArgs, range: TimeRange) -> Result<DataSet> {
    let subname = args.subname.as_deref();
    let set = match args.kind {
        Kind::Counter => conn
            .counter(&args.name)
            .get_range(range, subname, args.measure)?,
        Kind::Gauge => conn
            .gauge(&args.name)
            .get_range(range, subname, args.measure)?,
        Kind::Timer => conn
            .timer(&args.name)
            .get_range(range, subname, args.measure)?,
    };
    Ok(set)
}

fn filter_keys(keys: &[String], kind: Option<Kind>) -> Vec<&str> {
    keys.iter()
        .map(String::as_str)
        .filter(|key| match kind {
            Some(kind) => key.starts_with(kind.prefix()),
            None => true,
        })
        .collect()
}

fn resolve_range(args: &ValuesArgs, config: &Config) -> Result<TimeRange> {
    if let (Some(start), Some(end)) = (args.start, args.end) {
        if end < start {
            anyhow::bail!("--end ({end}) is before --start ({start})");
        }
        return Ok(TimeRange::between(start, end));
    }
    let window = match &args.range {
        Some(r) => parse_range(r)?,
        None => duration_from_std(config.query.default_range)?,
    };
    Ok(TimeRange::ending_now(window))
}

fn render_table<W: Write>(set: &DataSet, out: &mut W) -> Result<()> {
    let format = time::macros::format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    );
    writeln!(
        out,
        "{} {} interval={}s samples={}",
        set.kind(),
        set.id().key(),
        set.interval(),
        set.size()
    )?;
    for sample in set.samples() {
        let when = sample
            .datetime()
            .ok()
            .and_then(|dt| dt.format(&format).ok())
            .unwrap_or_else(|| sample.timestamp.to_string());
        writeln!(out, "{when}  {:.2}", sample.value)?;
    }
    Ok(())
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(host) = &args.host {
        config.connection.host = host.clone();
    }
    if let Some(port) = args.port {
        config.connection.port = port;
    }
    if let Some(timeout) = args.timeout {
        config.connection.timeout = *timeout;
    }
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&logging.level)
        .with_context(|| format!("invalid log level {:?}", logging.level))?;
    let ansi = logging.file.is_none() && atty::is(atty::Stream::Stderr);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(ansi)
        .with_target(false)
        .with_writer(log_writer(logging.file.as_deref())?)
        .finish()
        .try_init()
        .ok();
    Ok(())
}

/// Stderr, or a non-blocking appender on `path` whose guard lives for the
/// rest of the process.
fn log_writer(path: Option<&Path>) -> Result<BoxMakeWriter> {
    let Some(path) = path else {
        return Ok(BoxMakeWriter::new(io::stderr));
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {parent:?}"))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file at {path:?}"))?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    static LOG_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();
    let _ = LOG_GUARD.set(guard);
    Ok(BoxMakeWriter::new(writer))
}
