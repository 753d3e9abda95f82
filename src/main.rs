use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use itertools::Itertools;
use streamsim::config::Settings;
use streamsim::simulator::{self, Exchange, Simulator};
use streamsim::snapshot::Snapshot;
use streamsim::telemetry;
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(about = "Rebuild exchange state from captured websocket frames")]
struct Cli {
    /// Settings file (defaults to ./streamsim.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Feed newline-delimited server frames through a simulator
    Replay(ReplayArgs),
}

#[derive(Debug, clap::Args)]
struct ReplayArgs {
    /// Captured server frames, one JSON message per line
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Exchange identifier, overrides the settings file
    #[arg(long)]
    exchange: Option<String>,

    /// Comma-separated channel allow-list, overrides the settings file
    #[arg(long, value_delimiter = ',')]
    filter: Option<Vec<String>>,

    /// Checkpoint lines (`<channel>\t<payload>`) to restore before replaying
    #[arg(long)]
    restore: Option<PathBuf>,

    /// Snapshot written to stdout once the input is consumed
    #[arg(long, value_enum, default_value_t = Emit::None)]
    emit: Emit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    None,
    Wire,
    State,
}

// Per-symbol best prices plus diagnostics, written to the log
fn log_state_summary(sim: &dyn Simulator) {
    let book = sim.order_book();
    let diag = sim.diagnostics();
    info!(
        channels = %sim.subscriptions().channels().join(","),
        entries = book.len(),
        crossed_purged = diag.crossed_purged,
        update_missing = diag.update_missing,
        events_dropped = diag.events_dropped,
        "Replay finished"
    );
    for symbol in book.symbols() {
        let bid = book.best_bid(symbol).map(|(p, q)| format!("{} @ {}", q, p));
        let ask = book.best_ask(symbol).map(|(p, q)| format!("{} @ {}", q, p));
        info!(
            symbol,
            best_bid = bid.as_deref().unwrap_or("None"),
            best_ask = ask.as_deref().unwrap_or("None"),
            "Top of book"
        );
    }
}

fn restore(sim: &mut dyn Simulator, path: &Path) -> Result<usize> {
    let rdr = BufReader::new(File::open(path).with_context(|| format!("open {:?}", path))?);
    let mut applied = 0usize;
    for (n, line) in rdr.lines().enumerate() {
        let line = line.with_context(|| format!("read {:?}", path))?;
        if line.is_empty() {
            continue;
        }
        let Some(snap) = Snapshot::parse_line(&line) else {
            bail!("restore line {}: expected <channel>\\t<payload>", n + 1);
        };
        sim.process_state(&snap.channel, &snap.payload)
            .with_context(|| format!("restore line {} (channel {})", n + 1, snap.channel))?;
        applied += 1;
    }
    Ok(applied)
}

fn replay(mut settings: Settings, args: ReplayArgs) -> Result<()> {
    if let Some(exchange) = args.exchange {
        settings.exchange = exchange;
    }
    if args.filter.is_some() {
        settings.channel_filter = args.filter;
    }
    let exchange: Exchange = settings.exchange.parse()?;
    let mut sim = simulator::for_exchange(exchange, settings.channel_filter());

    if let Some(path) = &args.restore {
        let applied = restore(sim.as_mut(), path)?;
        info!(lines = applied, "Restored checkpoint");
    }

    let rdr = BufReader::new(File::open(&args.input).with_context(|| format!("open {:?}", args.input))?);
    let mut frames = 0usize;
    for (n, line) in rdr.split(b'\n').enumerate() {
        let line = line.with_context(|| format!("read {:?}", args.input))?;
        let line = line.strip_suffix(b"\r").unwrap_or(&line[..]);
        if line.is_empty() {
            continue;
        }
        sim.process_message_websocket(line)
            .with_context(|| format!("input line {}", n + 1))?;
        frames += 1;
        for anomaly in sim.drain_anomalies() {
            debug!(line = n + 1, ?anomaly, "Anomaly at input line");
        }
    }
    info!(frames, exchange = %exchange, "Consumed input");
    log_state_summary(sim.as_ref());

    let snapshots = match args.emit {
        Emit::None => return Ok(()),
        Emit::Wire => sim.take_snapshot()?,
        Emit::State => sim.take_state_snapshot()?,
    };
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for snap in &snapshots {
        writeln!(out, "{}", snap.to_line())?;
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // load .env

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("load settings")?;
    telemetry::init_tracing(&settings.log_filter);
    telemetry::init_metrics(settings.metrics_port)?;

    match cli.command {
        Command::Replay(args) => replay(settings, args),
    }
}
