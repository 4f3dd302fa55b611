//! `mandate` binary.
//!
//! Reads `mandate.toml` (or the path given with `--config`), then loads a
//! county mask-mandate CSV into SQLite, refreshes the per-jurisdiction summary
//! or prints the read-side reports.

use std::{path::PathBuf, process::ExitCode};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use mandate_core::{report::JurisdictionAverage, store::MandateStore};
use mandate_csv::RecordReader;
use mandate_etl::{Aborted, EtlConfig, LoadReport, TracingObserver, load};
use mandate_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "County mask-mandate loader")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "mandate.toml")]
  config: PathBuf,

  /// SQLite database to write to; overrides `store_path`.
  #[arg(long)]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Rebuild the store and load every record from the input file.
  Load {
    /// CSV file to read; overrides `input_path`.
    #[arg(short, long)]
    input:      Option<PathBuf>,
    /// Rows per transaction; overrides `batch_size`.
    #[arg(long)]
    batch_size: Option<usize>,
  },
  /// Recompute the per-jurisdiction average mandate counts.
  Summarize,
  /// Print average mandate counts, or per-county counts for one jurisdiction.
  Report {
    #[arg(short, long)]
    jurisdiction: Option<String>,
    /// Emit JSON instead of a table.
    #[arg(long)]
    json:         bool,
  },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut cfg = EtlConfig::load(&cli.config)
    .with_context(|| format!("invalid configuration in {:?}", cli.config))?;
  if let Some(store) = cli.store {
    cfg.store_path = store;
  }

  match cli.command {
    Command::Load { input, batch_size } => {
      if let Some(input) = input {
        cfg.input_path = Some(input);
      }
      if let Some(batch_size) = batch_size {
        cfg.batch_size = batch_size;
      }
      cfg.validate().context("invalid configuration")?;
      run_load(&cfg).await
    }
    Command::Summarize => {
      let store = open_store(&cfg).await?;
      let result = store.refresh_summary().await;
      store.close().await.context("failed to close store")?;

      let rows = result.context("summary job failed")?;
      tracing::info!("summarised {} jurisdictions", rows.len());
      for row in rows {
        println!("{:<40} {:>10.2}", row.jurisdiction_name, row.average_mandate_count);
      }
      Ok(ExitCode::SUCCESS)
    }
    Command::Report { jurisdiction, json } => {
      let store = open_store(&cfg).await?;
      let result = report(&store, jurisdiction, json).await;
      store.close().await.context("failed to close store")?;
      result
    }
  }
}

async fn run_load(cfg: &EtlConfig) -> anyhow::Result<ExitCode> {
  let input = cfg
    .input_path()
    .context("no input file: pass --input or set input_path")?;

  // Open the input before touching the store so a bad path never rebuilds it.
  let reader = RecordReader::from_path(&input, cfg.delimiter_byte()?)
    .with_context(|| format!("failed to open input {input:?}"))?;

  let mut store = open_store(cfg).await?;
  tracing::info!("loading {input:?} into {:?}", cfg.store_path());

  let outcome = load(&mut store, reader, &cfg.pipeline_options(), &mut TracingObserver).await;
  let closed = store.close().await;
  let succeeded = conclude(outcome, closed)?;
  Ok(if succeeded { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Report how a load ended; `Ok(false)` means the run was aborted. An
/// aborted run is always reported with its stage and last committed record,
/// even when closing the store failed as well.
fn conclude(
  outcome: Result<LoadReport, Aborted>,
  closed: mandate_store_sqlite::Result<()>,
) -> anyhow::Result<bool> {
  match outcome {
    Ok(report) => {
      closed.context("failed to close store")?;
      println!("{report}");
      Ok(true)
    }
    Err(aborted) => {
      tracing::error!(stage = %aborted.stage(), "{aborted}");
      eprintln!("{}", aborted.report);
      if let Err(e) = closed {
        tracing::error!("failed to close store after aborted load: {e}");
      }
      Ok(false)
    }
  }
}

async fn report(store: &SqliteStore, jurisdiction: Option<String>, json: bool) -> anyhow::Result<ExitCode> {
  let Some(name) = jurisdiction else {
    let rows = store.average_mandates().await.context("average query failed")?;
    if json {
      println!("{}", averages_json(rows)?);
    } else {
      for row in rows {
        println!("{:<40} {:>10.2}", row.jurisdiction_name, row.average_mandate_count);
      }
    }
    return Ok(ExitCode::SUCCESS);
  };

  let Some(rows) = store
    .county_mandates(name.clone())
    .await
    .context("county query failed")?
  else {
    eprintln!("unknown jurisdiction: {name}");
    return Ok(ExitCode::FAILURE);
  };

  if json {
    println!("{}", serde_json::to_string_pretty(&rows)?);
  } else {
    for row in rows {
      println!("{:<40} {:>6}", row.county_name, row.mandate_count);
    }
  }
  Ok(ExitCode::SUCCESS)
}

fn averages_json(rows: Vec<JurisdictionAverage>) -> serde_json::Result<String> {
  let rows: Vec<_> = rows.into_iter().map(JurisdictionAverage::rounded).collect();
  serde_json::to_string_pretty(&rows)
}

async fn open_store(cfg: &EtlConfig) -> anyhow::Result<SqliteStore> {
  let path = cfg.store_path();
  SqliteStore::open(&path)
    .await
    .with_context(|| format!("failed to open store at {path:?}"))
}
