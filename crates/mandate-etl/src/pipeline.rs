//! Pipeline Driver: sequences the load over the whole input stream.
//!
//! ```text
//! rebuild
//!   └─ for each record:  read ─▶ parse ─▶ resolve ─▶ accumulate ─▶ [flush]
//!        └─ final flush ─▶ done
//! ```
//!
//! Strictly sequential: one record at a time, one store call at a time. A bad
//! record is dropped and reported; a failed read, flush or lost connection
//! ends the run.

use std::{
  fmt,
  time::{Duration, Instant},
};

use mandate_core::{
  record::RawRecord,
  store::{MandateStore, StoreFailure as _},
};
use mandate_csv::parse_record;

use crate::{
  batch::{BatchAccumulator, DEFAULT_BATCH_SIZE},
  dedup::{CacheStats, ReferenceCache},
  error::{Aborted, Error, ResolveError, RowError},
  observer::{BatchCommitted, Observer, Progress},
};

pub const DEFAULT_PROGRESS_INTERVAL: u64 = 10_000;

// ─── Options and report ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
  /// Rows per flush.
  pub batch_size:        usize,
  /// Emit a progress event every this many successfully processed rows.
  pub progress_interval: u64,
}

impl Default for PipelineOptions {
  fn default() -> Self {
    Self {
      batch_size:        DEFAULT_BATCH_SIZE,
      progress_interval: DEFAULT_PROGRESS_INTERVAL,
    }
  }
}

/// What a run did, whether it finished or not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
  pub records_read:           u64,
  pub committed:              u64,
  pub rejected:               u64,
  pub batches:                u64,
  pub links_inserted:         u64,
  /// Ordinal of the last record in the last fully committed batch; `0` if
  /// nothing was committed.
  pub last_committed_ordinal: u64,
  pub references:             CacheStats,
  pub elapsed:                Duration,
}

impl fmt::Display for LoadReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} rows read: {} inserted, {} rejected in {:.2} seconds",
      self.records_read,
      self.committed,
      self.rejected,
      self.elapsed.as_secs_f64(),
    )
  }
}

// ─── Driver ──────────────────────────────────────────────────────────────────

/// Rebuild `store` and load every record from `records` into it.
///
/// The store is borrowed exclusively for the whole run; closing it is the
/// caller's job, on success and on failure alike.
pub async fn load<S, I, O>(
  store: &mut S,
  records: I,
  options: &PipelineOptions,
  observer: &mut O,
) -> Result<LoadReport, Aborted>
where
  S: MandateStore,
  I: IntoIterator<Item = mandate_csv::Result<RawRecord>>,
  O: Observer + ?Sized,
{
  let started = Instant::now();

  if let Err(e) = store.rebuild().await {
    return Err(Aborted {
      report: LoadReport { elapsed: started.elapsed(), ..Default::default() },
      error:  Error::Rebuild(Box::new(e)),
    });
  }
  tracing::debug!("store rebuilt");

  let mut run = Run {
    store: &*store,
    observer,
    cache: ReferenceCache::new(),
    batch: BatchAccumulator::new(options.batch_size),
    progress_interval: options.progress_interval.max(1),
    processed: 0,
    report: LoadReport::default(),
    started,
  };

  for (index, item) in records.into_iter().enumerate() {
    let ordinal = index as u64 + 1;

    let raw = match item {
      Ok(raw) => raw,
      Err(source) => return Err(run.abort(Error::StreamRead { ordinal, source })),
    };
    run.report.records_read += 1;

    match run.process(ordinal, raw).await {
      Ok(()) => {}
      Err(Fault::Row(rejection)) => {
        run.report.rejected += 1;
        run.observer.rejected(&rejection);
      }
      Err(Fault::Fatal(error)) => return Err(run.abort(error)),
    }
  }

  if let Err(error) = run.flush(true).await {
    return Err(run.abort(error));
  }

  Ok(run.snapshot())
}

enum Fault {
  Row(RowError),
  Fatal(Error),
}

struct Run<'a, S, O: ?Sized> {
  store:             &'a S,
  observer:          &'a mut O,
  cache:             ReferenceCache,
  batch:             BatchAccumulator,
  progress_interval: u64,
  processed:         u64,
  report:            LoadReport,
  started:           Instant,
}

impl<S, O> Run<'_, S, O>
where
  S: MandateStore,
  O: Observer + ?Sized,
{
  async fn process(&mut self, ordinal: u64, raw: RawRecord) -> Result<(), Fault> {
    let parsed = parse_record(ordinal, &raw).map_err(|e| Fault::Row(e.into()))?;

    let pending = self
      .cache
      .resolve_record(self.store, ordinal, parsed)
      .await
      .map_err(|ResolveError { kind, source }| {
        if source.is_connection_failure() {
          Fault::Fatal(Error::StoreConnection { ordinal, kind, source: Box::new(source) })
        } else {
          Fault::Row(RowError::Reference { ordinal, kind, source: Box::new(source) })
        }
      })?;

    self.processed += 1;
    if self.batch.append(pending) {
      self.flush(false).await.map_err(Fault::Fatal)?;
    }

    if self.processed % self.progress_interval == 0 {
      self.observer.progress(&Progress {
        processed: self.processed,
        elapsed:   self.started.elapsed(),
      });
    }
    Ok(())
  }

  /// Commit whatever is buffered. An empty buffer is not an error.
  async fn flush(&mut self, final_batch: bool) -> Result<(), Error> {
    let batch = self.batch.drain();
    let (Some(first_ordinal), Some(last_ordinal)) = (batch.first_ordinal(), batch.last_ordinal())
    else {
      return Ok(());
    };
    let rows = batch.len() as u64;

    tracing::debug!(first_ordinal, last_ordinal, rows, final_batch, "flushing batch");
    let receipt = self
      .store
      .flush_counties(batch.records)
      .await
      .map_err(|e| Error::BatchCommit { first_ordinal, final_batch, source: Box::new(e) })?;

    self.report.committed += rows;
    self.report.batches += 1;
    self.report.links_inserted += receipt.links_inserted as u64;
    self.report.last_committed_ordinal = last_ordinal;

    self.observer.committed(&BatchCommitted { first_ordinal, last_ordinal, receipt });
    Ok(())
  }

  fn snapshot(&self) -> LoadReport {
    LoadReport {
      references: self.cache.stats(),
      elapsed: self.started.elapsed(),
      ..self.report.clone()
    }
  }

  /// The buffered batch is dropped, never partially flushed.
  fn abort(&self, error: Error) -> Aborted {
    Aborted { report: self.snapshot(), error }
  }
}
