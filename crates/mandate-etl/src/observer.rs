//! Hooks for watching a load without coupling the driver to any output.

use std::time::Duration;

use mandate_core::record::FlushReceipt;

use crate::error::RowError;

/// Periodic progress snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
  /// Records parsed, resolved and buffered so far; monotonically increasing.
  pub processed: u64,
  pub elapsed:   Duration,
}

/// A batch made it into the store.
#[derive(Debug, Clone)]
pub struct BatchCommitted {
  pub first_ordinal: u64,
  pub last_ordinal:  u64,
  pub receipt:       FlushReceipt,
}

/// Receives pipeline events. Every hook defaults to doing nothing.
pub trait Observer {
  fn progress(&mut self, _progress: &Progress) {}

  fn rejected(&mut self, _rejection: &RowError) {}

  fn committed(&mut self, _batch: &BatchCommitted) {}
}

/// Silent observer.
impl Observer for () {}

/// Reports events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
  fn progress(&mut self, progress: &Progress) {
    tracing::info!(
      "inserted {} rows in {:.2} seconds",
      progress.processed,
      progress.elapsed.as_secs_f64(),
    );
  }

  fn rejected(&mut self, rejection: &RowError) {
    tracing::warn!(
      ordinal = rejection.ordinal(),
      stage = %rejection.stage(),
      "{rejection}"
    );
  }

  fn committed(&mut self, batch: &BatchCommitted) {
    tracing::debug!(
      first_ordinal = batch.first_ordinal,
      last_ordinal = batch.last_ordinal,
      first_id = batch.receipt.first_id(),
      last_id = batch.receipt.last_id(),
      links = batch.receipt.links_inserted,
      "batch committed"
    );
  }
}
