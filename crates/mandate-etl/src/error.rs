//! Error types for `mandate-etl`.
//!
//! Row-level failures ([`RowError`]) are absorbed by the driver and reported
//! to the observer. Everything in [`Error`] ends the run.

use mandate_core::reference::ReferenceKind;
use mandate_csv::RowParseError;
use strum::{Display, IntoStaticStr};
use thiserror::Error;

use crate::pipeline::LoadReport;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Where in the run a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
  Rebuild,
  Read,
  Parse,
  Resolve,
  Flush,
  FinalFlush,
}

// ─── Row level ───────────────────────────────────────────────────────────────

/// Why a single record was dropped.
#[derive(Debug, Error)]
pub enum RowError {
  #[error(transparent)]
  Parse(#[from] RowParseError),

  #[error("row {ordinal} rejected: could not resolve {kind}: {source}")]
  Reference {
    ordinal: u64,
    kind:    ReferenceKind,
    #[source]
    source:  BoxError,
  },
}

impl RowError {
  pub fn ordinal(&self) -> u64 {
    match self {
      RowError::Parse(e) => e.ordinal,
      RowError::Reference { ordinal, .. } => *ordinal,
    }
  }

  pub fn stage(&self) -> Stage {
    match self {
      RowError::Parse(_) => Stage::Parse,
      RowError::Reference { .. } => Stage::Resolve,
    }
  }
}

/// A reference lookup failed inside the deduplicator.
#[derive(Debug, Error)]
#[error("could not resolve {kind}: {source}")]
pub struct ResolveError<E: std::error::Error + 'static> {
  pub kind:   ReferenceKind,
  #[source]
  pub source: E,
}

// ─── Fatal ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum Error {
  #[error("store rebuild failed: {0}")]
  Rebuild(#[source] BoxError),

  #[error("input unreadable at record {ordinal}: {source}")]
  StreamRead {
    ordinal: u64,
    #[source]
    source:  mandate_csv::Error,
  },

  #[error("store connection lost resolving {kind} for record {ordinal}: {source}")]
  StoreConnection {
    ordinal: u64,
    kind:    ReferenceKind,
    #[source]
    source:  BoxError,
  },

  #[error("batch starting at record {first_ordinal} failed to commit: {source}")]
  BatchCommit {
    first_ordinal: u64,
    final_batch:   bool,
    #[source]
    source:        BoxError,
  },
}

impl Error {
  pub fn stage(&self) -> Stage {
    match self {
      Error::Rebuild(_) => Stage::Rebuild,
      Error::StreamRead { .. } => Stage::Read,
      Error::StoreConnection { .. } => Stage::Resolve,
      Error::BatchCommit { final_batch: false, .. } => Stage::Flush,
      Error::BatchCommit { final_batch: true, .. } => Stage::FinalFlush,
    }
  }
}

/// A run that ended early. Batches committed before the failure stay in the
/// store; the batch being buffered is lost.
#[derive(Debug, Error)]
#[error(
  "load aborted in {} stage; last committed batch ended at record {}: {error}",
  .error.stage(),
  .report.last_committed_ordinal
)]
pub struct Aborted {
  pub report: LoadReport,
  #[source]
  pub error:  Error,
}

impl Aborted {
  pub fn stage(&self) -> Stage { self.error.stage() }
}

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read configuration: {0}")]
  Source(#[from] config::ConfigError),

  #[error("batch_size must be at least 1")]
  BatchSize,

  #[error("progress_interval must be at least 1")]
  ProgressInterval,

  #[error("delimiter must be a single ASCII character, got {0:?}")]
  Delimiter(String),
}
