//! The `MandateStore` trait, the storage interface shared by the loader and
//! the read-side consumers.
//!
//! The trait is implemented by storage backends (e.g. `mandate-store-sqlite`).
//! The ETL driver depends on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::{
  record::{FlushReceipt, PendingCounty},
  reference::ReferenceKey,
  report::{CountyMandateCount, JurisdictionAverage, StoreStats},
};

// ─── Failure classification ──────────────────────────────────────────────────

/// Lets callers tell a lost store from a failed statement.
///
/// The loader drops a row whose reference lookup failed, but it aborts the
/// whole run if the failure means the store itself is gone.
pub trait StoreFailure {
  fn is_connection_failure(&self) -> bool;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the relational store the loader writes into.
///
/// There is exactly one writer. Readers must not query a store while a load
/// is running: citations for the batch currently being buffered are not yet
/// linked.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait MandateStore: Send + Sync {
  type Error: std::error::Error + StoreFailure + Send + Sync + 'static;

  // ── Write side ────────────────────────────────────────────────────────

  /// Drop every relation and recreate the empty schema.
  ///
  /// Takes `&mut self` so that a rebuild can only happen while the caller
  /// holds the handle exclusively.
  fn rebuild(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Return the surrogate id for `key`, inserting the reference row first if
  /// it does not exist. Keys are matched exactly.
  fn resolve_reference(
    &self,
    key: ReferenceKey,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// Insert `batch` in order inside one transaction, then insert its citation
  /// links inside a second one. Duplicate links are ignored.
  ///
  /// If the link transaction fails the county rows stay committed; no link
  /// from the failed transaction is visible.
  fn flush_counties(
    &self,
    batch: Vec<PendingCounty>,
  ) -> impl Future<Output = Result<FlushReceipt, Self::Error>> + Send + '_;

  // ── Read side ─────────────────────────────────────────────────────────

  /// Find a jurisdiction by name, ignoring ASCII case and surrounding
  /// whitespace. Unlike [`resolve_reference`](Self::resolve_reference) this
  /// never inserts.
  fn lookup_jurisdiction_id(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Option<i64>, Self::Error>> + Send + '_;

  /// Average mandate count per jurisdiction, highest first.
  fn average_mandates(
    &self,
  ) -> impl Future<Output = Result<Vec<JurisdictionAverage>, Self::Error>> + Send + '_;

  /// Mandate count per county of the named jurisdiction, ordered by count
  /// descending then county name ascending. Returns `None` if no
  /// jurisdiction matches `name` (see
  /// [`lookup_jurisdiction_id`](Self::lookup_jurisdiction_id)).
  fn county_mandates(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Option<Vec<CountyMandateCount>>, Self::Error>> + Send + '_;

  /// Recompute the per-jurisdiction summary relation and return its rows.
  fn refresh_summary(
    &self,
  ) -> impl Future<Output = Result<Vec<JurisdictionAverage>, Self::Error>> + Send + '_;

  fn stats(&self) -> impl Future<Output = Result<StoreStats, Self::Error>> + Send + '_;
}
