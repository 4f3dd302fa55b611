//! Pipeline tests against an in-memory `SqliteStore`.

use std::sync::atomic::{AtomicUsize, Ordering};

use mandate_core::{
  record::{FlushReceipt, PendingCounty, RawRecord},
  reference::{ReferenceKey, ReferenceKind},
  report::{CountyMandateCount, JurisdictionAverage, StoreStats},
  store::MandateStore,
};
use mandate_csv::RecordReader;
use mandate_store_sqlite::SqliteStore;

use crate::{
  Aborted, Error, PipelineOptions, RowError, Stage, load,
  observer::{BatchCommitted, Observer, Progress},
};

// ─── Fixtures ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
  progress:  Vec<Progress>,
  rejected:  Vec<RowError>,
  committed: Vec<BatchCommitted>,
}

impl Observer for Recorder {
  fn progress(&mut self, progress: &Progress) { self.progress.push(*progress); }

  fn rejected(&mut self, rejection: &RowError) {
    // RowError is not Clone; keep an equivalent parse or reference error.
    let copy = match rejection {
      RowError::Parse(e) => RowError::Parse(e.clone()),
      RowError::Reference { ordinal, kind, source } => RowError::Reference {
        ordinal: *ordinal,
        kind:    *kind,
        source:  source.to_string().into(),
      },
    };
    self.rejected.push(copy);
  }

  fn committed(&mut self, batch: &BatchCommitted) { self.committed.push(batch.clone()); }
}

fn raw(i: u64) -> RawRecord {
  RawRecord {
    jurisdiction: "Ohio".into(),
    county_name:  format!("County {}", i % 7),
    fips_code:    (39000 + i % 7).to_string(),
    date:         "2020-04-01".into(),
    policy_code:  "1".into(),
    mandate:      "Yes".into(),
    citations:    "[]".into(),
  }
}

fn records(n: u64) -> Vec<mandate_csv::Result<RawRecord>> { (1..=n).map(|i| Ok(raw(i))).collect() }

fn options(batch_size: usize) -> PipelineOptions {
  PipelineOptions { batch_size, ..Default::default() }
}

async fn store() -> SqliteStore { SqliteStore::open_in_memory().await.unwrap() }

// ─── Happy path ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn loads_single_csv_row_end_to_end() {
  let csv = "State_Tribe_Territory,County_Name,FIPS_Code,Date,Masks_Order_Code,\
             Face_Masks_Required_in_Public,Citations\n\
             Ohio,Franklin,39049,2020-04-01,2,Yes,\"[Exec Order 12, Ord 5]\"\n";
  let reader = RecordReader::new(csv.as_bytes(), b',').unwrap();

  let mut s = store().await;
  let report = load(&mut s, reader, &PipelineOptions::default(), &mut ())
    .await
    .unwrap();

  assert_eq!(report.records_read, 1);
  assert_eq!(report.committed, 1);
  assert_eq!(report.links_inserted, 2);
  assert_eq!(report.last_committed_ordinal, 1);
  assert_eq!(s.stats().await.unwrap(), StoreStats {
    jurisdictions:  1,
    policy_codes:   1,
    citations:      2,
    county_records: 1,
    citation_links: 2,
  });

  let view = s.county_record(1).await.unwrap().unwrap();
  assert_eq!(view.jurisdiction, "Ohio");
  assert_eq!(view.county_name, "Franklin");
  assert_eq!(view.fips_code, 39049);
  assert_eq!(view.effective_date, 1_585_699_200);
  assert_eq!(view.policy_code, 2);
  assert!(view.mask_required);
  assert_eq!(view.citations, ["Exec Order 12", "Ord 5"]);
}

#[tokio::test]
async fn empty_input_leaves_empty_store() {
  let mut s = store().await;
  let report = load(&mut s, records(0), &PipelineOptions::default(), &mut ())
    .await
    .unwrap();

  assert_eq!(report.records_read, 0);
  assert_eq!(report.batches, 0);
  assert_eq!(s.stats().await.unwrap(), StoreStats::default());
}

#[tokio::test]
async fn rerun_replaces_previous_load() {
  let mut s = store().await;
  load(&mut s, records(10), &options(4), &mut ()).await.unwrap();
  load(&mut s, records(3), &options(4), &mut ()).await.unwrap();

  let stats = s.stats().await.unwrap();
  assert_eq!(stats.county_records, 3);
  assert_eq!(stats.jurisdictions, 1);
  assert!(s.county_record(1).await.unwrap().is_some());
  assert!(s.county_record(4).await.unwrap().is_none());
}

#[tokio::test]
async fn bad_date_drops_only_that_row() {
  let mut input = records(100);
  input[36] = Ok(RawRecord { date: "not a date".into(), ..raw(37) });

  let mut s = store().await;
  let mut rec = Recorder::default();
  let report = load(&mut s, input, &PipelineOptions::default(), &mut rec)
    .await
    .unwrap();

  assert_eq!(report.records_read, 100);
  assert_eq!(report.committed, 99);
  assert_eq!(report.rejected, 1);
  assert_eq!(rec.rejected.len(), 1);
  assert_eq!(rec.rejected[0].ordinal(), 37);
  assert_eq!(rec.rejected[0].stage(), Stage::Parse);
  assert_eq!(s.stats().await.unwrap().county_records, 99);
}

#[tokio::test]
async fn citations_dedupe_across_batches() {
  let mut input = records(1500);
  input[0] = Ok(RawRecord { citations: "[Exec Order A]".into(), ..raw(1) });
  input[1499] = Ok(RawRecord { citations: "[Exec Order A]".into(), ..raw(1500) });

  let mut s = store().await;
  let report = load(&mut s, input, &PipelineOptions::default(), &mut ())
    .await
    .unwrap();

  assert_eq!(report.batches, 2);
  assert_eq!(report.links_inserted, 2);
  let stats = s.stats().await.unwrap();
  assert_eq!(stats.citations, 1);
  assert_eq!(stats.citation_links, 2);

  for id in [1, 1500] {
    let view = s.county_record(id).await.unwrap().unwrap();
    assert_eq!(view.citations, ["Exec Order A"], "county record {id}");
  }
  assert!(s.county_record(2).await.unwrap().unwrap().citations.is_empty());
}

#[tokio::test]
async fn batches_follow_input_order_with_contiguous_ids() {
  let mut s = store().await;
  let mut rec = Recorder::default();
  let report = load(&mut s, records(10), &options(4), &mut rec).await.unwrap();

  assert_eq!(report.batches, 3);
  let bounds: Vec<_> = rec
    .committed
    .iter()
    .map(|b| (b.first_ordinal, b.last_ordinal, b.receipt.first_id(), b.receipt.last_id()))
    .collect();
  assert_eq!(bounds, [
    (1, 4, Some(1), Some(4)),
    (5, 8, Some(5), Some(8)),
    (9, 10, Some(9), Some(10)),
  ]);
  assert!(rec.committed.iter().all(|b| b.receipt.is_contiguous()));
}

#[tokio::test]
async fn progress_counts_accepted_rows() {
  let mut input = records(10);
  input[1] = Ok(RawRecord { fips_code: "n/a".into(), ..raw(2) });

  let mut s = store().await;
  let mut rec = Recorder::default();
  let opts = PipelineOptions { batch_size: 4, progress_interval: 3 };
  load(&mut s, input, &opts, &mut rec).await.unwrap();

  let processed: Vec<_> = rec.progress.iter().map(|p| p.processed).collect();
  assert_eq!(processed, [3, 6, 9]);
  assert!(rec.progress.windows(2).all(|w| w[0].elapsed <= w[1].elapsed));
}

#[tokio::test]
async fn report_reflects_cache_traffic() {
  let mut s = store().await;
  let report = load(&mut s, records(5), &PipelineOptions::default(), &mut ())
    .await
    .unwrap();

  // One jurisdiction and one policy code, looked up once per row.
  assert_eq!(report.references.misses, 2);
  assert_eq!(report.references.hits, 8);
  assert!(report.to_string().starts_with("5 rows read: 5 inserted, 0 rejected in "));
}

// ─── Fatal failures ──────────────────────────────────────────────────────────

#[tokio::test]
async fn stream_error_keeps_committed_batches() {
  let mut input = records(5);
  input.push(Err(mandate_csv::Error::Io(std::io::Error::other("truncated"))));
  input.extend((7..=9).map(|i| Ok(raw(i))));

  let mut s = store().await;
  let Aborted { report, error } = load(&mut s, input, &options(2), &mut ())
    .await
    .unwrap_err();

  assert!(matches!(error, Error::StreamRead { ordinal: 6, .. }));
  assert_eq!(error.stage(), Stage::Read);
  assert_eq!(report.last_committed_ordinal, 4);
  assert_eq!(report.committed, 4);
  // Record 5 was buffered but never flushed.
  assert_eq!(s.stats().await.unwrap().county_records, 4);
}

#[tokio::test]
async fn failed_flush_aborts_and_keeps_prior_batches() {
  let mut s = FlakyStore::new(store().await).fail_flush(2);
  let aborted = load(&mut s, records(7), &options(3), &mut ()).await.unwrap_err();

  assert_eq!(aborted.stage(), Stage::Flush);
  assert!(matches!(aborted.error, Error::BatchCommit { first_ordinal: 4, final_batch: false, .. }));
  assert_eq!(aborted.report.last_committed_ordinal, 3);
  assert_eq!(s.inner.stats().await.unwrap().county_records, 3);
  assert!(aborted.to_string().contains("last committed batch ended at record 3"));
}

#[tokio::test]
async fn failed_final_flush_is_reported_as_such() {
  let mut s = FlakyStore::new(store().await).fail_flush(1);
  let aborted = load(&mut s, records(2), &options(5), &mut ()).await.unwrap_err();

  assert_eq!(aborted.stage(), Stage::FinalFlush);
  assert_eq!(aborted.report.last_committed_ordinal, 0);
  assert_eq!(s.inner.stats().await.unwrap().county_records, 0);
}

#[tokio::test]
async fn reference_failure_drops_the_row() {
  let mut input = records(6);
  input[2] = Ok(RawRecord { jurisdiction: "Broken".into(), ..raw(3) });

  let mut s = FlakyStore::new(store().await).poison("Broken", false);
  let mut rec = Recorder::default();
  let report = load(&mut s, input, &options(4), &mut rec).await.unwrap();

  assert_eq!(report.committed, 5);
  assert_eq!(report.rejected, 1);
  assert!(matches!(
    rec.rejected[0],
    RowError::Reference { ordinal: 3, kind: ReferenceKind::Jurisdiction, .. }
  ));
  assert_eq!(rec.rejected[0].stage(), Stage::Resolve);
}

#[tokio::test]
async fn lost_connection_while_resolving_is_fatal() {
  let mut input = records(6);
  input[4] = Ok(RawRecord { jurisdiction: "Broken".into(), ..raw(5) });

  let mut s = FlakyStore::new(store().await).poison("Broken", true);
  let aborted = load(&mut s, input, &options(2), &mut ()).await.unwrap_err();

  assert_eq!(aborted.stage(), Stage::Resolve);
  assert!(matches!(aborted.error, Error::StoreConnection { ordinal: 5, .. }));
  assert_eq!(aborted.report.last_committed_ordinal, 4);
  assert_eq!(s.inner.stats().await.unwrap().county_records, 4);
}

#[tokio::test]
async fn failed_link_transaction_leaves_batch_uncounted() {
  let input: Vec<_> = (1..=7)
    .map(|i| Ok(RawRecord { citations: format!("[Order {i}]"), ..raw(i) }))
    .collect();

  let mut s = FlakyStore::new(store().await).fail_links(2);
  let mut rec = Recorder::default();
  let aborted = load(&mut s, input, &options(3), &mut rec).await.unwrap_err();

  assert_eq!(aborted.stage(), Stage::Flush);
  assert!(matches!(aborted.error, Error::BatchCommit { first_ordinal: 4, final_batch: false, .. }));
  // Only the fully linked first batch counts as committed.
  assert_eq!(aborted.report.committed, 3);
  assert_eq!(aborted.report.batches, 1);
  assert_eq!(aborted.report.links_inserted, 3);
  assert_eq!(aborted.report.last_committed_ordinal, 3);
  assert_eq!(rec.committed.len(), 1);

  // The second batch's county rows are in the store, none of its links are.
  let stats = s.inner.stats().await.unwrap();
  assert_eq!(stats.county_records, 6);
  assert_eq!(stats.citation_links, 3);
  assert!(s.inner.county_record(4).await.unwrap().unwrap().citations.is_empty());
}

// ─── Fault injection ─────────────────────────────────────────────────────────

/// Delegates to a real store, failing selected calls.
struct FlakyStore {
  inner:      SqliteStore,
  flushes:    AtomicUsize,
  fail_flush: Option<usize>,
  fail_links: Option<usize>,
  poisoned:   Option<(&'static str, bool)>,
}

impl FlakyStore {
  fn new(inner: SqliteStore) -> Self {
    Self {
      inner,
      flushes: AtomicUsize::new(0),
      fail_flush: None,
      fail_links: None,
      poisoned: None,
    }
  }

  /// Fail the `n`th flush (1-based).
  fn fail_flush(mut self, n: usize) -> Self {
    self.fail_flush = Some(n);
    self
  }

  /// Let the `n`th flush (1-based) commit its county rows, then fail its
  /// citation links.
  fn fail_links(mut self, n: usize) -> Self {
    self.fail_links = Some(n);
    self
  }

  /// Fail resolution of this jurisdiction, as a lost connection or not.
  fn poison(mut self, jurisdiction: &'static str, connection: bool) -> Self {
    self.poisoned = Some((jurisdiction, connection));
    self
  }
}

impl MandateStore for FlakyStore {
  type Error = mandate_store_sqlite::Error;

  async fn rebuild(&mut self) -> Result<(), Self::Error> { self.inner.rebuild().await }

  async fn resolve_reference(&self, key: ReferenceKey) -> Result<i64, Self::Error> {
    if let ReferenceKey::Jurisdiction(name) = &key
      && let Some((poisoned, connection)) = self.poisoned
      && name == poisoned
    {
      let source = if connection {
        tokio_rusqlite::Error::ConnectionClosed
      } else {
        tokio_rusqlite::Error::Other("constraint check failed".into())
      };
      return Err(mandate_store_sqlite::Error::Database(source));
    }
    self.inner.resolve_reference(key).await
  }

  async fn flush_counties(&self, batch: Vec<PendingCounty>) -> Result<FlushReceipt, Self::Error> {
    let n = self.flushes.fetch_add(1, Ordering::SeqCst) + 1;
    if self.fail_flush == Some(n) {
      return Err(mandate_store_sqlite::Error::CountyInsert(tokio_rusqlite::Error::Other(
        "disk I/O error".into(),
      )));
    }
    if self.fail_links == Some(n) {
      let unlinked = batch
        .into_iter()
        .map(|pending| PendingCounty { citation_ids: vec![], ..pending })
        .collect();
      let receipt = self.inner.flush_counties(unlinked).await?;
      return Err(mandate_store_sqlite::Error::LinkInsert {
        first:  receipt.first_id().unwrap_or_default(),
        last:   receipt.last_id().unwrap_or_default(),
        source: tokio_rusqlite::Error::Other("foreign key mismatch".into()),
      });
    }
    self.inner.flush_counties(batch).await
  }

  async fn lookup_jurisdiction_id(&self, name: String) -> Result<Option<i64>, Self::Error> {
    self.inner.lookup_jurisdiction_id(name).await
  }

  async fn average_mandates(&self) -> Result<Vec<JurisdictionAverage>, Self::Error> {
    self.inner.average_mandates().await
  }

  async fn county_mandates(
    &self,
    name: String,
  ) -> Result<Option<Vec<CountyMandateCount>>, Self::Error> {
    self.inner.county_mandates(name).await
  }

  async fn refresh_summary(&self) -> Result<Vec<JurisdictionAverage>, Self::Error> {
    self.inner.refresh_summary().await
  }

  async fn stats(&self) -> Result<StoreStats, Self::Error> { self.inner.stats().await }
}
