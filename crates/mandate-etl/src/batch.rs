//! Batch Accumulator: buffers resolved rows until a flush.

use mandate_core::record::PendingCounty;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Rows drained from the accumulator, in the order they were appended.
///
/// The store inserts them in exactly this order, so the generated ids ascend
/// with the input ordinals.
#[derive(Debug, Default)]
pub struct Batch {
  pub records: Vec<PendingCounty>,
}

impl Batch {
  pub fn len(&self) -> usize { self.records.len() }

  pub fn is_empty(&self) -> bool { self.records.is_empty() }

  pub fn first_ordinal(&self) -> Option<u64> { self.records.first().map(|r| r.ordinal) }

  pub fn last_ordinal(&self) -> Option<u64> { self.records.last().map(|r| r.ordinal) }
}

#[derive(Debug)]
pub struct BatchAccumulator {
  pending:   Vec<PendingCounty>,
  threshold: usize,
}

impl Default for BatchAccumulator {
  fn default() -> Self { Self::new(DEFAULT_BATCH_SIZE) }
}

impl BatchAccumulator {
  /// A threshold of zero is treated as one.
  pub fn new(threshold: usize) -> Self {
    let threshold = threshold.max(1);
    Self { pending: Vec::with_capacity(threshold), threshold }
  }

  pub fn threshold(&self) -> usize { self.threshold }

  pub fn len(&self) -> usize { self.pending.len() }

  pub fn is_empty(&self) -> bool { self.pending.is_empty() }

  /// Buffer `record`. Returns `true` once the buffer holds `threshold` rows
  /// and should be flushed.
  pub fn append(&mut self, record: PendingCounty) -> bool {
    self.pending.push(record);
    self.pending.len() >= self.threshold
  }

  /// Take everything buffered, full or not, leaving the accumulator empty.
  pub fn drain(&mut self) -> Batch {
    let records = std::mem::replace(&mut self.pending, Vec::with_capacity(self.threshold));
    Batch { records }
  }
}

#[cfg(test)]
mod tests {
  use mandate_core::record::CountyRow;

  use super::*;

  fn pending(ordinal: u64) -> PendingCounty {
    PendingCounty {
      ordinal,
      row: CountyRow {
        jurisdiction_id: 1,
        county_name:     format!("County {ordinal}"),
        fips_code:       1000 + ordinal as i64,
        effective_date:  0,
        policy_code_id:  1,
        mask_required:   false,
      },
      citation_ids: vec![],
    }
  }

  #[test]
  fn signals_exactly_at_threshold() {
    let mut acc = BatchAccumulator::new(3);
    assert!(!acc.append(pending(1)));
    assert!(!acc.append(pending(2)));
    assert!(acc.append(pending(3)));
    assert_eq!(acc.len(), 3);
  }

  #[test]
  fn drain_preserves_order_and_empties() {
    let mut acc = BatchAccumulator::new(10);
    for i in [4, 5, 9] {
      acc.append(pending(i));
    }

    let batch = acc.drain();
    let ordinals: Vec<_> = batch.records.iter().map(|r| r.ordinal).collect();
    assert_eq!(ordinals, [4, 5, 9]);
    assert_eq!(batch.first_ordinal(), Some(4));
    assert_eq!(batch.last_ordinal(), Some(9));
    assert!(acc.is_empty());
  }

  #[test]
  fn drain_of_empty_buffer_is_empty() {
    let mut acc = BatchAccumulator::default();
    let batch = acc.drain();
    assert!(batch.is_empty());
    assert_eq!(batch.first_ordinal(), None);
    assert_eq!(acc.threshold(), DEFAULT_BATCH_SIZE);
  }

  #[test]
  fn refills_after_drain() {
    let mut acc = BatchAccumulator::new(2);
    acc.append(pending(1));
    acc.append(pending(2));
    acc.drain();

    assert!(!acc.append(pending(3)));
    assert!(acc.append(pending(4)));
    assert_eq!(acc.drain().first_ordinal(), Some(3));
  }

  #[test]
  fn zero_threshold_flushes_every_row() {
    let mut acc = BatchAccumulator::new(0);
    assert_eq!(acc.threshold(), 1);
    assert!(acc.append(pending(1)));
  }
}
