//! Reference Deduplicator: run-scoped identity maps for reference data.
//!
//! Each natural key costs one store round-trip the first time it is seen and
//! none afterwards. The maps are never evicted: reference cardinality is
//! bounded by the dataset (hundreds of jurisdictions and policy codes, low
//! thousands of citations).

use std::collections::HashMap;

use mandate_core::{
  record::{CountyRow, ParsedRecord, PendingCounty},
  reference::ReferenceKey,
  store::MandateStore,
};

use crate::error::ResolveError;

/// Cache effectiveness for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
  pub hits:   u64,
  /// Lookups that went to the store.
  pub misses: u64,
}

#[derive(Debug, Default)]
pub struct ReferenceCache {
  jurisdictions: HashMap<String, i64>,
  policy_codes:  HashMap<i64, i64>,
  citations:     HashMap<String, i64>,
  stats:         CacheStats,
}

impl ReferenceCache {
  pub fn new() -> Self { Self::default() }

  /// The cached id for `key`, without touching the store.
  pub fn get(&self, key: &ReferenceKey) -> Option<i64> {
    match key {
      ReferenceKey::Jurisdiction(name) => self.jurisdictions.get(name),
      ReferenceKey::PolicyCode(code) => self.policy_codes.get(code),
      ReferenceKey::Citation(text) => self.citations.get(text),
    }
    .copied()
  }

  /// Number of distinct keys cached across all three maps.
  pub fn len(&self) -> usize {
    self.jurisdictions.len() + self.policy_codes.len() + self.citations.len()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  pub fn stats(&self) -> CacheStats { self.stats }

  /// Return the surrogate id for `key`, creating the reference row on first
  /// sight. Keys are matched exactly, with no case or whitespace folding.
  pub async fn resolve<S: MandateStore>(
    &mut self,
    store: &S,
    key: ReferenceKey,
  ) -> Result<i64, S::Error> {
    if let Some(id) = self.get(&key) {
      self.stats.hits += 1;
      return Ok(id);
    }

    self.stats.misses += 1;
    let id = store.resolve_reference(key.clone()).await?;
    match key {
      ReferenceKey::Jurisdiction(name) => self.jurisdictions.insert(name, id),
      ReferenceKey::PolicyCode(code) => self.policy_codes.insert(code, id),
      ReferenceKey::Citation(text) => self.citations.insert(text, id),
    };
    Ok(id)
  }

  /// Resolve every reference in `record` and build the row to buffer.
  ///
  /// Stops at the first failing lookup. References resolved before the
  /// failure stay cached (their rows exist in the store).
  pub async fn resolve_record<S: MandateStore>(
    &mut self,
    store: &S,
    ordinal: u64,
    record: ParsedRecord,
  ) -> Result<PendingCounty, ResolveError<S::Error>> {
    let ParsedRecord {
      jurisdiction,
      county_name,
      fips_code,
      effective_date,
      policy_code,
      mask_required,
      citations,
    } = record;

    let jurisdiction_id = self.resolve_key(store, ReferenceKey::Jurisdiction(jurisdiction)).await?;
    let policy_code_id = self.resolve_key(store, ReferenceKey::PolicyCode(policy_code)).await?;

    let mut citation_ids = Vec::with_capacity(citations.len());
    for text in citations {
      citation_ids.push(self.resolve_key(store, ReferenceKey::Citation(text)).await?);
    }

    Ok(PendingCounty {
      ordinal,
      row: CountyRow {
        jurisdiction_id,
        county_name,
        fips_code,
        effective_date,
        policy_code_id,
        mask_required,
      },
      citation_ids,
    })
  }

  async fn resolve_key<S: MandateStore>(
    &mut self,
    store: &S,
    key: ReferenceKey,
  ) -> Result<i64, ResolveError<S::Error>> {
    let kind = key.kind();
    self
      .resolve(store, key)
      .await
      .map_err(|source| ResolveError { kind, source })
  }
}
