//! Mapping between domain types and SQLite rows.
//!
//! Booleans are stored as `0`/`1` integers and dates as Unix seconds, so no
//! text encoding is involved; this module only pairs each reference kind with
//! its statements and turns result rows into domain values.

use mandate_core::{
  record::CountyRecordView,
  reference::{ReferenceKey, ReferenceKind},
  report::{CountyMandateCount, JurisdictionAverage},
};
use rusqlite::{Row, ToSql};

// ─── Reference statements ────────────────────────────────────────────────────

/// `(insert_if_absent, select_id)` for one reference relation.
pub fn reference_statements(kind: ReferenceKind) -> (&'static str, &'static str) {
  match kind {
    ReferenceKind::Jurisdiction => (
      "INSERT INTO jurisdictions (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
      "SELECT id FROM jurisdictions WHERE name = ?1",
    ),
    ReferenceKind::PolicyCode => (
      "INSERT INTO policy_codes (code) VALUES (?1) ON CONFLICT(code) DO NOTHING",
      "SELECT id FROM policy_codes WHERE code = ?1",
    ),
    ReferenceKind::Citation => (
      "INSERT INTO citations (text) VALUES (?1) ON CONFLICT(text) DO NOTHING",
      "SELECT id FROM citations WHERE text = ?1",
    ),
  }
}

/// The natural-key value to bind as `?1`.
pub fn key_param(key: &ReferenceKey) -> &dyn ToSql {
  match key {
    ReferenceKey::Jurisdiction(name) => name,
    ReferenceKey::PolicyCode(code) => code,
    ReferenceKey::Citation(text) => text,
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub fn jurisdiction_average(row: &Row<'_>) -> rusqlite::Result<JurisdictionAverage> {
  Ok(JurisdictionAverage {
    jurisdiction_id:       row.get(0)?,
    jurisdiction_name:     row.get(1)?,
    average_mandate_count: row.get(2)?,
  })
}

pub fn county_mandate_count(row: &Row<'_>) -> rusqlite::Result<CountyMandateCount> {
  Ok(CountyMandateCount {
    county_name:   row.get(0)?,
    mandate_count: row.get(1)?,
  })
}

/// Expects the column order of the `county_record` query in `store.rs`;
/// citations are filled in by the caller.
pub fn county_record(row: &Row<'_>) -> rusqlite::Result<CountyRecordView> {
  Ok(CountyRecordView {
    id:             row.get(0)?,
    jurisdiction:   row.get(1)?,
    county_name:    row.get(2)?,
    fips_code:      row.get(3)?,
    effective_date: row.get(4)?,
    policy_code:    row.get(5)?,
    mask_required:  row.get(6)?,
    citations:      Vec::new(),
  })
}
