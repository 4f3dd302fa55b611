//! Record types: one input row as it moves through the pipeline.
//!
//! ```text
//! RawRecord ──parse──▶ ParsedRecord ──resolve──▶ PendingCounty ──flush──▶ county_records
//! ```

use serde::{Deserialize, Serialize};

// ─── Input ───────────────────────────────────────────────────────────────────

/// One row of the source dataset, exactly as read from the delimited file.
///
/// Every column is required at stream level; a file missing any of these
/// headers cannot be read at all. Field *values* are not validated here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
  #[serde(rename = "State_Tribe_Territory")]
  pub jurisdiction: String,
  #[serde(rename = "County_Name")]
  pub county_name:  String,
  #[serde(rename = "FIPS_Code")]
  pub fips_code:    String,
  #[serde(rename = "Date")]
  pub date:         String,
  #[serde(rename = "Masks_Order_Code")]
  pub policy_code:  String,
  #[serde(rename = "Face_Masks_Required_in_Public")]
  pub mandate:      String,
  #[serde(rename = "Citations")]
  pub citations:    String,
}

/// A row whose fields have been decoded into typed values but whose
/// reference data has not yet been resolved to surrogate ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedRecord {
  pub jurisdiction:   String,
  pub county_name:    String,
  pub fips_code:      i64,
  /// Seconds since the Unix epoch, midnight UTC of the effective day.
  pub effective_date: i64,
  pub policy_code:    i64,
  pub mask_required:  bool,
  /// Citation texts in source order; never contains empty strings.
  pub citations:      Vec<String>,
}

// ─── Resolved ────────────────────────────────────────────────────────────────

/// The column values of one `county_records` row, foreign keys resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountyRow {
  pub jurisdiction_id: i64,
  pub county_name:     String,
  pub fips_code:       i64,
  pub effective_date:  i64,
  pub policy_code_id:  i64,
  pub mask_required:   bool,
}

/// A resolved row waiting in a batch, together with the citation ids it must
/// be linked to once its own id is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCounty {
  /// 1-based position of the source record in the input stream.
  pub ordinal:      u64,
  pub row:          CountyRow,
  pub citation_ids: Vec<i64>,
}

/// Outcome of committing one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReceipt {
  /// Generated `county_records.id` for each row, in input order.
  pub county_ids:     Vec<i64>,
  /// Link rows actually inserted; duplicate pairs are not counted.
  pub links_inserted: usize,
}

impl FlushReceipt {
  pub fn first_id(&self) -> Option<i64> { self.county_ids.first().copied() }

  pub fn last_id(&self) -> Option<i64> { self.county_ids.last().copied() }

  /// Whether the generated ids form one ascending run with no gaps.
  pub fn is_contiguous(&self) -> bool {
    self.county_ids.windows(2).all(|w| w[1] == w[0] + 1)
  }
}

// ─── Read back ───────────────────────────────────────────────────────────────

/// A stored county record joined with its reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountyRecordView {
  pub id:             i64,
  pub jurisdiction:   String,
  pub county_name:    String,
  pub fips_code:      i64,
  pub effective_date: i64,
  pub policy_code:    i64,
  pub mask_required:  bool,
  /// Linked citation texts, in citation id order.
  pub citations:      Vec<String>,
}
