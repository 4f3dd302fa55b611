//! Read-side result types.

use serde::{Deserialize, Serialize};

/// Average number of mandate days per county within one jurisdiction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JurisdictionAverage {
  pub jurisdiction_id:       i64,
  pub jurisdiction_name:     String,
  pub average_mandate_count: f64,
}

impl JurisdictionAverage {
  /// The same row with the average rounded to two decimal places, as the
  /// published averages are.
  pub fn rounded(self) -> Self {
    Self {
      average_mandate_count: (self.average_mandate_count * 100.0).round() / 100.0,
      ..self
    }
  }
}

/// Number of `mask_required` rows recorded for one county.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountyMandateCount {
  pub county_name:   String,
  pub mandate_count: i64,
}

/// Row counts for the five core relations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
  pub jurisdictions:  u64,
  pub policy_codes:   u64,
  pub citations:      u64,
  pub county_records: u64,
  pub citation_links: u64,
}
