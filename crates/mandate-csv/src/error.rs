//! Error types for the mandate-csv codec.

use strum::{Display, IntoStaticStr};
use thiserror::Error;

/// A stream-level failure. The input cannot be read any further.
#[derive(Debug, Error)]
pub enum Error {
  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("input is missing required column {0:?}")]
  MissingColumn(&'static str),

  #[error("delimiter must be a single ASCII character, got {0:?}")]
  Delimiter(char),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Source column whose value could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum Field {
  #[strum(serialize = "FIPS_Code")]
  FipsCode,
  #[strum(serialize = "Masks_Order_Code")]
  PolicyCode,
  #[strum(serialize = "Date")]
  Date,
}

/// One record had a bad field value. Only that record is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("row {ordinal} rejected: invalid {field}: {reason}")]
pub struct RowParseError {
  pub ordinal: u64,
  pub field:   Field,
  pub reason:  String,
}
