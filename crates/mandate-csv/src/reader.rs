//! Streaming reader over the delimited dataset.

use std::{fs::File, io, path::Path};

use mandate_core::record::RawRecord;

use crate::error::{Error, Result};

/// Header names that must all be present in the input.
pub const REQUIRED_COLUMNS: [&str; 7] = [
  "State_Tribe_Territory",
  "County_Name",
  "FIPS_Code",
  "Date",
  "Masks_Order_Code",
  "Face_Masks_Required_in_Public",
  "Citations",
];

/// Convert a configured delimiter into the single byte `csv` expects.
pub fn delimiter_byte(c: char) -> Result<u8> {
  if c.is_ascii() { Ok(c as u8) } else { Err(Error::Delimiter(c)) }
}

/// Yields one [`RawRecord`] per data row, in file order.
///
/// Every `Err` is a stream-level failure (unreadable bytes, invalid UTF-8,
/// ragged row); callers should stop reading after the first one.
pub struct RecordReader<R> {
  rows: csv::DeserializeRecordsIntoIter<R, RawRecord>,
}

impl RecordReader<File> {
  /// Open the file at `path`.
  pub fn from_path(path: impl AsRef<Path>, delimiter: u8) -> Result<Self> {
    let reader = builder(delimiter).from_path(path)?;
    Self::from_csv(reader)
  }
}

impl<R: io::Read> RecordReader<R> {
  /// Read from any byte source. The first row must be the header row.
  pub fn new(source: R, delimiter: u8) -> Result<Self> {
    Self::from_csv(builder(delimiter).from_reader(source))
  }

  fn from_csv(mut reader: csv::Reader<R>) -> Result<Self> {
    let headers = reader.headers()?;
    if let Some(missing) = REQUIRED_COLUMNS
      .into_iter()
      .find(|col| !headers.iter().any(|h| h == *col))
    {
      return Err(Error::MissingColumn(missing));
    }
    Ok(Self { rows: reader.into_deserialize() })
  }
}

impl<R: io::Read> Iterator for RecordReader<R> {
  type Item = Result<RawRecord>;

  fn next(&mut self) -> Option<Self::Item> {
    self.rows.next().map(|row| row.map_err(Error::from))
  }
}

fn builder(delimiter: u8) -> csv::ReaderBuilder {
  let mut builder = csv::ReaderBuilder::new();
  builder.delimiter(delimiter).has_headers(true);
  builder
}
