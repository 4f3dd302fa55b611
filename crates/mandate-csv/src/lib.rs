//! Delimited-input codec for the mandate loader.
//!
//! Reads the county mask-mandate dataset and decodes each row into a
//! [`ParsedRecord`](mandate_core::record::ParsedRecord). Pure synchronous; no
//! database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use mandate_csv::{RecordReader, parse_record};
//!
//! let reader = RecordReader::from_path("data.csv", b',').unwrap();
//! for (i, raw) in reader.enumerate() {
//!   let raw = raw.unwrap();
//!   match parse_record(i as u64 + 1, &raw) {
//!     Ok(parsed) => println!("{} / {}", parsed.jurisdiction, parsed.county_name),
//!     Err(e) => eprintln!("{e}"),
//!   }
//! }
//! ```

pub mod error;
mod parse;
mod reader;

pub use error::{Error, Field, Result, RowParseError};
pub use parse::{mandate_required, parse_citations, parse_date, parse_record};
pub use reader::{REQUIRED_COLUMNS, RecordReader, delimiter_byte};
