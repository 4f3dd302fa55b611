//! Field decoding for a single [`RawRecord`].
//!
//! Pipeline:
//!   RawRecord
//!     ├─ parse_integer()     → fips_code, policy_code
//!     ├─ parse_date()        → effective_date (Unix seconds, UTC)
//!     ├─ mandate_required()  → mask_required
//!     └─ parse_citations()   → Vec<String>

use chrono::{DateTime, NaiveDate, NaiveTime};
use mandate_core::record::{ParsedRecord, RawRecord};

use crate::error::{Field, RowParseError};

/// Calendar formats accepted for the `Date` column, tried in order.
const DATE_FORMATS: &[&str] = &[
  "%Y-%m-%d",
  "%m/%d/%Y",
  "%Y/%m/%d",
  "%B %d, %Y",
  "%b %d, %Y",
  "%B %d %Y",
  "%b %d %Y",
];

/// Mandate descriptions containing either needle (case-insensitive) count as
/// a mask requirement.
const MANDATE_NEEDLES: &[&str] = &["yes", "public mask mandate"];

// ─── Public API ──────────────────────────────────────────────────────────────

/// Decode `raw` into typed fields.
///
/// `ordinal` is the 1-based position of the record in the input stream and
/// is only used to tag the error. Fields are checked in column order and the
/// first bad one is reported.
pub fn parse_record(ordinal: u64, raw: &RawRecord) -> Result<ParsedRecord, RowParseError> {
  let reject = |field: Field| move |reason: String| RowParseError { ordinal, field, reason };

  let fips_code = parse_integer(&raw.fips_code).map_err(reject(Field::FipsCode))?;
  let effective_date = parse_date(&raw.date).map_err(reject(Field::Date))?;
  let policy_code = parse_integer(&raw.policy_code).map_err(reject(Field::PolicyCode))?;

  Ok(ParsedRecord {
    jurisdiction: raw.jurisdiction.clone(),
    county_name: raw.county_name.clone(),
    fips_code,
    effective_date,
    policy_code,
    mask_required: mandate_required(&raw.mandate),
    citations: parse_citations(&raw.citations),
  })
}

/// Parse a calendar date (or an RFC 3339 timestamp) into seconds since the
/// Unix epoch. Bare dates are taken as midnight UTC.
pub fn parse_date(s: &str) -> Result<i64, String> {
  let s = s.trim();
  if s.is_empty() {
    return Err("empty date".to_owned());
  }

  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Ok(dt.timestamp());
  }

  DATE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    .map(|d| d.and_time(NaiveTime::MIN).and_utc().timestamp())
    .ok_or_else(|| format!("unrecognised date {s:?}"))
}

/// Whether a free-text mandate description means masks were required.
pub fn mandate_required(description: &str) -> bool {
  let lowered = description.trim().to_lowercase();
  MANDATE_NEEDLES.iter().any(|needle| lowered.contains(needle))
}

/// Split a bracketed, comma-separated citation list.
///
/// One leading `[` and one trailing `]` are stripped; entries are trimmed and
/// empty entries dropped. Order is preserved.
pub fn parse_citations(s: &str) -> Vec<String> {
  let s = s.trim();
  let s = s.strip_prefix('[').unwrap_or(s);
  let s = s.strip_suffix(']').unwrap_or(s);

  s.split(',')
    .map(str::trim)
    .filter(|c| !c.is_empty())
    .map(str::to_owned)
    .collect()
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn parse_integer(s: &str) -> Result<i64, String> {
  let trimmed = s.trim();
  trimmed
    .parse::<i64>()
    .map_err(|e| format!("{trimmed:?} is not an integer: {e}"))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn raw() -> RawRecord {
    RawRecord {
      jurisdiction: "Ohio".into(),
      county_name:  "Franklin".into(),
      fips_code:    "39049".into(),
      date:         "2020-04-01".into(),
      policy_code:  "12".into(),
      mandate:      "Yes - Public Mask Mandate".into(),
      citations:    "[Exec Order 2020-01, Exec Order 2020-02]".into(),
    }
  }

  // ── Whole record ──────────────────────────────────────────────────────────────

  #[test]
  fn parses_complete_record() {
    let parsed = parse_record(1, &raw()).unwrap();
    assert_eq!(parsed.jurisdiction, "Ohio");
    assert_eq!(parsed.county_name, "Franklin");
    assert_eq!(parsed.fips_code, 39049);
    assert_eq!(parsed.policy_code, 12);
    assert!(parsed.mask_required);
    assert_eq!(parsed.effective_date, 1_585_699_200);
    assert_eq!(parsed.citations, ["Exec Order 2020-01", "Exec Order 2020-02"]);
  }

  #[test]
  fn names_are_not_normalised() {
    let mut r = raw();
    r.jurisdiction = "texas ".into();
    assert_eq!(parse_record(1, &r).unwrap().jurisdiction, "texas ");
  }

  #[test]
  fn bad_fips_is_rejected_with_ordinal() {
    let mut r = raw();
    r.fips_code = "39O49".into();
    let err = parse_record(7, &r).unwrap_err();
    assert_eq!(err.ordinal, 7);
    assert_eq!(err.field, Field::FipsCode);
    assert!(err.to_string().contains("FIPS_Code"));
  }

  #[test]
  fn bad_policy_code_is_rejected() {
    let mut r = raw();
    r.policy_code = "n/a".into();
    let err = parse_record(3, &r).unwrap_err();
    assert_eq!(err.field, Field::PolicyCode);
  }

  #[test]
  fn first_bad_field_wins() {
    let mut r = raw();
    r.date = "sometime".into();
    r.policy_code = "n/a".into();
    assert_eq!(parse_record(1, &r).unwrap_err().field, Field::Date);
  }

  // ── Dates ─────────────────────────────────────────────────────────────────────

  #[test]
  fn date_formats_agree() {
    let expected = 1_585_699_200;
    for s in [
      "2020-04-01",
      "04/01/2020",
      "4/1/2020",
      "2020/04/01",
      "April 1, 2020",
      "Apr 1, 2020",
      " 2020-04-01 ",
      "2020-04-01T00:00:00Z",
    ] {
      assert_eq!(parse_date(s), Ok(expected), "{s}");
    }
  }

  #[test]
  fn rfc3339_offset_is_honoured() {
    assert_eq!(parse_date("2020-04-01T02:00:00+02:00"), Ok(1_585_699_200));
  }

  #[test]
  fn unparseable_dates_fail() {
    assert!(parse_date("").is_err());
    assert!(parse_date("2020-13-01").is_err());
    assert!(parse_date("not a date").is_err());
  }

  // ── Mandate flag ──────────────────────────────────────────────────────────────

  #[test]
  fn mandate_flag_is_case_insensitive() {
    assert!(mandate_required("YES"));
    assert!(mandate_required("Public Mask Mandate in effect"));
    assert!(mandate_required("  yes  "));
    assert!(!mandate_required("No"));
    assert!(!mandate_required(""));
    assert!(!mandate_required("Mask mandate (private only)"));
  }

  // ── Citations ─────────────────────────────────────────────────────────────────

  #[test]
  fn citations_strip_brackets_and_empties() {
    assert_eq!(parse_citations("[a, b ,, c]"), ["a", "b", "c"]);
    assert_eq!(parse_citations("[]"), Vec::<String>::new());
    assert_eq!(parse_citations(""), Vec::<String>::new());
    assert_eq!(parse_citations("single"), ["single"]);
  }

  #[test]
  fn only_outer_brackets_are_stripped() {
    assert_eq!(parse_citations("[[a], b]"), ["[a]", "b"]);
  }
}
