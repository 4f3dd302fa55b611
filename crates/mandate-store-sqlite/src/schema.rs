//! SQL schema for the mandate store.
//!
//! Unlike an application database this schema is never migrated: every load
//! starts with [`REBUILD`], which throws the previous contents away.

/// Applied once per connection.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA synchronous  = NORMAL;
PRAGMA foreign_keys = ON;
";

/// Drop everything (children before parents) and recreate the core
/// relations. Runs inside one transaction.
pub const REBUILD: &str = "
DROP TABLE IF EXISTS jurisdiction_average_mandates;
DROP TABLE IF EXISTS county_citation_links;
DROP TABLE IF EXISTS citations;
DROP TABLE IF EXISTS county_records;
DROP TABLE IF EXISTS policy_codes;
DROP TABLE IF EXISTS jurisdictions;

CREATE TABLE jurisdictions (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name  TEXT NOT NULL UNIQUE
);

CREATE TABLE policy_codes (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    code  INTEGER NOT NULL UNIQUE
);

CREATE TABLE citations (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    text  TEXT NOT NULL UNIQUE
);

-- One row per accepted input record; never updated.
CREATE TABLE county_records (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    jurisdiction_id  INTEGER NOT NULL REFERENCES jurisdictions(id),
    county_name      TEXT    NOT NULL,
    fips_code        INTEGER NOT NULL,
    effective_date   INTEGER NOT NULL,   -- Unix seconds, UTC
    policy_code_id   INTEGER NOT NULL REFERENCES policy_codes(id),
    mask_required    INTEGER NOT NULL    -- 0 | 1
);

CREATE TABLE county_citation_links (
    county_record_id INTEGER NOT NULL REFERENCES county_records(id),
    citation_id      INTEGER NOT NULL REFERENCES citations(id),
    PRIMARY KEY (county_record_id, citation_id)
);

CREATE INDEX jurisdictions_name_idx          ON jurisdictions(name);
CREATE INDEX policy_codes_code_idx           ON policy_codes(code);
CREATE INDEX citations_text_idx              ON citations(text);
CREATE INDEX county_records_jurisdiction_idx ON county_records(jurisdiction_id);
";

/// Derived relation written by the summary job; created on first use.
pub const SUMMARY: &str = "
CREATE TABLE IF NOT EXISTS jurisdiction_average_mandates (
    jurisdiction_id        INTEGER PRIMARY KEY REFERENCES jurisdictions(id),
    jurisdiction_name      TEXT UNIQUE,
    average_mandate_count  REAL
);
";

/// Mandate rows per (jurisdiction, county), averaged per jurisdiction.
pub const AVERAGE_MANDATES: &str = "
SELECT j.id, j.name, AVG(per_county.mandate_count) AS average_mandate_count
FROM (
    SELECT jurisdiction_id, COUNT(*) AS mandate_count
    FROM county_records
    WHERE mask_required = 1
    GROUP BY jurisdiction_id, county_name
) AS per_county
JOIN jurisdictions j ON j.id = per_county.jurisdiction_id
GROUP BY j.id
ORDER BY average_mandate_count DESC, j.name ASC
";
