//! [`SqliteStore`]: the SQLite implementation of [`MandateStore`].

use std::path::Path;

use mandate_core::{
  record::{CountyRecordView, CountyRow, FlushReceipt, PendingCounty},
  reference::ReferenceKey,
  report::{CountyMandateCount, JurisdictionAverage, StoreStats},
  store::MandateStore,
};
use rusqlite::OptionalExtension as _;

use crate::{
  Error, Result,
  encode::{county_mandate_count, county_record, jurisdiction_average, key_param, reference_statements},
  schema::{AVERAGE_MANDATES, PRAGMAS, REBUILD, SUMMARY},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A mandate store backed by a single SQLite file.
///
/// Not `Clone`: the loader is the only writer and holds the handle for the
/// whole run.
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path`. The schema is not touched; call
  /// [`MandateStore::rebuild`] before loading.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.configure().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.configure().await?;
    Ok(store)
  }

  /// Close the connection, reporting any error SQLite raises on close.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }

  async fn configure(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(PRAGMAS)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fetch one county record with its reference data and citations.
  pub async fn county_record(&self, id: i64) -> Result<Option<CountyRecordView>> {
    let view = self
      .conn
      .call(move |conn| {
        let Some(mut view) = conn
          .query_row(
            "SELECT c.id, j.name, c.county_name, c.fips_code,
                    c.effective_date, p.code, c.mask_required
             FROM county_records c
             JOIN jurisdictions j ON j.id = c.jurisdiction_id
             JOIN policy_codes  p ON p.id = c.policy_code_id
             WHERE c.id = ?1",
            rusqlite::params![id],
            county_record,
          )
          .optional()?
        else {
          return Ok(None);
        };

        let mut stmt = conn.prepare(
          "SELECT t.text
           FROM county_citation_links l
           JOIN citations t ON t.id = l.citation_id
           WHERE l.county_record_id = ?1
           ORDER BY t.id",
        )?;
        view.citations = stmt
          .query_map(rusqlite::params![id], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(Some(view))
      })
      .await?;
    Ok(view)
  }
}

// ─── MandateStore impl ───────────────────────────────────────────────────────

impl MandateStore for SqliteStore {
  type Error = Error;

  // ── Write side ────────────────────────────────────────────────────────────

  async fn rebuild(&mut self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        tx.execute_batch(REBUILD)?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn resolve_reference(&self, key: ReferenceKey) -> Result<i64> {
    let id = self
      .conn
      .call(move |conn| {
        let (insert, select) = reference_statements(key.kind());
        let value = key_param(&key);
        conn.prepare_cached(insert)?.execute([value])?;
        let id: i64 = conn.prepare_cached(select)?.query_row([value], |row| row.get(0))?;
        Ok(id)
      })
      .await?;
    Ok(id)
  }

  async fn flush_counties(&self, batch: Vec<PendingCounty>) -> Result<FlushReceipt> {
    if batch.is_empty() {
      return Ok(FlushReceipt::default());
    }

    let (rows, citation_ids): (Vec<CountyRow>, Vec<Vec<i64>>) = batch
      .into_iter()
      .map(|pending| (pending.row, pending.citation_ids))
      .unzip();

    // Transaction 1: county rows, in input order. Each row's id comes back
    // from `RETURNING`, so nothing depends on ids being contiguous.
    let county_ids: Vec<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(rows.len());
        {
          let mut stmt = tx.prepare_cached(
            "INSERT INTO county_records (
               jurisdiction_id, county_name, fips_code,
               effective_date, policy_code_id, mask_required
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id",
          )?;
          for row in &rows {
            let id: i64 = stmt.query_row(
              rusqlite::params![
                row.jurisdiction_id,
                row.county_name,
                row.fips_code,
                row.effective_date,
                row.policy_code_id,
                row.mask_required,
              ],
              |r| r.get(0),
            )?;
            ids.push(id);
          }
        }
        tx.commit()?;
        Ok(ids)
      })
      .await
      .map_err(Error::CountyInsert)?;

    let (first, last) = match (county_ids.first(), county_ids.last()) {
      (Some(&first), Some(&last)) => (first, last),
      _ => return Ok(FlushReceipt::default()),
    };

    let links: Vec<(i64, i64)> = county_ids
      .iter()
      .zip(citation_ids)
      .flat_map(|(&county_id, citations)| citations.into_iter().map(move |c| (county_id, c)))
      .collect();

    // Transaction 2: citation links for the rows committed above.
    let links_inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
          let mut stmt = tx.prepare_cached(
            "INSERT OR IGNORE INTO county_citation_links (county_record_id, citation_id)
             VALUES (?1, ?2)",
          )?;
          for (county_id, citation_id) in &links {
            inserted += stmt.execute(rusqlite::params![county_id, citation_id])?;
          }
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await
      .map_err(|source| Error::LinkInsert { first, last, source })?;

    Ok(FlushReceipt { county_ids, links_inserted })
  }

  // ── Read side ─────────────────────────────────────────────────────────────

  async fn lookup_jurisdiction_id(&self, name: String) -> Result<Option<i64>> {
    let id = self
      .conn
      .call(move |conn| Ok(lookup_normalised(conn, &name)?))
      .await?;
    Ok(id)
  }

  async fn average_mandates(&self) -> Result<Vec<JurisdictionAverage>> {
    let rows = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(AVERAGE_MANDATES)?;
        let rows = stmt
          .query_map([], jurisdiction_average)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn county_mandates(&self, name: String) -> Result<Option<Vec<CountyMandateCount>>> {
    let rows = self
      .conn
      .call(move |conn| {
        let Some(jurisdiction_id) = lookup_normalised(conn, &name)? else {
          return Ok(None);
        };

        let mut stmt = conn.prepare(
          "SELECT county_name, COUNT(id) AS mandate_count
           FROM county_records
           WHERE jurisdiction_id = ?1
             AND mask_required = 1
           GROUP BY county_name
           ORDER BY mandate_count DESC, county_name ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![jurisdiction_id], county_mandate_count)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some(rows))
      })
      .await?;
    Ok(rows)
  }

  async fn refresh_summary(&self) -> Result<Vec<JurisdictionAverage>> {
    let rows = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        tx.execute_batch(SUMMARY)?;

        let rows = {
          let mut stmt = tx.prepare(AVERAGE_MANDATES)?;
          stmt
            .query_map([], jurisdiction_average)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        {
          let mut upsert = tx.prepare(
            "INSERT INTO jurisdiction_average_mandates
               (jurisdiction_id, jurisdiction_name, average_mandate_count)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(jurisdiction_id) DO UPDATE SET
               jurisdiction_name     = excluded.jurisdiction_name,
               average_mandate_count = excluded.average_mandate_count",
          )?;
          for row in &rows {
            upsert.execute(rusqlite::params![
              row.jurisdiction_id,
              row.jurisdiction_name,
              row.average_mandate_count,
            ])?;
          }
        }

        tx.commit()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn stats(&self) -> Result<StoreStats> {
    let stats = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT
             (SELECT COUNT(*) FROM jurisdictions),
             (SELECT COUNT(*) FROM policy_codes),
             (SELECT COUNT(*) FROM citations),
             (SELECT COUNT(*) FROM county_records),
             (SELECT COUNT(*) FROM county_citation_links)",
          [],
          |row| {
            Ok(StoreStats {
              jurisdictions:  row.get::<_, i64>(0)? as u64,
              policy_codes:   row.get::<_, i64>(1)? as u64,
              citations:      row.get::<_, i64>(2)? as u64,
              county_records: row.get::<_, i64>(3)? as u64,
              citation_links: row.get::<_, i64>(4)? as u64,
            })
          },
        )?)
      })
      .await?;
    Ok(stats)
  }
}

/// Case- and whitespace-insensitive jurisdiction lookup. When several stored
/// names normalise to the same value the oldest row wins.
///
/// SQLite's `TRIM` only strips spaces, so the argument is trimmed of all
/// surrounding whitespace before binding.
fn lookup_normalised(conn: &rusqlite::Connection, name: &str) -> rusqlite::Result<Option<i64>> {
  conn
    .query_row(
      "SELECT id FROM jurisdictions
       WHERE TRIM(LOWER(name)) = LOWER(?1)
       ORDER BY id
       LIMIT 1",
      rusqlite::params![name.trim()],
      |row| row.get(0),
    )
    .optional()
}
