//! Error type for `mandate-store-sqlite`.

use mandate_core::store::StoreFailure;
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// The county-record transaction of a flush rolled back.
  #[error("county insert failed: {0}")]
  CountyInsert(#[source] tokio_rusqlite::Error),

  /// County rows `first..=last` were committed but their citation links
  /// rolled back.
  #[error("citation link insert failed for county ids {first}..={last}: {source}")]
  LinkInsert {
    first:  i64,
    last:   i64,
    source: tokio_rusqlite::Error,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl StoreFailure for Error {
  fn is_connection_failure(&self) -> bool {
    match self {
      Error::Database(e) | Error::CountyInsert(e) | Error::LinkInsert { source: e, .. } => {
        connection_lost(e)
      }
    }
  }
}

fn connection_lost(e: &tokio_rusqlite::Error) -> bool {
  match e {
    tokio_rusqlite::Error::ConnectionClosed | tokio_rusqlite::Error::Close(_) => true,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(failure, _)) => matches!(
      failure.code,
      ErrorCode::CannotOpen
        | ErrorCode::NotADatabase
        | ErrorCode::DatabaseCorrupt
        | ErrorCode::SystemIoFailure
        | ErrorCode::DiskFull
    ),
    _ => false,
  }
}
