//! Reference data: the three deduplicated lookup relations.

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

/// Which lookup relation a key belongs to.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReferenceKind {
  Jurisdiction,
  PolicyCode,
  Citation,
}

/// A natural key for one reference row.
///
/// Keys are compared exactly: `"Texas"` and `"texas "` are different
/// jurisdictions on the write side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum ReferenceKey {
  Jurisdiction(String),
  PolicyCode(i64),
  Citation(String),
}

impl ReferenceKey {
  pub fn kind(&self) -> ReferenceKind {
    match self {
      Self::Jurisdiction(_) => ReferenceKind::Jurisdiction,
      Self::PolicyCode(_) => ReferenceKind::PolicyCode,
      Self::Citation(_) => ReferenceKind::Citation,
    }
  }
}
