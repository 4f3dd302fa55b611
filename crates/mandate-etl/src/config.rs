//! Loader configuration: an optional TOML file with `MANDATE_*` environment
//! overrides.

use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use serde::Deserialize;

use crate::{
  batch::DEFAULT_BATCH_SIZE,
  error::ConfigError,
  pipeline::{DEFAULT_PROGRESS_INTERVAL, PipelineOptions},
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
  pub store_path:        PathBuf,
  pub input_path:        Option<PathBuf>,
  pub batch_size:        usize,
  pub progress_interval: u64,
  /// Field separator of the input; must be one ASCII character.
  pub delimiter:         String,
}

impl Default for EtlConfig {
  fn default() -> Self {
    Self {
      store_path:        PathBuf::from("mandates.db"),
      input_path:        None,
      batch_size:        DEFAULT_BATCH_SIZE,
      progress_interval: DEFAULT_PROGRESS_INTERVAL,
      delimiter:         ",".to_string(),
    }
  }
}

impl EtlConfig {
  /// Read `path` if it exists, then apply `MANDATE_*` environment variables.
  /// The result is validated.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Self::from_builder(
      config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(config::Environment::with_prefix("MANDATE")),
    )
  }

  fn from_builder(builder: config::ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
    let cfg: EtlConfig = builder.build()?.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.batch_size == 0 {
      return Err(ConfigError::BatchSize);
    }
    if self.progress_interval == 0 {
      return Err(ConfigError::ProgressInterval);
    }
    self.delimiter_byte()?;
    Ok(())
  }

  pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
    let mut chars = self.delimiter.chars();
    match (chars.next(), chars.next()) {
      (Some(c), None) => {
        mandate_csv::delimiter_byte(c).map_err(|_| ConfigError::Delimiter(self.delimiter.clone()))
      }
      _ => Err(ConfigError::Delimiter(self.delimiter.clone())),
    }
  }

  pub fn pipeline_options(&self) -> PipelineOptions {
    PipelineOptions {
      batch_size:        self.batch_size,
      progress_interval: self.progress_interval,
    }
  }

  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }

  pub fn input_path(&self) -> Option<PathBuf> { self.input_path.as_deref().map(expand_tilde) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
