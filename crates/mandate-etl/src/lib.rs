//! Streaming loader for county mask-mandate records.
//!
//! Reads records one at a time, resolves their reference data through a
//! run-scoped cache, and commits them to a [`MandateStore`] in fixed-size
//! batches. Bad rows are dropped and reported; anything that threatens
//! consistency ends the run with an [`Aborted`].
//!
//! [`MandateStore`]: mandate_core::store::MandateStore

pub mod batch;
pub mod config;
pub mod dedup;
pub mod error;
pub mod observer;
pub mod pipeline;

pub use config::EtlConfig;
pub use error::{Aborted, Error, RowError, Stage};
pub use observer::{Observer, TracingObserver};
pub use pipeline::{LoadReport, PipelineOptions, load};

#[cfg(test)]
mod tests;
