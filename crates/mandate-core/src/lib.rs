//! Core types and trait definitions for the mandate loader.
//!
//! No CSV or database dependencies; the parser, the SQLite backend and the
//! ETL driver all build on it.

// Store methods spell out `impl Future + Send` themselves.
#![allow(async_fn_in_trait)]

pub mod record;
pub mod reference;
pub mod report;
pub mod store;
