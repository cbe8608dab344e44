//! Warp 10 Data Life Cycle Manager
//!
//! Core library for `wdlcm` - retention cleanup against the Warp 10 HTTP API.
//! Provides the following capabilities:
//! - Resolve per-cell endpoint configuration (find, fetch, update, delete, meta)
//! - Find and fetch Geo Time Series as deduplicated result sets
//! - Mark series with metadata but no datapoints as `wdlcm=empty`
//! - Delete marked series after re-checking they are still empty
//!
//! Pipeline: Find -> Fetch -> Diff -> Mark (meta) -> Re-check -> Delete

pub mod cli;
pub mod client;
pub mod config;
pub mod lifecycle;

// Re-export main types
pub use cli::dispatch::{run, Command, CommandError, DispatchError, Summary};
pub use client::{FulltextError, SeriesSet, Store, StoreError, Warp10Client};
pub use config::{Cell, Config};
pub use lifecycle::{delete_empty, empty_series, mark_as_empty, mark_empty, LifecycleError};
