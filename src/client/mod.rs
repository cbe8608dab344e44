//! Store client - Abstraction over the Warp 10 HTTP API.
//!
//! Every operation is a single request with no retry. Non-2xx statuses and
//! transport failures surface as [`StoreError`].

pub mod fulltext;
mod http;

pub use fulltext::FulltextError;
pub use http::Warp10Client;

use std::collections::HashSet;
use thiserror::Error;

/// Unordered, deduplicated set of series identity strings
/// (`class{labels}{attributes}`). Element order carries no meaning.
pub type SeriesSet = HashSet<String>;

/// Series sorted for display; the set itself has no order.
pub fn sorted(series: SeriesSet) -> Vec<String> {
    let mut series: Vec<String> = series.into_iter().collect();
    series.sort();
    series
}

/// Header carrying the read or write token.
pub const TOKEN_HEADER: &str = "X-Warp10-Token";

/// Upper bound sent as `now` when fetching the whole history.
pub const MAX_INSTANT: i64 = i64::MAX;

/// Open lower bound sent as `start` when deleting older datapoints.
pub const MIN_INSTANT: i64 = i64::MIN;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Cell name not present in the configuration
    #[error("Unknown cell: {0}")]
    UnknownCell(String),

    /// Connection, DNS, TLS or timeout failure
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Store answered with a non-success status
    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// Response body could not be decoded
    #[error("Invalid response from {url}: {source}")]
    Response {
        url: String,
        #[source]
        source: FulltextError,
    },
}

/// Operations against a Warp 10 cell.
///
/// Implemented over HTTP by [`Warp10Client`]; the lifecycle operations and
/// the dispatcher only depend on this trait.
pub trait Store {
    /// Series matching `selector`, with or without datapoints.
    fn find(&self, cell: &str, selector: &str, read_token: &str) -> Result<SeriesSet, StoreError>;

    /// Series matching `selector` that hold at least one datapoint.
    fn fetch(&self, cell: &str, selector: &str, read_token: &str)
        -> Result<SeriesSet, StoreError>;

    /// Delete datapoints older than or at `instant` (microseconds) for matching series.
    fn delete_older(
        &self,
        cell: &str,
        selector: &str,
        write_token: &str,
        instant: i64,
    ) -> Result<String, StoreError>;

    /// Delete matching series entirely, metadata included.
    fn delete_all(&self, cell: &str, selector: &str, write_token: &str)
        -> Result<String, StoreError>;

    /// Post attribute updates, one series per line.
    fn update_meta(&self, cell: &str, write_token: &str, body: &str)
        -> Result<String, StoreError>;
}
