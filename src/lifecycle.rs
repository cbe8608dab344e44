//! Lifecycle operations - Mark and delete empty series.
//!
//! A series is "empty" when `find` returns it (metadata exists) but `fetch`
//! does not (no datapoints). Empty series are tagged with the `wdlcm=empty`
//! attribute, and only deleted after a re-check proves none of the tagged
//! series received data in the meantime.

use crate::client::{sorted, SeriesSet, Store, StoreError};
use regex::{NoExpand, Regex};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{info, warn};

/// Attribute block written on series found empty.
pub const EMPTY_MARKER: &str = "{wdlcm=empty}";

/// Selector matching every series tagged by [`mark_empty`].
pub const MARKED_EMPTY_SELECTOR: &str = "~.*{wdlcm=empty}";

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Tagged series hold datapoints again; nothing was deleted
    #[error(
        "failed to delete series marked as empty as the following still contain datapoints: {}",
        .series.join(", ")
    )]
    StillPopulated { series: Vec<String> },
}

/// Final `{...}` block at the end of a series identity. No nested braces.
fn trailing_block() -> &'static Regex {
    static TRAILING_BLOCK: OnceLock<Regex> = OnceLock::new();
    TRAILING_BLOCK.get_or_init(|| {
        Regex::new(r"\{[^{}]*\}$").expect("trailing block pattern is a valid regex")
    })
}

/// Replace the trailing attribute block of `series` with `{wdlcm=empty}`.
///
/// Existing attributes in that block are discarded. A series without a
/// trailing block is returned unchanged.
pub fn mark_as_empty(series: &str) -> String {
    trailing_block()
        .replace(series, NoExpand(EMPTY_MARKER))
        .into_owned()
}

/// Series matching `selector` that have metadata but no datapoints.
pub fn empty_series<S: Store>(
    store: &S,
    cell: &str,
    selector: &str,
    read_token: &str,
) -> Result<SeriesSet, StoreError> {
    let found = store.find(cell, selector, read_token)?;
    let fetched = store.fetch(cell, selector, read_token)?;

    Ok(found.difference(&fetched).cloned().collect())
}

/// Tag every empty series matching `selector` with `wdlcm=empty`.
///
/// Returns the number of series tagged. Nothing is posted when no series is empty.
pub fn mark_empty<S: Store>(
    store: &S,
    cell: &str,
    selector: &str,
    read_token: &str,
    write_token: &str,
) -> Result<usize, LifecycleError> {
    let empty = empty_series(store, cell, selector, read_token)?;
    if empty.is_empty() {
        info!("No empty series for {} in cell {}", selector, cell);
        return Ok(0);
    }

    let orders: Vec<String> = sorted(empty).iter().map(|s| mark_as_empty(s)).collect();
    store.update_meta(cell, write_token, &orders.join("\n"))?;

    info!(
        "Marked {} series as empty for {} in cell {}",
        orders.len(),
        selector,
        cell
    );
    Ok(orders.len())
}

/// Delete every series tagged `wdlcm=empty`, provided none of them holds data.
///
/// Returns the delete endpoint's response text.
pub fn delete_empty<S: Store>(
    store: &S,
    cell: &str,
    read_token: &str,
    write_token: &str,
) -> Result<String, LifecycleError> {
    let populated = store.fetch(cell, MARKED_EMPTY_SELECTOR, read_token)?;
    if !populated.is_empty() {
        warn!(
            "{} series marked empty in cell {} hold datapoints, skipping delete",
            populated.len(),
            cell
        );
        return Err(LifecycleError::StillPopulated {
            series: sorted(populated),
        });
    }

    let response = store.delete_all(cell, MARKED_EMPTY_SELECTOR, write_token)?;
    info!("Deleted series marked empty in cell {}", cell);
    Ok(response)
}
