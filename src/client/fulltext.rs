//! Decoding of Warp 10 `fulltext` response bodies into series sets.
//!
//! Bodies are consumed line by line from any `BufRead`, so HTTP responses
//! are streamed instead of buffered whole.

use super::SeriesSet;
use std::io::BufRead;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FulltextError {
    /// Reading the body failed mid-stream
    #[error("Cannot read response body: {0}")]
    Io(#[from] std::io::Error),

    /// A line is not valid UTF-8
    #[error("Line {line} is not valid UTF-8")]
    InvalidUtf8 { line: usize },

    /// A fetch line has no series field after the timestamp
    #[error("Line {line} has no series field: {content:?}")]
    MissingSeriesField { line: usize, content: String },
}

/// Visit each non-blank line as UTF-8 text, with its 1-based line number.
fn for_each_line<R, F>(mut reader: R, mut visit: F) -> Result<(), FulltextError>
where
    R: BufRead,
    F: FnMut(usize, &str) -> Result<(), FulltextError>,
{
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        line_no += 1;

        let mut bytes = buf.as_slice();
        if let Some(stripped) = bytes.strip_suffix(b"\n") {
            bytes = stripped;
        }
        if let Some(stripped) = bytes.strip_suffix(b"\r") {
            bytes = stripped;
        }
        if bytes.is_empty() {
            continue;
        }

        let line =
            std::str::from_utf8(bytes).map_err(|_| FulltextError::InvalidUtf8 { line: line_no })?;
        visit(line_no, line)?;
    }
}

/// Decode a `find` body: every line is one series identity.
pub fn read_find_body<R: BufRead>(reader: R) -> Result<SeriesSet, FulltextError> {
    let mut series = SeriesSet::new();
    for_each_line(reader, |_, line| {
        series.insert(line.to_string());
        Ok(())
    })?;
    Ok(series)
}

/// Decode a `fetch` body: every line is one datapoint, the series is its second field.
pub fn read_fetch_body<R: BufRead>(reader: R) -> Result<SeriesSet, FulltextError> {
    let mut series = SeriesSet::new();
    for_each_line(reader, |line_no, line| {
        let name = line
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| FulltextError::MissingSeriesField {
                line: line_no,
                content: line.to_string(),
            })?;
        series.insert(name.to_string());
        Ok(())
    })?;
    Ok(series)
}
