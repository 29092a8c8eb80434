//! URL extraction and normalization for a batch of records.
//!
//! Turns a batch into the normalized URL -> record map the dispatcher works
//! from. Rows without a usable URL, or narrower than the configured minimum
//! width, are left out.

use crate::types::{Record, UrlMap};

/// Prefix that marks a field as already carrying a scheme.
const SCHEME_PREFIX: &str = "http";

/// Scheme prepended to bare host names.
const DEFAULT_SCHEME: &str = "http://";

/// Which field holds the URL and how wide a valid row must be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    pub url_index: usize,
    pub min_row_width: Option<usize>,
}

/// A batch's URL map plus what extraction threw away.
#[derive(Debug, Default)]
pub struct Extraction {
    pub urls: UrlMap,
    /// Rows with a missing/empty URL field or below the minimum width
    pub skipped: usize,
    /// Rows replaced by a later row with the same normalized URL
    pub duplicates: usize,
}

/// Prefix `field` with `http://` unless it already starts with `http`.
///
/// The check is a plain prefix test, so `https://...` and `http://...` pass
/// through unchanged (as does anything else that happens to start with
/// "http").
pub fn normalize_url(field: &str) -> String {
    if field.starts_with(SCHEME_PREFIX) {
        field.to_string()
    } else {
        format!("{}{}", DEFAULT_SCHEME, field)
    }
}

/// The URL a record contributes, or `None` if the row is rejected.
pub fn record_url(record: &Record, options: &ExtractOptions) -> Option<String> {
    if let Some(min_width) = options.min_row_width {
        if record.len() < min_width {
            return None;
        }
    }
    match record.field(options.url_index) {
        Some(field) if !field.is_empty() => Some(normalize_url(field)),
        _ => None,
    }
}

/// Build the URL map for one batch.
///
/// Later rows win when two rows normalize to the same URL.
pub fn extract_urls<I>(batch: I, options: &ExtractOptions) -> Extraction
where
    I: IntoIterator<Item = Record>,
{
    let mut extraction = Extraction::default();

    for record in batch {
        match record_url(&record, options) {
            Some(url) => {
                if let Some(replaced) = extraction.urls.insert(url, record) {
                    tracing::debug!(
                        row = replaced.position(),
                        "Duplicate URL in batch, earlier row replaced"
                    );
                    extraction.duplicates += 1;
                }
            }
            None => {
                tracing::debug!(row = record.position(), "Row skipped, no usable URL");
                extraction.skipped += 1;
            }
        }
    }

    extraction
}
