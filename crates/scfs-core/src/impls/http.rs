//! reqwest まわりの共通処理（URL 組み立てとエラー分類）

use reqwest::{StatusCode, Url};

use crate::domain::{BackendError, BackendKind};

/// Appends percent-encoded path segments to `base`.
pub(crate) fn join_segments(
    backend: BackendKind,
    base: &Url,
    segments: &[&str],
) -> Result<Url, BackendError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| BackendError::logic(backend, None, format!("{base} cannot be used as a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Sorts a reqwest failure into transport vs. logic.
///
/// Anything that happened on the wire (connect, timeout, reset while reading
/// the body) is transport. Bodies that do not decode and requests that could
/// not be built are logic.
pub(crate) fn classify(backend: BackendKind, err: reqwest::Error) -> BackendError {
    if err.is_decode() || err.is_builder() {
        BackendError::logic(backend, err.status().map(|s| s.as_u16()), err.to_string())
    } else {
        BackendError::transport(backend, err.to_string())
    }
}

/// Message for a non-success status: the server's own text if it sent one.
pub(crate) fn status_message(status: StatusCode, server_message: Option<String>) -> String {
    server_message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        })
}
