//! Metadata probing: HEAD (with GET Range fallback) to learn size, filename,
//! content type, and range support before planning segments.

mod parse;

use std::str;
use std::time::Duration;

use crate::error::ProbeError;
use crate::url_model;
use parse::{parse_headers, ParsedHeaders};

/// Default content type when the server never sends one.
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Everything the Coordinator needs to plan and validate a download.
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub filename: String,
    pub content_type: String,
    pub supports_range: bool,
    /// Not part of the core sizing/planning contract, carried alongside so
    /// the Coordinator can detect a changed remote resource before resuming.
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

/// Probes `uri`, following redirects, to determine file metadata.
///
/// Runs a blocking curl transfer; call from `spawn_blocking` when driven from
/// an async context. Issues a HEAD first; if no size can be derived from it,
/// falls back to a `GET` with `Range: bytes=0-1` (some servers refuse HEAD or
/// omit `Content-Length` on it).
pub fn probe(uri: &str, user_agent: &str, timeout: Duration) -> Result<FileMetadata, ProbeError> {
    // Some servers reject HEAD outright (405) even though a ranged GET works
    // fine; treat a failed HEAD the same as a HEAD that didn't yield a size
    // and fall back to the ranged GET before giving up.
    let head = perform(uri, user_agent, timeout, true).ok();
    let head_size = head.as_ref().and_then(|h| h.size());

    let (headers, size) = if let (Some(h), Some(s)) = (&head, head_size) {
        (h.clone(), s)
    } else {
        let ranged = perform(uri, user_agent, timeout, false)?;
        let size = ranged.size().ok_or(ProbeError::NoSize)?;
        (ranged, size)
    };

    let filename = url_model::derive_filename(uri, headers.content_disposition.as_deref());
    let content_type = headers
        .content_type
        .clone()
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
    let supports_range = headers.supports_range();

    Ok(FileMetadata {
        size,
        filename,
        content_type,
        supports_range,
        etag: headers.etag,
        last_modified: headers.last_modified,
    })
}

/// Performs a single HEAD (`nobody`) or ranged GET (`Range: bytes=0-1`) request
/// and returns parsed headers.
fn perform(
    uri: &str,
    user_agent: &str,
    timeout: Duration,
    head_only: bool,
) -> Result<ParsedHeaders, ProbeError> {
    let mut lines: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(uri).map_err(ProbeError::Network)?;
    easy.useragent(user_agent).map_err(ProbeError::Network)?;
    easy.follow_location(true).map_err(ProbeError::Network)?;
    easy.connect_timeout(Duration::from_secs(15))
        .map_err(ProbeError::Network)?;
    easy.timeout(timeout).map_err(ProbeError::Network)?;

    if head_only {
        easy.nobody(true).map_err(ProbeError::Network)?;
    } else {
        let mut list = curl::easy::List::new();
        list.append("Range: bytes=0-1").map_err(ProbeError::Network)?;
        easy.http_headers(list).map_err(ProbeError::Network)?;
    }

    {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    lines.push(s.trim_end().to_string());
                }
                true
            })
            .map_err(ProbeError::Network)?;
        transfer.perform().map_err(|e| {
            if e.is_operation_timedout() {
                ProbeError::Timeout
            } else {
                ProbeError::Network(e)
            }
        })?;
    }

    let code = easy.response_code().map_err(ProbeError::Network)?;
    if code >= 400 {
        return Err(ProbeError::HttpStatus(code));
    }

    Ok(parse_headers(&lines))
}
