//! Classify HTTP status and curl errors into retry policy error kinds.

use crate::retry::error::SegmentError;
use crate::retry::policy::ErrorKind;

/// Classify an HTTP status code for retry decisions.
///
/// Every non-2xx status is at least retryable (`ErrorKind::Other` is the only
/// non-retryable kind the policy recognizes, so 4xx other than 429 still gets
/// classified into a retryable bucket rather than `Other`): 429/503 are
/// throttling, 5xx is a server error, anything else non-2xx is treated like a
/// connection-class failure worth one more attempt.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code as u16),
        200..=299 => ErrorKind::Other,
        _ => ErrorKind::Connection,
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

/// Classify a segment error (curl, HTTP, or partial-transfer) into an ErrorKind.
/// Storage errors are never retried: a disk failure will not resolve itself.
pub fn classify(e: &SegmentError) -> ErrorKind {
    match e {
        SegmentError::Curl(ce) => classify_curl_error(ce),
        SegmentError::Http(code) => classify_http_status(*code),
        SegmentError::PartialTransfer { .. } => ErrorKind::Connection,
        SegmentError::Storage(_) => ErrorKind::Other,
        SegmentError::Aborted => ErrorKind::Other,
    }
}
