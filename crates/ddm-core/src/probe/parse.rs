//! Header-line parsing shared by the HEAD and ranged-GET probe paths.

/// Headers relevant to sizing, range support, filename, and resume safety.
#[derive(Debug, Default, Clone)]
pub(super) struct ParsedHeaders {
    pub content_length: Option<u64>,
    /// `(start, end_or_total)` parsed from `Content-Range`; see `size()`.
    pub content_range: Option<ContentRange>,
    pub accept_ranges: Option<String>,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub(super) struct ContentRange {
    /// `Z` in `bytes X-Y/Z`, or `None` for the unsatisfiable `bytes */Z` form handled below.
    pub total: Option<u64>,
    /// `Y` in `bytes X-Y` (no total given).
    pub end: u64,
}

impl ParsedHeaders {
    /// Derives total size: `Content-Length` first, then `Content-Range`'s
    /// total (`Z` in `bytes X-Y/Z`) or, lacking a total, `Y` in `bytes X-Y`.
    pub fn size(&self) -> Option<u64> {
        if let Some(n) = self.content_length {
            return Some(n);
        }
        self.content_range.and_then(|cr| cr.total.or(Some(cr.end)))
    }

    /// `supports_range := (Accept-Ranges present and not "none") OR (Content-Range present)`.
    pub fn supports_range(&self) -> bool {
        let accept_ranges_ok = self
            .accept_ranges
            .as_deref()
            .map(|v| !v.eq_ignore_ascii_case("none"))
            .unwrap_or(false);
        accept_ranges_ok || self.content_range.is_some()
    }
}

/// Parses raw response header lines (including the status line) into `ParsedHeaders`.
pub(super) fn parse_headers(lines: &[String]) -> ParsedHeaders {
    let mut out = ParsedHeaders::default();

    for line in lines {
        let line = line.trim();
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();

        if name.eq_ignore_ascii_case("content-length") {
            out.content_length = value.parse::<u64>().ok();
        } else if name.eq_ignore_ascii_case("content-range") {
            out.content_range = parse_content_range(value);
        } else if name.eq_ignore_ascii_case("accept-ranges") {
            out.accept_ranges = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("content-type") {
            out.content_type = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("content-disposition") {
            out.content_disposition = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("etag") {
            out.etag = Some(value.trim_matches('"').to_string());
        } else if name.eq_ignore_ascii_case("last-modified") {
            out.last_modified = Some(value.to_string());
        }
    }

    out
}

/// Parses `bytes X-Y/Z` or `bytes X-Y` into a `ContentRange`. `X` is discarded;
/// only the end and (optional) total matter for size derivation.
fn parse_content_range(value: &str) -> Option<ContentRange> {
    let rest = value.strip_prefix("bytes")?.trim();
    let (range_part, total_part) = match rest.split_once('/') {
        Some((r, t)) => (r, Some(t)),
        None => (rest, None),
    };
    let (_start, end) = range_part.split_once('-')?;
    let end: u64 = end.trim().parse().ok()?;
    let total = total_part.and_then(|t| {
        let t = t.trim();
        if t == "*" {
            None
        } else {
            t.parse::<u64>().ok()
        }
    });
    Some(ContentRange { total, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn size_from_content_length() {
        let h = parse_headers(&lines(&["Content-Length: 1048576", "Accept-Ranges: bytes"]));
        assert_eq!(h.size(), Some(1_048_576));
        assert!(h.supports_range());
    }

    #[test]
    fn size_from_content_range_with_total() {
        let h = parse_headers(&lines(&["Content-Range: bytes 0-1/5000"]));
        assert_eq!(h.size(), Some(5000));
        assert!(h.supports_range());
    }

    #[test]
    fn size_from_content_range_without_total_falls_back_to_end() {
        let h = parse_headers(&lines(&["Content-Range: bytes 0-99"]));
        assert_eq!(h.size(), Some(99));
    }

    #[test]
    fn content_range_star_total_falls_back_to_end() {
        let h = parse_headers(&lines(&["Content-Range: bytes 0-1/*"]));
        assert_eq!(h.size(), Some(1));
    }

    #[test]
    fn accept_ranges_none_does_not_support_range() {
        let h = parse_headers(&lines(&["Content-Length: 1000", "Accept-Ranges: none"]));
        assert!(!h.supports_range());
    }

    #[test]
    fn no_accept_ranges_header_but_content_range_present_supports_range() {
        let h = parse_headers(&lines(&["Content-Range: bytes 0-1/2000"]));
        assert!(h.supports_range());
    }

    #[test]
    fn no_range_evidence_at_all() {
        let h = parse_headers(&lines(&["Content-Length: 1000"]));
        assert!(!h.supports_range());
    }

    #[test]
    fn etag_and_last_modified_and_content_type() {
        let h = parse_headers(&lines(&[
            "ETag: \"abc-123\"",
            "Last-Modified: Wed, 21 Oct 2015 07:28:00 GMT",
            "Content-Type: application/zip",
        ]));
        assert_eq!(h.etag.as_deref(), Some("abc-123"));
        assert_eq!(
            h.last_modified.as_deref(),
            Some("Wed, 21 Oct 2015 07:28:00 GMT")
        );
        assert_eq!(h.content_type.as_deref(), Some("application/zip"));
    }
}
