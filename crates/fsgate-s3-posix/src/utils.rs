//! Shared helpers: continuation tokens, ETag normalization, timestamps.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{BackendError, BackendResult};

// ---------------------------------------------------------------------------
// Continuation tokens
// ---------------------------------------------------------------------------

/// Encode an object key as a base64 continuation token.
///
/// # Examples
///
/// ```
/// use fsgate_s3_posix::utils::{decode_continuation_token, encode_continuation_token};
///
/// let token = encode_continuation_token("photos/2024/img.jpg");
/// let key = decode_continuation_token(&token).unwrap();
/// assert_eq!(key, "photos/2024/img.jpg");
/// ```
#[must_use]
pub fn encode_continuation_token(key: &str) -> String {
    BASE64_STANDARD.encode(key.as_bytes())
}

/// Decode a base64 continuation token back to an object key.
///
/// # Errors
///
/// Returns [`BackendError::InvalidRequest`] if the token is not valid
/// base64 or does not decode to valid UTF-8.
pub fn decode_continuation_token(token: &str) -> BackendResult<String> {
    let bytes = BASE64_STANDARD
        .decode(token)
        .map_err(|_| BackendError::invalid_request("Invalid continuation token"))?;
    String::from_utf8(bytes)
        .map_err(|_| BackendError::invalid_request("Continuation token contains invalid UTF-8"))
}

// ---------------------------------------------------------------------------
// ETags
// ---------------------------------------------------------------------------

/// Normalize an ETag by stripping surrounding double quotes.
#[must_use]
pub fn normalize_etag(etag: &str) -> &str {
    etag.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(etag)
}

// ---------------------------------------------------------------------------
// Range parsing
// ---------------------------------------------------------------------------

/// Parse an HTTP-style range expression against an object of
/// `content_length` bytes, returning the inclusive `(start, end)` pair.
///
/// Supported forms: `bytes=0-499`, `bytes=-500` (suffix), `bytes=500-`
/// (open end). The end offset is clamped to the object size.
///
/// # Errors
///
/// Returns [`BackendError::InvalidRequest`] for a malformed expression or
/// a range that lies outside the object.
pub fn parse_range(range: &str, content_length: u64) -> BackendResult<(u64, u64)> {
    let invalid = || BackendError::invalid_request(format!("range not satisfiable: {range}"));

    let expr = range.strip_prefix("bytes=").ok_or_else(invalid)?;

    if content_length == 0 {
        return Err(invalid());
    }

    if let Some(suffix) = expr.strip_prefix('-') {
        // bytes=-N (last N bytes)
        let n: u64 = suffix.parse().map_err(|_| invalid())?;
        if n == 0 || n > content_length {
            return Err(invalid());
        }
        Ok((content_length - n, content_length - 1))
    } else if let Some(prefix) = expr.strip_suffix('-') {
        // bytes=N- (from N to end)
        let start: u64 = prefix.parse().map_err(|_| invalid())?;
        if start >= content_length {
            return Err(invalid());
        }
        Ok((start, content_length - 1))
    } else {
        // bytes=N-M
        let (start, end) = expr.split_once('-').ok_or_else(invalid)?;
        let start: u64 = start.parse().map_err(|_| invalid())?;
        let end: u64 = end.parse().map_err(|_| invalid())?;
        if start > end || start >= content_length {
            return Err(invalid());
        }
        Ok((start, end.min(content_length - 1)))
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Format a filesystem mtime as an RFC 3339 string (`Z` suffix).
#[must_use]
pub fn mtime_rfc3339(mtime: std::io::Result<std::time::SystemTime>) -> String {
    mtime
        .map(DateTime::<Utc>::from)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Convert a filesystem mtime to a [`DateTime<Utc>`], defaulting to the
/// epoch when the filesystem cannot report one.
#[must_use]
pub fn mtime_datetime(mtime: std::io::Result<std::time::SystemTime>) -> DateTime<Utc> {
    mtime.map(DateTime::<Utc>::from).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_roundtrip_continuation_token() {
        let key = "photos/2024/image.jpg";
        let token = encode_continuation_token(key);
        let decoded = decode_continuation_token(&token).expect("decode");
        assert_eq!(decoded, key);
    }

    #[test]
    fn test_should_roundtrip_empty_continuation_token() {
        let token = encode_continuation_token("");
        let decoded = decode_continuation_token(&token).expect("decode");
        assert_eq!(decoded, "");
    }

    #[test]
    fn test_should_reject_invalid_continuation_token() {
        assert!(decode_continuation_token("!!!not-base64!!!").is_err());
    }

    #[test]
    fn test_should_strip_etag_quotes() {
        assert_eq!(normalize_etag("\"abc\""), "abc");
        assert_eq!(normalize_etag("abc"), "abc");
        assert_eq!(normalize_etag("\"unbalanced"), "\"unbalanced");
    }

    #[test]
    fn test_should_format_mtime_as_rfc3339() {
        let ts = mtime_rfc3339(Ok(std::time::SystemTime::UNIX_EPOCH));
        assert_eq!(ts, "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_should_parse_range_start_end() {
        assert_eq!(parse_range("bytes=0-499", 1000).expect("parse"), (0, 499));
    }

    #[test]
    fn test_should_parse_suffix_range() {
        assert_eq!(parse_range("bytes=-500", 1000).expect("parse"), (500, 999));
    }

    #[test]
    fn test_should_parse_open_ended_range() {
        assert_eq!(parse_range("bytes=500-", 1000).expect("parse"), (500, 999));
    }

    #[test]
    fn test_should_clamp_range_end_to_object_size() {
        assert_eq!(parse_range("bytes=0-9999", 100).expect("parse"), (0, 99));
    }

    #[test]
    fn test_should_reject_range_without_bytes_prefix() {
        assert!(parse_range("0-499", 1000).is_err());
    }

    #[test]
    fn test_should_reject_range_past_end() {
        assert!(parse_range("bytes=1000-", 1000).is_err());
    }

    #[test]
    fn test_should_reject_inverted_range() {
        assert!(parse_range("bytes=500-100", 1000).is_err());
    }

    #[test]
    fn test_should_reject_range_on_empty_object() {
        assert!(parse_range("bytes=0-0", 0).is_err());
    }
}
