//! `Cache-Status` values (RFC 9211) emitted for every request.

use std::fmt;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

pub const CACHE_STATUS: HeaderName = HeaderName::from_static("cache-status");

/// Response header that failed to parse during the response phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedHeader {
    CacheControl,
    Expires,
    Date,
    LastModified,
}

impl MalformedHeader {
    pub fn detail(&self) -> &'static str {
        match self {
            MalformedHeader::CacheControl => "MALFORMED-CACHE-CONTROL",
            MalformedHeader::Expires => "MALFORMED-EXPIRES",
            MalformedHeader::Date => "MALFORMED-DATE",
            MalformedHeader::LastModified => "MALFORMED-LAST-MODIFIED",
        }
    }
}

/// Why the storability predicate rejected a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotStorableReason {
    RequestMethodNotCacheable,
    RequestMethodPost,
    RequestNoStore,
    RequestAuthorizationHeader,
    ResponseNoStore,
    ResponsePrivate,
    ResponseUncachableByDefault,
}

impl fmt::Display for NotStorableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NotStorableReason::RequestMethodNotCacheable => "RequestMethodNotCacheable",
            NotStorableReason::RequestMethodPost => "RequestMethodPost",
            NotStorableReason::RequestNoStore => "RequestNoStore",
            NotStorableReason::RequestAuthorizationHeader => "RequestAuthorizationHeader",
            NotStorableReason::ResponseNoStore => "ResponseNoStore",
            NotStorableReason::ResponsePrivate => "ResponsePrivate",
            NotStorableReason::ResponseUncachableByDefault => "ResponseUncachableByDefault",
        };
        f.write_str(name)
    }
}

/// Why a request went to the downstream handler without being stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardDetail {
    /// Request method is not a cache candidate
    Method,
    /// Request `Cache-Control` forbids using the cache
    Directive,
    /// A response header could not be parsed
    Malformed(MalformedHeader),
    /// The storability predicate failed
    NotStorable(Vec<NotStorableReason>),
}

/// The cache's decision for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from the store
    Hit,
    /// Forwarded and stored
    Stored,
    /// Forwarded; storable but not stored
    UriMiss,
    /// Forwarded without touching the store
    Forward(ForwardDetail),
    /// The store failed; the response is an error
    Fault,
}

impl CacheStatus {
    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Stored => "stored",
            CacheStatus::UriMiss => "uri-miss",
            CacheStatus::Forward(_) => "forward",
            CacheStatus::Fault => "fault",
        }
    }

    /// Full header value, prefixed with the cache identifier.
    pub fn header_value(&self, cache_name: &str) -> String {
        let params = match self {
            CacheStatus::Hit => "hit".to_string(),
            CacheStatus::Stored => "fwd=uri-miss; stored".to_string(),
            CacheStatus::UriMiss => "fwd=uri-miss".to_string(),
            CacheStatus::Forward(ForwardDetail::Method) => "fwd=request; detail=METHOD".to_string(),
            CacheStatus::Forward(ForwardDetail::Directive) => {
                "fwd=request; detail=DIRECTIVE".to_string()
            }
            CacheStatus::Forward(ForwardDetail::Malformed(header)) => {
                format!("fwd=request; detail={}", header.detail())
            }
            CacheStatus::Forward(ForwardDetail::NotStorable(reasons)) => {
                let joined = reasons
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("fwd=request; detail=\"{}\"", joined)
            }
            CacheStatus::Fault => "detail=ERROR".to_string(),
        };
        format!("{}; {}", cache_name, params)
    }

    /// Appends this status to `headers`, keeping any upstream entries.
    pub fn append_to(&self, headers: &mut HeaderMap, cache_name: &str) {
        let value = self.header_value(cache_name);
        match HeaderValue::try_from(value) {
            Ok(value) => {
                headers.append(CACHE_STATUS, value);
            }
            Err(err) => warn!("Dropping unrepresentable Cache-Status value: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_values() {
        let name = "MiniHttpCache";
        assert_eq!(CacheStatus::Hit.header_value(name), "MiniHttpCache; hit");
        assert_eq!(
            CacheStatus::Stored.header_value(name),
            "MiniHttpCache; fwd=uri-miss; stored"
        );
        assert_eq!(CacheStatus::UriMiss.header_value(name), "MiniHttpCache; fwd=uri-miss");
        assert_eq!(
            CacheStatus::Forward(ForwardDetail::Method).header_value(name),
            "MiniHttpCache; fwd=request; detail=METHOD"
        );
        assert_eq!(
            CacheStatus::Forward(ForwardDetail::Directive).header_value(name),
            "MiniHttpCache; fwd=request; detail=DIRECTIVE"
        );
        assert_eq!(
            CacheStatus::Forward(ForwardDetail::Malformed(MalformedHeader::LastModified))
                .header_value(name),
            "MiniHttpCache; fwd=request; detail=MALFORMED-LAST-MODIFIED"
        );
        assert_eq!(CacheStatus::Fault.header_value(name), "MiniHttpCache; detail=ERROR");
    }

    #[test]
    fn test_reasons_are_joined_and_quoted() {
        let status = CacheStatus::Forward(ForwardDetail::NotStorable(vec![
            NotStorableReason::ResponseNoStore,
            NotStorableReason::ResponsePrivate,
        ]));
        assert_eq!(
            status.header_value("c"),
            r#"c; fwd=request; detail="ResponseNoStore, ResponsePrivate""#
        );
    }

    #[test]
    fn test_append_keeps_existing_values() {
        let mut headers = HeaderMap::new();
        headers.append(CACHE_STATUS, HeaderValue::from_static("Upstream; hit"));

        CacheStatus::UriMiss.append_to(&mut headers, "Edge");

        let values: Vec<_> = headers.get_all(CACHE_STATUS).iter().collect();
        assert_eq!(values, vec!["Upstream; hit", "Edge; fwd=uri-miss"]);
    }
}
