//! Cache key composition.

use std::fmt;

use axum::http::{header::HOST, Request};

/// Separator between key components. Spaces cannot appear in a host, a
/// request-target or a method token.
const SEPARATOR: char = ' ';

/// Lookup key for a stored response: host, request-target and method.
///
/// Responses that vary on request headers share one key; `Vary` is not
/// honoured.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds a key from its components.
    ///
    /// The host is lowercased; the request-target and method are used
    /// verbatim.
    pub fn build(host: &str, request_uri: &str, method: &str) -> Self {
        let host = host.to_ascii_lowercase();
        let mut key = String::with_capacity(host.len() + request_uri.len() + method.len() + 2);
        key.push_str(&host);
        key.push(SEPARATOR);
        key.push_str(request_uri);
        key.push(SEPARATOR);
        key.push_str(method);
        Self(key)
    }

    /// Builds the key of an inbound request.
    ///
    /// The host comes from the `Host` header, falling back to the URI
    /// authority for absolute-form targets.
    pub fn for_request<B>(req: &Request<B>) -> Self {
        let uri = req.uri();
        let host = req
            .headers()
            .get(HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| uri.authority().map(|a| a.as_str()))
            .unwrap_or_default();
        let request_uri = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

        Self::build(host, request_uri, req.method().as_str())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
