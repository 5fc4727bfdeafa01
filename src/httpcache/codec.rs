//! Stored entry format.
//!
//! An entry is a self-delimiting JSON metadata object followed immediately
//! by the raw body bytes. The metadata records status, headers and the
//! timing facts needed to recompute `Age` on every hit.

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{header::AGE, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};
use crate::httpcache::age::current_age_at;
use crate::httpcache::policy::Capture;

/// Everything stored about a response except its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMeta {
    pub status: u16,
    /// Header names with every value, in the order they were received
    pub headers: Vec<(String, Vec<String>)>,
    pub request_time: DateTime<Utc>,
    pub response_time: DateTime<Utc>,
    pub corrected_initial_age: Duration,
}

impl EntryMeta {
    /// Captures the draft response's status and headers.
    ///
    /// Fails with `CacheError::Encoding` when a header value is not UTF-8.
    pub fn new(status: StatusCode, headers: &HeaderMap, capture: &Capture) -> Result<Self> {
        let mut pairs = Vec::with_capacity(headers.keys_len());
        for name in headers.keys() {
            let values = headers
                .get_all(name)
                .iter()
                .map(|value| {
                    value.to_str().map(str::to_string).map_err(|_| {
                        CacheError::Encoding(format!("header '{}' is not valid UTF-8", name))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            pairs.push((name.as_str().to_string(), values));
        }

        Ok(Self {
            status: status.as_u16(),
            headers: pairs,
            request_time: capture.request_time,
            response_time: capture.response_time,
            corrected_initial_age: capture.corrected_initial_age,
        })
    }

    /// Rebuilds the stored header map.
    pub fn header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, values) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| CacheError::CorruptEntry(format!("header name '{}': {}", name, e)))?;
            for value in values {
                let value = HeaderValue::from_str(value)
                    .map_err(|e| CacheError::CorruptEntry(format!("header '{}': {}", name, e)))?;
                map.append(name.clone(), value);
            }
        }
        Ok(map)
    }

    /// Age of the stored response at `now`, in whole seconds.
    pub fn current_age_at(&self, now: DateTime<Utc>) -> u64 {
        current_age_at(self.response_time, self.corrected_initial_age, now)
    }
}

/// Appends the encoded metadata to `buf`. The body bytes follow it directly.
pub fn encode_meta(meta: &EntryMeta, buf: &mut Vec<u8>) -> Result<()> {
    serde_json::to_writer(&mut *buf, meta).map_err(|e| CacheError::Encoding(e.to_string()))
}

/// A decoded entry. The body shares the store's allocation.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub meta: EntryMeta,
    pub body: Bytes,
}

impl CacheEntry {
    /// Splits stored bytes into metadata and body.
    pub fn decode(raw: Bytes) -> Result<Self> {
        let mut stream = serde_json::Deserializer::from_slice(&raw).into_iter::<EntryMeta>();
        let meta = match stream.next() {
            Some(Ok(meta)) => meta,
            Some(Err(e)) => return Err(CacheError::CorruptEntry(e.to_string())),
            None => return Err(CacheError::CorruptEntry("entry is empty".to_string())),
        };
        let offset = stream.byte_offset();

        Ok(Self {
            meta,
            body: raw.slice(offset..),
        })
    }

    /// Builds the response served on a hit, with `Age` set to the current age.
    pub fn into_response(self, now: DateTime<Utc>) -> Result<Response> {
        let status = StatusCode::from_u16(self.meta.status)
            .map_err(|e| CacheError::CorruptEntry(format!("status {}: {}", self.meta.status, e)))?;
        let mut headers = self.meta.header_map()?;
        headers.insert(AGE, HeaderValue::from(self.meta.current_age_at(now)));

        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{CONTENT_TYPE, DATE, SET_COOKIE};
    use chrono::TimeZone;

    fn stored_at() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn capture() -> Capture {
        Capture {
            ttl: Duration::from_secs(60),
            request_time: stored_at(),
            response_time: stored_at(),
            corrected_initial_age: Duration::from_millis(1500),
        }
    }

    fn encoded(headers: &HeaderMap, body: &[u8]) -> Bytes {
        let meta = EntryMeta::new(StatusCode::OK, headers, &capture()).unwrap();
        let mut buf = Vec::new();
        encode_meta(&meta, &mut buf).unwrap();
        buf.extend_from_slice(body);
        Bytes::from(buf)
    }

    #[test]
    fn test_entry_preserves_status_headers_and_body() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));

        let entry = CacheEntry::decode(encoded(&headers, b"Hello, world")).unwrap();

        assert_eq!(entry.body, Bytes::from_static(b"Hello, world"));
        assert_eq!(entry.meta.status, 200);
        assert_eq!(entry.meta.corrected_initial_age, Duration::from_millis(1500));
        assert_eq!(entry.meta.header_map().unwrap(), headers);
    }

    #[test]
    fn test_body_may_look_like_json() {
        let body = br#"{"status": 500} trailing"#;
        let entry = CacheEntry::decode(encoded(&HeaderMap::new(), body)).unwrap();
        assert_eq!(&entry.body[..], &body[..]);
    }

    #[test]
    fn test_empty_body() {
        let entry = CacheEntry::decode(encoded(&HeaderMap::new(), b"")).unwrap();
        assert!(entry.body.is_empty());
    }

    #[test]
    fn test_corrupt_entries() {
        for raw in [&b""[..], b"not json", b"{\"status\": 200", b"[1, 2, 3]"] {
            assert!(matches!(
                CacheEntry::decode(Bytes::copy_from_slice(raw)),
                Err(CacheError::CorruptEntry(_))
            ));
        }
    }

    #[test]
    fn test_non_utf8_header_is_an_encoding_fault() {
        let mut headers = HeaderMap::new();
        headers.insert("x-raw", HeaderValue::from_bytes(&[0xff, 0xfe]).unwrap());

        assert!(matches!(
            EntryMeta::new(StatusCode::OK, &headers, &capture()),
            Err(CacheError::Encoding(_))
        ));
    }

    #[test]
    fn test_hit_response_recomputes_age() {
        let mut headers = HeaderMap::new();
        headers.insert(DATE, HeaderValue::from_static("Tue, 14 Nov 2023 22:13:20 GMT"));
        headers.insert(AGE, HeaderValue::from_static("2"));

        let entry = CacheEntry::decode(encoded(&headers, b"body")).unwrap();
        let response = entry
            .into_response(stored_at() + chrono::Duration::seconds(10))
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        // 1.5s initial + 10s resident, rounded up
        assert_eq!(response.headers().get(AGE).unwrap(), "12");
        assert_eq!(response.headers().get_all(AGE).iter().count(), 1);
        assert_eq!(
            response.headers().get(DATE).unwrap(),
            "Tue, 14 Nov 2023 22:13:20 GMT"
        );
    }
}
