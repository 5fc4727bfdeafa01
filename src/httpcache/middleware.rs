//! Cache Middleware
//!
//! Sits in front of a downstream handler. A request either bypasses the
//! store, is answered from it, or is forwarded with its response captured
//! for later hits.

use std::future::{ready, Future};
use std::sync::Arc;

use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use futures_util::{stream, StreamExt};
use http_body_util::BodyExt;
use tracing::{debug, error, warn};

use crate::cache::CacheStorage;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::httpcache::codec::{encode_meta, CacheEntry, EntryMeta};
use crate::httpcache::key::CacheKey;
use crate::httpcache::policy::{CachePolicy, Capture, Exchange, RequestDecision, ResponseDecision};
use crate::httpcache::pool::BufferPool;
use crate::httpcache::status::CacheStatus;

/// What happens to a forwarded response's body.
#[derive(Debug)]
enum Disposition {
    /// Stream the draft untouched, tagged with this status
    LiveWrite(CacheStatus),
    /// Buffer the body and store it
    BufferedCapture(Capture),
}

impl From<ResponseDecision> for Disposition {
    fn from(decision: ResponseDecision) -> Self {
        match decision {
            ResponseDecision::Forward(detail) => Disposition::LiveWrite(CacheStatus::Forward(detail)),
            // Storable but already stale
            ResponseDecision::Capture(capture) if capture.ttl.is_zero() => {
                Disposition::LiveWrite(CacheStatus::UriMiss)
            }
            ResponseDecision::Capture(capture) => Disposition::BufferedCapture(capture),
        }
    }
}

/// Shared state of the cache layer.
///
/// Cloning is cheap; every clone talks to the same store.
#[derive(Clone)]
pub struct HttpCache {
    store: Arc<dyn CacheStorage>,
    policy: CachePolicy,
    cache_name: Arc<str>,
    buffers: Arc<BufferPool>,
    /// Largest encoded entry worth buffering; the store refuses anything bigger
    max_entry_size: usize,
}

impl HttpCache {
    pub fn new(store: Arc<dyn CacheStorage>, config: &Config) -> Self {
        Self {
            store,
            policy: CachePolicy::from_config(config),
            cache_name: Arc::from(config.cache_name.as_str()),
            buffers: Arc::new(BufferPool::default()),
            max_entry_size: usize::try_from(config.max_size).unwrap_or(usize::MAX),
        }
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    /// Serves `req`, calling `next` at most once.
    ///
    /// Store faults on lookup and on write are returned as errors; entries
    /// too large for the store are passed through.
    pub async fn handle<F, Fut>(&self, req: Request, next: F) -> Result<Response>
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Response>,
    {
        let key = CacheKey::for_request(&req);

        let directives = match self.policy.evaluate_request(req.method(), req.headers()) {
            RequestDecision::Lookup(directives) => directives,
            RequestDecision::Bypass(detail) => {
                debug!("Bypassing cache for {}", key);
                let mut response = next(req).await;
                CacheStatus::Forward(detail).append_to(response.headers_mut(), &self.cache_name);
                return Ok(response);
            }
        };

        match self.store.get(key.as_str()).await {
            Ok(raw) => return self.serve_hit(&key, raw),
            Err(err) if err.is_miss() => debug!("Cache miss: {}", key),
            Err(err) => {
                error!("Cache lookup failed for {}: {}", key, err);
                return Err(err);
            }
        }

        let exchange = Exchange {
            method: req.method().clone(),
            directives,
            has_authorization: req.headers().contains_key(AUTHORIZATION),
            request_time: Utc::now(),
        };

        let (mut parts, body) = next(req).await.into_parts();

        let decision = self.policy.evaluate_response(
            &exchange,
            &mut parts.headers,
            parts.status,
            Utc::now(),
        );

        let capture = match Disposition::from(decision) {
            Disposition::LiveWrite(status) => {
                debug!("Passing {} through: {}", key, status.label());
                status.append_to(&mut parts.headers, &self.cache_name);
                return Ok(Response::from_parts(parts, body));
            }
            Disposition::BufferedCapture(capture) => capture,
        };

        // Metadata first, then the body frames land right behind it.
        // Cache-Status is appended afterwards so it is never stored.
        let mut buffer = self.buffers.acquire();
        let encoded = EntryMeta::new(parts.status, &parts.headers, &capture)
            .and_then(|meta| encode_meta(&meta, &mut buffer));
        if let Err(err) = encoded {
            error!("Not caching response for {}: {}", key, err);
            CacheStatus::UriMiss.append_to(&mut parts.headers, &self.cache_name);
            return Ok(Response::from_parts(parts, body));
        }
        let meta_len = buffer.len();

        if let Some(body) = self.capture_body(&key, body, &mut buffer, meta_len).await? {
            CacheStatus::UriMiss.append_to(&mut parts.headers, &self.cache_name);
            return Ok(Response::from_parts(parts, body));
        }

        let entry = Bytes::copy_from_slice(&buffer);
        drop(buffer);

        let status = self.store_entry(&key, entry.clone(), &capture).await?;
        status.append_to(&mut parts.headers, &self.cache_name);

        Ok(Response::from_parts(parts, Body::from(entry.slice(meta_len..))))
    }

    fn serve_hit(&self, key: &CacheKey, raw: Bytes) -> Result<Response> {
        let entry = CacheEntry::decode(raw).map_err(|err| {
            error!("Stored entry for {} is unreadable: {}", key, err);
            err
        })?;

        let mut response = entry.into_response(Utc::now())?;
        CacheStatus::Hit.append_to(response.headers_mut(), &self.cache_name);
        debug!("Cache hit: {}", key);
        Ok(response)
    }

    /// Reads `body` into `buffer` behind the `meta_len` metadata bytes.
    ///
    /// Returns `None` once the whole body is captured. When the entry would
    /// outgrow `max_entry_size` the body is handed back for streaming,
    /// with any frames already read put back in front of the rest.
    async fn capture_body(
        &self,
        key: &CacheKey,
        mut body: Body,
        buffer: &mut Vec<u8>,
        meta_len: usize,
    ) -> Result<Option<Body>> {
        if let Some(len) = body.size_hint().upper() {
            let len = usize::try_from(len).unwrap_or(usize::MAX);
            if meta_len.saturating_add(len) > self.max_entry_size {
                debug!("Body of {} ({} bytes) is too large to store", key, len);
                return Ok(Some(body));
            }
            buffer.reserve(len);
        }

        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(|e| CacheError::Upstream(e.to_string()))?;
            // Trailers are not stored
            let Ok(data) = frame.into_data() else {
                continue;
            };
            buffer.extend_from_slice(&data);

            if buffer.len() > self.max_entry_size {
                debug!("Body of {} outgrew the store budget mid-stream", key);
                let read = Bytes::copy_from_slice(&buffer[meta_len..]);
                let rest = stream::once(ready(Ok::<_, axum::Error>(read)))
                    .chain(body.into_data_stream());
                return Ok(Some(Body::from_stream(rest)));
            }
        }

        Ok(None)
    }

    /// Writes one encoded entry.
    async fn store_entry(
        &self,
        key: &CacheKey,
        entry: Bytes,
        capture: &Capture,
    ) -> Result<CacheStatus> {
        match self.store.put_with_ttl(key.as_str(), entry, capture.ttl).await {
            Ok(()) => {
                debug!("Stored {} for {}s", key, capture.ttl.as_secs());
                Ok(CacheStatus::Stored)
            }
            Err(CacheError::CacheFull(reason)) => {
                warn!("Store refused {}: {}", key, reason);
                Ok(CacheStatus::UriMiss)
            }
            Err(err) => {
                error!("Failed to store {}: {}", key, err);
                Err(err)
            }
        }
    }
}

/// Axum middleware entry point; install with `middleware::from_fn_with_state`.
///
/// Store faults become error responses that still carry a `Cache-Status`.
pub async fn cache_middleware(
    State(cache): State<HttpCache>,
    req: Request,
    next: Next,
) -> Response {
    match cache.handle(req, |req| next.run(req)).await {
        Ok(response) => response,
        Err(err) => {
            let mut response = err.into_response();
            CacheStatus::Fault.append_to(response.headers_mut(), cache.cache_name());
            response
        }
    }
}
