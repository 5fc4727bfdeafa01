//! Cacheability decisions.
//!
//! The request phase decides whether the store is consulted at all; the
//! response phase decides, before any body byte is read, whether a forwarded
//! response may be stored and for how long.

use std::time::{Duration, SystemTime};

use axum::http::{
    header::{AGE, DATE, EXPIRES, LAST_MODIFIED},
    HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::Config;
use crate::httpcache::age::{ceil_secs, corrected_initial_age, parse_age_header};
use crate::httpcache::directives::{RequestDirectives, ResponseDirectives};
use crate::httpcache::status::{ForwardDetail, MalformedHeader, NotStorableReason};

/// Status codes a shared cache may store without explicit freshness
/// (RFC 7231 §6.1).
const CACHEABLE_BY_DEFAULT: [u16; 10] = [200, 203, 204, 300, 301, 404, 405, 410, 414, 501];

/// Outcome of the request phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestDecision {
    /// Consult the store
    Lookup(RequestDirectives),
    /// Forward without consulting the store
    Bypass(ForwardDetail),
}

/// What the response phase needs to know about the forwarded request.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub method: Method,
    pub directives: RequestDirectives,
    pub has_authorization: bool,
    /// Instant just before the request was handed downstream
    pub request_time: DateTime<Utc>,
}

/// Timing facts for a response that passed the storability predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    /// Remaining freshness; zero means "do not store"
    pub ttl: Duration,
    pub request_time: DateTime<Utc>,
    pub response_time: DateTime<Utc>,
    pub corrected_initial_age: Duration,
}

/// Outcome of the response phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseDecision {
    /// Storable; buffer the body when `ttl` is non-zero
    Capture(Capture),
    /// Not storable; stream the response as-is
    Forward(ForwardDetail),
}

/// Where a freshness lifetime came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifetime {
    Explicit(Duration),
    Heuristic(Duration),
    Default,
}

/// The cache's storage policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    /// Applied when a response carries no freshness information; zero disables it
    pub default_ttl: Duration,
    /// Whether POST requests are cache candidates
    pub cache_post: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            default_ttl: Duration::ZERO,
            cache_post: true,
        }
    }
}

impl CachePolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_ttl: Duration::from_secs(config.default_ttl),
            cache_post: config.cache_post,
        }
    }

    /// GET and HEAD always; POST when enabled.
    pub fn is_candidate_method(&self, method: &Method) -> bool {
        *method == Method::GET || *method == Method::HEAD || (self.cache_post && *method == Method::POST)
    }

    // == Request Phase ==
    pub fn evaluate_request(&self, method: &Method, headers: &HeaderMap) -> RequestDecision {
        if !self.is_candidate_method(method) {
            return RequestDecision::Bypass(ForwardDetail::Method);
        }

        match RequestDirectives::from_headers(headers) {
            Ok(directives) if !directives.no_cache && !directives.no_store => {
                RequestDecision::Lookup(directives)
            }
            Ok(_) => RequestDecision::Bypass(ForwardDetail::Directive),
            Err(err) => {
                debug!("Unparseable request Cache-Control: {}", err);
                RequestDecision::Bypass(ForwardDetail::Directive)
            }
        }
    }

    // == Response Phase ==
    /// Decides storability from the draft response headers.
    ///
    /// Injects a `Date` header when the origin sent none and rewrites a
    /// non-zero `Age` to the corrected initial age.
    pub fn evaluate_response(
        &self,
        exchange: &Exchange,
        headers: &mut HeaderMap,
        status: StatusCode,
        now: DateTime<Utc>,
    ) -> ResponseDecision {
        let directives = match ResponseDirectives::from_headers(headers) {
            Ok(directives) => directives,
            Err(err) => {
                debug!("Malformed response Cache-Control: {}", err);
                return ResponseDecision::Forward(ForwardDetail::Malformed(
                    MalformedHeader::CacheControl,
                ));
            }
        };

        let expires = match parse_date_header(headers, EXPIRES) {
            Ok(expires) => expires,
            Err(()) => return malformed(MalformedHeader::Expires),
        };
        let date = match parse_date_header(headers, DATE) {
            Ok(date) => date,
            Err(()) => return malformed(MalformedHeader::Date),
        };
        let last_modified = match parse_date_header(headers, LAST_MODIFIED) {
            Ok(last_modified) => last_modified,
            Err(()) => return malformed(MalformedHeader::LastModified),
        };

        // A cache must add Date to any response it stores without one
        let date = match date {
            Some(date) => date,
            None => {
                if let Ok(value) = HeaderValue::try_from(httpdate::fmt_http_date(SystemTime::from(now))) {
                    headers.insert(DATE, value);
                }
                now
            }
        };

        let reasons = self.not_storable_reasons(exchange, &directives, expires.is_some(), status);
        if !reasons.is_empty() {
            return ResponseDecision::Forward(ForwardDetail::NotStorable(reasons));
        }

        let ttl = match self.freshness_lifetime(&directives, expires, date, last_modified) {
            Lifetime::Explicit(lifetime) | Lifetime::Heuristic(lifetime) => {
                let apparent_age = (now - date).to_std().unwrap_or(Duration::ZERO);
                lifetime.saturating_sub(apparent_age)
            }
            Lifetime::Default => self.default_ttl,
        };

        let header_age = headers.get(AGE).and_then(|v| v.to_str().ok());
        let corrected = corrected_initial_age(now, date, exchange.request_time, header_age);
        if !parse_age_header(header_age).is_zero() {
            headers.insert(AGE, HeaderValue::from(ceil_secs(corrected)));
        }

        ResponseDecision::Capture(Capture {
            ttl,
            request_time: exchange.request_time,
            response_time: now,
            corrected_initial_age: corrected,
        })
    }

    /// RFC 7234 §3 storability, collecting every failed condition.
    fn not_storable_reasons(
        &self,
        exchange: &Exchange,
        directives: &ResponseDirectives,
        has_expires: bool,
        status: StatusCode,
    ) -> Vec<NotStorableReason> {
        let mut reasons = Vec::new();
        let explicit_freshness = has_expires || directives.has_explicit_lifetime();

        if !self.is_candidate_method(&exchange.method) {
            reasons.push(NotStorableReason::RequestMethodNotCacheable);
        } else if exchange.method == Method::POST && !explicit_freshness {
            reasons.push(NotStorableReason::RequestMethodPost);
        }

        if exchange.directives.no_store {
            reasons.push(NotStorableReason::RequestNoStore);
        }

        if exchange.has_authorization
            && !(directives.public || directives.s_maxage.is_some() || directives.must_revalidate)
        {
            reasons.push(NotStorableReason::RequestAuthorizationHeader);
        }

        if directives.no_store {
            reasons.push(NotStorableReason::ResponseNoStore);
        }

        if directives.private {
            reasons.push(NotStorableReason::ResponsePrivate);
        }

        // Keys ignore Range, so partial content is never stored
        let cacheable_by_default = CACHEABLE_BY_DEFAULT.contains(&status.as_u16());
        if status == StatusCode::PARTIAL_CONTENT
            || (!cacheable_by_default && !(explicit_freshness || directives.public))
        {
            reasons.push(NotStorableReason::ResponseUncachableByDefault);
        }

        reasons
    }

    /// `s-maxage`, then `max-age`, then `Expires - Date`, then 10% of the
    /// time since `Last-Modified`, then the configured default.
    fn freshness_lifetime(
        &self,
        directives: &ResponseDirectives,
        expires: Option<DateTime<Utc>>,
        date: DateTime<Utc>,
        last_modified: Option<DateTime<Utc>>,
    ) -> Lifetime {
        if directives.no_cache {
            // Stored responses are never revalidated
            return Lifetime::Explicit(Duration::ZERO);
        }
        if let Some(secs) = directives.s_maxage.or(directives.max_age) {
            return Lifetime::Explicit(Duration::from_secs(secs));
        }
        if let Some(expires) = expires {
            return Lifetime::Explicit((expires - date).to_std().unwrap_or(Duration::ZERO));
        }
        if let Some(last_modified) = last_modified {
            let since = (date - last_modified).to_std().unwrap_or(Duration::ZERO);
            return Lifetime::Heuristic(since / 10);
        }
        Lifetime::Default
    }
}

fn malformed(header: MalformedHeader) -> ResponseDecision {
    ResponseDecision::Forward(ForwardDetail::Malformed(header))
}

/// Parses an HTTP-date header; `Ok(None)` when absent.
fn parse_date_header(headers: &HeaderMap, name: HeaderName) -> Result<Option<DateTime<Utc>>, ()> {
    let Some(value) = headers.get(&name) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| ())?;
    httpdate::parse_http_date(value.trim())
        .map(|time| Some(DateTime::<Utc>::from(time)))
        .map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::CACHE_CONTROL;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn http_date(time: DateTime<Utc>) -> String {
        httpdate::fmt_http_date(SystemTime::from(time))
    }

    fn exchange(method: Method) -> Exchange {
        Exchange {
            method,
            directives: RequestDirectives::default(),
            has_authorization: false,
            request_time: now(),
        }
    }

    fn headers(pairs: &[(HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn evaluate(policy: &CachePolicy, method: Method, map: &mut HeaderMap, status: u16) -> ResponseDecision {
        policy.evaluate_response(
            &exchange(method),
            map,
            StatusCode::from_u16(status).unwrap(),
            now(),
        )
    }

    fn ttl_of(decision: ResponseDecision) -> Duration {
        match decision {
            ResponseDecision::Capture(capture) => capture.ttl,
            other => panic!("expected a capture, got {:?}", other),
        }
    }

    fn reasons_of(decision: ResponseDecision) -> Vec<NotStorableReason> {
        match decision {
            ResponseDecision::Forward(ForwardDetail::NotStorable(reasons)) => reasons,
            other => panic!("expected not-storable reasons, got {:?}", other),
        }
    }

    // == Request phase ==

    #[test]
    fn test_request_methods() {
        let policy = CachePolicy::default();
        let empty = HeaderMap::new();

        for method in [Method::GET, Method::HEAD, Method::POST] {
            assert!(matches!(
                policy.evaluate_request(&method, &empty),
                RequestDecision::Lookup(_)
            ));
        }
        for method in [Method::PUT, Method::DELETE, Method::PATCH, Method::OPTIONS] {
            assert_eq!(
                policy.evaluate_request(&method, &empty),
                RequestDecision::Bypass(ForwardDetail::Method)
            );
        }
    }

    #[test]
    fn test_post_knob() {
        let policy = CachePolicy {
            cache_post: false,
            ..CachePolicy::default()
        };
        assert_eq!(
            policy.evaluate_request(&Method::POST, &HeaderMap::new()),
            RequestDecision::Bypass(ForwardDetail::Method)
        );
    }

    #[test]
    fn test_request_directives_bypass() {
        let policy = CachePolicy::default();
        for value in ["no-cache", "no-store", "max-age=0, no-store", "max-age=\"unterminated"] {
            let map = headers(&[(CACHE_CONTROL, value)]);
            assert_eq!(
                policy.evaluate_request(&Method::GET, &map),
                RequestDecision::Bypass(ForwardDetail::Directive),
                "value {:?}",
                value
            );
        }

        let map = headers(&[(CACHE_CONTROL, "max-age=5")]);
        match policy.evaluate_request(&Method::GET, &map) {
            RequestDecision::Lookup(directives) => assert_eq!(directives.max_age, Some(5)),
            other => panic!("unexpected {:?}", other),
        }
    }

    // == Response phase ==

    #[test]
    fn test_max_age_ttl() {
        let mut map = headers(&[(CACHE_CONTROL, "max-age=60")]);
        let ttl = ttl_of(evaluate(&CachePolicy::default(), Method::GET, &mut map, 200));
        assert_eq!(ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_s_maxage_beats_max_age() {
        let mut map = headers(&[(CACHE_CONTROL, "max-age=10, s-maxage=120")]);
        let ttl = ttl_of(evaluate(&CachePolicy::default(), Method::GET, &mut map, 200));
        assert_eq!(ttl, Duration::from_secs(120));
    }

    #[test]
    fn test_expires_minus_date() {
        let date = now() - chrono::Duration::seconds(10);
        let expires = date + chrono::Duration::seconds(100);
        let mut map = headers(&[(DATE, http_date(date).as_str()), (EXPIRES, http_date(expires).as_str())]);

        let ttl = ttl_of(evaluate(&CachePolicy::default(), Method::GET, &mut map, 200));
        // 100s lifetime, already 10s old
        assert_eq!(ttl, Duration::from_secs(90));
    }

    #[test]
    fn test_stale_date_reduces_ttl_to_zero() {
        let date = now() - chrono::Duration::seconds(600);
        let mut map = headers(&[(DATE, http_date(date).as_str()), (CACHE_CONTROL, "max-age=60")]);

        let ttl = ttl_of(evaluate(&CachePolicy::default(), Method::GET, &mut map, 200));
        assert_eq!(ttl, Duration::ZERO);
    }

    #[test]
    fn test_last_modified_heuristic() {
        let last_modified = now() - chrono::Duration::seconds(1000);
        let mut map = headers(&[(LAST_MODIFIED, http_date(last_modified).as_str())]);

        let ttl = ttl_of(evaluate(&CachePolicy::default(), Method::GET, &mut map, 200));
        assert_eq!(ttl, Duration::from_secs(100));
    }

    #[test]
    fn test_default_ttl_applies_without_freshness() {
        let mut map = HeaderMap::new();
        assert_eq!(
            ttl_of(evaluate(&CachePolicy::default(), Method::GET, &mut map, 200)),
            Duration::ZERO
        );

        let policy = CachePolicy {
            default_ttl: Duration::from_secs(5),
            ..CachePolicy::default()
        };
        let mut map = HeaderMap::new();
        assert_eq!(
            ttl_of(evaluate(&policy, Method::GET, &mut map, 200)),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_response_no_cache_is_never_fresh() {
        let mut map = headers(&[(CACHE_CONTROL, "no-cache, max-age=60")]);
        let ttl = ttl_of(evaluate(&CachePolicy::default(), Method::GET, &mut map, 200));
        assert_eq!(ttl, Duration::ZERO);
    }

    #[test]
    fn test_date_is_injected_when_missing() {
        let mut map = headers(&[(CACHE_CONTROL, "max-age=60")]);
        evaluate(&CachePolicy::default(), Method::GET, &mut map, 200);

        let date = map.get(DATE).unwrap().to_str().unwrap();
        assert_eq!(date, http_date(now()));
    }

    #[test]
    fn test_existing_date_is_kept() {
        let date = http_date(now() - chrono::Duration::seconds(3));
        let mut map = headers(&[(DATE, date.as_str()), (CACHE_CONTROL, "max-age=60")]);
        evaluate(&CachePolicy::default(), Method::GET, &mut map, 200);

        assert_eq!(map.get(DATE).unwrap(), date.as_str());
        assert_eq!(map.get_all(DATE).iter().count(), 1);
    }

    #[test]
    fn test_malformed_headers_fail_closed() {
        let cases = [
            (CACHE_CONTROL, "max-age=soon", MalformedHeader::CacheControl),
            (EXPIRES, "tomorrow", MalformedHeader::Expires),
            (DATE, "yesterday", MalformedHeader::Date),
            (LAST_MODIFIED, "0", MalformedHeader::LastModified),
        ];
        for (name, value, expected) in cases {
            let mut map = headers(&[(name, value)]);
            assert_eq!(
                evaluate(&CachePolicy::default(), Method::GET, &mut map, 200),
                ResponseDecision::Forward(ForwardDetail::Malformed(expected))
            );
        }
    }

    #[test]
    fn test_no_store_and_private() {
        let mut map = headers(&[(CACHE_CONTROL, "no-store, private, max-age=60")]);
        assert_eq!(
            reasons_of(evaluate(&CachePolicy::default(), Method::GET, &mut map, 200)),
            vec![NotStorableReason::ResponseNoStore, NotStorableReason::ResponsePrivate]
        );
    }

    #[test]
    fn test_status_not_cacheable_by_default() {
        let mut map = HeaderMap::new();
        assert_eq!(
            reasons_of(evaluate(&CachePolicy::default(), Method::GET, &mut map, 500)),
            vec![NotStorableReason::ResponseUncachableByDefault]
        );

        // Explicit freshness makes any final status storable
        let mut map = headers(&[(CACHE_CONTROL, "max-age=30")]);
        assert_eq!(
            ttl_of(evaluate(&CachePolicy::default(), Method::GET, &mut map, 302)),
            Duration::from_secs(30)
        );

        let mut map = headers(&[(CACHE_CONTROL, "max-age=30")]);
        assert_eq!(
            reasons_of(evaluate(&CachePolicy::default(), Method::GET, &mut map, 206)),
            vec![NotStorableReason::ResponseUncachableByDefault]
        );
    }

    #[test]
    fn test_post_requires_explicit_freshness() {
        let policy = CachePolicy {
            default_ttl: Duration::from_secs(30),
            ..CachePolicy::default()
        };

        let mut map = HeaderMap::new();
        assert_eq!(
            reasons_of(evaluate(&policy, Method::POST, &mut map, 200)),
            vec![NotStorableReason::RequestMethodPost]
        );

        let mut map = headers(&[(CACHE_CONTROL, "max-age=15")]);
        assert_eq!(
            ttl_of(evaluate(&policy, Method::POST, &mut map, 200)),
            Duration::from_secs(15)
        );
    }

    #[test]
    fn test_authorization_needs_explicit_permission() {
        let policy = CachePolicy::default();
        let mut authorized = exchange(Method::GET);
        authorized.has_authorization = true;

        let mut map = headers(&[(CACHE_CONTROL, "max-age=60")]);
        let decision = policy.evaluate_response(&authorized, &mut map, StatusCode::OK, now());
        assert_eq!(
            reasons_of(decision),
            vec![NotStorableReason::RequestAuthorizationHeader]
        );

        let mut map = headers(&[(CACHE_CONTROL, "public, max-age=60")]);
        let decision = policy.evaluate_response(&authorized, &mut map, StatusCode::OK, now());
        assert_eq!(ttl_of(decision), Duration::from_secs(60));

        let mut map = headers(&[(CACHE_CONTROL, "s-maxage=60")]);
        let decision = policy.evaluate_response(&authorized, &mut map, StatusCode::OK, now());
        assert_eq!(ttl_of(decision), Duration::from_secs(60));
    }

    #[test]
    fn test_age_header_rewritten_to_corrected_initial_age() {
        let policy = CachePolicy::default();
        let mut slow = exchange(Method::GET);
        slow.request_time = now() - chrono::Duration::milliseconds(2500);

        let mut map = headers(&[(CACHE_CONTROL, "max-age=60"), (AGE, "10")]);
        let decision = policy.evaluate_response(&slow, &mut map, StatusCode::OK, now());

        let capture = match decision {
            ResponseDecision::Capture(capture) => capture,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(capture.corrected_initial_age, Duration::from_millis(12_500));
        assert_eq!(map.get(AGE).unwrap(), "13");
    }

    #[test]
    fn test_zero_age_header_is_left_alone() {
        let mut map = headers(&[(CACHE_CONTROL, "max-age=60"), (AGE, "0")]);
        evaluate(&CachePolicy::default(), Method::GET, &mut map, 200);
        assert_eq!(map.get(AGE).unwrap(), "0");
    }

    #[test]
    fn test_capture_timing() {
        let policy = CachePolicy::default();
        let mut map = headers(&[(CACHE_CONTROL, "max-age=60")]);
        let decision = policy.evaluate_response(&exchange(Method::GET), &mut map, StatusCode::OK, now());

        match decision {
            ResponseDecision::Capture(capture) => {
                assert_eq!(capture.request_time, now());
                assert_eq!(capture.response_time, now());
                assert!(capture.response_time >= capture.request_time);
                assert_eq!(capture.corrected_initial_age, Duration::ZERO);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
