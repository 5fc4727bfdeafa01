//! `Cache-Control` directive parsing (RFC 7234 §5.2).

use axum::http::{header::CACHE_CONTROL, HeaderMap};
use thiserror::Error;

/// Delta-seconds values beyond this are clamped, per RFC 7234 §1.2.1.
pub(crate) const MAX_DELTA_SECONDS: u64 = 1 << 31;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectiveError {
    #[error("Cache-Control header is not valid visible ASCII")]
    InvalidEncoding,

    #[error("unterminated quoted string in Cache-Control")]
    UnterminatedQuote,

    #[error("empty directive name in Cache-Control")]
    EmptyName,

    #[error("directive '{0}' requires a value")]
    MissingValue(String),

    #[error("directive '{name}' has invalid delta-seconds '{value}'")]
    InvalidDeltaSeconds { name: String, value: String },
}

/// One `name[=value]` item; names are lowercased, quotes are removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub name: String,
    pub value: Option<String>,
}

/// Joins every `Cache-Control` field line into one list.
pub fn cache_control_value(headers: &HeaderMap) -> Result<Option<String>, DirectiveError> {
    let mut joined: Option<String> = None;
    for value in headers.get_all(CACHE_CONTROL) {
        let value = value.to_str().map_err(|_| DirectiveError::InvalidEncoding)?;
        match joined.as_mut() {
            Some(list) => {
                list.push_str(", ");
                list.push_str(value);
            }
            None => joined = Some(value.to_string()),
        }
    }
    Ok(joined)
}

/// Splits a directive list, honouring quoted-strings and their escapes.
pub fn parse_directives(input: &str) -> Result<Vec<Directive>, DirectiveError> {
    let mut directives = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        // Skip separators and whitespace between items
        while matches!(chars.peek(), Some(c) if *c == ',' || c.is_ascii_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ',' {
                break;
            }
            name.push(c);
            chars.next();
        }
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            return Err(DirectiveError::EmptyName);
        }

        let mut value = None;
        if chars.peek() == Some(&'=') {
            chars.next();
            while matches!(chars.peek(), Some(c) if c.is_ascii_whitespace()) {
                chars.next();
            }
            let mut raw = String::new();
            if chars.peek() == Some(&'"') {
                chars.next();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some(escaped) => raw.push(escaped),
                            None => break,
                        },
                        '"' => {
                            closed = true;
                            break;
                        }
                        other => raw.push(other),
                    }
                }
                if !closed {
                    return Err(DirectiveError::UnterminatedQuote);
                }
                // Anything between the closing quote and the next comma is dropped
                while matches!(chars.peek(), Some(c) if *c != ',') {
                    chars.next();
                }
            } else {
                while let Some(&c) = chars.peek() {
                    if c == ',' {
                        break;
                    }
                    raw.push(c);
                    chars.next();
                }
                raw = raw.trim().to_string();
            }
            value = Some(raw);
        }

        directives.push(Directive { name, value });
    }

    Ok(directives)
}

fn delta_seconds(directive: &Directive) -> Result<u64, DirectiveError> {
    let value = directive
        .value
        .as_deref()
        .ok_or_else(|| DirectiveError::MissingValue(directive.name.clone()))?;
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DirectiveError::InvalidDeltaSeconds {
            name: directive.name.clone(),
            value: value.to_string(),
        });
    }
    Ok(value
        .parse::<u64>()
        .map(|v| v.min(MAX_DELTA_SECONDS))
        .unwrap_or(MAX_DELTA_SECONDS))
}

/// Directives a client sent with its request.
///
/// `min-fresh` and `max-stale` are only checked for well-formed values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDirectives {
    pub no_cache: bool,
    pub no_store: bool,
    /// Parsed only; lookups do not enforce it
    pub max_age: Option<u64>,
}

impl RequestDirectives {
    pub fn parse(value: Option<&str>) -> Result<Self, DirectiveError> {
        let mut parsed = Self::default();
        let Some(value) = value else {
            return Ok(parsed);
        };

        for directive in parse_directives(value)? {
            match directive.name.as_str() {
                "no-cache" => parsed.no_cache = true,
                "no-store" => parsed.no_store = true,
                "max-age" => {
                    let secs = delta_seconds(&directive)?;
                    parsed.max_age.get_or_insert(secs);
                }
                "min-fresh" => {
                    delta_seconds(&directive)?;
                }
                "max-stale" if directive.value.is_some() => {
                    delta_seconds(&directive)?;
                }
                _ => {}
            }
        }

        Ok(parsed)
    }

    pub fn from_headers(headers: &HeaderMap) -> Result<Self, DirectiveError> {
        Self::parse(cache_control_value(headers)?.as_deref())
    }
}

/// Directives an origin sent with its response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseDirectives {
    pub no_store: bool,
    pub no_cache: bool,
    pub private: bool,
    pub public: bool,
    pub max_age: Option<u64>,
    pub s_maxage: Option<u64>,
    pub must_revalidate: bool,
}

impl ResponseDirectives {
    pub fn parse(value: Option<&str>) -> Result<Self, DirectiveError> {
        let mut parsed = Self::default();
        let Some(value) = value else {
            return Ok(parsed);
        };

        for directive in parse_directives(value)? {
            match directive.name.as_str() {
                "no-store" => parsed.no_store = true,
                // A field-qualified no-cache or private still disqualifies the
                // whole response for a cache that cannot strip fields.
                "no-cache" => parsed.no_cache = true,
                "private" => parsed.private = true,
                "public" => parsed.public = true,
                "must-revalidate" => parsed.must_revalidate = true,
                "max-age" => {
                    let secs = delta_seconds(&directive)?;
                    parsed.max_age.get_or_insert(secs);
                }
                "s-maxage" => {
                    let secs = delta_seconds(&directive)?;
                    parsed.s_maxage.get_or_insert(secs);
                }
                _ => {}
            }
        }

        Ok(parsed)
    }

    pub fn from_headers(headers: &HeaderMap) -> Result<Self, DirectiveError> {
        Self::parse(cache_control_value(headers)?.as_deref())
    }

    /// True when the response carries an explicit freshness lifetime.
    pub fn has_explicit_lifetime(&self) -> bool {
        self.max_age.is_some() || self.s_maxage.is_some()
    }
}
