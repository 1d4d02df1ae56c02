//! Inbound payload checks.
//!
//! Every write endpoint deserializes its body through [`Checked`], which runs
//! two passes in order and reports every offending field at once:
//!
//! 1. allow-list: any key outside [`Payload::ALLOWED`] is rejected;
//! 2. field validation: [`Payload::invalid_fields`] names missing or invalid
//!    values. Typed `Option` fields keep "absent" apart from a real zero.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ApiError;

pub const NOT_ALLOWED_MESSAGE: &str = "Some fields are not allowed";
pub const INVALID_MESSAGE: &str = "Missing or invalid payload fields";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,4}$").expect("email pattern compiles")
});

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern compiles"));

/// A typed request body with a declarative allow-list
pub trait Payload: DeserializeOwned {
    const ALLOWED: &'static [&'static str];

    /// Names of required-but-missing or invalid fields; empty means valid
    fn invalid_fields(&self) -> Vec<&'static str> {
        Vec::new()
    }
}

/// Keys of `payload` not present in `allow`, sorted for stable responses
pub fn disallowed_fields(payload: &Map<String, Value>, allow: &[&str]) -> Vec<String> {
    let mut extra: Vec<String> = payload
        .keys()
        .filter(|key| !allow.contains(&key.as_str()))
        .cloned()
        .collect();
    extra.sort();
    extra
}

/// Runs both passes over a raw JSON body
pub fn check<T: Payload>(value: Value) -> Result<T, ApiError> {
    let map = match value {
        Value::Object(map) => map,
        _ => return Err(ApiError::bad_request("Invalid payload")),
    };

    let extra = disallowed_fields(&map, T::ALLOWED);
    if !extra.is_empty() {
        tracing::debug!("Disallowed payload fields: {:?}", extra);
        return Err(ApiError::validation(NOT_ALLOWED_MESSAGE, extra));
    }

    let payload: T = serde_json::from_value(Value::Object(map)).map_err(|e| {
        tracing::debug!("Payload binding failed: {}", e);
        ApiError::bad_request("Invalid payload")
    })?;

    let invalid = payload.invalid_fields();
    if !invalid.is_empty() {
        tracing::debug!("Invalid payload fields: {:?}", invalid);
        return Err(ApiError::validation(INVALID_MESSAGE, invalid));
    }
    Ok(payload)
}

/// Extractor yielding a body that passed [`check`]
#[derive(Debug)]
pub struct Checked<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Checked<T>
where
    T: Payload,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state).await.map_err(|rejection| {
            tracing::debug!("JSON body rejected: {}", rejection);
            ApiError::bad_request("Invalid payload")
        })?;
        check::<T>(value).map(Checked)
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_date(date: &str) -> bool {
    DATE_RE.is_match(date) && chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
}

/// Non-empty after trimming
pub fn present(value: &Option<String>) -> bool {
    value.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
}

/// Parses a numeric path segment, naming it on failure
pub fn path_id(raw: &str, field: &'static str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::invalid_field("Invalid path param", field))
}

/// Parses an optional query value, naming it on failure
pub fn query_number<N: std::str::FromStr>(raw: Option<&str>, field: &'static str) -> Result<Option<N>, ApiError> {
    match raw {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse::<N>()
            .map(Some)
            .map_err(|_| ApiError::invalid_field("Invalid query param", field)),
    }
}
