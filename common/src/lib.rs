#![warn(clippy::nursery, clippy::pedantic)]

//! Contains the wire types shared by the Pastebin Lite server and CLI.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use headers::{Header, HeaderName, HeaderValue};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use thiserror::Error;
pub use url::Url;

/// JSON API collection for pastes.
pub const PASTES_ENDPOINT: &str = "/pastes";
/// Prefix of the human-facing view page.
pub const VIEW_ENDPOINT: &str = "/p";

/// Largest accepted `ttl_seconds`, such that the value in milliseconds still
/// fits an `i64`.
pub const MAX_TTL_SECONDS: u64 = i64::MAX as u64 / 1000;
/// Largest accepted `max_views`; the store keeps counters as `i64`.
pub const MAX_VIEWS_LIMIT: u64 = i64::MAX as u64;

/// Body of `POST /pastes`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CreatePaste {
    pub content: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "integral::deserialize"
    )]
    pub ttl_seconds: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "integral::deserialize"
    )]
    pub max_views: Option<u64>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("content must be a non-empty string")]
    EmptyContent,
    #[error("{field} must be a positive integer")]
    NonPositive { field: &'static str },
    #[error("{field} is too large")]
    OutOfRange { field: &'static str },
}

impl CreatePaste {
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ttl_seconds: None,
            max_views: None,
        }
    }

    #[must_use]
    pub const fn ttl_seconds(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = Some(ttl_seconds);
        self
    }

    #[must_use]
    pub const fn max_views(mut self, max_views: u64) -> Self {
        self.max_views = Some(max_views);
        self
    }

    /// Checks the fields that serde cannot: non-empty content and strictly
    /// positive, representable limits.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.content.is_empty() {
            return Err(ValidationError::EmptyContent);
        }

        check_positive("ttl_seconds", self.ttl_seconds, MAX_TTL_SECONDS)?;
        check_positive("max_views", self.max_views, MAX_VIEWS_LIMIT)?;
        Ok(())
    }
}

fn check_positive(
    field: &'static str,
    value: Option<u64>,
    max: u64,
) -> Result<(), ValidationError> {
    match value {
        Some(0) => Err(ValidationError::NonPositive { field }),
        Some(v) if v > max => Err(ValidationError::OutOfRange { field }),
        _ => Ok(()),
    }
}

/// Non-negative JSON integers, also when written with a zero fraction such
/// as `10.0`. Fractions, negatives and strings are rejected.
mod integral {
    use std::fmt;

    use serde::de::{self, Unexpected, Visitor};
    use serde::{Deserialize, Deserializer};

    struct Integral(u64);

    impl<'de> Deserialize<'de> for Integral {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            struct IntegralVisitor;
            impl<'de> Visitor<'de> for IntegralVisitor {
                type Value = Integral;

                fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                    formatter.write_str("a non-negative integer")
                }

                fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    Ok(Integral(v))
                }

                fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    u64::try_from(v)
                        .map(Integral)
                        .map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
                }

                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    // 2^64 itself is the first float past `u64::MAX`.
                    if v.fract() == 0.0 && (0.0..18_446_744_073_709_551_616.0).contains(&v) {
                        Ok(Integral(v as u64))
                    } else {
                        Err(E::invalid_value(Unexpected::Float(v), &self))
                    }
                }
            }

            deserializer.deserialize_any(IntegralVisitor)
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Integral>::deserialize(deserializer)?.map(|Integral(v)| v))
    }
}

/// Response of `POST /pastes`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CreatedPaste {
    pub id: String,
    pub url: String,
}

/// Response of a successful view. `remaining_views` is counted after this
/// view was taken.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PasteView {
    pub content: String,
    pub remaining_views: Option<i64>,
    #[serde(with = "iso_millis")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Display for PasteView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.remaining_views {
            None => write!(f, "This paste has no view limit.")?,
            Some(1) => write!(f, "1 view remaining.")?,
            Some(n) => write!(f, "{n} views remaining.")?,
        }

        match self.expires_at {
            None => write!(f, " It will not expire."),
            Some(time) => write!(
                f,
                " {}",
                time.format("It will expire on %A, %B %-d, %Y at %T %Z.")
            ),
        }
    }
}

/// Response of `DELETE /pastes/{id}`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deleted {
    pub success: bool,
}

/// Body of every error response.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

/// Formats timestamps as ISO-8601 UTC with millisecond precision, e.g.
/// `2024-01-01T00:00:10.000Z`.
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    #[must_use]
    pub fn format(time: &DateTime<Utc>) -> String {
        time.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(time) => serializer.serialize_some(&format(time)),
            None => serializer.serialize_none(),
        }
    }

    /// # Errors
    ///
    /// Fails on strings that are not RFC 3339 timestamps.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}

lazy_static! {
    pub static ref TEST_NOW_HEADER_NAME: HeaderName = HeaderName::from_static("x-test-now-ms");
}

/// Overrides the server's notion of "now", in milliseconds since the Unix
/// epoch. Only honoured by servers running in test mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TestNow(pub DateTime<Utc>);

impl TestNow {
    #[must_use]
    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self)
    }
}

impl Header for TestNow {
    fn name() -> &'static HeaderName {
        &*TEST_NOW_HEADER_NAME
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        values
            .next()
            .ok_or_else(headers::Error::invalid)?
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(Self::from_millis)
            .ok_or_else(headers::Error::invalid)
    }

    fn encode<E: Extend<HeaderValue>>(&self, container: &mut E) {
        container.extend(std::iter::once(HeaderValue::from(
            self.0.timestamp_millis(),
        )));
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use headers::HeaderMapExt;
    use http::HeaderMap;
    use serde_json::json;

    use super::*;

    #[test]
    fn validate_accepts_minimal_request() {
        assert_eq!(CreatePaste::new("hello").validate(), Ok(()));
        assert_eq!(
            CreatePaste::new("hello")
                .ttl_seconds(1)
                .max_views(1)
                .validate(),
            Ok(())
        );
    }

    #[test]
    fn validate_rejects_empty_content() {
        assert_eq!(
            CreatePaste::new("").validate(),
            Err(ValidationError::EmptyContent)
        );
    }

    #[test]
    fn validate_rejects_zero_limits() {
        assert_eq!(
            CreatePaste::new("x").ttl_seconds(0).validate(),
            Err(ValidationError::NonPositive {
                field: "ttl_seconds"
            })
        );
        assert_eq!(
            CreatePaste::new("x").max_views(0).validate(),
            Err(ValidationError::NonPositive { field: "max_views" })
        );
    }

    #[test]
    fn validate_rejects_unrepresentable_limits() {
        assert_eq!(
            CreatePaste::new("x").ttl_seconds(u64::MAX).validate(),
            Err(ValidationError::OutOfRange {
                field: "ttl_seconds"
            })
        );
        assert_eq!(
            CreatePaste::new("x").max_views(u64::MAX).validate(),
            Err(ValidationError::OutOfRange { field: "max_views" })
        );
    }

    #[test]
    fn create_paste_rejects_wrong_types() {
        assert!(serde_json::from_value::<CreatePaste>(json!({ "content": 5 })).is_err());
        assert!(serde_json::from_value::<CreatePaste>(json!({})).is_err());
        assert!(
            serde_json::from_value::<CreatePaste>(json!({ "content": "a", "max_views": -1 }))
                .is_err()
        );
        assert!(
            serde_json::from_value::<CreatePaste>(json!({ "content": "a", "ttl_seconds": 1.5 }))
                .is_err()
        );
    }

    #[test]
    fn create_paste_accepts_integral_floats() {
        let request: CreatePaste = serde_json::from_value(
            json!({ "content": "a", "ttl_seconds": 10.0, "max_views": 2.0 }),
        )
        .unwrap();
        assert_eq!(request, CreatePaste::new("a").ttl_seconds(10).max_views(2));

        let request: CreatePaste =
            serde_json::from_value(json!({ "content": "a", "ttl_seconds": null })).unwrap();
        assert_eq!(request.ttl_seconds, None);
    }

    #[test]
    fn create_paste_rejects_fractional_negative_and_string_limits() {
        for limits in [
            json!({ "max_views": 2.5 }),
            json!({ "max_views": -2.0 }),
            json!({ "ttl_seconds": "10" }),
            json!({ "ttl_seconds": 1e30 }),
        ] {
            let mut body = limits.clone();
            body["content"] = json!("a");
            assert!(
                serde_json::from_value::<CreatePaste>(body).is_err(),
                "{limits}"
            );
        }
    }

    #[test]
    fn create_paste_omits_absent_limits() {
        let body = serde_json::to_value(CreatePaste::new("hi")).unwrap();
        assert_eq!(body, json!({ "content": "hi" }));
    }

    #[test]
    fn paste_view_uses_millisecond_iso_timestamps() {
        let view = PasteView {
            content: "hello".into(),
            remaining_views: Some(0),
            expires_at: Some(Utc.timestamp_millis_opt(10_000).unwrap()),
        };
        let body = serde_json::to_value(&view).unwrap();
        assert_eq!(
            body,
            json!({
                "content": "hello",
                "remaining_views": 0,
                "expires_at": "1970-01-01T00:00:10.000Z",
            })
        );
        assert_eq!(serde_json::from_value::<PasteView>(body).unwrap(), view);
    }

    #[test]
    fn paste_view_serializes_nulls() {
        let view = PasteView {
            content: "hello".into(),
            remaining_views: None,
            expires_at: None,
        };
        assert_eq!(
            serde_json::to_value(&view).unwrap(),
            json!({ "content": "hello", "remaining_views": null, "expires_at": null })
        );
    }

    #[test]
    fn test_now_header_decodes_millis() {
        let mut headers = HeaderMap::new();
        headers.insert(&*TEST_NOW_HEADER_NAME, HeaderValue::from_static("5000"));
        let now: TestNow = headers.typed_get().unwrap();
        assert_eq!(now.0.timestamp_millis(), 5000);
    }

    #[test]
    fn test_now_header_rejects_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert(&*TEST_NOW_HEADER_NAME, HeaderValue::from_static("soon"));
        assert!(headers.typed_get::<TestNow>().is_none());
    }

    #[test]
    fn test_now_header_encodes_millis() {
        let mut headers = HeaderMap::new();
        headers.typed_insert(TestNow::from_millis(42).unwrap());
        assert_eq!(
            headers.get(&*TEST_NOW_HEADER_NAME).unwrap().to_str().unwrap(),
            "42"
        );
    }
}
