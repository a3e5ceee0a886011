use std::convert::Infallible;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use headers::HeaderMapExt;
use pastebin_lite_common::TestNow;
use tracing::debug;

use crate::state::AppState;

/// The instant a request is evaluated at.
///
/// Handlers take this instead of reading the clock themselves, so the same
/// value flows into creation and consumption and tests can pin it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Now(pub DateTime<Utc>);

impl Now {
    /// Wall-clock time, unless `test_mode` is set and the request carries a
    /// well-formed `x-test-now-ms` header.
    pub fn resolve(headers: &HeaderMap, test_mode: bool) -> Self {
        if test_mode {
            if let Some(TestNow(now)) = headers.typed_get::<TestNow>() {
                return Self(now);
            }

            if headers.contains_key(<TestNow as headers::Header>::name()) {
                debug!("Ignoring malformed test clock header");
            }
        }

        Self(Utc::now())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Now {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::resolve(&parts.headers, state.config.test_mode))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use pastebin_lite_common::TEST_NOW_HEADER_NAME;

    use super::*;

    fn headers_with(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(&*TEST_NOW_HEADER_NAME, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn header_overrides_clock_in_test_mode() {
        let now = Now::resolve(&headers_with("5000"), true);
        assert_eq!(now.0.timestamp_millis(), 5000);
    }

    #[test]
    fn header_is_ignored_outside_test_mode() {
        let now = Now::resolve(&headers_with("5000"), false);
        assert!(now.0.timestamp_millis() > 5000);
    }

    #[test]
    fn malformed_header_falls_back_to_clock() {
        let now = Now::resolve(&headers_with("yesterday"), true);
        assert!(now.0.timestamp_millis() > 5000);
    }
}
