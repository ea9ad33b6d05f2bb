//! Flash messages
//!
//! A mutation answers with `303 See Other` and leaves a one-shot message in
//! the `flash` cookie. The next listing reads it with the [`Flash`]
//! extractor, returns it in its JSON body and expires the cookie.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

const FLASH_COOKIE: &str = "flash";
const CLEAR_FLASH: &str = "flash=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0";

/// Prefix of every route the API redirects to
pub const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashClass {
    Success,
    Danger,
}

/// One-shot message shown after a redirect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub class: FlashClass,
    pub message: String,
}

impl FlashMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            class: FlashClass::Success,
            message: message.into(),
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            class: FlashClass::Danger,
            message: message.into(),
        }
    }

    fn set_cookie(&self, max_age: i64) -> Option<HeaderValue> {
        let json = serde_json::to_string(self).ok()?;
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            FLASH_COOKIE,
            urlencoding::encode(&json),
            max_age
        );
        HeaderValue::from_str(&cookie).ok()
    }

    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
        let raw = cookies
            .split(';')
            .map(str::trim)
            .find_map(|c| c.strip_prefix("flash="))
            .filter(|v| !v.is_empty())?;
        let json = urlencoding::decode(raw).ok()?;
        serde_json::from_str(&json).ok()
    }
}

/// Flash message carried by the request, if any
#[derive(Debug, Clone, Default)]
pub struct Flash(pub Option<FlashMessage>);

impl Flash {
    pub fn message(&self) -> Option<FlashMessage> {
        self.0.clone()
    }

    /// Attach `body` and expire the cookie when a message was consumed
    pub fn respond(self, body: impl IntoResponse) -> Response {
        let mut response = body.into_response();
        if self.0.is_some() {
            response
                .headers_mut()
                .append(header::SET_COOKIE, HeaderValue::from_static(CLEAR_FLASH));
        }
        response
    }
}

impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Flash(FlashMessage::from_headers(&parts.headers)))
    }
}

/// `303 See Other` to an API path (given without the `/api/v1` prefix)
pub fn redirect(path: &str) -> Response {
    Redirect::to(&format!("{}{}", API_PREFIX, path)).into_response()
}

/// Redirect and leave `flash` for the next request
pub fn redirect_with(path: &str, flash: FlashMessage, max_age: i64) -> Response {
    let mut response = redirect(path);
    match flash.set_cookie(max_age) {
        Some(cookie) => {
            response.headers_mut().append(header::SET_COOKIE, cookie);
        }
        None => tracing::warn!("Dropped unencodable flash message"),
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_redirect_sets_cookie_and_location() {
        let response = redirect_with("/products", FlashMessage::success("Product saved; ok"), 60);

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/api/v1/products"
        );
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cookie.starts_with("flash="));
        assert!(cookie.ends_with("Max-Age=60"));
        assert_eq!(cookie.matches(';').count(), 4);
    }

    #[test]
    fn test_cookie_round_trip() {
        let flash = FlashMessage::danger("Invalid email or password");
        let set = flash.set_cookie(60).unwrap();
        let value = set.to_str().unwrap().split(';').next().unwrap().to_string();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("session=abc; {}", value)).unwrap(),
        );
        assert_eq!(FlashMessage::from_headers(&headers), Some(flash));
    }

    #[test]
    fn test_garbage_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("flash=%7Bnot-json"));
        assert!(FlashMessage::from_headers(&headers).is_none());

        headers.insert(header::COOKIE, HeaderValue::from_static("flash="));
        assert!(FlashMessage::from_headers(&headers).is_none());
    }

    #[test]
    fn test_respond_clears_only_consumed_flash() {
        let consumed = Flash(Some(FlashMessage::success("done"))).respond("body");
        assert_eq!(
            consumed.headers().get(header::SET_COOKIE).unwrap(),
            CLEAR_FLASH
        );

        let untouched = Flash(None).respond("body");
        assert!(untouched.headers().get(header::SET_COOKIE).is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(FlashMessage::success("Saved")).unwrap();
        assert_eq!(json, serde_json::json!({"class": "success", "message": "Saved"}));
    }
}
