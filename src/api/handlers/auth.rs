//! Upstream OAuth2 legs: `/auth/{provider}` and `/auth/{provider}/callback`.
//!
//! The provider [`Session`](crate::provider::Session) lives in an `HttpOnly`
//! cookie between the two requests and is cleared once the callback runs.

use crate::{
    bridge::{Bridge, BridgeError, CallbackParams},
    provider::ProviderError,
};
use axum::{
    extract::{Extension, Path, Query},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{COOKIE, InvalidHeaderValue, LOCATION, SET_COOKIE},
    },
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use utoipa::IntoParams;

/// The code exchange has to happen within this many seconds.
const SESSION_COOKIE_MAX_AGE: u64 = 600;

#[derive(IntoParams, Debug, Deserialize, Default)]
#[into_params(parameter_in = Query)]
pub struct BeginArgs {
    /// Login challenge, echoed back by the provider
    state: Option<String>,
}

#[derive(IntoParams, Debug, Deserialize, Default)]
#[into_params(parameter_in = Query)]
pub struct CallbackArgs {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[utoipa::path(
    get,
    path= "/auth/{provider}",
    params(
        ("provider" = String, Path, description = "Registered provider name"),
        BeginArgs
    ),
    responses (
        (status = 307, description = "Redirect to the provider's authorization page"),
        (status = 400, description = "Missing state", body = String),
        (status = 404, description = "Unknown provider", body = String),
    ),
    tag= "auth"
)]
pub async fn begin(
    bridge: Extension<Arc<Bridge>>,
    Path(provider): Path<String>,
    Query(args): Query<BeginArgs>,
) -> Result<Response, BridgeError> {
    let session = bridge.begin(&provider, args.state.as_deref())?;
    let location = session
        .authorization_url()
        .map_err(ProviderError::from)?
        .to_string();

    let encoded = session.marshal().map_err(ProviderError::from)?;

    let mut response_headers = HeaderMap::new();
    match session_cookie(&provider, &encoded, bridge.config().cookie_secure()) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response());
        }
    }

    Ok((response_headers, Redirect::temporary(&location)).into_response())
}

#[utoipa::path(
    get,
    path= "/auth/{provider}/callback",
    params(
        ("provider" = String, Path, description = "Registered provider name"),
        CallbackArgs
    ),
    responses (
        (status = 307, description = "Login accepted, redirect to Hydra"),
        (status = 400, description = "Missing parameters, missing session or state mismatch", body = String),
        (status = 404, description = "Unknown provider", body = String),
        (status = 500, description = "Upstream or Hydra failure", body = String),
    ),
    tag= "auth"
)]
pub async fn callback(
    bridge: Extension<Arc<Bridge>>,
    Path(provider): Path<String>,
    Query(args): Query<CallbackArgs>,
    headers: HeaderMap,
) -> Response {
    let encoded = extract_cookie(&headers, &cookie_name(&provider));
    let params = CallbackParams {
        code: args.code,
        state: args.state,
        error: args.error,
        error_description: args.error_description,
    };

    let result = bridge
        .callback(&provider, encoded.as_deref(), params)
        .await;

    // One attempt per session, whatever the outcome.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(&provider, bridge.config().cookie_secure()) {
        response_headers.insert(SET_COOKIE, cookie);
    }

    match result {
        Ok(redirect_to) => match HeaderValue::from_str(&redirect_to) {
            Ok(location) => {
                response_headers.insert(LOCATION, location);
                (StatusCode::TEMPORARY_REDIRECT, response_headers).into_response()
            }
            Err(err) => {
                error!("Hydra returned an invalid redirect: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, response_headers).into_response()
            }
        },
        Err(err) => (response_headers, err).into_response(),
    }
}

fn cookie_name(provider: &str) -> String {
    format!("{provider}_session")
}

fn session_cookie(
    provider: &str,
    value: &str,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let name = cookie_name(provider);
    let mut cookie = format!(
        "{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={SESSION_COOKIE_MAX_AGE}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(provider: &str, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let name = cookie_name(provider);
    let mut cookie = format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            if key.trim() == name {
                return Some(val.trim().to_string());
            }
        }
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie("lark", "abc", true).unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "lark_session=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=600; Secure"
        );
        let cleared = clear_session_cookie("lark", false).unwrap();
        assert_eq!(
            cleared.to_str().unwrap(),
            "lark_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
        );
    }

    #[test]
    fn extract_cookie_finds_named_pair() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("other=1; lark_session=abc-_; x"),
        );
        assert_eq!(
            extract_cookie(&headers, "lark_session").as_deref(),
            Some("abc-_")
        );
        assert_eq!(extract_cookie(&headers, "feishu_session"), None);
    }
}
