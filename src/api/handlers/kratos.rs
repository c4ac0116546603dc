use crate::bridge::{BridgeError, kratos::KratosBridge};
use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, header::COOKIE},
    response::Redirect,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(IntoParams, Debug, Deserialize, Default)]
#[into_params(parameter_in = Query)]
pub struct KratosLoginArgs {
    login_challenge: Option<String>,
}

#[derive(IntoParams, Debug, Deserialize, Default)]
#[into_params(parameter_in = Query)]
pub struct KratosConsentArgs {
    consent_challenge: Option<String>,
}

// Kratos identifies the browser by its own cookies; pass them through as is.
fn browser_cookies(headers: &HeaderMap) -> Option<&str> {
    headers.get(COOKIE).and_then(|value| value.to_str().ok())
}

#[utoipa::path(
    get,
    path= "/kratos/login",
    params(KratosLoginArgs),
    responses (
        (status = 307, description = "Redirect to Hydra (skipped login) or to the Kratos login flow"),
        (status = 400, description = "Missing login_challenge", body = String),
        (status = 500, description = "Hydra failure", body = String),
    ),
    tag= "kratos"
)]
pub async fn login(
    bridge: Extension<Arc<KratosBridge>>,
    Query(args): Query<KratosLoginArgs>,
) -> Result<Redirect, BridgeError> {
    let redirect_to = bridge.login(args.login_challenge.as_deref()).await?;
    Ok(Redirect::temporary(&redirect_to))
}

#[utoipa::path(
    get,
    path= "/kratos/callback",
    params(KratosLoginArgs),
    responses (
        (status = 307, description = "Login accepted, redirect to Hydra"),
        (status = 400, description = "Missing login_challenge", body = String),
        (status = 500, description = "No identity session or Hydra failure", body = String),
    ),
    tag= "kratos"
)]
pub async fn callback(
    bridge: Extension<Arc<KratosBridge>>,
    Query(args): Query<KratosLoginArgs>,
    headers: HeaderMap,
) -> Result<Redirect, BridgeError> {
    let redirect_to = bridge
        .callback(args.login_challenge.as_deref(), browser_cookies(&headers))
        .await?;
    Ok(Redirect::temporary(&redirect_to))
}

#[utoipa::path(
    get,
    path= "/kratos/consent",
    params(KratosConsentArgs),
    responses (
        (status = 307, description = "Consent granted, redirect to Hydra"),
        (status = 400, description = "Missing consent_challenge", body = String),
        (status = 500, description = "No identity session or Hydra failure", body = String),
    ),
    tag= "kratos"
)]
pub async fn consent(
    bridge: Extension<Arc<KratosBridge>>,
    Query(args): Query<KratosConsentArgs>,
    headers: HeaderMap,
) -> Result<Redirect, BridgeError> {
    let redirect_to = bridge
        .consent(args.consent_challenge.as_deref(), browser_cookies(&headers))
        .await?;
    Ok(Redirect::temporary(&redirect_to))
}
