use crate::bridge::{Bridge, BridgeError};
use axum::{
    extract::{Extension, Query},
    response::Redirect,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(IntoParams, Debug, Deserialize, Default)]
#[into_params(parameter_in = Query)]
pub struct LoginArgs {
    /// Challenge issued by Hydra
    login_challenge: Option<String>,
}

#[utoipa::path(
    get,
    path= "/login",
    params(LoginArgs),
    responses (
        (status = 307, description = "Redirect to Hydra (skipped login) or to the upstream provider"),
        (status = 400, description = "Missing login_challenge", body = String),
        (status = 500, description = "Hydra failure", body = String),
    ),
    tag= "hydra"
)]
// axum handler for Hydra's login URL
pub async fn login(
    bridge: Extension<Arc<Bridge>>,
    Query(args): Query<LoginArgs>,
) -> Result<Redirect, BridgeError> {
    let outcome = bridge.login(args.login_challenge.as_deref()).await?;
    Ok(Redirect::temporary(outcome.redirect_to()))
}
