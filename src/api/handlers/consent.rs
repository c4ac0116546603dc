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
pub struct ConsentArgs {
    /// Challenge issued by Hydra
    consent_challenge: Option<String>,
}

#[utoipa::path(
    get,
    path= "/consent",
    params(ConsentArgs),
    responses (
        (status = 307, description = "Consent granted, redirect to Hydra"),
        (status = 400, description = "Missing consent_challenge", body = String),
        (status = 500, description = "Hydra failure", body = String),
    ),
    tag= "hydra"
)]
pub async fn consent(
    bridge: Extension<Arc<Bridge>>,
    Query(args): Query<ConsentArgs>,
) -> Result<Redirect, BridgeError> {
    let redirect_to = bridge.consent(args.consent_challenge.as_deref()).await?;
    Ok(Redirect::temporary(&redirect_to))
}
