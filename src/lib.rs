//! # oidc-adapter (Hydra login & consent bridge)
//!
//! `oidc-adapter` implements the login and consent endpoints of an Ory Hydra
//! authorization server. Hydra never authenticates users itself: it hands a
//! *challenge* to this service, which decides how the user proves who they are
//! and then reports the resulting subject back to Hydra.
//!
//! ## Login
//!
//! 1. Hydra redirects the browser to `/login?login_challenge=<id>`.
//! 2. If Hydra already trusts a session (`skip`), the challenge is accepted
//!    immediately with the subject Hydra remembers. No upstream is contacted.
//! 3. Otherwise the browser is sent to `/auth/{provider}?state=<id>`, which
//!    redirects to the upstream provider (Lark). The login challenge travels
//!    as the OAuth2 `state`, so the upstream round trip is bound to the
//!    challenge that started it.
//! 4. The upstream calls back `/auth/{provider}/callback?code=..&state=<id>`.
//!    The code is exchanged, the profile is fetched and its organizational
//!    identifier (`employee_no`) becomes the Hydra subject.
//!
//! ## Consent
//!
//! Scopes and audiences are granted exactly as requested. Claims gathered at
//! login travel to the consent step in Hydra's login `context`.
//!
//! ## Identity service variant
//!
//! When a Kratos URL is configured, `/kratos/*` routes bridge Hydra to an Ory
//! Kratos browser session instead of an OAuth2 upstream.

pub mod api;
pub mod bridge;
pub mod cli;
pub mod hydra;
pub mod kratos;
pub mod provider;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// First seven characters of a commit hash, for logs and headers.
#[must_use]
pub fn short_commit(hash: &str) -> &str {
    let hash = hash.trim();
    hash.get(..7).unwrap_or(hash)
}
