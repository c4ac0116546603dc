use super::handlers::{auth, consent, health, kratos, login};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

/// Document for every route, including the optional Kratos bridge.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().merge(kratos_router()).split_for_parts();
    openapi
}

/// Routes that are always served.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(login::login))
        .routes(routes!(consent::consent))
        .routes(routes!(auth::begin))
        .routes(routes!(auth::callback));

    router.get_openapi_mut().tags = Some(
        [
            ("hydra", "Hydra login and consent endpoints"),
            ("auth", "Upstream OAuth2 provider legs"),
            ("kratos", "Kratos session bridge, served when configured"),
        ]
        .into_iter()
        .map(|(name, description)| {
            let mut tag = Tag::new(name);
            tag.description = Some(description.to_string());
            tag
        })
        .collect(),
    );

    router
}

/// Routes served only when a Kratos URL is configured.
pub(crate) fn kratos_router() -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(kratos::login))
        .routes(routes!(kratos::callback))
        .routes(routes!(kratos::consent))
}

/// Title, version, contact and license come from the package manifest.
fn cargo_openapi() -> utoipa::openapi::OpenApi {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(non_blank(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    // First author wins; Cargo joins them with `;`.
    let author = env!("CARGO_PKG_AUTHORS").split(';').next().unwrap_or_default();
    info.contact = match parse_author(author) {
        (None, None) => None,
        (name, email) => {
            let mut contact = Contact::new();
            contact.name = name.map(str::to_string);
            contact.email = email.map(str::to_string);
            Some(contact)
        }
    };

    info.license = non_blank(env!("CARGO_PKG_LICENSE")).map(|spdx| {
        let mut license = License::new(spdx);
        license.identifier = Some(spdx.to_string());
        license
    });

    OpenApiBuilder::new().info(info).build()
}

fn non_blank(value: &'static str) -> Option<&'static str> {
    Some(value.trim()).filter(|v| !v.is_empty())
}

/// Split `Name <email>`; either half may be missing.
fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    let (name, email) = author
        .split_once('<')
        .map_or((author, ""), |(name, rest)| (name, rest.trim_end_matches('>')));
    let (name, email) = (name.trim(), email.trim());
    (
        (!name.is_empty()).then_some(name),
        (!email.is_empty()).then_some(email),
    )
}
