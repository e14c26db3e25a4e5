use axum::{
    Extension, Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use context::{SecurityContext, SlotState};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct WhoAmI<'a> {
    username: &'a str,
    roles: Vec<&'a str>,
    impersonated_by: Option<&'a str>,
}

/// Reports the identity the request ended up running as.
pub(crate) async fn whoami(context: Option<Extension<SecurityContext>>) -> Response {
    let Some(Extension(context)) = context else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let (identity, impersonated_by) = match context.state() {
        SlotState::Unset => return StatusCode::UNAUTHORIZED.into_response(),
        SlotState::Primary(identity) => (identity, None),
        SlotState::Substitute { identity, basis } => (identity, Some(basis.username())),
    };

    Json(WhoAmI {
        username: identity.username(),
        roles: identity.authorities().collect(),
        impersonated_by,
    })
    .into_response()
}

pub(crate) async fn health() -> StatusCode {
    StatusCode::OK
}
