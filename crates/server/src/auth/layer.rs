use std::{
    fmt::Display,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use super::error::AuthError;
use axum::{
    Json,
    body::Body,
    response::{IntoResponse, Response},
};
use context::SecurityContext;
use http::{HeaderValue, Request, StatusCode, request::Parts};
use impersonation::{RequestParameters, TokenAuthority};
use serde::Serialize;

use tower::Layer;

/// Upstream authentication: turns the caller's access token into the
/// request's primary identity.
#[derive(Clone)]
pub struct AuthLayer(Arc<AuthLayerInner>);

struct AuthLayerInner {
    authority: Arc<dyn TokenAuthority>,
    token_parameter: String,
}

impl AuthLayer {
    pub fn new(authority: Arc<dyn TokenAuthority>, token_parameter: impl Into<String>) -> Self {
        Self(Arc::new(AuthLayerInner {
            authority,
            token_parameter: token_parameter.into(),
        }))
    }
}

impl<Service> Layer<Service> for AuthLayer
where
    Service: Send + Clone,
{
    type Service = AuthService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        AuthService {
            next,
            layer: self.0.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthService<Service> {
    next: Service,
    layer: Arc<AuthLayerInner>,
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for AuthService<Service>
where
    Service: tower::Service<Request<ReqBody>, Response = Response<Body>> + Send + Clone + 'static,
    Service::Future: Send,
    Service::Error: Display + 'static,
    ReqBody: http_body::Body + Send + 'static,
{
    type Response = http::Response<Body>;
    type Error = Service::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.next.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let mut next = self.next.clone();
        let layer = self.layer.clone();

        Box::pin(async move {
            // Something further out already authenticated this request.
            if req.extensions().get::<SecurityContext>().is_some() {
                return next.call(req).await;
            }

            let (mut parts, body) = req.into_parts();

            let Some(token) = access_token(&parts, &layer.token_parameter) else {
                parts.extensions.insert(SecurityContext::default());
                return next.call(Request::from_parts(parts, body)).await;
            };

            match layer.authority.resolve(&token) {
                Ok(identity) => {
                    log::debug!("Authenticated request as '{}'", identity.username());

                    parts.extensions.insert(SecurityContext::new(identity));
                    next.call(Request::from_parts(parts, body)).await
                }
                Err(err) => Ok(error_response(AuthError::from(err))),
            }
        })
    }
}

/// Bearer token from the `Authorization` header, falling back to the token
/// query parameter.
fn access_token(parts: &Parts, token_parameter: &str) -> Option<String> {
    let from_header = parts
        .headers
        .get(http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim().to_owned())
        .filter(|token| !token.is_empty());

    from_header.or_else(|| {
        RequestParameters::from_query(parts.uri.query())
            .get(token_parameter)
            .filter(|token| !token.is_empty())
            .map(str::to_owned)
    })
}

fn error_response(auth_error: AuthError) -> Response<Body> {
    #[derive(Serialize)]
    struct Content {
        error: &'static str,
    }

    let (status_code, error) = match auth_error {
        AuthError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
        AuthError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
    };

    let mut response = (status_code, Json(Content { error })).into_response();

    if status_code == StatusCode::UNAUTHORIZED {
        response
            .headers_mut()
            .insert(http::header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }

    response
}
