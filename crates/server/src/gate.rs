//! Runs the impersonation gate in front of the router.

use std::{
    fmt::Display,
    future::Future,
    net::SocketAddr,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    body::Body,
    extract::ConnectInfo,
    response::{IntoResponse, Response},
};
use context::RequestDetails;
use http::{HeaderMap, Request, StatusCode, header};
use impersonation::{ImpersonationGate, RequestParameters};
use tower::Layer;

#[derive(Clone)]
pub struct ImpersonationLayer(Arc<ImpersonationLayerInner>);

struct ImpersonationLayerInner {
    gate: Option<ImpersonationGate>,
}

impl ImpersonationLayer {
    /// Without a gate the layer passes every request through untouched.
    pub fn new(gate: Option<ImpersonationGate>) -> Self {
        Self(Arc::new(ImpersonationLayerInner { gate }))
    }
}

impl<Service> Layer<Service> for ImpersonationLayer
where
    Service: Send + Clone,
{
    type Service = ImpersonationService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        ImpersonationService {
            next,
            layer: self.0.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ImpersonationService<Service> {
    next: Service,
    layer: Arc<ImpersonationLayerInner>,
}

impl<Service> tower::Service<Request<Body>> for ImpersonationService<Service>
where
    Service: tower::Service<Request<Body>, Response = Response<Body>> + Send + Clone + 'static,
    Service::Future: Send,
    Service::Error: Display + 'static,
{
    type Response = Response<Body>;
    type Error = Service::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.next.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let remote_address = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(address)| *address);

        if let Some(address) = remote_address {
            req.extensions_mut().insert(RequestDetails::new(address));
        }

        let mut next = self.next.clone();
        let layer = self.layer.clone();

        Box::pin(async move {
            let Some(gate) = layer.gate.as_ref() else {
                return next.call(req).await;
            };

            let req = match collect_parameters(req, gate.config().max_form_bytes).await {
                Ok(req) => req,
                Err(status) => return Ok(status.into_response()),
            };

            gate.handle(req, |req| next.call(req)).await
        })
    }
}

/// Stores the query and form parameters of the request in its extensions.
///
/// Only form bodies with a declared length within `max_form_bytes` are read;
/// the buffered body is handed on unchanged.
async fn collect_parameters(req: Request<Body>, max_form_bytes: usize) -> Result<Request<Body>, StatusCode> {
    let mut parameters = RequestParameters::from_query(req.uri().query());

    let Some(length) = inspectable_form_length(req.headers(), max_form_bytes) else {
        let mut req = req;
        req.extensions_mut().insert(parameters);

        return Ok(req);
    };

    let (mut parts, body) = req.into_parts();

    let bytes = axum::body::to_bytes(body, length).await.map_err(|err| {
        log::debug!("Failed to read form body: {err}");
        StatusCode::BAD_REQUEST
    })?;

    parameters.extend_urlencoded(&bytes);
    parts.extensions.insert(parameters);

    Ok(Request::from_parts(parts, Body::from(bytes)))
}

fn inspectable_form_length(headers: &HeaderMap, max_form_bytes: usize) -> Option<usize> {
    let content_type = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    let mime = content_type.split(';').next()?.trim();

    if !mime.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
        return None;
    }

    let length = headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse::<usize>()
        .ok()?;

    (length <= max_form_bytes).then_some(length)
}

#[cfg(test)]
mod tests {
    use std::{
        convert::Infallible,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use axum::body::Body;
    use config::ImpersonationConfig;
    use context::{Identity, SecurityContext};
    use http::{Request, Response, StatusCode, header};
    use impersonation::{ImpersonationGate, StaticDirectory, StaticTokenAuthority};
    use tower::{Layer, ServiceExt};

    use super::ImpersonationLayer;

    fn bob() -> Identity {
        Identity::with_authorities("bob", ["ROLE_ADMIN"])
    }

    fn layer(config: ImpersonationConfig) -> ImpersonationLayer {
        let directory = Arc::new(
            StaticDirectory::new()
                .with_user(bob())
                .with_user(Identity::with_authorities("alice", ["ROLE_USER"])),
        );
        let authority = StaticTokenAuthority::new(directory.clone()).with_token("bob-token", "bob");

        ImpersonationLayer::new(Some(ImpersonationGate::new(config, Arc::new(authority), directory)))
    }

    /// Sends the request through the layer; returns status, "username|body" and the number of downstream calls.
    async fn send(layer: ImpersonationLayer, mut request: Request<Body>) -> (StatusCode, String, usize) {
        request.extensions_mut().insert(SecurityContext::new(bob()));

        let calls = Arc::new(AtomicUsize::new(0));
        let downstream_calls = calls.clone();

        let service = layer.layer(tower::service_fn(move |req: Request<Body>| {
            let calls = downstream_calls.clone();

            async move {
                calls.fetch_add(1, Ordering::SeqCst);

                let username = req
                    .extensions()
                    .get::<SecurityContext>()
                    .and_then(SecurityContext::authentication)
                    .map(|identity| identity.username().to_owned())
                    .unwrap_or_default();

                let body = axum::body::to_bytes(req.into_body(), usize::MAX).await.unwrap();
                let body = String::from_utf8(body.to_vec()).unwrap();

                Ok::<_, Infallible>(Response::new(Body::from(format!("{username}|{body}"))))
            }
        }));

        let response = service.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();

        (
            status,
            String::from_utf8(body.to_vec()).unwrap(),
            calls.load(Ordering::SeqCst),
        )
    }

    fn form(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/whoami")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded; charset=utf-8")
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn query_parameters_switch_identity() {
        let request = Request::builder()
            .uri("/whoami?impersonate=alice&access_token=bob-token")
            .body(Body::empty())
            .unwrap();

        let (status, body, calls) = send(layer(ImpersonationConfig::default()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "alice|");
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn form_parameters_switch_identity_and_body_survives() {
        let request = form("impersonate=alice&access_token=bob-token&note=hi");

        let (status, body, calls) = send(layer(ImpersonationConfig::default()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "alice|impersonate=alice&access_token=bob-token&note=hi");
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn oversized_form_is_not_inspected() {
        let config = ImpersonationConfig {
            max_form_bytes: 8,
            ..ImpersonationConfig::default()
        };

        let (status, body, calls) = send(layer(config), form("impersonate=alice&access_token=bob-token")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "bob|impersonate=alice&access_token=bob-token");
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn failed_switch_still_reaches_downstream() {
        let request = Request::builder()
            .uri("/whoami?impersonate=mallory&access_token=bob-token")
            .body(Body::empty())
            .unwrap();

        let (status, body, calls) = send(layer(ImpersonationConfig::default()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "bob|");
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn disabled_layer_passes_through() {
        let request = Request::builder()
            .uri("/whoami?impersonate=alice&access_token=bob-token")
            .body(Body::empty())
            .unwrap();

        let (status, body, calls) = send(ImpersonationLayer::new(None), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "bob|");
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn truncated_form_body_is_a_bad_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/whoami")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::CONTENT_LENGTH, 4_usize)
            .body(Body::from("impersonate=alice"))
            .unwrap();

        let (status, _, calls) = send(layer(ImpersonationConfig::default()), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(calls, 0);
    }

    #[derive(Default)]
    struct RecordingSink(std::sync::Mutex<Vec<context::SwitchEvent>>);

    impl impersonation::EventSink for RecordingSink {
        fn publish(&self, event: context::SwitchEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    #[tokio::test]
    async fn peer_address_is_recorded_on_switch_events() {
        let directory = Arc::new(
            StaticDirectory::new()
                .with_user(bob())
                .with_user(Identity::with_authorities("alice", ["ROLE_USER"])),
        );
        let authority = StaticTokenAuthority::new(directory.clone()).with_token("bob-token", "bob");
        let sink = Arc::new(RecordingSink::default());

        let gate = ImpersonationGate::new(ImpersonationConfig::default(), Arc::new(authority), directory)
            .with_event_sink(sink.clone());

        let peer: std::net::SocketAddr = "203.0.113.5:6000".parse().unwrap();

        let mut request = Request::builder()
            .uri("/whoami?impersonate=alice&access_token=bob-token")
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(axum::extract::ConnectInfo(peer));

        let (status, body, calls) = send(ImpersonationLayer::new(Some(gate)), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "alice|");
        assert_eq!(calls, 1);

        let events = sink.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].details().remote_address, Some(peer));
    }
}
