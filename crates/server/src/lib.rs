mod auth;
mod error;
mod gate;
pub mod logger;
mod routes;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{Router, routing::get};
use axum_server::{Handle, tls_rustls::RustlsConfig};
use config::Config;
use impersonation::{ImpersonationGate, LogEventSink, PrincipalDirectory, StaticDirectory, StaticTokenAuthority};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use auth::{AuthLayer, AuthService};
pub use error::Error;
pub use gate::{ImpersonationLayer, ImpersonationService};

pub(crate) type Result<T> = std::result::Result<T, error::Error>;

pub struct ServeConfig {
    pub listen_address: SocketAddr,
    pub config: Config,
    /// Cancelling this token shuts the server down gracefully.
    pub shutdown_signal: CancellationToken,
    pub log_filter: String,
}

/// Builds the application router with authentication and the impersonation
/// gate backed by the configured static directory.
pub fn router(config: &Config) -> Router {
    let directory = Arc::new(StaticDirectory::from_config(&config.directory));

    if directory.is_empty() {
        log::warn!("The static directory has no users, every access token will be rejected");
    } else {
        log::debug!("Loaded {} users into the static directory", directory.len());
    }

    let directory: Arc<dyn PrincipalDirectory> = directory;
    let authority = Arc::new(StaticTokenAuthority::from_config(&config.directory, directory.clone()));

    let impersonation = &config.impersonation;

    let gate = impersonation.enabled.then(|| {
        ImpersonationGate::new(impersonation.clone(), authority.clone(), directory)
            .with_event_sink(Arc::new(LogEventSink))
    });

    Router::new()
        .route("/whoami", get(routes::whoami).post(routes::whoami))
        .layer(ImpersonationLayer::new(gate))
        .layer(AuthLayer::new(authority, impersonation.token_parameter.clone()))
        .route("/health", get(routes::health))
}

pub async fn serve(
    ServeConfig {
        listen_address,
        config,
        shutdown_signal,
        log_filter,
    }: ServeConfig,
) -> crate::Result<()> {
    logger::init(&log_filter);

    let app = router(&config);

    let listener = TcpListener::bind(listen_address).await.map_err(error::Error::Bind)?;

    match &config.server.tls {
        Some(tls_config) => {
            let rustls_config = RustlsConfig::from_pem_file(&tls_config.certificate, &tls_config.key)
                .await
                .map_err(|e| error::Error::Tls(e.to_string()))?;

            log::info!("Impersonation gate listening on https://{listen_address}");

            let handle = Handle::new();
            let shutdown_handle = handle.clone();

            tokio::spawn(async move {
                shutdown_signal.cancelled().await;
                shutdown_handle.graceful_shutdown(Some(Duration::from_secs(5)));
            });

            // Convert tokio listener to std listener for axum-server
            let std_listener = listener.into_std().map_err(error::Error::Bind)?;

            axum_server::from_tcp_rustls(std_listener, rustls_config)
                .handle(handle)
                .serve(app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .map_err(|e| error::Error::Server(std::io::Error::other(e)))?;
        }
        None => {
            log::info!("Impersonation gate listening on http://{listen_address}");

            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .with_graceful_shutdown(async move { shutdown_signal.cancelled().await })
                .await
                .map_err(error::Error::Server)?;
        }
    }

    log::info!("Server stopped");

    Ok(())
}
