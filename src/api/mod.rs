//! HTTP surface: routes, middleware and the server loop.

mod error;
pub mod forms;
pub mod handlers;
mod render;
pub mod session;
mod state;

pub use error::AppError;
pub use state::{AppConfig, AppState, MIN_SESSION_SECRET_BYTES};

use anyhow::Result;
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    routing::get,
    Extension, Router,
};
use std::{
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{debug_span, error, info, Span};
use ulid::Ulid;

use handlers::{admin, favicon, health, login, proposals, registrations};

const REQUEST_ID: &str = "x-request-id";

/// Every page of the site, with request ids and tracing applied.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(registrations::index))
        .route("/favicon.ico", get(favicon::favicon))
        .route("/health", get(health::health))
        .route(
            "/new",
            get(registrations::new_form).post(registrations::new_submit),
        )
        .route("/edit", get(registrations::edit))
        .route(
            "/edit/:id",
            get(registrations::edit_one_form).post(registrations::edit_one_submit),
        )
        .route(
            "/delete/:id",
            get(registrations::delete_form).post(registrations::delete_submit),
        )
        .route("/proposals", get(proposals::list))
        .route(
            "/submit_proposal",
            get(proposals::submit_form).post(proposals::submit),
        )
        .route("/edit_proposal", get(proposals::edit))
        .route(
            "/edit_proposal/:id",
            get(proposals::edit_one_form).post(proposals::edit_one_submit),
        )
        .route(
            "/delete_proposal/:id",
            get(proposals::delete_form).post(proposals::delete_submit),
        )
        .route("/admin/:action/:id", get(admin::moderate))
        .route("/login", get(login::login_page).post(login::login_submit))
        .route("/login/callback", get(login::callback))
        .route("/logout", get(login::logout))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state)),
        )
}

/// Serve the site on `port` until interrupted.
///
/// # Errors
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn new(port: u16, state: Arc<AppState>) -> Result<()> {
    let app = router(state);

    let listener = TcpListener::bind(SocketAddr::from((Ipv6Addr::UNSPECIFIED, port))).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let request_id = headers
        .get(REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, ?headers, request_id)
}
