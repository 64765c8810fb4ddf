//! Accounts is a user account API: registration, login, profile and
//! password recovery.

#![forbid(unsafe_code)]
mod crypto;
mod database;
pub mod error;
mod i18n;
mod limiter;
mod password;
mod router;
mod schema;
pub mod telemetry;
mod totp;
mod user;

pub mod config;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{Method, StatusCode, header};
use axum::routing::{get, post};
use axum::{Router, middleware as AxumMiddleware};
use error::ServerError;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    token: Option<&str>,
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub db: database::Database,
    pub crypto: Arc<crypto::Crypto>,
    pub metrics: Option<PrometheusHandle>,
    pub limiter: Arc<limiter::RateLimiter>,
}

impl AppState {
    /// User operations bound to this state.
    pub fn users(&self) -> user::UserService<'_> {
        user::UserService::new(&self.config, &self.db, &self.crypto)
    }
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Mark sensitive headers before they reach the trace span.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(10)))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        // `GET /metrics` exposes Prometheus metrics, if enabled.
        .route("/metrics", get(router::status::metrics))
        // `POST /register` goes to `register`.
        .route("/register", post(router::register::handler))
        // `POST /login` goes to `login`.
        .route("/login", post(router::login::handler))
        // Forgotten password recovery.
        .route("/password/forgot", post(router::password::forgot))
        .route("/password/forgot/verify", post(router::password::verify))
        .route("/password/reset", post(router::password::reset))
        .nest("/users", router::users::router(state.clone()))
        .with_state(state)
        .route_layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state(
    config: Arc<config::Configuration>,
) -> Result<AppState, Box<dyn std::error::Error>> {
    let db = match config.postgres {
        Some(ref postgres) => {
            let pool = database::Database::connect(
                &postgres.address,
                postgres
                    .username
                    .as_deref()
                    .unwrap_or(database::DEFAULT_CREDENTIALS),
                postgres
                    .password
                    .as_deref()
                    .unwrap_or(database::DEFAULT_CREDENTIALS),
                postgres
                    .database
                    .as_deref()
                    .unwrap_or(database::DEFAULT_DATABASE_NAME),
                postgres.pool_size.unwrap_or(database::DEFAULT_POOL_SIZE),
            )
            .await?;

            // execute migrations scripts on start.
            sqlx::migrate!().run(&pool).await?;
            schema::TableSchema::users(&config.birth_year)
                .apply(&pool)
                .await?;

            database::Database::postgres(pool)
        },
        None => {
            tracing::warn!(
                "missing `postgres` entry on `config.yaml` file, data is kept in memory"
            );
            database::Database::memory(config.birth_year)
        },
    };

    let crypto = Arc::new(crypto::Crypto::new(config.argon2.clone())?);
    let limiter = Arc::new(limiter::RateLimiter::from(&config.rate_limit));

    if config.password_reset.expose_otp_secret {
        tracing::warn!("OTP secrets are returned by `POST /password/forgot`");
    }

    let metrics = match config.telemetry {
        Some(ref telemetry) if telemetry.prometheus => {
            Some(telemetry::setup_metrics_recorder()?)
        },
        _ => None,
    };

    Ok(AppState {
        config,
        db,
        crypto,
        metrics,
        limiter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::tests::{signed_in, state};
    use crate::telemetry::tests::Logs;

    #[tokio::test]
    async fn test_authorization_not_traced() {
        let logs = Logs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let state = state();
        let (_, token) = signed_in(&state, "jane").await;

        let response =
            make_request(Some(&token), app(state), Method::GET, "/users/@me", String::default())
                .await;
        assert_eq!(response.status(), StatusCode::OK);

        let output = logs.output();
        assert!(output.contains("started processing request"));
        assert!(output.contains("authorization"));
        assert!(!output.contains(&token));
    }
}
