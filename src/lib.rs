//! Vidhub is a lightweight account and channel manager for a video
//! sharing platform.

#[forbid(unsafe_code)]
#[deny(missing_docs, unused_mut)]
mod channel;
mod crypto;
mod database;
pub mod error;
mod history;
mod router;
mod session;
mod token;
mod user;

pub mod config;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{Method, StatusCode, header};
use axum::routing::post;
use axum::Router;
use error::ServerError;
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
    state: Option<&AppState>,
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    match state {
        Some(state) => {
            make_request_as(state, "admin", app, method, path, body).await
        },
        None => request(app, method, path, body, String::default()).await,
    }
}

/// Same as [`make_request`], authenticated as an arbitrary user.
#[cfg(test)]
pub async fn make_request_as(
    state: &AppState,
    user_id: &str,
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    let token = state
        .token
        .create_access(user_id)
        .expect("cannot create JWT");

    request(app, method, path, body, format!("Bearer {token}")).await
}

#[cfg(test)]
async fn request(
    app: Router,
    method: Method,
    path: &str,
    body: String,
    authorization: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    app.oneshot(
        Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, authorization)
            .body(axum::body::Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub db: database::Database,
    pub users: user::UserService,
    pub sessions: session::SessionManager,
    pub token: token::TokenManager,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
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
        // Remove senstive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    Router::new()
        // `POST /create` goes to `create`.
        .route("/create", post(router::create::handler))
        // `POST /login` goes to `login`.
        .route("/login", post(router::login::handler))
        // POST `/oauth/token`
        .route("/oauth/token", post(router::users::refresh_token::handler))
        .nest("/users", router::users::router(state.clone()))
        .with_state(state)
        .layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state() -> Result<AppState, Box<dyn std::error::Error>>
{
    // read configuration file. let it in memory.
    let config = config::Configuration::default().read()?;

    let db = match config.postgres {
        Some(ref config) => database::Database::connect(config).await?,
        None => {
            tracing::error!("missing `postgres` entry on `config.yaml` file");
            std::process::exit(0);
        },
    };

    // execute migrations scripts on start.
    sqlx::migrate!().run(&db.postgres).await?;

    let pwd = Arc::new(crypto::PasswordManager::new(config.argon2.clone())?);

    // handle token signing.
    let Some(secrets) = &config.token else {
        tracing::warn!("missing `token` entry on `config.yaml` file");
        std::process::exit(0);
    };
    let token = token::TokenManager::new(
        &config.url,
        &secrets.access_secret,
        &secrets.refresh_secret,
    );

    let sessions = session::SessionManager::new(
        token.clone(),
        session::SessionStore::new(db.postgres.clone()),
    );
    let users = user::UserService::new(db.postgres.clone(), pwd);

    Ok(AppState {
        config,
        db,
        users,
        sessions,
        token,
    })
}
