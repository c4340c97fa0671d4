use anyhow::Result;
use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod config;
mod error;
mod form;
mod google;
mod screen;
mod session;
mod state;
mod store;
mod types;

use crate::{config::Config, session::Session, store::KvStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: Arc<Session>,
}

pub fn app(app_state: AppState) -> Router {
    // Provider calls already time out on their own; this bounds the whole request
    let request_timeout = Duration::from_secs(app_state.config.request_timeout_secs * 2);

    Router::new()
        // Sign-in screen
        .route("/", get(screen::index))
        .route("/auth/signin", post(auth::sign_in))
        .route("/auth/callback", get(auth::callback))
        .route("/auth/signout", post(auth::sign_out))
        .route("/auth/error/dismiss", post(auth::dismiss_error))
        .route("/auth/status", get(auth::status))
        // Username form
        .route("/username", get(form::show).post(form::submit))
        // Health check
        .route("/health", get(health_check))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "google_signin=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env()?);
    info!("Starting Google sign-in screen");

    // Shared client for token exchange and userinfo calls
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .user_agent(concat!("google-signin/", env!("CARGO_PKG_VERSION")))
        .build()?;

    // Restore any stored profile before serving
    let store = KvStore::new(&config.store_path);
    info!("Profile will be persisted to: {}", store.path().display());
    let session = Arc::new(Session::restore(config.clone(), http_client, store));

    let app_state = AppState { config, session };

    let addr = app_state.config.server_address();
    info!("Listening on {}", addr);

    println!("\nGoogle Sign-In");
    println!("==============");
    println!("Sign-in screen: http://localhost:{}/", app_state.config.port);
    println!(
        "Username form:  http://localhost:{}/username",
        app_state.config.port
    );
    println!("Redirect URI:   {}", app_state.config.redirect_uri);
    if !app_state.config.is_request_ready() {
        println!("\nGOOGLE_CLIENT_ID is not set; the sign-in button stays disabled.");
    }
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(app_state)).await?;

    Ok(())
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
pub(crate) fn test_state(base_url: &str, dir: &std::path::Path) -> AppState {
    let config = Arc::new(config::test_config(base_url, dir.join("store.json")));
    let store = KvStore::new(&config.store_path);
    let session = Arc::new(Session::restore(
        config.clone(),
        reqwest::Client::new(),
        store,
    ));
    AppState { config, session }
}
