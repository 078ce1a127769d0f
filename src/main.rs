//! Collective Settings Backend
//!
//! REST backend for a collective's fiscal-host panel and the payment popup of
//! its recurring contributions.

mod api;
mod config;
mod errors;
mod format;
mod host;
mod models;
mod notify;
mod payment;
mod session;
mod upstream;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use notify::NotificationFeed;
use session::{Collaborators, SettingsShell};
use upstream::{InMemoryDirectory, LocalTokenizer};

/// Notifications kept until the UI drains them.
const NOTIFICATION_CAPACITY: usize = 100;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub shell: Arc<SettingsShell>,
    pub notifications: Arc<NotificationFeed>,
}

impl AppState {
    /// Wire the shell to the in-memory directory and the local tokenizer.
    pub fn new(config: &Config, directory: InMemoryDirectory) -> Self {
        let directory = Arc::new(directory);
        let notifications = Arc::new(NotificationFeed::new(NOTIFICATION_CAPACITY));
        let shell = SettingsShell::new(
            Collaborators {
                directory: directory.clone(),
                mutations: directory,
                tokenizer: Arc::new(LocalTokenizer::new(config.tokenizer_enabled)),
                notifier: notifications.clone(),
            },
            config.request_timeout,
        );
        Self {
            shell: Arc::new(shell),
            notifications,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Collective Settings Backend");
    tracing::info!("Fixture path: {:?}", config.fixture_path);
    tracing::info!("Request timeout: {:?}", config.request_timeout);
    tracing::info!("Bind address: {}", config.bind_addr);

    if !config.tokenizer_enabled {
        tracing::warn!("Card tokenizer disabled (SETTINGS_TOKENIZER_ENABLED). New cards cannot be added!");
    }

    let directory = InMemoryDirectory::from_fixture_file(&config.fixture_path).await?;
    let state = AppState::new(&config, directory);

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Host panel
        .route("/collectives/{id}/host", get(api::get_host_panel))
        .route("/collectives/{id}/host/assign", post(api::assign_host))
        .route("/collectives/{id}/host/withdraw", post(api::request_withdraw))
        .route("/collectives/{id}/host/remove", post(api::request_remove))
        .route("/collectives/{id}/host/confirm", post(api::confirm_dialog))
        .route("/collectives/{id}/host/cancel", post(api::cancel_dialog))
        .route("/collectives/{id}/host/display-mode", put(api::set_display_mode))
        .route("/collectives/{id}/host/suggestions", get(api::suggested_hosts))
        // Payment popups
        .route("/payment-popups", post(api::open_popup))
        .route(
            "/payment-popups/{id}",
            get(api::get_popup).delete(api::dismiss_popup),
        )
        .route("/payment-popups/{id}/selection", put(api::select_option))
        .route(
            "/payment-popups/{id}/add-method",
            post(api::start_adding_method).delete(api::cancel_adding_method),
        )
        .route("/payment-popups/{id}/card-form", put(api::update_card_form))
        .route(
            "/payment-popups/{id}/add-method/submit",
            post(api::submit_new_method),
        )
        .route("/payment-popups/{id}/confirm", post(api::confirm_selection))
        // Notifications
        .route("/notifications", get(api::drain_notifications));

    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
