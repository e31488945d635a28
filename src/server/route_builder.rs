use axum::{Extension, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api::{self, AppState};
use crate::database;
use crate::middleware::rate_limit::create_rate_limit_layer;
use crate::services::file_storage::FileStorage;
use crate::services::whatsapp::WhatsAppClient;
use crate::tasks::cleanup::{CleanupTask, start_cleanup_task};
use crate::utils::config::AppConfig;
use crate::utils::error::expose_internal_details;
use crate::utils::helpers::ProxyTrust;

/// A fully wired application: the router plus what must be shut down with it.
pub struct App {
    pub router: Router,
    pub state: Arc<AppState>,
    pub cleanup: CleanupTask,
}

impl App {
    /// Stops the sweep, then closes the store.
    pub async fn shutdown(self) {
        self.cleanup.shutdown().await;
        self.state.store.close().await;
        tracing::info!("Application shut down");
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let config = state.config.clone();

    let mut api_routes = api::routes(state.clone());
    match create_rate_limit_layer(config.rate_limit_window, config.rate_limit_max_requests) {
        Some(layer) => {
            tracing::info!(
                "API rate limit: {} requests per {:?}",
                config.rate_limit_max_requests,
                config.rate_limit_window
            );
            api_routes = api_routes.layer(layer);
        }
        None => tracing::warn!("API rate limiting disabled"),
    }

    Router::new()
        .nest("/api", api_routes)
        .route("/health", axum::routing::get(api::health_check))
        .merge(api::share_page::routes(state))
        .fallback_service(ServeDir::new(&config.public_dir))
        .layer(Extension(ProxyTrust(config.trust_proxy)))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn build_app(config: AppConfig) -> anyhow::Result<App> {
    expose_internal_details(config.is_development());

    let store = database::create_store(&config.database_url).await?;
    tracing::info!("Database connected ({})", store.backend_name());

    let storage = FileStorage::new(&config.upload_dir);
    storage.ensure_root().await?;
    tracing::info!("Upload directory ready: {:?}", storage.root());

    let whatsapp = WhatsAppClient::new(&config.whatsapp);
    if !whatsapp.is_configured() {
        tracing::info!("WhatsApp credentials not set; auto-replies will fail");
    }

    let cleanup = start_cleanup_task(store.clone(), config.cleanup_interval);
    tracing::info!("Share cleanup task started (every {:?})", config.cleanup_interval);

    let state = Arc::new(AppState {
        store,
        storage,
        config: Arc::new(config),
        whatsapp,
    });

    Ok(App {
        router: build_router(state.clone()),
        state,
        cleanup,
    })
}
