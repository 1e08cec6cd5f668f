mod admin;
mod auth;
mod backend;
mod config;
mod contact;
mod error;
mod models;
mod orchestrator;
mod presenter;
mod progress;
mod request;
mod routes;
mod templates;
#[cfg(test)]
mod testing;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use routes::AppState;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{fmt, EnvFilter};

use crate::{
    auth::{AuthContext, DemoIdentityProvider, FirebaseIdentityProvider, IdentityProvider},
    backend::{HttpBackend, WebsiteBackend},
    config::Settings,
    orchestrator::Orchestrator,
    presenter::ResultPresenter,
    progress::ProgressSimulator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let settings = Settings::from_env().context("loading settings")?;
    tracing::info!(backend = %settings.backend_url, "Using website backend");

    let backend: Arc<dyn WebsiteBackend> = Arc::new(
        HttpBackend::new(settings.backend_url.clone(), settings.backend_timeout)
            .context("building backend client")?,
    );

    let provider: Arc<dyn IdentityProvider> = match &settings.firebase_api_key {
        Some(key) => {
            tracing::info!("Using Firebase identity provider with key {}...", key.chars().take(6).collect::<String>());
            Arc::new(FirebaseIdentityProvider::new(key.clone(), settings.firebase_api_base.clone()))
        }
        None => {
            tracing::info!("Using demo mode - accounts live in memory only");
            Arc::new(DemoIdentityProvider::new())
        }
    };

    let auth = Arc::new(AuthContext::start(provider, backend.clone()));
    let wizard = Orchestrator::new(backend.clone(), ProgressSimulator::new(settings.progress_interval));
    let state = AppState {
        wizard: wizard.clone(),
        auth: auth.clone(),
        backend: backend.clone(),
        presenter: Arc::new(ResultPresenter::new(backend)),
        admin_email: Arc::from(settings.admin_email.as_str()),
    };

    let app = routes::router(state).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for shutdown signal: {}", e);
            }
        })
        .await
        .context("serving")?;

    if wizard.is_generating() {
        tracing::warn!("shutting down with a generation still in flight");
    }
    wizard.dispose();
    auth.shutdown();
    tracing::info!("👋 Shut down");
    Ok(())
}
