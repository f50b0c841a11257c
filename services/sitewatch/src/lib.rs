//! Sitewatch - construction project monitoring dashboard
//!
//! Aggregates projects, cameras and service configuration from the dashboard
//! backend into one view-ready state, and keeps a map widget's markers in
//! line with it.

pub mod aggregation;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod io;
pub mod map;
pub mod models;
pub mod navigation;
pub mod probe;
pub mod progress;
pub mod provider;
pub mod services;
pub mod session;
pub mod state;
#[cfg(any(test, feature = "mock"))]
pub mod testing;
pub mod theme;
pub mod view;

pub use config::{load_config, Config};
pub use error::{Result, SitewatchError};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::aggregation::{Aggregator, DashboardEvent, RefreshOutcome};
use crate::api::HttpDataProvider;
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::navigation::TracingNavigator;
use crate::session::{new_token_handle, HttpSession, LoginForm, LoginOutcome};

/// Build an HTTP client honouring the configured request timeout
pub fn http_client(config: &Config) -> Result<Arc<dyn HttpClient>> {
    Ok(Arc::new(ReqwestHttpClient::with_timeout(
        config.api.request_timeout,
    )?))
}

/// Run the dashboard service with the given configuration
pub async fn run(config: Config) -> Result<()> {
    let http = http_client(&config)?;
    let token = new_token_handle();
    let cancel = CancellationToken::new();

    // Log in if credentials were provided
    if let (Some(email), Some(password)) = (&config.session.email, &config.session.password) {
        let session = HttpSession::new(&config.api.base_url, Arc::clone(&http), Arc::clone(&token));
        let mut form = LoginForm::new(email, password);
        match form.submit(&session, &TracingNavigator).await {
            LoginOutcome::Authenticated => tracing::info!("Logged in as {}", email),
            LoginOutcome::Rejected(message) => return Err(SitewatchError::Auth(message)),
        }
    }

    let provider = Arc::new(HttpDataProvider::new(
        &config.api.base_url,
        Arc::clone(&http),
        token,
    ));
    let state = state::new_state_handle(
        &config.dashboard.default_community,
        &config.dashboard.community_image(&config.dashboard.default_community),
    );
    let aggregator = Arc::new(Aggregator::new(
        provider,
        Arc::clone(&state),
        config.dashboard.clone(),
    ));

    // Log dashboard events as they arrive
    let mut events = aggregator.subscribe();
    let cancel_for_events = cancel.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel_for_events.cancelled() => break,
                event = events.recv() => match event {
                    Ok(DashboardEvent::LoadFailed { message, .. }) => {
                        tracing::error!("Dashboard load failed: {}", message)
                    }
                    Ok(event) => tracing::debug!("Dashboard event: {:?}", event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("Dropped {} dashboard events", n)
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    });

    let outcome = aggregator
        .refresh(config.dashboard.developer_id.as_deref())
        .await;
    aggregator.wait_for_images().await;
    {
        let s = state.read().await;
        match outcome {
            RefreshOutcome::Completed { .. } => tracing::info!(
                "{}: {} projects, {} cameras",
                s.community_name,
                s.projects.len(),
                s.camera_count()
            ),
            _ => tracing::warn!(
                "Dashboard not loaded: {}",
                s.error.as_deref().unwrap_or("superseded")
            ),
        }
    }

    if !config.dashboard.status_server.enabled {
        cancel.cancel();
        return Ok(());
    }

    // Setup shutdown handler
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
        }
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    let port = config.dashboard.status_server.port;
    let router = dashboard::build_router(Arc::clone(&state));
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Status server listening on http://{}", addr);

    let cancel_for_server = cancel.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            cancel_for_server.cancelled().await;
        })
        .await?;

    tracing::info!("Sitewatch stopped");
    Ok(())
}
