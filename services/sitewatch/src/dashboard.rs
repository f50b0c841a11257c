//! Read-only status server with JSON API endpoints

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::progress::progress_percentage;
use crate::state::StateHandle;

/// Status server application state
#[derive(Clone)]
pub struct StatusServerState {
    pub state: StateHandle,
}

/// Build the status server axum router
pub fn build_router(state: StateHandle) -> Router {
    let server_state = StatusServerState { state };

    Router::new()
        .route("/api/dashboard", get(dashboard_handler))
        .route("/health", get(health_handler))
        .with_state(server_state)
}

async fn dashboard_handler(State(server): State<StatusServerState>) -> impl IntoResponse {
    let state = server.state.read().await;

    let projects: Vec<serde_json::Value> = state
        .projects
        .iter()
        .map(|p| {
            let services = state
                .project_service_statuses
                .get(&p.id)
                .copied()
                .unwrap_or_default();
            serde_json::json!({
                "id": p.id,
                "name": p.name,
                "project_tag": p.project_tag,
                "image": p.image,
                "days_completed": p.days_completed,
                "total_days": p.total_days,
                "progress_percentage": progress_percentage(p.days_completed, p.total_days),
                "has_location": p.position().is_some(),
                "services": services,
                "cameras": state.cameras(&p.id),
            })
        })
        .collect();

    axum::Json(serde_json::json!({
        "generation": state.generation,
        "loading": state.loading,
        "error": state.error,
        "community": {
            "developer_id": state.developer_id,
            "name": state.community_name,
            "image": state.community_image,
        },
        "camera_count": state.camera_count(),
        "projects": projects,
    }))
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}
