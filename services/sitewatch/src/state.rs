//! Shared dashboard state: projects, cameras and service statuses

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::models::{Camera, Project};
use crate::services::{ProjectServiceStatus, ServiceConfig, ServiceKind};

/// View-ready state produced by the aggregation controller
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardState {
    /// Refresh cycle that owns the current contents
    pub generation: u64,
    pub loading: bool,
    pub error: Option<String>,
    pub developer_id: Option<String>,
    pub community_name: String,
    pub community_image: String,
    pub projects: Vec<Project>,
    pub project_cameras: HashMap<String, Vec<Camera>>,
    pub project_service_statuses: HashMap<String, ProjectServiceStatus>,
    #[serde(skip)]
    pub service_config: Option<ServiceConfig>,
}

impl DashboardState {
    pub fn new(community_name: &str, community_image: &str) -> Self {
        Self {
            community_name: community_name.to_string(),
            community_image: community_image.to_string(),
            ..Self::default()
        }
    }

    /// Drop everything a refresh cycle produced
    pub fn clear_data(&mut self) {
        self.projects.clear();
        self.project_cameras.clear();
        self.project_service_statuses.clear();
        self.service_config = None;
    }

    pub fn service_status(&self, project_id: &str, service: ServiceKind) -> bool {
        self.project_service_statuses
            .get(project_id)
            .map(|status| status.get(service))
            .unwrap_or(false)
    }

    pub fn cameras(&self, project_id: &str) -> &[Camera] {
        self.project_cameras
            .get(project_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn project(&self, project_id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == project_id)
    }

    /// Set a camera's image in place, returning false if the camera is gone
    pub fn patch_camera_image(&mut self, project_id: &str, camera_id: &str, url: &str) -> bool {
        let Some(camera) = self
            .project_cameras
            .get_mut(project_id)
            .and_then(|cameras| cameras.iter_mut().find(|c| c.id == camera_id))
        else {
            return false;
        };
        camera.image = Some(url.to_string());
        camera.thumbnail = Some(url.to_string());
        true
    }

    pub fn camera_count(&self) -> usize {
        self.project_cameras.values().map(Vec::len).sum()
    }
}

/// Thread-safe shared state handle
pub type StateHandle = Arc<RwLock<DashboardState>>;

pub fn new_state_handle(community_name: &str, community_image: &str) -> StateHandle {
    Arc::new(RwLock::new(DashboardState::new(
        community_name,
        community_image,
    )))
}
