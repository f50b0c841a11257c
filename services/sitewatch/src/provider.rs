//! Data provider contract consumed by the aggregation controller

use async_trait::async_trait;

use crate::models::{Camera, Community, Developer, Project};
use crate::services::ServiceConfig;

/// Asynchronous source of dashboard records.
///
/// Every call is an independent request; callers decide how failures are
/// isolated.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// All communities visible to the current user
    async fn communities(&self) -> crate::Result<Vec<Community>>;

    async fn community_by_id(&self, id: &str) -> crate::Result<Community>;

    async fn projects_by_developer(&self, developer_id: &str) -> crate::Result<Vec<Project>>;

    async fn service_config(&self) -> crate::Result<ServiceConfig>;

    async fn cameras_by_project(&self, project_id: &str) -> crate::Result<Vec<Camera>>;

    async fn developer(&self, developer_id: &str) -> crate::Result<Developer>;

    /// URL of the most recent image captured by a camera
    async fn last_image_url(
        &self,
        developer_tag: &str,
        project_tag: &str,
        camera_id: &str,
    ) -> crate::Result<String>;
}
