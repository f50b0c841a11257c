//! Dashboard backend client

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::io::{HttpClient, HttpResponse};
use crate::models::{Camera, Community, Developer, Project};
use crate::provider::DataProvider;
use crate::services::ServiceConfig;
use crate::session::TokenHandle;

/// Latest-image endpoint response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LastImageResponse {
    #[serde(default)]
    image_url: Option<String>,
}

/// [`DataProvider`] backed by the dashboard REST API
pub struct HttpDataProvider {
    base_url: String,
    http: Arc<dyn HttpClient>,
    token: TokenHandle,
}

impl std::fmt::Debug for HttpDataProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDataProvider")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpDataProvider {
    pub fn new(base_url: &str, http: Arc<dyn HttpClient>, token: TokenHandle) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        tracing::debug!("Created HttpDataProvider at {}", base_url);
        Self {
            base_url,
            http,
            token,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> crate::Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let token = self.token.read().await.clone();
        let bearer = token.map(|t| format!("Bearer {}", t));
        let headers: Vec<(&str, &str)> = bearer
            .as_deref()
            .map(|b| vec![("Authorization", b)])
            .unwrap_or_default();

        let response = self.http.get(&url, &headers).await?;
        decode(response)
    }
}

fn decode<T: DeserializeOwned>(response: HttpResponse) -> crate::Result<T> {
    if !response.is_success() {
        return Err(crate::SitewatchError::Status {
            status: response.status,
            body: response.body,
        });
    }
    Ok(serde_json::from_str(&response.body)?)
}

#[async_trait]
impl DataProvider for HttpDataProvider {
    async fn communities(&self) -> crate::Result<Vec<Community>> {
        self.get_json("/api/developers").await
    }

    async fn community_by_id(&self, id: &str) -> crate::Result<Community> {
        self.get_json(&format!("/api/developers/{}", id)).await
    }

    async fn projects_by_developer(&self, developer_id: &str) -> crate::Result<Vec<Project>> {
        self.get_json(&format!("/api/projects/developer/{}", developer_id))
            .await
    }

    async fn service_config(&self) -> crate::Result<ServiceConfig> {
        self.get_json("/api/service-config").await
    }

    async fn cameras_by_project(&self, project_id: &str) -> crate::Result<Vec<Camera>> {
        self.get_json(&format!("/api/cameras/project/{}", project_id))
            .await
    }

    async fn developer(&self, developer_id: &str) -> crate::Result<Developer> {
        self.get_json(&format!("/api/developers/{}", developer_id))
            .await
    }

    async fn last_image_url(
        &self,
        developer_tag: &str,
        project_tag: &str,
        camera_id: &str,
    ) -> crate::Result<String> {
        let response: LastImageResponse = self
            .get_json(&format!(
                "/api/camerapics/{}/{}/{}/latest",
                developer_tag, project_tag, camera_id
            ))
            .await?;
        response
            .image_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                crate::SitewatchError::Provider(format!("No image for camera {}", camera_id))
            })
    }
}
