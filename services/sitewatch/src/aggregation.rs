//! Aggregation controller: fans out to the data provider and merges the
//! results into the shared dashboard state.
//!
//! A refresh runs in three batches. Projects and service configuration are
//! fetched together and fail together. Cameras are then fetched for every
//! project at once, with each project's failure isolated to that project.
//! Finally the latest image of every camera is requested in the background;
//! those requests never hold up the refresh and only ever patch one camera.
//!
//! Every refresh takes a new generation number. Responses belonging to an
//! older generation are dropped instead of overwriting newer data.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinSet;

use crate::config::DashboardConfig;
use crate::models::{Camera, Project};
use crate::progress::{format_installed_date, project_progress};
use crate::provider::DataProvider;
use crate::services::{ProjectServiceStatus, ServiceConfig};
use crate::state::StateHandle;
use crate::SitewatchError;

pub const NO_DEVELOPER_MESSAGE: &str = "No developer found. Please contact your administrator.";
pub const DEVELOPER_LOAD_FAILED_MESSAGE: &str =
    "Failed to load developer information. Please try again later.";
pub const PROJECTS_LOAD_FAILED_MESSAGE: &str = "Failed to load projects. Please try again later.";

/// Progress notifications for views that react to new data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardEvent {
    ProjectsLoaded {
        generation: u64,
        count: usize,
    },
    CamerasLoaded {
        generation: u64,
        count: usize,
    },
    CameraImageLoaded {
        generation: u64,
        project_id: String,
        camera_id: String,
    },
    LoadFailed {
        generation: u64,
        message: String,
    },
}

/// Result of one refresh cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Projects and cameras were committed
    Completed { generation: u64 },
    /// A user-visible error was recorded in the state
    Failed { generation: u64 },
    /// A newer refresh started while this one was in flight
    Superseded { generation: u64 },
}

/// Orchestrates dashboard fetches and owns the refresh generation counter
pub struct Aggregator {
    provider: Arc<dyn DataProvider>,
    state: StateHandle,
    settings: DashboardConfig,
    generation: AtomicU64,
    events: broadcast::Sender<DashboardEvent>,
    image_tasks: Mutex<JoinSet<()>>,
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish()
    }
}

impl Aggregator {
    pub fn new(
        provider: Arc<dyn DataProvider>,
        state: StateHandle,
        settings: DashboardConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(100);
        Self {
            provider,
            state,
            settings,
            generation: AtomicU64::new(0),
            events,
            image_tasks: Mutex::new(JoinSet::new()),
        }
    }

    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    /// Wait until every background image request issued so far has finished
    pub async fn wait_for_images(&self) {
        let mut tasks = std::mem::take(&mut *self.image_tasks.lock().await);
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::warn!("Camera image task failed: {}", e);
            }
        }
    }

    /// Load everything for `developer_id`, or for the first community when
    /// no id is given.
    pub async fn refresh(&self, developer_id: Option<&str>) -> RefreshOutcome {
        // Numbered under the write lock so generations commit in order
        let generation = {
            let mut state = self.state.write().await;
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            state.generation = generation;
            state.loading = true;
            state.error = None;
            generation
        };
        tracing::debug!("Refresh {} started for {:?}", generation, developer_id);

        let developer_id = match developer_id.filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => match self.resolve_default_community(generation).await {
                Ok(Some(id)) => id,
                Ok(None) => return RefreshOutcome::Superseded { generation },
                Err(SitewatchError::NoDeveloper) => {
                    tracing::error!("No developer available");
                    return self.fail(generation, NO_DEVELOPER_MESSAGE.to_string()).await;
                }
                Err(e) => {
                    tracing::error!("Error loading developers: {}", e);
                    return self
                        .fail(generation, DEVELOPER_LOAD_FAILED_MESSAGE.to_string())
                        .await;
                }
            },
        };

        let (community, batch) = tokio::join!(
            self.provider.community_by_id(&developer_id),
            async {
                tokio::try_join!(
                    self.provider.projects_by_developer(&developer_id),
                    self.provider.service_config()
                )
            }
        );

        if self.state.read().await.generation != generation {
            tracing::debug!("Refresh {} superseded, dropping projects", generation);
            return RefreshOutcome::Superseded { generation };
        }

        self.apply_community(generation, &developer_id, community).await;

        let (projects, service_config) = match batch {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!("Failed to load projects for {}: {}", developer_id, e);
                return self
                    .fail(generation, PROJECTS_LOAD_FAILED_MESSAGE.to_string())
                    .await;
            }
        };

        let projects = self.enrich_projects(projects);
        let statuses = service_statuses(&projects, &service_config);
        tracing::info!(
            "Loaded {} projects for developer {}",
            projects.len(),
            developer_id
        );

        {
            let mut state = self.state.write().await;
            if state.generation != generation {
                return RefreshOutcome::Superseded { generation };
            }
            state.projects = projects.clone();
            state.project_service_statuses = statuses;
            state.service_config = Some(service_config);
            state.project_cameras.clear();
            state.loading = false;
        }
        let _ = self.events.send(DashboardEvent::ProjectsLoaded {
            generation,
            count: projects.len(),
        });

        if projects.is_empty() {
            return RefreshOutcome::Completed { generation };
        }

        let cameras = self.load_cameras(&projects).await;
        let camera_count = cameras.values().map(Vec::len).sum();
        {
            let mut state = self.state.write().await;
            if state.generation != generation {
                tracing::debug!("Refresh {} superseded, dropping cameras", generation);
                return RefreshOutcome::Superseded { generation };
            }
            state.project_cameras = cameras.clone();
        }
        let _ = self.events.send(DashboardEvent::CamerasLoaded {
            generation,
            count: camera_count,
        });

        self.spawn_image_requests(generation, &projects, &cameras).await;

        RefreshOutcome::Completed { generation }
    }

    /// Returns `Ok(None)` when a newer refresh took over meanwhile
    async fn resolve_default_community(&self, generation: u64) -> crate::Result<Option<String>> {
        let communities = self.provider.communities().await?;
        let first = communities
            .into_iter()
            .next()
            .ok_or(SitewatchError::NoDeveloper)?;

        let mut state = self.state.write().await;
        if state.generation != generation {
            return Ok(None);
        }
        state.community_image = first
            .image
            .clone()
            .filter(|image| !image.is_empty())
            .unwrap_or_else(|| self.settings.community_image(&first.name));
        state.community_name = first.name;
        state.developer_id = Some(first.id.clone());
        tracing::debug!("Using first developer {}", first.id);
        Ok(Some(first.id))
    }

    async fn apply_community(
        &self,
        generation: u64,
        developer_id: &str,
        community: crate::Result<crate::models::Community>,
    ) {
        let mut state = self.state.write().await;
        if state.generation != generation {
            return;
        }
        state.developer_id = Some(developer_id.to_string());
        match community {
            Ok(community) => {
                state.community_image = community
                    .image
                    .filter(|image| !image.is_empty())
                    .unwrap_or_else(|| self.settings.community_image(&community.name));
                state.community_name = community.name;
            }
            Err(e) => {
                tracing::warn!("Error loading community {}: {}", developer_id, e);
                state.community_image = self.settings.community_image(&state.community_name);
            }
        }
    }

    fn enrich_projects(&self, projects: Vec<Project>) -> Vec<Project> {
        projects
            .into_iter()
            .map(|mut project| {
                let progress = project_progress(project.created_date.as_deref());
                project.days_completed = progress.days_completed;
                project.total_days = progress.total_days;
                if project.image.as_deref().map_or(true, str::is_empty) {
                    project.image = Some(self.settings.default_project_image.clone());
                }
                project
            })
            .collect()
    }

    async fn load_cameras(&self, projects: &[Project]) -> HashMap<String, Vec<Camera>> {
        let mut requests = JoinSet::new();
        for project in projects {
            let provider = Arc::clone(&self.provider);
            let project_id = project.id.clone();
            requests.spawn(async move {
                let result = provider.cameras_by_project(&project_id).await;
                (project_id, result)
            });
        }

        let mut cameras: HashMap<String, Vec<Camera>> = HashMap::new();
        while let Some(joined) = requests.join_next().await {
            match joined {
                Ok((project_id, Ok(list))) => {
                    cameras.insert(project_id, list.into_iter().map(prepare_camera).collect());
                }
                Ok((project_id, Err(e))) => {
                    tracing::warn!("Error loading cameras for project {}: {}", project_id, e);
                    cameras.insert(project_id, Vec::new());
                }
                Err(e) => tracing::warn!("Camera request task failed: {}", e),
            }
        }

        for project in projects {
            cameras.entry(project.id.clone()).or_default();
        }
        cameras
    }

    async fn spawn_image_requests(
        &self,
        generation: u64,
        projects: &[Project],
        cameras: &HashMap<String, Vec<Camera>>,
    ) {
        let mut tasks = self.image_tasks.lock().await;
        while let Some(finished) = tasks.try_join_next() {
            if let Err(e) = finished {
                tracing::warn!("Camera image task failed: {}", e);
            }
        }
        for project in projects {
            let Some(developer_id) = project.developer.clone().filter(|d| !d.is_empty()) else {
                continue;
            };
            if project.project_tag.is_empty() {
                continue;
            }
            let project_cameras = cameras.get(&project.id).cloned().unwrap_or_default();
            if project_cameras.is_empty() {
                continue;
            }

            tasks.spawn(load_project_images(
                Arc::clone(&self.provider),
                Arc::clone(&self.state),
                self.events.clone(),
                generation,
                developer_id,
                project.id.clone(),
                project.project_tag.clone(),
                project_cameras,
            ));
        }
    }

    async fn fail(&self, generation: u64, message: String) -> RefreshOutcome {
        let mut state = self.state.write().await;
        if state.generation != generation {
            return RefreshOutcome::Superseded { generation };
        }
        state.clear_data();
        state.loading = false;
        state.error = Some(message.clone());
        drop(state);

        let _ = self
            .events
            .send(DashboardEvent::LoadFailed { generation, message });
        RefreshOutcome::Failed { generation }
    }
}

/// Statuses for every project, computed in one pass
pub fn service_statuses(
    projects: &[Project],
    config: &ServiceConfig,
) -> HashMap<String, ProjectServiceStatus> {
    projects
        .iter()
        .map(|p| {
            (
                p.id.clone(),
                ProjectServiceStatus::for_project(&p.project_tag, config),
            )
        })
        .collect()
}

/// Derive display fields and forget any image from an earlier cycle
fn prepare_camera(mut camera: Camera) -> Camera {
    camera.installed_date = Some(format_installed_date(camera.created_date.as_deref()));
    camera.image = None;
    camera.thumbnail = None;
    camera
}

#[allow(clippy::too_many_arguments)]
async fn load_project_images(
    provider: Arc<dyn DataProvider>,
    state: StateHandle,
    events: broadcast::Sender<DashboardEvent>,
    generation: u64,
    developer_id: String,
    project_id: String,
    project_tag: String,
    cameras: Vec<Camera>,
) {
    let developer_tag = match provider.developer(&developer_id).await {
        Ok(developer) => developer.developer_tag,
        Err(e) => {
            tracing::warn!("Error loading developer tag for {}: {}", developer_id, e);
            return;
        }
    };

    let mut requests = JoinSet::new();
    for camera in cameras {
        let provider = Arc::clone(&provider);
        let state = Arc::clone(&state);
        let events = events.clone();
        let developer_tag = developer_tag.clone();
        let project_id = project_id.clone();
        let project_tag = project_tag.clone();

        requests.spawn(async move {
            let url = match provider
                .last_image_url(&developer_tag, &project_tag, camera.image_key())
                .await
            {
                Ok(url) if !url.is_empty() => url,
                Ok(_) => return,
                Err(e) => {
                    tracing::debug!("No image for camera {}: {}", camera.id, e);
                    return;
                }
            };

            let mut state = state.write().await;
            if state.generation != generation {
                tracing::debug!("Dropping stale image for camera {}", camera.id);
                return;
            }
            if state.patch_camera_image(&project_id, &camera.id, &url) {
                drop(state);
                let _ = events.send(DashboardEvent::CameraImageLoaded {
                    generation,
                    project_id,
                    camera_id: camera.id.clone(),
                });
            }
        });
    }

    while requests.join_next().await.is_some() {}
}
