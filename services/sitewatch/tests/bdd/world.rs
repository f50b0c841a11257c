//! BDD test world for sitewatch

use std::sync::Arc;

use cucumber::World;
use sitewatch::aggregation::{Aggregator, RefreshOutcome};
use sitewatch::config::{DashboardConfig, MapConfig};
use sitewatch::map::{MapController, Size};
use sitewatch::models::Project;
use sitewatch::services::ServiceConfig;
use sitewatch::state::{new_state_handle, DashboardState};
use sitewatch::testing::{FakeContainer, FakeMapBackend, FakeProvider, RecordingNavigator};
use sitewatch::view::ProjectsView;

#[derive(Debug, Default, World)]
pub struct SitewatchWorld {
    // Backend data, assembled by Given steps before the view exists
    pub provider: FakeProvider,
    pub service_config: ServiceConfig,

    pub view: Option<ProjectsView>,
    pub map_backend: Option<Arc<FakeMapBackend>>,
    pub navigator: Option<Arc<RecordingNavigator>>,
    pub outcome: Option<RefreshOutcome>,
}

impl SitewatchWorld {
    pub fn add_project(&mut self, developer_id: &str, project: Project) {
        self.provider = std::mem::take(&mut self.provider).with_project(developer_id, project);
    }

    pub fn update_provider(&mut self, f: impl FnOnce(FakeProvider) -> FakeProvider) {
        self.provider = f(std::mem::take(&mut self.provider));
    }

    /// The projects view, built from the current provider on first use
    pub fn view(&mut self) -> &mut ProjectsView {
        if self.view.is_none() {
            let provider = std::mem::take(&mut self.provider)
                .with_service_config(self.service_config.clone());
            let backend = Arc::new(FakeMapBackend::default());
            let navigator = Arc::new(RecordingNavigator::default());
            let aggregator = Arc::new(Aggregator::new(
                Arc::new(provider),
                new_state_handle("Dubai Hills Estate", ""),
                DashboardConfig::default(),
            ));
            let map = MapController::new(
                backend.clone(),
                Arc::new(FakeContainer::sized(Size::new(1024, 768))),
                navigator.clone(),
                MapConfig::default(),
            );
            self.view = Some(ProjectsView::new(aggregator, map, navigator.clone()));
            self.map_backend = Some(backend);
            self.navigator = Some(navigator);
        }
        self.view.as_mut().unwrap()
    }

    pub async fn snapshot(&mut self) -> DashboardState {
        self.view().aggregator().state().read().await.clone()
    }
}
