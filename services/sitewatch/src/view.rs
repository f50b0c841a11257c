//! Projects page: list/map view mode wired to the aggregation and map
//! controllers

use std::fmt;
use std::sync::Arc;

use crate::aggregation::{Aggregator, DashboardEvent, RefreshOutcome};
use crate::map::{MapController, MarkerId};
use crate::navigation::{Navigator, Route};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    List,
    Map,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::List => write!(f, "list"),
            ViewMode::Map => write!(f, "map"),
        }
    }
}

pub struct ProjectsView {
    aggregator: Arc<Aggregator>,
    map: MapController,
    navigator: Arc<dyn Navigator>,
    mode: ViewMode,
}

impl fmt::Debug for ProjectsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectsView")
            .field("mode", &self.mode)
            .field("map", &self.map)
            .finish()
    }
}

impl ProjectsView {
    pub fn new(
        aggregator: Arc<Aggregator>,
        map: MapController,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            aggregator,
            map,
            navigator,
            mode: ViewMode::List,
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn map(&self) -> &MapController {
        &self.map
    }

    pub fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }

    /// Refresh the data and, in map view, redraw the markers
    pub async fn load(&mut self, developer_id: Option<&str>) -> RefreshOutcome {
        let outcome = self.aggregator.refresh(developer_id).await;
        if self.mode == ViewMode::Map {
            self.sync_map().await;
        }
        outcome
    }

    /// Switch between list and map. Leaving the map destroys the widget;
    /// entering it brings one up and plots the current data.
    pub async fn toggle_view(&mut self, mode: ViewMode) {
        if self.mode == mode {
            return;
        }
        tracing::debug!("View mode {} -> {}", self.mode, mode);

        if self.mode == ViewMode::Map {
            self.map.destroy();
        }
        self.mode = mode;

        if mode == ViewMode::Map && self.map.open().await {
            self.sync_map().await;
        }
    }

    /// Rebuild markers from the current state. Returns the number plotted.
    pub async fn sync_map(&mut self) -> usize {
        if !self.map.is_ready() {
            return 0;
        }
        let state = self.aggregator.state().read().await;
        self.map.update(&state.projects, &state.project_cameras)
    }

    /// React to new data published by the aggregator
    pub async fn handle_event(&mut self, event: &DashboardEvent) -> bool {
        match event {
            DashboardEvent::ProjectsLoaded { .. } | DashboardEvent::CamerasLoaded { .. }
                if self.mode == ViewMode::Map =>
            {
                self.sync_map().await;
                true
            }
            _ => false,
        }
    }

    pub fn set_map_theme(&mut self, key: &str) {
        self.map.set_theme(key);
    }

    pub fn open_project(&self, project_id: &str) {
        self.navigator.navigate(Route::Project(project_id.to_string()));
    }

    pub fn open_camera(&self, camera_id: &str) {
        self.navigator.navigate(Route::Camera(camera_id.to_string()));
    }

    pub fn open_all_projects(&self) {
        self.navigator.navigate(Route::Projects);
    }

    pub async fn click_marker(&self, marker: MarkerId) -> Option<Route> {
        self.map.click(marker).await
    }
}
