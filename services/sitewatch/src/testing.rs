//! In-memory collaborators for tests: a data provider, a map backend, a map
//! container and a recording navigator. Built for unit tests and behind the
//! `mock` feature.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{oneshot, watch};

use crate::map::{
    AnchorMarker, LatLngBounds, MapBackend, MapContainer, MapOptions, MapWidget, MarkerId,
    OverlayId, OverlayView, Point, Projection, Size,
};
use crate::models::{Camera, Community, Developer, LatLng, Project};
use crate::navigation::{Navigator, Route};
use crate::provider::DataProvider;
use crate::services::ServiceConfig;
use crate::theme::MapType;
use crate::SitewatchError;

/// A `DataProvider` backed by maps, with switchable failures
#[derive(Debug, Clone, Default)]
pub struct FakeProvider {
    communities: Vec<Community>,
    projects: HashMap<String, Vec<Project>>,
    cameras: HashMap<String, Vec<Camera>>,
    developer_tags: HashMap<String, String>,
    images: HashMap<(String, String, String), String>,
    service_config: ServiceConfig,
    project_delays: HashMap<String, Duration>,
    failing_cameras: HashSet<String>,
    fail_communities: bool,
    fail_projects: bool,
    fail_service_config: bool,
}

impl FakeProvider {
    /// Minimal project with no coordinates and no creation date
    pub fn project(id: &str, tag: &str) -> Project {
        Project {
            id: id.to_string(),
            name: id.to_string(),
            project_tag: tag.to_string(),
            developer: None,
            created_date: None,
            lat: None,
            lng: None,
            image: None,
            days_completed: 0,
            total_days: 0,
        }
    }

    pub fn camera(id: &str, created_date: Option<&str>) -> Camera {
        Camera {
            id: id.to_string(),
            camera: None,
            project: None,
            lat: None,
            lng: None,
            created_date: created_date.map(str::to_string),
            installed_date: None,
            image: None,
            thumbnail: None,
        }
    }

    pub fn with_community(mut self, id: &str, name: &str, image: Option<&str>) -> Self {
        self.communities.push(Community {
            id: id.to_string(),
            name: name.to_string(),
            image: image.map(str::to_string),
        });
        self
    }

    pub fn with_project(mut self, developer_id: &str, project: Project) -> Self {
        self.projects
            .entry(developer_id.to_string())
            .or_default()
            .push(project);
        self
    }

    pub fn with_camera(mut self, project_id: &str, camera: Camera) -> Self {
        self.cameras
            .entry(project_id.to_string())
            .or_default()
            .push(camera);
        self
    }

    pub fn with_developer_tag(mut self, developer_id: &str, tag: &str) -> Self {
        self.developer_tags
            .insert(developer_id.to_string(), tag.to_string());
        self
    }

    pub fn with_image(
        mut self,
        developer_tag: &str,
        project_tag: &str,
        camera: &str,
        url: &str,
    ) -> Self {
        self.images.insert(
            (
                developer_tag.to_string(),
                project_tag.to_string(),
                camera.to_string(),
            ),
            url.to_string(),
        );
        self
    }

    pub fn with_service_config(mut self, config: ServiceConfig) -> Self {
        self.service_config = config;
        self
    }

    /// Hold the project list for `developer_id` back by `delay`
    pub fn with_projects_delay(mut self, developer_id: &str, delay: Duration) -> Self {
        self.project_delays.insert(developer_id.to_string(), delay);
        self
    }

    pub fn failing_cameras_for(mut self, project_id: &str) -> Self {
        self.failing_cameras.insert(project_id.to_string());
        self
    }

    pub fn failing_communities(mut self) -> Self {
        self.fail_communities = true;
        self
    }

    pub fn failing_projects(mut self) -> Self {
        self.fail_projects = true;
        self
    }

    pub fn failing_service_config(mut self) -> Self {
        self.fail_service_config = true;
        self
    }
}

fn unavailable(what: &str) -> SitewatchError {
    SitewatchError::Status {
        status: 500,
        body: format!("{} unavailable", what),
    }
}

#[async_trait]
impl DataProvider for FakeProvider {
    async fn communities(&self) -> crate::Result<Vec<Community>> {
        if self.fail_communities {
            return Err(unavailable("developers"));
        }
        Ok(self.communities.clone())
    }

    async fn community_by_id(&self, id: &str) -> crate::Result<Community> {
        self.communities
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| SitewatchError::Status {
                status: 404,
                body: format!("developer {} not found", id),
            })
    }

    async fn projects_by_developer(&self, developer_id: &str) -> crate::Result<Vec<Project>> {
        if let Some(delay) = self.project_delays.get(developer_id) {
            tokio::time::sleep(*delay).await;
        }
        if self.fail_projects {
            return Err(unavailable("projects"));
        }
        Ok(self.projects.get(developer_id).cloned().unwrap_or_default())
    }

    async fn service_config(&self) -> crate::Result<ServiceConfig> {
        if self.fail_service_config {
            return Err(unavailable("service config"));
        }
        Ok(self.service_config.clone())
    }

    async fn cameras_by_project(&self, project_id: &str) -> crate::Result<Vec<Camera>> {
        if self.failing_cameras.contains(project_id) {
            return Err(unavailable("cameras"));
        }
        Ok(self.cameras.get(project_id).cloned().unwrap_or_default())
    }

    async fn developer(&self, developer_id: &str) -> crate::Result<Developer> {
        self.developer_tags
            .get(developer_id)
            .map(|tag| Developer {
                developer_tag: tag.clone(),
            })
            .ok_or_else(|| SitewatchError::Status {
                status: 404,
                body: format!("developer {} not found", developer_id),
            })
    }

    async fn last_image_url(
        &self,
        developer_tag: &str,
        project_tag: &str,
        camera_id: &str,
    ) -> crate::Result<String> {
        self.images
            .get(&(
                developer_tag.to_string(),
                project_tag.to_string(),
                camera_id.to_string(),
            ))
            .cloned()
            .ok_or_else(|| SitewatchError::Provider(format!("no image for {}", camera_id)))
    }
}

/// Flat projection: one pixel per tenth of a degree
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeProjection;

impl Projection for FakeProjection {
    fn to_div_pixel(&self, position: LatLng) -> Option<Point> {
        Some(Point {
            x: (position.lng + 180.0) * 10.0,
            y: (90.0 - position.lat) * 10.0,
        })
    }
}

/// What the most recent fake widget has been asked to do
#[derive(Debug, Clone, Default)]
pub struct FakeMapState {
    pub created: usize,
    pub options: Option<MapOptions>,
    pub live_markers: usize,
    pub live_overlays: usize,
    pub fitted: Option<(LatLngBounds, u32)>,
    pub center: Option<(LatLng, u8)>,
    pub map_type: Option<MapType>,
    pub resize_count: usize,
}

/// Map backend whose widgets record into a shared [`FakeMapState`]
#[derive(Debug, Default)]
pub struct FakeMapBackend {
    state: Arc<Mutex<FakeMapState>>,
    never_ready: bool,
}

impl FakeMapBackend {
    /// Widgets that never report ready
    pub fn never_ready() -> Self {
        Self {
            never_ready: true,
            ..Self::default()
        }
    }

    pub fn state(&self) -> FakeMapState {
        self.state.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn created(&self) -> usize {
        self.state().created
    }

    pub fn last_options(&self) -> Option<MapOptions> {
        self.state().options
    }
}

impl MapBackend for FakeMapBackend {
    fn create(&self, options: &MapOptions) -> crate::Result<Box<dyn MapWidget>> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| SitewatchError::Map(e.to_string()))?;
        state.created += 1;
        state.options = Some(options.clone());
        state.live_markers = 0;
        state.live_overlays = 0;
        state.map_type = Some(options.map_type);
        Ok(Box::new(FakeMapWidget {
            state: Arc::clone(&self.state),
            markers: BTreeMap::new(),
            overlays: BTreeMap::new(),
            next_id: 0,
            never_ready: self.never_ready,
            pending_ready: None,
        }))
    }
}

struct FakeMapWidget {
    state: Arc<Mutex<FakeMapState>>,
    markers: BTreeMap<MarkerId, AnchorMarker>,
    overlays: BTreeMap<OverlayId, Box<dyn OverlayView>>,
    next_id: u64,
    never_ready: bool,
    // Held open so the receiver waits instead of seeing a dropped sender
    pending_ready: Option<oneshot::Sender<()>>,
}

impl FakeMapWidget {
    fn record(&self, f: impl FnOnce(&mut FakeMapState)) {
        if let Ok(mut state) = self.state.lock() {
            f(&mut state);
            state.live_markers = self.markers.len();
            state.live_overlays = self.overlays.len();
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MapWidget for FakeMapWidget {
    fn add_marker(&mut self, marker: AnchorMarker) -> MarkerId {
        let id = MarkerId(self.next_id());
        self.markers.insert(id, marker);
        self.record(|_| {});
        id
    }

    fn remove_marker(&mut self, id: MarkerId) {
        self.markers.remove(&id);
        self.record(|_| {});
    }

    fn add_overlay(&mut self, mut overlay: Box<dyn OverlayView>) -> OverlayId {
        overlay.on_add();
        overlay.draw(&FakeProjection);
        let id = OverlayId(self.next_id());
        self.overlays.insert(id, overlay);
        self.record(|_| {});
        id
    }

    fn remove_overlay(&mut self, id: OverlayId) {
        if let Some(mut overlay) = self.overlays.remove(&id) {
            overlay.on_remove();
        }
        self.record(|_| {});
    }

    fn fit_bounds(&mut self, bounds: LatLngBounds, padding: u32) {
        self.record(|s| s.fitted = Some((bounds, padding)));
    }

    fn set_center(&mut self, center: LatLng, zoom: u8) {
        self.record(|s| s.center = Some((center, zoom)));
    }

    fn set_map_type(&mut self, map_type: MapType) {
        self.record(|s| s.map_type = Some(map_type));
    }

    fn trigger_resize(&mut self) {
        self.record(|s| s.resize_count += 1);
    }

    fn ready(&mut self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        if self.never_ready {
            self.pending_ready = Some(tx);
        } else {
            let _ = tx.send(());
        }
        rx
    }
}

#[derive(Debug)]
struct ContainerState {
    rendered: bool,
    size: Size,
    viewport: Size,
    header_height: Option<u32>,
    honour_applied: bool,
    applied: Vec<Size>,
}

/// Container whose layout is driven by the test
#[derive(Debug)]
pub struct FakeContainer {
    state: Mutex<ContainerState>,
    resized: watch::Sender<Size>,
}

impl FakeContainer {
    fn with(size: Size, viewport: Size) -> Self {
        let (resized, _) = watch::channel(size);
        Self {
            state: Mutex::new(ContainerState {
                rendered: true,
                size,
                viewport,
                header_height: None,
                honour_applied: false,
                applied: Vec::new(),
            }),
            resized,
        }
    }

    /// Rendered container that already has a size
    pub fn sized(size: Size) -> Self {
        Self::with(size, Size::new(1440, 1000))
    }

    /// Rendered container reporting zero dimensions
    pub fn r#unsized(viewport: Size) -> Self {
        Self::with(Size::default(), viewport)
    }

    /// Layout takes explicitly applied sizes immediately
    pub fn honouring_applied_size(self) -> Self {
        self.update(|s| s.honour_applied = true);
        self
    }

    pub fn hidden(self) -> Self {
        self.update(|s| s.rendered = false);
        self
    }

    pub fn with_header_height(self, height: u32) -> Self {
        self.update(|s| s.header_height = Some(height));
        self
    }

    pub fn set_rendered(&self, rendered: bool) {
        self.update(|s| s.rendered = rendered);
    }

    /// Change the laid-out size and notify observers
    pub fn set_size(&self, size: Size) {
        self.update(|s| s.size = size);
        self.resized.send_replace(size);
    }

    /// Sizes forced onto the container so far
    pub fn applied(&self) -> Vec<Size> {
        self.read(|s| s.applied.clone())
    }

    fn update(&self, f: impl FnOnce(&mut ContainerState)) {
        if let Ok(mut state) = self.state.lock() {
            f(&mut state);
        }
    }

    fn read<T: Default>(&self, f: impl FnOnce(&ContainerState) -> T) -> T {
        self.state.lock().map(|s| f(&s)).unwrap_or_default()
    }
}

impl MapContainer for FakeContainer {
    fn is_rendered(&self) -> bool {
        self.read(|s| s.rendered)
    }

    fn size(&self) -> Size {
        self.read(|s| s.size)
    }

    fn viewport(&self) -> Size {
        self.read(|s| s.viewport)
    }

    fn header_height(&self) -> Option<u32> {
        self.read(|s| s.header_height)
    }

    fn apply_size(&self, size: Size) {
        let mut honoured = false;
        self.update(|s| {
            s.applied.push(size);
            if s.honour_applied {
                s.size = size;
                honoured = true;
            }
        });
        if honoured {
            self.resized.send_replace(size);
        }
    }

    fn watch_size(&self) -> watch::Receiver<Size> {
        self.resized.subscribe()
    }
}

/// Navigator that remembers every route it was asked to open
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(route);
        }
    }
}
