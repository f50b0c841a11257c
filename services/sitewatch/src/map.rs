//! Map synchronization controller.
//!
//! Owns one map widget instance and the marker/overlay pairs drawn on it.
//! The widget, its hosting container and the overlay projection are all
//! capabilities injected by the host, so the controller runs the same way
//! against a real map library and against the in-memory fakes used by the
//! tests.
//!
//! Lifecycle: `Uninitialized -> Sizing -> Ready -> Destroyed`. The container
//! may not have a usable size when the map view opens, so `Sizing` walks an
//! explicit sequence of sub-steps (see [`SizingStep`]) before giving up and
//! constructing the widget with a size computed from the viewport.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::time::Instant;

use crate::config::{MapConfig, SizingConfig};
use crate::models::{Camera, LatLng, Project};
use crate::navigation::{Navigator, Route};
use crate::theme::{theme, theme_or_default, MapTheme, MapType};

pub const MAP_LOAD_FAILED_MESSAGE: &str = "Failed to load map. Please check your map API key.";
pub const CONTAINER_MISSING_MESSAGE: &str = "Map container not found.";

/// Image shown on a marker card when the project has none
pub const MARKER_FALLBACK_IMAGE: &str = "assets/images/lsl.svg";
/// Transparent 1x1 icon for the anchor marker under each card
pub const ANCHOR_ICON: &str =
    "data:image/svg+xml;charset=UTF-8,%3Csvg%20width%3D%221%22%20height%3D%221%22%20xmlns%3D%22http%3A%2F%2Fwww.w3.org%2F2000%2Fsvg%22%3E%3C%2Fsvg%3E";

/// Card is 120px wide; the triangle tip sits 97px below the card's top edge
pub const OVERLAY_OFFSET_X: f64 = 60.0;
pub const OVERLAY_OFFSET_Y: f64 = 97.0;
pub const OVERLAY_Z_INDEX: u32 = 1000;
pub const ANCHOR_Z_INDEX: u32 = 100;

/// Chrome subtracted from the viewport when computing a fallback size
const VIEWPORT_CHROME_HEIGHT: u32 = 80;
const DEFAULT_HEADER_HEIGHT: u32 = 100;
const PAGE_PADDING: u32 = 48;
const SIDEBAR_WIDTH: u32 = 240;
const MIN_FALLBACK_HEIGHT: u32 = 600;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Size to force onto a container that never reported one
pub fn fallback_size(viewport: Size, header_height: Option<u32>) -> Size {
    let available = viewport.height.saturating_sub(VIEWPORT_CHROME_HEIGHT);
    let height = available
        .saturating_sub(header_height.unwrap_or(DEFAULT_HEADER_HEIGHT))
        .saturating_sub(PAGE_PADDING)
        .max(MIN_FALLBACK_HEIGHT);
    Size::new(viewport.width.saturating_sub(SIDEBAR_WIDTH), height)
}

/// Pixel position inside the overlay layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Smallest box containing every plotted point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLngBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl LatLngBounds {
    pub fn from_point(p: LatLng) -> Self {
        Self {
            south: p.lat,
            west: p.lng,
            north: p.lat,
            east: p.lng,
        }
    }

    pub fn extend(&mut self, p: LatLng) {
        self.south = self.south.min(p.lat);
        self.north = self.north.max(p.lat);
        self.west = self.west.min(p.lng);
        self.east = self.east.max(p.lng);
    }

    pub fn contains(&self, p: LatLng) -> bool {
        (self.south..=self.north).contains(&p.lat) && (self.west..=self.east).contains(&p.lng)
    }

    /// Bounds of all points, `None` for an empty set
    pub fn of(points: impl IntoIterator<Item = LatLng>) -> Option<Self> {
        let mut points = points.into_iter();
        let mut bounds = Self::from_point(points.next()?);
        for p in points {
            bounds.extend(p);
        }
        Some(bounds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayId(pub u64);

/// Construction parameters for a widget instance
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub size: Size,
    pub center: LatLng,
    pub zoom: u8,
    pub map_type: MapType,
    pub zoom_control: bool,
    pub scrollwheel: bool,
    pub draggable: bool,
    pub fullscreen_control: bool,
    pub street_view_control: bool,
    pub map_type_control: bool,
}

/// Invisible marker that anchors a card overlay to a position
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorMarker {
    pub position: LatLng,
    pub title: String,
    pub icon: &'static str,
    pub icon_size: Size,
    pub z_index: u32,
}

/// Converts geographic positions to overlay-layer pixels
pub trait Projection {
    fn to_div_pixel(&self, position: LatLng) -> Option<Point>;
}

/// Custom overlay lifecycle, driven by the widget
pub trait OverlayView: Send + Sync {
    fn on_add(&mut self);
    fn draw(&mut self, projection: &dyn Projection);
    fn on_remove(&mut self);
}

/// A constructed map instance
pub trait MapWidget: Send + Sync {
    fn add_marker(&mut self, marker: AnchorMarker) -> MarkerId;
    fn remove_marker(&mut self, id: MarkerId);
    /// Attach an overlay; the widget calls `on_add` and then `draw`
    fn add_overlay(&mut self, overlay: Box<dyn OverlayView>) -> OverlayId;
    /// Detach an overlay; the widget calls `on_remove`
    fn remove_overlay(&mut self, id: OverlayId);
    fn fit_bounds(&mut self, bounds: LatLngBounds, padding: u32);
    fn set_center(&mut self, center: LatLng, zoom: u8);
    fn set_map_type(&mut self, map_type: MapType);
    fn trigger_resize(&mut self);
    /// Fires once when the widget has finished its first render
    fn ready(&mut self) -> oneshot::Receiver<()>;
}

/// Map library entry point
#[cfg_attr(test, mockall::automock)]
pub trait MapBackend: Send + Sync {
    fn create(&self, options: &MapOptions) -> crate::Result<Box<dyn MapWidget>>;
}

/// The element hosting the map
pub trait MapContainer: Send + Sync {
    /// Whether the element exists in the render tree
    fn is_rendered(&self) -> bool;
    fn size(&self) -> Size;
    fn viewport(&self) -> Size;
    fn header_height(&self) -> Option<u32>;
    /// Force explicit dimensions on the element
    fn apply_size(&self, size: Size);
    /// Notifies every size change observed after subscribing
    fn watch_size(&self) -> watch::Receiver<Size>;
}

/// Rendered state of a card overlay
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayElement {
    pub attached: bool,
    pub left: f64,
    pub top: f64,
    pub z_index: u32,
    pub clicked: bool,
}

pub type ElementHandle = Arc<Mutex<OverlayElement>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Project,
    Camera,
}

/// Card overlay showing a project's image and name
#[derive(Debug)]
pub struct MarkerCard {
    pub position: LatLng,
    pub title: String,
    pub image: String,
    element: ElementHandle,
}

impl MarkerCard {
    pub fn new(position: LatLng, title: String, image: String) -> Self {
        Self {
            position,
            title,
            image,
            element: Arc::new(Mutex::new(OverlayElement::default())),
        }
    }

    pub fn element(&self) -> ElementHandle {
        Arc::clone(&self.element)
    }
}

impl OverlayView for MarkerCard {
    fn on_add(&mut self) {
        if let Ok(mut element) = self.element.lock() {
            element.attached = true;
        }
    }

    fn draw(&mut self, projection: &dyn Projection) {
        let Some(pixel) = projection.to_div_pixel(self.position) else {
            return;
        };
        if let Ok(mut element) = self.element.lock() {
            element.left = pixel.x - OVERLAY_OFFSET_X;
            element.top = pixel.y - OVERLAY_OFFSET_Y;
            element.z_index = OVERLAY_Z_INDEX;
        }
    }

    fn on_remove(&mut self) {
        if let Ok(mut element) = self.element.lock() {
            element.attached = false;
        }
    }
}

/// A plotted marker and its overlay, always created and removed together
#[derive(Debug, Clone)]
pub struct MarkerPair {
    pub kind: MarkerKind,
    pub marker: MarkerId,
    pub overlay: OverlayId,
    /// Project opened when the marker is clicked
    pub project_id: String,
    pub element: ElementHandle,
}

/// Sub-steps of the `Sizing` phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizingStep {
    /// Waiting for the container to exist in the render tree
    AwaitContainer { retried: bool },
    /// Fallback size applied, waiting for layout to pick it up
    Settling { fallback: Size },
    /// Watching for a resize until the timeout
    Observing { fallback: Size },
}

impl SizingStep {
    pub const START: SizingStep = SizingStep::AwaitContainer { retried: false };
}

/// What the driver saw at a sizing step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizingEvent {
    ContainerMissing,
    Measured(Size),
    TimedOut,
}

/// What the driver must do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizingAction {
    /// Sleep, then measure again
    Retry(Duration),
    /// Force the size onto the container, sleep, then measure again
    ApplyFallback { size: Size, wait: Duration },
    /// Wait for a resize notification for at most the given time
    Observe(Duration),
    /// Build the widget with this size
    Construct(Size),
    /// Give up
    Fail,
}

/// Advance the sizing sequence by one observation.
///
/// `fallback` is the computed size used when the container never reports
/// one of its own.
pub fn advance_sizing(
    step: SizingStep,
    event: SizingEvent,
    fallback: Size,
    timings: &SizingConfig,
) -> (SizingStep, SizingAction) {
    use SizingAction::*;
    use SizingEvent::*;
    use SizingStep::*;

    match (step, event) {
        (_, Measured(size)) if !size.is_zero() => (step, Construct(size)),
        (AwaitContainer { retried: false }, ContainerMissing) => (
            AwaitContainer { retried: true },
            Retry(timings.container_retry_delay),
        ),
        (AwaitContainer { retried: true }, ContainerMissing) => (step, Fail),
        (AwaitContainer { .. }, _) => (
            Settling { fallback },
            ApplyFallback {
                size: fallback,
                wait: timings.settle_delay,
            },
        ),
        (Settling { fallback }, _) => (Observing { fallback }, Observe(timings.observe_timeout)),
        (Observing { fallback }, TimedOut) => (step, Construct(fallback)),
        (Observing { .. }, _) => (step, Observe(timings.observe_timeout)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapPhase {
    Uninitialized,
    Sizing(SizingStep),
    Ready,
    Destroyed,
}

/// Keeps a map widget's markers in line with the current projects and cameras
pub struct MapController {
    backend: Arc<dyn MapBackend>,
    container: Arc<dyn MapContainer>,
    navigator: Arc<dyn Navigator>,
    settings: MapConfig,
    theme: &'static MapTheme,
    phase: MapPhase,
    widget: Option<Box<dyn MapWidget>>,
    size: Option<Size>,
    markers: Vec<MarkerPair>,
    error: Option<String>,
}

impl fmt::Debug for MapController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapController")
            .field("phase", &self.phase)
            .field("theme", &self.theme.key)
            .field("markers", &self.markers.len())
            .field("error", &self.error)
            .finish()
    }
}

impl MapController {
    pub fn new(
        backend: Arc<dyn MapBackend>,
        container: Arc<dyn MapContainer>,
        navigator: Arc<dyn Navigator>,
        settings: MapConfig,
    ) -> Self {
        let theme = theme_or_default(&settings.theme);
        Self {
            backend,
            container,
            navigator,
            settings,
            theme,
            phase: MapPhase::Uninitialized,
            widget: None,
            size: None,
            markers: Vec::new(),
            error: None,
        }
    }

    pub fn phase(&self) -> MapPhase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == MapPhase::Ready
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn theme(&self) -> &'static MapTheme {
        self.theme
    }

    pub fn markers(&self) -> &[MarkerPair] {
        &self.markers
    }

    pub fn marker_count(&self, kind: MarkerKind) -> usize {
        self.markers.iter().filter(|m| m.kind == kind).count()
    }

    /// Size the widget was constructed with
    pub fn size(&self) -> Option<Size> {
        self.size
    }

    /// Bring the widget up for the map view. An existing instance is only
    /// resized. Returns whether the map is ready.
    pub async fn open(&mut self) -> bool {
        match self.phase {
            MapPhase::Ready => {
                if let Some(widget) = self.widget.as_mut() {
                    widget.trigger_resize();
                }
                return true;
            }
            MapPhase::Sizing(_) => return false,
            MapPhase::Uninitialized | MapPhase::Destroyed => {}
        }

        self.error = None;
        let size = match self.acquire_size().await {
            Some(size) => size,
            None => {
                tracing::error!("Map container still not found after retry");
                self.fail(CONTAINER_MISSING_MESSAGE);
                return false;
            }
        };

        let options = MapOptions {
            size,
            center: self.settings.default_center,
            zoom: self.settings.initial_zoom,
            map_type: self.theme.map_type,
            zoom_control: true,
            scrollwheel: true,
            draggable: true,
            fullscreen_control: false,
            street_view_control: false,
            map_type_control: false,
        };

        let mut widget = match self.backend.create(&options) {
            Ok(widget) => widget,
            Err(e) => {
                tracing::error!("Error creating map instance: {}", e);
                self.fail(MAP_LOAD_FAILED_MESSAGE);
                return false;
            }
        };
        tracing::info!("Map created at {}", size);

        let ready = widget.ready();
        self.widget = Some(widget);
        self.size = Some(size);
        self.phase = MapPhase::Ready;

        match tokio::time::timeout(self.settings.sizing.observe_timeout, ready).await {
            Ok(Ok(())) => {
                self.container.apply_size(size);
                if let Some(widget) = self.widget.as_mut() {
                    widget.trigger_resize();
                }
            }
            _ => tracing::debug!("Map did not report ready, continuing"),
        }
        true
    }

    /// Drive the sizing sub-steps until a size is known. `None` means the
    /// container never appeared.
    async fn acquire_size(&mut self) -> Option<Size> {
        let timings = self.settings.sizing;
        let mut step = SizingStep::START;
        let mut event = self.measure();
        let mut observer: Option<(watch::Receiver<Size>, Instant)> = None;

        loop {
            self.phase = MapPhase::Sizing(step);
            let fallback = fallback_size(self.container.viewport(), self.container.header_height());
            let (next, action) = advance_sizing(step, event, fallback, &timings);
            tracing::debug!("Sizing {:?} + {:?} -> {:?}", step, event, action);
            step = next;

            event = match action {
                SizingAction::Construct(size) => return Some(size),
                SizingAction::Fail => return None,
                SizingAction::Retry(wait) => {
                    tokio::time::sleep(wait).await;
                    self.measure()
                }
                SizingAction::ApplyFallback { size, wait } => {
                    tracing::warn!("Container has no size, applying {}", size);
                    self.container.apply_size(size);
                    tokio::time::sleep(wait).await;
                    self.measure()
                }
                SizingAction::Observe(timeout) => {
                    let (rx, deadline) = observer.get_or_insert_with(|| {
                        (self.container.watch_size(), Instant::now() + timeout)
                    });
                    let deadline = *deadline;
                    let changed = tokio::time::timeout_at(deadline, rx.changed()).await;
                    match changed {
                        Ok(Ok(())) => SizingEvent::Measured(*rx.borrow_and_update()),
                        Ok(Err(_)) => {
                            tokio::time::sleep_until(deadline).await;
                            SizingEvent::TimedOut
                        }
                        Err(_) => {
                            tracing::warn!("Container size timeout, using computed size");
                            SizingEvent::TimedOut
                        }
                    }
                }
            };
        }
    }

    fn measure(&self) -> SizingEvent {
        if self.container.is_rendered() {
            SizingEvent::Measured(self.container.size())
        } else {
            SizingEvent::ContainerMissing
        }
    }

    fn fail(&mut self, message: &str) {
        self.error = Some(message.to_string());
        self.widget = None;
        self.size = None;
        self.phase = MapPhase::Uninitialized;
    }

    /// Tear down every marker and overlay and plot the given collections
    /// again. Returns the number of pairs now on the map.
    pub fn update(
        &mut self,
        projects: &[Project],
        cameras: &HashMap<String, Vec<Camera>>,
    ) -> usize {
        if self.widget.is_none() {
            tracing::debug!("Map not initialized, skipping marker update");
            return 0;
        }
        self.clear_markers();

        let mut points = Vec::new();
        let mut pairs = Vec::new();
        let Some(widget) = self.widget.as_mut() else {
            return 0;
        };

        for project in projects {
            if let Some(position) = project.position() {
                points.push(position);
                pairs.push(plot(widget.as_mut(), MarkerKind::Project, project, position));
            }
        }

        for project in projects {
            let project_cameras = cameras.get(&project.id).map(Vec::as_slice).unwrap_or(&[]);
            for camera in project_cameras {
                if let Some(position) = camera.position() {
                    points.push(position);
                    pairs.push(plot(widget.as_mut(), MarkerKind::Camera, project, position));
                }
            }
        }

        match LatLngBounds::of(points) {
            Some(bounds) => widget.fit_bounds(bounds, self.settings.fit_padding),
            None => widget.set_center(self.settings.default_center, self.settings.empty_zoom),
        }
        widget.trigger_resize();

        self.markers = pairs;
        tracing::debug!(
            "Map updated: {} project markers, {} camera markers",
            self.marker_count(MarkerKind::Project),
            self.marker_count(MarkerKind::Camera)
        );
        self.markers.len()
    }

    fn clear_markers(&mut self) {
        let markers = std::mem::take(&mut self.markers);
        let Some(widget) = self.widget.as_mut() else {
            return;
        };
        for pair in markers {
            widget.remove_marker(pair.marker);
            widget.remove_overlay(pair.overlay);
        }
    }

    /// Switch the base map without touching markers
    /// Switch the base map. An empty key selects the default theme; an
    /// unknown key leaves the current one in place.
    pub fn set_theme(&mut self, key: &str) {
        self.theme = if key.is_empty() {
            theme_or_default(key)
        } else {
            match theme(key) {
                Some(theme) => theme,
                None => {
                    tracing::warn!("Unknown map theme {}, keeping {}", key, self.theme.key);
                    return;
                }
            }
        };
        if let Some(widget) = self.widget.as_mut() {
            widget.set_map_type(self.theme.map_type);
        }
    }

    /// Dispose of the widget so a later `open` starts from scratch
    pub fn destroy(&mut self) {
        self.clear_markers();
        self.widget = None;
        self.size = None;
        if self.phase != MapPhase::Uninitialized {
            self.phase = MapPhase::Destroyed;
        }
    }

    /// Show click feedback on a marker, then open its project
    pub async fn click(&self, marker: MarkerId) -> Option<Route> {
        let pair = self.markers.iter().find(|m| m.marker == marker)?.clone();
        set_clicked(&pair.element, true);
        tokio::time::sleep(self.settings.click_feedback).await;
        set_clicked(&pair.element, false);

        let route = Route::Project(pair.project_id);
        self.navigator.navigate(route.clone());
        Some(route)
    }
}

fn plot(
    widget: &mut dyn MapWidget,
    kind: MarkerKind,
    project: &Project,
    position: LatLng,
) -> MarkerPair {
    let title = if project.name.is_empty() {
        "Project".to_string()
    } else {
        project.name.clone()
    };
    let image = project
        .image
        .clone()
        .filter(|i| !i.is_empty())
        .unwrap_or_else(|| MARKER_FALLBACK_IMAGE.to_string());

    let marker = widget.add_marker(AnchorMarker {
        position,
        title: title.clone(),
        icon: ANCHOR_ICON,
        icon_size: Size::new(1, 1),
        z_index: ANCHOR_Z_INDEX,
    });
    let card = MarkerCard::new(position, title, image);
    let element = card.element();
    let overlay = widget.add_overlay(Box::new(card));

    MarkerPair {
        kind,
        marker,
        overlay,
        project_id: project.id.clone(),
        element,
    }
}

fn set_clicked(element: &ElementHandle, clicked: bool) {
    if let Ok(mut element) = element.lock() {
        element.clicked = clicked;
    }
}
