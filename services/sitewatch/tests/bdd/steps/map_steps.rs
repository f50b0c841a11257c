//! BDD step definitions for map synchronization

use cucumber::{given, then, when};

use sitewatch::map::{MapPhase, MarkerKind};
use sitewatch::navigation::Route;
use sitewatch::testing::FakeProvider;
use sitewatch::theme::MapType;
use sitewatch::view::ViewMode;

use crate::world::SitewatchWorld;

#[given(expr = "a developer {string} with a project {string} at {float}, {float}")]
fn located_project(world: &mut SitewatchWorld, developer: String, id: String, lat: f64, lng: f64) {
    let mut project = FakeProvider::project(&id, &id);
    project.lat = Some(lat.into());
    project.lng = Some(lng.into());
    world.add_project(&developer, project);
}

#[given(expr = "project {string} has camera {string} at {float}, {float}")]
fn located_camera(world: &mut SitewatchWorld, project: String, id: String, lat: f64, lng: f64) {
    let mut camera = FakeProvider::camera(&id, None);
    camera.lat = Some(lat.into());
    camera.lng = Some(lng.into());
    world.update_provider(|p| p.with_camera(&project, camera));
}

#[given("the map view is open")]
async fn map_is_open(world: &mut SitewatchWorld) {
    world.view().toggle_view(ViewMode::Map).await;
}

#[when("the map view is opened")]
async fn open_map(world: &mut SitewatchWorld) {
    world.view().toggle_view(ViewMode::Map).await;
}

#[when("the list view is opened")]
async fn open_list(world: &mut SitewatchWorld) {
    world.view().toggle_view(ViewMode::List).await;
}

#[when(expr = "the map theme is set to {string}")]
fn set_theme(world: &mut SitewatchWorld, key: String) {
    world.view().set_map_theme(&key);
}

#[when(expr = "the {word} marker number {int} is clicked")]
async fn click_marker(world: &mut SitewatchWorld, kind: String, index: usize) {
    let kind = marker_kind(&kind);
    let marker = world
        .view()
        .map()
        .markers()
        .iter()
        .filter(|m| m.kind == kind)
        .nth(index - 1)
        .map(|m| m.marker)
        .expect("no such marker");
    world.view().click_marker(marker).await;
}

#[then("the map is ready")]
fn map_ready(world: &mut SitewatchWorld) {
    assert_eq!(world.view().map().phase(), MapPhase::Ready);
}

#[then("the map is destroyed")]
fn map_destroyed(world: &mut SitewatchWorld) {
    assert_eq!(world.view().map().phase(), MapPhase::Destroyed);
    let backend = world.map_backend.as_ref().unwrap();
    assert_eq!(backend.state().live_markers, 0);
    assert_eq!(backend.state().live_overlays, 0);
}

#[then(expr = "the map shows {int} marker(s)")]
fn marker_total(world: &mut SitewatchWorld, count: usize) {
    assert_eq!(world.view().map().markers().len(), count);
    let backend = world.map_backend.as_ref().unwrap();
    assert_eq!(backend.state().live_markers, count);
    assert_eq!(backend.state().live_overlays, count);
}

#[then(expr = "the map shows {int} {word} marker(s)")]
fn marker_kind_count(world: &mut SitewatchWorld, count: usize, kind: String) {
    let kind = marker_kind(&kind);
    assert_eq!(world.view().map().marker_count(kind), count);
}

#[then("the map is centred on the default location")]
fn default_center(world: &mut SitewatchWorld) {
    let state = world.map_backend.as_ref().unwrap().state();
    let (center, zoom) = state.center.expect("map was never recentred");
    assert_eq!((center.lat, center.lng), (25.2048, 55.2708));
    assert_eq!(zoom, 13);
}

#[then(expr = "the map type is {word}")]
fn map_type(world: &mut SitewatchWorld, expected: String) {
    let expected = match expected.as_str() {
        "roadmap" => MapType::Roadmap,
        "satellite" => MapType::Satellite,
        other => panic!("unknown map type {other}"),
    };
    let state = world.map_backend.as_ref().unwrap().state();
    assert_eq!(state.map_type, Some(expected));
}

#[then(expr = "the browser navigates to project {string}")]
fn navigated(world: &mut SitewatchWorld, id: String) {
    let routes = world.navigator.as_ref().unwrap().routes();
    assert_eq!(routes.last(), Some(&Route::Project(id)));
}

fn marker_kind(kind: &str) -> MarkerKind {
    match kind {
        "project" => MarkerKind::Project,
        "camera" => MarkerKind::Camera,
        other => panic!("unknown marker kind {other}"),
    }
}
