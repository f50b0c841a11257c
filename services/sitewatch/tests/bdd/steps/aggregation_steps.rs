//! BDD step definitions for dashboard aggregation

use chrono::{Duration, Local};
use cucumber::{given, then, when};

use sitewatch::aggregation::RefreshOutcome;
use sitewatch::services::{ServiceKind, ServiceRule};
use sitewatch::testing::FakeProvider;

use crate::world::SitewatchWorld;

#[given(expr = "a developer {string} with a project {string} created {int} days ago")]
fn project_created_days_ago(world: &mut SitewatchWorld, developer: String, id: String, days: i64) {
    let mut project = FakeProvider::project(&id, &id);
    let created = Local::now().date_naive() - Duration::days(days);
    project.created_date = Some(created.format("%Y-%m-%d").to_string());
    world.add_project(&developer, project);
}

#[given(expr = "a developer {string} with projects {string} and {string}")]
fn developer_with_projects(world: &mut SitewatchWorld, developer: String, p1: String, p2: String) {
    world.add_project(&developer, FakeProvider::project(&p1, &p1));
    world.add_project(&developer, FakeProvider::project(&p2, &p2));
}

#[given(expr = "a community {string} named {string}")]
fn community(world: &mut SitewatchWorld, id: String, name: String) {
    world.update_provider(|p| p.with_community(&id, &name, None));
}

#[given(expr = "project {string} has camera {string}")]
fn project_camera(world: &mut SitewatchWorld, project: String, camera: String) {
    world.update_provider(|p| p.with_camera(&project, FakeProvider::camera(&camera, None)));
}

#[given(expr = "camera loading fails for project {string}")]
fn camera_failure(world: &mut SitewatchWorld, project: String) {
    world.update_provider(|p| p.failing_cameras_for(&project));
}

#[given("no communities exist")]
fn no_communities(_world: &mut SitewatchWorld) {}

#[given("the developer list is unavailable")]
fn developer_list_unavailable(world: &mut SitewatchWorld) {
    world.update_provider(FakeProvider::failing_communities);
}

#[given("the project list is unavailable")]
fn project_list_unavailable(world: &mut SitewatchWorld) {
    world.update_provider(FakeProvider::failing_projects);
}

#[given("the service configuration is unavailable")]
fn service_config_unavailable(world: &mut SitewatchWorld) {
    world.update_provider(FakeProvider::failing_service_config);
}

#[given(expr = "the {word} service is enabled for project tag {string}")]
fn service_enabled(world: &mut SitewatchWorld, service: String, tag: String) {
    let rule = ServiceRule {
        enabled: true,
        projects: vec![tag],
    };
    match service.as_str() {
        "live" => world.service_config.live = rule,
        "drone" => world.service_config.drone = rule,
        "photography" => world.service_config.photography = rule,
        other => panic!("unknown configurable service {other}"),
    }
}

#[when(expr = "the dashboard loads developer {string}")]
async fn load_developer(world: &mut SitewatchWorld, developer: String) {
    let outcome = world.view().load(Some(&developer)).await;
    world.outcome = Some(outcome);
}

#[when("the dashboard loads without a developer")]
async fn load_default(world: &mut SitewatchWorld) {
    let outcome = world.view().load(None).await;
    world.outcome = Some(outcome);
}

#[then("the load completes")]
fn load_completes(world: &mut SitewatchWorld) {
    assert!(matches!(
        world.outcome,
        Some(RefreshOutcome::Completed { .. })
    ));
}

#[then("the load fails")]
fn load_fails(world: &mut SitewatchWorld) {
    assert!(matches!(world.outcome, Some(RefreshOutcome::Failed { .. })));
}

#[then(expr = "the dashboard has {int} project(s)")]
async fn project_count(world: &mut SitewatchWorld, count: usize) {
    assert_eq!(world.snapshot().await.projects.len(), count);
}

#[then(expr = "project {string} has {int} of {int} days completed")]
async fn project_progress(world: &mut SitewatchWorld, id: String, done: u32, total: u32) {
    let state = world.snapshot().await;
    let project = state.project(&id).expect("project not loaded");
    assert_eq!(project.days_completed, done);
    assert_eq!(project.total_days, total);
}

#[then(expr = "project {string} has {int} camera(s)")]
async fn camera_count(world: &mut SitewatchWorld, id: String, count: usize) {
    let state = world.snapshot().await;
    assert!(
        state.project_cameras.contains_key(&id),
        "no camera entry for {id}"
    );
    assert_eq!(state.cameras(&id).len(), count);
}

#[then("no error is shown")]
async fn no_error(world: &mut SitewatchWorld) {
    assert_eq!(world.snapshot().await.error, None);
}

#[then(expr = "the error {string} is shown")]
async fn error_shown(world: &mut SitewatchWorld, message: String) {
    assert_eq!(world.snapshot().await.error, Some(message));
}

#[then(expr = "the community name is {string}")]
async fn community_name(world: &mut SitewatchWorld, name: String) {
    assert_eq!(world.snapshot().await.community_name, name);
}

#[then(expr = "project {string} has the {word} service")]
async fn has_service(world: &mut SitewatchWorld, id: String, service: String) {
    let kind: ServiceKind = service.parse().unwrap();
    assert!(world.snapshot().await.service_status(&id, kind));
}

#[then(expr = "project {string} does not have the {word} service")]
async fn lacks_service(world: &mut SitewatchWorld, id: String, service: String) {
    let kind: ServiceKind = service.parse().unwrap();
    assert!(!world.snapshot().await.service_status(&id, kind));
}
