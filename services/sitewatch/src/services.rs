//! Monitoring services offered per project and their activation rules

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A monitoring capability that may be enabled for a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Timelapse,
    Live,
    Drone,
    Photography,
    Satellite,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 5] = [
        ServiceKind::Timelapse,
        ServiceKind::Live,
        ServiceKind::Drone,
        ServiceKind::Photography,
        ServiceKind::Satellite,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ServiceKind::Timelapse => "timelapse",
            ServiceKind::Live => "live",
            ServiceKind::Drone => "drone",
            ServiceKind::Photography => "photography",
            ServiceKind::Satellite => "satellite",
        }
    }

    /// Human-readable label shown on project cards
    pub fn display_name(self) -> &'static str {
        match self {
            ServiceKind::Timelapse => "Time lapse",
            ServiceKind::Live => "Live",
            ServiceKind::Drone => "Drone",
            ServiceKind::Photography => "Photography",
            ServiceKind::Satellite => "Satellite",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ServiceKind {
    type Err = crate::SitewatchError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ServiceKind::ALL
            .into_iter()
            .find(|kind| kind.key() == s)
            .ok_or_else(|| crate::SitewatchError::Provider(format!("Unknown service: {}", s)))
    }
}

/// Label for a service key; unknown keys are echoed back unchanged
pub fn service_display_name(key: &str) -> String {
    key.parse::<ServiceKind>()
        .map(|kind| kind.display_name().to_string())
        .unwrap_or_else(|_| key.to_string())
}

/// Activation rule for one configurable service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRule {
    #[serde(default)]
    pub enabled: bool,
    /// Project tags the service is limited to; empty means every project
    #[serde(default)]
    pub projects: Vec<String>,
}

impl ServiceRule {
    fn covers(&self, project_tag: &str) -> bool {
        self.enabled && (self.projects.is_empty() || self.projects.iter().any(|t| t == project_tag))
    }
}

/// Service configuration as served by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub live: ServiceRule,
    #[serde(default)]
    pub drone: ServiceRule,
    #[serde(default)]
    pub photography: ServiceRule,
}

/// Whether `service` is active for the project tagged `project_tag`.
///
/// Timelapse is always on and satellite always off; the rest come from the
/// configuration.
pub fn is_service_active(project_tag: &str, service: ServiceKind, config: &ServiceConfig) -> bool {
    match service {
        ServiceKind::Timelapse => true,
        ServiceKind::Satellite => false,
        ServiceKind::Live => config.live.covers(project_tag),
        ServiceKind::Drone => config.drone.covers(project_tag),
        ServiceKind::Photography => config.photography.covers(project_tag),
    }
}

/// String-keyed variant of [`is_service_active`]; unknown names resolve to false
pub fn resolve(project_tag: &str, service: &str, config: &ServiceConfig) -> bool {
    service
        .parse::<ServiceKind>()
        .map(|kind| is_service_active(project_tag, kind, config))
        .unwrap_or(false)
}

/// Per-project service flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectServiceStatus {
    pub timelapse: bool,
    pub live: bool,
    pub drone: bool,
    pub photography: bool,
    pub satellite: bool,
}

impl ProjectServiceStatus {
    pub fn for_project(project_tag: &str, config: &ServiceConfig) -> Self {
        let active = |kind| is_service_active(project_tag, kind, config);
        Self {
            timelapse: active(ServiceKind::Timelapse),
            live: active(ServiceKind::Live),
            drone: active(ServiceKind::Drone),
            photography: active(ServiceKind::Photography),
            satellite: active(ServiceKind::Satellite),
        }
    }

    pub fn get(&self, kind: ServiceKind) -> bool {
        match kind {
            ServiceKind::Timelapse => self.timelapse,
            ServiceKind::Live => self.live,
            ServiceKind::Drone => self.drone,
            ServiceKind::Photography => self.photography,
            ServiceKind::Satellite => self.satellite,
        }
    }
}
