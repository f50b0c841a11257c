//! Configuration types for the sitewatch dashboard

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::LatLng;

/// Environment variable holding the login password
pub const PASSWORD_ENV: &str = "SITEWATCH_PASSWORD";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub map: MapConfig,
}

impl Config {
    /// Pull secrets that never live in the config file from the environment
    pub fn resolve_secrets(&mut self) -> crate::Result<()> {
        if self.session.email.is_some() && self.session.password.is_none() {
            match std::env::var(PASSWORD_ENV) {
                Ok(password) if !password.is_empty() => self.session.password = Some(password),
                _ => {
                    return Err(crate::SitewatchError::Config(format!(
                        "session.email is set but {} is empty",
                        PASSWORD_ENV
                    )))
                }
            }
        }
        Ok(())
    }
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Login credentials; the password is only ever taken from the environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(skip)]
    pub password: Option<String>,
}

/// Project list settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub developer_id: Option<String>,
    #[serde(default = "default_project_image")]
    pub default_project_image: String,
    #[serde(default = "default_community")]
    pub default_community: String,
    #[serde(default = "default_community_images")]
    pub community_images: HashMap<String, String>,
    #[serde(default)]
    pub status_server: StatusServerConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            developer_id: None,
            default_project_image: default_project_image(),
            default_community: default_community(),
            community_images: default_community_images(),
            status_server: StatusServerConfig::default(),
        }
    }
}

impl DashboardConfig {
    /// Image for a community name, falling back to the default community's
    pub fn community_image(&self, name: &str) -> String {
        self.community_images
            .get(name)
            .or_else(|| self.community_images.get(&self.default_community))
            .cloned()
            .unwrap_or_default()
    }
}

/// Read-only JSON status server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_status_port")]
    pub port: u16,
}

impl Default for StatusServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_status_port(),
        }
    }
}

/// Map widget settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_center")]
    pub default_center: LatLng,
    #[serde(default = "default_initial_zoom")]
    pub initial_zoom: u8,
    #[serde(default = "default_empty_zoom")]
    pub empty_zoom: u8,
    #[serde(default = "default_fit_padding")]
    pub fit_padding: u32,
    #[serde(default = "default_click_feedback", with = "humantime_serde")]
    pub click_feedback: Duration,
    #[serde(default)]
    pub sizing: SizingConfig,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            default_center: default_center(),
            initial_zoom: default_initial_zoom(),
            empty_zoom: default_empty_zoom(),
            fit_padding: default_fit_padding(),
            click_feedback: default_click_feedback(),
            sizing: SizingConfig::default(),
        }
    }
}

/// Timings of the container sizing retry sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizingConfig {
    #[serde(default = "default_container_retry_delay", with = "humantime_serde")]
    pub container_retry_delay: Duration,
    #[serde(default = "default_settle_delay", with = "humantime_serde")]
    pub settle_delay: Duration,
    #[serde(default = "default_observe_timeout", with = "humantime_serde")]
    pub observe_timeout: Duration,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            container_retry_delay: default_container_retry_delay(),
            settle_delay: default_settle_delay(),
            observe_timeout: default_observe_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:9090".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_project_image() -> String {
    "assets/images/project.png".to_string()
}

fn default_community() -> String {
    "Dubai Hills Estate".to_string()
}

fn default_community_images() -> HashMap<String, String> {
    HashMap::from([(
        default_community(),
        "assets/images/communities/dubai-hills-estate.png".to_string(),
    )])
}

fn default_true() -> bool {
    true
}

fn default_status_port() -> u16 {
    11120
}

fn default_theme() -> String {
    crate::theme::DEFAULT_MAP_THEME.to_string()
}

fn default_center() -> LatLng {
    LatLng::new(25.2048, 55.2708)
}

fn default_initial_zoom() -> u8 {
    11
}

fn default_empty_zoom() -> u8 {
    13
}

fn default_fit_padding() -> u32 {
    50
}

fn default_click_feedback() -> Duration {
    Duration::from_millis(150)
}

fn default_container_retry_delay() -> Duration {
    Duration::from_millis(300)
}

fn default_settle_delay() -> Duration {
    Duration::from_millis(200)
}

fn default_observe_timeout() -> Duration {
    Duration::from_secs(2)
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::SitewatchError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "api": {
                "base_url": "https://lsl-platform.com/expo-backend",
                "request_timeout": "10s"
            },
            "session": {
                "email": "amar@example.com"
            },
            "dashboard": {
                "developer_id": "D1",
                "default_project_image": "img/p.png",
                "default_community": "Expo City",
                "community_images": {"Expo City": "img/expo.png"},
                "status_server": {"enabled": false, "port": 8080}
            },
            "map": {
                "theme": "dark",
                "default_center": {"lat": 24.0, "lng": 54.0},
                "initial_zoom": 10,
                "empty_zoom": 12,
                "fit_padding": 20,
                "click_feedback": "100ms",
                "sizing": {
                    "container_retry_delay": "100ms",
                    "settle_delay": "50ms",
                    "observe_timeout": "1s"
                }
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.api.base_url, "https://lsl-platform.com/expo-backend");
        assert_eq!(config.api.request_timeout, Duration::from_secs(10));
        assert_eq!(config.session.email.as_deref(), Some("amar@example.com"));
        assert!(config.session.password.is_none());
        assert_eq!(config.dashboard.developer_id.as_deref(), Some("D1"));
        assert_eq!(config.dashboard.community_image("Expo City"), "img/expo.png");
        assert!(!config.dashboard.status_server.enabled);
        assert_eq!(config.dashboard.status_server.port, 8080);
        assert_eq!(config.map.theme, "dark");
        assert_eq!(config.map.default_center, LatLng::new(24.0, 54.0));
        assert_eq!(config.map.click_feedback, Duration::from_millis(100));
        assert_eq!(config.map.sizing.observe_timeout, Duration::from_secs(1));
    }

    #[test]
    fn parse_minimal_config() {
        let config: Config = serde_json::from_str("{}").unwrap();

        assert_eq!(config.api.base_url, "http://localhost:9090");
        assert_eq!(config.api.request_timeout, Duration::from_secs(30));
        assert!(config.dashboard.developer_id.is_none());
        assert!(config.dashboard.status_server.enabled);
        assert_eq!(config.dashboard.status_server.port, 11120);
        assert_eq!(config.map.theme, "satellite");
        assert_eq!(config.map.default_center, LatLng::new(25.2048, 55.2708));
        assert_eq!(config.map.initial_zoom, 11);
        assert_eq!(config.map.empty_zoom, 13);
        assert_eq!(config.map.sizing, SizingConfig::default());
        assert_eq!(
            config.map.sizing.container_retry_delay,
            Duration::from_millis(300)
        );
    }

    #[test]
    fn community_image_falls_back_to_default_community() {
        let dashboard = DashboardConfig::default();
        assert_eq!(
            dashboard.community_image("Unknown"),
            dashboard.community_image("Dubai Hills Estate")
        );
        assert!(!dashboard.community_image("Unknown").is_empty());
    }

    #[test]
    fn password_is_never_read_from_file() {
        let json = r#"{"session": {"email": "a@b.c", "password": "leak"}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.session.password.is_none());
    }

    #[test]
    fn resolve_secrets_without_email_is_noop() {
        let mut config = Config::default();
        config.resolve_secrets().unwrap();
        assert!(config.session.password.is_none());
    }

    #[test]
    fn load_config_missing_file() {
        let result = load_config(Path::new("/nonexistent/config.json"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, r#"{"dashboard": {"developer_id": "D9"}}"#).unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.dashboard.developer_id.as_deref(), Some("D9"));
    }

    #[test]
    fn load_config_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, "not json").unwrap();

        let result = load_config(&config_path);
        assert!(result.is_err());
    }
}
