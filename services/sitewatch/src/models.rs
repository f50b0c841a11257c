//! Records returned by the dashboard backend

use serde::{Deserialize, Serialize};

/// A latitude or longitude as delivered by the backend, which sends either
/// JSON numbers or numeric strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coordinate {
    Number(f64),
    Text(String),
}

impl Coordinate {
    /// Parse to a number. Zero, NaN and infinities are treated as unset.
    pub fn value(&self) -> Option<f64> {
        let parsed = match self {
            Coordinate::Number(n) => *n,
            Coordinate::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        if !parsed.is_finite() || parsed == 0.0 {
            return None;
        }
        Some(parsed)
    }
}

impl From<f64> for Coordinate {
    fn from(value: f64) -> Self {
        Coordinate::Number(value)
    }
}

impl From<&str> for Coordinate {
    fn from(value: &str) -> Self {
        Coordinate::Text(value.to_string())
    }
}

/// A geographic position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Resolve a coordinate pair, `None` unless both components are valid
pub fn position(lat: Option<&Coordinate>, lng: Option<&Coordinate>) -> Option<LatLng> {
    let lat = lat?.value()?;
    let lng = lng?.value()?;
    Some(LatLng { lat, lng })
}

/// The organisational owner of a set of projects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Community {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// Developer record, only the tag is used for image lookups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Developer {
    #[serde(default)]
    pub developer_tag: String,
}

/// A monitored construction site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub project_tag: String,
    /// Developer id owning the project
    #[serde(default)]
    pub developer: Option<String>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub lat: Option<Coordinate>,
    #[serde(default)]
    pub lng: Option<Coordinate>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub days_completed: u32,
    #[serde(default)]
    pub total_days: u32,
}

impl Project {
    pub fn position(&self) -> Option<LatLng> {
        position(self.lat.as_ref(), self.lng.as_ref())
    }
}

/// A monitoring device attached to a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    #[serde(alias = "_id")]
    pub id: String,
    /// Hardware identifier used by the image store
    #[serde(default)]
    pub camera: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub lat: Option<Coordinate>,
    #[serde(default)]
    pub lng: Option<Coordinate>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub installed_date: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl Camera {
    pub fn position(&self) -> Option<LatLng> {
        position(self.lat.as_ref(), self.lng.as_ref())
    }

    /// Identifier used when asking for the latest image
    pub fn image_key(&self) -> &str {
        match self.camera.as_deref() {
            Some(hw) if !hw.is_empty() => hw,
            _ => &self.id,
        }
    }
}

/// Logged-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Body of a login response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default, alias = "authh")]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub phone_required: bool,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}
