//! Routes, header navigation and icon lookup

use std::fmt;

/// A navigable page of the dashboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Projects,
    Project(String),
    Camera(String),
    Monitor,
    Contact,
    Admin,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Projects => "/projects".to_string(),
            Route::Project(id) => format!("/project/{}", id),
            Route::Camera(id) => format!("/camera/{}", id),
            Route::Monitor => "/monitor".to_string(),
            Route::Contact => "/contact".to_string(),
            Route::Admin => "/admin".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Router collaborator
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator that only logs, used when no router is attached
#[derive(Debug, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, route: Route) {
        tracing::info!("Navigate to {}", route);
    }
}

/// How a navigation icon is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconKind {
    /// Same image regardless of state
    Single(&'static str),
    /// Filled when active, outlined otherwise
    Pair {
        filled: &'static str,
        outline: &'static str,
    },
}

impl IconKind {
    pub fn url(self, active: bool) -> &'static str {
        match self {
            IconKind::Single(url) => url,
            IconKind::Pair { filled, outline } => {
                if active {
                    filled
                } else {
                    outline
                }
            }
        }
    }
}

/// Icon registered under `key`
pub fn nav_icon(key: &str) -> Option<IconKind> {
    let icon = match key {
        "home" => IconKind::Pair {
            filled: "assets/images/icons/home-filled.svg",
            outline: "assets/images/icons/home-outline.svg",
        },
        "monitor" => IconKind::Pair {
            filled: "assets/images/icons/monitor-filled.svg",
            outline: "assets/images/icons/monitor-outline.svg",
        },
        "contact" => IconKind::Pair {
            filled: "assets/images/icons/contact-filled.svg",
            outline: "assets/images/icons/contact-outline.svg",
        },
        "settings" => IconKind::Pair {
            filled: "assets/images/icons/settings-filled.svg",
            outline: "assets/images/icons/settings-outline.svg",
        },
        "search" => IconKind::Single("assets/images/icons/search.svg"),
        _ => return None,
    };
    Some(icon)
}

/// An entry in the header bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    pub label: &'static str,
    pub route: Route,
    pub icon_key: &'static str,
    pub active: bool,
}

impl NavItem {
    pub fn icon_url(&self) -> Option<&'static str> {
        nav_icon(self.icon_key).map(|icon| icon.url(self.active))
    }

    /// Whether this item should be highlighted for `url`
    pub fn matches(&self, url: &str) -> bool {
        let route = self.route.path();
        if self.route == Route::Projects {
            return url == "/"
                || url == "/projects"
                || url.starts_with("/projects/")
                || url.starts_with("/project/");
        }
        url == route || url.starts_with(&format!("{}/", route))
    }
}

/// Header navigation bar
#[derive(Debug, Clone)]
pub struct Header {
    pub items: Vec<NavItem>,
}

impl Default for Header {
    fn default() -> Self {
        let item = |label, route, icon_key| NavItem {
            label,
            route,
            icon_key,
            active: false,
        };
        Self {
            items: vec![
                item("Home", Route::Projects, "home"),
                item("Monitor", Route::Monitor, "monitor"),
                item("Contact", Route::Contact, "contact"),
                item("Admin", Route::Admin, "settings"),
            ],
        }
    }
}

impl Header {
    /// Recompute active flags after a navigation to `url`
    pub fn update_active_state(&mut self, url: &str) {
        for item in &mut self.items {
            item.active = item.matches(url);
        }
    }

    pub fn active(&self) -> Option<&NavItem> {
        self.items.iter().find(|item| item.active)
    }
}
