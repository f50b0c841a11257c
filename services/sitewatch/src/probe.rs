//! Backend connectivity probe used by `sitewatch --check`

use serde::Serialize;

use crate::io::HttpClient;

/// Outcome of one probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub url: String,
    pub success: bool,
    pub status: Option<u16>,
    pub error: Option<String>,
}

/// GET `{base_url}/health`; only a 200 counts as reachable
pub async fn check_backend(http: &dyn HttpClient, base_url: &str) -> ProbeResult {
    let url = format!("{}/health", base_url.trim_end_matches('/'));

    match http.get(&url, &[]).await {
        Ok(response) => {
            let success = response.status == 200;
            if success {
                tracing::info!("Backend reachable at {}", url);
            } else {
                tracing::warn!("Backend at {} answered {}", url, response.status);
            }
            ProbeResult {
                url,
                success,
                status: Some(response.status),
                error: (!success).then(|| response.body),
            }
        }
        Err(e) => {
            tracing::error!("Backend unreachable at {}: {}", url, e);
            ProbeResult {
                url,
                success: false,
                status: None,
                error: Some(e.to_string()),
            }
        }
    }
}
