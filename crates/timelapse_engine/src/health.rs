use serde::Deserialize;

use crate::upload::{build_client, map_reqwest_error, parse_endpoint, UploadSettings};
use crate::{FailureKind, UploadError};

/// Body of the service's `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    #[serde(default)]
    pub ffmpeg_available: bool,
}

impl ServiceHealth {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// The health route lives at the root of the upload endpoint's origin.
pub fn health_url(endpoint: &str) -> Result<reqwest::Url, UploadError> {
    parse_endpoint(endpoint)?
        .join("/health")
        .map_err(|err| UploadError::new(FailureKind::InvalidEndpoint, err.to_string()))
}

pub async fn check_health(settings: &UploadSettings) -> Result<ServiceHealth, UploadError> {
    let url = health_url(&settings.endpoint)?;
    let client = build_client(settings.connect_timeout, settings.connect_timeout)?;
    let response = client.get(url).send().await.map_err(map_reqwest_error)?;

    let status = response.status();
    let body = response.bytes().await.map_err(map_reqwest_error)?;
    if !status.is_success() {
        return Err(UploadError::new(
            FailureKind::HttpStatus {
                status: status.as_u16(),
                server_message: None,
            },
            status.to_string(),
        ));
    }
    serde_json::from_slice(&body)
        .map_err(|err| UploadError::new(FailureKind::MalformedResponse, err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::health_url;

    #[test]
    fn health_url_uses_endpoint_origin() {
        assert_eq!(
            health_url("http://localhost:5000/upload").unwrap().as_str(),
            "http://localhost:5000/health"
        );
        assert!(health_url("localhost:5000").is_err());
    }
}
