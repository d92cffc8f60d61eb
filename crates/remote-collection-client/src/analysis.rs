//! Plant analysis service client.

use crate::{PlantReport, RemoteError, RemoteResult};
use image_preview::CapturedImage;
use plant_config_and_utils::{endpoint, summarize_response_body, DEFAULT_ANALYSIS_TIMEOUT_SECS};
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::{debug, error, info};

/// Posts a photo and scan region to `/api/analyze-plant`.
///
/// The endpoint is unauthenticated. Requests are bounded by `timeout`.
#[derive(Clone, Debug)]
pub struct PlantAnalysisClient {
    http_client: reqwest::Client,
    api_url: String,
    timeout: Duration,
}

impl PlantAnalysisClient {
    pub fn new(api_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    pub fn with_client(http_client: reqwest::Client, api_url: &str) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(DEFAULT_ANALYSIS_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn analyze(&self, image: &CapturedImage, region: &str) -> RemoteResult<PlantReport> {
        let url = endpoint(&self.api_url, "/api/analyze-plant");
        let part = Part::bytes(image.bytes().to_vec())
            .file_name(image.file_name().to_string())
            .mime_str(image.content_type())?;
        let form = Form::new()
            .part("image", part)
            .text("region", region.to_string());

        debug!(url = %url, bytes = image.len(), region, "Submitting plant analysis");

        let response = self
            .http_client
            .post(&url)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let body_summary = summarize_response_body(&body);
            error!(status, body_summary = %body_summary, "Plant analysis failed");
            return Err(RemoteError::Status {
                status,
                message: format!("upstream error ({body_summary})"),
            });
        }

        let report: PlantReport = response.json().await.map_err(|e| self.classify(e))?;
        info!(
            species = report.specie_identified.as_deref().unwrap_or("unknown"),
            invasive = report.invasive_or_not,
            "Plant analysis complete"
        );
        Ok(report)
    }

    fn classify(&self, e: reqwest::Error) -> RemoteError {
        if e.is_timeout() {
            RemoteError::Timeout(self.timeout)
        } else {
            RemoteError::Http(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout() {
        let client = PlantAnalysisClient::new("http://localhost:8000/");
        assert_eq!(client.timeout(), Duration::from_secs(120));
        assert_eq!(client.api_url, "http://localhost:8000");
    }

    #[test]
    fn test_timeout_override() {
        let client =
            PlantAnalysisClient::new("http://localhost:8000").with_timeout(Duration::from_secs(5));
        assert_eq!(client.timeout(), Duration::from_secs(5));
    }
}
