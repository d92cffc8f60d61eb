//! reqwest client for the collection, image and rewards endpoints.

use crate::records::{AckResponse, DeleteItemRequest, SaveCollectionRequest};
use crate::{
    CollectionItemRecord, CollectionListResponse, RemoteCollectionStore, RemoteError,
    RemoteResult, RewardsSummary,
};
use async_trait::async_trait;
use image_preview::CapturedImage;
use plant_config_and_utils::{bearer_header, endpoint, summarize_response_body};
use reqwest::multipart::{Form, Part};
use reqwest::{header, Response, StatusCode};
use tracing::{debug, warn};

const DEFAULT_IMAGE_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Clone, Debug)]
pub struct HttpCollectionClient {
    http_client: reqwest::Client,
    api_url: String,
}

impl HttpCollectionClient {
    pub fn new(api_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    pub fn with_client(http_client: reqwest::Client, api_url: &str) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        endpoint(&self.api_url, path)
    }

    /// Coin balance and species already rewarded for the signed-in user.
    pub async fn get_rewards(&self, token: &str) -> RemoteResult<RewardsSummary> {
        let response = self
            .http_client
            .get(self.url("/api/rewards"))
            .header("Authorization", bearer_header(token))
            .send()
            .await?;
        let response = check_status(response, "rewards").await?;
        Ok(response.json().await?)
    }
}

/// Map non-success statuses onto [`RemoteError`].
async fn check_status(response: Response, what: &str) -> RemoteResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(RemoteError::Unauthorized);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(RemoteError::NotFound(what.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    let body_summary = summarize_response_body(&body);
    warn!(status = %status, body_summary = %body_summary, what, "Remote request failed");
    Err(RemoteError::Status {
        status: status.as_u16(),
        message: format!("upstream error ({body_summary})"),
    })
}

/// Endpoints that answer `{success}`.
async fn expect_ack(response: Response, what: &str) -> RemoteResult<()> {
    let response = check_status(response, what).await?;
    let ack: AckResponse = response.json().await?;
    if ack.success {
        Ok(())
    } else {
        Err(RemoteError::Rejected(what.to_string()))
    }
}

#[async_trait]
impl RemoteCollectionStore for HttpCollectionClient {
    async fn list(&self, token: &str) -> RemoteResult<Vec<CollectionItemRecord>> {
        let response = self
            .http_client
            .get(self.url("/api/collections"))
            .header("Authorization", bearer_header(token))
            .send()
            .await?;
        let response = check_status(response, "collection").await?;
        let list: CollectionListResponse = response.json().await?;
        let records = list.into_records();
        debug!(items = records.len(), "Fetched remote collection");
        Ok(records)
    }

    async fn save(&self, token: &str, record: &CollectionItemRecord) -> RemoteResult<()> {
        let remote = record.for_remote();
        let response = self
            .http_client
            .post(self.url("/api/collections/save"))
            .header("Authorization", bearer_header(token))
            .json(&SaveCollectionRequest {
                collection_item: &remote,
            })
            .send()
            .await?;
        expect_ack(response, "save collection item").await
    }

    async fn delete_item(&self, token: &str, id: &str) -> RemoteResult<()> {
        let response = self
            .http_client
            .delete(self.url("/api/collections/item"))
            .header("Authorization", bearer_header(token))
            .json(&DeleteItemRequest { item_id: id })
            .send()
            .await?;
        expect_ack(response, "delete collection item").await
    }

    async fn clear(&self, token: &str) -> RemoteResult<()> {
        let response = self
            .http_client
            .delete(self.url("/api/collections/clear"))
            .header("Authorization", bearer_header(token))
            .send()
            .await?;
        expect_ack(response, "clear collection").await
    }

    async fn upload_image(&self, token: &str, id: &str, image: &CapturedImage) -> RemoteResult<()> {
        let part = Part::bytes(image.bytes().to_vec())
            .file_name(image.file_name().to_string())
            .mime_str(image.content_type())?;
        let form = Form::new().text("image_id", id.to_string()).part("image", part);

        let response = self
            .http_client
            .post(self.url("/api/images/upload"))
            .header("Authorization", bearer_header(token))
            .multipart(form)
            .send()
            .await?;
        expect_ack(response, "upload image").await
    }

    async fn fetch_image(&self, token: &str, id: &str) -> RemoteResult<Option<CapturedImage>> {
        let response = self
            .http_client
            .get(self.url(&format!("/api/images/{}", id)))
            .header("Authorization", bearer_header(token))
            .send()
            .await?;
        let response = match check_status(response, "image").await {
            Ok(response) => response,
            Err(RemoteError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(DEFAULT_IMAGE_CONTENT_TYPE)
            .to_string();
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(CapturedImage::new(bytes.to_vec(), content_type)))
    }

    async fn delete_image(&self, token: &str, id: &str) -> RemoteResult<()> {
        let response = self
            .http_client
            .delete(self.url(&format!("/api/images/{}", id)))
            .header("Authorization", bearer_header(token))
            .send()
            .await?;
        expect_ack(response, "delete image").await
    }

    async fn clear_images(&self, token: &str) -> RemoteResult<()> {
        let response = self
            .http_client
            .delete(self.url("/api/images"))
            .header("Authorization", bearer_header(token))
            .send()
            .await?;
        expect_ack(response, "clear images").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordStatus;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_urls_join_without_double_slash() {
        let client = HttpCollectionClient::new("https://api.example.com/");
        assert_eq!(
            client.url("/api/collections"),
            "https://api.example.com/api/collections"
        );
        assert_eq!(
            client.url(&format!("/api/images/{}", "abc")),
            "https://api.example.com/api/images/abc"
        );
    }

    #[test]
    fn test_save_request_omits_local_only_fields() {
        let record = CollectionItemRecord {
            id: "abc".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            region: "Central Texas".into(),
            status: RecordStatus::Completed,
            species: Some("Chinese Privet".into()),
            description: None,
            plant_data: None,
            filename: Some("leaf.jpg".into()),
            preview: Some("data:image/jpeg;base64,AA==".into()),
        };
        let remote = record.for_remote();
        let body = serde_json::to_value(SaveCollectionRequest {
            collection_item: &remote,
        })
        .unwrap();
        assert_eq!(body["collection_item"]["id"], "abc");
        assert_eq!(body["collection_item"]["species"], "Chinese Privet");
        assert!(body["collection_item"].get("preview").is_none());
    }

    #[test]
    fn test_delete_request_shape() {
        let body = serde_json::to_value(DeleteItemRequest { item_id: "abc" }).unwrap();
        assert_eq!(body, serde_json::json!({"item_id": "abc"}));
    }

    #[test]
    fn test_rewards_parse() {
        let rewards: RewardsSummary =
            serde_json::from_str(r#"{"coins": 30, "awarded_species": ["Ligustrum sinense"]}"#)
                .unwrap();
        assert_eq!(rewards.coins, 30);
        assert_eq!(rewards.awarded_species, vec!["Ligustrum sinense".to_string()]);
    }
}
