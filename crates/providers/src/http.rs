//! reqwest-backed provider clients.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use mask::PointPromptResponse;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use tracing::debug;

use crate::{
    config::ProviderConfig,
    error::ProviderError,
    traits::{PointPrompt, PointPromptProvider, SegmentDescriptor, SegmentationProvider},
};

const DATA_URI_PREFIX: &str = "data:";

fn build_client(config: &ProviderConfig) -> Result<Client, ProviderError> {
    config.validate()?;
    Ok(Client::builder().timeout(config.timeout()).build()?)
}

fn authorize(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

async fn ensure_success(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Decode a `data:[<mediatype>];base64,<payload>` URI
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, ProviderError> {
    let rest = uri
        .strip_prefix(DATA_URI_PREFIX)
        .ok_or_else(|| ProviderError::DataUri("missing 'data:' scheme".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ProviderError::DataUri("missing ',' separator".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(ProviderError::DataUri(format!(
            "unsupported encoding '{}', expected base64",
            header
        )));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| ProviderError::DataUri(e.to_string()))
}

/// Encode image bytes as a data URI, sniffing the media type
pub fn encode_data_uri(image: &[u8]) -> String {
    let mime = image::guess_format(image)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream");
    format!("data:{};base64,{}", mime, STANDARD.encode(image))
}

/// Client for the labelled-segmentation endpoint.
///
/// Uploads the raw image and expects a JSON array of [`SegmentDescriptor`].
#[derive(Debug, Clone)]
pub struct HttpSegmentationClient {
    client: Client,
    endpoint: String,
    api_token: Option<String>,
}

impl HttpSegmentationClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(config)?,
            endpoint: config.segmentation_url.clone(),
            api_token: config.api_token.clone(),
        })
    }
}

#[async_trait]
impl SegmentationProvider for HttpSegmentationClient {
    async fn segment(&self, image: &[u8]) -> Result<Vec<SegmentDescriptor>, ProviderError> {
        debug!(endpoint = %self.endpoint, bytes = image.len(), "Requesting segmentation");
        let request = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec());
        let response = authorize(request, self.api_token.as_deref()).send().await?;
        let response = ensure_success(response).await?;
        response
            .json::<Vec<SegmentDescriptor>>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    async fn fetch_mask(&self, uri: &str) -> Result<Vec<u8>, ProviderError> {
        if uri.starts_with(DATA_URI_PREFIX) {
            return decode_data_uri(uri);
        }
        debug!(uri, "Fetching segment mask");
        let response = ensure_success(self.client.get(uri).send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[derive(Serialize)]
struct PointPromptRequest {
    image: String,
    point_coords: [[u32; 2]; 1],
    point_labels: [u8; 1],
}

/// Client for the point-prompt endpoint.
///
/// Sends the image as a data URI together with the click and expects a
/// [`PointPromptResponse`] body.
#[derive(Debug, Clone)]
pub struct HttpPointPromptClient {
    client: Client,
    endpoint: String,
    api_token: Option<String>,
}

impl HttpPointPromptClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(config)?,
            endpoint: config.point_prompt_url.clone(),
            api_token: config.api_token.clone(),
        })
    }
}

#[async_trait]
impl PointPromptProvider for HttpPointPromptClient {
    async fn segment_point(
        &self,
        image: &[u8],
        prompt: PointPrompt,
    ) -> Result<PointPromptResponse, ProviderError> {
        debug!(endpoint = %self.endpoint, x = prompt.x, y = prompt.y, "Requesting point-prompt masks");
        let body = PointPromptRequest {
            image: encode_data_uri(image),
            point_coords: [[prompt.x, prompt.y]],
            point_labels: [prompt.label.as_wire()],
        };
        let request = self.client.post(&self.endpoint).json(&body);
        let response = authorize(request, self.api_token.as_deref()).send().await?;
        let response = ensure_success(response).await?;
        response
            .json::<PointPromptResponse>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}
