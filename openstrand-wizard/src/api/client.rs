// HTTP implementation of `CatalogApi`.
//
// Every endpoint answers with the `ApiResponse<T>` envelope. Requests are issued once;
// the wizard never retries on its own.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{multipart, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use super::{ApiError, CatalogApi};
use crate::models::requests::{SubmitCatalogDatasetRequest, VerifyDraftRequest};
use crate::models::responses::{
    ApiResponse, DatasetSummary, SubmitAck, UploadDatasetResponse, VerificationResult,
};
use crate::models::state::DatasetFile;
use crate::settings::WizardConfig;
use crate::utils::logging::{mask_auth_header, mask_sensitive};

pub struct HttpCatalogApi {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpCatalogApi {
    pub fn new(config: &WizardConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("openstrand-wizard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        debug!(
            "[PHASE: api] [STEP: init] HTTP client ready (base_url={}, auth_token={})",
            config.base_url_for_log(),
            config
                .auth_token
                .as_deref()
                .map(mask_sensitive)
                .unwrap_or_else(|| "<none>".to_string())
        );

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    /// Base URL plus `segments`, each percent-encoded as a single path segment.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::Transport(format!("invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport("base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(&self, op: &str, req: RequestBuilder) -> Result<T, ApiError> {
        self.exchange(op, req)
            .await?
            .data
            .ok_or_else(|| ApiError::Decode("response envelope is missing `data`".to_string()))
    }

    async fn exchange<T: DeserializeOwned>(
        &self,
        op: &str,
        req: RequestBuilder,
    ) -> Result<ApiResponse<T>, ApiError> {
        debug!(
            "[PHASE: api] [STEP: {}] Sending request (authorization={})",
            op,
            self.auth_token
                .as_deref()
                .map(|t| mask_auth_header(&format!("Bearer {}", t)))
                .unwrap_or_else(|| "<none>".to_string())
        );
        let response = self.authorized(req).send().await.map_err(|e| {
            warn!("[PHASE: api] [STEP: {}] Request failed: {}", op, e);
            ApiError::from(e)
        })?;
        read_envelope(op, response).await
    }
}

async fn read_envelope<T: DeserializeOwned>(
    op: &str,
    response: Response,
) -> Result<ApiResponse<T>, ApiError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ApiResponse<serde_json::Value>>(&body)
            .map(|env| env.failure_message())
            .unwrap_or_default();
        warn!(
            "[PHASE: api] [STEP: {}] HTTP {} ({})",
            op,
            status.as_u16(),
            if message.is_empty() { "no body" } else { message.as_str() }
        );
        return Err(ApiError::Http {
            status: status.as_u16(),
            message,
        });
    }

    let envelope: ApiResponse<T> =
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
    if !envelope.success {
        return Err(ApiError::Rejected(envelope.failure_message()));
    }
    Ok(envelope)
}

#[async_trait]
impl CatalogApi for HttpCatalogApi {
    async fn upload_dataset(&self, file: &DatasetFile) -> Result<UploadDatasetResponse, ApiError> {
        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)?;
        let form = multipart::Form::new().part("file", part);
        let req = self.client.post(self.url(&["datasets", "upload"])?).multipart(form);
        self.send("upload", req).await
    }

    async fn get_dataset_summary(&self, dataset_id: &str) -> Result<DatasetSummary, ApiError> {
        let req = self
            .client
            .get(self.url(&["datasets", dataset_id, "summary"])?);
        self.send("summary", req).await
    }

    async fn verify_catalog_dataset_draft(
        &self,
        request: &VerifyDraftRequest,
    ) -> Result<VerificationResult, ApiError> {
        let req = self
            .client
            .post(self.url(&["catalog", "datasets", "verify"])?)
            .json(request);
        self.send("verify", req).await
    }

    async fn submit_catalog_dataset(
        &self,
        request: &SubmitCatalogDatasetRequest,
    ) -> Result<SubmitAck, ApiError> {
        let req = self
            .client
            .post(self.url(&["catalog", "datasets"])?)
            .json(request);
        // A bare `{"success":true}` is a valid acknowledgement.
        let envelope = self.exchange::<SubmitAck>("submit", req).await?;
        Ok(envelope.data.unwrap_or_default())
    }
}
