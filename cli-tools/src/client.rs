//! Native HTTP client implementation using reqwest

use dataset_session::SessionStore;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use shared::api::endpoints;
use shared::{
    ApiClientConfig, ApiError, Credential, DatasetId, EquipmentApi, ErrorBody, HistoryEntry,
    Summary, SummaryResponse, UploadResponse, HISTORY_LIMIT,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Native API client using reqwest
///
/// The credential is read from the session store on every request, so a
/// sign-out takes effect immediately.
pub struct NativeApiClient {
    client: Client,
    config: ApiClientConfig,
    store: Arc<SessionStore>,
}

impl NativeApiClient {
    pub fn new(config: ApiClientConfig, store: Arc<SessionStore>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().build()?,
            config,
            store,
        })
    }

    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    fn add_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(credential) = self.store.credential() {
            req.header(AUTHORIZATION, credential.header_value())
        } else {
            req
        }
    }

    /// Send a request and collect status and body
    async fn fetch(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<(StatusCode, Vec<u8>), reqwest::Error> {
        let response = req.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok((status, body.to_vec()))
    }
}

/// Interpret the response to `POST /upload/`.
///
/// Errors carry the server's `error` message verbatim, or the generic upload
/// message when the body can't be parsed.
pub fn upload_outcome(status: StatusCode, body: &[u8]) -> Result<UploadResponse, ApiError> {
    if status.is_success() {
        return serde_json::from_slice::<UploadResponse>(body).map_err(|e| {
            warn!("Malformed upload response: {}", e);
            ApiError::upload_failed(None)
        });
    }

    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .map(|b| b.error);
    Err(ApiError::upload_failed(message))
}

/// Interpret the response to `GET /history/`
pub fn history_outcome(status: StatusCode, body: &[u8]) -> Result<Vec<HistoryEntry>, ApiError> {
    if !status.is_success() {
        return Err(ApiError::HistoryUnavailable);
    }

    let mut entries = serde_json::from_slice::<Vec<HistoryEntry>>(body).map_err(|e| {
        warn!("Malformed history response: {}", e);
        ApiError::HistoryUnavailable
    })?;
    entries.truncate(HISTORY_LIMIT);
    Ok(entries)
}

/// Interpret the response to `GET /summary/{id}/`
pub fn summary_outcome(status: StatusCode, body: &[u8]) -> Result<Summary, ApiError> {
    if !status.is_success() {
        return Err(ApiError::SummaryUnavailable);
    }

    serde_json::from_slice::<SummaryResponse>(body)
        .map(|r| r.summary)
        .map_err(|e| {
            warn!("Malformed summary response: {}", e);
            ApiError::SummaryUnavailable
        })
}

/// Interpret the response to `GET /report/{id}/pdf/`
pub fn report_outcome(status: StatusCode, body: Vec<u8>) -> Result<Vec<u8>, ApiError> {
    if status.is_success() {
        Ok(body)
    } else {
        Err(ApiError::ReportGenerationFailed)
    }
}

impl EquipmentApi for NativeApiClient {
    async fn authenticate(&self, credential: &Credential) -> Result<(), ApiError> {
        let url = self.config.url(endpoints::HISTORY);
        debug!("Probing {} with candidate credential", url);

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, credential.header_value())
            .send()
            .await
            .map_err(|e| {
                warn!("Sign-in probe failed: {}", e);
                ApiError::InvalidCredentials
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            debug!("Sign-in probe rejected with {}", response.status());
            Err(ApiError::InvalidCredentials)
        }
    }

    async fn upload_dataset(
        &self,
        file_bytes: Vec<u8>,
        file_name: &str,
        name: &str,
    ) -> Result<UploadResponse, ApiError> {
        let url = self.config.url(endpoints::UPLOAD);
        debug!("POST {} ({} bytes)", url, file_bytes.len());

        let part = Part::bytes(file_bytes)
            .file_name(file_name.to_string())
            .mime_str("text/csv")
            .map_err(|e| {
                warn!("Failed to build multipart body: {}", e);
                ApiError::upload_failed(None)
            })?;
        let form = Form::new().part("file", part).text("name", name.to_string());
        let req = self.add_auth(self.client.post(&url)).multipart(form);

        let (status, body) = self.fetch(req).await.map_err(|e| {
            warn!("Upload request failed: {}", e);
            ApiError::upload_failed(None)
        })?;
        upload_outcome(status, &body)
    }

    async fn list_history(&self) -> Result<Vec<HistoryEntry>, ApiError> {
        let url = self.config.url(endpoints::HISTORY);
        debug!("GET {}", url);

        let req = self.add_auth(self.client.get(&url));
        let (status, body) = self.fetch(req).await.map_err(|e| {
            warn!("History request failed: {}", e);
            ApiError::HistoryUnavailable
        })?;
        history_outcome(status, &body)
    }

    async fn fetch_summary(&self, id: DatasetId) -> Result<Summary, ApiError> {
        let url = self.config.url(&endpoints::summary(id));
        debug!("GET {}", url);

        let req = self.add_auth(self.client.get(&url));
        let (status, body) = self.fetch(req).await.map_err(|e| {
            warn!("Summary request failed: {}", e);
            ApiError::SummaryUnavailable
        })?;
        summary_outcome(status, &body)
    }

    async fn fetch_report_file(&self, id: DatasetId) -> Result<Vec<u8>, ApiError> {
        let url = self.config.url(&endpoints::report_pdf(id));
        debug!("GET {}", url);

        let req = self.add_auth(self.client.get(&url));
        let (status, body) = self.fetch(req).await.map_err(|e| {
            warn!("Report request failed: {}", e);
            ApiError::ReportGenerationFailed
        })?;
        report_outcome(status, body)
    }
}
