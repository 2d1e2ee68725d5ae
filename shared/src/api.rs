//! API client types and trait definitions
//!
//! This module defines the contract with the equipment analytics service.
//! The native reqwest client implements it, and tests implement it with an
//! in-memory fake.

use crate::{Credential, DatasetId, HistoryEntry, Summary, UploadResponse};

/// Message shown when an upload fails without a usable server message
pub const GENERIC_UPLOAD_ERROR: &str = "Upload failed";

/// Outcomes of remote operations that did not succeed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Sign-in probe rejected. Network failures are reported the same way.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Server-provided message, or the generic upload message
    #[error("{0}")]
    UploadFailed(String),

    #[error("Failed to load history")]
    HistoryUnavailable,

    #[error("Failed to load summary")]
    SummaryUnavailable,

    #[error("Failed to generate PDF")]
    ReportGenerationFailed,
}

impl ApiError {
    /// Upload failure with a fallback for blank messages
    pub fn upload_failed(message: Option<String>) -> Self {
        match message {
            Some(m) if !m.trim().is_empty() => ApiError::UploadFailed(m),
            _ => ApiError::UploadFailed(GENERIC_UPLOAD_ERROR.to_string()),
        }
    }
}

/// API endpoint definitions, relative to the base URL
pub mod endpoints {
    use crate::DatasetId;

    pub const UPLOAD: &str = "/upload/";
    pub const HISTORY: &str = "/history/";

    pub fn summary(id: DatasetId) -> String {
        format!("/summary/{}/", id)
    }

    pub fn report_pdf(id: DatasetId) -> String {
        format!("/report/{}/pdf/", id)
    }
}

/// Trait defining the equipment analytics API
///
/// Every method except `authenticate` attaches the current credential, if
/// any. All methods are async and fail independently of each other.
#[allow(async_fn_in_trait)]
pub trait EquipmentApi {
    /// Probe a protected endpoint with a candidate credential
    async fn authenticate(&self, credential: &Credential) -> Result<(), ApiError>;

    /// Submit a CSV file; `name` is the display name stored with the dataset
    async fn upload_dataset(
        &self,
        file_bytes: Vec<u8>,
        file_name: &str,
        name: &str,
    ) -> Result<UploadResponse, ApiError>;

    /// Most recent uploads, newest first
    async fn list_history(&self) -> Result<Vec<HistoryEntry>, ApiError>;

    /// Summary of a stored dataset (no records)
    async fn fetch_summary(&self, id: DatasetId) -> Result<Summary, ApiError>;

    /// Generated PDF report, treated as opaque bytes
    async fn fetch_report_file(&self, id: DatasetId) -> Result<Vec<u8>, ApiError>;
}

/// Configuration for creating an API client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL of the API (e.g., "http://localhost:8000/api")
    pub base_url: String,
}

impl ApiClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8000/api")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ApiError::InvalidCredentials.to_string(),
            "Invalid username or password"
        );
        assert_eq!(
            ApiError::UploadFailed("row limit exceeded".to_string()).to_string(),
            "row limit exceeded"
        );
        assert_eq!(
            ApiError::ReportGenerationFailed.to_string(),
            "Failed to generate PDF"
        );
    }

    #[test]
    fn test_upload_failed_fallback() {
        assert_eq!(
            ApiError::upload_failed(None),
            ApiError::UploadFailed(GENERIC_UPLOAD_ERROR.to_string())
        );
        assert_eq!(
            ApiError::upload_failed(Some("  ".to_string())),
            ApiError::UploadFailed(GENERIC_UPLOAD_ERROR.to_string())
        );
        assert_eq!(
            ApiError::upload_failed(Some("Please upload a CSV file.".to_string())),
            ApiError::UploadFailed("Please upload a CSV file.".to_string())
        );
    }

    #[test]
    fn test_urls() {
        let config = ApiClientConfig::new("http://example.com/api/");
        assert_eq!(config.url(endpoints::HISTORY), "http://example.com/api/history/");
        assert_eq!(
            config.url(&endpoints::summary(DatasetId(12))),
            "http://example.com/api/summary/12/"
        );
        assert_eq!(
            config.url(&endpoints::report_pdf(DatasetId(3))),
            "http://example.com/api/report/3/pdf/"
        );
        assert_eq!(
            ApiClientConfig::default().url(endpoints::UPLOAD),
            "http://localhost:8000/api/upload/"
        );
    }
}
