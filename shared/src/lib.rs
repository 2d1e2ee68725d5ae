use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// API client types and trait
pub mod api;
pub use api::{ApiClientConfig, ApiError, EquipmentApi};

// Basic-auth credential
pub mod credential;
pub use credential::Credential;

// Series shaping for the two dashboard charts
pub mod charts;

/// Number of datasets the remote service keeps in its history
pub const HISTORY_LIMIT: usize = 5;

/// Parameter columns averaged by the remote service, in display order
pub const PARAMETERS: [&str; 3] = ["Flowrate", "Pressure", "Temperature"];

/// Server-assigned dataset identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(pub i64);

impl std::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DatasetId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(DatasetId)
    }
}

/// One past upload as listed by `GET /history/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: DatasetId,
    pub name: String,
    pub row_count: u64,
    /// Upload time. Older servers call this field `uploaded_at`.
    #[serde(alias = "uploaded_at")]
    pub created_at: DateTime<Utc>,
}

/// Aggregate statistics computed server-side for one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_count: u64,
    /// Parameter name -> mean value (rounded to 2 places by the server)
    pub averages: BTreeMap<String, f64>,
    /// Equipment type -> number of rows with that type
    pub equipment_type_distribution: BTreeMap<String, u64>,
}

impl Summary {
    /// Average for a parameter, if the server reported one
    pub fn average(&self, parameter: &str) -> Option<f64> {
        self.averages.get(parameter).copied()
    }

    /// Sum of all category counts
    pub fn distribution_total(&self) -> u64 {
        self.equipment_type_distribution.values().sum()
    }
}

/// A raw CSV row, only returned for a fresh upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    #[serde(rename = "Equipment Name")]
    pub equipment_name: String,
    #[serde(rename = "Type")]
    pub equipment_type: String,
    #[serde(rename = "Flowrate", default)]
    pub flowrate: Option<f64>,
    #[serde(rename = "Pressure", default)]
    pub pressure: Option<f64>,
    #[serde(rename = "Temperature", default)]
    pub temperature: Option<f64>,
}

impl DatasetRecord {
    /// Value of one of the averaged parameter columns
    pub fn parameter(&self, name: &str) -> Option<f64> {
        match name {
            "Flowrate" => self.flowrate,
            "Pressure" => self.pressure,
            "Temperature" => self.temperature,
            _ => None,
        }
    }
}

/// Successful response body of `POST /upload/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub dataset_id: DatasetId,
    pub summary: Summary,
    #[serde(default)]
    pub records: Vec<DatasetRecord>,
}

/// Response body of `GET /summary/{id}/`
///
/// The server also sends the dataset name and row count; only the summary
/// is used here.
#[derive(Debug, Clone, Deserialize)]
pub struct SummaryResponse {
    pub summary: Summary,
}

/// Error body returned by the remote service on failure
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
