//! In-memory stand-in for the equipment analytics service, used by tests.

use shared::{
    ApiError, Credential, DatasetId, DatasetRecord, EquipmentApi, HistoryEntry, Summary,
    UploadResponse, HISTORY_LIMIT, PARAMETERS,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

struct StoredDataset {
    entry: HistoryEntry,
    summary: Summary,
}

#[derive(Default)]
struct FakeState {
    users: Vec<Credential>,
    /// Newest first
    datasets: Vec<StoredDataset>,
    next_id: i64,
    offline: bool,
    history_fails: bool,
    report_fails: bool,
    upload_error: Option<String>,
    summary_delays: HashMap<DatasetId, Duration>,
    auth_delay: Duration,
    upload_delay: Duration,
    history_delay: Duration,
    report_delay: Duration,
    calls: Vec<String>,
}

pub struct FakeService {
    state: Mutex<FakeState>,
}

/// Build CSV bytes with the required header from `(name, type, flow, pressure, temp)` rows
pub fn csv(rows: &[(&str, &str, f64, f64, f64)]) -> Vec<u8> {
    let mut out = String::from("Equipment Name,Type,Flowrate,Pressure,Temperature\n");
    for (name, kind, flow, pressure, temp) in rows {
        out.push_str(&format!("{},{},{},{},{}\n", name, kind, flow, pressure, temp));
    }
    out.into_bytes()
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Server-side behaviour: parse the CSV and compute the summary
fn analyse(bytes: &[u8]) -> Result<(Summary, Vec<DatasetRecord>), ApiError> {
    let text = String::from_utf8(bytes.to_vec())
        .map_err(|_| ApiError::UploadFailed("File is not valid UTF-8".to_string()))?;
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header: Vec<&str> = lines
        .next()
        .ok_or_else(|| ApiError::UploadFailed("Empty CSV".to_string()))?
        .split(',')
        .map(str::trim)
        .collect();
    if header != ["Equipment Name", "Type", "Flowrate", "Pressure", "Temperature"] {
        return Err(ApiError::UploadFailed(
            "Missing required columns".to_string(),
        ));
    }

    let mut records = Vec::new();
    for line in lines {
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        if cells.len() != 5 {
            return Err(ApiError::UploadFailed(format!("Malformed row: {}", line)));
        }
        records.push(DatasetRecord {
            equipment_name: cells[0].to_string(),
            equipment_type: cells[1].to_string(),
            flowrate: cells[2].parse().ok(),
            pressure: cells[3].parse().ok(),
            temperature: cells[4].parse().ok(),
        });
    }

    let mut averages = BTreeMap::new();
    for param in PARAMETERS {
        let values: Vec<f64> = records.iter().filter_map(|r| r.parameter(param)).collect();
        if !values.is_empty() {
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            averages.insert(param.to_string(), round2(mean));
        }
    }

    let mut distribution = BTreeMap::new();
    for r in &records {
        *distribution.entry(r.equipment_type.clone()).or_insert(0u64) += 1;
    }

    let summary = Summary {
        total_count: records.len() as u64,
        averages,
        equipment_type_distribution: distribution,
    };
    Ok((summary, records))
}

impl FakeService {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_id: 1,
                ..Default::default()
            }),
        }
    }

    pub fn with_user(username: &str, password: &str) -> Self {
        let service = Self::new();
        service
            .state
            .lock()
            .unwrap()
            .users
            .push(Credential::from_login(username, password));
        service
    }

    pub fn add_user(&self, username: &str, password: &str) {
        self.state
            .lock()
            .unwrap()
            .users
            .push(Credential::from_login(username, password));
    }

    /// Store a dataset as if it had been uploaded earlier
    pub fn seed(&self, name: &str, rows: &[(&str, &str, f64, f64, f64)]) -> DatasetId {
        let (summary, _) = analyse(&csv(rows)).unwrap();
        self.insert(name, summary)
    }

    fn insert(&self, name: &str, summary: Summary) -> DatasetId {
        let mut state = self.state.lock().unwrap();
        let id = DatasetId(state.next_id);
        state.next_id += 1;
        let created_at = chrono::DateTime::from_timestamp(1_700_000_000 + id.0 * 60, 0).unwrap();
        state.datasets.insert(
            0,
            StoredDataset {
                entry: HistoryEntry {
                    id,
                    name: name.to_string(),
                    row_count: summary.total_count,
                    created_at,
                },
                summary,
            },
        );
        state.datasets.truncate(HISTORY_LIMIT);
        id
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    pub fn set_history_fails(&self, fails: bool) {
        self.state.lock().unwrap().history_fails = fails;
    }

    pub fn set_report_fails(&self, fails: bool) {
        self.state.lock().unwrap().report_fails = fails;
    }

    pub fn set_upload_error(&self, message: Option<&str>) {
        self.state.lock().unwrap().upload_error = message.map(str::to_string);
    }

    pub fn delay_summary(&self, id: DatasetId, delay: Duration) {
        self.state.lock().unwrap().summary_delays.insert(id, delay);
    }

    pub fn delay_authenticate(&self, delay: Duration) {
        self.state.lock().unwrap().auth_delay = delay;
    }

    pub fn delay_upload(&self, delay: Duration) {
        self.state.lock().unwrap().upload_delay = delay;
    }

    pub fn delay_history(&self, delay: Duration) {
        self.state.lock().unwrap().history_delay = delay;
    }

    pub fn delay_report(&self, delay: Duration) {
        self.state.lock().unwrap().report_delay = delay;
    }

    /// Requests received so far, e.g. `["history", "summary:3"]`
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn record(&self, call: String) -> bool {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state.offline
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

impl EquipmentApi for FakeService {
    async fn authenticate(&self, credential: &Credential) -> Result<(), ApiError> {
        let offline = self.record("authenticate".to_string());
        let delay = self.state.lock().unwrap().auth_delay;
        pause(delay).await;
        if offline {
            return Err(ApiError::InvalidCredentials);
        }
        let state = self.state.lock().unwrap();
        if state.users.contains(credential) {
            Ok(())
        } else {
            Err(ApiError::InvalidCredentials)
        }
    }

    async fn upload_dataset(
        &self,
        file_bytes: Vec<u8>,
        _file_name: &str,
        name: &str,
    ) -> Result<UploadResponse, ApiError> {
        let offline = self.record(format!("upload:{}", name));
        let (delay, forced_error) = {
            let state = self.state.lock().unwrap();
            (state.upload_delay, state.upload_error.clone())
        };
        pause(delay).await;
        if offline {
            return Err(ApiError::upload_failed(None));
        }
        if let Some(message) = forced_error {
            return Err(ApiError::UploadFailed(message));
        }

        let (summary, records) = analyse(&file_bytes)?;
        let dataset_id = self.insert(name, summary.clone());
        Ok(UploadResponse {
            dataset_id,
            summary,
            records,
        })
    }

    async fn list_history(&self) -> Result<Vec<HistoryEntry>, ApiError> {
        let offline = self.record("history".to_string());
        let delay = self.state.lock().unwrap().history_delay;
        pause(delay).await;

        let state = self.state.lock().unwrap();
        if offline || state.history_fails {
            return Err(ApiError::HistoryUnavailable);
        }
        Ok(state.datasets.iter().map(|d| d.entry.clone()).collect())
    }

    async fn fetch_summary(&self, id: DatasetId) -> Result<Summary, ApiError> {
        let offline = self.record(format!("summary:{}", id));
        let delay = self
            .state
            .lock()
            .unwrap()
            .summary_delays
            .get(&id)
            .copied()
            .unwrap_or_default();
        pause(delay).await;

        let state = self.state.lock().unwrap();
        if offline {
            return Err(ApiError::SummaryUnavailable);
        }
        state
            .datasets
            .iter()
            .find(|d| d.entry.id == id)
            .map(|d| d.summary.clone())
            .ok_or(ApiError::SummaryUnavailable)
    }

    async fn fetch_report_file(&self, id: DatasetId) -> Result<Vec<u8>, ApiError> {
        let offline = self.record(format!("report:{}", id));
        let delay = self.state.lock().unwrap().report_delay;
        pause(delay).await;

        let state = self.state.lock().unwrap();
        if offline || state.report_fails || !state.datasets.iter().any(|d| d.entry.id == id) {
            return Err(ApiError::ReportGenerationFailed);
        }
        Ok(format!("%PDF-1.4 equipment report {}", id).into_bytes())
    }
}
