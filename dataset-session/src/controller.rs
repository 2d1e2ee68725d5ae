//! Dataset session controller.
//!
//! Coordinates sign-in state, uploads, history selection and report
//! downloads, and reconciles their asynchronous responses into a single
//! [`ViewState`]. All methods take `&self` so that new intents can be issued
//! while earlier requests are still in flight; internal state is never
//! locked across an await point.

use shared::{DatasetId, EquipmentApi, HistoryEntry, HISTORY_LIMIT};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::generation::{Outcome, RequestLine, Ticket};
use crate::store::SessionStore;
use crate::view::{Phase, SessionSnapshot, ViewState};

/// File name used when saving a dataset's PDF report
pub fn report_file_name(id: DatasetId) -> String {
    format!("equipment_report_{}.pdf", id)
}

#[derive(Debug, Default)]
struct ControllerState {
    view: ViewState,
    history: Vec<HistoryEntry>,
    selected_history_id: Option<DatasetId>,
    /// Bumped on every sign-in and sign-out
    epoch: u64,
    sign_ins: RequestLine,
    selection: RequestLine,
    uploads: RequestLine,
    history_refresh: RequestLine,
    loading_history: bool,
    uploading: bool,
    error: Option<String>,
}

impl ControllerState {
    /// Drop everything tied to the current sign-in and invalidate in-flight requests
    fn reset(&mut self) {
        let mut sign_ins = self.sign_ins;
        let mut selection = self.selection;
        let mut uploads = self.uploads;
        let mut history_refresh = self.history_refresh;
        sign_ins.cancel();
        selection.cancel();
        uploads.cancel();
        history_refresh.cancel();

        *self = ControllerState {
            epoch: self.epoch + 1,
            sign_ins,
            selection,
            uploads,
            history_refresh,
            ..Default::default()
        };
    }

    fn ticket(&self, generation: u64) -> Ticket {
        Ticket {
            epoch: self.epoch,
            generation,
        }
    }

    fn accepts(&self, ticket: Ticket, line: RequestLine) -> bool {
        ticket.epoch == self.epoch && line.is_current(ticket.generation)
    }
}

pub struct DatasetSessionController<A> {
    api: A,
    store: Arc<SessionStore>,
    download_dir: PathBuf,
    state: Mutex<ControllerState>,
}

impl<A: EquipmentApi> DatasetSessionController<A> {
    pub fn new(api: A, store: Arc<SessionStore>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            api,
            store,
            download_dir: download_dir.into(),
            state: Mutex::new(ControllerState::default()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn phase_of(&self, state: &ControllerState) -> Phase {
        if !self.store.is_authenticated() {
            Phase::Unauthenticated
        } else if state.view.is_loaded() {
            Phase::AuthenticatedLoaded
        } else {
            Phase::AuthenticatedEmpty
        }
    }

    pub fn phase(&self) -> Phase {
        let state = self.state();
        self.phase_of(&state)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state();
        SessionSnapshot {
            phase: self.phase_of(&state),
            view: state.view.clone(),
            history: state.history.clone(),
            selected_history_id: state.selected_history_id,
            loading_history: state.loading_history,
            uploading: state.uploading,
            error: state.error.clone(),
        }
    }

    pub fn dismiss_error(&self) {
        self.state().error = None;
    }

    /// Record a failure for display and hand it back to the caller
    fn surface(&self, err: SessionError) -> SessionError {
        self.state().error = Some(err.to_string());
        err
    }

    /// Sign in and load history, auto-selecting the most recent dataset.
    ///
    /// Only the newest sign-in is committed. A sign-out while the probe is
    /// in flight drops it without storing the credential.
    pub async fn sign_in(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Outcome, SessionError> {
        let ticket = {
            let mut state = self.state();
            let generation = state.sign_ins.issue();
            state.ticket(generation)
        };

        let result = SessionStore::verify(&self.api, username, password).await;

        {
            let mut state = self.state();
            if !state.accepts(ticket, state.sign_ins) {
                debug!("Discarding superseded sign-in for {}", username);
                return Ok(Outcome::Stale);
            }

            let committed = result.and_then(|credential| self.store.commit(credential));
            if let Err(e) = committed {
                state.error = Some(e.to_string());
                return Err(e);
            }
            state.reset();
        }

        self.refresh_history().await?;
        Ok(Outcome::Applied)
    }

    /// Resume a sign-in persisted by an earlier run.
    ///
    /// Does nothing when no credential is stored.
    pub async fn restore(&self) -> Result<Phase, SessionError> {
        if !self.store.is_authenticated() {
            return Ok(Phase::Unauthenticated);
        }

        if let Some(user) = self.store.username() {
            info!("Restoring session for {}", user);
        }
        self.refresh_history().await?;
        Ok(self.phase())
    }

    /// Clear the credential and everything loaded under it.
    ///
    /// Responses to requests issued before this call are dropped on arrival.
    pub fn sign_out(&self) -> Result<(), SessionError> {
        self.state().reset();
        self.store.sign_out()
    }

    /// Reload the history list.
    ///
    /// A failed load is not an error: the list is shown empty. When nothing
    /// is displayed or pending, the most recent entry is selected.
    pub async fn refresh_history(&self) -> Result<Outcome, SessionError> {
        let ticket = {
            let mut state = self.state();
            if !self.store.is_authenticated() {
                return Err(SessionError::NotAuthenticated);
            }
            state.loading_history = true;
            let generation = state.history_refresh.issue();
            state.ticket(generation)
        };

        debug!("Requesting history");
        let entries = match self.api.list_history().await {
            Ok(mut entries) => {
                entries.truncate(HISTORY_LIMIT);
                entries
            }
            Err(e) => {
                warn!("History unavailable, showing empty list: {}", e);
                Vec::new()
            }
        };

        let auto_select = {
            let mut state = self.state();
            if !state.accepts(ticket, state.history_refresh) {
                debug!("Discarding superseded history response");
                return Ok(Outcome::Stale);
            }

            state.loading_history = false;
            state.history = entries;

            let idle = state.selected_history_id.is_none()
                && state.view.active_dataset_id.is_none()
                && !state.uploading;
            let latest = state.history.first().map(|entry| entry.id);
            latest.filter(|_| idle)
        };

        if let Some(id) = auto_select {
            debug!("Auto-selecting most recent dataset {}", id);
            // Failures are already surfaced in the snapshot
            if let Err(e) = self.select_history(id).await {
                debug!("Auto-selection of dataset {} failed: {}", id, e);
            }
        }

        Ok(Outcome::Applied)
    }

    /// Show a dataset from history. Only the newest selection is applied.
    pub async fn select_history(&self, id: DatasetId) -> Result<Outcome, SessionError> {
        let ticket = {
            let mut state = self.state();
            if !self.store.is_authenticated() {
                return Err(SessionError::NotAuthenticated);
            }
            state.selected_history_id = Some(id);
            let generation = state.selection.issue();
            state.ticket(generation)
        };

        debug!("Requesting summary for dataset {}", id);
        let result = self.api.fetch_summary(id).await;

        let mut state = self.state();
        if !state.accepts(ticket, state.selection) {
            debug!("Discarding superseded summary for dataset {}", id);
            return Ok(Outcome::Stale);
        }

        match result {
            Ok(summary) => {
                state.view = ViewState::historical(id, summary);
                Ok(Outcome::Applied)
            }
            Err(e) => {
                warn!("Failed to load summary for dataset {}: {}", id, e);
                state.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Read a CSV file from disk and upload it.
    ///
    /// The display name defaults to the file name.
    pub async fn upload_file(
        &self,
        path: &Path,
        name: Option<&str>,
    ) -> Result<Outcome, SessionError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(source) => {
                return Err(self.surface(SessionError::ReadUpload {
                    path: path.to_path_buf(),
                    source,
                }))
            }
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string());
        let name = name.map(str::to_string).unwrap_or_else(|| file_name.clone());

        self.upload_dataset(bytes, &file_name, &name).await
    }

    /// Upload a dataset and show it with its raw records.
    ///
    /// On failure the current view is kept and the server's message is
    /// surfaced.
    pub async fn upload_dataset(
        &self,
        file_bytes: Vec<u8>,
        file_name: &str,
        name: &str,
    ) -> Result<Outcome, SessionError> {
        let ticket = {
            let mut state = self.state();
            if !self.store.is_authenticated() {
                return Err(SessionError::NotAuthenticated);
            }
            state.uploading = true;
            state.error = None;
            let generation = state.uploads.issue();
            state.ticket(generation)
        };

        info!("Uploading {} ({} bytes)", name, file_bytes.len());
        let result = self.api.upload_dataset(file_bytes, file_name, name).await;

        {
            let mut state = self.state();
            if !state.accepts(ticket, state.uploads) {
                debug!("Discarding superseded upload response for {}", name);
                return Ok(Outcome::Stale);
            }
            state.uploading = false;

            match result {
                Ok(response) => {
                    info!(
                        "Uploaded dataset {} ({} rows)",
                        response.dataset_id, response.summary.total_count
                    );
                    state.view =
                        ViewState::fresh(response.dataset_id, response.summary, response.records);
                }
                Err(e) => {
                    warn!("Upload of {} failed: {}", name, e);
                    state.error = Some(e.to_string());
                    return Err(e.into());
                }
            }
        }

        if let Err(e) = self.refresh_history().await {
            debug!("History refresh after upload skipped: {}", e);
        }
        Ok(Outcome::Applied)
    }

    /// Download the PDF report for the active dataset into the download dir.
    ///
    /// A dataset uploaded in this session takes priority over a history
    /// selection. Returns `None` without contacting the service when there
    /// is nothing to report on.
    pub async fn download_report(&self) -> Result<Option<PathBuf>, SessionError> {
        let (epoch, id) = {
            let state = self.state();
            let id = state
                .view
                .fresh_dataset_id()
                .or(state.selected_history_id)
                .or(state.view.active_dataset_id);
            match id {
                Some(id) => (state.epoch, id),
                None => {
                    debug!("No active dataset, skipping report download");
                    return Ok(None);
                }
            }
        };

        debug!("Requesting report for dataset {}", id);
        let result = self.api.fetch_report_file(id).await;

        if self.state().epoch != epoch {
            debug!("Dropping report for dataset {} requested before sign-out", id);
            return Ok(None);
        }

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Report generation failed for dataset {}: {}", id, e);
                return Err(self.surface(e.into()));
            }
        };

        let path = self.download_dir.join(report_file_name(id));
        let save_err = |source| SessionError::SaveReport {
            path: path.clone(),
            source,
        };

        if let Err(e) = tokio::fs::create_dir_all(&self.download_dir).await {
            return Err(self.surface(save_err(e)));
        }
        if let Err(e) = tokio::fs::write(&path, &bytes).await {
            return Err(self.surface(save_err(e)));
        }

        info!("Saved report for dataset {} to {}", id, path.display());
        Ok(Some(path))
    }
}
