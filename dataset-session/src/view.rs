//! View-state handed to the presentation layer.

use serde::Serialize;
use shared::{DatasetId, DatasetRecord, HistoryEntry, Summary};

/// Where the displayed dataset came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Just uploaded in this session; raw records are available
    Fresh,
    /// Picked from history; summary only
    Historical,
}

/// The reconciled dataset view. Replaced wholesale, never patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewState {
    pub summary: Option<Summary>,
    pub records: Vec<DatasetRecord>,
    pub active_dataset_id: Option<DatasetId>,
    pub source_kind: Option<SourceKind>,
}

impl ViewState {
    pub fn fresh(id: DatasetId, summary: Summary, records: Vec<DatasetRecord>) -> Self {
        Self {
            summary: Some(summary),
            records,
            active_dataset_id: Some(id),
            source_kind: Some(SourceKind::Fresh),
        }
    }

    pub fn historical(id: DatasetId, summary: Summary) -> Self {
        Self {
            summary: Some(summary),
            records: Vec::new(),
            active_dataset_id: Some(id),
            source_kind: Some(SourceKind::Historical),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.summary.is_some()
    }

    /// Id of a dataset uploaded in this session, if that is what's shown
    pub fn fresh_dataset_id(&self) -> Option<DatasetId> {
        match self.source_kind {
            Some(SourceKind::Fresh) => self.active_dataset_id,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Unauthenticated,
    /// Signed in, nothing displayed yet
    AuthenticatedEmpty,
    AuthenticatedLoaded,
}

/// Everything the presentation layer renders from
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub view: ViewState,
    pub history: Vec<HistoryEntry>,
    /// Most recently requested history entry, possibly still loading
    pub selected_history_id: Option<DatasetId>,
    pub loading_history: bool,
    pub uploading: bool,
    /// Dismissible message from the last failed operation
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn summary() -> Summary {
        Summary {
            total_count: 1,
            averages: BTreeMap::new(),
            equipment_type_distribution: BTreeMap::from([("Pump".to_string(), 1)]),
        }
    }

    #[test]
    fn historical_view_has_no_records() {
        let view = ViewState::historical(DatasetId(4), summary());
        assert!(view.is_loaded());
        assert!(view.records.is_empty());
        assert_eq!(view.source_kind, Some(SourceKind::Historical));
        assert_eq!(view.fresh_dataset_id(), None);
    }

    #[test]
    fn fresh_view_exposes_its_id() {
        let view = ViewState::fresh(DatasetId(9), summary(), Vec::new());
        assert_eq!(view.fresh_dataset_id(), Some(DatasetId(9)));
        assert!(!ViewState::default().is_loaded());
    }

    #[test]
    fn source_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SourceKind::Fresh).unwrap(), "\"fresh\"");
        assert_eq!(
            serde_json::to_string(&SourceKind::Historical).unwrap(),
            "\"historical\""
        );
    }
}
