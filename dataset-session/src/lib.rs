//! Dataset Session Library
//!
//! Client-side state for the equipment parameter visualizer: who is signed
//! in, which dataset is on screen, and how asynchronous responses from the
//! analytics service are reconciled into one consistent view.
//!
//! # Overview
//!
//! The library provides:
//! - `SessionStore` - The persisted Basic-auth credential
//! - `DatasetSessionController` - The state machine driving sign-in, uploads,
//!   history selection and report downloads
//! - `SessionSnapshot` - Everything a presentation layer needs to render
//!
//! # Example
//!
//! ```ignore
//! use dataset_session::{DatasetSessionController, SessionStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(SessionStore::open_default()?);
//! let api = NativeApiClient::new(config, store.clone())?;
//! let controller = DatasetSessionController::new(api, store, "./reports");
//!
//! controller.sign_in("admin", "secret").await?;
//! let snapshot = controller.snapshot();
//! if let Some(summary) = snapshot.view.summary {
//!     println!("{} rows", summary.total_count);
//! }
//! controller.download_report().await?;
//! ```

pub mod controller;
pub mod error;
pub mod generation;
pub mod store;
pub mod view;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use controller::{report_file_name, DatasetSessionController};
pub use error::SessionError;
pub use generation::Outcome;
pub use store::SessionStore;
pub use view::{Phase, SessionSnapshot, SourceKind, ViewState};
