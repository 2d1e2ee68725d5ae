//! Session store: the persisted Basic-auth credential.
//!
//! The credential lives in a small JSON file under a fixed key so that a
//! sign-in survives process restarts. Presence of a credential is the only
//! thing that makes the client "authenticated".

use serde::{Deserialize, Serialize};
use shared::{ApiError, Credential, EquipmentApi};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::error::SessionError;

/// On-disk shape of the session file
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    equipment_auth: Option<String>,
}

pub struct SessionStore {
    path: PathBuf,
    credential: Mutex<Option<Credential>>,
}

impl SessionStore {
    /// `<config dir>/equipment-viz/session.json`
    pub fn default_path() -> Result<PathBuf, SessionError> {
        let config_dir = directories::ProjectDirs::from("com", "equipment-viz", "equipment-viz")
            .ok_or(SessionError::NoConfigDir)?
            .config_dir()
            .to_path_buf();

        Ok(config_dir.join("session.json"))
    }

    pub fn open_default() -> Result<Self, SessionError> {
        Ok(Self::open(Self::default_path()?))
    }

    /// Load the store from `path`.
    ///
    /// A missing file means signed out. An unreadable or corrupt file is
    /// logged and also treated as signed out.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let credential = if path.exists() {
            match fs::read_to_string(&path) {
                Ok(contents) => match serde_json::from_str::<StoredSession>(&contents) {
                    Ok(stored) => stored
                        .equipment_auth
                        .filter(|encoded| !encoded.is_empty())
                        .map(Credential::from_encoded),
                    Err(e) => {
                        warn!("Failed to parse session file {}, ignoring: {}", path.display(), e);
                        None
                    }
                },
                Err(e) => {
                    warn!("Failed to read session file {}, ignoring: {}", path.display(), e);
                    None
                }
            }
        } else {
            None
        };

        debug!(
            "Opened session store at {} (authenticated: {})",
            path.display(),
            credential.is_some()
        );

        Self {
            path,
            credential: Mutex::new(credential),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn slot(&self) -> MutexGuard<'_, Option<Credential>> {
        self.credential.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current credential, attached to every outgoing request
    pub fn credential(&self) -> Option<Credential> {
        self.slot().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.slot().is_some()
    }

    /// Username of the stored credential, for status display
    pub fn username(&self) -> Option<String> {
        self.slot().as_ref().and_then(Credential::username)
    }

    /// Verify a username/password against the service and store it.
    ///
    /// Any failure of the probe is reported as `InvalidCredentials` and
    /// leaves the previously stored credential untouched.
    pub async fn sign_in<A: EquipmentApi>(
        &self,
        api: &A,
        username: &str,
        password: &str,
    ) -> Result<(), SessionError> {
        let candidate = Self::verify(api, username, password).await?;
        self.commit(candidate)
    }

    /// Probe the service with a candidate credential without storing it
    pub async fn verify<A: EquipmentApi>(
        api: &A,
        username: &str,
        password: &str,
    ) -> Result<Credential, SessionError> {
        let candidate = Credential::from_login(username, password);

        if let Err(e) = api.authenticate(&candidate).await {
            warn!("Sign-in rejected for {}: {}", username, e);
            return Err(ApiError::InvalidCredentials.into());
        }
        Ok(candidate)
    }

    /// Persist a verified credential and make it current
    pub fn commit(&self, credential: Credential) -> Result<(), SessionError> {
        self.persist(Some(&credential))?;
        if let Some(user) = credential.username() {
            info!("Signed in as {}", user);
        }
        *self.slot() = Some(credential);
        Ok(())
    }

    /// Forget the credential. Safe to call when already signed out.
    ///
    /// The in-memory credential is cleared even if removing the file fails.
    pub fn sign_out(&self) -> Result<(), SessionError> {
        let previous = self.slot().take();
        if previous.is_some() {
            info!("Signed out");
        }
        self.persist(None)
    }

    fn persist(&self, credential: Option<&Credential>) -> Result<(), SessionError> {
        let persist_err = |source| SessionError::Persist {
            path: self.path.clone(),
            source,
        };

        let Some(credential) = credential else {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(persist_err(e)),
            };
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(persist_err)?;
        }

        let stored = StoredSession {
            equipment_auth: Some(credential.encoded().to_string()),
        };
        let contents = serde_json::to_string_pretty(&stored)?;

        // Write to temp file first, then rename over the real one
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, contents).map_err(persist_err)?;
        fs::rename(&temp_path, &self.path).map_err(persist_err)?;

        Ok(())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("path", &self.path)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeService;

    fn store_in(dir: &tempfile::TempDir) -> SessionStore {
        SessionStore::open(dir.path().join("session.json"))
    }

    #[tokio::test]
    async fn sign_in_persists_across_restart() {
        let dir = tempfile::tempdir().unwrap();
        let service = FakeService::with_user("admin", "secret");

        let store = store_in(&dir);
        assert!(!store.is_authenticated());
        store.sign_in(&service, "admin", "secret").await.unwrap();
        assert!(store.is_authenticated());

        // A new process opens the same file
        drop(store);
        let reopened = store_in(&dir);
        assert!(reopened.is_authenticated());
        assert_eq!(reopened.username().as_deref(), Some("admin"));
        assert_eq!(
            reopened.credential(),
            Some(Credential::from_login("admin", "secret"))
        );
    }

    #[tokio::test]
    async fn session_file_uses_fixed_key() {
        let dir = tempfile::tempdir().unwrap();
        let service = FakeService::with_user("admin", "secret");
        let store = store_in(&dir);
        store.sign_in(&service, "admin", "secret").await.unwrap();

        let contents = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(value["equipment_auth"], "YWRtaW46c2VjcmV0");
    }

    #[tokio::test]
    async fn failed_sign_in_keeps_previous_credential() {
        let dir = tempfile::tempdir().unwrap();
        let service = FakeService::with_user("admin", "secret");
        let store = store_in(&dir);
        store.sign_in(&service, "admin", "secret").await.unwrap();

        let err = store.sign_in(&service, "admin", "wrong").await.unwrap_err();
        assert_eq!(err.api_error(), Some(&ApiError::InvalidCredentials));
        assert_eq!(store.username().as_deref(), Some("admin"));
        assert!(store_in(&dir).is_authenticated());
    }

    #[tokio::test]
    async fn unreachable_service_is_invalid_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let service = FakeService::with_user("admin", "secret");
        service.set_offline(true);

        let store = store_in(&dir);
        let err = store.sign_in(&service, "admin", "secret").await.unwrap_err();
        assert_eq!(err.api_error(), Some(&ApiError::InvalidCredentials));
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn verify_does_not_store_until_committed() {
        let dir = tempfile::tempdir().unwrap();
        let service = FakeService::with_user("admin", "secret");
        let store = store_in(&dir);

        let credential = SessionStore::verify(&service, "admin", "secret")
            .await
            .unwrap();
        assert!(!store.is_authenticated());
        assert!(!store.path().exists());

        store.commit(credential).unwrap();
        assert!(store.is_authenticated());
        assert!(store_in(&dir).is_authenticated());
    }

    #[tokio::test]
    async fn sign_out_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let service = FakeService::with_user("admin", "secret");
        let store = store_in(&dir);
        store.sign_in(&service, "admin", "secret").await.unwrap();

        store.sign_out().unwrap();
        assert!(!store.is_authenticated());
        assert!(!store.path().exists());

        store.sign_out().unwrap();
        assert!(!store.is_authenticated());
        assert!(!store_in(&dir).is_authenticated());
    }

    #[test]
    fn corrupt_file_is_treated_as_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let store = SessionStore::open(&path);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn debug_hides_credential() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{"equipment_auth": "YWRtaW46c2VjcmV0"}"#).unwrap();

        let store = SessionStore::open(&path);
        let debug = format!("{:?}", store);
        assert!(debug.contains("authenticated: true"));
        assert!(!debug.contains("YWRtaW46c2VjcmV0"));
    }
}
