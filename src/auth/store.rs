//! Credential store
//!
//! Loads the persisted credential, refreshes it when it has expired, and
//! falls back to interactive re-authorization (announced by a notification)
//! when no refresh is possible.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::credential::Credential;
use crate::error::BackupResult;
use crate::notify::{Notification, Notifier};

/// The network side of the credential lifecycle
pub trait AuthProvider {
    /// Exchange the refresh token for a new access token
    fn refresh(&self, credential: &Credential) -> BackupResult<Credential>;

    /// Run the user-facing authorization flow
    ///
    /// Fails with `BackupError::AuthRequired` when no user can be reached
    /// from the current process.
    fn authorize_interactive(&self) -> BackupResult<Credential>;
}

/// Anything that can hand the pipeline a valid credential
pub trait CredentialSource {
    fn obtain(&self, notifier: &dyn Notifier) -> BackupResult<Credential>;
}

/// File-backed credential store
pub struct CredentialStore<P> {
    token_path: PathBuf,
    provider: P,
    now: fn() -> DateTime<Utc>,
}

impl<P: AuthProvider> CredentialStore<P> {
    pub fn new(token_path: impl Into<PathBuf>, provider: P) -> Self {
        Self {
            token_path: token_path.into(),
            provider,
            now: Utc::now,
        }
    }

    /// Evaluate expiry against a fixed clock
    pub fn with_clock(mut self, now: fn() -> DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn token_path(&self) -> &PathBuf {
        &self.token_path
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Return a valid credential, renewing it if needed
    pub fn obtain(&self, notifier: &dyn Notifier) -> BackupResult<Credential> {
        let now = (self.now)();

        let stored = match Credential::load(&self.token_path) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable credential file");
                None
            }
        };

        if let Some(credential) = &stored {
            if credential.is_valid_at(now) {
                return Ok(credential.clone());
            }
        }

        let refreshed = match &stored {
            Some(credential) if credential.is_refreshable_at(now) => {
                info!("Access token expired, refreshing");
                match self.provider.refresh(credential) {
                    Ok(fresh) => Some(fresh),
                    Err(e) => {
                        warn!(error = %e, "Token refresh failed");
                        None
                    }
                }
            }
            _ => None,
        };

        let credential = match refreshed {
            Some(fresh) => fresh,
            None => self.reauthorize(notifier)?,
        };

        credential.save(&self.token_path)?;
        Ok(credential)
    }

    /// Announce that a new token is needed and run the interactive flow
    pub fn reauthorize(&self, notifier: &dyn Notifier) -> BackupResult<Credential> {
        notifier.send(&Notification::TokenNeeded);
        info!("Starting interactive authorization");
        self.provider.authorize_interactive()
    }

    /// Run the interactive flow unconditionally and persist the result
    pub fn authorize_now(&self) -> BackupResult<Credential> {
        let credential = self.provider.authorize_interactive()?;
        credential.save(&self.token_path)?;
        Ok(credential)
    }
}

impl<P: AuthProvider> CredentialSource for CredentialStore<P> {
    fn obtain(&self, notifier: &dyn Notifier) -> BackupResult<Credential> {
        CredentialStore::obtain(self, notifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackupError;
    use crate::testing::RecordingNotifier;
    use chrono::Duration;
    use std::cell::Cell;
    use std::fs;
    use tempfile::TempDir;

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[derive(Default)]
    struct FakeProvider {
        refresh_fails: bool,
        interactive_available: bool,
        refreshes: Cell<usize>,
        authorizations: Cell<usize>,
    }

    impl AuthProvider for FakeProvider {
        fn refresh(&self, credential: &Credential) -> BackupResult<Credential> {
            self.refreshes.set(self.refreshes.get() + 1);
            if self.refresh_fails {
                return Err(BackupError::Auth("invalid_grant".into()));
            }
            Ok(Credential::new(
                "refreshed",
                credential.refresh_token.clone(),
                Some(fixed_now() + Duration::hours(1)),
            ))
        }

        fn authorize_interactive(&self) -> BackupResult<Credential> {
            self.authorizations.set(self.authorizations.get() + 1);
            if !self.interactive_available {
                return Err(BackupError::AuthRequired("no terminal".into()));
            }
            Ok(Credential::new(
                "interactive",
                Some("new-refresh".into()),
                Some(fixed_now() + Duration::hours(1)),
            ))
        }
    }

    fn store(temp: &TempDir, provider: FakeProvider) -> CredentialStore<FakeProvider> {
        CredentialStore::new(temp.path().join("token.json"), provider).with_clock(fixed_now)
    }

    #[test]
    fn test_valid_credential_is_returned_without_write() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp, FakeProvider::default());
        let stored = Credential::new("current", None, Some(fixed_now() + Duration::hours(1)));
        stored.save(store.token_path()).unwrap();
        let before = fs::metadata(store.token_path()).unwrap().modified().unwrap();

        let notifier = RecordingNotifier::default();
        let credential = store.obtain(&notifier).unwrap();

        assert_eq!(credential.access_token, "current");
        assert_eq!(store.provider().refreshes.get(), 0);
        assert_eq!(store.provider().authorizations.get(), 0);
        assert!(notifier.subjects().is_empty());
        let after = fs::metadata(store.token_path()).unwrap().modified().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_expired_credential_is_refreshed_and_persisted() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp, FakeProvider::default());
        Credential::new("old", Some("r".into()), Some(fixed_now() - Duration::hours(1)))
            .save(store.token_path())
            .unwrap();

        let notifier = RecordingNotifier::default();
        let credential = store.obtain(&notifier).unwrap();

        assert_eq!(credential.access_token, "refreshed");
        assert_eq!(store.provider().refreshes.get(), 1);
        assert!(notifier.subjects().is_empty());
        let persisted = Credential::load(store.token_path()).unwrap().unwrap();
        assert_eq!(persisted.access_token, "refreshed");
    }

    #[test]
    fn test_missing_credential_notifies_and_authorizes() {
        let temp = TempDir::new().unwrap();
        let store = store(
            &temp,
            FakeProvider {
                interactive_available: true,
                ..Default::default()
            },
        );

        let notifier = RecordingNotifier::default();
        let credential = store.obtain(&notifier).unwrap();

        assert_eq!(credential.access_token, "interactive");
        assert_eq!(notifier.subjects(), vec!["[Notification] New Token Needed"]);
        assert!(store.token_path().exists());
    }

    #[test]
    fn test_failed_refresh_falls_back_to_interactive() {
        let temp = TempDir::new().unwrap();
        let store = store(
            &temp,
            FakeProvider {
                refresh_fails: true,
                interactive_available: true,
                ..Default::default()
            },
        );
        Credential::new("old", Some("r".into()), Some(fixed_now() - Duration::hours(1)))
            .save(store.token_path())
            .unwrap();

        let notifier = RecordingNotifier::default();
        let credential = store.obtain(&notifier).unwrap();

        assert_eq!(credential.access_token, "interactive");
        assert_eq!(store.provider().refreshes.get(), 1);
        assert_eq!(notifier.subjects().len(), 1);
    }

    #[test]
    fn test_auth_required_when_no_interactive_path() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp, FakeProvider::default());
        Credential::new("old", None, Some(fixed_now() - Duration::hours(1)))
            .save(store.token_path())
            .unwrap();

        let notifier = RecordingNotifier::default();
        let err = store.obtain(&notifier).unwrap_err();

        assert!(err.is_auth_required());
        assert_eq!(notifier.subjects(), vec!["[Notification] New Token Needed"]);
        let persisted = Credential::load(store.token_path()).unwrap().unwrap();
        assert_eq!(persisted.access_token, "old");
    }

    #[test]
    fn test_corrupt_credential_file_triggers_reauthorization() {
        let temp = TempDir::new().unwrap();
        let store = store(
            &temp,
            FakeProvider {
                interactive_available: true,
                ..Default::default()
            },
        );
        fs::write(store.token_path(), "\u{80}not a token").unwrap();

        let notifier = RecordingNotifier::default();
        let credential = store.obtain(&notifier).unwrap();
        assert_eq!(credential.access_token, "interactive");
    }
}
