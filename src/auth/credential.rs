//! The persisted access credential
//!
//! Stored as a small versioned JSON record. Token strings are wiped from
//! memory when the credential is dropped.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{BackupError, BackupResult};
use crate::storage::file_io::{read_json_optional, write_json_atomic};

/// Current on-disk format version
pub const CREDENTIAL_VERSION: u32 = 1;

/// Credentials expiring within this window are treated as expired
const EXPIRY_SKEW_SECONDS: i64 = 60;

/// OAuth token bundle authorizing access to the drive
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    #[zeroize(skip)]
    pub version: u32,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[zeroize(skip)]
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    #[zeroize(skip)]
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("version", &self.version)
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl Credential {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expiry: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            version: CREDENTIAL_VERSION,
            access_token: access_token.into(),
            refresh_token,
            expiry,
            scopes: Vec::new(),
        }
    }

    /// Whether the expiry has passed (with a small safety margin)
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry <= now + Duration::seconds(EXPIRY_SKEW_SECONDS),
            None => false,
        }
    }

    /// Usable for API calls right now
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.version == CREDENTIAL_VERSION
            && !self.access_token.is_empty()
            && !self.is_expired_at(now)
    }

    /// Expired but renewable without user interaction
    pub fn is_refreshable_at(&self, now: DateTime<Utc>) -> bool {
        self.version == CREDENTIAL_VERSION
            && self.is_expired_at(now)
            && self
                .refresh_token
                .as_deref()
                .map_or(false, |token| !token.is_empty())
    }

    /// Load the credential file, `None` if it does not exist
    pub fn load(path: &std::path::Path) -> BackupResult<Option<Self>> {
        read_json_optional(path).map_err(|e| {
            BackupError::Auth(format!(
                "Failed to read credential {}: {}",
                path.display(),
                e
            ))
        })
    }

    pub fn save(&self, path: &std::path::Path) -> BackupResult<()> {
        write_json_atomic(path, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_validity() {
        let fresh = Credential::new("a", None, Some(now() + Duration::hours(1)));
        assert!(fresh.is_valid_at(now()));
        assert!(!fresh.is_refreshable_at(now()));

        let no_expiry = Credential::new("a", None, None);
        assert!(no_expiry.is_valid_at(now()));

        let empty = Credential::new("", None, None);
        assert!(!empty.is_valid_at(now()));
    }

    #[test]
    fn test_expiry_skew() {
        let almost = Credential::new("a", None, Some(now() + Duration::seconds(30)));
        assert!(almost.is_expired_at(now()));
        assert!(!almost.is_valid_at(now()));
    }

    #[test]
    fn test_refreshable_requires_refresh_token() {
        let expired = Credential::new("a", Some("r".into()), Some(now() - Duration::hours(1)));
        assert!(expired.is_refreshable_at(now()));

        let no_refresh = Credential::new("a", None, Some(now() - Duration::hours(1)));
        assert!(!no_refresh.is_refreshable_at(now()));

        let blank_refresh = Credential::new("a", Some(String::new()), Some(now() - Duration::hours(1)));
        assert!(!blank_refresh.is_refreshable_at(now()));
    }

    #[test]
    fn test_unknown_version_is_invalid() {
        let mut credential = Credential::new("a", Some("r".into()), None);
        credential.version = 99;
        assert!(!credential.is_valid_at(now()));
        assert!(!credential.is_refreshable_at(now()));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("token.json");

        assert!(Credential::load(&path).unwrap().is_none());

        let credential = Credential::new("access", Some("refresh".into()), Some(now()));
        credential.save(&path).unwrap();

        let loaded = Credential::load(&path).unwrap().unwrap();
        assert_eq!(loaded, credential);
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let credential = Credential::new("secret-access", Some("secret-refresh".into()), None);
        let debug = format!("{:?}", credential);
        assert!(!debug.contains("secret"));
    }
}
