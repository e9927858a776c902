//! Credential lifecycle
//!
//! Every remote call is gated on a valid `Credential`. The `CredentialStore`
//! owns the persisted token and decides between reuse, refresh, and
//! interactive re-authorization; `GoogleOAuth` performs the network side.

pub mod credential;
pub mod oauth;
pub mod store;

pub use credential::Credential;
pub use oauth::{ClientSecrets, GoogleOAuth};
pub use store::{AuthProvider, CredentialSource, CredentialStore};
