//! Google OAuth 2.0 for installed applications
//!
//! Refreshes tokens against the token endpoint and runs the loopback
//! authorization flow: the user opens the consent URL, Google redirects the
//! browser to a one-shot listener on 127.0.0.1, and the received code is
//! exchanged for tokens.

use std::io::{BufRead, BufReader, IsTerminal, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use super::credential::Credential;
use super::store::AuthProvider;
use crate::error::{BackupError, BackupResult};
use crate::storage::file_io::read_json_required;

/// Read-only access to the whole drive
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// The `installed` (or `web`) section of a Google client secrets file
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Load a client secrets file as downloaded from the Google Cloud console
    pub fn from_file(path: &Path) -> BackupResult<Self> {
        let file: ClientSecretsFile = read_json_required(path).map_err(|e| {
            BackupError::Config(format!("Invalid client JSON {}: {}", path.display(), e))
        })?;
        file.installed.or(file.web).ok_or_else(|| {
            BackupError::Config(format!(
                "Client JSON {} has neither an 'installed' nor a 'web' section",
                path.display()
            ))
        })
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// `AuthProvider` backed by Google's OAuth endpoints
pub struct GoogleOAuth {
    client_json: PathBuf,
    http: Client,
}

impl GoogleOAuth {
    pub fn new(client_json: impl Into<PathBuf>) -> BackupResult<Self> {
        let http = Client::builder()
            .timeout(StdDuration::from_secs(60))
            .build()?;
        Ok(Self {
            client_json: client_json.into(),
            http,
        })
    }

    fn secrets(&self) -> BackupResult<ClientSecrets> {
        ClientSecrets::from_file(&self.client_json)
    }

    fn request_token(
        &self,
        secrets: &ClientSecrets,
        params: &[(&str, &str)],
    ) -> BackupResult<TokenResponse> {
        let response = self.http.post(&secrets.token_uri).form(params).send()?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(BackupError::Auth(format!(
                "Token endpoint responded with {}: {}",
                status, detail
            )));
        }
        Ok(response.json()?)
    }

    fn wait_for_code(&self, listener: &TcpListener, state: &str) -> BackupResult<String> {
        loop {
            let (stream, peer) = listener.accept()?;
            debug!(%peer, "Authorization redirect received");
            match handle_redirect(stream, state) {
                Ok(Some(code)) => return Ok(code),
                Ok(None) => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl AuthProvider for GoogleOAuth {
    fn refresh(&self, credential: &Credential) -> BackupResult<Credential> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .ok_or_else(|| BackupError::Auth("Credential has no refresh token".into()))?;
        let secrets = self.secrets()?;

        let token = self.request_token(
            &secrets,
            &[
                ("client_id", secrets.client_id.as_str()),
                ("client_secret", secrets.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ],
        )?;

        // Google omits the refresh token on refresh; keep the one we have
        let refresh_token = token
            .refresh_token
            .clone()
            .or_else(|| credential.refresh_token.clone());
        let mut fresh = into_credential(token, refresh_token);
        if fresh.scopes.is_empty() {
            fresh.scopes = credential.scopes.clone();
        }
        info!("Access token refreshed");
        Ok(fresh)
    }

    fn authorize_interactive(&self) -> BackupResult<Credential> {
        if !std::io::stdin().is_terminal() {
            return Err(BackupError::AuthRequired(
                "interactive authorization needs a terminal; run `drive-backup auth` manually"
                    .into(),
            ));
        }

        let secrets = self.secrets()?;
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let redirect_uri = format!("http://127.0.0.1:{}/", listener.local_addr()?.port());
        let state = Uuid::new_v4().to_string();

        let consent_url = Url::parse_with_params(
            &secrets.auth_uri,
            &[
                ("client_id", secrets.client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", DRIVE_READONLY_SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state.as_str()),
            ],
        )
        .map_err(|e| BackupError::Config(format!("Invalid auth_uri: {}", e)))?;

        println!("Please visit this URL to authorize this application:");
        println!("{}", consent_url);

        let code = self.wait_for_code(&listener, &state)?;
        let token = self.request_token(
            &secrets,
            &[
                ("code", code.as_str()),
                ("client_id", secrets.client_id.as_str()),
                ("client_secret", secrets.client_secret.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ],
        )?;

        let refresh_token = token.refresh_token.clone();
        if refresh_token.is_none() {
            warn!("Authorization returned no refresh token; the next expiry will need manual authorization");
        }
        info!("Authorization complete");
        Ok(into_credential(token, refresh_token))
    }
}

fn into_credential(token: TokenResponse, refresh_token: Option<String>) -> Credential {
    let expiry = token
        .expires_in
        .map(|seconds| Utc::now() + Duration::seconds(seconds));
    let mut credential = Credential::new(token.access_token.clone(), refresh_token, expiry);
    credential.scopes = token
        .scope
        .as_deref()
        .map(|s| s.split_whitespace().map(String::from).collect())
        .unwrap_or_default();
    credential
}

/// Answer one request on the loopback listener
///
/// Returns `Ok(None)` for requests that carry no authorization result
/// (favicon fetches and the like).
fn handle_redirect(mut stream: TcpStream, expected_state: &str) -> BackupResult<Option<String>> {
    let mut request_line = String::new();
    BufReader::new(&stream).read_line(&mut request_line)?;

    let result = parse_redirect(&request_line, expected_state);
    let message = match &result {
        Ok(Some(_)) => "Authorization complete. You may close this window.",
        Ok(None) => "Waiting for authorization.",
        Err(_) => "Authorization failed. Check the terminal for details.",
    };
    let page = format!("<html><body><p>{}</p></body></html>", message);
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        page.len(),
        page
    );
    if let Err(e) = stream.write_all(response.as_bytes()) {
        debug!(error = %e, "Could not answer authorization redirect");
    }
    result
}

/// Extract the authorization code from a redirect request line
fn parse_redirect(request_line: &str, expected_state: &str) -> BackupResult<Option<String>> {
    let target = request_line.split_whitespace().nth(1).unwrap_or("/");
    let url = Url::parse(&format!("http://127.0.0.1{}", target))
        .map_err(|e| BackupError::Auth(format!("Malformed redirect: {}", e)))?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => {
                return Err(BackupError::AuthRequired(format!(
                    "authorization was denied: {}",
                    value
                )))
            }
            _ => {}
        }
    }

    match code {
        Some(code) if state.as_deref() == Some(expected_state) => Ok(Some(code)),
        Some(_) => Err(BackupError::Auth("Authorization state mismatch".into())),
        None => Ok(None),
    }
}
