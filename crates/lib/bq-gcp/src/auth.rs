//! Access-token acquisition for the BigQuery REST client.
//!
//! Two sources are supported: a service account JSON key exchanged for a
//! bearer token via the OAuth2 JWT grant, and the GCE metadata server for
//! workloads running with ambient credentials. Tokens are cached behind an
//! async mutex and refreshed shortly before expiry, so concurrent sessions
//! share one token fetch.

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use bq_core::BackendError;

use crate::SetupError;

const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const EXPIRY_MARGIN_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    #[serde(rename = "type")]
    key_type: String,
    client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

enum TokenSource {
    ServiceAccount {
        client_email: String,
        token_uri: String,
        signing_key: Box<EncodingKey>,
    },
    Metadata,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Hands out bearer tokens for BigQuery API calls.
pub struct TokenProvider {
    source: TokenSource,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProvider").finish_non_exhaustive()
    }
}

impl TokenProvider {
    /// Builds a provider from a service account JSON key file.
    ///
    /// # Errors
    /// Returns [`SetupError::Credential`] when the file cannot be read, is
    /// not a service account key, or carries an invalid RSA private key.
    pub fn from_key_file(path: &Path, http: reqwest::Client) -> Result<Self, SetupError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| SetupError::Credential(format!("{}: {err}", path.display())))?;
        let key: ServiceAccountKey = serde_json::from_str(&raw)
            .map_err(|err| SetupError::Credential(format!("malformed key file: {err}")))?;
        if key.key_type != "service_account" {
            return Err(SetupError::Credential(format!(
                "expected a service_account key, got {:?}",
                key.key_type
            )));
        }
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|err| SetupError::Credential(format!("invalid private key: {err}")))?;
        Ok(Self {
            source: TokenSource::ServiceAccount {
                client_email: key.client_email,
                token_uri: key.token_uri,
                signing_key: Box::new(signing_key),
            },
            http,
            cached: Mutex::new(None),
        })
    }

    /// Builds a provider backed by the GCE metadata server.
    #[must_use]
    pub fn metadata(http: reqwest::Client) -> Self {
        Self {
            source: TokenSource::Metadata,
            http,
            cached: Mutex::new(None),
        }
    }

    /// Provider pre-seeded with an unexpiring token; no fetch ever runs.
    #[cfg(test)]
    pub(crate) fn with_cached_token(token: &str, http: reqwest::Client) -> Self {
        Self {
            source: TokenSource::Metadata,
            http,
            cached: Mutex::new(Some(CachedToken {
                value: token.to_string(),
                expires_at: Instant::now() + Duration::from_secs(3600),
            })),
        }
    }

    /// Returns a bearer token, refreshing the cached one when it is near
    /// expiry.
    ///
    /// # Errors
    /// Returns [`BackendError::Auth`] when no token can be obtained.
    pub async fn access_token(&self) -> Result<String, BackendError> {
        let mut guard = self.cached.lock().await;
        if let Some(token) = guard.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }
        debug!("refreshing BigQuery access token");
        let fresh = self.fetch().await?;
        let value = fresh.value.clone();
        *guard = Some(fresh);
        Ok(value)
    }

    async fn fetch(&self) -> Result<CachedToken, BackendError> {
        let response = match &self.source {
            TokenSource::ServiceAccount {
                client_email,
                token_uri,
                signing_key,
            } => {
                let assertion = sign_assertion(client_email, token_uri, signing_key)?;
                let reply = self
                    .http
                    .post(token_uri)
                    .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
                    .send()
                    .await
                    .map_err(|err| BackendError::Auth(format!("token exchange failed: {err}")))?;
                read_token_response(reply).await?
            }
            TokenSource::Metadata => {
                let reply = self
                    .http
                    .get(METADATA_TOKEN_URL)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await
                    .map_err(|err| {
                        BackendError::Auth(format!("metadata server unreachable: {err}"))
                    })?;
                read_token_response(reply).await?
            }
        };

        let lifetime = response
            .expires_in
            .unwrap_or(TOKEN_LIFETIME_SECS.unsigned_abs())
            .saturating_sub(EXPIRY_MARGIN_SECS);
        Ok(CachedToken {
            value: response.access_token,
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        })
    }
}

fn sign_assertion(
    client_email: &str,
    token_uri: &str,
    signing_key: &EncodingKey,
) -> Result<String, BackendError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        iss: client_email,
        scope: CLOUD_PLATFORM_SCOPE,
        aud: token_uri,
        iat: now,
        exp: now + TOKEN_LIFETIME_SECS,
    };
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, signing_key)
        .map_err(|err| BackendError::Auth(format!("failed to sign token assertion: {err}")))
}

async fn read_token_response(reply: reqwest::Response) -> Result<TokenResponse, BackendError> {
    let status = reply.status();
    if !status.is_success() {
        return Err(BackendError::Auth(format!(
            "token endpoint returned status {status}"
        )));
    }
    reply
        .json::<TokenResponse>()
        .await
        .map_err(|err| BackendError::Auth(format!("malformed token response: {err}")))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_key_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp key file");
        file.write_all(contents.as_bytes()).expect("write temp key file");
        file
    }

    #[test]
    fn rejects_missing_key_file() {
        let err = TokenProvider::from_key_file(
            Path::new("/nonexistent/key.json"),
            reqwest::Client::new(),
        )
        .expect_err("missing file should fail");
        assert!(matches!(err, SetupError::Credential(_)));
    }

    #[test]
    fn rejects_non_json_key_file() {
        let file = write_key_file("not json at all");
        let err = TokenProvider::from_key_file(file.path(), reqwest::Client::new())
            .expect_err("garbage should fail");
        assert!(err.to_string().contains("malformed key file"));
    }

    #[test]
    fn rejects_wrong_key_type() {
        let file = write_key_file(
            r#"{"type":"authorized_user","client_email":"a@b","private_key":"x"}"#,
        );
        let err = TokenProvider::from_key_file(file.path(), reqwest::Client::new())
            .expect_err("wrong type should fail");
        assert!(err.to_string().contains("service_account"));
    }

    #[test]
    fn rejects_invalid_private_key() {
        let file = write_key_file(
            r#"{"type":"service_account","client_email":"a@b","private_key":"not a pem"}"#,
        );
        let err = TokenProvider::from_key_file(file.path(), reqwest::Client::new())
            .expect_err("bad pem should fail");
        assert!(err.to_string().contains("invalid private key"));
    }

    #[test]
    fn key_file_defaults_token_uri() {
        let key: ServiceAccountKey = serde_json::from_str(
            r#"{"type":"service_account","client_email":"a@b","private_key":"x"}"#,
        )
        .expect("key should parse");
        assert_eq!(key.token_uri, "https://oauth2.googleapis.com/token");
    }
}
