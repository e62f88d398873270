//! Google Sheets backend over the v4 REST API.
//!
//! Authenticates as a service account: a short-lived RS256 JWT is exchanged
//! for an OAuth access token, which is cached until shortly before expiry.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::providers::sanitize_http_error_body;

use super::{StoreError, Worksheet};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const TOKEN_REFRESH_MARGIN_SECS: u64 = 60;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Query for `values.get`. Numbers stay raw so identifiers compare cleanly;
/// date and time cells come back as the sheet displays them instead of
/// serial day numbers.
const VALUES_GET_QUERY: [(&str, &str); 2] = [
    ("valueRenderOption", "UNFORMATTED_VALUE"),
    ("dateTimeRenderOption", "FORMATTED_STRING"),
];

// ---------------------------------------------------------------------------
// Service account key
// ---------------------------------------------------------------------------

/// The fields of a service account JSON key that token exchange needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Service account email, used as the JWT issuer.
    pub client_email: String,
    /// PEM-encoded RSA private key.
    pub private_key: String,
    /// OAuth token endpoint.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_owned()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Parse a key from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Auth` when required fields are missing.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json)
            .map_err(|e| StoreError::Auth(format!("invalid service account key: {e}")))
    }

    /// Read and parse a key file.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Auth` when the file is unreadable or invalid.
    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Auth(format!(
                "failed to read service account key {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&contents)
    }
}

/// JWT claim set for the service account token exchange.
#[doc(hidden)]
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct AssertionClaims {
    /// Issuer (service account email).
    pub iss: String,
    /// Requested OAuth scope.
    pub scope: String,
    /// Audience (token endpoint).
    pub aud: String,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
    /// Expiry, seconds since epoch.
    pub exp: i64,
}

/// Build the claim set for a token exchange issued at `now`.
#[doc(hidden)]
pub fn assertion_claims(key: &ServiceAccountKey, now: i64) -> AssertionClaims {
    AssertionClaims {
        iss: key.client_email.clone(),
        scope: SHEETS_SCOPE.to_owned(),
        aud: key.token_uri.clone(),
        iat: now,
        exp: now.saturating_add(ASSERTION_LIFETIME_SECS),
    }
}

fn sign_assertion(key: &ServiceAccountKey, now: i64) -> Result<String, StoreError> {
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| StoreError::Auth(format!("invalid service account private key: {e}")))?;
    jsonwebtoken::encode(
        &Header::new(Algorithm::RS256),
        &assertion_claims(key, now),
        &encoding_key,
    )
    .map_err(|e| StoreError::Auth(format!("failed to sign token assertion: {e}")))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Debug)]
struct AccessToken {
    value: String,
    refresh_at: Instant,
}

/// `values.get` response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct ValueRange {
    /// Rows in the requested range; absent when the sheet is empty.
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

#[derive(Debug, Serialize)]
struct AppendBody<'a> {
    values: [&'a [Value]; 1],
}

/// Authenticated handle on one spreadsheet.
#[derive(Debug)]
pub struct SheetsClient {
    http: reqwest::Client,
    api_base: String,
    spreadsheet_id: String,
    key: ServiceAccountKey,
    token: Mutex<Option<AccessToken>>,
}

impl SheetsClient {
    /// Create a client for `spreadsheet_id` authenticated with `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(spreadsheet_id: String, key: ServiceAccountKey) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_base: SHEETS_API_BASE.to_owned(),
            spreadsheet_id,
            key,
            token: Mutex::new(None),
        })
    }

    /// Send API calls to `api_base` instead of the public Sheets endpoint.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// A worksheet handle sharing this client's token cache.
    pub fn worksheet(self: &Arc<Self>, title: &str) -> SheetsWorksheet {
        SheetsWorksheet {
            client: Arc::clone(self),
            title: title.to_owned(),
        }
    }

    async fn access_token(&self) -> Result<String, StoreError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let assertion = sign_assertion(&self.key, chrono::Utc::now().timestamp())?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let body = check_status(response).await?;
        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| StoreError::Auth(format!("invalid token response: {e}")))?;

        let lifetime =
            Duration::from_secs(token.expires_in.saturating_sub(TOKEN_REFRESH_MARGIN_SECS));
        let now = Instant::now();
        debug!(expires_in = token.expires_in, "sheets access token refreshed");
        *cached = Some(AccessToken {
            value: token.access_token.clone(),
            refresh_at: now.checked_add(lifetime).unwrap_or(now),
        });
        Ok(token.access_token)
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<Value>>, StoreError> {
        let url = values_url(&self.api_base, &self.spreadsheet_id, range, None)?;
        let token = self.access_token().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&VALUES_GET_QUERY)
            .send()
            .await?;
        let body = check_status(response).await?;
        let parsed: ValueRange =
            serde_json::from_str(&body).map_err(|e| StoreError::Parse(e.to_string()))?;
        Ok(parsed.values)
    }

    async fn append_values(&self, range: &str, row: &[Value]) -> Result<(), StoreError> {
        let url = values_url(&self.api_base, &self.spreadsheet_id, range, Some("append"))?;
        let token = self.access_token().await?;
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&AppendBody { values: [row] })
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<String, StoreError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(StoreError::HttpStatus {
            status: status.as_u16(),
            body: sanitize_http_error_body(&body),
        });
    }
    Ok(body)
}

/// Quote a worksheet title as an A1 range covering the whole sheet.
#[doc(hidden)]
pub fn sheet_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Build a `values` endpoint URL, optionally with a `:method` suffix.
///
/// # Errors
///
/// Returns `StoreError::Parse` if `api_base` is not a usable base URL.
#[doc(hidden)]
pub fn values_url(
    api_base: &str,
    spreadsheet_id: &str,
    range: &str,
    method: Option<&str>,
) -> Result<url::Url, StoreError> {
    let mut url = url::Url::parse(api_base)
        .map_err(|e| StoreError::Parse(format!("invalid sheets API base: {e}")))?;
    let last = match method {
        Some(method) => format!("{range}:{method}"),
        None => range.to_owned(),
    };
    url.path_segments_mut()
        .map_err(|()| StoreError::Parse("sheets API base cannot carry a path".to_owned()))?
        .pop_if_empty()
        .extend(["v4", "spreadsheets", spreadsheet_id, "values", last.as_str()]);
    Ok(url)
}

// ---------------------------------------------------------------------------
// Worksheet
// ---------------------------------------------------------------------------

/// One worksheet (tab) of a Google spreadsheet.
#[derive(Debug, Clone)]
pub struct SheetsWorksheet {
    client: Arc<SheetsClient>,
    title: String,
}

#[async_trait]
impl Worksheet for SheetsWorksheet {
    fn title(&self) -> &str {
        &self.title
    }

    async fn rows(&self) -> Result<Vec<Vec<Value>>, StoreError> {
        self.client.get_values(&sheet_range(&self.title)).await
    }

    async fn append_row(&self, values: Vec<Value>) -> Result<(), StoreError> {
        self.client
            .append_values(&sheet_range(&self.title), &values)
            .await
    }
}
