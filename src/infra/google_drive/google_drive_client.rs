// =============================================================================
// GOOGLE DRIVE CLIENT WITH SERVICE ACCOUNT AUTHENTICATION
// =============================================================================
//
// Uploads session artifacts into a Drive folder named after the session and
// hands back a viewable link.
//
// **Setup:**
// 1. Create a service account in Google Cloud Console and enable the Drive API
// 2. Create a JSON key for it
// 3. Share the parent Drive (or a shared drive) with the service account email
// 4. Set one of:
//    - `GOOGLE_SERVICE_ACCOUNT_JSON` - The JSON content directly (for deployment)
//    - `GOOGLE_SERVICE_ACCOUNT_KEY` - Path to the JSON key file
//
// Without credentials the publisher is built in its `Unconfigured` state and
// every upload fails with "Drive setup failed".
//
// **Folder lookup:** the first folder whose name equals the session id is
// reused. Duplicate folders with the same name are not disambiguated.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;

use crate::core::pipeline::{ArtifactPublisher, PublishError};

const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
const MULTIPART_BOUNDARY: &str = "target_gap_upload_boundary";

// =============================================================================
// SERVICE ACCOUNT AUTHENTICATION
// =============================================================================

/// Service account credentials from the JSON key file.
#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountCredentials {
    /// The service account email (used as issuer in JWT).
    client_email: String,

    /// The private key in PEM format.
    private_key: String,

    /// The token URI (where to exchange JWT for access token).
    token_uri: String,
}

/// JWT claims for Google OAuth2.
#[derive(Debug, Serialize)]
struct JwtClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    /// Max 1 hour from iat.
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    token: String,
    expires_at: SystemTime,
}

/// Authenticator that handles OAuth2 with service account credentials.
pub struct ServiceAccountAuth {
    credentials: ServiceAccountCredentials,
    key: EncodingKey,
    client: Client,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

impl ServiceAccountAuth {
    /// Parses the key JSON and its PEM up front so bad credentials fail at startup.
    pub fn from_json(json: &str) -> Result<Self, PublishError> {
        let credentials: ServiceAccountCredentials = serde_json::from_str(json).map_err(|e| {
            PublishError::Unconfigured(format!("invalid service account JSON: {}", e))
        })?;
        let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
            .map_err(|e| PublishError::Unconfigured(format!("invalid private key: {}", e)))?;

        Ok(Self {
            credentials,
            key,
            client: Client::new(),
            cached_token: Arc::new(RwLock::new(None)),
        })
    }

    pub async fn from_file(path: &str) -> Result<Self, PublishError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            PublishError::Unconfigured(format!("cannot read key file {}: {}", path, e))
        })?;
        Self::from_json(&content)
    }

    /// Gets a valid access token, refreshing if necessary.
    pub async fn get_access_token(&self) -> Result<String, PublishError> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > SystemTime::now() + Duration::from_secs(60) {
                    return Ok(token.token.clone());
                }
            }
        }

        let response = self.fetch_new_token().await?;
        let lifetime = response.expires_in.unwrap_or(3600).min(55 * 60);

        let mut cached = self.cached_token.write().await;
        *cached = Some(CachedToken {
            token: response.access_token.clone(),
            expires_at: SystemTime::now() + Duration::from_secs(lifetime),
        });

        Ok(response.access_token)
    }

    async fn fetch_new_token(&self) -> Result<TokenResponse, PublishError> {
        let now = Utc::now();
        let claims = JwtClaims {
            iss: self.credentials.client_email.clone(),
            scope: DRIVE_SCOPE.to_string(),
            aud: self.credentials.token_uri.clone(),
            iat: now.timestamp(),
            exp: (now + ChronoDuration::hours(1)).timestamp(),
        };

        let jwt = encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| PublishError::Api(format!("JWT signing failed: {}", e)))?;

        let response = self
            .client
            .post(&self.credentials.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", &jwt),
            ])
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PublishError::Api(format!(
                "Token exchange failed ({}): {}",
                status, text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))
    }
}

// =============================================================================
// DRIVE API RESPONSE STRUCTURES
// =============================================================================

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

// =============================================================================
// DRIVE CLIENT
// =============================================================================

/// Base URLs of the metadata and media endpoints.
#[derive(Debug, Clone)]
pub struct DriveEndpoints {
    pub api_base: String,
    pub upload_base: String,
}

impl Default for DriveEndpoints {
    fn default() -> Self {
        Self {
            api_base: DRIVE_API_BASE.to_string(),
            upload_base: DRIVE_UPLOAD_BASE.to_string(),
        }
    }
}

/// Drive v3 REST client scoped to what the publisher needs.
pub struct GoogleDriveClient {
    client: Client,
    auth: ServiceAccountAuth,
    endpoints: DriveEndpoints,
}

impl GoogleDriveClient {
    pub fn new(auth: ServiceAccountAuth) -> Self {
        Self::with_endpoints(auth, DriveEndpoints::default())
    }

    pub fn with_endpoints(auth: ServiceAccountAuth, endpoints: DriveEndpoints) -> Self {
        Self {
            client: Client::new(),
            auth,
            endpoints,
        }
    }

    /// `files.list` query matching folders with exactly this name.
    pub fn folder_query(name: &str) -> String {
        let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
        format!("name='{}' and mimeType='{}'", escaped, FOLDER_MIME_TYPE)
    }

    pub fn view_url(file_id: &str) -> String {
        format!("https://drive.google.com/file/d/{}/view", file_id)
    }

    async fn check(
        response: reqwest::Response,
        what: &str,
    ) -> Result<reqwest::Response, PublishError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        Err(PublishError::Api(format!("{} failed ({}): {}", what, status, text)))
    }

    /// First folder named `name`, if any.
    pub async fn find_folder(&self, name: &str) -> Result<Option<String>, PublishError> {
        let token = self.auth.get_access_token().await?;
        let query = Self::folder_query(name);

        let response = self
            .client
            .get(format!("{}/files", self.endpoints.api_base))
            .bearer_auth(&token)
            .query(&[("q", query.as_str()), ("fields", "files(id)")])
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        let list: FileList = Self::check(response, "Folder lookup")
            .await?
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    pub async fn create_folder(&self, name: &str) -> Result<String, PublishError> {
        let token = self.auth.get_access_token().await?;

        let response = self
            .client
            .post(format!("{}/files", self.endpoints.api_base))
            .bearer_auth(&token)
            .query(&[("fields", "id")])
            .json(&json!({ "name": name, "mimeType": FOLDER_MIME_TYPE }))
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        let folder: DriveFile = Self::check(response, "Folder creation")
            .await?
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        tracing::info!(folder = name, folder_id = %folder.id, "Created Drive folder");
        Ok(folder.id)
    }

    /// Reuse the first folder called `name` or create one.
    pub async fn ensure_folder(&self, name: &str) -> Result<String, PublishError> {
        match self.find_folder(name).await? {
            Some(id) => Ok(id),
            None => self.create_folder(name).await,
        }
    }

    /// Upload `content` as `file_name` into `folder_id`; returns the new file id.
    pub async fn upload_file(
        &self,
        folder_id: &str,
        file_name: &str,
        mime_type: &str,
        content: Vec<u8>,
    ) -> Result<String, PublishError> {
        let token = self.auth.get_access_token().await?;
        let metadata = json!({ "name": file_name, "parents": [folder_id] });
        let body = multipart_related_body(&metadata, mime_type, &content);

        let response = self
            .client
            .post(format!("{}/files", self.endpoints.upload_base))
            .bearer_auth(&token)
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .header(
                "Content-Type",
                format!("multipart/related; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        let file: DriveFile = Self::check(response, "Upload")
            .await?
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        Ok(file.id)
    }
}

/// Body for Drive's `uploadType=multipart`: a JSON metadata part followed by the media part.
fn multipart_related_body(
    metadata: &serde_json::Value,
    mime_type: &str,
    content: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 512);
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{meta}\r\n--{b}\r\nContent-Type: {mime}\r\n\r\n",
            b = MULTIPART_BOUNDARY,
            meta = metadata,
            mime = mime_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}

// =============================================================================
// PUBLISHER
// =============================================================================

/// Drive-backed publisher. Built once at startup and injected into the pipeline.
pub enum DrivePublisher {
    Configured(GoogleDriveClient),
    /// Credentials were missing or invalid; the reason is reported on every upload.
    Unconfigured { reason: String },
}

impl DrivePublisher {
    /// Build from `GOOGLE_SERVICE_ACCOUNT_JSON` or `GOOGLE_SERVICE_ACCOUNT_KEY`.
    pub async fn from_credentials(json: Option<&str>, key_path: Option<&str>) -> Self {
        let auth = match (json, key_path) {
            (Some(json), _) => ServiceAccountAuth::from_json(json),
            (None, Some(path)) => ServiceAccountAuth::from_file(path).await,
            (None, None) => {
                return Self::unconfigured("no service account credentials configured");
            }
        };

        match auth {
            Ok(auth) => Self::Configured(GoogleDriveClient::new(auth)),
            Err(e) => {
                tracing::error!("Drive setup failed: {}", e);
                Self::unconfigured(e.to_string())
            }
        }
    }

    pub fn unconfigured(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::warn!(reason = %reason, "Drive uploads disabled");
        Self::Unconfigured { reason }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Configured(_))
    }
}

#[async_trait]
impl ArtifactPublisher for DrivePublisher {
    async fn upload(&self, file_path: &Path, session_id: &str) -> Result<String, PublishError> {
        let drive = match self {
            Self::Configured(drive) => drive,
            Self::Unconfigured { reason } => {
                return Err(PublishError::Unconfigured(reason.clone()));
            }
        };

        let content = tokio::fs::read(file_path)
            .await
            .map_err(|e| PublishError::Read {
                path: file_path.display().to_string(),
                reason: e.to_string(),
            })?;
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = mime_guess::from_path(file_path).first_or_octet_stream();

        let folder_id = drive.ensure_folder(session_id).await?;
        let file_id = drive
            .upload_file(&folder_id, &file_name, mime_type.essence_str(), content)
            .await?;

        Ok(GoogleDriveClient::view_url(&file_id))
    }
}
