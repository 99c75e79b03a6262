use async_trait::async_trait;
use bytes::Bytes;
use drivegate_config::GoogleSettings;
use futures::{StreamExt, stream};
use reqwest::{Body, Client, Response, header};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::{CloudFile, CloudStorage, CreatedFile, NewFile, StorageError};
use crate::{credential::CredentialStore, oauth::OAuthService};

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<CloudFile>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Drive v3 client that authenticates with whatever credential the shared
/// store holds at call time.
pub struct GoogleDriveService {
    client: Client,
    oauth: Arc<OAuthService>,
    credentials: CredentialStore,
    api_url: String,
    upload_url: String,
}

impl GoogleDriveService {
    pub fn new(
        oauth: Arc<OAuthService>,
        credentials: CredentialStore,
        settings: &GoogleSettings,
    ) -> Self {
        Self {
            client: Client::new(),
            oauth,
            credentials,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            upload_url: settings.upload_url.trim_end_matches('/').to_string(),
        }
    }

    /// Current access token, refreshed first when it has expired.
    async fn access_token(&self) -> Result<String, StorageError> {
        let current = self.credentials.get().ok_or(StorageError::NotAuthorized)?;
        if !current.is_expired() {
            return Ok(current.access_token);
        }
        let Some(refresh_token) = current.refresh_token.as_deref() else {
            debug!("Access token expired and no refresh token is available");
            return Ok(current.access_token);
        };

        let fresh = self.oauth.refresh(refresh_token).await?;
        info!("Refreshed expired access token");
        Ok(self.credentials.replace_if_current(&current, fresh).access_token)
    }
}

#[async_trait]
impl CloudStorage for GoogleDriveService {
    fn provider_name(&self) -> &str {
        "google_drive"
    }

    async fn list_files(&self, page_size: u32, fields: &str) -> Result<Vec<CloudFile>, StorageError> {
        let token = self.access_token().await?;
        let page_size = page_size.to_string();

        let resp = self
            .client
            .get(format!("{}/files", self.api_url))
            .bearer_auth(token)
            .query(&[("pageSize", page_size.as_str()), ("fields", fields)])
            .send()
            .await?;

        let list: FileList = check_status(resp).await?.json().await?;
        Ok(list.files)
    }

    async fn create_file(&self, file: NewFile) -> Result<CreatedFile, StorageError> {
        let token = self.access_token().await?;
        let boundary = format!("drivegate-{}", nanoid::nanoid!(24));
        let (head, tail) = related_parts(&boundary, &file.name, &file.mime_type);
        let content_length = file
            .size
            .map(|size| head.len() as u64 + size + tail.len() as u64);

        let body = stream::once(async move { Ok::<_, std::io::Error>(Bytes::from(head)) })
            .chain(file.body)
            .chain(stream::once(async move { Ok(Bytes::from(tail)) }));

        let mut request = self
            .client
            .post(format!("{}/files", self.upload_url))
            .bearer_auth(token)
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .header(
                header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            );
        if let Some(len) = content_length {
            request = request.header(header::CONTENT_LENGTH, len);
        }

        let resp = request
            .body(Body::wrap_stream(body))
            .send()
            .await?;

        Ok(check_status(resp).await?.json().await?)
    }
}

/// Framing around the media bytes of a `multipart/related` upload: the
/// metadata part plus the media part header, and the closing delimiter.
fn related_parts(boundary: &str, name: &str, mime_type: &str) -> (String, String) {
    let metadata = serde_json::json!({ "name": name, "mimeType": mime_type });
    let head = format!(
        "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n--{boundary}\r\nContent-Type: {mime_type}\r\n\r\n"
    );
    let tail = format!("\r\n--{boundary}--\r\n");
    (head, tail)
}

async fn check_status(resp: Response) -> Result<Response, StorageError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body);
    Err(StorageError::Api {
        status: status.as_u16(),
        message,
    })
}
