pub mod google_drive;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::oauth::OAuthError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("No credential has been authorized yet")]
    NotAuthorized,
    #[error("Token refresh failed: {0}")]
    Refresh(#[from] OAuthError),
    #[error("Storage request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Storage API returned {status}: {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudFile {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedFile {
    pub id: String,
}

pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// A file to create, with its content supplied as a byte stream.
pub struct NewFile {
    pub name: String,
    pub mime_type: String,
    /// Length of `body` in bytes, when known up front.
    pub size: Option<u64>,
    pub body: ByteStream,
}

/// Operations the proxy endpoints forward to a cloud storage provider.
#[async_trait]
pub trait CloudStorage: Send + Sync {
    fn provider_name(&self) -> &str;
    async fn list_files(&self, page_size: u32, fields: &str) -> Result<Vec<CloudFile>, StorageError>;
    async fn create_file(&self, file: NewFile) -> Result<CreatedFile, StorageError>;
}
