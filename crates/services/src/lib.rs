pub mod cloud_storage;
pub mod credential;
pub mod oauth;

pub use cloud_storage::{CloudStorage, StorageError, google_drive::GoogleDriveService};
pub use credential::{Credential, CredentialStore};
pub use oauth::{OAuthError, OAuthService};
