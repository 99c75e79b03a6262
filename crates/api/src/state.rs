use drivegate_config::Settings;
use drivegate_services::{CloudStorage, CredentialStore, GoogleDriveService, OAuthService};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub oauth: Arc<OAuthService>,
    pub credentials: CredentialStore,
    pub storage: Arc<dyn CloudStorage>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let credentials = CredentialStore::new();
        let oauth = Arc::new(OAuthService::new(settings.google.clone()));
        let storage: Arc<dyn CloudStorage> = Arc::new(GoogleDriveService::new(
            Arc::clone(&oauth),
            credentials.clone(),
            &settings.google,
        ));

        Self {
            settings,
            oauth,
            credentials,
            storage,
        }
    }
}
