use config::{Config, ConfigError, Environment, File, Map};
use serde::Deserialize;
use thiserror::Error;

/// Variables that must be set before the server will start.
pub const REQUIRED_VARS: [&str; 3] = ["CLIENT_ID", "CLIENT_SECRET", "REDIRECT_URI"];

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(
        "missing required settings: {} (required: {})",
        .0.join(", "),
        REQUIRED_VARS.join(", ")
    )]
    Missing(Vec<&'static str>),
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub google: GoogleSettings,
    pub upload: UploadSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GoogleSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
    pub upload_url: String,
    pub state_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadSettings {
    pub dir: String,
}

impl Settings {
    /// Loads settings from config files and the process environment.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(std::env::vars())
    }

    /// Loads settings using `vars` in place of the process environment.
    ///
    /// `DRIVEGATE__SECTION__KEY` variables override config files, and the
    /// bare `CLIENT_ID`, `CLIENT_SECRET`, `REDIRECT_URI` and `PORT` variables
    /// override everything else.
    pub fn load_from<I>(vars: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: Map<String, String> = vars.into_iter().collect();
        let bare = |name: &str| vars.get(name).filter(|v| !v.is_empty()).cloned();

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("DRIVEGATE")
                    .try_parsing(true)
                    .list_separator(" ")
                    .with_list_parse_key("google.scopes")
                    .source(Some(vars.clone())),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 5000)?
            .set_default("google.client_id", "")?
            .set_default("google.client_secret", "")?
            .set_default("google.redirect_uri", "")?
            .set_default(
                "google.scopes",
                vec!["https://www.googleapis.com/auth/drive".to_string()],
            )?
            .set_default("google.auth_url", "https://accounts.google.com/o/oauth2/v2/auth")?
            .set_default("google.token_url", "https://oauth2.googleapis.com/token")?
            .set_default("google.api_url", "https://www.googleapis.com/drive/v3")?
            .set_default("google.upload_url", "https://www.googleapis.com/upload/drive/v3")?
            .set_default("google.state_ttl_secs", 600)?
            .set_default("upload.dir", "uploads")?
            .set_override_option("google.client_id", bare("CLIENT_ID"))?
            .set_override_option("google.client_secret", bare("CLIENT_SECRET"))?
            .set_override_option("google.redirect_uri", bare("REDIRECT_URI"))?
            .set_override_option("app.port", bare("PORT"))?
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Fails with every required setting that is missing or blank.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let missing: Vec<&'static str> = [
            (REQUIRED_VARS[0], &self.google.client_id),
            (REQUIRED_VARS[1], &self.google.client_secret),
            (REQUIRED_VARS[2], &self.google.redirect_uri),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SettingsError::Missing(missing))
        }
    }
}
