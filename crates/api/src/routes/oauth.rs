use axum::{
    extract::{Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /
pub async fn index() -> Html<&'static str> {
    Html(r#"Server is running! <a href="/auth/google">Login with Google</a>"#)
}

/// GET /auth/google
/// Redirect the browser to Google's consent screen with a fresh `state`.
pub async fn authorize(State(state): State<AppState>) -> Response {
    let request = state.oauth.begin_authorization();
    (StatusCode::FOUND, [(header::LOCATION, request.url)]).into_response()
}

/// GET /auth/google/callback
/// Exchange the authorization code and store the resulting credential.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackQuery>,
) -> Result<&'static str, ApiError> {
    if let Some(reason) = params.error {
        warn!(%reason, "Authorization denied by provider");
        return Err(ApiError::BadRequest(format!("Authorization denied: {reason}")));
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        warn!("No authorization code in callback");
        return Err(ApiError::BadRequest(
            "No authorization code received".to_string(),
        ));
    };

    let nonce = params.state.unwrap_or_default();
    state.oauth.verify_state(&nonce).map_err(|e| {
        warn!("Rejected callback with unrecognized state");
        ApiError::BadRequest(e.to_string())
    })?;

    let credential = state.oauth.exchange_code(&code).await.map_err(|e| {
        error!(error = %e, "Token exchange failed");
        ApiError::AuthFailed(e.to_string())
    })?;

    let has_refresh_token = credential.refresh_token.is_some();
    let replaced = state.credentials.set(credential).is_some();
    info!(has_refresh_token, replaced, "Credentials set successfully");

    Ok("Authentication successful!")
}
