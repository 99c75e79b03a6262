use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use parking_lot::Mutex;
use serde_json::json;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tokio::net::TcpListener;

pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
/// Exchanges for `access-1` / `refresh-1`.
pub const VALID_CODE: &str = "valid-code";
/// Exchanges for `access-2` / `refresh-2`.
pub const SECOND_CODE: &str = "second-code";
pub const REFRESHED_TOKEN: &str = "refreshed-access";
pub const UPLOADED_FILE_ID: &str = "uploaded-file-id";

#[derive(Debug, Clone)]
pub struct ListRequest {
    pub token: String,
    pub query: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub token: String,
    pub query: HashMap<String, String>,
    pub content_type: String,
    pub content_length: Option<u64>,
    pub body: Vec<u8>,
}

impl UploadRequest {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Default)]
struct Recorded {
    token_requests: Vec<HashMap<String, String>>,
    list_requests: Vec<ListRequest>,
    uploads: Vec<UploadRequest>,
    rejected: usize,
}

#[derive(Clone, Default)]
struct FakeState {
    recorded: Arc<Mutex<Recorded>>,
    valid_tokens: Arc<Mutex<HashSet<String>>>,
}

impl FakeState {
    /// Bearer token of the request, if it is one this fake issued.
    fn authorize(&self, headers: &HeaderMap) -> Option<String> {
        let token = headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?
            .to_string();
        if self.valid_tokens.lock().contains(&token) {
            Some(token)
        } else {
            self.recorded.lock().rejected += 1;
            None
        }
    }
}

/// In-process stand-in for Google's token endpoint and the Drive v3 API.
pub struct FakeGoogle {
    pub base_url: String,
    state: FakeState,
}

impl FakeGoogle {
    pub async fn spawn() -> Self {
        let state = FakeState::default();
        let app = Router::new()
            .route("/token", post(token))
            .route("/drive/v3/files", get(list_files))
            .route("/upload/drive/v3/files", post(upload_file))
            .layer(DefaultBodyLimit::disable())
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake Google");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Makes the Drive endpoints accept `token` without an exchange.
    pub fn accept_token(&self, token: &str) {
        self.state.valid_tokens.lock().insert(token.to_string());
    }

    pub fn token_requests(&self) -> Vec<HashMap<String, String>> {
        self.state.recorded.lock().token_requests.clone()
    }

    pub fn list_requests(&self) -> Vec<ListRequest> {
        self.state.recorded.lock().list_requests.clone()
    }

    pub fn uploads(&self) -> Vec<UploadRequest> {
        self.state.recorded.lock().uploads.clone()
    }

    /// Drive calls turned away for a missing or unknown bearer token.
    pub fn rejected(&self) -> usize {
        self.state.recorded.lock().rejected
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": {
                "code": 401,
                "message": "Request is missing required authentication credential.",
            }
        })),
    )
        .into_response()
}

async fn token(State(fake): State<FakeState>, Form(form): Form<HashMap<String, String>>) -> Response {
    fake.recorded.lock().token_requests.push(form.clone());

    let field = |name: &str| form.get(name).map(String::as_str);
    let (access, refresh) = match (field("grant_type"), field("code"), field("refresh_token")) {
        (Some("authorization_code"), Some(VALID_CODE), _) => ("access-1", Some("refresh-1")),
        (Some("authorization_code"), Some(SECOND_CODE), _) => ("access-2", Some("refresh-2")),
        (Some("refresh_token"), _, Some(rt)) if rt.starts_with("refresh-") => {
            (REFRESHED_TOKEN, None)
        }
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "invalid_grant",
                    "error_description": "Bad Request",
                })),
            )
                .into_response();
        }
    };

    fake.valid_tokens.lock().insert(access.to_string());
    let mut body = json!({
        "access_token": access,
        "expires_in": 3599,
        "scope": DRIVE_SCOPE,
        "token_type": "Bearer",
    });
    if let Some(refresh) = refresh {
        body["refresh_token"] = json!(refresh);
    }
    Json(body).into_response()
}

async fn list_files(
    State(fake): State<FakeState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let Some(token) = fake.authorize(&headers) else {
        return unauthorized();
    };
    fake.recorded
        .lock()
        .list_requests
        .push(ListRequest { token, query });

    Json(json!({
        "files": [
            { "name": "report.pdf", "id": "file-1" },
            { "name": "notes.txt", "id": "file-2" },
        ]
    }))
    .into_response()
}

async fn upload_file(
    State(fake): State<FakeState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let Some(token) = fake.authorize(&headers) else {
        return unauthorized();
    };
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    fake.recorded.lock().uploads.push(UploadRequest {
        token,
        query,
        content_type: header_str(header::CONTENT_TYPE).unwrap_or_default(),
        content_length: header_str(header::CONTENT_LENGTH).and_then(|v| v.parse().ok()),
        body: body.to_vec(),
    });

    Json(json!({ "id": UPLOADED_FILE_ID })).into_response()
}
