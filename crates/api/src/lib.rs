pub mod error;
pub mod routes;
pub mod state;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // OAuth routes
    let auth_routes = Router::new()
        .route("/google", get(routes::oauth::authorize))
        .route("/google/callback", get(routes::oauth::callback));

    // Drive proxy routes; uploads are streamed, so no body size cap
    let file_routes = Router::new()
        .route("/files", get(routes::file::list))
        .route(
            "/upload",
            post(routes::file::upload).layer(DefaultBodyLimit::disable()),
        );

    Router::new()
        .route("/", get(routes::oauth::index))
        .route("/health", get(health_check))
        .nest("/auth", auth_routes)
        .merge(file_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
