use axum::{routing::get, Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{AppState, API_VERSION};

#[derive(Debug, Serialize, ToSchema)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
    /// Always "running" while the process serves requests
    pub status: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(root))
}

/// Fixed service banner; does not depend on settings.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service banner", body = RootResponse),
    ),
    tag = "root"
)]
pub(crate) async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "DevJournal API".to_string(),
        version: API_VERSION.to_string(),
        status: "running".to_string(),
    })
}
