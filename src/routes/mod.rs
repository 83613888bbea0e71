pub mod health;
pub mod root;

use axum::Router;
use crate::AppState;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .merge(root::router())
        .merge(health::router())
        .with_state(state)
}
