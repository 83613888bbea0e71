//! devjournal-api: HTTP bootstrap for the DevJournal backend.
//!
//! Settings are loaded once at startup ([`Settings::from_env`]) and shared
//! with every handler through [`AppState`]. [`app::build_router`] wires the
//! routes, CORS policy, request tracing and OpenAPI docs.

pub mod app;
pub mod config;
pub mod routes;

use std::sync::Arc;

pub use config::{ConfigError, Settings};

/// Version reported by `GET /`, `/health` and the OpenAPI document.
pub const API_VERSION: &str = "0.1.0";

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
}
