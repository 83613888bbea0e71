//! Router assembly: routes, CORS, request tracing and API docs.

use std::sync::Arc;

use axum::{http::HeaderValue, Router};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{ConfigError, Settings};
use crate::{routes, AppState, API_VERSION};

#[derive(OpenApi)]
#[openapi(
    paths(routes::root::root, routes::health::health_check),
    components(schemas(routes::root::RootResponse, routes::health::HealthResponse)),
    tags(
        (name = "root", description = "Service banner"),
        (name = "health", description = "Liveness check")
    )
)]
struct ApiDoc;

/// OpenAPI document titled after the configured `APP_NAME`.
pub fn openapi(settings: &Settings) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = settings.app_name.clone();
    doc.info.version = API_VERSION.to_string();
    doc
}

/// Build the full application router.
///
/// Fails only if a configured CORS origin is not a valid header value.
pub fn build_router(settings: Arc<Settings>) -> Result<Router, ConfigError> {
    let cors = cors_layer(&settings)?;
    let docs = SwaggerUi::new("/docs").url("/openapi.json", openapi(&settings));

    let app = routes::api_router(AppState { settings })
        .merge(docs)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

/// CORS policy restricted only by origin.
///
/// Credentials are always allowed, which rules out the `*` wildcard for
/// methods and headers; the request's own values are mirrored instead. A
/// `*` entry in the origin list mirrors any request origin.
pub fn cors_layer(settings: &Settings) -> Result<CorsLayer, ConfigError> {
    let origins = settings.cors_origins_list();

    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::mirror_request()
    } else {
        let values = origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|err| ConfigError::InvalidValue {
                    name: "CORS_ORIGINS".to_string(),
                    reason: format!("{origin:?}: {err}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(values)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}
