/// HTTP server setup and routing
use crate::{
    context::AppContext,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;

/// Multipart framing on top of the largest accepted file
const BODY_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Build the main application router
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin(&ctx.config.cors.origin))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let media = ServeDir::new(&ctx.config.storage.media_directory);
    let media_prefix = ctx.config.storage.media_url_prefix.clone();
    let body_limit = ctx.config.storage.max_upload_bytes + BODY_OVERHEAD_BYTES;

    Router::new()
        .merge(crate::api::health::routes())
        .route("/", get(describe_service))
        .nest("/api", crate::api::routes())
        .nest_service(&media_prefix, media)
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .fallback(not_found)
}

fn cors_origin(origin: &str) -> AllowOrigin {
    if origin == "*" {
        return AllowOrigin::from(Any);
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => AllowOrigin::exact(value),
        Err(_) => {
            tracing::warn!(origin, "Invalid CORS origin, allowing any");
            AllowOrigin::from(Any)
        }
    }
}

/// Service description
async fn describe_service(State(ctx): State<AppContext>) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "message": "Notekeeper API",
        "data": {
            "version": ctx.config.service.version,
            "url": ctx.service_url(),
            "mediaUrlPrefix": ctx.config.storage.media_url_prefix,
            "aiEnabled": ctx.config.ai.api_key.is_some(),
        }
    }))
}

/// 404 handler
async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": "Endpoint not found"
        })),
    )
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> ApiResult<()> {
    let addr = format!("{}:{}", ctx.config.service.hostname, ctx.config.service.port);

    info!("Notekeeper listening on {}", addr);
    info!("   Public URL: {}", ctx.service_url());
    info!("   Media directory: {:?}", ctx.config.storage.media_directory);

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
