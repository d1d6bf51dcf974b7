//! JSON HTTP surface over the spec and feed tools.

use crate::feeds::{self, BridgeRequest};
use crate::specs;
use crate::ScoutContext;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn router(ctx: Arc<ScoutContext>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/search", get(search_handler))
        .route("/specs", get(specs_handler))
        .route("/specs/page", get(spec_page_handler))
        .route("/feeds/{bridge}", get(feed_handler))
        .route("/proxies/refresh", post(refresh_proxies_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Proxy refresh is cached, so calling this before each fetch only hits the
/// sources once per proxy TTL.
async fn keep_proxies_fresh(ctx: &ScoutContext) {
    if ctx.identities().use_proxy() {
        ctx.refresh_proxies().await;
    }
}

async fn health_check(State(ctx): State<Arc<ScoutContext>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "use_proxy": ctx.identities().use_proxy(),
        "proxies": ctx.identities().proxy_count().await,
        "spec_site": ctx.spec_site.base,
        "bridge": ctx.bridge_base,
    }))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

async fn search_handler(
    State(ctx): State<Arc<ScoutContext>>,
    Query(params): Query<SearchParams>,
) -> Json<serde_json::Value> {
    keep_proxies_fresh(&ctx).await;
    let hits = specs::search(&ctx, &params.q).await;
    Json(serde_json::json!({
        "query": params.q,
        "results": hits,
    }))
}

async fn specs_handler(
    State(ctx): State<Arc<ScoutContext>>,
    Query(params): Query<SearchParams>,
) -> Json<specs::SpecLookup> {
    keep_proxies_fresh(&ctx).await;
    Json(specs::lookup(&ctx, &params.q).await)
}

#[derive(Debug, Deserialize)]
struct PageParams {
    locator: String,
}

async fn spec_page_handler(
    State(ctx): State<Arc<ScoutContext>>,
    Query(params): Query<PageParams>,
) -> Json<serde_json::Value> {
    keep_proxies_fresh(&ctx).await;
    match specs::spec_sheet(&ctx, &params.locator).await {
        Ok(sheet) => Json(serde_json::json!({
            "locator": params.locator,
            "available": true,
            "specs": sheet,
        })),
        Err(e) => Json(serde_json::json!({
            "locator": params.locator,
            "available": false,
            "specs": {},
            "error": e.to_string(),
        })),
    }
}

#[derive(Debug, Deserialize)]
struct FeedParams {
    q: Option<String>,
    gtin: Option<String>,
}

async fn feed_handler(
    State(ctx): State<Arc<ScoutContext>>,
    Path(bridge): Path<String>,
    Query(params): Query<FeedParams>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let request = BridgeRequest::from_parts(&bridge, params.q.as_deref(), params.gtin.as_deref())
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
        })?;

    keep_proxies_fresh(&ctx).await;
    let body = match feeds::fetch_feed(&ctx, &request).await {
        Ok(entries) => serde_json::json!({
            "bridge": request.bridge_name(),
            "available": true,
            "entries": entries,
        }),
        Err(e) => serde_json::json!({
            "bridge": request.bridge_name(),
            "available": false,
            "entries": [],
            "error": e.to_string(),
        }),
    };
    Ok(Json(body))
}

/// Always goes back to the sources; the cached merge is dropped first.
async fn refresh_proxies_handler(State(ctx): State<Arc<ScoutContext>>) -> Json<serde_json::Value> {
    let count = ctx.force_refresh_proxies().await;
    Json(serde_json::json!({ "proxies": count }))
}
