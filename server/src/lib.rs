use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use vsr_core::{Config, Evaluation, IndexSummary, QueryEngine, SearchMode};

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_mode")]
    pub mode: SearchMode,
}
fn default_k() -> usize { 10 }
fn default_mode() -> SearchMode { SearchMode::Vanilla }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub mode: String,
    pub took_s: f64,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: u32,
    pub external_id: String,
    pub score: f32,
    pub title: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<QueryEngine>,
    pub evaluation: Arc<Evaluation>,
}

pub fn build_app(config: Config) -> Result<(Router, AppState)> {
    let evaluation = Arc::new(Evaluation::from_config(&config));
    let engine = Arc::new(QueryEngine::from_config(&config, &evaluation)?);
    let app_state = AppState { engine, evaluation };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/summary", get(summary_handler))
        .with_state(app_state.clone())
        .layer(cors);
    Ok((app, app_state))
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let k = params.k.min(100);
    let measurement = state.evaluation.start(params.mode, params.q.clone());
    let hits = state
        .engine
        .search(&params.q, k, params.mode)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let took_s = measurement.stop();

    let index = state.engine.index().map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?;
    let results = hits
        .into_iter()
        .filter_map(|hit| {
            let doc = index.documents().get(hit.doc_id).ok()?;
            Some(SearchHit { doc_id: hit.doc_id, external_id: doc.external_id.clone(), score: hit.score, title: doc.title.clone() })
        })
        .collect();
    Ok(Json(SearchResponse { query: params.q, mode: params.mode.to_string(), took_s, results }))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<u32>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let index = state.engine.index().map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?;
    let doc = index.documents().get(doc_id).map_err(|e| (StatusCode::NOT_FOUND, e.to_string()))?;
    Ok(Json(serde_json::json!({
        "doc_id": doc_id,
        "external_id": doc.external_id,
        "title": doc.title,
        "tokens": doc.tokens,
        "norm": doc.norm,
    })))
}

pub async fn summary_handler(State(state): State<AppState>) -> Result<Json<IndexSummary>, (StatusCode, String)> {
    let index = state.engine.index().map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?;
    Ok(Json(IndexSummary::of(index)))
}
