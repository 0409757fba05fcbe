//! HTTP handlers and application state.

use axum::extract::{Query, State};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use catalog_core::memory::MemoryCatalog;
use catalog_core::types::{Page, ProductSummary, SearchQuery};
use catalog_hybrid::{FilteredRankedSearch, HybridSearchEngine, IndexingPipeline};

use crate::errors::ApiError;
use crate::models::{IndexParams, IndexResponse, ProductsParams, SearchParams, SearchResponse, SearchResult};
use crate::services::Services;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<HybridSearchEngine>,
    pub listing: Arc<FilteredRankedSearch>,
    pub pipeline: Arc<IndexingPipeline>,
    pub catalog: Arc<MemoryCatalog>,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn from_services(services: &Services) -> Self {
        Self {
            engine: services.engine.clone(),
            listing: services.listing.clone(),
            pipeline: Arc::new(services.pipeline()),
            catalog: services.catalog.clone(),
            admin_token: services.settings.server.admin_token.clone().filter(|t| !t.is_empty()),
        }
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = SearchQuery::new(&params.q).with_store(params.store_id);
    let ranked = state.engine.search(&query).await?;
    let results: Vec<SearchResult> = ranked.hits.into_iter().map(SearchResult::from).collect();
    Ok(Json(SearchResponse { query: query.text().to_string(), count: results.len(), results }))
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ProductsParams>,
) -> Result<Json<Page<ProductSummary>>, ApiError> {
    let filter = params.filter()?;
    let page = params.page()?;
    let rows = state.listing.search(&filter, page).await?;
    Ok(Json(rows.map(|p| ProductSummary::from(&p))))
}

pub async fn run_indexing(
    State(state): State<AppState>,
    Query(params): Query<IndexParams>,
) -> Result<Json<IndexResponse>, ApiError> {
    let summary = if params.all {
        state.pipeline.index_all(state.catalog.as_ref()).await?
    } else {
        state.pipeline.index_marked(state.catalog.as_ref()).await?
    };
    Ok(Json(IndexResponse {
        indexed: summary.indexed,
        candidates: summary.candidates,
        skipped: summary.skipped,
        failed: summary.failed,
    }))
}
