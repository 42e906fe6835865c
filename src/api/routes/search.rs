use axum::{extract::State, Json};
use serde::Deserialize;

use crate::api::{
    error::ApiError,
    extract::{AppJson, AppQuery},
    state::AppState,
};
use crate::domain::{DocumentStats, SearchQuery, SearchResult, SearchSuggestion};

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionsQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn search(
    State(state): State<AppState>,
    AppJson(request): AppJson<SearchRequest>,
) -> Result<Json<Vec<SearchResult>>, ApiError> {
    let service = &state.search_service;
    let query = SearchQuery::new(
        request.query,
        request.top_k.unwrap_or_else(|| service.default_top_k()),
    );

    let results = service.search(&query).await?;
    Ok(Json(results))
}

pub async fn search_suggestions(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<SuggestionsQuery>,
) -> Json<Vec<SearchSuggestion>> {
    Json(state.search_service.suggestions(&params.q).await)
}

pub async fn document_stats(State(state): State<AppState>) -> Json<DocumentStats> {
    Json(state.search_service.stats().await)
}
