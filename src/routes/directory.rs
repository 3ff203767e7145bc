use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::responses::JsonResponse;
use crate::routes::auth::session::AuthSession;
use crate::services::office365::source::{LookupArgs, Office365Source};
use crate::state::DirectoryState;

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub term: String,
    pub user_uuid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FavoritesQuery {
    #[serde(default)]
    pub ids: String,
    pub user_uuid: Option<String>,
}

fn lookup_args(headers: &HeaderMap, user_uuid: Option<String>) -> LookupArgs {
    LookupArgs {
        user_uuid,
        token: AuthSession::token_from_headers(headers),
    }
}

fn find_source<'a>(state: &'a DirectoryState, name: &str) -> Result<&'a Office365Source, Response> {
    state.source(name).ok_or_else(|| {
        JsonResponse::not_found(&format!("Unknown source {name}")).into_response()
    })
}

pub async fn lookup(
    State(state): State<DirectoryState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Query(query): Query<LookupQuery>,
) -> Response {
    let source = match find_source(&state, &name) {
        Ok(source) => source,
        Err(resp) => return resp,
    };
    let args = lookup_args(&headers, query.user_uuid);
    let results = source.search(&query.term, &args).await;
    Json(json!({ "results": results })).into_response()
}

pub async fn favorites(
    State(state): State<DirectoryState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Query(query): Query<FavoritesQuery>,
) -> Response {
    let source = match find_source(&state, &name) {
        Ok(source) => source,
        Err(resp) => return resp,
    };
    let ids: Vec<String> = query
        .ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    let args = lookup_args(&headers, query.user_uuid);
    let results = source.list(&ids, &args).await;
    Json(json!({ "results": results })).into_response()
}

pub async fn first_match(
    State(state): State<DirectoryState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Query(query): Query<LookupQuery>,
) -> Response {
    let source = match find_source(&state, &name) {
        Ok(source) => source,
        Err(resp) => return resp,
    };
    let args = lookup_args(&headers, query.user_uuid);
    let result = source.first_match(&query.term, &args).await;
    Json(json!({ "result": result })).into_response()
}
