//! Read API over the item store
//!
//! A single route, `GET /items`, returns the stored posts and comments of a
//! forum within a time range, optionally filtered by keyword.

use crate::storage::{ItemQuery, ItemRepository, StoredItem};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn ItemRepository>,
}

/// A client error reported as `400 {"message": ...}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidUsage(pub String);

impl IntoResponse for InvalidUsage {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(json!({ "message": self.0 }))).into_response()
    }
}

/// Builds the read API router.
pub fn router(repo: Arc<dyn ItemRepository>) -> Router {
    Router::new()
        .route("/items", get(list_items))
        .with_state(AppState { repo })
}

/// Serves the read API until the process is stopped.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve(addr: SocketAddr, repo: Arc<dyn ItemRepository>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Starting read API");
    axum::serve(listener, router(repo)).await
}

/// Validates the query string of `GET /items`.
///
/// `subreddit` may also be given as `forum`. Empty values count as missing.
pub fn parse_item_query(params: &HashMap<String, String>) -> Result<ItemQuery, InvalidUsage> {
    fn required<'a>(
        params: &'a HashMap<String, String>,
        names: &[&str],
    ) -> Result<&'a str, InvalidUsage> {
        names
            .iter()
            .filter_map(|name| params.get(*name))
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
            .ok_or_else(|| InvalidUsage(format!("{} query parameter is missing", names[0])))
    }

    let forum = required(params, &["subreddit", "forum"])?;
    let from = required(params, &["from"])?;
    let to = required(params, &["to"])?;

    let parse = |value: &str| {
        value
            .parse::<f64>()
            .ok()
            .filter(|v| !v.is_nan())
            .ok_or_else(|| InvalidUsage("Invalid type for from or to parameters".to_string()))
    };
    let from = parse(from)?;
    let to = parse(to)?;

    let keyword = params
        .get("keyword")
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(str::to_string);

    Ok(ItemQuery {
        forum: forum.to_string(),
        from,
        to,
        keyword,
    })
}

async fn list_items(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let query = match parse_item_query(&params) {
        Ok(query) => query,
        Err(e) => return e.into_response(),
    };

    let repo = Arc::clone(&state.repo);
    let lookup = query.clone();
    let result = tokio::task::spawn_blocking(move || repo.query_items(&lookup)).await;

    match result {
        Ok(Ok(items)) => {
            tracing::debug!(forum = %query.forum, items = items.len(), "Served items");
            let body: HashMap<String, Vec<StoredItem>> = HashMap::from([(query.forum, items)]);
            (StatusCode::OK, Json(body)).into_response()
        }
        Ok(Err(e)) => internal_error(&e),
        Err(e) => internal_error(&e),
    }
}

fn internal_error(error: &dyn std::fmt::Display) -> Response {
    tracing::error!("Read API query failed: {}", error);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "Internal server error" })),
    )
        .into_response()
}
