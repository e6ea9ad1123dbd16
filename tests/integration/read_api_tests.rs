//! Integration tests for the read API

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use thread_harvest::storage::{CommentRecord, ItemRepository, PostRecord, SqliteRepository};
use thread_harvest::web::router;
use tower::ServiceExt;

fn seeded_app() -> Router {
    let repo = SqliteRepository::open_in_memory().unwrap();
    repo.upsert_post(&PostRecord {
        id: "p1".to_string(),
        forum: "AskReddit".to_string(),
        title: "What is your favourite crate?".to_string(),
        created_at: 1000.0,
    })
    .unwrap();
    repo.upsert_post(&PostRecord {
        id: "p2".to_string(),
        forum: "rust".to_string(),
        title: "Other forum".to_string(),
        created_at: 1500.0,
    })
    .unwrap();
    for (id, body, created_at) in [
        ("c1", "serde, without a doubt", 1200.0),
        ("c2", "Tokio", 3000.0),
        ("c3", "rayon", 1100.0),
    ] {
        repo.upsert_comment(&CommentRecord {
            id: id.to_string(),
            post_id: "p1".to_string(),
            forum: "AskReddit".to_string(),
            body: body.to_string(),
            created_at,
        })
        .unwrap();
    }
    router(Arc::new(repo))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_items_sorted_newest_first_under_forum_key() {
    let (status, body) = get(
        seeded_app(),
        "/items?subreddit=AskReddit&from=0&to=9999999999",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let object = body.as_object().unwrap();
    assert_eq!(object.len(), 1);

    let items = object["AskReddit"].as_array().unwrap();
    let ids: Vec<&str> = items.iter().map(|i| i["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["c2", "c1", "c3", "p1"]);

    let times: Vec<f64> = items
        .iter()
        .map(|i| i["created_at"].as_f64().unwrap())
        .collect();
    assert!(times.windows(2).all(|pair| pair[0] >= pair[1]));
    assert_eq!(items[3]["kind"], "post");
    assert_eq!(items[0]["kind"], "comment");
}

#[tokio::test]
async fn test_range_is_inclusive() {
    let (status, body) = get(seeded_app(), "/items?subreddit=AskReddit&from=1100&to=1200").await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["AskReddit"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["c1", "c3"]);
}

#[tokio::test]
async fn test_keyword_filter() {
    let (status, body) = get(
        seeded_app(),
        "/items?subreddit=AskReddit&from=0&to=9999999999&keyword=tokio%20crate",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["AskReddit"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["c2", "p1"]);
}

#[tokio::test]
async fn test_keyword_matches_whole_words_only() {
    let (status, body) = get(
        seeded_app(),
        "/items?subreddit=AskReddit&from=0&to=9999999999&keyword=ser%20crates",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["AskReddit"], Value::Array(vec![]));
}

#[tokio::test]
async fn test_unknown_forum_returns_empty_list() {
    let (status, body) = get(seeded_app(), "/items?subreddit=golang&from=0&to=10").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["golang"], Value::Array(vec![]));
}

#[tokio::test]
async fn test_missing_from_is_bad_request() {
    let (status, body) = get(seeded_app(), "/items?subreddit=AskReddit&to=9999999999").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "from query parameter is missing");
}

#[tokio::test]
async fn test_missing_subreddit_is_bad_request() {
    let (status, body) = get(seeded_app(), "/items?from=0&to=1").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "subreddit query parameter is missing");
}

#[tokio::test]
async fn test_non_numeric_range_is_bad_request() {
    let (status, body) = get(seeded_app(), "/items?subreddit=AskReddit&from=abc&to=1").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid type for from or to parameters");
}

#[tokio::test]
async fn test_non_get_is_method_not_allowed() {
    let response = seeded_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/items?subreddit=AskReddit&from=0&to=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
