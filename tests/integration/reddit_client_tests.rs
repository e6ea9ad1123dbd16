//! Integration tests for the HTTP forum client
//!
//! These tests use wiremock to stand in for both the token endpoint and the
//! forum API.

use serde_json::{json, Value};
use thread_harvest::config::ForumApiConfig;
use thread_harvest::forum::{
    CommentNode, FetchOutcome, ForumApi, ForumPost, MoreComments, RedditClient, TimeWindow,
};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: &MockServer) -> ForumApiConfig {
    ForumApiConfig {
        api_url: server.uri(),
        auth_url: format!("{}/api/v1/access_token", server.uri()),
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        username: "bot".to_string(),
        password: "hunter2".to_string(),
        user_agent: "thread-harvest-tests/0.1".to_string(),
        timeout_secs: 5,
    }
}

/// Mounts a token endpoint that must be hit exactly `times` times
async fn mount_token(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-token",
            "token_type": "bearer",
            "expires_in": 3600
        })))
        .expect(times)
        .mount(server)
        .await;
}

fn post_thing(id: &str, created_utc: f64) -> Value {
    json!({
        "kind": "t3",
        "data": {"id": id, "title": format!("Post {}", id), "subreddit": "rust", "created_utc": created_utc}
    })
}

fn listing(children: Vec<Value>, after: Option<&str>) -> Value {
    json!({"kind": "Listing", "data": {"after": after, "children": children}})
}

fn comment_thing(id: &str, parent: &str, created_utc: f64, replies: Value) -> Value {
    json!({
        "kind": "t1",
        "data": {
            "id": id,
            "parent_id": parent,
            "author": "someone",
            "body": format!("body {}", id),
            "created_utc": created_utc,
            "replies": replies
        }
    })
}

fn test_post() -> ForumPost {
    ForumPost {
        id: "p1".to_string(),
        forum: "rust".to_string(),
        title: "Post p1".to_string(),
        created_at: 100.0,
    }
}

fn ids(nodes: &[CommentNode]) -> Vec<String> {
    nodes
        .iter()
        .map(|node| match node {
            CommentNode::Comment(c) => c.id.clone(),
            CommentNode::More(m) => format!("more:{}", m.id),
        })
        .collect()
}

#[tokio::test]
async fn test_list_posts_pages_until_window_start() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    // Second page first: the earliest mounted matching mock answers
    Mock::given(method("GET"))
        .and(path("/r/rust/new"))
        .and(query_param("after", "t3_b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(
            vec![post_thing("c", 200.0), post_thing("d", 50.0)],
            Some("t3_d"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r/rust/new"))
        .and(query_param("after", "t3_d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![], None)))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r/rust/new"))
        .and(query_param("limit", "100"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(
            vec![post_thing("a", 300.0), post_thing("b", 250.0)],
            Some("t3_b"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = RedditClient::new(&test_config(&server)).unwrap();
    let posts = client
        .list_posts("rust", TimeWindow::new(100.0, 280.0))
        .await
        .unwrap();

    let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c"]);
    assert!(posts.iter().all(|p| p.forum == "rust"));
}

#[tokio::test]
async fn test_fetch_post_outcomes() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/api/info"))
        .and(query_param("id", "t3_alive"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(listing(vec![post_thing("alive", 42.0)], None)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/info"))
        .and(query_param("id", "t3_empty"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![], None)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/info"))
        .and(query_param("id", "t3_gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/info"))
        .and(query_param("id", "t3_locked"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/info"))
        .and(query_param("id", "t3_broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = RedditClient::new(&test_config(&server)).unwrap();

    match client.fetch_post("alive").await {
        FetchOutcome::Found(post) => {
            assert_eq!(post.id, "alive");
            assert_eq!(post.forum, "rust");
            assert_eq!(post.created_at, 42.0);
        }
        other => panic!("expected Found, got {:?}", other),
    }
    assert_eq!(client.fetch_post("empty").await, FetchOutcome::NotFound);
    assert_eq!(client.fetch_post("gone").await, FetchOutcome::NotFound);
    assert_eq!(client.fetch_post("locked").await, FetchOutcome::Forbidden);
    assert!(matches!(
        client.fetch_post("broken").await,
        FetchOutcome::Failed(_)
    ));
}

#[tokio::test]
async fn test_comment_forest_parses_nested_replies() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    let reply = comment_thing("r1", "t1_c1", 130.0, json!(""));
    let body = json!([
        listing(vec![post_thing("p1", 100.0)], None),
        listing(
            vec![
                comment_thing("c1", "t3_p1", 120.0, listing(vec![reply], None)),
                json!({
                    "kind": "more",
                    "data": {"id": "m1", "parent_id": "t3_p1", "children": ["c2", "c3"], "count": 2}
                }),
            ],
            None
        )
    ]);

    Mock::given(method("GET"))
        .and(path("/comments/p1"))
        .and(query_param("sort", "new"))
        .and(query_param("raw_json", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let client = RedditClient::new(&test_config(&server)).unwrap();
    let forest = client.comment_forest(&test_post()).await.unwrap();

    assert_eq!(ids(&forest), vec!["c1", "more:m1"]);
    let CommentNode::Comment(c1) = &forest[0] else {
        panic!("expected a comment");
    };
    assert_eq!(c1.author.as_deref(), Some("someone"));
    assert_eq!(ids(&c1.replies), vec!["r1"]);
    let CommentNode::More(more) = &forest[1] else {
        panic!("expected a placeholder");
    };
    assert_eq!(more.children, vec!["c2", "c3"]);
}

#[tokio::test]
async fn test_expand_more_renests_flat_children() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/api/morechildren"))
        .and(query_param("link_id", "t3_p1"))
        .and(query_param("children", "c2,c3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "json": {
                "errors": [],
                "data": {
                    "things": [
                        comment_thing("c2", "t3_p1", 140.0, json!("")),
                        comment_thing("r2", "t1_c2", 150.0, json!("")),
                        comment_thing("c3", "t3_p1", 110.0, json!("")),
                        {"kind": "more", "data": {"id": "m9", "parent_id": "t1_r2", "children": [], "count": 0}}
                    ]
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = RedditClient::new(&test_config(&server)).unwrap();
    let more = MoreComments {
        id: "m1".to_string(),
        parent_id: "t3_p1".to_string(),
        children: vec!["c2".to_string(), "c3".to_string()],
        count: 2,
    };
    let nodes = client.expand_more(&test_post(), &more).await.unwrap();

    assert_eq!(ids(&nodes), vec!["c2", "c3"]);
    let CommentNode::Comment(c2) = &nodes[0] else {
        panic!("expected a comment");
    };
    assert_eq!(ids(&c2.replies), vec!["r2"]);
    let CommentNode::Comment(r2) = &c2.replies[0] else {
        panic!("expected a comment");
    };
    assert_eq!(ids(&r2.replies), vec!["more:m9"]);
}

#[tokio::test]
async fn test_continue_thread_expansion() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    let deep = comment_thing("r9", "t1_r8", 200.0, json!(""));
    Mock::given(method("GET"))
        .and(path("/comments/p1/_/r8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            listing(vec![post_thing("p1", 100.0)], None),
            listing(
                vec![comment_thing("r8", "t1_r7", 190.0, listing(vec![deep], None))],
                None
            )
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = RedditClient::new(&test_config(&server)).unwrap();
    let more = MoreComments {
        id: "_".to_string(),
        parent_id: "t1_r8".to_string(),
        children: vec![],
        count: 0,
    };
    let nodes = client.expand_more(&test_post(), &more).await.unwrap();

    assert_eq!(ids(&nodes), vec!["r9"]);
}

#[tokio::test]
async fn test_rejected_credentials_surface_as_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&server)
        .await;

    let client = RedditClient::new(&test_config(&server)).unwrap();
    let result = client.list_posts("rust", TimeWindow::new(0.0, 1.0)).await;

    assert!(matches!(
        result,
        Err(thread_harvest::forum::ApiError::Auth(message)) if message == "invalid_grant"
    ));
}
