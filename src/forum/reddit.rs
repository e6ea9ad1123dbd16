//! HTTP implementation of the forum API
//!
//! This module talks to the Reddit OAuth JSON API:
//! - Building the HTTP client with the configured user agent and timeout
//! - Paging through `/r/{forum}/new` to list posts in a time window
//! - Classifying single-post fetches into found / not found / forbidden
//! - Converting comment listings into `CommentNode` forests
//! - Expanding `more` placeholders via `/api/morechildren`

use crate::config::ForumApiConfig;
use crate::forum::{
    ApiError, CommentNode, FetchOutcome, ForumApi, ForumComment, ForumPost, MoreComments,
    TimeWindow, TokenCache,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use url::Url;

/// Listing endpoints never page past 1000 items
const MAX_LISTING_PAGES: usize = 10;

/// `/api/morechildren` accepts at most 100 ids per request
const MORE_CHILDREN_CHUNK: usize = 100;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    after: Option<String>,
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    data: Value,
}

#[derive(Debug, Deserialize)]
struct RawPost {
    id: String,
    title: String,
    subreddit: String,
    created_utc: f64,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    id: String,
    parent_id: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    body: String,
    created_utc: f64,
    #[serde(default)]
    replies: Value,
}

#[derive(Debug, Deserialize)]
struct RawMore {
    id: String,
    parent_id: String,
    #[serde(default)]
    children: Vec<String>,
    #[serde(default)]
    count: u32,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenResponse {
    json: MoreChildrenJson,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenJson {
    #[serde(default)]
    errors: Vec<Value>,
    #[serde(default)]
    data: Option<MoreChildrenData>,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenData {
    #[serde(default)]
    things: Vec<Thing>,
}

/// Forum API client backed by the Reddit OAuth endpoints
pub struct RedditClient {
    client: Client,
    api_url: Url,
    config: ForumApiConfig,
    tokens: TokenCache,
}

impl RedditClient {
    /// Creates a client from configuration
    ///
    /// No request is made until the first API call, which also performs the
    /// password-grant token exchange.
    pub fn new(config: &ForumApiConfig) -> Result<Self, ApiError> {
        let api_url = Url::parse(&config.api_url)?;
        let client = build_http_client(config).map_err(|source| ApiError::Http {
            url: config.api_url.clone(),
            source,
        })?;

        Ok(Self {
            client,
            api_url,
            config: config.clone(),
            tokens: TokenCache::new(),
        })
    }

    /// Sends an authenticated GET and decodes the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let mut url = self.api_url.join(path)?;
        url.query_pairs_mut()
            .extend_pairs(query)
            .append_pair("raw_json", "1");
        let url_str = url.to_string();

        let token = self.tokens.bearer(&self.client, &self.config).await?;
        tracing::debug!("GET {}", url_str);

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| classify_request_error(&url_str, e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url_str,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::UnexpectedShape {
                url: url_str,
                message: e.to_string(),
            })
    }

    async fn fetch_thread(&self, path: &str) -> Result<Vec<CommentNode>, ApiError> {
        let listings: Vec<Listing> = self.get_json(path, &[("sort", "new".to_string())]).await?;
        let comments = listings
            .into_iter()
            .nth(1)
            .ok_or_else(|| ApiError::UnexpectedShape {
                url: path.to_string(),
                message: "expected a post listing followed by a comment listing".to_string(),
            })?;
        nodes_from_things(comments.data.children).map_err(|message| ApiError::UnexpectedShape {
            url: path.to_string(),
            message,
        })
    }
}

/// Builds an HTTP client with proper configuration
pub fn build_http_client(config: &ForumApiConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

fn classify_request_error(url: &str, err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout {
            url: url.to_string(),
        }
    } else {
        ApiError::Http {
            url: url.to_string(),
            source: err,
        }
    }
}

#[async_trait]
impl ForumApi for RedditClient {
    async fn list_posts(&self, forum: &str, window: TimeWindow) -> Result<Vec<ForumPost>, ApiError> {
        let path = format!("/r/{}/new", forum);
        let mut posts = Vec::new();
        let mut after: Option<String> = None;

        for _ in 0..MAX_LISTING_PAGES {
            let mut query = vec![("limit", "100".to_string())];
            if let Some(cursor) = &after {
                query.push(("after", cursor.clone()));
            }
            let listing: Listing = self.get_json(&path, &query).await?;

            let mut oldest = f64::INFINITY;
            for thing in listing.data.children {
                if thing.kind != "t3" {
                    continue;
                }
                let raw: RawPost =
                    serde_json::from_value(thing.data).map_err(|e| ApiError::UnexpectedShape {
                        url: path.clone(),
                        message: e.to_string(),
                    })?;
                oldest = oldest.min(raw.created_utc);
                if window.contains(raw.created_utc) {
                    posts.push(ForumPost {
                        id: raw.id,
                        forum: forum.to_string(),
                        title: raw.title,
                        created_at: raw.created_utc,
                    });
                }
            }

            // Listing is newest first, so once a page reaches past the window start we are done
            match listing.data.after {
                Some(cursor) if oldest >= window.start => after = Some(cursor),
                _ => break,
            }
        }

        tracing::debug!("Listed {} posts in {} within window", posts.len(), forum);
        Ok(posts)
    }

    async fn fetch_post(&self, post_id: &str) -> FetchOutcome {
        let result: Result<Listing, ApiError> = self
            .get_json("/api/info", &[("id", format!("t3_{}", post_id))])
            .await;

        match result {
            Ok(listing) => {
                let found = listing
                    .data
                    .children
                    .into_iter()
                    .find(|thing| thing.kind == "t3");
                match found {
                    Some(thing) => match serde_json::from_value::<RawPost>(thing.data) {
                        Ok(raw) => FetchOutcome::Found(ForumPost {
                            id: raw.id,
                            forum: raw.subreddit,
                            title: raw.title,
                            created_at: raw.created_utc,
                        }),
                        Err(e) => FetchOutcome::Failed(format!("malformed post {}: {}", post_id, e)),
                    },
                    None => FetchOutcome::NotFound,
                }
            }
            Err(e) => match e.status() {
                Some(404) => FetchOutcome::NotFound,
                Some(403) => FetchOutcome::Forbidden,
                _ => FetchOutcome::Failed(e.to_string()),
            },
        }
    }

    async fn comment_forest(&self, post: &ForumPost) -> Result<Vec<CommentNode>, ApiError> {
        self.fetch_thread(&format!("/comments/{}", post.id)).await
    }

    async fn expand_more(
        &self,
        post: &ForumPost,
        more: &MoreComments,
    ) -> Result<Vec<CommentNode>, ApiError> {
        // "continue this thread": re-fetch the thread rooted at the parent comment
        if more.children.is_empty() {
            let parent = more.parent_id.strip_prefix("t1_").ok_or_else(|| {
                ApiError::UnexpectedShape {
                    url: format!("/comments/{}", post.id),
                    message: format!("placeholder {} has no children and no comment parent", more.id),
                }
            })?;
            let nodes = self
                .fetch_thread(&format!("/comments/{}/_/{}", post.id, parent))
                .await?;
            let replies = nodes.into_iter().find_map(|node| match node {
                CommentNode::Comment(comment) if comment.id == parent => Some(comment.replies),
                _ => None,
            });
            return Ok(replies.unwrap_or_default());
        }

        let mut things = Vec::new();
        for chunk in more.children.chunks(MORE_CHILDREN_CHUNK) {
            let response: MoreChildrenResponse = self
                .get_json(
                    "/api/morechildren",
                    &[
                        ("api_type", "json".to_string()),
                        ("link_id", format!("t3_{}", post.id)),
                        ("children", chunk.join(",")),
                        ("sort", "new".to_string()),
                    ],
                )
                .await?;
            if !response.json.errors.is_empty() {
                return Err(ApiError::UnexpectedShape {
                    url: "/api/morechildren".to_string(),
                    message: format!("{:?}", response.json.errors),
                });
            }
            if let Some(data) = response.json.data {
                things.extend(data.things);
            }
        }

        nest_flat_things(things).map_err(|message| ApiError::UnexpectedShape {
            url: "/api/morechildren".to_string(),
            message,
        })
    }
}

/// Converts listing children into comment nodes, recursing into replies
fn nodes_from_things(things: Vec<Thing>) -> Result<Vec<CommentNode>, String> {
    let mut nodes = Vec::with_capacity(things.len());
    for thing in things {
        if let Some(node) = node_from_thing(thing)? {
            nodes.push(node);
        }
    }
    Ok(nodes)
}

fn node_from_thing(thing: Thing) -> Result<Option<CommentNode>, String> {
    match thing.kind.as_str() {
        "t1" => {
            let raw: RawComment = serde_json::from_value(thing.data).map_err(|e| e.to_string())?;
            // `replies` is an empty string when there are none
            let replies = match raw.replies {
                Value::Object(_) => {
                    let listing: Listing =
                        serde_json::from_value(raw.replies).map_err(|e| e.to_string())?;
                    nodes_from_things(listing.data.children)?
                }
                _ => Vec::new(),
            };
            let author = raw.author.filter(|name| name != "[deleted]");
            Ok(Some(CommentNode::Comment(ForumComment {
                id: raw.id,
                parent_id: raw.parent_id.strip_prefix("t1_").map(str::to_string),
                author,
                body: raw.body,
                created_at: raw.created_utc,
                replies,
            })))
        }
        "more" => {
            let raw: RawMore = serde_json::from_value(thing.data).map_err(|e| e.to_string())?;
            Ok(Some(CommentNode::More(MoreComments {
                id: raw.id,
                parent_id: raw.parent_id,
                children: raw.children,
                count: raw.count,
            })))
        }
        other => {
            tracing::trace!("Ignoring listing entry of kind {}", other);
            Ok(None)
        }
    }
}

fn parent_fullname(node: &CommentNode) -> String {
    match node {
        CommentNode::Comment(comment) => comment
            .parent_id
            .as_ref()
            .map(|p| format!("t1_{}", p))
            .unwrap_or_default(),
        CommentNode::More(more) => more.parent_id.clone(),
    }
}

/// Re-nests the flat `/api/morechildren` result by `parent_id`
///
/// Nodes whose parent is not part of the result become roots; they take the
/// place of the expanded placeholder.
fn nest_flat_things(things: Vec<Thing>) -> Result<Vec<CommentNode>, String> {
    let flat = nodes_from_things(things)?;

    let known: HashSet<String> = flat
        .iter()
        .filter_map(|node| match node {
            CommentNode::Comment(comment) => Some(format!("t1_{}", comment.id)),
            CommentNode::More(_) => None,
        })
        .collect();

    let mut children: HashMap<String, Vec<CommentNode>> = HashMap::new();
    let mut roots = Vec::new();
    for node in flat {
        let parent = parent_fullname(&node);
        if known.contains(&parent) {
            children.entry(parent).or_default().push(node);
        } else {
            roots.push(node);
        }
    }

    Ok(roots
        .into_iter()
        .map(|node| attach_children(node, &mut children))
        .collect())
}

fn attach_children(node: CommentNode, children: &mut HashMap<String, Vec<CommentNode>>) -> CommentNode {
    match node {
        CommentNode::Comment(mut comment) => {
            if let Some(kids) = children.remove(&format!("t1_{}", comment.id)) {
                for kid in kids {
                    let kid = attach_children(kid, children);
                    comment.replies.push(kid);
                }
            }
            CommentNode::Comment(comment)
        }
        more => more,
    }
}
