//! Integration tests for the crawl engine
//!
//! These tests drive full cycles against an in-memory fixture forum and an
//! on-disk SQLite database.

use std::sync::Arc;
use tempfile::TempDir;
use thread_harvest::config::CrawlerConfig;
use thread_harvest::crawler::{sync_forum, CrawlContext, ForumStatus, Scheduler};
use thread_harvest::forum::{FixtureForum, ForumPost, TimeWindow};
use thread_harvest::storage::{ItemRepository, SqliteRepository};

fn post(id: &str, forum: &str, created_at: f64) -> ForumPost {
    ForumPost {
        id: id.to_string(),
        forum: forum.to_string(),
        title: format!("Post {}", id),
        created_at,
    }
}

fn open_repo(dir: &TempDir) -> Arc<SqliteRepository> {
    Arc::new(SqliteRepository::open(&dir.path().join("harvest.db")).unwrap())
}

fn scheduler(forum: &Arc<FixtureForum>, repo: &Arc<SqliteRepository>, forums: &[&str]) -> Scheduler {
    Scheduler::new(
        CrawlerConfig::default(),
        forums.iter().map(|f| f.to_string()).collect(),
        forum.clone(),
        repo.clone(),
    )
}

#[tokio::test]
async fn test_first_cycle_bootstrap() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir);
    let forum = Arc::new(FixtureForum::new());
    forum.add_post(post("early", "A", 999.5), vec![]);
    let mut scheduler = scheduler(&forum, &repo, &["A"]);

    let report = scheduler.run_cycle_at(1000.0).await.unwrap();

    assert_eq!(forum.listing_requests(), vec![("A".to_string(), TimeWindow::new(1000.0, 1000.0))]);
    assert_eq!(report.forums[0].posts_seen, 0);
    assert!(repo.list_posts().unwrap().is_empty());
    assert_eq!(scheduler.watermarks().get("A"), Some(1000.0));
}

#[tokio::test]
async fn test_oversized_comment_is_isolated() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir);
    let forum = Arc::new(FixtureForum::new());
    let mut scheduler = scheduler(&forum, &repo, &["A"]);
    scheduler.run_cycle_at(1000.0).await.unwrap();

    let comments = (0..10)
        .map(|i| {
            let body = if i == 4 {
                "x".repeat(1001)
            } else {
                format!("comment number {}", i)
            };
            FixtureForum::comment_with_body(&format!("c{}", i), 1600.0 - i as f64, &body, vec![])
        })
        .collect();
    forum.add_post(post("p1", "A", 1500.0), comments);

    let report = scheduler.run_cycle_at(2000.0).await.unwrap();

    let forum_report = report.forum("A").unwrap();
    assert_eq!(forum_report.status, ForumStatus::Completed);
    assert_eq!(forum_report.posts_saved, 1);
    assert_eq!(forum_report.comments.saved, 9);
    assert_eq!(forum_report.comments.skipped, 1);
    assert!(repo.get_post("p1").unwrap().is_some());
    assert!(repo.get_comment("c4").unwrap().is_none());
    assert_eq!(repo.forum_counts().unwrap()[0].comments, 9);
}

#[tokio::test]
async fn test_nested_placeholders_are_fully_ingested() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir);
    let forum = Arc::new(FixtureForum::new());
    let mut scheduler = scheduler(&forum, &repo, &["A"]);
    scheduler.run_cycle_at(1000.0).await.unwrap();

    forum.add_post(
        post("p1", "A", 1100.0),
        vec![
            FixtureForum::comment("c1", 1200.0, vec![FixtureForum::more("m1", "t1_c1", &["r1"])]),
            FixtureForum::more("m2", "t3_p1", &["c2"]),
        ],
    );
    forum.add_expansion(
        "m1",
        vec![FixtureForum::comment(
            "r1",
            1250.0,
            vec![FixtureForum::more("m3", "t1_r1", &["r2"])],
        )],
    );
    forum.add_expansion("m2", vec![FixtureForum::comment("c2", 1150.0, vec![])]);
    forum.add_expansion(
        "m3",
        vec![FixtureForum::comment(
            "r2",
            1300.0,
            vec![FixtureForum::more("m4", "t1_r2", &["r3"])],
        )],
    );
    forum.add_expansion("m4", vec![FixtureForum::comment("r3", 1350.0, vec![])]);

    let report = scheduler.run_cycle_at(2000.0).await.unwrap();

    assert_eq!(report.forum("A").unwrap().comments.saved, 5);
    for id in ["c1", "c2", "r1", "r2", "r3"] {
        let comment = repo.get_comment(id).unwrap().unwrap();
        assert_eq!(comment.post_id, "p1");
        assert_eq!(comment.forum, "A");
    }
}

#[tokio::test]
async fn test_refresh_picks_up_new_replies_only() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir);
    let forum = Arc::new(FixtureForum::new());
    let mut scheduler = scheduler(&forum, &repo, &["A"]);
    scheduler.run_cycle_at(1000.0).await.unwrap();

    forum.add_post(
        post("p1", "A", 1500.0),
        vec![FixtureForum::comment("c1", 1600.0, vec![])],
    );
    scheduler.run_cycle_at(2000.0).await.unwrap();
    assert_eq!(repo.max_comment_timestamp("p1").unwrap(), Some(1600.0));

    // A new top-level comment and a new reply under the old comment
    forum.set_forest(
        "p1",
        vec![
            FixtureForum::comment("c2", 2500.0, vec![]),
            FixtureForum::comment("c1", 1600.0, vec![FixtureForum::comment("r1", 2600.0, vec![])]),
        ],
    );
    let report = scheduler.run_cycle_at(3000.0).await.unwrap();

    assert_eq!(report.refresh.visited, 1);
    assert_eq!(report.refresh.comments.saved, 2);
    assert!(repo.get_comment("c2").unwrap().is_some());
    assert!(repo.get_comment("r1").unwrap().is_some());
    assert_eq!(repo.max_comment_timestamp("p1").unwrap(), Some(2600.0));
}

#[tokio::test]
async fn test_deleted_post_is_retained_during_refresh() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir);
    let forum = Arc::new(FixtureForum::new());
    let mut scheduler = scheduler(&forum, &repo, &["AskReddit"]);
    scheduler.run_cycle_at(1000.0).await.unwrap();

    forum.add_post(
        post("abc123", "AskReddit", 1500.0),
        vec![FixtureForum::comment("c1", 1600.0, vec![])],
    );
    scheduler.run_cycle_at(2000.0).await.unwrap();
    let before = repo.get_post("abc123").unwrap().unwrap();

    forum.delete_post("abc123");
    let report = scheduler.run_cycle_at(3000.0).await.unwrap();

    assert_eq!(report.refresh.not_found, 1);
    assert_eq!(repo.get_post("abc123").unwrap(), Some(before));
    assert!(repo.get_comment("c1").unwrap().is_some());
    assert_eq!(scheduler.watermarks().get("AskReddit"), Some(3000.0));
}

#[tokio::test]
async fn test_fatal_post_blocks_only_its_forum() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir);
    let forum = Arc::new(FixtureForum::new());
    let mut scheduler = scheduler(&forum, &repo, &["A", "B"]);
    scheduler.run_cycle_at(1000.0).await.unwrap();

    let mut bad = post("bad", "A", 1500.0);
    bad.title = "t".repeat(301);
    forum.add_post(bad, vec![]);
    forum.add_post(post("good", "B", 1500.0), vec![]);

    let report = scheduler.run_cycle_at(2000.0).await.unwrap();

    assert_eq!(report.fatal_forums(), vec!["A".to_string()]);
    assert!(report.forum("A").unwrap().is_fatal());
    assert_eq!(report.forum("B").unwrap().posts_saved, 1);
    assert_eq!(scheduler.watermarks().get("A"), Some(1000.0));
    assert_eq!(scheduler.watermarks().get("B"), Some(2000.0));
    assert!(repo.get_post("bad").unwrap().is_none());
}

#[tokio::test]
async fn test_reingesting_a_window_does_not_duplicate() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir);
    let forum = Arc::new(FixtureForum::new());
    forum.add_post(
        post("p1", "A", 150.0),
        vec![
            FixtureForum::comment("c1", 160.0, vec![FixtureForum::comment("r1", 170.0, vec![])]),
            FixtureForum::comment("c2", 155.0, vec![]),
        ],
    );
    let ctx = CrawlContext::new(forum.clone(), repo.clone(), &CrawlerConfig::default());
    let window = TimeWindow::new(100.0, 200.0);

    let first = sync_forum(&ctx, "A", window).await;
    let second = sync_forum(&ctx, "A", window).await;

    assert_eq!(first.comments.saved, 3);
    assert_eq!(second.comments.saved, 3);
    let counts = repo.forum_counts().unwrap();
    assert_eq!(counts[0].posts, 1);
    assert_eq!(counts[0].comments, 3);
}

#[tokio::test]
async fn test_restart_rederives_progress_from_store() {
    let dir = TempDir::new().unwrap();
    let forum = Arc::new(FixtureForum::new());
    {
        let repo = open_repo(&dir);
        let mut first_run = scheduler(&forum, &repo, &["A"]);
        first_run.run_cycle_at(1000.0).await.unwrap();
        forum.add_post(
            post("p1", "A", 1500.0),
            vec![FixtureForum::comment("c1", 1600.0, vec![])],
        );
        first_run.run_cycle_at(2000.0).await.unwrap();
    }

    forum.set_forest(
        "p1",
        vec![
            FixtureForum::comment("c2", 2100.0, vec![]),
            FixtureForum::comment("c1", 1600.0, vec![]),
        ],
    );

    // A fresh scheduler over the same database starts with no watermarks
    let repo = open_repo(&dir);
    let mut second_run = scheduler(&forum, &repo, &["A"]);
    assert!(second_run.watermarks().is_empty());
    let report = second_run.run_cycle_at(5000.0).await.unwrap();

    assert_eq!(report.forum("A").unwrap().window, TimeWindow::new(5000.0, 5000.0));
    assert_eq!(report.refresh.comments.saved, 1);
    assert!(repo.get_comment("c2").unwrap().is_some());
}
