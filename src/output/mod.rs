//! Output module for reporting harvest results
//!
//! This module handles:
//! - Summarizing stored items per forum
//! - Printing the outcome of a single crawl cycle

pub mod stats;

pub use stats::{load_statistics, print_statistics, HarvestStatistics};

use crate::crawler::{CycleReport, ForumStatus};

/// Prints a cycle report to stdout
///
/// # Arguments
///
/// * `report` - The report returned by a finished cycle
pub fn print_cycle_report(report: &CycleReport) {
    println!("=== Cycle Report ===\n");
    println!("Started at: {:.3}", report.started_at);
    println!();

    let refresh = &report.refresh;
    println!("Refresh:");
    println!("  Posts visited: {}", refresh.visited);
    println!("  Refreshed: {}", refresh.refreshed);
    println!("  Not found: {}", refresh.not_found);
    println!("  Forbidden: {}", refresh.forbidden);
    println!("  Failed: {}", refresh.failed);
    println!(
        "  Comments saved: {} (skipped {})",
        refresh.comments.saved, refresh.comments.skipped
    );
    println!();

    println!("Forums:");
    for forum in &report.forums {
        let status = match &forum.status {
            ForumStatus::Completed => "completed".to_string(),
            ForumStatus::Unavailable(reason) => format!("unavailable ({})", reason),
            ForumStatus::Fatal(e) => format!("FATAL ({})", e),
        };
        println!(
            "  {} [{:.3} .. {:.3}]: {}",
            forum.forum, forum.window.start, forum.window.end, status
        );
        println!(
            "    posts: {} seen, {} saved, {} skipped",
            forum.posts_seen, forum.posts_saved, forum.posts_skipped
        );
        println!(
            "    comments: {} saved, {} skipped, {} walk failures",
            forum.comments.saved, forum.comments.skipped, forum.walk_failures
        );
    }
}
