//! Integration tests for Thread-Harvest

mod crawl_tests;
mod read_api_tests;
mod reddit_client_tests;
