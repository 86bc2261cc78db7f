//! Integration tests against mock HTTP servers

mod crawl_tests;
mod fetch_tests;
