//! Integration tests for the batched fetcher
//!
//! These tests use wiremock to check batching, per-URL failures and the
//! request headers sent to vendor sites.

use futures::StreamExt;
use recipe_crawler::crawler::{BatchFetcher, FetchError, Fetcher, DEFAULT_USER_AGENT};
use std::time::Duration;
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_urls_are_fetched_in_batches() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/page/\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>page</html>"))
        .expect(7)
        .mount(&mock_server)
        .await;

    let urls: Vec<String> = (0..7)
        .map(|i| format!("{}/page/{}", mock_server.uri(), i))
        .collect();

    let fetcher = BatchFetcher::new(3);
    let batches: Vec<_> = fetcher.fetch(urls.clone()).collect().await;

    let sizes: Vec<_> = batches.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![3, 3, 1]);

    let fetched: Vec<_> = batches
        .into_iter()
        .flatten()
        .map(|outcome| outcome.expect("page should be fetched"))
        .collect();
    let fetched_urls: Vec<_> = fetched.iter().map(|page| page.url.clone()).collect();
    assert_eq!(fetched_urls, urls);
    assert!(fetched.iter().all(|page| page.status == 200));
    assert_eq!(fetched[0].body, "<html>page</html>");
}

#[tokio::test]
async fn test_empty_url_list_yields_no_batch() {
    let fetcher = BatchFetcher::new(3);
    let batches: Vec<_> = fetcher.fetch(Vec::new()).collect().await;
    assert!(batches.is_empty());
}

#[tokio::test]
async fn test_failures_stay_with_their_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fine"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let ok = format!("{}/ok", mock_server.uri());
    let gone = format!("{}/gone", mock_server.uri());
    let urls = vec![gone.clone(), "ftp://example.com/file".to_string(), ok.clone()];

    let outcomes = BatchFetcher::new(10).fetch_batch(urls).await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(
        outcomes[0],
        Err(FetchError::Status {
            url: gone,
            status: 404
        })
    );
    assert!(matches!(&outcomes[1], Err(FetchError::InvalidUrl { .. })));
    assert_eq!(outcomes[2].as_ref().map(|page| page.body.as_str()), Ok("fine"));
    assert_eq!(outcomes[2].as_ref().map(|page| page.url.clone()), Ok(ok));
}

#[tokio::test]
async fn test_default_user_agent_is_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("user-agent", DEFAULT_USER_AGENT))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let outcomes = BatchFetcher::new(1)
        .fetch_batch(vec![format!("{}/", mock_server.uri())])
        .await;

    assert!(outcomes[0].is_ok());
}

#[tokio::test]
async fn test_configured_user_agent_is_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("user-agent", "RecipeBot/0.1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = BatchFetcher::new(1).with_user_agent("RecipeBot/0.1");
    let outcomes = fetcher
        .fetch_batch(vec![format!("{}/", mock_server.uri())])
        .await;

    assert!(outcomes[0].is_ok());
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/fast"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let slow = format!("{}/slow", mock_server.uri());
    let fast = format!("{}/fast", mock_server.uri());

    let fetcher = BatchFetcher::new(2).with_timeout(Duration::from_millis(200));
    let outcomes = fetcher.fetch_batch(vec![slow.clone(), fast]).await;

    assert_eq!(outcomes[0], Err(FetchError::Timeout { url: slow }));
    assert!(outcomes[1].is_ok());
}

#[tokio::test]
async fn test_unreachable_host_is_reported() {
    let outcomes = BatchFetcher::new(1)
        .with_timeout(Duration::from_secs(2))
        .fetch_batch(vec!["http://127.0.0.1:1/".to_string()])
        .await;

    assert!(matches!(
        &outcomes[0],
        Err(FetchError::Connect { .. }) | Err(FetchError::Request { .. })
    ));
}
