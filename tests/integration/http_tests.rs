//! End-to-end runs against a mock forum served over HTTP

use crate::common::{board_page, thread_page};
use forum_harvest::config::{parse_config, Config};
use forum_harvest::crawler::{PaginationWalker, RecordingSink};
use forum_harvest::{Board, HarvestError, Thread};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(host: &str) -> Config {
    let mut config = Config::default_for_host(host);
    config.fetch.request_delay_ms = 0;
    config.fetch.max_attempts = 3;
    config.fetch.timeout_secs = 5;
    config
}

#[tokio::test]
async fn test_board_scan_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("board", "3.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(board_page(
            3,
            &[(10, "Seeds", 1), (11, "Tools", 2)],
            2,
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("board", "3.40"))
        .respond_with(ResponseTemplate::new(200).set_body_string(board_page(
            3,
            &[(11, "Tools", 2), (12, "Soil", 1)],
            2,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let walker = PaginationWalker::from_config(&test_config(&server.uri())).unwrap();
    let mut board = Board::from_url(&format!("{}/index.php?board=3.0", server.uri())).unwrap();

    let threads = walker
        .scan(&mut board, 1, 2, &CancellationToken::new())
        .await
        .unwrap();

    let ids: Vec<u64> = threads.keys().copied().collect();
    assert_eq!(ids, vec![10, 11, 12]);
    assert!(threads
        .values()
        .all(|t| t.base_link().starts_with(&server.uri())));
}

#[tokio::test]
async fn test_server_errors_retried_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/index.php"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("topic", "8.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(thread_page(8, 1..=4, 1, false)))
        .mount(&server)
        .await;

    let sink = Arc::new(RecordingSink::new());
    let walker = PaginationWalker::from_config(&test_config(&server.uri()))
        .unwrap()
        .with_sink(sink.clone());
    let mut thread = Thread::from_url(&format!("{}/index.php?topic=8.0", server.uri())).unwrap();

    let posts = walker
        .scan(&mut thread, 1, 1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(posts.len(), 4);
    assert_eq!(sink.attempts().len(), 3);
}

#[tokio::test]
async fn test_exhausted_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let walker = PaginationWalker::from_config(&test_config(&server.uri())).unwrap();
    let mut thread = Thread::from_url(&format!("{}/index.php?topic=8.0", server.uri())).unwrap();

    let result = walker
        .scan(&mut thread, 1, 1, &CancellationToken::new())
        .await;

    assert!(matches!(
        result,
        Err(HarvestError::ConnectivityExhausted { attempts: 3, .. })
    ));
}

#[tokio::test]
async fn test_walker_from_config_file() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("topic", "9.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(thread_page(9, 1..=2, 1, false)))
        .mount(&server)
        .await;

    let toml = format!(
        r#"
[forum]
host = "{}/"

[fetch]
request-delay-ms = 0
max-attempts = 1

[extract]
smiley-substitute = "*"
"#,
        server.uri()
    );
    let config = parse_config(&toml).unwrap();
    let walker = PaginationWalker::from_config(&config).unwrap();

    let mut thread = Thread::from_url(&format!("{}/index.php?topic=9.0", server.uri())).unwrap();
    let posts = walker
        .scan(&mut thread, 1, 1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(posts.len(), 2);
    assert_eq!(walker.extractor().smiley_substitute(), '*');
}
