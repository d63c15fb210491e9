use mpx_core::{Endpoints, FetchError, HttpSnapshotSource, SnapshotSource};
use std::time::Duration;
use url::Url;

const STATUS_BODY: &str = r#"{
    "servers": [
        {
            "server": {
                "addr": "127.0.0.1:3128",
                "proto": { "HTTP": { "connect_with_payload": false } },
                "tag": "local",
                "config": {
                    "test_dns": "8.8.8.8:53",
                    "max_wait": { "secs": 4, "nanos": 0 },
                    "score_base": 0
                },
                "status": {
                    "delay": { "secs": 0, "nanos": 42000000 },
                    "score": 42,
                    "conn_alive": 1,
                    "conn_total": 3,
                    "conn_error": 1,
                    "close_history": 2
                },
                "traffic": { "tx_bytes": 100, "rx_bytes": 200 }
            },
            "throughput": { "tx_bps": 10, "rx_bps": 20 }
        }
    ],
    "uptime": { "secs": 5, "nanos": 0 },
    "throughput": { "tx_bps": 10, "rx_bps": 20 }
}"#;

fn source_for(server: &mockito::ServerGuard) -> HttpSnapshotSource {
    let base = Url::parse(&format!("{}/", server.url())).expect("base url");
    let endpoints = Endpoints::resolve(&base, None, None).expect("endpoints");
    HttpSnapshotSource::new(endpoints, Duration::from_secs(5)).expect("client")
}

#[tokio::test]
async fn fetches_and_decodes_status() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/status")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(STATUS_BODY)
        .create_async()
        .await;

    let source = source_for(&server);
    let snapshot = source.fetch_snapshot().await.expect("snapshot");
    assert_eq!(snapshot.servers.len(), 1);
    assert_eq!(snapshot.servers[0].tag, "local");
    assert_eq!(snapshot.servers[0].close_history().summary(), "1/2");
    mock.assert_async().await;
}

#[tokio::test]
async fn non_success_status_is_a_fetch_failure() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/status")
        .with_status(503)
        .create_async()
        .await;

    let err = source_for(&server)
        .fetch_snapshot()
        .await
        .expect_err("503 must fail");
    assert!(matches!(err, FetchError::Status { status: 503, .. }));
}

#[tokio::test]
async fn malformed_body_is_a_decode_failure() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/status")
        .with_status(200)
        .with_body("<html>not json</html>")
        .create_async()
        .await;

    let err = source_for(&server)
        .fetch_snapshot()
        .await
        .expect_err("html must fail");
    assert!(matches!(err, FetchError::Decode(_)));
}

#[tokio::test]
async fn version_is_trimmed_plain_text() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/version")
        .with_status(200)
        .with_body("0.5.1\n")
        .create_async()
        .await;

    let version = source_for(&server).fetch_version().await.expect("version");
    assert_eq!(version, "0.5.1");
}
