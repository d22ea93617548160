//! Tests for the snapshot fetcher.

use std::io::Write;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

/// Retry policy with no waiting, for fast tests
fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay: Duration::from_millis(1),
        jitter_cap: Duration::ZERO,
        timeout: Duration::from_secs(2),
    }
}

fn payload_file(payload: &Value) -> tempfile::NamedTempFile {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    write!(tmp, "{}", payload).unwrap();
    tmp
}

fn remote_payload() -> Value {
    json!({ "data": [{ "_id": "remote-1", "available": 1, "inventory_quantity": 3 }] })
}

// ── RetryPolicy ──────────────────────────────────────────────────────

#[test]
fn backoff_doubles_per_attempt() {
    let policy = RetryPolicy {
        max_retries: 5,
        base_delay: Duration::from_millis(750),
        jitter_cap: Duration::ZERO,
        timeout: Duration::from_secs(1),
    };
    assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(750));
    assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(1500));
    assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(3000));
}

#[test]
fn jitter_stays_within_cap() {
    let policy = RetryPolicy::default();
    for attempt in 0..4 {
        let base = policy.base_delay_for_attempt(attempt);
        for _ in 0..50 {
            let delay = policy.delay_for_attempt(attempt);
            assert!(delay >= base);
            assert!(delay <= base + DEFAULT_JITTER_CAP);
        }
    }
}

#[test]
fn huge_attempt_saturates() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.base_delay_for_attempt(40), Duration::MAX);
}

// ── remote source ────────────────────────────────────────────────────

#[tokio::test]
async fn remote_success_is_used() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(remote_payload()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = Fetcher::new(
        Some(format!("{}/products", mock_server.uri())),
        None,
        fast_policy(2),
    );
    let snapshot = fetcher.fetch().await;

    assert_eq!(snapshot.source, SnapshotSource::Remote);
    assert_eq!(snapshot.payload, remote_payload());
}

#[tokio::test]
async fn permanent_failure_makes_exactly_three_attempts_then_uses_file() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let local = json!({ "data": [{ "_id": "local-1", "available": "yes", "inventory_quantity": "4" }] });
    let file = payload_file(&local);

    let fetcher = Fetcher::new(
        Some(mock_server.uri()),
        Some(file.path().to_path_buf()),
        fast_policy(2),
    );
    let snapshot = fetcher.fetch().await;

    assert_eq!(snapshot.source, SnapshotSource::LocalFile);
    assert_eq!(snapshot.payload, local);
    // MockServer verifies `expect(3)` on drop
}

#[tokio::test]
async fn permanent_failure_without_file_uses_sample() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let fetcher = Fetcher::new(Some(mock_server.uri()), None, fast_policy(2));
    let snapshot = fetcher.fetch().await;

    assert_eq!(snapshot.source, SnapshotSource::Sample);
    assert_eq!(snapshot.payload, sample_payload());
}

#[tokio::test]
async fn malformed_body_counts_as_failed_attempt() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let fetcher = Fetcher::new(Some(mock_server.uri()), None, fast_policy(1));
    let result = fetcher.fetch_remote(&mock_server.uri()).await;

    assert!(matches!(result, Err(StockError::Parse(_))));
}

#[tokio::test]
async fn recovers_after_transient_failure() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(remote_payload()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = Fetcher::new(Some(mock_server.uri()), None, fast_policy(2));
    let snapshot = fetcher.fetch().await;

    assert_eq!(snapshot.source, SnapshotSource::Remote);
    assert_eq!(snapshot.payload, remote_payload());
}

#[tokio::test]
async fn timeout_counts_as_failed_attempt() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(remote_payload())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let policy = RetryPolicy {
        timeout: Duration::from_millis(50),
        ..fast_policy(0)
    };
    let fetcher = Fetcher::new(Some(mock_server.uri()), None, policy);
    let result = fetcher.fetch_remote(&mock_server.uri()).await;

    assert!(matches!(result, Err(StockError::Network(_))));
}

// ── local fallbacks ──────────────────────────────────────────────────

#[tokio::test]
async fn no_endpoint_reads_file() {
    let local = json!({ "data": [] });
    let file = payload_file(&local);

    let fetcher = Fetcher::new(None, Some(file.path().to_path_buf()), fast_policy(2));
    let snapshot = fetcher.fetch().await;

    assert_eq!(snapshot.source, SnapshotSource::LocalFile);
    assert_eq!(snapshot.payload, local);
}

#[tokio::test]
async fn blank_endpoint_is_ignored() {
    let fetcher = Fetcher::new(Some("  ".to_string()), None, fast_policy(2));
    assert_eq!(fetcher.fetch().await.source, SnapshotSource::Sample);
}

#[tokio::test]
async fn unreadable_file_uses_sample() {
    let fetcher = Fetcher::new(
        None,
        Some(PathBuf::from("/nonexistent/path/payload.json")),
        fast_policy(2),
    );
    let snapshot = fetcher.fetch().await;
    assert_eq!(snapshot.source, SnapshotSource::Sample);
    assert_eq!(snapshot.payload, sample_payload());
}

#[test]
fn load_file_reports_cause() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    write!(tmp, "{{ not valid json").unwrap();
    assert!(matches!(load_file(tmp.path()), Err(StockError::Parse(_))));
    assert!(matches!(
        load_file(Path::new("/nonexistent/payload.json")),
        Err(StockError::Io(_))
    ));
}
