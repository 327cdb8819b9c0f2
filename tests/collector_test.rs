use billcharge_sync::collector::{BillChargeCollector, CollectorConfig, ProgressEvent};
use billcharge_sync::error::CollectError;
use billcharge_sync::graphql::{GraphqlExecutor, ReqwestTransport, RetryPolicy};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const TOKEN: &str = "test-token";

/// Serves `pages[n - 1]` for `currentPage = n`.
struct PagedResponder {
    pages: Vec<Value>,
}

impl Respond for PagedResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let page = body["variables"]["pagination"]["currentPage"].as_u64().unwrap_or(0) as usize;
        match self.pages.get(page.wrapping_sub(1)) {
            Some(payload) => ResponseTemplate::new(200).set_body_json(payload.clone()),
            None => ResponseTemplate::new(404),
        }
    }
}

fn page(current: u32, last: u32, ids: &[u32]) -> Value {
    let items: Vec<Value> = ids.iter().map(|id| json!({"id": id})).collect();
    json!({
        "data": {
            "fetchBillCharges": {
                "data": items,
                "meta": {"currentPage": current, "lastPage": last}
            }
        }
    })
}

fn fast_config() -> CollectorConfig {
    CollectorConfig {
        page_delay: Duration::from_millis(1),
        max_page_retries: Some(1),
    }
}

fn collector(server: &MockServer, cancel: CancellationToken) -> BillChargeCollector {
    let transport = ReqwestTransport::new(server.uri(), Duration::from_secs(5)).unwrap();
    let policy = RetryPolicy::new(1, Duration::from_millis(1), Duration::from_millis(2));
    let executor = GraphqlExecutor::new(Arc::new(transport), policy).with_cancellation(cancel);
    BillChargeCollector::new(executor, fast_config())
}

async fn mount_pages(server: &MockServer, pages: Vec<Value>) {
    Mock::given(method("POST"))
        .and(header("Authorization", "Bearer test-token"))
        .and(header("Content-Type", "application/json"))
        .respond_with(PagedResponder { pages })
        .mount(server)
        .await;
}

#[tokio::test]
async fn collects_every_page_in_order() {
    let server = MockServer::start().await;
    mount_pages(
        &server,
        vec![page(1, 3, &[1, 2]), page(2, 3, &[3, 4]), page(3, 3, &[5])],
    )
    .await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let collector = collector(&server, CancellationToken::new()).with_progress(Arc::new(tx));

    let records = collector
        .collect("2024-01-01", "2024-01-31", TOKEN, 2)
        .await
        .expect("collection should succeed");

    let ids: Vec<u64> = records.iter().map(|r| r["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
    let first: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(first["variables"]["pagination"]["perPage"], 2);
    assert_eq!(first["variables"]["filters"]["paidAtRange"]["start"], "2024-01-01");
    assert!(first["query"].as_str().unwrap().contains("fetchBillCharges"));

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    let page_events = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::Page { .. }))
        .count();
    assert_eq!(page_events, 3);
    assert_eq!(
        events.last(),
        Some(&ProgressEvent::Completed { pages: 3, total_items: 5 })
    );
}

#[tokio::test]
async fn single_page_stops_after_one_request() {
    let server = MockServer::start().await;
    mount_pages(&server, vec![page(1, 1, &[7, 8, 9])]).await;

    let records = collector(&server, CancellationToken::new())
        .collect("2024-01-01", "2024-01-01", TOKEN, 200)
        .await
        .unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn graphql_error_discards_partial_results() {
    let server = MockServer::start().await;
    mount_pages(
        &server,
        vec![
            page(1, 3, &[1, 2]),
            json!({"errors": [{"message": "Variable \"$filters\" got invalid value"}]}),
        ],
    )
    .await;

    let err = collector(&server, CancellationToken::new())
        .collect("2024-01-01", "2024-01-31", TOKEN, 2)
        .await
        .unwrap_err();

    match err {
        CollectError::Graphql { page, messages } => {
            assert_eq!(page, 2);
            assert_eq!(messages.len(), 1);
            assert!(messages[0].contains("invalid value"));
        }
        other => panic!("expected graphql failure, got {:?}", other),
    }
    // the fatal reply is not retried
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_payload_is_structural_failure() {
    let server = MockServer::start().await;
    mount_pages(&server, vec![json!({"data": {"somethingElse": {}}})]).await;

    let err = collector(&server, CancellationToken::new())
        .collect("2024-01-01", "2024-01-31", TOKEN, 200)
        .await
        .unwrap_err();

    assert!(matches!(err, CollectError::Structural { page: 1, .. }));
}

#[tokio::test]
async fn server_errors_exhaust_the_page() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = collector(&server, CancellationToken::new())
        .collect("2024-01-01", "2024-01-31", TOKEN, 200)
        .await
        .unwrap_err();

    assert_eq!(err, CollectError::NetworkExhausted { page: 1, rounds: 2 });
    // two rounds of (initial request + one retry)
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn cancelled_run_sends_nothing() {
    let server = MockServer::start().await;
    mount_pages(&server, vec![page(1, 1, &[1])]).await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = collector(&server, cancel)
        .collect("2024-01-01", "2024-01-31", TOKEN, 200)
        .await
        .unwrap_err();

    assert_eq!(err, CollectError::Cancelled { page: 1 });
    assert!(server.received_requests().await.unwrap().is_empty());
}
