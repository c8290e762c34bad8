use leasedb::LeasedbInstance;
use leasedb::config::LeasedbConfig;
use leasedb::http;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::tempdir;

async fn serve_instance(instance: Arc<LeasedbInstance>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, http::router(instance))
            .await
            .expect("serve");
    });
    addr
}

async fn post_json(url: String) -> Value {
    tokio::task::spawn_blocking(move || {
        ureq::post(&url)
            .call()
            .expect("post")
            .into_json::<Value>()
            .expect("json body")
    })
    .await
    .expect("blocking task")
}

async fn get_json(url: String) -> Value {
    tokio::task::spawn_blocking(move || {
        ureq::get(&url)
            .call()
            .expect("get")
            .into_json::<Value>()
            .expect("json body")
    })
    .await
    .expect("blocking task")
}

async fn request_status(method: &'static str, url: String) -> (u16, String) {
    tokio::task::spawn_blocking(move || match ureq::request(method, &url).call() {
        Ok(resp) => {
            let status = resp.status();
            (status, resp.into_string().unwrap_or_default())
        }
        Err(ureq::Error::Status(code, resp)) => (code, resp.into_string().unwrap_or_default()),
        Err(other) => panic!("transport error: {other}"),
    })
    .await
    .expect("blocking task")
}

/// Test Case 1: Insert Replies With A Latency Envelope
///
/// `POST /insert` writes one record through the lease and answers with the
/// bracket's wall time as a human-readable duration string.
#[tokio::test]
async fn test_insert_returns_latency_envelope() {
    let dir = tempdir().expect("temp dir");
    let instance = Arc::new(
        LeasedbInstance::open(LeasedbConfig::default(), dir.path().join("app.db"))
            .await
            .expect("open"),
    );
    let addr = serve_instance(Arc::clone(&instance)).await;

    let body = post_json(format!("http://{addr}/insert")).await;
    let latency = body["latency"].as_str().expect("latency is a string");
    assert!(!latency.is_empty(), "latency string must not be empty");
    assert!(
        body.get("records").is_none(),
        "insert envelope carries no records"
    );

    // Verify: the record actually landed
    let recent = instance.fetch_recent().await.expect("fetch");
    assert_eq!(recent.records.len(), 1);
}

/// Test Case 2: Fetch Replies With The Recent Window
///
/// After a handful of inserts, `GET /fetch` returns the records in
/// ascending id order with both keys present on every element.
#[tokio::test]
async fn test_fetch_returns_recent_records() {
    let dir = tempdir().expect("temp dir");
    let instance = Arc::new(
        LeasedbInstance::open(LeasedbConfig::default(), dir.path().join("app.db"))
            .await
            .expect("open"),
    );
    let addr = serve_instance(instance).await;

    for _ in 0..5 {
        post_json(format!("http://{addr}/insert")).await;
    }

    let body = get_json(format!("http://{addr}/fetch")).await;
    assert!(
        body["latency"].as_str().is_some(),
        "fetch envelope carries a latency string"
    );
    let records = body["records"].as_array().expect("records array");
    assert_eq!(records.len(), 5);

    let ids: Vec<i64> = records
        .iter()
        .map(|r| r["id"].as_i64().expect("id is a number"))
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5], "ids must ascend");
    for record in records {
        assert!(record["value"].as_i64().is_some(), "value is a number");
    }
}

/// Test Case 3: Fetching An Empty Store Returns An Empty Array
#[tokio::test]
async fn test_fetch_empty_store_returns_no_records() {
    let dir = tempdir().expect("temp dir");
    let instance = Arc::new(
        LeasedbInstance::open(LeasedbConfig::default(), dir.path().join("app.db"))
            .await
            .expect("open"),
    );
    let addr = serve_instance(instance).await;

    let body = get_json(format!("http://{addr}/fetch")).await;
    let records = body["records"].as_array().expect("records array");
    assert!(records.is_empty());
}

/// Test Case 4: Wrong Methods Get A 405
///
/// The paths exist but only one method each is served; everything else is
/// refused without touching the store. Unknown paths fall through to 404.
#[tokio::test]
async fn test_wrong_methods_are_rejected() {
    let dir = tempdir().expect("temp dir");
    let instance = Arc::new(
        LeasedbInstance::open(LeasedbConfig::default(), dir.path().join("app.db"))
            .await
            .expect("open"),
    );
    let addr = serve_instance(Arc::clone(&instance)).await;

    let (status, body) = request_status("GET", format!("http://{addr}/insert")).await;
    assert_eq!(status, 405);
    assert_eq!(body, "method not allowed");

    let (status, body) = request_status("POST", format!("http://{addr}/fetch")).await;
    assert_eq!(status, 405);
    assert_eq!(body, "method not allowed");

    let (status, _) = request_status("DELETE", format!("http://{addr}/insert")).await;
    assert_eq!(status, 405);

    let (status, _) = request_status("GET", format!("http://{addr}/missing")).await;
    assert_eq!(status, 404);

    // Verify: none of the refused calls wrote anything
    let recent = instance.fetch_recent().await.expect("fetch");
    assert!(recent.records.is_empty());
}
