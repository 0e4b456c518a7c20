//! HTTP document backend against an in-process server.
//!
//! The server keeps one record per `{collection}/{document}` and implements
//! top-level field merge on PATCH, 404 for absent records and bearer-token
//! checks, which is the contract the backend expects.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use folio_store::{
    DocumentBackend, Fields, FixedClock, HttpDocumentBackend, RemoteError, RemoteSync,
};
use folio_test_utils::{fixed_instant, sample_tree};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::mpsc;
use warp::http::StatusCode;
use warp::{Filter, Reply};

const TOKEN: &str = "secret";

type Records = Arc<Mutex<HashMap<String, Fields>>>;

struct TestServer {
    addr: SocketAddr,
    records: Records,
}

impl TestServer {
    fn start() -> Self {
        let records: Records = Arc::default();
        let state = {
            let records = Arc::clone(&records);
            warp::any().map(move || Arc::clone(&records))
        };
        let auth = warp::header::optional::<String>("authorization");

        let fetch = warp::path!(String / String)
            .and(warp::get())
            .and(auth)
            .and(state.clone())
            .map(|collection: String, document: String, auth: Option<String>, records: Records| {
                if !authorized(auth.as_deref()) {
                    return StatusCode::UNAUTHORIZED.into_response();
                }
                if collection == "broken" {
                    return warp::reply::with_status("boom", StatusCode::INTERNAL_SERVER_ERROR)
                        .into_response();
                }
                match records.lock().get(&format!("{collection}/{document}")) {
                    Some(fields) => warp::reply::json(fields).into_response(),
                    None => StatusCode::NOT_FOUND.into_response(),
                }
            });

        let merge = warp::path!(String / String)
            .and(warp::patch())
            .and(auth)
            .and(warp::body::json::<Fields>())
            .and(state)
            .map(
                |collection: String,
                 document: String,
                 auth: Option<String>,
                 fields: Fields,
                 records: Records| {
                    if !authorized(auth.as_deref()) {
                        return StatusCode::FORBIDDEN.into_response();
                    }
                    let mut records = records.lock();
                    let stored = records.entry(format!("{collection}/{document}")).or_default();
                    for (key, value) in fields {
                        stored.insert(key, value);
                    }
                    StatusCode::NO_CONTENT.into_response()
                },
            );

        let (addr, server) = warp::serve(fetch.or(merge)).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        Self { addr, records }
    }

    fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn backend(&self) -> HttpDocumentBackend {
        HttpDocumentBackend::new(&self.endpoint(), "portfolio", "main").with_token(TOKEN)
    }

    fn record(&self) -> Option<Fields> {
        self.records.lock().get("portfolio/main").cloned()
    }
}

fn authorized(header: Option<&str>) -> bool {
    header == Some(format!("Bearer {TOKEN}").as_str())
}

fn sync(backend: HttpDocumentBackend) -> RemoteSync {
    RemoteSync::new(Arc::new(backend), Arc::new(FixedClock(fixed_instant())))
}

#[tokio::test]
async fn absent_record_is_none() {
    let server = TestServer::start();
    let remote = sync(server.backend());

    assert_eq!(remote.pull().await.unwrap(), None);
    assert!(!remote.exists().await.unwrap());
}

#[tokio::test]
async fn push_then_pull_round_trip() {
    let server = TestServer::start();
    let remote = sync(server.backend());

    remote.push(&sample_tree()).await.unwrap();

    assert_eq!(remote.pull().await.unwrap(), Some(sample_tree()));
    let meta = remote.metadata().await.unwrap().unwrap();
    assert_eq!(meta.last_modified, "2024-03-05T07:08:09.000Z");
    assert_eq!(meta.version, "1.0.0");
}

#[tokio::test]
async fn push_merges_top_level_fields() {
    let server = TestServer::start();
    let backend = server.backend();
    let mut extra = Fields::new();
    extra.insert("owner".into(), json!("admin"));
    backend.merge(extra).await.unwrap();

    sync(backend).push(&sample_tree()).await.unwrap();

    let record = server.record().unwrap();
    assert_eq!(record["owner"], json!("admin"));
    assert_eq!(record["version"], json!("1.0.0"));
}

#[tokio::test]
async fn missing_token_is_permission_denied() {
    let server = TestServer::start();
    let backend = HttpDocumentBackend::new(&server.endpoint(), "portfolio", "main");

    assert!(matches!(backend.fetch().await, Err(RemoteError::PermissionDenied(_))));
    assert!(matches!(
        backend.merge(Fields::new()).await,
        Err(RemoteError::PermissionDenied(_))
    ));
}

#[tokio::test]
async fn server_error_is_retryable_status() {
    let server = TestServer::start();
    let backend = HttpDocumentBackend::new(&server.endpoint(), "broken", "main").with_token(TOKEN);

    let err = backend.fetch().await.unwrap_err();

    assert_eq!(
        err,
        RemoteError::Status {
            status: 500,
            body: "boom".into()
        }
    );
    assert!(err.is_retryable());
}

#[tokio::test]
async fn polling_feed_reports_only_changes() {
    let server = TestServer::start();
    let backend = server.backend().with_poll_interval(Duration::from_millis(20));
    let remote = sync(backend);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let sub = remote.subscribe(
        move |record| {
            let _ = tx.send(record.map(|r| r.content));
        },
        |_| {},
    );

    assert_eq!(rx.recv().await.unwrap(), None);

    remote.push(&sample_tree()).await.unwrap();
    let delivered = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(delivered, Some(sample_tree()));

    // Several unchanged polls go by without a delivery.
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(rx.try_recv().is_err());

    sub.unsubscribe();
    assert!(!sub.is_active());
}
