//! End-to-end runs of the worker pool
//!
//! - http/https go through the real reqwest transport to a local axum server
//! - ftp goes through the FTP client to an in-process FTP server
//! - s3 is backed by an in-memory object store

mod common;

use axum::{Router, routing::get};
use bytes::Bytes;
use common::ftp_server;
use fetchpool::config::{ByteSize, Settings};
use fetchpool::orchestrator;
use fetchpool::strategies::{
    Backends, CredentialResolver, FtpConfig, HttpConfig, ObjectStoreSession, SchemeRouter,
};
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tokio::time::{Duration, timeout};

const A_BIN: &[u8] = b"payload served over http";
const B_BIN: &[u8] = b"payload stored in bucket1";
const C_BIN: &[u8] = b"payload served over ftp";

/// Start a mock HTTP server on a random port
async fn start_mock_server() -> String {
    let app = Router::new()
        .route("/a.bin", get(|| async { Bytes::from_static(A_BIN) }))
        .route("/empty.bin", get(|| async { Bytes::new() }))
        .route("/large.bin", get(|| async { Bytes::from(vec![42u8; 1 << 20]) }));

    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let bound_addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{bound_addr}")
}

struct BucketSession {
    buckets: HashMap<String, Arc<InMemory>>,
}

impl ObjectStoreSession for BucketSession {
    fn bucket(&self, name: &str) -> Result<Arc<dyn ObjectStore>, object_store::Error> {
        self.buckets
            .get(name)
            .map(|store| Arc::clone(store) as Arc<dyn ObjectStore>)
            .ok_or_else(|| object_store::Error::NotFound {
                path: name.to_string(),
                source: "NoSuchBucket".into(),
            })
    }
}

struct TestResolver {
    session: Arc<BucketSession>,
    profiles_seen: Arc<std::sync::Mutex<Vec<Option<String>>>>,
    sessions: AtomicUsize,
}

impl CredentialResolver for TestResolver {
    fn session(&self, profile: Option<&str>) -> Arc<dyn ObjectStoreSession> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        self.profiles_seen.lock().unwrap().push(profile.map(str::to_string));
        Arc::clone(&self.session) as Arc<dyn ObjectStoreSession>
    }
}

/// Backends with the real HTTP and FTP clients and in-memory buckets, plus
/// the base URL of a mock FTP server holding `/c.bin`
async fn backends() -> (Backends, Arc<TestResolver>, String) {
    let bucket = Arc::new(InMemory::new());
    bucket
        .put(&ObjectPath::from("folder/b.bin"), PutPayload::from_static(B_BIN))
        .await
        .unwrap();

    let resolver = Arc::new(TestResolver {
        session: Arc::new(BucketSession {
            buckets: [("bucket1".to_string(), bucket)].into(),
        }),
        profiles_seen: Arc::default(),
        sessions: AtomicUsize::new(0),
    });

    let ftp = ftp_server::start([("/c.bin".to_string(), C_BIN.to_vec())].into()).await;
    let transport = SchemeRouter::standard(HttpConfig::default(), FtpConfig::default()).unwrap();

    (
        Backends::new(Arc::new(transport), Arc::clone(&resolver) as Arc<dyn CredentialResolver>),
        resolver,
        ftp.url,
    )
}

fn settings(dir: &TempDir, workers: usize, chunk: u64) -> Settings {
    Settings {
        profile: "default".to_string(),
        chunk: ByteSize(chunk),
        workers,
        output_dir: PathBuf::from(dir.path()),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_mixed_protocol_batch() {
    let server = start_mock_server().await;
    let dir = TempDir::new().unwrap();
    let (backends, resolver, ftp) = backends().await;
    let settings = settings(&dir, 2, 4096);

    let urls = vec![
        format!("{server}/a.bin"),
        "s3://bucket1/folder/b.bin".to_string(),
        format!("{ftp}/c.bin"),
        "bogus://x/y".to_string(),
    ];

    let report = timeout(
        Duration::from_secs(30),
        orchestrator::run(urls, settings.workers, settings.global_parameters(), backends),
    )
    .await
    .expect("run did not finish");

    assert_eq!(std::fs::read(dir.path().join("a.bin")).unwrap(), A_BIN);
    assert_eq!(std::fs::read(dir.path().join("b.bin")).unwrap(), B_BIN);
    assert_eq!(std::fs::read(dir.path().join("c.bin")).unwrap(), C_BIN);
    assert!(!dir.path().join("y").exists());

    assert_eq!(report.outcomes.enqueued, 4);
    assert_eq!(report.outcomes.succeeded, 3);
    assert_eq!(report.outcomes.unsupported, 1);
    assert_eq!(report.outcomes.failed, 0);

    // Only the object strategy sees the profile, once per worker at most.
    assert!(resolver.sessions.load(Ordering::SeqCst) <= 2);
    assert!(
        resolver
            .profiles_seen
            .lock()
            .unwrap()
            .iter()
            .all(|p| p.as_deref() == Some("default"))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failures_do_not_block_the_run() {
    let server = start_mock_server().await;
    let dir = TempDir::new().unwrap();
    let (backends, _resolver, ftp) = backends().await;
    let settings = settings(&dir, 2, 1024);

    let urls = vec![
        format!("{server}/missing.bin"),
        "http://127.0.0.1:1/unreachable.bin".to_string(),
        "s3://bucket1/folder/nope.bin".to_string(),
        "s3://no-such-bucket/b.bin".to_string(),
        format!("{ftp}/absent.bin"),
        format!("{server}/"),
        "HTTP-NOT-A-URL".to_string(),
        format!("{server}/a.bin"),
    ];

    let report = timeout(
        Duration::from_secs(30),
        orchestrator::run(urls, settings.workers, settings.global_parameters(), backends),
    )
    .await
    .expect("run did not finish");

    assert_eq!(report.outcomes.enqueued, 8);
    assert_eq!(report.outcomes.processed(), 8);
    assert_eq!(report.outcomes.succeeded, 1);
    assert_eq!(report.outcomes.failed, 7);

    assert!(dir.path().join("a.bin").exists());
    for name in ["missing.bin", "unreachable.bin", "nope.bin", "absent.bin"] {
        assert!(!dir.path().join(name).exists(), "{name} should not exist");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_empty_and_large_http_bodies() {
    let server = start_mock_server().await;
    let dir = TempDir::new().unwrap();
    let (backends, _resolver, _ftp) = backends().await;
    let settings = settings(&dir, 2, 4096);

    let urls = vec![format!("{server}/empty.bin"), format!("{server}/large.bin")];
    let report = orchestrator::run(urls, settings.workers, settings.global_parameters(), backends).await;

    assert_eq!(report.outcomes.succeeded, 2);
    assert_eq!(std::fs::metadata(dir.path().join("empty.bin")).unwrap().len(), 0);
    assert_eq!(std::fs::metadata(dir.path().join("large.bin")).unwrap().len(), 1 << 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_urls_few_workers() {
    let server = start_mock_server().await;
    let dir = TempDir::new().unwrap();
    let (backends, _resolver, _ftp) = backends().await;
    let settings = settings(&dir, 3, 7);

    // Same file name for every URL: the last writer wins, all succeed.
    let urls: Vec<String> = (0..25).map(|_| format!("{server}/a.bin")).collect();
    let report = timeout(
        Duration::from_secs(30),
        orchestrator::run(urls, settings.workers, settings.global_parameters(), backends),
    )
    .await
    .expect("run did not finish");

    assert_eq!(report.outcomes.succeeded, 25);
}
