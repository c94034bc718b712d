//! End-to-end tests driving a spawned debugd binary over real HTTP.

use std::fs;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use debugd_client::DebugLogClient;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::time::sleep;

fn find_debugd_binary() -> PathBuf {
    let exe = std::env::current_exe().expect("current_exe");
    // target/debug/deps/<test-bin>
    let target_dir = exe
        .parent()
        .and_then(|p| p.parent())
        .expect("target debug dir");
    let candidate = target_dir.join("debugd");
    if candidate.is_file() {
        return candidate;
    }
    // Fallback to workspace target
    target_dir
        .parent()
        .map(|p| p.join("debug").join("debugd"))
        .unwrap_or(candidate)
}

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr").port()
}

struct Daemon {
    child: Child,
    port: u16,
    project_dir: TempDir,
}

impl Daemon {
    async fn spawn() -> Self {
        let project_dir = TempDir::new().expect("tempdir");
        let port = free_port();

        let child = Command::new(find_debugd_binary())
            .arg(project_dir.path())
            .env("DEBUG_PORT", port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn debugd");

        let daemon = Self {
            child,
            port,
            project_dir,
        };

        let mut ready = false;
        for _ in 0..50 {
            // up to ~5s
            if debugd_client::is_running(daemon.port).await {
                ready = true;
                break;
            }
            sleep(Duration::from_millis(100)).await;
        }
        assert!(ready, "daemon should accept connections");

        daemon
    }

    fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    fn log_dir(&self) -> PathBuf {
        self.project_dir.path().join(".claude")
    }

    fn log_file(&self, session: &str) -> PathBuf {
        self.log_dir().join(format!("debug-{session}.log"))
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn read_entries(path: &Path) -> Vec<Value> {
    let contents = fs::read_to_string(path).expect("read log file");
    contents
        .lines()
        .map(|line| serde_json::from_str(line).expect("every line parses as JSON"))
        .collect()
}

#[tokio::test]
async fn status_and_append_round_trip() {
    let daemon = Daemon::spawn().await;
    let client = DebugLogClient::local(daemon.port).expect("client");

    // GET reports the resolved log directory, created at startup.
    let status = client.status().await.expect("status");
    assert_eq!(status.status, "ok");
    assert_eq!(status.log_dir, daemon.log_dir().display().to_string());
    assert!(daemon.log_dir().is_dir());

    // POST without a session goes to the default file under that directory.
    let mut fields = serde_json::Map::new();
    fields.insert("msg".to_string(), json!("hello"));
    fields.insert("level".to_string(), json!("debug"));
    let log_file = client.log(None, fields).await.expect("log");
    assert_eq!(log_file, daemon.log_file("default").display().to_string());

    let entries = read_entries(&daemon.log_file("default"));
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["msg"], "hello");
    assert_eq!(entries[0]["level"], "debug");
    assert!(entries[0]["ts"].is_string());
}

#[tokio::test]
async fn sessions_are_isolated_and_ordered() {
    let daemon = Daemon::spawn().await;
    let client = DebugLogClient::local(daemon.port).expect("client");

    client.log_msg(Some("abc"), "first").await.expect("log 1");
    client.log_msg(Some("abc"), "second").await.expect("log 2");

    // Entries land in the session file only, in submission order, without
    // the sessionId key, with non-decreasing timestamps.
    assert!(!daemon.log_file("default").exists());

    let entries = read_entries(&daemon.log_file("abc"));
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["msg"], "first");
    assert_eq!(entries[1]["msg"], "second");
    assert!(entries.iter().all(|e| e.get("sessionId").is_none()));

    let first = entries[0]["ts"].as_str().expect("ts");
    let second = entries[1]["ts"].as_str().expect("ts");
    assert!(first <= second);
}

#[tokio::test]
async fn malformed_and_preflight_requests() {
    let daemon = Daemon::spawn().await;
    let http = reqwest::Client::new();

    // Malformed JSON: 400, non-empty error, no file created.
    let response = http
        .post(daemon.base_url())
        .body("not json")
        .send()
        .await
        .expect("post");
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("error body");
    assert!(!body["error"].as_str().expect("error string").is_empty());
    assert_eq!(fs::read_dir(daemon.log_dir()).expect("read dir").count(), 0);

    // Empty body behaves as an empty object: entry with only `ts`.
    let response = http
        .post(daemon.base_url())
        .send()
        .await
        .expect("empty post");
    assert_eq!(response.status(), 200);
    let entries = read_entries(&daemon.log_file("default"));
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].as_object().expect("object").len(), 1);
    assert!(entries[0]["ts"].is_string());

    // OPTIONS preflight: 204, empty body, all three CORS headers.
    let response = http
        .request(reqwest::Method::OPTIONS, daemon.base_url())
        .send()
        .await
        .expect("options");
    assert_eq!(response.status(), 204);
    let headers = response.headers().clone();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "GET, POST, OPTIONS");
    assert_eq!(headers["access-control-allow-headers"], "Content-Type");
    assert!(response.bytes().await.expect("body").is_empty());
}

#[tokio::test]
async fn concurrent_posts_never_interleave_lines() {
    const WRITERS: usize = 16;

    let daemon = Daemon::spawn().await;

    let mut handles = Vec::new();
    for i in 0..WRITERS {
        let port = daemon.port;
        handles.push(tokio::spawn(async move {
            let client = DebugLogClient::local(port).expect("client");
            let mut fields = serde_json::Map::new();
            fields.insert("writer".to_string(), json!(i));
            fields.insert("payload".to_string(), json!("x".repeat(512)));
            client.log(Some("shared"), fields).await.expect("log");
        }));
    }
    for handle in handles {
        handle.await.expect("writer task");
    }

    // Every line must be independently valid JSON; read_entries panics on
    // any torn write.
    let entries = read_entries(&daemon.log_file("shared"));
    assert_eq!(entries.len(), WRITERS);

    let mut writers: Vec<u64> = entries
        .iter()
        .map(|e| e["writer"].as_u64().expect("writer id"))
        .collect();
    writers.sort_unstable();
    let expected: Vec<u64> = (0..WRITERS as u64).collect();
    assert_eq!(writers, expected);
}
