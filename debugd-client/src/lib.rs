//! Client library for the debugd log ingestion daemon.
//!
//! Wraps the daemon's small HTTP surface (status probe, entry submission)
//! and carries the local-filesystem helpers the companion binaries use:
//! session id minting and session log cleanup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;
use serde_json::{Map, Value};

pub mod cleanup;

pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_LOG_SUBDIR: &str = ".claude";
pub const SESSION_KEY: &str = "sessionId";

const PROBE_TIMEOUT: Duration = Duration::from_millis(500);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("daemon rejected entry: {0}")]
    Rejected(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Status payload returned by the daemon on GET.
#[derive(Debug, Deserialize)]
pub struct DaemonStatus {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    pub log_dir: String,
}

#[derive(Debug, Deserialize)]
struct IngestResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    log_file: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for a running debugd daemon.
pub struct DebugLogClient {
    base_url: String,
    http: reqwest::Client,
}

impl DebugLogClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { base_url, http })
    }

    /// Client for a daemon on localhost.
    pub fn local(port: u16) -> Result<Self> {
        Self::new(format!("http://127.0.0.1:{port}"))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn status(&self) -> Result<DaemonStatus> {
        let response = self.http.get(&self.base_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::InvalidResponse(format!("status {status}")).into());
        }
        Ok(response.json().await?)
    }

    /// Submit one entry. `session` is injected under `sessionId`; the daemon
    /// pops it back out before writing. Returns the log file the daemon
    /// appended to.
    pub async fn log(
        &self,
        session: Option<&str>,
        mut fields: Map<String, Value>,
    ) -> Result<String> {
        if let Some(session) = session {
            fields.insert(SESSION_KEY.to_string(), Value::String(session.to_string()));
        }

        let response = self
            .http
            .post(&self.base_url)
            .json(&Value::Object(fields))
            .send()
            .await?;
        let status = response.status();
        let parsed: IngestResponse = response
            .json()
            .await
            .map_err(|err| ClientError::InvalidResponse(err.to_string()))?;

        if !status.is_success() || !parsed.ok {
            let reason = parsed.error.unwrap_or_else(|| format!("status {status}"));
            tracing::debug!("daemon rejected entry: {reason}");
            return Err(ClientError::Rejected(reason).into());
        }

        match parsed.log_file {
            Some(path) => Ok(path),
            None => Err(ClientError::InvalidResponse("missing log_file".to_string()).into()),
        }
    }

    /// Convenience wrapper for a plain text message.
    pub async fn log_msg(&self, session: Option<&str>, msg: &str) -> Result<String> {
        let mut fields = Map::new();
        fields.insert("msg".to_string(), Value::String(msg.to_string()));
        self.log(session, fields).await
    }
}

/// Bounded probe for an already-running daemon on localhost.
pub async fn is_running(port: u16) -> bool {
    let Ok(client) = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() else {
        return false;
    };
    match client.get(format!("http://127.0.0.1:{port}/")).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

/// Path of a session's log file under a project directory.
pub fn session_log_file(project_dir: &Path, log_subdir: &str, session: &str) -> PathBuf {
    project_dir
        .join(log_subdir)
        .join(format!("debug-{session}.log"))
}

/// Mint a short session id of the form `<prefix>-<6 hex chars>`.
///
/// Characters the daemon would reject in a file name are replaced, so the
/// result always passes session-id validation.
pub fn new_session_id(prefix: &str) -> String {
    let cleaned: String = prefix
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches(['.', '-']);
    let base = if trimmed.is_empty() { "session" } else { trimmed };

    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", base, &uuid[..6])
}
