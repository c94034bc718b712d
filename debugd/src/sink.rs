//! Append-only sink for per-session debug logs.
//!
//! Each accepted entry becomes exactly one newline-delimited JSON line in
//! `<log_dir>/debug-<session>.log`. Files are opened, appended and closed
//! per entry; no handle outlives a request.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

pub const DEFAULT_SESSION: &str = "default";
pub const SESSION_KEY: &str = "sessionId";
pub const TIMESTAMP_KEY: &str = "ts";

const PREVIEW_LIMIT: usize = 80;

/// Everything that can go wrong between receiving a request body and the
/// line landing on disk. All variants surface to the client the same way.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("request body must be a JSON object")]
    NotAnObject,
    #[error("invalid session id '{0}'")]
    InvalidSessionId(String),
    #[error("failed to append log entry: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse a request body into its target session and remaining fields.
///
/// An empty body is treated as an empty object. The `sessionId` key is
/// popped out of the object so it never ends up inside the stored entry.
pub fn parse_entry(body: &[u8]) -> Result<(String, Map<String, Value>), IngestError> {
    let mut fields = if body.is_empty() {
        Map::new()
    } else {
        match serde_json::from_slice::<Value>(body)? {
            Value::Object(map) => map,
            _ => return Err(IngestError::NotAnObject),
        }
    };

    let session = match fields.remove(SESSION_KEY) {
        None => DEFAULT_SESSION.to_string(),
        Some(Value::String(id)) => id,
        Some(other) => return Err(IngestError::InvalidSessionId(other.to_string())),
    };

    validate_session_id(&session)?;
    Ok((session, fields))
}

/// Stamp the entry with the server-side receipt time, overwriting any
/// client-supplied `ts`.
pub fn stamp(mut fields: Map<String, Value>) -> Map<String, Value> {
    let ts = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    fields.insert(TIMESTAMP_KEY.to_string(), Value::String(ts));
    fields
}

/// One-line console notice for an accepted entry: the `msg` field when it
/// is a string, otherwise a truncated JSON rendering of the whole entry.
pub fn preview(entry: &Map<String, Value>) -> String {
    if let Some(Value::String(msg)) = entry.get("msg") {
        return msg.clone();
    }
    let rendered = Value::Object(entry.clone()).to_string();
    rendered.chars().take(PREVIEW_LIMIT).collect()
}

// Session ids become file names. Reject anything that could reach outside
// the log directory (separators, `..`, hidden-file prefixes).
fn validate_session_id(id: &str) -> Result<(), IngestError> {
    let valid = !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if valid {
        Ok(())
    } else {
        Err(IngestError::InvalidSessionId(id.to_string()))
    }
}

/// Append-writer over the resolved log directory.
///
/// Requests are served concurrently, so appends to the same session file
/// are serialized with one lock per session path. Distinct sessions never
/// contend.
pub struct LogSink {
    log_dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LogSink {
    pub fn new(log_dir: PathBuf) -> Self {
        Self {
            log_dir,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Target file for a session id.
    pub fn log_file(&self, session: &str) -> PathBuf {
        self.log_dir.join(format!("debug-{session}.log"))
    }

    /// Append one stamped entry as a single JSON line. Returns the file the
    /// line was written to.
    pub fn append(&self, session: &str, entry: &Map<String, Value>) -> Result<PathBuf, IngestError> {
        // Serialize fully before opening the file so a failed request never
        // leaves a partial line behind.
        let line = serde_json::to_string(entry)? + "\n";

        let path = self.log_file(session);
        let lock = self.session_lock(session);
        let _guard = lock.lock().unwrap();

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(line.as_bytes())?;

        Ok(path)
    }

    fn session_lock(&self, session: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks.entry(session.to_string()).or_default().clone()
    }
}
