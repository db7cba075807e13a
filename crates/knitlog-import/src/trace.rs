//! Per-run import trace.
//!
//! One [`ImportTrace`] is owned by one import run. It collects timestamped
//! events, size-bounded text blobs (scraped text, AI prompt and response)
//! and error records, then is written once as `<trace_dir>/<trace_id>.json`.
//!
//! Recording never fails the run: every I/O problem is logged at `warn` and
//! swallowed.

use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::text::truncate_chars;

/// One named stage marker.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    pub name: String,
    pub at: DateTime<Utc>,
    pub payload: Value,
}

/// A length-bounded copy of a potentially large text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextBlob {
    /// At most the configured blob limit, in characters.
    pub text: String,
    /// Character count of the original text.
    pub length: usize,
    pub truncated: bool,
}

impl TextBlob {
    #[must_use]
    pub fn bounded(text: &str, limit: usize) -> Self {
        let (kept, truncated) = truncate_chars(text, limit);
        Self {
            text: kept.to_owned(),
            length: text.chars().count(),
            truncated,
        }
    }
}

/// The AI prompt/response pair of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AiExchange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<TextBlob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<TextBlob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<TextBlob>,
}

/// One recorded failure, fatal or recovered.
#[derive(Debug, Clone, Serialize)]
pub struct TraceError {
    pub label: String,
    pub message: String,
    /// Source chain followed by a captured backtrace.
    pub stack: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ImportTrace {
    trace_id: Uuid,
    created_at: DateTime<Utc>,
    events: Vec<TraceEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ai: Option<AiExchange>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    blobs: BTreeMap<String, TextBlob>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<TraceError>,
    #[serde(skip)]
    dir: PathBuf,
    #[serde(skip)]
    blob_limit: usize,
    #[serde(skip)]
    saved: bool,
}

impl ImportTrace {
    /// Starts a trace with a fresh id. The directory is created now so a
    /// misconfigured path shows up in the logs at the start of the run; a
    /// failure here is logged and the run goes on.
    #[must_use]
    pub fn create(dir: impl Into<PathBuf>, blob_limit: usize) -> Self {
        let dir = dir.into();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot create trace directory");
        }
        Self {
            trace_id: Uuid::new_v4(),
            created_at: Utc::now(),
            events: Vec::new(),
            ai: None,
            blobs: BTreeMap::new(),
            errors: Vec::new(),
            dir,
            blob_limit,
            saved: false,
        }
    }

    #[must_use]
    pub fn trace_id(&self) -> Uuid {
        self.trace_id
    }

    /// Where [`save`](Self::save) writes the document.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.trace_id))
    }

    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    #[must_use]
    pub fn errors(&self) -> &[TraceError] {
        &self.errors
    }

    #[must_use]
    pub fn ai(&self) -> Option<&AiExchange> {
        self.ai.as_ref()
    }

    #[must_use]
    pub fn blob(&self, name: &str) -> Option<&TextBlob> {
        self.blobs.get(name)
    }

    #[must_use]
    pub fn is_saved(&self) -> bool {
        self.saved
    }

    pub fn add_event(&mut self, name: &str, payload: Value) {
        if self.saved {
            tracing::debug!(trace_id = %self.trace_id, event = name, "ignoring event after save");
            return;
        }
        self.events.push(TraceEvent {
            name: name.to_owned(),
            at: Utc::now(),
            payload,
        });
    }

    /// Stores a bounded copy of scraped or derived text under `name`.
    pub fn record_text_blob(&mut self, name: &str, text: &str) {
        if self.saved {
            return;
        }
        self.blobs
            .insert(name.to_owned(), TextBlob::bounded(text, self.blob_limit));
    }

    pub fn record_ai_prompt(&mut self, system: &str, user: &str) {
        if self.saved {
            return;
        }
        let limit = self.blob_limit;
        let ai = self.ai.get_or_insert_with(AiExchange::default);
        ai.system = Some(TextBlob::bounded(system, limit));
        ai.prompt = Some(TextBlob::bounded(user, limit));
    }

    pub fn record_ai_response(&mut self, text: &str) {
        if self.saved {
            return;
        }
        let limit = self.blob_limit;
        self.ai.get_or_insert_with(AiExchange::default).response =
            Some(TextBlob::bounded(text, limit));
    }

    /// Appends `error` with its source chain and a backtrace captured here.
    pub fn record_error(&mut self, label: &str, error: &(dyn StdError + 'static)) {
        if self.saved {
            return;
        }
        let mut stack = String::new();
        let mut source = error.source();
        while let Some(cause) = source {
            stack.push_str("caused by: ");
            stack.push_str(&cause.to_string());
            stack.push('\n');
            source = cause.source();
        }
        stack.push_str(&Backtrace::force_capture().to_string());

        self.errors.push(TraceError {
            label: label.to_owned(),
            message: error.to_string(),
            stack,
            at: Utc::now(),
        });
    }

    /// Writes the trace document. Only the first call writes; later calls
    /// return `None`. Returns the written path, or `None` on an I/O or
    /// serialization failure (logged, never raised).
    pub fn save(&mut self) -> Option<PathBuf> {
        if self.saved {
            return None;
        }
        self.saved = true;

        let path = self.path();
        let bytes = match serde_json::to_vec_pretty(&*self) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(trace_id = %self.trace_id, error = %e, "cannot serialize import trace");
                return None;
            }
        };
        match write_file(&path, &bytes) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "import trace saved");
                Some(path)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot write import trace");
                None
            }
        }
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)
}

#[cfg(test)]
#[path = "trace_test.rs"]
mod tests;
