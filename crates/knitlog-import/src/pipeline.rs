//! One import run end to end: fetch, heuristic and optional AI extraction,
//! merge, trace.
//!
//! A run either returns a (possibly sparse) [`ImportRecord`] or a single
//! [`ImportError`] from the fetch stage. AI failures are recovered here and
//! only show up in the trace.

use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use knitlog_core::{AppConfig, ExtractionCandidate, ImportKind, ImportRecord};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::ai::{extract_with_ai, AiRequest, CompletionService, OpenAiCompletion};
use crate::error::ImportError;
use crate::fetch::{FetchedPage, HttpFetcher, PageFetcher};
use crate::heuristic::RuleRegistry;
use crate::html::page_text;
use crate::merge::merge_candidates;
use crate::persist::{ImportSink, OwnerId, PersistError};
use crate::trace::ImportTrace;

/// What to import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub url: String,
    pub kind: ImportKind,
    /// Ask for AI-assisted extraction. Ignored when no completion service
    /// is configured.
    pub use_ai: bool,
}

/// A finished run.
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub record: ImportRecord,
    pub trace_id: Uuid,
    /// `None` when the trace could not be written.
    pub trace_path: Option<PathBuf>,
    /// Whether an AI candidate took part in the merge.
    pub ai_used: bool,
}

/// Per-run limits and trace location.
#[derive(Debug, Clone)]
pub struct ImporterSettings {
    pub trace_dir: PathBuf,
    pub trace_blob_limit: usize,
    /// Upper bound on the whole fetch stage, retries included.
    pub fetch_timeout: Duration,
    pub ai_timeout: Duration,
    pub ai_max_input_chars: usize,
}

impl ImporterSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        // Every attempt (first, retries, 403 fallback) may use the full
        // per-request timeout, plus the backoff sleeps between retries.
        let attempts = u64::from(config.fetch_max_retries) + 2;
        let backoff: u64 = (0..config.fetch_max_retries)
            .map(|n| {
                config
                    .fetch_retry_backoff_base_secs
                    .saturating_mul(2u64.saturating_pow(n))
            })
            .sum();
        let fetch_secs = config
            .fetch_timeout_secs
            .saturating_mul(attempts)
            .saturating_add(backoff);

        Self {
            trace_dir: config.trace_dir.clone(),
            trace_blob_limit: config.trace_blob_limit,
            fetch_timeout: Duration::from_secs(fetch_secs),
            ai_timeout: Duration::from_secs(config.ai_timeout_secs),
            ai_max_input_chars: config.ai_max_input_chars,
        }
    }
}

/// Runs imports. Holds no per-run state, so one instance can serve
/// concurrent runs.
pub struct Importer {
    fetcher: Arc<dyn PageFetcher>,
    completion: Option<Arc<dyn CompletionService>>,
    rules: RuleRegistry,
    settings: ImporterSettings,
}

impl Importer {
    /// An importer without AI support and with the built-in site rules.
    #[must_use]
    pub fn new(fetcher: Arc<dyn PageFetcher>, settings: ImporterSettings) -> Self {
        Self {
            fetcher,
            completion: None,
            rules: RuleRegistry::with_default_rules(),
            settings,
        }
    }

    #[must_use]
    pub fn with_completion(mut self, service: Arc<dyn CompletionService>) -> Self {
        self.completion = Some(service);
        self
    }

    #[must_use]
    pub fn with_rules(mut self, rules: RuleRegistry) -> Self {
        self.rules = rules;
        self
    }

    /// Wires the `reqwest` fetcher and, when configured, the OpenAI adapter.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::ClientBuild`] if the page fetcher's HTTP client
    /// cannot be built. A completion client that fails to build only
    /// disables AI extraction.
    pub fn from_config(config: &AppConfig) -> Result<Self, ImportError> {
        let fetcher = HttpFetcher::new(
            config.fetch_timeout_secs,
            &config.user_agent,
            config.fetch_max_retries,
            config.fetch_retry_backoff_base_secs,
        )?;
        let mut importer = Self::new(Arc::new(fetcher), ImporterSettings::from_config(config));

        if let Some(key) = config
            .ai_api_key
            .as_deref()
            .filter(|_| config.ai_available())
        {
            match OpenAiCompletion::new(
                key,
                &config.ai_model,
                &config.ai_base_url,
                config.ai_timeout_secs,
            ) {
                Ok(service) => importer = importer.with_completion(Arc::new(service)),
                Err(e) => tracing::warn!(error = %e, "AI extraction disabled"),
            }
        }
        Ok(importer)
    }

    #[must_use]
    pub fn settings(&self) -> &ImporterSettings {
        &self.settings
    }

    #[must_use]
    pub fn ai_configured(&self) -> bool {
        self.completion.is_some()
    }

    /// Runs one import.
    ///
    /// The trace is saved before this returns, on success and on failure.
    /// If the returned future is dropped mid-run, the partial trace is
    /// saved on drop.
    ///
    /// # Errors
    ///
    /// Returns the fetch stage's [`ImportError`]. Nothing after the fetch
    /// can fail the run.
    pub async fn run(&self, request: &ImportRequest) -> Result<ImportOutcome, ImportError> {
        let mut trace = TraceGuard(ImportTrace::create(
            &self.settings.trace_dir,
            self.settings.trace_blob_limit,
        ));
        let trace_id = trace.trace_id();
        tracing::info!(%trace_id, url = %request.url, kind = %request.kind, "import started");
        trace.add_event(
            "import_started",
            json!({ "url": request.url, "kind": request.kind, "use_ai": request.use_ai }),
        );

        let page = match self.fetch(&request.url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(%trace_id, url = %request.url, error = %e, "import fetch failed");
                trace.record_error("fetch", &e);
                trace.save();
                return Err(e);
            }
        };
        trace.add_event(
            "page_fetched",
            json!({
                "url": page.url,
                "status": page.status,
                "content_type": page.content_type,
                "bytes": page.html.len(),
            }),
        );

        let text = page_text(&page.html);
        trace.record_text_blob("page_text", &text);

        let heuristic = self.rules.extract(&page.html, &page.url, request.kind);
        trace.add_event(
            "heuristic_extracted",
            json!({
                "matched_rules": heuristic.matched_rules,
                "fields": heuristic.candidate.populated_fields(),
            }),
        );

        let ai = self.run_ai(request, &page, &text, &mut trace).await;

        let merged = merge_candidates(request.kind, &request.url, &heuristic.candidate, ai.as_ref());
        trace.add_event(
            "merged",
            json!({
                "title": merged.record.title,
                "steps": merged.record.steps.len(),
                "images": merged.record.image_urls.len(),
                "dropped_note_chunks": merged.dropped_note_chunks,
            }),
        );

        let trace_path = trace.save();
        tracing::info!(%trace_id, ai_used = ai.is_some(), "import finished");

        Ok(ImportOutcome {
            record: merged.record,
            trace_id,
            trace_path,
            ai_used: ai.is_some(),
        })
    }

    /// [`run`](Self::run), then hands the record to `sink` for `owner`.
    ///
    /// # Errors
    ///
    /// [`PersistError::Import`] for a fetch failure, [`PersistError::Sink`]
    /// with the sink's own error otherwise.
    pub async fn import_into<S: ImportSink>(
        &self,
        sink: &S,
        owner: OwnerId,
        request: &ImportRequest,
    ) -> Result<(ImportOutcome, S::Output), PersistError<S::Error>> {
        let outcome = self.run(request).await?;
        let created = sink
            .create(owner, &outcome.record)
            .await
            .map_err(PersistError::Sink)?;
        Ok((outcome, created))
    }

    async fn fetch(&self, url: &str) -> Result<FetchedPage, ImportError> {
        let limit = self.settings.fetch_timeout;
        tokio::time::timeout(limit, self.fetcher.fetch(url))
            .await
            .unwrap_or_else(|_| {
                Err(ImportError::Timeout {
                    url: url.to_owned(),
                    timeout_secs: limit.as_secs(),
                })
            })
    }

    async fn run_ai(
        &self,
        request: &ImportRequest,
        page: &FetchedPage,
        text: &str,
        trace: &mut ImportTrace,
    ) -> Option<ExtractionCandidate> {
        if !request.use_ai {
            trace.add_event("ai_skipped", json!({ "reason": "not requested" }));
            return None;
        }
        let Some(service) = self.completion.as_deref() else {
            tracing::debug!(url = %request.url, "AI requested but no completion service configured");
            trace.add_event("ai_skipped", json!({ "reason": "not configured" }));
            return None;
        };

        let ai_request = AiRequest {
            page_url: &page.url,
            page_text: text,
            kind: request.kind,
            max_input_chars: self.settings.ai_max_input_chars,
            timeout: self.settings.ai_timeout,
        };
        match extract_with_ai(service, ai_request, trace).await {
            Ok(candidate) => {
                trace.add_event(
                    "ai_extracted",
                    json!({ "fields": candidate.populated_fields() }),
                );
                Some(candidate)
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "AI extraction failed, using heuristic fields");
                trace.record_error("ai_extraction", &e);
                None
            }
        }
    }
}

/// Saves the wrapped trace when dropped unless it was saved already.
struct TraceGuard(ImportTrace);

impl Deref for TraceGuard {
    type Target = ImportTrace;

    fn deref(&self) -> &ImportTrace {
        &self.0
    }
}

impl DerefMut for TraceGuard {
    fn deref_mut(&mut self) -> &mut ImportTrace {
        &mut self.0
    }
}

impl Drop for TraceGuard {
    fn drop(&mut self) {
        if !self.0.is_saved() {
            self.0.add_event("import_abandoned", json!({}));
            self.0.save();
        }
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
