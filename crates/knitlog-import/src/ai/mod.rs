//! AI-assisted extraction: one completion call per run, parsed into the
//! same candidate shape the heuristics produce.
//!
//! `Ok` with an empty candidate means the model found nothing; `Err` means
//! the call or its answer failed. Neither aborts an import.

mod openai;
mod parse;
mod prompt;

use std::time::Duration;

use async_trait::async_trait;
use knitlog_core::{ExtractionCandidate, ImportKind};

use crate::error::AiError;
use crate::trace::ImportTrace;

pub use openai::OpenAiCompletion;
pub use parse::parse_ai_response;
pub use prompt::{system_prompt, user_prompt};

/// A text-completion backend: system and user prompt in, raw text out.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AiError>;
}

/// Inputs of one AI extraction.
#[derive(Debug, Clone, Copy)]
pub struct AiRequest<'a> {
    pub page_url: &'a str,
    /// Page text with markup already stripped.
    pub page_text: &'a str,
    pub kind: ImportKind,
    pub max_input_chars: usize,
    pub timeout: Duration,
}

/// Builds the prompts, calls `service` once under `request.timeout` and
/// parses the answer. Prompts and the raw response go into `trace`; errors
/// do not, the caller records those.
///
/// # Errors
///
/// - [`AiError::Timeout`] when the call outlives `request.timeout`.
/// - Whatever `service` reports ([`AiError::Unavailable`], [`AiError::Status`]).
/// - [`AiError::Parse`] when the answer is not a JSON object.
pub async fn extract_with_ai(
    service: &dyn CompletionService,
    request: AiRequest<'_>,
    trace: &mut ImportTrace,
) -> Result<ExtractionCandidate, AiError> {
    let system = system_prompt(request.kind);
    let (user, truncated) = user_prompt(request.page_url, request.page_text, request.max_input_chars);
    if truncated {
        tracing::debug!(
            url = request.page_url,
            max_chars = request.max_input_chars,
            "page text truncated for completion prompt"
        );
    }
    trace.record_ai_prompt(&system, &user);

    let raw = tokio::time::timeout(request.timeout, service.complete(&system, &user))
        .await
        .map_err(|_| AiError::Timeout {
            timeout_secs: request.timeout.as_secs(),
        })??;
    trace.record_ai_response(&raw);

    parse_ai_response(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Canned {
        answer: Result<&'static str, u16>,
        delay: Duration,
        seen_user_prompt: Mutex<Option<String>>,
    }

    impl Canned {
        fn ok(answer: &'static str) -> Self {
            Self {
                answer: Ok(answer),
                delay: Duration::ZERO,
                seen_user_prompt: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl CompletionService for Canned {
        async fn complete(&self, _system: &str, user: &str) -> Result<String, AiError> {
            *self.seen_user_prompt.lock().unwrap() = Some(user.to_owned());
            tokio::time::sleep(self.delay).await;
            self.answer
                .map(str::to_owned)
                .map_err(|status| AiError::Status { status })
        }
    }

    fn request(text: &str) -> AiRequest<'_> {
        AiRequest {
            page_url: "https://patterns.test/hat",
            page_text: text,
            kind: ImportKind::Pattern,
            max_input_chars: 12,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn records_prompt_and_response_and_parses() {
        let dir = tempfile::tempdir().unwrap();
        let mut trace = ImportTrace::create(dir.path(), 1_000);
        let service = Canned::ok(r#"{"title":"Hat"}"#);

        let c = extract_with_ai(&service, request("Hat pattern page text"), &mut trace)
            .await
            .unwrap();

        assert_eq!(c.title.as_deref(), Some("Hat"));
        let ai = trace.ai().unwrap();
        assert_eq!(ai.response.as_ref().unwrap().text, r#"{"title":"Hat"}"#);
        let sent = service.seen_user_prompt.lock().unwrap().clone().unwrap();
        assert!(sent.ends_with("Hat pattern "));
    }

    #[tokio::test]
    async fn service_failure_leaves_no_response() {
        let dir = tempfile::tempdir().unwrap();
        let mut trace = ImportTrace::create(dir.path(), 1_000);
        let service = Canned {
            answer: Err(503),
            delay: Duration::ZERO,
            seen_user_prompt: Mutex::new(None),
        };

        let err = extract_with_ai(&service, request("text"), &mut trace)
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Status { status: 503 }));
        assert!(trace.ai().unwrap().response.is_none());
        assert!(trace.errors().is_empty());
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let mut trace = ImportTrace::create(dir.path(), 1_000);
        let service = Canned {
            answer: Ok("{}"),
            delay: Duration::from_secs(30),
            seen_user_prompt: Mutex::new(None),
        };
        let req = AiRequest {
            timeout: Duration::from_millis(50),
            ..request("text")
        };

        let err = extract_with_ai(&service, req, &mut trace).await.unwrap_err();
        assert!(matches!(err, AiError::Timeout { .. }));
        assert!(trace.ai().unwrap().response.is_none());
    }
}
