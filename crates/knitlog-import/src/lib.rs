//! Best-effort import of knitting patterns and yarns from external pages.
//!
//! [`Importer::run`] fetches a page, extracts fields with site rules and
//! optionally an AI completion, merges both without repeating facts and
//! writes an [`ImportTrace`] for every run.

pub mod ai;
pub mod error;
pub mod fetch;
pub mod heuristic;
pub mod html;
pub mod merge;
pub mod numeric;
pub mod persist;
pub mod pipeline;
mod retry;
pub mod text;
pub mod tokens;
pub mod trace;

pub use ai::{extract_with_ai, AiRequest, CompletionService, OpenAiCompletion};
pub use error::{AiError, ImportError};
pub use fetch::{FetchedPage, HttpFetcher, PageFetcher};
pub use heuristic::{extract_heuristic, RuleRegistry, SiteRule};
pub use merge::{merge_candidates, Merged};
pub use persist::{ImportSink, OwnerId, PersistError};
pub use pipeline::{ImportOutcome, ImportRequest, Importer, ImporterSettings};
pub use tokens::{extract_search_token, parse_import_image_urls, ImageUrlInput, SearchToken};
pub use trace::ImportTrace;
