//! `import` command handlers.
//!
//! The record goes to stdout as JSON; logs go to stderr. A fetch failure is
//! the only error that makes the command fail.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use knitlog_core::{AppConfig, ImportKind};
use knitlog_import::{ImportRequest, Importer};

/// Sub-commands available under `import`.
#[derive(Debug, Subcommand)]
pub enum ImportCommands {
    /// Import a knitting pattern page
    Pattern(ImportArgs),
    /// Import a yarn product page
    Yarn(ImportArgs),
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Page to import
    pub url: String,

    /// Also run AI-assisted extraction (needs `OPENAI_API_KEY`)
    #[arg(long)]
    pub ai: bool,

    /// Write the run trace here instead of `KNITLOG_TRACE_DIR`
    #[arg(long, value_name = "DIR")]
    pub trace_dir: Option<PathBuf>,
}

impl ImportCommands {
    fn into_parts(self) -> (ImportKind, ImportArgs) {
        match self {
            ImportCommands::Pattern(args) => (ImportKind::Pattern, args),
            ImportCommands::Yarn(args) => (ImportKind::Yarn, args),
        }
    }
}

/// Applies the command-line overrides to `config` and builds the request.
///
/// AI runs when `--ai` is given or when `KNITLOG_AI_ENABLED` is on and a key
/// is set. `--ai` alone still needs `OPENAI_API_KEY`.
pub(crate) fn prepare_import(
    config: &AppConfig,
    command: ImportCommands,
) -> (AppConfig, ImportRequest) {
    let (kind, args) = command.into_parts();

    let mut config = config.clone();
    if let Some(dir) = args.trace_dir {
        config.trace_dir = dir;
    }
    if args.ai {
        config.ai_enabled = true;
        if config.ai_api_key.is_none() {
            tracing::warn!("--ai given but OPENAI_API_KEY is not set; importing without AI");
        }
    }

    let request = ImportRequest {
        url: args.url,
        kind,
        use_ai: args.ai || config.ai_available(),
    };
    (config, request)
}

/// Runs one import and prints `{record, trace_id, trace_path, ai_used}`.
///
/// # Errors
///
/// Returns an error if the fetcher cannot be built or the page cannot be
/// fetched.
pub(crate) async fn run_import(config: &AppConfig, command: ImportCommands) -> anyhow::Result<()> {
    let (config, request) = prepare_import(config, command);

    let importer = Importer::from_config(&config)
        .map_err(|e| anyhow::anyhow!("failed to build importer: {e}"))?;
    let settings = importer.settings();
    tracing::debug!(
        trace_dir = %settings.trace_dir.display(),
        fetch_timeout_secs = settings.fetch_timeout.as_secs(),
        ai = importer.ai_configured(),
        "importer ready"
    );

    let outcome = importer.run(&request).await.map_err(|e| {
        anyhow::anyhow!("import of {} failed: {e}", request.url)
    })?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
