mod import;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use import::ImportCommands;

#[derive(Debug, Parser)]
#[command(name = "knitlog-cli")]
#[command(about = "Import knitting patterns and yarns from external pages")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch a page and print the extracted record as JSON
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Pull a `prefix:value` token out of a search string
    Token {
        /// Token prefix, e.g. `yarn:`
        prefix: String,
        /// Free-form search input
        input: String,
    },
    /// Normalize raw image-URL input the way import forms do
    Images {
        /// One raw value (comma-separated or JSON) or several URLs
        #[arg(required = true)]
        raw: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = knitlog_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(env = %config.env, "configuration loaded");

    match cli.command {
        Some(Commands::Import { command }) => import::run_import(&config, command).await?,
        Some(Commands::Token { prefix, input }) => {
            let found = knitlog_import::extract_search_token(&input, &prefix);
            let out = serde_json::json!({
                "token": found.token,
                "remainder": found.remainder,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Some(Commands::Images { raw }) => {
            let urls = knitlog_import::parse_import_image_urls(Some(&image_input(raw)));
            println!("{}", serde_json::to_string_pretty(&urls)?);
        }
        None => println!("knitlog-cli: run with --help to list commands"),
    }

    Ok(())
}

/// A single argument is treated like a form field (may hold a JSON list or
/// commas); several arguments are a list.
fn image_input(mut raw: Vec<String>) -> knitlog_import::ImageUrlInput {
    if raw.len() == 1 {
        knitlog_import::ImageUrlInput::One(raw.remove(0))
    } else {
        knitlog_import::ImageUrlInput::Many(raw)
    }
}

#[cfg(test)]
mod tests;
