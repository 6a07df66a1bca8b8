use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use renoquote_core::config::LoadOptions;
use renoquote_core::domain::Quote;
use renoquote_core::errors::ApplicationError;
use renoquote_core::pricing::{QuoteEngine, QuoteGenerator};
use serde_json::json;
use tracing::info;

use crate::commands::{load_config, load_tables, CommandResult};

const COMMAND: &str = "generate";

#[derive(Clone, Debug, Default)]
pub struct GenerateArgs {
    pub text: Option<String>,
    pub file: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub stdout: bool,
}

pub fn run(options: LoadOptions, args: GenerateArgs) -> CommandResult {
    match execute(options, args) {
        Ok(result) => result,
        Err(error) => CommandResult::from_application_error(COMMAND, error),
    }
}

fn execute(options: LoadOptions, args: GenerateArgs) -> Result<CommandResult, ApplicationError> {
    let config = load_config(options)?;
    let tables = load_tables(&config)?;
    let transcript = read_transcript(&args)
        .map_err(|error| ApplicationError::Input(format!("{error:#}")))?;

    let engine = QuoteEngine::new(Arc::new(tables), config.pricing.clone());
    let quote = engine.generate(&transcript);
    let document = render_quote(&quote)?;

    if args.stdout {
        return Ok(CommandResult::raw(document));
    }

    let path = args
        .output
        .unwrap_or_else(|| config.output.directory.join(format!("{}.json", quote.project_id.0)));
    write_document(&path, &document)?;

    info!(
        event_name = "cli.quote.written",
        quote_id = %quote.project_id.0,
        path = %path.display(),
        "quote written"
    );

    Ok(CommandResult::success_with_details(
        COMMAND,
        format!("quote {} written to {}", quote.project_id.0, path.display()),
        Some(json!({
            "project_id": quote.project_id.0,
            "path": path.display().to_string(),
            "task_count": quote.quote_details.len(),
            "final_total_price": quote.cost_summary.final_total_price,
            "confidence_score": quote.metadata.confidence_score,
            "error_flags": quote.metadata.error_flags,
        })),
    ))
}

/// Argument, then `--file`, then stdin.
fn read_transcript(args: &GenerateArgs) -> anyhow::Result<String> {
    if let Some(text) = &args.text {
        return Ok(text.clone());
    }

    if let Some(path) = &args.file {
        return fs::read_to_string(path)
            .with_context(|| format!("could not read transcript file `{}`", path.display()));
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).context("could not read transcript from stdin")?;
    Ok(buffer)
}

pub(crate) fn render_quote(quote: &Quote) -> Result<String, ApplicationError> {
    serde_json::to_string_pretty(quote)
        .map_err(|error| ApplicationError::Persistence(format!("could not serialize quote: {error}")))
}

pub(crate) fn write_document(path: &Path, document: &str) -> Result<(), ApplicationError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|error| {
            ApplicationError::Persistence(format!(
                "could not create output directory `{}`: {error}",
                parent.display()
            ))
        })?;
    }

    fs::write(path, document).map_err(|error| {
        ApplicationError::Persistence(format!("could not write `{}`: {error}", path.display()))
    })
}
