use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use renoquote_core::domain::Quote;
use renoquote_core::errors::ApplicationError;
use renoquote_core::feedback::{apply_feedback, FeedbackInput};
use rust_decimal::Decimal;
use serde_json::json;

use crate::commands::generate::{render_quote, write_document};
use crate::commands::CommandResult;

const COMMAND: &str = "feedback";

#[derive(Clone, Debug)]
pub struct FeedbackArgs {
    pub quote: PathBuf,
    pub corrected_total: Decimal,
    pub notes: String,
}

pub fn run(args: FeedbackArgs) -> CommandResult {
    match execute(args) {
        Ok(result) => result,
        Err(error) => CommandResult::from_application_error(COMMAND, error),
    }
}

fn execute(args: FeedbackArgs) -> Result<CommandResult, ApplicationError> {
    let quote =
        read_quote(&args).map_err(|error| ApplicationError::Input(format!("{error:#}")))?;

    let corrected = apply_feedback(
        &quote,
        FeedbackInput { notes: args.notes, corrected_total: args.corrected_total },
    )?;
    write_document(&args.quote, &render_quote(&corrected)?)?;

    let original_price = corrected
        .metadata
        .feedback_applied
        .as_ref()
        .map(|record| record.original_price)
        .unwrap_or(quote.cost_summary.final_total_price);

    Ok(CommandResult::success_with_details(
        COMMAND,
        format!("feedback applied to quote {}", corrected.project_id.0),
        Some(json!({
            "project_id": corrected.project_id.0,
            "original_price": original_price,
            "final_total_price": corrected.cost_summary.final_total_price,
        })),
    ))
}

fn read_quote(args: &FeedbackArgs) -> anyhow::Result<Quote> {
    let raw = fs::read_to_string(&args.quote)
        .with_context(|| format!("could not read quote `{}`", args.quote.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("`{}` is not a quote document", args.quote.display()))
}
