use rust_decimal::Decimal;
use tracing::info;

use crate::domain::{FeedbackRecord, Quote};
use crate::errors::DomainError;
use crate::pricing::round_money;

#[derive(Clone, Debug, PartialEq)]
pub struct FeedbackInput {
    pub notes: String,
    pub corrected_total: Decimal,
}

/// Returns a corrected copy of `quote`. Only the final price and the feedback
/// record change; the breakdown keeps the computed figures.
pub fn apply_feedback(quote: &Quote, input: FeedbackInput) -> Result<Quote, DomainError> {
    let notes = input.notes.trim();
    if notes.is_empty() {
        return Err(DomainError::InvalidFeedback("notes must not be empty".to_string()));
    }
    if input.corrected_total < Decimal::ZERO {
        return Err(DomainError::InvalidFeedback(format!(
            "corrected total must not be negative, got {}",
            input.corrected_total
        )));
    }

    // Re-corrections keep the price the engine produced.
    let original_price = quote
        .metadata
        .feedback_applied
        .as_ref()
        .map(|record| record.original_price)
        .unwrap_or(quote.cost_summary.final_total_price);

    let mut corrected = quote.clone();
    corrected.cost_summary.final_total_price = round_money(input.corrected_total);
    corrected.metadata.feedback_applied =
        Some(FeedbackRecord { notes: notes.to_string(), original_price });

    info!(
        event_name = "quote.feedback.applied",
        quote_id = %corrected.project_id.0,
        original_price = %original_price,
        corrected_total = %corrected.cost_summary.final_total_price,
        "quote feedback applied"
    );

    Ok(corrected)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{apply_feedback, FeedbackInput};
    use crate::config::PricingConfig;
    use crate::domain::Quote;
    use crate::errors::DomainError;
    use crate::pricing::QuoteEngine;
    use crate::rates::RateTables;

    fn quote() -> Quote {
        let engine = QuoteEngine::new(
            Arc::new(RateTables::builtin().expect("builtin reference data is valid")),
            PricingConfig::default(),
        );
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 9, 15, 0).single().expect("valid timestamp");
        engine.generate_at(
            "A 4m² bathroom. Remove the old tiles. Budget-conscious. Located in Marseille.",
            at,
        )
    }

    fn input(notes: &str, corrected_total: Decimal) -> FeedbackInput {
        FeedbackInput { notes: notes.to_string(), corrected_total }
    }

    #[test]
    fn feedback_records_original_price_and_leaves_source_untouched() {
        let original = quote();
        let corrected = apply_feedback(&original, input("site visit: walls uneven", Decimal::new(1150, 0)))
            .expect("feedback applies");

        assert_eq!(corrected.cost_summary.final_total_price, Decimal::new(1150, 0));
        let record = corrected.metadata.feedback_applied.as_ref().expect("record present");
        assert_eq!(record.notes, "site visit: walls uneven");
        assert_eq!(record.original_price, Decimal::new(1034, 0));

        assert_eq!(original.cost_summary.final_total_price, Decimal::new(1034, 0));
        assert!(original.metadata.feedback_applied.is_none());
        assert_eq!(corrected.cost_summary.subtotal, original.cost_summary.subtotal);
    }

    #[test]
    fn second_correction_keeps_first_original_price() {
        let first = apply_feedback(&quote(), input("first pass", Decimal::new(1100, 0)))
            .expect("first feedback applies");
        let second = apply_feedback(&first, input("second pass", Decimal::new(99_9995, 3)))
            .expect("second feedback applies");

        let record = second.metadata.feedback_applied.expect("record present");
        assert_eq!(record.original_price, Decimal::new(1034, 0));
        assert_eq!(record.notes, "second pass");
        assert_eq!(second.cost_summary.final_total_price, Decimal::new(100_000, 2));
    }

    #[test]
    fn blank_notes_are_rejected() {
        let error = apply_feedback(&quote(), input("   ", Decimal::new(900, 0)))
            .expect_err("blank notes must fail");
        assert!(matches!(error, DomainError::InvalidFeedback(ref message) if message.contains("notes")));
    }

    #[test]
    fn negative_total_is_rejected() {
        let error = apply_feedback(&quote(), input("refund", Decimal::new(-1, 0)))
            .expect_err("negative total must fail");
        assert!(matches!(error, DomainError::InvalidFeedback(_)));
    }
}
