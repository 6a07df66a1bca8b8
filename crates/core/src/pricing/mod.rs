pub mod aggregate;
pub mod task;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::info;
use uuid::Uuid;

use crate::config::PricingConfig;
use crate::domain::{ParsedIntent, Quote};
use crate::rates::RateTables;

use self::{
    aggregate::QuoteAggregator,
    task::{PricedTask, TableTaskPricer, TaskPricer},
};

/// Reported monetary figures: 2 decimals, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `0.2` -> `20%`
pub fn format_percent(rate: Decimal) -> String {
    format!("{}%", (rate * Decimal::ONE_HUNDRED).round_dp(0).normalize())
}

pub trait QuoteGenerator: Send + Sync {
    fn generate(&self, transcript: &str) -> Quote;
}

/// Parser, pricer and aggregator wired over one set of shared tables.
pub struct QuoteEngine<P = TableTaskPricer> {
    tables: Arc<RateTables>,
    pricer: P,
    pricing: PricingConfig,
}

impl QuoteEngine<TableTaskPricer> {
    pub fn new(tables: Arc<RateTables>, pricing: PricingConfig) -> Self {
        let pricer = TableTaskPricer::new(Arc::clone(&tables));
        Self { tables, pricer, pricing }
    }
}

impl<P: TaskPricer> QuoteEngine<P> {
    pub fn with_pricer(tables: Arc<RateTables>, pricer: P, pricing: PricingConfig) -> Self {
        Self { tables, pricer, pricing }
    }

    pub fn parse(&self, transcript: &str) -> ParsedIntent {
        self.tables.parser().parse(transcript)
    }

    /// Task lines in task-id order.
    pub fn price_tasks(&self, intent: &ParsedIntent) -> Vec<PricedTask> {
        intent.tasks.iter().map(|task| self.pricer.price_task(task, intent)).collect()
    }

    pub fn generate_at(&self, transcript: &str, generated_at: DateTime<Utc>) -> Quote {
        let correlation_id = Uuid::new_v4().to_string();
        let intent = self.parse(transcript);
        let tasks = self.price_tasks(&intent);

        let quote = QuoteAggregator::new(&self.pricing, self.tables.vat()).aggregate(
            transcript,
            &intent,
            tasks,
            generated_at,
        );

        info!(
            event_name = "quote.generated",
            correlation_id = %correlation_id,
            quote_id = %quote.project_id.0,
            task_count = quote.quote_details.len(),
            warning_count = quote.metadata.error_flags.len(),
            confidence_score = quote.metadata.confidence_score,
            final_total_price = %quote.cost_summary.final_total_price,
            "quote generated"
        );

        quote
    }
}

impl<P: TaskPricer> QuoteGenerator for QuoteEngine<P> {
    fn generate(&self, transcript: &str) -> Quote {
        self.generate_at(transcript, Utc::now())
    }
}
