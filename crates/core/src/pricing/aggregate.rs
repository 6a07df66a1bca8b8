use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::config::PricingConfig;
use crate::domain::{ClientRequestSummary, CostSummary, Metadata, ParsedIntent, Quote, QuoteId};
use crate::pricing::task::PricedTask;
use crate::pricing::{format_percent, round_money};
use crate::rates::VatRates;

pub const CONFIDENCE_PENALTY_PER_WARNING: f64 = 0.25;

/// Linear in the warning count; not clamped at zero.
pub fn confidence_score(warning_count: usize) -> f64 {
    1.0 - CONFIDENCE_PENALTY_PER_WARNING * warning_count as f64
}

/// Unrounded stage amounts; only the summary is rounded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AggregateTotals {
    pub material: Decimal,
    pub labor: Decimal,
    pub hours: Decimal,
    pub subtotal: Decimal,
    pub margin: Decimal,
    pub contingency: Decimal,
    pub permit_fee: Decimal,
    pub before_vat: Decimal,
    pub vat: Decimal,
    pub total: Decimal,
}

pub struct QuoteAggregator<'a> {
    pricing: &'a PricingConfig,
    vat_rates: &'a VatRates,
}

impl<'a> QuoteAggregator<'a> {
    pub fn new(pricing: &'a PricingConfig, vat_rates: &'a VatRates) -> Self {
        Self { pricing, vat_rates }
    }

    pub fn vat_rate(&self) -> Decimal {
        self.vat_rates.rate(&self.pricing.vat_type)
    }

    /// subtotal -> margin -> contingency -> permit -> VAT, at full precision.
    pub fn totals(&self, tasks: &[PricedTask]) -> AggregateTotals {
        let material: Decimal = tasks.iter().map(|task| task.material_total).sum();
        let labor: Decimal = tasks.iter().map(|task| task.labor_cost).sum();
        let hours: Decimal = tasks.iter().map(|task| task.labor_hours).sum();

        let subtotal = material + labor;
        let margin = subtotal * self.pricing.margin_rate;
        let contingency = (subtotal + margin) * self.pricing.contingency_rate;
        let permit_fee = if tasks.is_empty() { Decimal::ZERO } else { self.pricing.permit_fee };
        let before_vat = subtotal + margin + contingency + permit_fee;
        let vat = before_vat * self.vat_rate();

        AggregateTotals {
            material,
            labor,
            hours,
            subtotal,
            margin,
            contingency,
            permit_fee,
            before_vat,
            vat,
            total: before_vat + vat,
        }
    }

    pub fn cost_summary(&self, totals: &AggregateTotals) -> CostSummary {
        CostSummary {
            total_material_cost: round_money(totals.material),
            total_labor_cost: round_money(totals.labor),
            total_estimated_hours: round_money(totals.hours),
            subtotal: round_money(totals.subtotal),
            margin_applied: format_percent(self.pricing.margin_rate),
            margin_amount: round_money(totals.margin),
            contingency_applied: format_percent(self.pricing.contingency_rate),
            contingency_amount: round_money(totals.contingency),
            permit_fee: round_money(totals.permit_fee),
            total_before_vat: round_money(totals.before_vat),
            vat_rate_type: self.pricing.vat_type.clone(),
            vat_rate: self.vat_rate(),
            vat_amount: round_money(totals.vat),
            final_total_price: round_money(totals.total),
        }
    }

    pub fn aggregate(
        &self,
        transcript: &str,
        intent: &ParsedIntent,
        tasks: Vec<PricedTask>,
        generated_at: DateTime<Utc>,
    ) -> Quote {
        let totals = self.totals(&tasks);
        let cost_summary = self.cost_summary(&totals);

        Quote {
            project_id: QuoteId::from_timestamp(&generated_at),
            client_request_summary: ClientRequestSummary::from_intent(transcript, intent),
            quote_details: tasks.into_iter().map(|task| task.line).collect(),
            cost_summary,
            metadata: Metadata {
                confidence_score: confidence_score(intent.warnings.len()),
                error_flags: intent.warning_messages(),
                pricing_logic_version: self.pricing.logic_version.clone(),
                timestamp: generated_at,
                feedback_applied: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{confidence_score, QuoteAggregator};
    use crate::config::PricingConfig;
    use crate::domain::{LaborLine, ParseWarning, ParsedIntent, QualityTier, TaskId, TaskQuoteLine};
    use crate::pricing::task::PricedTask;
    use crate::rates::VatRates;

    fn priced(raw: &str, material: Decimal, labor: Decimal, hours: Decimal) -> PricedTask {
        let task = TaskId::parse(raw).expect("valid task id");
        PricedTask {
            line: TaskQuoteLine {
                group: task.group().to_string(),
                task_name: task.name().to_string(),
                materials: Vec::new(),
                labor: LaborLine::unpriced(task.name()),
                task_subtotal: material + labor,
            },
            task,
            material_total: material,
            labor_cost: labor,
            labor_hours: hours,
        }
    }

    fn bare_pricing() -> PricingConfig {
        PricingConfig {
            contingency_rate: Decimal::ZERO,
            permit_fee: Decimal::ZERO,
            ..PricingConfig::default()
        }
    }

    #[test]
    fn confidence_drops_linearly_without_clamping() {
        assert_eq!(confidence_score(0), 1.0);
        assert_eq!(confidence_score(2), 0.5);
        assert_eq!(confidence_score(5), -0.25);
    }

    #[test]
    fn default_stages_reproduce_reference_total() {
        let pricing = PricingConfig::default();
        let vat = VatRates::default();
        let aggregator = QuoteAggregator::new(&pricing, &vat);

        let tasks = vec![priced(
            "demolition.remove_tiles",
            Decimal::new(50, 0),
            Decimal::new(450, 0),
            Decimal::new(10, 0),
        )];
        let summary = aggregator.cost_summary(&aggregator.totals(&tasks));

        assert_eq!(summary.subtotal, Decimal::new(500, 0));
        assert_eq!(summary.margin_applied, "20%");
        assert_eq!(summary.margin_amount, Decimal::new(100, 0));
        assert_eq!(summary.contingency_applied, "15%");
        assert_eq!(summary.contingency_amount, Decimal::new(90, 0));
        assert_eq!(summary.permit_fee, Decimal::new(250, 0));
        assert_eq!(summary.total_before_vat, Decimal::new(940, 0));
        assert_eq!(summary.vat_rate_type, "reduced");
        assert_eq!(summary.vat_rate, Decimal::new(10, 2));
        assert_eq!(summary.vat_amount, Decimal::new(94, 0));
        assert_eq!(summary.final_total_price, Decimal::new(1034, 0));
    }

    #[test]
    fn bare_margin_and_vat_pipeline() {
        let pricing = bare_pricing();
        let vat = VatRates::default();
        let aggregator = QuoteAggregator::new(&pricing, &vat);

        let tasks = vec![priced(
            "demolition.remove_tiles",
            Decimal::new(50, 0),
            Decimal::new(450, 0),
            Decimal::new(10, 0),
        )];
        let summary = aggregator.cost_summary(&aggregator.totals(&tasks));

        assert_eq!(summary.total_before_vat, Decimal::new(600, 0));
        assert_eq!(summary.vat_amount, Decimal::new(60, 0));
        assert_eq!(summary.final_total_price, Decimal::new(660, 0));
    }

    #[test]
    fn rounding_happens_only_at_reporting() {
        let pricing = bare_pricing();
        let vat = VatRates::default();
        let aggregator = QuoteAggregator::new(&pricing, &vat);

        // Two lines whose rounded costs would each round up by half a cent.
        let tasks = vec![
            priced("finishing.a", Decimal::new(1005, 3), Decimal::ZERO, Decimal::ZERO),
            priced("finishing.b", Decimal::new(1005, 3), Decimal::ZERO, Decimal::ZERO),
        ];
        let totals = aggregator.totals(&tasks);
        let summary = aggregator.cost_summary(&totals);

        assert_eq!(totals.material, Decimal::new(2010, 3));
        assert_eq!(summary.total_material_cost, Decimal::new(201, 2));
        // 2.01 * 1.2 = 2.412 ; * 1.1 = 2.6532
        assert_eq!(summary.final_total_price, Decimal::new(265, 2));
    }

    #[test]
    fn half_cent_rounds_away_from_zero() {
        let pricing = PricingConfig::default();
        let vat = VatRates::default();
        let aggregator = QuoteAggregator::new(&pricing, &vat);

        let tasks = vec![priced(
            "demolition.remove_tiles",
            Decimal::new(50, 0),
            Decimal::new(5625, 1),
            Decimal::new(10, 0),
        )];
        let summary = aggregator.cost_summary(&aggregator.totals(&tasks));

        assert_eq!(summary.subtotal, Decimal::new(6125, 1));
        assert_eq!(summary.contingency_amount, Decimal::new(11025, 2));
        assert_eq!(summary.total_before_vat, Decimal::new(109525, 2));
        // 109.525 -> 109.53 ; 1204.775 -> 1204.78
        assert_eq!(summary.vat_amount, Decimal::new(10953, 2));
        assert_eq!(summary.final_total_price, Decimal::new(120478, 2));
    }

    #[test]
    fn empty_quote_carries_no_permit_fee() {
        let pricing = PricingConfig::default();
        let vat = VatRates::default();
        let aggregator = QuoteAggregator::new(&pricing, &vat);

        let summary = aggregator.cost_summary(&aggregator.totals(&[]));
        assert_eq!(summary.permit_fee, Decimal::ZERO);
        assert_eq!(summary.final_total_price, Decimal::ZERO);
    }

    #[test]
    fn unknown_vat_type_uses_standard_rate() {
        let pricing = PricingConfig { vat_type: "zero_rated_export".to_string(), ..bare_pricing() };
        let vat = VatRates::default();
        let aggregator = QuoteAggregator::new(&pricing, &vat);

        assert_eq!(aggregator.vat_rate(), Decimal::new(20, 2));
    }

    #[test]
    fn aggregate_copies_intent_and_warnings() {
        let pricing = PricingConfig::default();
        let vat = VatRates::default();
        let aggregator = QuoteAggregator::new(&pricing, &vat);
        let generated_at =
            Utc.with_ymd_and_hms(2026, 10, 19, 14, 30, 0).single().expect("valid timestamp");

        let intent = ParsedIntent {
            quality: QualityTier::Premium,
            city: "Lyon".to_string(),
            warnings: vec![ParseWarning::AreaUnresolved, ParseWarning::NoTasksIdentified],
            ..ParsedIntent::default()
        };

        let quote = aggregator.aggregate("Just a renovation.", &intent, Vec::new(), generated_at);

        assert_eq!(quote.project_id.0, "PROJ-20261019-143000");
        assert_eq!(quote.client_request_summary.parsed_area_sqm, Decimal::new(4, 0));
        assert_eq!(quote.client_request_summary.parsed_city, "Lyon");
        assert_eq!(quote.client_request_summary.requested_quality, QualityTier::Premium);
        assert!(quote.quote_details.is_empty());
        assert_eq!(quote.metadata.error_flags.len(), 2);
        assert_eq!(quote.metadata.confidence_score, 0.5);
        assert_eq!(quote.metadata.pricing_logic_version, "2.0");
        assert_eq!(quote.metadata.timestamp, generated_at);
        assert!(quote.metadata.feedback_applied.is_none());
    }
}
