use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::intent::{ParsedIntent, QualityTier};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteId(pub String);

impl QuoteId {
    pub fn from_timestamp(generated_at: &DateTime<Utc>) -> Self {
        Self(format!("PROJ-{}", generated_at.format("%Y%m%d-%H%M%S")))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialLine {
    pub name: String,
    pub category: String,
    pub item: String,
    pub quantity: Decimal,
    pub unit: String,
    pub cost_per_unit: Decimal,
    pub total_cost: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaborLine {
    pub task_name: String,
    pub estimated_time_hours: Decimal,
    pub cost: Decimal,
}

impl LaborLine {
    /// Placeholder for a task the labor table does not know about.
    pub fn unpriced(task_name: impl Into<String>) -> Self {
        Self { task_name: task_name.into(), estimated_time_hours: Decimal::ZERO, cost: Decimal::ZERO }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskQuoteLine {
    pub group: String,
    pub task_name: String,
    pub materials: Vec<MaterialLine>,
    pub labor: LaborLine,
    pub task_subtotal: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientRequestSummary {
    pub transcript: String,
    pub parsed_area_sqm: Decimal,
    pub parsed_city: String,
    pub requested_quality: QualityTier,
}

impl ClientRequestSummary {
    pub fn from_intent(transcript: &str, intent: &ParsedIntent) -> Self {
        Self {
            transcript: transcript.to_string(),
            parsed_area_sqm: intent.area,
            parsed_city: intent.city.clone(),
            requested_quality: intent.quality,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_material_cost: Decimal,
    pub total_labor_cost: Decimal,
    pub total_estimated_hours: Decimal,
    pub subtotal: Decimal,
    pub margin_applied: String,
    pub margin_amount: Decimal,
    pub contingency_applied: String,
    pub contingency_amount: Decimal,
    pub permit_fee: Decimal,
    pub total_before_vat: Decimal,
    pub vat_rate_type: String,
    pub vat_rate: Decimal,
    pub vat_amount: Decimal,
    pub final_total_price: Decimal,
}

/// Record of a post-hoc price correction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub notes: String,
    pub original_price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub confidence_score: f64,
    pub error_flags: Vec<String>,
    pub pricing_logic_version: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub feedback_applied: Option<FeedbackRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub project_id: QuoteId,
    pub client_request_summary: ClientRequestSummary,
    pub quote_details: Vec<TaskQuoteLine>,
    pub cost_summary: CostSummary,
    pub metadata: Metadata,
}
