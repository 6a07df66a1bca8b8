pub mod intent;
pub mod quote;

pub use intent::{ParseWarning, ParsedIntent, QualityTier, TaskId, DEFAULT_AREA_SQM, DEFAULT_CITY, MAX_AREA_SQM};
pub use quote::{
    ClientRequestSummary, CostSummary, FeedbackRecord, LaborLine, MaterialLine, Metadata, Quote,
    QuoteId, TaskQuoteLine,
};
