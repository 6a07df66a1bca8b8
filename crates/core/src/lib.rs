pub mod config;
pub mod domain;
pub mod errors;
pub mod feedback;
pub mod parser;
pub mod pricing;
pub mod rates;

pub use config::{AppConfig, ConfigError, LoadOptions, LogFormat, PricingConfig};
pub use domain::{
    CostSummary, FeedbackRecord, ParseWarning, ParsedIntent, QualityTier, Quote, QuoteId, TaskId,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use feedback::{apply_feedback, FeedbackInput};
pub use parser::TranscriptParser;
pub use pricing::{
    aggregate::QuoteAggregator,
    task::{PricedTask, TableTaskPricer, TaskPricer},
    QuoteEngine, QuoteGenerator,
};
pub use rates::{RateTables, ReferenceDataError};
