//! Keyword extraction from free-text renovation transcripts.
//!
//! Area and task set are *warned* fields: when unresolved they fall back to a
//! default and record a [`ParseWarning`]. Quality and city are *silent*
//! fields: they fall back without a warning. Parsing never fails; only rule
//! compilation at startup can.

use std::collections::BTreeSet;
use std::str::FromStr;

use regex::{Regex, RegexBuilder};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::domain::{ParseWarning, ParsedIntent, QualityTier, TaskId, MAX_AREA_SQM};
use crate::rates::labor::title_case;

const AREA_PATTERN: &str = r"(\d+(?:[.,]\d+)?)\s*(?:m²|m2\b|sqm\b)";
const CITY_PATTERN: &str = r"located in (\w+)";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TaskRule {
    pub task: TaskId,
    pub patterns: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct QualityRule {
    pub quality: QualityTier,
    pub patterns: Vec<String>,
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid pattern `{pattern}` for `{owner}`: {source}")]
    InvalidPattern { owner: String, pattern: String, source: regex::Error },
    #[error("rule for `{0}` has no patterns")]
    EmptyRule(String),
}

#[derive(Clone, Debug)]
struct CompiledRule<K> {
    key: K,
    patterns: Vec<Regex>,
}

impl<K> CompiledRule<K> {
    fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(text))
    }
}

#[derive(Clone, Debug)]
pub struct TranscriptParser {
    area: Regex,
    city: Regex,
    tasks: Vec<CompiledRule<TaskId>>,
    qualities: Vec<CompiledRule<QualityTier>>,
}

impl TranscriptParser {
    /// Quality rules are evaluated by tier priority (budget before premium)
    /// whatever order they are listed in.
    pub fn from_rules(tasks: &[TaskRule], qualities: &[QualityRule]) -> Result<Self, RuleError> {
        let area = compile("area", AREA_PATTERN)?;
        let city = compile("city", CITY_PATTERN)?;

        let tasks = tasks
            .iter()
            .map(|rule| compile_rule(rule.task.clone(), rule.task.as_str(), &rule.patterns))
            .collect::<Result<Vec<_>, _>>()?;

        let mut qualities = qualities
            .iter()
            .map(|rule| compile_rule(rule.quality, rule.quality.as_str(), &rule.patterns))
            .collect::<Result<Vec<_>, _>>()?;
        qualities.sort_by_key(|rule| rule.key.match_priority());

        Ok(Self { area, city, tasks, qualities })
    }

    pub fn known_tasks(&self) -> impl Iterator<Item = &TaskId> {
        self.tasks.iter().map(|rule| &rule.key)
    }

    pub fn parse(&self, transcript: &str) -> ParsedIntent {
        let mut intent = ParsedIntent::default();

        match self.extract_area(transcript) {
            Ok(area) => intent.area = area,
            Err(warning) => intent.warnings.push(warning),
        }

        intent.tasks = self.extract_tasks(transcript);
        if intent.tasks.is_empty() {
            intent.warnings.push(ParseWarning::NoTasksIdentified);
        }

        if let Some(quality) = self.extract_quality(transcript) {
            intent.quality = quality;
        }

        if let Some(city) = self.extract_city(transcript) {
            intent.city = city;
        }

        debug!(
            event_name = "quote.parse.completed",
            area = %intent.area,
            task_count = intent.tasks.len(),
            quality = intent.quality.as_str(),
            city = %intent.city,
            warning_count = intent.warnings.len(),
            "transcript parsed"
        );

        intent
    }

    /// First `<number> m²` mention.
    ///
    /// A stated `0m²` is not taken as an area of zero: it is unresolved and
    /// falls back to the default area with a warning.
    /// Values above [`MAX_AREA_SQM`], or too large to represent, are rejected
    /// as out of range so per-m² pricing stays within decimal bounds.
    pub fn extract_area(&self, transcript: &str) -> Result<Decimal, ParseWarning> {
        let raw = self
            .area
            .captures(transcript)
            .and_then(|captures| captures.get(1))
            .map(|matched| matched.as_str().replace(',', "."))
            .ok_or(ParseWarning::AreaUnresolved)?;

        let area = Decimal::from_str(&raw).map_err(|_| ParseWarning::AreaOutOfRange)?;
        if area <= Decimal::ZERO {
            return Err(ParseWarning::AreaUnresolved);
        }
        if area > MAX_AREA_SQM {
            return Err(ParseWarning::AreaOutOfRange);
        }
        Ok(area)
    }

    pub fn extract_tasks(&self, transcript: &str) -> BTreeSet<TaskId> {
        self.tasks.iter().filter(|rule| rule.matches(transcript)).map(|rule| rule.key.clone()).collect()
    }

    pub fn extract_quality(&self, transcript: &str) -> Option<QualityTier> {
        self.qualities.iter().find(|rule| rule.matches(transcript)).map(|rule| rule.key)
    }

    pub fn extract_city(&self, transcript: &str) -> Option<String> {
        let captures = self.city.captures(transcript)?;
        Some(title_case(captures.get(1)?.as_str()))
    }
}

fn compile(owner: &str, pattern: &str) -> Result<Regex, RuleError> {
    RegexBuilder::new(pattern).case_insensitive(true).build().map_err(|source| {
        RuleError::InvalidPattern { owner: owner.to_string(), pattern: pattern.to_string(), source }
    })
}

fn compile_rule<K>(key: K, owner: &str, patterns: &[String]) -> Result<CompiledRule<K>, RuleError> {
    if patterns.is_empty() {
        return Err(RuleError::EmptyRule(owner.to_string()));
    }

    let patterns =
        patterns.iter().map(|pattern| compile(owner, pattern)).collect::<Result<Vec<_>, _>>()?;
    Ok(CompiledRule { key, patterns })
}
