use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Area assumed when the transcript does not state one, in square meters.
pub const DEFAULT_AREA_SQM: Decimal = Decimal::from_parts(4, 0, 0, false, 0);
/// Largest stated area accepted from a transcript, in square meters.
pub const MAX_AREA_SQM: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);
pub const DEFAULT_CITY: &str = "Marseille";

/// Dotted `<group>.<name>` key joining the material, labor and keyword tables.
///
/// Ordering is lexicographic on the full dotted key, which is the order quote
/// lines are reported in.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

impl TaskId {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let Some((group, name)) = raw.split_once('.') else {
            return Err(DomainError::InvalidTaskId(raw.to_string()));
        };

        if !is_identifier(group) || !is_identifier(name) {
            return Err(DomainError::InvalidTaskId(raw.to_string()));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn group(&self) -> &str {
        self.0.split_once('.').map(|(group, _)| group).unwrap_or(&self.0)
    }

    pub fn name(&self) -> &str {
        self.0.split_once('.').map(|(_, name)| name).unwrap_or(&self.0)
    }
}

fn is_identifier(part: &str) -> bool {
    !part.is_empty()
        && part.chars().all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_')
}

impl TryFrom<String> for TaskId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TaskId> for String {
    fn from(value: TaskId) -> Self {
        value.0
    }
}

impl FromStr for TaskId {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Budget,
    #[default]
    Standard,
    Premium,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Budget => "budget",
            Self::Standard => "standard",
            Self::Premium => "premium",
        }
    }

    /// Evaluation rank when several tiers match the same transcript; lower wins.
    pub fn match_priority(&self) -> u8 {
        match self {
            Self::Budget => 0,
            Self::Premium => 1,
            Self::Standard => 2,
        }
    }
}

impl FromStr for QualityTier {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "budget" => Ok(Self::Budget),
            "standard" => Ok(Self::Standard),
            "premium" => Ok(Self::Premium),
            other => Err(DomainError::InvalidQualityTier(other.to_string())),
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-fatal flag raised when a warned field falls back to its default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseWarning {
    AreaUnresolved,
    AreaOutOfRange,
    NoTasksIdentified,
}

impl ParseWarning {
    pub fn message(&self) -> &'static str {
        match self {
            Self::AreaUnresolved => "could not determine area, using default",
            Self::AreaOutOfRange => "stated area is out of range, using default",
            Self::NoTasksIdentified => "no tasks identified",
        }
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedIntent {
    pub area: Decimal,
    pub tasks: BTreeSet<TaskId>,
    pub quality: QualityTier,
    pub city: String,
    pub warnings: Vec<ParseWarning>,
}

impl Default for ParsedIntent {
    fn default() -> Self {
        Self {
            area: DEFAULT_AREA_SQM,
            tasks: BTreeSet::new(),
            quality: QualityTier::default(),
            city: DEFAULT_CITY.to_string(),
            warnings: Vec::new(),
        }
    }
}

impl ParsedIntent {
    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(|warning| warning.message().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::{ParseWarning, ParsedIntent, QualityTier, TaskId, DEFAULT_AREA_SQM};
    use crate::errors::DomainError;

    #[test]
    fn task_id_exposes_group_and_name() {
        let task = TaskId::parse("plumbing.install_toilet").expect("valid task id");
        assert_eq!(task.group(), "plumbing");
        assert_eq!(task.name(), "install_toilet");
        assert_eq!(task.to_string(), "plumbing.install_toilet");
    }

    #[test]
    fn task_id_rejects_free_text() {
        for raw in ["plumbing", "plumbing.", ".toilet", "Plumbing.toilet", "a.b.c", "fix the sink"] {
            assert_eq!(
                TaskId::parse(raw),
                Err(DomainError::InvalidTaskId(raw.to_string())),
                "`{raw}` should not parse"
            );
        }
    }

    #[test]
    fn task_ids_order_by_full_dotted_key() {
        let ordered: Vec<String> = [
            "plumbing.redo_shower_plumbing",
            "demolition.remove_tiles",
            "installation.lay_floor_tiles",
            "finishing.repaint_walls",
            "installation.install_vanity",
        ]
        .into_iter()
        .map(|raw| TaskId::parse(raw).expect("valid task id"))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::from)
        .collect();

        assert_eq!(
            ordered,
            vec![
                "demolition.remove_tiles",
                "finishing.repaint_walls",
                "installation.install_vanity",
                "installation.lay_floor_tiles",
                "plumbing.redo_shower_plumbing",
            ]
        );
    }

    #[test]
    fn task_id_deserializes_through_validation() {
        let parsed: Result<TaskId, _> = serde_json::from_str("\"not-a-task\"");
        assert!(parsed.is_err());

        let parsed: TaskId =
            serde_json::from_str("\"demolition.remove_tiles\"").expect("valid task id json");
        assert_eq!(parsed.name(), "remove_tiles");
    }

    #[test]
    fn quality_tier_parses_case_insensitively() {
        assert_eq!(" Premium ".parse::<QualityTier>(), Ok(QualityTier::Premium));
        assert!("luxury".parse::<QualityTier>().is_err());
        assert!(QualityTier::Budget.match_priority() < QualityTier::Premium.match_priority());
    }

    #[test]
    fn default_intent_matches_documented_defaults() {
        let intent = ParsedIntent::default();
        assert_eq!(intent.area, DEFAULT_AREA_SQM);
        assert!(intent.tasks.is_empty());
        assert_eq!(intent.quality, QualityTier::Standard);
        assert_eq!(intent.city, "Marseille");
        assert!(intent.warnings.is_empty());
    }

    #[test]
    fn warning_messages_keep_order() {
        let intent = ParsedIntent {
            warnings: vec![ParseWarning::AreaUnresolved, ParseWarning::NoTasksIdentified],
            ..ParsedIntent::default()
        };
        assert_eq!(
            intent.warning_messages(),
            vec!["could not determine area, using default", "no tasks identified"]
        );
    }
}
