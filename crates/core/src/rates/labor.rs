use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::TaskId;
use crate::errors::DomainError;

/// Hourly rate used when the rate table has no entry for a skill level.
pub const DEFAULT_HOURLY_RATE: Decimal = Decimal::from_parts(45, 0, 0, false, 0);
pub const DEFAULT_CITY_MULTIPLIER: Decimal = Decimal::ONE;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Low,
    Medium,
    High,
}

impl SkillLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for SkillLevel {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(DomainError::InvalidSkillLevel(other.to_string())),
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct LaborEntry {
    pub base_time: Decimal,
    #[serde(default)]
    pub time_per_sqm: Decimal,
    #[serde(default)]
    pub skill_level: Option<SkillLevel>,
}

/// Unrounded labor figures for one task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaborEstimate {
    pub task_name: String,
    pub hours: Decimal,
    pub cost: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LaborTable {
    tasks: BTreeMap<TaskId, LaborEntry>,
    hourly_rates: BTreeMap<SkillLevel, Decimal>,
    city_multipliers: BTreeMap<String, Decimal>,
}

impl LaborTable {
    pub fn new(
        tasks: BTreeMap<TaskId, LaborEntry>,
        hourly_rates: BTreeMap<SkillLevel, Decimal>,
        city_multipliers: BTreeMap<String, Decimal>,
    ) -> Self {
        Self { tasks, hourly_rates, city_multipliers }
    }

    pub fn entry(&self, task: &TaskId) -> Option<&LaborEntry> {
        self.tasks.get(task)
    }

    /// An unset skill level bills at the `medium` rate.
    pub fn hourly_rate(&self, skill_level: Option<SkillLevel>) -> Decimal {
        let skill_level = skill_level.unwrap_or(SkillLevel::Medium);
        self.hourly_rates.get(&skill_level).copied().unwrap_or(DEFAULT_HOURLY_RATE)
    }

    pub fn city_multiplier(&self, city: &str) -> Decimal {
        self.city_multipliers.get(city).copied().unwrap_or(DEFAULT_CITY_MULTIPLIER)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// `None` when the task has no labor entry.
    pub fn estimate(&self, task: &TaskId, area: Decimal, city: &str) -> Option<LaborEstimate> {
        let entry = self.entry(task)?;

        let hours = entry.base_time + entry.time_per_sqm * area;
        let cost = hours * self.hourly_rate(entry.skill_level) * self.city_multiplier(city);

        Some(LaborEstimate { task_name: display_task_name(task.name()), hours, cost })
    }
}

/// `install_toilet` -> `Install Toilet`
pub fn display_task_name(name: &str) -> String {
    title_case(&name.replace('_', " "))
}

/// Uppercases the first letter of every alphabetic run and lowercases the rest.
pub fn title_case(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut previous_is_alpha = false;

    for ch in value.chars() {
        if ch.is_alphabetic() {
            if previous_is_alpha {
                output.extend(ch.to_lowercase());
            } else {
                output.extend(ch.to_uppercase());
            }
            previous_is_alpha = true;
        } else {
            output.push(ch);
            previous_is_alpha = false;
        }
    }

    output
}
