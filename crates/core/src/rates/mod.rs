//! Reference data the pricing pipeline queries: material prices, labor times
//! and rates, city multipliers, VAT rates and the transcript keyword rules.
//!
//! Tables are loaded and validated once at startup. After that every lookup is
//! total: a miss resolves to a documented default instead of an error.

pub mod labor;
pub mod materials;
pub mod vat;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::domain::{QualityTier, TaskId};
use crate::parser::{QualityRule, RuleError, TaskRule, TranscriptParser};

pub use labor::{LaborEntry, LaborEstimate, LaborTable, SkillLevel};
pub use materials::{
    MaterialCatalog, MaterialEntry, MaterialInfo, MaterialRequirement, RequirementQuantity,
};
pub use vat::VatRates;

const BUILTIN_REFERENCE_DATA: &str = include_str!("../../data/reference.toml");
const BUILTIN_ORIGIN: &str = "<builtin>";

/// Ceiling for every price, quantity, time and multiplier in a reference document.
pub const MAX_REFERENCE_VALUE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

#[derive(Debug, Error)]
pub enum ReferenceDataError {
    #[error("could not read reference data `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse reference data `{origin}`: {message}")]
    Parse { origin: String, message: String },
    #[error("reference data `{origin}` is invalid: {message}")]
    Validation { origin: String, message: String },
    #[error("reference data `{origin}` has invalid keyword rules: {source}")]
    Rules { origin: String, source: RuleError },
}

/// Immutable lookup tables shared by every quote request.
#[derive(Clone, Debug)]
pub struct RateTables {
    origin: String,
    materials: MaterialCatalog,
    requirements: BTreeMap<TaskId, Vec<MaterialRequirement>>,
    labor: LaborTable,
    vat: VatRates,
    parser: TranscriptParser,
}

impl RateTables {
    pub fn builtin() -> Result<Self, ReferenceDataError> {
        Self::from_toml_str(BUILTIN_REFERENCE_DATA, BUILTIN_ORIGIN)
    }

    /// Loads a TOML document, or JSON when the file extension is `.json`.
    pub fn load(path: &Path) -> Result<Self, ReferenceDataError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| ReferenceDataError::ReadFile { path: path.to_path_buf(), source })?;
        let origin = path.display().to_string();

        let is_json = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&raw, &origin)
        } else {
            Self::from_toml_str(&raw, &origin)
        }
    }

    /// `None` selects the built-in tables.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, ReferenceDataError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    pub fn from_toml_str(raw: &str, origin: &str) -> Result<Self, ReferenceDataError> {
        let document = toml::from_str::<ReferenceDocument>(raw).map_err(|error| {
            ReferenceDataError::Parse { origin: origin.to_string(), message: error.to_string() }
        })?;
        Self::from_document(document, origin)
    }

    pub fn from_json_str(raw: &str, origin: &str) -> Result<Self, ReferenceDataError> {
        let document = serde_json::from_str::<ReferenceDocument>(raw).map_err(|error| {
            ReferenceDataError::Parse { origin: origin.to_string(), message: error.to_string() }
        })?;
        Self::from_document(document, origin)
    }

    fn from_document(document: ReferenceDocument, origin: &str) -> Result<Self, ReferenceDataError> {
        let invalid = |message: String| ReferenceDataError::Validation {
            origin: origin.to_string(),
            message,
        };

        let vat = VatRates::new(
            document
                .vat_rates
                .into_iter()
                .map(|(vat_type, rate)| {
                    ensure_rate(&format!("vat_rates.{vat_type}"), rate)?;
                    Ok((vat_type, rate))
                })
                .collect::<Result<_, String>>()
                .map_err(invalid)?,
        );

        let hourly_rates = document
            .hourly_rates
            .into_iter()
            .map(|(skill, rate)| {
                let level = SkillLevel::from_str(&skill)
                    .map_err(|error| format!("hourly_rates.{skill}: {error}"))?;
                ensure_amount(&format!("hourly_rates.{skill}"), rate)?;
                Ok((level, rate))
            })
            .collect::<Result<BTreeMap<_, _>, String>>()
            .map_err(invalid)?;

        for (city, multiplier) in &document.city_multipliers {
            if *multiplier <= Decimal::ZERO {
                return Err(invalid(format!("city_multipliers.{city} must be greater than zero")));
            }
            ensure_amount(&format!("city_multipliers.{city}"), *multiplier).map_err(invalid)?;
        }

        for (task, entry) in &document.labor {
            ensure_amount(&format!("labor.{task}.base_time"), entry.base_time)
                .map_err(invalid)?;
            ensure_amount(&format!("labor.{task}.time_per_sqm"), entry.time_per_sqm)
                .map_err(invalid)?;
        }

        let mut materials = BTreeMap::new();
        for (category, items) in document.materials {
            let mut entries = BTreeMap::new();
            for (item, raw) in items {
                let entry = raw.into_entry(&format!("materials.{category}.{item}")).map_err(invalid)?;
                entries.insert(item, entry);
            }
            materials.insert(category, entries);
        }

        let mut requirements = BTreeMap::new();
        for (task, raw_requirements) in document.requirements {
            let resolved = raw_requirements
                .into_iter()
                .enumerate()
                .map(|(index, raw)| raw.into_requirement(&format!("requirements.{task}[{index}]")))
                .collect::<Result<Vec<_>, _>>()
                .map_err(invalid)?;
            requirements.insert(task, resolved);
        }

        let parser = TranscriptParser::from_rules(&document.task_rules, &document.quality_rules)
            .map_err(|source| ReferenceDataError::Rules { origin: origin.to_string(), source })?;

        let tables = Self {
            origin: origin.to_string(),
            materials: MaterialCatalog::new(materials),
            requirements,
            labor: LaborTable::new(document.labor, hourly_rates, document.city_multipliers),
            vat,
            parser,
        };

        info!(
            event_name = "system.reference_data.loaded",
            origin = %tables.origin,
            material_count = tables.materials.len(),
            labor_task_count = tables.labor.len(),
            keyword_task_count = tables.parser.known_tasks().count(),
            "reference data loaded"
        );

        Ok(tables)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn materials(&self) -> &MaterialCatalog {
        &self.materials
    }

    pub fn labor(&self) -> &LaborTable {
        &self.labor
    }

    pub fn vat(&self) -> &VatRates {
        &self.vat
    }

    pub fn parser(&self) -> &TranscriptParser {
        &self.parser
    }

    /// Material requirements of a task; empty for tasks without materials.
    pub fn requirements(&self, task: &TaskId) -> &[MaterialRequirement] {
        self.requirements.get(task).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn ensure_amount(key: &str, value: Decimal) -> Result<(), String> {
    if value < Decimal::ZERO {
        return Err(format!("{key} must not be negative"));
    }
    if value > MAX_REFERENCE_VALUE {
        return Err(format!("{key} must not exceed {MAX_REFERENCE_VALUE}"));
    }
    Ok(())
}

fn ensure_rate(key: &str, value: Decimal) -> Result<(), String> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(format!("{key} must be in range 0..=1"));
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
struct ReferenceDocument {
    #[serde(default)]
    vat_rates: BTreeMap<String, Decimal>,
    #[serde(default)]
    hourly_rates: BTreeMap<String, Decimal>,
    #[serde(default)]
    city_multipliers: BTreeMap<String, Decimal>,
    #[serde(default)]
    materials: BTreeMap<String, BTreeMap<String, MaterialDocument>>,
    #[serde(default)]
    labor: BTreeMap<TaskId, LaborEntry>,
    #[serde(default)]
    requirements: BTreeMap<TaskId, Vec<RequirementDocument>>,
    #[serde(default)]
    task_rules: Vec<TaskRule>,
    #[serde(default)]
    quality_rules: Vec<QualityRule>,
}

#[derive(Debug, Deserialize)]
struct MaterialDocument {
    name: Option<String>,
    unit: Option<String>,
    #[serde(default)]
    price_per_unit: BTreeMap<String, Decimal>,
}

impl MaterialDocument {
    fn into_entry(self, key: &str) -> Result<MaterialEntry, String> {
        let price_per_unit = self
            .price_per_unit
            .into_iter()
            .map(|(tier, price)| {
                let quality = QualityTier::from_str(&tier)
                    .map_err(|error| format!("{key}.price_per_unit: {error}"))?;
                ensure_amount(&format!("{key}.price_per_unit.{tier}"), price)?;
                Ok((quality, price))
            })
            .collect::<Result<BTreeMap<_, _>, String>>()?;

        Ok(MaterialEntry { name: self.name, unit: self.unit, price_per_unit })
    }
}

#[derive(Debug, Deserialize)]
struct RequirementDocument {
    category: String,
    item: String,
    quantity: Option<Decimal>,
    quantity_per_sqm: Option<Decimal>,
}

impl RequirementDocument {
    fn into_requirement(self, key: &str) -> Result<MaterialRequirement, String> {
        let quantity = match (self.quantity, self.quantity_per_sqm) {
            (Some(quantity), None) => {
                ensure_amount(&format!("{key}.quantity"), quantity)?;
                RequirementQuantity::Fixed(quantity)
            }
            (None, Some(rate)) => {
                ensure_amount(&format!("{key}.quantity_per_sqm"), rate)?;
                RequirementQuantity::PerSquareMeter(rate)
            }
            _ => {
                return Err(format!(
                    "{key} must set exactly one of `quantity` or `quantity_per_sqm`"
                ))
            }
        };

        Ok(MaterialRequirement { category: self.category, item: self.item, quantity })
    }
}
