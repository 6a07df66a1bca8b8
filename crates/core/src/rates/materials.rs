use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::domain::QualityTier;

pub const UNKNOWN_MATERIAL_NAME: &str = "Unknown";

#[derive(Clone, Debug, PartialEq)]
pub struct MaterialEntry {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub price_per_unit: BTreeMap<QualityTier, Decimal>,
}

/// Display attributes of a material; falls back to `Unknown` / empty unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaterialInfo<'a> {
    pub name: &'a str,
    pub unit: &'a str,
}

/// Material prices keyed by category, then item.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialCatalog {
    entries: BTreeMap<String, BTreeMap<String, MaterialEntry>>,
}

impl MaterialCatalog {
    pub fn new(entries: BTreeMap<String, BTreeMap<String, MaterialEntry>>) -> Self {
        Self { entries }
    }

    pub fn entry(&self, category: &str, item: &str) -> Option<&MaterialEntry> {
        self.entries.get(category)?.get(item)
    }

    /// Price for the requested tier, else the `standard` price, else zero.
    pub fn unit_price(&self, category: &str, item: &str, quality: QualityTier) -> Decimal {
        let Some(entry) = self.entry(category, item) else {
            return Decimal::ZERO;
        };

        entry
            .price_per_unit
            .get(&quality)
            .or_else(|| entry.price_per_unit.get(&QualityTier::Standard))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn info(&self, category: &str, item: &str) -> MaterialInfo<'_> {
        let entry = self.entry(category, item);
        MaterialInfo {
            name: entry.and_then(|entry| entry.name.as_deref()).unwrap_or(UNKNOWN_MATERIAL_NAME),
            unit: entry.and_then(|entry| entry.unit.as_deref()).unwrap_or(""),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequirementQuantity {
    Fixed(Decimal),
    PerSquareMeter(Decimal),
}

impl RequirementQuantity {
    pub fn resolve(&self, area: Decimal) -> Decimal {
        match self {
            Self::Fixed(quantity) => *quantity,
            Self::PerSquareMeter(rate) => *rate * area,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaterialRequirement {
    pub category: String,
    pub item: String,
    pub quantity: RequirementQuantity,
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;

    use super::{MaterialCatalog, MaterialEntry, RequirementQuantity};
    use crate::domain::QualityTier;

    fn catalog() -> MaterialCatalog {
        let mut tiles = BTreeMap::new();
        tiles.insert(
            "ceramic".to_string(),
            MaterialEntry {
                name: Some("Ceramic floor tiles".to_string()),
                unit: Some("m²".to_string()),
                price_per_unit: BTreeMap::from([
                    (QualityTier::Budget, Decimal::new(20, 0)),
                    (QualityTier::Standard, Decimal::new(40, 0)),
                ]),
            },
        );
        let mut finishes = BTreeMap::new();
        finishes.insert(
            "paint".to_string(),
            MaterialEntry {
                name: None,
                unit: None,
                price_per_unit: BTreeMap::from([(QualityTier::Standard, Decimal::new(15, 0))]),
            },
        );
        finishes.insert(
            "primer".to_string(),
            MaterialEntry { name: None, unit: None, price_per_unit: BTreeMap::new() },
        );

        MaterialCatalog::new(BTreeMap::from([
            ("tiles".to_string(), tiles),
            ("finishes".to_string(), finishes),
        ]))
    }

    #[test]
    fn explicit_tier_price_wins() {
        assert_eq!(
            catalog().unit_price("tiles", "ceramic", QualityTier::Budget),
            Decimal::new(20, 0)
        );
    }

    #[test]
    fn missing_tier_falls_back_to_standard() {
        assert_eq!(
            catalog().unit_price("tiles", "ceramic", QualityTier::Premium),
            Decimal::new(40, 0)
        );
        assert_eq!(
            catalog().unit_price("finishes", "paint", QualityTier::Premium),
            Decimal::new(15, 0)
        );
    }

    #[test]
    fn pricing_gaps_resolve_to_zero() {
        let catalog = catalog();
        assert_eq!(catalog.unit_price("non_existent", "item", QualityTier::Standard), Decimal::ZERO);
        assert_eq!(catalog.unit_price("tiles", "marble", QualityTier::Standard), Decimal::ZERO);
        assert_eq!(catalog.unit_price("finishes", "primer", QualityTier::Budget), Decimal::ZERO);
    }

    #[test]
    fn info_defaults_when_attributes_are_missing() {
        let catalog = catalog();
        let tiles = catalog.info("tiles", "ceramic");
        assert_eq!(tiles.name, "Ceramic floor tiles");
        assert_eq!(tiles.unit, "m²");

        let paint = catalog.info("finishes", "paint");
        assert_eq!(paint.name, "Unknown");
        assert_eq!(paint.unit, "");

        let missing = catalog.info("nothing", "here");
        assert_eq!(missing.name, "Unknown");
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn per_area_quantities_scale_with_area() {
        let area = Decimal::new(4, 0);
        assert_eq!(RequirementQuantity::Fixed(Decimal::new(5, 0)).resolve(area), Decimal::new(5, 0));
        assert_eq!(
            RequirementQuantity::PerSquareMeter(Decimal::new(105, 2)).resolve(area),
            Decimal::new(420, 2)
        );
    }
}
