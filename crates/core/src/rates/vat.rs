use std::collections::BTreeMap;

use rust_decimal::Decimal;

/// Rate applied to any VAT type missing from the table.
pub const DEFAULT_VAT_RATE: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

#[derive(Clone, Debug, PartialEq)]
pub struct VatRates {
    rates: BTreeMap<String, Decimal>,
}

impl VatRates {
    pub fn new(rates: BTreeMap<String, Decimal>) -> Self {
        Self { rates }
    }

    pub fn rate(&self, vat_type: &str) -> Decimal {
        self.rates.get(vat_type).copied().unwrap_or(DEFAULT_VAT_RATE)
    }

    pub fn contains(&self, vat_type: &str) -> bool {
        self.rates.contains_key(vat_type)
    }
}

impl Default for VatRates {
    /// French renovation rates: standard 20%, reduced 10%, super reduced 5.5%.
    fn default() -> Self {
        Self::new(BTreeMap::from([
            ("standard".to_string(), DEFAULT_VAT_RATE),
            ("reduced".to_string(), Decimal::new(10, 2)),
            ("super_reduced".to_string(), Decimal::new(55, 3)),
            ("none".to_string(), Decimal::ZERO),
        ]))
    }
}
