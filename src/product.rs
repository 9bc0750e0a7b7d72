//! Product Catalogue Entries
//!
//! Each product category carries its own typed field set.

use serde::{Deserialize, Serialize};

use crate::refrigerant::RefrigerantSpec;
use crate::settings::SettingCategory;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum ProductSpecs {
    Airco {
        cooling_kw: f64,
        #[serde(default)]
        heating_kw: Option<f64>,
        #[serde(default)]
        seer: Option<f64>,
        #[serde(default)]
        refrigerant: Option<RefrigerantSpec>,
    },
    HeatPump {
        heating_kw: f64,
        #[serde(default)]
        scop: Option<f64>,
        #[serde(default)]
        refrigerant: Option<RefrigerantSpec>,
    },
    Solar {
        panel_count: u32,
        watt_peak: u32,
    },
    ChargingStation {
        power_kw: f64,
        #[serde(default = "default_phases")]
        phases: u8,
    },
}

fn default_phases() -> u8 { 1 }

/// Payloads without specs price as an unrated airco.
impl Default for ProductSpecs {
    fn default() -> Self {
        Self::Airco {
            cooling_kw: 0.0,
            heating_kw: None,
            seer: None,
            refrigerant: None,
        }
    }
}

impl ProductSpecs {
    /// Rated output in kW: cooling for airco, heating for heat pumps,
    /// peak for solar arrays, charge power for charging stations.
    pub fn nominal_capacity_kw(&self) -> f64 {
        match self {
            Self::Airco { cooling_kw, .. } => *cooling_kw,
            Self::HeatPump { heating_kw, .. } => *heating_kw,
            Self::Solar { panel_count, watt_peak } => {
                f64::from(*panel_count) * f64::from(*watt_peak) / 1000.0
            }
            Self::ChargingStation { power_kw, .. } => *power_kw,
        }
    }

    pub fn refrigerant(&self) -> Option<&RefrigerantSpec> {
        match self {
            Self::Airco { refrigerant, .. } | Self::HeatPump { refrigerant, .. } => {
                refrigerant.as_ref()
            }
            Self::Solar { .. } | Self::ChargingStation { .. } => None,
        }
    }

    /// Only climate products are sized against room demand.
    pub fn is_room_sized(&self) -> bool {
        matches!(self, Self::Airco { .. } | Self::HeatPump { .. })
    }

    pub fn setting_category(&self) -> SettingCategory {
        match self {
            Self::HeatPump { .. } => SettingCategory::HeatPump,
            _ => SettingCategory::Airco,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub base_price: f64,
    #[serde(default)]
    pub specs: ProductSpecs,
}

impl Product {
    pub fn airco(name: &str, base_price: f64, cooling_kw: f64) -> Self {
        Self {
            id: String::new(),
            name: name.to_string(),
            brand: String::new(),
            base_price,
            specs: ProductSpecs::Airco {
                cooling_kw,
                heating_kw: None,
                seer: None,
                refrigerant: None,
            },
        }
    }

    pub fn with_refrigerant(mut self, spec: RefrigerantSpec) -> Self {
        match &mut self.specs {
            ProductSpecs::Airco { refrigerant, .. }
            | ProductSpecs::HeatPump { refrigerant, .. } => *refrigerant = Some(spec),
            ProductSpecs::Solar { .. } | ProductSpecs::ChargingStation { .. } => {}
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refrigerant::RefrigerantType;

    #[test]
    fn test_tagged_specs_deserialize() {
        let product: Product = serde_json::from_str(
            r#"{
                "name": "Daikin Perfera 3.5",
                "base_price": 1499.0,
                "specs": {
                    "category": "airco",
                    "cooling_kw": 3.5,
                    "refrigerant": { "type": "R32", "charge_kg": 0.9 }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(product.specs.nominal_capacity_kw(), 3.5);
        assert_eq!(product.specs.refrigerant().map(|r| r.effective_gwp()), Some(675));
    }

    #[test]
    fn test_bare_payload_prices_as_airco() {
        let product: Product = serde_json::from_str(r#"{ "base_price": 1499.0 }"#).unwrap();
        assert_eq!(product.specs, ProductSpecs::default());
        assert_eq!(product.specs.setting_category(), SettingCategory::Airco);
        assert!(product.specs.refrigerant().is_none());

        let quote = crate::calculate_quote(
            &[],
            &crate::QuoteOptions::default(),
            &product,
            &crate::ConfigurationSnapshot::new(),
        );
        assert_eq!(quote.base_price, 1499.0);
        assert_eq!(quote.total_excl_vat, 1499.0 + 350.0);
    }

    #[test]
    fn test_solar_capacity_and_no_refrigerant() {
        let specs = ProductSpecs::Solar { panel_count: 10, watt_peak: 400 };
        assert_eq!(specs.nominal_capacity_kw(), 4.0);
        assert!(specs.refrigerant().is_none());
        assert!(!specs.is_room_sized());
    }

    #[test]
    fn test_with_refrigerant_ignored_for_charging_station() {
        let product = Product {
            id: "lp-1".into(),
            name: "Wallbox".into(),
            brand: String::new(),
            base_price: 899.0,
            specs: ProductSpecs::ChargingStation { power_kw: 11.0, phases: 3 },
        }
        .with_refrigerant(RefrigerantSpec::new(RefrigerantType::R32, 1.0));
        assert!(product.specs.refrigerant().is_none());
    }
}
