//! Configuration Snapshot - Pricing Settings and Tables
//!
//! A snapshot is assembled by the host once per calculation and handed in
//! by reference. The engine never reads settings from anywhere else.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

use crate::rooms::{RoomType, RoomTypeFactors};
use crate::tiers::{CapacityPricingRow, PipeDiameterPricingRow};
use crate::ENGINE_VERSION;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid version '{0}' in configuration")]
    InvalidVersion(String),

    #[error("Configuration requires engine >= {required}, current is {current}")]
    EngineVersionMismatch { required: String, current: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingCategory {
    Airco,
    HeatPump,
    Global,
}

impl SettingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Airco => "airco",
            Self::HeatPump => "heat_pump",
            Self::Global => "global",
        }
    }
}

/// A single named numeric setting, as the admin back office stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub category: SettingCategory,
    pub key: String,
    pub value: f64,
}

/// Every setting the engine reads, with its home category and fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    HourlyRate,
    TravelCost,
    MinHours,
    PipeIncludedMeters,
    PipePricePerMeter,
    CableDuctPerMeter,
    MountingBracket,
    WallBracket,
    CondensatePump,
    ElectricalGroup,
    FuseUpgrade,
    SmallMaterials,
    VacuumNitrogen,
    VatRate,
    MarginPercent,
    BaseInstallationSmall,
    BaseInstallationLarge,
    MultisplitPerRoom,
    ExtraUnitDiscount,
}

impl SettingKey {
    pub const ALL: [SettingKey; 19] = [
        Self::HourlyRate,
        Self::TravelCost,
        Self::MinHours,
        Self::PipeIncludedMeters,
        Self::PipePricePerMeter,
        Self::CableDuctPerMeter,
        Self::MountingBracket,
        Self::WallBracket,
        Self::CondensatePump,
        Self::ElectricalGroup,
        Self::FuseUpgrade,
        Self::SmallMaterials,
        Self::VacuumNitrogen,
        Self::VatRate,
        Self::MarginPercent,
        Self::BaseInstallationSmall,
        Self::BaseInstallationLarge,
        Self::MultisplitPerRoom,
        Self::ExtraUnitDiscount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HourlyRate => "hourly_rate",
            Self::TravelCost => "travel_cost",
            Self::MinHours => "min_hours",
            Self::PipeIncludedMeters => "pipe_included_meters",
            Self::PipePricePerMeter => "pipe_price_per_meter",
            Self::CableDuctPerMeter => "cable_duct_per_meter",
            Self::MountingBracket => "mounting_bracket",
            Self::WallBracket => "wall_bracket",
            Self::CondensatePump => "condensate_pump",
            Self::ElectricalGroup => "electrical_group",
            Self::FuseUpgrade => "fuse_upgrade",
            Self::SmallMaterials => "small_materials",
            Self::VacuumNitrogen => "vacuum_nitrogen",
            Self::VatRate => "vat_rate",
            Self::MarginPercent => "margin_percent",
            Self::BaseInstallationSmall => "base_installation_small",
            Self::BaseInstallationLarge => "base_installation_large",
            Self::MultisplitPerRoom => "multisplit_per_room",
            Self::ExtraUnitDiscount => "extra_unit_discount",
        }
    }

    /// VAT and margin are company-wide; everything else is priced per
    /// product line.
    pub fn category(&self) -> SettingCategory {
        match self {
            Self::VatRate | Self::MarginPercent => SettingCategory::Global,
            _ => SettingCategory::Airco,
        }
    }

    pub fn fallback(&self) -> f64 {
        match self {
            Self::HourlyRate => 55.0,
            Self::TravelCost => 35.0,
            Self::MinHours => 4.0,
            Self::PipeIncludedMeters => 3.0,
            Self::PipePricePerMeter => 35.0,
            Self::CableDuctPerMeter => 12.5,
            Self::MountingBracket => 45.0,
            Self::WallBracket => 65.0,
            Self::CondensatePump => 125.0,
            Self::ElectricalGroup => 195.0,
            Self::FuseUpgrade => 85.0,
            Self::SmallMaterials => 45.0,
            Self::VacuumNitrogen => 40.0,
            Self::VatRate => 21.0,
            Self::MarginPercent => 0.0,
            Self::BaseInstallationSmall => 350.0,
            Self::BaseInstallationLarge => 550.0,
            Self::MultisplitPerRoom => 200.0,
            Self::ExtraUnitDiscount => 0.8,
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == key)
    }
}

/// Immutable bundle of pricing settings and tables for one calculation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigurationSnapshot {
    #[serde(default)]
    pub engine_min_version: Option<String>,
    #[serde(default)]
    pub settings: BTreeMap<SettingCategory, BTreeMap<String, f64>>,
    #[serde(default)]
    pub capacity_pricing: Vec<CapacityPricingRow>,
    #[serde(default)]
    pub pipe_pricing: Vec<PipeDiameterPricingRow>,
    #[serde(default)]
    pub room_type_factors: RoomTypeFactors,
}

impl ConfigurationSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.check_engine_version()?;
        Ok(snapshot)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Build a snapshot from the flat setting rows the back office exports.
    pub fn from_settings(settings: impl IntoIterator<Item = Setting>) -> Self {
        settings
            .into_iter()
            .fold(Self::new(), |snapshot, s| snapshot.with_setting(s.category, &s.key, s.value))
    }

    pub fn with_setting(mut self, category: SettingCategory, key: &str, value: f64) -> Self {
        self.settings
            .entry(category)
            .or_default()
            .insert(key.to_string(), value);
        self
    }

    pub fn with_capacity_pricing(mut self, rows: Vec<CapacityPricingRow>) -> Self {
        self.capacity_pricing = rows;
        self
    }

    pub fn with_pipe_pricing(mut self, rows: Vec<PipeDiameterPricingRow>) -> Self {
        self.pipe_pricing = rows;
        self
    }

    pub fn with_room_type_factor(mut self, room_type: RoomType, factor: f64) -> Self {
        self.room_type_factors.set(room_type, factor);
        self
    }

    /// Look up `key` in `category`, then in `global`, then fall back to `default`.
    /// Stored values that are not finite are treated as absent.
    pub fn get(&self, category: SettingCategory, key: &str, default: f64) -> f64 {
        let lookup = |cat: SettingCategory| {
            self.settings
                .get(&cat)
                .and_then(|values| values.get(key))
                .copied()
        };

        let found = lookup(category).or_else(|| lookup(SettingCategory::Global));
        match found {
            Some(v) if v.is_finite() => v,
            Some(v) => {
                warn!(category = category.as_str(), key, value = %v, "non-finite setting ignored");
                default
            }
            None => default,
        }
    }

    /// Read a known setting with its named fallback.
    pub fn value(&self, key: SettingKey) -> f64 {
        self.get(key.category(), key.as_str(), key.fallback())
    }

    /// Read a product-line setting for `category`. Company-wide keys
    /// ignore the category.
    pub fn value_for(&self, category: SettingCategory, key: SettingKey) -> f64 {
        let category = match key.category() {
            SettingCategory::Global => SettingCategory::Global,
            _ => category,
        };
        self.get(category, key.as_str(), key.fallback())
    }

    pub fn room_type_factor(&self, room_type: RoomType) -> f64 {
        self.room_type_factors.factor(room_type)
    }

    fn check_engine_version(&self) -> Result<(), ConfigError> {
        let Some(required) = &self.engine_min_version else {
            return Ok(());
        };

        let engine_ver = semver::Version::parse(ENGINE_VERSION)
            .map_err(|_| ConfigError::InvalidVersion(ENGINE_VERSION.to_string()))?;
        let min_ver = semver::Version::parse(required)
            .map_err(|_| ConfigError::InvalidVersion(required.clone()))?;

        if engine_ver < min_ver {
            return Err(ConfigError::EngineVersionMismatch {
                required: required.clone(),
                current: ENGINE_VERSION.to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_key_uses_fallback() {
        let snapshot = ConfigurationSnapshot::new();
        assert_eq!(snapshot.value(SettingKey::HourlyRate), 55.0);
        assert_eq!(snapshot.get(SettingCategory::Airco, "nope", 7.5), 7.5);
    }

    #[test]
    fn test_category_then_global() {
        let snapshot = ConfigurationSnapshot::new()
            .with_setting(SettingCategory::Global, "hourly_rate", 60.0)
            .with_setting(SettingCategory::HeatPump, "hourly_rate", 70.0);

        assert_eq!(snapshot.get(SettingCategory::Airco, "hourly_rate", 0.0), 60.0);
        assert_eq!(snapshot.get(SettingCategory::HeatPump, "hourly_rate", 0.0), 70.0);
    }

    #[test]
    fn test_non_finite_setting_degrades() {
        let snapshot = ConfigurationSnapshot::new()
            .with_setting(SettingCategory::Global, "vat_rate", f64::NAN);
        assert_eq!(snapshot.value(SettingKey::VatRate), 21.0);
    }

    #[test]
    fn test_from_settings_rows() {
        let snapshot = ConfigurationSnapshot::from_settings(vec![
            Setting {
                category: SettingCategory::Airco,
                key: "multisplit_per_room".into(),
                value: 250.0,
            },
            Setting {
                category: SettingCategory::Global,
                key: "vat_rate".into(),
                value: 9.0,
            },
        ]);
        assert_eq!(snapshot.value(SettingKey::MultisplitPerRoom), 250.0);
        assert_eq!(snapshot.value(SettingKey::VatRate), 9.0);
    }

    #[test]
    fn test_setting_key_roundtrip_names() {
        for key in SettingKey::ALL {
            assert_eq!(SettingKey::from_key(key.as_str()), Some(key));
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "engine_min_version": "1.0.0",
                "settings": {{ "airco": {{ "hourly_rate": 62.5 }} }},
                "capacity_pricing": [
                    {{
                        "min_capacity": 0.0,
                        "max_capacity": 3.5,
                        "extra_hours": 0.0,
                        "extra_materials": 0.0
                    }}
                ],
                "room_type_factors": {{ "attic": 1.4 }}
            }}"#
        )
        .unwrap();

        let snapshot = ConfigurationSnapshot::load_from_file(file.path()).unwrap();
        assert_eq!(snapshot.value(SettingKey::HourlyRate), 62.5);
        assert_eq!(snapshot.capacity_pricing.len(), 1);
        assert_eq!(snapshot.room_type_factor(RoomType::Attic), 1.4);
        assert_eq!(snapshot.room_type_factor(RoomType::LivingRoom), 1.0);
    }

    #[test]
    fn test_engine_version_gate() {
        let err = ConfigurationSnapshot::from_json(r#"{"engine_min_version": "99.0.0"}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::EngineVersionMismatch { .. }));

        let err = ConfigurationSnapshot::from_json(r#"{"engine_min_version": "latest"}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVersion(_)));
    }
}
