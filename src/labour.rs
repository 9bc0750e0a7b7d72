//! Labour Estimate - Installation Hours to Price

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::quote::{clamp_amount, round_cents};
use crate::settings::{ConfigurationSnapshot, SettingCategory, SettingKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabourEstimate {
    pub requested_hours: f64,
    /// Requested hours raised to the configured minimum call-out.
    pub billable_hours: f64,
    pub hourly_rate: f64,
    pub labour: f64,
    pub travel: f64,
    pub small_materials: f64,
    pub vacuum_nitrogen: f64,
    pub subtotal: f64,
    pub margin_percent: f64,
    pub margin: f64,
    pub total_excl_vat: f64,
    pub vat: f64,
    pub total_incl_vat: f64,
}

pub fn estimate_labour(
    hours: f64,
    category: SettingCategory,
    config: &ConfigurationSnapshot,
) -> LabourEstimate {
    let setting = |key: SettingKey| clamp_amount(config.value_for(category, key));

    let requested_hours = clamp_amount(hours);
    let billable_hours = requested_hours.max(setting(SettingKey::MinHours));
    let hourly_rate = setting(SettingKey::HourlyRate);
    let labour = round_cents(billable_hours * hourly_rate);
    let travel = setting(SettingKey::TravelCost);
    let small_materials = setting(SettingKey::SmallMaterials);
    let vacuum_nitrogen = setting(SettingKey::VacuumNitrogen);

    let subtotal = round_cents(labour + travel + small_materials + vacuum_nitrogen);
    let margin_percent = setting(SettingKey::MarginPercent);
    let margin = round_cents(subtotal * margin_percent / 100.0);
    let total_excl_vat = round_cents(subtotal + margin);
    let vat = round_cents(total_excl_vat * setting(SettingKey::VatRate) / 100.0);

    debug!(billable_hours, total_excl_vat, "labour estimated");

    LabourEstimate {
        requested_hours,
        billable_hours,
        hourly_rate,
        labour,
        travel,
        small_materials,
        vacuum_nitrogen,
        subtotal,
        margin_percent,
        margin,
        total_excl_vat,
        vat,
        total_incl_vat: round_cents(total_excl_vat + vat),
    }
}
