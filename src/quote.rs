//! Quote Calculator - Priced Breakdown from Rooms, Options and Product
//!
//! Total over its inputs: absent or unusable numbers price as zero and
//! missing settings fall back to their named defaults, so a half-filled
//! calculator form always shows a price.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::product::Product;
use crate::refrigerant::{evaluate_refrigerant_compliance, ComplianceReport};
use crate::rooms::{aggregate_with_config, InsulationClass, Room, RoomAggregate};
use crate::settings::{ConfigurationSnapshot, SettingCategory, SettingKey};
use crate::tiers::{
    resolve_capacity_tier, resolve_pipe_tier, CapacityPricingRow, PipeDiameterPricingRow,
};

/// Floor area above which the large base installation applies.
pub const LARGE_INSTALLATION_AREA_M2: f64 = 40.0;

/// Above this magnitude an f64 no longer resolves cents; values pass through.
const CENT_PRECISION_LIMIT: f64 = 1e15;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemType {
    #[default]
    Single,
    Multisplit,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteExtras {
    #[serde(default)]
    pub condensate_pump: bool,
    #[serde(default)]
    pub wall_bracket: bool,
    #[serde(default)]
    pub mounting_bracket: bool,
    #[serde(default)]
    pub fuse_upgrade: bool,
    #[serde(default)]
    pub cable_duct_m: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteOptions {
    #[serde(default)]
    pub system_type: SystemType,
    #[serde(default)]
    pub insulation: InsulationClass,
    #[serde(default)]
    pub separate_group: bool,
    #[serde(default)]
    pub pipe_length_m: f64,
    #[serde(default)]
    pub extras: QuoteExtras,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    BasePrice,
    BaseInstallation,
    MultisplitSurcharge,
    ExtraUnits,
    PipeOverage,
    ElectricalGroup,
    CapacityTier,
    Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteLine {
    pub kind: LineKind,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub amount: f64,
}

impl QuoteLine {
    fn new(
        kind: LineKind,
        description: impl Into<String>,
        quantity: f64,
        unit_price: f64,
    ) -> Self {
        Self {
            kind,
            description: description.into(),
            quantity,
            unit_price: saturate(unit_price),
            amount: round_cents(quantity * unit_price),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteBreakdown {
    pub aggregate: RoomAggregate,
    pub system_type: SystemType,
    pub capacity_tier: Option<CapacityPricingRow>,
    pub pipe_tier: Option<PipeDiameterPricingRow>,
    pub base_price: f64,
    pub base_installation: f64,
    pub room_surcharge: f64,
    pub extra_unit_cost: f64,
    pub pipe_overage_m: f64,
    pub pipe_overage_cost: f64,
    pub electrical_cost: f64,
    pub capacity_tier_cost: f64,
    pub extras_total: f64,
    pub lines: Vec<QuoteLine>,
    pub total_excl_vat: f64,
    pub vat_rate: f64,
    pub vat: f64,
    pub total_incl_vat: f64,
}

/// A breakdown plus advisory metadata for the quote document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub breakdown: QuoteBreakdown,
    pub compliance: Option<ComplianceReport>,
    /// Required minus rated capacity, when the product is undersized.
    pub capacity_shortfall_kw: Option<f64>,
}

pub fn calculate_quote(
    rooms: &[Room],
    options: &QuoteOptions,
    product: &Product,
    config: &ConfigurationSnapshot,
) -> QuoteBreakdown {
    let category = product.specs.setting_category();
    let setting = |key: SettingKey| clamp_amount(config.value_for(category, key));

    let aggregate = aggregate_with_config(rooms, options.insulation, config);
    let room_count = aggregate.room_count;
    let base_price = round_cents(clamp_amount(product.base_price));
    let mut lines = vec![QuoteLine::new(
        LineKind::BasePrice,
        product.name.as_str(),
        1.0,
        base_price,
    )];

    let base_installation = if aggregate.total_area_m2 > LARGE_INSTALLATION_AREA_M2 {
        setting(SettingKey::BaseInstallationLarge)
    } else {
        setting(SettingKey::BaseInstallationSmall)
    };
    lines.push(QuoteLine::new(
        LineKind::BaseInstallation,
        "Base installation",
        1.0,
        base_installation,
    ));

    let mut room_surcharge = 0.0;
    let mut extra_unit_cost = 0.0;
    if room_count > 1 {
        match options.system_type {
            SystemType::Multisplit => {
                let line = QuoteLine::new(
                    LineKind::MultisplitSurcharge,
                    "Multisplit indoor unit",
                    room_count as f64,
                    setting(SettingKey::MultisplitPerRoom),
                );
                room_surcharge = line.amount;
                lines.push(line);
            }
            SystemType::Single => {
                let factor = extra_unit_factor(config, category);
                let line = QuoteLine::new(
                    LineKind::ExtraUnits,
                    "Additional single-split unit",
                    (room_count - 1) as f64,
                    base_price * factor,
                );
                extra_unit_cost = line.amount;
                lines.push(line);
            }
        }
    }

    let capacity_tier =
        resolve_capacity_tier(aggregate.required_kw, &config.capacity_pricing).cloned();
    let pipe_tier = resolve_pipe_tier(aggregate.required_kw, &config.pipe_pricing).cloned();

    let included_m = setting(SettingKey::PipeIncludedMeters);
    let pipe_overage_m = (clamp_amount(options.pipe_length_m) - included_m).max(0.0);
    let price_per_meter = pipe_tier
        .as_ref()
        .map(|t| clamp_amount(t.price_per_meter))
        .unwrap_or_else(|| setting(SettingKey::PipePricePerMeter));
    let mut pipe_overage_cost = 0.0;
    if pipe_overage_m > 0.0 {
        let line = QuoteLine::new(
            LineKind::PipeOverage,
            "Additional piping",
            pipe_overage_m,
            price_per_meter,
        );
        pipe_overage_cost = line.amount;
        lines.push(line);
    }

    let mut electrical_cost = 0.0;
    if options.separate_group {
        let line = QuoteLine::new(
            LineKind::ElectricalGroup,
            "Separate electrical group",
            1.0,
            setting(SettingKey::ElectricalGroup),
        );
        electrical_cost = line.amount;
        lines.push(line);
    }

    let mut capacity_tier_cost = 0.0;
    if let Some(tier) = &capacity_tier {
        let hours = clamp_amount(tier.extra_hours);
        let materials = clamp_amount(tier.extra_materials);
        if hours > 0.0 || materials > 0.0 {
            let labour = QuoteLine::new(
                LineKind::CapacityTier,
                "Capacity tier labour",
                hours,
                setting(SettingKey::HourlyRate),
            );
            let material = QuoteLine::new(
                LineKind::CapacityTier,
                "Capacity tier materials",
                1.0,
                materials,
            );
            capacity_tier_cost = round_cents(labour.amount + material.amount);
            lines.extend([labour, material].into_iter().filter(|l| l.amount > 0.0));
        }
    }

    let extra_lines = extras_lines(&options.extras, &setting);
    let extras_total = round_cents(extra_lines.iter().map(|l| l.amount).sum());
    lines.extend(extra_lines);

    let total_excl_vat = round_cents(
        base_price
            + base_installation
            + room_surcharge
            + extra_unit_cost
            + pipe_overage_cost
            + electrical_cost
            + capacity_tier_cost
            + extras_total,
    );
    let vat_rate = setting(SettingKey::VatRate);
    let vat = round_cents(total_excl_vat * vat_rate / 100.0);
    let total_incl_vat = round_cents(total_excl_vat + vat);

    debug!(
        required_kw = aggregate.required_kw,
        room_count,
        total_excl_vat,
        total_incl_vat,
        "quote calculated"
    );

    QuoteBreakdown {
        aggregate,
        system_type: options.system_type,
        capacity_tier,
        pipe_tier,
        base_price,
        base_installation,
        room_surcharge,
        extra_unit_cost,
        pipe_overage_m,
        pipe_overage_cost,
        electrical_cost,
        capacity_tier_cost,
        extras_total,
        lines,
        total_excl_vat,
        vat_rate,
        vat,
        total_incl_vat,
    }
}

/// Price a quote and attach refrigerant compliance and sizing advice.
pub fn build_quote(
    rooms: &[Room],
    options: &QuoteOptions,
    product: &Product,
    config: &ConfigurationSnapshot,
) -> Quote {
    let breakdown = calculate_quote(rooms, options, product, config);
    let compliance = product.specs.refrigerant().map(evaluate_refrigerant_compliance);

    let capacity_shortfall_kw = if product.specs.is_room_sized() {
        let rated_kw = clamp_amount(product.specs.nominal_capacity_kw());
        let shortfall = breakdown.aggregate.required_kw - rated_kw;
        (shortfall > 0.0).then_some(shortfall)
    } else {
        None
    };

    Quote {
        breakdown,
        compliance,
        capacity_shortfall_kw,
    }
}

fn extras_lines(extras: &QuoteExtras, setting: &impl Fn(SettingKey) -> f64) -> Vec<QuoteLine> {
    let flags = [
        (extras.condensate_pump, SettingKey::CondensatePump, "Condensate pump"),
        (extras.wall_bracket, SettingKey::WallBracket, "Wall bracket"),
        (extras.mounting_bracket, SettingKey::MountingBracket, "Mounting bracket"),
        (extras.fuse_upgrade, SettingKey::FuseUpgrade, "Fuse upgrade"),
    ];

    let mut lines: Vec<QuoteLine> = flags
        .into_iter()
        .filter(|(selected, _, _)| *selected)
        .map(|(_, key, description)| {
            QuoteLine::new(LineKind::Extra, description, 1.0, setting(key))
        })
        .collect();

    let duct_m = clamp_amount(extras.cable_duct_m);
    if duct_m > 0.0 {
        lines.push(QuoteLine::new(
            LineKind::Extra,
            "Cable duct",
            duct_m,
            setting(SettingKey::CableDuctPerMeter),
        ));
    }

    lines
}

/// Factors above 1 price additional units as a markup; accepted but logged.
fn extra_unit_factor(config: &ConfigurationSnapshot, category: SettingCategory) -> f64 {
    let factor = clamp_amount(config.value_for(category, SettingKey::ExtraUnitDiscount));
    if factor > 1.0 {
        warn!(factor, "extra_unit_discount above 1 marks up additional units");
    }
    factor
}

/// Negative and non-finite amounts price as zero.
pub(crate) fn clamp_amount(value: f64) -> f64 {
    if !value.is_finite() {
        warn!(value = %value, "non-finite amount priced as zero");
        return 0.0;
    }
    value.max(0.0)
}

/// Overflow saturates at the largest finite amount; NaN becomes zero.
fn saturate(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-f64::MAX, f64::MAX)
    }
}

/// Always finite.
pub(crate) fn round_cents(value: f64) -> f64 {
    let value = saturate(value);
    if value.abs() >= CENT_PRECISION_LIMIT {
        return value;
    }
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refrigerant::{RefrigerantSpec, RefrigerantType};
    use crate::rooms::RoomType;

    fn living(size: f64) -> Room {
        Room::new("Woonkamer", size, 2.5, RoomType::LivingRoom)
    }

    fn quote_default(rooms: &[Room], product: &Product) -> QuoteBreakdown {
        calculate_quote(rooms, &QuoteOptions::default(), product, &ConfigurationSnapshot::new())
    }

    fn assert_all_finite(quote: &QuoteBreakdown) {
        for line in &quote.lines {
            assert!(line.amount.is_finite(), "{} not finite", line.description);
            assert!(line.unit_price.is_finite(), "{} not finite", line.description);
        }
        assert!(quote.total_excl_vat.is_finite());
        assert!(quote.vat.is_finite());
        assert!(quote.total_incl_vat.is_finite());
    }

    #[test]
    fn test_large_area_uses_large_installation() {
        let product = Product::airco("Split 5.0", 1899.0, 5.0);
        let quote = quote_default(&[living(45.0)], &product);
        assert_eq!(quote.base_installation, 550.0);
        assert_eq!(quote.total_excl_vat, 2449.0);
    }

    #[test]
    fn test_single_system_discounts_extra_units() {
        let product = Product::airco("Split 2.5", 1000.0, 2.5);
        let rooms = vec![living(15.0), living(12.0), living(10.0)];
        let quote = quote_default(&rooms, &product);
        assert_eq!(quote.extra_unit_cost, 1600.0);
        assert_eq!(quote.room_surcharge, 0.0);
    }

    #[test]
    fn test_unfinished_room_rows_add_no_units() {
        let product = Product::airco("Split 3.5", 1499.0, 3.5);
        let draft = Room::new("typing", 0.0, 0.0, RoomType::Bedroom);

        let filled = quote_default(&[living(35.0)], &product);
        let with_draft = quote_default(&[living(35.0), draft.clone()], &product);
        assert_eq!(with_draft.extra_unit_cost, 0.0);
        assert_eq!(with_draft.total_excl_vat, filled.total_excl_vat);
        assert_eq!(with_draft.total_excl_vat, 1849.0);
        assert_eq!(with_draft.aggregate.room_count, 1);
        assert_eq!(with_draft.aggregate.row_count, 2);

        let options = QuoteOptions {
            system_type: SystemType::Multisplit,
            ..Default::default()
        };
        let config = ConfigurationSnapshot::new();
        let multi = calculate_quote(&[living(35.0), draft], &options, &product, &config);
        assert_eq!(multi.room_surcharge, 0.0);
    }

    #[test]
    fn test_markup_factor_is_accepted() {
        let config = ConfigurationSnapshot::new().with_setting(
            SettingCategory::Airco,
            "extra_unit_discount",
            1.1,
        );
        let product = Product::airco("Split 2.5", 1000.0, 2.5);
        let rooms = [living(10.0), living(10.0)];
        let quote = calculate_quote(&rooms, &QuoteOptions::default(), &product, &config);
        assert_eq!(quote.extra_unit_cost, 1100.0);
    }

    #[test]
    fn test_capacity_tier_extras() {
        let config = ConfigurationSnapshot::new().with_capacity_pricing(vec![CapacityPricingRow {
            min_capacity: 3.0,
            max_capacity: 5.0,
            extra_hours: 2.0,
            extra_materials: 40.0,
            notes: None,
        }]);
        let product = Product::airco("Split 3.5", 1499.0, 3.5);
        let quote = calculate_quote(&[living(35.0)], &QuoteOptions::default(), &product, &config);
        assert_eq!(quote.capacity_tier_cost, 2.0 * 55.0 + 40.0);
        assert_eq!(quote.total_excl_vat, 1849.0 + 150.0);
    }

    #[test]
    fn test_pipe_tier_price_overrides_fallback() {
        let config = ConfigurationSnapshot::new().with_pipe_pricing(vec![PipeDiameterPricingRow {
            min_capacity: 0.0,
            max_capacity: 5.0,
            liquid_line: "1/4\"".into(),
            suction_line: "3/8\"".into(),
            price_per_meter: 28.0,
            notes: None,
        }]);
        let options = QuoteOptions { pipe_length_m: 5.0, ..Default::default() };
        let product = Product::airco("x", 0.0, 3.5);
        let quote = calculate_quote(&[living(35.0)], &options, &product, &config);
        assert_eq!(quote.pipe_overage_cost, 56.0);
    }

    #[test]
    fn test_extras_are_itemised() {
        let options = QuoteOptions {
            separate_group: true,
            extras: QuoteExtras {
                condensate_pump: true,
                fuse_upgrade: true,
                cable_duct_m: 4.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let product = Product::airco("x", 0.0, 2.5);
        let config = ConfigurationSnapshot::new();
        let quote = calculate_quote(&[living(20.0)], &options, &product, &config);
        assert_eq!(quote.electrical_cost, 195.0);
        assert_eq!(quote.extras_total, 125.0 + 85.0 + 50.0);
        assert_eq!(quote.lines.iter().filter(|l| l.kind == LineKind::Extra).count(), 3);
    }

    #[test]
    fn test_garbage_inputs_price_as_zero() {
        let options = QuoteOptions { pipe_length_m: f64::NAN, ..Default::default() };
        let product = Product::airco("x", -50.0, 2.5);
        let quote = calculate_quote(&[], &options, &product, &ConfigurationSnapshot::new());
        assert_eq!(quote.base_price, 0.0);
        assert_eq!(quote.pipe_overage_cost, 0.0);
        assert_eq!(quote.total_excl_vat, 350.0);
        assert!(quote.total_incl_vat.is_finite());
    }

    #[test]
    fn test_non_finite_amounts_clamp_to_zero() {
        assert_eq!(clamp_amount(f64::NAN), 0.0);
        assert_eq!(clamp_amount(f64::INFINITY), 0.0);
        assert_eq!(clamp_amount(f64::NEG_INFINITY), 0.0);
        assert_eq!(clamp_amount(-3.0), 0.0);
        assert_eq!(clamp_amount(12.5), 12.5);
    }

    #[test]
    fn test_rounding_saturates_instead_of_overflowing() {
        assert_eq!(round_cents(f64::MAX), f64::MAX);
        assert_eq!(round_cents(f64::INFINITY), f64::MAX);
        assert_eq!(round_cents(f64::NAN), 0.0);
        assert_eq!(round_cents(12.345_1), 12.35);
    }

    #[test]
    fn test_huge_base_price_with_zero_vat_stays_finite() {
        let config = ConfigurationSnapshot::new()
            .with_setting(SettingCategory::Global, "vat_rate", 0.0)
            .with_setting(SettingCategory::Airco, "extra_unit_discount", 0.0);
        let product = Product::airco("Showroom", 1e307, 3.5);

        let single = calculate_quote(&[living(35.0)], &QuoteOptions::default(), &product, &config);
        assert_all_finite(&single);
        assert_eq!(single.vat, 0.0);
        assert_eq!(single.total_incl_vat, single.total_excl_vat);

        let rooms = [living(35.0), living(12.0)];
        let multi = calculate_quote(&rooms, &QuoteOptions::default(), &product, &config);
        assert_all_finite(&multi);
        assert_eq!(multi.extra_unit_cost, 0.0);
    }

    #[test]
    fn test_build_quote_attaches_advice() {
        let product = Product::airco("Split 2.5", 1299.0, 2.5)
            .with_refrigerant(RefrigerantSpec::new(RefrigerantType::R32, 7.5));
        let config = ConfigurationSnapshot::new();
        let quote = build_quote(&[living(35.0)], &QuoteOptions::default(), &product, &config);
        assert!(quote.compliance.map(|c| c.leak_check_required).unwrap_or(false));
        let shortfall = quote.capacity_shortfall_kw.unwrap();
        assert!((shortfall - 1.0).abs() < 1e-9);
    }
}
