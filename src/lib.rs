//! Klimaquote Core - Quote Pricing and Compliance Engine
//!
//! # Ground Rules
//! 1. Configuration Is Passed In, Never Fetched
//! 2. Every Calculation Is Total (bad input prices as zero)
//! 3. Same Inputs, Same Breakdown
//! 4. Compliance Flags Advise, They Do Not Block
//! 5. Only A Complete Checklist Yields An Installation Record

pub mod settings;
pub mod tiers;
pub mod rooms;
pub mod product;
pub mod quote;
pub mod labour;
pub mod refrigerant;
pub mod checklist;
pub mod audit;

pub use settings::{ConfigurationSnapshot, ConfigError, Setting, SettingCategory, SettingKey};
pub use tiers::{
    resolve_capacity_tier, resolve_pipe_tier, CapacityPricingRow, PipeDiameterPricingRow,
};
pub use rooms::{aggregate_rooms, InsulationClass, Room, RoomAggregate, RoomType};
pub use product::{Product, ProductSpecs};
pub use quote::{
    build_quote, calculate_quote, Quote, QuoteBreakdown, QuoteExtras, QuoteOptions, SystemType,
};
pub use labour::{estimate_labour, LabourEstimate};
pub use refrigerant::{
    evaluate_refrigerant_compliance, gwp_for_code, ComplianceReport, RefrigerantSpec,
    RefrigerantType,
};
pub use checklist::{
    ChecklistError, ChecklistStep, CommissioningChecklist, InstallationDetails, MissingRequirement,
};
pub use audit::{canonical_json, InstallationRecord};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
