//! Commissioning Checklist - BRL 100/200 Installation Sign-off
//!
//! Eight fixed steps, each with a typed set of required checks. Steps can
//! be visited in any order; the cursor is navigation only. The single gate
//! is `finish`, which needs every step at 100% plus the installation
//! details, and never mutates the checklist.
//!
//! Tooling is the one step without boolean checks: it is complete as soon
//! as any measuring-tool serial number is recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::audit::{AuditError, InstallationRecord};
use crate::refrigerant::RefrigerantSpec;

#[derive(Debug, Error)]
pub enum ChecklistError {
    #[error("Installation cannot be completed: {} requirement(s) unmet", .missing.len())]
    Incomplete { missing: Vec<MissingRequirement> },

    #[error("Audit record error: {0}")]
    Audit(#[from] AuditError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistStep {
    #[default]
    Preparation,
    Tooling,
    Materials,
    OutdoorUnit,
    IndoorUnit,
    Piping,
    EvacuationCharging,
    Handover,
}

impl ChecklistStep {
    pub const ALL: [ChecklistStep; 8] = [
        Self::Preparation,
        Self::Tooling,
        Self::Materials,
        Self::OutdoorUnit,
        Self::IndoorUnit,
        Self::Piping,
        Self::EvacuationCharging,
        Self::Handover,
    ];

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Preparation => "Preparation",
            Self::Tooling => "Tooling",
            Self::Materials => "Materials",
            Self::OutdoorUnit => "Outdoor Unit",
            Self::IndoorUnit => "Indoor Unit",
            Self::Piping => "Piping",
            Self::EvacuationCharging => "Evacuation & Charging",
            Self::Handover => "Handover",
        }
    }

    pub fn next(&self) -> Self {
        Self::ALL.get(self.index() + 1).copied().unwrap_or(*self)
    }

    pub fn previous(&self) -> Self {
        self.index()
            .checked_sub(1)
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or(*self)
    }
}

/// A named required check and whether it is ticked.
pub type Check = (&'static str, bool);

/// Steps whose completion is all-of-N required booleans.
pub trait StepChecks {
    fn checks(&self) -> Vec<Check>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreparationChecks {
    pub customer_informed: bool,
    pub site_inspected: bool,
    pub permits_checked: bool,
    pub safety_plan_reviewed: bool,
}

impl StepChecks for PreparationChecks {
    fn checks(&self) -> Vec<Check> {
        vec![
            ("customer_informed", self.customer_informed),
            ("site_inspected", self.site_inspected),
            ("permits_checked", self.permits_checked),
            ("safety_plan_reviewed", self.safety_plan_reviewed),
        ]
    }
}

/// Serial numbers of the calibrated tools used on site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolingRecord {
    pub manifold_gauge_serial: String,
    pub vacuum_pump_serial: String,
    pub leak_detector_serial: String,
    pub scale_serial: String,
}

impl ToolingRecord {
    pub fn has_any_serial(&self) -> bool {
        [
            &self.manifold_gauge_serial,
            &self.vacuum_pump_serial,
            &self.leak_detector_serial,
            &self.scale_serial,
        ]
        .iter()
        .any(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialsChecks {
    pub pipes_inspected: bool,
    pub insulation_inspected: bool,
    pub brackets_inspected: bool,
    pub cabling_inspected: bool,
}

impl StepChecks for MaterialsChecks {
    fn checks(&self) -> Vec<Check> {
        vec![
            ("pipes_inspected", self.pipes_inspected),
            ("insulation_inspected", self.insulation_inspected),
            ("brackets_inspected", self.brackets_inspected),
            ("cabling_inspected", self.cabling_inspected),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutdoorUnitChecks {
    pub position_approved: bool,
    pub mounted_level: bool,
    pub vibration_dampers_fitted: bool,
    pub service_clearance_ok: bool,
}

impl StepChecks for OutdoorUnitChecks {
    fn checks(&self) -> Vec<Check> {
        vec![
            ("position_approved", self.position_approved),
            ("mounted_level", self.mounted_level),
            ("vibration_dampers_fitted", self.vibration_dampers_fitted),
            ("service_clearance_ok", self.service_clearance_ok),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndoorUnitChecks {
    pub position_approved: bool,
    pub mounted_level: bool,
    pub condensate_drain_tested: bool,
    pub airflow_unobstructed: bool,
}

impl StepChecks for IndoorUnitChecks {
    fn checks(&self) -> Vec<Check> {
        vec![
            ("position_approved", self.position_approved),
            ("mounted_level", self.mounted_level),
            ("condensate_drain_tested", self.condensate_drain_tested),
            ("airflow_unobstructed", self.airflow_unobstructed),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipingChecks {
    pub flares_made: bool,
    pub nitrogen_pressure_tested: bool,
    pub insulation_applied: bool,
    pub supports_fixed: bool,
}

impl StepChecks for PipingChecks {
    fn checks(&self) -> Vec<Check> {
        vec![
            ("flares_made", self.flares_made),
            ("nitrogen_pressure_tested", self.nitrogen_pressure_tested),
            ("insulation_applied", self.insulation_applied),
            ("supports_fixed", self.supports_fixed),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvacuationChargingChecks {
    pub vacuum_reached: bool,
    pub vacuum_hold_passed: bool,
    pub refrigerant_charged: bool,
    pub leak_test_passed: bool,
    /// Measured final vacuum; recorded, not gating.
    pub vacuum_microns: Option<f64>,
    /// Refrigerant added on site on top of the factory charge.
    pub additional_charge_kg: Option<f64>,
}

impl StepChecks for EvacuationChargingChecks {
    fn checks(&self) -> Vec<Check> {
        vec![
            ("vacuum_reached", self.vacuum_reached),
            ("vacuum_hold_passed", self.vacuum_hold_passed),
            ("refrigerant_charged", self.refrigerant_charged),
            ("leak_test_passed", self.leak_test_passed),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandoverChecks {
    pub operation_demonstrated: bool,
    pub documentation_handed_over: bool,
    pub logbook_completed: bool,
    pub customer_signed: bool,
}

impl StepChecks for HandoverChecks {
    fn checks(&self) -> Vec<Check> {
        vec![
            ("operation_demonstrated", self.operation_demonstrated),
            ("documentation_handed_over", self.documentation_handed_over),
            ("logbook_completed", self.logbook_completed),
            ("customer_signed", self.customer_signed),
        ]
    }
}

/// Top-level fields the installation record cannot be issued without.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallationDetails {
    pub customer: String,
    pub installed_by: String,
    pub name: String,
    pub brand: String,
    pub model: String,
    pub refrigerant: RefrigerantSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MissingRequirement {
    Detail { field: &'static str },
    RefrigerantCharge,
    ToolingSerial,
    Check { step: ChecklistStep, field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStatus {
    pub step: ChecklistStep,
    pub title: String,
    pub percent: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommissioningChecklist {
    pub details: InstallationDetails,
    pub preparation: PreparationChecks,
    pub tooling: ToolingRecord,
    pub materials: MaterialsChecks,
    pub outdoor_unit: OutdoorUnitChecks,
    pub indoor_unit: IndoorUnitChecks,
    pub piping: PipingChecks,
    pub evacuation_charging: EvacuationChargingChecks,
    pub handover: HandoverChecks,
    current_step: ChecklistStep,
}

impl CommissioningChecklist {
    pub fn new(details: InstallationDetails) -> Self {
        Self {
            details,
            ..Default::default()
        }
    }

    pub fn current_step(&self) -> ChecklistStep {
        self.current_step
    }

    pub fn go_to(&mut self, step: ChecklistStep) {
        self.current_step = step;
    }

    pub fn next_step(&mut self) -> ChecklistStep {
        self.current_step = self.current_step.next();
        self.current_step
    }

    pub fn previous_step(&mut self) -> ChecklistStep {
        self.current_step = self.current_step.previous();
        self.current_step
    }

    /// Required checks of a step. Empty for Tooling.
    pub fn checks(&self, step: ChecklistStep) -> Vec<Check> {
        match step {
            ChecklistStep::Preparation => self.preparation.checks(),
            ChecklistStep::Tooling => vec![],
            ChecklistStep::Materials => self.materials.checks(),
            ChecklistStep::OutdoorUnit => self.outdoor_unit.checks(),
            ChecklistStep::IndoorUnit => self.indoor_unit.checks(),
            ChecklistStep::Piping => self.piping.checks(),
            ChecklistStep::EvacuationCharging => self.evacuation_charging.checks(),
            ChecklistStep::Handover => self.handover.checks(),
        }
    }

    pub fn step_completion(&self, step: ChecklistStep) -> u8 {
        match step {
            ChecklistStep::Tooling => {
                if self.tooling.has_any_serial() { 100 } else { 0 }
            }
            _ => {
                let checks = self.checks(step);
                let done = checks.iter().filter(|(_, ticked)| *ticked).count();
                completion_percent(done, checks.len())
            }
        }
    }

    pub fn step_statuses(&self) -> Vec<StepStatus> {
        ChecklistStep::ALL
            .iter()
            .map(|&step| StepStatus {
                step,
                title: step.title().to_string(),
                percent: self.step_completion(step),
            })
            .collect()
    }

    /// Mean of the step percentages, for progress bars.
    pub fn overall_completion(&self) -> u8 {
        let sum: u32 = ChecklistStep::ALL
            .iter()
            .map(|&s| u32::from(self.step_completion(s)))
            .sum();
        (f64::from(sum) / ChecklistStep::ALL.len() as f64).round() as u8
    }

    /// Refrigerant as charged: the factory spec plus any top-up recorded
    /// during evacuation and charging.
    pub fn charged_refrigerant(&self) -> RefrigerantSpec {
        let mut spec = self.details.refrigerant.clone();
        if let Some(extra) = self.evacuation_charging.additional_charge_kg {
            if extra.is_finite() && extra > 0.0 {
                spec.top_up_kg = spec.top_up_kg.max(0.0) + extra;
            }
        }
        spec
    }

    pub fn missing_requirements(&self) -> Vec<MissingRequirement> {
        let details = &self.details;
        let mut missing: Vec<MissingRequirement> = [
            ("customer", &details.customer),
            ("installed_by", &details.installed_by),
            ("name", &details.name),
            ("brand", &details.brand),
            ("model", &details.model),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| MissingRequirement::Detail { field })
        .collect();

        if self.charged_refrigerant().total_charge_kg() <= 0.0 {
            missing.push(MissingRequirement::RefrigerantCharge);
        }

        for step in ChecklistStep::ALL {
            if step == ChecklistStep::Tooling {
                if !self.tooling.has_any_serial() {
                    missing.push(MissingRequirement::ToolingSerial);
                }
                continue;
            }
            missing.extend(
                self.checks(step)
                    .into_iter()
                    .filter(|(_, ticked)| !ticked)
                    .map(|(field, _)| MissingRequirement::Check { step, field }),
            );
        }

        missing
    }

    pub fn can_complete(&self) -> bool {
        self.missing_requirements().is_empty()
    }

    /// Issue the audit record. Rejected without side effects while any
    /// requirement is unmet.
    pub fn finish(
        &self,
        installation_id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> Result<InstallationRecord, ChecklistError> {
        let missing = self.missing_requirements();
        if !missing.is_empty() {
            debug!(unmet = missing.len(), "finish rejected");
            return Err(ChecklistError::Incomplete { missing });
        }

        let record = InstallationRecord::seal(
            installation_id,
            completed_at,
            &self.details,
            self.charged_refrigerant(),
            self.evacuation_charging.vacuum_microns,
            self.step_statuses(),
        )?;
        info!(installation_id = %record.installation_id, "installation completed");
        Ok(record)
    }
}

fn completion_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (100.0 * done as f64 / total as f64).round() as u8
}
