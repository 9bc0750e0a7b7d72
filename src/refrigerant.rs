//! Refrigerant Compliance - EU F-gas 517/2014
//!
//! Converts a refrigerant charge into CO2-equivalent tonnage and derives the
//! statutory leak-check obligations. The result is advisory: nothing here
//! blocks a quote or an installation.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Leak checks become mandatory at this many tonnes CO2-equivalent.
pub const LEAK_CHECK_THRESHOLD_TONS: f64 = 5.0;
pub const SEMI_ANNUAL_THRESHOLD_TONS: f64 = 50.0;
pub const QUARTERLY_THRESHOLD_TONS: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefrigerantType {
    R32,
    R410A,
    R407C,
    R134a,
    R404A,
    R454B,
    R452B,
    R513A,
    R1234yf,
    R1234ze,
    R290,
    R600a,
    R744,
}

impl RefrigerantType {
    pub const ALL: [RefrigerantType; 13] = [
        Self::R32,
        Self::R410A,
        Self::R407C,
        Self::R134a,
        Self::R404A,
        Self::R454B,
        Self::R452B,
        Self::R513A,
        Self::R1234yf,
        Self::R1234ze,
        Self::R290,
        Self::R600a,
        Self::R744,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::R32 => "R32",
            Self::R410A => "R410A",
            Self::R407C => "R407C",
            Self::R134a => "R134a",
            Self::R404A => "R404A",
            Self::R454B => "R454B",
            Self::R452B => "R452B",
            Self::R513A => "R513A",
            Self::R1234yf => "R1234yf",
            Self::R1234ze => "R1234ze",
            Self::R290 => "R290",
            Self::R600a => "R600a",
            Self::R744 => "R744",
        }
    }

    /// 100-year GWP as listed in Annex I/IV of the regulation.
    pub fn gwp(&self) -> u32 {
        match self {
            Self::R32 => 675,
            Self::R410A => 2088,
            Self::R407C => 1774,
            Self::R134a => 1430,
            Self::R404A => 3922,
            Self::R454B => 466,
            Self::R452B => 698,
            Self::R513A => 631,
            Self::R1234yf => 4,
            Self::R1234ze => 7,
            Self::R290 => 3,
            Self::R600a => 3,
            Self::R744 => 1,
        }
    }

    /// Accepts `R32`, `r32`, `R-32` and `R 410A`.
    pub fn from_code(code: &str) -> Option<Self> {
        let normalized: String = code
            .chars()
            .filter(|c| !matches!(c, '-' | ' ' | '_'))
            .collect::<String>()
            .to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.code().to_ascii_uppercase() == normalized)
    }
}

/// GWP for a refrigerant code; unknown codes are 0.
pub fn gwp_for_code(code: &str) -> u32 {
    match RefrigerantType::from_code(code) {
        Some(t) => t.gwp(),
        None => {
            warn!(code, "unknown refrigerant code, GWP treated as 0");
            0
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefrigerantSpec {
    #[serde(default, rename = "type")]
    pub refrigerant_type: Option<String>,
    /// Explicit GWP. When absent it is looked up from the type.
    #[serde(default)]
    pub gwp: Option<u32>,
    /// Factory (standard) charge.
    #[serde(default)]
    pub charge_kg: f64,
    /// Field top-up added on site for long pipe runs.
    #[serde(default)]
    pub top_up_kg: f64,
}

impl RefrigerantSpec {
    pub fn new(refrigerant: RefrigerantType, charge_kg: f64) -> Self {
        Self {
            refrigerant_type: Some(refrigerant.code().to_string()),
            gwp: Some(refrigerant.gwp()),
            charge_kg,
            top_up_kg: 0.0,
        }
    }

    pub fn with_top_up(mut self, top_up_kg: f64) -> Self {
        self.top_up_kg = top_up_kg;
        self
    }

    pub fn total_charge_kg(&self) -> f64 {
        clamp_kg(self.charge_kg) + clamp_kg(self.top_up_kg)
    }

    /// Zero when no refrigerant type is recorded.
    pub fn effective_gwp(&self) -> u32 {
        match self.refrigerant_type.as_deref().map(str::trim) {
            None | Some("") => 0,
            Some(code) => self.gwp.unwrap_or_else(|| gwp_for_code(code)),
        }
    }

    pub fn co2_equivalent_tons(&self) -> f64 {
        self.total_charge_kg() * f64::from(self.effective_gwp()) / 1000.0
    }
}

fn clamp_kg(kg: f64) -> f64 {
    if kg.is_finite() && kg > 0.0 { kg } else { 0.0 }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub co2_equivalent_tons: f64,
    pub leak_check_required: bool,
    /// Statutory interval between leak checks, when checks are required.
    pub leak_check_interval_months: Option<u32>,
    pub leak_detection_system_required: bool,
}

pub fn evaluate_refrigerant_compliance(spec: &RefrigerantSpec) -> ComplianceReport {
    let tons = spec.co2_equivalent_tons();

    let leak_check_interval_months = if tons >= QUARTERLY_THRESHOLD_TONS {
        Some(3)
    } else if tons >= SEMI_ANNUAL_THRESHOLD_TONS {
        Some(6)
    } else if tons >= LEAK_CHECK_THRESHOLD_TONS {
        Some(12)
    } else {
        None
    };

    debug!(
        co2_equivalent_tons = tons,
        ?leak_check_interval_months,
        "refrigerant compliance evaluated"
    );

    ComplianceReport {
        co2_equivalent_tons: tons,
        leak_check_required: tons >= LEAK_CHECK_THRESHOLD_TONS,
        leak_check_interval_months,
        leak_detection_system_required: tons >= QUARTERLY_THRESHOLD_TONS,
    }
}
