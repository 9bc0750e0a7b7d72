//! Installation Audit - SHA-256 Sealed Records
//!
//! The record hash is taken over canonical JSON (sorted keys, no
//! whitespace) with the hash field blank, so any host can re-verify it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{to_string, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::checklist::{InstallationDetails, StepStatus};
use crate::refrigerant::{evaluate_refrigerant_compliance, ComplianceReport, RefrigerantSpec};
use crate::ENGINE_VERSION;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    to_string(&sort_value(&v))
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_value(v)))
                    .collect(),
            )
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallationRecord {
    pub installation_id: Uuid,
    pub completed_at: DateTime<Utc>,
    pub engine_version: String,
    pub customer: String,
    pub installed_by: String,
    pub name: String,
    pub brand: String,
    pub model: String,
    pub refrigerant: RefrigerantSpec,
    pub compliance: ComplianceReport,
    pub vacuum_microns: Option<f64>,
    pub steps: Vec<StepStatus>,
    pub record_hash: String,
}

impl InstallationRecord {
    pub fn seal(
        installation_id: Uuid,
        completed_at: DateTime<Utc>,
        details: &InstallationDetails,
        refrigerant: RefrigerantSpec,
        vacuum_microns: Option<f64>,
        steps: Vec<StepStatus>,
    ) -> Result<Self, AuditError> {
        let compliance = evaluate_refrigerant_compliance(&refrigerant);
        let mut record = Self {
            installation_id,
            completed_at,
            engine_version: ENGINE_VERSION.to_string(),
            customer: details.customer.clone(),
            installed_by: details.installed_by.clone(),
            name: details.name.clone(),
            brand: details.brand.clone(),
            model: details.model.clone(),
            refrigerant,
            compliance,
            vacuum_microns,
            steps,
            record_hash: String::new(), // Computed after
        };
        record.record_hash = record.compute_hash()?;
        Ok(record)
    }

    pub fn compute_hash(&self) -> Result<String, AuditError> {
        let unsealed = Self {
            record_hash: String::new(),
            ..self.clone()
        };
        Ok(sha256_hex(canonical_json(&unsealed)?.as_bytes()))
    }

    /// True when the stored hash matches the record contents.
    pub fn verify(&self) -> Result<bool, AuditError> {
        Ok(self.compute_hash()? == self.record_hash)
    }
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::tests::complete_checklist;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorted() {
        let obj = json!({"z": 1, "a": 2, "m": {"y": 1, "b": 2}});
        assert_eq!(canonical_json(&obj).unwrap(), r#"{"a":2,"m":{"b":2,"y":1},"z":1}"#);
    }

    #[test]
    fn test_seal_is_deterministic() {
        let checklist = complete_checklist();
        let id = Uuid::nil();
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 15, 0, 0).unwrap();

        let r1 = checklist.finish(id, at).unwrap();
        let r2 = checklist.finish(id, at).unwrap();
        assert_eq!(r1.record_hash, r2.record_hash);
        assert_eq!(r1.record_hash.len(), 64);
        assert!(r1.verify().unwrap());
    }

    #[test]
    fn test_tampering_detected() {
        let mut record = complete_checklist().finish(Uuid::new_v4(), Utc::now()).unwrap();
        record.refrigerant.charge_kg = 0.1;
        assert!(!record.verify().unwrap());
    }

    #[test]
    fn test_record_carries_refrigerant_figures() {
        let mut checklist = complete_checklist();
        checklist.details.refrigerant.charge_kg = 6.0;
        checklist.evacuation_charging.additional_charge_kg = Some(1.5);

        let record = checklist.finish(Uuid::new_v4(), Utc::now()).unwrap();
        assert_eq!(record.refrigerant.top_up_kg, 1.5);
        assert!(record.compliance.leak_check_required);
        assert_eq!(record.vacuum_microns, Some(350.0));
    }
}
