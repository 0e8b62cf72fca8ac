use serde::{Deserialize, Serialize};

/// A facility record as it appears in the raw feed. Fields this pipeline
/// does not interpret are carried through untouched so the filtered output
/// re-emits each record losslessly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility_id: Option<String>,
    pub facility_name: String,
    #[serde(default)]
    pub accreditations: Vec<Accreditation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<FacilityLocation>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A time-bounded certification attached to a facility. `valid_until` stays
/// a raw string here; validity is judged at predicate time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Accreditation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accreditation_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Facility {
    /// Display name used in log lines.
    pub fn display_name(&self) -> &str {
        &self.facility_name
    }
}
