//! Patient and treatment exposure records supplied by intake
//!
//! Architecture: Value Objects - Patients and exposures are read-only inputs to planning
//! - Records are created by intake layers and never mutated by the engine
//! - Structural validation happens here, before any rule is evaluated
//! - Exposure names stay free text; matching normalizes them on demand

use crate::domain::plan::{CareError, CareResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Biological sex as recorded at intake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of treatment element a survivor received
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExposureType {
    Chemotherapy,
    Radiation,
    Surgery,
    #[serde(rename = "HSCT")]
    Hsct,
}

impl ExposureType {
    /// All exposure types in catalog display order
    pub const ALL: [ExposureType; 4] = [
        ExposureType::Chemotherapy,
        ExposureType::Radiation,
        ExposureType::Surgery,
        ExposureType::Hsct,
    ];

    /// Canonical label, identical to the serialized form
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chemotherapy => "Chemotherapy",
            Self::Radiation => "Radiation",
            Self::Surgery => "Surgery",
            Self::Hsct => "HSCT",
        }
    }

    /// Parse a canonical label (case-insensitive)
    pub fn from_label(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for ExposureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A childhood cancer survivor as captured by intake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Opaque unique identifier
    pub id: String,
    /// Current age in years
    pub age: u32,
    pub birth_year: i32,
    pub diagnosis_year: i32,
    pub sex: Sex,
    /// Free-text tumor type (e.g. "Linfoma de Hodgkin")
    pub tumor_type: String,
    /// Weight in kg
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Height in cm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl Patient {
    /// Create a patient with the required fields
    pub fn new(
        id: impl Into<String>,
        age: u32,
        birth_year: i32,
        diagnosis_year: i32,
        sex: Sex,
        tumor_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            age,
            birth_year,
            diagnosis_year,
            sex,
            tumor_type: tumor_type.into(),
            weight: None,
            height: None,
        }
    }

    /// Set anthropometrics (kg, cm)
    pub fn with_measurements(mut self, weight: f64, height: f64) -> Self {
        self.weight = Some(weight);
        self.height = Some(height);
        self
    }

    /// Reject records missing required content
    pub fn validate(&self) -> CareResult<()> {
        if self.id.trim().is_empty() {
            return Err(CareError::validation("patient id is required"));
        }

        if self.tumor_type.trim().is_empty() {
            return Err(CareError::validation(format!(
                "patient '{}': tumor type is required",
                self.id
            )));
        }

        if self.diagnosis_year < self.birth_year {
            return Err(CareError::validation(format!(
                "patient '{}': diagnosis year {} precedes birth year {}",
                self.id, self.diagnosis_year, self.birth_year
            )));
        }

        for (label, value) in [("weight", self.weight), ("height", self.height)] {
            if let Some(v) = value {
                if !v.is_finite() || v <= 0.0 {
                    return Err(CareError::validation(format!(
                        "patient '{}': {label} must be a positive number, got {v}",
                        self.id
                    )));
                }
            }
        }

        Ok(())
    }
}

/// A single documented treatment element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exposure {
    /// Unique within a plan request
    pub id: String,
    #[serde(rename = "type")]
    pub exposure_type: ExposureType,
    /// Canonical label, e.g. "Doxorrubicina" or "Manto / Mediastino / Tórax"
    pub name: String,
    /// Cumulative dose, when recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dose: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Free-text details, e.g. "Allogeneic"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Exposure {
    pub fn new(id: impl Into<String>, exposure_type: ExposureType, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            exposure_type,
            name: name.into(),
            dose: None,
            unit: None,
            date: None,
            details: None,
        }
    }

    /// Record a cumulative dose and its unit
    pub fn with_dose(mut self, dose: f64, unit: impl Into<String>) -> Self {
        self.dose = Some(dose);
        self.unit = Some(unit.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Name folded for case-insensitive comparison
    pub fn normalized_name(&self) -> String {
        self.name.to_lowercase()
    }

    /// Short label for reports: name plus dose when present
    pub fn format_display(&self) -> String {
        match (self.dose, &self.unit) {
            (Some(dose), Some(unit)) => format!("{} ({dose} {unit})", self.name),
            (Some(dose), None) => format!("{} ({dose})", self.name),
            _ => self.name.clone(),
        }
    }

    /// Reject a single malformed exposure
    pub fn validate(&self) -> CareResult<()> {
        if self.id.trim().is_empty() {
            return Err(CareError::validation(format!(
                "exposure '{}' has no identifier",
                self.name
            )));
        }

        if self.name.trim().is_empty() {
            return Err(CareError::validation(format!("exposure '{}' has no name", self.id)));
        }

        if let Some(dose) = self.dose {
            if !dose.is_finite() || dose <= 0.0 {
                return Err(CareError::validation(format!(
                    "exposure '{}': dose must be a positive number, got {dose}",
                    self.id
                )));
            }
        }

        Ok(())
    }
}

/// Validate a whole exposure list, including identifier uniqueness
pub fn validate_exposures(exposures: &[Exposure]) -> CareResult<()> {
    let mut seen = HashSet::with_capacity(exposures.len());

    for exposure in exposures {
        exposure.validate()?;
        if !seen.insert(exposure.id.as_str()) {
            return Err(CareError::validation(format!(
                "duplicate exposure id '{}'",
                exposure.id
            )));
        }
    }

    Ok(())
}
