//! Core domain models for follow-up recommendations and plans
//!
//! Architecture: Rich Domain Models - Plans are terminal artifacts with behavior, not just data
//! - A recommendation records that one guideline rule fired for one patient
//! - FollowUpPlan is the aggregate root and cannot be mutated once assembled
//! - Both narrative registers travel with every recommendation so rendering stays logic-free

use crate::domain::patient::{validate_exposures, Exposure, Patient};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Clinical risk attached to a late effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// Numeric weight used for ranking (High=3, Moderate=2, Low=1)
    pub fn score(self) -> u8 {
        match self {
            Self::High => 3,
            Self::Moderate => 2,
            Self::Low => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strength of the evidence behind a guideline rule.
///
/// Ordered so that the strongest grade compares greatest: `1 > 2A > 2B`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EvidenceLevel {
    /// Grade 2B, expert consensus
    #[serde(rename = "2B")]
    Consensus,
    /// Grade 2A
    #[serde(rename = "2A")]
    Moderate,
    /// Grade 1
    #[serde(rename = "1")]
    High,
}

impl EvidenceLevel {
    /// Grade label as printed in the guidelines
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "1",
            Self::Moderate => "2A",
            Self::Consensus => "2B",
        }
    }
}

impl fmt::Display for EvidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One guideline rule that fired for this patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpRecommendation {
    /// Unique within the plan (random)
    pub id: String,
    /// Identifier of the guideline rule that produced this recommendation
    pub rule_id: String,
    pub late_effect: String,
    pub risk_level: RiskLevel,
    /// Screening test modality
    pub test: String,
    pub frequency: String,
    pub start_criteria: String,
    /// Clinician-register narrative
    pub clinician_text: String,
    /// Patient-register narrative
    pub patient_text: String,
    /// Guideline source and section, e.g. "COG_v6 - Sección 22"
    pub source: String,
    pub evidence: EvidenceLevel,
    /// Exposure ids that satisfied the rule, in exposure order
    #[serde(default)]
    pub triggered_by: Vec<String>,
}

impl FollowUpRecommendation {
    /// Whether this recommendation is High risk
    pub fn is_high_risk(&self) -> bool {
        self.risk_level == RiskLevel::High
    }

    /// Compare clinical content, ignoring the random identifier
    pub fn same_content(&self, other: &Self) -> bool {
        self.rule_id == other.rule_id
            && self.late_effect == other.late_effect
            && self.risk_level == other.risk_level
            && self.test == other.test
            && self.frequency == other.frequency
            && self.start_criteria == other.start_criteria
            && self.clinician_text == other.clinician_text
            && self.patient_text == other.patient_text
            && self.source == other.source
            && self.evidence == other.evidence
            && self.triggered_by == other.triggered_by
    }
}

/// Count of recommendations by risk level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskCounts {
    pub high: usize,
    pub moderate: usize,
    pub low: usize,
}

impl RiskCounts {
    pub fn total(&self) -> usize {
        self.high + self.moderate + self.low
    }

    pub fn add(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::High => self.high += 1,
            RiskLevel::Moderate => self.moderate += 1,
            RiskLevel::Low => self.low += 1,
        }
    }
}

/// The complete, ranked surveillance plan for one patient at one point in time.
///
/// Fields are private: a plan is assembled once by the planner and only read afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpPlan {
    patient: Patient,
    exposures: Vec<Exposure>,
    recommendations: Vec<FollowUpRecommendation>,
    generated_at: DateTime<Utc>,
    generated_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    catalog_fingerprint: Option<String>,
}

impl FollowUpPlan {
    pub(crate) fn assemble(
        patient: Patient,
        exposures: Vec<Exposure>,
        recommendations: Vec<FollowUpRecommendation>,
        generated_at: DateTime<Utc>,
        generated_by: impl Into<String>,
        catalog_fingerprint: Option<String>,
    ) -> Self {
        Self {
            patient,
            exposures,
            recommendations,
            generated_at,
            generated_by: generated_by.into(),
            catalog_fingerprint,
        }
    }

    pub fn patient(&self) -> &Patient {
        &self.patient
    }

    /// Exposures exactly as supplied by the caller
    pub fn exposures(&self) -> &[Exposure] {
        &self.exposures
    }

    /// Recommendations, highest risk first
    pub fn recommendations(&self) -> &[FollowUpRecommendation] {
        &self.recommendations
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Name of the clinician who requested the plan
    pub fn generated_by(&self) -> &str {
        &self.generated_by
    }

    pub fn catalog_fingerprint(&self) -> Option<&str> {
        self.catalog_fingerprint.as_deref()
    }

    /// A plan with no recommendations is valid: no guideline-driven surveillance applies
    pub fn is_empty(&self) -> bool {
        self.recommendations.is_empty()
    }

    /// Look up the recommendation produced by a given rule
    pub fn recommendation_for_rule(&self, rule_id: &str) -> Option<&FollowUpRecommendation> {
        self.recommendations.iter().find(|r| r.rule_id == rule_id)
    }

    pub fn recommendations_by_risk(
        &self,
        level: RiskLevel,
    ) -> impl Iterator<Item = &FollowUpRecommendation> {
        self.recommendations.iter().filter(move |r| r.risk_level == level)
    }

    pub fn risk_counts(&self) -> RiskCounts {
        let mut counts = RiskCounts::default();
        for rec in &self.recommendations {
            counts.add(rec.risk_level);
        }
        counts
    }

    /// Compare two plans ignoring generation time and recommendation ids
    pub fn same_content(&self, other: &Self) -> bool {
        self.patient == other.patient
            && self.exposures == other.exposures
            && self.generated_by == other.generated_by
            && self.catalog_fingerprint == other.catalog_fingerprint
            && self.recommendations.len() == other.recommendations.len()
            && self
                .recommendations
                .iter()
                .zip(&other.recommendations)
                .all(|(a, b)| a.same_content(b))
    }
}

/// A patient and their exposures, as handed over by intake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub patient: Patient,
    #[serde(default)]
    pub exposures: Vec<Exposure>,
}

impl PlanRequest {
    pub fn new(patient: Patient, exposures: Vec<Exposure>) -> Self {
        Self { patient, exposures }
    }

    /// Structural validation; runs before any rule is evaluated
    pub fn validate(&self) -> CareResult<()> {
        self.patient.validate()?;
        validate_exposures(&self.exposures)
    }

    pub fn from_json_str(content: &str) -> CareResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| CareError::validation(format!("Malformed plan request: {e}")))
    }

    pub fn from_yaml_str(content: &str) -> CareResult<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| CareError::validation(format!("Malformed plan request: {e}")))
    }

    /// Load a single request from a `.json`, `.yaml` or `.yml` file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> CareResult<Self> {
        let content = read_request_file(path.as_ref())?;
        if is_json(path.as_ref()) {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Load a list of requests from a `.json`, `.yaml` or `.yml` file
    pub fn load_many_from_file<P: AsRef<Path>>(path: P) -> CareResult<Vec<Self>> {
        let content = read_request_file(path.as_ref())?;
        let parsed = if is_json(path.as_ref()) {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        };

        parsed.map_err(|e| CareError::validation(format!("Malformed plan request list: {e}")))
    }
}

fn read_request_file(path: &Path) -> CareResult<String> {
    fs::read_to_string(path).map_err(|e| {
        CareError::validation(format!(
            "Failed to read plan request '{}': {}",
            path.display(),
            e
        ))
    })
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Error types that can occur while building catalogs or generating plans
#[derive(Debug, thiserror::Error)]
pub enum CareError {
    /// Rule catalog could not be loaded, parsed or validated
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// File could not be read or written
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Caller supplied malformed patient or exposure data
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// A catalog rule is defective; generation cannot proceed
    #[error("Rule error in '{rule_id}': {message}")]
    Rule { rule_id: String, message: String },

    /// Rendering a plan failed
    #[error("Report error: {message}")]
    Report { message: String },
}

impl CareError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn rule(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rule { rule_id: rule_id.into(), message: message.into() }
    }

    pub fn report(message: impl Into<String>) -> Self {
        Self::Report { message: message.into() }
    }

    /// Whether the caller can fix this by correcting its input
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// Result type for SurvivorCare operations
pub type CareResult<T> = Result<T, CareError>;
