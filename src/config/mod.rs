//! Rule catalog loading and management for SurvivorCare
//!
//! Architecture: Anti-Corruption Layer - The catalog translates external YAML into domain rules
//! - Raw YAML structures are converted to clean, validated guideline rules
//! - The default catalog is embedded in the crate, not fetched from infrastructure
//! - Applicability criteria are data interpreted by the matching engine, never code

mod defaults;

use crate::domain::patient::{Exposure, ExposureType, Sex};
use crate::domain::plan::{CareError, CareResult, EvidenceLevel, RiskLevel};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

/// Catalog format versions this build understands
pub const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// Deepest allowed nesting of `all_of` / `any_of` criteria
pub const MAX_CRITERION_DEPTH: usize = 8;

/// Versioned, read-only collection of guideline rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCatalog {
    version: String,
    /// Informal content tag, e.g. "COG v6.0 / PanCare 2024"
    source: String,
    rules: Vec<GuidelineRule>,
    #[serde(default)]
    vocabulary: Vocabulary,
}

/// Guideline a rule was transcribed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GuidelineSource {
    #[serde(rename = "COG_v6")]
    CogV6,
    #[serde(rename = "PanCare_2024")]
    PanCare2024,
}

impl GuidelineSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CogV6 => "COG_v6",
            Self::PanCare2024 => "PanCare_2024",
        }
    }
}

impl fmt::Display for GuidelineSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One late-effect surveillance recommendation and the exposures that trigger it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidelineRule {
    /// Stable identifier; never reused for a different rule
    pub id: String,
    pub guideline_source: GuidelineSource,
    /// Section within the guideline, e.g. "Sección 34 / 77"
    pub section_reference: String,
    /// Only exposures of this type are evaluated against the rule
    pub exposure_type: ExposureType,
    pub late_effect_category: String,
    pub risk_level: RiskLevel,
    pub recommendation_clinician: String,
    pub recommendation_patient: String,
    pub test_modality: String,
    pub start_time_condition: String,
    pub interval: String,
    pub evidence_strength: EvidenceLevel,
    pub criterion: Criterion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl GuidelineRule {
    /// Source citation as shown on reports: "COG_v6 - Sección 22"
    pub fn citation(&self) -> String {
        format!("{} - {}", self.guideline_source, self.section_reference)
    }
}

/// Closed set of applicability predicates over (exposure, patient)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Criterion {
    /// Exposure name contains any of the terms (case-insensitive)
    NameContainsAny { terms: Vec<String> },
    /// Patient sex equals the given value
    PatientSex { sex: Sex },
    /// Every nested criterion holds
    AllOf { criteria: Vec<Criterion> },
    /// At least one nested criterion holds
    AnyOf { criteria: Vec<Criterion> },
}

impl Criterion {
    pub fn name_contains_any<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::NameContainsAny { terms: terms.into_iter().map(Into::into).collect() }
    }

    pub fn patient_sex(sex: Sex) -> Self {
        Self::PatientSex { sex }
    }

    pub fn all_of(criteria: Vec<Criterion>) -> Self {
        Self::AllOf { criteria }
    }

    pub fn any_of(criteria: Vec<Criterion>) -> Self {
        Self::AnyOf { criteria }
    }

    /// Structural check: no blank terms, no empty combinators, bounded depth
    pub fn check(&self) -> Result<(), String> {
        self.check_at(1)
    }

    fn check_at(&self, depth: usize) -> Result<(), String> {
        if depth > MAX_CRITERION_DEPTH {
            return Err(format!("criterion nested deeper than {MAX_CRITERION_DEPTH} levels"));
        }

        match self {
            Self::NameContainsAny { terms } => {
                if terms.is_empty() {
                    return Err("name_contains_any has no terms".to_string());
                }
                if terms.iter().any(|t| t.trim().is_empty()) {
                    return Err("name_contains_any has a blank term".to_string());
                }
                Ok(())
            }
            Self::PatientSex { .. } => Ok(()),
            Self::AllOf { criteria } | Self::AnyOf { criteria } => {
                if criteria.is_empty() {
                    return Err(format!("{} has no nested criteria", self.kind()));
                }
                criteria.iter().try_for_each(|c| c.check_at(depth + 1))
            }
        }
    }

    /// Serialized tag of this criterion
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NameContainsAny { .. } => "name_contains_any",
            Self::PatientSex { .. } => "patient_sex",
            Self::AllOf { .. } => "all_of",
            Self::AnyOf { .. } => "any_of",
        }
    }

    /// Human-readable rendering for `explain` output
    pub fn describe(&self) -> String {
        match self {
            Self::NameContainsAny { terms } => {
                format!("name contains any of [{}]", terms.join(", "))
            }
            Self::PatientSex { sex } => format!("patient sex = {sex}"),
            Self::AllOf { criteria } => join_described(criteria, " AND "),
            Self::AnyOf { criteria } => join_described(criteria, " OR "),
        }
    }
}

fn join_described(criteria: &[Criterion], separator: &str) -> String {
    let parts: Vec<String> = criteria
        .iter()
        .map(|c| match c {
            Criterion::AllOf { .. } | Criterion::AnyOf { .. } => format!("({})", c.describe()),
            _ => c.describe(),
        })
        .collect();
    parts.join(separator)
}

/// Canonical exposure labels offered to intake layers as picklists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    #[serde(default)]
    pub chemotherapy: Vec<String>,
    #[serde(default)]
    pub radiation: Vec<String>,
    #[serde(default)]
    pub surgery: Vec<String>,
    #[serde(default)]
    pub hsct: Vec<String>,
}

impl Vocabulary {
    /// Canonical labels for one exposure type
    pub fn labels(&self, exposure_type: ExposureType) -> &[String] {
        match exposure_type {
            ExposureType::Chemotherapy => &self.chemotherapy,
            ExposureType::Radiation => &self.radiation,
            ExposureType::Surgery => &self.surgery,
            ExposureType::Hsct => &self.hsct,
        }
    }

    /// Whether an exposure uses a canonical label of its type (case-insensitive)
    pub fn contains(&self, exposure: &Exposure) -> bool {
        let name = exposure.normalized_name();
        self.labels(exposure.exposure_type)
            .iter()
            .any(|label| label.to_lowercase() == name.trim())
    }

    pub fn len(&self) -> usize {
        ExposureType::ALL.iter().map(|t| self.labels(*t).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Summary counts for a catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total_rules: usize,
    pub rules_by_type: BTreeMap<ExposureType, usize>,
    pub high_risk_rules: usize,
    pub moderate_risk_rules: usize,
    pub low_risk_rules: usize,
    pub vocabulary_terms: usize,
}

impl RuleCatalog {
    /// Load a catalog from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> CareResult<Self> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            CareError::config(format!(
                "Failed to read rule catalog '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let catalog: Self = serde_yaml::from_str(&contents).map_err(|e| {
            CareError::config(format!(
                "Failed to parse rule catalog '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        catalog.validate()?;
        tracing::debug!(
            "Loaded rule catalog '{}' with {} rules from {}",
            catalog.source,
            catalog.rules.len(),
            path.as_ref().display()
        );
        Ok(catalog)
    }

    /// Load a catalog from YAML content
    pub fn load_from_str(content: &str) -> CareResult<Self> {
        let catalog: Self = serde_yaml::from_str(content)
            .map_err(|e| CareError::config(format!("Failed to parse rule catalog: {e}")))?;

        catalog.validate()?;
        Ok(catalog)
    }

    /// The built-in COG v6 catalog
    pub fn with_defaults() -> Self {
        Self {
            version: "1.0".to_string(),
            source: defaults::SOURCE_TAG.to_string(),
            rules: defaults::default_rules(),
            vocabulary: defaults::default_vocabulary(),
        }
    }

    /// Check version, identifier uniqueness and every criterion
    pub fn validate(&self) -> CareResult<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version.as_str()) {
            return Err(CareError::config(format!(
                "Unsupported catalog version: {}. Supported versions: {}",
                self.version,
                SUPPORTED_VERSIONS.join(", ")
            )));
        }

        let mut seen = HashSet::with_capacity(self.rules.len());
        for rule in &self.rules {
            if rule.id.trim().is_empty() {
                return Err(CareError::config(format!(
                    "Rule in section '{}' has an empty id",
                    rule.section_reference
                )));
            }

            if !seen.insert(rule.id.as_str()) {
                return Err(CareError::config(format!("Duplicate rule ID '{}'", rule.id)));
            }

            rule.criterion.check().map_err(|message| CareError::rule(&rule.id, message))?;
        }

        Ok(())
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// All rules in catalog order
    pub fn rules(&self) -> &[GuidelineRule] {
        &self.rules
    }

    pub fn rule(&self, id: &str) -> Option<&GuidelineRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Rules declared for one exposure type, in catalog order
    pub fn rules_for(&self, exposure_type: ExposureType) -> impl Iterator<Item = &GuidelineRule> {
        self.rules.iter().filter(move |r| r.exposure_type == exposure_type)
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn statistics(&self) -> CatalogStats {
        let mut stats = CatalogStats {
            total_rules: self.rules.len(),
            vocabulary_terms: self.vocabulary.len(),
            ..Default::default()
        };

        for rule in &self.rules {
            *stats.rules_by_type.entry(rule.exposure_type).or_insert(0) += 1;
            match rule.risk_level {
                RiskLevel::High => stats.high_risk_rules += 1,
                RiskLevel::Moderate => stats.moderate_risk_rules += 1,
                RiskLevel::Low => stats.low_risk_rules += 1,
            }
        }

        stats
    }

    pub fn to_json(&self) -> CareResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CareError::config(format!("Failed to serialize catalog: {e}")))
    }

    pub fn to_yaml(&self) -> CareResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| CareError::config(format!("Failed to serialize catalog: {e}")))
    }

    /// SHA-256 over the catalog's canonical JSON form.
    ///
    /// Stable across processes, so plans can be traced back to the exact rule set.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.version.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.source.as_bytes());

        for rule in &self.rules {
            hasher.update([0u8]);
            match serde_json::to_vec(rule) {
                Ok(bytes) => hasher.update(&bytes),
                // Unreachable for plain strings and enums; hash the id instead
                Err(_) => hasher.update(rule.id.as_bytes()),
            }
        }

        format!("{:x}", hasher.finalize())
    }
}

impl Default for RuleCatalog {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Catalog builder for programmatic construction
pub struct CatalogBuilder {
    catalog: RuleCatalog,
}

impl CatalogBuilder {
    /// Start from an empty catalog
    pub fn new() -> Self {
        Self {
            catalog: RuleCatalog {
                version: "1.0".to_string(),
                source: "custom".to_string(),
                rules: Vec::new(),
                vocabulary: Vocabulary::default(),
            },
        }
    }

    /// Start from the built-in catalog
    pub fn from_defaults() -> Self {
        Self { catalog: RuleCatalog::with_defaults() }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.catalog.source = source.into();
        self
    }

    pub fn add_rule(mut self, rule: GuidelineRule) -> Self {
        self.catalog.rules.push(rule);
        self
    }

    pub fn vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.catalog.vocabulary = vocabulary;
        self
    }

    /// Validate and return the catalog
    pub fn build(self) -> CareResult<RuleCatalog> {
        self.catalog.validate()?;
        Ok(self.catalog)
    }
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Minimal rule for fabricated catalogs
    pub fn rule(
        id: &str,
        exposure_type: ExposureType,
        risk_level: RiskLevel,
        criterion: Criterion,
    ) -> GuidelineRule {
        GuidelineRule {
            id: id.to_string(),
            guideline_source: GuidelineSource::PanCare2024,
            section_reference: format!("Section {id}"),
            exposure_type,
            late_effect_category: format!("Effect {id}"),
            risk_level,
            recommendation_clinician: format!("Clinician text for {id}"),
            recommendation_patient: format!("Patient text for {id}"),
            test_modality: format!("Test {id}"),
            start_time_condition: "Entry into follow-up".to_string(),
            interval: "Yearly".to_string(),
            evidence_strength: EvidenceLevel::Moderate,
            criterion,
            notes: None,
        }
    }
}
