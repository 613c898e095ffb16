//! SurvivorCare - Long-term follow-up planning for childhood cancer survivors
//!
//! Architecture: Clean Architecture - Library interface serves as the application layer
//! - Pure domain model with no knowledge of files, terminals or clocks beyond plan stamping
//! - The rule catalog is injected, so every component can run against a fabricated catalog
//! - Rendering is a separate concern applied to finished plans

pub mod config;
pub mod domain;
pub mod matching;
pub mod planner;
pub mod report;

// Re-export main types for convenient access
pub use domain::patient::{Exposure, ExposureType, Patient, Sex};
pub use domain::plan::{
    CareError, CareResult, EvidenceLevel, FollowUpPlan, FollowUpRecommendation, PlanRequest,
    RiskCounts, RiskLevel,
};

pub use config::{
    CatalogBuilder, CatalogStats, Criterion, GuidelineRule, GuidelineSource, RuleCatalog,
    Vocabulary,
};

pub use matching::{MatchingEngine, RuleMatch};

pub use planner::{BatchFailure, BatchOptions, BatchReport, Planner};

pub use report::{OutputFormat, ReportFormatter, ReportOptions};

use chrono::{DateTime, Utc};
use std::path::Path;

/// Main entry point: a planner over one catalog plus a report formatter
#[derive(Debug)]
pub struct SurvivorCare {
    planner: Planner,
    report_formatter: ReportFormatter,
}

impl SurvivorCare {
    /// Create an engine over the given catalog
    pub fn new_with_catalog(catalog: RuleCatalog) -> CareResult<Self> {
        let planner = Planner::new(catalog)?;
        Ok(Self { planner, report_formatter: ReportFormatter::default() })
    }

    /// Create an engine over the built-in catalog
    pub fn new() -> CareResult<Self> {
        Self::new_with_catalog(RuleCatalog::default())
    }

    /// Create an engine loading its catalog from a YAML file
    pub fn from_catalog_file<P: AsRef<Path>>(path: P) -> CareResult<Self> {
        let catalog = RuleCatalog::load_from_file(path)?;
        Self::new_with_catalog(catalog)
    }

    pub fn with_report_formatter(mut self, formatter: ReportFormatter) -> Self {
        self.report_formatter = formatter;
        self
    }

    pub fn catalog(&self) -> &RuleCatalog {
        self.planner.catalog()
    }

    pub fn catalog_statistics(&self) -> CatalogStats {
        self.planner.catalog().statistics()
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    /// Produce the ranked, deduplicated plan for one patient
    pub fn generate(
        &self,
        patient: &Patient,
        exposures: &[Exposure],
        clinician_name: &str,
    ) -> CareResult<FollowUpPlan> {
        self.planner.generate(patient, exposures, clinician_name)
    }

    pub fn generate_at(
        &self,
        patient: &Patient,
        exposures: &[Exposure],
        clinician_name: &str,
        generated_at: DateTime<Utc>,
    ) -> CareResult<FollowUpPlan> {
        self.planner.generate_at(patient, exposures, clinician_name, generated_at)
    }

    pub fn generate_request(
        &self,
        request: &PlanRequest,
        clinician_name: &str,
    ) -> CareResult<FollowUpPlan> {
        self.planner.generate_request(request, clinician_name)
    }

    pub fn generate_batch(
        &self,
        requests: &[PlanRequest],
        clinician_name: &str,
        options: &BatchOptions,
    ) -> CareResult<BatchReport> {
        self.planner.generate_batch(requests, clinician_name, options)
    }

    /// Render a plan with the configured formatter
    pub fn format_plan(&self, plan: &FollowUpPlan, format: OutputFormat) -> CareResult<String> {
        self.report_formatter.format_plan(plan, format)
    }
}

/// Convenience function to create a planner over the built-in catalog
pub fn create_planner() -> CareResult<SurvivorCare> {
    SurvivorCare::new()
}

/// Convenience function to generate a single plan with the built-in catalog
pub fn generate_plan(
    patient: &Patient,
    exposures: &[Exposure],
    clinician_name: &str,
) -> CareResult<FollowUpPlan> {
    SurvivorCare::new()?.generate(patient, exposures, clinician_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::TempDir;

    fn patient(sex: Sex) -> Patient {
        Patient::new("SC-001", 19, 2005, 2012, sex, "Linfoma de Hodgkin")
    }

    fn exposure(id: &str, exposure_type: ExposureType, name: &str) -> Exposure {
        Exposure::new(id, exposure_type, name)
    }

    #[test]
    fn test_anthracycline_scenario() {
        let engine = SurvivorCare::new().unwrap();
        let exposures = vec![exposure("1", ExposureType::Chemotherapy, "Doxorrubicina")];

        let plan = engine.generate(&patient(Sex::Male), &exposures, "Dr. Test").unwrap();

        assert_eq!(plan.recommendations().len(), 1);
        let rec = &plan.recommendations()[0];
        assert_eq!(rec.late_effect, "Cardiovascular");
        assert_eq!(rec.risk_level, RiskLevel::High);
        assert_eq!(rec.test, "Ecocardiograma");
        assert_eq!(rec.triggered_by, vec!["1".to_string()]);
    }

    #[test]
    fn test_breast_surveillance_is_sex_gated() {
        let engine = SurvivorCare::new().unwrap();
        let exposures = vec![exposure("1", ExposureType::Radiation, "Manto / Mediastino / Tórax")];
        let has_section_73 = |plan: &FollowUpPlan| {
            plan.recommendations().iter().any(|r| r.source.contains("Sección 73"))
        };

        let male = engine.generate(&patient(Sex::Male), &exposures, "Dr").unwrap();
        let female = engine.generate(&patient(Sex::Female), &exposures, "Dr").unwrap();

        assert!(!has_section_73(&male));
        assert!(has_section_73(&female));
        assert!(male.recommendation_for_rule("COG-75-Pulmonary").is_some());
    }

    #[test]
    fn test_platinum_agents_deduplicate() {
        let engine = SurvivorCare::new().unwrap();
        let exposures = vec![
            exposure("cis", ExposureType::Chemotherapy, "Cisplatino"),
            exposure("carbo", ExposureType::Chemotherapy, "Carboplatino"),
        ];

        let plan = engine.generate(&patient(Sex::Female), &exposures, "Dr").unwrap();
        let hearing: Vec<_> =
            plan.recommendations().iter().filter(|r| r.late_effect == "Auditivo").collect();

        assert_eq!(hearing.len(), 1);
        assert_eq!(hearing[0].triggered_by, vec!["cis".to_string(), "carbo".to_string()]);
    }

    #[test]
    fn test_multi_category_scenario() {
        let engine = SurvivorCare::new().unwrap();
        let exposures = vec![
            exposure("s", ExposureType::Surgery, "Esplenectomía"),
            exposure("r", ExposureType::Radiation, "Craneal / Cerebro"),
        ];

        let plan = engine.generate(&patient(Sex::Male), &exposures, "Dr").unwrap();

        let splenectomy = plan.recommendation_for_rule("COG-147-Splenectomy").unwrap();
        assert_eq!(splenectomy.risk_level, RiskLevel::High);
        assert!(plan.recommendations().iter().all(|r| r.late_effect != "Pulmonar"));
        assert!(plan.recommendations().iter().all(|r| r.late_effect != "Cardiovascular"));
    }

    #[test]
    fn test_no_exposures_is_an_empty_plan() {
        let plan = generate_plan(&patient(Sex::Female), &[], "Dr").unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.risk_counts().total(), 0);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let engine = create_planner().unwrap();
        let exposures = vec![
            exposure("1", ExposureType::Radiation, "Manto / Mediastino / Tórax"),
            exposure("2", ExposureType::Chemotherapy, "Doxorrubicina"),
            exposure("3", ExposureType::Chemotherapy, "Cisplatino"),
            exposure("4", ExposureType::Surgery, "Esplenectomía"),
        ];

        let first = engine.generate(&patient(Sex::Female), &exposures, "Dr").unwrap();
        let second = engine.generate(&patient(Sex::Female), &exposures, "Dr").unwrap();

        assert!(first.same_content(&second));
    }

    #[test]
    fn test_rule_ids_unique_and_risk_ordered() {
        let engine = SurvivorCare::new().unwrap();
        let exposures = vec![
            exposure("1", ExposureType::Chemotherapy, "Cisplatino"),
            exposure("2", ExposureType::Radiation, "Irradiación Corporal Total (TBI)"),
            exposure("3", ExposureType::Radiation, "Manto / Mediastino / Tórax"),
            exposure("4", ExposureType::Chemotherapy, "Carboplatino"),
            exposure("5", ExposureType::Chemotherapy, "Daunorrubicina"),
        ];

        let plan = engine.generate(&patient(Sex::Female), &exposures, "Dr").unwrap();

        let ids: HashSet<&str> = plan.recommendations().iter().map(|r| r.rule_id.as_str()).collect();
        assert_eq!(ids.len(), plan.recommendations().len());

        let scores: Vec<u8> = plan.recommendations().iter().map(|r| r.risk_level.score()).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_unknown_exposure_type_is_rejected() {
        let json = r#"{
            "patient": {"id": "p", "age": 20, "birthYear": 2004, "diagnosisYear": 2010,
                        "sex": "Male", "tumorType": "Wilms"},
            "exposures": [{"id": "1", "type": "Immunotherapy", "name": "Nivolumab"}]
        }"#;

        let err = PlanRequest::from_json_str(json).unwrap_err();
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_engine_from_catalog_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rules.yaml");
        let catalog = CatalogBuilder::from_defaults().source("local").build().unwrap();
        fs::write(&path, catalog.to_yaml().unwrap()).unwrap();

        let engine = SurvivorCare::from_catalog_file(&path).unwrap();
        assert_eq!(engine.catalog_statistics().total_rules, 5);

        let plan = engine
            .generate(&patient(Sex::Male), &[exposure("1", ExposureType::Surgery, "Esplenectomía")], "Dr")
            .unwrap();
        let text = engine.format_plan(&plan, OutputFormat::Json).unwrap();
        assert!(text.contains("COG-147-Splenectomy"));
    }
}
