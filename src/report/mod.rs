//! Plan rendering for clinicians, patients and machines
//!
//! Architecture: Anti-Corruption Layer - Formatters translate the plan aggregate into external views
//! - Every recommendation already carries both narrative registers; formatters only select fields
//! - Each view encapsulates its own layout rules
//! - Filtering by risk never reorders: the plan's ranking is preserved

use crate::domain::patient::{Exposure, Sex};
use crate::domain::plan::{CareError, CareResult, FollowUpPlan, FollowUpRecommendation, RiskLevel};
use serde_json::Value as JsonValue;
use std::io::Write;

/// Shown only when the plan itself has no recommendations
pub const EMPTY_PLAN_MESSAGE: &str =
    "No se ha identificado vigilancia aplicable según las guías para las exposiciones indicadas";

const CLINICIAN_DISCLAIMER: &str = "Estas recomendaciones se basan en las Guías COG v6.0 y \
PanCare (2024). No sustituyen el juicio clínico profesional. Valide siempre con la historia \
clínica completa.";

const PATIENT_INTRO: &str = "¡Hola! Basado en los tratamientos que recibiste para curar tu \
cáncer, hemos preparado esta guía personalizada. El objetivo es ayudarte a mantenerte saludable \
y detectar cualquier problema a tiempo.";

const LIFESTYLE_ADVICE: &[&str] = &[
    "Lleva una dieta equilibrada rica en frutas, verduras y fibra.",
    "Evita fumar y el humo de segunda mano. Es el factor de riesgo #1.",
    "Usa protector solar (SPF 30+) y ropa protectora, tu piel puede ser más sensible.",
    "Mantén al día tu calendario de vacunación nacional (incluyendo gripe anual).",
];

/// Supported output formats for follow-up plans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Technical view with risk, test, frequency and guideline reference
    Clinician,
    /// Plain-language view built from the patient narratives
    Patient,
    /// The full plan as JSON
    Json,
}

impl OutputFormat {
    /// Parse format from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "clinician" => Some(Self::Clinician),
            "patient" => Some(Self::Patient),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn all_formats() -> &'static [&'static str] {
        &["clinician", "patient", "json"]
    }
}

/// Options for customizing report output
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Whether to use ANSI colors (clinician and patient views)
    pub use_colors: bool,
    /// Minimum risk level to include
    pub min_risk: Option<RiskLevel>,
    /// Maximum number of recommendations to include
    pub max_recommendations: Option<usize>,
    /// Whether the clinician view lists the exposures that triggered each rule
    pub show_triggers: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { use_colors: true, min_risk: None, max_recommendations: None, show_triggers: true }
    }
}

/// Renders plans in the requested format
#[derive(Debug, Clone, Default)]
pub struct ReportFormatter {
    options: ReportOptions,
}

impl ReportFormatter {
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    /// Format a plan in the specified format
    pub fn format_plan(&self, plan: &FollowUpPlan, format: OutputFormat) -> CareResult<String> {
        let recommendations = self.filter_recommendations(plan.recommendations());

        match format {
            OutputFormat::Clinician => Ok(self.format_clinician(plan, &recommendations)),
            OutputFormat::Patient => Ok(self.format_patient(plan, &recommendations)),
            OutputFormat::Json => self.format_json(plan, &recommendations),
        }
    }

    /// Write a formatted plan to a writer
    pub fn write_plan<W: Write>(
        &self,
        plan: &FollowUpPlan,
        format: OutputFormat,
        mut writer: W,
    ) -> CareResult<()> {
        let formatted = self.format_plan(plan, format)?;
        writer.write_all(formatted.as_bytes())?;
        Ok(())
    }

    fn filter_recommendations<'a>(
        &self,
        recommendations: &'a [FollowUpRecommendation],
    ) -> Vec<&'a FollowUpRecommendation> {
        let mut filtered: Vec<&FollowUpRecommendation> = recommendations
            .iter()
            .filter(|r| self.options.min_risk.map_or(true, |min| r.risk_level >= min))
            .collect();

        if let Some(max) = self.options.max_recommendations {
            filtered.truncate(max);
        }

        filtered
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.options.use_colors {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }

    fn risk_badge(&self, level: RiskLevel) -> String {
        let (code, label) = match level {
            RiskLevel::High => ("31", "Riesgo Alto"),
            RiskLevel::Moderate => ("33", "Riesgo Moderado"),
            RiskLevel::Low => ("32", "Riesgo Bajo"),
        };
        self.paint(code, label)
    }

    /// Notice for recommendations the filters removed; empty when nothing was hidden
    fn hidden_notice(&self, plan: &FollowUpPlan, shown: usize) -> Option<String> {
        let hidden = plan.recommendations().len().saturating_sub(shown);
        if hidden == 0 {
            return None;
        }
        Some(format!(
            "{} recomendaci{} oculta{} por el filtro",
            hidden,
            if hidden == 1 { "ón" } else { "ones" },
            if hidden == 1 { "" } else { "s" }
        ))
    }

    fn format_header(&self, plan: &FollowUpPlan, title: &str) -> String {
        let patient = plan.patient();
        let sex = match patient.sex {
            Sex::Male => "H",
            Sex::Female => "M",
        };

        let mut header = String::new();
        header.push_str(&self.paint("1", title));
        header.push('\n');
        header.push_str(&format!(
            "Generado por: {} el {}\n",
            plan.generated_by(),
            plan.generated_at().format("%d/%m/%Y")
        ));
        header.push_str(&format!(
            "Paciente {} | {} años ({}) | Diagnóstico: {} - {}\n\n",
            patient.id, patient.age, sex, patient.diagnosis_year, patient.tumor_type
        ));
        header
    }

    fn exposure_line(exposure: &Exposure) -> String {
        let mut line = format!("  - [{}] {}", exposure.exposure_type, exposure.format_display());
        if let Some(date) = &exposure.date {
            line.push_str(&format!(", {}", date));
        }
        if let Some(details) = &exposure.details {
            line.push_str(&format!(" ({})", details));
        }
        line.push('\n');
        line
    }

    fn format_clinician(&self, plan: &FollowUpPlan, recommendations: &[&FollowUpRecommendation]) -> String {
        let mut output = self.format_header(plan, "Plan de Seguimiento SurvivorCare");

        output.push_str(&self.paint("1", "Resumen del Tratamiento"));
        output.push('\n');
        if plan.exposures().is_empty() {
            output.push_str("  (sin exposiciones registradas)\n");
        }
        for exposure in plan.exposures() {
            output.push_str(&Self::exposure_line(exposure));
        }
        output.push('\n');

        if plan.is_empty() {
            output.push_str(&self.paint("32", EMPTY_PLAN_MESSAGE));
            output.push_str("\n\n");
        } else {
            output.push_str(&self.paint("1", "Recomendaciones Estratificadas por Riesgo"));
            output.push_str("\n\n");

            for rec in recommendations {
                output.push_str(&format!("{} [{}]\n", rec.late_effect, self.risk_badge(rec.risk_level)));
                output.push_str(&format!("  Prueba:     {}\n", rec.test));
                output.push_str(&format!("  Frecuencia: {}\n", rec.frequency));
                output.push_str(&format!("  Inicio:     {}\n", rec.start_criteria));
                output.push_str(&format!("  {}\n", rec.clinician_text));
                output.push_str(&self.paint(
                    "2",
                    &format!("  Ref. {} (Evidencia {})", rec.source, rec.evidence),
                ));
                output.push('\n');

                if self.options.show_triggers && !rec.triggered_by.is_empty() {
                    let names: Vec<String> = rec
                        .triggered_by
                        .iter()
                        .map(|id| {
                            plan.exposures()
                                .iter()
                                .find(|e| &e.id == id)
                                .map_or_else(|| id.clone(), |e| e.name.clone())
                        })
                        .collect();
                    output.push_str(&self.paint("2", &format!("  Activada por: {}", names.join(", "))));
                    output.push('\n');
                }
                output.push('\n');
            }

            if let Some(notice) = self.hidden_notice(plan, recommendations.len()) {
                output.push_str(&self.paint("33", &notice));
                output.push_str("\n\n");
            }
        }

        output.push_str(&self.format_summary(plan, recommendations.len()));
        output.push('\n');
        output.push_str(&self.paint("2", &format!("Aviso legal: {}", CLINICIAN_DISCLAIMER)));
        output.push('\n');
        output
    }

    fn format_patient(&self, plan: &FollowUpPlan, recommendations: &[&FollowUpRecommendation]) -> String {
        let mut output = self.format_header(plan, "Tu Hoja de Ruta de Salud");
        output.push_str(PATIENT_INTRO);
        output.push_str("\n\n");

        if plan.is_empty() {
            output.push_str(EMPTY_PLAN_MESSAGE);
            output.push_str("\n\n");
        }

        for rec in recommendations {
            let marker = if rec.is_high_risk() { self.paint("31", "!") } else { "-".to_string() };
            output.push_str(&format!("{} {}\n", marker, self.paint("1", &format!("Salud {}", rec.late_effect))));
            output.push_str(&format!("  {}\n", rec.patient_text));
            output.push_str(&format!("  Plan de Acción: {}\n", rec.test));
            output.push_str(&format!("  Frecuencia:     {}\n\n", rec.frequency));
        }

        if let Some(notice) = self.hidden_notice(plan, recommendations.len()) {
            output.push_str(&notice);
            output.push_str("\n\n");
        }

        output.push_str(&self.paint("32", "Estilo de Vida Saludable"));
        output.push('\n');
        for advice in LIFESTYLE_ADVICE {
            output.push_str(&format!("  * {}\n", advice));
        }
        output
    }

    /// The full plan plus a risk summary. Filters apply to the embedded recommendations.
    fn format_json(&self, plan: &FollowUpPlan, recommendations: &[&FollowUpRecommendation]) -> CareResult<String> {
        let mut value = serde_json::to_value(plan)
            .map_err(|e| CareError::report(format!("JSON serialization failed: {}", e)))?;

        let recs = serde_json::to_value(recommendations)
            .map_err(|e| CareError::report(format!("JSON serialization failed: {}", e)))?;

        let counts = plan.risk_counts();
        let message = if plan.is_empty() { Some(EMPTY_PLAN_MESSAGE) } else { None };
        if let JsonValue::Object(map) = &mut value {
            map.insert("recommendations".to_string(), recs);
            map.insert(
                "summary".to_string(),
                serde_json::json!({
                    "total": counts.total(),
                    "high": counts.high,
                    "moderate": counts.moderate,
                    "low": counts.low,
                    "shown": recommendations.len(),
                    "message": message,
                }),
            );
        }

        serde_json::to_string_pretty(&value)
            .map_err(|e| CareError::report(format!("JSON serialization failed: {}", e)))
    }

    fn format_summary(&self, plan: &FollowUpPlan, shown: usize) -> String {
        let counts = plan.risk_counts();
        let mut parts = Vec::new();

        if counts.high > 0 {
            parts.push(self.paint("31", &format!("{} alto", counts.high)));
        }
        if counts.moderate > 0 {
            parts.push(self.paint("33", &format!("{} moderado", counts.moderate)));
        }
        if counts.low > 0 {
            parts.push(self.paint("32", &format!("{} bajo", counts.low)));
        }

        let mut summary = format!("{} ", self.paint("1", "Resumen:"));
        if parts.is_empty() {
            summary.push_str("0 recomendaciones");
        } else {
            summary.push_str(&format!(
                "{} recomendaci{} ({})",
                counts.total(),
                if counts.total() == 1 { "ón" } else { "ones" },
                parts.join(", ")
            ));
        }
        if shown < counts.total() {
            summary.push_str(&format!(", {} mostrada{}", shown, if shown == 1 { "" } else { "s" }));
        }
        summary.push('\n');
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::patient::{ExposureType, Patient};
    use crate::planner::Planner;

    fn plan_for(exposures: Vec<Exposure>) -> FollowUpPlan {
        let planner = Planner::with_defaults().unwrap();
        let patient = Patient::new("p-42", 22, 2002, 2010, Sex::Female, "Linfoma de Hodgkin");
        planner.generate(&patient, &exposures, "Dra. Ruiz").unwrap()
    }

    fn plain() -> ReportFormatter {
        ReportFormatter::new(ReportOptions { use_colors: false, ..Default::default() })
    }

    #[test]
    fn test_clinician_format() {
        let plan = plan_for(vec![
            Exposure::new("1", ExposureType::Chemotherapy, "Doxorrubicina")
                .with_dose(300.0, "mg/m2")
                .with_date("2011-04")
                .with_details("ABVD x6"),
            Exposure::new("2", ExposureType::Radiation, "Manto / Mediastino / Tórax"),
        ]);
        let output = plain().format_plan(&plan, OutputFormat::Clinician).unwrap();

        assert!(output.contains("Generado por: Dra. Ruiz"));
        assert!(output.contains("Doxorrubicina (300 mg/m2), 2011-04 (ABVD x6)"));
        assert!(output.contains("Ecocardiograma"));
        assert!(output.contains("[Riesgo Alto]"));
        assert!(output.contains("COG_v6 - Sección 73 (Evidencia 1)"));
        assert!(output.contains("Activada por: Doxorrubicina"));
        assert!(output.contains("Aviso legal:"));
        assert!(!output.contains("\x1b["));
    }

    #[test]
    fn test_patient_format_uses_patient_register() {
        let plan = plan_for(vec![Exposure::new("1", ExposureType::Surgery, "Esplenectomía")]);
        let output = plain().format_plan(&plan, OutputFormat::Patient).unwrap();

        assert!(output.contains("Salud Inmunológico"));
        assert!(output.contains("se extirpó el bazo"));
        assert!(!output.contains("infección fulminante"));
        assert!(output.contains("Estilo de Vida Saludable"));
    }

    #[test]
    fn test_empty_plan_message() {
        let plan = plan_for(Vec::new());
        let formatter = plain();

        for format in [OutputFormat::Clinician, OutputFormat::Patient] {
            let output = formatter.format_plan(&plan, format).unwrap();
            assert!(output.contains(EMPTY_PLAN_MESSAGE));
            assert!(!output.contains("oculta"));
        }

        let json: JsonValue =
            serde_json::from_str(&formatter.format_plan(&plan, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["summary"]["message"], EMPTY_PLAN_MESSAGE);
    }

    #[test]
    fn test_filtered_out_plan_is_not_reported_empty() {
        // Only a Moderate hearing recommendation, hidden by a High threshold
        let plan = plan_for(vec![Exposure::new("1", ExposureType::Chemotherapy, "Cisplatino")]);
        assert_eq!(plan.recommendations().len(), 1);

        let formatter = ReportFormatter::new(ReportOptions {
            use_colors: false,
            min_risk: Some(RiskLevel::High),
            ..Default::default()
        });

        for format in [OutputFormat::Clinician, OutputFormat::Patient] {
            let output = formatter.format_plan(&plan, format).unwrap();
            assert!(!output.contains(EMPTY_PLAN_MESSAGE));
            assert!(output.contains("1 recomendación oculta por el filtro"));
            assert!(!output.contains("Audiometría"));
        }

        let json: JsonValue =
            serde_json::from_str(&formatter.format_plan(&plan, OutputFormat::Json).unwrap()).unwrap();
        assert!(json["summary"]["message"].is_null());
        assert_eq!(json["summary"]["shown"], 0);
    }

    #[test]
    fn test_json_format() {
        let plan = plan_for(vec![
            Exposure::new("a", ExposureType::Chemotherapy, "Cisplatino"),
            Exposure::new("b", ExposureType::Chemotherapy, "Carboplatino"),
        ]);
        let output = ReportFormatter::default().format_plan(&plan, OutputFormat::Json).unwrap();
        let json: JsonValue = serde_json::from_str(&output).unwrap();

        assert_eq!(json["recommendations"].as_array().unwrap().len(), 1);
        assert_eq!(json["recommendations"][0]["ruleId"], "COG-22-Hearing");
        assert_eq!(json["recommendations"][0]["triggeredBy"], serde_json::json!(["a", "b"]));
        assert_eq!(json["generatedBy"], "Dra. Ruiz");
        assert_eq!(json["summary"]["moderate"], 1);
        assert!(json["summary"]["message"].is_null());
    }

    #[test]
    fn test_min_risk_filtering_keeps_order() {
        let plan = plan_for(vec![
            Exposure::new("r", ExposureType::Radiation, "Manto / Mediastino / Tórax"),
            Exposure::new("c", ExposureType::Chemotherapy, "Cisplatino"),
        ]);
        let formatter = ReportFormatter::new(ReportOptions {
            min_risk: Some(RiskLevel::High),
            ..Default::default()
        });

        let output = formatter.format_plan(&plan, OutputFormat::Json).unwrap();
        let json: JsonValue = serde_json::from_str(&output).unwrap();
        let ids: Vec<&str> = json["recommendations"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["ruleId"].as_str().unwrap())
            .collect();

        assert_eq!(ids, vec!["COG-73-BreastCa"]);
        assert_eq!(json["summary"]["total"], 3);
        assert_eq!(json["summary"]["shown"], 1);
    }

    #[test]
    fn test_write_plan() {
        let plan = plan_for(vec![Exposure::new("1", ExposureType::Surgery, "Esplenectomía")]);
        let mut buffer = Vec::new();
        plain().write_plan(&plan, OutputFormat::Clinician, &mut buffer).unwrap();

        let written = String::from_utf8(buffer).unwrap();
        assert!(written.contains("Revisión de Vacunación"));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(OutputFormat::from_str("Clinician"), Some(OutputFormat::Clinician));
        assert_eq!(OutputFormat::from_str("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("sarif"), None);
        assert_eq!(OutputFormat::all_formats().len(), 3);
    }
}
