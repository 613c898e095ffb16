//! Built-in guideline content (COG v6.0, Spanish labels)

use super::{Criterion, GuidelineRule, GuidelineSource, Vocabulary};
use crate::domain::patient::{ExposureType, Sex};
use crate::domain::plan::{EvidenceLevel, RiskLevel};

pub(super) const SOURCE_TAG: &str = "COG v6.0 / PanCare 2024 (es)";

pub(super) fn default_rules() -> Vec<GuidelineRule> {
    vec![
        // Anthracyclines: cardiomyopathy
        GuidelineRule {
            id: "COG-34-Anthracyclines".to_string(),
            guideline_source: GuidelineSource::CogV6,
            section_reference: "Sección 34 / 77".to_string(),
            exposure_type: ExposureType::Chemotherapy,
            late_effect_category: "Cardiovascular".to_string(),
            risk_level: RiskLevel::High,
            recommendation_clinician: "Cribado de miocardiopatía. Los factores de riesgo \
                cardiovascular tradicionales aumentan significativamente el riesgo."
                .to_string(),
            recommendation_patient: "Tu corazón necesita revisiones periódicas porque algunas \
                de las medicinas que recibiste (antraciclinas) pueden afectar la forma en que el \
                músculo cardíaco bombea."
                .to_string(),
            test_modality: "Ecocardiograma".to_string(),
            start_time_condition: "Entrada en seguimiento a largo plazo".to_string(),
            interval: "Cada 2-5 años según dosis".to_string(),
            evidence_strength: EvidenceLevel::High,
            criterion: Criterion::name_contains_any([
                "doxorrubicina",
                "daunorrubicina",
                "epirrubicina",
                "idarrubicina",
                "mitoxantrona",
            ]),
            notes: None,
        },
        // Chest radiation: breast cancer, female survivors only
        GuidelineRule {
            id: "COG-73-BreastCa".to_string(),
            guideline_source: GuidelineSource::CogV6,
            section_reference: "Sección 73".to_string(),
            exposure_type: ExposureType::Radiation,
            late_effect_category: "Neoplasia Secundaria".to_string(),
            risk_level: RiskLevel::High,
            recommendation_clinician: "Mamografía anual y RM de mama recomendada para mujeres \
                tratadas con radioterapia torácica."
                .to_string(),
            recommendation_patient: "Debido a que recibiste radioterapia en el área del tórax, \
                es muy importante revisar tus mamas regularmente para detectar cualquier cambio \
                a tiempo."
                .to_string(),
            test_modality: "Mamografía + RM".to_string(),
            start_time_condition: "25 años de edad u 8 años post-radiación (lo que ocurra después)"
                .to_string(),
            interval: "Anual".to_string(),
            evidence_strength: EvidenceLevel::High,
            criterion: Criterion::all_of(vec![
                Criterion::name_contains_any(["tórax", "manto", "axila", "mediastino"]),
                Criterion::patient_sex(Sex::Female),
            ]),
            notes: None,
        },
        // Chest radiation: pulmonary fibrosis
        GuidelineRule {
            id: "COG-75-Pulmonary".to_string(),
            guideline_source: GuidelineSource::CogV6,
            section_reference: "Sección 75".to_string(),
            exposure_type: ExposureType::Radiation,
            late_effect_category: "Pulmonar".to_string(),
            risk_level: RiskLevel::Moderate,
            recommendation_clinician: "PFTs basales. Repetir según indicación clínica. Riesgo \
                de fibrosis pulmonar."
                .to_string(),
            recommendation_patient: "La radioterapia en el tórax a veces puede endurecer los \
                pulmones. Recomendamos una prueba de respiración para establecer una base."
                .to_string(),
            test_modality: "PFTs (Espirometría + DLCO)".to_string(),
            start_time_condition: "Entrada en seguimiento".to_string(),
            interval: "Basal, luego según clínica".to_string(),
            evidence_strength: EvidenceLevel::High,
            criterion: Criterion::name_contains_any(["tórax", "pulmón", "tbi", "manto"]),
            notes: None,
        },
        // Platinum agents: ototoxicity
        GuidelineRule {
            id: "COG-22-Hearing".to_string(),
            guideline_source: GuidelineSource::CogV6,
            section_reference: "Sección 22".to_string(),
            exposure_type: ExposureType::Chemotherapy,
            late_effect_category: "Auditivo".to_string(),
            risk_level: RiskLevel::Moderate,
            recommendation_clinician: "Evaluación audiológica para pérdida auditiva de alta \
                frecuencia."
                .to_string(),
            recommendation_patient: "Medicinas como el cisplatino o carboplatino pueden afectar \
                la audición, especialmente los sonidos agudos. Las pruebas de audición regulares \
                son importantes."
                .to_string(),
            test_modality: "Audiometría (>8000Hz)".to_string(),
            start_time_condition: "Entrada en seguimiento".to_string(),
            interval: "Una vez, luego según indicación".to_string(),
            evidence_strength: EvidenceLevel::High,
            criterion: Criterion::name_contains_any(["cisplatino", "carboplatino"]),
            notes: None,
        },
        // Splenectomy: overwhelming post-splenectomy infection
        GuidelineRule {
            id: "COG-147-Splenectomy".to_string(),
            guideline_source: GuidelineSource::CogV6,
            section_reference: "Sección 147".to_string(),
            exposure_type: ExposureType::Surgery,
            late_effect_category: "Inmunológico".to_string(),
            risk_level: RiskLevel::High,
            recommendation_clinician: "Riesgo de infección fulminante post-esplenectomía. \
                Asegurar vacunas (Neumococo, Meningococo, Hib). Profilaxis antibiótica según guías."
                .to_string(),
            recommendation_patient: "Dado que se extirpó el bazo, tu cuerpo necesita ayuda extra \
                para combatir ciertas bacterias. Mantén las vacunas al día y acude al médico \
                inmediatamente si tienes fiebre."
                .to_string(),
            test_modality: "Revisión de Vacunación".to_string(),
            start_time_condition: "Inmediato".to_string(),
            interval: "Continuo".to_string(),
            evidence_strength: EvidenceLevel::High,
            criterion: Criterion::name_contains_any(["esplenectomía"]),
            notes: None,
        },
    ]
}

pub(super) fn default_vocabulary() -> Vocabulary {
    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    Vocabulary {
        chemotherapy: labels(&[
            "Doxorrubicina",
            "Daunorrubicina",
            "Epirrubicina",
            "Idarrubicina",
            "Mitoxantrona",
            "Cisplatino",
            "Carboplatino",
            "Ciclofosfamida",
            "Ifosfamida",
            "Metotrexato",
            "Bleomicina",
            "Vincristina",
            "Vinblastina",
            "Etopósido",
        ]),
        radiation: labels(&[
            "Irradiación Corporal Total (TBI)",
            "Craneal / Cerebro",
            "Cabeza y Cuello",
            "Manto / Mediastino / Tórax",
            "Axila",
            "Abdomen / Flanco",
            "Pelvis",
            "Columna",
            "Extremidad",
        ]),
        surgery: labels(&[
            "Esplenectomía",
            "Nefrectomía",
            "Amputación",
            "Toracotomía",
            "Laminectomía",
            "Ooforectomía",
            "Orquiectomía",
        ]),
        hsct: Vec::new(),
    }
}
