//! Interpreter for catalog criteria
//!
//! Criteria are compiled once per engine: terms are case-folded up front, so evaluation
//! afterwards is total and allocation-free. Structure is checked by the catalog beforehand.

use crate::config::Criterion;
use crate::domain::patient::{Patient, Sex};

/// A criterion ready for evaluation
#[derive(Debug, Clone)]
pub enum CompiledCriterion {
    NameContainsAny(Vec<String>),
    PatientSex(Sex),
    AllOf(Vec<CompiledCriterion>),
    AnyOf(Vec<CompiledCriterion>),
}

impl CompiledCriterion {
    /// Compile a criterion that already passed `Criterion::check`
    pub fn compile(criterion: &Criterion) -> Self {
        match criterion {
            Criterion::NameContainsAny { terms } => {
                Self::NameContainsAny(terms.iter().map(|t| t.trim().to_lowercase()).collect())
            }
            Criterion::PatientSex { sex } => Self::PatientSex(*sex),
            Criterion::AllOf { criteria } => Self::AllOf(criteria.iter().map(Self::compile).collect()),
            Criterion::AnyOf { criteria } => Self::AnyOf(criteria.iter().map(Self::compile).collect()),
        }
    }

    /// Evaluate against an already lowercased exposure name
    pub fn evaluate(&self, normalized_name: &str, patient: &Patient) -> bool {
        match self {
            Self::NameContainsAny(terms) => {
                terms.iter().any(|term| normalized_name.contains(term.as_str()))
            }
            Self::PatientSex(sex) => patient.sex == *sex,
            Self::AllOf(criteria) => criteria.iter().all(|c| c.evaluate(normalized_name, patient)),
            Self::AnyOf(criteria) => criteria.iter().any(|c| c.evaluate(normalized_name, patient)),
        }
    }
}
