//! Matching engine pairing exposures with guideline rules
//!
//! Architectural Principle: Service Layer - Matching evaluates every candidate (exposure, rule) pair
//! - Rules are partitioned by exposure type once, when the engine is built
//! - Each criterion is compiled into an interpreter that cannot fail at evaluation time
//! - Raw matches are returned unfiltered; collapsing them is the planner's job

pub mod criterion;

use crate::config::{GuidelineRule, RuleCatalog};
use crate::domain::patient::{Exposure, ExposureType, Patient};
use crate::domain::plan::CareResult;
use std::collections::HashMap;

pub use criterion::CompiledCriterion;

/// Evaluates criteria from an immutable rule catalog
#[derive(Debug)]
pub struct MatchingEngine {
    catalog: RuleCatalog,
    /// Compiled criteria, parallel to `catalog.rules()`
    compiled: Vec<CompiledCriterion>,
    /// Rule indices per exposure type, in catalog order
    by_type: HashMap<ExposureType, Vec<usize>>,
}

/// One rule whose criterion held for one exposure
#[derive(Debug, Clone, Copy)]
pub struct RuleMatch<'a> {
    pub rule: &'a GuidelineRule,
    pub exposure: &'a Exposure,
    /// Position of the exposure in the caller's list
    pub exposure_index: usize,
}

impl MatchingEngine {
    /// Compile every rule of the catalog; a defective rule aborts construction
    pub fn new(catalog: RuleCatalog) -> CareResult<Self> {
        // Catalogs can be deserialized directly, so structure is validated here once
        catalog.validate()?;

        let mut compiled = Vec::with_capacity(catalog.len());
        let mut by_type: HashMap<ExposureType, Vec<usize>> = HashMap::new();

        for (index, rule) in catalog.rules().iter().enumerate() {
            tracing::debug!(
                "Compiling rule '{}' for {} exposures: {}",
                rule.id,
                rule.exposure_type,
                rule.criterion.describe()
            );

            compiled.push(CompiledCriterion::compile(&rule.criterion));
            by_type.entry(rule.exposure_type).or_default().push(index);
        }

        Ok(Self { catalog, compiled, by_type })
    }

    /// Engine over the built-in catalog
    pub fn with_defaults() -> CareResult<Self> {
        Self::new(RuleCatalog::default())
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// Number of rules that can fire for a given exposure type
    pub fn candidate_count(&self, exposure_type: ExposureType) -> usize {
        self.by_type.get(&exposure_type).map_or(0, Vec::len)
    }

    /// All (rule, exposure) pairs whose criterion holds.
    ///
    /// Output order is exposure order, then catalog order. A rule may appear once per
    /// exposure that satisfies it; an empty result is valid.
    pub fn find_matches<'a>(
        &'a self,
        patient: &Patient,
        exposures: &'a [Exposure],
    ) -> Vec<RuleMatch<'a>> {
        let mut matches = Vec::new();

        for (exposure_index, exposure) in exposures.iter().enumerate() {
            let Some(candidates) = self.by_type.get(&exposure.exposure_type) else {
                tracing::debug!(
                    "No rules for {} exposure '{}'",
                    exposure.exposure_type,
                    exposure.name
                );
                continue;
            };

            let normalized = exposure.normalized_name();
            for &rule_index in candidates {
                if self.compiled[rule_index].evaluate(&normalized, patient) {
                    let rule = &self.catalog.rules()[rule_index];
                    tracing::debug!("Rule '{}' matched exposure '{}'", rule.id, exposure.id);
                    matches.push(RuleMatch { rule, exposure, exposure_index });
                }
            }
        }

        matches
    }
}
