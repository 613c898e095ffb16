//! Plan assembly for SurvivorCare
//!
//! Architecture: Domain Services - The planner orchestrates the whole generation workflow
//! - Validates the request, runs matching, deduplication and ranking in that order
//! - Stamps the result with time, clinician and catalog fingerprint, then hands it off immutably
//! - Batches run in parallel; each request stays independent of the others

pub mod ranking;

use crate::config::RuleCatalog;
use crate::domain::patient::{validate_exposures, Exposure, Patient};
use crate::domain::plan::{CareResult, FollowUpPlan, PlanRequest};
use crate::matching::MatchingEngine;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Generates follow-up plans from one immutable rule catalog
#[derive(Debug)]
pub struct Planner {
    engine: MatchingEngine,
    /// Cached catalog fingerprint stamped on every plan
    fingerprint: String,
}

/// Options for batch generation
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Whether to generate plans on the rayon thread pool
    pub parallel: bool,
    /// Abort on the first failing request (in request order)
    pub fail_fast: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { parallel: true, fail_fast: false }
    }
}

/// Request that could not be planned
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    /// Position of the request in the batch
    pub index: usize,
    pub patient_id: String,
    pub message: String,
}

/// Outcome of a batch: successful plans and failures, each in request order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub plans: Vec<FollowUpPlan>,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

impl Planner {
    /// Build a planner; a defective catalog rule aborts construction
    pub fn new(catalog: RuleCatalog) -> CareResult<Self> {
        let fingerprint = catalog.fingerprint();
        let engine = MatchingEngine::new(catalog)?;
        Ok(Self { engine, fingerprint })
    }

    /// Planner over the built-in catalog
    pub fn with_defaults() -> CareResult<Self> {
        Self::new(RuleCatalog::default())
    }

    pub fn catalog(&self) -> &RuleCatalog {
        self.engine.catalog()
    }

    pub fn catalog_fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Generate a plan stamped with the current time
    pub fn generate(
        &self,
        patient: &Patient,
        exposures: &[Exposure],
        clinician_name: &str,
    ) -> CareResult<FollowUpPlan> {
        self.generate_at(patient, exposures, clinician_name, Utc::now())
    }

    /// Generate a plan stamped with an explicit time.
    ///
    /// Input is validated before any rule is evaluated. Identical inputs always produce the
    /// same recommendations in the same order; only ids and the timestamp differ.
    pub fn generate_at(
        &self,
        patient: &Patient,
        exposures: &[Exposure],
        clinician_name: &str,
        generated_at: DateTime<Utc>,
    ) -> CareResult<FollowUpPlan> {
        patient.validate()?;
        validate_exposures(exposures)?;

        let vocabulary = self.catalog().vocabulary();
        for exposure in exposures {
            if !vocabulary.is_empty() && !vocabulary.contains(exposure) {
                tracing::debug!(
                    "Exposure '{}' uses non-canonical {} label '{}'",
                    exposure.id,
                    exposure.exposure_type,
                    exposure.name
                );
            }
        }

        let matches = self.engine.find_matches(patient, exposures);
        let mut recommendations = ranking::deduplicate(&matches);
        ranking::rank(&mut recommendations);

        tracing::info!(
            "Generated plan for patient '{}': {} exposures, {} raw matches, {} recommendations",
            patient.id,
            exposures.len(),
            matches.len(),
            recommendations.len()
        );

        Ok(FollowUpPlan::assemble(
            patient.clone(),
            exposures.to_vec(),
            recommendations,
            generated_at,
            clinician_name,
            Some(self.fingerprint.clone()),
        ))
    }

    pub fn generate_request(
        &self,
        request: &PlanRequest,
        clinician_name: &str,
    ) -> CareResult<FollowUpPlan> {
        self.generate(&request.patient, &request.exposures, clinician_name)
    }

    /// Generate plans for many requests
    pub fn generate_batch(
        &self,
        requests: &[PlanRequest],
        clinician_name: &str,
        options: &BatchOptions,
    ) -> CareResult<BatchReport> {
        let results: Vec<CareResult<FollowUpPlan>> = if options.parallel && requests.len() > 1 {
            requests
                .par_iter()
                .map(|request| self.generate_request(request, clinician_name))
                .collect()
        } else {
            requests
                .iter()
                .map(|request| self.generate_request(request, clinician_name))
                .collect()
        };

        let mut report = BatchReport::default();
        for (index, (request, result)) in requests.iter().zip(results).enumerate() {
            match result {
                Ok(plan) => report.plans.push(plan),
                Err(e) => {
                    if options.fail_fast {
                        tracing::error!(
                            "Batch request {} (patient '{}') failed; aborting batch",
                            index,
                            request.patient.id
                        );
                        return Err(e);
                    }
                    tracing::warn!(
                        "Skipping batch request {} (patient '{}'): {}",
                        index,
                        request.patient.id,
                        e
                    );
                    report.failures.push(BatchFailure {
                        index,
                        patient_id: request.patient.id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}
