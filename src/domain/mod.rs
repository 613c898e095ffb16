//! Domain layer containing the survivorship planning model
//!
//! Architecture: Domain-Driven Design - Pure business logic without infrastructure dependencies

pub mod patient;
pub mod plan;

pub use patient::{Exposure, ExposureType, Patient, Sex};
pub use plan::{
    CareError, CareResult, EvidenceLevel, FollowUpPlan, FollowUpRecommendation, PlanRequest,
    RiskCounts, RiskLevel,
};
