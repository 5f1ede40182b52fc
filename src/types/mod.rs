//! Type definitions for the triage pipeline

pub mod assessment;
pub mod case;
pub mod transaction;

pub use assessment::{ActionCutoffs, Reasoning, RiskAction, RiskAssessment, RiskSignals, VelocityRule};
pub use case::{ComplianceResult, InvestigationCase};
pub use transaction::{BaselineProfile, Transaction, TriageRequest, ValidatedRequest};
