//! External collaborators consulted by the pipeline.
//!
//! Both collaborators are optional to the outcome: the pipeline calls them
//! through [`call_bounded`] and falls back when they time out or fail, so
//! nothing here can abort a case.

pub mod bounded;
pub mod offline;
pub mod remote;

use crate::types::assessment::RiskAssessment;
use crate::types::case::ComplianceResult;
use crate::types::transaction::Transaction;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

pub use bounded::call_bounded;
pub use offline::{RuleBasedComplianceReviewer, TemplateNarrativeGenerator};
pub use remote::{NatsComplianceReviewer, NatsNarrativeGenerator};

/// Collaborator failures. Never leave the pipeline.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("invalid reply: {0}")]
    InvalidReply(String),

    #[error("task aborted: {0}")]
    Aborted(String),
}

/// Regulatory review of a suspicious transaction
#[async_trait]
pub trait ComplianceReviewer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn review(&self, evidence: &Transaction) -> Result<ComplianceResult, CollaboratorError>;
}

/// Human-readable case narrative
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, context: &NarrativeContext) -> Result<String, CollaboratorError>;
}

/// What the narrative collaborator gets to see about a case
#[derive(Debug, Clone, Serialize)]
pub struct NarrativeContext {
    pub case_id: String,
    pub evidence: Transaction,
    pub assessment: RiskAssessment,
    pub compliance_result: Option<ComplianceResult>,
    /// Whether compliance review ran at all
    pub compliance_reviewed: bool,
}
