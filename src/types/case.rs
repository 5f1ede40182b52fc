//! Investigation case handed back to the caller

use crate::pipeline::audit::{AuditEntry, AuditTrail};
use crate::types::assessment::{RiskAction, RiskAssessment, RiskSignals};
use crate::types::transaction::{BaselineProfile, Transaction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of the external compliance review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceResult {
    pub is_compliant: bool,
    #[serde(default)]
    pub violation_reason: Option<String>,
    /// Regulatory source the review was grounded on
    #[serde(alias = "grounding_source")]
    pub source: String,
}

/// A completed investigation.
///
/// Only the pipeline builds cases, and only once every stage has run, so a
/// value of this type is always complete. Fields are read-only.
#[derive(Debug, Clone, Serialize)]
pub struct InvestigationCase {
    id: String,
    opened_at: DateTime<Utc>,
    is_suspicious: bool,
    evidence: Transaction,
    baseline: BaselineProfile,
    signals: RiskSignals,
    assessment: RiskAssessment,
    #[serde(skip_serializing_if = "Option::is_none")]
    compliance_result: Option<ComplianceResult>,
    audit_trail: AuditTrail,
    summary: String,
}

/// Everything gathered for a case before it is frozen
pub(crate) struct CaseParts {
    pub id: String,
    pub opened_at: DateTime<Utc>,
    pub evidence: Transaction,
    pub baseline: BaselineProfile,
    pub signals: RiskSignals,
    pub assessment: RiskAssessment,
    pub compliance_result: Option<ComplianceResult>,
    pub audit_trail: AuditTrail,
    pub summary: String,
}

impl InvestigationCase {
    pub(crate) fn freeze(parts: CaseParts) -> Self {
        Self {
            id: parts.id,
            opened_at: parts.opened_at,
            is_suspicious: parts.assessment.is_suspicious,
            evidence: parts.evidence,
            baseline: parts.baseline,
            signals: parts.signals,
            assessment: parts.assessment,
            compliance_result: parts.compliance_result,
            audit_trail: parts.audit_trail,
            summary: parts.summary,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn is_suspicious(&self) -> bool {
        self.is_suspicious
    }

    pub fn evidence(&self) -> &Transaction {
        &self.evidence
    }

    pub fn baseline(&self) -> &BaselineProfile {
        &self.baseline
    }

    pub fn signals(&self) -> &RiskSignals {
        &self.signals
    }

    pub fn assessment(&self) -> &RiskAssessment {
        &self.assessment
    }

    pub fn action(&self) -> RiskAction {
        self.assessment.action
    }

    pub fn compliance_result(&self) -> Option<&ComplianceResult> {
        self.compliance_result.as_ref()
    }

    pub fn audit_trail(&self) -> &[AuditEntry] {
        self.audit_trail.entries()
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }
}
