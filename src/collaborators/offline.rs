//! Offline collaborators that need no network: a rule-based compliance
//! reviewer and a deterministic narrative template.

use super::{CollaboratorError, ComplianceReviewer, NarrativeContext, NarrativeGenerator};
use crate::config::CollaboratorConfig;
use crate::types::assessment::VelocityRule;
use crate::types::case::ComplianceResult;
use crate::types::transaction::Transaction;
use async_trait::async_trait;

/// Flags transfers above a fixed amount limit.
#[derive(Debug, Clone)]
pub struct RuleBasedComplianceReviewer {
    amount_limit: f64,
    source: String,
}

impl RuleBasedComplianceReviewer {
    pub fn new(amount_limit: f64, source: impl Into<String>) -> Self {
        Self {
            amount_limit,
            source: source.into(),
        }
    }

    pub fn from_config(config: &CollaboratorConfig) -> Self {
        Self::new(config.compliance_amount_limit, config.compliance_source.clone())
    }

    pub fn assess(&self, evidence: &Transaction) -> ComplianceResult {
        let is_compliant = evidence.amount <= self.amount_limit;
        ComplianceResult {
            is_compliant,
            violation_reason: (!is_compliant).then(|| {
                format!(
                    "amount {:.2} exceeds cross-border scrutiny limit {:.2}",
                    evidence.amount, self.amount_limit
                )
            }),
            source: self.source.clone(),
        }
    }
}

#[async_trait]
impl ComplianceReviewer for RuleBasedComplianceReviewer {
    fn name(&self) -> &'static str {
        "rule-based"
    }

    async fn review(&self, evidence: &Transaction) -> Result<ComplianceResult, CollaboratorError> {
        Ok(self.assess(evidence))
    }
}

/// Deterministic narrative built only from fields already on the case.
///
/// The pipeline also uses [`TemplateNarrativeGenerator::render`] directly as
/// the fallback summary when another generator fails.
#[derive(Debug, Clone, Default)]
pub struct TemplateNarrativeGenerator;

impl TemplateNarrativeGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn render(context: &NarrativeContext) -> String {
        let assessment = &context.assessment;
        let reasoning = &assessment.reasoning;

        if !assessment.is_suspicious {
            return format!(
                "Automated triage: low risk (score {:.2}, action {}). No further analysis required. [{}]",
                assessment.fuzzy_score, assessment.action, reasoning
            );
        }

        let velocity = match reasoning.velocity_rule {
            VelocityRule::None => "no velocity rule fired".to_string(),
            VelocityRule::ImpossibleTravel => format!(
                "impossible travel {} -> {} within {:.2}h",
                reasoning.from_location, reasoning.to_location, reasoning.elapsed_hours
            ),
            VelocityRule::HighRiskJurisdiction => format!(
                "destination {} is a high-risk jurisdiction",
                reasoning.to_location
            ),
            VelocityRule::Both => format!(
                "impossible travel {} -> {} within {:.2}h into a high-risk jurisdiction",
                reasoning.from_location, reasoning.to_location, reasoning.elapsed_hours
            ),
        };

        let compliance = match (&context.compliance_result, context.compliance_reviewed) {
            (Some(result), _) if result.is_compliant => {
                format!("compliant per {}", result.source)
            }
            (Some(result), _) => format!(
                "non-compliant per {} ({})",
                result.source,
                result.violation_reason.as_deref().unwrap_or("no reason given")
            ),
            (None, true) => "review unavailable".to_string(),
            (None, false) => "scan skipped".to_string(),
        };

        format!(
            "HIGH RISK: case {}\n\
             Fuzzy risk score {:.2} (threshold exceeded).\n\
             1. Statistical anomaly: z-score {:.2} (membership {:.2}, weight {:.2}).\n\
             2. Velocity: {} (membership {:.2}, weight {:.2}).\n\
             3. Regulatory grounding: {}.\n\
             Recommendation: {} ({}).",
            context.case_id,
            assessment.fuzzy_score,
            reasoning.z_score,
            reasoning.z_membership,
            reasoning.z_weight,
            velocity,
            reasoning.vel_membership,
            reasoning.vel_weight,
            compliance,
            assessment.action.recommendation(),
            assessment.action,
        )
    }
}

#[async_trait]
impl NarrativeGenerator for TemplateNarrativeGenerator {
    fn name(&self) -> &'static str {
        "template"
    }

    async fn generate(&self, context: &NarrativeContext) -> Result<String, CollaboratorError> {
        Ok(Self::render(context))
    }
}
