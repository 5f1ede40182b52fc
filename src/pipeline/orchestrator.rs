//! Investigation pipeline: sequences extraction, scoring, conditional
//! compliance review, and summarization into one immutable case.

use super::audit::{AuditEntry, AuditTrail};
use super::stage::{Stage, StageMachine};
use crate::collaborators::{
    call_bounded, ComplianceReviewer, NarrativeContext, NarrativeGenerator,
    RuleBasedComplianceReviewer, TemplateNarrativeGenerator,
};
use crate::config::{CollaboratorConfig, DetectionPolicy, PipelineConfig};
use crate::error::{Result, TriageError};
use crate::scoring::FuzzyRiskEngine;
use crate::signals::RiskSignalExtractor;
use crate::types::assessment::{RiskAssessment, RiskSignals};
use crate::types::case::{CaseParts, ComplianceResult, InvestigationCase};
use crate::types::transaction::{BaselineProfile, Transaction, TriageRequest, ValidatedRequest};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const EVIDENCE_ACTOR: &str = "EvidenceCollector";
const SCORING_ACTOR: &str = "FuzzyRiskEngine";
const COMPLIANCE_ACTOR: &str = "ComplianceRadar";
const NARRATIVE_ACTOR: &str = "NarrativeCopilot";

/// Stateless across calls; safe to share behind an `Arc` between workers.
pub struct InvestigationPipeline {
    extractor: RiskSignalExtractor,
    engine: FuzzyRiskEngine,
    compliance: Arc<dyn ComplianceReviewer>,
    narrative: Arc<dyn NarrativeGenerator>,
    options: PipelineConfig,
}

impl InvestigationPipeline {
    /// Build a pipeline with offline collaborators
    pub fn new(policy: DetectionPolicy, options: PipelineConfig) -> Result<Self> {
        let engine = FuzzyRiskEngine::new(policy.clone())?;
        Ok(Self {
            extractor: RiskSignalExtractor::new(policy),
            engine,
            compliance: Arc::new(RuleBasedComplianceReviewer::from_config(
                &CollaboratorConfig::default(),
            )),
            narrative: Arc::new(TemplateNarrativeGenerator::new()),
            options,
        })
    }

    pub fn with_compliance_reviewer(mut self, reviewer: Arc<dyn ComplianceReviewer>) -> Self {
        self.compliance = reviewer;
        self
    }

    pub fn with_narrative_generator(mut self, generator: Arc<dyn NarrativeGenerator>) -> Self {
        self.narrative = generator;
        self
    }

    /// Validate a wire request, then investigate it
    pub async fn investigate_request(&self, request: TriageRequest) -> Result<InvestigationCase> {
        self.investigate(request.validate()?).await
    }

    /// Run every stage and return the finished case.
    ///
    /// Validation errors are returned before any stage runs. Any fault after
    /// that aborts the whole case; collaborator failures are not faults.
    pub async fn investigate(&self, request: ValidatedRequest) -> Result<InvestigationCase> {
        request.transaction.validate()?;
        request.baseline.validate()?;

        let case_id = request
            .case_id
            .unwrap_or_else(|| format!("CASE-{}", uuid::Uuid::new_v4()));

        match self
            .run(case_id.clone(), request.transaction, request.baseline)
            .await
        {
            Ok(case) => {
                info!(
                    case_id = %case.id(),
                    fuzzy_score = case.assessment().fuzzy_score,
                    action = %case.action(),
                    is_suspicious = case.is_suspicious(),
                    "Investigation complete"
                );
                Ok(case)
            }
            Err(e) => {
                error!(case_id = %case_id, error = %e, "Investigation aborted");
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        case_id: String,
        evidence: Transaction,
        baseline: BaselineProfile,
    ) -> Result<InvestigationCase> {
        let opened_at = Utc::now();
        let mut machine = StageMachine::new(case_id.clone());
        let mut trail = AuditTrail::new();

        // INIT -> SIGNALS_EXTRACTED
        let signals = self.extractor.extract(&evidence, &baseline);
        let stage = machine.mark_signals_extracted()?;
        trail.append(evidence_entry(stage, &evidence, &signals));
        debug!(case_id = %case_id, stage = %stage, z_score = signals.z_score, "Signals extracted");

        // SIGNALS_EXTRACTED -> SCORED
        let assessment = self.engine.score(&signals);
        let stage = machine.mark_scored()?;
        trail.append(AuditEntry::completed(
            stage,
            SCORING_ACTOR,
            format!(
                "action={}, suspicious={}, score={:.2} [{}]",
                assessment.action, assessment.is_suspicious, assessment.fuzzy_score, assessment.reasoning
            ),
        ));
        debug!(case_id = %case_id, stage = %stage, fuzzy_score = assessment.fuzzy_score, "Scored");

        // SCORED -> COMPLIANCE_CHECKED | COMPLIANCE_SKIPPED
        let (compliance_result, compliance_reviewed) =
            self.compliance_stage(&mut machine, &mut trail, &evidence, &assessment)
                .await?;

        // -> SUMMARIZED
        let context = NarrativeContext {
            case_id: case_id.clone(),
            evidence: evidence.clone(),
            assessment: assessment.clone(),
            compliance_result: compliance_result.clone(),
            compliance_reviewed,
        };
        let summary = self.narrative_stage(&mut machine, &mut trail, context).await?;

        // SUMMARIZED -> DONE
        machine.mark_done()?;
        if trail.is_empty() || summary.is_empty() {
            return Err(TriageError::Internal(format!(
                "case {} reached DONE incomplete",
                case_id
            )));
        }

        Ok(InvestigationCase::freeze(CaseParts {
            id: case_id,
            opened_at,
            evidence,
            baseline,
            signals,
            assessment,
            compliance_result,
            audit_trail: trail,
            summary,
        }))
    }

    async fn compliance_stage(
        &self,
        machine: &mut StageMachine,
        trail: &mut AuditTrail,
        evidence: &Transaction,
        assessment: &RiskAssessment,
    ) -> Result<(Option<ComplianceResult>, bool)> {
        if !assessment.is_suspicious {
            let stage = machine.mark_compliance_skipped()?;
            trail.append(AuditEntry::skipped(stage, COMPLIANCE_ACTOR, "low risk"));
            return Ok((None, false));
        }
        if self.options.skip_compliance {
            let stage = machine.mark_compliance_skipped()?;
            trail.append(AuditEntry::skipped(
                stage,
                COMPLIANCE_ACTOR,
                "disabled by configuration",
            ));
            return Ok((None, false));
        }

        let reviewer = Arc::clone(&self.compliance);
        let reviewer_name = reviewer.name();
        let owned_evidence = evidence.clone();
        let outcome = call_bounded(self.options.collaborator_timeout(), async move {
            reviewer.review(&owned_evidence).await
        })
        .await;

        let stage = machine.mark_compliance_checked()?;
        match outcome {
            Ok(result) => {
                trail.append(AuditEntry::completed(
                    stage,
                    COMPLIANCE_ACTOR,
                    format!(
                        "regulatory check via {} complete, compliant={} (source: {})",
                        reviewer_name, result.is_compliant, result.source
                    ),
                ));
                Ok((Some(result), true))
            }
            Err(e) => {
                warn!(
                    stage = %stage,
                    reviewer = reviewer_name,
                    error = %e,
                    "Compliance review degraded, continuing without result"
                );
                trail.append(AuditEntry::degraded(
                    stage,
                    COMPLIANCE_ACTOR,
                    format!("offline ({}), proceeding without compliance result", e),
                ));
                Ok((None, true))
            }
        }
    }

    async fn narrative_stage(
        &self,
        machine: &mut StageMachine,
        trail: &mut AuditTrail,
        context: NarrativeContext,
    ) -> Result<String> {
        if self.options.skip_narrative {
            let stage = machine.mark_summarized()?;
            trail.append(AuditEntry::skipped(
                stage,
                NARRATIVE_ACTOR,
                "narrative disabled by configuration, canned summary used",
            ));
            return Ok(TemplateNarrativeGenerator::render(&context));
        }

        let generator = Arc::clone(&self.narrative);
        let generator_name = generator.name();
        let owned_context = context.clone();
        let outcome = call_bounded(self.options.collaborator_timeout(), async move {
            generator.generate(&owned_context).await
        })
        .await;

        let stage = machine.mark_summarized()?;
        match outcome {
            Ok(summary) if !summary.trim().is_empty() => {
                trail.append(AuditEntry::completed(
                    stage,
                    NARRATIVE_ACTOR,
                    format!("summary generated via {}", generator_name),
                ));
                Ok(summary)
            }
            Ok(_) => {
                warn!(stage = %stage, generator = generator_name, "Empty narrative, using canned summary");
                trail.append(AuditEntry::degraded(
                    stage,
                    NARRATIVE_ACTOR,
                    "skipped-on-error (empty narrative), canned summary used",
                ));
                Ok(TemplateNarrativeGenerator::render(&context))
            }
            Err(e) => {
                warn!(
                    stage = %stage,
                    generator = generator_name,
                    error = %e,
                    "Narrative generation degraded, using canned summary"
                );
                trail.append(AuditEntry::degraded(
                    stage,
                    NARRATIVE_ACTOR,
                    format!("skipped-on-error ({}), canned summary used", e),
                ));
                Ok(TemplateNarrativeGenerator::render(&context))
            }
        }
    }
}

fn evidence_entry(stage: Stage, evidence: &Transaction, signals: &RiskSignals) -> AuditEntry {
    let mut detail = format!(
        "received {} of {:.2} at {}",
        evidence.kind, evidence.amount, evidence.location
    );
    let mut degraded = false;
    if signals.std_fallback_applied {
        degraded = true;
        detail.push_str(&format!(
            "; baseline std unusable, fallback {:.2} applied",
            signals.effective_std
        ));
    }
    if signals.has_clock_anomaly() {
        detail.push_str(&format!(
            "; baseline newer than transaction by {:.2}h",
            -signals.elapsed_hours
        ));
    }

    if degraded {
        AuditEntry::degraded(stage, EVIDENCE_ACTOR, detail)
    } else {
        AuditEntry::completed(stage, EVIDENCE_ACTOR, detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::CollaboratorError;
    use crate::pipeline::audit::AuditOutcome;
    use crate::types::assessment::RiskAction;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct SlowReviewer;

    #[async_trait]
    impl ComplianceReviewer for SlowReviewer {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn review(&self, _evidence: &Transaction) -> std::result::Result<ComplianceResult, CollaboratorError> {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            Err(CollaboratorError::Unavailable("unreachable".to_string()))
        }
    }

    struct CountingReviewer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ComplianceReviewer for CountingReviewer {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn review(&self, _evidence: &Transaction) -> std::result::Result<ComplianceResult, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ComplianceResult {
                is_compliant: true,
                violation_reason: None,
                source: "test-source".to_string(),
            })
        }
    }

    struct LateReviewer {
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl ComplianceReviewer for LateReviewer {
        fn name(&self) -> &'static str {
            "late"
        }

        async fn review(&self, _evidence: &Transaction) -> std::result::Result<ComplianceResult, CollaboratorError> {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            self.finished.store(true, Ordering::SeqCst);
            Err(CollaboratorError::Unavailable("too late".to_string()))
        }
    }

    struct FailingNarrative;

    #[async_trait]
    impl NarrativeGenerator for FailingNarrative {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn generate(&self, _context: &NarrativeContext) -> std::result::Result<String, CollaboratorError> {
            Err(CollaboratorError::Unavailable("model quota exhausted".to_string()))
        }
    }

    fn baseline() -> BaselineProfile {
        let t = Utc.with_ymd_and_hms(2026, 2, 4, 10, 0, 0).unwrap();
        BaselineProfile::new(1000.0, 500.0, "Dubai", t)
    }

    fn request(amount: f64, location: &str, hours_after: i64) -> ValidatedRequest {
        let b = baseline();
        ValidatedRequest {
            case_id: Some("CASE-TEST".to_string()),
            transaction: Transaction::new(amount, location, b.last_time + Duration::hours(hours_after)),
            baseline: b,
        }
    }

    fn pipeline() -> InvestigationPipeline {
        InvestigationPipeline::new(DetectionPolicy::default(), PipelineConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_low_risk_skips_compliance() {
        let reviewer = Arc::new(CountingReviewer {
            calls: AtomicUsize::new(0),
        });
        let case = pipeline()
            .with_compliance_reviewer(reviewer.clone())
            .investigate(request(1100.0, "Dubai", 1))
            .await
            .unwrap();

        assert!(!case.is_suspicious());
        assert_eq!(case.action(), RiskAction::Clear);
        assert!(case.compliance_result().is_none());
        assert_eq!(reviewer.calls.load(Ordering::SeqCst), 0);

        let stages: Vec<Stage> = case.audit_trail().iter().map(|e| e.stage).collect();
        assert_eq!(
            stages,
            vec![
                Stage::SignalsExtracted,
                Stage::Scored,
                Stage::ComplianceSkipped,
                Stage::Summarized
            ]
        );
        assert_eq!(case.audit_trail()[2].outcome, AuditOutcome::Skipped);
        assert!(case.audit_trail()[2].detail.contains("low risk"));
        assert!(!case.summary().is_empty());
    }

    #[tokio::test]
    async fn test_suspicious_runs_compliance() {
        let reviewer = Arc::new(CountingReviewer {
            calls: AtomicUsize::new(0),
        });
        let case = pipeline()
            .with_compliance_reviewer(reviewer.clone())
            .investigate(request(50_000.0, "London", 2))
            .await
            .unwrap();

        assert!(case.is_suspicious());
        assert_eq!(case.action(), RiskAction::Freeze);
        assert_eq!(reviewer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(case.compliance_result().unwrap().source, "test-source");
        assert_eq!(case.audit_trail()[2].stage, Stage::ComplianceChecked);
        assert_eq!(case.audit_trail()[2].outcome, AuditOutcome::Completed);
        assert!(case.summary().contains("compliant per test-source"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_compliance_timeout_fails_open() {
        let options = PipelineConfig {
            collaborator_timeout_ms: 250,
            ..PipelineConfig::default()
        };
        let pipeline = InvestigationPipeline::new(DetectionPolicy::default(), options)
            .unwrap()
            .with_compliance_reviewer(Arc::new(SlowReviewer));

        let started = tokio::time::Instant::now();
        let case = pipeline
            .investigate(request(50_000.0, "London", 2))
            .await
            .unwrap();

        assert!(started.elapsed() < std::time::Duration::from_secs(1));
        assert!(case.is_suspicious());
        assert!(case.compliance_result().is_none());
        let entry = &case.audit_trail()[2];
        assert_eq!(entry.stage, Stage::ComplianceChecked);
        assert_eq!(entry.outcome, AuditOutcome::Degraded);
        assert!(entry.detail.contains("offline"));
        assert!(case.summary().contains("review unavailable"));
        assert_eq!(case.audit_trail().len(), 4);
    }

    #[tokio::test]
    async fn test_narrative_failure_uses_canned_summary() {
        let case = pipeline()
            .with_narrative_generator(Arc::new(FailingNarrative))
            .investigate(request(1100.0, "Dubai", 1))
            .await
            .unwrap();

        assert!(case.summary().starts_with("Automated triage: low risk"));
        let entry = &case.audit_trail()[3];
        assert_eq!(entry.stage, Stage::Summarized);
        assert_eq!(entry.outcome, AuditOutcome::Degraded);
        assert!(entry.detail.contains("skipped-on-error"));
    }

    #[tokio::test]
    async fn test_skip_compliance_by_configuration() {
        let options = PipelineConfig {
            skip_compliance: true,
            skip_narrative: true,
            ..PipelineConfig::default()
        };
        let reviewer = Arc::new(CountingReviewer {
            calls: AtomicUsize::new(0),
        });
        let case = InvestigationPipeline::new(DetectionPolicy::default(), options)
            .unwrap()
            .with_compliance_reviewer(reviewer.clone())
            .investigate(request(50_000.0, "London", 2))
            .await
            .unwrap();

        assert!(case.is_suspicious());
        assert_eq!(reviewer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(case.audit_trail()[2].stage, Stage::ComplianceSkipped);
        assert!(case.audit_trail()[2].detail.contains("disabled"));
        assert_eq!(case.audit_trail()[3].outcome, AuditOutcome::Skipped);
        assert!(case.summary().contains("scan skipped"));
    }

    #[tokio::test]
    async fn test_degraded_baseline_is_annotated() {
        let mut req = request(1003.0, "Dubai", 1);
        req.baseline.std_amount = 0.0;

        let case = pipeline().investigate(req).await.unwrap();

        assert!(case.signals().z_score.is_finite());
        assert!(case.assessment().reasoning.std_fallback_applied);
        assert_eq!(case.audit_trail()[0].outcome, AuditOutcome::Degraded);
        assert!(case.audit_trail()[0].detail.contains("fallback 1.00"));
    }

    #[tokio::test]
    async fn test_invalid_input_produces_no_case() {
        let mut req = request(100.0, "Dubai", 1);
        req.transaction.amount = f64::NAN;

        let err = pipeline().investigate(req).await.unwrap_err();
        assert!(matches!(err, TriageError::Validation(_)));
    }

    #[tokio::test]
    async fn test_repeat_runs_score_identically() {
        let pipeline = pipeline();
        let first = pipeline.investigate(request(4000.0, "London", 1)).await.unwrap();
        let second = pipeline.investigate(request(4000.0, "London", 1)).await.unwrap();

        assert_eq!(first.assessment(), second.assessment());
        assert_eq!(first.is_suspicious(), second.is_suspicious());
        assert_eq!(first.summary(), second.summary());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_investigation_stops_collaborators() {
        let finished = Arc::new(AtomicBool::new(false));
        let options = PipelineConfig {
            collaborator_timeout_ms: 10_000,
            ..PipelineConfig::default()
        };
        let pipeline = InvestigationPipeline::new(DetectionPolicy::default(), options)
            .unwrap()
            .with_compliance_reviewer(Arc::new(LateReviewer {
                finished: finished.clone(),
            }));

        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            pipeline.investigate(request(50_000.0, "London", 2)),
        )
        .await;
        assert!(outcome.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_clock_anomaly_is_recorded() {
        let case = pipeline()
            .investigate(request(1100.0, "London", -3))
            .await
            .unwrap();

        assert!(case.signals().elapsed_hours < 0.0);
        assert!(case.assessment().reasoning.clock_anomaly);
        assert!(case.assessment().reasoning.to_string().contains("clock_anomaly"));
        assert!(case.signals().impossible_travel);
        assert!(case.audit_trail()[0]
            .detail
            .contains("baseline newer than transaction by 3.00h"));
    }
}
