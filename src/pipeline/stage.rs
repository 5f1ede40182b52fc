//! Explicit stage machine for a single investigation.

use crate::error::TriageError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stages of an investigation, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Init,
    SignalsExtracted,
    Scored,
    ComplianceChecked,
    ComplianceSkipped,
    Summarized,
    Done,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::SignalsExtracted => "SIGNALS_EXTRACTED",
            Self::Scored => "SCORED",
            Self::ComplianceChecked => "COMPLIANCE_CHECKED",
            Self::ComplianceSkipped => "COMPLIANCE_SKIPPED",
            Self::Summarized => "SUMMARIZED",
            Self::Done => "DONE",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Done
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Enforces INIT -> SIGNALS_EXTRACTED -> SCORED -> {COMPLIANCE_CHECKED |
/// COMPLIANCE_SKIPPED} -> SUMMARIZED -> DONE.
///
/// Any out-of-order transition is an internal fault and aborts the case.
#[derive(Debug, Clone)]
pub struct StageMachine {
    case_id: String,
    stage: Stage,
}

impl StageMachine {
    pub fn new(case_id: impl Into<String>) -> Self {
        Self {
            case_id: case_id.into(),
            stage: Stage::Init,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn mark_signals_extracted(&mut self) -> Result<Stage, TriageError> {
        self.advance(&[Stage::Init], Stage::SignalsExtracted)
    }

    pub fn mark_scored(&mut self) -> Result<Stage, TriageError> {
        self.advance(&[Stage::SignalsExtracted], Stage::Scored)
    }

    pub fn mark_compliance_checked(&mut self) -> Result<Stage, TriageError> {
        self.advance(&[Stage::Scored], Stage::ComplianceChecked)
    }

    pub fn mark_compliance_skipped(&mut self) -> Result<Stage, TriageError> {
        self.advance(&[Stage::Scored], Stage::ComplianceSkipped)
    }

    pub fn mark_summarized(&mut self) -> Result<Stage, TriageError> {
        self.advance(
            &[Stage::ComplianceChecked, Stage::ComplianceSkipped],
            Stage::Summarized,
        )
    }

    pub fn mark_done(&mut self) -> Result<Stage, TriageError> {
        self.advance(&[Stage::Summarized], Stage::Done)
    }

    fn advance(&mut self, allowed_from: &[Stage], next: Stage) -> Result<Stage, TriageError> {
        if !allowed_from.contains(&self.stage) {
            let expected = allowed_from
                .iter()
                .map(|s| s.name())
                .collect::<Vec<_>>()
                .join("|");
            return Err(TriageError::stage_violation(
                &self.case_id,
                &expected,
                self.stage.name(),
            ));
        }
        self.stage = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enforces_checked_path() {
        let mut machine = StageMachine::new("case-a");
        assert!(machine.mark_signals_extracted().is_ok());
        assert!(machine.mark_scored().is_ok());
        assert!(machine.mark_compliance_checked().is_ok());
        assert!(machine.mark_summarized().is_ok());
        assert_eq!(machine.mark_done().unwrap(), Stage::Done);
        assert!(machine.stage().is_terminal());
    }

    #[test]
    fn test_enforces_skipped_path() {
        let mut machine = StageMachine::new("case-b");
        machine.mark_signals_extracted().unwrap();
        machine.mark_scored().unwrap();
        machine.mark_compliance_skipped().unwrap();
        machine.mark_summarized().unwrap();
        assert!(machine.mark_done().is_ok());
    }

    #[test]
    fn test_rejects_skipping_scoring() {
        let mut machine = StageMachine::new("case-c");
        machine.mark_signals_extracted().unwrap();

        let err = machine.mark_compliance_checked().unwrap_err();
        assert!(matches!(err, TriageError::Internal(_)));
        assert!(err
            .to_string()
            .contains("in case-c: expected 'SCORED', got 'SIGNALS_EXTRACTED'"));
    }

    #[test]
    fn test_rejects_reentry_after_done() {
        let mut machine = StageMachine::new("case-d");
        machine.mark_signals_extracted().unwrap();
        machine.mark_scored().unwrap();
        machine.mark_compliance_skipped().unwrap();
        machine.mark_summarized().unwrap();
        machine.mark_done().unwrap();

        assert!(machine.mark_signals_extracted().is_err());
        assert!(machine.mark_done().is_err());
    }
}
