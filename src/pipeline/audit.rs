//! Append-only audit trail of stage completions

use super::stage::Stage;
use serde::Serialize;
use std::fmt;

/// How a stage completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Completed,
    /// Stage intentionally not executed
    Skipped,
    /// Stage ran on fallback input or content (unusable baseline spread,
    /// collaborator timeout or fault)
    Degraded,
}

impl AuditOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Skipped => "skipped",
            Self::Degraded => "degraded",
        }
    }
}

/// One stage-completion record. Serialized as its display line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "String")]
pub struct AuditEntry {
    pub stage: Stage,
    pub actor: &'static str,
    pub outcome: AuditOutcome,
    pub detail: String,
}

impl AuditEntry {
    pub fn completed(stage: Stage, actor: &'static str, detail: impl Into<String>) -> Self {
        Self {
            stage,
            actor,
            outcome: AuditOutcome::Completed,
            detail: detail.into(),
        }
    }

    pub fn skipped(stage: Stage, actor: &'static str, detail: impl Into<String>) -> Self {
        Self {
            stage,
            actor,
            outcome: AuditOutcome::Skipped,
            detail: detail.into(),
        }
    }

    pub fn degraded(stage: Stage, actor: &'static str, detail: impl Into<String>) -> Self {
        Self {
            stage,
            actor,
            outcome: AuditOutcome::Degraded,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.stage,
            self.actor,
            self.detail,
            self.outcome.as_str()
        )
    }
}

impl From<AuditEntry> for String {
    fn from(entry: AuditEntry) -> Self {
        entry.to_string()
    }
}

/// Ordered stage records. Entries can only be appended; nothing exposes a
/// mutable view of what was already recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AuditTrail {
    entries: Vec<AuditEntry>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: AuditEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stages in the order they were recorded
    pub fn stages(&self) -> Vec<Stage> {
        self.entries.iter().map(|e| e.stage).collect()
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_keep_append_order() {
        let mut trail = AuditTrail::new();
        trail.append(AuditEntry::completed(
            Stage::SignalsExtracted,
            "EvidenceCollector",
            "received transaction",
        ));
        trail.append(AuditEntry::skipped(
            Stage::ComplianceSkipped,
            "ComplianceRadar",
            "low risk",
        ));

        assert_eq!(trail.len(), 2);
        assert_eq!(
            trail.stages(),
            vec![Stage::SignalsExtracted, Stage::ComplianceSkipped]
        );
        assert_eq!(
            trail.lines()[1],
            "[COMPLIANCE_SKIPPED] ComplianceRadar: low risk (skipped)"
        );
    }

    #[test]
    fn test_serializes_as_strings() {
        let mut trail = AuditTrail::new();
        trail.append(AuditEntry::degraded(
            Stage::ComplianceChecked,
            "ComplianceRadar",
            "offline: timed out",
        ));

        let json = serde_json::to_value(&trail).unwrap();
        assert_eq!(
            json,
            serde_json::json!(["[COMPLIANCE_CHECKED] ComplianceRadar: offline: timed out (degraded)"])
        );
    }
}
