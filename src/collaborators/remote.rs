//! NATS request/reply adapters for remotely hosted collaborators

use super::{CollaboratorError, ComplianceReviewer, NarrativeContext, NarrativeGenerator};
use crate::types::case::ComplianceResult;
use crate::types::transaction::Transaction;
use async_nats::Client;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// Compliance review served over NATS request/reply.
///
/// Sends the evidence as JSON and expects a JSON `ComplianceResult` back.
#[derive(Clone)]
pub struct NatsComplianceReviewer {
    client: Client,
    subject: String,
}

impl NatsComplianceReviewer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }
}

#[async_trait]
impl ComplianceReviewer for NatsComplianceReviewer {
    fn name(&self) -> &'static str {
        "nats"
    }

    async fn review(&self, evidence: &Transaction) -> Result<ComplianceResult, CollaboratorError> {
        let payload = serde_json::to_vec(evidence)
            .map_err(|e| CollaboratorError::InvalidReply(e.to_string()))?;
        let reply = self
            .client
            .request(self.subject.clone(), payload.into())
            .await
            .map_err(|e| CollaboratorError::Unavailable(e.to_string()))?;

        debug!(subject = %self.subject, bytes = reply.payload.len(), "Compliance reply received");

        serde_json::from_slice(&reply.payload)
            .map_err(|e| CollaboratorError::InvalidReply(e.to_string()))
    }
}

#[derive(Deserialize)]
struct NarrativeReply {
    summary: String,
}

/// Narrative generation served over NATS request/reply.
///
/// Sends the case context as JSON and expects `{"summary": "..."}` back.
#[derive(Clone)]
pub struct NatsNarrativeGenerator {
    client: Client,
    subject: String,
}

impl NatsNarrativeGenerator {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }
}

#[async_trait]
impl NarrativeGenerator for NatsNarrativeGenerator {
    fn name(&self) -> &'static str {
        "nats"
    }

    async fn generate(&self, context: &NarrativeContext) -> Result<String, CollaboratorError> {
        let payload = serde_json::to_vec(context)
            .map_err(|e| CollaboratorError::InvalidReply(e.to_string()))?;
        let reply = self
            .client
            .request(self.subject.clone(), payload.into())
            .await
            .map_err(|e| CollaboratorError::Unavailable(e.to_string()))?;

        let reply: NarrativeReply = serde_json::from_slice(&reply.payload)
            .map_err(|e| CollaboratorError::InvalidReply(e.to_string()))?;

        if reply.summary.trim().is_empty() {
            return Err(CollaboratorError::InvalidReply("empty summary".to_string()));
        }
        Ok(reply.summary)
    }
}

#[cfg(test)]
mod tests {
    // Integration tests would require a running NATS server
}
