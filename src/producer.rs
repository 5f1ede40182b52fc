//! NATS publisher for finished cases and request rejections

use crate::error::TriageError;
use crate::types::case::InvestigationCase;
use anyhow::Result;
use async_nats::{Client, Subject};
use serde::Serialize;
use tracing::debug;

/// Error body sent back for requests that did not produce a case
#[derive(Debug, Serialize)]
pub struct ErrorReply {
    pub error: &'static str,
    pub detail: String,
}

impl From<&TriageError> for ErrorReply {
    fn from(err: &TriageError) -> Self {
        let error = match err {
            TriageError::Validation(_) => "validation_error",
            TriageError::Config(_) | TriageError::Internal(_) => "internal_error",
        };
        Self {
            error,
            detail: err.to_string(),
        }
    }
}

/// Producer for publishing cases to NATS
#[derive(Clone)]
pub struct CaseProducer {
    client: Client,
    subject: String,
}

impl CaseProducer {
    /// Create a new case producer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish a finished case on the case subject
    pub async fn publish(&self, case: &InvestigationCase) -> Result<()> {
        let payload = serde_json::to_vec(case)?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await?;

        debug!(
            case_id = %case.id(),
            fuzzy_score = case.assessment().fuzzy_score,
            "Published case"
        );

        Ok(())
    }

    /// Answer a request on its reply subject
    pub async fn reply<T: Serialize>(&self, reply_to: Subject, body: &T) -> Result<()> {
        let payload = serde_json::to_vec(body)?;
        self.client.publish(reply_to, payload.into()).await?;
        Ok(())
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}
