//! NATS subscriber for incoming triage requests

use crate::types::transaction::TriageRequest;
use anyhow::{Context, Result};
use async_nats::{Client, Subscriber};
use tracing::info;

/// Consumer for receiving triage requests from NATS
pub struct RequestConsumer {
    client: Client,
    subject: String,
}

impl RequestConsumer {
    /// Create a new request consumer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the request subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to triage request subject");
        Ok(subscriber)
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Decode a request payload
pub fn decode_request(payload: &[u8]) -> Result<TriageRequest> {
    serde_json::from_slice(payload).context("Malformed triage request")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_request() {
        let payload = br#"{
            "case_id": "CASE-042",
            "transaction": {"amount": 9500, "location": "Dubai", "timestamp": "2026-02-04T12:00:00Z", "kind": "WIRE"},
            "user_baseline": {"mean_amount": 2000, "std_amount": 500, "last_location": "Dubai", "last_time": "2026-02-04T10:00:00Z"}
        }"#;

        let request = decode_request(payload).unwrap();
        assert_eq!(request.case_id.as_deref(), Some("CASE-042"));
        assert_eq!(request.transaction.kind.as_deref(), Some("WIRE"));
    }

    #[test]
    fn test_decode_rejects_missing_baseline() {
        let payload = br#"{"transaction": {"amount": 1, "location": "Dubai", "timestamp": "2026-02-04T12:00:00Z"}}"#;
        assert!(decode_request(payload).is_err());
    }
}
