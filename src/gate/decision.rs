//! Admission outcomes and their wire contract.

use serde::Serialize;

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenyReason {
    /// The heavy sub-pool is saturated.
    HeavyApiBusy,
    /// The general pool and the wait queue are both full.
    ServerBusy,
    /// The request waited out its queue timeout without being promoted.
    QueueTimeout,
}

impl DenyReason {
    /// Seconds the caller should wait before retrying. Fixed per reason:
    /// a queue timeout retries soonest since the spike may have passed.
    pub fn retry_after_secs(self) -> u64 {
        match self {
            DenyReason::HeavyApiBusy => 5,
            DenyReason::ServerBusy => 10,
            DenyReason::QueueTimeout => 3,
        }
    }

    fn message(self) -> &'static str {
        match self {
            DenyReason::HeavyApiBusy => {
                "too many concurrent heavy operations, please retry shortly"
            }
            DenyReason::ServerBusy => "server is at capacity and the wait queue is full",
            DenyReason::QueueTimeout => "timed out waiting for a free slot",
        }
    }
}

/// Outcome of an admission check.
///
/// Serializes to the shape the HTTP layer forwards in 429-style
/// responses; the denial fields are omitted entirely when the request
/// is allowed.
#[derive(Debug, Clone, Serialize)]
pub struct AdmissionDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenyReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl AdmissionDecision {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
            message: None,
            retry_after: None,
        }
    }

    pub fn denied(reason: DenyReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            message: Some(reason.message().to_string()),
            retry_after: Some(reason.retry_after_secs()),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    #[test]
    fn test_retry_after_values() {
        assert_eq!(DenyReason::HeavyApiBusy.retry_after_secs(), 5);
        assert_eq!(DenyReason::ServerBusy.retry_after_secs(), 10);
        assert_eq!(DenyReason::QueueTimeout.retry_after_secs(), 3);
    }

    #[test]
    fn test_allowed_wire_shape() {
        let value = serde_json::to_value(AdmissionDecision::allowed()).unwrap();
        assert_json_eq!(value, json!({ "allowed": true }));
    }

    #[test]
    fn test_denied_wire_shape() {
        let value = serde_json::to_value(AdmissionDecision::denied(DenyReason::ServerBusy)).unwrap();
        assert_json_eq!(
            value,
            json!({
                "allowed": false,
                "reason": "SERVER_BUSY",
                "message": "server is at capacity and the wait queue is full",
                "retryAfter": 10
            })
        );
    }

    #[test]
    fn test_reason_spelling() {
        let heavy = serde_json::to_value(DenyReason::HeavyApiBusy).unwrap();
        assert_eq!(heavy, json!("HEAVY_API_BUSY"));
        let timeout = serde_json::to_value(DenyReason::QueueTimeout).unwrap();
        assert_eq!(timeout, json!("QUEUE_TIMEOUT"));
    }
}
