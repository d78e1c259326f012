//! Audit trail seam
//!
//! Append-only structured audit writes, fire-and-forget from the pipeline's
//! perspective. Every observable outcome of a migration (enqueue depth,
//! start, per-batch failure, completion, dropped request) goes through the
//! sink; producers have no synchronous channel back, so the audit trail is
//! the source of truth for what happened to a request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity of an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    Info,
    Warning,
    Error,
}

impl AuditLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Pipeline actions recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    RequestEnqueued,
    MigrationStarted,
    MigrationCompleted,
    BatchFailed,
    ReferenceMissing,
    WorkerFailure,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestEnqueued => "request_enqueued",
            Self::MigrationStarted => "migration_started",
            Self::MigrationCompleted => "migration_completed",
            Self::BatchFailed => "batch_failed",
            Self::ReferenceMissing => "reference_missing",
            Self::WorkerFailure => "worker_failure",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One structured audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub actor: String,
    pub action: AuditAction,
    pub message: String,
    pub payload: Option<serde_json::Value>,
    pub level: AuditLevel,
    /// HTTP-style status code carried for back-office log tooling.
    pub status_code: u16,
    pub correlation_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(actor: impl Into<String>, action: AuditAction, message: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            action,
            message: message.into(),
            payload: None,
            level: AuditLevel::Info,
            status_code: 200,
            correlation_id: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_level(mut self, level: AuditLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn with_correlation(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// Append-only audit sink. `log` must not fail from the caller's point of
/// view; implementations swallow and report their own write errors.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn log(&self, event: AuditEvent);
}

/// Default sink that routes audit entries through `tracing`.
#[derive(Debug, Default, Clone)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn log(&self, event: AuditEvent) {
        let payload = event
            .payload
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_default();
        let correlation = event
            .correlation_id
            .map(|c| c.to_string())
            .unwrap_or_default();
        match event.level {
            AuditLevel::Info => tracing::info!(
                actor = %event.actor,
                action = %event.action,
                status_code = event.status_code,
                correlation_id = %correlation,
                payload = %payload,
                "{}",
                event.message
            ),
            AuditLevel::Warning => tracing::warn!(
                actor = %event.actor,
                action = %event.action,
                status_code = event.status_code,
                correlation_id = %correlation,
                payload = %payload,
                "{}",
                event.message
            ),
            AuditLevel::Error => tracing::error!(
                actor = %event.actor,
                action = %event.action,
                status_code = event.status_code,
                correlation_id = %correlation,
                payload = %payload,
                "{}",
                event.message
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder_defaults() {
        let event = AuditEvent::new("worker", AuditAction::MigrationStarted, "started");
        assert_eq!(event.level, AuditLevel::Info);
        assert_eq!(event.status_code, 200);
        assert!(event.payload.is_none());
        assert!(event.correlation_id.is_none());
    }

    #[test]
    fn test_event_builder_overrides() {
        let id = Uuid::new_v4();
        let event = AuditEvent::new("worker", AuditAction::BatchFailed, "batch failed")
            .with_level(AuditLevel::Error)
            .with_status(500)
            .with_correlation(id)
            .with_payload(serde_json::json!({"batch_size": 10}));
        assert_eq!(event.level, AuditLevel::Error);
        assert_eq!(event.status_code, 500);
        assert_eq!(event.correlation_id, Some(id));
        assert_eq!(event.payload.unwrap()["batch_size"], 10);
    }

    #[test]
    fn test_action_wire_form() {
        assert_eq!(AuditAction::ReferenceMissing.as_str(), "reference_missing");
        assert_eq!(AuditAction::MigrationCompleted.as_str(), "migration_completed");
    }
}
