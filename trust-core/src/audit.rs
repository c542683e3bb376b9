//! Audit trail for trust-layer operations.
//!
//! Every successful mutation emits one [`AuditEvent`]. Sinks are
//! fire-and-forget: emitting never fails the caller.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::AuditConfig;
use crate::types::{AuditEvent, AuditEventKind};

/// Maximum entries in the audit log before pruning.
const MAX_AUDIT_ENTRIES: usize = 10_000;

/// Consumer of audit events.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record an event.
    async fn emit(&self, event: AuditEvent);
}

/// Sink that forwards events to `tracing`.
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn emit(&self, event: AuditEvent) {
        info!(
            target: "trust_audit",
            event = %event.event,
            actor = %event.actor,
            timestamp = %event.timestamp,
            details = %event.details,
            "Audit event"
        );
    }
}

/// Bounded in-memory audit log (newest first).
pub struct MemoryAuditLog {
    entries: Arc<RwLock<VecDeque<AuditEvent>>>,
    max_entries: usize,
}

impl MemoryAuditLog {
    /// Create a new audit log.
    pub fn new() -> Self {
        Self::with_max_entries(MAX_AUDIT_ENTRIES)
    }

    /// Create from the `audit` config section.
    pub fn from_config(config: &AuditConfig) -> Self {
        Self::with_max_entries(config.max_entries)
    }

    /// Create with custom max entries.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::new())),
            max_entries,
        }
    }

    /// Get recent entries.
    pub async fn recent(&self, limit: usize) -> Vec<AuditEvent> {
        let entries = self.entries.read().await;
        entries.iter().take(limit).cloned().collect()
    }

    /// Entries for one event kind, newest first.
    pub async fn by_event(&self, kind: AuditEventKind) -> Vec<AuditEvent> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| e.event == kind)
            .cloned()
            .collect()
    }

    /// Entries for one actor, newest first.
    pub async fn by_actor(&self, actor: &str, limit: usize) -> Vec<AuditEvent> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| e.actor == actor)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Number of events of one kind.
    pub async fn count_of(&self, kind: AuditEventKind) -> usize {
        let entries = self.entries.read().await;
        entries.iter().filter(|e| e.event == kind).count()
    }

    /// Get count.
    pub async fn count(&self) -> usize {
        let entries = self.entries.read().await;
        entries.len()
    }

    /// Clear the log.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }
}

impl Default for MemoryAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditLog {
    async fn emit(&self, event: AuditEvent) {
        let mut entries = self.entries.write().await;
        entries.push_front(event);

        while entries.len() > self.max_entries {
            entries.pop_back();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_audit_log() {
        let log = MemoryAuditLog::new();

        log.emit(AuditEvent::new(AuditEventKind::NodeCreated, "0xabc", json!({"node_id": "n1"})))
            .await;
        log.emit(AuditEvent::new(AuditEventKind::EntropyFetched, "0xabc", json!({"node_id": "n1"})))
            .await;

        assert_eq!(log.count().await, 2);
        assert_eq!(log.count_of(AuditEventKind::NodeCreated).await, 1);

        let recent = log.recent(1).await;
        assert_eq!(recent[0].event, AuditEventKind::EntropyFetched);
        assert_eq!(log.by_actor("0xabc", 10).await.len(), 2);
    }

    #[tokio::test]
    async fn test_audit_log_is_bounded() {
        let log = MemoryAuditLog::with_max_entries(3);

        for i in 0..5 {
            log.emit(AuditEvent::new(
                AuditEventKind::SignalVerified,
                format!("verifier-{}", i),
                json!({}),
            ))
            .await;
        }

        assert_eq!(log.count().await, 3);
        assert_eq!(log.recent(1).await[0].actor, "verifier-4");
    }

    #[tokio::test]
    async fn test_audit_log_honours_configured_limit() {
        let config = crate::config::TrustConfig::from_yaml("audit:\n  max_entries: 2\n").unwrap();
        let log = MemoryAuditLog::from_config(&config.audit);

        for i in 0..5 {
            log.emit(AuditEvent::new(
                AuditEventKind::RitualExecuted,
                format!("steward-{}", i),
                json!({}),
            ))
            .await;
        }

        assert_eq!(log.count().await, 2);
        assert_eq!(log.recent(2).await[1].actor, "steward-3");
    }
}
