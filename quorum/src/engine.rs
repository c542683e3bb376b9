//! QuorumEngine - signal verification, quorum evaluation and rituals.
//!
//! Signals collect verifications; a quorum check compares the live
//! verification count with a required quorum, records the outcome and,
//! when quorum is reached, executes a `consensus_approved` ritual on behalf
//! of the signal's initiator.

use dashmap::DashMap;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use trust_core::{
    AuditEvent, AuditEventKind, AuditSink, EntityKind, RecordValidator, Result, SchemaKind,
    StructuralValidator, TracingAuditSink, TrustConfig, TrustError,
};

use crate::ritual::RitualLog;
use crate::types::{ActionRequest, ConsensusRecord, Ritual, Signal, CONSENSUS_APPROVED};

/// A signal behind its own lock.
type SignalHandle = Arc<Mutex<Signal>>;

/// The quorum consensus engine.
pub struct QuorumEngine {
    /// Configuration
    config: TrustConfig,
    /// Signals by ID
    signals: DashMap<String, SignalHandle>,
    /// Signal IDs in creation order
    signal_order: RwLock<Vec<String>>,
    /// Every quorum evaluation, in order
    records: RwLock<Vec<ConsensusRecord>>,
    /// Executed rituals
    rituals: RitualLog,
    /// Record validation
    validator: Arc<dyn RecordValidator>,
    /// Audit sink
    audit: Arc<dyn AuditSink>,
}

impl QuorumEngine {
    /// Create an engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(TrustConfig::default())
    }

    /// Create with custom configuration.
    pub fn with_config(config: TrustConfig) -> Self {
        Self {
            config,
            signals: DashMap::new(),
            signal_order: RwLock::new(Vec::new()),
            records: RwLock::new(Vec::new()),
            rituals: RitualLog::new(),
            validator: Arc::new(StructuralValidator),
            audit: Arc::new(TracingAuditSink),
        }
    }

    /// Use a different record validator.
    pub fn with_validator(mut self, validator: Arc<dyn RecordValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Use a different audit sink.
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &TrustConfig {
        &self.config
    }

    /// Propose a signal for verification.
    pub async fn initiate_signal(
        &self,
        initiator: &str,
        signal_type: &str,
        payload: Value,
    ) -> Result<Signal> {
        let record = json!({
            "initiator": initiator,
            "signal_type": signal_type,
            "payload": payload,
        });
        self.validator
            .validate(SchemaKind::Signal, &record)
            .map_err(|violations| TrustError::Validation(violations.join("; ")))?;

        let signal = Signal::new(initiator, signal_type, payload);
        let signal_id = signal.id.clone();

        self.signals
            .insert(signal_id.clone(), Arc::new(Mutex::new(signal.clone())));
        self.signal_order.write().await.push(signal_id.clone());

        info!(
            signal_id = %signal_id,
            initiator = %initiator,
            signal_type = %signal_type,
            "Signal initiated"
        );

        self.emit(
            AuditEventKind::SignalInitiated,
            initiator,
            json!({ "signal_id": signal_id, "type": signal_type }),
        )
        .await;

        Ok(signal)
    }

    /// Record a verifier's verdict on a signal.
    ///
    /// Every call counts, including repeat calls by the same verifier. The
    /// status is overwritten by this verdict.
    pub async fn verify_signal(
        &self,
        signal_id: &str,
        verifier: &str,
        is_valid: bool,
    ) -> Result<Signal> {
        let handle = self.signal_handle(signal_id)?;
        let mut signal = handle.lock().await;

        signal.record_verification(verifier, is_valid);

        debug!(
            signal_id = %signal_id,
            verifier = %verifier,
            is_valid,
            verification_count = signal.verification_count,
            status = ?signal.status,
            "Signal verified"
        );

        self.emit(
            AuditEventKind::SignalVerified,
            verifier,
            json!({
                "signal_id": signal_id,
                "is_valid": is_valid,
                "verification_count": signal.verification_count,
                "status": signal.status,
            }),
        )
        .await;

        Ok(signal.clone())
    }

    /// Evaluate whether a signal has at least `required` verifications.
    ///
    /// Every evaluation is recorded. A reached quorum executes a
    /// `consensus_approved` ritual each time it is checked, unless
    /// `quorum.suppress_repeat_rituals` is set and the signal already
    /// triggered one. If that ritual fails, its error is returned after the
    /// evaluation has been recorded with no `ritual_id`.
    pub async fn quorum_consensus_check(
        &self,
        signal_id: &str,
        required: u64,
    ) -> Result<ConsensusRecord> {
        let handle = self.signal_handle(signal_id)?;
        let mut signal = handle.lock().await;

        let verifications = signal.verification_count;
        let reached = verifications >= required;
        let suppressed =
            reached && signal.consensus_triggered && self.config.quorum.suppress_repeat_rituals;

        let ritual = if reached && !suppressed {
            let actions = [ActionRequest::new(CONSENSUS_APPROVED, signal_id)];
            Some(self.execute_ritual(None, &signal.initiator, &actions).await)
        } else {
            None
        };
        let ritual_id = match &ritual {
            Some(Ok(ritual)) => {
                signal.consensus_triggered = true;
                Some(ritual.id.clone())
            }
            _ => None,
        };

        let record = ConsensusRecord {
            signal_id: signal_id.to_string(),
            reached,
            verifications,
            required,
            timestamp: chrono::Utc::now(),
            ritual_id,
        };
        self.records.write().await.push(record.clone());

        info!(
            signal_id = %signal_id,
            verifications,
            required,
            reached,
            suppressed,
            "Consensus check completed"
        );

        self.emit(
            AuditEventKind::ConsensusChecked,
            &signal.initiator,
            json!({
                "signal_id": signal_id,
                "reached": reached,
                "verifications": verifications,
                "required": required,
                "ritual_id": record.ritual_id,
            }),
        )
        .await;

        if let Some(Err(e)) = ritual {
            warn!(signal_id = %signal_id, error = %e, "Consensus ritual failed");
            return Err(e);
        }

        Ok(record)
    }

    /// Quorum check against `quorum.default_required`.
    pub async fn check_default_quorum(&self, signal_id: &str) -> Result<ConsensusRecord> {
        self.quorum_consensus_check(signal_id, self.config.quorum.default_required)
            .await
    }

    /// Execute a ritual directly.
    pub async fn execute_ritual(
        &self,
        ritual_id: Option<String>,
        initiator: &str,
        actions: &[ActionRequest],
    ) -> Result<Ritual> {
        let record = json!({ "initiator": initiator, "actions": actions });
        self.validator
            .validate(SchemaKind::Ritual, &record)
            .map_err(|violations| TrustError::Validation(violations.join("; ")))?;

        let ritual = self.rituals.execute(ritual_id, initiator, actions).await?;

        info!(
            ritual_id = %ritual.id,
            initiator = %initiator,
            actions = ritual.actions.len(),
            "Ritual executed"
        );

        self.emit(
            AuditEventKind::RitualExecuted,
            initiator,
            json!({ "ritual_id": ritual.id, "actions": ritual.actions }),
        )
        .await;

        Ok(ritual)
    }

    /// Snapshot of a signal.
    pub async fn signal(&self, signal_id: &str) -> Result<Signal> {
        let handle = self.signal_handle(signal_id)?;
        let signal = handle.lock().await;
        Ok(signal.clone())
    }

    /// Snapshots of all signals in creation order.
    pub async fn signals(&self) -> Vec<Signal> {
        let order = self.signal_order.read().await.clone();

        let mut signals = Vec::with_capacity(order.len());
        for id in order {
            if let Ok(handle) = self.signal_handle(&id) {
                signals.push(handle.lock().await.clone());
            }
        }
        signals
    }

    /// Consensus records in evaluation order, optionally for one signal.
    pub async fn consensus_records(&self, signal_id: Option<&str>) -> Vec<ConsensusRecord> {
        let records = self.records.read().await;
        records
            .iter()
            .filter(|r| signal_id.map_or(true, |id| r.signal_id == id))
            .cloned()
            .collect()
    }

    /// All rituals in execution order.
    pub async fn rituals(&self) -> Vec<Ritual> {
        self.rituals.all().await
    }

    /// Look up a ritual.
    pub async fn ritual(&self, ritual_id: &str) -> Result<Ritual> {
        self.rituals
            .get(ritual_id)
            .await
            .ok_or_else(|| TrustError::NotFound {
                kind: EntityKind::Ritual,
                id: ritual_id.to_string(),
            })
    }

    fn signal_handle(&self, signal_id: &str) -> Result<SignalHandle> {
        self.signals
            .get(signal_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| TrustError::signal_not_found(signal_id))
    }

    async fn emit(&self, kind: AuditEventKind, actor: &str, details: Value) {
        if self.config.audit.enabled {
            self.audit.emit(AuditEvent::new(kind, actor, details)).await;
        }
    }
}

impl Default for QuorumEngine {
    fn default() -> Self {
        Self::new()
    }
}
