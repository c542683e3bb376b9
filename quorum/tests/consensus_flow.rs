//! Quorum consensus integration tests
//!
//! Walks signals through verification, quorum evaluation and the rituals a
//! reached quorum triggers.

use std::sync::Arc;

use quorum::{ActionRequest, QuorumEngine, SignalStatus, CONSENSUS_APPROVED};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use trust_core::{AuditEventKind, MemoryAuditLog, TrustConfig, TrustError};

fn engine_with_audit(config: TrustConfig) -> (QuorumEngine, Arc<MemoryAuditLog>) {
    let audit = Arc::new(MemoryAuditLog::new());
    let engine = QuorumEngine::with_config(config).with_audit(audit.clone());
    (engine, audit)
}

// =============================================================================
// Verification
// =============================================================================

#[tokio::test]
async fn test_signal_reaches_quorum_and_triggers_ritual() {
    let (engine, audit) = engine_with_audit(TrustConfig::default());

    let signal = assert_ok!(
        engine
            .initiate_signal("agentA", "oracle-update", json!({"val": 1}))
            .await
    );
    assert_eq!(signal.status, SignalStatus::Pending);
    assert_eq!(signal.verification_count, 0);

    assert_ok!(engine.verify_signal(&signal.id, "v1", true).await);
    let verified = assert_ok!(engine.verify_signal(&signal.id, "v2", true).await);
    assert_eq!(verified.verification_count, 2);
    assert_eq!(verified.status, SignalStatus::Verified);

    let record = assert_ok!(engine.quorum_consensus_check(&signal.id, 2).await);
    assert!(record.reached);
    assert_eq!(record.verifications, 2);
    assert_eq!(record.required, 2);

    let rituals = engine.rituals().await;
    assert_eq!(rituals.len(), 1);
    let ritual = &rituals[0];
    assert_eq!(record.ritual_id.as_deref(), Some(ritual.id.as_str()));
    assert_eq!(ritual.initiator, "agentA");
    assert_eq!(ritual.actions.len(), 1);
    assert_eq!(ritual.actions[0].action_type, CONSENSUS_APPROVED);
    assert_eq!(ritual.actions[0].target, signal.id);

    assert!(engine.signal(&signal.id).await.unwrap().consensus_triggered);

    assert_eq!(audit.count_of(AuditEventKind::SignalInitiated).await, 1);
    assert_eq!(audit.count_of(AuditEventKind::SignalVerified).await, 2);
    assert_eq!(audit.count_of(AuditEventKind::ConsensusChecked).await, 1);
    assert_eq!(audit.count_of(AuditEventKind::RitualExecuted).await, 1);
}

#[tokio::test]
async fn test_status_follows_latest_verdict() {
    let engine = QuorumEngine::new();
    let signal = engine
        .initiate_signal("agentA", "price-feed", json!({"eth": 3120}))
        .await
        .unwrap();

    let s = engine.verify_signal(&signal.id, "v1", false).await.unwrap();
    assert_eq!(s.status, SignalStatus::Rejected);

    let s = engine.verify_signal(&signal.id, "v2", true).await.unwrap();
    assert_eq!(s.status, SignalStatus::Verified);
    assert_eq!(s.verification_count, 2);
}

#[tokio::test]
async fn test_same_verifier_counts_every_time() {
    let engine = QuorumEngine::new();
    let signal = engine
        .initiate_signal("agentA", "oracle-update", json!({"val": 1}))
        .await
        .unwrap();

    engine.verify_signal(&signal.id, "v1", true).await.unwrap();
    let s = engine.verify_signal(&signal.id, "v1", true).await.unwrap();

    assert_eq!(s.verification_count, 2);
    assert_eq!(s.verifiers, vec!["v1", "v1"]);

    // A single verifier alone satisfies a quorum of two
    let record = engine.quorum_consensus_check(&signal.id, 2).await.unwrap();
    assert!(record.reached);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_verifications_are_all_counted() {
    let engine = Arc::new(QuorumEngine::new());
    let signal = engine
        .initiate_signal("agentA", "oracle-update", json!({"val": 1}))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let engine = Arc::clone(&engine);
        let id = signal.id.clone();
        handles.push(tokio::spawn(async move {
            engine
                .verify_signal(&id, &format!("verifier-{}", i), i % 2 == 0)
                .await
        }));
    }
    for handle in handles {
        assert_ok!(handle.await.unwrap());
    }

    let s = engine.signal(&signal.id).await.unwrap();
    assert_eq!(s.verification_count, 16);
    assert_eq!(s.verifiers.len(), 16);
}

// =============================================================================
// Quorum evaluation
// =============================================================================

#[tokio::test]
async fn test_check_uses_live_count() {
    let engine = QuorumEngine::new();
    let signal = engine
        .initiate_signal("agentA", "oracle-update", json!({"val": 1}))
        .await
        .unwrap();

    let first = engine.quorum_consensus_check(&signal.id, 1).await.unwrap();
    assert!(!first.reached);
    assert_eq!(first.verifications, 0);

    engine.verify_signal(&signal.id, "v1", false).await.unwrap();

    // Rejections count towards quorum too
    let second = engine.quorum_consensus_check(&signal.id, 1).await.unwrap();
    assert!(second.reached);
    assert_eq!(second.verifications, 1);

    let records = engine.consensus_records(Some(&signal.id)).await;
    assert_eq!(records, vec![first, second]);
}

#[tokio::test]
async fn test_repeated_checks_trigger_repeated_rituals() {
    let engine = QuorumEngine::new();
    let signal = engine
        .initiate_signal("agentA", "oracle-update", json!({"val": 1}))
        .await
        .unwrap();
    engine.verify_signal(&signal.id, "v1", true).await.unwrap();

    let a = engine.quorum_consensus_check(&signal.id, 1).await.unwrap();
    let b = engine.quorum_consensus_check(&signal.id, 1).await.unwrap();

    // Known hazard: the consensus trigger is not idempotent, so each
    // reached check executes its own ritual. Enable
    // `quorum.suppress_repeat_rituals` to guard against it.
    assert_eq!(engine.rituals().await.len(), 2);
    assert!(a.ritual_id.is_some());
    assert!(b.ritual_id.is_some());
    assert_ne!(a.ritual_id, b.ritual_id);
}

#[tokio::test]
async fn test_repeat_rituals_can_be_suppressed() {
    let mut config = TrustConfig::default();
    config.quorum.suppress_repeat_rituals = true;
    let (engine, audit) = engine_with_audit(config);

    let signal = engine
        .initiate_signal("agentA", "oracle-update", json!({"val": 1}))
        .await
        .unwrap();
    engine.verify_signal(&signal.id, "v1", true).await.unwrap();

    let a = engine.quorum_consensus_check(&signal.id, 1).await.unwrap();
    let b = engine.quorum_consensus_check(&signal.id, 1).await.unwrap();

    assert!(a.reached && b.reached);
    assert!(a.ritual_id.is_some());
    assert_eq!(b.ritual_id, None);
    assert_eq!(engine.rituals().await.len(), 1);
    assert_eq!(engine.consensus_records(None).await.len(), 2);
    assert_eq!(audit.count_of(AuditEventKind::ConsensusChecked).await, 2);
    assert_eq!(audit.count_of(AuditEventKind::RitualExecuted).await, 1);
}

#[tokio::test]
async fn test_check_unknown_signal() {
    let engine = QuorumEngine::new();
    let err = assert_err!(engine.quorum_consensus_check("ghost", 1).await);
    assert!(matches!(err, TrustError::NotFound { .. }));
    assert!(engine.consensus_records(None).await.is_empty());
}

// =============================================================================
// Rituals
// =============================================================================

#[tokio::test]
async fn test_direct_ritual_execution() {
    let (engine, audit) = engine_with_audit(TrustConfig::default());

    let ritual = assert_ok!(
        engine
            .execute_ritual(
                None,
                "steward-1",
                &[
                    ActionRequest::new("grant_role", "agentB"),
                    ActionRequest::new("notify", "council"),
                ],
            )
            .await
    );

    assert_eq!(ritual.actions.len(), 2);
    assert_eq!(ritual.actions[1].action_type, "notify");
    assert_eq!(engine.ritual(&ritual.id).await.unwrap(), ritual);

    let events = audit.by_event(AuditEventKind::RitualExecuted).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].actor, "steward-1");
}

#[tokio::test]
async fn test_invalid_ritual_is_rejected() {
    let engine = QuorumEngine::new();

    let err = assert_err!(engine.execute_ritual(None, "steward-1", &[]).await);
    assert!(matches!(err, TrustError::Validation(_)));

    let err = assert_err!(
        engine
            .execute_ritual(None, "steward-1", &[ActionRequest::new("notify", "")])
            .await
    );
    assert!(matches!(err, TrustError::Validation(_)));

    assert!(engine.rituals().await.is_empty());
}

#[tokio::test]
async fn test_signals_listed_in_creation_order() {
    let engine = QuorumEngine::new();
    let first = engine
        .initiate_signal("agentA", "oracle-update", json!({"val": 1}))
        .await
        .unwrap();
    let second = engine
        .initiate_signal("agentB", "oracle-update", json!({"val": 2}))
        .await
        .unwrap();

    let ids: Vec<String> = engine.signals().await.into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
}
