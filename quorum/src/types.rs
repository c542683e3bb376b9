//! Core types for the quorum engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Action type of the ritual executed when a signal reaches quorum.
pub const CONSENSUS_APPROVED: &str = "consensus_approved";

/// Verification status of a signal.
///
/// Not terminal: each verification overwrites the status with its own
/// verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum SignalStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
}

impl SignalStatus {
    /// Status set by a verifier's verdict.
    pub fn from_verdict(is_valid: bool) -> Self {
        if is_valid {
            SignalStatus::Verified
        } else {
            SignalStatus::Rejected
        }
    }
}

/// A proposed fact awaiting distributed verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Signal {
    /// Unique signal ID
    pub id: String,
    /// Who proposed the signal
    pub initiator: String,
    /// Signal category
    #[serde(rename = "type")]
    pub signal_type: String,
    /// Opaque content
    pub payload: serde_json::Value,
    /// Latest verdict
    pub status: SignalStatus,
    /// Verifications received, duplicates included
    pub verification_count: u64,
    /// Verifier IDs in call order
    pub verifiers: Vec<String>,
    /// Whether a quorum check has triggered a ritual for this signal
    pub consensus_triggered: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Signal {
    /// Create a pending signal.
    pub fn new(
        initiator: impl Into<String>,
        signal_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            initiator: initiator.into(),
            signal_type: signal_type.into(),
            payload,
            status: SignalStatus::Pending,
            verification_count: 0,
            verifiers: Vec::new(),
            consensus_triggered: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record one verification.
    pub fn record_verification(&mut self, verifier: impl Into<String>, is_valid: bool) {
        self.verification_count += 1;
        self.verifiers.push(verifier.into());
        self.status = SignalStatus::from_verdict(is_valid);
        self.updated_at = Utc::now();
    }
}

/// Outcome of one quorum evaluation. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ConsensusRecord {
    pub signal_id: String,
    /// Whether `verifications >= required`
    pub reached: bool,
    /// Verification count at evaluation time
    pub verifications: u64,
    /// Quorum size evaluated against
    pub required: u64,
    pub timestamp: DateTime<Utc>,
    /// Ritual executed by this evaluation
    #[serde(default)]
    pub ritual_id: Option<String>,
}

/// Requested ritual action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ActionRequest {
    #[serde(rename = "type")]
    pub action_type: String,
    pub target: String,
}

impl ActionRequest {
    pub fn new(action_type: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            target: target.into(),
        }
    }
}

/// An executed ritual action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct RitualAction {
    #[serde(rename = "type")]
    pub action_type: String,
    pub target: String,
    pub executed_at: DateTime<Utc>,
}

/// Ritual status. Rituals execute synchronously, so every recorded ritual is
/// completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum RitualStatus {
    #[default]
    Completed,
}

/// Recorded consequence of a quorum or a direct invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Ritual {
    pub id: String,
    pub initiator: String,
    /// Actions in execution order
    pub actions: Vec<RitualAction>,
    pub status: RitualStatus,
    pub timestamp: DateTime<Utc>,
}
