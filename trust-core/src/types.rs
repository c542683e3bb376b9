//! Core types shared across the trust layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::time::Duration;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::cache::CacheError;
use crate::gateway::GatewayError;
use crate::ledger::LedgerError;

/// Fixed-point amount used for reputation, karma and stake.
///
/// Stored as thousandths so repeated additive deltas never drift.
/// Serializes as a plain number (`50.5`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Points(i64);

impl Points {
    /// Number of stored units per whole point.
    pub const SCALE: i64 = 1_000;

    /// Zero points.
    pub const ZERO: Points = Points(0);

    /// Create from a whole number of points.
    pub const fn from_whole(points: i64) -> Self {
        Self(points * Self::SCALE)
    }

    /// Create from thousandths of a point.
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Raw value in thousandths.
    pub const fn millis(self) -> i64 {
        self.0
    }

    /// Lossy conversion for display and serialization.
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    /// Whether the amount is below zero.
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl From<f64> for Points {
    fn from(value: f64) -> Self {
        Self((value * Self::SCALE as f64).round() as i64)
    }
}

impl From<Points> for f64 {
    fn from(points: Points) -> Self {
        points.as_f64()
    }
}

impl Add for Points {
    type Output = Points;

    fn add(self, rhs: Points) -> Points {
        Points(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Points {
    fn add_assign(&mut self, rhs: Points) {
        *self = *self + rhs;
    }
}

impl Sub for Points {
    type Output = Points;

    fn sub(self, rhs: Points) -> Points {
        Points(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Points {
    fn sub_assign(&mut self, rhs: Points) {
        *self = *self - rhs;
    }
}

impl Neg for Points {
    type Output = Points;

    fn neg(self) -> Points {
        Points(self.0.saturating_neg())
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = Self::SCALE as u64;
        write!(f, "{}{}.{:03}", sign, abs / scale, abs % scale)
    }
}

/// Capability tag carried by a node. Authorization checks roles, not identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May cast governance votes
    Voter,
    /// May create proposals and signals
    Creator,
    /// May verify signals
    Verifier,
    /// Operates infrastructure
    Operator,
}

/// Kind of entity referenced by an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Node,
    Signal,
    Ritual,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Node => write!(f, "Node"),
            EntityKind::Signal => write!(f, "Signal"),
            EntityKind::Ritual => write!(f, "Ritual"),
        }
    }
}

/// Name of an audited event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    NodeCreated,
    EntropyFetched,
    VoteCast,
    StakingUpdated,
    SignalInitiated,
    SignalVerified,
    ConsensusChecked,
    RitualExecuted,
}

impl AuditEventKind {
    /// Wire name of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventKind::NodeCreated => "node_created",
            AuditEventKind::EntropyFetched => "entropy_fetched",
            AuditEventKind::VoteCast => "vote_cast",
            AuditEventKind::StakingUpdated => "staking_updated",
            AuditEventKind::SignalInitiated => "signal_initiated",
            AuditEventKind::SignalVerified => "signal_verified",
            AuditEventKind::ConsensusChecked => "consensus_checked",
            AuditEventKind::RitualExecuted => "ritual_executed",
        }
    }
}

impl fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An audit record handed to the compliance sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct AuditEvent {
    /// Event name
    pub event: AuditEventKind,
    /// Who performed the operation
    pub actor: String,
    /// When the event was emitted
    pub timestamp: DateTime<Utc>,
    /// Event-specific details
    pub details: serde_json::Value,
}

impl AuditEvent {
    /// Create a new audit event stamped with the current time.
    pub fn new(event: AuditEventKind, actor: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            event,
            actor: actor.into(),
            timestamp: Utc::now(),
            details,
        }
    }
}

/// Error types for the trust layer.
#[derive(Debug, thiserror::Error)]
pub enum TrustError {
    /// Malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Soulbound identity proof did not verify
    #[error("Identity error: {0}")]
    Identity(String),

    /// Referenced entity does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// Capability or reputation threshold not met
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Contract gateway still failing after the retry policy was exhausted
    #[error("Entropy fetch failed after {attempts} attempt(s): {source}")]
    EntropyFetch {
        attempts: u32,
        #[source]
        source: GatewayError,
    },

    /// Post-processor rejected the raw value
    #[error("Post-processor '{callback}' failed: {reason}")]
    PostProcess { callback: String, reason: String },

    /// No post-processor registered under the identifier
    #[error("Unknown post-processor: {0}")]
    UnknownPostProcessor(String),

    /// Reputation/karma ledger failure
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Contract gateway failure outside the retry loop
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Entropy cache failure
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Overall operation deadline elapsed
    #[error("Deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    /// Caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TrustError {
    /// Shorthand for a missing node.
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: EntityKind::Node,
            id: id.into(),
        }
    }

    /// Shorthand for a missing signal.
    pub fn signal_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: EntityKind::Signal,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TrustError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_arithmetic_does_not_drift() {
        let mut total = Points::ZERO;
        for _ in 0..10 {
            total += Points::from(0.1);
        }
        assert_eq!(total, Points::from_whole(1));
    }

    #[test]
    fn test_points_display() {
        assert_eq!(Points::from_whole(50).to_string(), "50.000");
        assert_eq!(Points::from(0.25).to_string(), "0.250");
        assert_eq!((-Points::from(1.5)).to_string(), "-1.500");
    }

    #[test]
    fn test_points_serde_as_number() {
        let json = serde_json::to_string(&Points::from(12.5)).unwrap();
        assert_eq!(json, "12.5");

        let parsed: Points = serde_json::from_str("60").unwrap();
        assert_eq!(parsed, Points::from_whole(60));
    }

    #[test]
    fn test_audit_event_names() {
        assert_eq!(AuditEventKind::NodeCreated.as_str(), "node_created");
        let json = serde_json::to_value(AuditEventKind::RitualExecuted).unwrap();
        assert_eq!(json, "ritual_executed");
    }

    #[test]
    fn test_not_found_display() {
        let err = TrustError::signal_not_found("sig-1");
        assert_eq!(err.to_string(), "Signal not found: sig-1");
    }
}
