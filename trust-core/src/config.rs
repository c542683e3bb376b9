//! Configuration for the trust layer.

use serde::{Deserialize, Serialize};

use crate::gateway::ContractRef;
use crate::types::{Points, Result, TrustError};

/// Configuration shared by the entropy oracle and the quorum engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// Entropy oracle configuration
    pub oracle: OracleConfig,
    /// Governance configuration
    pub governance: GovernanceConfig,
    /// Quorum configuration
    pub quorum: QuorumConfig,
    /// Audit configuration
    pub audit: AuditConfig,
}

impl TrustConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| TrustError::Config(e.to_string()))
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| TrustError::Config(e.to_string()))
    }
}

/// Entropy oracle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Reputation a node starts with
    pub initial_reputation: Points,
    /// Reputation credited per successful fetch
    pub fetch_reputation_increment: Points,
    /// Reputation credited per vote
    pub vote_reputation_increment: Points,
    /// Karma wage for nodes that do not configure their own
    pub default_karma_wage: Points,
    /// Upper bound for a whole `fetch_entropy` call, retries included (ms)
    pub fetch_deadline_ms: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            initial_reputation: Points::from_whole(50),
            fetch_reputation_increment: Points::from_whole(1),
            vote_reputation_increment: Points::from(0.5),
            default_karma_wage: Points::from_whole(1),
            fetch_deadline_ms: 30_000,
        }
    }
}

/// Governance configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Minimum reputation to vote
    pub proposal_threshold: Points,
    /// No single operation drives reputation below this
    pub reputation_floor: Points,
    /// Governance contract receiving votes
    pub contract: ContractRef,
    /// Method invoked to submit a vote
    pub vote_method: String,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            proposal_threshold: Points::from_whole(60),
            reputation_floor: Points::ZERO,
            contract: ContractRef::new("governance"),
            vote_method: "castVote".to_string(),
        }
    }
}

/// Quorum configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuorumConfig {
    /// Verifications required when a check does not name its own quorum
    pub default_required: u64,
    /// Skip ritual execution when a signal already triggered one
    pub suppress_repeat_rituals: bool,
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self {
            default_required: 3,
            suppress_repeat_rituals: false,
        }
    }
}

/// Audit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Emit audit events
    pub enabled: bool,
    /// Entries retained by the in-memory audit log
    pub max_entries: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
        }
    }
}
