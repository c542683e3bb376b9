//! Core types for the entropy oracle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use trust_core::{ContractRef, OutputFormat, Points, Role, SoulboundProof};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Retry policy for contract calls: fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct RetryPolicy {
    /// Total attempts, the first call included
    pub max_attempts: u32,
    /// Delay between attempts (ms)
    pub backoff_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_ms: u64) -> Self {
        Self {
            max_attempts,
            backoff_ms,
        }
    }

    /// Delay between attempts.
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 1000,
        }
    }
}

/// Whether raw entropy is transformed before caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum PostProcessType {
    /// Passthrough
    #[default]
    None,
    /// Transform through the registered post-processor named by `callback`
    Callback,
}

/// Post-processing step applied to raw entropy.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct PostProcess {
    #[serde(rename = "type")]
    pub kind: PostProcessType,
    /// Post-processor identifier, resolved at fetch time
    #[serde(default)]
    pub callback: Option<String>,
}

impl PostProcess {
    /// Passthrough.
    pub fn none() -> Self {
        Self::default()
    }

    /// Transform through the named post-processor.
    pub fn callback(name: impl Into<String>) -> Self {
        Self {
            kind: PostProcessType::Callback,
            callback: Some(name.into()),
        }
    }
}

/// How a node acquires entropy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct EntropyAgent {
    /// Candidate sources, tried by index
    pub contracts: Vec<ContractRef>,
    /// Contract method returning entropy
    pub method: String,
    /// Output encoding
    #[serde(default)]
    pub format: OutputFormat,
    /// Cache TTL (seconds)
    pub cache_ttl: u64,
    /// Retry policy
    #[serde(default)]
    pub retry_policy: RetryPolicy,
    /// Post-processing
    #[serde(default)]
    pub post_process: PostProcess,
    /// Hooks notified after each successful fetch
    #[serde(default)]
    pub hooks: Vec<String>,
}

impl EntropyAgent {
    /// Agent over `contracts` with default policies.
    pub fn new(contracts: Vec<ContractRef>, method: impl Into<String>) -> Self {
        Self {
            contracts,
            method: method.into(),
            format: OutputFormat::default(),
            cache_ttl: 60,
            retry_policy: RetryPolicy::default(),
            post_process: PostProcess::none(),
            hooks: Vec::new(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_post_process(mut self, post_process: PostProcess) -> Self {
        self.post_process = post_process;
        self
    }

    pub fn with_cache_ttl(mut self, ttl_secs: u64) -> Self {
        self.cache_ttl = ttl_secs;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_hook(mut self, hook: impl Into<String>) -> Self {
        self.hooks.push(hook.into());
        self
    }
}

/// Registration request for a new node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct NodeDescriptor {
    /// Requested node ID; generated when absent
    #[serde(default)]
    pub node_id: Option<String>,
    /// Operating wallet
    pub wallet_address: String,
    /// Entropy acquisition settings
    pub entropy_agent: EntropyAgent,
    /// Capability tags
    pub roles: HashSet<Role>,
    /// Karma credited per qualifying action; config default when absent
    #[serde(default)]
    #[cfg_attr(feature = "typescript", ts(type = "number | null"))]
    pub karma_wage: Option<Points>,
    /// Soulbound identity proof for the wallet
    pub identity_proof: SoulboundProof,
}

impl NodeDescriptor {
    /// Create a descriptor.
    pub fn new(
        wallet_address: impl Into<String>,
        entropy_agent: EntropyAgent,
        identity_proof: SoulboundProof,
    ) -> Self {
        Self {
            node_id: None,
            wallet_address: wallet_address.into(),
            entropy_agent,
            roles: HashSet::new(),
            karma_wage: None,
            identity_proof,
        }
    }

    pub fn with_node_id(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }

    pub fn with_karma_wage(mut self, wage: Points) -> Self {
        self.karma_wage = Some(wage);
        self
    }

    /// Structural problems with the descriptor, empty when valid.
    pub fn violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        let agent = &self.entropy_agent;

        if matches!(&self.node_id, Some(id) if id.trim().is_empty()) {
            violations.push("node_id must not be empty".to_string());
        }
        if self.wallet_address.trim().is_empty() {
            violations.push("wallet_address must not be empty".to_string());
        }
        if agent.contracts.is_empty() {
            violations.push("entropy_agent.contracts must list at least one contract".to_string());
        }
        if agent.contracts.iter().any(|c| c.as_str().trim().is_empty()) {
            violations.push("entropy_agent.contracts must not contain empty references".to_string());
        }
        if agent.method.trim().is_empty() {
            violations.push("entropy_agent.method must not be empty".to_string());
        }
        if agent.retry_policy.max_attempts == 0 {
            violations.push("entropy_agent.retry_policy.max_attempts must be at least 1".to_string());
        }
        if agent.post_process.kind == PostProcessType::Callback
            && agent
                .post_process
                .callback
                .as_deref()
                .map_or(true, |c| c.trim().is_empty())
        {
            violations.push("entropy_agent.post_process.callback is required".to_string());
        }
        if self.karma_wage.is_some_and(Points::is_negative) {
            violations.push("karma_wage must not be negative".to_string());
        }

        violations
    }
}

/// An agent-operated entropy source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct EntropyNode {
    /// Unique node ID
    pub node_id: String,
    /// Operating wallet
    pub wallet_address: String,
    /// Trust metric gating privileged operations
    #[cfg_attr(feature = "typescript", ts(type = "number"))]
    pub reputation_score: Points,
    /// Entropy acquisition settings
    pub entropy_agent: EntropyAgent,
    /// Capability tags
    pub roles: HashSet<Role>,
    /// Karma credited per qualifying action
    #[cfg_attr(feature = "typescript", ts(type = "number"))]
    pub karma_wage: Points,
    /// Governance votes cast
    pub votes_cast: u64,
    /// Staked balance
    #[cfg_attr(feature = "typescript", ts(type = "number"))]
    pub staking_balance: Points,
    /// Successful entropy fetches
    pub fetch_count: u64,
    /// When the node registered
    pub registered_at: DateTime<Utc>,
    /// Last successful fetch
    pub last_fetch_at: Option<DateTime<Utc>>,
}

impl EntropyNode {
    /// Whether the node carries a capability.
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Apply a reputation delta without crossing `floor`.
    pub fn adjust_reputation(&mut self, delta: Points, floor: Points) -> Points {
        self.reputation_score = (self.reputation_score + delta).max(floor);
        self.reputation_score
    }
}

/// A governance vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum VoteChoice {
    For,
    Against,
    Abstain,
}

/// Confirmation of a submitted vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct VoteReceipt {
    pub node_id: String,
    pub proposal_id: String,
    pub vote: VoteChoice,
    /// Node's vote count after this vote
    pub votes_cast: u64,
    /// Gateway response to the submission
    pub submission: serde_json::Value,
    /// Human-readable confirmation
    pub message: String,
}

/// Payload handed to `on_entropy_fetch` hooks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntropyFetchEvent {
    pub node_id: String,
    pub entropy: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> NodeDescriptor {
        NodeDescriptor::new(
            "0xabc",
            EntropyAgent::new(vec![ContractRef::new("0xrng")], "getRandom"),
            SoulboundProof::for_wallet("0xabc", "sbt-1"),
        )
    }

    #[test]
    fn test_valid_descriptor() {
        assert!(descriptor().violations().is_empty());
    }

    #[test]
    fn test_descriptor_violations() {
        let mut d = descriptor();
        d.entropy_agent.contracts.clear();
        d.entropy_agent.retry_policy.max_attempts = 0;
        d.entropy_agent.post_process = PostProcess {
            kind: PostProcessType::Callback,
            callback: None,
        };

        let violations = d.violations();
        assert_eq!(violations.len(), 3);
    }

    #[test]
    fn test_post_process_wire_format() {
        let json = serde_json::to_value(PostProcess::callback("sha256")).unwrap();
        assert_eq!(json["type"], "callback");
        assert_eq!(json["callback"], "sha256");

        let parsed: PostProcess = serde_json::from_str(r#"{"type": "none"}"#).unwrap();
        assert_eq!(parsed, PostProcess::none());
    }

    #[test]
    fn test_reputation_floor() {
        let mut d = descriptor();
        d.node_id = Some("n1".to_string());
        let mut node = EntropyNode {
            node_id: "n1".to_string(),
            wallet_address: d.wallet_address,
            reputation_score: Points::from_whole(2),
            entropy_agent: d.entropy_agent,
            roles: d.roles,
            karma_wage: Points::from_whole(1),
            votes_cast: 0,
            staking_balance: Points::ZERO,
            fetch_count: 0,
            registered_at: Utc::now(),
            last_fetch_at: None,
        };

        assert_eq!(
            node.adjust_reputation(-Points::from_whole(5), Points::ZERO),
            Points::ZERO
        );
        assert_eq!(
            node.adjust_reputation(Points::from(1.5), Points::ZERO),
            Points::from(1.5)
        );
    }
}
