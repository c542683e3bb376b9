//! EntropyOracle - main entry point of the entropy pipeline.
//!
//! Registers agent-operated nodes and fetches entropy on their behalf:
//! contract call with bounded retries, post-processing, cache write, hook
//! dispatch, karma/reputation credit and audit, in that order.

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use trust_core::{
    AuditEvent, AuditEventKind, AuditSink, CachedEntropy, ContractCall, ContractGateway,
    EntropyCache, IdentityVerifier, MemoryEntropyCache, MemoryLedger, OutputFormat, Points,
    RecordValidator, ReputationLedger, Result, Role, SchemaKind, StructuralValidator,
    TracingAuditSink, TrustConfig, TrustError,
};

use crate::hooks::{EntropyHook, HookRegistry};
use crate::postprocess::PostProcessorRegistry;
use crate::retry::with_fixed_backoff;
use crate::types::{EntropyFetchEvent, EntropyNode, NodeDescriptor, VoteChoice, VoteReceipt};

/// A node behind its own lock. Every mutating operation on a node holds the
/// lock for the whole operation.
type NodeHandle = Arc<Mutex<EntropyNode>>;

/// The entropy oracle pipeline.
pub struct EntropyOracle {
    /// Configuration
    config: TrustConfig,
    /// Registered nodes
    nodes: DashMap<String, NodeHandle>,
    /// On-chain access
    gateway: Arc<dyn ContractGateway>,
    /// Soulbound proof verification
    identity: Arc<dyn IdentityVerifier>,
    /// Latest entropy per node
    cache: Arc<dyn EntropyCache>,
    /// Karma ledger
    ledger: Arc<dyn ReputationLedger>,
    /// Record validation
    validator: Arc<dyn RecordValidator>,
    /// Audit sink
    audit: Arc<dyn AuditSink>,
    /// Post-processors by identifier
    post_processors: PostProcessorRegistry,
    /// Fetch hooks by identifier
    hooks: HookRegistry,
}

impl EntropyOracle {
    /// Create an oracle with in-memory cache and ledger, structural
    /// validation and `tracing` audit output.
    pub fn new(gateway: Arc<dyn ContractGateway>, identity: Arc<dyn IdentityVerifier>) -> Self {
        Self {
            config: TrustConfig::default(),
            nodes: DashMap::new(),
            gateway,
            identity,
            cache: Arc::new(MemoryEntropyCache::new()),
            ledger: Arc::new(MemoryLedger::new()),
            validator: Arc::new(StructuralValidator),
            audit: Arc::new(TracingAuditSink),
            post_processors: PostProcessorRegistry::with_builtins(),
            hooks: HookRegistry::new(),
        }
    }

    /// Create with configuration.
    pub fn with_config(mut self, config: TrustConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a different entropy cache.
    pub fn with_cache(mut self, cache: Arc<dyn EntropyCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Use a different karma ledger.
    pub fn with_ledger(mut self, ledger: Arc<dyn ReputationLedger>) -> Self {
        self.ledger = ledger;
        self
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

    /// Register a post-processor under `name`.
    pub fn register_post_processor<F>(&self, name: impl Into<String>, processor: F)
    where
        F: Fn(&Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.post_processors.register(name, processor);
    }

    /// Register a fetch hook under `name`.
    pub fn register_hook(&self, name: impl Into<String>, hook: Arc<dyn EntropyHook>) {
        self.hooks.register(name, hook);
    }

    /// Register a new node.
    ///
    /// The descriptor must be structurally valid and its soulbound proof
    /// must verify for the wallet.
    pub async fn register_node(&self, descriptor: NodeDescriptor) -> Result<String> {
        let violations = descriptor.violations();
        if !violations.is_empty() {
            return Err(TrustError::Validation(violations.join("; ")));
        }

        let record = serde_json::to_value(&descriptor)
            .map_err(|e| TrustError::Validation(format!("descriptor is not serializable: {}", e)))?;
        self.validator
            .validate(SchemaKind::Node, &record)
            .map_err(|violations| TrustError::Validation(violations.join("; ")))?;

        let verified = self
            .identity
            .verify(&descriptor.wallet_address, &descriptor.identity_proof)
            .await
            .map_err(|e| TrustError::Identity(e.to_string()))?;
        if !verified {
            warn!(wallet = %descriptor.wallet_address, "Soulbound proof rejected");
            return Err(TrustError::Identity(format!(
                "soulbound proof does not verify for wallet {}",
                descriptor.wallet_address
            )));
        }

        let node_id = descriptor
            .node_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let node = EntropyNode {
            node_id: node_id.clone(),
            wallet_address: descriptor.wallet_address,
            reputation_score: self.config.oracle.initial_reputation,
            entropy_agent: descriptor.entropy_agent,
            roles: descriptor.roles,
            karma_wage: descriptor
                .karma_wage
                .unwrap_or(self.config.oracle.default_karma_wage),
            votes_cast: 0,
            staking_balance: Points::ZERO,
            fetch_count: 0,
            registered_at: Utc::now(),
            last_fetch_at: None,
        };
        let wallet = node.wallet_address.clone();
        let roles: Vec<Role> = node.roles.iter().copied().collect();

        match self.nodes.entry(node_id.clone()) {
            Entry::Occupied(_) => {
                return Err(TrustError::Validation(format!(
                    "node {} is already registered",
                    node_id
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(node)));
            }
        }

        info!(node_id = %node_id, wallet = %wallet, "Entropy node registered");

        self.emit(
            AuditEventKind::NodeCreated,
            &wallet,
            json!({ "node_id": node_id, "roles": roles }),
        )
        .await;

        Ok(node_id)
    }

    /// Fetch entropy for a node from `contracts[contract_index]`.
    ///
    /// Always performs a fresh contract call; the cache is written, never
    /// read. The whole call is bounded by `oracle.fetch_deadline_ms`.
    pub async fn fetch_entropy(&self, node_id: &str, contract_index: usize) -> Result<Value> {
        let deadline = Duration::from_millis(self.config.oracle.fetch_deadline_ms);

        match tokio::time::timeout(deadline, self.fetch_entropy_inner(node_id, contract_index)).await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(node_id = %node_id, deadline_ms = self.config.oracle.fetch_deadline_ms, "Entropy fetch deadline exceeded");
                Err(TrustError::DeadlineExceeded(deadline))
            }
        }
    }

    /// Like [`fetch_entropy`](Self::fetch_entropy), aborting with
    /// [`TrustError::Cancelled`] as soon as `shutdown` completes.
    ///
    /// No further attempts are made after cancellation; side effects already
    /// committed stay committed.
    pub async fn fetch_entropy_until<F>(
        &self,
        node_id: &str,
        contract_index: usize,
        shutdown: F,
    ) -> Result<Value>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.fetch_entropy(node_id, contract_index) => result,
            _ = shutdown => {
                info!(node_id = %node_id, "Entropy fetch cancelled");
                Err(TrustError::Cancelled)
            }
        }
    }

    async fn fetch_entropy_inner(&self, node_id: &str, contract_index: usize) -> Result<Value> {
        let handle = self.node_handle(node_id)?;
        let mut node = handle.lock().await;

        let agent = node.entropy_agent.clone();
        let contract = agent.contracts.get(contract_index).cloned().ok_or_else(|| {
            TrustError::Validation(format!(
                "contract index {} out of range for node {} ({} contracts)",
                contract_index,
                node_id,
                agent.contracts.len()
            ))
        })?;

        debug!(
            node_id = %node_id,
            contract = %contract,
            method = %agent.method,
            max_attempts = agent.retry_policy.max_attempts,
            "Fetching entropy"
        );

        let call = ContractCall::new(contract, agent.method.clone(), agent.format);
        let gateway = &self.gateway;
        let call_ref = &call;
        let raw = with_fixed_backoff(&agent.retry_policy, |_| gateway.call(call_ref))
            .await
            .map_err(|exhausted| TrustError::EntropyFetch {
                attempts: exhausted.attempts,
                source: exhausted.last_error,
            })?;

        let entropy = self.post_processors.apply(&agent.post_process, raw)?;

        self.cache
            .put(node_id, entropy.clone(), agent.cache_ttl)
            .await?;
        node.fetch_count += 1;
        node.last_fetch_at = Some(Utc::now());

        let event = EntropyFetchEvent {
            node_id: node_id.to_string(),
            entropy: entropy.clone(),
        };
        self.hooks.dispatch(&agent.hooks, &event).await;

        self.ledger.credit(&node.wallet_address, node.karma_wage).await?;
        let reputation = node.adjust_reputation(
            self.config.oracle.fetch_reputation_increment,
            self.config.governance.reputation_floor,
        );

        info!(
            node_id = %node_id,
            contract = %call.contract,
            reputation = %reputation,
            "Entropy fetched"
        );

        self.emit(
            AuditEventKind::EntropyFetched,
            &node.wallet_address,
            json!({
                "node_id": node_id,
                "contract": call.contract,
                "contract_index": contract_index,
            }),
        )
        .await;

        Ok(entropy)
    }

    /// Cast a governance vote on behalf of a node.
    ///
    /// Requires the `voter` role and a reputation at or above
    /// `governance.proposal_threshold`.
    pub async fn cast_vote(
        &self,
        node_id: &str,
        proposal_id: &str,
        vote: VoteChoice,
    ) -> Result<VoteReceipt> {
        let handle = self.node_handle(node_id)?;
        let mut node = handle.lock().await;
        let governance = &self.config.governance;

        if !node.has_role(Role::Voter) {
            return Err(TrustError::Authorization(format!(
                "node {} lacks the voter role",
                node_id
            )));
        }
        if node.reputation_score < governance.proposal_threshold {
            return Err(TrustError::Authorization(format!(
                "node {} reputation {} is below the proposal threshold {}",
                node_id, node.reputation_score, governance.proposal_threshold
            )));
        }

        let call = ContractCall::new(
            governance.contract.clone(),
            governance.vote_method.clone(),
            OutputFormat::Json,
        )
        .with_arg(proposal_id)
        .and_then(|call| call.with_arg(vote))
        .and_then(|call| call.with_arg(&node.wallet_address))
        .map_err(|e| TrustError::Validation(format!("vote arguments are not serializable: {}", e)))?;
        let submission = self.gateway.call(&call).await?;

        node.votes_cast += 1;
        self.ledger.credit(&node.wallet_address, node.karma_wage).await?;
        node.adjust_reputation(
            self.config.oracle.vote_reputation_increment,
            governance.reputation_floor,
        );

        info!(
            node_id = %node_id,
            proposal_id = %proposal_id,
            vote = ?vote,
            votes_cast = node.votes_cast,
            "Vote cast"
        );

        self.emit(
            AuditEventKind::VoteCast,
            &node.wallet_address,
            json!({ "node_id": node_id, "proposal_id": proposal_id, "vote": vote }),
        )
        .await;

        Ok(VoteReceipt {
            node_id: node_id.to_string(),
            proposal_id: proposal_id.to_string(),
            vote,
            votes_cast: node.votes_cast,
            submission,
            message: format!("Vote recorded for proposal {}", proposal_id),
        })
    }

    /// Apply a signed delta to a node's staking balance.
    pub async fn update_staking_balance(&self, node_id: &str, delta: Points) -> Result<Points> {
        let handle = self.node_handle(node_id)?;
        let mut node = handle.lock().await;

        let balance = node.staking_balance + delta;
        if balance.is_negative() {
            return Err(TrustError::Validation(format!(
                "staking balance of node {} cannot go below zero ({} + {})",
                node_id, node.staking_balance, delta
            )));
        }
        node.staking_balance = balance;

        debug!(node_id = %node_id, delta = %delta, balance = %balance, "Staking balance updated");

        self.emit(
            AuditEventKind::StakingUpdated,
            &node.wallet_address,
            json!({ "node_id": node_id, "delta": delta, "balance": balance }),
        )
        .await;

        Ok(balance)
    }

    /// Snapshot of a node.
    pub async fn node(&self, node_id: &str) -> Result<EntropyNode> {
        let handle = self.node_handle(node_id)?;
        let node = handle.lock().await;
        Ok(node.clone())
    }

    /// Snapshots of all nodes.
    pub async fn nodes(&self) -> Vec<EntropyNode> {
        let handles: Vec<NodeHandle> = self.nodes.iter().map(|e| Arc::clone(e.value())).collect();

        let mut nodes = Vec::with_capacity(handles.len());
        for handle in handles {
            nodes.push(handle.lock().await.clone());
        }
        nodes.sort_by(|a, b| a.registered_at.cmp(&b.registered_at));
        nodes
    }

    /// Number of registered nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Live cached entropy for a node, for readers that accept a cached value.
    pub async fn cached_entropy(&self, node_id: &str) -> Result<Option<CachedEntropy>> {
        Ok(self.cache.get(node_id).await?)
    }

    fn node_handle(&self, node_id: &str) -> Result<NodeHandle> {
        self.nodes
            .get(node_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| TrustError::node_not_found(node_id))
    }

    async fn emit(&self, kind: AuditEventKind, actor: &str, details: Value) {
        if self.config.audit.enabled {
            self.audit.emit(AuditEvent::new(kind, actor, details)).await;
        }
    }
}
