//! Entropy Oracle - resilient randomness for agent-operated nodes
//!
//! Nodes register with a soulbound identity proof and an entropy agent
//! describing which contracts to query. Each fetch:
//!
//! 1. Calls the selected contract through the [`ContractGateway`], retrying
//!    with a fixed backoff
//! 2. Applies the node's post-processor, if any
//! 3. Writes the result to the entropy cache with the node's TTL
//! 4. Notifies the node's hooks (best-effort)
//! 5. Credits the node's karma wage and reputation, then audits
//!
//! Reputation gates governance: [`EntropyOracle::cast_vote`] requires the
//! voter role and a reputation at or above the proposal threshold.
//!
//! [`ContractGateway`]: trust_core::ContractGateway

pub mod hooks;
pub mod oracle;
pub mod postprocess;
pub mod retry;
pub mod types;

pub use hooks::{EntropyHook, HookError, HookRegistry, HookReport, LoggingHook};
pub use oracle::EntropyOracle;
pub use postprocess::{PostProcessFn, PostProcessorRegistry};
pub use retry::{with_fixed_backoff, RetryExhausted};
pub use types::*;
