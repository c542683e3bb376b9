//! Trust Core - shared foundation of the Sovereign Trust Layer
//!
//! Everything the entropy oracle and the quorum engine have in common:
//!
//! - **Types**: fixed-point [`Points`], capability [`Role`]s, [`AuditEvent`]s
//! - **Errors**: the [`TrustError`] taxonomy every operation reports with
//! - **Configuration**: [`TrustConfig`], loadable from YAML
//! - **Collaborators**: traits for the contract gateway, entropy cache,
//!   karma ledger, identity verifier, audit sink and record validator,
//!   each with an in-process implementation
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐        ┌──────────────────┐
//! │  EntropyOracle   │        │   QuorumEngine   │
//! └────────┬─────────┘        └────────┬─────────┘
//!          │                           │
//!   ┌──────┴──────┬─────────┬──────────┴──┬───────────┐
//!   ▼             ▼         ▼             ▼           ▼
//! Gateway       Cache     Ledger       AuditSink   Validator
//! ```

pub mod audit;
pub mod cache;
pub mod config;
pub mod gateway;
pub mod identity;
pub mod ledger;
pub mod mock;
pub mod types;
pub mod validation;

// Re-export main types
pub use audit::{AuditSink, MemoryAuditLog, TracingAuditSink};
pub use cache::{CacheError, CachedEntropy, EntropyCache, MemoryEntropyCache};
pub use config::{AuditConfig, GovernanceConfig, OracleConfig, QuorumConfig, TrustConfig};
pub use gateway::{ContractCall, ContractGateway, ContractRef, GatewayError, OutputFormat};
pub use identity::{IdentityVerifier, IdentityVerifierError, SoulboundProof, StaticIdentityVerifier};
pub use ledger::{LedgerError, MemoryLedger, ReputationLedger};
pub use mock::MockGateway;
pub use types::*;
pub use validation::{AcceptAll, RecordValidator, SchemaKind, StructuralValidator};
