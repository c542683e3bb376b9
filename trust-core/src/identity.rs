//! Soulbound identity verification.
//!
//! A node may only register when its wallet presents a soulbound proof that
//! an external verifier accepts. This module defines the verifier contract
//! and an offline verifier over locally known bindings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Error types for identity verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityVerifierError {
    /// Verifier could not be reached
    #[error("Identity verifier unavailable: {0}")]
    Unavailable(String),

    /// Proof is malformed
    #[error("Malformed proof: {0}")]
    Malformed(String),
}

/// Non-transferable credential binding a token to a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct SoulboundProof {
    /// Soulbound token ID
    pub token_id: String,
    /// Hex SHA-256 over `wallet:token_id`
    pub digest: String,
}

impl SoulboundProof {
    /// Build the proof a wallet presents for a token.
    pub fn for_wallet(wallet_address: &str, token_id: impl Into<String>) -> Self {
        let token_id = token_id.into();
        let digest = proof_digest(wallet_address, &token_id);
        Self { token_id, digest }
    }
}

/// Digest binding a wallet to a token.
pub fn proof_digest(wallet_address: &str, token_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(wallet_address.to_lowercase().as_bytes());
    hasher.update(b":");
    hasher.update(token_id.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verifies soulbound proofs.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Whether `proof` binds a valid soulbound token to `wallet_address`.
    async fn verify(
        &self,
        wallet_address: &str,
        proof: &SoulboundProof,
    ) -> Result<bool, IdentityVerifierError>;
}

/// Offline verifier over locally known wallet → token bindings.
pub struct StaticIdentityVerifier {
    bindings: Arc<RwLock<HashMap<String, String>>>,
}

impl StaticIdentityVerifier {
    pub fn new() -> Self {
        Self {
            bindings: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Record that `token_id` is soulbound to `wallet_address`.
    pub async fn bind(&self, wallet_address: &str, token_id: &str) {
        let mut bindings = self.bindings.write().await;
        bindings.insert(wallet_address.to_lowercase(), token_id.to_string());
    }

    /// Load many bindings at once.
    pub async fn load_bindings(&self, bindings: impl IntoIterator<Item = (String, String)>) {
        let mut map = self.bindings.write().await;
        for (wallet, token) in bindings {
            map.insert(wallet.to_lowercase(), token);
        }
    }
}

impl Default for StaticIdentityVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn verify(
        &self,
        wallet_address: &str,
        proof: &SoulboundProof,
    ) -> Result<bool, IdentityVerifierError> {
        if proof.token_id.is_empty() || proof.digest.is_empty() {
            return Err(IdentityVerifierError::Malformed(
                "token_id and digest are required".to_string(),
            ));
        }

        let bindings = self.bindings.read().await;
        let bound = bindings
            .get(&wallet_address.to_lowercase())
            .is_some_and(|token| *token == proof.token_id);

        Ok(bound && proof.digest == proof_digest(wallet_address, &proof.token_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_verifier() {
        let verifier = StaticIdentityVerifier::new();
        verifier.bind("0xABC", "sbt-1").await;

        // Valid proof, wallet casing ignored
        let proof = SoulboundProof::for_wallet("0xabc", "sbt-1");
        assert!(verifier.verify("0xAbC", &proof).await.unwrap());

        // Token bound to someone else
        let stolen = SoulboundProof::for_wallet("0xdef", "sbt-1");
        assert!(!verifier.verify("0xdef", &stolen).await.unwrap());

        // Forged digest
        let forged = SoulboundProof {
            token_id: "sbt-1".to_string(),
            digest: "00".repeat(32),
        };
        assert!(!verifier.verify("0xabc", &forged).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_proof() {
        let verifier = StaticIdentityVerifier::new();
        let proof = SoulboundProof {
            token_id: String::new(),
            digest: String::new(),
        };

        let result = verifier.verify("0xabc", &proof).await;
        assert!(matches!(result, Err(IdentityVerifierError::Malformed(_))));
    }

    #[test]
    fn test_digest_is_hex_sha256() {
        let digest = proof_digest("0xabc", "sbt-1");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, proof_digest("0xABC", "sbt-1"));
    }
}
