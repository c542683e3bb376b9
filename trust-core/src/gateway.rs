//! Contract gateway abstraction.
//!
//! The gateway is the only path to on-chain state. Calls are fallible and
//! possibly slow; callers decide how to retry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Error types for contract calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Call did not complete in time
    #[error("Contract call timed out after {0}ms")]
    Timeout(u64),

    /// Transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// The contract rejected the call
    #[error("Contract reverted: {0}")]
    Reverted(String),
}

/// Reference to a deployed contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(transparent)]
pub struct ContractRef(pub String);

impl ContractRef {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContractRef {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

/// Output encoding requested from the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Hex string (`0x...`)
    #[default]
    Hex,
    /// Decimal string of a 256-bit unsigned integer
    Uint256,
    /// Raw 32-byte word
    Bytes32,
    /// Decoded JSON value
    Json,
}

/// A single contract invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractCall {
    /// Target contract
    pub contract: ContractRef,
    /// Method name
    pub method: String,
    /// Requested output format
    pub format: OutputFormat,
    /// Positional arguments
    pub args: Vec<serde_json::Value>,
}

impl ContractCall {
    /// Create a call without arguments.
    pub fn new(contract: ContractRef, method: impl Into<String>, format: OutputFormat) -> Self {
        Self {
            contract,
            method: method.into(),
            format,
            args: Vec::new(),
        }
    }

    /// Append a positional argument.
    pub fn with_arg(mut self, arg: impl Serialize) -> Result<Self, serde_json::Error> {
        self.args.push(serde_json::to_value(arg)?);
        Ok(self)
    }
}

/// Caller for on-chain contracts.
#[async_trait]
pub trait ContractGateway: Send + Sync {
    /// Invoke a contract method and return its decoded output.
    async fn call(&self, call: &ContractCall) -> Result<serde_json::Value, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_call_arguments_in_order() {
        let call = ContractCall::new(ContractRef::new("governance"), "castVote", OutputFormat::Json)
            .with_arg("proposal-7")
            .and_then(|c| c.with_arg(3u8))
            .unwrap();
        assert_eq!(call.args, vec![json!("proposal-7"), json!(3)]);
    }

    #[test]
    fn test_unserializable_argument_is_rejected() {
        let mut tally = HashMap::new();
        tally.insert((1u8, 2u8), "for");

        let result = ContractCall::new(ContractRef::new("governance"), "castVote", OutputFormat::Json)
            .with_arg(tally);
        assert!(result.is_err());
    }
}
