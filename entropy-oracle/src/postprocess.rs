//! Post-processor registry.
//!
//! Nodes name their post-processor by identifier; the identifier is
//! resolved here at fetch time. Post-processors are pure functions from raw
//! to processed entropy and are never retried.

use dashmap::DashMap;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

use trust_core::{Result, TrustError};

use crate::types::{PostProcess, PostProcessType};

/// A post-processing function. `Err` carries the rejection reason.
pub type PostProcessFn = Arc<dyn Fn(&Value) -> std::result::Result<Value, String> + Send + Sync>;

/// Registry mapping identifiers to post-processors.
pub struct PostProcessorRegistry {
    processors: DashMap<String, PostProcessFn>,
}

impl PostProcessorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            processors: DashMap::new(),
        }
    }

    /// Create a registry with the built-in post-processors
    /// (`sha256`, `normalize_hex`).
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register("sha256", sha256_digest);
        registry.register("normalize_hex", normalize_hex);
        registry
    }

    /// Register (or replace) a post-processor.
    pub fn register<F>(&self, name: impl Into<String>, processor: F)
    where
        F: Fn(&Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!(post_processor = %name, "Registering post-processor");
        self.processors.insert(name, Arc::new(processor));
    }

    /// Whether a post-processor is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.processors.contains_key(name)
    }

    /// Registered identifiers.
    pub fn names(&self) -> Vec<String> {
        self.processors.iter().map(|e| e.key().clone()).collect()
    }

    /// Apply the configured post-processing to a raw value.
    pub fn apply(&self, step: &PostProcess, raw: Value) -> Result<Value> {
        if step.kind == PostProcessType::None {
            return Ok(raw);
        }

        let name = step
            .callback
            .as_deref()
            .ok_or_else(|| TrustError::UnknownPostProcessor(String::new()))?;

        let processor = self
            .processors
            .get(name)
            .map(|p| Arc::clone(p.value()))
            .ok_or_else(|| TrustError::UnknownPostProcessor(name.to_string()))?;

        processor.as_ref()(&raw).map_err(|reason| TrustError::PostProcess {
            callback: name.to_string(),
            reason,
        })
    }
}

impl Default for PostProcessorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Hex SHA-256 of the raw value. Strings hash their bytes; anything else
/// hashes its JSON encoding.
pub fn sha256_digest(raw: &Value) -> std::result::Result<Value, String> {
    let mut hasher = Sha256::new();
    match raw {
        Value::String(s) => hasher.update(s.as_bytes()),
        other => hasher.update(other.to_string().as_bytes()),
    }
    Ok(Value::String(hex::encode(hasher.finalize())))
}

/// Lowercase hex without the `0x` prefix.
pub fn normalize_hex(raw: &Value) -> std::result::Result<Value, String> {
    let s = raw
        .as_str()
        .ok_or_else(|| format!("expected a hex string, got {}", raw))?;
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("'{}' is not a hex string", s));
    }
    Ok(Value::String(digits.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_passthrough() {
        let registry = PostProcessorRegistry::new();
        let out = registry.apply(&PostProcess::none(), json!("abc123")).unwrap();
        assert_eq!(out, json!("abc123"));
    }

    #[test]
    fn test_sha256_builtin() {
        let registry = PostProcessorRegistry::with_builtins();
        let out = registry
            .apply(&PostProcess::callback("sha256"), json!("abc"))
            .unwrap();
        assert_eq!(
            out,
            json!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn test_normalize_hex() {
        assert_eq!(normalize_hex(&json!("0xDEADbeef")).unwrap(), json!("deadbeef"));
        assert!(normalize_hex(&json!("0xnothex")).is_err());
        assert!(normalize_hex(&json!(42)).is_err());
    }

    #[test]
    fn test_unknown_post_processor() {
        let registry = PostProcessorRegistry::with_builtins();
        let err = registry
            .apply(&PostProcess::callback("keccak"), json!("abc"))
            .unwrap_err();
        assert!(matches!(err, TrustError::UnknownPostProcessor(name) if name == "keccak"));
    }

    #[test]
    fn test_failing_post_processor_is_typed() {
        let registry = PostProcessorRegistry::with_builtins();
        let err = registry
            .apply(&PostProcess::callback("normalize_hex"), json!("zz"))
            .unwrap_err();
        assert!(matches!(err, TrustError::PostProcess { callback, .. } if callback == "normalize_hex"));
    }

    #[test]
    fn test_custom_post_processor() {
        let registry = PostProcessorRegistry::new();
        registry.register("uppercase", |raw: &Value| {
            raw.as_str()
                .map(|s| Value::String(s.to_uppercase()))
                .ok_or_else(|| "not a string".to_string())
        });

        assert!(registry.contains("uppercase"));
        let out = registry
            .apply(&PostProcess::callback("uppercase"), json!("abc"))
            .unwrap();
        assert_eq!(out, json!("ABC"));
    }
}
