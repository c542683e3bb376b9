//! Entropy fetch hooks.
//!
//! Hooks are notified after a successful fetch. Dispatch is best-effort: a
//! failing or unknown hook is logged and never fails the fetch.

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::types::EntropyFetchEvent;

/// Error types for hook dispatch.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// No hook registered under the identifier
    #[error("Unknown hook: {0}")]
    Unknown(String),

    /// Hook ran and failed
    #[error("Hook '{hook}' failed: {reason}")]
    Failed { hook: String, reason: String },
}

/// Receiver of entropy fetch notifications.
#[async_trait]
pub trait EntropyHook: Send + Sync {
    /// Called with `{node_id, entropy}` after a successful fetch.
    async fn on_entropy_fetch(&self, event: &EntropyFetchEvent) -> Result<(), HookError>;
}

/// Outcome of one dispatch round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookReport {
    /// Hooks that ran successfully
    pub delivered: usize,
    /// Hooks that were unknown or failed
    pub failed: usize,
}

/// Registry mapping identifiers to hooks.
pub struct HookRegistry {
    hooks: DashMap<String, Arc<dyn EntropyHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self {
            hooks: DashMap::new(),
        }
    }

    /// Register (or replace) a hook.
    pub fn register(&self, name: impl Into<String>, hook: Arc<dyn EntropyHook>) {
        let name = name.into();
        debug!(hook = %name, "Registering entropy hook");
        self.hooks.insert(name, hook);
    }

    /// Remove a hook.
    pub fn unregister(&self, name: &str) -> bool {
        self.hooks.remove(name).is_some()
    }

    /// Whether a hook is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }

    /// Notify the named hooks concurrently.
    pub async fn dispatch(&self, names: &[String], event: &EntropyFetchEvent) -> HookReport {
        if names.is_empty() {
            return HookReport::default();
        }

        let calls = names.iter().map(|name| {
            let hook = self.hooks.get(name).map(|h| Arc::clone(h.value()));
            async move {
                let result = match hook {
                    Some(hook) => hook.on_entropy_fetch(event).await,
                    None => Err(HookError::Unknown(name.clone())),
                };
                (name, result)
            }
        });

        let mut report = HookReport::default();
        for (name, result) in join_all(calls).await {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(hook = %name, node_id = %event.node_id, error = %e, "Entropy hook failed");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Hook that logs each fetch.
pub struct LoggingHook;

#[async_trait]
impl EntropyHook for LoggingHook {
    async fn on_entropy_fetch(&self, event: &EntropyFetchEvent) -> Result<(), HookError> {
        debug!(node_id = %event.node_id, entropy = %event.entropy, "Entropy fetched");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHook(AtomicUsize);

    #[async_trait]
    impl EntropyHook for CountingHook {
        async fn on_entropy_fetch(&self, _event: &EntropyFetchEvent) -> Result<(), HookError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingHook;

    #[async_trait]
    impl EntropyHook for FailingHook {
        async fn on_entropy_fetch(&self, _event: &EntropyFetchEvent) -> Result<(), HookError> {
            Err(HookError::Failed {
                hook: "failing".to_string(),
                reason: "downstream unavailable".to_string(),
            })
        }
    }

    fn event() -> EntropyFetchEvent {
        EntropyFetchEvent {
            node_id: "node-1".to_string(),
            entropy: json!("abc123"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_reports_failures() {
        let registry = HookRegistry::new();
        let counter = Arc::new(CountingHook(AtomicUsize::new(0)));
        registry.register("count", counter.clone());
        registry.register("failing", Arc::new(FailingHook));
        registry.register("log", Arc::new(LoggingHook));

        let names = vec![
            "count".to_string(),
            "failing".to_string(),
            "missing".to_string(),
            "log".to_string(),
        ];
        let report = registry.dispatch(&names, &event()).await;

        assert_eq!(report, HookReport { delivered: 2, failed: 2 });
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_without_hooks() {
        let registry = HookRegistry::new();
        assert_eq!(registry.dispatch(&[], &event()).await, HookReport::default());
    }
}
