//! Ritual log - executes and records rituals.

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use trust_core::{Result, TrustError};

use crate::types::{ActionRequest, Ritual, RitualAction, RitualStatus};

/// Append-only log of executed rituals.
pub struct RitualLog {
    rituals: RwLock<Vec<Ritual>>,
}

impl RitualLog {
    pub fn new() -> Self {
        Self {
            rituals: RwLock::new(Vec::new()),
        }
    }

    /// Execute a ritual: stamp every action and append the ritual.
    ///
    /// A ritual ID is generated when `ritual_id` is `None`; a supplied ID
    /// must not be in use.
    pub async fn execute(
        &self,
        ritual_id: Option<String>,
        initiator: &str,
        actions: &[ActionRequest],
    ) -> Result<Ritual> {
        let violations = violations(ritual_id.as_deref(), initiator, actions);
        if !violations.is_empty() {
            return Err(TrustError::Validation(violations.join("; ")));
        }

        let mut rituals = self.rituals.write().await;

        let id = match ritual_id {
            Some(id) if rituals.iter().any(|r| r.id == id) => {
                return Err(TrustError::Validation(format!(
                    "ritual {} already exists",
                    id
                )));
            }
            Some(id) => id,
            None => uuid::Uuid::new_v4().to_string(),
        };

        let now = Utc::now();
        let ritual = Ritual {
            id,
            initiator: initiator.to_string(),
            actions: actions
                .iter()
                .map(|a| RitualAction {
                    action_type: a.action_type.clone(),
                    target: a.target.clone(),
                    executed_at: Utc::now(),
                })
                .collect(),
            status: RitualStatus::Completed,
            timestamp: now,
        };

        debug!(ritual_id = %ritual.id, actions = ritual.actions.len(), "Ritual recorded");
        rituals.push(ritual.clone());
        Ok(ritual)
    }

    /// Look up a ritual.
    pub async fn get(&self, ritual_id: &str) -> Option<Ritual> {
        let rituals = self.rituals.read().await;
        rituals.iter().find(|r| r.id == ritual_id).cloned()
    }

    /// All rituals in execution order.
    pub async fn all(&self) -> Vec<Ritual> {
        self.rituals.read().await.clone()
    }

    /// Number of rituals executed.
    pub async fn len(&self) -> usize {
        self.rituals.read().await.len()
    }
}

impl Default for RitualLog {
    fn default() -> Self {
        Self::new()
    }
}

fn violations(ritual_id: Option<&str>, initiator: &str, actions: &[ActionRequest]) -> Vec<String> {
    let mut violations = Vec::new();

    if ritual_id.is_some_and(|id| id.trim().is_empty()) {
        violations.push("ritual_id must not be empty".to_string());
    }
    if initiator.trim().is_empty() {
        violations.push("initiator must not be empty".to_string());
    }
    if actions.is_empty() {
        violations.push("a ritual needs at least one action".to_string());
    }
    for (i, action) in actions.iter().enumerate() {
        if action.action_type.trim().is_empty() {
            violations.push(format!("actions[{}].type must not be empty", i));
        }
        if action.target.trim().is_empty() {
            violations.push(format!("actions[{}].target must not be empty", i));
        }
    }

    violations
}
