//! Mock contract gateway for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::gateway::{ContractCall, ContractGateway, GatewayError};

/// Mock gateway with scripted outcomes.
///
/// Scripted outcomes are consumed in order; once the script is empty every
/// call returns the default response.
pub struct MockGateway {
    script: Mutex<VecDeque<Result<serde_json::Value, GatewayError>>>,
    default_response: Result<serde_json::Value, GatewayError>,
    latency: Option<Duration>,
    call_count: AtomicU32,
    calls: Mutex<Vec<ContractCall>>,
}

impl MockGateway {
    /// Create a gateway that answers every call with `"mock-entropy"`.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default_response: Ok(serde_json::Value::String("mock-entropy".to_string())),
            latency: None,
            call_count: AtomicU32::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Set the response returned once the script is exhausted.
    pub fn with_response(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.default_response = Ok(value.into());
        self
    }

    /// Fail every unscripted call.
    pub fn always_failing(mut self) -> Self {
        self.default_response = Err(GatewayError::Network("mock gateway down".to_string()));
        self
    }

    /// Script `times` transient failures.
    pub fn fail_times(self, times: u32) -> Self {
        {
            let mut script = lock(&self.script);
            for i in 0..times {
                script.push_back(Err(GatewayError::Network(format!(
                    "scripted failure {}",
                    i + 1
                ))));
            }
        }
        self
    }

    /// Script a successful response.
    pub fn then_return(self, value: impl Into<serde_json::Value>) -> Self {
        lock(&self.script).push_back(Ok(value.into()));
        self
    }

    /// Script a specific error.
    pub fn then_fail(self, error: GatewayError) -> Self {
        lock(&self.script).push_back(Err(error));
        self
    }

    /// Delay every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Get the number of times call was invoked.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Calls received so far, in order.
    pub fn recorded_calls(&self) -> Vec<ContractCall> {
        lock(&self.calls).clone()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ContractGateway for MockGateway {
    async fn call(&self, call: &ContractCall) -> Result<serde_json::Value, GatewayError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        lock(&self.calls).push(call.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let scripted = lock(&self.script).pop_front();
        scripted.unwrap_or_else(|| self.default_response.clone())
    }
}
