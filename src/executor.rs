//! The execution seam — the only way out of the gateway.
//!
//! The gateway treats the executor as opaque and untrusted for latency (a
//! bounded timeout applies at the call site) but trusted for the side
//! effect it performs. Implementations wrap virtualization API clients,
//! remote shells, and the like; the gateway never performs a side effect
//! itself.

use crate::types::{Action, SanitizedAction};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[async_trait]
pub trait Executor {
    /// Perform the side effect for an approved action. Returns a
    /// human-readable result summary.
    async fn execute(&self, action: &SanitizedAction) -> anyhow::Result<String>;
}

/// Logs and acknowledges without performing anything. Used by
/// `fleetgate serve` dry runs and as a safe default.
pub struct EchoExecutor;

#[async_trait]
impl Executor for EchoExecutor {
    async fn execute(&self, action: &SanitizedAction) -> anyhow::Result<String> {
        let a = action.action();
        tracing::info!(
            request_id = %a.request_id,
            "dispatch (echo): {} on {}",
            a.name,
            a.targets.join(", ")
        );
        Ok(format!("echo: {} on {}", a.name, a.targets.join(", ")))
    }
}

/// Test executor: records every dispatched action, can be told to fail
/// the next N calls, and can be slowed down (for retry, failure-path,
/// and concurrency tests).
#[derive(Default)]
pub struct RecordingExecutor {
    executed: Mutex<Vec<Action>>,
    fail_next: AtomicUsize,
    delay_ms: AtomicUsize,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` execute calls with an execution error.
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Sleep this long inside every execute call.
    pub fn set_delay(&self, delay: std::time::Duration) {
        self.delay_ms.store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    /// Actions that actually dispatched (in order).
    pub fn executed(&self) -> Vec<Action> {
        self.executed.lock().expect("recording executor poisoned").clone()
    }

    pub fn executed_count(&self) -> usize {
        self.executed.lock().expect("recording executor poisoned").len()
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn execute(&self, action: &SanitizedAction) -> anyhow::Result<String> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay as u64)).await;
        }

        loop {
            let remaining = self.fail_next.load(Ordering::SeqCst);
            if remaining == 0 {
                break;
            }
            if self
                .fail_next
                .compare_exchange(remaining, remaining - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                anyhow::bail!("injected execution failure");
            }
        }

        let a = action.action().clone();
        let summary = format!("executed {} on {}", a.name, a.targets.join(", "));
        self.executed
            .lock()
            .expect("recording executor poisoned")
            .push(a);
        Ok(summary)
    }
}
