//! Guardrails for the unattended remediation path.
//!
//! Three controls, applied only when the actor is autonomous-remediation:
//! a global kill switch (checked first, leaves human actions untouched), a
//! per-rule rolling-window rate limit, and a blast-radius block that
//! refuses any multi-target action outright — there is no human present to
//! confirm an escalation.
//!
//! The counter increment-and-check is one atomic unit under the lock: two
//! concurrent attempts cannot both slip through the boundary.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Outcome of a guardrail check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardrailVerdict {
    Allowed,
    Blocked(String),
}

impl GuardrailVerdict {
    pub fn is_blocked(&self) -> bool {
        matches!(self, GuardrailVerdict::Blocked(_))
    }
}

#[derive(Debug)]
struct WindowCounter {
    window_start: Instant,
    attempts: u32,
}

/// Rate limiting, kill switch, and blast-radius limits for autonomous
/// actions.
pub struct GuardrailSet {
    kill_switch: AtomicBool,
    max_attempts: u32,
    window: Duration,
    counters: Mutex<HashMap<String, WindowCounter>>,
}

impl GuardrailSet {
    pub fn new(max_attempts: u32, window: Duration, kill_switch_engaged: bool) -> Self {
        Self {
            kill_switch: AtomicBool::new(kill_switch_engaged),
            max_attempts,
            window,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Engage or release the global kill switch. Blocks all autonomous
    /// actions while set; human-confirmed actions are unaffected.
    pub fn set_kill_switch(&self, engaged: bool) {
        self.kill_switch.store(engaged, Ordering::SeqCst);
        if engaged {
            tracing::warn!("autonomous kill switch ENGAGED — all unattended actions blocked");
        } else {
            tracing::info!("autonomous kill switch released");
        }
    }

    pub fn kill_switch_engaged(&self) -> bool {
        self.kill_switch.load(Ordering::SeqCst)
    }

    /// Check an autonomous attempt against all three controls.
    ///
    /// `rule_id` keys the rolling-window counter (the remediation rule
    /// that produced the action). The counter is incremented as part of
    /// the check; the N-th attempt within the window is allowed, the
    /// (N+1)-th is blocked with a human-visible escalation.
    pub fn check(&self, rule_id: &str, blast_radius: usize) -> GuardrailVerdict {
        if self.kill_switch_engaged() {
            return GuardrailVerdict::Blocked(
                "autonomous kill switch is engaged".to_string(),
            );
        }

        if blast_radius > 1 {
            return GuardrailVerdict::Blocked(format!(
                "autonomous action would touch {} targets — multi-target remediation is never \
                 unattended",
                blast_radius
            ));
        }

        let now = Instant::now();
        let mut counters = self.counters.lock().expect("guardrail counters poisoned");
        let counter = counters.entry(rule_id.to_string()).or_insert(WindowCounter {
            window_start: now,
            attempts: 0,
        });

        if now.duration_since(counter.window_start) >= self.window {
            counter.window_start = now;
            counter.attempts = 0;
        }

        counter.attempts += 1;
        if counter.attempts > self.max_attempts {
            let reason = format!(
                "remediation rule '{}' exceeded {} attempts in the current window — escalating \
                 to a human instead of retrying",
                rule_id, self.max_attempts
            );
            tracing::error!("{}", reason);
            return GuardrailVerdict::Blocked(reason);
        }

        GuardrailVerdict::Allowed
    }
}
