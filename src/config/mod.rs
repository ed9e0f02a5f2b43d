//! Gateway configuration — loaded once at startup, read-only afterward.
//!
//! Nothing in the action registry can reach this surface: there is no
//! action whose effect is "edit the protected list" or "raise the rate
//! limit". That is deliberate and load-bearing.

pub mod defaults;
pub mod parser;

use crate::registry::ActionSpec;
use std::path::PathBuf;

/// One protected-resource declaration from config.
#[derive(Debug, Clone)]
pub struct ProtectedDecl {
    pub pattern: String,
    pub reason: String,
}

/// Sanitizer limits and allow-lists.
#[derive(Debug, Clone)]
pub struct SanitizerConfig {
    /// Base directories path arguments must stay inside.
    pub base_dirs: Vec<PathBuf>,
    /// Permitted command verbs for free-text command arguments.
    pub allowed_commands: Vec<String>,
    /// Maximum combined argument payload, in bytes.
    pub max_payload_bytes: usize,
    /// Maximum accepted duration hint, in seconds.
    pub max_duration_secs: u64,
}

/// Guardrail thresholds for the autonomous path.
#[derive(Debug, Clone)]
pub struct GuardrailConfig {
    /// Attempts of one remediation rule allowed per window.
    pub rate_limit: u32,
    /// Rolling window length, in seconds.
    pub rate_window_secs: u64,
    /// Initial kill-switch state.
    pub kill_switch: bool,
}

/// Override-grant settings. The credential itself is read from the
/// environment, never from this file.
#[derive(Debug, Clone)]
pub struct OverrideConfig {
    pub ttl_secs: i64,
    pub single_use: bool,
    /// Name of the environment variable holding the elevation secret.
    /// Unset (or empty at runtime) disables elevation.
    pub credential_env: Option<String>,
}

/// The whole validated configuration surface.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Config name/identifier (e.g. "pve-fleet-v1").
    pub name: String,
    /// One spec per registered action — the single source of truth.
    pub actions: Vec<ActionSpec>,
    /// Declared protected resources (glob patterns).
    pub protected: Vec<ProtectedDecl>,
    /// Control-plane host patterns for the NOTIFY→CONFIRM escalation.
    pub control_hosts: Vec<String>,
    /// Fixed peer set for the quorum rule.
    pub quorum_peers: Vec<String>,
    /// The gateway's own execution host. Always protected.
    pub self_host: String,
    pub sanitizer: SanitizerConfig,
    pub guardrails: GuardrailConfig,
    /// How long a pending confirmation waits before failing closed.
    pub confirmation_timeout_secs: u64,
    pub override_grants: OverrideConfig,
    /// Bound on a single executor dispatch.
    pub execution_timeout_secs: u64,
}

impl GatewayConfig {
    /// Resolve the elevation secret from the configured environment
    /// variable. `None` means elevation is disabled.
    pub fn override_secret(&self) -> Option<String> {
        let var = self.override_grants.credential_env.as_deref()?;
        std::env::var(var).ok().filter(|s| !s.is_empty())
    }
}
