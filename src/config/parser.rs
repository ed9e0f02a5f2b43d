//! YAML config parser for Fleetgate.
//!
//! Parses the gateway config file into the internal `GatewayConfig`,
//! validating everything eagerly so a bad registry entry or glob pattern
//! fails at startup rather than mis-deciding at runtime.
//!
//! # Example config file:
//! ```yaml
//! gateway: pve-fleet-v1
//! self_host: gateway-host
//! actions:
//!   - name: vm_status
//!     tier: observe
//!     description: Query a guest's power state and resource usage
//! protected:
//!   - id: pve-master
//!     reason: cluster control plane
//! ```

use crate::config::*;
use crate::registry::{ActionRegistry, ActionSpec, ArgKind};
use crate::types::Tier;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Raw YAML representation before validation and conversion.
#[derive(Debug, Deserialize)]
struct RawConfig {
    gateway: String,
    self_host: String,
    actions: Vec<RawAction>,
    #[serde(default)]
    protected: Vec<RawProtected>,
    #[serde(default)]
    control_hosts: Vec<String>,
    #[serde(default)]
    quorum_peers: Vec<String>,
    #[serde(default)]
    sanitizer: RawSanitizer,
    #[serde(default)]
    guardrails: RawGuardrails,
    #[serde(default)]
    confirmation_timeout_secs: Option<u64>,
    #[serde(default)]
    override_grants: RawOverride,
    #[serde(default)]
    execution_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawAction {
    name: String,
    tier: String,
    description: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    idempotent: bool,
}

#[derive(Debug, Deserialize)]
struct RawProtected {
    id: String,
    reason: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawSanitizer {
    #[serde(default)]
    base_dirs: Vec<String>,
    #[serde(default)]
    allowed_commands: Vec<String>,
    #[serde(default)]
    max_payload_bytes: Option<usize>,
    #[serde(default)]
    max_duration_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawGuardrails {
    #[serde(default)]
    rate_limit: Option<u32>,
    #[serde(default)]
    rate_window_secs: Option<u64>,
    #[serde(default)]
    kill_switch: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RawOverride {
    #[serde(default)]
    ttl_secs: Option<i64>,
    #[serde(default)]
    single_use: Option<bool>,
    #[serde(default)]
    credential_env: Option<String>,
}

/// Parse a YAML config file from a path.
pub fn parse_config_file(path: impl AsRef<Path>) -> Result<GatewayConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse a YAML config string into a validated `GatewayConfig`.
pub fn parse_config_str(yaml: &str) -> Result<GatewayConfig> {
    let raw: RawConfig = serde_yaml::from_str(yaml).context("Invalid YAML in config file")?;

    if raw.gateway.trim().is_empty() {
        bail!("Config must have a non-empty 'gateway' name");
    }
    if raw.self_host.trim().is_empty() {
        bail!("'self_host' must name the gateway's own execution host");
    }

    // Convert and validate the action registry — the single source of
    // truth for every other surface.
    let mut actions = Vec::with_capacity(raw.actions.len());
    for (i, raw_action) in raw.actions.into_iter().enumerate() {
        let action = convert_action(raw_action)
            .with_context(|| format!("Invalid action at position {} (0-indexed)", i))?;
        actions.push(action);
    }
    // Startup validation pass: fails fast on duplicates or empty fields.
    ActionRegistry::new(actions.clone()).context("Action registry validation failed")?;

    // Glob patterns must compile now, not at first match.
    for (i, p) in raw.protected.iter().enumerate() {
        globset::Glob::new(&p.id)
            .with_context(|| format!("protected entry {}: invalid pattern '{}'", i, p.id))?;
        if p.reason.trim().is_empty() {
            bail!("protected entry {} ('{}') has no reason", i, p.id);
        }
    }
    for pattern in &raw.control_hosts {
        globset::Glob::new(pattern)
            .with_context(|| format!("invalid control_hosts pattern '{}'", pattern))?;
    }

    let sanitizer = SanitizerConfig {
        base_dirs: raw.sanitizer.base_dirs.iter().map(Into::into).collect(),
        allowed_commands: raw.sanitizer.allowed_commands,
        max_payload_bytes: raw.sanitizer.max_payload_bytes.unwrap_or(64 * 1024),
        max_duration_secs: raw.sanitizer.max_duration_secs.unwrap_or(600),
    };
    for dir in &sanitizer.base_dirs {
        if !dir.is_absolute() {
            bail!(
                "sanitizer base_dirs entries must be absolute, got '{}'",
                dir.display()
            );
        }
    }

    let guardrails = GuardrailConfig {
        rate_limit: raw.guardrails.rate_limit.unwrap_or(3),
        rate_window_secs: raw.guardrails.rate_window_secs.unwrap_or(3600),
        kill_switch: raw.guardrails.kill_switch,
    };
    if guardrails.rate_limit == 0 {
        bail!("guardrails.rate_limit must be at least 1 (use the kill switch to stop everything)");
    }

    let override_grants = OverrideConfig {
        ttl_secs: raw.override_grants.ttl_secs.unwrap_or(300),
        single_use: raw.override_grants.single_use.unwrap_or(true),
        credential_env: raw.override_grants.credential_env,
    };
    if override_grants.ttl_secs <= 0 {
        bail!("override_grants.ttl_secs must be positive");
    }

    Ok(GatewayConfig {
        name: raw.gateway,
        actions,
        protected: raw
            .protected
            .into_iter()
            .map(|p| ProtectedDecl {
                pattern: p.id,
                reason: p.reason,
            })
            .collect(),
        control_hosts: raw.control_hosts,
        quorum_peers: raw.quorum_peers,
        self_host: raw.self_host,
        sanitizer,
        guardrails,
        confirmation_timeout_secs: raw.confirmation_timeout_secs.unwrap_or(300),
        override_grants,
        execution_timeout_secs: raw.execution_timeout_secs.unwrap_or(120),
    })
}

fn convert_action(raw: RawAction) -> Result<ActionSpec> {
    let tier = Tier::from_str_loose(&raw.tier)
        .ok_or_else(|| anyhow::anyhow!("unknown tier '{}' for action '{}'", raw.tier, raw.name))?;

    let args = raw
        .args
        .iter()
        .map(|a| match a.to_lowercase().as_str() {
            "path" => Ok(ArgKind::Path),
            "url" => Ok(ArgKind::Url),
            "command" | "cmd" => Ok(ArgKind::Command),
            other => bail!("unknown argument kind '{}' for action '{}'", other, raw.name),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ActionSpec {
        name: raw.name,
        tier,
        description: raw.description,
        args,
        idempotent: raw.idempotent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let yaml = r#"
gateway: test-v1
self_host: gw-host
actions:
  - name: vm_status
    tier: observe
    description: Query guest state
"#;
        let config = parse_config_str(yaml).unwrap();
        assert_eq!(config.name, "test-v1");
        assert_eq!(config.actions.len(), 1);
        assert_eq!(config.actions[0].tier, Tier::Observe);
        // Defaults applied.
        assert_eq!(config.guardrails.rate_limit, 3);
        assert_eq!(config.confirmation_timeout_secs, 300);
    }

    #[test]
    fn parse_full_config() {
        let config = parse_config_str(crate::config::defaults::PVE_FLEET_YAML).unwrap();
        assert_eq!(config.name, "pve-fleet-v1");
        assert!(config.actions.len() >= 8);
        assert!(!config.protected.is_empty());
        assert!(!config.control_hosts.is_empty());
    }

    #[test]
    fn reject_unknown_tier() {
        let yaml = r#"
gateway: test
self_host: gw
actions:
  - name: vm_status
    tier: mysterious
    description: x
"#;
        assert!(parse_config_str(yaml).is_err());
    }

    #[test]
    fn reject_duplicate_action() {
        let yaml = r#"
gateway: test
self_host: gw
actions:
  - name: vm_status
    tier: observe
    description: x
  - name: vm_status
    tier: confirm
    description: y
"#;
        assert!(parse_config_str(yaml).is_err());
    }

    #[test]
    fn reject_missing_self_host() {
        let yaml = r#"
gateway: test
self_host: ""
actions:
  - name: vm_status
    tier: observe
    description: x
"#;
        assert!(parse_config_str(yaml).is_err());
    }

    #[test]
    fn reject_relative_base_dir() {
        let yaml = r#"
gateway: test
self_host: gw
actions:
  - name: vm_status
    tier: observe
    description: x
sanitizer:
  base_dirs: ["relative/dir"]
"#;
        assert!(parse_config_str(yaml).is_err());
    }

    #[test]
    fn reject_protected_without_reason() {
        let yaml = r#"
gateway: test
self_host: gw
actions:
  - name: vm_status
    tier: observe
    description: x
protected:
  - id: pve-master
    reason: ""
"#;
        assert!(parse_config_str(yaml).is_err());
    }

    #[test]
    fn reject_bad_arg_kind() {
        let yaml = r#"
gateway: test
self_host: gw
actions:
  - name: vm_status
    tier: observe
    description: x
    args: [telepathy]
"#;
        assert!(parse_config_str(yaml).is_err());
    }
}
