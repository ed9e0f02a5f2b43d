//! Built-in gateway config templates that ship with Fleetgate.
//!
//! These provide starting points for different fleet shapes:
//! - `pve-fleet`: A small Proxmox-style virtualization cluster with a
//!   handful of hypervisors and an autonomous remediation loop
//! - `single-host`: One box, no quorum, no control plane — homelab scale

/// Default fleet config.
/// A small hypervisor cluster: a quorum of three peers, one control-plane
/// host, and the usual spread of read-only, low-risk, and dangerous
/// operations.
pub const PVE_FLEET_YAML: &str = r#"# Fleetgate config: pve-fleet
# A small virtualization cluster with an autonomous remediation loop.
# Review the protected list and quorum_peers before pointing real
# credentials at this.

gateway: pve-fleet-v1
self_host: gw-01

actions:
  # -- Read-only queries --
  - name: vm_status
    tier: observe
    description: Query a guest's power state and resource usage
    idempotent: true
  - name: node_health
    tier: observe
    description: Read a hypervisor's load, memory, and storage headroom
    idempotent: true
  - name: read_log
    tier: observe
    description: Tail a service or guest log file
    args: [path]
    idempotent: true

  # -- Low-risk, reversible --
  - name: service_restart
    tier: notify
    description: Restart a systemd unit on a guest
    idempotent: true
  - name: guest_stop
    tier: notify
    description: Gracefully stop a guest (ACPI shutdown)
    idempotent: true
  - name: iso_download
    tier: notify
    description: Fetch an installer image into the ISO store
    args: [url, path]
    idempotent: true

  # -- Dangerous, needs a human --
  - name: host_reboot
    tier: confirm
    description: Reboot a hypervisor node
  - name: guest_destroy
    tier: confirm
    description: Delete a guest and its disks
  - name: shell_exec
    tier: confirm
    description: Run an allow-listed command on a host
    args: [command]

  # -- Never --
  - name: wipe_disk
    tier: forbidden
    description: Reinitialize a physical disk

protected:
  - id: pve-master
    reason: cluster control plane — losing it orphans every node
  - id: "backup-*"
    reason: backup targets are the recovery path, never a remediation target
  - id: "*-fw"
    reason: firewall appliances gate all management access

control_hosts:
  - "pve-*"

quorum_peers:
  - pve-a
  - pve-b
  - pve-c

sanitizer:
  base_dirs: ["/var/lib/vz", "/var/log/fleet"]
  allowed_commands: [systemctl, qm, pct, journalctl, zpool, df]
  max_payload_bytes: 65536
  max_duration_secs: 600

guardrails:
  rate_limit: 3
  rate_window_secs: 3600
  kill_switch: false

confirmation_timeout_secs: 300

override_grants:
  ttl_secs: 300
  single_use: true
  credential_env: FLEETGATE_OVERRIDE_SECRET

execution_timeout_secs: 120
"#;

/// Single-host config.
/// No quorum, no control-plane patterns. The self-host protection still
/// applies, so the gateway cannot be told to reboot itself.
pub const SINGLE_HOST_YAML: &str = r#"# Fleetgate config: single-host
# One machine, no cluster. Good for a homelab box.

gateway: single-host-v1
self_host: gw-local

actions:
  - name: vm_status
    tier: observe
    description: Query a guest's power state and resource usage
    idempotent: true
  - name: read_log
    tier: observe
    description: Tail a service or guest log file
    args: [path]
    idempotent: true
  - name: service_restart
    tier: notify
    description: Restart a systemd unit on a guest
    idempotent: true
  - name: guest_stop
    tier: notify
    description: Gracefully stop a guest (ACPI shutdown)
    idempotent: true
  - name: host_reboot
    tier: confirm
    description: Reboot the hypervisor
  - name: wipe_disk
    tier: forbidden
    description: Reinitialize a physical disk

sanitizer:
  base_dirs: ["/var/lib/vz"]
  allowed_commands: [systemctl, qm, journalctl]

override_grants:
  ttl_secs: 300
  single_use: true
  credential_env: FLEETGATE_OVERRIDE_SECRET
"#;

/// Get the YAML content for a named built-in config template.
pub fn get_default_config(name: &str) -> Option<&'static str> {
    match name.to_lowercase().as_str() {
        "pve-fleet" | "pve_fleet" | "fleet" => Some(PVE_FLEET_YAML),
        "single-host" | "single_host" | "single" => Some(SINGLE_HOST_YAML),
        _ => None,
    }
}

/// List all available built-in config template names.
pub fn available_templates() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "pve-fleet",
            "Small hypervisor cluster with quorum peers and an autonomous remediation loop",
        ),
        (
            "single-host",
            "One machine, no cluster — homelab scale",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::parse_config_str;

    #[test]
    fn all_templates_parse() {
        for (name, _) in available_templates() {
            let yaml = get_default_config(name).unwrap();
            parse_config_str(yaml)
                .unwrap_or_else(|e| panic!("built-in template '{}' must parse: {:#}", name, e));
        }
    }

    #[test]
    fn unknown_template_is_none() {
        assert!(get_default_config("nope").is_none());
    }
}
