//! Protected resource guard — targets that can never be acted upon.
//!
//! The set is fixed at process start from configuration that no registry
//! action can reach: the point is that the gateway's own host, and any
//! host whose loss would collapse quorum, cannot be disabled by the thing
//! the gateway is guarding. Checked before tier classification and never
//! bypassed by any override grant.

use crate::error::GateError;
use globset::{Glob, GlobMatcher};

/// A protected entry: a resource-id pattern plus the reason it is off
/// limits. Patterns support globs so whole host families can be covered
/// (e.g. `ceph-mon-*`).
#[derive(Debug, Clone)]
pub struct ProtectedEntry {
    pub pattern: String,
    pub reason: String,
    matcher: GlobMatcher,
}

impl ProtectedEntry {
    pub fn new(pattern: impl Into<String>, reason: impl Into<String>) -> anyhow::Result<Self> {
        let pattern = pattern.into();
        let matcher = Glob::new(&pattern)?.compile_matcher();
        Ok(Self {
            pattern,
            reason: reason.into(),
            matcher,
        })
    }

    fn matches(&self, target: &str) -> bool {
        self.matcher.is_match(target)
    }
}

/// Fixed in-memory set of protected resources. Pure and read-only after
/// construction, so it needs no locking under concurrent submits.
#[derive(Debug, Clone)]
pub struct ProtectedResourceGuard {
    entries: Vec<ProtectedEntry>,
}

impl ProtectedResourceGuard {
    /// Build the guard from config-declared entries plus the mandatory
    /// additions:
    /// - `self_host`: the gateway's own execution host. Always protected.
    /// - `quorum_peers`: when the fixed peer set has 4 or fewer members,
    ///   losing any single one removes majority, so every peer is
    ///   protected.
    pub fn new(
        declared: Vec<ProtectedEntry>,
        self_host: &str,
        quorum_peers: &[String],
    ) -> anyhow::Result<Self> {
        let mut entries = declared;

        entries.push(ProtectedEntry::new(
            self_host,
            "the gateway's own execution host — cannot act on itself",
        )?);

        if quorum_peers.len() <= 4 {
            for peer in quorum_peers {
                entries.push(ProtectedEntry::new(
                    peer.clone(),
                    format!(
                        "quorum peer ({} of {} — losing one removes majority)",
                        peer,
                        quorum_peers.len()
                    ),
                )?);
            }
        }

        Ok(Self { entries })
    }

    /// Check a single target. Returns the reason when protected.
    pub fn is_protected(&self, target: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.matches(target))
            .map(|e| e.reason.as_str())
    }

    /// Check every target of an action. First protected target
    /// short-circuits with a typed rejection.
    pub fn check_all(&self, targets: &[String]) -> Result<(), GateError> {
        for target in targets {
            if let Some(reason) = self.is_protected(target) {
                return Err(GateError::ProtectedResource {
                    target: target.clone(),
                    reason: reason.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn entries(&self) -> &[ProtectedEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard_with(peers: &[&str]) -> ProtectedResourceGuard {
        let declared = vec![
            ProtectedEntry::new("pve-master", "control-plane host").unwrap(),
            ProtectedEntry::new("ceph-mon-*", "storage monitors").unwrap(),
        ];
        let peers: Vec<String> = peers.iter().map(|s| s.to_string()).collect();
        ProtectedResourceGuard::new(declared, "gateway-host", &peers).unwrap()
    }

    #[test]
    fn declared_entries_match() {
        let guard = guard_with(&[]);
        assert!(guard.is_protected("pve-master").is_some());
        assert!(guard.is_protected("ceph-mon-2").is_some());
        assert!(guard.is_protected("vm-101").is_none());
    }

    #[test]
    fn self_host_always_protected() {
        let guard = guard_with(&[]);
        assert!(guard.is_protected("gateway-host").is_some());
    }

    #[test]
    fn small_quorum_peers_protected() {
        let guard = guard_with(&["node-a", "node-b", "node-c"]);
        assert!(guard.is_protected("node-b").is_some());
    }

    #[test]
    fn large_quorum_peers_not_auto_protected() {
        let guard = guard_with(&["n1", "n2", "n3", "n4", "n5"]);
        assert!(guard.is_protected("n3").is_none());
    }

    #[test]
    fn check_all_short_circuits_on_any_target() {
        let guard = guard_with(&[]);
        let targets = vec!["vm-101".to_string(), "pve-master".to_string()];
        let err = guard.check_all(&targets).unwrap_err();
        assert!(err.to_string().contains("pve-master"));
    }
}
