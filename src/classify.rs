//! Tier classifier — maps a sanitized action to a strictness tier.
//!
//! A static lookup from action name to base tier, then exactly two dynamic
//! escalation rules applied in order:
//!   (a) a NOTIFY action targeting a control-plane host escalates to
//!       CONFIRM;
//!   (b) an action touching more than one distinct target escalates one
//!       tier ("never touch more than one peer simultaneously").
//! Pure function of the action and the topology snapshot — no I/O, no
//! side effects.

use crate::registry::ActionRegistry;
use crate::types::{SanitizedAction, Tier};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::sync::Arc;

/// The outcome of classification: the effective tier plus a human-readable
/// trail of how it got there, carried into audit records and prompts.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub tier: Tier,
    pub rationale: Vec<String>,
}

/// Compiled classifier. Read-only after startup; trivially safe to share.
pub struct TierClassifier {
    registry: Arc<ActionRegistry>,
    control_hosts: GlobSet,
}

impl TierClassifier {
    /// Compile the control-plane host patterns alongside the registry.
    pub fn new(registry: Arc<ActionRegistry>, control_host_patterns: &[String]) -> anyhow::Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in control_host_patterns {
            builder.add(Glob::new(pattern)?);
        }
        Ok(Self {
            registry,
            control_hosts: builder.build()?,
        })
    }

    /// Classify a sanitized action. Unknown action names classify as
    /// FORBIDDEN — fail-closed, with the rationale naming the miss.
    pub fn classify(&self, action: &SanitizedAction) -> Classification {
        let action = action.action();

        let Some(spec) = self.registry.get(&action.name) else {
            return Classification {
                tier: Tier::Forbidden,
                rationale: vec![format!(
                    "unknown action '{}' — not in the registry, treated as forbidden",
                    action.name
                )],
            };
        };

        let mut tier = spec.tier;
        let mut rationale = vec![format!("base tier for '{}' is {}", action.name, tier)];

        // Rule (a): control-plane target hardens NOTIFY to CONFIRM.
        if tier == Tier::Notify {
            if let Some(host) = action
                .targets
                .iter()
                .find(|t| self.control_hosts.is_match(t.as_str()))
            {
                tier = Tier::Confirm;
                rationale.push(format!(
                    "escalated to {}: target '{}' is a control-plane host",
                    tier, host
                ));
            }
        }

        // Rule (b): multi-target actions escalate one tier.
        let radius = action.blast_radius();
        if radius > 1 {
            let escalated = tier.escalate();
            if escalated != tier {
                tier = escalated;
                rationale.push(format!(
                    "escalated to {}: {} distinct targets in one action",
                    tier, radius
                ));
            }
        }

        Classification { tier, rationale }
    }
}
