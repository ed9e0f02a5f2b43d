//! The action registry — single source of truth for every action the
//! gateway knows about.
//!
//! One `ActionSpec` per action carries the name, base tier, human
//! description, expected argument kinds, and idempotence flag. The
//! classifier, the sanitizer's expectations, and the wire-facing
//! descriptions all derive from this one table, so adding an action is a
//! single registration — there is no second or third place to forget.

use crate::types::Tier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which argument kinds an action expects. The sanitizer rejects an action
/// that supplies an argument kind its spec does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgKind {
    Path,
    Url,
    Command,
}

/// Everything the gateway knows about a single action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    /// Registry identifier, e.g. "guest_stop".
    pub name: String,

    /// Base tier before escalation rules.
    pub tier: Tier,

    /// Shown to humans in confirmation prompts and `fleetgate check`.
    pub description: String,

    /// Argument kinds this action may carry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<ArgKind>,

    /// Whether a repeat of this action is harmless. Gates the bounded
    /// single retry for NOTIFY-tier autonomous actions.
    #[serde(default)]
    pub idempotent: bool,
}

/// Closed lookup table of actions, built once at startup from config.
#[derive(Debug, Clone)]
pub struct ActionRegistry {
    specs: HashMap<String, ActionSpec>,
}

impl ActionRegistry {
    /// Build a registry, validating the single-source-of-truth rules:
    /// unique names, non-empty names and descriptions. Fails fast at
    /// startup rather than mis-classifying at runtime.
    pub fn new(specs: Vec<ActionSpec>) -> anyhow::Result<Self> {
        let mut map = HashMap::with_capacity(specs.len());
        for (i, spec) in specs.into_iter().enumerate() {
            if spec.name.trim().is_empty() {
                anyhow::bail!("action at position {} has an empty name", i);
            }
            if spec.description.trim().is_empty() {
                anyhow::bail!(
                    "action '{}' has no description — humans approve what they can read",
                    spec.name
                );
            }
            if map.contains_key(&spec.name) {
                anyhow::bail!("duplicate action name '{}' at position {}", spec.name, i);
            }
            map.insert(spec.name.clone(), spec);
        }
        if map.is_empty() {
            anyhow::bail!("action registry is empty — the gateway would reject everything");
        }
        Ok(Self { specs: map })
    }

    /// Look up an action by name. `None` means unknown, which the
    /// classifier treats as FORBIDDEN.
    pub fn get(&self, name: &str) -> Option<&ActionSpec> {
        self.specs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// All specs, sorted by name (for `fleetgate check` output).
    pub fn sorted_specs(&self) -> Vec<&ActionSpec> {
        let mut specs: Vec<&ActionSpec> = self.specs.values().collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }
}
