//! Command Sanitizer — validates and normalizes raw action arguments
//! before anything else in the pipeline sees them.
//!
//! The sanitizer never executes or shells out. It produces either a
//! `SanitizedAction` with canonical arguments or a typed rejection.

pub mod command;
pub mod path;
pub mod url;

use crate::error::GateError;
use crate::registry::{ActionRegistry, ArgKind};
use crate::types::{Action, SanitizedAction};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Sanitizer configuration + compiled state. Built once at startup.
pub struct Sanitizer {
    registry: Arc<ActionRegistry>,
    base_dirs: Vec<PathBuf>,
    allowed_verbs: HashSet<String>,
    max_payload_bytes: usize,
    max_duration_secs: u64,
}

impl Sanitizer {
    pub fn new(
        registry: Arc<ActionRegistry>,
        base_dirs: Vec<PathBuf>,
        allowed_verbs: HashSet<String>,
        max_payload_bytes: usize,
        max_duration_secs: u64,
    ) -> Self {
        Self {
            registry,
            base_dirs,
            allowed_verbs,
            max_payload_bytes,
            max_duration_secs,
        }
    }

    /// Validate and normalize an action's arguments.
    ///
    /// Checks, in order: structural (targets present, payload size,
    /// duration hint), argument kinds against the action's registry spec,
    /// then per-kind validation (path containment, https/DNS, command
    /// verbs). Async only because URL validation resolves DNS.
    pub async fn sanitize(&self, mut action: Action) -> Result<SanitizedAction, GateError> {
        if action.targets.is_empty() {
            return Err(GateError::Sanitization(
                "action has no targets".to_string(),
            ));
        }
        if action.targets.iter().any(|t| t.trim().is_empty()) {
            return Err(GateError::Sanitization(
                "action has an empty target identifier".to_string(),
            ));
        }
        if action.request_id.trim().is_empty() {
            return Err(GateError::Sanitization(
                "action has no request id".to_string(),
            ));
        }

        let payload = action.args.payload_bytes();
        if payload > self.max_payload_bytes {
            return Err(GateError::Sanitization(format!(
                "payload is {} bytes, over the {} byte cap",
                payload, self.max_payload_bytes
            )));
        }

        if let Some(hint) = action.args.duration_hint_secs {
            if hint > self.max_duration_secs {
                return Err(GateError::Sanitization(format!(
                    "duration hint {}s exceeds the {}s cap",
                    hint, self.max_duration_secs
                )));
            }
        }

        // Arg kinds must be declared by the action's registry spec. An
        // unknown action name skips this — the classifier fails it closed.
        if let Some(spec) = self.registry.get(&action.name) {
            let declared = |kind: ArgKind| spec.args.contains(&kind);
            if action.args.path.is_some() && !declared(ArgKind::Path) {
                return Err(GateError::Sanitization(format!(
                    "action '{}' does not take a path argument",
                    action.name
                )));
            }
            if action.args.url.is_some() && !declared(ArgKind::Url) {
                return Err(GateError::Sanitization(format!(
                    "action '{}' does not take a url argument",
                    action.name
                )));
            }
            if action.args.command.is_some() && !declared(ArgKind::Command) {
                return Err(GateError::Sanitization(format!(
                    "action '{}' does not take a command argument",
                    action.name
                )));
            }
        }

        if let Some(ref raw) = action.args.path {
            let resolved = path::resolve_within(&self.base_dirs, raw)
                .map_err(GateError::Sanitization)?;
            action.args.path = Some(resolved.to_string_lossy().into_owned());
        }

        if let Some(ref raw) = action.args.url {
            url::validate_https_url(raw)
                .await
                .map_err(GateError::Sanitization)?;
        }

        if let Some(ref raw) = action.args.command {
            command::validate_command(raw, &self.allowed_verbs)
                .map_err(GateError::Sanitization)?;
        }

        Ok(SanitizedAction::new(action))
    }
}
