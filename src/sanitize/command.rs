//! Command argument validation — allow-listed verbs only.
//!
//! Free-text remote commands are gated by an allow-list of permitted
//! command verbs, never a deny-list: an unknown verb is rejected outright.
//! Shell chaining and substitution characters are rejected before the verb
//! check so `systemctl status x; rm -rf /` cannot ride in on an allowed
//! verb.

use std::collections::HashSet;

/// Characters that turn one command into several, or splice in output.
const SHELL_METACHARACTERS: &[char] = &[';', '&', '|', '`', '$', '(', ')', '<', '>', '\n', '\r'];

/// Validate a free-text command against the verb allow-list.
pub fn validate_command(command: &str, allowed_verbs: &HashSet<String>) -> Result<(), String> {
    let trimmed = command.trim();
    if trimmed.is_empty() {
        return Err("empty command".to_string());
    }

    if let Some(bad) = trimmed.chars().find(|c| SHELL_METACHARACTERS.contains(c)) {
        return Err(format!(
            "command contains shell metacharacter '{}' — chaining and substitution are not permitted",
            bad.escape_default()
        ));
    }

    let verb = trimmed
        .split_whitespace()
        .next()
        .ok_or_else(|| "empty command".to_string())?;

    if !allowed_verbs.contains(verb) {
        return Err(format!(
            "command verb '{}' is not on the allow-list",
            verb
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verbs(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn allowed_verb_passes() {
        let allowed = verbs(&["systemctl", "journalctl", "uptime"]);
        assert!(validate_command("systemctl status nginx", &allowed).is_ok());
        assert!(validate_command("uptime", &allowed).is_ok());
    }

    #[test]
    fn unknown_verb_rejected_not_flagged() {
        let allowed = verbs(&["systemctl"]);
        let err = validate_command("rm -rf /var/lib", &allowed).unwrap_err();
        assert!(err.contains("allow-list"), "{}", err);
    }

    #[test]
    fn chaining_rejected_even_with_allowed_verb() {
        let allowed = verbs(&["systemctl", "rm"]);
        assert!(validate_command("systemctl status nginx; rm -rf /", &allowed).is_err());
        assert!(validate_command("systemctl status $(whoami)", &allowed).is_err());
        assert!(validate_command("systemctl status nginx | tee /etc/passwd", &allowed).is_err());
        assert!(validate_command("systemctl status `id`", &allowed).is_err());
    }

    #[test]
    fn empty_command_rejected() {
        let allowed = verbs(&["systemctl"]);
        assert!(validate_command("   ", &allowed).is_err());
    }
}
