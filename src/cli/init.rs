//! `fleetgate init` — generate a starter config file.
//!
//! Writes a `fleetgate.yaml` in the current directory from one of the
//! built-in templates. The first thing a new deployment runs.

use crate::config::defaults;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

/// Run the `fleetgate init` command.
pub fn run_init(template: Option<&str>, output_path: Option<&str>) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let output_file = output_path
        .map(PathBuf::from)
        .unwrap_or_else(|| cwd.join("fleetgate.yaml"));

    if output_file.exists() {
        println!(
            "{} A config file already exists at {}",
            "⚠".yellow(),
            output_file.display()
        );
        println!("  Edit it directly, or pass --output to write elsewhere.");
        return Ok(());
    }

    let template_name = template.unwrap_or("pve-fleet");
    let yaml_content = defaults::get_default_config(template_name).ok_or_else(|| {
        let available: Vec<String> = defaults::available_templates()
            .iter()
            .map(|(name, desc)| format!("  {} — {}", name.bold(), desc))
            .collect();
        anyhow::anyhow!(
            "Unknown template '{}'. Available templates:\n{}",
            template_name,
            available.join("\n")
        )
    })?;

    std::fs::write(&output_file, yaml_content)
        .with_context(|| format!("Failed to write config file: {}", output_file.display()))?;

    println!();
    println!(
        "  {} Created {}",
        "✓".green().bold(),
        output_file.display().to_string().bold()
    );
    println!();
    println!("  Template: {}", template_name.cyan());
    println!();
    println!("  {} Before serving:", "ℹ".blue());
    println!("    • Set self_host to the gateway's own host name");
    println!("    • Fill in your real quorum peers and control-plane hosts");
    println!("    • Review the protected list — it cannot be changed at runtime");
    println!(
        "    • Export the override credential: {}",
        "FLEETGATE_OVERRIDE_SECRET=...".dimmed()
    );
    println!();
    println!("  {} Next steps:", "→".blue());
    println!(
        "    1. Validate it: {}",
        format!("fleetgate check {}", output_file.display()).dimmed()
    );
    println!(
        "    2. Start the gateway: {}",
        "fleetgate serve --config fleetgate.yaml".dimmed()
    );
    println!("    3. Watch the trail: {}", "fleetgate log".dimmed());
    println!();

    Ok(())
}
