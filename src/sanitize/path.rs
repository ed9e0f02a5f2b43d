//! Path argument validation — canonical form + base-directory containment.
//!
//! A path argument must land inside one of the configured base directories
//! after lexical normalization, and again after symlink resolution when the
//! path exists on disk. Any `..` escape is rejected before anything else
//! sees the path.

use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path: drop `.`, apply `..` against the built-up
/// prefix. Returns `None` when a `..` would climb out of the path entirely
/// (including past the root) — that is always an escape attempt.
pub fn lexical_normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // Popping past the start (or off the root) means escape.
                if !out.pop() {
                    return None;
                }
                if out.as_os_str().is_empty() {
                    return None;
                }
            }
            Component::Normal(c) => out.push(c),
        }
    }
    Some(out)
}

/// Resolve a raw path argument against the allow-list of base directories.
///
/// Relative paths resolve against the first base directory. The result is
/// checked for containment twice: lexically, and — when the path exists —
/// after `canonicalize` resolves symlinks, so a link pointing outside the
/// allow-list is caught.
pub fn resolve_within(base_dirs: &[PathBuf], raw: &str) -> Result<PathBuf, String> {
    if raw.trim().is_empty() {
        return Err("empty path argument".to_string());
    }
    if base_dirs.is_empty() {
        return Err("no base directories configured — path arguments are not accepted".to_string());
    }

    let candidate = Path::new(raw);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base_dirs[0].join(candidate)
    };

    let normalized = lexical_normalize(&joined)
        .ok_or_else(|| format!("path '{}' escapes via parent components", raw))?;

    if !contained_in_any(&normalized, base_dirs) {
        return Err(format!(
            "path '{}' resolves outside the allowed base directories",
            raw
        ));
    }

    // Symlink check: canonicalize the deepest existing ancestor and verify
    // the real location is still inside the allow-list.
    if let Some(real) = canonicalize_existing(&normalized) {
        if !contained_in_any(&real, base_dirs) {
            return Err(format!(
                "path '{}' resolves (via symlink) outside the allowed base directories",
                raw
            ));
        }
    }

    Ok(normalized)
}

fn contained_in_any(path: &Path, base_dirs: &[PathBuf]) -> bool {
    base_dirs.iter().any(|base| path.starts_with(base))
}

/// Canonicalize the path itself when it exists, otherwise the deepest
/// existing ancestor plus the remaining components. `None` when nothing in
/// the chain exists yet (pure lexical containment already passed).
fn canonicalize_existing(path: &Path) -> Option<PathBuf> {
    if let Ok(real) = path.canonicalize() {
        return Some(real);
    }
    let parent = path.parent()?;
    let real_parent = canonicalize_existing(parent)?;
    Some(real_parent.join(path.file_name()?))
}
