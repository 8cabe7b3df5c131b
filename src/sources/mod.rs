use std::path::{Path, PathBuf};

use crate::core::Finding;

/// Maps an engine source reference (e.g. `com/acme/Foo.java`) onto a real
/// file. Tried in order: an existing absolute path, each source root, then
/// the invocation target when it names the same file.
pub fn resolve(source_ref: &str, source_roots: &[String], fallback_target: Option<&Path>) -> Option<PathBuf> {
    if source_ref.trim().is_empty() {
        return None;
    }

    let direct = Path::new(source_ref);
    if direct.is_absolute() && direct.exists() {
        return Some(direct.to_path_buf());
    }

    for root in source_roots {
        if root.trim().is_empty() {
            continue;
        }
        let candidate = Path::new(root).join(source_ref);
        if candidate.is_file() {
            return Some(absolute(&candidate));
        }
    }

    let target = fallback_target?;
    if !target.is_file() {
        return None;
    }
    let target_norm = slash_normalized(&target.display().to_string());
    let ref_norm = slash_normalized(source_ref);
    let same_name = target.file_name().is_some() && target.file_name() == direct.file_name();
    if target_norm.ends_with(&ref_norm) || same_name {
        return Some(absolute(target));
    }
    None
}

/// Fills `full_path` on each finding that can be resolved.
pub fn enrich(findings: &mut [Finding], source_roots: &[String], fallback_target: Option<&Path>) {
    for finding in findings.iter_mut() {
        if finding.real_source_path.is_empty() {
            continue;
        }
        match resolve(&finding.real_source_path, source_roots, fallback_target) {
            Some(full) => finding.full_path = Some(full.display().to_string()),
            None => log::debug!(
                "could not resolve source path: {}",
                finding.real_source_path
            ),
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn slash_normalized(s: &str) -> String {
    s.replace('\\', "/")
}
