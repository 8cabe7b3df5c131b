use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

const SOURCE_EXTENSION: &str = "java";
const CLASS_EXTENSION: &str = "class";
const ARCHIVE_EXTENSION: &str = "jar";

/// Conventional source roots, most specific first.
const SOURCE_ROOT_MARKERS: [&str; 4] = ["/src/main/java/", "/src/test/java/", "/src/java/", "/src/"];
const LOOSE_SOURCE_MARKER: &str = "/java/";

/// Ordered set of artifact paths; the first occurrence keeps its position.
#[derive(Debug, Default)]
struct TargetSet {
    paths: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl TargetSet {
    fn insert(&mut self, path: &Path) {
        let abs = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        if self.seen.insert(abs.clone()) {
            log::debug!("target: {}", abs.display());
            self.paths.push(abs);
        }
    }

    fn len(&self) -> usize {
        self.paths.len()
    }
}

/// Maps user-selected paths (sources, compiled units, archives, directories)
/// onto the compiled artifacts the engine can analyze.
///
/// There is no build graph to consult, so sources are matched against the
/// given output directories by path convention, then by simple file name.
#[derive(Debug, Clone, Default)]
pub struct TargetResolver {
    output_dirs: Vec<PathBuf>,
}

impl TargetResolver {
    pub fn new(output_dirs: Vec<PathBuf>) -> Self {
        Self { output_dirs }
    }

    pub fn output_dirs(&self) -> &[PathBuf] {
        &self.output_dirs
    }

    /// Deterministic for a given file-system state; the result only contains
    /// files that existed while resolving.
    pub fn resolve<S: AsRef<str>>(&self, inputs: &[S]) -> Vec<PathBuf> {
        let mut out = TargetSet::default();
        for input in inputs {
            let input = input.as_ref();
            if input.trim().is_empty() {
                continue;
            }
            self.resolve_one(Path::new(input), &mut out);
        }
        out.paths
    }

    fn resolve_one(&self, path: &Path, out: &mut TargetSet) {
        if path.is_dir() {
            if !self.collect_outputs_for_source_dir(path, out) {
                self.collect_recursively(path, out);
            }
            return;
        }
        if is_artifact(path) {
            if path.is_file() {
                out.insert(path);
            }
            return;
        }
        if has_extension(path, SOURCE_EXTENSION) {
            self.add_targets_for_source(path, out);
            return;
        }
        if path.is_file() {
            out.insert(path);
        }
    }

    /// Treats `dir` as a source directory and collects the matching output
    /// directories. Returns false when nothing was collected.
    fn collect_outputs_for_source_dir(&self, dir: &Path, out: &mut TargetSet) -> bool {
        if self.output_dirs.is_empty() {
            return false;
        }
        // Markers end in `/`, so a bare source root such as `.../src/main/java`
        // needs the slash to match; it then maps onto the whole output root.
        let as_dir = format!("{}/", slash_normalized(dir).trim_end_matches('/'));
        let Some(rel) = derive_relative_path(&as_dir) else {
            return false;
        };
        let rel = relative_path_buf(&rel);

        let mut added = false;
        for output_dir in &self.output_dirs {
            let candidate = output_dir.join(&rel);
            if !candidate.is_dir() {
                continue;
            }
            let before = out.len();
            self.collect_recursively(&candidate, out);
            if out.len() > before {
                log::debug!(
                    "source dir {} mapped to {}",
                    dir.display(),
                    candidate.display()
                );
                added = true;
            }
        }
        added
    }

    fn collect_recursively(&self, dir: &Path, out: &mut TargetSet) {
        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::debug!("skipping unreadable entry under {}: {err}", dir.display());
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if is_artifact(path) {
                out.insert(path);
            } else if has_extension(path, SOURCE_EXTENSION) {
                self.add_targets_for_source(path, out);
            }
        }
    }

    fn add_targets_for_source(&self, source: &Path, out: &mut TargetSet) -> bool {
        if self.output_dirs.is_empty() {
            return false;
        }

        if let Some(rel) = derive_relative_path(&slash_normalized(source)) {
            let class_rel = relative_path_buf(&rel).with_extension(CLASS_EXTENSION);
            for output_dir in &self.output_dirs {
                let candidate = output_dir.join(&class_rel);
                if candidate.is_file() {
                    out.insert(&candidate);
                    return true;
                }
            }
        }

        // Ambiguous when several classes share a simple name; the first match wins.
        let Some(stem) = source.file_stem().and_then(|s| s.to_str()) else {
            return false;
        };
        let wanted = format!("{stem}.{CLASS_EXTENSION}");
        for output_dir in &self.output_dirs {
            if let Some(found) = find_by_file_name(output_dir, &wanted) {
                log::debug!(
                    "basename fallback for {}: {}",
                    source.display(),
                    found.display()
                );
                out.insert(&found);
                return true;
            }
        }
        false
    }
}

pub fn resolve_targets<S: AsRef<str>>(inputs: &[S], output_dirs: &[PathBuf]) -> Vec<PathBuf> {
    TargetResolver::new(output_dirs.to_vec()).resolve(inputs)
}

/// Project-relative path of a source file, taken after the first source-root
/// marker. `None` when the path follows no known layout.
pub fn derive_relative_path(source_path: &str) -> Option<String> {
    let norm = source_path.replace('\\', "/");
    for marker in SOURCE_ROOT_MARKERS {
        if let Some(idx) = norm.find(marker) {
            return Some(norm[idx + marker.len()..].to_string());
        }
    }
    let idx = norm.rfind(LOOSE_SOURCE_MARKER)?;
    let rest = &norm[idx + LOOSE_SOURCE_MARKER.len()..];
    (!rest.is_empty()).then(|| rest.to_string())
}

fn find_by_file_name(dir: &Path, file_name: &str) -> Option<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .find(|e| e.file_type().is_file() && e.file_name().to_str() == Some(file_name))
        .map(|e| e.into_path())
}

fn relative_path_buf(rel: &str) -> PathBuf {
    rel.split(['/', '\\']).filter(|c| !c.is_empty()).collect()
}

fn slash_normalized(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

fn is_artifact(path: &Path) -> bool {
    has_extension(path, CLASS_EXTENSION) || has_extension(path, ARCHIVE_EXTENSION)
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}
