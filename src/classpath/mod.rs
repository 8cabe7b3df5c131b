use std::path::PathBuf;

/// Turns the configured classpath into engine auxiliary entries and into the
/// output directories used to map sources onto compiled artifacts.
#[derive(Debug, Clone)]
pub struct ClasspathConfigurer {
    runtime_classpath: Vec<String>,
}

impl ClasspathConfigurer {
    /// Falls back to the process `CLASSPATH` when a configuration has none.
    pub fn from_env() -> Self {
        Self::with_runtime_classpath(crate::platform::runtime_classpath())
    }

    pub fn with_runtime_classpath(runtime_classpath: Vec<String>) -> Self {
        Self { runtime_classpath }
    }

    /// Auxiliary classpath for the engine. Configured entries are passed
    /// verbatim; archives are not checked for existence.
    pub fn apply(&self, classpaths: &[String]) -> Vec<String> {
        if !classpaths.is_empty() {
            return classpaths.to_vec();
        }
        log::debug!(
            "no project classpath configured; using {} runtime entries",
            self.runtime_classpath.len()
        );
        self.runtime_classpath.clone()
    }

    /// Entries that currently exist as directories.
    pub fn directories_from(&self, classpaths: &[String]) -> Vec<PathBuf> {
        classpaths
            .iter()
            .map(PathBuf::from)
            .filter(|p| p.is_dir())
            .collect()
    }
}

impl Default for ClasspathConfigurer {
    fn default() -> Self {
        Self::from_env()
    }
}
