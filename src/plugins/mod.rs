use std::ops::Deref;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginModule {
    pub id: String,
    pub path: PathBuf,
}

/// Resolves a configured plugin reference into a loadable module.
pub trait PluginProvider {
    fn provide(&self, reference: &str) -> Option<PluginModule>;
}

/// Accepts plugin archives that exist as regular files; the id is the file stem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsPluginProvider;

impl PluginProvider for FsPluginProvider {
    fn provide(&self, reference: &str) -> Option<PluginModule> {
        let path = Path::new(reference);
        if !path.is_file() {
            return None;
        }
        let id = path.file_stem()?.to_string_lossy().to_string();
        let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        Some(PluginModule { id, path })
    }
}

/// Plugin modules keyed by id, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginRegistry {
    modules: Vec<PluginModule>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from configured references. References the provider
    /// cannot resolve are skipped.
    pub fn load<P: PluginProvider + ?Sized>(provider: &P, references: &[String]) -> Self {
        let mut registry = Self::new();
        for reference in references {
            match provider.provide(reference) {
                Some(module) => registry.register(module),
                None => log::warn!("plugin skipped (not found): {reference}"),
            }
        }
        registry
    }

    /// Keeps the first module registered under an id.
    pub fn register(&mut self, module: PluginModule) {
        if self.get(&module.id).is_some() {
            log::warn!(
                "plugin id {} already registered; ignoring {}",
                module.id,
                module.path.display()
            );
            return;
        }
        self.modules.push(module);
    }

    pub fn get(&self, id: &str) -> Option<&PluginModule> {
        self.modules.iter().find(|m| m.id == id)
    }

    pub fn modules(&self) -> &[PluginModule] {
        &self.modules
    }

    pub fn ids(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Plugin modules visible to the engine for the current run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadingContext {
    active: Vec<PluginModule>,
}

impl LoadingContext {
    pub fn active(&self) -> &[PluginModule] {
        &self.active
    }

    /// Installs `registry` for the lifetime of the returned guard.
    pub fn enter(&mut self, registry: &PluginRegistry) -> PluginScope<'_> {
        PluginScope::enter(self, registry)
    }
}

/// Temporarily replaces the active plugin set of a [`LoadingContext`].
///
/// The previous set is reinstalled when the scope is dropped, including
/// during unwinding.
#[derive(Debug)]
pub struct PluginScope<'a> {
    context: &'a mut LoadingContext,
    previous: Vec<PluginModule>,
}

impl<'a> PluginScope<'a> {
    pub fn enter(context: &'a mut LoadingContext, registry: &PluginRegistry) -> Self {
        let previous = std::mem::replace(&mut context.active, registry.modules().to_vec());
        if !registry.is_empty() {
            log::debug!("plugin scope entered: {:?}", registry.ids());
        }
        Self { context, previous }
    }
}

impl Deref for PluginScope<'_> {
    type Target = LoadingContext;

    fn deref(&self) -> &Self::Target {
        &*self.context
    }
}

impl Drop for PluginScope<'_> {
    fn drop(&mut self) {
        self.context.active = std::mem::take(&mut self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::atomic::{AtomicU64, Ordering};

    struct FixedProvider;

    impl PluginProvider for FixedProvider {
        fn provide(&self, reference: &str) -> Option<PluginModule> {
            (!reference.starts_with("missing")).then(|| PluginModule {
                id: reference.trim_end_matches(".jar").to_string(),
                path: PathBuf::from("/plugins").join(reference),
            })
        }
    }

    fn module(id: &str) -> PluginModule {
        PluginModule {
            id: id.to_string(),
            path: PathBuf::from(format!("/plugins/{id}.jar")),
        }
    }

    #[test]
    fn unresolvable_references_are_skipped() {
        let refs = vec![
            "fb-contrib.jar".to_string(),
            "missing.jar".to_string(),
            "findsecbugs.jar".to_string(),
        ];
        let registry = PluginRegistry::load(&FixedProvider, &refs);
        assert_eq!(registry.ids(), vec!["fb-contrib", "findsecbugs"]);
    }

    #[test]
    fn duplicate_ids_keep_first_registration() {
        let mut registry = PluginRegistry::new();
        registry.register(module("a"));
        registry.register(PluginModule {
            id: "a".to_string(),
            path: PathBuf::from("/elsewhere/a.jar"),
        });
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("a").map(|m| m.path.clone()),
            Some(PathBuf::from("/plugins/a.jar"))
        );
    }

    #[test]
    fn scope_restores_previous_modules_on_drop() {
        let mut ctx = LoadingContext::default();
        let mut outer = PluginRegistry::new();
        outer.register(module("outer"));
        let mut inner = PluginRegistry::new();
        inner.register(module("inner"));

        {
            let scope = ctx.enter(&outer);
            assert_eq!(scope.active(), [module("outer")]);
        }
        assert!(ctx.active().is_empty());

        ctx.active = vec![module("outer")];
        {
            let scope = PluginScope::enter(&mut ctx, &inner);
            assert_eq!(scope.active(), [module("inner")]);
        }
        assert_eq!(ctx.active(), [module("outer")]);
    }

    #[test]
    fn scope_restores_previous_modules_when_unwinding() {
        let mut ctx = LoadingContext::default();
        let mut registry = PluginRegistry::new();
        registry.register(module("boom"));

        let result = catch_unwind(AssertUnwindSafe(|| {
            let _scope = ctx.enter(&registry);
            panic!("engine exploded");
        }));
        assert!(result.is_err());
        assert!(ctx.active().is_empty());
    }

    #[test]
    fn fs_provider_requires_existing_file() {
        static SEQ: AtomicU64 = AtomicU64::new(0);
        let seq = SEQ.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "bugbridge-plugins-test-{}-{seq}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).expect("create dir");
        let jar = dir.join("findsecbugs-plugin.jar");
        std::fs::write(&jar, b"PK").expect("write");

        let found = FsPluginProvider
            .provide(&jar.display().to_string())
            .expect("existing plugin");
        assert_eq!(found.id, "findsecbugs-plugin");
        assert!(FsPluginProvider
            .provide(&dir.join("nope.jar").display().to_string())
            .is_none());
        assert!(FsPluginProvider.provide(&dir.display().to_string()).is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
