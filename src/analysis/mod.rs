use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};

use crate::classpath::ClasspathConfigurer;
use crate::config::AnalysisConfig;
use crate::core::Finding;
use crate::engine::{self, Engine, EngineSession};
use crate::errors;
use crate::plugins::{FsPluginProvider, LoadingContext, PluginProvider, PluginRegistry};

/// Drives one engine run per call. Runs are serialized through `&mut self`;
/// concurrent callers each need their own orchestrator.
pub struct AnalysisOrchestrator<E> {
    engine: E,
    classpath: ClasspathConfigurer,
    plugin_provider: Box<dyn PluginProvider>,
    loading: LoadingContext,
}

impl<E: Engine> AnalysisOrchestrator<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            classpath: ClasspathConfigurer::from_env(),
            plugin_provider: Box::new(FsPluginProvider),
            loading: LoadingContext::default(),
        }
    }

    pub fn with_classpath_configurer(mut self, classpath: ClasspathConfigurer) -> Self {
        self.classpath = classpath;
        self
    }

    pub fn with_plugin_provider(mut self, provider: Box<dyn PluginProvider>) -> Self {
        self.plugin_provider = provider;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn classpath(&self) -> &ClasspathConfigurer {
        &self.classpath
    }

    pub fn loading_context(&self) -> &LoadingContext {
        &self.loading
    }

    /// Runs the engine over `targets`. Engine failures, including panics,
    /// are logged and yield an empty list.
    pub fn run(&mut self, targets: &[PathBuf], config: &AnalysisConfig) -> Vec<Finding> {
        if targets.is_empty() {
            log::info!("no analyzable targets; skipping engine run");
            return Vec::new();
        }

        let registry = PluginRegistry::load(self.plugin_provider.as_ref(), config.plugins());
        let aux_classpath = self.classpath.apply(config.classpaths());
        let exclude_filter = config.exclude_filter_path().and_then(existing_filter);
        let threshold = config.priority_threshold();

        let outcome = {
            let scope = self.loading.enter(&registry);
            let session = EngineSession {
                effort: config.effort(),
                reporter_tier: engine::reporter_tier(threshold),
                aux_classpath,
                targets: targets.to_vec(),
                exclude_filter,
                plugins: scope.active().to_vec(),
            };
            log::info!(
                "engine run: {} target(s), effort {}, tier {}",
                session.targets.len(),
                session.effort,
                session.reporter_tier
            );
            let engine = &self.engine;
            catch_unwind(AssertUnwindSafe(|| engine.execute(&session)))
        };

        let mut findings = match outcome {
            Ok(Ok(findings)) => findings,
            Ok(Err(err)) => {
                log::warn!("engine run failed: {err:#}");
                return Vec::new();
            }
            Err(payload) => {
                log::warn!(
                    "engine run panicked: {}",
                    errors::panic_message(payload.as_ref())
                );
                return Vec::new();
            }
        };

        if let Some(max_rank) = threshold {
            findings.retain(|f| f.rank <= max_rank);
        }
        for finding in &mut findings {
            finding.normalize_lines();
        }
        log::info!("engine run finished: {} finding(s)", findings.len());
        findings
    }
}

fn existing_filter(path: &str) -> Option<PathBuf> {
    let path = Path::new(path);
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    log::warn!("exclude filter skipped (not found): {}", path.display());
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use anyhow::Result;

    use crate::config::{Effort, parse_and_validate};
    use crate::core::PriorityTier;
    use crate::plugins::PluginModule;

    #[derive(Default)]
    struct RecordingEngine {
        findings: Vec<Finding>,
        fail: bool,
        panic: bool,
        sessions: RefCell<Vec<EngineSession>>,
    }

    impl Engine for RecordingEngine {
        fn version(&self) -> String {
            "test".to_string()
        }

        fn execute(&self, session: &EngineSession) -> Result<Vec<Finding>> {
            self.sessions.borrow_mut().push(session.clone());
            if self.panic {
                panic!("detector crashed");
            }
            if self.fail {
                anyhow::bail!("engine exited with status 2");
            }
            Ok(self.findings.clone())
        }
    }

    struct KnownPlugins;

    impl PluginProvider for KnownPlugins {
        fn provide(&self, reference: &str) -> Option<PluginModule> {
            (reference == "/plugins/findsecbugs.jar").then(|| PluginModule {
                id: "findsecbugs".to_string(),
                path: PathBuf::from(reference),
            })
        }
    }

    fn orchestrator(engine: RecordingEngine) -> AnalysisOrchestrator<RecordingEngine> {
        AnalysisOrchestrator::new(engine)
            .with_classpath_configurer(ClasspathConfigurer::with_runtime_classpath(vec![
                "/runtime/lib.jar".to_string(),
            ]))
            .with_plugin_provider(Box::new(KnownPlugins))
    }

    fn targets() -> Vec<PathBuf> {
        vec![PathBuf::from("/proj/out/A.class")]
    }

    #[test]
    fn empty_targets_skip_the_engine() {
        let mut orch = orchestrator(RecordingEngine::default());
        let cfg = parse_and_validate("{}").expect("config");
        assert!(orch.run(&[], &cfg).is_empty());
        assert!(orch.engine().sessions.borrow().is_empty());
    }

    #[test]
    fn findings_above_threshold_are_removed_after_the_engine() {
        let engine = RecordingEngine {
            findings: vec![
                Finding::new("NP_ALWAYS_NULL", 3),
                Finding::new("DM_EXIT", 6),
                Finding::new("SE_BAD_FIELD", 7),
            ],
            ..Default::default()
        };
        let mut orch = orchestrator(engine);
        let cfg = parse_and_validate(r#"{"priorityThreshold": 6, "effort": "max"}"#)
            .expect("config");

        let found = orch.run(&targets(), &cfg);
        let types: Vec<_> = found.iter().map(|f| f.bug_type.as_str()).collect();
        assert_eq!(types, ["NP_ALWAYS_NULL", "DM_EXIT"]);

        let sessions = orch.engine().sessions.borrow();
        assert_eq!(sessions[0].reporter_tier, PriorityTier::Medium);
        assert_eq!(sessions[0].effort, Effort::Max);
        assert_eq!(sessions[0].aux_classpath, ["/runtime/lib.jar"]);
    }

    #[test]
    fn missing_plugins_are_skipped_and_scope_is_restored() {
        let mut orch = orchestrator(RecordingEngine::default());
        let cfg = parse_and_validate(
            r#"{"plugins": ["/plugins/findsecbugs.jar", "/plugins/absent.jar"],
                "classpaths": ["/proj/out"]}"#,
        )
        .expect("config");

        orch.run(&targets(), &cfg);

        let sessions = orch.engine().sessions.borrow();
        let ids: Vec<_> = sessions[0].plugins.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["findsecbugs"]);
        assert_eq!(sessions[0].aux_classpath, ["/proj/out"]);
        drop(sessions);
        assert!(orch.loading_context().active().is_empty());
    }

    #[test]
    fn engine_errors_degrade_to_empty_results() {
        let engine = RecordingEngine {
            findings: vec![Finding::new("DM_EXIT", 6)],
            fail: true,
            ..Default::default()
        };
        let mut orch = orchestrator(engine);
        let cfg = parse_and_validate("{}").expect("config");
        assert!(orch.run(&targets(), &cfg).is_empty());
    }

    #[test]
    fn engine_panics_degrade_to_empty_results_and_restore_scope() {
        let engine = RecordingEngine {
            panic: true,
            ..Default::default()
        };
        let mut orch = orchestrator(engine);
        let cfg = parse_and_validate(r#"{"plugins": ["/plugins/findsecbugs.jar"]}"#)
            .expect("config");

        assert!(orch.run(&targets(), &cfg).is_empty());
        assert!(orch.loading_context().active().is_empty());
    }

    #[test]
    fn missing_exclude_filter_is_dropped() {
        let mut orch = orchestrator(RecordingEngine::default());
        let cfg = parse_and_validate(r#"{"excludeFilterPath": "/no/such/exclude.xml"}"#)
            .expect("config");
        orch.run(&targets(), &cfg);
        assert_eq!(orch.engine().sessions.borrow()[0].exclude_filter, None);
    }

    #[test]
    fn reported_lines_are_normalized() {
        let mut finding = Finding::new("DM_EXIT", 12);
        finding.start_line = 0;
        finding.end_line = 0;
        let engine = RecordingEngine {
            findings: vec![finding],
            ..Default::default()
        };
        let mut orch = orchestrator(engine);
        let cfg = parse_and_validate("{}").expect("config");

        let found = orch.run(&targets(), &cfg);
        assert_eq!((found[0].start_line, found[0].end_line), (1, 1));
    }
}
