use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use serde_json::Value;

use crate::analysis::AnalysisOrchestrator;
use crate::config;
use crate::core::{ResponseEnvelope, RunStats};
use crate::engine::Engine;
use crate::errors::{self, ErrorCode};
use crate::resolve::TargetResolver;
use crate::sources;

pub const RUN_ANALYSIS_COMMAND: &str = "java.spotbugs.run";

/// Typed access to a command's raw argument list.
#[derive(Debug, Clone, Copy)]
pub struct ActionContext<'a> {
    args: &'a [Value],
}

impl<'a> ActionContext<'a> {
    pub fn new(args: &'a [Value]) -> Self {
        Self { args }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&'a Value> {
        self.args
            .get(index)
            .ok_or_else(|| errors::invalid_argument(format!("Missing argument at index {index}")))
    }

    pub fn require_string_arg(&self, index: usize, name: &str) -> Result<&'a str> {
        let Some(value) = self.get(index)?.as_str() else {
            return Err(errors::invalid_argument(format!(
                "Argument '{name}' must be a string"
            )));
        };
        if value.trim().is_empty() {
            return Err(errors::invalid_argument(format!(
                "Argument '{name}' must not be empty"
            )));
        }
        Ok(value)
    }

    pub fn optional_string_arg(&self, index: usize) -> Option<&'a str> {
        self.args.get(index).and_then(Value::as_str)
    }
}

/// A command reachable by id. Implementations provide [`CommandAction::run`];
/// `execute` turns every outcome into an envelope.
pub trait CommandAction {
    fn id(&self) -> &str;

    fn run(&mut self, ctx: &ActionContext<'_>) -> Result<ResponseEnvelope>;

    fn execute(&mut self, args: &[Value]) -> ResponseEnvelope {
        let ctx = ActionContext::new(args);
        match catch_unwind(AssertUnwindSafe(|| self.run(&ctx))) {
            Ok(Ok(envelope)) => envelope,
            Ok(Err(err)) => ResponseEnvelope::from_error(&err),
            Err(payload) => ResponseEnvelope::error(
                ErrorCode::CommandFailed,
                errors::panic_message(payload.as_ref()),
            ),
        }
    }
}

/// Config parsing, target resolution, the engine run and source enrichment
/// for a single path.
pub struct CommandPipeline<E> {
    orchestrator: AnalysisOrchestrator<E>,
}

impl<E: Engine> CommandPipeline<E> {
    pub fn new(orchestrator: AnalysisOrchestrator<E>) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &AnalysisOrchestrator<E> {
        &self.orchestrator
    }

    pub fn handle(&mut self, path: &str, raw_config: Option<&str>) -> ResponseEnvelope {
        match self.try_handle(path, raw_config) {
            Ok(envelope) => envelope,
            Err(err) => ResponseEnvelope::from_error(&err),
        }
    }

    fn try_handle(&mut self, path: &str, raw_config: Option<&str>) -> Result<ResponseEnvelope> {
        if path.trim().is_empty() {
            return Err(errors::invalid_argument("Argument 'path' must not be empty"));
        }
        let raw_config = raw_config.filter(|s| !s.trim().is_empty()).unwrap_or("{}");
        let config = config::parse_and_validate(raw_config)?;

        let started = Instant::now();
        let output_dirs = self
            .orchestrator
            .classpath()
            .directories_from(config.classpaths());
        let targets = TargetResolver::new(output_dirs).resolve(&[path]);
        log::debug!("resolved {} target(s) from {path}", targets.len());

        let mut findings = self.orchestrator.run(&targets, &config);
        sources::enrich(&mut findings, config.sourcepaths(), Some(Path::new(path)));

        let stats = RunStats {
            target: path.to_string(),
            target_count: targets.len(),
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            finding_count: findings.len(),
            classpath_count: config.classpaths().len(),
            plugin_count: config.plugins().len(),
            engine_version: self.orchestrator.engine().version(),
        };
        Ok(ResponseEnvelope::success(findings, stats))
    }
}

/// `java.spotbugs.run <path> [configJson]`
pub struct RunAnalysisAction<E> {
    pipeline: CommandPipeline<E>,
}

impl<E: Engine> RunAnalysisAction<E> {
    pub fn new(pipeline: CommandPipeline<E>) -> Self {
        Self { pipeline }
    }
}

impl<E: Engine> CommandAction for RunAnalysisAction<E> {
    fn id(&self) -> &str {
        RUN_ANALYSIS_COMMAND
    }

    fn run(&mut self, ctx: &ActionContext<'_>) -> Result<ResponseEnvelope> {
        let path = ctx.require_string_arg(0, "path")?;
        let raw_config = ctx.optional_string_arg(1);
        Ok(self.pipeline.handle(path, raw_config))
    }
}

#[derive(Default)]
pub struct CommandDispatcher {
    actions: BTreeMap<String, Box<dyn CommandAction>>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `action` under its id, replacing any previous registration.
    pub fn register(&mut self, action: Box<dyn CommandAction>) {
        let id = action.id().to_string();
        if self.actions.insert(id.clone(), action).is_some() {
            log::warn!("command {id} re-registered");
        }
    }

    pub fn command_ids(&self) -> Vec<&str> {
        self.actions.keys().map(String::as_str).collect()
    }

    pub fn execute(&mut self, command_id: &str, args: &[Value]) -> ResponseEnvelope {
        match self.actions.get_mut(command_id) {
            Some(action) => action.execute(args),
            None => ResponseEnvelope::from_error(&errors::unknown_command(command_id)),
        }
    }
}

/// Dispatcher with the analysis command registered over `engine`.
pub fn default_dispatcher<E: Engine + 'static>(engine: E) -> CommandDispatcher {
    let pipeline = CommandPipeline::new(AnalysisOrchestrator::new(engine));
    let mut dispatcher = CommandDispatcher::new();
    dispatcher.register(Box::new(RunAnalysisAction::new(pipeline)));
    dispatcher
}
