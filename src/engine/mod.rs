use std::path::PathBuf;

use anyhow::Result;

use crate::config::Effort;
use crate::core::{Finding, PriorityTier};
use crate::plugins::PluginModule;

pub mod spotbugs;

pub use spotbugs::SpotBugsProcess;

/// Everything the engine needs for one run. Built per invocation and passed
/// by reference; engines keep no per-run state of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSession {
    pub effort: Effort,
    pub reporter_tier: PriorityTier,
    pub aux_classpath: Vec<String>,
    pub targets: Vec<PathBuf>,
    pub exclude_filter: Option<PathBuf>,
    pub plugins: Vec<PluginModule>,
}

/// The external bug detector: configure, run, collect findings.
pub trait Engine {
    fn version(&self) -> String;

    /// Findings at or above `session.reporter_tier`. The tier filter is
    /// coarse; callers tighten it by exact rank.
    fn execute(&self, session: &EngineSession) -> Result<Vec<Finding>>;
}

impl<E: Engine + ?Sized> Engine for Box<E> {
    fn version(&self) -> String {
        (**self).version()
    }

    fn execute(&self, session: &EngineSession) -> Result<Vec<Finding>> {
        (**self).execute(session)
    }
}

/// Engine reporting tier for a requested maximum rank; high only when unset.
pub fn reporter_tier(rank_threshold: Option<u8>) -> PriorityTier {
    rank_threshold.map_or(PriorityTier::High, |rank| PriorityTier::from_rank(rank.into()))
}
