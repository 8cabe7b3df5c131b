use std::collections::HashSet;
use std::fmt;

use anyhow::Result;
use serde::Serialize;

use crate::config::wire::WireConfig;
use crate::core::priority::clamp_rank;
use crate::errors::{ErrorCode, config_error};

pub const SUPPORTED_SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    Min,
    #[default]
    Default,
    Max,
}

impl Effort {
    /// Unknown or missing values fall back to [`Effort::Default`].
    pub fn from_wire(value: Option<&str>) -> Self {
        match value.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("min") => Effort::Min,
            Some("max") => Effort::Max,
            _ => Effort::Default,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Effort::Min => "min",
            Effort::Default => "default",
            Effort::Max => "max",
        }
    }
}

impl fmt::Display for Effort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated, immutable analysis settings for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    effort: Effort,
    classpaths: Vec<String>,
    sourcepaths: Vec<String>,
    priority_threshold: Option<u8>,
    exclude_filter_path: Option<String>,
    plugins: Vec<String>,
}

impl AnalysisConfig {
    pub fn effort(&self) -> Effort {
        self.effort
    }

    pub fn classpaths(&self) -> &[String] {
        &self.classpaths
    }

    pub fn sourcepaths(&self) -> &[String] {
        &self.sourcepaths
    }

    /// Requested maximum rank, already clamped to 1..=20.
    pub fn priority_threshold(&self) -> Option<u8> {
        self.priority_threshold
    }

    pub fn exclude_filter_path(&self) -> Option<&str> {
        self.exclude_filter_path.as_deref()
    }

    pub fn plugins(&self) -> &[String] {
        &self.plugins
    }
}

pub fn parse(raw: &str) -> Result<WireConfig> {
    if raw.trim().is_empty() {
        return Err(config_error(ErrorCode::CfgBadJson, "Empty config JSON"));
    }
    let parsed: Option<WireConfig> = serde_json::from_str(raw).map_err(|err| {
        log::debug!("config JSON rejected: {err}");
        config_error(ErrorCode::CfgBadJson, "Invalid config JSON")
    })?;
    parsed.ok_or_else(|| config_error(ErrorCode::CfgBadJson, "Empty config JSON"))
}

pub fn validate(wire: WireConfig) -> Result<AnalysisConfig> {
    if let Some(version) = wire.schema_version {
        if version > SUPPORTED_SCHEMA_VERSION {
            return Err(config_error(
                ErrorCode::CfgError,
                format!("Unsupported schemaVersion {version}"),
            ));
        }
    }

    Ok(AnalysisConfig {
        effort: Effort::from_wire(wire.effort.as_deref()),
        classpaths: normalize_list(wire.classpaths),
        sourcepaths: normalize_list(wire.sourcepaths),
        priority_threshold: wire.priority_threshold.map(clamp_rank),
        exclude_filter_path: normalize_string(wire.exclude_filter_path),
        plugins: normalize_list(wire.plugins),
    })
}

pub fn parse_and_validate(raw: &str) -> Result<AnalysisConfig> {
    validate(parse(raw)?)
}

fn normalize_string(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Drops null and blank entries and removes duplicates, keeping first-seen order.
fn normalize_list(values: Option<Vec<Option<String>>>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .unwrap_or_default()
        .into_iter()
        .filter_map(normalize_string)
        .filter(|v| seen.insert(v.clone()))
        .collect()
}
