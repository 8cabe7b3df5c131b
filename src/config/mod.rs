use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub mod analysis;
pub mod wire;

pub use analysis::{AnalysisConfig, Effort, parse_and_validate};
pub use wire::WireConfig;

/// Process-level settings; the per-invocation analysis settings live in
/// [`AnalysisConfig`].
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub engine: EngineConfig,
    pub output: OutputConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineConfig {
    pub java: String,
    pub spotbugs_jar: PathBuf,
    pub jvm_args: Vec<String>,
    /// `None` leaves engine runs unbounded.
    pub timeout_secs: Option<u64>,
}

impl EngineConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Sarif,
    Text,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "sarif" => Ok(OutputFormat::Sarif),
            "text" => Ok(OutputFormat::Text),
            other => Err(format!(
                "invalid output format: {other} (expected json|sarif|text)"
            )),
        }
    }
}

impl EffectiveConfig {
    pub fn with_home(home_dir: &Path) -> Self {
        Self {
            engine: EngineConfig {
                java: "java".to_string(),
                spotbugs_jar: home_dir.join(".local/share/bugbridge/spotbugs.jar"),
                jvm_args: Vec::new(),
                timeout_secs: None,
            },
            output: OutputConfig {
                format: OutputFormat::Json,
                pretty: false,
            },
            config_path: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    engine: Option<RawEngineConfig>,
    output: Option<RawOutputConfig>,
}

#[derive(Debug, Deserialize)]
struct RawEngineConfig {
    java: Option<String>,
    spotbugs_jar: Option<PathBuf>,
    jvm_args: Option<Vec<String>>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawOutputConfig {
    format: Option<OutputFormat>,
    pretty: Option<bool>,
}

pub fn default_config_path(home_dir: &Path) -> PathBuf {
    home_dir.join(".config/bugbridge/config.toml")
}

pub fn load(config_path: Option<&Path>, home_dir: &Path) -> Result<EffectiveConfig> {
    let mut cfg = EffectiveConfig::with_home(home_dir);

    let path = config_path
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| default_config_path(home_dir));

    if path.exists() {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let raw: RawConfig = toml::from_str(&s)
            .with_context(|| format!("failed to parse config file (TOML): {}", path.display()))?;
        apply_raw_config(&mut cfg, raw);
        cfg.config_path = Some(path.display().to_string());
    }

    apply_env_overrides(&mut cfg)?;

    Ok(cfg)
}

fn apply_raw_config(cfg: &mut EffectiveConfig, raw: RawConfig) {
    if let Some(engine) = raw.engine {
        if let Some(java) = engine.java {
            cfg.engine.java = java;
        }
        if let Some(jar) = engine.spotbugs_jar {
            cfg.engine.spotbugs_jar = jar;
        }
        if let Some(jvm_args) = engine.jvm_args {
            cfg.engine.jvm_args = jvm_args;
        }
        if let Some(timeout_secs) = engine.timeout_secs {
            cfg.engine.timeout_secs = (timeout_secs > 0).then_some(timeout_secs);
        }
    }

    if let Some(output) = raw.output {
        if let Some(format) = output.format {
            cfg.output.format = format;
        }
        if let Some(pretty) = output.pretty {
            cfg.output.pretty = pretty;
        }
    }
}

fn apply_env_overrides(cfg: &mut EffectiveConfig) -> Result<()> {
    if let Ok(v) = std::env::var("BUGBRIDGE_JAVA") {
        let v = v.trim();
        if !v.is_empty() {
            cfg.engine.java = v.to_string();
        }
    }
    if let Ok(v) = std::env::var("BUGBRIDGE_SPOTBUGS_JAR") {
        let v = v.trim();
        if !v.is_empty() {
            cfg.engine.spotbugs_jar = PathBuf::from(v);
        }
    }
    if let Ok(v) = std::env::var("BUGBRIDGE_ENGINE_TIMEOUT") {
        let secs = v
            .trim()
            .parse::<u64>()
            .with_context(|| "BUGBRIDGE_ENGINE_TIMEOUT")?;
        cfg.engine.timeout_secs = (secs > 0).then_some(secs);
    }
    if let Ok(v) = std::env::var("BUGBRIDGE_OUTPUT_FORMAT") {
        cfg.output.format = v
            .parse::<OutputFormat>()
            .map_err(anyhow::Error::msg)
            .with_context(|| "BUGBRIDGE_OUTPUT_FORMAT")?;
    }
    if let Ok(v) = std::env::var("BUGBRIDGE_OUTPUT_PRETTY") {
        cfg.output.pretty = parse_bool(&v).with_context(|| "BUGBRIDGE_OUTPUT_PRETTY")?;
    }

    Ok(())
}

fn parse_bool(s: &str) -> Result<bool> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!(
            "invalid boolean: {s} (expected true|false|1|0|yes|no|on|off)"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_config_overrides_defaults_field_by_field() {
        let mut cfg = EffectiveConfig::with_home(Path::new("/home/dev"));
        let raw: RawConfig = toml::from_str(
            r#"
[engine]
java = "/opt/jdk/bin/java"
timeout_secs = 0

[output]
pretty = true
"#,
        )
        .expect("parse toml");
        apply_raw_config(&mut cfg, raw);

        assert_eq!(cfg.engine.java, "/opt/jdk/bin/java");
        assert_eq!(
            cfg.engine.spotbugs_jar,
            PathBuf::from("/home/dev/.local/share/bugbridge/spotbugs.jar")
        );
        assert_eq!(cfg.engine.timeout(), None);
        assert!(cfg.output.pretty);
        assert_eq!(cfg.output.format, OutputFormat::Json);
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert!(parse_bool(" Yes ").expect("bool"));
        assert!(!parse_bool("off").expect("bool"));
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn output_format_parses_case_insensitively() {
        assert_eq!("SARIF".parse::<OutputFormat>(), Ok(OutputFormat::Sarif));
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
