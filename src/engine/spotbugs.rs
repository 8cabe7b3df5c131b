//! SpotBugs driven as a child process through its text UI, with findings
//! read back from the SARIF report it writes.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use url::Url;

use crate::config::EngineConfig;
use crate::core::{Finding, PriorityTier, normalize_lines};
use crate::engine::{Engine, EngineSession};
use crate::platform::run_command;

const VERSION_QUERY_TIMEOUT: Duration = Duration::from_secs(30);
const STDERR_TAIL_CHARS: usize = 2000;
const REPORT_FILE: &str = "spotbugs.sarif";
const TARGET_LIST: &str = "targets.txt";
const AUX_CLASSPATH_LIST: &str = "auxclasspath.txt";

#[derive(Debug)]
pub struct SpotBugsProcess {
    java: String,
    jar: PathBuf,
    jvm_args: Vec<String>,
    timeout: Option<Duration>,
    version: OnceLock<String>,
}

impl SpotBugsProcess {
    pub fn new(java: impl Into<String>, jar: impl Into<PathBuf>) -> Self {
        Self {
            java: java.into(),
            jar: jar.into(),
            jvm_args: Vec::new(),
            timeout: None,
            version: OnceLock::new(),
        }
    }

    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self::new(cfg.java.clone(), cfg.spotbugs_jar.clone())
            .with_jvm_args(cfg.jvm_args.clone())
            .with_timeout(cfg.timeout())
    }

    pub fn with_jvm_args(mut self, jvm_args: Vec<String>) -> Self {
        self.jvm_args = jvm_args;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn jar_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.jvm_args.iter().map(OsString::from).collect();
        args.push("-jar".into());
        args.push(self.jar.clone().into_os_string());
        args
    }

    /// Command line for one run. Targets and auxiliary classpath entries
    /// are written to list files under `workdir` so the argument vector
    /// stays bounded however many artifacts were resolved; the SARIF report
    /// lands there too.
    pub fn command_args(&self, session: &EngineSession, workdir: &Path) -> Result<Vec<OsString>> {
        let mut args = self.jar_args();
        args.push("-textui".into());
        args.push("-quiet".into());
        args.push("-noClassOk".into());
        args.push(format!("-effort:{}", session.effort).into());
        args.push(
            match session.reporter_tier {
                PriorityTier::High => "-high",
                PriorityTier::Medium => "-medium",
                PriorityTier::Low => "-low",
            }
            .into(),
        );
        if !session.aux_classpath.is_empty() {
            let list = workdir.join(AUX_CLASSPATH_LIST);
            write_list(&list, session.aux_classpath.iter().map(String::as_str))?;
            args.push("-auxclasspathFromFile".into());
            args.push(list.into_os_string());
        }
        if !session.plugins.is_empty() {
            let joined = std::env::join_paths(session.plugins.iter().map(|p| &p.path))
                .context("plugin path contains the path separator")?;
            args.push("-pluginList".into());
            args.push(joined);
        }
        if let Some(filter) = &session.exclude_filter {
            args.push("-exclude".into());
            args.push(filter.clone().into_os_string());
        }
        let mut sarif = OsString::from("-sarif=");
        sarif.push(workdir.join(REPORT_FILE).as_os_str());
        args.push(sarif);

        let list = workdir.join(TARGET_LIST);
        let targets: Vec<String> = session
            .targets
            .iter()
            .map(|t| t.display().to_string())
            .collect();
        write_list(&list, targets.iter().map(String::as_str))?;
        args.push("-analyzeFromFile".into());
        args.push(list.into_os_string());
        Ok(args)
    }

    fn query_version(&self) -> String {
        if !self.jar.is_file() {
            return "unknown".to_string();
        }
        let mut args = self.jar_args();
        args.push("-version".into());
        match run_command(&self.java, &args, Some(VERSION_QUERY_TIMEOUT)) {
            Ok(out) if out.exit_code == 0 => out
                .stdout
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .unwrap_or("unknown")
                .to_string(),
            Ok(out) => {
                log::debug!("spotbugs -version exited with {}", out.exit_code);
                "unknown".to_string()
            }
            Err(err) => {
                log::debug!("spotbugs -version failed: {err:#}");
                "unknown".to_string()
            }
        }
    }
}

impl Engine for SpotBugsProcess {
    fn version(&self) -> String {
        self.version.get_or_init(|| self.query_version()).clone()
    }

    fn execute(&self, session: &EngineSession) -> Result<Vec<Finding>> {
        if !self.jar.is_file() {
            bail!("SpotBugs jar not found: {}", self.jar.display());
        }

        let workdir = tempfile::Builder::new()
            .prefix("bugbridge-")
            .tempdir()
            .context("failed to create report directory")?;
        let report = workdir.path().join(REPORT_FILE);
        let args = self.command_args(session, workdir.path())?;

        log::info!(
            "running spotbugs on {} target(s), effort={}",
            session.targets.len(),
            session.effort
        );
        let out = run_command(&self.java, &args, self.timeout)?;
        if out.exit_code != 0 {
            bail!(
                "spotbugs exited with status {}: {}",
                out.exit_code,
                tail(&out.stderr, STDERR_TAIL_CHARS)
            );
        }

        let text = std::fs::read_to_string(&report)
            .with_context(|| format!("spotbugs wrote no report: {}", report.display()))?;
        parse_sarif(&text)
    }
}

/// Reads findings from a SARIF 2.1.0 log.
pub fn parse_sarif(text: &str) -> Result<Vec<Finding>> {
    let log: Value = serde_json::from_str(text).context("invalid SARIF report")?;
    let mut findings = Vec::new();
    let Some(runs) = log.get("runs").and_then(Value::as_array) else {
        return Ok(findings);
    };
    for run in runs {
        let rules = run
            .pointer("/tool/driver/rules")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let results = run
            .get("results")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for result in results {
            findings.push(finding_from_result(result, rules));
        }
    }
    Ok(findings)
}

fn finding_from_result(result: &Value, rules: &[Value]) -> Finding {
    let rule_id = str_at(result, "/ruleId").unwrap_or("UNKNOWN");
    let rule = result
        .get("ruleIndex")
        .and_then(Value::as_u64)
        .and_then(|i| rules.get(i as usize))
        .filter(|r| str_at(r, "/id") == Some(rule_id))
        .or_else(|| rules.iter().find(|r| str_at(r, "/id") == Some(rule_id)));

    let level = str_at(result, "/level")
        .or_else(|| rule.and_then(|r| str_at(r, "/defaultConfiguration/level")))
        .unwrap_or("warning");
    let rank = explicit_rank(result).unwrap_or_else(|| level_tier(level).lowest_rank().into());

    let mut finding = Finding::new(rule_id, rank);
    finding.message = message_of(result, rule, rule_id);
    if let Some(rule) = rule {
        if let Some(category) = rule.pointer("/properties/tags/0").and_then(Value::as_str) {
            finding.category = category.to_string();
        }
        finding.external_url = str_at(rule, "/helpUri").map(str::to_string);
    }

    if let Some(location) = result.pointer("/locations/0") {
        if let Some(uri) = str_at(location, "/physicalLocation/artifactLocation/uri") {
            finding = finding.with_source(uri_to_path(uri));
        }
        let start = location
            .pointer("/physicalLocation/region/startLine")
            .and_then(Value::as_i64)
            .unwrap_or(1);
        let end = location
            .pointer("/physicalLocation/region/endLine")
            .and_then(Value::as_i64)
            .unwrap_or(start);
        (finding.start_line, finding.end_line) = normalize_lines(start, end);
        finding.class_name =
            str_at(location, "/logicalLocations/0/fullyQualifiedName").map(str::to_string);
    }

    finding
}

fn explicit_rank(result: &Value) -> Option<i64> {
    result
        .pointer("/properties/rank")
        .or_else(|| result.get("rank"))
        .and_then(Value::as_f64)
        .map(|r| r.round() as i64)
        .filter(|r| (1..=20).contains(r))
}

fn level_tier(level: &str) -> PriorityTier {
    match level {
        "error" => PriorityTier::High,
        "warning" => PriorityTier::Medium,
        _ => PriorityTier::Low,
    }
}

fn message_of(result: &Value, rule: Option<&Value>, rule_id: &str) -> String {
    if let Some(text) = str_at(result, "/message/text") {
        return text.to_string();
    }
    if let (Some(rule), Some(id)) = (rule, str_at(result, "/message/id")) {
        if let Some(template) = rule
            .get("messageStrings")
            .and_then(|m| m.get(id))
            .and_then(|m| str_at(m, "/text"))
        {
            let arguments: Vec<&str> = result
                .pointer("/message/arguments")
                .and_then(Value::as_array)
                .map(|a| a.iter().map(|v| v.as_str().unwrap_or("")).collect())
                .unwrap_or_default();
            return substitute_arguments(template, &arguments);
        }
    }
    rule.and_then(|r| str_at(r, "/shortDescription/text"))
        .unwrap_or(rule_id)
        .to_string()
}

/// Replaces `{n}` placeholders with positional arguments.
fn substitute_arguments(template: &str, arguments: &[&str]) -> String {
    let mut out = template.to_string();
    for (i, arg) in arguments.iter().enumerate() {
        out = out.replace(&format!("{{{i}}}"), arg);
    }
    out
}

/// Local path for a SARIF artifact URI. Relative references (resolved
/// against `SRCROOT`) come back decoded but still relative; URIs that do not
/// name a local file are kept verbatim.
fn uri_to_path(uri: &str) -> String {
    match Url::parse(uri) {
        Ok(url) if url.scheme() == "file" => match url.to_file_path() {
            Ok(path) => path.display().to_string(),
            Err(()) => {
                log::debug!("artifact uri is not a local path: {uri}");
                uri.to_string()
            }
        },
        Ok(_) => uri.to_string(),
        Err(url::ParseError::RelativeUrlWithoutBase) => decode_relative(uri),
        Err(err) => {
            log::debug!("invalid artifact uri {uri}: {err}");
            uri.to_string()
        }
    }
}

fn decode_relative(uri: &str) -> String {
    let decoded = Url::parse("file:///")
        .and_then(|root| root.join(uri))
        .ok()
        .and_then(|url| url.to_file_path().ok());
    match decoded {
        Some(path) => path
            .display()
            .to_string()
            .trim_start_matches('/')
            .to_string(),
        None => uri.to_string(),
    }
}

fn write_list<'a>(path: &Path, entries: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut text = String::new();
    for entry in entries {
        text.push_str(entry);
        text.push('\n');
    }
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

fn tail(s: &str, max_chars: usize) -> String {
    let s = s.trim();
    let count = s.chars().count();
    if count <= max_chars {
        return s.to_string();
    }
    s.chars().skip(count - max_chars).collect()
}
