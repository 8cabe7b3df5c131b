use anyhow::{Context, Result};
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use url::Url;

use crate::config::OutputFormat;
use crate::core::{Finding, ResponseEnvelope};
use crate::ui;

const SARIF_SCHEMA: &str = "https://json.schemastore.org/sarif-2.1.0.json";
const SARIF_VERSION: &str = "2.1.0";
const DRIVER_NAME: &str = "SpotBugs";
const DRIVER_URI: &str = "https://spotbugs.github.io/";

pub fn render(envelope: &ResponseEnvelope, format: OutputFormat, pretty: bool) -> Result<String> {
    match format {
        OutputFormat::Json => envelope
            .to_json(pretty)
            .context("failed to serialize response envelope"),
        OutputFormat::Sarif => render_sarif(envelope, pretty),
        OutputFormat::Text => Ok(ui::render_summary(envelope)),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifLog {
    #[serde(rename = "$schema")]
    schema: &'static str,
    version: &'static str,
    runs: Vec<SarifRun>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRun {
    tool: SarifTool,
    invocations: Vec<SarifInvocation>,
    results: Vec<SarifResult>,
}

#[derive(Debug, Serialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifDriver {
    name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    information_uri: &'static str,
    rules: Vec<SarifRule>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRule {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    help_uri: Option<String>,
    properties: RuleProperties,
}

#[derive(Debug, Serialize)]
struct RuleProperties {
    tags: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifInvocation {
    execution_successful: bool,
    end_time_utc: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_execution_notifications: Vec<SarifNotification>,
}

#[derive(Debug, Serialize)]
struct SarifNotification {
    level: &'static str,
    message: SarifMessage,
}

#[derive(Debug, Serialize)]
struct SarifMessage {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifResult {
    rule_id: String,
    rule_index: usize,
    level: &'static str,
    message: SarifMessage,
    locations: Vec<SarifLocation>,
    properties: ResultProperties,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifLocation {
    physical_location: PhysicalLocation,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    logical_locations: Vec<LogicalLocation>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PhysicalLocation {
    artifact_location: ArtifactLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<Region>,
}

#[derive(Debug, Serialize)]
struct ArtifactLocation {
    uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Region {
    start_line: u32,
    end_line: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LogicalLocation {
    fully_qualified_name: String,
}

#[derive(Debug, Serialize)]
struct ResultProperties {
    rank: u8,
    priority: &'static str,
}

pub fn render_sarif(envelope: &ResponseEnvelope, pretty: bool) -> Result<String> {
    let log = build_sarif(envelope, OffsetDateTime::now_utc());
    let out = if pretty {
        serde_json::to_string_pretty(&log)
    } else {
        serde_json::to_string(&log)
    };
    out.context("failed to serialize SARIF report")
}

fn build_sarif(envelope: &ResponseEnvelope, end_time: OffsetDateTime) -> SarifLog {
    let mut rules: Vec<SarifRule> = Vec::new();
    let mut results = Vec::with_capacity(envelope.results.len());

    for finding in &envelope.results {
        let rule_id = rule_id_of(finding);
        let rule_index = match rules.iter().position(|r| r.id == rule_id) {
            Some(index) => index,
            None => {
                rules.push(SarifRule {
                    id: rule_id.clone(),
                    help_uri: finding.external_url.clone(),
                    properties: RuleProperties {
                        tags: (!finding.category.is_empty())
                            .then(|| finding.category.clone())
                            .into_iter()
                            .collect(),
                    },
                });
                rules.len() - 1
            }
        };

        results.push(SarifResult {
            rule_id,
            rule_index,
            level: level_for_rank(finding.rank),
            message: SarifMessage {
                text: finding.message.clone(),
            },
            locations: vec![location_of(finding)],
            properties: ResultProperties {
                rank: finding.rank,
                priority: finding.priority.as_str(),
            },
        });
    }

    let notifications = envelope
        .errors
        .iter()
        .map(|e| SarifNotification {
            level: "error",
            message: SarifMessage {
                text: e.message.clone(),
            },
        })
        .collect();

    SarifLog {
        schema: SARIF_SCHEMA,
        version: SARIF_VERSION,
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: DRIVER_NAME,
                    version: envelope.stats.as_ref().map(|s| s.engine_version.clone()),
                    information_uri: DRIVER_URI,
                    rules,
                },
            },
            invocations: vec![SarifInvocation {
                execution_successful: envelope.is_success(),
                end_time_utc: end_time
                    .format(&Rfc3339)
                    .unwrap_or_else(|_| "unknown".to_string()),
                tool_execution_notifications: notifications,
            }],
            results,
        }],
    }
}

pub fn level_for_rank(rank: u8) -> &'static str {
    match rank {
        0..=4 => "error",
        5..=9 => "warning",
        _ => "note",
    }
}

fn rule_id_of(finding: &Finding) -> String {
    if finding.bug_type.is_empty() {
        finding.abbrev.clone()
    } else {
        finding.bug_type.clone()
    }
}

fn location_of(finding: &Finding) -> SarifLocation {
    let uri = match finding.full_path.as_deref() {
        Some(full) => file_url(full),
        None if !finding.real_source_path.is_empty() => finding.real_source_path.replace('\\', "/"),
        None => finding.source_file.clone(),
    };
    let region = (finding.start_line > 0 && finding.end_line > 0).then_some(Region {
        start_line: finding.start_line,
        end_line: finding.end_line,
    });
    SarifLocation {
        physical_location: PhysicalLocation {
            artifact_location: ArtifactLocation { uri },
            region,
        },
        logical_locations: finding
            .class_name
            .iter()
            .map(|name| LogicalLocation {
                fully_qualified_name: name.clone(),
            })
            .collect(),
    }
}

/// `file://` URL for an absolute path. Paths the platform does not consider
/// absolute are emitted as slash-separated relative references.
pub fn file_url(path: &str) -> String {
    match Url::from_file_path(path) {
        Ok(url) => url.to_string(),
        Err(()) => path.replace('\\', "/"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    use crate::core::RunStats;
    use crate::errors::ErrorCode;

    fn finding(bug_type: &str, rank: i64) -> Finding {
        let mut f = Finding::new(bug_type, rank)
            .with_source("com/acme/Foo.java")
            .with_lines(10, 12);
        f.category = "CORRECTNESS".to_string();
        f.message = format!("{bug_type} in Foo");
        f
    }

    fn stats() -> RunStats {
        RunStats {
            target: "/proj/src/main/java/com/acme/Foo.java".to_string(),
            target_count: 1,
            duration_ms: 5,
            finding_count: 3,
            classpath_count: 1,
            plugin_count: 0,
            engine_version: "4.8.6".to_string(),
        }
    }

    #[test]
    fn rules_are_deduplicated_and_levels_follow_rank() {
        let mut with_path = finding("NP_ALWAYS_NULL", 2);
        with_path.full_path = Some("/proj/src/main/java/com/acme/Foo.java".to_string());
        with_path.class_name = Some("com.acme.Foo".to_string());
        let env = ResponseEnvelope::success(
            vec![with_path, finding("DM_EXIT", 7), finding("NP_ALWAYS_NULL", 14)],
            stats(),
        );

        let log = build_sarif(&env, datetime!(2024-03-01 12:00:00 UTC));
        let v = serde_json::to_value(&log).expect("serialize");

        assert_eq!(v["version"], "2.1.0");
        let run = &v["runs"][0];
        assert_eq!(run["tool"]["driver"]["version"], "4.8.6");
        let rules = run["tool"]["driver"]["rules"].as_array().expect("rules");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0]["properties"]["tags"][0], "CORRECTNESS");

        let results = run["results"].as_array().expect("results");
        let levels: Vec<_> = results.iter().map(|r| r["level"].as_str()).collect();
        assert_eq!(levels, [Some("error"), Some("warning"), Some("note")]);
        assert_eq!(results[2]["ruleIndex"], 0);
        assert_eq!(
            results[0]["locations"][0]["physicalLocation"]["artifactLocation"]["uri"],
            "file:///proj/src/main/java/com/acme/Foo.java"
        );
        assert_eq!(
            results[1]["locations"][0]["physicalLocation"]["artifactLocation"]["uri"],
            "com/acme/Foo.java"
        );
        assert_eq!(
            results[0]["locations"][0]["logicalLocations"][0]["fullyQualifiedName"],
            "com.acme.Foo"
        );
        assert_eq!(
            results[0]["locations"][0]["physicalLocation"]["region"]["startLine"],
            10
        );
        assert_eq!(run["invocations"][0]["endTimeUtc"], "2024-03-01T12:00:00Z");
        assert_eq!(run["invocations"][0]["executionSuccessful"], true);
    }

    #[test]
    fn error_envelope_becomes_failed_invocation() {
        let env = ResponseEnvelope::error(ErrorCode::CfgBadJson, "CFG_BAD_JSON: Invalid config JSON");
        let v = serde_json::to_value(build_sarif(&env, datetime!(2024-03-01 12:00:00 UTC)))
            .expect("serialize");
        let invocation = &v["runs"][0]["invocations"][0];
        assert_eq!(invocation["executionSuccessful"], false);
        assert_eq!(
            invocation["toolExecutionNotifications"][0]["message"]["text"],
            "CFG_BAD_JSON: Invalid config JSON"
        );
        assert!(v["runs"][0]["tool"]["driver"].get("version").is_none());
    }

    #[test]
    #[cfg(unix)]
    fn file_urls_escape_reserved_bytes() {
        assert_eq!(file_url("/a b/Foo.java"), "file:///a%20b/Foo.java");
        assert_eq!(file_url("/p/50%/Foo#1.java"), "file:///p/50%25/Foo%231.java");
        assert_eq!(file_url("/p/café/Foo.java"), "file:///p/caf%C3%A9/Foo.java");
        assert_eq!(file_url("relative/Foo.java"), "relative/Foo.java");
    }
}
