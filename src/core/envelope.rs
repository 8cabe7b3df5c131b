use serde::{Deserialize, Serialize};

use crate::core::Finding;
use crate::errors::{self, ErrorCode};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandError {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub target: String,
    pub target_count: usize,
    pub duration_ms: u64,
    pub finding_count: usize,
    pub classpath_count: usize,
    pub plugin_count: usize,
    pub engine_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub schema_version: u32,
    pub results: Vec<Finding>,
    pub errors: Vec<CommandError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<RunStats>,
}

impl ResponseEnvelope {
    pub fn success(results: Vec<Finding>, stats: RunStats) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            results,
            errors: Vec::new(),
            stats: Some(stats),
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            results: Vec::new(),
            errors: vec![CommandError {
                code,
                message: message.into(),
            }],
            stats: None,
        }
    }

    pub fn from_error(err: &anyhow::Error) -> Self {
        Self::error(errors::error_code(err), errors::error_message(err))
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn exit_status(&self) -> i32 {
        self.errors.first().map_or(0, |e| e.code.exit_status())
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_has_empty_results_and_no_stats() {
        let env = ResponseEnvelope::error(ErrorCode::CfgBadJson, "CFG_BAD_JSON: Invalid config JSON");
        let v = serde_json::to_value(&env).expect("serialize");
        assert_eq!(v["schemaVersion"], 1);
        assert_eq!(v["results"], serde_json::json!([]));
        assert_eq!(v["errors"][0]["code"], "CFG_BAD_JSON");
        assert!(v.get("stats").is_none());
        assert_eq!(env.exit_status(), 2);
    }

    #[test]
    fn from_error_uses_command_failed_for_uncoded_errors() {
        let env = ResponseEnvelope::from_error(&anyhow::anyhow!("disk on fire"));
        assert_eq!(env.errors[0].code, ErrorCode::CommandFailed);
        assert_eq!(env.errors[0].message, "disk on fire");
        assert!(!env.is_success());
    }
}
