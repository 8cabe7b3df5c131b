use serde::{Deserialize, Serialize};

use crate::core::PriorityTier;
use crate::core::priority::clamp_rank;

/// One diagnostic reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    #[serde(rename = "type")]
    pub bug_type: String,
    pub rank: u8,
    pub priority: PriorityTier,
    pub category: String,
    pub abbrev: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    pub source_file: String,
    /// Source path as recorded in the compiled artifact, e.g. `com/acme/Foo.java`.
    pub real_source_path: String,
    pub start_line: u32,
    pub end_line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
}

impl Finding {
    pub fn new(bug_type: impl Into<String>, rank: i64) -> Self {
        let bug_type = bug_type.into();
        let abbrev = abbrev_of(&bug_type);
        let rank = clamp_rank(rank);
        Self {
            bug_type,
            rank,
            priority: PriorityTier::from_rank(rank.into()),
            category: String::new(),
            abbrev,
            message: String::new(),
            class_name: None,
            source_file: String::new(),
            real_source_path: String::new(),
            start_line: 1,
            end_line: 1,
            full_path: None,
            external_url: None,
        }
    }

    pub fn with_source(mut self, real_source_path: impl Into<String>) -> Self {
        let real_source_path = real_source_path.into();
        self.source_file = file_name_of(&real_source_path);
        self.real_source_path = real_source_path;
        self
    }

    pub fn with_lines(mut self, start: i64, end: i64) -> Self {
        (self.start_line, self.end_line) = normalize_lines(start, end);
        self
    }

    /// Re-establishes `1 <= start_line <= end_line`.
    pub fn normalize_lines(&mut self) {
        (self.start_line, self.end_line) =
            normalize_lines(self.start_line.into(), self.end_line.into());
    }
}

pub fn normalize_lines(start: i64, end: i64) -> (u32, u32) {
    let start = start.clamp(1, u32::MAX.into()) as u32;
    let end = end.clamp(start.into(), u32::MAX.into()) as u32;
    (start, end)
}

/// Pattern abbreviation, the bug type prefix before the first underscore.
pub fn abbrev_of(bug_type: &str) -> String {
    bug_type
        .split('_')
        .next()
        .unwrap_or(bug_type)
        .to_string()
}

fn file_name_of(path: &str) -> String {
    path.rsplit(['/', '\\']).next().unwrap_or(path).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_at_least_one_and_ordered() {
        assert_eq!(normalize_lines(0, -3), (1, 1));
        assert_eq!(normalize_lines(12, 4), (12, 12));
        assert_eq!(normalize_lines(3, 9), (3, 9));
    }

    #[test]
    fn new_derives_abbrev_and_priority() {
        let f = Finding::new("NP_NULL_ON_SOME_PATH", 6).with_source("com/acme/Foo.java");
        assert_eq!(f.abbrev, "NP");
        assert_eq!(f.priority, PriorityTier::Medium);
        assert_eq!(f.source_file, "Foo.java");
        assert_eq!(f.real_source_path, "com/acme/Foo.java");
    }

    #[test]
    fn optional_fields_are_omitted_from_json() {
        let f = Finding::new("DM_EXIT", 15);
        let v = serde_json::to_value(&f).expect("serialize");
        assert_eq!(v["type"], "DM_EXIT");
        assert_eq!(v["priority"], "Low");
        assert!(v.get("fullPath").is_none());
        assert!(v.get("externalUrl").is_none());
        assert!(v.get("className").is_none());
    }
}
