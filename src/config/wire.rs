use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Configuration exactly as the client sends it. Every field is optional and
/// untrusted; see [`crate::config::analysis`] for the validated form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireConfig {
    pub schema_version: Option<i64>,
    /// Any scalar is accepted; unrecognized levels fall back to the default.
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub effort: Option<String>,
    pub classpaths: Option<Vec<Option<String>>>,
    pub sourcepaths: Option<Vec<Option<String>>>,
    pub priority_threshold: Option<i64>,
    pub exclude_filter_path: Option<String>,
    pub plugins: Option<Vec<Option<String>>>,
}

/// Reads a string field that clients sometimes send as a number or boolean.
/// Arrays and objects are still a type error.
fn scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string, found {}",
            if other.is_array() { "an array" } else { "an object" }
        ))),
    }
}
