use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const OFFICE365_BACKEND: &str = "office365";

/// A directory entry produced by an Office 365 source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResult {
    pub backend: String,
    pub source: String,
    pub id: Option<String>,
    pub fields: Map<String, Value>,
}

impl SourceResult {
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}
