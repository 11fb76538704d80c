use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Source blob carried through to the target without interpretation.
///
/// `custom_field` columns hold whatever storefront extensions wrote there:
/// usually JSON, sometimes a serialized string from an older version, often
/// nothing at all.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpaqueDocument {
    #[default]
    Empty,
    Raw(String),
    Structured(Value),
}

impl OpaqueDocument {
    pub fn from_source(raw: Option<&str>) -> Self {
        let Some(text) = raw.map(str::trim).filter(|t| !t.is_empty()) else {
            return Self::Empty;
        };
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Null) => Self::Empty,
            Ok(value) => Self::Structured(value),
            Err(_) => Self::Raw(text.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}
