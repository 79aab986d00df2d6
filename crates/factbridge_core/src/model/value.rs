//! Normalized provider value model.

use crate::model::provider::ValueKind;
use serde::{Deserialize, Serialize};

/// One converted provider result, ready for storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ProviderValue {
    Boolean(bool),
    Number(i64),
    Double(f64),
    /// Expected in `[0.0, 1.0]`; out-of-range values are kept as-is.
    Percentage(f64),
    Text(String),
}

impl ProviderValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Number(_) => ValueKind::Number,
            Self::Double(_) => ValueKind::Double,
            Self::Percentage(_) => ValueKind::Percentage,
            Self::Text(_) => ValueKind::String,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }
}
