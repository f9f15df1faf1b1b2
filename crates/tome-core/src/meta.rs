// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Metainfo scalars and the per-field rules a manifest declares for them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Scalar stored in a note's metainfo map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Free text.
    Text(String),
}

impl MetaValue {
    /// Text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Parse user input: `true`/`false`, then integers, then floats, else text.
    pub fn parse_loose(raw: &str) -> Self {
        match raw {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }
        if let Ok(n) = raw.parse::<i64>() {
            return Self::Int(n);
        }
        if let Ok(x) = raw.parse::<f64>() {
            if x.is_finite() {
                return Self::Float(x);
            }
        }
        Self::Text(raw.to_string())
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for MetaValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Rule attached to one metainfo field.
///
/// Serialized as `null` for [`MetaRule::Any`] and as an array for an allow-list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaRule {
    /// Any scalar is accepted.
    Any,
    /// Only the listed values are accepted.
    OneOf(Vec<MetaValue>),
}

impl MetaRule {
    /// Whether `value` satisfies the rule.
    pub fn admits(&self, value: &MetaValue) -> bool {
        match self {
            Self::Any => true,
            Self::OneOf(allowed) => allowed.contains(value),
        }
    }
}
