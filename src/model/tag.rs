//! Tag value object.
//!
//! A tag is a `type:value` pair; its fullname is the strict `type:value`
//! form used for matching against the `tags` table (value part may be
//! empty, the colon is always present).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub kind: String,
    pub value: Option<String>,
}

impl Tag {
    /// Strict representation used in database matching, e.g. `poc:` or `relance:2021`.
    pub fn fullname(&self) -> String {
        let value = self.value.as_deref().unwrap_or("");
        format!("{}:{}", self.kind, value)
    }

    /// Parse a user-supplied pretty name. The type part must be non-empty;
    /// a missing colon means a bare type with no value.
    pub fn from_pretty_name(pretty: &str) -> Option<Self> {
        let (kind, value) = match pretty.split_once(':') {
            Some((k, v)) => (k, if v.is_empty() { None } else { Some(v) }),
            None => (pretty, None),
        };
        if kind.is_empty() {
            return None;
        }
        Some(Self {
            kind: kind.to_string(),
            value: value.map(str::to_string),
        })
    }

    /// Normalize a pretty name to the strict fullname convention.
    pub fn sanitize(pretty: &str) -> Option<String> {
        Self::from_pretty_name(pretty).map(|t| t.fullname())
    }
}
