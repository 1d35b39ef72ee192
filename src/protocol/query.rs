//! Search query definitions
//!
//! Boolean expressions over record tags. Matching runs on the server; the
//! client builds the tree and ships it as JSON:
//!
//! ```text
//! {"tag": "a"}
//! {"and": [{"tag": "a"}, {"or": [{"tag": "b"}, {"tag": "c"}]}]}
//! ```
//!
//! ### Semantics
//! - `Tag(t)`: records appended with tag `t`
//! - `And`: intersection of the children's matches
//! - `Or`: union of the children's matches, deduplicated, in append order

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RochefortError};

/// A tag query tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Query {
    /// Records carrying this tag
    Tag(String),

    /// Records matched by every child
    And(Vec<Query>),

    /// Records matched by any child
    Or(Vec<Query>),
}

impl Query {
    pub fn tag(name: impl Into<String>) -> Self {
        Query::Tag(name.into())
    }

    pub fn and(children: impl IntoIterator<Item = Query>) -> Self {
        Query::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = Query>) -> Self {
        Query::Or(children.into_iter().collect())
    }

    /// Add `other` to this `And` group, or wrap both in a new one
    pub fn and_also(self, other: Query) -> Self {
        match self {
            Query::And(mut children) => {
                children.push(other);
                Query::And(children)
            }
            query => Query::And(vec![query, other]),
        }
    }

    /// Add `other` to this `Or` group, or wrap both in a new one
    pub fn or_else(self, other: Query) -> Self {
        match self {
            Query::Or(mut children) => {
                children.push(other);
                Query::Or(children)
            }
            query => Query::Or(vec![query, other]),
        }
    }

    /// Reject empty groups and empty tag names at any depth
    pub fn validate(&self) -> Result<()> {
        match self {
            Query::Tag(name) if name.is_empty() => Err(RochefortError::SearchQueryInvalid(
                "tag name must not be empty".to_string(),
            )),
            Query::Tag(_) => Ok(()),
            Query::And(children) | Query::Or(children) => {
                if children.is_empty() {
                    return Err(RochefortError::SearchQueryInvalid(format!(
                        "[{}] takes a non-empty array of subqueries",
                        self.kind()
                    )));
                }
                children.iter().try_for_each(Query::validate)
            }
        }
    }

    /// Validate and serialize to the wire schema
    pub fn to_json(&self) -> Result<Vec<u8>> {
        self.validate()?;
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse and validate a JSON query
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let query: Query = serde_json::from_slice(bytes)
            .map_err(|e| RochefortError::SearchQueryInvalid(e.to_string()))?;
        query.validate()?;
        Ok(query)
    }

    /// Every tag name referenced by the tree, in first-seen order
    pub fn tags(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_tags(&mut out);
        out
    }

    fn collect_tags<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Query::Tag(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Query::And(children) | Query::Or(children) => {
                for child in children {
                    child.collect_tags(out);
                }
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Query::Tag(_) => "tag",
            Query::And(_) => "and",
            Query::Or(_) => "or",
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Tag(name) => write!(f, "tag:{}", name),
            Query::And(children) | Query::Or(children) => {
                let joiner = if matches!(self, Query::And(_)) { " AND " } else { " OR " };
                f.write_str("(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(joiner)?;
                    }
                    write!(f, "{}", child)?;
                }
                f.write_str(")")
            }
        }
    }
}
