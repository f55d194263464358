//! Selectable versions of the historical dataset.

use std::collections::BTreeSet;

use crate::dataset::{BenchmarkRow, BenchmarkTable};

/// Characters of a commit id kept in labels.
pub const SHORT_HASH_LEN: usize = 7;

/// A version and the label it is listed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitDescriptor {
    pub label: String,
    pub version_id: String,
}

impl CommitDescriptor {
    /// Labels `row.version` by tag, else `"{short_hash} - {message}"`, else the short hash.
    pub fn from_row(row: &BenchmarkRow) -> Self {
        let short = short_hash(&row.version);
        let tag = row.tag.as_deref().filter(|t| !t.is_empty());
        let message = row.commit_message.as_deref().filter(|m| !m.is_empty());
        let label = match (tag, message) {
            (Some(tag), _) => tag.to_string(),
            (None, Some(message)) => format!("{short} - {message}"),
            (None, None) => short.to_string(),
        };
        Self {
            label,
            version_id: row.version.clone(),
        }
    }
}

pub fn short_hash(version: &str) -> &str {
    version
        .char_indices()
        .nth(SHORT_HASH_LEN)
        .map_or(version, |(idx, _)| &version[..idx])
}

/// Versions run by `engine`, first-seen order, one descriptor each.
pub fn commit_descriptors(table: &BenchmarkTable, engine: &str) -> Vec<CommitDescriptor> {
    let mut seen = BTreeSet::new();
    table
        .rows()
        .iter()
        .filter(|r| r.engine == engine && seen.insert(r.version.as_str()))
        .map(CommitDescriptor::from_row)
        .collect()
}

/// First version seen for each engine, in first-seen engine order.
pub fn engine_versions(table: &BenchmarkTable) -> Vec<(String, String)> {
    let mut seen = BTreeSet::new();
    table
        .rows()
        .iter()
        .filter(|r| seen.insert(r.engine.as_str()))
        .map(|r| (r.engine.clone(), r.version.clone()))
        .collect()
}
