use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A resolved knowledge-base term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermDefinition {
    pub term: String,
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub why: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

/// External term lookup service consulted by `kb_lookup`
pub trait TermLookup: Send + Sync {
    fn lookup(&self, query: &str) -> Option<TermDefinition>;
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TermRecord {
    #[serde(default)]
    term: String,
    #[serde(default)]
    definition: String,
    #[serde(default)]
    why: Option<String>,
    #[serde(default)]
    example: Option<String>,
    #[serde(default)]
    aliases: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TermsShape {
    List(Vec<TermRecord>),
    Map(BTreeMap<String, TermRecord>),
}

#[derive(Deserialize)]
struct Snapshot {
    #[serde(default)]
    terms: Option<TermsShape>,
}

/// Term lookup over a session's knowledge-base snapshot.
///
/// Matching is case-insensitive: exact term, then alias, then substring on
/// terms, then substring on aliases.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    terms: BTreeMap<String, TermRecord>,
    aliases: BTreeMap<String, String>,
}

impl KnowledgeBase {
    /// Build from `{"terms": [...]}` or `{"terms": {"ETL": {...}}}`.
    /// Entries without a term name are skipped.
    pub fn from_snapshot(snapshot: &serde_json::Value) -> serde_json::Result<Self> {
        let snapshot: Snapshot = serde_json::from_value(snapshot.clone())?;
        let records: Vec<TermRecord> = match snapshot.terms {
            Some(TermsShape::List(list)) => list,
            Some(TermsShape::Map(map)) => map
                .into_iter()
                .map(|(term, mut record)| {
                    record.term = term;
                    record
                })
                .collect(),
            None => Vec::new(),
        };

        let mut kb = Self::default();
        for record in records {
            let key = record.term.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            for alias in &record.aliases {
                let alias = alias.trim().to_lowercase();
                if !alias.is_empty() {
                    kb.aliases.insert(alias, key.clone());
                }
            }
            kb.terms.insert(key, record);
        }
        Ok(kb)
    }

    /// Canonical (lowercased) term names
    pub fn terms(&self) -> Vec<String> {
        self.terms.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn resolve(&self, query: &str) -> Option<&str> {
        if let Some((term, _)) = self.terms.get_key_value(query) {
            return Some(term.as_str());
        }
        if let Some(canonical) = self.aliases.get(query) {
            return Some(canonical.as_str());
        }
        if let Some(term) = self
            .terms
            .keys()
            .find(|term| term.contains(query) || query.contains(term.as_str()))
        {
            return Some(term.as_str());
        }
        self.aliases
            .iter()
            .find(|(alias, _)| alias.contains(query) || query.contains(alias.as_str()))
            .map(|(_, canonical)| canonical.as_str())
    }
}

impl TermLookup for KnowledgeBase {
    fn lookup(&self, query: &str) -> Option<TermDefinition> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }
        let key = self.resolve(&query)?;
        let record = self.terms.get(key)?;
        Some(TermDefinition {
            term: key.to_string(),
            definition: record.definition.clone(),
            why: record.why.clone(),
            example: record.example.clone(),
        })
    }
}
