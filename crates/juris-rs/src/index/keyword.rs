//! In-memory BM25 keyword index.
//!
//! An index directory holds a single `passages.json`: a JSON array of
//! `{"text": ..., "source": ...}` records, `source` optional. Passages are
//! tokenized once at load time and ranked with Okapi BM25.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Passage, RetrievalIndex, RetrieveFuture};
use crate::QueryError;

/// File name read from an index directory.
pub const PASSAGES_FILE: &str = "passages.json";

const K1: f32 = 1.2;
const B: f32 = 0.75;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from", "has",
    "have", "how", "i", "if", "in", "is", "it", "its", "may", "of", "on", "or", "shall", "that",
    "the", "their", "there", "this", "to", "under", "was", "what", "when", "which", "who", "will",
    "with",
];

/// A passage record as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPassage {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl StoredPassage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

#[derive(Debug)]
struct Entry {
    passage: StoredPassage,
    term_counts: HashMap<String, u32>,
    length: usize,
}

/// Keyword index over one document's passages.
#[derive(Debug)]
pub struct KeywordIndex {
    entries: Vec<Entry>,
    doc_freq: HashMap<String, usize>,
    avg_length: f32,
}

impl KeywordIndex {
    /// Load `dir/passages.json`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, QueryError> {
        let path = dir.as_ref().join(PASSAGES_FILE);
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            QueryError::configuration(format!("cannot read index {}: {e}", path.display()))
        })?;
        let passages: Vec<StoredPassage> = serde_json::from_str(&raw).map_err(|e| {
            QueryError::configuration(format!("malformed index {}: {e}", path.display()))
        })?;
        if passages.is_empty() {
            return Err(QueryError::configuration(format!(
                "index {} contains no passages",
                path.display()
            )));
        }
        debug!("Loaded {} passages from {}", passages.len(), path.display());
        Ok(Self::from_passages(passages))
    }

    pub fn from_passages(passages: impl IntoIterator<Item = StoredPassage>) -> Self {
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let entries: Vec<Entry> = passages
            .into_iter()
            .map(|passage| {
                let tokens = tokenize(&passage.text);
                let mut term_counts: HashMap<String, u32> = HashMap::new();
                for token in &tokens {
                    *term_counts.entry(token.clone()).or_default() += 1;
                }
                for term in term_counts.keys() {
                    *doc_freq.entry(term.clone()).or_default() += 1;
                }
                Entry {
                    passage,
                    term_counts,
                    length: tokens.len(),
                }
            })
            .collect();

        let total: usize = entries.iter().map(|e| e.length).sum();
        let avg_length = if entries.is_empty() {
            0.0
        } else {
            total as f32 / entries.len() as f32
        };

        Self {
            entries,
            doc_freq,
            avg_length,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rank passages against `question`. Passages sharing no term with the
    /// question are never returned. Ties keep file order.
    pub fn search(&self, question: &str, top_k: usize) -> Vec<Passage> {
        let terms: HashSet<String> = tokenize(question).into_iter().collect();
        if terms.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let n = self.entries.len() as f32;
        let mut scored: Vec<(f32, &Entry)> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let score: f32 = terms
                    .iter()
                    .filter_map(|term| {
                        let tf = *entry.term_counts.get(term)? as f32;
                        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f32;
                        let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
                        let norm = 1.0 - B + B * entry.length as f32 / self.avg_length.max(1.0);
                        Some(idf * tf * (K1 + 1.0) / (tf + K1 * norm))
                    })
                    .sum();
                (score > 0.0).then_some((score, entry))
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(top_k);
        scored
            .into_iter()
            .map(|(score, entry)| Passage {
                text: entry.passage.text.clone(),
                score,
                source: entry.passage.source.clone(),
            })
            .collect()
    }
}

impl RetrievalIndex for KeywordIndex {
    fn query<'a>(&'a self, question: &'a str, top_k: usize) -> RetrieveFuture<'a> {
        let hits = self.search(question, top_k);
        Box::pin(async move { Ok(hits) })
    }
}

/// Lowercased alphanumeric terms, stopwords and single characters dropped.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statute() -> KeywordIndex {
        KeywordIndex::from_passages(vec![
            StoredPassage::new("Every insurer shall maintain a solvency margin.")
                .with_source("s. 64VA"),
            StoredPassage::new(
                "Sickness benefit is payable to an insured person certified sick by a medical practitioner.",
            )
            .with_source("s. 49"),
            StoredPassage::new("An insured person is entitled to medical benefit for sickness.")
                .with_source("s. 56"),
        ])
    }

    #[test]
    fn tokenize_drops_stopwords_and_punctuation() {
        assert_eq!(
            tokenize("What is the Sickness-Benefit, under s. 49?"),
            vec!["sickness", "benefit", "49"]
        );
    }

    #[test]
    fn ranks_by_term_overlap() {
        let index = statute();
        let hits = index.search("sickness benefit for insured person", 3);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source.as_deref(), Some("s. 56"));
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn respects_top_k_and_ignores_unrelated_passages() {
        let index = statute();
        assert_eq!(index.search("sickness", 1).len(), 1);
        assert!(index.search("transplantation", 3).is_empty());
        assert!(index.search("the of and", 3).is_empty());
    }

    #[test]
    fn load_reads_passages_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PASSAGES_FILE),
            r#"[{"text": "Solvency margin of insurers", "source": "s. 64VA"}, {"text": "Registration of insurers"}]"#,
        )
        .unwrap();

        let index = KeywordIndex::load(dir.path()).unwrap();
        assert_eq!(index.len(), 2);
        let hits = index.search("insurers registration", 3);
        assert_eq!(hits[0].text, "Registration of insurers");
        assert_eq!(hits[0].source, None);
    }

    #[test]
    fn load_rejects_missing_and_empty_indexes() {
        let dir = tempfile::tempdir().unwrap();
        let missing = KeywordIndex::load(dir.path()).unwrap_err();
        assert!(matches!(missing, QueryError::Configuration(_)));

        std::fs::write(dir.path().join(PASSAGES_FILE), "[]").unwrap();
        let empty = KeywordIndex::load(dir.path()).unwrap_err();
        assert!(empty.to_string().contains("no passages"));
    }

    #[tokio::test]
    async fn query_through_port() {
        let index = statute();
        let hits = index.query("solvency margin", 3).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source.as_deref(), Some("s. 64VA"));
    }
}
