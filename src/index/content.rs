//! Full-text content engine
//!
//! Two layers:
//!
//! 1. [`ContentIndex`] - an in-memory inverted index (term -> postings) with
//!    prefix and edit-distance term expansion. Query terms are combined with
//!    AND. This is the part that gets serialized into the persisted record.
//! 2. [`ContentEngine`] - wraps the index with the vault root and verifies
//!    every candidate against the file on disk: approximate-only hits are
//!    dropped, deleted files are skipped, and the pass stops once its time
//!    budget is spent.

use crate::index::types::{
    file_name_of, ContentDocument, ContentSearchResult, DocId, SearchConfig,
};
use crate::utils::{file_exists, read_text, term_frequencies, tokenize_query};
use memchr::memmem;
use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

/// BM25 term frequency saturation
const BM25_K1: f32 = 1.2;
/// BM25 length normalization
const BM25_B: f32 = 0.7;
/// Relative weight of a term reached by prefix expansion
const PREFIX_WEIGHT: f32 = 0.375;
/// Relative weight of a term reached by edit distance
const FUZZY_WEIGHT: f32 = 0.45;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Posting {
    doc: DocId,
    tf: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct DocEntry {
    path: String,
    /// Number of terms in the document
    length: u32,
}

/// A ranked, not yet verified, content hit
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub path: String,
    pub score: f32,
}

/// Inverted index over document bodies
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentIndex {
    next_id: DocId,
    documents: BTreeMap<DocId, DocEntry>,
    /// Sorted so prefix expansion is a range scan; postings sorted by doc
    terms: BTreeMap<String, Vec<Posting>>,
    #[serde(skip)]
    path_to_id: FxHashMap<String, DocId>,
    #[serde(skip)]
    doc_terms: FxHashMap<DocId, Vec<String>>,
    #[serde(skip)]
    total_length: u64,
}

impl ContentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.path_to_id.contains_key(path)
    }

    /// Paths of all indexed documents
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.documents.values().map(|d| d.path.as_str())
    }

    /// Index a document, replacing any previous version with the same id
    pub fn add(&mut self, doc: &ContentDocument) {
        self.discard(&doc.id);

        let doc_id = self.next_id;
        self.next_id += 1;

        let frequencies = term_frequencies(&doc.content);
        let length: u32 = frequencies.values().sum();
        let mut doc_terms = Vec::with_capacity(frequencies.len());

        for (term, tf) in frequencies {
            // Ids only grow, so pushing keeps postings sorted
            self.terms
                .entry(term.clone())
                .or_default()
                .push(Posting { doc: doc_id, tf });
            doc_terms.push(term);
        }

        self.documents.insert(
            doc_id,
            DocEntry {
                path: doc.path.clone(),
                length,
            },
        );
        self.path_to_id.insert(doc.id.clone(), doc_id);
        self.doc_terms.insert(doc_id, doc_terms);
        self.total_length += length as u64;
    }

    /// Remove a document. Returns false if it was not indexed.
    pub fn discard(&mut self, path: &str) -> bool {
        let Some(doc_id) = self.path_to_id.remove(path) else {
            return false;
        };

        for term in self.doc_terms.remove(&doc_id).unwrap_or_default() {
            if let Some(postings) = self.terms.get_mut(&term) {
                if let Ok(pos) = postings.binary_search_by_key(&doc_id, |p| p.doc) {
                    postings.remove(pos);
                }
                if postings.is_empty() {
                    self.terms.remove(&term);
                }
            }
        }

        if let Some(entry) = self.documents.remove(&doc_id) {
            self.total_length = self.total_length.saturating_sub(entry.length as u64);
        }
        true
    }

    /// Rebuild the lookup tables that are not serialized, validating the
    /// deserialized structure on the way.
    pub fn restore(&mut self) -> Result<(), String> {
        self.path_to_id.clear();
        self.doc_terms.clear();
        self.total_length = 0;

        for (&doc_id, entry) in &self.documents {
            if doc_id >= self.next_id {
                return Err(format!("document id {doc_id} beyond next id {}", self.next_id));
            }
            if self.path_to_id.insert(entry.path.clone(), doc_id).is_some() {
                return Err(format!("duplicate document path {}", entry.path));
            }
            self.total_length += entry.length as u64;
        }

        for (term, postings) in &self.terms {
            if postings.is_empty() {
                return Err(format!("term {term:?} has no postings"));
            }
            if postings.windows(2).any(|w| w[0].doc >= w[1].doc) {
                return Err(format!("postings for {term:?} are not sorted"));
            }
            for posting in postings {
                if !self.documents.contains_key(&posting.doc) {
                    return Err(format!(
                        "term {term:?} references unknown document {}",
                        posting.doc
                    ));
                }
                self.doc_terms
                    .entry(posting.doc)
                    .or_default()
                    .push(term.clone());
            }
        }

        Ok(())
    }

    /// Ranked candidates for `query`: every query term must match (exactly,
    /// by prefix, or within `looseness * term length` edits).
    pub fn search_candidates(&self, query: &str, looseness: f32) -> Vec<Candidate> {
        let query_terms = tokenize_query(query);
        if query_terms.is_empty() || self.documents.is_empty() {
            return Vec::new();
        }

        let mut matched: Option<RoaringBitmap> = None;
        let mut scores: FxHashMap<DocId, f32> = FxHashMap::default();

        for query_term in &query_terms {
            let mut term_docs = RoaringBitmap::new();

            for (term, weight) in self.expand_term(query_term, looseness) {
                let Some(postings) = self.terms.get(term) else {
                    continue;
                };
                let idf = self.idf(postings.len());
                for posting in postings {
                    term_docs.insert(posting.doc);
                    *scores.entry(posting.doc).or_insert(0.0) +=
                        weight * idf * self.tf_norm(posting);
                }
            }

            let narrowed = match matched.take() {
                Some(existing) => existing & term_docs,
                None => term_docs,
            };
            if narrowed.is_empty() {
                return Vec::new();
            }
            matched = Some(narrowed);
        }

        let Some(matched) = matched else {
            return Vec::new();
        };

        let mut candidates: Vec<Candidate> = matched
            .iter()
            .filter_map(|doc_id| {
                let entry = self.documents.get(&doc_id)?;
                Some(Candidate {
                    path: entry.path.clone(),
                    score: scores.get(&doc_id).copied().unwrap_or(0.0),
                })
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.path.cmp(&b.path))
        });
        candidates
    }

    /// Index terms reachable from `query_term`, with their weights
    fn expand_term<'a>(&'a self, query_term: &str, looseness: f32) -> Vec<(&'a str, f32)> {
        let mut expanded: FxHashMap<&'a str, f32> = FxHashMap::default();

        for (term, _) in self
            .terms
            .range::<str, _>((std::ops::Bound::Included(query_term), std::ops::Bound::Unbounded))
            .take_while(|(term, _)| term.starts_with(query_term))
        {
            let weight = if term == query_term { 1.0 } else { PREFIX_WEIGHT };
            expanded.insert(term.as_str(), weight);
        }

        let query_len = query_term.chars().count();
        let max_distance = (query_len as f32 * looseness).floor() as usize;
        if max_distance > 0 {
            for term in self.terms.keys() {
                let term_len = term.chars().count();
                if term_len.abs_diff(query_len) > max_distance {
                    continue;
                }
                let distance = strsim::levenshtein(query_term, term);
                if distance == 0 || distance > max_distance {
                    continue;
                }
                let weight = FUZZY_WEIGHT / (1.0 + distance as f32);
                let slot = expanded.entry(term.as_str()).or_insert(0.0);
                if weight > *slot {
                    *slot = weight;
                }
            }
        }

        expanded.into_iter().collect()
    }

    fn idf(&self, doc_freq: usize) -> f32 {
        let n = self.documents.len() as f32;
        let df = doc_freq as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    fn tf_norm(&self, posting: &Posting) -> f32 {
        let avg_len = if self.documents.is_empty() {
            1.0
        } else {
            (self.total_length as f32 / self.documents.len() as f32).max(1.0)
        };
        let doc_len = self
            .documents
            .get(&posting.doc)
            .map(|d| d.length as f32)
            .unwrap_or(avg_len);
        let tf = posting.tf as f32;
        tf * (BM25_K1 + 1.0) / (tf + BM25_K1 * (1.0 - BM25_B + BM25_B * doc_len / avg_len))
    }
}

/// Content index bound to a vault root, with on-disk verification
#[derive(Debug, Clone)]
pub struct ContentEngine {
    root: PathBuf,
    index: ContentIndex,
    looseness: f32,
    budget: Duration,
}

impl ContentEngine {
    pub fn new(root: &Path, config: &SearchConfig) -> Self {
        Self::with_index(root, config, ContentIndex::new())
    }

    pub fn with_index(root: &Path, config: &SearchConfig, index: ContentIndex) -> Self {
        Self {
            root: root.to_path_buf(),
            index,
            looseness: config.fuzzy_looseness,
            budget: config.content_search_budget,
        }
    }

    pub fn index(&self) -> &ContentIndex {
        &self.index
    }

    pub fn add(&mut self, doc: &ContentDocument) {
        self.index.add(doc);
    }

    pub fn discard(&mut self, path: &str) -> bool {
        self.index.discard(path)
    }

    /// Search and verify. Results keep the index's relevance order.
    pub fn search(&self, query: &str, limit: usize) -> Vec<ContentSearchResult> {
        let needle = query.trim();
        if needle.is_empty() || limit == 0 {
            return Vec::new();
        }

        let candidates = self.index.search_candidates(needle, self.looseness);
        verify_candidates(&self.root, needle, &candidates, limit, self.budget)
    }
}

/// Keep candidates whose file still exists and literally contains `needle`
/// (case-insensitive). Stops early once `budget` has elapsed.
pub fn verify_candidates(
    root: &Path,
    needle: &str,
    candidates: &[Candidate],
    limit: usize,
    budget: Duration,
) -> Vec<ContentSearchResult> {
    let started = Instant::now();
    let needle = needle.to_lowercase();
    let finder = memmem::Finder::new(needle.as_bytes());
    let mut results = Vec::new();

    for candidate in candidates {
        if started.elapsed() >= budget {
            debug!(
                "content search budget of {:?} spent after {} of {} candidates",
                budget,
                results.len(),
                candidates.len()
            );
            break;
        }

        let full_path = root.join(&candidate.path);
        if !file_exists(&full_path) {
            continue;
        }
        let content = match read_text(&full_path) {
            Ok(content) => content,
            Err(err) => {
                debug!("content search: skipping {}: {}", candidate.path, err);
                continue;
            }
        };

        let match_count = finder.find_iter(content.to_lowercase().as_bytes()).count();
        if match_count == 0 {
            continue;
        }

        results.push(ContentSearchResult {
            name: file_name_of(&candidate.path).to_string(),
            path: candidate.path.clone(),
            match_count,
        });
        if results.len() >= limit {
            break;
        }
    }

    results
}
