//! Fuzzy filename matching
//!
//! A query matches a file name when every query character appears in the
//! name, in order (case-insensitive). Candidate alignments are built around
//! each contiguous run the name allows and the best-scoring one is kept.
//! The score combines:
//!
//! - the longest run of consecutively matched characters (dominant),
//! - how early the first matched character sits in the name,
//! - matched runs that start on a word boundary (tie-breaker).

use crate::index::types::{FileSearchResult, IndexedFile};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Configurable weights for the fuzzy score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzyWeights {
    /// Points per character of the longest consecutive run
    pub run_weight: f32,
    /// Bonus for a match at position 0, decaying as 1 / (1 + position)
    pub position_weight: f32,
    /// Bonus per matched run that starts on a word boundary
    pub boundary_bonus: f32,
}

impl Default for FuzzyWeights {
    fn default() -> Self {
        Self {
            run_weight: 10.0,
            position_weight: 5.0,
            boundary_bonus: 1.0,
        }
    }
}

/// A scored alignment of the query against one name
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    pub score: f32,
    pub positions: Vec<usize>,
}

/// Ranks file names against a query
#[derive(Debug, Clone, Default)]
pub struct FuzzyMatcher {
    weights: FuzzyWeights,
}

impl FuzzyMatcher {
    pub fn new(weights: FuzzyWeights) -> Self {
        Self { weights }
    }

    /// Rank `candidates` by how well their name matches `query`.
    ///
    /// Non-matching files are left out. Ties go to the shorter name, then
    /// the lexicographically smaller name, then path.
    pub fn match_files<'a>(
        &self,
        query: &str,
        candidates: impl IntoIterator<Item = &'a IndexedFile>,
        limit: usize,
    ) -> Vec<FileSearchResult> {
        let query: Vec<char> = query.trim().chars().map(fold_case).collect();
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut results: Vec<FileSearchResult> = candidates
            .into_iter()
            .filter_map(|file| {
                let m = self.score_chars(&query, &file.name)?;
                Some(FileSearchResult {
                    path: file.path.clone(),
                    name: file.name.clone(),
                    score: m.score,
                    match_positions: m.positions,
                })
            })
            .collect();

        results.sort_by(compare_results);
        results.truncate(limit);
        results
    }

    /// Score a single name. `None` when the query is not a subsequence.
    pub fn score(&self, query: &str, name: &str) -> Option<FuzzyMatch> {
        let query: Vec<char> = query.trim().chars().map(fold_case).collect();
        if query.is_empty() {
            return None;
        }
        self.score_chars(&query, name)
    }

    fn score_chars(&self, query: &[char], name: &str) -> Option<FuzzyMatch> {
        let original: Vec<char> = name.chars().collect();
        let target: Vec<char> = original.iter().copied().map(fold_case).collect();
        if query.len() > target.len() {
            return None;
        }

        let latest = latest_positions(query, &target)?;
        let runs = contiguous_runs(query, &target);
        let mut best: Option<FuzzyMatch> = None;

        // Every alignment is built around one contiguous run: the query
        // prefix packed as early as possible after `first`, the run itself,
        // then the rest of the query packed after the run.
        for first in 0..=latest[0] {
            if target[first] != query[0] {
                continue;
            }
            let prefix = earliest_from(query, &target, first);

            for i in 0..query.len() {
                let (lo, hi) = match i {
                    0 => (first, first),
                    _ => match prefix[i - 1] {
                        Some(prev) => (prev + 1, latest[i]),
                        None => break,
                    },
                };

                for start in lo..=hi {
                    // Longest run at `start` that still leaves room for the rest
                    let mut len = runs[i][start];
                    while len > 0 && i + len < query.len() && latest[i + len] < start + len {
                        len -= 1;
                    }
                    if len == 0 {
                        continue;
                    }

                    let Some(positions) = assemble(query, &target, &prefix[..i], start, len) else {
                        continue;
                    };
                    let score = self.score_positions(&positions, &original);
                    if best.as_ref().is_none_or(|b| score > b.score) {
                        best = Some(FuzzyMatch { score, positions });
                    }
                }
            }
        }

        best
    }

    fn score_positions(&self, positions: &[usize], name: &[char]) -> f32 {
        let mut longest_run = 0usize;
        let mut boundary_runs = 0usize;
        let mut run = 0usize;

        for (i, &pos) in positions.iter().enumerate() {
            let continues = i > 0 && positions[i - 1] + 1 == pos;
            if continues {
                run += 1;
            } else {
                run = 1;
                if is_word_boundary(name, pos) {
                    boundary_runs += 1;
                }
            }
            longest_run = longest_run.max(run);
        }

        let first = positions.first().copied().unwrap_or(0);

        longest_run as f32 * self.weights.run_weight
            + self.weights.position_weight / (1.0 + first as f32)
            + boundary_runs as f32 * self.weights.boundary_bonus
    }
}

/// Latest position each query character can take with the rest of the
/// query still fitting after it. `None` when the query is not a subsequence.
fn latest_positions(query: &[char], target: &[char]) -> Option<Vec<usize>> {
    let mut latest = vec![0; query.len()];
    let mut end = target.len();
    for (qi, &qc) in query.iter().enumerate().rev() {
        let pos = target[..end].iter().rposition(|&tc| tc == qc)?;
        latest[qi] = pos;
        end = pos;
    }
    Some(latest)
}

/// `runs[i][p]`: how many query characters from `i` match the name from `p` on
fn contiguous_runs(query: &[char], target: &[char]) -> Vec<Vec<usize>> {
    let mut runs = vec![vec![0usize; target.len() + 1]; query.len() + 1];
    for i in (0..query.len()).rev() {
        for p in (0..target.len()).rev() {
            if query[i] == target[p] {
                runs[i][p] = runs[i + 1][p + 1] + 1;
            }
        }
    }
    runs
}

/// Earliest position of each query character once the first is pinned at `first`
fn earliest_from(query: &[char], target: &[char], first: usize) -> Vec<Option<usize>> {
    let mut prefix = Vec::with_capacity(query.len());
    prefix.push(Some(first));
    let mut next = first + 1;

    for &qc in &query[1..] {
        let Some(offset) = target[next..].iter().position(|&tc| tc == qc) else {
            break;
        };
        prefix.push(Some(next + offset));
        next += offset + 1;
    }

    prefix.resize(query.len(), None);
    prefix
}

fn assemble(
    query: &[char],
    target: &[char],
    prefix: &[Option<usize>],
    start: usize,
    len: usize,
) -> Option<Vec<usize>> {
    let mut positions = Vec::with_capacity(query.len());
    for &pos in prefix {
        positions.push(pos?);
    }
    positions.extend(start..start + len);

    let mut next = start + len;
    for &qc in &query[positions.len()..] {
        let offset = target[next..].iter().position(|&tc| tc == qc)?;
        positions.push(next + offset);
        next += offset + 1;
    }

    Some(positions)
}

fn is_word_boundary(name: &[char], pos: usize) -> bool {
    pos == 0 || matches!(name[pos - 1], '/' | '-' | '_' | ' ')
}

fn fold_case(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn compare_results(a: &FileSearchResult, b: &FileSearchResult) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.name.chars().count().cmp(&b.name.chars().count()))
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.path.cmp(&b.path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str) -> IndexedFile {
        IndexedFile {
            path: path.to_string(),
            name: path.rsplit('/').next().unwrap().to_string(),
            mtime: 0,
        }
    }

    fn names(results: &[FileSearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_contiguous_prefix_ranks_first() {
        let matcher = FuzzyMatcher::default();
        let files = vec![file("xaxbxc.md"), file("zzzabc.md"), file("abcdef.md")];
        let results = matcher.match_files("abc", &files, 10);

        assert_eq!(names(&results), vec!["abcdef.md", "zzzabc.md", "xaxbxc.md"]);
        assert!(results[0].score > results[1].score);
        assert!(results[1].score > results[2].score);
    }

    #[test]
    fn test_match_positions() {
        let matcher = FuzzyMatcher::default();
        let m = matcher.score("abc", "zzzabc.md").unwrap();
        assert_eq!(m.positions, vec![3, 4, 5]);

        let m = matcher.score("abc", "xaxbxc.md").unwrap();
        assert_eq!(m.positions, vec![1, 3, 5]);
    }

    #[test]
    fn test_best_alignment_wins() {
        // Greedy from the first 'n' would scatter; the later start is contiguous
        let matcher = FuzzyMatcher::default();
        let m = matcher.score("notes", "n-notes.md").unwrap();
        assert_eq!(m.positions, vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_longest_run_found_past_early_match() {
        // "ab" at 0 is a dead end; "bcd" at 3 gives the longer run
        let matcher = FuzzyMatcher::default();
        let m = matcher.score("abcd", "abxbcd.md").unwrap();
        assert_eq!(m.positions, vec![0, 3, 4, 5]);

        let files = vec![file("zabc-d.md"), file("abxbcd.md")];
        let results = matcher.match_files("abcd", &files, 10);
        assert_eq!(names(&results), vec!["abxbcd.md", "zabc-d.md"]);
        assert_eq!(results[1].match_positions, vec![1, 2, 3, 5]);
    }

    #[test]
    fn test_score_trims_query() {
        let matcher = FuzzyMatcher::default();
        assert_eq!(matcher.score("  abc ", "abc.md"), matcher.score("abc", "abc.md"));
        assert!(matcher.score("   ", "abc.md").is_none());
    }

    #[test]
    fn test_case_insensitive() {
        let matcher = FuzzyMatcher::default();
        let results = matcher.match_files("README", &[file("docs/readme.md")], 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].match_positions, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_non_subsequence_excluded() {
        let matcher = FuzzyMatcher::default();
        let files = vec![file("notes/meeting-notes.md"), file("notes/project-notes.md")];
        let results = matcher.match_files("meeting", &files, 10);
        assert_eq!(names(&results), vec!["meeting-notes.md"]);
    }

    #[test]
    fn test_word_boundary_bonus() {
        let matcher = FuzzyMatcher::default();
        let on_boundary = matcher.score("n", "a-n.md").unwrap();
        let inside = matcher.score("n", "aan.md").unwrap();
        assert!(on_boundary.score > inside.score);
    }

    #[test]
    fn test_ties_break_by_length_then_name() {
        let matcher = FuzzyMatcher::default();
        let files = vec![file("b/todo.md"), file("todo-list.md"), file("a/todo.md")];
        let results = matcher.match_files("todo", &files, 10);

        assert_eq!(names(&results), vec!["todo.md", "todo.md", "todo-list.md"]);
        assert_eq!(results[0].path, "a/todo.md");
        assert_eq!(results[1].path, "b/todo.md");
    }

    #[test]
    fn test_empty_query_and_limit() {
        let matcher = FuzzyMatcher::default();
        let files = vec![file("a.md"), file("ab.md"), file("abc.md")];
        assert!(matcher.match_files("", &files, 10).is_empty());
        assert!(matcher.match_files("   ", &files, 10).is_empty());
        assert_eq!(matcher.match_files("a", &files, 2).len(), 2);
    }

    #[test]
    fn test_deterministic() {
        let matcher = FuzzyMatcher::default();
        let files = vec![file("x/note.md"), file("y/note.md"), file("z/notes.md")];
        let first = matcher.match_files("note", &files, 10);
        let mut reversed = files.clone();
        reversed.reverse();
        assert_eq!(first, matcher.match_files("note", &reversed, 10));
    }
}
