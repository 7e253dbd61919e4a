//! Line snippets around literal query matches

use crate::index::types::ContextSnippet;
use regex::RegexBuilder;
use std::path::{Path, PathBuf};

/// Collect up to `max_snippets` lines containing `query` (literal,
/// case-insensitive), each with up to `context` lines on either side.
pub fn extract_snippets(
    content: &str,
    query: &str,
    max_snippets: usize,
    context: usize,
) -> Vec<ContextSnippet> {
    if query.is_empty() || max_snippets == 0 {
        return Vec::new();
    }

    let pattern = match RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
    {
        Ok(pattern) => pattern,
        Err(_) => return Vec::new(),
    };

    let lines: Vec<&str> = content.lines().collect();
    let mut snippets = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if !pattern.is_match(line) {
            continue;
        }

        let before_start = i.saturating_sub(context);
        let after_end = (i + 1 + context).min(lines.len());

        snippets.push(ContextSnippet {
            line_number: i + 1,
            line: line.to_string(),
            context_before: lines[before_start..i].iter().map(|l| l.to_string()).collect(),
            context_after: lines[i + 1..after_end].iter().map(|l| l.to_string()).collect(),
        });

        if snippets.len() >= max_snippets {
            break;
        }
    }

    snippets
}

/// Why a snippet path was not resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRejection {
    NotFound,
    OutsideRoot,
}

/// Resolve `rel` against `root`, refusing anything that lands outside it.
///
/// Both sides are canonicalized, so `..` segments and symlinks pointing out
/// of the vault are caught.
pub fn resolve_within(root: &Path, rel: &str) -> Result<PathBuf, PathRejection> {
    let root = root.canonicalize().map_err(|_| PathRejection::NotFound)?;
    let candidate = root
        .join(rel)
        .canonicalize()
        .map_err(|_| PathRejection::NotFound)?;
    if candidate.starts_with(&root) && candidate != root {
        Ok(candidate)
    } else {
        Err(PathRejection::OutsideRoot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const NOTE: &str = "line one\nline two\nTarget here\nline four\nline five\nline six\ntarget again";

    #[test]
    fn test_context_lines() {
        let snippets = extract_snippets(NOTE, "target", 10, 2);
        assert_eq!(snippets.len(), 2);

        let first = &snippets[0];
        assert_eq!(first.line_number, 3);
        assert_eq!(first.line, "Target here");
        assert_eq!(first.context_before, vec!["line one", "line two"]);
        assert_eq!(first.context_after, vec!["line four", "line five"]);

        let last = &snippets[1];
        assert_eq!(last.line_number, 7);
        assert_eq!(last.context_before, vec!["line five", "line six"]);
        assert!(last.context_after.is_empty());
    }

    #[test]
    fn test_regex_chars_are_literal() {
        let content = "cost is $5 (approx)\ncost is 5 approx";
        let snippets = extract_snippets(content, "$5 (approx)", 10, 2);
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].line_number, 1);
    }

    #[test]
    fn test_snippet_cap() {
        let content = "hit\n".repeat(25);
        assert_eq!(extract_snippets(&content, "hit", 10, 2).len(), 10);
    }

    #[test]
    fn test_empty_query() {
        assert!(extract_snippets(NOTE, "", 10, 2).is_empty());
    }

    #[test]
    fn test_crlf_lines() {
        let snippets = extract_snippets("a\r\nneedle\r\nb", "needle", 10, 2);
        assert_eq!(snippets[0].line, "needle");
        assert_eq!(snippets[0].context_before, vec!["a"]);
    }

    #[test]
    fn test_resolve_within() {
        let outer = tempfile::tempdir().unwrap();
        let root = outer.path().join("vault");
        fs::create_dir_all(root.join("notes")).unwrap();
        fs::write(root.join("notes/a.md"), "a").unwrap();
        fs::write(outer.path().join("secret.md"), "s").unwrap();

        assert!(resolve_within(&root, "notes/a.md").is_ok());
        assert!(resolve_within(&root, "notes/../notes/a.md").is_ok());
        assert_eq!(
            resolve_within(&root, "../secret.md"),
            Err(PathRejection::OutsideRoot)
        );
        assert_eq!(
            resolve_within(&root, "notes/missing.md"),
            Err(PathRejection::NotFound)
        );
        let absolute = outer.path().join("secret.md");
        assert_eq!(
            resolve_within(&root, absolute.to_str().unwrap()),
            Err(PathRejection::OutsideRoot)
        );
    }
}
