use rustc_hash::FxHashMap;

/// Maximum term length to store in the index.
/// Terms longer than this are likely base64, hex dumps, or other non-searchable content.
const MAX_TERM_LENGTH: usize = 128;

/// Split document text into lowercase terms with their frequencies.
///
/// A term is a maximal run of alphanumeric characters (any script), so
/// `meeting-notes_2024` yields `meeting`, `notes` and `2024`.
pub fn term_frequencies(content: &str) -> FxHashMap<String, u32> {
    let mut terms: FxHashMap<String, u32> = FxHashMap::default();
    for_each_term(content, |term| {
        *terms.entry(term).or_insert(0) += 1;
    });
    terms
}

/// Terms of a query, in order of first appearance, without duplicates
pub fn tokenize_query(query: &str) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    for_each_term(query, |term| {
        if !result.contains(&term) {
            result.push(term);
        }
    });
    result
}

fn for_each_term(text: &str, mut emit: impl FnMut(String)) {
    let mut current = String::new();

    for ch in text.chars() {
        if ch.is_alphanumeric() {
            current.extend(ch.to_lowercase());
        } else if !current.is_empty() {
            if current.chars().count() <= MAX_TERM_LENGTH {
                emit(std::mem::take(&mut current));
            } else {
                current.clear();
            }
        }
    }

    if !current.is_empty() && current.chars().count() <= MAX_TERM_LENGTH {
        emit(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_frequencies() {
        let terms = term_frequencies("The cat saw the other Cat.");
        assert_eq!(terms.get("the"), Some(&2));
        assert_eq!(terms.get("cat"), Some(&2));
        assert_eq!(terms.get("saw"), Some(&1));
        assert!(!terms.contains_key("Cat"));
    }

    #[test]
    fn test_punctuation_splits() {
        let terms = tokenize_query("UNIQUE_TERM meeting-notes");
        assert_eq!(terms, vec!["unique", "term", "meeting", "notes"]);
    }

    #[test]
    fn test_query_dedup_keeps_order() {
        assert_eq!(tokenize_query("b a b"), vec!["b", "a"]);
        assert!(tokenize_query("  --- ").is_empty());
    }

    #[test]
    fn test_unicode_terms() {
        let terms = term_frequencies("Über café 東京");
        assert!(terms.contains_key("über"));
        assert!(terms.contains_key("café"));
        assert!(terms.contains_key("東京"));
    }

    #[test]
    fn test_overlong_terms_skipped() {
        let long = "x".repeat(MAX_TERM_LENGTH + 1);
        let terms = term_frequencies(&format!("short {long} tail"));
        assert_eq!(terms.len(), 2);
    }
}
