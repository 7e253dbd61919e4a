//! Query-side algorithms that run over an already built index.
//!
//! - [`fuzzy`] - subsequence ranking of file names
//! - [`snippet`] - line snippets with context for a single document

pub mod fuzzy;
pub mod snippet;

pub use fuzzy::{FuzzyMatch, FuzzyMatcher, FuzzyWeights};
pub use snippet::{extract_snippets, resolve_within, PathRejection};
