//! Utility functions shared across the crate.
//!
//! ## Modules
//!
//! - [`app_data`] - Application configuration file (platform config dir)
//! - [`fs`] - File reads and stats with classified errors
//! - [`tokenizer`] - Term extraction for the content index
//!
//! ```no_run
//! use vault_search::utils::{term_frequencies, tokenize_query};
//!
//! let terms = term_frequencies("Meeting notes, meeting agenda");
//! assert_eq!(terms.get("meeting"), Some(&2));
//!
//! let query = tokenize_query("meeting-notes");
//! // Returns: ["meeting", "notes"]
//! ```

pub mod app_data;
pub mod fs;
pub mod tokenizer;

pub use app_data::*;
pub use fs::*;
pub use tokenizer::*;
