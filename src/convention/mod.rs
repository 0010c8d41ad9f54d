//! Conventional Commits grammar: the closed type set, the parsed value
//! object, and the classifier that decides whether a message already conforms.

pub mod commit_type;
pub mod parse;

pub use commit_type::CommitType;
pub use parse::{ConventionalCommit, is_conventional, parse_subject};
