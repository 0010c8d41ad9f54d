//! Git operations using git2-rs.

pub mod head;

pub use head::{SourceCommit, current_branch, read_commit};
