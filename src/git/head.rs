//! Reading the commit whose message is being rewritten.

use std::path::Path;

use git2::Repository;

use crate::error::GitError;

/// The commit whose message is the pipeline's input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCommit {
    pub sha: String,
    /// Full message with trailing whitespace removed.
    pub message: String,
}

/// Read the commit at `rev` (a sha, `HEAD`, or any revspec git understands).
pub fn read_commit(repo_path: &Path, rev: &str) -> Result<SourceCommit, GitError> {
    let repo = Repository::open(repo_path).map_err(GitError::OpenRepository)?;

    let commit = repo
        .revparse_single(rev)
        .and_then(|obj| obj.peel_to_commit())
        .map_err(|e| GitError::ReferenceNotFound(rev.to_string(), e))?;

    let sha = commit.id().to_string();
    let message = commit
        .message()
        .ok_or_else(|| GitError::NonUtf8Message(sha.clone()))?
        .trim_end()
        .to_string();

    Ok(SourceCommit { sha, message })
}

/// Short name of the branch HEAD points at.
pub fn current_branch(repo_path: &Path) -> Result<String, GitError> {
    let repo = Repository::open(repo_path).map_err(GitError::OpenRepository)?;
    let head = repo
        .head()
        .map_err(|e| GitError::ReferenceNotFound("HEAD".to_string(), e))?;

    if !head.is_branch() {
        return Err(GitError::DetachedHead);
    }

    head.shorthand()
        .map(str::to_string)
        .ok_or(GitError::DetachedHead)
}
