//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use async_trait::async_trait;
use git2::{Oid, Repository, Signature};

use commit_formatter::error::{PublishError, RewriterError};
use commit_formatter::prompt::PromptPayload;
use commit_formatter::publish::Publisher;
use commit_formatter::rewriter::Rewriter;

/// A test git repository builder for integration tests.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository in a temp directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");
        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Get the test signature for commits.
    fn signature(&self) -> Signature<'_> {
        Signature::now("Test User", "test@example.com").expect("Failed to create signature")
    }

    /// Create a commit with the given message. Returns the commit OID.
    pub fn commit(&self, message: &str) -> Oid {
        let sig = self.signature();

        // Create or update a file to have something to commit
        let file_path = self.dir.path().join("test.txt");
        let content = format!(
            "{}\n{}",
            message,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        );
        std::fs::write(&file_path, content).expect("Failed to write test file");

        let mut index = self.repo.index().expect("Failed to get index");
        index
            .add_path(Path::new("test.txt"))
            .expect("Failed to add file");
        index.write().expect("Failed to write index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    /// Current HEAD commit id.
    pub fn head(&self) -> Oid {
        self.repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .expect("Failed to read HEAD")
            .id()
    }

    /// Message of the HEAD commit.
    pub fn head_message(&self) -> String {
        let commit = self
            .repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .expect("Failed to read HEAD");
        commit.message().unwrap_or_default().to_string()
    }

    /// Push the current HEAD to `branch` on `remote` using the git CLI.
    pub fn push_head(&self, remote: &Path, branch: &str) {
        let refspec = format!("HEAD:refs/heads/{branch}");
        let status = Command::new("git")
            .args(["push", "--quiet"])
            .arg(remote)
            .arg(&refspec)
            .current_dir(self.path())
            .status()
            .expect("Failed to run git push");
        assert!(status.success(), "git push to test remote failed");
    }
}

/// A bare repository standing in for the hosted remote.
pub struct BareRemote {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl BareRemote {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init_bare(dir.path()).expect("Failed to init bare repo");
        Self { dir, repo }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn path_str(&self) -> String {
        self.dir.path().to_string_lossy().into_owned()
    }

    /// The commit a branch points at on the remote.
    pub fn branch_tip(&self, branch: &str) -> git2::Commit<'_> {
        self.repo
            .find_reference(&format!("refs/heads/{branch}"))
            .and_then(|r| r.peel_to_commit())
            .expect("Branch missing on remote")
    }
}

/// Rewriter that returns a canned response and counts calls.
pub struct FakeRewriter {
    response: Result<String, u16>,
    pub calls: std::sync::atomic::AtomicUsize,
    pub last_payload: std::sync::Mutex<Option<PromptPayload>>,
}

impl FakeRewriter {
    pub fn returning(output: &str) -> Self {
        Self {
            response: Ok(output.to_string()),
            calls: Default::default(),
            last_payload: Default::default(),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            response: Err(status),
            calls: Default::default(),
            last_payload: Default::default(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl Rewriter for FakeRewriter {
    async fn rewrite(&self, payload: &PromptPayload) -> Result<String, RewriterError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        *self.last_payload.lock().unwrap() = Some(payload.clone());
        match &self.response {
            Ok(output) => Ok(output.clone()),
            Err(status) => Err(RewriterError::Status {
                status: *status,
                message: "fake failure".to_string(),
            }),
        }
    }
}

/// Publisher that records what it was asked to publish.
#[derive(Default)]
pub struct RecordingPublisher {
    pub published: std::sync::Mutex<Vec<(String, String)>>,
    pub fail: bool,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, message: &str, branch: &str) -> Result<(), PublishError> {
        self.published
            .lock()
            .unwrap()
            .push((message.to_string(), branch.to_string()));
        if self.fail {
            return Err(PublishError::PushFailed("remote rejected".to_string()));
        }
        Ok(())
    }
}
