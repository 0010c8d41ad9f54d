//! Conventional commit subject parsing and classification.

use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use super::CommitType;

/// Pattern: type(scope)!: description, type!: description, type(scope): description or type: description.
///
/// The scope may not contain a colon, so the first colon on the line is
/// always the type/description boundary.
static SUBJECT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z]+)(?:\(([^()\r\n:]+)\))?(!)?: (.*)$").expect("subject pattern is valid")
});

/// A commit message that satisfies the Conventional Commits grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConventionalCommit {
    pub commit_type: CommitType,
    pub scope: Option<String>,
    pub breaking: bool,
    pub description: String,
    pub body: Option<String>,
}

impl ConventionalCommit {
    /// Parse a full message. Only the first line is checked against the
    /// grammar; everything after the first blank-line separator is kept as
    /// the body verbatim.
    pub fn parse(message: &str) -> Option<Self> {
        let trimmed = message.trim();
        let (first_line, rest) = match trimmed.split_once('\n') {
            Some((first, rest)) => (first, Some(rest)),
            None => (trimmed, None),
        };

        let mut commit = parse_subject(first_line)?;
        commit.body = rest
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        Some(commit)
    }

    /// Rebuild the subject line: `type(scope)!: description`.
    pub fn subject(&self) -> String {
        let scope = self
            .scope
            .as_ref()
            .map(|s| format!("({})", s))
            .unwrap_or_default();
        let bang = if self.breaking { "!" } else { "" };
        format!("{}{}{}: {}", self.commit_type, scope, bang, self.description)
    }

    /// Format the full commit message for git.
    ///
    /// Produces:
    /// ```text
    /// type(scope): description
    ///
    /// Body text.
    /// ```
    pub fn to_message(&self) -> String {
        match self.body.as_deref().map(str::trim) {
            Some(body) if !body.is_empty() => format!("{}\n\n{}", self.subject(), body),
            _ => self.subject(),
        }
    }

    /// Breaking either through `!` or a `BREAKING CHANGE:` footer in the body.
    pub fn is_breaking(&self) -> bool {
        self.breaking
            || self.body.as_deref().is_some_and(|b| {
                b.contains("BREAKING CHANGE:") || b.contains("BREAKING-CHANGE:")
            })
    }
}

impl fmt::Display for ConventionalCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_message())
    }
}

/// Parse a single subject line. Leading and trailing whitespace is ignored.
/// The returned commit has no body.
pub fn parse_subject(line: &str) -> Option<ConventionalCommit> {
    let caps = SUBJECT_PATTERN.captures(line.trim())?;

    let commit_type = caps.get(1)?.as_str().parse::<CommitType>().ok()?;
    let scope = caps.get(2).map(|m| m.as_str().to_string());
    let breaking = caps.get(3).is_some();
    let description = caps.get(4)?.as_str().trim();

    if description.is_empty() {
        return None;
    }

    Some(ConventionalCommit {
        commit_type,
        scope,
        breaking,
        description: description.to_string(),
        body: None,
    })
}

/// Whether the message already follows Conventional Commits.
///
/// Only the first line is inspected. An empty message is never conventional.
pub fn is_conventional(message: &str) -> bool {
    let first_line = message.trim().lines().next().unwrap_or("");
    parse_subject(first_line).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_subject_is_conventional() {
        assert!(is_conventional("fix: resolve login authentication issue"));
    }

    #[test]
    fn test_scope_and_bang() {
        let commit = parse_subject("feat(api)!: drop v1 endpoints").unwrap();
        assert_eq!(commit.commit_type, CommitType::Feat);
        assert_eq!(commit.scope.as_deref(), Some("api"));
        assert!(commit.breaking);
        assert_eq!(commit.description, "drop v1 endpoints");
    }

    #[test]
    fn test_empty_message_is_not_conventional() {
        assert!(!is_conventional(""));
        assert!(!is_conventional("   \n  "));
    }

    #[test]
    fn test_uppercase_type_is_not_conventional() {
        assert!(!is_conventional("Fix: resolve bug"));
        assert!(!is_conventional("FEAT: add thing"));
    }

    #[test]
    fn test_missing_space_after_colon() {
        assert!(!is_conventional("fix:resolve bug"));
    }

    #[test]
    fn test_empty_description() {
        assert!(!is_conventional("fix: "));
        assert!(!is_conventional("fix:"));
        assert!(!is_conventional("fix:    "));
    }

    #[test]
    fn test_empty_scope_rejected() {
        assert!(!is_conventional("fix(): resolve bug"));
    }

    #[test]
    fn test_multiple_colons_first_wins() {
        let commit = parse_subject("fix(parser): handle key: value pairs").unwrap();
        assert_eq!(commit.scope.as_deref(), Some("parser"));
        assert_eq!(commit.description, "handle key: value pairs");
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        assert!(is_conventional("   docs: update readme   \n"));
    }

    #[test]
    fn test_body_not_inspected() {
        assert!(is_conventional("chore: bump deps\n\nwhatever: not a type"));
        assert!(!is_conventional("bumped deps\n\nchore: bump deps"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(!is_conventional("feature: add login"));
        assert!(!is_conventional("wip: stuff"));
    }

    #[test]
    fn test_revert_type() {
        assert!(is_conventional("revert: undo login change"));
    }

    #[test]
    fn test_subject_roundtrip() {
        for line in [
            "feat: add login",
            "fix(auth): reject expired tokens",
            "refactor!: rename config keys",
            "perf(db)!: batch inserts",
        ] {
            assert_eq!(parse_subject(line).unwrap().subject(), line);
        }
    }

    #[test]
    fn test_parse_full_message_with_body() {
        let commit = ConventionalCommit::parse("feat: add export\n\nSupports CSV.\nAnd JSON.").unwrap();
        assert_eq!(commit.subject(), "feat: add export");
        assert_eq!(commit.body.as_deref(), Some("Supports CSV.\nAnd JSON."));
        assert_eq!(commit.to_message(), "feat: add export\n\nSupports CSV.\nAnd JSON.");
    }

    #[test]
    fn test_breaking_footer() {
        let commit =
            ConventionalCommit::parse("feat: new api\n\nBREAKING CHANGE: removes old api").unwrap();
        assert!(!commit.breaking);
        assert!(commit.is_breaking());
    }

    #[test]
    fn test_korean_description() {
        let commit = parse_subject("fix: 로그인 버그 수정").unwrap();
        assert_eq!(commit.description, "로그인 버그 수정");
    }
}
