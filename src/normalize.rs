//! Normalization of raw rewriter output into a single Conventional Commit.
//!
//! Model output is untrusted. It may be wrapped in quotes or code fences,
//! preceded by conversational prose, or use a near-miss type keyword such as
//! `Feature:` or `fix:missing space`. The normalizer:
//!
//! 1. strips wrapping artifacts (text around a fenced block, surrounding
//!    quotes, blank lines);
//! 2. walks the lines in order, taking the first one that satisfies the
//!    grammar as-is or after one repair pass as the subject;
//! 3. keeps the remaining lines after it as the body;
//! 4. otherwise fails with [`RewriteError::UnparseableRewrite`].

use std::sync::LazyLock;

use regex_lite::Regex;
use tracing::debug;

use crate::convention::{CommitType, ConventionalCommit, parse_subject};
use crate::error::RewriteError;

/// Lenient subject pattern used by the repair pass: any letter-only type
/// token in any case, optional whitespace around the scope, bang and colon,
/// and an ASCII or full-width colon.
static LENIENT_SUBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z]+)\s*(?:\(\s*([^()\r\n:]*?)\s*\))?\s*(!)?\s*[:：]\s*(.+)$")
        .expect("lenient subject pattern is valid")
});

/// Leading list markers and markdown emphasis a model may put on a line.
static LINE_DECORATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:#{1,6}\s+|[-*+]\s+|\d{1,2}[.)]\s+|\*\*|__)+").expect("decoration pattern is valid")
});

/// Lines opening or closing a fenced block. `'''` is what fences in the
/// original message are rewritten to before prompting.
const FENCE_MARKERS: &[&str] = &["```", "~~~", "'''"];

/// Quote pairs stripped from around the whole output and around single lines.
const QUOTE_PAIRS: &[(char, char)] = &[
    ('"', '"'),
    ('\'', '\''),
    ('`', '`'),
    ('\u{201C}', '\u{201D}'),
    ('\u{2018}', '\u{2019}'),
];

/// Default near-synonym type keywords the repair pass maps onto the closed set.
const DEFAULT_SYNONYMS: &[(&str, CommitType)] = &[
    ("feature", CommitType::Feat),
    ("features", CommitType::Feat),
    ("feats", CommitType::Feat),
    ("fixes", CommitType::Fix),
    ("fixed", CommitType::Fix),
    ("bugfix", CommitType::Fix),
    ("bug", CommitType::Fix),
    ("hotfix", CommitType::Fix),
    ("doc", CommitType::Docs),
    ("documentation", CommitType::Docs),
    ("formatting", CommitType::Style),
    ("refactoring", CommitType::Refactor),
    ("performance", CommitType::Perf),
    ("optimization", CommitType::Perf),
    ("tests", CommitType::Test),
    ("testing", CommitType::Test),
    ("chores", CommitType::Chore),
    ("reverts", CommitType::Revert),
];

/// Repair heuristics applied when no output line matches the grammar as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairPolicy {
    enabled: bool,
    synonyms: Vec<(String, CommitType)>,
}

impl RepairPolicy {
    /// No repair: only lines that already match the grammar are accepted.
    pub fn strict() -> Self {
        Self {
            enabled: false,
            synonyms: Vec::new(),
        }
    }

    /// Map an extra keyword (case-insensitive) onto a type.
    pub fn with_synonym(mut self, keyword: &str, commit_type: CommitType) -> Self {
        let keyword = keyword.to_lowercase();
        self.synonyms.retain(|(k, _)| *k != keyword);
        self.synonyms.push((keyword, commit_type));
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Resolve a type token: exact keyword in any case, then synonyms.
    pub fn resolve_type(&self, token: &str) -> Option<CommitType> {
        let lower = token.to_lowercase();
        lower.parse::<CommitType>().ok().or_else(|| {
            self.synonyms
                .iter()
                .find(|(k, _)| *k == lower)
                .map(|(_, t)| *t)
        })
    }
}

impl Default for RepairPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            synonyms: DEFAULT_SYNONYMS
                .iter()
                .map(|(k, t)| (k.to_string(), *t))
                .collect(),
        }
    }
}

/// Normalize raw rewriter output with the default repair policy.
pub fn normalize(raw_output: &str) -> Result<ConventionalCommit, RewriteError> {
    normalize_with(raw_output, &RepairPolicy::default())
}

/// Normalize raw rewriter output with an explicit repair policy.
pub fn normalize_with(
    raw_output: &str,
    policy: &RepairPolicy,
) -> Result<ConventionalCommit, RewriteError> {
    let lines = strip_wrapping(raw_output);

    // Earliest line that parses as-is or after repair is the subject.
    let (idx, commit) = lines
        .iter()
        .enumerate()
        .find_map(|(i, line)| subject_candidate(line, policy).map(|c| (i, c)))
        .ok_or_else(|| RewriteError::UnparseableRewrite {
            raw_output: raw_output.to_string(),
        })?;

    if idx > 0 {
        debug!("Discarded {} line(s) of preamble before the subject", idx);
    }
    Ok(with_body(commit, &lines[idx + 1..]))
}

fn subject_candidate(line: &str, policy: &RepairPolicy) -> Option<ConventionalCommit> {
    if let Some(commit) = parse_subject(strip_quotes(line.trim())) {
        return Some(commit);
    }
    if !policy.is_enabled() {
        return None;
    }
    let commit = repair_line(line, policy)?;
    debug!("Repaired subject line {:?} -> {:?}", line, commit.subject());
    Some(commit)
}

/// Strip wrapping artifacts and return the remaining lines, trimmed at the
/// end, with leading and trailing blank lines removed.
///
/// When the output contains a fenced block only the first block's content
/// is kept; text around it is commentary.
fn strip_wrapping(raw: &str) -> Vec<String> {
    let kept: Vec<&str> = match fenced_content(raw) {
        Some(inner) => inner,
        None => strip_enclosing_quotes(raw.trim()).lines().collect(),
    };

    let mut lines: Vec<String> = kept
        .into_iter()
        .map(|line| line.trim_end().to_string())
        .collect();

    while lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }

    lines
}

fn is_fence(line: &str) -> bool {
    let t = line.trim_start();
    FENCE_MARKERS.iter().any(|marker| t.starts_with(marker))
}

/// Lines inside the first fenced block. An unclosed block runs to the end.
fn fenced_content(text: &str) -> Option<Vec<&str>> {
    let mut lines = text.lines();
    lines.by_ref().find(|line| is_fence(line))?;
    Some(lines.take_while(|line| !is_fence(line)).collect())
}

/// Remove quotes wrapping a multi-line output as a whole.
///
/// A pair is only treated as wrapping when the first line does not close it
/// and the last line does not open it, so `'subject'\n\nbody 'x'` keeps
/// its quotes. Single lines are unquoted per line by the subject search.
fn strip_enclosing_quotes(text: &str) -> &str {
    let mut current = text;
    loop {
        if !current.contains('\n') {
            return current;
        }
        let first = current.lines().next().unwrap_or_default();
        let last = current.lines().last().unwrap_or_default();

        let stripped = QUOTE_PAIRS.iter().find_map(|(open, close)| {
            let inner = current.strip_prefix(*open)?.strip_suffix(*close)?;
            let first_closes = first.trim_end().ends_with(*close);
            let last_opens = last.trim_start().starts_with(*open);
            (!first_closes && !last_opens).then_some(inner)
        });
        match stripped {
            Some(inner) if !inner.trim().is_empty() => current = inner.trim(),
            _ => return current,
        }
    }
}

/// Remove one or more matching quote pairs surrounding the text.
fn strip_quotes(text: &str) -> &str {
    let mut current = text;
    loop {
        let stripped = QUOTE_PAIRS.iter().find_map(|(open, close)| {
            current
                .strip_prefix(*open)
                .and_then(|rest| rest.strip_suffix(*close))
        });
        match stripped {
            Some(inner) if !inner.trim().is_empty() => current = inner.trim(),
            _ => return current,
        }
    }
}

/// Attempt to repair a near-miss subject line.
fn repair_line(line: &str, policy: &RepairPolicy) -> Option<ConventionalCommit> {
    let undecorated = LINE_DECORATION.replace(line.trim(), "");
    let candidate = strip_quotes(undecorated.trim_end_matches("**").trim());

    if let Some(commit) = parse_subject(candidate) {
        return Some(commit);
    }

    let caps = LENIENT_SUBJECT.captures(candidate)?;
    let commit_type = policy.resolve_type(caps.get(1)?.as_str())?;
    let scope = caps
        .get(2)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let breaking = caps.get(3).is_some();
    let description = strip_quotes(caps.get(4)?.as_str().trim());

    if description.is_empty() {
        return None;
    }

    let repaired = ConventionalCommit {
        commit_type,
        scope,
        breaking,
        description: description.to_string(),
        body: None,
    };

    // Only accept a repair that now satisfies the strict grammar.
    parse_subject(&repaired.subject())
}

/// Attach the lines following the subject as the body. Leading and trailing
/// blank lines are dropped and runs of blank lines collapse to one.
fn with_body(mut commit: ConventionalCommit, rest: &[String]) -> ConventionalCommit {
    let mut body: Vec<&str> = Vec::new();
    for line in rest {
        let line = line.trim_end();
        if line.trim().is_empty() {
            if body.last().is_some_and(|l| !l.is_empty()) {
                body.push("");
            }
        } else {
            body.push(line);
        }
    }
    while body.last().is_some_and(|l| l.is_empty()) {
        body.pop();
    }

    commit.body = if body.is_empty() {
        None
    } else {
        Some(body.join("\n"))
    };
    commit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convention::is_conventional;

    #[test]
    fn test_clean_subject() {
        let commit = normalize("fix: resolve login authentication issue").unwrap();
        assert_eq!(commit.to_message(), "fix: resolve login authentication issue");
    }

    #[test]
    fn test_first_matching_line_wins_over_prose() {
        let commit = normalize("Fixed login bug.\n\nfix: resolve login authentication issue").unwrap();
        assert_eq!(commit.subject(), "fix: resolve login authentication issue");
        assert!(commit.body.is_none());
    }

    #[test]
    fn test_unparseable_prose() {
        let err = normalize("I updated the code").unwrap_err();
        assert!(
            matches!(err, RewriteError::UnparseableRewrite { ref raw_output } if raw_output == "I updated the code")
        );
    }

    #[test]
    fn test_empty_output_unparseable() {
        assert!(matches!(
            normalize("   \n\n "),
            Err(RewriteError::UnparseableRewrite { .. })
        ));
    }

    #[test]
    fn test_strips_code_fence() {
        let commit = normalize("```\nfeat(ui): add dark mode\n```").unwrap();
        assert_eq!(commit.to_message(), "feat(ui): add dark mode");
    }

    #[test]
    fn test_strips_language_tagged_fence() {
        let commit = normalize("```text\nchore: bump deps\n```\n").unwrap();
        assert_eq!(commit.to_message(), "chore: bump deps");
    }

    #[test]
    fn test_strips_surrounding_quotes() {
        assert_eq!(normalize("\"fix: handle nil\"").unwrap().subject(), "fix: handle nil");
        assert_eq!(normalize("`docs: fix typo`").unwrap().subject(), "docs: fix typo");
        assert_eq!(
            normalize("\u{201C}perf: cache lookups\u{201D}").unwrap().subject(),
            "perf: cache lookups"
        );
    }

    #[test]
    fn test_body_kept_after_subject() {
        let raw = "feat(auth): add token refresh\n\nRefresh tokens before expiry.\n\n\n\nCloses #12\n";
        let commit = normalize(raw).unwrap();
        assert_eq!(
            commit.to_message(),
            "feat(auth): add token refresh\n\nRefresh tokens before expiry.\n\nCloses #12"
        );
    }

    #[test]
    fn test_body_without_blank_separator() {
        let commit = normalize("fix: guard empty input\nThe parser crashed on empty files.").unwrap();
        assert_eq!(
            commit.to_message(),
            "fix: guard empty input\n\nThe parser crashed on empty files."
        );
    }

    #[test]
    fn test_repair_missing_space_after_colon() {
        let commit = normalize("fix:resolve crash on startup").unwrap();
        assert_eq!(commit.subject(), "fix: resolve crash on startup");
    }

    #[test]
    fn test_repair_capitalized_type() {
        let commit = normalize("Fix(Auth): Reject expired tokens").unwrap();
        assert_eq!(commit.subject(), "fix(Auth): Reject expired tokens");
    }

    #[test]
    fn test_repair_synonym_type() {
        assert_eq!(normalize("Feature: add csv export").unwrap().subject(), "feat: add csv export");
        assert_eq!(normalize("bugfix: handle timeout").unwrap().subject(), "fix: handle timeout");
        assert_eq!(
            normalize("documentation(readme): add badges").unwrap().subject(),
            "docs(readme): add badges"
        );
    }

    #[test]
    fn test_repair_space_before_colon_and_bang() {
        let commit = normalize("feat (api) ! : remove v1").unwrap();
        assert_eq!(commit.subject(), "feat(api)!: remove v1");
        assert!(commit.breaking);
    }

    #[test]
    fn test_repair_fullwidth_colon() {
        let commit = normalize("fix：로그인 버그 수정").unwrap();
        assert_eq!(commit.subject(), "fix: 로그인 버그 수정");
    }

    #[test]
    fn test_repair_list_marker_and_bold() {
        assert_eq!(normalize("- fix: trim input").unwrap().subject(), "fix: trim input");
        assert_eq!(normalize("1. chore: tidy").unwrap().subject(), "chore: tidy");
        assert_eq!(normalize("**feat: add search**").unwrap().subject(), "feat: add search");
    }

    #[test]
    fn test_repair_skips_unrelated_labels() {
        let raw = "Note: this was hard\nrefactor:split module";
        let commit = normalize(raw).unwrap();
        assert_eq!(commit.subject(), "refactor: split module");
    }

    #[test]
    fn test_repair_unknown_keyword_fails() {
        assert!(normalize("Update: bump version").is_err());
        assert!(normalize("Summary: fixed it").is_err());
    }

    #[test]
    fn test_strict_policy_disables_repair() {
        let err = normalize_with("fix:resolve crash", &RepairPolicy::strict()).unwrap_err();
        assert!(matches!(err, RewriteError::UnparseableRewrite { .. }));
    }

    #[test]
    fn test_custom_synonym() {
        let policy = RepairPolicy::default().with_synonym("Deps", CommitType::Build);
        let commit = normalize_with("deps: bump serde", &policy).unwrap();
        assert_eq!(commit.subject(), "build: bump serde");
    }

    #[test]
    fn test_repaired_first_line_beats_later_body_line() {
        let commit = normalize("Fix: resolve crash on startup\n\ntest: add regression case").unwrap();
        assert_eq!(commit.subject(), "fix: resolve crash on startup");
        assert_eq!(commit.body.as_deref(), Some("test: add regression case"));
    }

    #[test]
    fn test_strict_policy_uses_first_valid_line() {
        let commit = normalize_with(
            "Fix: resolve crash\n\ntest: add regression case",
            &RepairPolicy::strict(),
        )
        .unwrap();
        assert_eq!(commit.subject(), "test: add regression case");
    }

    #[test]
    fn test_quoted_subject_and_quoted_body_word() {
        let commit = normalize("'feat: add option flag'\n\nDefaults to 'off'").unwrap();
        assert_eq!(
            commit.to_message(),
            "feat: add option flag\n\nDefaults to 'off'"
        );
    }

    #[test]
    fn test_quotes_wrapping_whole_message() {
        let commit = normalize("\"feat: add export\n\nSupports CSV.\"").unwrap();
        assert_eq!(commit.to_message(), "feat: add export\n\nSupports CSV.");
    }

    #[test]
    fn test_commentary_outside_fence_dropped() {
        let commit =
            normalize("```\nfix: handle empty input\n```\nThis follows Conventional Commits.")
                .unwrap();
        assert_eq!(commit.to_message(), "fix: handle empty input");

        let commit = normalize("Here is the message:\n```text\nfeat: add x\n\nbody\n```\nLet me know!")
            .unwrap();
        assert_eq!(commit.to_message(), "feat: add x\n\nbody");
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        let commit = normalize("```\nchore: bump deps").unwrap();
        assert_eq!(commit.to_message(), "chore: bump deps");
    }

    #[test]
    fn test_sanitized_fence_markers() {
        let commit = normalize("'''\nci: run tests on windows\n'''").unwrap();
        assert_eq!(commit.to_message(), "ci: run tests on windows");
    }

    #[test]
    fn test_output_is_always_conventional() {
        for raw in [
            "fix: a",
            "Here you go:\n```\nfeat(x): add y\n\nbody\n```",
            "Feature:add z",
            "\"docs: readme\"",
        ] {
            let message = normalize(raw).unwrap().to_message();
            assert!(is_conventional(&message), "not conventional: {message:?}");
            assert_eq!(normalize(&message).unwrap().to_message(), message);
        }
    }
}
