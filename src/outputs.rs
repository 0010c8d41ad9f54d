//! Action outputs: `original-message`, `formatted-message`, `was-modified`.
//!
//! Written to the file named by `GITHUB_OUTPUT` using the multi-line
//! `name<<DELIMITER` form, or printed to stdout in the same form when no
//! file is configured.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use tracing::debug;

use crate::orchestrator::RewriteResult;

const DELIMITER_PREFIX: &str = "COMMIT_FORMATTER_EOF";

/// Output values for one invocation.
///
/// `formatted_message` and `was_modified` are absent when the rewrite could
/// not be computed, so a failed run is never mistaken for a skipped one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutputs {
    pub original_message: String,
    pub formatted_message: Option<String>,
    pub was_modified: Option<bool>,
}

impl ActionOutputs {
    /// Outputs when no rewrite was computed: only the original message.
    pub fn failed(original: &str) -> Self {
        Self {
            original_message: original.to_string(),
            formatted_message: None,
            was_modified: None,
        }
    }

    fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = vec![("original-message", self.original_message.clone())];
        if let Some(formatted) = &self.formatted_message {
            entries.push(("formatted-message", formatted.clone()));
        }
        if let Some(modified) = self.was_modified {
            entries.push(("was-modified", modified.to_string()));
        }
        entries
    }

    /// Render in the `$GITHUB_OUTPUT` file format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (name, value) in self.entries() {
            let delimiter = delimiter_for(&value);
            out.push_str(&format!("{name}<<{delimiter}\n{value}\n{delimiter}\n"));
        }
        out
    }

    /// Append to the output file, or print to stdout when `path` is `None`.
    pub fn write(&self, path: Option<&Path>) -> io::Result<()> {
        match path {
            Some(path) => {
                debug!("Writing outputs to {}", path.display());
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                self.write_to(&mut file)
            }
            None => self.write_to(&mut io::stdout().lock()),
        }
    }

    fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        out.write_all(self.render().as_bytes())?;
        out.flush()
    }
}

impl From<&RewriteResult> for ActionOutputs {
    fn from(result: &RewriteResult) -> Self {
        Self {
            original_message: result.original_message.clone(),
            formatted_message: Some(result.formatted_message.clone()),
            was_modified: Some(result.was_modified),
        }
    }
}

/// A delimiter that does not occur as a line of `value`.
fn delimiter_for(value: &str) -> String {
    let mut delimiter = DELIMITER_PREFIX.to_string();
    let mut n = 0;
    while value.lines().any(|line| line == delimiter) {
        n += 1;
        delimiter = format!("{DELIMITER_PREFIX}_{n}");
    }
    delimiter
}
