// src/filter/pattern.rs

use std::fmt;

use regex::{Regex, RegexBuilder};
use tracing::debug;

/// Text matcher used by run filters.
///
/// The pattern is compiled as a case-insensitive regular expression. If it is
/// not a valid regex (e.g. `"adds (two"`), it degrades to a case-insensitive
/// substring match instead of failing, so users can paste raw test names.
#[derive(Clone)]
pub struct PatternMatcher {
    raw: String,
    ignore_case: bool,
    kind: MatcherKind,
}

#[derive(Clone)]
enum MatcherKind {
    Regex(Regex),
    Substring(String),
}

impl fmt::Debug for PatternMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternMatcher")
            .field("raw", &self.raw)
            .field("ignore_case", &self.ignore_case)
            .field("is_regex", &self.is_regex())
            .finish()
    }
}

impl PatternMatcher {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self::build(pattern.into(), true)
    }

    /// Like [`PatternMatcher::new`] but matching case exactly. Used for
    /// generated patterns built from escaped spec descriptions.
    pub fn case_sensitive(pattern: impl Into<String>) -> Self {
        Self::build(pattern.into(), false)
    }

    fn build(raw: String, ignore_case: bool) -> Self {
        let kind = match RegexBuilder::new(&raw).case_insensitive(ignore_case).build() {
            Ok(re) => MatcherKind::Regex(re),
            Err(err) => {
                debug!(pattern = %raw, error = %err, "invalid regex; falling back to substring match");
                if ignore_case {
                    MatcherKind::Substring(raw.to_lowercase())
                } else {
                    MatcherKind::Substring(raw.clone())
                }
            }
        };
        Self {
            raw,
            ignore_case,
            kind,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the pattern compiled as a regular expression.
    pub fn is_regex(&self) -> bool {
        matches!(self.kind, MatcherKind::Regex(_))
    }

    pub fn is_match(&self, text: &str) -> bool {
        match &self.kind {
            MatcherKind::Regex(re) => re.is_match(text),
            MatcherKind::Substring(needle) if self.ignore_case => {
                text.to_lowercase().contains(needle.as_str())
            }
            MatcherKind::Substring(needle) => text.contains(needle.as_str()),
        }
    }
}
