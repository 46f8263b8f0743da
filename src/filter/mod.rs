// src/filter/mod.rs

//! Spec selection filters.
//!
//! The runner never filters specs itself; it hands a [`RunFilters`] to the
//! script executor, which asks [`RunFilters::allows`] for every spec it is
//! about to run. Empty or blank filter values mean "no filter".

pub mod pattern;

pub use pattern::PatternMatcher;

/// Raw filter values as supplied by config or the embedding tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct FilterOptions {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub exclude_tags: Vec<String>,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub exclude_names: Vec<String>,
    #[serde(default)]
    pub contexts: Vec<String>,
    #[serde(default)]
    pub exclude_contexts: Vec<String>,
}

/// What the executor knows about a spec when deciding whether to run it.
#[derive(Debug, Clone, Copy)]
pub struct SpecCandidate<'a> {
    pub description: &'a str,
    pub context_path: &'a [String],
    pub tags: &'a [String],
}

/// Compiled include/exclude filters.
#[derive(Debug, Clone, Default)]
pub struct RunFilters {
    tags: Vec<String>,
    exclude_tags: Vec<String>,
    names: Vec<PatternMatcher>,
    exclude_names: Vec<PatternMatcher>,
    contexts: Vec<PatternMatcher>,
    exclude_contexts: Vec<PatternMatcher>,
    /// Incremental selection; applies on top of the name includes.
    changed_specs: Option<PatternMatcher>,
}

impl RunFilters {
    /// No filtering at all.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_options(opts: &FilterOptions) -> Self {
        Self {
            tags: normalized_tags(&opts.tags),
            exclude_tags: normalized_tags(&opts.exclude_tags),
            names: matchers(&opts.names),
            exclude_names: matchers(&opts.exclude_names),
            contexts: matchers(&opts.contexts),
            exclude_contexts: matchers(&opts.exclude_contexts),
            changed_specs: None,
        }
    }

    /// Same filters, further narrowed to specs whose description matches
    /// `pattern` exactly as written (case-sensitive).
    ///
    /// Used for incremental runs where the pattern selects the changed
    /// specs. Configured name includes still apply.
    pub fn with_name_pattern(&self, pattern: &str) -> Self {
        let mut next = self.clone();
        next.changed_specs = Some(PatternMatcher::case_sensitive(pattern));
        next
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
            && self.exclude_tags.is_empty()
            && self.names.is_empty()
            && self.exclude_names.is_empty()
            && self.contexts.is_empty()
            && self.exclude_contexts.is_empty()
            && self.changed_specs.is_none()
    }

    /// Name include patterns, as given.
    pub fn name_patterns(&self) -> Vec<&str> {
        self.names.iter().map(|m| m.as_str()).collect()
    }

    /// The incremental selection pattern, if any.
    pub fn changed_spec_pattern(&self) -> Option<&str> {
        self.changed_specs.as_ref().map(|m| m.as_str())
    }

    pub fn allows(&self, spec: SpecCandidate<'_>) -> bool {
        let context = spec.context_path.join(" > ");

        if !self.tags.is_empty()
            && !spec
                .tags
                .iter()
                .any(|t| self.tags.contains(&t.to_lowercase()))
        {
            return false;
        }
        if spec
            .tags
            .iter()
            .any(|t| self.exclude_tags.contains(&t.to_lowercase()))
        {
            return false;
        }

        if !self.names.is_empty() && !self.names.iter().any(|m| m.is_match(spec.description)) {
            return false;
        }
        if self
            .changed_specs
            .as_ref()
            .is_some_and(|m| !m.is_match(spec.description))
        {
            return false;
        }
        if self.exclude_names.iter().any(|m| m.is_match(spec.description)) {
            return false;
        }

        if !self.contexts.is_empty() && !self.contexts.iter().any(|m| m.is_match(&context)) {
            return false;
        }
        if self.exclude_contexts.iter().any(|m| m.is_match(&context)) {
            return false;
        }

        true
    }
}

fn normalized_tags(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_lowercase())
        .collect()
}

fn matchers(values: &[String]) -> Vec<PatternMatcher> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(PatternMatcher::new)
        .collect()
}
