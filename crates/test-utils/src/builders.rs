#![allow(dead_code)]

use specwatch::exec::{ContextNode, RootContext, SpecOutcome, SpecStatus};
use specwatch::parse::{SpecType, StaticParseResult, StaticSpec};

/// Builder for `StaticSpec` to simplify test setup.
pub struct SpecBuilder {
    spec: StaticSpec,
}

impl SpecBuilder {
    pub fn new(description: &str) -> Self {
        Self {
            spec: StaticSpec::new(Vec::<String>::new(), description, 1),
        }
    }

    /// Context path given as `"Outer > Inner"`.
    pub fn context(mut self, path: &str) -> Self {
        self.spec.context_path = path
            .split(" > ")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    pub fn line(mut self, line: u32) -> Self {
        self.spec.line_number = line;
        self
    }

    pub fn focused(mut self) -> Self {
        self.spec.spec_type = SpecType::Focused;
        self
    }

    pub fn skipped(mut self) -> Self {
        self.spec.spec_type = SpecType::Skipped;
        self
    }

    pub fn pending(mut self) -> Self {
        self.spec.is_pending = true;
        self
    }

    pub fn build(self) -> StaticSpec {
        self.spec
    }
}

/// Shorthand for a regular spec in `context` at `line`.
pub fn spec(context: &str, description: &str, line: u32) -> StaticSpec {
    SpecBuilder::new(description).context(context).line(line).build()
}

pub fn complete(specs: Vec<StaticSpec>) -> StaticParseResult {
    StaticParseResult::complete(specs)
}

pub fn dynamic(specs: Vec<StaticSpec>) -> StaticParseResult {
    StaticParseResult::incomplete(specs)
}

pub fn passed(description: &str) -> SpecOutcome {
    SpecOutcome::new(description, SpecStatus::Passed)
}

pub fn failed(description: &str) -> SpecOutcome {
    let mut outcome = SpecOutcome::new(description, SpecStatus::Failed);
    outcome.error = Some(format!("{description} failed"));
    outcome
}

pub fn pending(description: &str) -> SpecOutcome {
    SpecOutcome::new(description, SpecStatus::Pending)
}

pub fn skipped(description: &str) -> SpecOutcome {
    SpecOutcome::new(description, SpecStatus::Skipped)
}

/// Root context holding one named context with the given outcomes.
pub fn root_with(context: &str, outcomes: Vec<SpecOutcome>) -> RootContext {
    let child = outcomes
        .into_iter()
        .fold(ContextNode::new(context), ContextNode::with_spec);
    ContextNode::new("").with_child(child)
}

/// Root context with `passed` passing and `failed` failing specs.
pub fn root_counts(passed_n: usize, failed_n: usize) -> RootContext {
    let mut outcomes = Vec::new();
    outcomes.extend((0..passed_n).map(|i| passed(&format!("passes {i}"))));
    outcomes.extend((0..failed_n).map(|i| failed(&format!("fails {i}"))));
    root_with("Suite", outcomes)
}
