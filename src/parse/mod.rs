// src/parse/mod.rs

//! Static view of a spec file, produced by an external parser.
//!
//! The parser itself is out of scope; this module defines the snapshot types
//! the diff machinery works on and the [`StaticParser`] seam.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::errors::Result;
use crate::types::BoxFuture;

/// Separator used when building a spec's identity key.
pub const KEY_SEPARATOR: &str = " > ";

/// How a spec was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpecType {
    #[default]
    Regular,
    Focused,
    Skipped,
}

/// A single spec as seen without executing the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticSpec {
    pub description: String,
    pub context_path: Vec<String>,
    pub line_number: u32,
    pub spec_type: SpecType,
    pub is_pending: bool,
}

impl StaticSpec {
    pub fn new(
        context_path: impl IntoIterator<Item = impl Into<String>>,
        description: impl Into<String>,
        line_number: u32,
    ) -> Self {
        Self {
            description: description.into(),
            context_path: context_path.into_iter().map(Into::into).collect(),
            line_number,
            spec_type: SpecType::Regular,
            is_pending: false,
        }
    }

    /// Identity used for diffing: `context > ... > description`.
    ///
    /// Not guaranteed unique within a file.
    pub fn key(&self) -> String {
        let mut parts: Vec<&str> = self.context_path.iter().map(String::as_str).collect();
        parts.push(&self.description);
        parts.join(KEY_SEPARATOR)
    }
}

/// Snapshot of a spec file.
///
/// `is_complete == false` means the file declares specs that cannot be
/// enumerated statically (e.g. generated in a loop from runtime data).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticParseResult {
    pub is_complete: bool,
    pub specs: Vec<StaticSpec>,
}

impl StaticParseResult {
    pub fn complete(specs: Vec<StaticSpec>) -> Self {
        Self {
            is_complete: true,
            specs,
        }
    }

    pub fn incomplete(specs: Vec<StaticSpec>) -> Self {
        Self {
            is_complete: false,
            specs,
        }
    }
}

/// External static parser.
pub trait StaticParser: Send + Sync {
    fn parse_file<'a>(
        &'a self,
        path: &'a Path,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<StaticParseResult>>;
}
