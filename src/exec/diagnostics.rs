// src/exec/diagnostics.rs

//! Rendering of compilation failures with surrounding source lines.

use std::fmt;
use std::path::PathBuf;

/// Lines shown above and below the offending line.
pub const CONTEXT_LINES: usize = 2;

/// Raw compiler diagnostic as reported by the script executor.
///
/// `line` and `column` are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileDiagnostic {
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl CompileDiagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            column: None,
        }
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

/// A compilation failure enriched with the source excerpt around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationFailure {
    pub file: PathBuf,
    pub diagnostic: CompileDiagnostic,
    /// Rendered excerpt (line numbers, gutter, caret); `None` when the
    /// location or the source text is unknown.
    pub source_context: Option<String>,
}

impl CompilationFailure {
    pub fn new(file: impl Into<PathBuf>, diagnostic: CompileDiagnostic, source: Option<&str>) -> Self {
        let source_context = match (source, diagnostic.line) {
            (Some(text), Some(line)) => {
                format_source_context(text, line, diagnostic.column.unwrap_or(1), CONTEXT_LINES)
            }
            _ => None,
        };
        Self {
            file: file.into(),
            diagnostic,
            source_context,
        }
    }

    pub fn message(&self) -> &str {
        &self.diagnostic.message
    }
}

impl fmt::Display for CompilationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.diagnostic.message)?;
        match (self.diagnostic.line, self.diagnostic.column) {
            (Some(line), Some(col)) => write!(f, "  --> {}:{line}:{col}", self.file.display())?,
            (Some(line), None) => write!(f, "  --> {}:{line}", self.file.display())?,
            _ => write!(f, "  --> {}", self.file.display())?,
        }
        if let Some(context) = &self.source_context {
            write!(f, "\n{context}")?;
        }
        Ok(())
    }
}

/// Render `context` lines around `line` with a caret under `column`.
///
/// Returns `None` if `line` is outside the source.
///
/// ```text
///    |
///  8 | let a = 1;
///  9 | let b = ;
///    |         ^
/// 10 | a + b
/// ```
pub fn format_source_context(source: &str, line: u32, column: u32, context: usize) -> Option<String> {
    let lines: Vec<&str> = source.lines().collect();
    let target = usize::try_from(line).ok()?.checked_sub(1)?;
    if target >= lines.len() {
        return None;
    }

    let first = target.saturating_sub(context);
    let last = (target + context).min(lines.len() - 1);
    let width = (last + 1).to_string().len();
    let gutter = " ".repeat(width);

    let mut out = format!("{gutter} |\n");
    for (idx, text) in lines.iter().enumerate().take(last + 1).skip(first) {
        out.push_str(&format!("{:>width$} | {}\n", idx + 1, text));
        if idx == target {
            out.push_str(&format!("{gutter} | {}^\n", caret_padding(text, column)));
        }
    }
    // Drop the trailing newline so callers control layout.
    out.pop();
    Some(out)
}

/// Whitespace leading up to `column`, keeping tabs so the caret lines up.
fn caret_padding(text: &str, column: u32) -> String {
    let offset = usize::try_from(column.max(1) - 1).unwrap_or(0);
    text.chars()
        .chain(std::iter::repeat(' '))
        .take(offset)
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect()
}
