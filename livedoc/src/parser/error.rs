use std::fmt;
use std::fmt::Write as _;
use std::ops::Range;
use std::path::{Path, PathBuf};

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};

/// The stage of compilation that rejected a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Frontmatter could not be split or decoded, or the source could not be read.
    Structural,
    /// A fenced block asked for a block type that does not exist.
    UnknownBlockType,
    /// A state, source, or block id reference does not resolve.
    Reference,
    /// The HTML rewrite lost track of a collected block.
    Render,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Structural => "structural",
            ErrorKind::UnknownBlockType => "unknown-block-type",
            ErrorKind::Reference => "reference",
            ErrorKind::Render => "render",
        }
    }
}

/// Fatal compile error with source location information.
///
/// `line` is 1-indexed in the original file, frontmatter included.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub kind: ErrorKind,
    pub file: PathBuf,
    pub line: usize,
    pub column: Option<usize>,
    pub message: String,
    /// Byte span in the original source, when known.
    pub span: Option<Range<usize>>,
    pub hint: Option<String>,
    pub related: Option<String>,
}

impl ParseError {
    pub fn new(
        kind: ErrorKind,
        file: impl Into<PathBuf>,
        line: usize,
        message: impl Into<String>,
    ) -> Self {
        ParseError {
            kind,
            file: file.into(),
            line,
            column: None,
            message: message.into(),
            span: None,
            hint: None,
            related: None,
        }
    }

    pub fn structural(file: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Structural, file, line, message)
    }

    pub fn reference(file: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Reference, file, line, message)
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    pub fn with_span(mut self, span: Range<usize>) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_related(mut self, related: impl Into<String>) -> Self {
        self.related = Some(related.into());
        self
    }

    /// Fill in `span` from `line` when no finer span was recorded.
    pub(crate) fn located_in(mut self, source: &str) -> Self {
        if self.span.is_none() {
            self.span = line_range(source, self.line);
        }
        self
    }

    /// Render the full report, re-reading the file for context.
    ///
    /// If the file cannot be read the context block is left out; the rest of
    /// the report is unaffected.
    pub fn render(&self) -> String {
        let source = std::fs::read_to_string(&self.file).ok();
        self.render_report(source.as_deref())
    }

    /// Render the full report against source text already in memory.
    pub fn render_with_source(&self, source: &str) -> String {
        self.render_report(Some(source))
    }

    fn render_report(&self, source: Option<&str>) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Error in {}", self.file.display());
        out.push('\n');
        let _ = writeln!(out, "Line {}: {}", self.line, self.message);

        if let Some(context) = source.and_then(|s| self.context(s)) {
            out.push_str(&context);
        }
        if let Some(hint) = &self.hint {
            let _ = writeln!(out, "\nHint: {}", hint);
        }
        if let Some(related) = &self.related {
            let _ = writeln!(out, "\nRelated: {}", related);
        }
        out
    }

    /// Two lines either side of the error line, with a caret under the column.
    fn context(&self, source: &str) -> Option<String> {
        let lines: Vec<&str> = source.lines().collect();
        if self.line < 1 || self.line > lines.len() {
            return None;
        }

        let start = self.line.saturating_sub(2).max(1);
        let end = (self.line + 2).min(lines.len());

        let mut out = String::from("\n");
        for number in start..=end {
            let prefix = format!("  {:>2} | ", number);
            let _ = writeln!(out, "{}{}", prefix, lines[number - 1]);
            if number == self.line {
                if let Some(column) = self.column.filter(|c| *c > 0) {
                    let _ = writeln!(out, "{}^", " ".repeat(prefix.len() + column - 1));
                }
            }
        }
        Some(out)
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self, file_id: usize) -> Diagnostic<usize> {
        let mut notes = Vec::new();
        if let Some(hint) = &self.hint {
            notes.push(format!("hint: {}", hint));
        }
        if let Some(related) = &self.related {
            notes.push(related.clone());
        }

        let labels = match &self.span {
            Some(span) => vec![Label::primary(file_id, span.clone())],
            None => Vec::new(),
        };

        Diagnostic::new(Severity::Error)
            .with_message(&self.message)
            .with_code(self.kind.as_str())
            .with_labels(labels)
            .with_notes(notes)
    }

    pub fn file(&self) -> &Path {
        &self.file
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file.display(), self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Byte range of a 1-indexed line, excluding its line terminator.
pub(crate) fn line_range(source: &str, line: usize) -> Option<Range<usize>> {
    if line == 0 {
        return None;
    }
    let mut offset = 0;
    for (index, text) in source.split_inclusive('\n').enumerate() {
        if index + 1 == line {
            let content = text.trim_end_matches(['\n', '\r']);
            return Some(offset..offset + content.len());
        }
        offset += text.len();
    }
    None
}
