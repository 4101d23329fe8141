pub mod block;
pub mod frontmatter;
pub mod page;
pub mod parser;
pub mod schedule;
pub mod tasks;

use std::path::Path;

pub use crate::page::Page;
pub use crate::parser::{CompileOptions, ParseError, Parser};
use crate::schedule::ScheduleWarning;

/// A compiled page and the non-fatal warnings found along the way.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub page: Page,
    pub warnings: Vec<ScheduleWarning>,
}

/// Compile in-memory source. `path` is used for the page id, synthetic
/// sources and error reports; it is not read.
pub fn compile(source: &str, path: impl AsRef<Path>) -> Result<Compiled, ParseError> {
    compile_with(source, path, CompileOptions::default())
}

pub fn compile_with(
    source: &str,
    path: impl AsRef<Path>,
    options: CompileOptions,
) -> Result<Compiled, ParseError> {
    Parser::new(source.to_string(), path.as_ref())
        .with_options(options)
        .parse()
}

/// Read and compile a file. Paths in the result are absolute.
pub fn compile_file(path: impl AsRef<Path>) -> Result<Compiled, ParseError> {
    compile_file_with(path, CompileOptions::default())
}

pub fn compile_file_with(
    path: impl AsRef<Path>,
    options: CompileOptions,
) -> Result<Compiled, ParseError> {
    let path = path.as_ref();
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let source = std::fs::read_to_string(path).map_err(|err| {
        ParseError::structural(&absolute, 1, format!("failed to read file: {}", err))
    })?;
    compile_with(&source, absolute, options)
}
