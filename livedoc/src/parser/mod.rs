pub(crate) mod classify;
pub mod error;
pub mod lines;
pub(crate) mod render;

pub use error::{ErrorKind, ParseError};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Compiled;
use crate::frontmatter;
use crate::page::{BlockSet, Page, PageConfig};
use crate::schedule::{self, ScanOutput};
use crate::tasks::{self, Synthesis};
use classify::Classified;
use lines::LineMap;

/// Switches for the optional compile stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Turn pure task-list sections into interactive blocks.
    pub auto_tasks: bool,
    /// Scan prose for schedule tokens and imperatives.
    pub schedule: bool,
    /// Give headings without an explicit id a slug id.
    pub heading_ids: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            auto_tasks: true,
            schedule: true,
            heading_ids: true,
        }
    }
}

/// Parser entry point.
pub struct Parser {
    source: String,
    path: PathBuf,
    options: CompileOptions,
}

impl Parser {
    pub fn new(source: String, path: impl Into<PathBuf>) -> Self {
        Parser {
            source,
            path: path.into(),
            options: CompileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Compile the source into a [`Page`].
    ///
    /// The first fatal problem aborts compilation; schedule problems are
    /// returned as warnings alongside the page.
    pub fn parse(&self) -> Result<Compiled, ParseError> {
        self.compile().map_err(|err| err.located_in(&self.source))
    }

    fn compile(&self) -> Result<Compiled, ParseError> {
        let file = self.path.as_path();
        let extracted = frontmatter::extract(&self.source).map_err(|err| err.into_parse_error(file))?;
        let fm = extracted.frontmatter;

        let Synthesis {
            body,
            sources: synthetic,
            origins,
        } = if self.options.auto_tasks {
            tasks::synthesize(extracted.body, file)
        } else {
            Synthesis::unchanged(extracted.body)
        };

        let line_map = match origins {
            Some(origins) => LineMap::remapped(&body, extracted.body_line, origins),
            None => LineMap::identity(&body, extracted.body_line),
        };

        let mut sources = fm.sources;
        for (name, config) in synthetic {
            if sources.contains_key(&name) {
                log::warn!("source `{}` is declared in frontmatter; keeping the declared one", name);
                continue;
            }
            sources.insert(name, config);
        }

        let Classified {
            events,
            blocks: collected,
            skip_ranges,
        } = classify::classify(&body, &line_map, file)?;

        let scan = if self.options.schedule {
            schedule::scan(&body, &skip_ranges, &line_map)
        } else {
            ScanOutput::default()
        };

        let set = BlockSet::build(&collected, &sources, file)?;
        let static_html =
            render::render_html(events, &collected, &set.blocks, self.options.heading_ids, file)?;

        let page = Page {
            id: page_id(file),
            title: fm.title,
            page_type: fm.page_type,
            source_file: file.to_path_buf(),
            config: PageConfig {
                persist: fm.persist,
                multi_step: fm.steps > 0,
                step_count: fm.steps,
                sidebar: fm.sidebar,
                sources,
            },
            static_html,
            markdown: body.into_owned(),
            blocks: set.blocks,
            server_ids: set.server_ids,
            wasm_ids: set.wasm_ids,
            interactive_ids: set.interactive_ids,
            schedules: scan.tokens,
            imperatives: scan.imperatives,
        };

        log::debug!(
            "compiled {} ({} blocks, {} schedule tokens)",
            file.display(),
            page.blocks.len(),
            page.schedules.len()
        );

        Ok(Compiled {
            page,
            warnings: scan.warnings,
        })
    }
}

fn page_id(file: &Path) -> String {
    file.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string())
}
