//! YAML frontmatter at the top of a document.
//!
//! A document may open with a `---` line, a YAML mapping, and a closing
//! `---` line. Everything after the closing delimiter is the body.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::ParseError;

pub const DEFAULT_PAGE_TYPE: &str = "tutorial";

/// How a page's interactive state is persisted by the runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistMode {
    None,
    #[default]
    LocalStorage,
    Server,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Json,
    Csv,
    Rest,
    Pg,
    Exec,
    Graphql,
    Sqlite,
    Markdown,
    Wasm,
    /// Any other name, kept as written. The runtime decides whether it
    /// can serve it.
    #[serde(untagged)]
    Other(String),
}

/// One named data source. Which fields matter depends on `source_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(rename = "type")]
    pub source_type: SourceType,
    /// exec: command line to run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
    /// pg/sqlite/graphql: query text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// rest/graphql: endpoint.
    #[serde(default, alias = "from", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// json/csv/markdown: file path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// markdown: section anchor, e.g. `#todos`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// wasm: module path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readonly: Option<bool>,
    /// exec: wait for an explicit run instead of fetching on load.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub manual: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

impl SourceConfig {
    pub fn new(source_type: SourceType) -> Self {
        SourceConfig {
            source_type,
            cmd: None,
            query: None,
            url: None,
            file: None,
            anchor: None,
            db: None,
            table: None,
            path: None,
            readonly: None,
            manual: false,
            options: BTreeMap::new(),
        }
    }

    /// A writable markdown source backed by one section of `file`.
    pub fn markdown_section(file: &Path, anchor: &str) -> Self {
        SourceConfig {
            file: Some(file.display().to_string()),
            anchor: Some(format!("#{}", anchor)),
            readonly: Some(false),
            ..SourceConfig::new(SourceType::Markdown)
        }
    }

    /// Sources are read-only unless they say otherwise.
    pub fn is_readonly(&self) -> bool {
        self.readonly.unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frontmatter {
    pub title: Option<String>,
    /// tutorial, guide, reference, playground, ...
    #[serde(rename = "type")]
    pub page_type: String,
    pub persist: PersistMode,
    pub steps: u32,
    pub sidebar: Option<bool>,
    pub sources: BTreeMap<String, SourceConfig>,
}

impl Default for Frontmatter {
    fn default() -> Self {
        Frontmatter {
            title: None,
            page_type: DEFAULT_PAGE_TYPE.to_string(),
            persist: PersistMode::default(),
            steps: 0,
            sidebar: None,
            sources: BTreeMap::new(),
        }
    }
}

/// Wire shape of the YAML header. Every key may be absent or null.
#[derive(Debug, Default, Deserialize)]
struct RawFrontmatter {
    #[serde(default)]
    title: Option<String>,
    #[serde(default, rename = "type")]
    page_type: Option<String>,
    #[serde(default)]
    persist: Option<PersistMode>,
    #[serde(default)]
    steps: Option<u32>,
    #[serde(default)]
    sidebar: Option<bool>,
    #[serde(default)]
    sources: Option<BTreeMap<String, SourceConfig>>,
}

impl From<RawFrontmatter> for Frontmatter {
    fn from(raw: RawFrontmatter) -> Self {
        Frontmatter {
            title: raw.title.filter(|t| !t.trim().is_empty()),
            page_type: raw
                .page_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PAGE_TYPE.to_string()),
            persist: raw.persist.unwrap_or_default(),
            steps: raw.steps.unwrap_or(0),
            sidebar: raw.sidebar,
            sources: raw.sources.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FrontmatterError {
    #[error("unclosed frontmatter: no closing `---` line")]
    Unclosed,
    #[error("invalid frontmatter YAML: {source}")]
    Yaml {
        #[source]
        source: serde_yaml::Error,
        /// 1-indexed file line of the YAML error.
        line: usize,
        column: Option<usize>,
    },
}

impl FrontmatterError {
    pub fn into_parse_error(self, file: &Path) -> ParseError {
        match self {
            FrontmatterError::Unclosed => ParseError::structural(file, 1, self.to_string())
                .with_hint("Close the frontmatter with a line containing only `---`"),
            FrontmatterError::Yaml { line, column, .. } => {
                let error = ParseError::structural(file, line, self.to_string());
                match column {
                    Some(column) => error.with_column(column),
                    None => error,
                }
            }
        }
    }
}

/// A document split into its header and body.
#[derive(Debug, Clone)]
pub struct Extracted<'a> {
    pub frontmatter: Frontmatter,
    pub body: &'a str,
    /// Byte offset of `body` within the source.
    pub body_offset: usize,
    /// 1-indexed file line on which `body` starts.
    pub body_line: usize,
}

/// Split `source` into frontmatter and body.
///
/// Without an opening delimiter the whole source is the body and the
/// frontmatter takes its defaults.
pub fn extract(source: &str) -> Result<Extracted<'_>, FrontmatterError> {
    let text = source.strip_prefix('\u{feff}').unwrap_or(source);
    let bom_len = source.len() - text.len();

    let Some(after_open) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return Ok(Extracted {
            frontmatter: Frontmatter::default(),
            body: source,
            body_offset: 0,
            body_line: 1,
        });
    };
    let open_len = text.len() - after_open.len();

    let mut offset = 0;
    let mut close = None;
    for line in after_open.split_inclusive('\n') {
        if line.trim_end_matches(['\n', '\r']) == "---" {
            close = Some((offset, offset + line.len()));
            break;
        }
        offset += line.len();
    }
    let (yaml_end, body_start) = close.ok_or(FrontmatterError::Unclosed)?;

    let yaml = &after_open[..yaml_end];
    let raw = if yaml.trim().is_empty() {
        RawFrontmatter::default()
    } else {
        serde_yaml::from_str::<RawFrontmatter>(yaml).map_err(|source| {
            let location = source.location();
            FrontmatterError::Yaml {
                // The YAML starts on line 2, after the opening delimiter.
                line: location.as_ref().map_or(2, |l| l.line() + 1),
                column: location.as_ref().map(|l| l.column()),
                source,
            }
        })?
    };

    let body_offset = bom_len + open_len + body_start;
    Ok(Extracted {
        frontmatter: raw.into(),
        body: &source[body_offset..],
        body_offset,
        body_line: 1 + source[..body_offset].matches('\n').count(),
    })
}
