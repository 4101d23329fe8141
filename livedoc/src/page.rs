//! The compiled page and the resolution of block ids and references.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::block::reference::{Suggestion, suggest};
use crate::block::{Block, BlockType, InteractiveBlock, ServerBlock, WasmBlock};
use crate::frontmatter::{PersistMode, SourceConfig};
use crate::parser::classify::CodeBlock;
use crate::parser::error::ParseError;
use crate::schedule::{Imperative, ScheduleToken};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageConfig {
    pub persist: PersistMode,
    pub multi_step: bool,
    pub step_count: u32,
    pub sidebar: Option<bool>,
    /// Author-declared sources merged with synthetic `_auto_` ones.
    pub sources: BTreeMap<String, SourceConfig>,
}

/// One compiled document.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    /// File name of the source, used as the page id.
    pub id: String,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub page_type: String,
    pub source_file: PathBuf,
    pub config: PageConfig,
    pub static_html: String,
    /// The body after task synthesis.
    pub markdown: String,
    pub(crate) blocks: Vec<Block>,
    #[serde(skip)]
    pub(crate) server_ids: BTreeMap<String, usize>,
    #[serde(skip)]
    pub(crate) wasm_ids: BTreeMap<String, usize>,
    #[serde(skip)]
    pub(crate) interactive_ids: BTreeMap<String, usize>,
    pub schedules: Vec<ScheduleToken>,
    pub imperatives: Vec<Imperative>,
}

impl Page {
    /// All blocks in document order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id() == id)
    }

    pub fn server_block(&self, id: &str) -> Option<&ServerBlock> {
        match self.blocks.get(*self.server_ids.get(id)?)? {
            Block::Server(b) => Some(b),
            _ => None,
        }
    }

    pub fn wasm_block(&self, id: &str) -> Option<&WasmBlock> {
        match self.blocks.get(*self.wasm_ids.get(id)?)? {
            Block::Wasm(b) => Some(b),
            _ => None,
        }
    }

    pub fn interactive_block(&self, id: &str) -> Option<&InteractiveBlock> {
        match self.blocks.get(*self.interactive_ids.get(id)?)? {
            Block::Interactive(b) => Some(b),
            _ => None,
        }
    }

    pub fn server_blocks(&self) -> impl Iterator<Item = &ServerBlock> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Server(b) => Some(b),
            _ => None,
        })
    }

    pub fn wasm_blocks(&self) -> impl Iterator<Item = &WasmBlock> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Wasm(b) => Some(b),
            _ => None,
        })
    }

    pub fn interactive_blocks(&self) -> impl Iterator<Item = &InteractiveBlock> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Interactive(b) => Some(b),
            _ => None,
        })
    }
}

/// Typed blocks with resolved ids, plus one id index per variant.
#[derive(Debug, Default)]
pub(crate) struct BlockSet {
    pub blocks: Vec<Block>,
    pub server_ids: BTreeMap<String, usize>,
    pub wasm_ids: BTreeMap<String, usize>,
    pub interactive_ids: BTreeMap<String, usize>,
}

impl BlockSet {
    /// Assign ids, auto-link interactive blocks, then validate references.
    ///
    /// Ids are explicit `id=` metadata or `{type}-{index}`, where `index`
    /// counts every collected block in document order from zero. An
    /// interactive block with neither `state=` nor a source binding takes
    /// the nearest preceding server block as its state.
    pub fn build(
        code_blocks: &[CodeBlock],
        sources: &BTreeMap<String, SourceConfig>,
        file: &Path,
    ) -> Result<Self, ParseError> {
        let mut set = BlockSet::default();
        let mut first_seen: HashMap<String, usize> = HashMap::new();
        let mut last_server: Option<String> = None;

        for (index, cb) in code_blocks.iter().enumerate() {
            let id = cb
                .metadata
                .get("id")
                .cloned()
                .unwrap_or_else(|| format!("{}-{}", cb.block_type, index));

            if let Some(first_line) = first_seen.get(&id) {
                return Err(ParseError::reference(
                    file,
                    cb.line,
                    format!("Duplicate block id '{}'", id),
                )
                .with_hint("Give each block a unique id=")
                .with_related(format!("'{}' is first defined at line {}", id, first_line)));
            }
            first_seen.insert(id.clone(), cb.line);

            let position = set.blocks.len();
            let block = match cb.block_type {
                BlockType::Server => {
                    last_server = Some(id.clone());
                    set.server_ids.insert(id.clone(), position);
                    Block::Server(ServerBlock {
                        id,
                        language: cb.language.clone(),
                        content: cb.content.clone(),
                        metadata: cb.metadata.clone(),
                        flags: cb.flags.clone(),
                        line: cb.line,
                    })
                }
                BlockType::Wasm => {
                    set.wasm_ids.insert(id.clone(), position);
                    Block::Wasm(WasmBlock {
                        id,
                        language: cb.language.clone(),
                        default_code: cb.content.clone(),
                        show_run_button: cb.metadata.get("run").map(String::as_str) != Some("false"),
                        metadata: cb.metadata.clone(),
                        flags: cb.flags.clone(),
                        line: cb.line,
                    })
                }
                BlockType::Lvt => {
                    let source_ref = cb.metadata.get("lvt-source").cloned();
                    let state_ref = match (cb.metadata.get("state"), &source_ref) {
                        (Some(state), _) => Some(state.clone()),
                        (None, Some(_)) => None,
                        (None, None) => last_server.clone(),
                    };
                    set.interactive_ids.insert(id.clone(), position);
                    Block::Interactive(InteractiveBlock {
                        id,
                        state_ref,
                        source_ref,
                        content: cb.content.clone(),
                        metadata: cb.metadata.clone(),
                        flags: cb.flags.clone(),
                        line: cb.line,
                    })
                }
            };
            set.blocks.push(block);
        }

        for block in &set.blocks {
            if let Block::Interactive(b) = block {
                set.validate(b, sources, file)?;
            }
        }

        log::debug!(
            "resolved {} blocks ({} server, {} wasm, {} interactive)",
            set.blocks.len(),
            set.server_ids.len(),
            set.wasm_ids.len(),
            set.interactive_ids.len()
        );
        Ok(set)
    }

    fn validate(
        &self,
        block: &InteractiveBlock,
        sources: &BTreeMap<String, SourceConfig>,
        file: &Path,
    ) -> Result<(), ParseError> {
        if let Some(source) = &block.source_ref {
            if !sources.contains_key(source) {
                let hint = match suggest(source, sources.keys().map(String::as_str)) {
                    Suggestion::DidYouMean(name) => format!("Did you mean lvt-source=\"{}\"?", name),
                    Suggestion::Available(names) => {
                        format!("Available sources: {}", names.join(", "))
                    }
                    Suggestion::NoneDefined => {
                        "No sources are defined; declare one under `sources:` in the frontmatter"
                            .to_string()
                    }
                };
                return Err(ParseError::reference(
                    file,
                    block.line,
                    format!("Interactive block references unknown source '{}'", source),
                )
                .with_hint(hint));
            }
        }

        match &block.state_ref {
            None if block.source_ref.is_some() => Ok(()),
            None => Err(ParseError::reference(
                file,
                block.line,
                "Interactive block has no state reference",
            )
            .with_hint(
                "Add a server block with state definition before this interactive block, or specify state=\"block-id\"",
            )),
            Some(state) if self.server_ids.contains_key(state) => Ok(()),
            Some(state) => {
                let hint = match suggest(state, self.server_ids.keys().map(String::as_str)) {
                    Suggestion::DidYouMean(name) => format!("Did you mean state=\"{}\"?", name),
                    Suggestion::Available(names) => {
                        format!("Available server blocks: {}", names.join(", "))
                    }
                    Suggestion::NoneDefined => "No server blocks are defined".to_string(),
                };
                Err(ParseError::reference(
                    file,
                    block.line,
                    format!("Interactive block references unknown state '{}'", state),
                )
                .with_hint(hint))
            }
        }
    }
}
