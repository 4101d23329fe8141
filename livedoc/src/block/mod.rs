pub mod info;
pub mod reference;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// `key=value` pairs from a fenced block's info string.
pub type Metadata = BTreeMap<String, String>;

/// The three kinds of live block a fenced code block can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Server,
    Wasm,
    Lvt,
}

impl BlockType {
    pub const ALL: [BlockType; 3] = [BlockType::Server, BlockType::Wasm, BlockType::Lvt];

    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "server" => Some(BlockType::Server),
            "wasm" => Some(BlockType::Wasm),
            "lvt" => Some(BlockType::Lvt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Server => "server",
            BlockType::Wasm => "wasm",
            BlockType::Lvt => "lvt",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Flag {
    Readonly,
    Editable,
    Interactive,
}

impl Flag {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "readonly" => Some(Flag::Readonly),
            "editable" => Some(Flag::Editable),
            "interactive" => Some(Flag::Interactive),
            _ => None,
        }
    }
}

/// Trusted author code that supplies state to interactive blocks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerBlock {
    pub id: String,
    pub language: String,
    pub content: String,
    pub metadata: Metadata,
    pub flags: Vec<Flag>,
    pub line: usize,
}

/// Untrusted student code, edited and run in the browser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WasmBlock {
    pub id: String,
    pub language: String,
    pub default_code: String,
    pub show_run_button: bool,
    pub metadata: Metadata,
    pub flags: Vec<Flag>,
    pub line: usize,
}

/// A live UI fragment.
///
/// State-bound blocks name a [`ServerBlock`] in `state_ref`; source-bound
/// blocks name a data source in `source_ref` and need no server block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractiveBlock {
    pub id: String,
    pub state_ref: Option<String>,
    pub source_ref: Option<String>,
    pub content: String,
    pub metadata: Metadata,
    pub flags: Vec<Flag>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Server(ServerBlock),
    Wasm(WasmBlock),
    #[serde(rename = "lvt")]
    Interactive(InteractiveBlock),
}

impl Block {
    pub fn id(&self) -> &str {
        match self {
            Block::Server(b) => &b.id,
            Block::Wasm(b) => &b.id,
            Block::Interactive(b) => &b.id,
        }
    }

    pub fn block_type(&self) -> BlockType {
        match self {
            Block::Server(_) => BlockType::Server,
            Block::Wasm(_) => BlockType::Wasm,
            Block::Interactive(_) => BlockType::Lvt,
        }
    }

    pub fn language(&self) -> &str {
        match self {
            Block::Server(b) => &b.language,
            Block::Wasm(b) => &b.language,
            Block::Interactive(_) => "lvt",
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Block::Server(b) => b.line,
            Block::Wasm(b) => b.line,
            Block::Interactive(b) => b.line,
        }
    }

    pub fn metadata(&self) -> &Metadata {
        match self {
            Block::Server(b) => &b.metadata,
            Block::Wasm(b) => &b.metadata,
            Block::Interactive(b) => &b.metadata,
        }
    }

    pub fn flags(&self) -> &[Flag] {
        match self {
            Block::Server(b) => &b.flags,
            Block::Wasm(b) => &b.flags,
            Block::Interactive(b) => &b.flags,
        }
    }

    /// Server code is shown read-only unless flagged otherwise.
    pub fn is_readonly(&self) -> bool {
        let flags = self.flags();
        flags.contains(&Flag::Readonly)
            || (!flags.contains(&Flag::Editable) && matches!(self, Block::Server(_)))
    }

    /// Student code is editable unless flagged otherwise.
    pub fn is_editable(&self) -> bool {
        let flags = self.flags();
        flags.contains(&Flag::Editable)
            || (!flags.contains(&Flag::Readonly) && matches!(self, Block::Wasm(_)))
    }
}
