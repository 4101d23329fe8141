//! Fenced block info strings: `<language> [server|wasm|lvt] [flags] [key=value ...]`.

use thiserror::Error;

use crate::block::{BlockType, Flag, Metadata};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfoString {
    pub language: String,
    /// `None` for ordinary code blocks.
    pub block_type: Option<BlockType>,
    pub flags: Vec<Flag>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown block type `{0}`")]
pub struct UnknownBlockType(pub String);

/// Tokenize an info string on whitespace.
///
/// Unrecognized bare words are ignored. `type=<name>` selects the block
/// type explicitly and is the only way to name a type that does not exist.
pub fn parse(info: &str) -> Result<InfoString, UnknownBlockType> {
    let mut words = info.split_whitespace();
    let Some(language) = words.next() else {
        return Ok(InfoString::default());
    };

    let mut parsed = InfoString {
        language: language.to_string(),
        block_type: BlockType::from_keyword(language).filter(|t| *t == BlockType::Lvt),
        ..InfoString::default()
    };

    for word in words {
        if let Some((key, value)) = word.split_once('=') {
            if key.is_empty() {
                continue;
            }
            let value = value.trim_matches(|c| c == '"' || c == '\'');
            if key == "type" {
                let block_type = BlockType::from_keyword(value)
                    .ok_or_else(|| UnknownBlockType(value.to_string()))?;
                parsed.block_type = Some(block_type);
                continue;
            }
            parsed.metadata.insert(key.to_string(), value.to_string());
        } else if let Some(block_type) = BlockType::from_keyword(word) {
            parsed.block_type = Some(block_type);
        } else if let Some(flag) = Flag::from_keyword(word) {
            if !parsed.flags.contains(&flag) {
                parsed.flags.push(flag);
            }
        }
    }

    Ok(parsed)
}
