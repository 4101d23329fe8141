use std::ops::Range;
use std::path::Path;

use once_cell::sync::Lazy;
use pulldown_cmark::{CodeBlockKind, Event, LinkType, Options, Parser as CmarkParser, Tag, TagEnd};
use regex::Regex;

use crate::block::info::{self, InfoString};
use crate::block::{BlockType, Flag, Metadata};
use crate::parser::error::{ErrorKind, ParseError};
use crate::parser::lines::LineMap;

/// `lvt-source="name"` inside an interactive block's template.
static LVT_SOURCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"lvt-source\s*=\s*["']([^"']+)["']"#).unwrap());

pub(crate) type OffsetEvents<'a> = Vec<(Event<'a>, Range<usize>)>;

/// CommonMark plus the GFM extensions authors expect.
pub(crate) fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// A fenced code block that declared a block type.
#[derive(Debug, Clone)]
pub(crate) struct CodeBlock {
    pub block_type: BlockType,
    pub language: String,
    pub flags: Vec<Flag>,
    pub metadata: Metadata,
    pub content: String,
    /// 1-indexed file line of the opening fence.
    pub line: usize,
    /// Index of the block's `Start(CodeBlock)` in the event list.
    pub event_index: usize,
}

pub(crate) struct Classified<'a> {
    /// The parsed body, kept for the HTML rewrite.
    pub events: OffsetEvents<'a>,
    pub blocks: Vec<CodeBlock>,
    /// Body byte ranges the schedule scan skips: code blocks, inline code
    /// spans, link destinations and autolinks.
    pub skip_ranges: Vec<Range<usize>>,
}

/// Parse `body` once and collect its typed fenced blocks in document order.
pub(crate) fn classify<'a>(
    body: &'a str,
    lines: &LineMap,
    file: &Path,
) -> Result<Classified<'a>, ParseError> {
    let parser = CmarkParser::new_ext(body, markdown_options());
    let events: OffsetEvents<'a> = parser.into_offset_iter().collect();

    let mut blocks = Vec::new();
    let mut skip_ranges = Vec::new();
    let mut i = 0;

    while i < events.len() {
        let (ref ev, ref range) = events[i];

        match ev {
            Event::Start(Tag::CodeBlock(kind)) => {
                skip_ranges.push(range.clone());
                let event_index = i;
                let line = lines.line_of(range.start);

                i += 1;
                let content = collect_text_until(&events, &mut i, |e| {
                    matches!(e, TagEnd::CodeBlock)
                });

                // Indented code has no info string and is never a live block.
                let CodeBlockKind::Fenced(info_text) = kind else {
                    continue;
                };

                let info = info::parse(info_text).map_err(|err| {
                    ParseError::new(ErrorKind::UnknownBlockType, file, line, err.to_string())
                        .with_hint("Valid block types are: server, wasm, lvt")
                })?;

                if let Some(block) = into_code_block(info, content, line, event_index) {
                    blocks.push(block);
                }
            }

            Event::Code(_) => {
                skip_ranges.push(range.clone());
                i += 1;
            }

            Event::Start(Tag::Link {
                link_type, dest_url, ..
            })
            | Event::Start(Tag::Image {
                link_type, dest_url, ..
            }) => {
                match link_type {
                    LinkType::Autolink | LinkType::Email => skip_ranges.push(range.clone()),
                    LinkType::Inline if !dest_url.is_empty() => {
                        if let Some(at) = body[range.clone()].rfind(&**dest_url) {
                            let start = range.start + at;
                            skip_ranges.push(start..start + dest_url.len());
                        }
                    }
                    _ => {}
                }
                i += 1;
            }

            _ => {
                i += 1;
            }
        }
    }

    log::debug!(
        "classified {} live blocks, {} skipped ranges",
        blocks.len(),
        skip_ranges.len()
    );

    Ok(Classified {
        events,
        blocks,
        skip_ranges,
    })
}

fn into_code_block(
    info: InfoString,
    content: String,
    line: usize,
    event_index: usize,
) -> Option<CodeBlock> {
    let block_type = info.block_type?;
    let mut metadata = info.metadata;

    if block_type == BlockType::Lvt && !metadata.contains_key("lvt-source") {
        if let Some(caps) = LVT_SOURCE.captures(&content) {
            metadata.insert("lvt-source".to_string(), caps[1].to_string());
        }
    }

    Some(CodeBlock {
        block_type,
        language: info.language,
        flags: info.flags,
        metadata,
        content,
        line,
        event_index,
    })
}

/// Collect all text content until a matching End tag.
fn collect_text_until(
    events: &[(Event<'_>, Range<usize>)],
    i: &mut usize,
    is_end: impl Fn(&TagEnd) -> bool,
) -> String {
    let mut text = String::new();
    while *i < events.len() {
        let (ref ev, _) = events[*i];
        match ev {
            Event::End(tag_end) if is_end(tag_end) => {
                *i += 1;
                break;
            }
            Event::Text(s) => {
                text.push_str(s);
                *i += 1;
            }
            _ => {
                *i += 1;
            }
        }
    }
    text
}
