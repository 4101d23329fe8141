//! Reading and rewriting the task items of one anchored section.
//!
//! Every operation returns new text that differs from the input only where
//! the change demands it: a toggle rewrites the one marker character, an add
//! inserts one line. Headings and all other bytes are left as they were.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::tasks::{LineKind, classify_lines};

static TASK_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[-*+]\s+\[([ xX])\](?:\s+(.*?))?(?:\s*<!--\s*id:(\w+)\s*-->)?\s*$").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskItem {
    /// Explicit `<!-- id:... -->` comment, or the text's content id.
    pub id: String,
    pub text: String,
    pub done: bool,
    /// 1-indexed line within the text.
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("section `{0}` not found")]
    SectionNotFound(String),
    #[error("task `{0}` not found in section")]
    TaskNotFound(String),
    #[error("task text must be a single non-empty line")]
    InvalidText,
}

/// Stable id for an item without an explicit one: FNV-1a (32-bit) of its
/// text, as eight hex digits.
pub fn content_id(text: &str) -> String {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in text.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    format!("{:08x}", hash)
}

/// A text split into lines, each with its starting byte offset.
struct Lines<'a> {
    lines: Vec<&'a str>,
    offsets: Vec<usize>,
    kinds: Vec<LineKind>,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        let lines: Vec<&str> = text.split_inclusive('\n').collect();
        let mut offsets = Vec::with_capacity(lines.len());
        let mut offset = 0;
        for line in &lines {
            offsets.push(offset);
            offset += line.len();
        }
        let mut kinds = classify_lines(text);
        kinds.truncate(lines.len());
        Lines {
            lines,
            offsets,
            kinds,
        }
    }

    /// Heading line and exclusive end of the section named by `anchor`.
    ///
    /// Headings with an explicit `{#id}` only match that id. The section
    /// ends at the next heading of any level, the same boundary task
    /// detection uses.
    fn section(&self, anchor: &str) -> Result<(usize, usize), EditError> {
        let anchor = anchor.strip_prefix('#').unwrap_or(anchor);
        let find = |want_explicit: bool| {
            self.kinds.iter().position(|kind| {
                matches!(kind, LineKind::Heading { anchor: a, explicit, .. }
                    if a == anchor && *explicit == want_explicit)
            })
        };
        let heading = find(true)
            .or_else(|| find(false))
            .ok_or_else(|| EditError::SectionNotFound(anchor.to_string()))?;
        let end = self.kinds[heading + 1..]
            .iter()
            .position(|kind| matches!(kind, LineKind::Heading { .. }))
            .map_or(self.kinds.len(), |p| heading + 1 + p);
        Ok((heading, end))
    }

    fn items(&self, heading: usize, end: usize) -> impl Iterator<Item = (usize, TaskItem, regex::Captures<'a>)> + '_ {
        (heading + 1..end)
            .filter(|index| self.kinds[*index] == LineKind::Task)
            .filter_map(|index| {
                let line = self.lines[index].trim_end_matches(['\n', '\r']);
                let caps = TASK_LINE.captures(line)?;
                let text = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();
                let id = caps
                    .get(3)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| content_id(&text));
                let item = TaskItem {
                    id,
                    done: &caps[1] != " ",
                    text,
                    line: index + 1,
                };
                Some((index, item, caps))
            })
    }
}

/// List the task items under `anchor`.
pub fn read_tasks(text: &str, anchor: &str) -> Result<Vec<TaskItem>, EditError> {
    let lines = Lines::new(text);
    let (heading, end) = lines.section(anchor)?;
    Ok(lines.items(heading, end).map(|(_, item, _)| item).collect())
}

/// Flip the checkbox of the item with `id`, touching nothing else.
pub fn toggle_task(text: &str, anchor: &str, id: &str) -> Result<String, EditError> {
    let lines = Lines::new(text);
    let (heading, end) = lines.section(anchor)?;

    let (index, item, caps) = lines
        .items(heading, end)
        .find(|(_, item, _)| item.id == id)
        .ok_or_else(|| EditError::TaskNotFound(id.to_string()))?;

    let marker = caps.get(1).ok_or_else(|| EditError::TaskNotFound(id.to_string()))?;
    let at = lines.offsets[index] + marker.start();
    let replacement = if item.done { " " } else { "x" };

    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..at]);
    out.push_str(replacement);
    out.push_str(&text[at + marker.len()..]);
    Ok(out)
}

/// Append an unchecked item after the last non-blank line of the section.
pub fn add_task(text: &str, anchor: &str, item_text: &str) -> Result<String, EditError> {
    let item_text = item_text.trim();
    if item_text.is_empty() || item_text.contains(['\n', '\r']) {
        return Err(EditError::InvalidText);
    }

    let lines = Lines::new(text);
    let (heading, end) = lines.section(anchor)?;

    let last = (heading..end)
        .rev()
        .find(|index| lines.kinds[*index] != LineKind::Blank)
        .unwrap_or(heading);
    let newline = if lines.lines[heading].ends_with("\r\n") {
        "\r\n"
    } else {
        "\n"
    };

    let last_line = lines.lines[last];
    let at = lines.offsets[last] + last_line.len();
    let mut out = String::with_capacity(text.len() + item_text.len() + 8);
    out.push_str(&text[..at]);
    if !last_line.ends_with('\n') {
        out.push_str(newline);
    }
    out.push_str("- [ ] ");
    out.push_str(item_text);
    if last_line.ends_with('\n') {
        out.push_str(newline);
    }
    out.push_str(&text[at..]);
    Ok(out)
}
