//! Plain task lists that become interactive blocks.
//!
//! A heading whose section holds nothing but GFM task items is replaced,
//! before classification, by a generated `lvt` block bound to a synthetic
//! markdown source pointing back at that section of the file. The file on
//! disk is never touched here; [`edit`] holds the text operations a runtime
//! uses to write changes back.

pub mod edit;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

use once_cell::sync::Lazy;
use pulldown_cmark::{Event, Parser as CmarkParser, Tag, TagEnd};
use regex::Regex;

use crate::frontmatter::SourceConfig;
use crate::parser::classify::markdown_options;

/// Key prefix of every synthetic source.
pub const AUTO_SOURCE_PREFIX: &str = "_auto_";

static TASK_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[-*+]\s+\[[ xX]\](\s|$)").unwrap());

/// What one line of markdown is, as far as section detection cares.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LineKind {
    Heading {
        level: usize,
        text: String,
        anchor: String,
        explicit: bool,
    },
    Task,
    Blank,
    /// A line of a fenced or indented code block.
    Code,
    Other,
}

/// Classify each `\n`-separated line of `text` from one CommonMark parse,
/// so code, headings and task items have the same boundaries the block
/// classifier sees.
pub(crate) fn classify_lines(text: &str) -> Vec<LineKind> {
    let starts: Vec<usize> = std::iter::once(0)
        .chain(text.match_indices('\n').map(|(at, _)| at + 1))
        .collect();
    let line_of = |offset: usize| starts.partition_point(|start| *start <= offset) - 1;
    let last_line = |range: &std::ops::Range<usize>| {
        line_of(range.end.saturating_sub(1).max(range.start))
    };

    let mut kinds: Vec<LineKind> = text
        .split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                LineKind::Blank
            } else {
                LineKind::Other
            }
        })
        .collect();

    let events: Vec<_> = CmarkParser::new_ext(text, markdown_options())
        .into_offset_iter()
        .collect();
    let mut i = 0;

    while i < events.len() {
        let (ref ev, ref range) = events[i];
        i += 1;

        match ev {
            Event::Start(Tag::CodeBlock(_)) => {
                for kind in &mut kinds[line_of(range.start)..=last_line(range)] {
                    *kind = LineKind::Code;
                }
            }

            Event::Start(Tag::Heading { level, id, .. }) => {
                let mut heading = String::new();
                while i < events.len() {
                    match &events[i].0 {
                        Event::End(TagEnd::Heading(_)) => break,
                        Event::Text(s) | Event::Code(s) => heading.push_str(s),
                        _ => {}
                    }
                    i += 1;
                }

                let line = line_of(range.start);
                // Only a top-level heading opens a section, not one inside
                // a list item or blockquote.
                if !text[starts[line]..range.start].trim().is_empty() {
                    continue;
                }
                let heading = heading.trim().to_string();
                let (anchor, explicit) = match id {
                    Some(id) => (id.to_string(), true),
                    None => (slugify(&heading), false),
                };
                kinds[line] = LineKind::Heading {
                    level: *level as usize,
                    text: heading,
                    anchor,
                    explicit,
                };
                // A setext underline is part of the heading, not task text.
                for kind in &mut kinds[line + 1..=last_line(range).max(line)] {
                    *kind = LineKind::Other;
                }
            }

            Event::TaskListMarker(_) => {
                let line = line_of(range.start);
                let text_line = text[starts[line]..]
                    .split('\n')
                    .next()
                    .unwrap_or_default();
                if TASK_ITEM.is_match(text_line) {
                    kinds[line] = LineKind::Task;
                }
            }

            _ => {}
        }
    }

    kinds
}

/// Heading anchor slug: lower-case, runs of non-alphanumerics become one
/// hyphen, no hyphen at either end.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut gap = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if gap && !slug.is_empty() {
                slug.push('-');
            }
            gap = false;
            slug.push(c);
        } else {
            gap = true;
        }
    }
    slug
}

/// A heading whose section is nothing but task items.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSection {
    pub heading: String,
    pub anchor: String,
    pub level: usize,
    /// 0-based line of the heading.
    pub heading_line: usize,
    /// 0-based line of the first task item.
    pub first_item: usize,
    /// 0-based line after the section (next heading, or end of body).
    pub end_line: usize,
}

/// Find every qualifying task section in `body`.
///
/// Any heading ends the current candidate, so a deeper sub-heading splits a
/// section in two. One non-task, non-blank line disqualifies the whole
/// section.
pub fn detect(body: &str) -> Vec<TaskSection> {
    if !(body.contains("[ ]") || body.contains("[x]") || body.contains("[X]")) {
        return Vec::new();
    }

    let kinds = classify_lines(body);
    let mut sections = Vec::new();
    let mut current: Option<TaskSection> = None;
    let mut mixed = false;

    let mut flush = |current: &mut Option<TaskSection>, mixed: bool, end_line: usize| {
        if let Some(mut section) = current.take() {
            if !mixed && section.first_item < end_line {
                section.end_line = end_line;
                sections.push(section);
            }
        }
    };

    for (index, kind) in kinds.iter().enumerate() {
        match kind {
            LineKind::Heading {
                level,
                text,
                anchor,
                ..
            } => {
                flush(&mut current, mixed, index);
                mixed = false;
                current = Some(TaskSection {
                    heading: text.clone(),
                    anchor: anchor.clone(),
                    level: *level,
                    heading_line: index,
                    // No items seen yet.
                    first_item: usize::MAX,
                    end_line: index + 1,
                });
            }
            LineKind::Task => {
                if let Some(section) = current.as_mut() {
                    section.first_item = section.first_item.min(index);
                }
            }
            LineKind::Blank => {}
            LineKind::Code | LineKind::Other => mixed = true,
        }
    }
    flush(&mut current, mixed, kinds.len());

    sections
}

/// The body after task synthesis.
#[derive(Debug, Clone)]
pub struct Synthesis<'a> {
    pub body: Cow<'a, str>,
    /// Synthetic sources keyed `_auto_{anchor}`. Empty when nothing changed.
    pub sources: BTreeMap<String, SourceConfig>,
    /// For each line of `body`, the body line it came from. `None` when
    /// `body` is the input unchanged.
    pub origins: Option<Vec<usize>>,
}

impl<'a> Synthesis<'a> {
    pub fn unchanged(body: &'a str) -> Self {
        Synthesis {
            body: Cow::Borrowed(body),
            sources: BTreeMap::new(),
            origins: None,
        }
    }
}

/// Replace every task section in `body` with a generated `lvt` block.
///
/// The heading line is kept verbatim; the items below it are replaced. A
/// body with no task section comes back borrowed and unchanged.
pub fn synthesize<'a>(body: &'a str, source_path: &Path) -> Synthesis<'a> {
    let mut sections = detect(body);

    let mut seen = std::collections::HashSet::new();
    sections.retain(|section| {
        if section.anchor.is_empty() {
            log::debug!("task section `{}` has no usable anchor", section.heading);
            return false;
        }
        if !seen.insert(section.anchor.clone()) {
            log::warn!(
                "task section `{}` repeats anchor `{}`; leaving it as plain markdown",
                section.heading,
                section.anchor
            );
            return false;
        }
        true
    });

    if sections.is_empty() {
        return Synthesis::unchanged(body);
    }

    let lines: Vec<&str> = body.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut origins = Vec::with_capacity(lines.len());
    let mut sources = BTreeMap::new();
    let mut next = 0;

    for section in &sections {
        for (index, line) in lines.iter().enumerate().take(section.heading_line).skip(next) {
            out.push(line.to_string());
            origins.push(index);
        }

        let source_name = format!("{}{}", AUTO_SOURCE_PREFIX, section.anchor);

        out.push(lines[section.heading_line].to_string());
        origins.push(section.heading_line);
        out.push(String::new());
        origins.push(section.heading_line);

        out.push("```lvt".to_string());
        origins.push(section.first_item);
        for template_line in task_template(&source_name).lines() {
            out.push(template_line.to_string());
            origins.push(section.first_item);
        }
        out.push("```".to_string());
        origins.push(section.first_item);

        // Keep a blank line before the next heading, or the trailing newline.
        if section.end_line < lines.len() || lines.last().is_some_and(|l| l.is_empty()) {
            out.push(String::new());
            origins.push(section.end_line - 1);
        }

        log::debug!(
            "synthesized `{}` from task section `{}` ({} lines)",
            source_name,
            section.heading,
            section.end_line - section.first_item
        );
        sources.insert(
            source_name,
            SourceConfig::markdown_section(source_path, &section.anchor),
        );
        next = section.end_line;
    }

    for (index, line) in lines.iter().enumerate().skip(next) {
        out.push(line.to_string());
        origins.push(index);
    }

    Synthesis {
        body: Cow::Owned(out.join("\n")),
        sources,
        origins: Some(origins),
    }
}

/// Template for a synthesized task block: one checkbox per item wired to
/// `Toggle`, and a form wired to `Add`.
fn task_template(source_name: &str) -> String {
    format!(
        r#"<div class="livedoc-tasks" lvt-source="{source}">
{{{{range .Data}}}}
<label class="livedoc-task">
  <input type="checkbox" lvt-source="{source}" lvt-click="Toggle" lvt-data-id="{{{{.Id}}}}" {{{{if .Done}}}}checked{{{{end}}}}>
  <span {{{{if .Done}}}}class="livedoc-task-done"{{{{end}}}}>{{{{.Text}}}}</span>
</label>
{{{{end}}}}
<form lvt-source="{source}" lvt-submit="Add" lvt-reset-on:success>
  <input type="text" name="text" placeholder="Add a task" required>
  <button type="submit">Add</button>
</form>
</div>"#,
        source = source_name
    )
}
