use std::collections::HashSet;
use std::path::Path;

use pulldown_cmark::{CowStr, Event, Tag, TagEnd, html};

use crate::block::Block;
use crate::parser::classify::{CodeBlock, OffsetEvents};
use crate::parser::error::{ErrorKind, ParseError};
use crate::tasks::slugify;

/// Render the classified body to HTML with an attachment point per block.
///
/// Interactive blocks are replaced by a placeholder container; server and
/// wasm blocks keep their code, wrapped in a container. `collected` and
/// `blocks` are parallel and in document order.
pub(crate) fn render_html(
    events: OffsetEvents<'_>,
    collected: &[CodeBlock],
    blocks: &[Block],
    heading_ids: bool,
    file: &Path,
) -> Result<String, ParseError> {
    let mut events: Vec<Event<'_>> = events.into_iter().map(|(ev, _)| ev).collect();
    if heading_ids {
        assign_heading_ids(&mut events);
    }

    let mut pending = collected.iter().zip(blocks).peekable();
    let mut out: Vec<Event<'_>> = Vec::with_capacity(events.len() + 2 * blocks.len());
    let mut rewritten = 0;
    let mut iter = events.into_iter().enumerate();

    while let Some((index, event)) = iter.next() {
        let Some((cb, block)) = pending.next_if(|(cb, _)| cb.event_index == index) else {
            out.push(event);
            continue;
        };
        if !matches!(event, Event::Start(Tag::CodeBlock(_))) {
            return Err(ParseError::new(
                ErrorKind::Render,
                file,
                cb.line,
                format!("block '{}' is not attached to a code block", block.id()),
            ));
        }
        rewritten += 1;

        match block {
            Block::Interactive(_) => {
                for (_, ev) in iter.by_ref() {
                    if matches!(ev, Event::End(TagEnd::CodeBlock)) {
                        break;
                    }
                }
                out.push(Event::Html(CowStr::from(placeholder(block))));
            }
            Block::Server(_) | Block::Wasm(_) => {
                out.push(Event::Html(CowStr::from(wrapper_open(block))));
                out.push(event);
                for (_, ev) in iter.by_ref() {
                    let end = matches!(ev, Event::End(TagEnd::CodeBlock));
                    out.push(ev);
                    if end {
                        break;
                    }
                }
                out.push(Event::Html(CowStr::Borrowed("</div>\n")));
            }
        }
    }

    if rewritten != blocks.len() || collected.len() != blocks.len() {
        let line = pending.peek().map_or(1, |(cb, _)| cb.line);
        return Err(ParseError::new(
            ErrorKind::Render,
            file,
            line,
            format!(
                "rewrote {} of {} blocks while rendering HTML",
                rewritten,
                blocks.len()
            ),
        ));
    }

    let mut html_out = String::new();
    html::push_html(&mut html_out, out.into_iter());
    Ok(html_out)
}

/// Give every heading without an `{#id}` a slug id, unique within the page.
fn assign_heading_ids(events: &mut [Event<'_>]) {
    let mut used: HashSet<String> = events
        .iter()
        .filter_map(|ev| match ev {
            Event::Start(Tag::Heading { id: Some(id), .. }) => Some(id.to_string()),
            _ => None,
        })
        .collect();

    let mut i = 0;
    while i < events.len() {
        let Event::Start(Tag::Heading { id: None, .. }) = &events[i] else {
            i += 1;
            continue;
        };

        let start = i;
        let mut text = String::new();
        i += 1;
        while i < events.len() {
            match &events[i] {
                Event::End(TagEnd::Heading(_)) => break,
                Event::Text(s) | Event::Code(s) => text.push_str(s),
                _ => {}
            }
            i += 1;
        }

        let base = slugify(&text);
        if !base.is_empty() {
            let mut slug = base.clone();
            let mut n = 0;
            while used.contains(&slug) {
                n += 1;
                slug = format!("{}-{}", base, n);
            }
            used.insert(slug.clone());
            if let Event::Start(Tag::Heading { id, .. }) = &mut events[start] {
                *id = Some(CowStr::from(slug));
            }
        }
    }
}

fn placeholder(block: &Block) -> String {
    let mut attrs = common_attrs(block);
    if let Block::Interactive(b) = block {
        if let Some(state) = &b.state_ref {
            attrs.push_str(&format!(" data-state-ref=\"{}\"", escape_attr(state)));
        }
        if let Some(source) = &b.source_ref {
            attrs.push_str(&format!(" data-source-ref=\"{}\"", escape_attr(source)));
        }
    }
    format!(
        "<div class=\"livedoc-interactive-block\"{} data-interactive-content>\
         <div class=\"loading\">Connecting...</div></div>\n",
        attrs
    )
}

fn wrapper_open(block: &Block) -> String {
    let mut attrs = common_attrs(block);
    attrs.push_str(&format!(
        " data-readonly=\"{}\" data-editable=\"{}\"",
        block.is_readonly(),
        block.is_editable()
    ));
    if let Block::Wasm(b) = block {
        attrs.push_str(&format!(" data-show-run=\"{}\"", b.show_run_button));
    }
    format!(
        "<div class=\"livedoc-code-block livedoc-{}-block\"{}>\n",
        block.block_type(),
        attrs
    )
}

fn common_attrs(block: &Block) -> String {
    format!(
        " data-livedoc-block data-block-id=\"{}\" data-block-type=\"{}\" data-language=\"{}\"",
        escape_attr(block.id()),
        block.block_type(),
        escape_attr(block.language())
    )
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
