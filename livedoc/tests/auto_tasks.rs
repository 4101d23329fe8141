use std::borrow::Cow;
use std::path::Path;

use livedoc::block::Block;
use livedoc::frontmatter::SourceType;
use livedoc::tasks::{self, TaskSection};

const TODOS: &str = "## Todos\n- [ ] Buy milk\n- [x] Done\n";

fn anchors(body: &str) -> Vec<String> {
    tasks::detect(body).into_iter().map(|s| s.anchor).collect()
}

#[test]
fn detects_a_pure_task_section() {
    assert_eq!(
        tasks::detect(TODOS),
        vec![TaskSection {
            heading: "Todos".to_string(),
            anchor: "todos".to_string(),
            level: 2,
            heading_line: 0,
            first_item: 1,
            end_line: 4,
        }]
    );
}

#[test]
fn blank_lines_are_allowed_between_items() {
    assert_eq!(anchors("## Todos\n\n- [ ] a\n\n* [X] b\n+ [ ] c\n"), vec!["todos"]);
}

#[test]
fn prose_disqualifies_a_section() {
    assert!(anchors("## Todos\n- [ ] a\nSome prose.\n").is_empty());
    assert!(anchors("## Todos\nIntro first.\n- [ ] a\n").is_empty());
}

#[test]
fn plain_list_items_disqualify_a_section() {
    assert!(anchors("## Todos\n- [ ] a\n- not a task\n").is_empty());
}

#[test]
fn tasks_inside_a_fence_do_not_count() {
    assert!(anchors("## Notes\n```\n- [ ] not a task\n```\n").is_empty());
    assert!(anchors("## Notes\n~~~md\n- [ ] not a task\n~~~\n").is_empty());
}

#[test]
fn indented_code_is_not_a_task_section() {
    assert!(anchors("## Example\n\n    - [ ] not a task\n    - [x] nor this\n").is_empty());

    let compiled = livedoc::compile("## Example\n\n    - [ ] not a task\n", "page.md")
        .expect("compile failed");
    assert!(compiled.page.config.sources.is_empty());
    assert!(compiled.page.static_html.contains("<pre><code>- [ ] not a task\n</code></pre>"));
}

#[test]
fn inline_code_at_line_start_does_not_open_a_fence() {
    let body = "```code``` is inline.\n\n## Todos\n- [ ] a\n";
    assert_eq!(anchors(body), vec!["todos"]);

    let compiled = livedoc::compile(body, "page.md").expect("compile failed");
    let keys: Vec<&str> = compiled.page.config.sources.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["_auto_todos"]);
}

#[test]
fn headings_inside_containers_do_not_open_sections() {
    assert!(anchors("> ## Quoted\n- [ ] a\n").is_empty());
}

#[test]
fn heading_without_tasks_is_skipped() {
    assert_eq!(anchors("## Empty\n\n## Todos\n- [ ] x\n"), vec!["todos"]);
}

#[test]
fn any_heading_ends_a_section() {
    assert_eq!(
        anchors("## Chores\n- [ ] one\n### Garden\n- [ ] two\n"),
        vec!["chores", "garden"]
    );
}

#[test]
fn tasks_before_any_heading_are_ignored() {
    assert!(anchors("- [ ] orphan\n- [ ] task\n").is_empty());
}

#[test]
fn explicit_anchor() {
    let sections = tasks::detect("## Shopping List {#groceries}\n- [ ] Eggs\n");
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].heading, "Shopping List");
    assert_eq!(sections[0].anchor, "groceries");
}

#[test]
fn slugs() {
    assert_eq!(tasks::slugify("Hello, World!"), "hello-world");
    assert_eq!(tasks::slugify("  --Edge--  "), "edge");
    assert_eq!(tasks::slugify("C# Tips"), "c-tips");
    assert_eq!(tasks::slugify("Week 1: Setup"), "week-1-setup");
    assert_eq!(tasks::slugify("!!!"), "");
}

#[test]
fn detection_is_repeatable() {
    let body = "# Page\n\n## Todos\n- [ ] a\n\n## Later\n- [x] b\n";
    assert_eq!(tasks::detect(body), tasks::detect(body));
}

#[test]
fn synthesizes_a_bound_block_and_source() {
    let synthesis = tasks::synthesize(TODOS, Path::new("/docs/page.md"));

    assert!(synthesis.body.starts_with("## Todos\n"));
    assert!(synthesis.body.contains("```lvt\n"));
    assert!(synthesis.body.contains("lvt-source=\"_auto_todos\""));
    assert!(!synthesis.body.contains("- [ ]"));
    assert!(synthesis.body.ends_with("```\n"));

    let keys: Vec<&str> = synthesis.sources.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["_auto_todos"]);
    let source = &synthesis.sources["_auto_todos"];
    assert_eq!(source.source_type, SourceType::Markdown);
    assert_eq!(source.anchor.as_deref(), Some("#todos"));
    assert_eq!(source.file.as_deref(), Some("/docs/page.md"));
    assert!(!source.is_readonly());
}

#[test]
fn body_without_sections_is_borrowed() {
    let body = "# Notes\n\n- a plain list\n- [ ] then a task\n";
    let synthesis = tasks::synthesize(body, Path::new("notes.md"));
    assert!(matches!(synthesis.body, Cow::Borrowed(_)));
    assert_eq!(synthesis.body, body);
    assert!(synthesis.sources.is_empty());
    assert!(synthesis.origins.is_none());
}

#[test]
fn synthesis_is_idempotent() {
    let first = tasks::synthesize(TODOS, Path::new("page.md"));
    let second = tasks::synthesize(&first.body, Path::new("page.md"));
    assert!(matches!(second.body, Cow::Borrowed(_)));
    assert_eq!(second.body, first.body);
    assert!(second.sources.is_empty());
}

#[test]
fn origins_cover_every_output_line() {
    let body = "# Page\n\n## Todos\n- [ ] a\n- [ ] b\n\n## After\nText.\n";
    let synthesis = tasks::synthesize(body, Path::new("page.md"));
    let origins = synthesis.origins.expect("body was rewritten");
    assert_eq!(origins.len(), synthesis.body.split('\n').count());
    // Lines after the section map back to where they were.
    let after = synthesis
        .body
        .split('\n')
        .position(|line| line == "## After")
        .expect("heading kept");
    assert_eq!(origins[after], 6);
}

#[test]
fn repeated_anchor_keeps_only_the_first_section() {
    let body = "## Todos\n- [ ] a\n\n## Todos\n- [ ] b\n";
    let synthesis = tasks::synthesize(body, Path::new("page.md"));
    assert_eq!(synthesis.sources.len(), 1);
    assert!(synthesis.body.contains("- [ ] b"));
    assert!(!synthesis.body.contains("- [ ] a"));
}

#[test]
fn compiled_task_block_binds_to_its_source() {
    let compiled = livedoc::compile("# List\n\n## Todos\n- [ ] Buy milk\n- [x] Walk dog\n", "/docs/list.md")
        .expect("compile failed");
    let page = &compiled.page;

    let blocks: Vec<&Block> = page.blocks().iter().collect();
    assert_eq!(blocks.len(), 1);
    let Block::Interactive(block) = blocks[0] else {
        panic!("expected an interactive block");
    };
    assert_eq!(block.source_ref.as_deref(), Some("_auto_todos"));
    assert_eq!(block.state_ref, None);
    assert_eq!(block.line, 4);
    assert!(page.config.sources.contains_key("_auto_todos"));
}

#[test]
fn lines_after_a_synthesized_section_stay_true() {
    let source = "## Todos\n- [ ] a\n- [ ] b\n\n## Code\n\n```go server\ntype S struct{}\n```\n";
    let compiled = livedoc::compile(source, "page.md").expect("compile failed");
    let lines: Vec<(&str, usize)> = compiled
        .page
        .blocks()
        .iter()
        .map(|b| (b.id(), b.line()))
        .collect();
    assert_eq!(lines, vec![("lvt-0", 2), ("server-1", 7)]);
}

#[test]
fn author_declared_source_wins() {
    let source = "---\nsources:\n  _auto_todos:\n    type: json\n    file: todos.json\n---\n## Todos\n- [ ] a\n";
    let compiled = livedoc::compile(source, "page.md").expect("compile failed");
    let declared = &compiled.page.config.sources["_auto_todos"];
    assert_eq!(declared.source_type, SourceType::Json);
    assert_eq!(declared.file.as_deref(), Some("todos.json"));
}

#[test]
fn auto_tasks_can_be_switched_off() {
    let options = livedoc::CompileOptions {
        auto_tasks: false,
        ..Default::default()
    };
    let compiled = livedoc::compile_with(TODOS, "page.md", options).expect("compile failed");
    assert!(compiled.page.blocks().is_empty());
    assert!(compiled.page.config.sources.is_empty());
    assert!(compiled.page.static_html.contains("type=\"checkbox\""));
}
