use livedoc::tasks::edit::{self, EditError, TaskItem, content_id};

const DOC: &str = "# Title\n\n## Todos\n- [ ] Buy milk\n- [x] Done <!-- id:abc -->\n\n## Other\n- [ ] not me\n";

#[test]
fn content_ids_are_fnv1a() {
    assert_eq!(content_id(""), "811c9dc5");
    assert_eq!(content_id("a"), "e40c292c");
    assert_eq!(content_id("foobar"), "bf9cf968");
}

#[test]
fn reads_items_of_one_section() {
    let items = edit::read_tasks(DOC, "todos").expect("section exists");
    assert_eq!(
        items,
        vec![
            TaskItem {
                id: content_id("Buy milk"),
                text: "Buy milk".to_string(),
                done: false,
                line: 4,
            },
            TaskItem {
                id: "abc".to_string(),
                text: "Done".to_string(),
                done: true,
                line: 5,
            },
        ]
    );
}

#[test]
fn anchor_may_carry_a_hash() {
    assert_eq!(
        edit::read_tasks(DOC, "#todos").expect("section exists").len(),
        2
    );
}

#[test]
fn explicit_anchor_only_matches_its_id() {
    let text = "## Shopping {#groceries}\n- [ ] Eggs\n";
    assert_eq!(edit::read_tasks(text, "#groceries").expect("section exists").len(), 1);
    assert_eq!(
        edit::read_tasks(text, "shopping"),
        Err(EditError::SectionNotFound("shopping".to_string()))
    );
}

#[test]
fn code_under_a_heading_is_never_edited() {
    let text = "## Example\n\n    - [ ] sample\n\n```md\n- [ ] fenced\n```\n";
    assert_eq!(edit::read_tasks(text, "example"), Ok(Vec::new()));
    assert_eq!(
        edit::toggle_task(text, "example", &content_id("sample")),
        Err(EditError::TaskNotFound(content_id("sample")))
    );
}

#[test]
fn missing_section() {
    assert_eq!(
        edit::toggle_task(DOC, "#nowhere", "abc"),
        Err(EditError::SectionNotFound("nowhere".to_string()))
    );
}

#[test]
fn toggle_changes_only_the_marker() {
    let checked = edit::toggle_task(DOC, "todos", &content_id("Buy milk")).expect("toggle");
    assert_eq!(checked, DOC.replacen("- [ ] Buy milk", "- [x] Buy milk", 1));

    let unchecked = edit::toggle_task(DOC, "todos", "abc").expect("toggle");
    assert_eq!(unchecked, DOC.replacen("- [x] Done", "- [ ] Done", 1));
}

#[test]
fn toggle_twice_restores_the_text() {
    let once = edit::toggle_task(DOC, "todos", "abc").expect("toggle");
    let twice = edit::toggle_task(&once, "todos", "abc").expect("toggle");
    assert_eq!(twice, DOC);
}

#[test]
fn toggle_keeps_crlf_and_uppercase_markers_elsewhere() {
    let text = "## Todos\r\n- [X] first\r\n- [ ] second\r\n";
    let out = edit::toggle_task(text, "todos", &content_id("second")).expect("toggle");
    assert_eq!(out, "## Todos\r\n- [X] first\r\n- [x] second\r\n");

    let out = edit::toggle_task(text, "todos", &content_id("first")).expect("toggle");
    assert_eq!(out, "## Todos\r\n- [ ] first\r\n- [ ] second\r\n");
}

#[test]
fn toggle_does_not_reach_into_other_sections() {
    assert_eq!(
        edit::toggle_task(DOC, "todos", &content_id("not me")),
        Err(EditError::TaskNotFound(content_id("not me")))
    );
}

#[test]
fn add_appends_after_the_last_item() {
    let out = edit::add_task(DOC, "todos", "Call mom").expect("add");
    assert_eq!(
        out,
        DOC.replacen(
            "<!-- id:abc -->\n",
            "<!-- id:abc -->\n- [ ] Call mom\n",
            1
        )
    );
}

#[test]
fn add_without_trailing_newline() {
    let out = edit::add_task("## Todos\n- [ ] a", "todos", "b").expect("add");
    assert_eq!(out, "## Todos\n- [ ] a\n- [ ] b");
}

#[test]
fn add_to_an_empty_section() {
    let out = edit::add_task("## Todos\n\n## Next\n", "todos", "first").expect("add");
    assert_eq!(out, "## Todos\n- [ ] first\n\n## Next\n");
}

#[test]
fn add_uses_the_document_line_ending() {
    let out = edit::add_task("## Todos\r\n- [ ] a\r\n", "todos", "b").expect("add");
    assert_eq!(out, "## Todos\r\n- [ ] a\r\n- [ ] b\r\n");
}

#[test]
fn add_rejects_bad_text() {
    assert_eq!(edit::add_task(DOC, "todos", "   "), Err(EditError::InvalidText));
    assert_eq!(edit::add_task(DOC, "todos", "a\nb"), Err(EditError::InvalidText));
}

#[test]
fn round_trip_through_a_compiled_source() {
    let source = "# List\n\n## Todos\n- [ ] Buy milk\n- [x] Walk dog\n";
    let compiled = livedoc::compile(source, "list.md").expect("compile failed");
    let anchor = compiled.page.config.sources["_auto_todos"]
        .anchor
        .clone()
        .expect("synthetic sources carry an anchor");

    let items = edit::read_tasks(source, &anchor).expect("section exists");
    assert_eq!(items.len(), 2);

    let toggled = edit::toggle_task(source, &anchor, &items[0].id).expect("toggle");
    assert_eq!(toggled, source.replacen("- [ ] Buy milk", "- [x] Buy milk", 1));

    // The edited file still compiles to the same block.
    let recompiled = livedoc::compile(&toggled, "list.md").expect("compile failed");
    assert_eq!(recompiled.page.blocks().len(), 1);
    assert_eq!(recompiled.page.blocks()[0].line(), 4);
}
