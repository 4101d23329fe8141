use livedoc::frontmatter::{self, FrontmatterError, PersistMode, SourceType};
use livedoc::parser::ErrorKind;

#[test]
fn no_frontmatter_uses_defaults() {
    let extracted = frontmatter::extract("# Hello\n\nSome text.\n").expect("extract failed");
    let fm = &extracted.frontmatter;
    assert_eq!(fm.page_type, "tutorial");
    assert_eq!(fm.persist, PersistMode::LocalStorage);
    assert_eq!(fm.steps, 0);
    assert!(fm.title.is_none());
    assert!(fm.sidebar.is_none());
    assert!(fm.sources.is_empty());
    assert_eq!(extracted.body, "# Hello\n\nSome text.\n");
    assert_eq!(extracted.body_line, 1);
}

#[test]
fn header_fields() {
    let source = "---\ntitle: Intro\ntype: guide\npersist: server\nsteps: 3\nsidebar: false\n---\n# Body\n";
    let extracted = frontmatter::extract(source).expect("extract failed");
    let fm = &extracted.frontmatter;
    assert_eq!(fm.title.as_deref(), Some("Intro"));
    assert_eq!(fm.page_type, "guide");
    assert_eq!(fm.persist, PersistMode::Server);
    assert_eq!(fm.steps, 3);
    assert_eq!(fm.sidebar, Some(false));
    assert_eq!(extracted.body, "# Body\n");
    assert_eq!(extracted.body_line, 8);
}

#[test]
fn omitted_keys_take_defaults() {
    let extracted = frontmatter::extract("---\ntitle: Only a title\n---\nbody\n").expect("extract failed");
    assert_eq!(extracted.frontmatter.page_type, "tutorial");
    assert_eq!(extracted.frontmatter.persist, PersistMode::LocalStorage);
    assert_eq!(extracted.body, "body\n");
}

#[test]
fn empty_header() {
    let extracted = frontmatter::extract("---\n---\nbody").expect("extract failed");
    assert_eq!(extracted.frontmatter.page_type, "tutorial");
    assert_eq!(extracted.body, "body");
    assert_eq!(extracted.body_line, 3);
}

#[test]
fn sources() {
    let source = r##"---
sources:
  todos:
    type: markdown
    file: ./todos.md
    anchor: "#todos"
    readonly: false
  api:
    type: rest
    from: https://example.com/api
  report:
    type: exec
    cmd: ./report.sh
    manual: true
---
"##;
    let extracted = frontmatter::extract(source).expect("extract failed");
    let sources = &extracted.frontmatter.sources;
    assert_eq!(sources.len(), 3);

    let todos = &sources["todos"];
    assert_eq!(todos.source_type, SourceType::Markdown);
    assert_eq!(todos.anchor.as_deref(), Some("#todos"));
    assert!(!todos.is_readonly());

    let api = &sources["api"];
    assert_eq!(api.source_type, SourceType::Rest);
    assert_eq!(api.url.as_deref(), Some("https://example.com/api"));
    assert!(api.is_readonly());

    let report = &sources["report"];
    assert_eq!(report.cmd.as_deref(), Some("./report.sh"));
    assert!(report.manual);
}

#[test]
fn crlf_and_bom() {
    let source = "\u{feff}---\r\ntitle: Windows\r\n---\r\nbody\r\n";
    let extracted = frontmatter::extract(source).expect("extract failed");
    assert_eq!(extracted.frontmatter.title.as_deref(), Some("Windows"));
    assert_eq!(extracted.body, "body\r\n");
    assert_eq!(extracted.body_line, 4);
}

#[test]
fn dashes_later_in_the_document_are_not_frontmatter() {
    let source = "# Title\n\n---\n\nmore\n";
    let extracted = frontmatter::extract(source).expect("extract failed");
    assert_eq!(extracted.body, source);
}

#[test]
fn unclosed_header() {
    let err = frontmatter::extract("---\ntitle: Broken\n# Heading\n").unwrap_err();
    assert!(matches!(err, FrontmatterError::Unclosed));
}

#[test]
fn malformed_yaml_reports_a_file_line() {
    let err = frontmatter::extract("---\ntitle: ok\nsteps: [1, 2\n---\nbody\n").unwrap_err();
    match err {
        FrontmatterError::Yaml { line, .. } => assert!((2..=5).contains(&line), "line {}", line),
        other => panic!("expected a YAML error, got {:?}", other),
    }
}

#[test]
fn unknown_source_types_are_kept() {
    let extracted =
        frontmatter::extract("---\nsources:\n  feed:\n    type: rss\n    url: https://x.io/feed\n---\n")
            .expect("frontmatter parses");
    let feed = &extracted.frontmatter.sources["feed"];
    assert_eq!(feed.source_type, SourceType::Other("rss".to_string()));
    assert_eq!(feed.url.as_deref(), Some("https://x.io/feed"));

    let compiled = livedoc::compile(
        "---\nsources:\n  feed:\n    type: rss\n---\n```lvt\n<p lvt-source=\"feed\"></p>\n```\n",
        "page.md",
    )
    .expect("compile failed");
    assert_eq!(compiled.page.blocks().len(), 1);
}

#[test]
fn unknown_persist_mode_is_rejected() {
    let err = frontmatter::extract("---\npersist: cloud\n---\n").unwrap_err();
    assert!(matches!(err, FrontmatterError::Yaml { .. }));
}

#[test]
fn compile_reports_structural_errors() {
    let err = livedoc::compile("---\ntitle: x\n", "page.md").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Structural);
    assert_eq!(err.line, 1);
    assert!(err.hint.is_some());
}

#[test]
fn page_config_follows_frontmatter() {
    let compiled = livedoc::compile(
        "---\ntitle: Steps\nsteps: 2\npersist: none\nsidebar: true\n---\n# Step one\n",
        "lessons/steps.md",
    )
    .expect("compile failed");
    let page = &compiled.page;
    assert_eq!(page.id, "steps.md");
    assert_eq!(page.title.as_deref(), Some("Steps"));
    assert!(page.config.multi_step);
    assert_eq!(page.config.step_count, 2);
    assert_eq!(page.config.persist, PersistMode::None);
    assert_eq!(page.config.sidebar, Some(true));
}

#[test]
fn page_without_frontmatter_has_defaults() {
    let compiled = livedoc::compile("# Plain\n", "plain.md").expect("compile failed");
    let page = &compiled.page;
    assert_eq!(page.page_type, "tutorial");
    assert_eq!(page.config.persist, PersistMode::LocalStorage);
    assert!(!page.config.multi_step);
    assert!(page.blocks().is_empty());
}
