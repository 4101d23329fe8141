use livedoc::CompileOptions;

fn html(source: &str) -> String {
    livedoc::compile(source, "page.md")
        .expect("compile failed")
        .page
        .static_html
}

const COUNTER: &str = "```go server id=counter\ntype S struct{ N int }\n```\n\n```lvt\n<button lvt-click=\"Inc\">{{.N}}</button>\n```\n";

#[test]
fn server_code_is_wrapped_and_kept() {
    let html = html(COUNTER);
    assert!(html.contains(
        "<div class=\"livedoc-code-block livedoc-server-block\" data-livedoc-block \
         data-block-id=\"counter\" data-block-type=\"server\" data-language=\"go\" \
         data-readonly=\"true\" data-editable=\"false\">"
    ));
    assert!(html.contains("<code class=\"language-go\">type S struct{ N int }\n</code>"));
}

#[test]
fn interactive_code_becomes_a_placeholder() {
    let html = html(COUNTER);
    assert!(html.contains(
        "<div class=\"livedoc-interactive-block\" data-livedoc-block data-block-id=\"lvt-1\" \
         data-block-type=\"lvt\" data-language=\"lvt\" data-state-ref=\"counter\" \
         data-interactive-content><div class=\"loading\">Connecting...</div></div>"
    ));
    assert!(!html.contains("lvt-click"));
    assert!(!html.contains("&lt;button"));
}

#[test]
fn identical_blocks_each_get_a_container() {
    let source = "```go server\ntype S struct{}\n```\n\n```go server\ntype S struct{}\n```\n\n```lvt\n<p>same</p>\n```\n\n```lvt\n<p>same</p>\n```\n";
    let compiled = livedoc::compile(source, "page.md").expect("compile failed");
    let html = &compiled.page.static_html;
    assert_eq!(html.matches("data-livedoc-block").count(), compiled.page.blocks().len());
    for id in ["server-0", "server-1", "lvt-2", "lvt-3"] {
        assert_eq!(
            html.matches(&format!("data-block-id=\"{}\"", id)).count(),
            1,
            "{}",
            id
        );
    }
    // Both interactive blocks link to the second server block.
    assert_eq!(html.matches("data-state-ref=\"server-1\"").count(), 2);
}

#[test]
fn wasm_blocks_carry_run_and_edit_flags() {
    let html = html("```go wasm run=false\nfmt.Println(1)\n```\n");
    assert!(html.contains("livedoc-wasm-block"));
    assert!(html.contains("data-readonly=\"false\" data-editable=\"true\" data-show-run=\"false\""));
}

#[test]
fn ordinary_code_is_untouched() {
    assert_eq!(
        html("```rust\nfn main() {}\n```\n"),
        "<pre><code class=\"language-rust\">fn main() {}\n</code></pre>\n"
    );
}

#[test]
fn heading_ids_are_unique_slugs() {
    let html = html("# Intro\n\n## Setup\n\n## Setup\n\n## Custom {#mine}\n");
    assert!(html.contains("<h1 id=\"intro\">Intro</h1>"));
    assert!(html.contains("<h2 id=\"setup\">Setup</h2>"));
    assert!(html.contains("<h2 id=\"setup-1\">Setup</h2>"));
    assert!(html.contains("<h2 id=\"mine\">Custom</h2>"));
}

#[test]
fn explicit_ids_reserve_their_slug() {
    let html = html("## Setup\n\n## Install {#setup}\n");
    assert!(html.contains("<h2 id=\"setup-1\">Setup</h2>"));
    assert!(html.contains("<h2 id=\"setup\">Install</h2>"));
}

#[test]
fn heading_ids_can_be_switched_off() {
    let options = CompileOptions {
        heading_ids: false,
        ..Default::default()
    };
    let compiled = livedoc::compile_with("# Intro\n", "page.md", options).expect("compile failed");
    assert_eq!(compiled.page.static_html, "<h1>Intro</h1>\n");
}

#[test]
fn attribute_values_are_escaped() {
    let html = html("```go server id=a<b&c\n```\n");
    assert!(html.contains("data-block-id=\"a&lt;b&amp;c\""));
}

#[test]
fn task_sections_render_as_source_bound_placeholders() {
    let compiled =
        livedoc::compile("## Todos\n- [ ] a\n- [x] b\n", "page.md").expect("compile failed");
    let html = &compiled.page.static_html;
    assert!(html.contains("<h2 id=\"todos\">Todos</h2>"));
    assert!(html.contains("data-source-ref=\"_auto_todos\""));
    assert!(!html.contains("data-state-ref"));
    assert!(!html.contains("type=\"checkbox\""));
    assert!(compiled.page.markdown.contains("lvt-source=\"_auto_todos\""));
}

#[test]
fn schedule_tokens_stay_in_the_prose() {
    let html = html("Water the plants @daily:9am.\n");
    assert_eq!(html, "<p>Water the plants @daily:9am.</p>\n");
}
