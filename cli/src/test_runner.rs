use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use livedoc::block::Block;
use livedoc::{Compiled, ParseError};

/// `+++` fences the TOML header, so the document below may open with its
/// own `---` frontmatter.
const HEADER_FENCE: &str = "+++";

#[derive(Debug, Deserialize)]
pub struct ExpectedWarning {
    /// Substring that must appear in the warning message.
    pub contains: String,

    /// If set, the warning must be on this 1-based document line.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ExpectedBlock {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub line: Option<usize>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Compilation must fail and the error message must contain this.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// Error kind, e.g. "reference" or "structural".
    #[serde(default)]
    pub expect_error_kind: Option<String>,

    /// 1-based document line the error must point at.
    #[serde(default)]
    pub expect_error_line: Option<usize>,

    /// Substring of the error's hint.
    #[serde(default)]
    pub expect_hint: Option<String>,

    /// Exact block list, in document order.
    #[serde(default)]
    pub expect_blocks: Option<Vec<ExpectedBlock>>,

    /// Exact set of source names after merging.
    #[serde(default)]
    pub expect_sources: Option<Vec<String>>,

    /// Raw text of every schedule token, in order.
    #[serde(default)]
    pub expect_tokens: Option<Vec<String>>,

    /// Kind of every imperative, in order ("notify" or "run-action").
    #[serde(default)]
    pub expect_imperatives: Option<Vec<String>>,

    #[serde(default)]
    pub expect_html_contains: Vec<String>,

    #[serde(default)]
    pub expect_html_excludes: Vec<String>,

    /// If present (even empty), warning count and content are checked.
    #[serde(default)]
    pub expect_warnings: Option<Vec<ExpectedWarning>>,
}

/// Split a `.test.md` file into its TOML config and the document under test.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    let after_open = content
        .strip_prefix(HEADER_FENCE)
        .ok_or("missing opening +++ header")?;
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close = after_open
        .find("\n+++")
        .ok_or("missing closing +++ header")?;
    let toml_str = after_open[..close].trim_end_matches('\r');

    let rest = &after_open[close + 1 + HEADER_FENCE.len()..];
    let document = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, document))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

impl TestResult {
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| {
            self.path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("?")
        })
    }
}

fn run_single_test(path: &Path) -> TestResult {
    let fail = |description: Option<String>, reason: String| TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    };

    log::debug!("running {}", path.display());
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(None, format!("cannot read file: {}", e)),
    };

    let (config, document) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => return fail(None, format!("header error: {}", e)),
    };

    let description = config.description.clone();
    let result = livedoc::compile(document, path);

    let outcome = match (&config.expect_error, result) {
        (Some(_), Err(error)) => check_error(&config, &error),
        (Some(expected), Ok(_)) => Some(format!(
            "expected error containing \"{}\", but compilation succeeded",
            expected
        )),
        (None, Err(error)) => Some(format!("unexpected compile error: {}", error)),
        (None, Ok(compiled)) => check_page(&config, &compiled),
    };

    TestResult {
        path: path.to_path_buf(),
        description,
        outcome: match outcome {
            Some(reason) => TestOutcome::Fail(reason),
            None => TestOutcome::Pass,
        },
    }
}

/// Check a compile error against expectations. Returns `Some(reason)` on mismatch.
fn check_error(config: &TestConfig, error: &ParseError) -> Option<String> {
    if let Some(expected) = &config.expect_error {
        if !error.message.contains(expected.as_str()) {
            return Some(format!(
                "expected error containing \"{}\", got: {}",
                expected, error.message
            ));
        }
    }
    if let Some(kind) = &config.expect_error_kind {
        if error.kind.as_str() != kind.as_str() {
            return Some(format!(
                "expected {} error, got {}",
                kind,
                error.kind.as_str()
            ));
        }
    }
    if let Some(line) = config.expect_error_line {
        if error.line != line {
            return Some(format!("expected error on line {}, got line {}", line, error.line));
        }
    }
    if let Some(expected) = &config.expect_hint {
        let hint = error.hint.as_deref().unwrap_or("");
        if !hint.contains(expected.as_str()) {
            return Some(format!(
                "expected hint containing \"{}\", got: {}",
                expected,
                if hint.is_empty() { "(none)" } else { hint }
            ));
        }
    }
    None
}

/// Check a compiled page against expectations. Returns `Some(reason)` on mismatch.
fn check_page(config: &TestConfig, compiled: &Compiled) -> Option<String> {
    let page = &compiled.page;

    if let Some(expected) = &config.expect_blocks {
        if let Some(reason) = check_blocks(page.blocks(), expected) {
            return Some(reason);
        }
    }

    if let Some(expected) = &config.expect_sources {
        let mut expected: Vec<&str> = expected.iter().map(String::as_str).collect();
        expected.sort_unstable();
        let actual: Vec<&str> = page.config.sources.keys().map(String::as_str).collect();
        if actual != expected {
            return Some(format!(
                "source mismatch\n  expected: {:?}\n  actual:   {:?}",
                expected, actual
            ));
        }
    }

    if let Some(expected) = &config.expect_tokens {
        let actual: Vec<&str> = page.schedules.iter().map(|t| t.raw.as_str()).collect();
        if actual != *expected {
            return Some(format!(
                "token mismatch\n  expected: {:?}\n  actual:   {:?}",
                expected, actual
            ));
        }
    }

    if let Some(expected) = &config.expect_imperatives {
        let actual: Vec<String> = page
            .imperatives
            .iter()
            .map(|imp| match imp.kind() {
                livedoc::schedule::ImperativeKind::Notify => "notify".to_string(),
                livedoc::schedule::ImperativeKind::RunAction => "run-action".to_string(),
            })
            .collect();
        if actual != *expected {
            return Some(format!(
                "imperative mismatch\n  expected: {:?}\n  actual:   {:?}",
                expected, actual
            ));
        }
    }

    for needle in &config.expect_html_contains {
        if !page.static_html.contains(needle.as_str()) {
            return Some(format!("HTML does not contain {:?}", needle));
        }
    }
    for needle in &config.expect_html_excludes {
        if page.static_html.contains(needle.as_str()) {
            return Some(format!("HTML unexpectedly contains {:?}", needle));
        }
    }

    if let Some(expected) = &config.expect_warnings {
        return check_warnings(compiled, expected);
    }

    None
}

fn check_blocks(actual: &[Block], expected: &[ExpectedBlock]) -> Option<String> {
    if actual.len() != expected.len() {
        let ids: Vec<&str> = actual.iter().map(Block::id).collect();
        return Some(format!(
            "expected {} block(s), got {}: {:?}",
            expected.len(),
            actual.len(),
            ids
        ));
    }

    for (i, (block, want)) in actual.iter().zip(expected).enumerate() {
        if block.id() != want.id || block.block_type().as_str() != want.block_type {
            return Some(format!(
                "block[{}]: expected {} `{}`, got {} `{}`",
                i,
                want.block_type,
                want.id,
                block.block_type(),
                block.id()
            ));
        }
        if let Some(line) = want.line {
            if block.line() != line {
                return Some(format!(
                    "block[{}]: expected on line {}, got line {}",
                    i,
                    line,
                    block.line()
                ));
            }
        }
        if let Block::Interactive(b) = block {
            if want.state.is_some() && b.state_ref != want.state {
                return Some(format!(
                    "block[{}]: expected state {:?}, got {:?}",
                    i, want.state, b.state_ref
                ));
            }
            if want.source.is_some() && b.source_ref != want.source {
                return Some(format!(
                    "block[{}]: expected source {:?}, got {:?}",
                    i, want.source, b.source_ref
                ));
            }
        }
    }

    None
}

fn check_warnings(compiled: &Compiled, expected: &[ExpectedWarning]) -> Option<String> {
    let actual = &compiled.warnings;

    if actual.len() != expected.len() {
        let listed: Vec<String> = actual.iter().map(|w| format!("  - {}", w)).collect();
        return Some(format!(
            "expected {} warning(s), got {}\n  actual warnings:\n{}",
            expected.len(),
            actual.len(),
            if listed.is_empty() {
                "    (none)".to_string()
            } else {
                listed.join("\n")
            }
        ));
    }

    for (i, (warning, want)) in actual.iter().zip(expected).enumerate() {
        if !warning.message.contains(&want.contains) {
            return Some(format!(
                "warning[{}]: expected message containing \"{}\", got: {}",
                i, want.contains, warning.message
            ));
        }
        if let Some(line) = want.line {
            if warning.line != line {
                return Some(format!(
                    "warning[{}]: expected on line {}, got line {}",
                    i, line, warning.line
                ));
            }
        }
    }

    None
}

/// Discover `.test.md` files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "".
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("skipping {}: {}", dir.display(), e);
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
            continue;
        }
        let is_test = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with(".test.md"));
        if is_test {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(cat), files.len());
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

fn paint(text: &str, code: &str, no_color: bool) -> String {
    if no_color {
        text.to_string()
    } else {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    }
}

/// Print failure details and the summary line. Returns the exit code.
fn report(passed: usize, failures: &[TestResult], no_color: bool) -> i32 {
    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for failure in failures {
            eprintln!();
            eprintln!("  --- {} ---", failure.path.display());
            if let TestOutcome::Fail(reason) = &failure.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!(
            "test result: {}. {} passed, 0 failed",
            paint("ok", "32", no_color),
            passed
        );
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            paint("FAILED", "31", no_color),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}

/// Run every `.test.md` file under `path` (or `path` itself if it is a file).
/// A non-empty `categories` restricts the run to those subfolders.
/// Returns the exit code: 0 when everything passes, 1 otherwise.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let selected: BTreeMap<String, Vec<PathBuf>> = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        let all = discover_categorized(path);
        if all.is_empty() {
            eprintln!("no .test.md files found in {}", path.display());
            return 1;
        }
        if categories.is_empty() {
            all
        } else {
            filter_categories(all, categories)
        }
    };

    if selected.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (category, files) in &selected {
        if !path.is_file() {
            eprintln!();
            eprintln!("{}", paint(category_label(category), "1", no_color));
        }

        for file in files {
            let result = run_single_test(file);
            match result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", paint("PASS", "32", no_color), result.label());
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", paint("FAIL", "31", no_color), result.label());
                    failures.push(result);
                }
            }
        }
    }

    report(passed, &failures, no_color)
}

fn filter_categories(
    all: BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<String, Vec<PathBuf>> {
    let available: Vec<String> = all.keys().map(|k| category_label(k).to_string()).collect();
    let wanted: Vec<&str> = requested.iter().map(|r| r.trim_matches('/')).collect();

    for req in &wanted {
        let found = all
            .keys()
            .any(|cat| cat.as_str() == *req || cat.starts_with(&format!("{}/", req)));
        if !found {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                available.join(", ")
            );
        }
    }

    all.into_iter()
        .filter(|(cat, _)| {
            wanted
                .iter()
                .any(|req| cat.as_str() == *req || cat.starts_with(&format!("{}/", req)))
        })
        .collect()
}
