mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use livedoc::block::Block;
use livedoc::schedule::ScheduleWarning;
use livedoc::{CompileOptions, Compiled, ParseError};

const SUBCOMMANDS: &[&str] = &["compile", "test", "help"];

#[derive(Parser)]
#[command(name = "livedoc", version, about = "Compile extended-Markdown documents into live pages")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a document and print a summary
    Compile(CompileArgs),

    /// Run .test.md conformance files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct CompileArgs {
    /// Markdown document to compile
    file: PathBuf,

    /// Compile only (exit 0 if valid)
    #[arg(long)]
    check: bool,

    /// Print the compiled page as JSON
    #[arg(long)]
    json: bool,

    /// Print the rendered HTML
    #[arg(long)]
    html: bool,

    /// List every block with its id and references
    #[arg(long)]
    list_blocks: bool,

    /// TOML file with compile options
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or a directory containing them
    path: PathBuf,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // `livedoc page.md` is shorthand for `livedoc compile page.md`.
    let mut args: Vec<String> = std::env::args().collect();
    let first_positional = args
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, a)| !a.starts_with('-'))
        .map(|(pos, a)| (pos, a.clone()));
    if let Some((pos, first)) = first_positional {
        if !SUBCOMMANDS.contains(&first.as_str()) {
            args.insert(pos, "compile".to_string());
        }
    }

    let cli = Cli::parse_from(&args);

    match cli.command {
        Command::Compile(compile_args) => do_compile(compile_args, cli.no_color),
        Command::Test(test_args) => {
            if test_args.list_categories {
                test_runner::list_categories(&test_args.path);
                return;
            }
            let exit_code =
                test_runner::run_tests(&test_args.path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

fn load_options(path: Option<&Path>) -> Result<CompileOptions, String> {
    let Some(path) = path else {
        return Ok(CompileOptions::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read config '{}': {}", path.display(), e))?;
    let options: CompileOptions = toml::from_str(&text)
        .map_err(|e| format!("invalid config '{}': {}", path.display(), e))?;
    log::debug!("compile options from {}: {:?}", path.display(), options);
    Ok(options)
}

fn do_compile(args: CompileArgs, no_color: bool) {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let options = match load_options(args.config.as_deref()) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(2);
        }
    };

    let source = match std::fs::read_to_string(&args.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", args.file.display(), e);
            process::exit(1);
        }
    };
    let path = std::path::absolute(&args.file).unwrap_or_else(|_| args.file.clone());
    log::info!("compiling {}", path.display());

    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.display().to_string(), source.clone());
    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();

    let compiled = match livedoc::compile_with(&source, &path, options) {
        Ok(compiled) => compiled,
        Err(error) => {
            emit_parse_error(&writer, &config, &files, file_id, &source, &error);
            process::exit(1);
        }
    };

    for warning in &compiled.warnings {
        emit_warning(&writer, &config, &files, file_id, &source, warning);
    }

    if args.check {
        eprintln!(
            "ok: {} compiled successfully ({} blocks)",
            args.file.display(),
            compiled.page.blocks().len()
        );
        return;
    }

    if args.json {
        match serde_json::to_string_pretty(&compiled.page) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error: cannot serialize page: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    if args.html {
        print!("{}", compiled.page.static_html);
        return;
    }

    if args.list_blocks {
        for block in compiled.page.blocks() {
            println!("{}", describe_block(block));
        }
        return;
    }

    print_summary(&compiled);
}

fn describe_block(block: &Block) -> String {
    let target = match block {
        Block::Interactive(b) => match (&b.state_ref, &b.source_ref) {
            (Some(state), Some(source)) => format!(" -> state={} source={}", state, source),
            (Some(state), None) => format!(" -> state={}", state),
            (None, Some(source)) => format!(" -> source={}", source),
            (None, None) => String::new(),
        },
        _ => String::new(),
    };
    format!(
        "{:>4}  {:<6}  {:<8}  {}{}",
        block.line(),
        block.block_type(),
        block.language(),
        block.id(),
        target
    )
}

fn print_summary(compiled: &Compiled) {
    let page = &compiled.page;
    println!("page:     {}", page.id);
    if let Some(title) = &page.title {
        println!("title:    {}", title);
    }
    println!("type:     {}", page.page_type);
    println!(
        "blocks:   {} server, {} wasm, {} interactive",
        page.server_blocks().count(),
        page.wasm_blocks().count(),
        page.interactive_blocks().count()
    );
    if !page.config.sources.is_empty() {
        let names: Vec<&str> = page.config.sources.keys().map(String::as_str).collect();
        println!("sources:  {}", names.join(", "));
    }
    if !page.schedules.is_empty() {
        let raw: Vec<&str> = page.schedules.iter().map(|t| t.raw.as_str()).collect();
        println!("schedule: {}", raw.join(" "));
    }
    if !page.imperatives.is_empty() {
        println!("imperatives: {}", page.imperatives.len());
    }
    if !compiled.warnings.is_empty() {
        println!("warnings: {}", compiled.warnings.len());
    }
}

fn emit_parse_error(
    writer: &StandardStream,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    file_id: usize,
    source: &str,
    error: &ParseError,
) {
    if error.span.is_some() {
        let diagnostic = error.to_diagnostic(file_id);
        if term::emit_to_write_style(&mut writer.lock(), config, files, &diagnostic).is_ok() {
            return;
        }
    }
    eprint!("{}", error.render_with_source(source));
}

fn emit_warning(
    writer: &StandardStream,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    file_id: usize,
    source: &str,
    warning: &ScheduleWarning,
) {
    match token_span(source, warning.line, warning.column, warning.raw.len()) {
        Some(span) => {
            let diagnostic = Diagnostic::new(Severity::Warning)
                .with_message(&warning.message)
                .with_labels(vec![Label::primary(file_id, span)]);
            let _ = term::emit_to_write_style(&mut writer.lock(), config, files, &diagnostic);
        }
        None => eprintln!("warning: {}", warning),
    }
}

/// Byte span of `len` bytes at a 1-indexed line and column.
fn token_span(
    source: &str,
    line: usize,
    column: usize,
    len: usize,
) -> Option<std::ops::Range<usize>> {
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line.checked_sub(1)?)
        .map(str::len)
        .sum();
    let start = line_start + column.checked_sub(1)?;
    let end = start + len;
    (end <= source.len() && source.is_char_boundary(start) && source.is_char_boundary(end))
        .then_some(start..end)
}
