//! `Notify [@token] message` and `Run action:name [@token] [args...]` lines.

use serde::Serialize;

use crate::schedule::scan::{starts_token, token_text};
use crate::schedule::{ScheduleToken, ScheduleWarning, parse_token};

const NOTIFY: &str = "Notify ";
const RUN_ACTION: &str = "Run action:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ImperativeAction {
    Notify { message: String },
    RunAction { action: String, args: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImperativeKind {
    Notify,
    RunAction,
}

/// A sentence asking the runtime to do something, optionally on a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Imperative {
    pub action: ImperativeAction,
    /// `None` when the line has no token or the first one did not parse.
    pub token: Option<ScheduleToken>,
    /// 1-indexed file line.
    pub line: usize,
    /// The line as written, trimmed.
    pub raw: String,
}

impl Imperative {
    pub fn kind(&self) -> ImperativeKind {
        match self.action {
            ImperativeAction::Notify { .. } => ImperativeKind::Notify,
            ImperativeAction::RunAction { .. } => ImperativeKind::RunAction,
        }
    }
}

/// Recognize an imperative on one line.
///
/// `masked` is the line with code blanked out, `original` the same line as
/// written; both have the same byte offsets. Tokens are read from `masked`,
/// message and argument text from `original`. Malformed tokens were already
/// reported by the token scan and are not reported again here.
pub(crate) fn parse_line(
    masked: &str,
    original: &str,
    line: usize,
    warnings: &mut Vec<ScheduleWarning>,
) -> Option<Imperative> {
    let start = skip_markers(masked);
    let rest = &masked[start..];

    let action = if rest.starts_with(NOTIFY) {
        notify(masked, original, start + NOTIFY.len(), line, warnings)?
    } else if rest.starts_with(RUN_ACTION) {
        run_action(masked, original, start + RUN_ACTION.len(), line, warnings)?
    } else {
        return None;
    };

    let (action, token) = action;
    Some(Imperative {
        action,
        token,
        line,
        raw: original.trim().to_string(),
    })
}

type Parsed = (ImperativeAction, Option<ScheduleToken>);

fn notify(
    masked: &str,
    original: &str,
    from: usize,
    line: usize,
    warnings: &mut Vec<ScheduleWarning>,
) -> Option<Parsed> {
    let mut words = words(masked, from).peekable();
    let mut token = None;
    let mut message_start = from;

    if let Some((start, word)) = words.peek().copied() {
        if word.starts_with('@') && starts_token(masked, start) {
            words.next();
            token = scheduled(word, start, line);
            message_start = start + word.len();
        }
    }

    for (start, word) in words {
        if word.starts_with('@') && starts_token(masked, start) {
            warn_extra(word, start, line, warnings);
        }
    }

    let message = original[message_start..].trim().to_string();
    if message.is_empty() && token.is_none() {
        return None;
    }
    Some((ImperativeAction::Notify { message }, token))
}

fn run_action(
    masked: &str,
    original: &str,
    from: usize,
    line: usize,
    warnings: &mut Vec<ScheduleWarning>,
) -> Option<Parsed> {
    let mut words = words(masked, from);
    let (name_start, name) = words.next()?;
    let action = original[name_start..name_start + name.len()].to_string();

    let mut token = None;
    let mut seen_token = false;
    let mut args = Vec::new();

    for (start, word) in words {
        if word.starts_with('@') && starts_token(masked, start) {
            if !seen_token {
                seen_token = true;
                token = scheduled(word, start, line);
                continue;
            }
            warn_extra(word, start, line, warnings);
        }
        args.push(original[start..start + word.len()].to_string());
    }

    Some((ImperativeAction::RunAction { action, args }, token))
}

fn scheduled(word: &str, start: usize, line: usize) -> Option<ScheduleToken> {
    let raw = token_text(word);
    let schedule = parse_token(raw).ok()?;
    Some(ScheduleToken {
        raw: raw.to_string(),
        line,
        column: start + 1,
        schedule,
    })
}

/// Only a well-formed extra token earns a warning; a malformed one was
/// already reported.
fn warn_extra(word: &str, start: usize, line: usize, warnings: &mut Vec<ScheduleWarning>) {
    let raw = token_text(word);
    if parse_token(raw).is_ok() {
        warnings.push(ScheduleWarning {
            raw: raw.to_string(),
            line,
            column: start + 1,
            message: "multiple schedule tokens in imperative; only the first is used".to_string(),
        });
    }
}

/// Offset past leading whitespace, blockquote markers and list bullets.
fn skip_markers(line: &str) -> usize {
    let mut pos = 0;
    loop {
        let rest = &line[pos..];
        let trimmed = rest.trim_start();
        pos += rest.len() - trimmed.len();

        if let Some(after) = trimmed.strip_prefix('>') {
            pos += trimmed.len() - after.len();
            continue;
        }
        if let Some(after) = trimmed.strip_prefix(['-', '*', '+']) {
            if after.starts_with(char::is_whitespace) {
                pos += 1;
                continue;
            }
        }
        let digits = trimmed.len() - trimmed.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits > 0 {
            let after = &trimmed[digits..];
            if let Some(after) = after.strip_prefix(['.', ')']) {
                if after.starts_with(char::is_whitespace) {
                    pos += digits + 1;
                    continue;
                }
            }
        }
        return pos;
    }
}

/// Whitespace-separated words of `line` from byte `from`, with offsets.
fn words(line: &str, from: usize) -> impl Iterator<Item = (usize, &str)> {
    let mut cursor = from.min(line.len());
    std::iter::from_fn(move || {
        let tail = &line[cursor..];
        let start = cursor + (tail.len() - tail.trim_start().len());
        if start >= line.len() {
            return None;
        }
        let len = line[start..]
            .find(char::is_whitespace)
            .unwrap_or(line.len() - start);
        cursor = start + len;
        Some((start, &line[start..cursor]))
    })
}
