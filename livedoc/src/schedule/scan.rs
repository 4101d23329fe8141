use std::ops::Range;

use serde::Serialize;

use crate::parser::lines::LineMap;
use crate::schedule::imperative::{self, Imperative};
use crate::schedule::{ScheduleToken, ScheduleWarning, parse_token};

/// Everything the scanner found in one body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanOutput {
    pub tokens: Vec<ScheduleToken>,
    pub imperatives: Vec<Imperative>,
    pub warnings: Vec<ScheduleWarning>,
}

/// Scan `body` for schedule tokens and imperative lines.
///
/// `skip_ranges` are byte ranges of `body` to ignore: code, link
/// destinations and autolinks. `lines` maps body offsets back to file lines.
pub fn scan(body: &str, skip_ranges: &[Range<usize>], lines: &LineMap) -> ScanOutput {
    let masked = mask(body, skip_ranges);
    let mut out = ScanOutput::default();
    let mut offset = 0;

    for masked_line in masked.split_inclusive('\n') {
        let full_len = masked_line.len();
        let masked_line = masked_line.trim_end_matches(['\n', '\r']);
        let original = &body[offset..offset + masked_line.len()];
        let line = lines.line_of(offset);

        for (start, raw) in token_spans(masked_line) {
            match parse_token(raw) {
                Ok(schedule) => out.tokens.push(ScheduleToken {
                    raw: raw.to_string(),
                    line,
                    column: start + 1,
                    schedule,
                }),
                Err(err) => {
                    log::warn!("line {}: {}", line, err);
                    out.warnings.push(ScheduleWarning {
                        raw: raw.to_string(),
                        line,
                        column: start + 1,
                        message: err.to_string(),
                    });
                }
            }
        }

        if let Some(found) = imperative::parse_line(masked_line, original, line, &mut out.warnings)
        {
            out.imperatives.push(found);
        }

        offset += full_len;
    }

    log::debug!(
        "schedule scan: {} tokens, {} imperatives, {} warnings",
        out.tokens.len(),
        out.imperatives.len(),
        out.warnings.len()
    );
    out
}

/// Blank out skipped ranges with spaces, keeping line breaks and byte offsets.
fn mask(body: &str, skip_ranges: &[Range<usize>]) -> String {
    if skip_ranges.is_empty() {
        return body.to_string();
    }
    let mut bytes = body.as_bytes().to_vec();
    for range in skip_ranges {
        let range = range.start.min(bytes.len())..range.end.min(bytes.len());
        for byte in &mut bytes[range] {
            if *byte != b'\n' && *byte != b'\r' {
                *byte = b' ';
            }
        }
    }
    // Ranges fall on char boundaries, so whole characters were replaced.
    String::from_utf8(bytes).unwrap_or_else(|_| body.to_string())
}

/// Start offset and text of every candidate token on one line.
pub(crate) fn token_spans(line: &str) -> impl Iterator<Item = (usize, &str)> {
    line.match_indices('@').filter_map(move |(start, _)| {
        if !starts_token(line, start) {
            return None;
        }
        let raw = token_text(&line[start..]);
        (raw.len() > 1).then_some((start, raw))
    })
}

/// An `@` starts a token only at a word boundary and when not escaped.
pub(crate) fn starts_token(line: &str, at: usize) -> bool {
    match line[..at].chars().next_back() {
        None => true,
        Some(c) => c != '\\' && c != '@' && !c.is_alphanumeric(),
    }
}

/// Token text starting at an `@`, without trailing sentence punctuation.
pub(crate) fn token_text(from_at: &str) -> &str {
    let end = from_at
        .find(|c: char| c.is_whitespace() || matches!(c, ';' | ')' | ']' | '}'))
        .unwrap_or(from_at.len());
    from_at[..end].trim_end_matches(['.', ',', ':', '!', '?'])
}
