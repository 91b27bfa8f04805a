//! Parser for structured-assembly text.
//!
//! A hand-written lexer feeds a recursive-descent parser; the grammar is
//! keyword-led and LL(1). The same grammar serves both dialects, since
//! builtin resolution and word-width checks belong to the analyzer.

mod lexer;
mod parser;

pub use lexer::{Token, tokenize};
pub use parser::{parse_block, parse_object, parse_program};

use smallvec::SmallVec;
use std::ops::Range;

pub type Span = Range<usize>;

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self { message: message.into(), span }
    }
}

/// Renders the source lines around `span` with a caret marker, for error
/// reporting in the CLI and test harnesses.
pub fn highlight_span(
    out: &mut impl std::fmt::Write,
    source: &str,
    span: Span,
    line_range: usize,
) {
    let mut lines: SmallVec<[usize; 1024]> = SmallVec::new();
    lines.extend(source.char_indices().filter_map(|(i, c)| (c == '\n').then_some(i)));
    lines.push(source.len());

    let line = lines.partition_point(|&idx| idx < span.start);
    let show_start = line.saturating_sub(line_range);
    let show_end = (line + line_range).min(lines.len().saturating_sub(1));

    let dig_width = show_end.checked_ilog10().unwrap_or(0) + 1;

    for i in show_start..=show_end {
        let line_start = lines.get(i.wrapping_sub(1)).map_or(0, |&idx| idx + 1);
        let line_end = lines[i];

        writeln!(out, "{:>2$} | {}", i + 1, &source[line_start..line_end], dig_width as usize)
            .expect("write failed");
        if i == line {
            for _ in line_start..span.start + dig_width as usize + 3 {
                write!(out, " ").unwrap();
            }
            for _ in span.start..span.end.max(span.start + 1) {
                write!(out, "^").unwrap();
            }
            writeln!(out).unwrap();
        }
    }
}
