//! Source positions and code frames.
//!
//! Spans from the parser are byte offsets. Reports use 1-based lines and 0-based
//! columns counted in characters.

use ariadne::{Config, Label, Report, ReportKind, Source};
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
}

impl SourcePosition {
    /// Locate a byte offset inside `source`.
    pub fn from_offset(source: &str, offset: u32) -> Self {
        let offset = clamp_to_char_boundary(source, offset as usize);
        let before = &source[..offset];
        let line = before.matches('\n').count() as u32 + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = source[line_start..offset].chars().count() as u32;
        SourcePosition { line, column }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A non-fatal finding reported while processing a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub frame: String,
}

fn clamp_to_char_boundary(source: &str, offset: usize) -> usize {
    let mut offset = offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

fn char_range(source: &str, start: u32, end: u32) -> Range<usize> {
    let start = clamp_to_char_boundary(source, start as usize);
    let end = clamp_to_char_boundary(source, (end as usize).max(start));
    let char_start = source[..start].chars().count();
    let char_end = char_start + source[start..end].chars().count();
    char_start..char_end
}

/// Render a plain-text excerpt of `source` pointing at the byte span `start..end`.
pub fn code_frame(
    source: &str,
    file: &str,
    start: u32,
    end: u32,
    severity: Severity,
    message: &str,
) -> String {
    let range = char_range(source, start, end);
    let kind = match severity {
        Severity::Warning => ReportKind::Warning,
        Severity::Error => ReportKind::Error,
    };
    let mut bytes: Vec<u8> = Vec::new();
    let written = Report::build(kind, (file, range.clone()))
        .with_config(Config::default().with_color(false))
        .with_message(message)
        .with_label(Label::new((file, range)).with_message(message))
        .finish()
        .write((file, Source::from(source)), &mut bytes);

    match written {
        Ok(()) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}
