/*
 * report.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Terminal rendering of located template errors.

use crate::error::TemplateError;
use crate::source::byte_to_char_offset;
use ariadne::{Config, Label, Report, ReportKind, Source};
use std::ops::Range;

/// Render a syntax or evaluation error as an annotated source snippet.
///
/// The label covers the offending tag. Returns `None` for errors without a
/// location in `source` (missing templates, I/O and configuration errors).
pub fn render_report(error: &TemplateError, source: &str) -> Option<String> {
    let offset = error.offset()?;
    if offset > source.len() || !source.is_char_boundary(offset) {
        return None;
    }
    let name = error.template().unwrap_or("<template>").to_string();
    let title = match error {
        TemplateError::Syntax { .. } => "Syntax error",
        _ => "Evaluation error",
    };

    let span = char_span(source, tag_range(source, offset));
    let report = Report::build(ReportKind::Error, name.clone(), span.start)
        .with_config(Config::default().with_color(false))
        .with_message(title)
        .with_label(Label::new((name.clone(), span)).with_message(error.message()))
        .finish();

    let mut output = Vec::new();
    report
        .write((name, Source::from(source)), &mut output)
        .ok()?;
    String::from_utf8(output).ok()
}

/// Byte range of the tag starting at `offset`, or a single character when
/// there is no closing brace.
fn tag_range(source: &str, offset: usize) -> Range<usize> {
    let rest = &source[offset..];
    let end = match (rest.starts_with("{%"), rest.find('}')) {
        (true, Some(close)) => offset + close + 1,
        _ => offset + rest.chars().next().map_or(0, char::len_utf8),
    };
    offset..end
}

fn char_span(source: &str, range: Range<usize>) -> Range<usize> {
    byte_to_char_offset(source, range.start)..byte_to_char_offset(source, range.end)
}
