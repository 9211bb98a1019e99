/*
 * standalone.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Renderers for constructs that produce output without a closing tag.

use crate::error::EvalErrorKind;
use crate::eval_context::EvalContext;
use crate::resolver::{Expect, resolve};
use once_cell::sync::Lazy;
use regex::Regex;

/// `key="value"` pairs inside an `{%input}` tag.
static ATTRIBUTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([A-Za-z_][A-Za-z0-9_:-]*)="([^"]*)""#).unwrap());

/// `{%?reference}`
pub fn render_variable(reference: &str, ctx: &EvalContext<'_>) -> Result<String, EvalErrorKind> {
    let value = resolve(reference, Expect::Scalar, ctx)?;
    Ok(value.render())
}

/// `{%!key}`. Unknown keys echo the tag so they stand out in the page.
pub fn render_locale(key: &str, raw: &str, ctx: &EvalContext<'_>) -> String {
    match ctx.locale(key) {
        Some(text) => text.to_string(),
        None => {
            tracing::warn!(template = ctx.template.name(), key, "missing localization string");
            raw.to_string()
        }
    }
}

/// `{%input name="..." ...}`
///
/// `type`, `value` and `group` have defaults (`text`, empty, `general`);
/// `group` only feeds the element id. Other attributes are copied through in
/// the order written. A submitted value for the field replaces `value`.
pub fn render_input(args: &[String], ctx: &EvalContext<'_>) -> Result<String, EvalErrorKind> {
    let joined = args.join(" ");

    let mut name = None;
    let mut input_type = "text";
    let mut value = "";
    let mut group = "general";
    let mut passthrough = Vec::new();

    for caps in ATTRIBUTE_RE.captures_iter(&joined) {
        let (Some(key), Some(val)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        match key.as_str() {
            "name" => name = Some(val.as_str()),
            "type" => input_type = val.as_str(),
            "value" => value = val.as_str(),
            "group" => group = val.as_str(),
            other => passthrough.push((other, val.as_str())),
        }
    }

    let name = name.ok_or(EvalErrorKind::MissingInputName)?;
    let value = match ctx.submitted(name) {
        Some(submitted) => escape_html(submitted),
        None => value.to_string(),
    };

    let mut out = format!(
        r#"<input type="{input_type}" id="form_{group}_{name}" name="{name}" value="{value}""#
    );
    for (key, val) in passthrough {
        out.push_str(&format!(r#" {key}="{val}""#));
    }
    out.push('>');
    Ok(out)
}

/// Escape text for use inside an HTML attribute value.
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}
