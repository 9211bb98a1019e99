/*
 * evaluator.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template evaluation engine.
//!
//! Walks the node arena depth-first, appending output to a single buffer.
//! Any error aborts the render; callers never see partial output.

use crate::ast::{Node, NodeId, NodeKind};
use crate::context::TemplateValue;
use crate::error::{EvalErrorKind, TemplateError, TemplateResult};
use crate::eval_context::{EvalContext, Frame, RenderInput};
use crate::expression::{Expression, Operand, Scalar, compare};
use crate::parser::Template;
use crate::resolver::{Expect, resolve, resolve_collection};
use crate::standalone::{render_input, render_locale, render_variable};
use tracing::trace;

impl Template {
    /// Render this template.
    ///
    /// # Arguments
    /// * `input` - Localization strings, data, and optional globals and
    ///   submitted form values
    ///
    /// # Returns
    /// The rendered output string, or the first evaluation error.
    pub fn render(&self, input: &RenderInput<'_>) -> TemplateResult<String> {
        let mut ctx = EvalContext::new(self, *input);
        let mut out = String::with_capacity(self.source.len());
        evaluate(&self.roots, &mut ctx, &mut out)?;
        Ok(out)
    }
}

/// Evaluate a sequence of sibling nodes.
pub fn evaluate(nodes: &[NodeId], ctx: &mut EvalContext<'_>, out: &mut String) -> TemplateResult<()> {
    for &id in nodes {
        evaluate_node(id, ctx, out)?;
    }
    Ok(())
}

fn evaluate_node(id: NodeId, ctx: &mut EvalContext<'_>, out: &mut String) -> TemplateResult<()> {
    let template = ctx.template;
    let node = template.node(id);

    match &node.kind {
        NodeKind::Text(text) => out.push_str(text),

        NodeKind::Variable { reference } => {
            let rendered = render_variable(reference, ctx).map_err(|kind| located(ctx, node, kind))?;
            out.push_str(&rendered);
        }

        NodeKind::LocaleString { key, raw } => out.push_str(&render_locale(key, raw, ctx)),

        NodeKind::InputField { args } => {
            let rendered = render_input(args, ctx).map_err(|kind| located(ctx, node, kind))?;
            out.push_str(&rendered);
        }

        NodeKind::If {
            args,
            children,
            has_subconstructs,
        } => {
            if *has_subconstructs {
                // Branch state from a previous loop iteration must not leak.
                ctx.reset_resolved(id);
                evaluate(children, ctx, out)?;
            } else if condition_holds(args, ctx).map_err(|kind| located(ctx, node, kind))? {
                evaluate(children, ctx, out)?;
            }
        }

        NodeKind::ElseIf { args, children } => {
            let owner = template.arena().parent(id).unwrap_or(id);
            if ctx.is_resolved(owner) {
                return Ok(());
            }
            if condition_holds(args, ctx).map_err(|kind| located(ctx, node, kind))? {
                ctx.mark_resolved(owner);
                evaluate(children, ctx, out)?;
            }
        }

        NodeKind::Else { children } => {
            let owner = template.arena().parent(id).unwrap_or(id);
            if !ctx.is_resolved(owner) {
                ctx.mark_resolved(owner);
                evaluate(children, ctx, out)?;
            }
        }

        NodeKind::ForEach { args, children } => {
            let (item_name, collection) =
                split_foreach(args).map_err(|kind| located(ctx, node, kind))?;
            let items: Vec<&TemplateValue> = match resolve_collection(collection, ctx)
                .map_err(|kind| located(ctx, node, kind))?
            {
                TemplateValue::List(items) => items.iter().collect(),
                TemplateValue::Map(entries) => entries.values().collect(),
                _ => Vec::new(),
            };
            trace!(
                item = item_name,
                collection,
                count = items.len(),
                depth = ctx.depth(),
                "foreach"
            );

            for item in items {
                ctx.push_frame(Frame {
                    name: item_name,
                    item,
                });
                let result = evaluate(children, ctx, out);
                ctx.pop_frame();
                result?;
            }
        }
    }

    Ok(())
}

/// Evaluate an `if`/`elseif` condition.
fn condition_holds(args: &[String], ctx: &EvalContext<'_>) -> Result<bool, EvalErrorKind> {
    let expression = Expression::parse(args)?;
    let left = match &expression.left {
        Operand::Literal(text) => Scalar::from_text(text),
        Operand::Reference(reference) => {
            let value = resolve(reference, Expect::Scalar, ctx)?;
            Scalar::from_value(value.as_ref())
        }
    };
    let right = Scalar::from_text(&expression.right);
    Ok(compare(&left, expression.operator, &right))
}

/// Split `item in collection`.
fn split_foreach(args: &[String]) -> Result<(&str, &str), EvalErrorKind> {
    match args {
        [item, keyword, collection] if keyword == "in" && item != "in" && collection != "in" => {
            Ok((item.as_str(), collection.as_str()))
        }
        _ => Err(EvalErrorKind::MalformedForEach(args.join(" "))),
    }
}

fn located(ctx: &EvalContext<'_>, node: &Node, kind: EvalErrorKind) -> TemplateError {
    TemplateError::Evaluation {
        template: ctx.template.name().to_string(),
        offset: node.span.start,
        kind,
    }
}
