/*
 * eval_context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Evaluation context for template rendering.
//!
//! This module provides [`EvalContext`], which is created fresh for every
//! render call and threaded through all evaluation functions. It holds:
//!
//! 1. **Inputs**: localization strings, the data mapping, template-wide
//!    globals and submitted form values
//! 2. **Scope**: a stack of loop frames, innermost last
//! 3. **Branch state**: which `if` blocks already rendered a branch
//!
//! Keeping this state here instead of on the nodes is what lets one parsed
//! [`Template`] be rendered concurrently.

use crate::ast::NodeId;
use crate::context::{FormData, LocaleStrings, TemplateContext, TemplateValue};
use crate::parser::Template;
use std::collections::HashSet;

/// Everything a caller supplies for one render.
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    pub strings: &'a LocaleStrings,
    pub data: &'a TemplateContext,
    /// Template-wide variables. They shadow same-named keys in `data`.
    pub globals: Option<&'a TemplateContext>,
    pub form: Option<&'a FormData>,
}

impl<'a> RenderInput<'a> {
    pub fn new(strings: &'a LocaleStrings, data: &'a TemplateContext) -> Self {
        Self {
            strings,
            data,
            globals: None,
            form: None,
        }
    }

    pub fn with_globals(mut self, globals: &'a TemplateContext) -> Self {
        self.globals = Some(globals);
        self
    }

    pub fn with_form(mut self, form: &'a FormData) -> Self {
        self.form = Some(form);
        self
    }
}

/// The binding introduced by one `{%foreach}` iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame<'a> {
    /// Item name from `foreach NAME in ...`.
    pub name: &'a str,
    /// Current element.
    pub item: &'a TemplateValue,
}

/// Per-render evaluation state.
pub struct EvalContext<'a> {
    pub template: &'a Template,
    input: RenderInput<'a>,
    frames: Vec<Frame<'a>>,
    resolved: HashSet<NodeId>,
}

impl<'a> EvalContext<'a> {
    pub fn new(template: &'a Template, input: RenderInput<'a>) -> Self {
        Self {
            template,
            input,
            frames: Vec::new(),
            resolved: HashSet::new(),
        }
    }

    /// Look up a top-level variable; globals shadow per-call data.
    pub fn data(&self, name: &str) -> Option<&'a TemplateValue> {
        self.input
            .globals
            .and_then(|globals| globals.get(name))
            .or_else(|| self.input.data.get(name))
    }

    pub fn locale(&self, key: &str) -> Option<&'a str> {
        self.input.strings.get(key)
    }

    pub fn submitted(&self, field: &str) -> Option<&'a str> {
        self.input.form.and_then(|form| form.get(field))
    }

    pub fn push_frame(&mut self, frame: Frame<'a>) {
        self.frames.push(frame);
    }

    pub fn pop_frame(&mut self) -> Option<Frame<'a>> {
        self.frames.pop()
    }

    /// Nearest enclosing frame with this item name.
    pub fn find_frame(&self, name: &str) -> Option<Frame<'a>> {
        self.frames.iter().rev().find(|frame| frame.name == name).copied()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_resolved(&self, block: NodeId) -> bool {
        self.resolved.contains(&block)
    }

    pub fn mark_resolved(&mut self, block: NodeId) {
        self.resolved.insert(block);
    }

    /// Forget a block's branch state before it is evaluated again (for
    /// example on the next loop iteration).
    pub fn reset_resolved(&mut self, block: NodeId) {
        self.resolved.remove(&block);
    }
}
