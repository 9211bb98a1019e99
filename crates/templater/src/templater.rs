/*
 * templater.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Named template rendering with a parse cache.
//!
//! [`Templater`] loads templates by name through a [`TemplateLoader`], parses
//! each name once and keeps the tree behind an `Arc` so any number of threads
//! can render it at the same time.

use crate::config::TemplaterConfig;
use crate::context::{FormData, LocaleStrings, TemplateContext, TemplateValue};
use crate::error::TemplateResult;
use crate::eval_context::RenderInput;
use crate::loader::{FileSystemLoader, TemplateLoader};
use crate::parser::Template;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

pub struct Templater<L: TemplateLoader = FileSystemLoader> {
    loader: L,
    globals: TemplateContext,
    cache: RwLock<HashMap<String, Arc<Template>>>,
}

impl Templater<FileSystemLoader> {
    /// Templater over the filesystem layout and globals of `config`.
    pub fn from_config(config: &TemplaterConfig) -> Self {
        Templater::new(FileSystemLoader::from_config(config)).with_globals(config.globals.clone())
    }
}

impl Default for Templater<FileSystemLoader> {
    fn default() -> Self {
        Templater::new(FileSystemLoader::default())
    }
}

impl<L: TemplateLoader> Templater<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            globals: TemplateContext::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the template-wide variables.
    pub fn with_globals(mut self, globals: TemplateContext) -> Self {
        self.globals = globals;
        self
    }

    pub fn set_global(&mut self, name: impl Into<String>, value: impl Into<TemplateValue>) {
        self.globals.insert(name, value);
    }

    pub fn globals(&self) -> &TemplateContext {
        &self.globals
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// The parsed template for `name`, loading and parsing it on first use.
    ///
    /// Failed loads and parses are not cached.
    pub fn template(&self, name: &str) -> TemplateResult<Arc<Template>> {
        if let Some(template) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            debug!(template = name, "template cache hit");
            return Ok(Arc::clone(template));
        }

        debug!(template = name, "template cache miss");
        let source = self.loader.load(name)?;
        let template = Arc::new(Template::compile_named(&source, name)?);

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have parsed it meanwhile; keep the first.
        let cached = cache
            .entry(name.to_string())
            .or_insert_with(|| Arc::clone(&template));
        Ok(Arc::clone(cached))
    }

    /// Render the named template.
    pub fn render(
        &self,
        name: &str,
        strings: &LocaleStrings,
        data: &TemplateContext,
    ) -> TemplateResult<String> {
        let template = self.template(name)?;
        template.render(&RenderInput::new(strings, data).with_globals(&self.globals))
    }

    /// Render the named template, filling `{%input}` fields from `form`.
    pub fn render_with_form(
        &self,
        name: &str,
        strings: &LocaleStrings,
        data: &TemplateContext,
        form: &FormData,
    ) -> TemplateResult<String> {
        let template = self.template(name)?;
        let input = RenderInput::new(strings, data)
            .with_globals(&self.globals)
            .with_form(form);
        template.render(&input)
    }

    /// Drop the cached tree for `name`; the next use reloads it.
    pub fn invalidate(&self, name: &str) -> bool {
        let removed = self
            .cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some();
        if removed {
            debug!(template = name, "template invalidated");
        }
        removed
    }

    pub fn clear_cache(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn cached_count(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
