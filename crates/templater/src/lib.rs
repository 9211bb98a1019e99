/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tag-delimited HTML template engine.
//!
//! Templates are plain text with tags written as `{%...}`:
//!
//! - Variables: `{%?name}`, `{%?item[key]}`, `{%?isset|name}`, `{%?isempty|name}`
//! - Localized strings: `{%!key}` (echoed verbatim when the key is unknown)
//! - Form inputs: `{%input name="email" type="email" class="wide"}`
//! - Conditionals: `{%if a == "1"}...{%elseif a > 2}...{%else}...{%/if}`
//! - Loops: `{%foreach item in list}...{%/foreach}`
//!
//! Any other `{%...}` tag, and any unterminated `{%`, is literal text.
//!
//! # Architecture
//!
//! Parsing produces an immutable [`Template`] whose nodes live in an arena.
//! Rendering threads a fresh [`EvalContext`] through the tree, so one parsed
//! template can be rendered from many threads at once. [`Templater`] adds
//! loading by name, a parse cache and template-wide globals on top.
//!
//! # Example
//!
//! ```ignore
//! use templater::{LocaleStrings, MemoryLoader, TemplateContext, Templater};
//!
//! let templater = Templater::new(MemoryLoader::with_templates([(
//!     "greet",
//!     "{%!hello}, {%?name}!",
//! )]));
//!
//! let strings: LocaleStrings = [("hello", "Hello")].into_iter().collect();
//! let mut data = TemplateContext::new();
//! data.insert("name", "World");
//!
//! let output = templater.render("greet", &strings, &data)?;
//! assert_eq!(output, "Hello, World!");
//! ```

pub mod ast;
pub mod config;
pub mod context;
pub mod error;
pub mod eval_context;
pub mod evaluator;
pub mod expression;
pub mod loader;
pub mod parser;
pub mod report;
pub mod resolver;
pub mod source;
pub mod standalone;
pub mod templater;

// Re-export main types at crate root
pub use ast::{Node, NodeArena, NodeId, NodeKind};
pub use config::TemplaterConfig;
pub use context::{FormData, LocaleStrings, TemplateContext, TemplateValue};
pub use error::{EvalErrorKind, TemplateError, TemplateResult};
pub use eval_context::{EvalContext, RenderInput};
pub use loader::{FileSystemLoader, MemoryLoader, TemplateLoader};
pub use parser::Template;
pub use report::render_report;
pub use templater::Templater;
