/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template loading, parsing and evaluation.

use thiserror::Error;

/// Errors that can occur during template operations.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template source is malformed. No tree is produced.
    ///
    /// `line` and `column` are 1-based; `offset` is the byte offset of the
    /// offending tag.
    #[error("Syntax error in template '{template}' at line {line}, column {column}: {message}")]
    Syntax {
        template: String,
        offset: usize,
        line: usize,
        column: usize,
        message: String,
    },

    /// Rendering failed. No partial output is returned.
    #[error("Evaluation error in template '{template}' at offset {offset}: {kind}")]
    Evaluation {
        template: String,
        offset: usize,
        #[source]
        kind: EvalErrorKind,
    },

    /// No template with this name could be loaded.
    #[error("Template not found: {name}")]
    NotFound { name: String },

    /// I/O error while reading a template.
    #[error("Failed to read template '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid templater configuration.
    #[error("Invalid configuration: {message}")]
    Config { message: String },
}

impl TemplateError {
    /// Byte offset into the template source, for located errors.
    pub fn offset(&self) -> Option<usize> {
        match self {
            TemplateError::Syntax { offset, .. } | TemplateError::Evaluation { offset, .. } => {
                Some(*offset)
            }
            _ => None,
        }
    }

    /// Name of the template the error belongs to, for located errors.
    pub fn template(&self) -> Option<&str> {
        match self {
            TemplateError::Syntax { template, .. } | TemplateError::Evaluation { template, .. } => {
                Some(template)
            }
            TemplateError::NotFound { name } | TemplateError::Io { name, .. } => Some(name),
            TemplateError::Config { .. } => None,
        }
    }

    /// The human-readable message without the location prefix.
    pub fn message(&self) -> String {
        match self {
            TemplateError::Syntax { message, .. } => message.clone(),
            TemplateError::Evaluation { kind, .. } => kind.to_string(),
            other => other.to_string(),
        }
    }
}

/// What went wrong while evaluating a node.
///
/// These are raised by the resolver, the expression evaluator and the
/// standalone renderers; the evaluator attaches the node location and wraps
/// them in [`TemplateError::Evaluation`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalErrorKind {
    #[error("variable not found: {0}")]
    VariableNotFound(String),

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("type mismatch for '{name}': expected {expected}, found {found}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("unknown variable operation '{0}' (expected isset or isempty)")]
    UnknownOperation(String),

    #[error("malformed expression '{0}'")]
    MalformedExpression(String),

    #[error("more than one comparison operator in expression '{0}'")]
    MultipleOperators(String),

    #[error("malformed foreach statement '{0}' (expected 'item in collection')")]
    MalformedForEach(String),

    #[error("input field is missing the mandatory name attribute")]
    MissingInputName,
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;
