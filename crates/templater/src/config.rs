/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Templater configuration.
//!
//! Read from a YAML file such as:
//!
//! ```yaml
//! template-dir: views
//! extension: html
//! globals:
//!   site_name: Example
//!   year: 2025
//! ```
//!
//! Every key is optional.

use crate::context::TemplateContext;
use crate::error::{TemplateError, TemplateResult};
use crate::loader::{DEFAULT_EXTENSION, DEFAULT_TEMPLATE_DIR};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct TemplaterConfig {
    /// Directory templates are loaded from.
    pub template_dir: PathBuf,
    /// Template file extension, without the dot.
    pub extension: String,
    /// Variables available to every render. They take precedence over
    /// per-call data with the same name.
    pub globals: TemplateContext,
}

impl Default for TemplaterConfig {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from(DEFAULT_TEMPLATE_DIR),
            extension: DEFAULT_EXTENSION.to_string(),
            globals: TemplateContext::new(),
        }
    }
}

impl TemplaterConfig {
    pub fn from_yaml_str(yaml: &str) -> TemplateResult<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| TemplateError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> TemplateResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            name: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml).map_err(|e| match e {
            TemplateError::Config { message } => TemplateError::Config {
                message: format!("{}: {}", path.display(), message),
            },
            other => other,
        })
    }

    fn validate(&self) -> TemplateResult<()> {
        if self.extension.trim_start_matches('.').is_empty() {
            return Err(TemplateError::Config {
                message: "extension must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
