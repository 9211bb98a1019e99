/*
 * loader.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template source loading.
//!
//! A [`TemplateLoader`] turns a template name into source text. The
//! filesystem loader follows the `{basedir}/{name}.{extension}` convention;
//! the memory loader serves templates bundled into the application.

use crate::config::TemplaterConfig;
use crate::error::{TemplateError, TemplateResult};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Default directory templates are loaded from.
pub const DEFAULT_TEMPLATE_DIR: &str = "templates";

/// Default template file extension.
pub const DEFAULT_EXTENSION: &str = "tpl";

/// Trait for loading template source by name.
pub trait TemplateLoader {
    /// Load the source text of the named template.
    ///
    /// # Returns
    /// The template source, [`TemplateError::NotFound`] when no such template
    /// exists, or [`TemplateError::Io`] when it exists but cannot be read.
    fn load(&self, name: &str) -> TemplateResult<String>;
}

/// Loader that reads `{basedir}/{name}.{extension}` from disk.
///
/// Names may contain `/` to reach subdirectories, but never leave `basedir`:
/// absolute names and `..` components are treated as not found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemLoader {
    basedir: PathBuf,
    extension: String,
}

impl Default for FileSystemLoader {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE_DIR, DEFAULT_EXTENSION)
    }
}

impl FileSystemLoader {
    pub fn new(basedir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            basedir: basedir.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn from_config(config: &TemplaterConfig) -> Self {
        Self::new(config.template_dir.clone(), config.extension.clone())
    }

    pub fn basedir(&self) -> &Path {
        &self.basedir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Path a template name maps to, or `None` if the name would escape the
    /// base directory.
    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        if name.is_empty()
            || !relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)))
        {
            return None;
        }

        let mut file_name = name.to_string();
        if !self.extension.is_empty() {
            file_name.push('.');
            file_name.push_str(&self.extension);
        }
        Some(self.basedir.join(file_name))
    }
}

impl TemplateLoader for FileSystemLoader {
    fn load(&self, name: &str) -> TemplateResult<String> {
        let not_found = || TemplateError::NotFound {
            name: name.to_string(),
        };
        let path = self.path_for(name).ok_or_else(not_found)?;

        match std::fs::read_to_string(&path) {
            Ok(source) => {
                tracing::debug!(template = name, path = %path.display(), "loaded template");
                Ok(source)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found()),
            Err(source) => Err(TemplateError::Io {
                name: name.to_string(),
                source,
            }),
        }
    }
}

/// Loader that serves templates from an in-memory map.
///
/// Useful for testing and for applications that bundle their templates.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    templates: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template. Replaces any existing template of the same name.
    pub fn add(&mut self, name: impl Into<String>, source: impl Into<String>) -> &mut Self {
        self.templates.insert(name.into(), source.into());
        self
    }

    pub fn with_templates(
        templates: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        let mut loader = Self::new();
        for (name, source) in templates {
            loader.add(name, source);
        }
        loader
    }
}

impl TemplateLoader for MemoryLoader {
    fn load(&self, name: &str) -> TemplateResult<String> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_path_for_default_convention() {
        let loader = FileSystemLoader::default();
        assert_eq!(
            loader.path_for("index"),
            Some(PathBuf::from("templates/index.tpl"))
        );
        assert_eq!(
            loader.path_for("forms/login"),
            Some(PathBuf::from("templates/forms/login.tpl"))
        );
    }

    #[test]
    fn test_extension_leading_dot_is_ignored() {
        let loader = FileSystemLoader::new("/srv/views", ".html");
        assert_eq!(loader.extension(), "html");
        assert_eq!(
            loader.path_for("page"),
            Some(PathBuf::from("/srv/views/page.html"))
        );
    }

    #[test]
    fn test_path_for_rejects_escaping_names() {
        let loader = FileSystemLoader::default();
        assert_eq!(loader.path_for(""), None);
        assert_eq!(loader.path_for("../secret"), None);
        assert_eq!(loader.path_for("a/../../b"), None);
        assert_eq!(loader.path_for("/etc/passwd"), None);
    }

    #[test]
    fn test_filesystem_load() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("hello.tpl"), "Hello {%?name}").unwrap();
        let loader = FileSystemLoader::new(dir.path(), "tpl");

        assert_eq!(loader.load("hello").unwrap(), "Hello {%?name}");
        assert!(matches!(
            loader.load("missing"),
            Err(TemplateError::NotFound { name }) if name == "missing"
        ));
        assert!(matches!(
            loader.load("../hello"),
            Err(TemplateError::NotFound { .. })
        ));
    }

    #[test]
    fn test_memory_loader() {
        let mut loader = MemoryLoader::new();
        loader.add("header", "<h1>{%!title}</h1>");

        assert_eq!(loader.load("header").unwrap(), "<h1>{%!title}</h1>");
        assert!(matches!(
            loader.load("footer"),
            Err(TemplateError::NotFound { .. })
        ));
    }

    #[test]
    fn test_memory_loader_with_templates() {
        let loader = MemoryLoader::with_templates([("a", "content a"), ("b", "content b")]);
        assert_eq!(loader.load("a").unwrap(), "content a");
        assert_eq!(loader.load("b").unwrap(), "content b");
    }
}
