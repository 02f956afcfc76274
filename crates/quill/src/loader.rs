// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Template loading.
//!
//! The compiler never touches the filesystem. A [`Loader`] maps the paths used
//! by `extends` and import tags to template source; [`MemoryLoader`] keeps
//! templates in a shared map.

use crate::error::{QuillError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// A template returned by a loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTemplate {
    /// Canonical path, used in errors and source maps.
    pub path: String,
    /// Template source.
    pub source: String,
}

/// Provides template source by path.
pub trait Loader: Send + Sync {
    /// Loads the template at `path`.
    fn load(&self, path: &str) -> Result<ResolvedTemplate>;

    /// True when `path` can be loaded.
    fn exists(&self, path: &str) -> bool {
        self.load(path).is_ok()
    }
}

impl<L: Loader + ?Sized> Loader for Arc<L> {
    fn load(&self, path: &str) -> Result<ResolvedTemplate> {
        (**self).load(path)
    }
}

/// Templates kept in memory. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    templates: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryLoader {
    /// Creates an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    fn templates(&self) -> Result<MutexGuard<'_, HashMap<String, String>>> {
        self.templates
            .lock()
            .map_err(|_| QuillError::Loader("Template store lock poisoned".to_string()))
    }

    /// Adds or replaces a template.
    pub fn add_template(&self, path: &str, source: impl Into<String>) -> Result<()> {
        self.templates()?.insert(path.to_string(), source.into());
        Ok(())
    }

    /// Adds a template, builder style.
    pub fn with_template(self, path: &str, source: impl Into<String>) -> Result<Self> {
        self.add_template(path, source)?;
        Ok(self)
    }

    /// Removes a template.
    pub fn remove_template(&self, path: &str) -> Result<()> {
        self.templates()?.remove(path);
        Ok(())
    }

    /// Stored paths, sorted.
    pub fn paths(&self) -> Result<Vec<String>> {
        let mut paths: Vec<String> = self.templates()?.keys().cloned().collect();
        paths.sort();
        Ok(paths)
    }
}

impl Loader for MemoryLoader {
    fn load(&self, path: &str) -> Result<ResolvedTemplate> {
        let templates = self.templates()?;
        match templates.get(path) {
            Some(source) => Ok(ResolvedTemplate {
                path: path.to_string(),
                source: source.clone(),
            }),
            None => Err(QuillError::Loader(format!("Template `{}` not found", path))),
        }
    }

    fn exists(&self, path: &str) -> bool {
        self.templates().map(|t| t.contains_key(path)).unwrap_or(false)
    }
}
