// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Element imports.
//!
//! ```text
//! <use:element path="ui/link" as="url"/>   <url href="x">text</url>
//! <use:dir dir="ui" ns="ui"/>              <ui:link href="x">text</ui:link>
//! ```
//!
//! An import applies to the node list it is declared in and everything
//! nested below. A matching tag is replaced by the imported template, merged
//! with the tag's attributes, its `<block:name>` children and the remaining
//! children as `context`.

use super::claims::{BlockClaims, Claim, CONTEXT_BLOCK};
use super::merge::merge;
use super::{attr_value, location, tag_name, LoadFn};
use crate::ast::{Ast, NodeId, NodeKind};
use crate::config::CompilerConfig;
use crate::error::{QuillError, Result};
use tracing::debug;

/// A template made available as a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Import {
    /// One template under an alias.
    Element {
        /// Template path.
        path: String,
        /// Tag name.
        alias: String,
    },
    /// Every template of a directory under a namespace prefix.
    Directory {
        /// Directory path.
        dir: String,
        /// Tag prefix, without the `:`.
        namespace: String,
    },
}

impl Import {
    /// Imports `path`; the alias defaults to the last path segment.
    ///
    /// ```
    /// use quill::transform::Import;
    ///
    /// let import = Import::element("path/to/import", None);
    /// assert_eq!(import.resolve("import").as_deref(), Some("path/to/import"));
    /// ```
    pub fn element(path: &str, alias: Option<&str>) -> Self {
        let alias = match alias {
            Some(alias) => alias.to_string(),
            None => last_segment(path).to_string(),
        };
        Import::Element {
            path: path.to_string(),
            alias,
        }
    }

    /// Imports a directory; the namespace defaults to its last segment.
    pub fn directory(dir: &str, namespace: Option<&str>) -> Self {
        let dir = dir.trim_end_matches('/');
        Import::Directory {
            dir: dir.to_string(),
            namespace: namespace.unwrap_or_else(|| last_segment(dir)).to_string(),
        }
    }

    /// Template path for a tag name, if this import provides it.
    pub fn resolve(&self, tag: &str) -> Option<String> {
        match self {
            Import::Element { path, alias } => (alias == tag).then(|| path.clone()),
            Import::Directory { dir, namespace } => tag
                .strip_prefix(namespace.as_str())
                .and_then(|rest| rest.strip_prefix(':'))
                .filter(|name| !name.is_empty())
                .map(|name| format!("{}/{}", dir, name)),
        }
    }

    /// Reads an import declaration tag. Returns `None` for any other node.
    pub fn from_tag(ast: &Ast, id: NodeId, config: &CompilerConfig) -> Result<Option<Import>> {
        let Some(name) = tag_name(ast, id) else {
            return Ok(None);
        };
        let Some(kind) = name.strip_prefix(config.import_prefix.as_str()) else {
            return Ok(None);
        };

        let required = |attribute: &str| {
            attr_value(ast, id, attribute).ok_or_else(|| {
                QuillError::Transform(format!(
                    "`{}` requires a `{}` attribute at {}",
                    name,
                    attribute,
                    location(ast, id)
                ))
            })
        };

        match kind {
            "element" => {
                let path = required("path")?;
                Ok(Some(Import::element(&path, attr_value(ast, id, "as").as_deref())))
            }
            "dir" => {
                let dir = required("dir")?;
                Ok(Some(Import::directory(&dir, attr_value(ast, id, "ns").as_deref())))
            }
            _ => Err(QuillError::Transform(format!(
                "Unsupported import `{}` at {}",
                name,
                location(ast, id)
            ))),
        }
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Replaces imported element tags below `root`.
pub fn resolve_imports(ast: &mut Ast, root: NodeId, config: &CompilerConfig, load: &mut LoadFn<'_>) -> Result<()> {
    resolve_list(ast, root, config, &[], load)
}

fn resolve_list(
    ast: &mut Ast,
    container: NodeId,
    config: &CompilerConfig,
    outer: &[Import],
    load: &mut LoadFn<'_>,
) -> Result<()> {
    let children = ast.children(container).to_vec();
    if children.is_empty() {
        return Ok(());
    }

    let mut scope = outer.to_vec();
    let mut kept = Vec::with_capacity(children.len());
    for child in &children {
        match Import::from_tag(ast, *child, config)? {
            Some(import) => {
                debug!(import = ?import, "declare import");
                scope.push(import);
            }
            None => kept.push(*child),
        }
    }
    if kept.len() != children.len() {
        if let Some(list) = ast.children_mut(container) {
            *list = kept.clone();
        }
    }

    for child in kept {
        resolve_list(ast, child, config, &scope, load)?;

        let path = tag_name(ast, child).and_then(|name| scope.iter().rev().find_map(|import| import.resolve(name)));
        if let Some(path) = path {
            import_element(ast, child, &path, config, load)?;
        }
    }
    Ok(())
}

fn import_element(
    ast: &mut Ast,
    tag: NodeId,
    path: &str,
    config: &CompilerConfig,
    load: &mut LoadFn<'_>,
) -> Result<()> {
    debug!(path = %path, "import element");
    let context = ast.context(tag).clone();
    let doc = load(path).map_err(|err| QuillError::Import {
        path: path.to_string(),
        offset: context.offset,
        file: context.path.clone(),
        source: Box::new(err),
    })?;

    let mut claims = element_claims(ast, tag);
    let imported = ast.import(&doc.ast, doc.root);
    merge(ast, imported, &mut claims, config)?;

    let children = ast.children(imported).to_vec();
    ast.replace(tag, NodeKind::Template { children });
    Ok(())
}

/// Attributes, child blocks and the remaining children (`context`) of a tag.
fn element_claims(ast: &Ast, tag: NodeId) -> BlockClaims {
    let mut claims = BlockClaims::new();
    let NodeKind::Tag { attrs, children, .. } = ast.kind(tag) else {
        return claims;
    };

    for attr in attrs {
        claims.insert_attr(ast, *attr);
    }

    let mut context = Vec::new();
    for child in children {
        match ast.kind(*child) {
            NodeKind::Block {
                name: Some(name),
                children,
            } => claims.insert(name.clone(), Claim::Nodes(children.clone())),
            _ => context.push(*child),
        }
    }
    if !context.is_empty() {
        claims.insert(CONTEXT_BLOCK, Claim::Nodes(context));
    }
    claims
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_alias() {
        let import = Import::element("path/to/import", None);
        assert_eq!(
            import,
            Import::Element {
                path: "path/to/import".into(),
                alias: "import".into()
            }
        );
        assert_eq!(import.resolve("import").as_deref(), Some("path/to/import"));
        assert_eq!(import.resolve("other"), None);

        let import = Import::element("x", Some("url"));
        assert_eq!(import.resolve("url").as_deref(), Some("x"));
    }

    #[test]
    fn test_directory_namespace() {
        let import = Import::directory("ui/components/", Some("ui"));
        assert_eq!(import.resolve("ui:button").as_deref(), Some("ui/components/button"));
        assert_eq!(import.resolve("ui:"), None);
        assert_eq!(import.resolve("uix:button"), None);

        let import = Import::directory("ui/components", None);
        assert_eq!(import.resolve("components:card").as_deref(), Some("ui/components/card"));
    }
}
