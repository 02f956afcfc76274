// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Template inheritance.
//!
//! `<extends:layout/>` or `<extends path="layout"/>` replaces the node list it
//! appears in (the whole template at top level, or the enclosing tag) with the
//! parent template. The blocks of that list and the remaining attributes of
//! the `extends` tag are the claims merged into the parent.

use super::claims::{BlockClaims, Claim};
use super::merge::merge;
use super::{attr_value, location, tag_name, LoadFn};
use crate::ast::{Ast, NodeId, NodeKind, Value};
use crate::config::CompilerConfig;
use crate::error::{QuillError, Result};
use tracing::debug;

/// Resolves `extends` tags below `root`.
pub fn resolve_extends(ast: &mut Ast, root: NodeId, config: &CompilerConfig, load: &mut LoadFn<'_>) -> Result<()> {
    let children = ast.children(root).to_vec();
    if let Some(tag) = children.iter().copied().find(|id| is_extends(ast, *id, config)) {
        return extend(ast, root, tag, config, load);
    }

    for child in children {
        resolve_extends(ast, child, config, load)?;
    }
    Ok(())
}

fn is_extends(ast: &Ast, id: NodeId, config: &CompilerConfig) -> bool {
    tag_name(ast, id).is_some_and(|name| {
        name == config.extends_tag
            || name
                .strip_prefix(config.extends_tag.as_str())
                .is_some_and(|rest| rest.starts_with(':'))
    })
}

/// Parent path: `<extends:path/>` or the `path` attribute.
fn parent_path(ast: &Ast, tag: NodeId, config: &CompilerConfig) -> Option<String> {
    let name = tag_name(ast, tag)?;
    match name
        .strip_prefix(config.extends_tag.as_str())
        .and_then(|rest| rest.strip_prefix(':'))
    {
        Some(path) if !path.is_empty() => Some(path.to_string()),
        _ => attr_value(ast, tag, "path"),
    }
}

fn extend(ast: &mut Ast, container: NodeId, tag: NodeId, config: &CompilerConfig, load: &mut LoadFn<'_>) -> Result<()> {
    let path = parent_path(ast, tag, config).ok_or_else(|| {
        QuillError::Transform(format!("`extends` requires a parent path at {}", location(ast, tag)))
    })?;
    debug!(parent = %path, "extend");

    let context = ast.context(tag).clone();
    let doc = load(&path).map_err(|err| QuillError::Extends {
        parent: path.clone(),
        offset: context.offset,
        file: context.path.clone(),
        source: Box::new(err),
    })?;

    let mut claims = extends_claims(ast, container, tag);
    let imported = ast.import(&doc.ast, doc.root);
    merge(ast, imported, &mut claims, config)?;

    let children = ast.children(imported).to_vec();
    ast.replace(container, NodeKind::Template { children });
    Ok(())
}

fn extends_claims(ast: &Ast, container: NodeId, tag: NodeId) -> BlockClaims {
    let mut claims = BlockClaims::new();

    if let NodeKind::Tag { attrs, .. } = ast.kind(tag) {
        for attr in attrs {
            let is_path = matches!(
                ast.kind(*attr),
                NodeKind::Attr { name: Value::Text(name), .. } if name == "path"
            );
            if !is_path {
                claims.insert_attr(ast, *attr);
            }
        }
    }

    for child in ast.children(container) {
        if let NodeKind::Block {
            name: Some(name),
            children,
        } = ast.kind(*child)
        {
            claims.insert(name.clone(), Claim::Nodes(children.clone()));
        }
    }
    claims
}
