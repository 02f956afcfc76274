// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Tree transformations.
//!
//! A document goes through three stages after parsing:
//!
//! 1. **Prepare** ([`prepare`]): block markup becomes [`NodeKind::Block`]
//!    nodes and aggregate attributes become [`NodeKind::Aggregate`] nodes.
//! 2. **Transform** ([`transform`]): imported elements and `extends` tags are
//!    replaced by the templates they reference, merged with the values the
//!    current template supplies (see [`merge`]).
//! 3. **Finalize** ([`finalize::finalize`]): leftover `injected()` calls become
//!    `false`, echo tags and directives become host code.
//!
//! Templates referenced by a document are obtained through a [`LoadFn`] that
//! returns them already prepared and transformed, so every merge works on a
//! fully resolved parent.

pub mod claims;
pub mod define;
pub mod extends;
pub mod finalize;
pub mod imports;
pub mod merge;

pub use claims::{BlockClaims, Claim, QuotedPart, QuotedValue};
pub use imports::Import;

use crate::ast::{Ast, Document, NodeId, NodeKind, Value};
use crate::config::CompilerConfig;
use crate::error::Result;

/// Loads a referenced template, prepared and transformed.
pub type LoadFn<'a> = dyn FnMut(&str) -> Result<Document> + 'a;

/// Runs the prepare passes.
pub fn prepare(doc: &mut Document, config: &CompilerConfig) -> Result<()> {
    define::define_blocks(&mut doc.ast, doc.root, config)?;
    define::define_attributes(&mut doc.ast, doc.root, config)
}

/// Resolves imports, then `extends` tags.
pub fn transform(doc: &mut Document, config: &CompilerConfig, load: &mut LoadFn<'_>) -> Result<()> {
    imports::resolve_imports(&mut doc.ast, doc.root, config, load)?;
    extends::resolve_extends(&mut doc.ast, doc.root, config, load)
}

/// Name of a tag node.
pub(crate) fn tag_name(ast: &Ast, id: NodeId) -> Option<&str> {
    match ast.kind(id) {
        NodeKind::Tag { name, .. } => Some(name),
        _ => None,
    }
}

/// Unquoted literal value of a tag attribute.
pub(crate) fn attr_value(ast: &Ast, tag: NodeId, attribute: &str) -> Option<String> {
    let NodeKind::Tag { attrs, .. } = ast.kind(tag) else {
        return None;
    };
    attrs.iter().find_map(|id| match ast.kind(*id) {
        NodeKind::Attr {
            name: Value::Text(name),
            value: Value::Text(value),
        } if name == attribute => Some(claims::split_quotes(value).1.to_string()),
        _ => None,
    })
}

/// Human readable location of a node for transform errors.
pub(crate) fn location(ast: &Ast, id: NodeId) -> String {
    let context = ast.context(id);
    format!(
        "{}:{}",
        context.path.as_deref().unwrap_or("<source>"),
        context.line
    )
}
