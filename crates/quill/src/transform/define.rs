// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Prepare passes: turn block and aggregate markup into dedicated nodes.

use super::claims::{split_quotes, PARENT_BLOCK};
use crate::ast::{AggregatePattern, Ast, NodeId, NodeKind, Value};
use crate::config::CompilerConfig;
use crate::error::Result;

/// Converts block markup into [`NodeKind::Block`] nodes:
///
/// - `<block:name>…</block:name>` (and the other configured prefixes)
/// - `${name}` and `${name|default}`
/// - the bare `@parent` directive
pub fn define_blocks(ast: &mut Ast, root: NodeId, config: &CompilerConfig) -> Result<()> {
    ast.walk_post(root, &mut |ast, id| {
        let block = match ast.kind(id) {
            NodeKind::Tag { name, children, .. } => config.block_name(name).map(|block| NodeKind::Block {
                name: Some(block.to_string()),
                children: children.clone(),
            }),
            NodeKind::Inline { name, value } => {
                let (name, value) = (name.clone(), value.clone());
                let context = ast.context(id).clone();
                let children = value
                    .map(|text| vec![ast.add(NodeKind::Raw { text }, context)])
                    .unwrap_or_default();
                Some(NodeKind::Block {
                    name: Some(name),
                    children,
                })
            }
            NodeKind::Directive { name, body: None, .. } if name == PARENT_BLOCK => Some(NodeKind::Block {
                name: Some(PARENT_BLOCK.to_string()),
                children: Vec::new(),
            }),
            _ => None,
        };

        if let Some(block) = block {
            ast.replace(id, block);
        }
        Ok(())
    })
}

/// Converts the aggregate attribute (`attr:aggregate="prefix:x-"`) into a
/// [`NodeKind::Aggregate`] node.
pub fn define_attributes(ast: &mut Ast, root: NodeId, config: &CompilerConfig) -> Result<()> {
    ast.walk_post(root, &mut |ast, id| {
        let pattern = match ast.kind(id) {
            NodeKind::Attr {
                name: Value::Text(name),
                value,
            } if name.eq_ignore_ascii_case(&config.aggregate_attribute) => match value {
                Value::Nil => AggregatePattern::All,
                Value::Text(text) => AggregatePattern::parse(split_quotes(text).1),
                Value::Node(_) => return Ok(()),
            },
            _ => return Ok(()),
        };

        ast.replace(
            id,
            NodeKind::Aggregate {
                pattern,
                children: Vec::new(),
            },
        );
        Ok(())
    })
}
