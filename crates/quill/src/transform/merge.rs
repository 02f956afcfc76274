// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Claim injection into a merged template.
//!
//! Merging runs three passes over the imported subtree:
//!
//! 1. **Blocks**: every named block with a claim receives a copy of the
//!    claimed content. Inside that copy, `parent` blocks receive the content
//!    being overridden.
//! 2. **Attributes**: aggregates turn claims no block consumed into
//!    attributes.
//! 3. **Host code**: `inject('name')` calls become the claimed value as a PHP
//!    expression and `injected('name')` calls become `true`.
//!
//! Every block is substituted at most once per merge, so self-referencing
//! `parent` chains terminate.

use super::claims::{claim_nodes, is_reference, BlockClaims, Claim, QuotedPart, PARENT_BLOCK};
use crate::ast::{Ast, NodeId, NodeKind, Value};
use crate::config::CompilerConfig;
use crate::error::Result;
use crate::host;
use crate::parser::split_values;
use std::ops::Range;
use tracing::trace;

/// Applies `claims` to the subtree at `root`.
pub fn merge(ast: &mut Ast, root: NodeId, claims: &mut BlockClaims, config: &CompilerConfig) -> Result<()> {
    inject_blocks(ast, root, claims, config)?;
    inject_attributes(ast, root, claims)?;
    inject_php(ast, root, claims, config)
}

/// Replaces the content of claimed blocks.
pub fn inject_blocks(ast: &mut Ast, root: NodeId, claims: &mut BlockClaims, config: &CompilerConfig) -> Result<()> {
    ast.walk_post(root, &mut |ast, id| {
        let NodeKind::Block {
            name: Some(name),
            children: original,
        } = ast.kind(id)
        else {
            return Ok(());
        };
        let Some(claim) = claims.get(name).cloned() else {
            return Ok(());
        };
        let (name, original) = (name.clone(), original.clone());

        trace!(block = %name, "inject block");
        claims.claim(&name);
        let context = ast.context(id).clone();
        let content = claim_nodes(ast, &claim, &context);

        if name != PARENT_BLOCK {
            let mut parent = BlockClaims::new();
            parent.insert(PARENT_BLOCK, Claim::Nodes(original));
            for node in &content {
                inject_blocks(ast, *node, &mut parent, config)?;
                inject_php(ast, *node, &parent, config)?;
            }
        }

        if let Some(children) = ast.children_mut(id) {
            *children = content;
        }
        Ok(())
    })
}

/// Fills aggregates with attributes built from unclaimed names.
pub fn inject_attributes(ast: &mut Ast, root: NodeId, claims: &mut BlockClaims) -> Result<()> {
    ast.walk_post(root, &mut |ast, id| {
        let NodeKind::Aggregate { pattern, .. } = ast.kind(id) else {
            return Ok(());
        };
        let pattern = pattern.clone();

        for name in claims.unclaimed() {
            let Some(alias) = pattern.accepts(&name) else {
                continue;
            };
            let Some(claim) = claims.get(&name).cloned() else {
                continue;
            };
            trace!(name = %name, alias = %alias, "inject attribute");
            claims.claim(&name);

            let attr = build_attr(ast, id, &alias, &claim);
            ast.push_child(id, attr)?;
        }
        Ok(())
    })
}

fn build_attr(ast: &mut Ast, aggregate: NodeId, alias: &str, claim: &Claim) -> NodeId {
    let context = ast.context(aggregate).clone();
    let value = match claim {
        Claim::Nil => Value::Nil,
        Claim::Attr(attr) => {
            let copy = ast.deep_clone(*attr);
            if let NodeKind::Attr {
                name: name @ Value::Text(_),
                ..
            } = ast.kind_mut(copy)
            {
                *name = Value::Text(alias.to_string());
            }
            return copy;
        }
        Claim::Quoted(quoted) if quoted.is_literal() => {
            let quote = quoted.quote.map(String::from).unwrap_or_default();
            Value::Text(format!("{}{}{}", quote, quoted.text(), quote))
        }
        Claim::Quoted(quoted) => {
            let quote = quoted.quote.map(String::from).unwrap_or_default();
            let mut children = Vec::new();
            if !quote.is_empty() {
                children.push(ast.add(NodeKind::Raw { text: quote.clone() }, context.clone()));
            }
            for part in &quoted.parts {
                children.push(match part {
                    QuotedPart::Text(text) => ast.add(NodeKind::Raw { text: text.clone() }, context.clone()),
                    QuotedPart::Node(node) => ast.deep_clone(*node),
                });
            }
            if !quote.is_empty() {
                children.push(ast.add(NodeKind::Raw { text: quote }, context.clone()));
            }
            Value::Node(ast.add(NodeKind::Mixin { children }, context.clone()))
        }
        Claim::Nodes(nodes) => {
            let mut children = vec![ast.add(NodeKind::Raw { text: "\"".into() }, context.clone())];
            children.extend(nodes.iter().map(|n| ast.deep_clone(*n)));
            children.push(ast.add(NodeKind::Raw { text: "\"".into() }, context.clone()));
            Value::Node(ast.add(NodeKind::Mixin { children }, context.clone()))
        }
    };

    ast.add(
        NodeKind::Attr {
            name: Value::Text(alias.to_string()),
            value,
        },
        context,
    )
}

/// Resolves `inject()` / `injected()` calls in host code, echo bodies and
/// directive bodies.
pub fn inject_php(ast: &mut Ast, root: NodeId, claims: &BlockClaims, config: &CompilerConfig) -> Result<()> {
    let inject = config.macros.inject.as_str();
    let injected = config.macros.injected.as_str();

    ast.walk_post(root, &mut |ast, id| {
        let code = match ast.kind(id) {
            NodeKind::Php { content, .. } => content.clone(),
            NodeKind::Output { body, .. } => body.clone(),
            NodeKind::Directive { body: Some(body), .. } => body.clone(),
            _ => return Ok(()),
        };
        if !mentions(&code, inject) && !mentions(&code, injected) {
            return Ok(());
        }

        let is_php = matches!(ast.kind(id), NodeKind::Php { .. });
        let tokens = if is_php {
            host::tokenize(&code)
        } else {
            host::tokenize_code(&code)
        };

        let mut edits: Vec<(Range<usize>, String)> = Vec::new();
        for call in host::find_macro_calls(&tokens, inject) {
            let Some(claim) = call.name.as_deref().and_then(|name| claims.get(name)) else {
                continue;
            };
            if is_reference(ast, claim) {
                trace!(name = ?call.name, "inject deferred, value still references a block");
                continue;
            }
            match flatten_claim(ast, claim) {
                Some(expression) => edits.push((call.span, expression)),
                None => trace!(name = ?call.name, "inject skipped, value is not an expression"),
            }
        }
        for call in host::find_macro_calls(&tokens, injected) {
            let claimed = call.name.as_deref().is_some_and(|name| claims.contains(name));
            if claimed && !overlaps(&edits, &call.span) {
                edits.push((call.span, "true".to_string()));
            }
        }

        if edits.is_empty() {
            return Ok(());
        }
        let code = host::splice(&code, edits);
        rewrite_code(ast, id, code);
        Ok(())
    })
}

/// Case-insensitive substring test, a cheap filter before tokenizing.
pub(crate) fn mentions(code: &str, name: &str) -> bool {
    code.to_ascii_lowercase().contains(&name.to_ascii_lowercase())
}

pub(crate) fn overlaps(edits: &[(Range<usize>, String)], span: &Range<usize>) -> bool {
    edits
        .iter()
        .any(|(range, _)| range.start < span.end && span.start < range.end)
}

/// Stores rewritten code back into a host-code, echo or directive node.
pub(crate) fn rewrite_code(ast: &mut Ast, id: NodeId, code: String) {
    match ast.kind_mut(id) {
        NodeKind::Php { content, tokens } => {
            *tokens = host::tokenize(&code);
            *content = code;
        }
        NodeKind::Output { body, .. } => *body = code,
        NodeKind::Directive { body, values, .. } => {
            *values = split_values(&code);
            *body = Some(code);
        }
        _ => {}
    }
}

/// Renders a claim as a PHP expression.
fn flatten_claim(ast: &Ast, claim: &Claim) -> Option<String> {
    match claim {
        Claim::Nil => Some("true".to_string()),
        Claim::Quoted(quoted) => {
            let parts = quoted
                .parts
                .iter()
                .map(|part| match part {
                    QuotedPart::Text(text) => Some(host::export_literal(text)),
                    QuotedPart::Node(node) => flatten_node(ast, *node),
                })
                .collect::<Option<Vec<_>>>()?;
            Some(concat(parts))
        }
        Claim::Attr(attr) => match ast.kind(*attr) {
            NodeKind::Attr { value, .. } => match value {
                Value::Nil => Some("true".to_string()),
                Value::Text(text) => Some(host::export_literal(text)),
                Value::Node(node) => flatten_node(ast, *node),
            },
            _ => None,
        },
        Claim::Nodes(nodes) => flatten_list(ast, nodes),
    }
}

fn flatten_list(ast: &Ast, nodes: &[NodeId]) -> Option<String> {
    let parts = nodes
        .iter()
        .map(|node| flatten_node(ast, *node))
        .collect::<Option<Vec<_>>>()?;
    Some(concat(parts))
}

fn flatten_node(ast: &Ast, id: NodeId) -> Option<String> {
    match ast.kind(id) {
        NodeKind::Raw { text } => Some(host::export_literal(text)),
        NodeKind::Output { body, .. } => Some(body.trim().to_string()),
        NodeKind::Php { tokens, .. } => Some(host::strip_php_block(tokens)),
        NodeKind::Mixin { children }
        | NodeKind::Verbatim { children }
        | NodeKind::Template { children }
        | NodeKind::Block { children, .. } => flatten_list(ast, children),
        _ => None,
    }
}

fn concat(parts: Vec<String>) -> String {
    if parts.is_empty() {
        return "''".to_string();
    }
    parts.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AggregatePattern, Context};
    use crate::transform::claims::QuotedValue;

    fn raw(ast: &mut Ast, text: &str) -> NodeId {
        ast.add(NodeKind::Raw { text: text.to_string() }, Context::default())
    }

    fn block(ast: &mut Ast, name: &str, children: Vec<NodeId>) -> NodeId {
        ast.add(
            NodeKind::Block {
                name: Some(name.to_string()),
                children,
            },
            Context::default(),
        )
    }

    fn texts(ast: &Ast, id: NodeId) -> String {
        match ast.kind(id) {
            NodeKind::Raw { text } => text.clone(),
            _ => ast.children(id).iter().map(|c| texts(ast, *c)).collect(),
        }
    }

    #[test]
    fn test_block_with_parent() {
        let config = CompilerConfig::default();
        let mut ast = Ast::new();
        let default = raw(&mut ast, "b");
        let target = block(&mut ast, "c", vec![default]);
        let root = ast.add(NodeKind::Template { children: vec![target] }, Context::default());

        let a = raw(&mut ast, "a");
        let parent = block(&mut ast, PARENT_BLOCK, vec![]);
        let mut claims = BlockClaims::new();
        claims.insert("c", Claim::Nodes(vec![a, parent]));

        merge(&mut ast, root, &mut claims, &config).expect("merge");
        assert_eq!(texts(&ast, root), "ab");
        assert!(claims.is_claimed("c"));
    }

    #[test]
    fn test_unclaimed_block_keeps_default() {
        let config = CompilerConfig::default();
        let mut ast = Ast::new();
        let default = raw(&mut ast, "default");
        let target = block(&mut ast, "title", vec![default]);
        let root = ast.add(NodeKind::Template { children: vec![target] }, Context::default());

        merge(&mut ast, root, &mut BlockClaims::new(), &config).expect("merge");
        assert_eq!(texts(&ast, root), "default");
    }

    #[test]
    fn test_aggregate_takes_unclaimed() {
        let config = CompilerConfig::default();
        let mut ast = Ast::new();
        let aggregate = ast.add(
            NodeKind::Aggregate {
                pattern: AggregatePattern::Prefix("a-".into()),
                children: vec![],
            },
            Context::default(),
        );
        let root = ast.add(NodeKind::Template { children: vec![aggregate] }, Context::default());

        let mut claims = BlockClaims::new();
        claims.insert(
            "a-style",
            Claim::Quoted(QuotedValue {
                quote: Some('"'),
                parts: vec![QuotedPart::Text("x".into())],
            }),
        );
        claims.insert("href", Claim::Nil);

        merge(&mut ast, root, &mut claims, &config).expect("merge");
        let attrs = ast.children(aggregate);
        assert_eq!(attrs.len(), 1);
        assert_eq!(
            ast.kind(attrs[0]),
            &NodeKind::Attr {
                name: Value::Text("style".into()),
                value: Value::Text("\"x\"".into())
            }
        );
        assert_eq!(claims.unclaimed(), vec!["href".to_string()]);
    }

    #[test]
    fn test_inject_php_literal() {
        let config = CompilerConfig::default();
        let mut ast = Ast::new();
        let output = ast.add(
            NodeKind::Output {
                body: "strtoupper(inject('value', 'x'))".into(),
                raw: false,
            },
            Context::default(),
        );
        let root = ast.add(NodeKind::Template { children: vec![output] }, Context::default());

        let ok = ast.add(
            NodeKind::Output {
                body: " 'OK' ".into(),
                raw: false,
            },
            Context::default(),
        );
        let mut claims = BlockClaims::new();
        claims.insert(
            "value",
            Claim::Quoted(QuotedValue {
                quote: Some('"'),
                parts: vec![QuotedPart::Text("hello ".into()), QuotedPart::Node(ok)],
            }),
        );

        inject_php(&mut ast, root, &claims, &config).expect("inject");
        assert_eq!(
            ast.kind(output),
            &NodeKind::Output {
                body: "strtoupper('hello '.'OK')".into(),
                raw: false
            }
        );
    }

    #[test]
    fn test_inject_php_deferred_for_references() {
        let config = CompilerConfig::default();
        let mut ast = Ast::new();
        let php = ast.add(
            NodeKind::Php {
                content: "<?php echo inject('title'); ?>".into(),
                tokens: host::tokenize("<?php echo inject('title'); ?>"),
            },
            Context::default(),
        );
        let root = ast.add(NodeKind::Template { children: vec![php] }, Context::default());
        let pending = block(&mut ast, "title", vec![]);
        let mut claims = BlockClaims::new();
        claims.insert("title", Claim::Nodes(vec![pending]));

        inject_php(&mut ast, root, &claims, &config).expect("first pass");
        let NodeKind::Php { content, .. } = ast.kind(php) else {
            panic!("Expected php");
        };
        assert_eq!(content, "<?php echo inject('title'); ?>");

        let text = raw(&mut ast, "Home");
        let mut resolved = BlockClaims::new();
        resolved.insert("title", Claim::Nodes(vec![text]));
        inject_php(&mut ast, root, &resolved, &config).expect("second pass");
        let NodeKind::Php { content, .. } = ast.kind(php) else {
            panic!("Expected php");
        };
        assert_eq!(content, "<?php echo 'Home'; ?>");
    }

    #[test]
    fn test_injected_becomes_true() {
        let config = CompilerConfig::default();
        let mut ast = Ast::new();
        let directive = ast.add(
            NodeKind::Directive {
                name: "if".into(),
                body: Some("injected('header') && injected('footer')".into()),
                values: vec![],
            },
            Context::default(),
        );
        let root = ast.add(NodeKind::Template { children: vec![directive] }, Context::default());
        let mut claims = BlockClaims::new();
        claims.insert("header", Claim::Nil);

        inject_php(&mut ast, root, &claims, &config).expect("inject");
        let NodeKind::Directive { body, values, .. } = ast.kind(directive) else {
            panic!("Expected directive");
        };
        assert_eq!(body.as_deref(), Some("true && injected('footer')"));
        assert_eq!(values, &vec!["true && injected('footer')".to_string()]);
    }
}
