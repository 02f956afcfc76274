// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Values supplied to a merged template.
//!
//! An extending template and a tag using an imported element both hand
//! values to the template they merge with: attributes, `<block:name>`
//! children and (for imports) the remaining children as `context`. Each value
//! is a [`Claim`] stored under its block name in [`BlockClaims`].

use crate::ast::{Ast, Context, NodeId, NodeKind, Value};
use std::collections::HashSet;

/// Block name that refers to the content being overridden.
pub const PARENT_BLOCK: &str = "parent";

/// Block name receiving the children of an imported element's tag.
pub const CONTEXT_BLOCK: &str = "context";

/// One piece of a quoted attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotedPart {
    /// Literal text.
    Text(String),
    /// A dynamic node (output, host code, block...).
    Node(NodeId),
}

/// An attribute value with its surrounding quotes removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotedValue {
    /// The quote character that surrounded the value, if any.
    pub quote: Option<char>,
    /// Text and nodes between the quotes.
    pub parts: Vec<QuotedPart>,
}

impl QuotedValue {
    /// True when every part is literal text.
    pub fn is_literal(&self) -> bool {
        self.parts.iter().all(|p| matches!(p, QuotedPart::Text(_)))
    }

    /// Concatenated text of a literal value.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                QuotedPart::Text(t) => Some(t.as_str()),
                QuotedPart::Node(_) => None,
            })
            .collect()
    }
}

/// A value supplied for a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// An attribute without value (`<x disabled>`).
    Nil,
    /// A quoted attribute value.
    Quoted(QuotedValue),
    /// An attribute that can only be copied as a whole.
    Attr(NodeId),
    /// Block content.
    Nodes(Vec<NodeId>),
}

/// Claims by block name, in the order they were supplied.
///
/// A name is *claimed* once a block or aggregate consumed it; aggregates only
/// take names nothing else claimed.
#[derive(Debug, Clone, Default)]
pub struct BlockClaims {
    entries: Vec<(String, Claim)>,
    claimed: HashSet<String>,
}

impl BlockClaims {
    /// Creates an empty claim set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a claim. The first claim for a name wins.
    pub fn insert(&mut self, name: impl Into<String>, claim: Claim) {
        let name = name.into();
        if self.get(&name).is_none() {
            self.entries.push((name, claim));
        }
    }

    /// Returns the claim for `name` without consuming it.
    pub fn get(&self, name: &str) -> Option<&Claim> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    /// True when a claim was supplied for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Marks `name` as consumed.
    pub fn claim(&mut self, name: &str) {
        self.claimed.insert(name.to_string());
    }

    /// True when `name` was consumed.
    pub fn is_claimed(&self, name: &str) -> bool {
        self.claimed.contains(name)
    }

    /// Names supplied but not consumed yet, in supply order.
    pub fn unclaimed(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(n, _)| !self.claimed.contains(n))
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Every supplied name, in supply order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Number of supplied names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was supplied.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds the claim an attribute node supplies.
    ///
    /// Attributes whose name is not plain text (`<x {{ $attrs }}>`) are only
    /// useful to aggregates; they are stored under a generated name.
    pub fn insert_attr(&mut self, ast: &Ast, attr: NodeId) {
        let NodeKind::Attr { name, value } = ast.kind(attr) else {
            return;
        };
        match name {
            Value::Text(name) => {
                let claim = claim_value(ast, attr, value);
                self.insert(name.clone(), claim);
            }
            _ => {
                let generated = format!("#{}", self.len());
                self.insert(generated, Claim::Attr(attr));
            }
        }
    }
}

fn claim_value(ast: &Ast, attr: NodeId, value: &Value) -> Claim {
    match value {
        Value::Nil => Claim::Nil,
        Value::Text(text) => {
            let (quote, inner) = split_quotes(text);
            Claim::Quoted(QuotedValue {
                quote,
                parts: vec![QuotedPart::Text(inner.to_string())],
            })
        }
        Value::Node(id) => match quoted_parts(ast, *id) {
            Some(quoted) => Claim::Quoted(quoted),
            None => Claim::Attr(attr),
        },
    }
}

/// Splits `"text"` into the quote and `text`.
pub fn split_quotes(text: &str) -> (Option<char>, &str) {
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return (Some(quote), &text[1..text.len() - 1]);
        }
    }
    (None, text)
}

/// Reads a mixin or verbatim value whose first and last raw parts carry
/// matching quotes.
fn quoted_parts(ast: &Ast, id: NodeId) -> Option<QuotedValue> {
    let (NodeKind::Mixin { children } | NodeKind::Verbatim { children }) = ast.kind(id) else {
        return None;
    };

    let first = children.first()?;
    let last = children.last()?;
    let NodeKind::Raw { text: head } = ast.kind(*first) else {
        return None;
    };
    let NodeKind::Raw { text: tail } = ast.kind(*last) else {
        return None;
    };

    let quote = head.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    if !tail.ends_with(quote) || (first == last && head.len() < 2) {
        return None;
    }

    let mut parts = Vec::new();
    for (i, child) in children.iter().enumerate() {
        match ast.kind(*child) {
            NodeKind::Raw { text } => {
                let mut text = text.as_str();
                if i == 0 {
                    text = &text[quote.len_utf8()..];
                }
                if i == children.len() - 1 {
                    text = &text[..text.len() - quote.len_utf8()];
                }
                if !text.is_empty() {
                    parts.push(QuotedPart::Text(text.to_string()));
                }
            }
            _ => parts.push(QuotedPart::Node(*child)),
        }
    }

    Some(QuotedValue {
        quote: Some(quote),
        parts,
    })
}

/// True when the claim still holds a block that a later merge resolves.
pub fn is_reference(ast: &Ast, claim: &Claim) -> bool {
    match claim {
        Claim::Nil => false,
        Claim::Quoted(q) => q.parts.iter().any(|p| match p {
            QuotedPart::Node(id) => ast.contains_block(*id),
            QuotedPart::Text(_) => false,
        }),
        Claim::Attr(id) => ast.contains_block(*id),
        Claim::Nodes(ids) => ids.iter().any(|id| ast.contains_block(*id)),
    }
}

/// Fresh copies of the claim's content, ready to become block children.
pub fn claim_nodes(ast: &mut Ast, claim: &Claim, context: &Context) -> Vec<NodeId> {
    match claim {
        Claim::Nil => Vec::new(),
        Claim::Quoted(q) => q
            .parts
            .iter()
            .map(|p| match p {
                QuotedPart::Text(t) => ast.add(NodeKind::Raw { text: t.clone() }, context.clone()),
                QuotedPart::Node(id) => ast.deep_clone(*id),
            })
            .collect(),
        Claim::Attr(id) => match ast.kind(*id).clone() {
            NodeKind::Attr {
                value: Value::Node(value),
                ..
            } => vec![ast.deep_clone(value)],
            NodeKind::Attr {
                value: Value::Text(text),
                ..
            } => vec![ast.add(NodeKind::Raw { text }, context.clone())],
            _ => Vec::new(),
        },
        Claim::Nodes(ids) => ids.iter().map(|id| ast.deep_clone(*id)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(ast: &mut Ast, text: &str) -> NodeId {
        ast.add(NodeKind::Raw { text: text.to_string() }, Context::default())
    }

    fn attr(ast: &mut Ast, name: Value, value: Value) -> NodeId {
        ast.add(NodeKind::Attr { name, value }, Context::default())
    }

    #[test]
    fn test_first_claim_wins() {
        let mut claims = BlockClaims::new();
        claims.insert("a", Claim::Nil);
        claims.insert("a", Claim::Nodes(vec![]));
        assert_eq!(claims.get("a"), Some(&Claim::Nil));
        assert_eq!(claims.len(), 1);
    }

    #[test]
    fn test_unclaimed_keeps_order() {
        let mut claims = BlockClaims::new();
        claims.insert("b", Claim::Nil);
        claims.insert("a", Claim::Nil);
        claims.insert("c", Claim::Nil);
        claims.claim("a");
        assert_eq!(claims.unclaimed(), vec!["b".to_string(), "c".to_string()]);
        assert!(claims.is_claimed("a"));
    }

    #[test]
    fn test_text_attribute_is_quoted() {
        let mut ast = Ast::new();
        let id = attr(&mut ast, Value::Text("href".into()), Value::Text("\"google.com\"".into()));
        let mut claims = BlockClaims::new();
        claims.insert_attr(&ast, id);
        let Some(Claim::Quoted(q)) = claims.get("href") else {
            panic!("Expected quoted claim");
        };
        assert_eq!(q.quote, Some('"'));
        assert!(q.is_literal());
        assert_eq!(q.text(), "google.com");
    }

    #[test]
    fn test_mixin_attribute_strips_quotes() {
        let mut ast = Ast::new();
        let head = raw(&mut ast, "\"hello ");
        let output = ast.add(
            NodeKind::Output {
                body: "$x".into(),
                raw: false,
            },
            Context::default(),
        );
        let tail = raw(&mut ast, "\"");
        let mixin = ast.add(
            NodeKind::Mixin {
                children: vec![head, output, tail],
            },
            Context::default(),
        );
        let id = attr(&mut ast, Value::Text("value".into()), Value::Node(mixin));

        let mut claims = BlockClaims::new();
        claims.insert_attr(&ast, id);
        assert_eq!(
            claims.get("value"),
            Some(&Claim::Quoted(QuotedValue {
                quote: Some('"'),
                parts: vec![QuotedPart::Text("hello ".into()), QuotedPart::Node(output)],
            }))
        );
    }

    #[test]
    fn test_unquoted_mixin_is_attr_claim() {
        let mut ast = Ast::new();
        let php = ast.add(
            NodeKind::Php {
                content: "<?='red'?>".into(),
                tokens: vec![],
            },
            Context::default(),
        );
        let mixin = ast.add(NodeKind::Mixin { children: vec![php] }, Context::default());
        let id = attr(&mut ast, Value::Text("class".into()), Value::Node(mixin));
        let unnamed = attr(&mut ast, Value::Node(mixin), Value::Nil);

        let mut claims = BlockClaims::new();
        claims.insert_attr(&ast, id);
        claims.insert_attr(&ast, unnamed);
        assert_eq!(claims.get("class"), Some(&Claim::Attr(id)));
        assert_eq!(claims.get("#1"), Some(&Claim::Attr(unnamed)));
    }

    #[test]
    fn test_reference_detection() {
        let mut ast = Ast::new();
        let block = ast.add(
            NodeKind::Block {
                name: Some("x".into()),
                children: vec![],
            },
            Context::default(),
        );
        let text = raw(&mut ast, "a");
        assert!(is_reference(&ast, &Claim::Nodes(vec![text, block])));
        assert!(!is_reference(&ast, &Claim::Nodes(vec![text])));
        assert!(!is_reference(&ast, &Claim::Nil));
    }

    #[test]
    fn test_split_quotes() {
        assert_eq!(split_quotes("\"a\""), (Some('"'), "a"));
        assert_eq!(split_quotes("'a'"), (Some('\''), "a"));
        assert_eq!(split_quotes("a"), (None, "a"));
        assert_eq!(split_quotes("\""), (None, "\""));
    }
}
