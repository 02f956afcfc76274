// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Template syntax tree.
//!
//! Nodes live in an arena ([`Ast`]) and refer to each other through
//! [`NodeId`]s. Transforms rewrite the tree in place by replacing a node's
//! [`NodeKind`]; merging a parent or imported template copies its subtree into
//! the current arena with [`Ast::import`].
//!
//! # Node Types
//!
//! - Markup: [`NodeKind::Tag`], [`NodeKind::Attr`], [`NodeKind::Raw`],
//!   [`NodeKind::Verbatim`]
//! - Dynamic constructs: [`NodeKind::Output`], [`NodeKind::Directive`],
//!   [`NodeKind::Inline`], [`NodeKind::Php`]
//! - Inheritance: [`NodeKind::Block`], [`NodeKind::Aggregate`]
//! - Grouping: [`NodeKind::Template`], [`NodeKind::Mixin`]

use crate::error::{QuillError, Result};
use crate::host::HostToken;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Handle of a node inside an [`Ast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Where a node came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Byte offset of the originating token.
    pub offset: usize,
    /// 1-indexed source line of the originating token.
    pub line: usize,
    /// Path of the template the node was parsed from.
    pub path: Option<String>,
}

/// An attribute name or value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// No value (`<input disabled>`).
    Nil,
    /// Literal text, quotes included for values.
    Text(String),
    /// A node, usually a [`NodeKind::Mixin`] of text and dynamic parts.
    Node(NodeId),
}

impl Value {
    /// Literal text, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// Which unclaimed names an aggregate accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregatePattern {
    /// Every name.
    All,
    /// Names starting with the prefix; the alias has the prefix removed.
    Prefix(String),
    /// Only the listed names.
    Include(Vec<String>),
    /// Every name except the listed ones.
    Exclude(Vec<String>),
}

impl AggregatePattern {
    /// Parses `""`, `prefix:x`, `include:a,b` or `exclude:a,b`.
    pub fn parse(pattern: &str) -> Self {
        let pattern = pattern.trim();
        let list = |rest: &str| -> Vec<String> {
            rest.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };

        if let Some(rest) = pattern.strip_prefix("prefix:") {
            AggregatePattern::Prefix(rest.trim().to_string())
        } else if let Some(rest) = pattern.strip_prefix("include:") {
            AggregatePattern::Include(list(rest))
        } else if let Some(rest) = pattern.strip_prefix("exclude:") {
            AggregatePattern::Exclude(list(rest))
        } else {
            AggregatePattern::All
        }
    }

    /// Returns the attribute name to use when `name` is accepted.
    pub fn accepts(&self, name: &str) -> Option<String> {
        match self {
            AggregatePattern::All => Some(name.to_string()),
            AggregatePattern::Prefix(prefix) => name
                .strip_prefix(prefix.as_str())
                .filter(|rest| !rest.is_empty())
                .map(str::to_string),
            AggregatePattern::Include(names) => names.iter().any(|n| n == name).then(|| name.to_string()),
            AggregatePattern::Exclude(names) => (!names.iter().any(|n| n == name)).then(|| name.to_string()),
        }
    }
}

/// Node payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// A list of nodes; the document root or the result of a merge.
    Template {
        /// Child nodes.
        children: Vec<NodeId>,
    },
    /// An HTML element.
    Tag {
        /// Tag name as written.
        name: String,
        /// [`NodeKind::Attr`] and [`NodeKind::Aggregate`] nodes.
        attrs: Vec<NodeId>,
        /// Child nodes.
        children: Vec<NodeId>,
        /// No closing tag (`<br>`, `<x/>`).
        void: bool,
        /// Written with `/>`.
        self_closing: bool,
    },
    /// A tag attribute.
    Attr {
        /// Attribute name.
        name: Value,
        /// Attribute value.
        value: Value,
    },
    /// Plain text.
    Raw {
        /// The text.
        text: String,
    },
    /// Content emitted without HTML processing.
    Verbatim {
        /// Text and dynamic parts.
        children: Vec<NodeId>,
    },
    /// Text interleaved with dynamic parts inside a single attribute name or value.
    Mixin {
        /// Text and dynamic parts.
        children: Vec<NodeId>,
    },
    /// `@name` or `@name(body)`.
    Directive {
        /// Lowercased directive name.
        name: String,
        /// Body without parentheses.
        body: Option<String>,
        /// Body split at top-level commas.
        values: Vec<String>,
    },
    /// `{{ body }}` or `{!! body !!}`.
    Output {
        /// Expression.
        body: String,
        /// Unescaped output.
        raw: bool,
    },
    /// `${name}` / `${name|default}` before it becomes a block.
    Inline {
        /// Placeholder name.
        name: String,
        /// Default value.
        value: Option<String>,
    },
    /// A host-code fragment.
    Php {
        /// Code, tags included.
        content: String,
        /// Host tokens of `content`.
        tokens: Vec<HostToken>,
    },
    /// A named slot, or an anonymous grouping when `name` is `None`.
    Block {
        /// Block name.
        name: Option<String>,
        /// Default content.
        children: Vec<NodeId>,
    },
    /// `attr:aggregate`: collects unclaimed attributes.
    Aggregate {
        /// Accepted names.
        pattern: AggregatePattern,
        /// Synthesized [`NodeKind::Attr`] nodes.
        children: Vec<NodeId>,
    },
}

impl NodeKind {
    /// Short type name, used in dumps and messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Template { .. } => "Template",
            NodeKind::Tag { .. } => "Tag",
            NodeKind::Attr { .. } => "Attr",
            NodeKind::Raw { .. } => "Raw",
            NodeKind::Verbatim { .. } => "Verbatim",
            NodeKind::Mixin { .. } => "Mixin",
            NodeKind::Directive { .. } => "Directive",
            NodeKind::Output { .. } => "Output",
            NodeKind::Inline { .. } => "Inline",
            NodeKind::Php { .. } => "PHP",
            NodeKind::Block { .. } => "Block",
            NodeKind::Aggregate { .. } => "Aggregate",
        }
    }

    /// Every node id this node refers to, in document order.
    pub fn ids(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Template { children }
            | NodeKind::Verbatim { children }
            | NodeKind::Mixin { children }
            | NodeKind::Block { children, .. }
            | NodeKind::Aggregate { children, .. } => children.clone(),
            NodeKind::Tag { attrs, children, .. } => attrs.iter().chain(children.iter()).copied().collect(),
            NodeKind::Attr { name, value } => [name, value]
                .into_iter()
                .filter_map(|v| match v {
                    Value::Node(id) => Some(*id),
                    _ => None,
                })
                .collect(),
            NodeKind::Raw { .. }
            | NodeKind::Directive { .. }
            | NodeKind::Output { .. }
            | NodeKind::Inline { .. }
            | NodeKind::Php { .. } => Vec::new(),
        }
    }

    /// Rewrites every referenced node id.
    pub fn map_ids(self, f: &mut dyn FnMut(NodeId) -> NodeId) -> NodeKind {
        fn map_all(ids: Vec<NodeId>, f: &mut dyn FnMut(NodeId) -> NodeId) -> Vec<NodeId> {
            ids.into_iter().map(|id| f(id)).collect()
        }
        fn map_value(v: Value, f: &mut dyn FnMut(NodeId) -> NodeId) -> Value {
            match v {
                Value::Node(id) => Value::Node(f(id)),
                other => other,
            }
        }

        match self {
            NodeKind::Template { children } => NodeKind::Template {
                children: map_all(children, f),
            },
            NodeKind::Verbatim { children } => NodeKind::Verbatim {
                children: map_all(children, f),
            },
            NodeKind::Mixin { children } => NodeKind::Mixin {
                children: map_all(children, f),
            },
            NodeKind::Block { name, children } => NodeKind::Block {
                name,
                children: map_all(children, f),
            },
            NodeKind::Aggregate { pattern, children } => NodeKind::Aggregate {
                pattern,
                children: map_all(children, f),
            },
            NodeKind::Tag {
                name,
                attrs,
                children,
                void,
                self_closing,
            } => NodeKind::Tag {
                name,
                attrs: map_all(attrs, f),
                children: map_all(children, f),
                void,
                self_closing,
            },
            NodeKind::Attr { name, value } => NodeKind::Attr {
                name: map_value(name, f),
                value: map_value(value, f),
            },
            leaf => leaf,
        }
    }
}

/// A node: payload plus origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Payload.
    pub kind: NodeKind,
    /// Origin.
    pub context: Context,
}

/// Node arena.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes ever allocated (detached nodes included).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no node was allocated.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocates a node.
    pub fn add(&mut self, kind: NodeKind, context: Context) -> NodeId {
        self.nodes.push(Node { kind, context });
        NodeId(self.nodes.len() - 1)
    }

    /// Returns a node.
    ///
    /// Ids are only ever produced by this arena, so an out-of-range id is a
    /// programming error.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Returns a node's payload.
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    /// Returns a node's payload for modification.
    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.0].kind
    }

    /// Returns a node's origin.
    pub fn context(&self, id: NodeId) -> &Context {
        &self.nodes[id.0].context
    }

    /// Replaces a node's payload in place, keeping its id and origin.
    pub fn replace(&mut self, id: NodeId, kind: NodeKind) -> NodeKind {
        std::mem::replace(&mut self.nodes[id.0].kind, kind)
    }

    /// Child list of a container node (tag children, not attributes).
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.kind(id) {
            NodeKind::Template { children }
            | NodeKind::Tag { children, .. }
            | NodeKind::Verbatim { children }
            | NodeKind::Mixin { children }
            | NodeKind::Block { children, .. }
            | NodeKind::Aggregate { children, .. } => children,
            _ => &[],
        }
    }

    /// Mutable child list of a container node.
    pub fn children_mut(&mut self, id: NodeId) -> Option<&mut Vec<NodeId>> {
        match self.kind_mut(id) {
            NodeKind::Template { children }
            | NodeKind::Tag { children, .. }
            | NodeKind::Verbatim { children }
            | NodeKind::Mixin { children }
            | NodeKind::Block { children, .. }
            | NodeKind::Aggregate { children, .. } => Some(children),
            _ => None,
        }
    }

    /// Appends a child to a container node.
    pub fn push_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let kind = self.kind(parent).type_name();
        match self.children_mut(parent) {
            Some(children) => {
                children.push(child);
                Ok(())
            }
            None => Err(QuillError::Transform(format!("{} node can not have children", kind))),
        }
    }

    /// Visits `root` and every node below it, children before parents.
    ///
    /// The child list is read before descending, so `f` may freely replace
    /// the node it is called with.
    pub fn walk_post(&mut self, root: NodeId, f: &mut dyn FnMut(&mut Ast, NodeId) -> Result<()>) -> Result<()> {
        for child in self.kind(root).ids() {
            self.walk_post(child, f)?;
        }
        f(self, root)
    }

    /// Visits `root` and every node below it, parents before children.
    ///
    /// Children are read after `f` returns, so nodes `f` inserts are visited too.
    pub fn walk_pre(&mut self, root: NodeId, f: &mut dyn FnMut(&mut Ast, NodeId) -> Result<()>) -> Result<()> {
        f(self, root)?;
        for child in self.kind(root).ids() {
            self.walk_pre(child, f)?;
        }
        Ok(())
    }

    /// Copies a subtree, returning the id of the copy.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let node = self.nodes[id.0].clone();
        let kind = node.kind.map_ids(&mut |child| self.deep_clone(child));
        self.add(kind, node.context)
    }

    /// Copies a subtree of another arena into this one.
    pub fn import(&mut self, other: &Ast, id: NodeId) -> NodeId {
        let node = other.node(id).clone();
        let kind = node.kind.map_ids(&mut |child| self.import(other, child));
        self.add(kind, node.context)
    }

    /// True when the subtree contains a [`NodeKind::Block`].
    pub fn contains_block(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Block { .. }) || self.kind(id).ids().into_iter().any(|c| self.contains_block(c))
    }

    /// Renders a subtree as a JSON value for debugging.
    pub fn to_value(&self, id: NodeId) -> serde_json::Value {
        let node = self.node(id);
        let list = |ids: &[NodeId]| -> Vec<serde_json::Value> { ids.iter().map(|c| self.to_value(*c)).collect() };
        let value = |v: &Value| match v {
            Value::Nil => serde_json::Value::Null,
            Value::Text(t) => json!(t),
            Value::Node(n) => self.to_value(*n),
        };

        let mut out = match &node.kind {
            NodeKind::Template { children } | NodeKind::Verbatim { children } | NodeKind::Mixin { children } => {
                json!({ "children": list(children) })
            }
            NodeKind::Tag {
                name,
                attrs,
                children,
                void,
                ..
            } => json!({ "name": name, "void": void, "attrs": list(attrs), "children": list(children) }),
            NodeKind::Attr { name, value: v } => json!({ "name": value(name), "value": value(v) }),
            NodeKind::Raw { text } => json!({ "text": text }),
            NodeKind::Directive { name, body, values } => json!({ "name": name, "body": body, "values": values }),
            NodeKind::Output { body, raw } => json!({ "body": body, "raw": raw }),
            NodeKind::Inline { name, value } => json!({ "name": name, "value": value }),
            NodeKind::Php { content, .. } => json!({ "content": content }),
            NodeKind::Block { name, children } => json!({ "name": name, "children": list(children) }),
            NodeKind::Aggregate { pattern, children } => json!({ "pattern": pattern, "children": list(children) }),
        };

        if let Some(map) = out.as_object_mut() {
            map.insert("type".to_string(), json!(node.kind.type_name()));
            map.insert("offset".to_string(), json!(node.context.offset));
        }
        out
    }

    /// Pretty-printed JSON dump of a subtree.
    pub fn to_json(&self, id: NodeId) -> Result<String> {
        serde_json::to_string_pretty(&self.to_value(id)).map_err(|e| QuillError::Transform(e.to_string()))
    }
}

/// A parsed template: its arena, root node and path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Node arena.
    pub ast: Ast,
    /// The root [`NodeKind::Template`] node.
    pub root: NodeId,
    /// Template path, if loaded through a loader.
    pub path: Option<String>,
}

impl Document {
    /// Creates a document with an empty root template.
    pub fn new(path: Option<String>) -> Self {
        let mut ast = Ast::new();
        let root = ast.add(
            NodeKind::Template { children: Vec::new() },
            Context {
                offset: 0,
                line: 1,
                path: path.clone(),
            },
        );
        Self { ast, root, path }
    }

    /// Top-level nodes.
    pub fn nodes(&self) -> &[NodeId] {
        self.ast.children(self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(ast: &mut Ast, text: &str) -> NodeId {
        ast.add(NodeKind::Raw { text: text.to_string() }, Context::default())
    }

    #[test]
    fn test_aggregate_patterns() {
        assert_eq!(AggregatePattern::parse(""), AggregatePattern::All);
        assert_eq!(AggregatePattern::parse("prefix:data-").accepts("data-id"), Some("id".to_string()));
        assert_eq!(AggregatePattern::parse("prefix:data-").accepts("href"), None);
        assert_eq!(AggregatePattern::parse("prefix:data-").accepts("data-"), None);

        let include = AggregatePattern::parse("include:a, b");
        assert_eq!(include, AggregatePattern::Include(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(include.accepts("b"), Some("b".to_string()));
        assert_eq!(include.accepts("c"), None);

        let exclude = AggregatePattern::parse("exclude:a");
        assert_eq!(exclude.accepts("a"), None);
        assert_eq!(exclude.accepts("c"), Some("c".to_string()));
    }

    #[test]
    fn test_deep_clone_is_independent() {
        let mut ast = Ast::new();
        let text = raw(&mut ast, "x");
        let tag = ast.add(
            NodeKind::Tag {
                name: "b".to_string(),
                attrs: vec![],
                children: vec![text],
                void: false,
                self_closing: false,
            },
            Context::default(),
        );

        let copy = ast.deep_clone(tag);
        assert_ne!(copy, tag);
        let copied_child = ast.children(copy)[0];
        assert_ne!(copied_child, text);

        ast.replace(copied_child, NodeKind::Raw { text: "y".to_string() });
        assert_eq!(ast.kind(text), &NodeKind::Raw { text: "x".to_string() });
    }

    #[test]
    fn test_import_from_other_arena() {
        let mut parent = Document::new(Some("parent".to_string()));
        let child = raw(&mut parent.ast, "hello");
        parent.ast.push_child(parent.root, child).expect("push");

        let mut ast = Ast::new();
        let _ = raw(&mut ast, "padding");
        let imported = ast.import(&parent.ast, parent.root);

        assert_eq!(ast.children(imported).len(), 1);
        let text = ast.children(imported)[0];
        assert_eq!(ast.kind(text), &NodeKind::Raw { text: "hello".to_string() });
        assert_eq!(ast.context(imported).path.as_deref(), Some("parent"));
    }

    #[test]
    fn test_contains_block() {
        let mut ast = Ast::new();
        let block = ast.add(
            NodeKind::Block {
                name: Some("parent".to_string()),
                children: vec![],
            },
            Context::default(),
        );
        let mixin = ast.add(NodeKind::Mixin { children: vec![block] }, Context::default());
        let text = raw(&mut ast, "a");
        assert!(ast.contains_block(mixin));
        assert!(!ast.contains_block(text));
    }

    #[test]
    fn test_push_child_on_leaf_fails() {
        let mut ast = Ast::new();
        let a = raw(&mut ast, "a");
        let b = raw(&mut ast, "b");
        assert!(ast.push_child(a, b).is_err());
    }

    #[test]
    fn test_to_json() {
        let mut doc = Document::new(None);
        let text = raw(&mut doc.ast, "hi");
        doc.ast.push_child(doc.root, text).expect("push");
        let dump = doc.ast.to_json(doc.root).expect("json");
        assert!(dump.contains("\"type\": \"Template\""));
        assert!(dump.contains("\"text\": \"hi\""));
    }
}
