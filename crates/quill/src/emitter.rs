// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Host source generation.
//!
//! The emitter serializes a finalized tree. Echo tags and directives must
//! already be host code at this point; finding one is an error.

use crate::ast::{Ast, Document, NodeId, NodeKind, Value};
use crate::error::{QuillError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Where a line of output came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Template path.
    pub path: Option<String>,
    /// 1-indexed template line.
    pub line: usize,
}

/// Maps output lines to template lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMap {
    mappings: BTreeMap<usize, SourceLocation>,
}

impl SourceMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that output `line` starts at `location`. The first mapping of
    /// a line wins.
    pub fn add_mapping(&mut self, line: usize, location: SourceLocation) {
        self.mappings.entry(line).or_insert(location);
    }

    /// Location of an output line: the closest mapping at or before it.
    pub fn lookup(&self, line: usize) -> Option<&SourceLocation> {
        self.mappings.range(..=line).next_back().map(|(_, location)| location)
    }

    /// Number of recorded mappings.
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// Output of a compile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledTemplate {
    /// Template path.
    pub path: Option<String>,
    /// Host source.
    pub content: String,
    /// Output line origins.
    pub source_map: SourceMap,
    /// Hex SHA-256 of `content`.
    pub hash: String,
}

impl CompiledTemplate {
    /// Wraps emitted source.
    pub fn new(path: Option<String>, content: String, source_map: SourceMap) -> Self {
        let hash = format!("{:x}", Sha256::digest(content.as_bytes()));
        Self {
            path,
            content,
            source_map,
            hash,
        }
    }
}

/// Serializes a finalized document.
pub fn emit(doc: &Document) -> Result<CompiledTemplate> {
    let mut emitter = Emitter::new(&doc.ast);
    emitter.node(doc.root)?;
    Ok(CompiledTemplate::new(doc.path.clone(), emitter.output, emitter.source_map))
}

struct Emitter<'a> {
    ast: &'a Ast,
    output: String,
    line: usize,
    source_map: SourceMap,
}

impl<'a> Emitter<'a> {
    fn new(ast: &'a Ast) -> Self {
        Self {
            ast,
            output: String::new(),
            line: 1,
            source_map: SourceMap::new(),
        }
    }

    fn write(&mut self, text: &str) {
        self.line += text.matches('\n').count();
        self.output.push_str(text);
    }

    fn mark(&mut self, id: NodeId) {
        let context = self.ast.context(id);
        if context.line == 0 {
            return;
        }
        self.source_map.add_mapping(
            self.line,
            SourceLocation {
                path: context.path.clone(),
                line: context.line,
            },
        );
    }

    fn nodes(&mut self, ids: &[NodeId]) -> Result<()> {
        for id in ids {
            self.node(*id)?;
        }
        Ok(())
    }

    fn node(&mut self, id: NodeId) -> Result<()> {
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::Template { children }
            | NodeKind::Mixin { children }
            | NodeKind::Verbatim { children }
            | NodeKind::Block { children, .. } => self.nodes(children),
            NodeKind::Aggregate { children, .. } => {
                for attr in children {
                    self.attr(*attr)?;
                }
                Ok(())
            }
            NodeKind::Tag {
                name,
                attrs,
                children,
                void,
                self_closing,
            } => {
                self.mark(id);
                self.write("<");
                self.write(name);
                for attr in attrs {
                    self.attr(*attr)?;
                }
                if *self_closing {
                    self.write("/>");
                    return Ok(());
                }
                self.write(">");
                if *void {
                    return Ok(());
                }
                self.nodes(children)?;
                self.write("</");
                self.write(name);
                self.write(">");
                Ok(())
            }
            NodeKind::Attr { .. } => self.attr(id),
            NodeKind::Raw { text } => {
                self.mark(id);
                self.write(text);
                Ok(())
            }
            NodeKind::Php { content, .. } => {
                self.mark(id);
                self.write(content);
                Ok(())
            }
            other @ (NodeKind::Output { .. } | NodeKind::Directive { .. } | NodeKind::Inline { .. }) => {
                let context = ast.context(id);
                Err(QuillError::Transform(format!(
                    "Unresolved {} node in {}:{}",
                    other.type_name(),
                    context.path.as_deref().unwrap_or("<source>"),
                    context.line
                )))
            }
        }
    }

    fn attr(&mut self, id: NodeId) -> Result<()> {
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::Attr { name, value } => {
                self.write(" ");
                self.value(name)?;
                if *value != Value::Nil {
                    self.write("=");
                    self.value(value)?;
                }
                Ok(())
            }
            _ => self.node(id),
        }
    }

    fn value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Nil => Ok(()),
            Value::Text(text) => {
                self.write(text);
                Ok(())
            }
            Value::Node(id) => self.node(*id),
        }
    }
}
