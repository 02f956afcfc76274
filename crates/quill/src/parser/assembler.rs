// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Tree assembly cursor.

use crate::ast::{Ast, NodeId};
use crate::error::Result;

/// Tracks the open container while the parser appends nodes.
///
/// The bottom of the stack is the node the assembler was created for; it can
/// never be closed.
#[derive(Debug)]
pub struct Assembler {
    stack: Vec<NodeId>,
}

impl Assembler {
    /// Starts assembling into `root`.
    pub fn new(root: NodeId) -> Self {
        Self { stack: vec![root] }
    }

    /// The container new nodes are appended to.
    pub fn current(&self) -> NodeId {
        self.stack[self.stack.len() - 1]
    }

    /// The container nodes were appended to before `current` was opened.
    pub fn root(&self) -> NodeId {
        self.stack[0]
    }

    /// Appends a node to the current container.
    pub fn push(&mut self, ast: &mut Ast, node: NodeId) -> Result<()> {
        ast.push_child(self.current(), node)
    }

    /// Appends a node and makes it the current container.
    pub fn open(&mut self, ast: &mut Ast, node: NodeId) -> Result<()> {
        self.push(ast, node)?;
        self.stack.push(node);
        Ok(())
    }

    /// Closes the current container. Returns `None` when only the root is left.
    pub fn close(&mut self) -> Option<NodeId> {
        if self.stack.len() > 1 {
            self.stack.pop()
        } else {
            None
        }
    }

    /// True when a container other than the root is still open.
    pub fn has_open(&self) -> bool {
        self.stack.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Context, NodeKind};

    #[test]
    fn test_open_close() {
        let mut ast = Ast::new();
        let root = ast.add(NodeKind::Template { children: vec![] }, Context::default());
        let tag = ast.add(
            NodeKind::Tag {
                name: "b".to_string(),
                attrs: vec![],
                children: vec![],
                void: false,
                self_closing: false,
            },
            Context::default(),
        );
        let text = ast.add(NodeKind::Raw { text: "x".to_string() }, Context::default());

        let mut asm = Assembler::new(root);
        asm.open(&mut ast, tag).expect("open");
        asm.push(&mut ast, text).expect("push");
        assert!(asm.has_open());
        assert_eq!(asm.close(), Some(tag));
        assert_eq!(asm.close(), None);
        assert_eq!(asm.current(), root);
        assert_eq!(ast.children(root), &[tag]);
        assert_eq!(ast.children(tag), &[text]);
    }
}
