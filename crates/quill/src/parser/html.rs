// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! HTML tokens to tags and attributes.

use super::{Assembler, Parser};
use crate::ast::{Ast, NodeId, NodeKind, Value};
use crate::error::Result;
use crate::token::{HtmlToken, Token};
use tracing::trace;

/// A tag being read.
enum Pending {
    Opening {
        node: NodeId,
        attr: Option<NodeId>,
        awaiting_value: bool,
    },
    Closing {
        offset: usize,
        name: Option<String>,
    },
}

/// State machine for HTML tokens.
#[derive(Default)]
pub(super) struct HtmlSyntax {
    pending: Option<Pending>,
}

impl HtmlSyntax {
    pub(super) fn advance(
        &mut self,
        parser: &Parser<'_>,
        ast: &mut Ast,
        asm: &mut Assembler,
        token: &Token,
        kind: HtmlToken,
    ) -> Result<()> {
        match kind {
            HtmlToken::Open => {
                let node = ast.add(
                    NodeKind::Tag {
                        name: String::new(),
                        attrs: Vec::new(),
                        children: Vec::new(),
                        void: false,
                        self_closing: false,
                    },
                    parser.context(token.offset),
                );
                self.pending = Some(Pending::Opening {
                    node,
                    attr: None,
                    awaiting_value: false,
                });
            }
            HtmlToken::OpenShort => {
                self.pending = Some(Pending::Closing {
                    offset: token.offset,
                    name: None,
                });
            }
            HtmlToken::Keyword | HtmlToken::Attribute => self.read_word(parser, ast, token, kind)?,
            HtmlToken::Equal => {
                if let Some(Pending::Opening {
                    attr: Some(_),
                    awaiting_value,
                    ..
                }) = &mut self.pending
                {
                    *awaiting_value = true;
                }
            }
            HtmlToken::Whitespace => {
                if self.pending.is_none() {
                    push_raw(parser, ast, asm, token)?;
                }
            }
            HtmlToken::CloseShort => {
                if let Some(Pending::Opening { node, .. }) = self.pending.take() {
                    if let NodeKind::Tag { void, self_closing, .. } = ast.kind_mut(node) {
                        *void = true;
                        *self_closing = true;
                    }
                    asm.push(ast, node)?;
                }
            }
            HtmlToken::Close => match self.pending.take() {
                Some(Pending::Opening { node, .. }) => {
                    let is_void = match ast.kind_mut(node) {
                        NodeKind::Tag { name, void, .. } => {
                            *void = parser.config().is_void_tag(name);
                            *void
                        }
                        _ => false,
                    };
                    if is_void {
                        asm.push(ast, node)?;
                    } else {
                        asm.open(ast, node)?;
                    }
                }
                Some(Pending::Closing { offset, name }) => {
                    close_tag(parser, ast, asm, offset, name.unwrap_or_default())?;
                }
                None => push_raw(parser, ast, asm, token)?,
            },
            HtmlToken::Verbatim => {
                let node = parser.parse_verbatim(ast, token)?;
                asm.push(ast, node)?;
            }
        }

        Ok(())
    }

    /// Tag name, attribute name or attribute value.
    fn read_word(&mut self, parser: &Parser<'_>, ast: &mut Ast, token: &Token, kind: HtmlToken) -> Result<()> {
        match &mut self.pending {
            Some(Pending::Closing { name, .. }) => {
                if name.is_none() {
                    *name = Some(token.content.clone());
                }
            }
            Some(Pending::Opening {
                node,
                attr,
                awaiting_value,
            }) => {
                let tag = *node;
                if kind == HtmlToken::Keyword && tag_name(ast, tag).is_some_and(str::is_empty) {
                    if let NodeKind::Tag { name, .. } = ast.kind_mut(tag) {
                        *name = token.content.clone();
                    }
                    return Ok(());
                }

                if *awaiting_value {
                    if let Some(current) = attr.take() {
                        *awaiting_value = false;
                        let verbatim = match ast.kind(current) {
                            NodeKind::Attr {
                                name: Value::Text(name),
                                ..
                            } => parser.config().is_verbatim_attribute(name),
                            _ => false,
                        };
                        let parsed = if verbatim {
                            Value::Node(parser.parse_verbatim(ast, token)?)
                        } else {
                            parser.parse_token(ast, token)?
                        };
                        if let NodeKind::Attr { value, .. } = ast.kind_mut(current) {
                            *value = parsed;
                        }
                        return Ok(());
                    }
                }

                let name = parser.parse_token(ast, token)?;
                let node = ast.add(
                    NodeKind::Attr {
                        name,
                        value: Value::Nil,
                    },
                    parser.context(token.offset),
                );
                if let NodeKind::Tag { attrs, .. } = ast.kind_mut(tag) {
                    attrs.push(node);
                }
                *attr = Some(node);
                *awaiting_value = false;
            }
            None => {}
        }
        Ok(())
    }
}

fn tag_name(ast: &Ast, id: NodeId) -> Option<&str> {
    match ast.kind(id) {
        NodeKind::Tag { name, .. } => Some(name),
        _ => None,
    }
}

fn close_tag(parser: &Parser<'_>, ast: &Ast, asm: &mut Assembler, offset: usize, name: String) -> Result<()> {
    let current = asm.current();
    let expected = match tag_name(ast, current) {
        Some(open) if asm.has_open() => open.to_string(),
        _ => return Err(parser.error(format!("Unexpected closing tag `{}`", name), offset)),
    };

    if !expected.eq_ignore_ascii_case(&name) {
        return Err(parser.error(
            format!("Invalid closing tag `{}`, expected `{}`", name, expected),
            offset,
        ));
    }

    trace!(tag = %name, "close");
    asm.close();
    Ok(())
}

/// Stray HTML tokens become text.
fn push_raw(parser: &Parser<'_>, ast: &mut Ast, asm: &mut Assembler, token: &Token) -> Result<()> {
    let node = ast.add(
        NodeKind::Raw {
            text: token.content.clone(),
        },
        parser.context(token.offset),
    );
    asm.push(ast, node)
}
