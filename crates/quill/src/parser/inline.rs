// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Inline placeholders: `${name}` and `${name|default}` become `Inline` nodes.

use super::{Assembler, Parser};
use crate::ast::{Ast, NodeId, NodeKind};
use crate::error::Result;
use crate::token::{InlineToken, Token};

/// State machine for `${name|default}` tokens.
#[derive(Default)]
pub(super) struct InlineSyntax {
    node: Option<NodeId>,
}

impl InlineSyntax {
    pub(super) fn advance(
        &mut self,
        parser: &Parser<'_>,
        ast: &mut Ast,
        asm: &mut Assembler,
        token: &Token,
        kind: InlineToken,
    ) -> Result<()> {
        match kind {
            InlineToken::OpenTag => {
                let node = ast.add(
                    NodeKind::Inline {
                        name: String::new(),
                        value: None,
                    },
                    parser.context(token.offset),
                );
                asm.push(ast, node)?;
                self.node = Some(node);
            }
            InlineToken::Name | InlineToken::Default => {
                let Some(node) = self.node else {
                    return Ok(());
                };
                if let NodeKind::Inline { name, value } = ast.kind_mut(node) {
                    if kind == InlineToken::Name {
                        *name = token.content.trim().to_string();
                    } else {
                        *value = Some(token.content.clone());
                    }
                }
            }
            InlineToken::CloseTag => self.node = None,
            InlineToken::Separator => {}
        }
        Ok(())
    }
}
