// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Echo tags and directives.

use super::{Assembler, Parser};
use crate::ast::{Ast, NodeId, NodeKind};
use crate::error::Result;
use crate::token::{DynamicToken, Token};

/// State machine for dynamic tokens.
#[derive(Default)]
pub(super) struct DynamicSyntax {
    directive: Option<NodeId>,
    output: Option<NodeId>,
}

impl DynamicSyntax {
    pub(super) fn advance(
        &mut self,
        parser: &Parser<'_>,
        ast: &mut Ast,
        asm: &mut Assembler,
        token: &Token,
        kind: DynamicToken,
    ) -> Result<()> {
        match kind {
            DynamicToken::Directive => {
                let node = ast.add(
                    NodeKind::Directive {
                        name: String::new(),
                        body: None,
                        values: Vec::new(),
                    },
                    parser.context(token.offset),
                );
                asm.push(ast, node)?;
                self.directive = Some(node);
                self.output = None;
            }
            DynamicToken::OpenTag | DynamicToken::OpenRawTag => {
                let node = ast.add(
                    NodeKind::Output {
                        body: String::new(),
                        raw: kind == DynamicToken::OpenRawTag,
                    },
                    parser.context(token.offset),
                );
                asm.push(ast, node)?;
                self.output = Some(node);
                self.directive = None;
            }
            DynamicToken::CloseTag | DynamicToken::CloseRawTag => self.output = None,
            DynamicToken::BodyClose => self.directive = None,
            DynamicToken::Keyword => {
                if let Some(node) = self.directive {
                    if let NodeKind::Directive { name, .. } = ast.kind_mut(node) {
                        *name = token.content.to_ascii_lowercase();
                    }
                }
            }
            DynamicToken::Body => {
                if let Some(node) = self.output {
                    if let NodeKind::Output { body, .. } = ast.kind_mut(node) {
                        *body = token.content.trim().to_string();
                    }
                } else if let Some(node) = self.directive {
                    if let NodeKind::Directive { body, values, .. } = ast.kind_mut(node) {
                        *values = split_values(&token.content);
                        *body = Some(token.content.clone());
                    }
                }
            }
            DynamicToken::BodyOpen | DynamicToken::Whitespace => {}
        }

        Ok(())
    }
}

/// Splits a directive body at commas outside brackets and quotes.
///
/// ```
/// use quill::parser::split_values;
///
/// assert_eq!(split_values("$a, [1, 2], 'x,y'"), vec!["$a", "[1, 2]", "'x,y'"]);
/// ```
pub fn split_values(body: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in body.chars() {
        if let Some(q) = quote {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                values.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }

    if !current.trim().is_empty() || !values.is_empty() {
        values.push(current.trim().to_string());
    }
    values
}
