// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Final passes, run once the whole inheritance chain is merged.

use super::merge::{mentions, rewrite_code};
use crate::ast::{Ast, Document, NodeId, NodeKind};
use crate::config::CompilerConfig;
use crate::directive::{DirectiveCall, DirectiveGroup};
use crate::error::Result;
use crate::host;
use tracing::trace;

/// Runs every final pass.
pub fn finalize(doc: &mut Document, config: &CompilerConfig, directives: &DirectiveGroup) -> Result<()> {
    resolve_missing_injections(&mut doc.ast, doc.root, config)?;
    dynamic_to_php(&mut doc.ast, doc.root, config, directives)
}

/// Nothing claimed the names still passed to `injected()`: the calls become
/// `false`.
pub fn resolve_missing_injections(ast: &mut Ast, root: NodeId, config: &CompilerConfig) -> Result<()> {
    let injected = config.macros.injected.as_str();

    ast.walk_post(root, &mut |ast, id| {
        let (code, is_php) = match ast.kind(id) {
            NodeKind::Php { content, .. } => (content.clone(), true),
            NodeKind::Output { body, .. } => (body.clone(), false),
            NodeKind::Directive { body: Some(body), .. } => (body.clone(), false),
            _ => return Ok(()),
        };
        if !mentions(&code, injected) {
            return Ok(());
        }

        let tokens = if is_php {
            host::tokenize(&code)
        } else {
            host::tokenize_code(&code)
        };
        let edits: Vec<_> = host::find_macro_calls(&tokens, injected)
            .into_iter()
            .map(|call| (call.span, "false".to_string()))
            .collect();
        if !edits.is_empty() {
            trace!(count = edits.len(), "unclaimed injections");
            rewrite_code(ast, id, host::splice(&code, edits));
        }
        Ok(())
    })
}

/// Turns echo tags and directives into host code.
pub fn dynamic_to_php(
    ast: &mut Ast,
    root: NodeId,
    config: &CompilerConfig,
    directives: &DirectiveGroup,
) -> Result<()> {
    ast.walk_post(root, &mut |ast, id| {
        let content = match ast.kind(id) {
            NodeKind::Output { body, raw: true } => format!("<?php echo {}; ?>", body.trim()),
            NodeKind::Output { body, raw: false } => {
                format!("<?php echo {}; ?>", config.output_filter.replace("%s", body.trim()))
            }
            NodeKind::Directive { name, body, values } => {
                let call = DirectiveCall {
                    name,
                    body: body.as_deref(),
                    values,
                    context: ast.context(id),
                };
                directives.render(&call)?
            }
            _ => return Ok(()),
        };

        let tokens = host::tokenize(&content);
        ast.replace(id, NodeKind::Php { content, tokens });
        Ok(())
    })
}
