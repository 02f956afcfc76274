// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Directive rendering.
//!
//! A [`DirectiveRenderer`] turns `@name(body)` into host code. Renderers are
//! combined in a [`DirectiveGroup`]; the group's names also tell the lexer
//! which `@word` sequences are directives at all.
//!
//! # Built-in Directives
//!
//! | Directive | Output |
//! |---|---|
//! | `@if(x)` / `@elseif(x)` / `@else` / `@endif` | `<?php if(x): ?>` … `<?php endif; ?>` |
//! | `@unless(x)` / `@endunless` | `<?php if(!(x)): ?>` … `<?php endif; ?>` |
//! | `@foreach(x)` / `@endforeach` | `<?php foreach(x): ?>` … `<?php endforeach; ?>` |
//! | `@for(x)` / `@endfor` | `<?php for(x): ?>` … `<?php endfor; ?>` |
//! | `@while(x)` / `@endwhile` | `<?php while(x): ?>` … `<?php endwhile; ?>` |
//! | `@break` / `@break(2)` | `<?php break; ?>` / `<?php break 2; ?>` |
//! | `@continue` / `@continue(2)` | `<?php continue; ?>` / `<?php continue 2; ?>` |

use crate::ast::Context;
use crate::error::{QuillError, Result};
use tracing::warn;

/// A directive to render.
#[derive(Debug, Clone, Copy)]
pub struct DirectiveCall<'a> {
    /// Lowercased name.
    pub name: &'a str,
    /// Body without parentheses.
    pub body: Option<&'a str>,
    /// Body split at top-level commas.
    pub values: &'a [String],
    /// Where the directive was written.
    pub context: &'a Context,
}

impl DirectiveCall<'_> {
    /// A directive error located at this call.
    pub fn error(&self, message: impl Into<String>) -> QuillError {
        QuillError::Directive {
            message: message.into(),
            offset: self.context.offset,
            file: self.context.path.clone(),
        }
    }

    /// The trimmed body, or an error naming the directive.
    pub fn require_body(&self) -> Result<&str> {
        match self.body.map(str::trim) {
            Some(body) if !body.is_empty() => Ok(body),
            _ => Err(self.error(format!("Directive `@{}` requires a body", self.name))),
        }
    }
}

/// Renders a family of directives into host code.
pub trait DirectiveRenderer: Send + Sync {
    /// Directive names this renderer handles, lowercase.
    fn names(&self) -> &[&'static str];

    /// Renders a call whose name is one of [`DirectiveRenderer::names`].
    fn render(&self, call: &DirectiveCall<'_>) -> Result<String>;

    /// True when `name` is handled.
    fn has_directive(&self, name: &str) -> bool {
        self.names().iter().any(|n| *n == name)
    }
}

/// Renderers tried in registration order.
pub struct DirectiveGroup {
    renderers: Vec<Box<dyn DirectiveRenderer>>,
}

impl Default for DirectiveGroup {
    /// The conditional and loop directives.
    fn default() -> Self {
        Self::new()
            .with_renderer(ConditionalDirective)
            .with_renderer(LoopDirective)
    }
}

impl std::fmt::Debug for DirectiveGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectiveGroup").field("names", &self.names()).finish()
    }
}

impl DirectiveGroup {
    /// Creates a group without renderers.
    pub fn new() -> Self {
        Self { renderers: Vec::new() }
    }

    /// Adds a renderer.
    pub fn add_renderer<R: DirectiveRenderer + 'static>(&mut self, renderer: R) -> &mut Self {
        self.renderers.push(Box::new(renderer));
        self
    }

    /// Adds a renderer, builder style.
    pub fn with_renderer<R: DirectiveRenderer + 'static>(mut self, renderer: R) -> Self {
        self.renderers.push(Box::new(renderer));
        self
    }

    /// Every handled name.
    pub fn names(&self) -> Vec<String> {
        self.renderers
            .iter()
            .flat_map(|r| r.names().iter().map(|n| n.to_string()))
            .collect()
    }

    /// True when some renderer handles `name`.
    pub fn has_directive(&self, name: &str) -> bool {
        self.renderers.iter().any(|r| r.has_directive(name))
    }

    /// Renders a call with the first renderer that handles it.
    pub fn render(&self, call: &DirectiveCall<'_>) -> Result<String> {
        match self.renderers.iter().find(|r| r.has_directive(call.name)) {
            Some(renderer) => renderer.render(call),
            None => {
                warn!(directive = %call.name, file = ?call.context.path, "unknown directive");
                Err(call.error(format!("Undefined directive `@{}`", call.name)))
            }
        }
    }
}

/// `if`, `elseif`, `else`, `endif`, `unless`, `endunless`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConditionalDirective;

impl DirectiveRenderer for ConditionalDirective {
    fn names(&self) -> &[&'static str] {
        &["if", "elseif", "else", "endif", "unless", "endunless"]
    }

    fn render(&self, call: &DirectiveCall<'_>) -> Result<String> {
        Ok(match call.name {
            "if" => format!("<?php if({}): ?>", call.require_body()?),
            "elseif" => format!("<?php elseif({}): ?>", call.require_body()?),
            "else" => "<?php else: ?>".to_string(),
            "unless" => format!("<?php if(!({})): ?>", call.require_body()?),
            "endif" | "endunless" => "<?php endif; ?>".to_string(),
            other => return Err(call.error(format!("Undefined directive `@{}`", other))),
        })
    }
}

/// `foreach`, `for`, `while` and their `end*` forms, `break`, `continue`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoopDirective;

impl DirectiveRenderer for LoopDirective {
    fn names(&self) -> &[&'static str] {
        &[
            "foreach",
            "endforeach",
            "for",
            "endfor",
            "while",
            "endwhile",
            "break",
            "continue",
        ]
    }

    fn render(&self, call: &DirectiveCall<'_>) -> Result<String> {
        Ok(match call.name {
            "foreach" | "for" | "while" => format!("<?php {}({}): ?>", call.name, call.require_body()?),
            "endforeach" | "endfor" | "endwhile" => format!("<?php {}; ?>", call.name),
            "break" | "continue" => match call.body.map(str::trim).filter(|b| !b.is_empty()) {
                Some(levels) => format!("<?php {} {}; ?>", call.name, levels),
                None => format!("<?php {}; ?>", call.name),
            },
            other => return Err(call.error(format!("Undefined directive `@{}`", other))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(name: &str, body: Option<&str>) -> Result<String> {
        let context = Context::default();
        let values: Vec<String> = body.map(crate::parser::split_values).unwrap_or_default();
        DirectiveGroup::default().render(&DirectiveCall {
            name,
            body,
            values: &values,
            context: &context,
        })
    }

    #[test]
    fn test_conditionals() {
        assert_eq!(render("if", Some("$a > 1")).expect("if"), "<?php if($a > 1): ?>");
        assert_eq!(render("elseif", Some("$b")).expect("elseif"), "<?php elseif($b): ?>");
        assert_eq!(render("else", None).expect("else"), "<?php else: ?>");
        assert_eq!(render("endif", None).expect("endif"), "<?php endif; ?>");
        assert_eq!(render("unless", Some("$c")).expect("unless"), "<?php if(!($c)): ?>");
    }

    #[test]
    fn test_loops() {
        assert_eq!(
            render("foreach", Some("$items as $item")).expect("foreach"),
            "<?php foreach($items as $item): ?>"
        );
        assert_eq!(render("endforeach", None).expect("end"), "<?php endforeach; ?>");
        assert_eq!(render("break", None).expect("break"), "<?php break; ?>");
        assert_eq!(render("continue", Some("2")).expect("continue"), "<?php continue 2; ?>");
    }

    #[test]
    fn test_missing_body() {
        let err = render("if", None).unwrap_err();
        assert!(err.to_string().contains("requires a body"));
    }

    #[test]
    fn test_names() {
        let group = DirectiveGroup::default();
        assert!(group.has_directive("endwhile"));
        assert!(!group.has_directive("include"));
        assert!(group.names().contains(&"unless".to_string()));
        assert!(DirectiveGroup::new().names().is_empty());
    }
}
