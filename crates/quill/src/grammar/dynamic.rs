// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Echo tags and directives.
//!
//! Recognizes `{{ expr }}`, `{!! expr !!}` and `@directive(...)`. The
//! `@declare(...)` directive is consumed here and switches the scanner's
//! [`GrammarMode`] for the rest of the template:
//!
//! ```text
//! @declare(syntax=off)            echo tags become plain text
//! @declare(syntax=on)             echo tags are recognized again
//! @declare(syntax=default)        restore the configured delimiters
//! @declare(open='[[', close=']]') change the escaped echo delimiters
//! @declare(openRaw='[!', closeRaw='!]')
//! ```
//!
//! `@{{`, `@{!!` and `@@` escape the following sequence: the `@` is dropped
//! and the rest is plain text.

use super::braces::BracesGrammar;
use super::declare::fetch_options;
use super::directive::DirectiveGrammar;
use super::Grammar;
use crate::source::{Buffer, Element};
use crate::transform::claims::PARENT_BLOCK;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::trace;

/// Delimiter pairs currently in effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syntax {
    /// Escaped echo pair.
    pub echo: BracesGrammar,
    /// Raw echo pair.
    pub raw: BracesGrammar,
}

/// Scanner mode, switched by `@declare(syntax=...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarMode {
    /// Echo tags are recognized.
    Active(Syntax),
    /// Echo tags are plain text; the delimiters are kept for `syntax=on`.
    Off(Syntax),
}

impl GrammarMode {
    fn syntax(&self) -> &Syntax {
        match self {
            GrammarMode::Active(s) | GrammarMode::Off(s) => s,
        }
    }

    fn active(&self) -> Option<&Syntax> {
        match self {
            GrammarMode::Active(s) => Some(s),
            GrammarMode::Off(_) => None,
        }
    }
}

/// The dynamic grammar.
#[derive(Debug, Clone)]
pub struct DynamicGrammar {
    defaults: Syntax,
    known: Option<Arc<HashSet<String>>>,
}

impl Default for DynamicGrammar {
    fn default() -> Self {
        Self::new("{{", "}}", "{!!", "!!}")
    }
}

impl DynamicGrammar {
    /// Creates the grammar with the given default delimiters.
    pub fn new(open: &str, close: &str, open_raw: &str, close_raw: &str) -> Self {
        Self {
            defaults: Syntax {
                echo: BracesGrammar::echo(open, close),
                raw: BracesGrammar::raw(open_raw, close_raw),
            },
            known: None,
        }
    }

    /// Restricts directives to the given lowercase names; any other `@word`
    /// stays plain text. `@parent` is always recognized.
    pub fn with_known_directives(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.known = Some(Arc::new(names.into_iter().collect()));
        self
    }

    fn is_known(&self, keyword: &str) -> bool {
        let keyword = keyword.to_ascii_lowercase();
        match &self.known {
            Some(known) => keyword == PARENT_BLOCK || known.contains(&keyword),
            None => true,
        }
    }

    /// Applies a `@declare(...)` body to the current mode.
    fn declare(&self, mode: GrammarMode, body: Option<&str>) -> GrammarMode {
        let Some(body) = body else {
            return mode;
        };

        let mut active = mode.active().is_some();
        let mut syntax = mode.syntax().clone();

        for (key, value) in fetch_options(body) {
            let value = value.unwrap_or_default();
            trace!(key = %key, value = %value, "declare");
            match key.as_str() {
                "syntax" => {
                    active = value != "off";
                    if value == "default" {
                        syntax = self.defaults.clone();
                    }
                }
                "open" => syntax.echo.set_start(value.trim()),
                "close" => syntax.echo.set_end(value.trim()),
                "openRaw" => syntax.raw.set_start(value.trim()),
                "closeRaw" => syntax.raw.set_end(value.trim()),
                _ => {}
            }
        }

        if active {
            GrammarMode::Active(syntax)
        } else {
            GrammarMode::Off(syntax)
        }
    }
}

impl Grammar for DynamicGrammar {
    fn parse(&self, src: &mut Buffer) -> Vec<Element> {
        let mut out = Vec::new();
        let mut mode = GrammarMode::Active(self.defaults.clone());

        while let Some(element) = src.next() {
            let Element::Byte(b) = element else {
                out.push(element);
                continue;
            };

            if b.char == b'@' {
                let escaped = src.lookahead_byte() == Some(b'@')
                    || mode
                        .active()
                        .is_some_and(|s| s.echo.next_token(src) || s.raw.next_token(src));
                if escaped {
                    if let Some(next) = src.next() {
                        out.push(next);
                    }
                    continue;
                }

                let mut directive = DirectiveGrammar::new();
                if directive.parse(src, b.offset) {
                    let keyword = directive.keyword().unwrap_or_default();
                    if keyword.eq_ignore_ascii_case("declare") {
                        mode = self.declare(mode, directive.body());
                        src.replay(directive.last_offset());
                        continue;
                    }

                    if self.is_known(keyword) {
                        let last = directive.last_offset();
                        out.extend(directive.into_tokens().into_iter().map(Element::Token));
                        src.replay(last);
                        continue;
                    }
                }

                out.push(element);
                src.replay(b.offset);
                continue;
            }

            if let Some(syntax) = mode.active() {
                let candidate = [&syntax.raw, &syntax.echo]
                    .into_iter()
                    .find(|braces| braces.starts(src, b.char));
                if let Some(braces) = candidate {
                    match braces.parse(src, b) {
                        Some(tokens) => {
                            out.extend(tokens.into_iter().map(Element::Token));
                            continue;
                        }
                        None => src.replay(b.offset),
                    }
                }
            }

            out.push(element);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::token::{DynamicToken, Token, TokenKind};

    fn lex(source: &str) -> Vec<Token> {
        Lexer::new().with_grammar(DynamicGrammar::default()).parse(source)
    }

    fn dynamic(kind: DynamicToken) -> TokenKind {
        TokenKind::Dynamic(kind)
    }

    #[test]
    fn test_echo_in_text() {
        let tokens = lex("hello {{ $name }}!");
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0].content, "hello ");
        assert_eq!(tokens[1].kind, dynamic(DynamicToken::OpenTag));
        assert_eq!(tokens[2].content, " $name ");
        assert_eq!(tokens[3].kind, dynamic(DynamicToken::CloseTag));
        assert_eq!(tokens[4].content, "!");
        assert_eq!(tokens[4].offset, 17);
    }

    #[test]
    fn test_raw_echo() {
        let tokens = lex("{!! $html !!}");
        assert_eq!(tokens[0].kind, dynamic(DynamicToken::OpenRawTag));
        assert_eq!(tokens[1].content, " $html ");
        assert_eq!(tokens[2].kind, dynamic(DynamicToken::CloseRawTag));
    }

    #[test]
    fn test_invalid_echo_is_raw() {
        let tokens = lex("{{ $var !}");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Raw);
        assert_eq!(tokens[0].content, "{{ $var !}");
    }

    #[test]
    fn test_escaped_echo() {
        let tokens = lex("@{{ $var }}");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Raw);
        assert_eq!(tokens[0].content, "{{ $var }}");
        assert_eq!(tokens[0].offset, 1);

        let tokens = lex("@{!! $var !!}");
        assert_eq!(tokens[0].content, "{!! $var !!}");

        let tokens = lex("a@@b");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].content, "a@b");
    }

    #[test]
    fn test_directive_tokens() {
        let tokens = lex("@if($x) ok @endif");
        assert_eq!(tokens[0].kind, dynamic(DynamicToken::Directive));
        assert_eq!(tokens[1].content, "if");
        assert_eq!(tokens[3].content, "$x");
        assert_eq!(tokens[5].kind, TokenKind::Raw);
        assert_eq!(tokens[5].content, " ok ");
        assert_eq!(tokens[7].content, "endif");
    }

    #[test]
    fn test_declare_syntax_off() {
        let tokens = lex("@declare(syntax=off) {{ $name }}");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Raw);
        assert_eq!(tokens[0].content, " {{ $name }}");
        assert_eq!(tokens[0].offset, 20);
    }

    #[test]
    fn test_declare_syntax_back_on() {
        let tokens = lex("@declare(syntax=off){{ a }}@declare(syntax=on){{ b }}");
        assert_eq!(tokens[0].content, "{{ a }}");
        assert_eq!(tokens[1].kind, dynamic(DynamicToken::OpenTag));
        assert_eq!(tokens[2].content, " b ");
    }

    #[test]
    fn test_declare_custom_delimiters() {
        let tokens = lex("@declare(open='[[', close=']]')[[ $x ]] {{ y }}");
        assert_eq!(tokens[0].kind, dynamic(DynamicToken::OpenTag));
        assert_eq!(tokens[0].content, "[[");
        assert_eq!(tokens[1].content, " $x ");
        assert_eq!(tokens[2].content, "]]");
        assert_eq!(tokens[3].content, " {{ y }}");
    }

    #[test]
    fn test_declare_keeps_trailing_text() {
        let tokens = lex("@declare ok");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].content, " ok");
        assert_eq!(tokens[0].offset, 8);
    }

    #[test]
    fn test_known_directive_filter() {
        let grammar = DynamicGrammar::default().with_known_directives(vec!["if".to_string()]);
        let tokens = Lexer::new().with_grammar(grammar).parse("mail@example.com @if(1)");
        assert_eq!(tokens[0].kind, TokenKind::Raw);
        assert_eq!(tokens[0].content, "mail@example.com ");
        assert_eq!(tokens[1].kind, dynamic(DynamicToken::Directive));
    }

    #[test]
    fn test_parent_is_always_known() {
        let grammar = DynamicGrammar::default().with_known_directives(Vec::<String>::new());
        let tokens = Lexer::new().with_grammar(grammar).parse("@parent");
        assert_eq!(tokens[1].content, "parent");
    }
}
