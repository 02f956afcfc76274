// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! `@keyword` / `@keyword(body)` tokenizer.

use super::is_whitespace;
use crate::source::{Buffer, Element};
use crate::token::{pack_token, DynamicToken, Token, TokenKind};

/// Characters allowed in a directive name.
pub fn is_keyword_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'_' | b'-' | b':' | b'.')
}

/// Scanner for a single directive.
///
/// Instances are single-use: create one per `@` candidate, call
/// [`DirectiveGrammar::parse`] and read the result back.
#[derive(Debug, Default)]
pub struct DirectiveGrammar {
    tokens: Vec<Token>,
    name: Vec<Element>,
    whitespace: Vec<Element>,
    body: Vec<Element>,
}

impl DirectiveGrammar {
    /// Creates an empty scanner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans a directive whose `@` (at `offset`) was already consumed.
    ///
    /// Returns `false` when the candidate is not a valid directive; the
    /// caller must then replay the buffer from `offset`.
    pub fn parse(&mut self, src: &mut Buffer, offset: usize) -> bool {
        self.tokens = vec![Token::new(TokenKind::Dynamic(DynamicToken::Directive), offset, "@")];
        self.name.clear();
        self.whitespace.clear();
        self.body.clear();

        while let Some(element) = src.next() {
            let Element::Byte(b) = element else {
                self.flush_name();
                break;
            };

            match b.char {
                b'(' => {
                    self.flush_name();
                    self.flush_whitespace();
                    self.tokens
                        .push(Token::new(TokenKind::Dynamic(DynamicToken::BodyOpen), b.offset, "("));
                    return self.parse_body(src);
                }
                c if is_whitespace(c) => {
                    if self.name.is_empty() && !self.has_keyword() {
                        return false;
                    }
                    self.flush_name();
                    self.whitespace.push(element);
                }
                c if is_keyword_char(c) => {
                    if !self.whitespace.is_empty() {
                        // a word after the whitespace is plain text, not part of the directive
                        break;
                    }
                    self.name.push(element);
                }
                _ => {
                    self.flush_name();
                    break;
                }
            }
        }

        // end of input while reading the name
        self.flush_name();
        self.finalize()
    }

    fn parse_body(&mut self, src: &mut Buffer) -> bool {
        let mut level = 1;

        while let Some(element) = src.next() {
            let Element::Byte(b) = element else {
                self.flush_body();
                return self.finalize();
            };

            if matches!(b.char, b'"' | b'\'') {
                self.body.push(element);
                while let Some(quoted) = src.next() {
                    if quoted.byte().is_none() {
                        self.flush_body();
                        return self.finalize();
                    }
                    let closes = quoted.byte() == Some(b.char);
                    self.body.push(quoted);
                    if closes {
                        break;
                    }
                }
                continue;
            }

            match b.char {
                b'(' => level += 1,
                b')' => level -= 1,
                _ => {}
            }

            if level == 0 {
                self.flush_body();
                self.tokens
                    .push(Token::new(TokenKind::Dynamic(DynamicToken::BodyClose), b.offset, ")"));
                return self.finalize();
            }

            self.body.push(element);
        }

        self.flush_body();
        self.finalize()
    }

    /// Produced tokens, valid after a successful parse.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Consumes the scanner, returning its tokens.
    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    /// Directive name.
    pub fn keyword(&self) -> Option<&str> {
        self.find(DynamicToken::Keyword)
    }

    /// Directive body without the surrounding parentheses.
    pub fn body(&self) -> Option<&str> {
        self.find(DynamicToken::Body)
    }

    /// Offset of the last character that belongs to the directive.
    pub fn last_offset(&self) -> usize {
        match self.tokens.last() {
            Some(t) => t.offset + t.content.len().saturating_sub(1),
            None => 0,
        }
    }

    fn find(&self, kind: DynamicToken) -> Option<&str> {
        self.tokens
            .iter()
            .find(|t| t.kind == TokenKind::Dynamic(kind))
            .map(|t| t.content.as_str())
    }

    fn has_keyword(&self) -> bool {
        self.keyword().is_some()
    }

    fn flush_name(&mut self) {
        if self.name.is_empty() {
            return;
        }
        self.tokens
            .push(pack_token(&self.name, TokenKind::Dynamic(DynamicToken::Keyword)));
        self.name.clear();
    }

    fn flush_whitespace(&mut self) {
        if self.whitespace.is_empty() {
            return;
        }
        self.tokens
            .push(pack_token(&self.whitespace, TokenKind::Dynamic(DynamicToken::Whitespace)));
        self.whitespace.clear();
    }

    fn flush_body(&mut self) {
        if self.body.is_empty() {
            return;
        }
        self.tokens
            .push(pack_token(&self.body, TokenKind::Dynamic(DynamicToken::Body)));
        self.body.clear();
    }

    fn finalize(&mut self) -> bool {
        while matches!(self.tokens.last(), Some(t) if t.kind == TokenKind::Dynamic(DynamicToken::Whitespace)) {
            self.tokens.pop();
        }

        if !self.has_keyword() {
            return false;
        }

        let opened = self
            .tokens
            .iter()
            .any(|t| t.kind == TokenKind::Dynamic(DynamicToken::BodyOpen));
        let closed = self
            .tokens
            .iter()
            .any(|t| t.kind == TokenKind::Dynamic(DynamicToken::BodyClose));

        opened == closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> Option<DirectiveGrammar> {
        let mut src = Buffer::from_source(source);
        src.next();
        let mut grammar = DirectiveGrammar::new();
        grammar.parse(&mut src, 0).then_some(grammar)
    }

    fn kinds(grammar: &DirectiveGrammar) -> Vec<DynamicToken> {
        grammar
            .tokens()
            .iter()
            .map(|t| match t.kind {
                TokenKind::Dynamic(d) => d,
                other => panic!("Expected dynamic token, got {}", other),
            })
            .collect()
    }

    #[test]
    fn test_bare_directive() {
        let d = scan("@endif").expect("directive");
        assert_eq!(d.keyword(), Some("endif"));
        assert_eq!(d.body(), None);
        assert_eq!(d.last_offset(), 5);
    }

    #[test]
    fn test_keyword_at_end_of_input() {
        let d = scan("@else").expect("directive");
        assert_eq!(kinds(&d), vec![DynamicToken::Directive, DynamicToken::Keyword]);
        assert_eq!(d.keyword(), Some("else"));
        assert_eq!(d.last_offset(), 4);
    }

    #[test]
    fn test_directive_with_body() {
        let d = scan("@if($x > 1)").expect("directive");
        assert_eq!(
            kinds(&d),
            vec![
                DynamicToken::Directive,
                DynamicToken::Keyword,
                DynamicToken::BodyOpen,
                DynamicToken::Body,
                DynamicToken::BodyClose
            ]
        );
        assert_eq!(d.body(), Some("$x > 1"));
    }

    #[test]
    fn test_whitespace_before_body() {
        let d = scan("@do (var=foo)").expect("directive");
        assert_eq!(kinds(&d)[2], DynamicToken::Whitespace);
        assert_eq!(d.body(), Some("var=foo"));
    }

    #[test]
    fn test_nested_and_quoted_parens() {
        let d = scan("@do(var=\"(foo\"))").expect("directive");
        assert_eq!(d.body(), Some("var=\"(foo\""));
        assert_eq!(d.last_offset(), 14);

        let d = scan("@do(fn(1, (2)))").expect("directive");
        assert_eq!(d.body(), Some("fn(1, (2))"));
    }

    #[test]
    fn test_trailing_word_is_not_part_of_directive() {
        let d = scan("@do ok").expect("directive");
        assert_eq!(kinds(&d), vec![DynamicToken::Directive, DynamicToken::Keyword]);
        assert_eq!(d.last_offset(), 2);
    }

    #[test]
    fn test_invalid_directives() {
        assert!(scan("@do(var=abc").is_none());
        assert!(scan("@ do").is_none());
        assert!(scan("@(x)").is_none());
        assert!(scan("@").is_none());
    }
}
