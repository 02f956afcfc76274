// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Inline placeholders: `${name}` and `${name|default value}`.

use super::directive::is_keyword_char;
use super::{is_whitespace, Grammar};
use crate::source::{Buffer, Element};
use crate::token::{pack_token, InlineToken, Token, TokenKind};

/// The inline placeholder grammar.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineGrammar;

impl Grammar for InlineGrammar {
    fn parse(&self, src: &mut Buffer) -> Vec<Element> {
        let mut out = Vec::new();

        while let Some(element) = src.next() {
            let Element::Byte(b) = element else {
                out.push(element);
                continue;
            };

            if b.char != b'$' || src.lookahead_byte() != Some(b'{') {
                out.push(element);
                continue;
            }

            match parse_placeholder(src, b.offset) {
                Some(tokens) => out.extend(tokens.into_iter().map(Element::Token)),
                None => {
                    out.push(element);
                    src.replay(b.offset);
                }
            }
        }

        out
    }
}

fn parse_placeholder(src: &mut Buffer, offset: usize) -> Option<Vec<Token>> {
    src.next();
    let mut tokens = vec![Token::new(TokenKind::Inline(InlineToken::OpenTag), offset, "${")];
    let mut name: Vec<Element> = Vec::new();
    let mut default: Option<Vec<Element>> = None;

    while let Some(element) = src.next() {
        let Element::Byte(b) = element else {
            return None;
        };

        if b.char == b'}' {
            if name.iter().all(|e| e.byte().is_some_and(is_whitespace)) {
                return None;
            }
            tokens.insert(1, pack_token(&name, TokenKind::Inline(InlineToken::Name)));
            if let Some(default) = default.filter(|d| !d.is_empty()) {
                tokens.push(pack_token(&default, TokenKind::Inline(InlineToken::Default)));
            }
            tokens.push(Token::new(TokenKind::Inline(InlineToken::CloseTag), b.offset, "}"));
            return Some(tokens);
        }

        if let Some(default) = default.as_mut() {
            default.push(element);
            continue;
        }

        match b.char {
            b'|' => {
                tokens.push(Token::new(TokenKind::Inline(InlineToken::Separator), b.offset, "|"));
                default = Some(Vec::new());
            }
            c if is_keyword_char(c) || is_whitespace(c) => name.push(element),
            _ => return None,
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn lex(source: &str) -> Vec<Token> {
        Lexer::new().with_grammar(InlineGrammar).parse(source)
    }

    fn inline(kind: InlineToken) -> TokenKind {
        TokenKind::Inline(kind)
    }

    #[test]
    fn test_name_only() {
        let tokens = lex("a ${title} b");
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[1].kind, inline(InlineToken::OpenTag));
        assert_eq!(tokens[2].kind, inline(InlineToken::Name));
        assert_eq!(tokens[2].content, "title");
        assert_eq!(tokens[2].offset, 4);
        assert_eq!(tokens[3].kind, inline(InlineToken::CloseTag));
    }

    #[test]
    fn test_default_value() {
        let tokens = lex("${name|default 'value'}");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                inline(InlineToken::OpenTag),
                inline(InlineToken::Name),
                inline(InlineToken::Separator),
                inline(InlineToken::Default),
                inline(InlineToken::CloseTag),
            ]
        );
        assert_eq!(tokens[3].content, "default 'value'");
    }

    #[test]
    fn test_invalid_placeholders() {
        for source in ["${'name'}", "${}", "${name", "$ {name}"] {
            let tokens = lex(source);
            assert_eq!(tokens.len(), 1, "{}", source);
            assert_eq!(tokens[0].kind, TokenKind::Raw);
            assert_eq!(tokens[0].content, source);
        }
    }
}
