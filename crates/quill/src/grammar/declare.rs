// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Option-list tokenizer for `@declare(key=value, other='x')`.

use super::{is_whitespace, Grammar};
use crate::lexer::Lexer;
use crate::source::{Buffer, Element};
use crate::token::{pack_token, DeclareToken, TokenKind};
use std::collections::BTreeMap;

/// Splits a declare body into keywords, `=`, `,` and quoted values.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclareGrammar;

impl Grammar for DeclareGrammar {
    fn parse(&self, src: &mut Buffer) -> Vec<Element> {
        let mut out = Vec::new();
        let mut keyword: Vec<Element> = Vec::new();

        let flush = |keyword: &mut Vec<Element>, out: &mut Vec<Element>| {
            if !keyword.is_empty() {
                out.push(Element::Token(pack_token(keyword, TokenKind::Declare(DeclareToken::Keyword))));
                keyword.clear();
            }
        };

        while let Some(element) = src.next() {
            let Element::Byte(b) = element else {
                flush(&mut keyword, &mut out);
                out.push(element);
                continue;
            };

            match b.char {
                b'"' | b'\'' => {
                    flush(&mut keyword, &mut out);
                    let mut quoted = vec![element];
                    while let Some(next) = src.next() {
                        let closes = next.byte() == Some(b.char);
                        quoted.push(next);
                        if closes {
                            break;
                        }
                    }
                    out.push(Element::Token(pack_token(&quoted, TokenKind::Declare(DeclareToken::Quoted))));
                }
                b'=' => {
                    flush(&mut keyword, &mut out);
                    out.push(Element::Token(pack_token(&[element], TokenKind::Declare(DeclareToken::Equal))));
                }
                b',' => {
                    flush(&mut keyword, &mut out);
                    out.push(Element::Token(pack_token(&[element], TokenKind::Declare(DeclareToken::Comma))));
                }
                c if is_whitespace(c) => flush(&mut keyword, &mut out),
                _ => keyword.push(element),
            }
        }

        flush(&mut keyword, &mut out);
        out
    }
}

/// Parses a declare body into an ordered option map.
///
/// `key=value` and `key='value'` set an option; a bare `key` maps to `None`.
pub fn fetch_options(body: &str) -> BTreeMap<String, Option<String>> {
    let tokens = Lexer::new().with_grammar(DeclareGrammar).parse(body);
    let mut options = BTreeMap::new();
    let mut pending: Option<String> = None;

    for token in tokens {
        let value = match token.kind {
            TokenKind::Declare(DeclareToken::Keyword) => token.content.trim().to_string(),
            TokenKind::Declare(DeclareToken::Quoted) => unquote(&token.content).to_string(),
            TokenKind::Declare(DeclareToken::Comma) => {
                if let Some(key) = pending.take() {
                    options.insert(key, None);
                }
                continue;
            }
            _ => continue,
        };

        match pending.take() {
            Some(key) => {
                options.insert(key, Some(value));
            }
            None => pending = Some(value),
        }
    }

    if let Some(key) = pending {
        options.insert(key, None);
    }

    options
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 && matches!(bytes[0], b'"' | b'\'') && bytes[bytes.len() - 1] == bytes[0] {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Token;

    fn lex(source: &str) -> Vec<Token> {
        Lexer::new().with_grammar(DeclareGrammar).parse(source)
    }

    #[test]
    fn test_tokens() {
        let tokens = lex("syntax=off, open='[['");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Declare(DeclareToken::Keyword),
                TokenKind::Declare(DeclareToken::Equal),
                TokenKind::Declare(DeclareToken::Keyword),
                TokenKind::Declare(DeclareToken::Comma),
                TokenKind::Declare(DeclareToken::Keyword),
                TokenKind::Declare(DeclareToken::Equal),
                TokenKind::Declare(DeclareToken::Quoted),
            ]
        );
        assert_eq!(tokens[6].content, "'[['");
        assert_eq!(tokens[4].offset, 12);
    }

    #[test]
    fn test_options() {
        let options = fetch_options("open=\"[[\", close=']]', strict, syntax = on");
        assert_eq!(options.get("open"), Some(&Some("[[".to_string())));
        assert_eq!(options.get("close"), Some(&Some("]]".to_string())));
        assert_eq!(options.get("strict"), Some(&None));
        assert_eq!(options.get("syntax"), Some(&Some("on".to_string())));
    }

    #[test]
    fn test_quoted_comma() {
        let options = fetch_options("open='a,b'");
        assert_eq!(options.get("open"), Some(&Some("a,b".to_string())));
    }
}
