// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Generic delimiter-pair tokenizer used for `{{ … }}` and `{!! … !!}`.

use super::next_bytes;
use crate::source::{Buffer, Byte, Element};
use crate::token::{pack_token, DynamicToken, Token, TokenKind};

/// Recognizes `START body END` with quote-aware body scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracesGrammar {
    start: String,
    end: String,
    start_token: TokenKind,
    end_token: TokenKind,
}

impl BracesGrammar {
    /// Creates a delimiter pair emitting the given token kinds.
    pub fn new(start: impl Into<String>, end: impl Into<String>, start_token: TokenKind, end_token: TokenKind) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            start_token,
            end_token,
        }
    }

    /// Escaped echo pair.
    pub fn echo(start: &str, end: &str) -> Self {
        Self::new(
            start,
            end,
            TokenKind::Dynamic(DynamicToken::OpenTag),
            TokenKind::Dynamic(DynamicToken::CloseTag),
        )
    }

    /// Raw echo pair.
    pub fn raw(start: &str, end: &str) -> Self {
        Self::new(
            start,
            end,
            TokenKind::Dynamic(DynamicToken::OpenRawTag),
            TokenKind::Dynamic(DynamicToken::CloseRawTag),
        )
    }

    /// Opening sequence.
    pub fn start(&self) -> &str {
        &self.start
    }

    /// Closing sequence.
    pub fn end(&self) -> &str {
        &self.end
    }

    /// Replaces the opening sequence.
    pub fn set_start(&mut self, start: impl Into<String>) {
        self.start = start.into();
    }

    /// Replaces the closing sequence.
    pub fn set_end(&mut self, end: impl Into<String>) {
        self.end = end.into();
    }

    /// True when `first` (already consumed) plus the upcoming bytes spell the opening sequence.
    pub fn starts(&self, src: &Buffer, first: u8) -> bool {
        matches_sequence(&self.start, src, first)
    }

    /// True when the opening sequence begins at the next element.
    pub fn next_token(&self, src: &Buffer) -> bool {
        let bytes = self.start.as_bytes();
        !bytes.is_empty() && src.lookahead(bytes.len()) == bytes
    }

    fn ending(&self, src: &Buffer, first: u8) -> bool {
        matches_sequence(&self.end, src, first)
    }

    /// Scans `START body END` beginning at `first`.
    ///
    /// Returns exactly three tokens (start, body, end) or `None` when the
    /// closing sequence is missing, the body is empty, or a token of another
    /// grammar appears inside. On `None` the caller is expected to replay.
    pub fn parse(&self, src: &mut Buffer, first: Byte) -> Option<Vec<Token>> {
        let mut tokens = vec![Token::new(
            self.start_token,
            first.offset,
            format!("{}{}", first.char as char, next_bytes(src, self.start.len().saturating_sub(1))),
        )];
        let mut body: Vec<Element> = Vec::new();

        while let Some(element) = src.next() {
            let Element::Byte(b) = element else {
                break;
            };

            match b.char {
                b'"' | b'\'' => {
                    body.push(element);
                    while let Some(quoted) = src.next() {
                        let closes = quoted.byte() == Some(b.char);
                        body.push(quoted);
                        if closes {
                            break;
                        }
                    }
                }
                c if self.ending(src, c) => {
                    if !body.is_empty() {
                        tokens.push(pack_token(&body, TokenKind::Dynamic(DynamicToken::Body)));
                    }
                    tokens.push(Token::new(
                        self.end_token,
                        b.offset,
                        format!("{}{}", c as char, next_bytes(src, self.end.len().saturating_sub(1))),
                    ));
                    break;
                }
                _ => body.push(element),
            }
        }

        if tokens.len() != 3 || tokens[2].kind != self.end_token {
            return None;
        }

        Some(tokens)
    }
}

fn matches_sequence(sequence: &str, src: &Buffer, first: u8) -> bool {
    let bytes = sequence.as_bytes();
    match bytes.split_first() {
        Some((head, rest)) => *head == first && (rest.is_empty() || src.lookahead(rest.len()) == rest),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(grammar: &BracesGrammar, source: &str) -> Option<Vec<Token>> {
        let mut src = Buffer::from_source(source);
        let Some(Element::Byte(first)) = src.next() else {
            panic!("Expected a leading byte");
        };
        if !grammar.starts(&src, first.char) {
            return None;
        }
        grammar.parse(&mut src, first)
    }

    #[test]
    fn test_echo() {
        let tokens = scan(&BracesGrammar::echo("{{", "}}"), "{{ $var }}").expect("echo");
        assert_eq!(tokens[0].content, "{{");
        assert_eq!(tokens[1].kind, TokenKind::Dynamic(DynamicToken::Body));
        assert_eq!(tokens[1].content, " $var ");
        assert_eq!(tokens[1].offset, 2);
        assert_eq!(tokens[2].content, "}}");
        assert_eq!(tokens[2].offset, 8);
    }

    #[test]
    fn test_quoted_closing_sequence() {
        let tokens = scan(&BracesGrammar::echo("{{", "}}"), "{{ $var . \"{{ hello world }}\" }}").expect("echo");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].content, " $var . \"{{ hello world }}\" ");
    }

    #[test]
    fn test_raw_pair() {
        let tokens = scan(&BracesGrammar::raw("{!!", "!!}"), "{!! $var !!}").expect("raw");
        assert_eq!(tokens[0].kind, TokenKind::Dynamic(DynamicToken::OpenRawTag));
        assert_eq!(tokens[1].content, " $var ");
        assert_eq!(tokens[2].kind, TokenKind::Dynamic(DynamicToken::CloseRawTag));
    }

    #[test]
    fn test_unterminated() {
        assert!(scan(&BracesGrammar::echo("{{", "}}"), "{{ $var !}").is_none());
    }

    #[test]
    fn test_empty_body() {
        assert!(scan(&BracesGrammar::echo("{{", "}}"), "{{}}").is_none());
    }

    #[test]
    fn test_start_mismatch() {
        assert!(scan(&BracesGrammar::echo("{{", "}}"), "{! $var }}").is_none());
    }
}
