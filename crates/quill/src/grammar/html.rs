// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! HTML tag tokenizer.
//!
//! Splits `<name attr="value" other>` into OPEN, KEYWORD, WHITESPACE, EQUAL,
//! ATTRIBUTE and CLOSE tokens. Tokens of earlier grammars found inside a tag
//! become part of the keyword or attribute being read. The bodies of verbatim
//! tags (`script`, `style`, `canvas`) are emitted as a single VERBATIM token.

use super::{is_whitespace, Grammar};
use crate::source::{Buffer, Element};
use crate::token::{pack_token, HtmlToken, Token, TokenKind};

/// Tags whose body is never tokenized as HTML.
pub const DEFAULT_VERBATIM_TAGS: [&str; 3] = ["script", "style", "canvas"];

fn html(kind: HtmlToken) -> TokenKind {
    TokenKind::Html(kind)
}

/// The HTML grammar.
#[derive(Debug, Clone)]
pub struct HtmlGrammar {
    verbatim_tags: Vec<String>,
}

impl Default for HtmlGrammar {
    fn default() -> Self {
        Self::new(DEFAULT_VERBATIM_TAGS.iter().map(|t| t.to_string()).collect())
    }
}

impl HtmlGrammar {
    /// Creates the grammar with a custom verbatim tag list.
    pub fn new(verbatim_tags: Vec<String>) -> Self {
        Self {
            verbatim_tags: verbatim_tags.into_iter().map(|t| t.to_ascii_lowercase()).collect(),
        }
    }

    fn is_verbatim(&self, tag: &[Token]) -> bool {
        tag.first().is_some_and(|t| t.kind == html(HtmlToken::Open))
            && tag.last().is_some_and(|t| t.kind == html(HtmlToken::Close))
            && tag
                .get(1)
                .is_some_and(|t| self.verbatim_tags.contains(&t.content.to_ascii_lowercase()))
    }

    fn closes_verbatim(src: &Buffer, name: &str) -> bool {
        let expected = 2 + name.len();
        let ahead = src.lookahead(expected + 1);
        if ahead.len() < expected || !ahead.starts_with(b"</") {
            return false;
        }
        if !ahead[2..expected].eq_ignore_ascii_case(name.as_bytes()) {
            return false;
        }
        match ahead.get(expected) {
            None => true,
            Some(&c) => c == b'>' || c == b'/' || is_whitespace(c),
        }
    }

    fn parse_verbatim(src: &mut Buffer, name: &str) -> Option<Token> {
        let mut content: Vec<Element> = Vec::new();

        loop {
            if src.lookahead_byte() == Some(b'<') && Self::closes_verbatim(src, name) {
                break;
            }
            let Some(element) = src.next() else {
                break;
            };
            let Element::Byte(b) = element else {
                content.push(element);
                continue;
            };

            match b.char {
                b'"' | b'\'' | b'`' => {
                    content.push(element);
                    while let Some(next) = src.next() {
                        let c = next.byte();
                        content.push(next);
                        if c == Some(b'\\') {
                            if let Some(escaped) = src.next() {
                                content.push(escaped);
                            }
                            continue;
                        }
                        if c == Some(b.char) || (b.char != b'`' && c == Some(b'\n')) {
                            break;
                        }
                    }
                }
                b'/' if src.lookahead_byte() == Some(b'*') => {
                    content.push(element);
                    let mut prev = 0u8;
                    while let Some(next) = src.next() {
                        let c = next.byte();
                        content.push(next);
                        if prev == b'*' && c == Some(b'/') && content.len() > 3 {
                            break;
                        }
                        prev = c.unwrap_or(0);
                    }
                }
                b'/' if src.lookahead_byte() == Some(b'/') => {
                    content.push(element);
                    while src.lookahead_byte() != Some(b'\n') {
                        if src.lookahead_byte() == Some(b'<') && Self::closes_verbatim(src, name) {
                            break;
                        }
                        match src.next() {
                            Some(next) => content.push(next),
                            None => break,
                        }
                    }
                }
                _ => content.push(element),
            }
        }

        if content.is_empty() {
            return None;
        }
        Some(pack_token(&content, html(HtmlToken::Verbatim)))
    }
}

impl Grammar for HtmlGrammar {
    fn parse(&self, src: &mut Buffer) -> Vec<Element> {
        let mut out = Vec::new();

        while let Some(element) = src.next() {
            let Element::Byte(b) = element else {
                out.push(element);
                continue;
            };
            if b.char != b'<' {
                out.push(element);
                continue;
            }

            let Some(tag) = TagScanner::default().scan(src, b.offset) else {
                out.push(element);
                src.replay(b.offset);
                continue;
            };

            let verbatim = self.is_verbatim(&tag);
            let name = tag.get(1).map(|t| t.content.clone()).unwrap_or_default();
            out.extend(tag.into_iter().map(Element::Token));

            if verbatim {
                if let Some(body) = Self::parse_verbatim(src, &name) {
                    out.push(Element::Token(body));
                }
            }
        }

        out
    }
}

/// Scanner for a single tag candidate.
#[derive(Default)]
struct TagScanner {
    tokens: Vec<Token>,
    keyword: Vec<Element>,
    whitespace: Vec<Element>,
    attr: Vec<Element>,
}

impl TagScanner {
    fn scan(mut self, src: &mut Buffer, offset: usize) -> Option<Vec<Token>> {
        if src.lookahead_byte() == Some(b'/') {
            src.next();
            self.tokens.push(Token::new(html(HtmlToken::OpenShort), offset, "</"));
        } else {
            self.tokens.push(Token::new(html(HtmlToken::Open), offset, "<"));
        }

        let mut closed = false;
        while let Some(element) = src.next() {
            if let Some(quote) = self.attr.first().and_then(Element::byte) {
                let ends = element.byte() == Some(quote);
                self.attr.push(element);
                if ends {
                    self.tokens.push(pack_token(&self.attr, html(HtmlToken::Attribute)));
                    self.attr.clear();
                }
                continue;
            }

            let Element::Byte(b) = element else {
                self.flush_whitespace();
                self.keyword.push(element);
                continue;
            };

            match b.char {
                b'"' | b'\'' => {
                    if self.keyword.is_empty() {
                        self.flush_whitespace();
                        self.attr.push(element);
                    } else {
                        self.keyword.push(element);
                    }
                }
                b'=' => {
                    self.flush();
                    self.tokens.push(Token::new(html(HtmlToken::Equal), b.offset, "="));
                }
                b'/' if src.lookahead_byte() == Some(b'>') => {
                    self.flush();
                    src.next();
                    self.tokens.push(Token::new(html(HtmlToken::CloseShort), b.offset, "/>"));
                    closed = true;
                    break;
                }
                b'>' => {
                    self.flush();
                    self.tokens.push(Token::new(html(HtmlToken::Close), b.offset, ">"));
                    closed = true;
                    break;
                }
                b'<' => return None,
                c if is_whitespace(c) => {
                    if self.tokens.len() == 1 && self.keyword.is_empty() {
                        return None;
                    }
                    self.flush_keyword();
                    self.whitespace.push(element);
                }
                _ => {
                    self.flush_whitespace();
                    self.keyword.push(element);
                }
            }
        }

        if !closed || !self.is_valid() {
            return None;
        }
        Some(self.tokens)
    }

    fn is_valid(&self) -> bool {
        self.tokens.len() >= 3 && self.tokens.get(1).is_some_and(|t| t.kind == html(HtmlToken::Keyword))
    }

    fn flush(&mut self) {
        self.flush_whitespace();
        self.flush_keyword();
    }

    fn flush_keyword(&mut self) {
        if self.keyword.is_empty() {
            return;
        }
        self.tokens.push(pack_token(&self.keyword, html(HtmlToken::Keyword)));
        self.keyword.clear();
    }

    fn flush_whitespace(&mut self) {
        if self.whitespace.is_empty() {
            return;
        }
        self.tokens.push(pack_token(&self.whitespace, html(HtmlToken::Whitespace)));
        self.whitespace.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{DynamicGrammar, PhpGrammar};
    use crate::lexer::Lexer;

    fn lex(source: &str) -> Vec<Token> {
        Lexer::new().with_grammar(HtmlGrammar::default()).parse(source)
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_tag() {
        let tokens = lex("<a href=\"url\" hidden>");
        assert_eq!(
            kinds(&tokens),
            vec![
                html(HtmlToken::Open),
                html(HtmlToken::Keyword),
                html(HtmlToken::Whitespace),
                html(HtmlToken::Keyword),
                html(HtmlToken::Equal),
                html(HtmlToken::Attribute),
                html(HtmlToken::Whitespace),
                html(HtmlToken::Keyword),
                html(HtmlToken::Close),
            ]
        );
        assert_eq!(tokens[5].content, "\"url\"");
        assert_eq!(tokens[5].offset, 8);
    }

    #[test]
    fn test_closing_and_short_tags() {
        let tokens = lex("</a><br/>");
        assert_eq!(tokens[0].kind, html(HtmlToken::OpenShort));
        assert_eq!(tokens[0].content, "</");
        assert_eq!(tokens[1].content, "a");
        assert_eq!(tokens[3].kind, html(HtmlToken::Open));
        assert_eq!(tokens[5].kind, html(HtmlToken::CloseShort));
        assert_eq!(tokens[5].offset, 7);
    }

    #[test]
    fn test_invalid_tags_are_raw() {
        for source in ["a < b", "<>", "<a", "<=a>", "< a>", "<a <b>"] {
            let tokens = lex(source);
            assert_eq!(tokens[0].kind, TokenKind::Raw, "{}", source);
        }
        let tokens = lex("<a <b>");
        assert_eq!(tokens[0].content, "<a ");
        assert_eq!(tokens[1].kind, html(HtmlToken::Open));
    }

    #[test]
    fn test_attribute_with_embedded_tokens() {
        let tokens = Lexer::new()
            .with_grammar(DynamicGrammar::default())
            .with_grammar(HtmlGrammar::default())
            .parse("<a href=\"/x/{{ $id }}\">");
        let attr = &tokens[5];
        assert_eq!(attr.kind, html(HtmlToken::Attribute));
        assert_eq!(attr.content, "\"/x/{{ $id }}\"");
        assert_eq!(attr.tokens.len(), 5);
        assert_eq!(attr.tokens[0].content, "\"/x/");
        assert_eq!(attr.tokens[4].content, "\"");
    }

    #[test]
    fn test_keyword_with_embedded_php() {
        let tokens = Lexer::new()
            .with_grammar(PhpGrammar)
            .with_grammar(HtmlGrammar::default())
            .parse("<div <?= $attrs ?>>");
        assert_eq!(tokens[3].kind, html(HtmlToken::Keyword));
        assert_eq!(tokens[3].tokens.len(), 1);
        assert_eq!(tokens[3].tokens[0].kind, TokenKind::Php);
    }

    #[test]
    fn test_verbatim_script() {
        let tokens = lex("<script>if (a < b) { x = '</b>'; }</script>");
        assert_eq!(tokens[2].kind, html(HtmlToken::Close));
        assert_eq!(tokens[3].kind, html(HtmlToken::Verbatim));
        assert_eq!(tokens[3].content, "if (a < b) { x = '</b>'; }");
        assert_eq!(tokens[4].kind, html(HtmlToken::OpenShort));
        assert_eq!(tokens[5].content, "script");
    }

    #[test]
    fn test_verbatim_comments_and_case() {
        let tokens = lex("<style>/* '</STYLE> */ a{}</STYLE>");
        assert_eq!(tokens[3].content, "/* '</STYLE> */ a{}");
        assert_eq!(tokens[5].content, "STYLE");
    }

    #[test]
    fn test_verbatim_keeps_dynamic_tokens() {
        let tokens = Lexer::new()
            .with_grammar(DynamicGrammar::default())
            .with_grammar(HtmlGrammar::default())
            .parse("<script>var a = {{ $a }};</script>");
        let verbatim = &tokens[3];
        assert_eq!(verbatim.kind, html(HtmlToken::Verbatim));
        assert_eq!(verbatim.tokens.len(), 5);
        assert_eq!(verbatim.tokens[2].content, " $a ");
    }

    #[test]
    fn test_empty_script() {
        let tokens = lex("<script></script>");
        assert_eq!(tokens.len(), 6);
        assert_eq!(tokens[3].kind, html(HtmlToken::OpenShort));
    }
}
