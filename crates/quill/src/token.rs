// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Lexer tokens.
//!
//! Every grammar in the chain emits [`Token`]s tagged with a [`TokenKind`].
//! A token is immutable once produced; tokens that swallowed the output of an
//! earlier grammar (an HTML attribute containing `{{ $x }}`, a `<script>` body)
//! carry those pieces in [`Token::tokens`].

use crate::source::Element;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tokens of the HTML grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HtmlToken {
    /// Tag or attribute name.
    Keyword,
    /// `<`
    Open,
    /// `</`
    OpenShort,
    /// `>`
    Close,
    /// `/>`
    CloseShort,
    /// `=`
    Equal,
    /// Quoted attribute value, quotes included.
    Attribute,
    /// Whitespace between tag parts.
    Whitespace,
    /// Unparsed body of `<script>`, `<style>` and friends.
    Verbatim,
}

/// Tokens of the dynamic grammar (echo tags and directives).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DynamicToken {
    /// Escaped echo opening sequence, `{{` by default.
    OpenTag,
    /// Escaped echo closing sequence, `}}` by default.
    CloseTag,
    /// Raw echo opening sequence, `{!!` by default.
    OpenRawTag,
    /// Raw echo closing sequence, `!!}` by default.
    CloseRawTag,
    /// `(` opening a directive body.
    BodyOpen,
    /// `)` closing a directive body.
    BodyClose,
    /// Echo or directive body.
    Body,
    /// The `@` marker.
    Directive,
    /// Directive name.
    Keyword,
    /// Whitespace between a directive name and its body.
    Whitespace,
}

/// Tokens of the inline placeholder grammar, `${name|default}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InlineToken {
    /// `${`
    OpenTag,
    /// `}`
    CloseTag,
    /// Placeholder name.
    Name,
    /// `|`
    Separator,
    /// Default value.
    Default,
}

/// Tokens of the declare grammar, `key=value, key2='v2'`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclareToken {
    /// Bare word.
    Keyword,
    /// `=`
    Equal,
    /// `,`
    Comma,
    /// Quoted string, delimiters included.
    Quoted,
}

/// Token type, namespaced by the grammar that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// Plain text no grammar claimed.
    Raw,
    /// Host-language code fragment.
    Php,
    /// HTML grammar token.
    Html(HtmlToken),
    /// Dynamic grammar token.
    Dynamic(DynamicToken),
    /// Inline grammar token.
    Inline(InlineToken),
    /// Declare grammar token.
    Declare(DeclareToken),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Raw => write!(f, "RAW"),
            TokenKind::Php => write!(f, "PHP"),
            TokenKind::Html(t) => write!(f, "HTML:{}", format!("{:?}", t).to_uppercase()),
            TokenKind::Dynamic(t) => write!(f, "DYNAMIC:{}", format!("{:?}", t).to_uppercase()),
            TokenKind::Inline(t) => write!(f, "INLINE:{}", format!("{:?}", t).to_uppercase()),
            TokenKind::Declare(t) => write!(f, "DECLARE:{}", format!("{:?}", t).to_uppercase()),
        }
    }
}

/// A lexed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Token type.
    pub kind: TokenKind,
    /// Byte offset of the first character in the template source.
    pub offset: usize,
    /// Literal token text.
    pub content: String,
    /// Tokens of earlier grammars swallowed by this one, in source order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<Token>,
}

impl Token {
    /// Creates a token without sub-tokens.
    pub fn new(kind: TokenKind, offset: usize, content: impl Into<String>) -> Self {
        Self {
            kind,
            offset,
            content: content.into(),
            tokens: Vec::new(),
        }
    }

    /// Byte offset just past the end of this token.
    pub fn end(&self) -> usize {
        self.offset + self.content.len()
    }
}

/// Packs a run of elements into a single token of the given kind.
///
/// When the run mixes bytes with tokens of earlier grammars, the packed token
/// keeps them as sub-tokens: consecutive bytes become `Raw` tokens and foreign
/// tokens are kept as they are.
pub fn pack_token(elements: &[Element], kind: TokenKind) -> Token {
    let offset = elements.first().map(Element::offset).unwrap_or(0);
    let has_tokens = elements.iter().any(|e| matches!(e, Element::Token(_)));

    let mut content = Vec::new();
    let mut sub_tokens = Vec::new();
    let mut raw: Vec<u8> = Vec::new();
    let mut raw_offset = 0;

    for element in elements {
        match element {
            Element::Byte(b) => {
                if raw.is_empty() {
                    raw_offset = b.offset;
                }
                raw.push(b.char);
                content.push(b.char);
            }
            Element::Token(t) => {
                if has_tokens && !raw.is_empty() {
                    sub_tokens.push(Token::new(TokenKind::Raw, raw_offset, bytes_to_string(&raw)));
                    raw.clear();
                }
                content.extend_from_slice(t.content.as_bytes());
                sub_tokens.push(t.clone());
            }
        }
    }

    if has_tokens && !raw.is_empty() {
        sub_tokens.push(Token::new(TokenKind::Raw, raw_offset, bytes_to_string(&raw)));
    }

    Token {
        kind,
        offset,
        content: bytes_to_string(&content),
        tokens: if has_tokens { sub_tokens } else { Vec::new() },
    }
}

/// Decodes scanned bytes. Token boundaries always fall on ASCII characters,
/// so the lossy branch only triggers on invalid input.
pub(crate) fn bytes_to_string(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}
