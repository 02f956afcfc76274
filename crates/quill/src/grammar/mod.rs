// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Lexer grammars.
//!
//! A grammar consumes a [`Buffer`] of elements and returns a new element
//! stream in which the constructs it recognizes are replaced by tokens.
//! Everything else, including tokens of earlier grammars, passes through
//! untouched. Grammars never fail: a construct that turns out to be invalid
//! is given back to the stream byte by byte.

use crate::source::{Buffer, Element};

pub mod braces;
pub mod declare;
pub mod directive;
pub mod dynamic;
pub mod html;
pub mod inline;
pub mod php;

pub use braces::BracesGrammar;
pub use declare::DeclareGrammar;
pub use directive::DirectiveGrammar;
pub use dynamic::{DynamicGrammar, GrammarMode};
pub use html::HtmlGrammar;
pub use inline::InlineGrammar;
pub use php::PhpGrammar;

/// One stage of the lexer chain.
pub trait Grammar: Send + Sync {
    /// Scans the whole buffer and returns the transformed element stream.
    fn parse(&self, src: &mut Buffer) -> Vec<Element>;
}

/// ASCII whitespace as understood by every grammar.
pub(crate) fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

/// Consumes up to `size` elements, collecting their bytes.
pub(crate) fn next_bytes(src: &mut Buffer, size: usize) -> String {
    let mut result = Vec::with_capacity(size);
    for _ in 0..size {
        match src.next() {
            Some(Element::Byte(b)) => result.push(b.char),
            Some(Element::Token(t)) => result.extend_from_slice(t.content.as_bytes()),
            None => break,
        }
    }
    crate::token::bytes_to_string(&result)
}
