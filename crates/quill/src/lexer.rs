// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Grammar chain driver.

use crate::grammar::Grammar;
use crate::source::{Buffer, Element};
use crate::token::{Token, TokenKind};

/// Runs an ordered chain of grammars over template source.
///
/// Each grammar sees the output of the previous one. Bytes left over after the
/// last grammar are folded into `Raw` tokens, so the result covers the whole
/// source with no gaps.
#[derive(Default)]
pub struct Lexer {
    grammars: Vec<Box<dyn Grammar>>,
}

impl Lexer {
    /// Creates a lexer without grammars; every input lexes to a single `Raw` token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a grammar to the chain.
    pub fn add_grammar<G: Grammar + 'static>(&mut self, grammar: G) -> &mut Self {
        self.grammars.push(Box::new(grammar));
        self
    }

    /// Builder-style variant of [`Lexer::add_grammar`].
    pub fn with_grammar<G: Grammar + 'static>(mut self, grammar: G) -> Self {
        self.grammars.push(Box::new(grammar));
        self
    }

    /// Tokenizes template source.
    pub fn parse(&self, source: &str) -> Vec<Token> {
        let mut buffer = Buffer::from_source(source);
        for grammar in &self.grammars {
            let elements = grammar.parse(&mut buffer);
            buffer = Buffer::new(elements);
        }
        fold_raw(&mut buffer)
    }
}

/// Merges runs of consecutive bytes into `Raw` tokens.
pub(crate) fn fold_raw(src: &mut Buffer) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut raw: Vec<u8> = Vec::new();
    let mut raw_offset = 0;

    while let Some(element) = src.next() {
        match element {
            Element::Byte(b) => {
                if raw.is_empty() {
                    raw_offset = b.offset;
                }
                raw.push(b.char);
            }
            Element::Token(t) => {
                if !raw.is_empty() {
                    tokens.push(Token::new(TokenKind::Raw, raw_offset, crate::token::bytes_to_string(&raw)));
                    raw.clear();
                }
                tokens.push(t);
            }
        }
    }

    if !raw.is_empty() {
        tokens.push(Token::new(TokenKind::Raw, raw_offset, crate::token::bytes_to_string(&raw)));
    }

    tokens
}
