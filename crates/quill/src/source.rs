// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Byte source shared by all grammars.
//!
//! Grammars run as a chain: the first one sees raw bytes, later ones see the
//! bytes left over plus the tokens earlier grammars produced. [`Buffer`] is a
//! cursor over that mixed [`Element`] stream with single-element lookahead,
//! lookahead by length and the ability to rewind (`replay`) after a grammar
//! gives up on a candidate.

use crate::token::Token;

/// One byte of template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Byte {
    /// Byte offset in the template source.
    pub offset: usize,
    /// The byte itself.
    pub char: u8,
}

/// A stream element: either an unclaimed byte or a token of an earlier grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// Unclaimed source byte.
    Byte(Byte),
    /// Token produced by an earlier grammar.
    Token(Token),
}

impl Element {
    /// Offset of the element in the template source.
    pub fn offset(&self) -> usize {
        match self {
            Element::Byte(b) => b.offset,
            Element::Token(t) => t.offset,
        }
    }

    /// Returns the byte value if this element is a byte.
    pub fn byte(&self) -> Option<u8> {
        match self {
            Element::Byte(b) => Some(b.char),
            Element::Token(_) => None,
        }
    }
}

/// Cursor over an element stream.
#[derive(Debug, Clone, Default)]
pub struct Buffer {
    elements: Vec<Element>,
    pos: usize,
}

impl Buffer {
    /// Wraps an element stream.
    pub fn new(elements: Vec<Element>) -> Self {
        Self { elements, pos: 0 }
    }

    /// Creates a byte stream over template source.
    pub fn from_source(source: &str) -> Self {
        Self::new(
            source
                .bytes()
                .enumerate()
                .map(|(offset, char)| Element::Byte(Byte { offset, char }))
                .collect(),
        )
    }

    /// Consumes and returns the next element.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<Element> {
        let element = self.elements.get(self.pos).cloned();
        if element.is_some() {
            self.pos += 1;
        }
        element
    }

    /// The next element, without consuming it.
    pub fn peek(&self) -> Option<&Element> {
        self.elements.get(self.pos)
    }

    /// The next element's byte, `None` at the end or when the next element is a token.
    pub fn lookahead_byte(&self) -> Option<u8> {
        self.peek().and_then(Element::byte)
    }

    /// Up to `size` upcoming bytes; stops early at a token or the end of stream.
    pub fn lookahead(&self, size: usize) -> Vec<u8> {
        self.elements[self.pos..]
            .iter()
            .take(size)
            .map_while(Element::byte)
            .collect()
    }

    /// Offset of the most recently consumed element.
    pub fn offset(&self) -> usize {
        match self.pos.checked_sub(1).and_then(|i| self.elements.get(i)) {
            Some(element) => element.offset(),
            None => 0,
        }
    }

    /// Rewinds (or fast-forwards) so that the next element is the first one
    /// located after `offset`.
    pub fn replay(&mut self, offset: usize) {
        self.pos = self.elements.partition_point(|e| e.offset() <= offset);
    }

    /// True when every element has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.elements.len()
    }
}
