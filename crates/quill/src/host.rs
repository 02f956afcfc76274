// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Minimal PHP lexer.
//!
//! The compiler never interprets host code, but it has to find PHP regions in
//! template text and locate macro calls such as `inject('name')` without
//! tripping over strings and comments. This lexer splits PHP source into just
//! enough token classes for that.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

lazy_static! {
    static ref NUMERIC: Regex = Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").unwrap();
}

/// Host token classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostTokenKind {
    /// Text outside of PHP tags.
    InlineHtml,
    /// `<?php` including one trailing whitespace character.
    OpenTag,
    /// `<?=`
    OpenTagWithEcho,
    /// `?>` including one trailing newline.
    CloseTag,
    /// Whitespace inside PHP.
    Whitespace,
    /// Line or block comment.
    Comment,
    /// Quoted string, quotes included.
    String,
    /// `$name`
    Variable,
    /// Bare word: function names, keywords, constants.
    Identifier,
    /// Numeric literal.
    Number,
    /// Operators and punctuation.
    Punct,
}

/// A host-code token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostToken {
    /// Token class.
    pub kind: HostTokenKind,
    /// Byte offset in the tokenized text.
    pub offset: usize,
    /// Token text.
    pub text: String,
}

impl HostToken {
    fn is_significant(&self) -> bool {
        !matches!(self.kind, HostTokenKind::Whitespace | HostTokenKind::Comment)
    }

    fn is_punct(&self, text: &str) -> bool {
        self.kind == HostTokenKind::Punct && self.text == text
    }
}

/// Tokenizes template text; code is only recognized inside `<?php … ?>` / `<?= … ?>`.
pub fn tokenize(source: &str) -> Vec<HostToken> {
    Scanner::new(source, false).run()
}

/// Tokenizes a bare PHP expression or statement list (no open tag needed).
pub fn tokenize_code(code: &str) -> Vec<HostToken> {
    Scanner::new(code, true).run()
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    in_php: bool,
    tokens: Vec<HostToken>,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str, in_php: bool) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            in_php,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<HostToken> {
        while self.pos < self.bytes.len() {
            if self.in_php {
                self.scan_php();
            } else {
                self.scan_html();
            }
        }
        self.tokens
    }

    fn at(&self, pattern: &str) -> bool {
        self.bytes[self.pos..].starts_with(pattern.as_bytes())
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn emit(&mut self, kind: HostTokenKind, start: usize) {
        self.tokens.push(HostToken {
            kind,
            offset: start,
            text: self.src[start..self.pos].to_string(),
        });
    }

    fn open_tag_len(&self) -> Option<(HostTokenKind, usize)> {
        if self.at("<?=") {
            return Some((HostTokenKind::OpenTagWithEcho, 3));
        }
        if self.bytes.len() - self.pos >= 5 && self.bytes[self.pos..self.pos + 5].eq_ignore_ascii_case(b"<?php") {
            return match self.peek(5) {
                None => Some((HostTokenKind::OpenTag, 5)),
                Some(c) if c.is_ascii_whitespace() => Some((HostTokenKind::OpenTag, 6)),
                Some(_) => None,
            };
        }
        None
    }

    fn scan_html(&mut self) {
        let start = self.pos;
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] == b'<' && self.open_tag_len().is_some() {
                break;
            }
            self.pos += 1;
        }
        if self.pos > start {
            self.emit(HostTokenKind::InlineHtml, start);
        }
        if let Some((kind, len)) = self.open_tag_len() {
            let start = self.pos;
            self.pos += len;
            self.emit(kind, start);
            self.in_php = true;
        }
    }

    fn scan_php(&mut self) {
        let start = self.pos;
        let c = self.bytes[self.pos];

        if self.at("?>") {
            self.pos += 2;
            if self.peek(0) == Some(b'\n') {
                self.pos += 1;
            } else if self.at("\r\n") {
                self.pos += 2;
            }
            self.emit(HostTokenKind::CloseTag, start);
            self.in_php = false;
            return;
        }

        if c.is_ascii_whitespace() {
            while self.peek(0).is_some_and(|c| c.is_ascii_whitespace()) {
                self.pos += 1;
            }
            self.emit(HostTokenKind::Whitespace, start);
            return;
        }

        if self.at("//") || (c == b'#' && self.peek(1) != Some(b'[')) {
            while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' && !self.at("?>") {
                self.pos += 1;
            }
            self.emit(HostTokenKind::Comment, start);
            return;
        }

        if self.at("/*") {
            self.pos += 2;
            while self.pos < self.bytes.len() && !self.at("*/") {
                self.pos += 1;
            }
            self.pos = (self.pos + 2).min(self.bytes.len());
            self.emit(HostTokenKind::Comment, start);
            return;
        }

        match c {
            b'\'' | b'"' | b'`' => {
                self.pos += 1;
                while self.pos < self.bytes.len() {
                    match self.bytes[self.pos] {
                        b'\\' => self.pos += 2,
                        q if q == c => {
                            self.pos += 1;
                            break;
                        }
                        _ => self.pos += 1,
                    }
                }
                self.pos = self.pos.min(self.bytes.len());
                self.emit(HostTokenKind::String, start);
            }
            b'$' if self.peek(1).is_some_and(is_ident_start) => {
                self.pos += 1;
                while self.peek(0).is_some_and(is_ident_char) {
                    self.pos += 1;
                }
                self.emit(HostTokenKind::Variable, start);
            }
            c if is_ident_start(c) => {
                while self.peek(0).is_some_and(is_ident_char) {
                    self.pos += 1;
                }
                self.emit(HostTokenKind::Identifier, start);
            }
            c if c.is_ascii_digit() || (c == b'.' && self.peek(1).is_some_and(|d| d.is_ascii_digit())) => {
                while self
                    .peek(0)
                    .is_some_and(|d| d.is_ascii_alphanumeric() || d == b'.' || d == b'_')
                {
                    self.pos += 1;
                }
                self.emit(HostTokenKind::Number, start);
            }
            _ => {
                let len = ["?->", "->", "::", "=>"]
                    .iter()
                    .find(|op| self.at(op))
                    .map_or(1, |op| op.len());
                self.pos += len;
                self.emit(HostTokenKind::Punct, start);
            }
        }
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c >= 0x80
}

fn is_ident_char(c: u8) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

/// Byte ranges of PHP regions (open tag through close tag) in template text.
pub fn php_regions(source: &str) -> Vec<Range<usize>> {
    let mut regions = Vec::new();
    let mut start = None;

    for token in tokenize(source) {
        match token.kind {
            HostTokenKind::OpenTag | HostTokenKind::OpenTagWithEcho => start = Some(token.offset),
            HostTokenKind::CloseTag => {
                if let Some(s) = start.take() {
                    regions.push(s..token.offset + token.text.len());
                }
            }
            _ => {}
        }
    }

    if let Some(s) = start {
        regions.push(s..source.len());
    }

    regions
}

/// A call to a compiler macro found in host code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroCall {
    /// Byte range of the whole call, from the function name through `)`.
    pub span: Range<usize>,
    /// Argument expressions, trimmed.
    pub arguments: Vec<String>,
    /// First argument when it is a plain string literal.
    pub name: Option<String>,
}

/// Finds every call to function `name` (case-insensitive) in a token stream.
///
/// Method calls (`->name(`), static calls (`::name(`) and declarations
/// (`function name(`) are ignored, as are calls with unbalanced parentheses.
pub fn find_macro_calls(tokens: &[HostToken], name: &str) -> Vec<MacroCall> {
    let mut calls = Vec::new();
    let mut prev: Option<&HostToken> = None;
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];
        i += 1;
        if !token.is_significant() {
            continue;
        }
        let previous = prev.replace(token);

        if token.kind != HostTokenKind::Identifier || !token.text.eq_ignore_ascii_case(name) {
            continue;
        }
        let qualified = previous.is_some_and(|p| {
            ["->", "?->", "::", "\\"].iter().any(|op| p.is_punct(op))
                || (p.kind == HostTokenKind::Identifier && p.text.eq_ignore_ascii_case("function"))
        });
        if qualified {
            continue;
        }

        let Some(open) = (i..tokens.len()).find(|&j| tokens[j].is_significant()) else {
            continue;
        };
        if !tokens[open].is_punct("(") {
            continue;
        }

        if let Some((call, end)) = scan_arguments(tokens, token.offset, open) {
            calls.push(call);
            i = end;
            prev = tokens.get(end.wrapping_sub(1));
        }
    }

    calls
}

fn scan_arguments(tokens: &[HostToken], start: usize, open: usize) -> Option<(MacroCall, usize)> {
    let mut depth = 0usize;
    let mut arguments = Vec::new();
    let mut current: Vec<&HostToken> = Vec::new();
    let mut first: Option<Vec<&HostToken>> = None;

    for (j, token) in tokens.iter().enumerate().skip(open) {
        if token.kind == HostTokenKind::Punct {
            match token.text.as_str() {
                "(" | "[" | "{" => {
                    depth += 1;
                    if depth == 1 {
                        continue;
                    }
                }
                ")" | "]" | "}" => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        finish_argument(&mut current, &mut arguments, &mut first);
                        let name = first.and_then(|arg| literal_name(&arg));
                        let call = MacroCall {
                            span: start..token.offset + token.text.len(),
                            arguments,
                            name,
                        };
                        return Some((call, j + 1));
                    }
                }
                "," if depth == 1 => {
                    finish_argument(&mut current, &mut arguments, &mut first);
                    continue;
                }
                _ => {}
            }
        }
        if token.kind == HostTokenKind::CloseTag {
            return None;
        }
        current.push(token);
    }

    None
}

fn finish_argument<'t>(
    current: &mut Vec<&'t HostToken>,
    arguments: &mut Vec<String>,
    first: &mut Option<Vec<&'t HostToken>>,
) {
    let text: String = current.iter().map(|t| t.text.as_str()).collect();
    let text = text.trim();
    if !text.is_empty() || !arguments.is_empty() {
        arguments.push(text.to_string());
    }
    if first.is_none() {
        *first = Some(current.clone());
    }
    current.clear();
}

fn literal_name(argument: &[&HostToken]) -> Option<String> {
    let significant: Vec<&&HostToken> = argument.iter().filter(|t| t.is_significant()).collect();
    match significant.as_slice() {
        [token] if token.kind == HostTokenKind::String => unquote(&token.text),
        _ => None,
    }
}

/// Unquotes a single- or double-quoted PHP string literal.
pub fn unquote(literal: &str) -> Option<String> {
    let bytes = literal.as_bytes();
    if bytes.len() < 2 || !matches!(bytes[0], b'\'' | b'"') || bytes[bytes.len() - 1] != bytes[0] {
        return None;
    }
    let quote = bytes[0] as char;
    let inner = &literal[1..literal.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(n) if n == quote || n == '\\' => result.push(n),
                Some(n) => {
                    result.push('\\');
                    result.push(n);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }
    Some(result)
}

/// Replaces byte ranges of `source`. Ranges must not overlap.
pub fn splice(source: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(range, _)| range.start);
    let mut result = String::with_capacity(source.len());
    let mut cursor = 0;
    for (range, replacement) in edits {
        result.push_str(&source[cursor..range.start]);
        result.push_str(&replacement);
        cursor = range.end;
    }
    result.push_str(&source[cursor..]);
    result
}

/// Exports template text as a PHP literal.
///
/// `true`, `false`, `null` and numbers pass through unquoted; anything else
/// becomes a single-quoted string.
pub fn export_literal(text: &str) -> String {
    let trimmed = text.trim();
    let lower = trimmed.to_ascii_lowercase();
    if matches!(lower.as_str(), "true" | "false" | "null") || NUMERIC.is_match(trimmed) {
        return trimmed.to_string();
    }
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Strips PHP tags, a leading `echo` and the trailing `;` from a code block,
/// leaving the bare expression.
pub fn strip_php_block(tokens: &[HostToken]) -> String {
    let mut body: Vec<&HostToken> = tokens
        .iter()
        .filter(|t| {
            !matches!(
                t.kind,
                HostTokenKind::OpenTag | HostTokenKind::OpenTagWithEcho | HostTokenKind::CloseTag | HostTokenKind::InlineHtml
            )
        })
        .collect();

    while body.first().is_some_and(|t| !t.is_significant()) {
        body.remove(0);
    }
    if body
        .first()
        .is_some_and(|t| t.kind == HostTokenKind::Identifier && t.text.eq_ignore_ascii_case("echo"))
    {
        body.remove(0);
    }
    while body.last().is_some_and(|t| !t.is_significant() || t.is_punct(";")) {
        body.pop();
    }

    body.iter().map(|t| t.text.as_str()).collect::<String>().trim().to_string()
}
