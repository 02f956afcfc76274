// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Host-code grammar: `<?php … ?>` and `<?= … ?>` fragments.
//!
//! Runs first in the chain so that later grammars never look inside PHP.

use super::Grammar;
use crate::host::php_regions;
use crate::source::{Buffer, Byte, Element};
use crate::token::{Token, TokenKind};
use std::ops::Range;

/// The PHP grammar.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhpGrammar;

impl Grammar for PhpGrammar {
    fn parse(&self, src: &mut Buffer) -> Vec<Element> {
        let mut out = Vec::new();
        let mut run: Vec<Byte> = Vec::new();

        while let Some(element) = src.next() {
            match element {
                Element::Byte(b) => run.push(b),
                Element::Token(_) => {
                    split_run(&mut run, &mut out);
                    out.push(element);
                }
            }
        }
        split_run(&mut run, &mut out);

        out
    }
}

/// Replaces the PHP regions of a contiguous byte run with `Php` tokens.
fn split_run(run: &mut Vec<Byte>, out: &mut Vec<Element>) {
    if run.is_empty() {
        return;
    }

    let bytes: Vec<u8> = run.iter().map(|b| b.char).collect();
    let regions: Vec<(Range<usize>, String)> = match std::str::from_utf8(&bytes) {
        Ok(text) => php_regions(text)
            .into_iter()
            .map(|r| (r.clone(), text[r].to_string()))
            .collect(),
        Err(_) => Vec::new(),
    };

    let mut cursor = 0;
    for (range, content) in regions {
        out.extend(run[cursor..range.start].iter().copied().map(Element::Byte));
        out.push(Element::Token(Token::new(TokenKind::Php, run[range.start].offset, content)));
        cursor = range.end;
    }
    out.extend(run[cursor..].iter().copied().map(Element::Byte));
    run.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    #[test]
    fn test_php_fragments() {
        let tokens = Lexer::new()
            .with_grammar(PhpGrammar)
            .parse("<a href=\"<?= $url ?>\"><?php if ($x): ?>ok<?php endif ?></a>");
        let php: Vec<&Token> = tokens.iter().filter(|t| t.kind == TokenKind::Php).collect();
        assert_eq!(php.len(), 3);
        assert_eq!(php[0].content, "<?= $url ?>");
        assert_eq!(php[0].offset, 9);
        assert_eq!(php[1].content, "<?php if ($x): ?>");
        assert_eq!(php[2].content, "<?php endif ?>");
    }

    #[test]
    fn test_no_php() {
        let tokens = Lexer::new().with_grammar(PhpGrammar).parse("<b>{{ $x }}</b>");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Raw);
    }
}
