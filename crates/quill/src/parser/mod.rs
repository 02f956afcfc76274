// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Token stream to syntax tree.
//!
//! The parser dispatches each token to the syntax that owns its grammar.
//! Syntaxes are small state machines created fresh for every token list, so
//! nested parses (attribute values, verbatim bodies) never share state with
//! the enclosing one.

mod assembler;
mod dynamic;
mod html;
mod inline;

pub use assembler::Assembler;
pub use dynamic::split_values;

use crate::ast::{Ast, Context, Document, NodeId, NodeKind, Value};
use crate::config::CompilerConfig;
use crate::error::{QuillError, Result};
use crate::host;
use crate::token::{Token, TokenKind};
use dynamic::DynamicSyntax;
use html::HtmlSyntax;
use inline::InlineSyntax;

/// Builds a [`Document`] from lexer tokens.
pub struct Parser<'a> {
    config: &'a CompilerConfig,
    path: Option<&'a str>,
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> Parser<'a> {
    /// Creates a parser for one template.
    pub fn new(config: &'a CompilerConfig, path: Option<&'a str>, source: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            config,
            path,
            source,
            line_starts,
        }
    }

    /// Parses a complete template.
    pub fn parse(&self, tokens: &[Token]) -> Result<Document> {
        let mut doc = Document::new(self.path.map(str::to_string));
        let mut asm = Assembler::new(doc.root);
        self.parse_tokens(&mut doc.ast, &mut asm, tokens)?;

        if asm.has_open() {
            let open = asm.current();
            let name = match doc.ast.kind(open) {
                NodeKind::Tag { name, .. } => name.clone(),
                other => other.type_name().to_string(),
            };
            return Err(self.error(format!("Unclosed tag `{}`", name), doc.ast.context(open).offset));
        }

        Ok(doc)
    }

    /// Parses `tokens` into the container `asm` points at.
    pub fn parse_tokens(&self, ast: &mut Ast, asm: &mut Assembler, tokens: &[Token]) -> Result<()> {
        let mut html = HtmlSyntax::default();
        let mut dynamic = DynamicSyntax::default();
        let mut inline = InlineSyntax::default();

        for token in tokens {
            match token.kind {
                TokenKind::Raw => {
                    let node = ast.add(
                        NodeKind::Raw {
                            text: token.content.clone(),
                        },
                        self.context(token.offset),
                    );
                    asm.push(ast, node)?;
                }
                TokenKind::Php => {
                    let node = ast.add(
                        NodeKind::Php {
                            content: token.content.clone(),
                            tokens: host::tokenize(&token.content),
                        },
                        self.context(token.offset),
                    );
                    asm.push(ast, node)?;
                }
                TokenKind::Html(kind) => html.advance(self, ast, asm, token, kind)?,
                TokenKind::Dynamic(kind) => dynamic.advance(self, ast, asm, token, kind)?,
                TokenKind::Inline(kind) => inline.advance(self, ast, asm, token, kind)?,
                TokenKind::Declare(_) => {}
            }
        }

        Ok(())
    }

    /// Turns a keyword or attribute token into a value: plain text, or a
    /// mixin when the token swallowed tokens of earlier grammars.
    pub fn parse_token(&self, ast: &mut Ast, token: &Token) -> Result<Value> {
        if token.tokens.is_empty() {
            return Ok(Value::Text(token.content.clone()));
        }

        let mixin = ast.add(NodeKind::Mixin { children: Vec::new() }, self.context(token.offset));
        let mut asm = Assembler::new(mixin);
        self.parse_tokens(ast, &mut asm, &token.tokens)?;
        Ok(Value::Node(mixin))
    }

    /// Wraps a token in a verbatim node.
    pub fn parse_verbatim(&self, ast: &mut Ast, token: &Token) -> Result<NodeId> {
        let verbatim = ast.add(NodeKind::Verbatim { children: Vec::new() }, self.context(token.offset));

        if token.tokens.is_empty() {
            if !token.content.is_empty() {
                let raw = ast.add(
                    NodeKind::Raw {
                        text: token.content.clone(),
                    },
                    self.context(token.offset),
                );
                ast.push_child(verbatim, raw)?;
            }
            return Ok(verbatim);
        }

        let mut asm = Assembler::new(verbatim);
        self.parse_tokens(ast, &mut asm, &token.tokens)?;
        Ok(verbatim)
    }

    /// Node origin for a source offset.
    pub fn context(&self, offset: usize) -> Context {
        Context {
            offset,
            line: self.line_starts.partition_point(|&start| start <= offset).max(1),
            path: self.path.map(str::to_string),
        }
    }

    /// A syntax error located at `offset`.
    pub fn error(&self, message: impl Into<String>, offset: usize) -> QuillError {
        QuillError::syntax(message, offset, self.path, self.source)
    }

    /// Active configuration.
    pub fn config(&self) -> &CompilerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{DynamicGrammar, HtmlGrammar, InlineGrammar, PhpGrammar};
    use crate::lexer::Lexer;

    fn parse(source: &str) -> Result<Document> {
        let config = CompilerConfig::default();
        let tokens = Lexer::new()
            .with_grammar(PhpGrammar)
            .with_grammar(InlineGrammar)
            .with_grammar(DynamicGrammar::default())
            .with_grammar(HtmlGrammar::default())
            .parse(source);
        Parser::new(&config, Some("test"), source).parse(&tokens)
    }

    fn tag(doc: &Document, id: NodeId) -> (&str, &[NodeId], &[NodeId], bool) {
        match doc.ast.kind(id) {
            NodeKind::Tag {
                name,
                attrs,
                children,
                void,
                ..
            } => (name.as_str(), attrs.as_slice(), children.as_slice(), *void),
            other => panic!("Expected tag, got {}", other.type_name()),
        }
    }

    #[test]
    fn test_nested_tags() {
        let doc = parse("<a><b>x</b></a>").expect("parse");
        assert_eq!(doc.nodes().len(), 1);
        let (name, _, children, _) = tag(&doc, doc.nodes()[0]);
        assert_eq!(name, "a");
        let (name, _, children, _) = tag(&doc, children[0]);
        assert_eq!(name, "b");
        assert_eq!(doc.ast.kind(children[0]), &NodeKind::Raw { text: "x".to_string() });
    }

    #[test]
    fn test_attributes() {
        let doc = parse("<a href=\"x\" disabled></a>").expect("parse");
        let (_, attrs, _, void) = tag(&doc, doc.nodes()[0]);
        assert!(!void);
        assert_eq!(attrs.len(), 2);
        assert_eq!(
            doc.ast.kind(attrs[0]),
            &NodeKind::Attr {
                name: Value::Text("href".to_string()),
                value: Value::Text("\"x\"".to_string())
            }
        );
        assert_eq!(
            doc.ast.kind(attrs[1]),
            &NodeKind::Attr {
                name: Value::Text("disabled".to_string()),
                value: Value::Nil
            }
        );
    }

    #[test]
    fn test_void_and_short_tags() {
        let doc = parse("<br><x/><i>y</i>").expect("parse");
        assert_eq!(doc.nodes().len(), 3);
        assert!(tag(&doc, doc.nodes()[0]).3);
        assert!(tag(&doc, doc.nodes()[1]).3);
        assert_eq!(tag(&doc, doc.nodes()[2]).2.len(), 1);
    }

    #[test]
    fn test_closing_tag_mismatch() {
        let err = parse("<a>\n</b>").err().expect("error");
        match err {
            QuillError::Syntax {
                message, offset, line, ..
            } => {
                assert_eq!(message, "Invalid closing tag `b`, expected `a`");
                assert_eq!(offset, 4);
                assert_eq!(line, 2);
            }
            other => panic!("Expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_unclosed_tag() {
        let err = parse("<a><b></b>").err().expect("error");
        assert!(err.to_string().contains("Unclosed tag `a`"));
    }

    #[test]
    fn test_attribute_mixin() {
        let doc = parse("<a href=\"/u/{{ $id }}\"></a>").expect("parse");
        let (_, attrs, _, _) = tag(&doc, doc.nodes()[0]);
        let NodeKind::Attr {
            value: Value::Node(mixin),
            ..
        } = doc.ast.kind(attrs[0])
        else {
            panic!("Expected mixin value");
        };
        let parts: Vec<&str> = doc
            .ast
            .children(*mixin)
            .iter()
            .map(|id| doc.ast.kind(*id).type_name())
            .collect();
        assert_eq!(parts, vec!["Raw", "Output", "Raw"]);
    }

    #[test]
    fn test_verbatim_attribute() {
        let doc = parse("<a onclick=\"go({{ $x }})\" style=\"color: red\"></a>").expect("parse");
        let (_, attrs, _, _) = tag(&doc, doc.nodes()[0]);
        for attr in attrs {
            let NodeKind::Attr {
                value: Value::Node(v), ..
            } = doc.ast.kind(*attr)
            else {
                panic!("Expected node value");
            };
            assert_eq!(doc.ast.kind(*v).type_name(), "Verbatim");
        }
    }

    #[test]
    fn test_dynamic_nodes() {
        let doc = parse("{{ $a }}{!! $b !!}@if($a, [1, 2])@endif${title|Home}<?= 1 ?>").expect("parse");
        let kinds: Vec<&NodeKind> = doc.nodes().iter().map(|id| doc.ast.kind(*id)).collect();
        assert_eq!(
            kinds[0],
            &NodeKind::Output {
                body: "$a".to_string(),
                raw: false
            }
        );
        assert_eq!(
            kinds[1],
            &NodeKind::Output {
                body: "$b".to_string(),
                raw: true
            }
        );
        assert_eq!(
            kinds[2],
            &NodeKind::Directive {
                name: "if".to_string(),
                body: Some("$a, [1, 2]".to_string()),
                values: vec!["$a".to_string(), "[1, 2]".to_string()],
            }
        );
        assert_eq!(
            kinds[3],
            &NodeKind::Directive {
                name: "endif".to_string(),
                body: None,
                values: vec![],
            }
        );
        assert_eq!(
            kinds[4],
            &NodeKind::Inline {
                name: "title".to_string(),
                value: Some("Home".to_string())
            }
        );
        assert_eq!(kinds[5].type_name(), "PHP");
    }

    #[test]
    fn test_script_is_verbatim() {
        let doc = parse("<script>a < b</script>").expect("parse");
        let (_, _, children, _) = tag(&doc, doc.nodes()[0]);
        assert_eq!(doc.ast.kind(children[0]).type_name(), "Verbatim");
    }

    #[test]
    fn test_context_lines() {
        let doc = parse("a\n<b>\n{{ $x }}</b>").expect("parse");
        let (_, _, children, _) = tag(&doc, doc.nodes()[1]);
        let output = children[1];
        assert_eq!(doc.ast.context(output).line, 3);
        assert_eq!(doc.ast.context(output).path.as_deref(), Some("test"));
    }
}
