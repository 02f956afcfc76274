// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The compile pipeline.
//!
//! ```text
//! load -> lex -> parse -> prepare -> transform -> finalize -> emit
//! ```
//!
//! Templates referenced through `extends` or imports go through the same
//! pipeline up to `transform` before they are merged, so every merge sees a
//! fully resolved parent. Finalization only runs on the template being
//! compiled.
//!
//! # Example
//!
//! ```
//! use quill::{Builder, MemoryLoader};
//!
//! let loader = MemoryLoader::new()
//!     .with_template("layout", "<html><block:body>empty</block:body></html>")?
//!     .with_template("page", "<extends:layout/><block:body>{{ $title }}</block:body>")?;
//!
//! let compiled = Builder::new(loader).compile("page")?;
//! assert_eq!(
//!     compiled.content,
//!     "<html><?php echo htmlspecialchars((string) $title, ENT_QUOTES | ENT_SUBSTITUTE, 'utf-8'); ?></html>"
//! );
//! # Ok::<(), quill::QuillError>(())
//! ```

use crate::ast::Document;
use crate::config::CompilerConfig;
use crate::directive::DirectiveGroup;
use crate::emitter::{emit, CompiledTemplate};
use crate::error::{QuillError, Result};
use crate::grammar::{DynamicGrammar, HtmlGrammar, InlineGrammar, PhpGrammar};
use crate::lexer::Lexer;
use crate::loader::Loader;
use crate::parser::Parser;
use crate::transform::{self, finalize::finalize};
use tracing::debug;

/// Compiles templates provided by a [`Loader`].
pub struct Builder<L: Loader> {
    loader: L,
    config: CompilerConfig,
    directives: DirectiveGroup,
}

impl<L: Loader> Builder<L> {
    /// Creates a builder with the default configuration and directives.
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            config: CompilerConfig::default(),
            directives: DirectiveGroup::default(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the directive renderers.
    pub fn with_directives(mut self, directives: DirectiveGroup) -> Self {
        self.directives = directives;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// The underlying loader.
    pub fn loader(&self) -> &L {
        &self.loader
    }

    fn lexer(&self) -> Lexer {
        let echo = &self.config.echo;
        let raw = &self.config.raw_echo;
        Lexer::new()
            .with_grammar(PhpGrammar)
            .with_grammar(InlineGrammar)
            .with_grammar(
                DynamicGrammar::new(&echo.open, &echo.close, &raw.open, &raw.close)
                    .with_known_directives(self.directives.names()),
            )
            .with_grammar(HtmlGrammar::new(self.config.verbatim_tags.clone()))
    }

    /// Lexes, parses and prepares template source.
    pub fn parse_source(&self, path: Option<&str>, source: &str) -> Result<Document> {
        let tokens = self.lexer().parse(source);
        let mut doc = Parser::new(&self.config, path, source).parse(&tokens)?;
        transform::prepare(&mut doc, &self.config)?;
        Ok(doc)
    }

    /// Loads a template and resolves everything it references.
    pub fn load(&self, path: &str) -> Result<Document> {
        self.load_with(path, &mut Vec::new())
    }

    fn load_with(&self, path: &str, stack: &mut Vec<String>) -> Result<Document> {
        if stack.iter().any(|p| p == path) {
            let mut chain = stack.clone();
            chain.push(path.to_string());
            return Err(QuillError::CircularReference { chain });
        }

        debug!(path = %path, depth = stack.len(), "load template");
        let resolved = self.loader.load(path)?;
        let mut doc = self.parse_source(Some(&resolved.path), &resolved.source)?;

        stack.push(path.to_string());
        let result = transform::transform(&mut doc, &self.config, &mut |p: &str| self.load_with(p, stack));
        stack.pop();
        result?;

        Ok(doc)
    }

    /// Compiles the template at `path`.
    pub fn compile(&self, path: &str) -> Result<CompiledTemplate> {
        debug!(path = %path, "compile template");
        let mut doc = self.load(path)?;
        self.finish(&mut doc)
    }

    /// Compiles template source that is not provided by the loader. Templates
    /// it references are.
    pub fn compile_source(&self, path: Option<&str>, source: &str) -> Result<CompiledTemplate> {
        let mut doc = self.parse_source(path, source)?;
        let mut stack: Vec<String> = path.map(str::to_string).into_iter().collect();
        transform::transform(&mut doc, &self.config, &mut |p: &str| self.load_with(p, &mut stack))?;
        self.finish(&mut doc)
    }

    fn finish(&self, doc: &mut Document) -> Result<CompiledTemplate> {
        finalize(doc, &self.config, &self.directives)?;
        emit(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;

    #[test]
    fn test_compile_source_without_references() {
        let builder = Builder::new(MemoryLoader::new());
        let compiled = builder.compile_source(None, "<p>{!! $a !!}</p>").expect("compile");
        assert_eq!(compiled.content, "<p><?php echo $a; ?></p>");
        assert_eq!(compiled.path, None);
    }

    #[test]
    fn test_circular_extends() {
        let loader = MemoryLoader::new()
            .with_template("a", "<extends:b/>")
            .and_then(|l| l.with_template("b", "<extends:a/>"))
            .expect("templates");

        let err = Builder::new(loader).compile("a").unwrap_err();
        match err.root_cause() {
            QuillError::CircularReference { chain } => {
                assert_eq!(chain, &vec!["a".to_string(), "b".to_string(), "a".to_string()]);
            }
            other => panic!("Expected circular reference, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_parent() {
        let loader = MemoryLoader::new().with_template("page", "<extends:nope/>").expect("template");
        let err = Builder::new(loader).compile("page").unwrap_err();
        assert!(matches!(err, QuillError::Extends { ref parent, .. } if parent == "nope"));
        assert!(matches!(err.root_cause(), QuillError::Loader(_)));
    }
}
