// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Error types for the quill template compiler.
//!
//! This module defines [`QuillError`], the main error enum, and [`Excerpt`],
//! the source line quoted by syntax errors.
//!
//! # Error Categories
//!
//! - **Syntax errors**: structural mismatches found while assembling the tree
//! - **Directive errors**: directives no renderer knows how to emit
//! - **Loader errors**: the namespace resolver could not provide a template
//! - **Extends / import errors**: a failure inside a parent or imported template,
//!   reported at the tag that referenced it
//! - **Config errors**: invalid compiler configuration
//!
//! Compilation is atomic: any of these aborts the whole compile unit and no
//! partial output is produced.

use std::fmt;
use thiserror::Error;

/// The source line an error points at, with a caret under the column.
///
/// Rendered as:
/// ```text
///  2 | </b>
///    | ^
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Excerpt {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed, in bytes).
    pub column: usize,
    /// Text of the line, without its terminator.
    pub text: String,
}

impl Excerpt {
    /// Cuts the line containing `offset` out of `source`.
    pub fn at(source: &str, offset: usize) -> Self {
        let (line, column) = line_column(source, offset);
        let text = source.split('\n').nth(line - 1).unwrap_or_default();
        Self {
            line,
            column,
            text: text.trim_end_matches('\r').to_string(),
        }
    }
}

impl fmt::Display for Excerpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let gutter = self.line.to_string().len();
        // tabs are kept so the caret lines up with the source
        let pad: String = self
            .text
            .bytes()
            .take(self.column.saturating_sub(1))
            .map(|b| if b == b'\t' { '\t' } else { ' ' })
            .collect();
        writeln!(f, " {} | {}", self.line, self.text)?;
        write!(f, " {:gutter$} | {}^", "", pad)
    }
}

/// Converts a byte offset into a 1-indexed `(line, column)` pair.
///
/// Offsets past the end of the source clamp to the last position.
pub fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source.as_bytes()[..offset];
    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let column = match before.iter().rposition(|&b| b == b'\n') {
        Some(nl) => offset - nl,
        None => offset + 1,
    };
    (line, column)
}

/// The main error type for quill operations.
///
/// All compiler functions return `Result<T, QuillError>`.
#[derive(Error, Debug)]
pub enum QuillError {
    /// A structural mismatch in the template, e.g. `</b>` closing `<a>`.
    #[error("Syntax error in {file:?}: {message} at line {line}, column {column}\n{excerpt}")]
    Syntax {
        /// Description of the problem.
        message: String,
        /// Byte offset of the offending token.
        offset: usize,
        /// Line number where the error occurred.
        line: usize,
        /// Column number where the error occurred.
        column: usize,
        /// The template path, if known.
        file: Option<String>,
        /// The offending source line.
        excerpt: Excerpt,
    },

    /// A directive could not be rendered into host code.
    #[error("Directive error in {file:?} at offset {offset}: {message}")]
    Directive {
        /// Description of the problem.
        message: String,
        /// Byte offset of the directive.
        offset: usize,
        /// The template path, if known.
        file: Option<String>,
    },

    /// The loader could not provide a template.
    #[error("Loader error: {0}")]
    Loader(String),

    /// The parent template of an `extends` tag failed to load or compile.
    #[error("Unable to extend `{parent}` in {file:?} at offset {offset}")]
    Extends {
        /// Path of the parent template.
        parent: String,
        /// Byte offset of the `extends` tag.
        offset: usize,
        /// Template containing the `extends` tag.
        file: Option<String>,
        /// The underlying failure.
        #[source]
        source: Box<QuillError>,
    },

    /// An imported element failed to load or compile.
    #[error("Unable to import `{path}` in {file:?} at offset {offset}")]
    Import {
        /// Path of the imported template.
        path: String,
        /// Byte offset of the tag using the import.
        offset: usize,
        /// Template using the import.
        file: Option<String>,
        /// The underlying failure.
        #[source]
        source: Box<QuillError>,
    },

    /// A template (transitively) extends or imports itself.
    #[error("Circular template reference: {}", chain.join(" -> "))]
    CircularReference {
        /// Load stack, ending with the repeated path.
        chain: Vec<String>,
    },

    /// AST transformation failed.
    #[error("Transform error: {0}")]
    Transform(String),

    /// The compiler configuration is invalid.
    #[error("Config error: {0}")]
    Config(String),
}

impl QuillError {
    /// Builds a syntax error, deriving line, column and excerpt from `source`.
    pub fn syntax(message: impl Into<String>, offset: usize, file: Option<&str>, source: &str) -> Self {
        let excerpt = Excerpt::at(source, offset);
        QuillError::Syntax {
            message: message.into(),
            offset,
            line: excerpt.line,
            column: excerpt.column,
            file: file.map(str::to_string),
            excerpt,
        }
    }

    /// Returns the innermost error of an extends/import chain.
    pub fn root_cause(&self) -> &QuillError {
        match self {
            QuillError::Extends { source, .. } | QuillError::Import { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<toml::de::Error> for QuillError {
    fn from(err: toml::de::Error) -> Self {
        QuillError::Config(err.to_string())
    }
}

/// Convenience type alias for Results with [`QuillError`].
pub type Result<T> = std::result::Result<T, QuillError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_column() {
        let src = "ab\ncd\nef";
        assert_eq!(line_column(src, 0), (1, 1));
        assert_eq!(line_column(src, 1), (1, 2));
        assert_eq!(line_column(src, 3), (2, 1));
        assert_eq!(line_column(src, 7), (3, 2));
        assert_eq!(line_column(src, 100), (3, 3));
    }

    #[test]
    fn test_syntax_error_message() {
        let err = QuillError::syntax("Invalid closing tag `b`, expected `a`", 3, Some("root"), "<a>\n</b>");
        match &err {
            QuillError::Syntax { line, column, .. } => {
                assert_eq!(*line, 1);
                assert_eq!(*column, 4);
            }
            _ => panic!("Expected syntax error"),
        }
        let text = err.to_string();
        assert!(text.contains("Invalid closing tag"));
        assert!(text.contains("root"));
        assert!(text.ends_with(" 1 | <a>\n   |    ^"));
    }

    #[test]
    fn test_excerpt_points_at_column() {
        let excerpt = Excerpt::at("<a>\n\t<b></c>\n</a>", 8);
        assert_eq!(excerpt.line, 2);
        assert_eq!(excerpt.column, 5);
        assert_eq!(excerpt.text, "\t<b></c>");
        assert_eq!(excerpt.to_string(), " 2 | \t<b></c>\n   | \t   ^");
    }

    #[test]
    fn test_excerpt_at_end_of_source() {
        let excerpt = Excerpt::at("<a>\r\n", 100);
        assert_eq!((excerpt.line, excerpt.column), (2, 1));
        assert_eq!(excerpt.text, "");
        assert_eq!(excerpt.to_string(), " 2 | \n   | ^");
    }

    #[test]
    fn test_root_cause_unwraps_chain() {
        let inner = QuillError::Loader("missing".to_string());
        let err = QuillError::Extends {
            parent: "layout".to_string(),
            offset: 0,
            file: Some("page".to_string()),
            source: Box::new(QuillError::Import {
                path: "nav".to_string(),
                offset: 4,
                file: Some("layout".to_string()),
                source: Box::new(inner),
            }),
        };
        assert!(matches!(err.root_cause(), QuillError::Loader(_)));
    }
}
