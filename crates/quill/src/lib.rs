// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]
#![allow(clippy::result_large_err)]

//! # Quill
//!
//! Template compiler for a hybrid HTML/directive language, emitting PHP
//! source.
//!
//! Templates mix plain HTML, echo tags (`{{ $x }}`, `{!! $x !!}`),
//! directives (`@if($x)` … `@endif`), embedded PHP and inheritance markup:
//!
//! - `<extends:layout/>` replaces the template with its parent, filling the
//!   parent's blocks.
//! - `<block:name>…</block:name>` and `${name|default}` declare overridable
//!   regions.
//! - `<use:element path="ui/link"/>` makes another template usable as a tag.
//! - `attr:aggregate` collects attributes nobody else claimed.
//! - `inject('name')` and `injected('name')` in PHP code read claimed values
//!   at compile time.
//!
//! ## Quick Start
//!
//! ```
//! use quill::{Builder, MemoryLoader};
//!
//! let loader = MemoryLoader::new()
//!     .with_template("ui/anchor", r#"<a href="${href}" attr:aggregate>${context}</a>"#)?
//!     .with_template("page", r#"<use:element path="ui/anchor"/><anchor href="/" class="nav">Home</anchor>"#)?;
//!
//! let compiled = Builder::new(loader).compile("page")?;
//! assert_eq!(compiled.content, r#"<a href="/" class="nav">Home</a>"#);
//! # Ok::<(), quill::QuillError>(())
//! ```

/// Byte source consumed by the grammars.
pub mod source;
/// Lexer tokens.
pub mod token;
/// Grammar chain driver.
pub mod lexer;
/// Lexer grammars.
pub mod grammar;
/// Host (PHP) code scanning.
pub mod host;
/// Syntax tree arena.
pub mod ast;
/// Token stream to syntax tree.
pub mod parser;
/// Tree transformations and inheritance.
pub mod transform;
/// Directive rendering.
pub mod directive;
/// Host source generation.
pub mod emitter;
/// Template loading.
pub mod loader;
/// The compile pipeline.
pub mod builder;
/// Compiler configuration.
pub mod config;
/// Error types and reporting.
pub mod error;

pub use ast::{Ast, Context, Document, NodeId, NodeKind, Value};
pub use builder::Builder;
pub use config::CompilerConfig;
pub use directive::{DirectiveCall, DirectiveGroup, DirectiveRenderer};
pub use emitter::{CompiledTemplate, SourceLocation, SourceMap};
pub use error::{QuillError, Result};
pub use lexer::Lexer;
pub use loader::{Loader, MemoryLoader, ResolvedTemplate};
pub use parser::Parser;
pub use token::{Token, TokenKind};
