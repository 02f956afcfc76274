// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Compiler configuration.
//!
//! Every field has a default, so an empty document is a valid configuration.
//!
//! # Example Configuration
//!
//! ```toml
//! output_filter = "e(%s)"
//! void_tags = ["br", "hr", "img", "input"]
//!
//! [echo]
//! open = "[["
//! close = "]]"
//!
//! [macros]
//! inject = "inject"
//! injected = "injected"
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// An opening/closing delimiter pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delimiters {
    /// Opening sequence.
    pub open: String,
    /// Closing sequence.
    pub close: String,
}

impl Delimiters {
    fn new(open: &str, close: &str) -> Self {
        Self {
            open: open.to_string(),
            close: close.to_string(),
        }
    }
}

/// Names of the host-code macros resolved at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroConfig {
    /// `inject('name', default)`: replaced with the claimed value.
    #[serde(default = "default_inject")]
    pub inject: String,

    /// `injected('name')`: replaced with `true` or `false`.
    #[serde(default = "default_injected")]
    pub injected: String,
}

fn default_inject() -> String {
    "inject".to_string()
}

fn default_injected() -> String {
    "injected".to_string()
}

impl Default for MacroConfig {
    fn default() -> Self {
        Self {
            inject: default_inject(),
            injected: default_injected(),
        }
    }
}

/// Compiler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Escaped echo delimiters (default `{{ }}`).
    #[serde(default = "default_echo")]
    pub echo: Delimiters,

    /// Raw echo delimiters (default `{!! !!}`).
    #[serde(default = "default_raw_echo")]
    pub raw_echo: Delimiters,

    /// Escaping expression wrapped around escaped echo bodies; `%s` is the body.
    #[serde(default = "default_output_filter")]
    pub output_filter: String,

    /// Compile-time macro names.
    #[serde(default)]
    pub macros: MacroConfig,

    /// Tags that never have a closing tag.
    #[serde(default = "default_void_tags")]
    pub void_tags: Vec<String>,

    /// Tags whose body is kept as-is.
    #[serde(default = "default_verbatim_tags")]
    pub verbatim_tags: Vec<String>,

    /// Attribute names whose value is kept as-is; entries ending in `*` match by prefix.
    #[serde(default = "default_verbatim_attributes")]
    pub verbatim_attributes: Vec<String>,

    /// Tag prefixes that define a block (`<block:name>`).
    #[serde(default = "default_block_prefixes")]
    pub block_prefixes: Vec<String>,

    /// Attribute that marks an aggregate (`attr:aggregate`).
    #[serde(default = "default_aggregate_attribute")]
    pub aggregate_attribute: String,

    /// Tag name that extends a parent template (`<extends:path/>`).
    #[serde(default = "default_extends_tag")]
    pub extends_tag: String,

    /// Prefix of import declarations (`<use:element/>`).
    #[serde(default = "default_import_prefix")]
    pub import_prefix: String,
}

fn default_echo() -> Delimiters {
    Delimiters::new("{{", "}}")
}

fn default_raw_echo() -> Delimiters {
    Delimiters::new("{!!", "!!}")
}

fn default_output_filter() -> String {
    "htmlspecialchars((string) %s, ENT_QUOTES | ENT_SUBSTITUTE, 'utf-8')".to_string()
}

fn default_void_tags() -> Vec<String> {
    [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
    ]
    .iter()
    .map(|t| t.to_string())
    .collect()
}

fn default_verbatim_tags() -> Vec<String> {
    crate::grammar::html::DEFAULT_VERBATIM_TAGS
        .iter()
        .map(|t| t.to_string())
        .collect()
}

fn default_verbatim_attributes() -> Vec<String> {
    vec!["style".to_string(), "on*".to_string()]
}

fn default_block_prefixes() -> Vec<String> {
    ["block:", "define:", "yield:", "section:"]
        .iter()
        .map(|t| t.to_string())
        .collect()
}

fn default_aggregate_attribute() -> String {
    "attr:aggregate".to_string()
}

fn default_extends_tag() -> String {
    "extends".to_string()
}

fn default_import_prefix() -> String {
    "use:".to_string()
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            echo: default_echo(),
            raw_echo: default_raw_echo(),
            output_filter: default_output_filter(),
            macros: MacroConfig::default(),
            void_tags: default_void_tags(),
            verbatim_tags: default_verbatim_tags(),
            verbatim_attributes: default_verbatim_attributes(),
            block_prefixes: default_block_prefixes(),
            aggregate_attribute: default_aggregate_attribute(),
            extends_tag: default_extends_tag(),
            import_prefix: default_import_prefix(),
        }
    }
}

impl CompilerConfig {
    /// Parses a TOML document; missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// True for tags that have no closing tag.
    pub fn is_void_tag(&self, name: &str) -> bool {
        self.void_tags.iter().any(|t| t.eq_ignore_ascii_case(name))
    }

    /// True for attributes whose value must not be parsed.
    pub fn is_verbatim_attribute(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        self.verbatim_attributes.iter().any(|pattern| match pattern.strip_suffix('*') {
            Some(prefix) => name.starts_with(prefix),
            None => name == *pattern,
        })
    }

    /// Block name for a block-defining tag, e.g. `block:title` → `title`.
    pub fn block_name<'a>(&self, tag: &'a str) -> Option<&'a str> {
        self.block_prefixes
            .iter()
            .find_map(|prefix| tag.strip_prefix(prefix.as_str()))
            .filter(|name| !name.is_empty())
    }
}
