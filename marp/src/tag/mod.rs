//! Annotation comments (`<!-- name: key="value" -->`) and the handlers that expand them.
//!
//! A line that matches the comment shape and names a registered tag is replaced
//! by the tag's output. Anything else, including comments naming tags nobody
//! registered, passes through untouched.

mod builtin;

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

pub use builtin::{CodeTag, SectionTag, TitleTag};

use crate::code::CodeBlock;
use crate::params::Params;

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<!--\s(\w+)(?::\s(.+))?\s-->").unwrap());

/// A handler invoked from an annotation comment.
pub trait Tag {
    /// Produce the text that replaces the comment line. May span several lines.
    fn expand(&self, params: &Params, code_blocks: &[CodeBlock]) -> Result<String, TagError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TagError {
    #[error("no executed code block with id [{id}] exists in the document")]
    NoMatchingCodeBlock { id: String },
}

/// Identifier to handler table consulted for every line of every section.
pub struct TagRegistry {
    handlers: HashMap<String, Box<dyn Tag>>,
}

impl TagRegistry {
    /// A registry with no tags; every comment passes through.
    pub fn empty() -> Self {
        TagRegistry {
            handlers: HashMap::new(),
        }
    }

    /// Register `tag` under `id`, replacing any previous handler for that id.
    pub fn register(&mut self, id: impl Into<String>, tag: impl Tag + 'static) -> &mut Self {
        self.handlers.insert(id.into(), Box::new(tag));
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.handlers.contains_key(id)
    }

    /// Match `line` against the comment grammar and look up its handler.
    pub fn resolve<'a>(&'a self, line: &'a str) -> Option<Invocation<'a>> {
        let caps = COMMENT.captures(line)?;
        let id = caps.get(1)?.as_str();
        let handler = self.handlers.get(id)?;
        let params = caps
            .get(2)
            .map(|m| Params::parse(m.as_str()))
            .unwrap_or_default();

        Some(Invocation {
            id,
            params,
            handler: handler.as_ref(),
        })
    }
}

impl Default for TagRegistry {
    /// The `title`, `section` and `code` tags.
    fn default() -> Self {
        let mut registry = TagRegistry::empty();
        registry
            .register("title", TitleTag)
            .register("section", SectionTag)
            .register("code", CodeTag);
        registry
    }
}

/// A recognised comment bound to its handler, ready to expand.
pub struct Invocation<'a> {
    pub id: &'a str,
    pub params: Params,
    handler: &'a dyn Tag,
}

impl Invocation<'_> {
    pub fn expand(&self, code_blocks: &[CodeBlock]) -> Result<String, TagError> {
        self.handler.expand(&self.params, code_blocks)
    }
}

/// Render an annotation comment in the grammar [`TagRegistry::resolve`] accepts.
pub fn make_comment(id: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return format!("<!-- {} -->", id);
    }
    let pairs: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, v))
        .collect();
    format!("<!-- {}: {} -->", id, pairs.join(" "))
}
