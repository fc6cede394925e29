use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::code::{self, CodeBlock, CodeRunner};
use crate::document::frontmatter::{Frontmatter, parse_frontmatter};
use crate::document::variables::{Variables, substitute};
use crate::document::{self, Section};
use crate::error::PipelineError;
use crate::tag::TagRegistry;

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    /// Final text, setup regions stripped.
    pub text: String,
    /// Each section after substitution and tag expansion, in source order.
    pub sections: Vec<String>,
    pub frontmatter: Frontmatter,
    pub code_blocks: Vec<CodeBlock>,
}

/// Turns a presentation source into its fully resolved form.
///
/// A processor holds no per-document state, so running it twice on the same
/// source yields the same text.
pub struct Processor<R> {
    runner: R,
    tags: TagRegistry,
}

impl<R: CodeRunner> Processor<R> {
    /// A processor with the default `title`, `section` and `code` tags.
    pub fn new(runner: R) -> Self {
        Self::with_tags(runner, TagRegistry::default())
    }

    pub fn with_tags(runner: R, tags: TagRegistry) -> Self {
        Processor { runner, tags }
    }

    pub fn tags_mut(&mut self) -> &mut TagRegistry {
        &mut self.tags
    }

    /// Run the whole pipeline over `source`.
    pub fn process(&self, source: &str) -> Result<ProcessedDocument, PipelineError> {
        let mut code_blocks = code::scan_code_blocks(source);
        code::execute_code_blocks(&mut code_blocks, &self.runner)?;

        let sections = document::split_sections(source);
        debug!(count = sections.len(), "split document into sections");

        let first = sections
            .first()
            .ok_or_else(|| PipelineError::FrontmatterInvalid {
                reason: "document has no sections".into(),
                span: 0..0,
            })?;
        let frontmatter = parse_frontmatter(first)?;

        let processed = sections
            .iter()
            .map(|section| self.process_section(section, &frontmatter.variables, &code_blocks))
            .collect::<Result<Vec<_>, _>>()?;

        let text = document::reassemble(&processed);

        Ok(ProcessedDocument {
            text,
            sections: processed,
            frontmatter,
            code_blocks,
        })
    }

    /// Process the file at `path` and write the result to `out_path`.
    ///
    /// `out_path` is only written once the whole pipeline has succeeded.
    pub fn process_file(
        &self,
        path: &Path,
        out_path: &Path,
    ) -> Result<ProcessedDocument, PipelineError> {
        let source = fs::read_to_string(path).map_err(|source| PipelineError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let processed = self.process(&source)?;

        fs::write(out_path, &processed.text).map_err(|source| PipelineError::Write {
            path: out_path.to_path_buf(),
            source,
        })?;

        info!(
            input = %path.display(),
            output = %out_path.display(),
            "processed file"
        );
        Ok(processed)
    }

    /// Substitute variables and expand tags line by line.
    fn process_section(
        &self,
        section: &Section<'_>,
        variables: &Variables,
        code_blocks: &[CodeBlock],
    ) -> Result<String, PipelineError> {
        let mut out = Vec::new();

        for (offset, raw) in section.lines() {
            let line = substitute(raw, variables);

            let expanded = match self.tags.resolve(&line) {
                Some(invocation) => Some(invocation.expand(code_blocks).map_err(|source| {
                    PipelineError::Tag {
                        tag: invocation.id.to_string(),
                        span: offset..offset + raw.len(),
                        source,
                    }
                })?),
                None => None,
            };

            out.push(expanded.unwrap_or(line));
        }

        Ok(out.join("\n"))
    }
}
