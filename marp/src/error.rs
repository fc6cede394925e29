use std::ops::Range;
use std::path::PathBuf;

use codespan_reporting::diagnostic::{Diagnostic, Label};

use crate::code::ExecutionError;
use crate::tag::TagError;

/// Fatal conditions raised while processing a presentation.
///
/// Every variant aborts the run before the destination file is touched.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The first section is not valid frontmatter, or `marp: true` is missing.
    #[error("invalid frontmatter: {reason}")]
    FrontmatterInvalid { reason: String, span: Range<usize> },

    /// An annotation tag could not be expanded.
    #[error("cannot expand `{tag}` tag: {source}")]
    Tag {
        tag: String,
        span: Range<usize>,
        #[source]
        source: TagError,
    },

    /// A setup or visible line of an executed code block failed.
    #[error("code block #{index} failed: {source}")]
    Execution {
        index: usize,
        span: Range<usize>,
        #[source]
        source: ExecutionError,
    },

    #[error("cannot read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// The code block id a `code` tag failed to find, if that is what went wrong.
    pub fn missing_block_id(&self) -> Option<&str> {
        match self {
            PipelineError::Tag {
                source: TagError::NoMatchingCodeBlock { id },
                ..
            } => Some(id),
            _ => None,
        }
    }

    /// Byte span in the source document, when the error can be located.
    pub fn span(&self) -> Option<Range<usize>> {
        match self {
            PipelineError::FrontmatterInvalid { span, .. }
            | PipelineError::Tag { span, .. }
            | PipelineError::Execution { span, .. } => Some(span.clone()),
            PipelineError::Read { .. } | PipelineError::Write { .. } => None,
        }
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self, file_id: usize) -> Diagnostic<usize> {
        let mut diagnostic = Diagnostic::error().with_message(self.to_string());
        if let Some(span) = self.span() {
            diagnostic = diagnostic.with_labels(vec![Label::primary(file_id, span)]);
        }
        match self {
            PipelineError::Execution { source, .. } => {
                diagnostic.with_notes(vec![format!("while evaluating: {}", source.line)])
            }
            PipelineError::FrontmatterInvalid { .. } => {
                diagnostic.with_notes(vec!["the first section must declare `marp: true`".into()])
            }
            _ => diagnostic,
        }
    }
}
