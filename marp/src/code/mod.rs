mod extract;

use std::ops::Range;

pub use extract::{
    EXECUTABLE_LANGUAGE, execute_code_blocks, scan_code_blocks, split_setup,
    strip_setup_regions,
};

use crate::params::Params;

/// A fenced code block tagged with the executable language.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlock {
    /// Body between the fences, setup region included.
    pub text: String,
    /// Byte span of the whole fence in the source document.
    pub span: Range<usize>,
    pub params: Params,
    /// Whether the block is executed; taken from the `run` parameter.
    pub run: bool,
    /// Lines executed for side effects only, with their `# ` prefix removed.
    pub setup: Vec<String>,
    /// Body lines left once the setup region is cut out.
    pub code: Vec<String>,
    /// Captured standard output. `None` unless the block was executed.
    pub output: Option<String>,
}

impl CodeBlock {
    pub fn id(&self) -> Option<&str> {
        self.params.get("id")
    }
}

/// Evaluates the lines of one code block in a fresh context.
///
/// Setup lines run first; the returned text is whatever the visible lines
/// wrote to standard output, trailing whitespace removed.
pub trait CodeRunner {
    fn run(&self, setup: &[String], code: &[String]) -> Result<String, ExecutionError>;
}

impl<R: CodeRunner + ?Sized> CodeRunner for &R {
    fn run(&self, setup: &[String], code: &[String]) -> Result<String, ExecutionError> {
        (**self).run(setup, code)
    }
}

/// A setup or visible line failed to evaluate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ExecutionError {
    /// The offending source line.
    pub line: String,
    pub message: String,
}

impl ExecutionError {
    pub fn new(line: impl Into<String>, message: impl Into<String>) -> Self {
        ExecutionError {
            line: line.into(),
            message: message.into(),
        }
    }
}

/// Interpret a `run` parameter: `true`/`false` in any case, or an integer.
pub fn parse_run_flag(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        value.parse::<i64>().ok().map(|n| n != 0)
    }
}
