use std::fmt;

/// A line that does not parse.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("SyntaxError: {message} (column {column})")]
pub struct SyntaxError {
    pub message: String,
    /// 1-based character column of the offending token.
    pub column: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, column: usize) -> Self {
        SyntaxError {
            message: message.into(),
            column,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    NameError(String),
    TypeError(String),
    ValueError(String),
    IndexError(String),
    AttributeError { type_name: String, name: String },
    ZeroDivision(String),
    Overflow,
    RecursionLimit,
    IoError(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::NameError(name) => {
                write!(f, "NameError: name '{}' is not defined", name)
            }
            RuntimeError::TypeError(msg) => write!(f, "TypeError: {}", msg),
            RuntimeError::ValueError(msg) => write!(f, "ValueError: {}", msg),
            RuntimeError::IndexError(msg) => write!(f, "IndexError: {}", msg),
            RuntimeError::AttributeError { type_name, name } => write!(
                f,
                "AttributeError: '{}' object has no attribute '{}'",
                type_name, name
            ),
            RuntimeError::ZeroDivision(msg) => write!(f, "ZeroDivisionError: {}", msg),
            RuntimeError::Overflow => write!(f, "OverflowError: integer overflow"),
            RuntimeError::RecursionLimit => {
                write!(f, "RecursionError: maximum recursion depth exceeded")
            }
            RuntimeError::IoError(msg) => write!(f, "OSError: {}", msg),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Any failure while executing a line.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// A line of a code block failed; `line` is its source text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{error}")]
pub struct BlockError {
    pub line: String,
    #[source]
    pub error: Error,
}
