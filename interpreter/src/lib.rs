//! A small evaluator for the Python subset used in slide code blocks:
//! literals, lists, f-strings, arithmetic, comparisons, assignments and a
//! handful of builtins.

pub mod ast;
pub mod builtins;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod lexer;
pub mod parser;
pub mod runtime_value;

pub use error::{BlockError, Error, RuntimeError, SyntaxError};
pub use executor::{Interpreter, execute_line, run_block};
pub use runtime_value::RuntimeValue;
