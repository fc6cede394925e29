use std::io::{self, Write};

use marp::{CodeRunner, ExecutionError};
use tracing::debug;

use crate::ast::Statement;
use crate::environment::Environment;
use crate::error::{BlockError, Error, RuntimeError};
use crate::evaluator::{eval_binary_op, evaluate};
use crate::parser::parse_statement;

/// Execute one source line against `env`, writing any printed text to `output`.
///
/// Blank lines and comment lines are no-ops.
pub fn execute_line(line: &str, env: &mut Environment, output: &mut dyn Write) -> Result<(), Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(());
    }

    match parse_statement(trimmed)? {
        Statement::Assignment { variable, value } => {
            let value = evaluate(&value, env, output, 0)?;
            env.set_variable(&variable, value);
        }
        Statement::AugmentedAssignment {
            variable,
            operator,
            value,
        } => {
            let current = env
                .get_variable(&variable)
                .cloned()
                .ok_or_else(|| RuntimeError::NameError(variable.clone()))?;
            let value = evaluate(&value, env, output, 0)?;
            let updated = eval_binary_op(operator, &current, &value)?;
            env.set_variable(&variable, updated);
        }
        Statement::Expression(expr) => {
            evaluate(&expr, env, output, 0)?;
        }
    }
    Ok(())
}

/// Run a code block in a fresh environment.
///
/// Setup lines execute first and their output is discarded. The text printed
/// by the visible lines is returned with trailing whitespace removed.
pub fn run_block(setup: &[String], code: &[String]) -> Result<String, BlockError> {
    let mut env = Environment::new();

    let mut sink = io::sink();
    for line in setup {
        execute_line(line, &mut env, &mut sink).map_err(|error| BlockError {
            line: line.clone(),
            error,
        })?;
    }

    let mut captured = Vec::new();
    for line in code {
        execute_line(line, &mut env, &mut captured).map_err(|error| BlockError {
            line: line.clone(),
            error,
        })?;
    }

    let output = String::from_utf8_lossy(&captured).trim_end().to_string();
    debug!(
        setup = setup.len(),
        lines = code.len(),
        bytes = output.len(),
        "block executed"
    );
    Ok(output)
}

/// The embedded evaluator, usable wherever the preprocessor needs a runner.
#[derive(Debug, Default, Clone, Copy)]
pub struct Interpreter;

impl CodeRunner for Interpreter {
    fn run(&self, setup: &[String], code: &[String]) -> Result<String, ExecutionError> {
        run_block(setup, code).map_err(|e| ExecutionError::new(e.line, e.error.to_string()))
    }
}
