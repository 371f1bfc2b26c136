//! A tree‑walking interpreter for the Lox language.
//!
//! Source text flows through four stages:
//! [`scanner`] → [`parser`] → [`resolver`] → [`interpreter`].
//! [`run_source`] wires them together; the `treelox` binary exposes each
//! stage as a subcommand.

pub mod ast_printer;
pub mod callable;
pub mod environment;
pub mod error;
pub mod expr;
pub mod interpreter;
pub mod natives;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stmt;
pub mod token;
pub mod value;

use std::io::{self, Write};
use std::thread;

use log::info;

use crate::error::{LoxError, Result};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::token::Token;

/// Stack reserved for the thread that parses and runs a program. Each
/// nested Lox call recurses through the evaluator; this fits
/// [`interpreter::MAX_CALL_DEPTH`] calls with room to spare.
pub const INTERPRETER_STACK_SIZE: usize = 256 * 1024 * 1024;

/// Runs `job` on a fresh thread with [`INTERPRETER_STACK_SIZE`] of stack and
/// waits for its result. A panic inside `job` is resumed on the caller.
pub fn on_interpreter_stack<F, T>(job: F) -> io::Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let handle = thread::Builder::new()
        .name("interpreter".into())
        .stack_size(INTERPRETER_STACK_SIZE)
        .spawn(job)?;

    match handle.join() {
        Ok(value) => Ok(value),
        Err(payload) => std::panic::resume_unwind(payload),
    }
}

/// Scans `source` completely. Returns every lexical error on failure.
pub fn tokenize(source: &str) -> std::result::Result<Vec<Token>, Vec<LoxError>> {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for token in Scanner::new(source) {
        match token {
            Ok(token) => tokens.push(token),
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

/// Runs a whole program, sending `print` output to `output`.
///
/// Stops at the first failing stage and returns its first error; a program
/// with syntax or resolution errors never executes.
pub fn run_source(source: &str, output: Box<dyn Write>) -> Result<()> {
    let tokens = tokenize(source).map_err(first_error)?;
    let statements = Parser::new(tokens).parse().map_err(first_error)?;
    info!("Parsed {} statements", statements.len());

    let mut interpreter = Interpreter::with_output(output);
    Resolver::new(&mut interpreter).resolve(&statements)?;
    interpreter.interpret(&statements)?;

    Ok(())
}

// Both stages only report failure with at least one error.
fn first_error(errors: Vec<LoxError>) -> LoxError {
    errors
        .into_iter()
        .next()
        .unwrap_or_else(|| LoxError::lex(0, "Unknown error."))
}
