//! Centralised error hierarchy for the **Lox interpreter**.
//!
//! Every stage converts its failure modes into one of the types defined here:
//! the scanner and parser into [`LoxError::Lex`] / [`LoxError::Parse`], the
//! resolver into [`ResolveError`] and the interpreter into [`RuntimeError`].
//! [`LoxError`] wraps all of them so the driver can map any failure onto a
//! process exit status via [`LoxError::exit_code`].
//!
//! The module **does not** print diagnostics itself.

use std::io;
use thiserror::Error;

use log::info;

/// Exit status for lexical and syntax errors.
pub const EXIT_SYNTAX: i32 = 65;

/// Exit status for static resolution errors.
pub const EXIT_RESOLVE: i32 = 66;

/// Exit status for runtime errors.
pub const EXIT_RUNTIME: i32 = 70;

/// Exit status when the source cannot be read or decoded.
pub const EXIT_IO: i32 = 74;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error. `message` already carries the location
    /// (`at 'x': ...` or `at end: ...`).
    #[error("[line {line}] Error {message}")]
    Parse { message: String, line: usize },

    /// Static‑analysis failure reported by the resolver.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Runtime evaluation error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF‑8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**. `lexeme` is `None` when the
    /// error was found at end of input.
    pub fn parse<S: Into<String>>(line: usize, lexeme: Option<&str>, msg: S) -> Self {
        let msg: String = msg.into();
        let message: String = match lexeme {
            Some(lexeme) => format!("at '{}': {}", lexeme, msg),
            None => format!("at end: {}", msg),
        };

        info!("Creating Parse error: line={}, msg={}", line, message);

        LoxError::Parse { message, line }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoxError::Lex { .. } | LoxError::Parse { .. } => EXIT_SYNTAX,
            LoxError::Resolve(_) => EXIT_RESOLVE,
            LoxError::Runtime(_) => EXIT_RUNTIME,
            LoxError::Io(_) | LoxError::Utf8(_) => EXIT_IO,
        }
    }
}

/// Static errors detected by the resolver before any code runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("[line {line}] Error at '{lexeme}': Already a variable with this name in this scope.")]
    DuplicateDeclaration { lexeme: String, line: usize },

    #[error("[line {line}] Error at '{lexeme}': Can't read local variable in its own initializer.")]
    SelfReferencingInitializer { lexeme: String, line: usize },

    #[error("[line {line}] Error at '{lexeme}': Can't return from top-level code.")]
    ReturnOutsideFunction { lexeme: String, line: usize },

    #[error("[line {line}] Error at '{lexeme}': Can't return a value from an initializer.")]
    ReturnValueFromInitializer { lexeme: String, line: usize },

    #[error("[line {line}] Error at '{lexeme}': Can't use 'this' outside of a class.")]
    ThisOutsideClass { lexeme: String, line: usize },

    #[error("[line {line}] Error at '{lexeme}': Can't use 'super' outside of a class.")]
    SuperOutsideClass { lexeme: String, line: usize },

    #[error("[line {line}] Error at '{lexeme}': Can't use 'super' in a class with no superclass.")]
    SuperWithoutSuperclass { lexeme: String, line: usize },

    #[error("[line {line}] Error at '{lexeme}': A class can't inherit from itself.")]
    SelfInheritance { lexeme: String, line: usize },
}

impl ResolveError {
    /// 1‑based source line of the offending token.
    pub fn line(&self) -> usize {
        match self {
            ResolveError::DuplicateDeclaration { line, .. }
            | ResolveError::SelfReferencingInitializer { line, .. }
            | ResolveError::ReturnOutsideFunction { line, .. }
            | ResolveError::ReturnValueFromInitializer { line, .. }
            | ResolveError::ThisOutsideClass { line, .. }
            | ResolveError::SuperOutsideClass { line, .. }
            | ResolveError::SuperWithoutSuperclass { line, .. }
            | ResolveError::SelfInheritance { line, .. } => *line,
        }
    }
}

/// Fatal errors raised while executing a resolved program.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Operand must be a number.\n[line {line}]")]
    OperandMustBeNumber { lexeme: String, line: usize },

    #[error("Operands must be numbers.\n[line {line}]")]
    OperandsMustBeNumbers { lexeme: String, line: usize },

    #[error("Operands must be two numbers or two strings.\n[line {line}]")]
    OperandsMustBeNumbersOrStrings { lexeme: String, line: usize },

    #[error("Operands must be integers.\n[line {line}]")]
    OperandsMustBeIntegers { lexeme: String, line: usize },

    #[error("Modulo by zero.\n[line {line}]")]
    ModuloByZero { lexeme: String, line: usize },

    #[error("Undefined variable '{name}'.\n[line {line}]")]
    UndefinedVariable { name: String, line: usize },

    #[error("Undefined property '{name}'.\n[line {line}]")]
    UndefinedProperty { name: String, line: usize },

    #[error("Can only call functions and classes.\n[line {line}]")]
    NotCallable { lexeme: String, line: usize },

    #[error("Expected {expected} arguments but got {got}.\n[line {line}]")]
    ArityMismatch {
        expected: usize,
        got: usize,
        line: usize,
    },

    #[error("Only instances have properties.\n[line {line}]")]
    OnlyInstancesHaveProperties { name: String, line: usize },

    #[error("Only instances have fields.\n[line {line}]")]
    OnlyInstancesHaveFields { name: String, line: usize },

    #[error("Superclass must be a class.\n[line {line}]")]
    SuperclassMustBeClass { name: String, line: usize },

    #[error("Stack overflow.\n[line {line}]")]
    StackOverflow { line: usize },

    #[error("Only arrays can be subscripted.\n[line {line}]")]
    NotSubscriptable { line: usize },

    #[error("Index must be a number.\n[line {line}]")]
    IndexMustBeNumber { line: usize },

    #[error("Index must be an integer.\n[line {line}]")]
    IndexMustBeInteger { line: usize },

    #[error("Index {index} out of range for array of length {len}.\n[line {line}]")]
    IndexOutOfRange { index: f64, len: usize, line: usize },

    #[error("{function}: {message}\n[line {line}]")]
    NativeArgument {
        function: String,
        message: String,
        line: usize,
    },

    #[error("Failed to write program output: {0}")]
    Io(#[from] io::Error),
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
