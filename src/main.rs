use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use treelox as lox;

use lox::ast_printer::AstPrinter;
use lox::error::{LoxError, EXIT_IO};
use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Print the token list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse {
        filename: Option<PathBuf>,

        /// Print the expression tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a Lox program
    Run { filename: Option<PathBuf> },
}

/// Memory‑maps a source file and checks that it is UTF‑8.
fn read_source(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).with_context(|| format!("Failed to open file {:?}", filename))?;

    let len = file
        .metadata()
        .with_context(|| format!("Failed to stat file {:?}", filename))?
        .len();

    // Zero-length mappings are rejected by the OS.
    if len == 0 {
        info!("{:?} is empty", filename);
        return Ok(String::new());
    }

    // SAFETY: the mapping is only read, and copied out before returning.
    let map = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to map file {:?}", filename))?;

    let source = std::str::from_utf8(&map)
        .map_err(LoxError::from)
        .with_context(|| format!("{:?} is not valid UTF-8", filename))?;

    info!("Read {} bytes from {:?}", map.len(), filename);
    Ok(source.to_owned())
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // `[module:line] - message`, one record per line
    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("treelox::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Prints `error` to stderr and exits with its status code.
fn fail(error: &LoxError) -> ! {
    debug!("Exiting with {}: {}", error.exit_code(), error);
    eprintln!("{}", error);
    std::process::exit(error.exit_code());
}

fn no_input() -> ! {
    println!("No input filepath was provided. Exiting...");
    std::process::exit(0);
}

/// Prints every scanner error, exiting if there was any.
fn tokens_or_exit(source: &str) -> Vec<lox::token::Token> {
    match lox::tokenize(source) {
        Ok(tokens) => tokens,
        Err(errors) => {
            for e in &errors {
                eprintln!("{}", e);
            }
            std::process::exit(lox::error::EXIT_SYNTAX);
        }
    }
}

fn load(filename: &Path) -> String {
    match read_source(filename) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(EXIT_IO);
        }
    }
}

/// Evaluates a single expression and prints its value, exiting on failure.
fn evaluate_source(source: &str) {
    let tokens = tokens_or_exit(source);
    let expr = match Parser::new(tokens).parse_expression() {
        Ok(expr) => expr,
        Err(e) => fail(&e),
    };

    let mut interpreter = Interpreter::new();
    match interpreter.evaluate(&expr) {
        Ok(value) => {
            debug!("Evaluated to: {}", value);
            println!("{}", value);
        }
        Err(e) => fail(&LoxError::from(e)),
    }
}

/// Parses, resolves and runs a whole program, exiting on the first failure.
fn run_program(source: &str) {
    let tokens = tokens_or_exit(source);
    let statements = match Parser::new(tokens).parse() {
        Ok(statements) => statements,
        Err(errors) => {
            for e in &errors {
                eprintln!("{}", e);
            }
            std::process::exit(lox::error::EXIT_SYNTAX);
        }
    };
    info!("Parsed {} statements", statements.len());

    let mut interpreter = Interpreter::new();

    if let Err(e) = Resolver::new(&mut interpreter).resolve(&statements) {
        fail(&LoxError::from(e));
    }

    if let Err(e) = interpreter.interpret(&statements) {
        fail(&LoxError::from(e));
    }
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => {
            let Some(filename) = filename else { no_input() };
            info!("Running Tokenize subcommand");

            let source = load(&filename);
            let mut failed = false;
            let mut tokens = Vec::new();

            for token in lox::scanner::Scanner::new(&source) {
                match token {
                    Ok(token) => {
                        debug!("Scanned token: {}", token);
                        if !json {
                            println!("{}", token);
                        }
                        tokens.push(token);
                    }
                    Err(e) => {
                        failed = true;
                        eprintln!("{}", e);
                    }
                }
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&tokens)?);
            }

            if failed {
                debug!("Tokenization failed, exiting with code 65");
                std::process::exit(lox::error::EXIT_SYNTAX);
            }

            info!("Tokenization completed successfully");
        }

        Commands::Parse { filename, json } => {
            let Some(filename) = filename else { no_input() };
            info!("Running Parse subcommand");

            let source = load(&filename);
            let tokens = tokens_or_exit(&source);

            match Parser::new(tokens).parse_expression() {
                Ok(expr) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&expr)?);
                    } else {
                        let ast_str = AstPrinter::print(&expr);
                        debug!("AST: {}", ast_str);
                        println!("{}", ast_str);
                    }
                }
                Err(e) => fail(&e),
            }

            info!("Parse subcommand completed");
        }

        Commands::Evaluate { filename } => {
            let Some(filename) = filename else { no_input() };
            info!("Running Evaluate subcommand");

            let source = load(&filename);
            lox::on_interpreter_stack(move || evaluate_source(&source))
                .context("Failed to start interpreter thread")?;

            info!("Evaluate subcommand completed");
        }

        Commands::Run { filename } => {
            let Some(filename) = filename else { no_input() };
            info!("Running Run subcommand");

            let source = load(&filename);
            debug!("Provided input:\n{}", source);

            lox::on_interpreter_stack(move || run_program(&source))
                .context("Failed to start interpreter thread")?;

            info!("Program executed successfully");
        }
    }

    Ok(())
}
