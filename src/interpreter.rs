//! Tree‑walking evaluator.
//!
//! Statements execute against `self.environment`, the innermost scope of the
//! running code. Variable accesses use the binding distances recorded by the
//! resolver (`locals`, keyed by [`ExprId`]); anything without a recorded
//! distance is a global and is looked up in `globals` directly.
//!
//! `return` is not an error: executing a statement yields a [`Completion`],
//! and every statement list stops at the first `Completion::Return`, handing
//! it upward until a function call consumes it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::callable::{LoxClass, LoxFunction, LoxInstance};
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::expr::{Expr, ExprId, LiteralValue};
use crate::natives;
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Deepest chain of nested Lox calls before `StackOverflow` is raised.
/// Sized for [`crate::INTERPRETER_STACK_SIZE`].
pub const MAX_CALL_DEPTH: usize = 5_000;

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, RuntimeError>;

/// How a statement finished.
#[derive(Debug, Clone)]
pub enum Completion {
    /// Fell off the end; continue with the next statement.
    Normal,

    /// A `return` is unwinding to the nearest function call.
    Return(Value),
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
    output: Box<dyn Write>,
    call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates an interpreter printing to stdout, with the native functions
    /// defined as globals.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Creates an interpreter whose `print` and `println` output goes to
    /// `output`.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let mut globals = Environment::new();
        natives::install(&mut globals);
        let globals = globals.shared();

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output,
            call_depth: 0,
        }
    }

    /// Resolver callback: the variable expression `id` is bound `depth`
    /// scopes out from where it is evaluated.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        debug!("Recording {:?} at depth {}", id, depth);
        self.locals.insert(id, depth);
    }

    pub fn globals(&self) -> &Rc<RefCell<Environment>> {
        &self.globals
    }

    /// Interprets a list of statements (a "program").
    pub fn interpret(&mut self, statements: &[Stmt]) -> IResult<()> {
        debug!("Interpreting {} statements", statements.len());

        let result = self.execute_all(statements);
        self.output.flush()?;

        if let Completion::Return(value) = result? {
            // Only reachable when the resolver was skipped.
            debug!("Top-level return of {} ended the program", value);
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Writes `text` and a newline to the program output.
    pub(crate) fn write_line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.output, "{}", text)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    fn execute_all(&mut self, statements: &[Stmt]) -> IResult<Completion> {
        for stmt in statements {
            if let Completion::Return(value) = self.execute(stmt)? {
                return Ok(Completion::Return(value));
            }
        }

        Ok(Completion::Normal)
    }

    /// Runs `statements` with `environment` as the innermost scope. The
    /// previous scope is restored on every exit path, including errors and
    /// `return`.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> IResult<Completion> {
        debug!("Entering block with {} statements", statements.len());

        let previous = std::mem::replace(&mut self.environment, environment);
        let result = self.execute_all(statements);
        self.environment = previous;

        debug!("Exited block");
        result
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> IResult<Completion> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.output, "{}", value)?;
                debug!("Printed value: {}", value);
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Variable '{}' defined with value: {}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
            }

            Stmt::Block(statements) => {
                let environment = Environment::with_enclosing(Rc::clone(&self.environment));
                return self.execute_block(statements, environment.shared());
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Completion::Return(value) = self.execute(body)? {
                        return Ok(Completion::Return(value));
                    }
                }
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);
                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );
                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                return Ok(Completion::Return(value));
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods)?,
        }

        Ok(Completion::Normal)
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> IResult<()> {
        debug!("Defining class '{}'", name.lexeme);

        let superclass: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let (super_name, line) = match expr {
                        Expr::Variable { name: super_name, .. } => {
                            (super_name.lexeme.clone(), super_name.line)
                        }
                        _ => (name.lexeme.clone(), name.line),
                    };
                    return Err(RuntimeError::SuperclassMustBeClass {
                        name: super_name,
                        line,
                    });
                }
            },
            None => None,
        };

        // Declared first so methods can refer to the class by name.
        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        let method_closure: Rc<RefCell<Environment>> = match &superclass {
            Some(superclass) => {
                let mut environment = Environment::with_enclosing(Rc::clone(&self.environment));
                environment.define("super", Value::Class(Rc::clone(superclass)));
                environment.shared()
            }
            None => Rc::clone(&self.environment),
        };

        let table: HashMap<String, Rc<LoxFunction>> = methods
            .iter()
            .map(|declaration| {
                let is_initializer = declaration.name.lexeme == "init";
                let method = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&method_closure),
                    is_initializer,
                );
                (declaration.name.lexeme.clone(), Rc::new(method))
            })
            .collect();

        let class = LoxClass::new(name.lexeme.clone(), superclass, table);

        self.environment
            .borrow_mut()
            .assign(&name.lexeme, Value::Class(Rc::new(class)), name.line)?;

        info!("Class '{}' defined with {} methods", name.lexeme, methods.len());
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left)?;
                let short_circuit = if operator.token_type == TokenType::OR {
                    left_val.is_truthy()
                } else {
                    !left_val.is_truthy()
                };

                if short_circuit {
                    Ok(left_val)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => Environment::assign_at(
                        &self.environment,
                        distance,
                        &name.lexeme,
                        value.clone(),
                        name.line,
                    )?,
                    None => self
                        .globals
                        .borrow_mut()
                        .assign(&name.lexeme, value.clone(), name.line)?,
                }

                debug!("Assigned value {} to '{}'", value, name.lexeme);
                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                _ => Err(RuntimeError::OnlyInstancesHaveProperties {
                    name: name.lexeme.clone(),
                    line: name.line,
                }),
            },

            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value = self.evaluate(value)?;
                    instance.set(name, value.clone());
                    Ok(value)
                }
                _ => Err(RuntimeError::OnlyInstancesHaveFields {
                    name: name.lexeme.clone(),
                    line: name.line,
                }),
            },

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),

            Expr::Array { elements, .. } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate(element)?);
                }
                Ok(Value::Array(Rc::new(RefCell::new(values))))
            }

            Expr::Subscript {
                object,
                bracket,
                index,
            } => self.evaluate_subscript(object, bracket, index),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> IResult<Value> {
        match self.locals.get(&id) {
            Some(&distance) => {
                Environment::get_at(&self.environment, distance, &name.lexeme, name.line)
            }
            None => self.globals.borrow().get(&name.lexeme, name.line),
        }
    }

    fn evaluate_unary(&mut self, op: &Token, right: &Expr) -> IResult<Value> {
        let right_val = self.evaluate(right)?;

        match op.token_type {
            TokenType::MINUS => match right_val {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(RuntimeError::OperandMustBeNumber {
                    lexeme: op.lexeme.clone(),
                    line: op.line,
                }),
            },
            _ => Ok(Value::Bool(!right_val.is_truthy())),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> IResult<Value> {
        let left_val = self.evaluate(left)?;
        let right_val = self.evaluate(right)?;
        debug!(
            "Binary '{}': left={}, right={}",
            op.lexeme, left_val, right_val
        );

        match op.token_type {
            TokenType::PLUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                _ => Err(RuntimeError::OperandsMustBeNumbersOrStrings {
                    lexeme: op.lexeme.clone(),
                    line: op.line,
                }),
            },

            TokenType::MINUS => {
                let (a, b) = number_operands(op, &left_val, &right_val)?;
                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = number_operands(op, &left_val, &right_val)?;
                Ok(Value::Number(a * b))
            }

            // IEEE‑754: x / 0 is ±inf or NaN, not an error.
            TokenType::SLASH => {
                let (a, b) = number_operands(op, &left_val, &right_val)?;
                Ok(Value::Number(a / b))
            }

            TokenType::PERCENT => {
                let (a, b) = number_operands(op, &left_val, &right_val)?;

                if !is_integral(a) || !is_integral(b) {
                    return Err(RuntimeError::OperandsMustBeIntegers {
                        lexeme: op.lexeme.clone(),
                        line: op.line,
                    });
                }

                if b == 0.0 {
                    return Err(RuntimeError::ModuloByZero {
                        lexeme: op.lexeme.clone(),
                        line: op.line,
                    });
                }

                // Truncated remainder: the sign follows the dividend.
                Ok(Value::Number(a % b))
            }

            TokenType::GREATER => {
                let (a, b) = number_operands(op, &left_val, &right_val)?;
                Ok(Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = number_operands(op, &left_val, &right_val)?;
                Ok(Value::Bool(a >= b))
            }

            TokenType::LESS => {
                let (a, b) = number_operands(op, &left_val, &right_val)?;
                Ok(Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = number_operands(op, &left_val, &right_val)?;
                Ok(Value::Bool(a <= b))
            }

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_val.is_equal(&right_val))),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!left_val.is_equal(&right_val))),

            _ => unreachable!("parser only builds binary nodes for binary operators"),
        }
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> IResult<Value> {
        let callee_val = self.evaluate(callee)?;

        let Some(callable) = callee_val.as_callable() else {
            return Err(RuntimeError::NotCallable {
                lexeme: paren.lexeme.clone(),
                line: paren.line,
            });
        };

        let mut arg_values = Vec::with_capacity(arguments.len());
        for arg in arguments {
            arg_values.push(self.evaluate(arg)?);
        }

        if arg_values.len() != callable.arity() {
            return Err(RuntimeError::ArityMismatch {
                expected: callable.arity(),
                got: arg_values.len(),
                line: paren.line,
            });
        }

        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::StackOverflow { line: paren.line });
        }

        debug!("Calling {} with {} argument(s)", callee_val, arg_values.len());
        self.call_depth += 1;
        let result = callable.call(self, paren, arg_values);
        self.call_depth -= 1;
        result
    }

    /// `super` sits one scope outside the `this` scope of the method.
    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> IResult<Value> {
        let Some(&distance) = self.locals.get(&id) else {
            return Err(RuntimeError::UndefinedVariable {
                name: keyword.lexeme.clone(),
                line: keyword.line,
            });
        };

        let superclass = match Environment::get_at(&self.environment, distance, "super", keyword.line)? {
            Value::Class(class) => class,
            _ => {
                return Err(RuntimeError::SuperclassMustBeClass {
                    name: keyword.lexeme.clone(),
                    line: keyword.line,
                })
            }
        };

        let this_distance = distance.saturating_sub(1);
        let instance = match Environment::get_at(&self.environment, this_distance, "this", keyword.line)? {
            Value::Instance(instance) => instance,
            _ => {
                return Err(RuntimeError::OnlyInstancesHaveProperties {
                    name: method.lexeme.clone(),
                    line: method.line,
                })
            }
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(instance)))),
            None => Err(RuntimeError::UndefinedProperty {
                name: method.lexeme.clone(),
                line: method.line,
            }),
        }
    }

    fn evaluate_subscript(&mut self, object: &Expr, bracket: &Token, index: &Expr) -> IResult<Value> {
        let object_val = self.evaluate(object)?;
        let index_val = self.evaluate(index)?;

        let Value::Array(elements) = object_val else {
            return Err(RuntimeError::NotSubscriptable { line: bracket.line });
        };

        let Value::Number(index) = index_val else {
            return Err(RuntimeError::IndexMustBeNumber { line: bracket.line });
        };

        if !is_integral(index) {
            return Err(RuntimeError::IndexMustBeInteger { line: bracket.line });
        }

        let elements = elements.borrow();
        if index < 0.0 || index >= elements.len() as f64 {
            return Err(RuntimeError::IndexOutOfRange {
                index,
                len: elements.len(),
                line: bracket.line,
            });
        }

        Ok(elements[index as usize].clone())
    }
}

fn number_operands(op: &Token, left: &Value, right: &Value) -> IResult<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::OperandsMustBeNumbers {
            lexeme: op.lexeme.clone(),
            line: op.line,
        }),
    }
}

fn is_integral(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0
}
