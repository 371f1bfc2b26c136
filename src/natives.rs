//! Builtin functions installed into the global environment.

use std::rc::Rc;

use chrono::Utc;
use log::{debug, info};

use crate::callable::{NativeFn, NativeFunction};
use crate::environment::Environment;
use crate::interpreter::Interpreter;
use crate::value::Value;

const NATIVES: &[(&str, usize, NativeFn)] = &[
    ("clock", 0, clock),
    ("floor", 1, floor),
    ("str", 1, stringify),
    ("len", 1, len),
    ("println", 1, print_line),
];

/// Defines every builtin in `globals`.
pub fn install(globals: &mut Environment) {
    for &(name, arity, func) in NATIVES {
        debug!("Defining native function '{}'", name);

        globals.define(
            name,
            Value::NativeFunction(Rc::new(NativeFunction { name, arity, func })),
        );
    }

    info!("Installed {} native functions", NATIVES.len());
}

/// Seconds since the Unix epoch, with millisecond precision.
fn clock(_interpreter: &mut Interpreter, _args: &[Value]) -> Result<Value, String> {
    let millis = Utc::now().timestamp_millis();
    Ok(Value::Number(millis as f64 / 1000.0))
}

/// Truncates toward zero.
fn floor(_interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, String> {
    match &args[0] {
        Value::Number(n) => Ok(Value::Number(n.trunc())),
        other => Err(format!("Argument must be a number, got {}.", other.type_name())),
    }
}

fn stringify(_interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, String> {
    Ok(Value::String(args[0].to_string()))
}

fn len(_interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, String> {
    match &args[0] {
        Value::Array(elements) => Ok(Value::Number(elements.borrow().len() as f64)),
        other => Err(format!("Only arrays have a length, got {}.", other.type_name())),
    }
}

fn print_line(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, String> {
    interpreter
        .write_line(&args[0].to_string())
        .map_err(|e| format!("Failed to write output: {}", e))?;

    Ok(Value::Nil)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(func: NativeFn, args: &[Value]) -> Result<Value, String> {
        let mut interpreter = Interpreter::with_output(Box::new(std::io::sink()));
        func(&mut interpreter, args)
    }

    #[test]
    fn floor_truncates_toward_zero() {
        assert!(matches!(call(floor, &[Value::Number(2.7)]), Ok(Value::Number(n)) if n == 2.0));
        assert!(matches!(call(floor, &[Value::Number(-2.7)]), Ok(Value::Number(n)) if n == -2.0));
    }

    #[test]
    fn floor_rejects_non_numbers() {
        let err = call(floor, &[Value::from("x")]).unwrap_err();
        assert!(err.contains("number"));
    }

    #[test]
    fn stringify_uses_display_form() {
        assert!(matches!(call(stringify, &[Value::Number(3.0)]), Ok(Value::String(s)) if s == "3"));
        assert!(matches!(call(stringify, &[Value::Nil]), Ok(Value::String(s)) if s == "nil"));
    }

    #[test]
    fn len_counts_array_elements_only() {
        let array = Value::Array(Rc::new(std::cell::RefCell::new(vec![Value::Nil, Value::Nil])));
        assert!(matches!(call(len, &[array]), Ok(Value::Number(n)) if n == 2.0));
        assert!(call(len, &[Value::from("abc")]).is_err());
    }

    #[test]
    fn clock_is_after_2020() {
        assert!(matches!(call(clock, &[]), Ok(Value::Number(n)) if n > 1_577_836_800.0));
    }

    #[test]
    fn print_line_returns_nil() {
        assert!(matches!(call(print_line, &[Value::from("hi")]), Ok(Value::Nil)));
    }
}
