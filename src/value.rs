use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::callable::{Callable, LoxClass, LoxFunction, LoxInstance, NativeFunction};

/// Every runtime value a Lox program can produce.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Function(Rc<LoxFunction>),
    NativeFunction(Rc<NativeFunction>),
    Class(Rc<LoxClass>),
    Instance(Rc<LoxInstance>),
    Array(Rc<RefCell<Vec<Value>>>),
}

impl Value {
    /// `nil` and `false` are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Equality without coercion: values of different types are never equal;
    /// reference types compare by identity.
    pub fn is_equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::NativeFunction(a), Value::NativeFunction(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// The callable behind this value, if it can be invoked.
    pub fn as_callable(&self) -> Option<Rc<dyn Callable>> {
        match self {
            Value::Function(function) => Some(Rc::clone(function) as Rc<dyn Callable>),
            Value::NativeFunction(native) => Some(Rc::clone(native) as Rc<dyn Callable>),
            Value::Class(class) => Some(Rc::clone(class) as Rc<dyn Callable>),
            _ => None,
        }
    }

    /// Short type name used in native‑function diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) | Value::NativeFunction(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::Array(_) => "array",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 {
                    // `+ 0.0` turns -0 into 0.
                    write!(f, "{:.0}", n + 0.0)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::String(s) => write!(f, "{}", s),

            Value::Function(function) => write!(f, "{}", function),

            Value::NativeFunction(_) => write!(f, "<native fn>"),

            Value::Class(class) => write!(f, "{}", class.name),

            Value::Instance(instance) => write!(f, "{} instance", instance.class().name),

            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_nil_and_false_are_falsy() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::from("").is_truthy());
        assert!(Value::Array(Rc::new(RefCell::new(Vec::new()))).is_truthy());
    }

    #[test]
    fn equality_never_coerces() {
        assert!(!Value::from("1").is_equal(&Value::Number(1.0)));
        assert!(Value::Number(1.0).is_equal(&Value::Number(1.0)));
        assert!(Value::Nil.is_equal(&Value::Nil));
        assert!(!Value::Nil.is_equal(&Value::Bool(false)));
        assert!(Value::from("ab").is_equal(&Value::from("ab")));
    }

    #[test]
    fn arrays_compare_by_identity() {
        let a = Value::Array(Rc::new(RefCell::new(vec![Value::Number(1.0)])));
        let b = Value::Array(Rc::new(RefCell::new(vec![Value::Number(1.0)])));
        assert!(a.is_equal(&a.clone()));
        assert!(!a.is_equal(&b));
    }

    #[test]
    fn integral_numbers_print_without_fraction() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(-12.0).to_string(), "-12");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(f64::INFINITY).to_string(), "inf");
    }

    #[test]
    fn negative_zero_prints_as_zero() {
        assert_eq!(Value::Number(-0.0).to_string(), "0");
        assert_eq!(Value::Number(-0.5).to_string(), "-0.5");
    }

    #[test]
    fn arrays_print_their_elements() {
        let array = Value::Array(Rc::new(RefCell::new(vec![
            Value::Number(1.0),
            Value::from("two"),
            Value::Nil,
        ])));
        assert_eq!(array.to_string(), "[1, two, nil]");
    }

    #[test]
    fn plain_values_are_not_callable() {
        assert!(Value::Number(1.0).as_callable().is_none());
        assert!(Value::Nil.as_callable().is_none());
    }
}
