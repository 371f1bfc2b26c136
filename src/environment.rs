use crate::error::RuntimeError;
use crate::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One scope of the runtime scope chain.
///
/// Environments are shared as `Rc<RefCell<Environment>>`: a closure keeps
/// the scope it was created in alive for as long as the closure itself is
/// reachable.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    /// A root (global) environment.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Convenience for the common `Rc::new(RefCell::new(..))` wrapping.
    pub fn shared(self) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(self))
    }

    /// Binds `name` in this scope, replacing any previous binding here.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str, line: usize) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(RuntimeError::UndefinedVariable {
                name: name.to_string(),
                line,
            })
        }
    }

    /// Overwrites the nearest existing binding of `name`. Never creates one.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(RuntimeError::UndefinedVariable {
                name: name.to_string(),
                line,
            })
        }
    }

    /// The environment `distance` enclosing hops away from `env`
    /// (`0` is `env` itself). Stops at the root if the chain is shorter.
    pub fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Rc<RefCell<Environment>> {
        let mut current: Rc<RefCell<Environment>> = Rc::clone(env);

        for hop in 0..distance {
            let next = current.borrow().enclosing.clone();

            match next {
                Some(enclosing) => current = enclosing,
                None => {
                    debug!("Scope chain ended after {} of {} hops", hop, distance);
                    break;
                }
            }
        }

        current
    }

    pub fn get_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        line: usize,
    ) -> Result<Value, RuntimeError> {
        Self::ancestor(env, distance).borrow().get(name, line)
    }

    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        value: Value,
        line: usize,
    ) -> Result<(), RuntimeError> {
        Self::ancestor(env, distance)
            .borrow_mut()
            .assign(name, value, line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(depth: usize) -> Vec<Rc<RefCell<Environment>>> {
        let mut envs = vec![Environment::new().shared()];
        for _ in 0..depth {
            let inner = Environment::with_enclosing(Rc::clone(envs.last().unwrap())).shared();
            envs.push(inner);
        }
        envs
    }

    #[test]
    fn get_walks_outward() {
        let envs = chain(2);
        envs[0].borrow_mut().define("a", Value::Number(1.0));

        let value = envs[2].borrow().get("a", 1).unwrap();
        assert!(matches!(value, Value::Number(n) if n == 1.0));
    }

    #[test]
    fn get_undefined_is_an_error() {
        let envs = chain(3);
        let err = envs[3].borrow().get("missing", 9).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::UndefinedVariable { ref name, line: 9 } if name == "missing"
        ));
    }

    #[test]
    fn assign_never_creates_a_binding() {
        let envs = chain(1);
        let err = envs[1]
            .borrow_mut()
            .assign("ghost", Value::Nil, 2)
            .unwrap_err();
        assert!(matches!(err, RuntimeError::UndefinedVariable { .. }));
        assert!(envs[1].borrow().get("ghost", 2).is_err());
    }

    #[test]
    fn assign_mutates_nearest_binding_only() {
        let envs = chain(2);
        envs[0].borrow_mut().define("x", Value::Number(1.0));
        envs[1].borrow_mut().define("x", Value::Number(2.0));

        envs[2]
            .borrow_mut()
            .assign("x", Value::Number(3.0), 1)
            .unwrap();

        assert!(matches!(envs[1].borrow().get("x", 1).unwrap(), Value::Number(n) if n == 3.0));
        assert!(matches!(envs[0].borrow().get("x", 1).unwrap(), Value::Number(n) if n == 1.0));
    }

    #[test]
    fn ancestor_hops_exactly_distance_links() {
        let envs = chain(4);
        for (distance, expected) in envs.iter().rev().enumerate() {
            let found = Environment::ancestor(&envs[4], distance);
            assert!(Rc::ptr_eq(&found, expected));
        }
    }

    #[test]
    fn assign_at_then_get_at_round_trips_at_every_depth() {
        let envs = chain(3);
        for (i, env) in envs.iter().enumerate() {
            env.borrow_mut().define("v", Value::Number(i as f64));
        }

        for distance in 0..=3 {
            let value = Value::Number(100.0 + distance as f64);
            Environment::assign_at(&envs[3], distance, "v", value, 1).unwrap();
            let read = Environment::get_at(&envs[3], distance, "v", 1).unwrap();
            assert!(matches!(read, Value::Number(n) if n == 100.0 + distance as f64));
        }
    }

    #[test]
    fn define_overwrites_in_same_scope() {
        let env = Environment::new();
        let env = env.shared();
        env.borrow_mut().define("a", Value::Number(1.0));
        env.borrow_mut().define("a", Value::Bool(true));
        assert!(matches!(env.borrow().get("a", 1).unwrap(), Value::Bool(true)));
    }
}
