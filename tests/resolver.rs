#[cfg(test)]
mod resolver_tests {
    use treelox as lox;

    use lox::error::ResolveError;
    use lox::interpreter::Interpreter;
    use lox::parser::Parser;
    use lox::resolver::Resolver;

    fn resolve(source: &str) -> Result<(), ResolveError> {
        let tokens = lox::tokenize(source).expect("source should scan");
        let statements = Parser::new(tokens).parse().expect("source should parse");
        let mut interpreter = Interpreter::with_output(Box::new(std::io::sink()));
        Resolver::new(&mut interpreter).resolve(&statements)
    }

    fn resolve_err(source: &str) -> ResolveError {
        resolve(source).expect_err("resolution should fail")
    }

    #[test]
    fn well_formed_program_resolves() {
        let source = r#"
            var global = 1;
            fun outer(a) {
                var b = a;
                fun inner() { return a + b + global; }
                return inner;
            }
            class Base { init(x) { this.x = x; } }
            class Derived < Base {
                init(x) { super.init(x); }
                get() { return this.x; }
            }
        "#;
        assert_eq!(resolve(source), Ok(()));
    }

    #[test]
    fn reading_local_in_its_own_initializer_is_rejected() {
        assert_eq!(
            resolve_err("{ var a = a; }"),
            ResolveError::SelfReferencingInitializer {
                lexeme: "a".into(),
                line: 1
            }
        );
    }

    #[test]
    fn shadowing_an_outer_local_in_initializer_is_still_rejected() {
        let err = resolve_err("{ var a = 1; { var a = a + 1; } }");
        assert!(matches!(err, ResolveError::SelfReferencingInitializer { .. }));
    }

    #[test]
    fn global_self_reference_is_left_to_runtime() {
        assert_eq!(resolve("var a = a;"), Ok(()));
    }

    #[test]
    fn duplicate_parameter_is_rejected() {
        let err = resolve_err("fun f(a, a) {}");
        assert!(matches!(err, ResolveError::DuplicateDeclaration { ref lexeme, .. } if lexeme == "a"));
    }

    #[test]
    fn top_level_return_is_rejected() {
        let err = resolve_err("\nreturn 1;");
        assert_eq!(
            err,
            ResolveError::ReturnOutsideFunction {
                lexeme: "return".into(),
                line: 2
            }
        );
        assert_eq!(
            err.to_string(),
            "[line 2] Error at 'return': Can't return from top-level code."
        );
    }

    #[test]
    fn returning_a_value_from_init_is_rejected() {
        let err = resolve_err("class A { init() { return 1; } }");
        assert!(matches!(err, ResolveError::ReturnValueFromInitializer { .. }));
    }

    #[test]
    fn this_outside_class_is_rejected() {
        let err = resolve_err("fun f() { return this; }");
        assert!(matches!(err, ResolveError::ThisOutsideClass { .. }));
    }

    #[test]
    fn super_outside_class_is_rejected() {
        let err = resolve_err("fun f() { super.go(); }");
        assert!(matches!(err, ResolveError::SuperOutsideClass { .. }));
    }

    #[test]
    fn super_without_superclass_is_rejected() {
        let err = resolve_err("class A { go() { super.go(); } }");
        assert!(matches!(err, ResolveError::SuperWithoutSuperclass { .. }));
    }

    #[test]
    fn class_inheriting_from_itself_is_rejected() {
        let err = resolve_err("class A < A {}");
        assert_eq!(
            err,
            ResolveError::SelfInheritance {
                lexeme: "A".into(),
                line: 1
            }
        );
    }

    #[test]
    fn first_error_wins() {
        let err = resolve_err("return 1;\n{ var a = a; }");
        assert_eq!(err.line(), 1);
    }
}
