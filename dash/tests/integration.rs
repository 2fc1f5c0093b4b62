//! Integration tests for the dash interpreter
//!
//! Drives the full pipeline through the public API: tokenize, parse
//! (imports included), evaluate against a fresh interpreter state.

use dash::interp::ctx::{ExecCtx, StateRef};
use dash::interp::eval::{eval, expect_value};
use dash::interp::scope::ScopeRef;
use dash::interp::value::Value;
use dash::lexer::tokenize;
use dash::parser::Parser;

/// Run a source string as a module body, returning the last value.
fn run_program(source: &str) -> dash::Result<Value> {
    let state = StateRef::new();
    let file = state.add_source("test.dash", source);
    let tokens = tokenize(source, file)?;
    let mut parser = Parser::new(file, tokens, state.clone());
    let exprs = parser.parse_everything()?;
    let mut ctx = ExecCtx::new(ScopeRef::root(), state);
    let mut last = Value::Null;
    for expr in &exprs {
        last = expect_value(eval(expr, &mut ctx)?, expr.span)?;
    }
    Ok(last)
}

fn value_of(source: &str) -> Value {
    match run_program(source) {
        Ok(value) => value,
        Err(err) => panic!("program failed: {err}\nsource: {source}"),
    }
}

fn fails(source: &str) -> bool {
    run_program(source).is_err()
}

// ============================================
// Programs
// ============================================

#[test]
fn test_fizzbuzz_shape() {
    let source = r#"
        fun fizzbuzz(n: int): str {
            if n % 15 == 0 then "fizzbuzz"
            else if n % 3 == 0 then "fizz"
            else if n % 5 == 0 then "buzz"
            else n as str
        };
        fizzbuzz(3) + fizzbuzz(5) + fizzbuzz(15) + fizzbuzz(7)
    "#;
    assert_eq!(value_of(source), Value::Str("fizzbuzzfizzbuzz7".to_string()));
}

#[test]
fn test_fibonacci_recursion() {
    let source = r#"
        fun fib(n: int): int {
            if n < 2 then n else fib(n - 1) + fib(n - 2)
        };
        fib(10)
    "#;
    assert_eq!(value_of(source), Value::Int(55));
}

#[test]
fn test_counter_closures_share_environment() {
    let source = r#"
        fun make_counter() {
            let count = 0;
            fun () { count = count + 1; count }
        };
        let tick = make_counter();
        tick(); tick(); tick()
    "#;
    assert_eq!(value_of(source), Value::Int(3));
}

#[test]
fn test_struct_graph() {
    let source = r#"
        struct Node(value: int, next: _);
        let tail = Node(2, null);
        let head = Node(1, tail);
        head.next.value = 5;
        tail.value
    "#;
    assert_eq!(value_of(source), Value::Int(5));
}

#[test]
fn test_accumulate_with_stdlib_list() {
    let source = r#"
        import list;
        let out = [];
        foreach x in [1, 2, 3, 4] {
            if x % 2 == 0 then list::add(out, x)
        };
        list::len(out) + out[0] + out[1]
    "#;
    assert_eq!(value_of(source), Value::Int(8));
}

#[test]
fn test_string_pipeline() {
    let source = r#"
        import str;
        let parts = "a,b,c"->str::split(",");
        parts[0] + parts[2]->str::upper()
    "#;
    assert_eq!(value_of(source), Value::Str("aC".to_string()));
}

#[test]
fn test_reflection_round_trip() {
    let source = r#"
        import reflection;
        reflection::bind("answer", 42);
        reflection::ifHas("answer")
    "#;
    assert_eq!(value_of(source), Value::Int(42));
}

#[test]
fn test_reflection_struct_surgery() {
    let source = r#"
        import reflection;
        let s = reflection::makeStruct("Blob", dict { "a": 1 });
        reflection::addField(s, "b", 2);
        s.a + s.b
    "#;
    assert_eq!(value_of(source), Value::Int(3));
}

#[test]
fn test_using_imports_into_scope() {
    let source = r#"
        import reflection;
        import str;
        reflection::using(["str"]);
        upper("hey")
    "#;
    assert_eq!(value_of(source), Value::Str("HEY".to_string()));
}

#[test]
fn test_exec_builds_bindings_dynamically() {
    let source = r#"
        exec "let built = 40";
        built + 2
    "#;
    assert_eq!(value_of(source), Value::Int(42));
}

// ============================================
// Spec §8 properties, end to end
// ============================================

#[test]
fn test_narrowing_follows_declared_left_kind() {
    let source = "let x: int = 2; x + 3.5";
    assert_eq!(value_of(source), Value::Int(5));
}

#[test]
fn test_precedence_values() {
    assert_eq!(value_of("1 + 2 * 3"), Value::Int(7));
    assert_eq!(value_of("(1 + 2) * 3"), Value::Int(9));
    assert_eq!(value_of("10 - 3 - 2"), Value::Int(5));
}

#[test]
fn test_if_scope_is_invisible_after() {
    assert!(fails("if true then { let inner = 1; inner }; inner"));
}

#[test]
fn test_binding_errors() {
    assert!(fails("let x = 1; let x = 2"));
    assert!(fails("y = 1"));
}

#[test]
fn test_struct_subtyping_directions() {
    assert_eq!(
        value_of("struct A(); struct B(): A; B() is A"),
        Value::Bool(true)
    );
    assert_eq!(
        value_of("struct A(); struct B(): A; A() is B"),
        Value::Bool(false)
    );
    assert!(fails("struct A(); struct B(): A; let x: B = A()"));
}

#[test]
fn test_closure_sees_later_mutation() {
    assert_eq!(
        value_of("let x = 1; let f = fun() x; x = 2; f()"),
        Value::Int(2)
    );
}

#[test]
fn test_negative_index_window() {
    assert_eq!(value_of("[7, 8, 9][-1]"), Value::Int(9));
    assert_eq!(value_of("[7, 8, 9][-3]"), Value::Int(7));
    assert!(fails("[7, 8, 9][-4]"));
    assert!(fails("[7, 8, 9][3]"));
}

#[test]
fn test_composition_runs_both_bodies() {
    let source = r#"
        let log = [];
        import list;
        let f = fun() { list::add(log, 1); 1 };
        let g = fun() { list::add(log, 2); 2 };
        let h = f + g;
        h() + list::len(log) * 10
    "#;
    // h() is g's result (2), and both bodies appended
    assert_eq!(value_of(source), Value::Int(22));
}

// ============================================
// Error taxonomy
// ============================================

#[test]
fn test_runtime_value_errors_are_fatal() {
    assert!(fails("1 / 0"));
    assert!(fails("dict { \"a\": 1 }[\"missing\"]"));
    assert!(fails("5(1)"));
    assert!(fails("\"abc\"[9]"));
}

#[test]
fn test_type_errors_are_fatal() {
    assert!(fails("let x: int = \"s\""));
    assert!(fails("fun f(): int { \"s\" }; f()"));
    assert!(fails("fun f(a: int) a; f(1, 2)"));
    assert!(fails("5 as int|str"));
}

#[test]
fn test_control_flow_misuse_is_fatal() {
    assert!(fails("break"));
    assert!(fails("continue"));
    assert!(fails("return 0"));
    assert!(fails("let f = fun() break; foreach x in [1] { f() }"));
}

#[test]
fn test_module_errors() {
    assert!(fails("nowhere::thing"));
    assert!(fails("import \"no/such/module.dash\""));
}

// ============================================
// Parser-evaluator interplay
// ============================================

#[test]
fn test_extension_chain_program() {
    let source = r#"
        struct Holder(fns: list);
        let h = Holder([fun(x) x * 2]);
        h.fns[0](21)
    "#;
    assert_eq!(value_of(source), Value::Int(42));
}

#[test]
fn test_user_defined_operator_end_to_end() {
    let source = r#"
        import reflection;
        reflection::bind("<+>", fun(a: int, b: int): int { a * 10 + b });
        1 <+> 2 <+> 3
    "#;
    // default priority, left-associative: (1 <+> 2) <+> 3
    assert_eq!(value_of(source), Value::Int(123));
}

#[test]
fn test_dict_entry_iteration() {
    let source = r#"
        let d = dict { "a": 1, "b": 2 };
        let total = 0;
        foreach entry in d { total = total + entry["value"] };
        total
    "#;
    assert_eq!(value_of(source), Value::Int(3));
}

#[test]
fn test_decimal_suffix_arithmetic() {
    assert_eq!(value_of("0.1m + 0.2m == 0.3m"), Value::Bool(true));
}

#[test]
fn test_ref_cells_through_functions() {
    let source = r#"
        let slot = 0;
        fun set_through(cell, v) { cell = v };
        set_through(ref slot, 9);
        slot
    "#;
    assert_eq!(value_of(source), Value::Int(9));
}
