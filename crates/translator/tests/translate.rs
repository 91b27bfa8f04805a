//! End-to-end translation tests: translate EVM-dialect sources and check
//! both the shape of the output AST and, through the interpreter, the
//! behavior of the translated program.

use alloy_primitives::U256;
use sasm_analyses::analyze_block;
use sasm_data::{
    Dialect, Object, Statement,
    visitor::{self, Visitor},
};
use sasm_interp::{CallOutcome, InterpError, Interpreter};
use sasm_parser::{parse_object, parse_program};
use sasm_translator::{TranslationError, Translator, translate_object};
use std::collections::HashSet;

fn translate_source(source: &str) -> Object {
    let object = parse_program(source).expect("parse failed");
    analyze_block(&Dialect::evm256(), &object.code).expect("input analyzes");
    translate_object(&object).expect("translation failed")
}

/// Translates and runs `main`, returning the interpreter for inspection.
fn run_translated(source: &str) -> (Interpreter, Result<CallOutcome, InterpError>) {
    let translated = translate_source(source);
    let mut interp = Interpreter::new(&translated.code);
    let outcome = interp.run_main();
    (interp, outcome)
}

fn storage_at(interp: &Interpreter, key: u64) -> Option<U256> {
    interp.state.storage.get(&U256::from(key)).copied()
}

#[test]
fn identity_program_expands_declarations() {
    let translated = translate_source("{ let x := 0 }");

    // The output analyzes under the target dialect.
    analyze_block(&Dialect::wasm64(), &translated.code).expect("output analyzes");

    // main comes first and starts with the four limb declarations.
    let Statement::FunctionDefinition(main) = &translated.code.statements[0] else {
        panic!("expected main function first");
    };
    assert_eq!(main.name, "main");
    for (i, statement) in main.body.statements.iter().take(4).enumerate() {
        let Statement::VariableDeclaration(decl) = statement else {
            panic!("expected limb declaration, got {statement:?}");
        };
        assert_eq!(decl.variables, vec![format!("x_{}", i + 1)]);
    }

    // The polyfill follows in the same block.
    let names = defined_functions(&translated);
    assert!(names.contains("add"));
    assert!(names.contains("or_bool"));
}

#[test]
fn single_addition_expands_and_computes() {
    let (interp, outcome) = run_translated("{ let x := add(1, 2) sstore(0, x) }");
    assert!(matches!(outcome, Ok(CallOutcome::Values(_))));
    assert_eq!(storage_at(&interp, 0), Some(U256::from(3u64)));

    let translated = translate_source("{ let x := add(1, 2) sstore(0, x) }");
    assert!(
        translated.code.to_string().contains("add(0, 0, 0, 1, 0, 0, 0, 2)"),
        "the add call must expand to eight limb arguments"
    );
}

#[test]
fn storage_round_trip() {
    let (interp, outcome) =
        run_translated("{ sstore(1, 42) let v := sload(1) sstore(2, v) }");
    assert!(outcome.is_ok());
    assert_eq!(storage_at(&interp, 1), Some(U256::from(42u64)));
    assert_eq!(storage_at(&interp, 2), Some(U256::from(42u64)));
}

#[test]
fn add_overflow_wraps() {
    let (interp, outcome) =
        run_translated("{ let x := not(0) let y := add(x, 1) sstore(0, y) }");
    assert!(outcome.is_ok());
    assert_eq!(storage_at(&interp, 0), Some(U256::ZERO));
}

#[test]
fn division_by_zero_traps_at_runtime() {
    let (_, outcome) = run_translated("{ let q := div(10, 0) sstore(0, q) }");
    assert_eq!(outcome.unwrap_err(), InterpError::Unreachable);
}

#[test]
fn deferred_builtins_translate_but_trap() {
    // pc has no wasm counterpart; it still translates and traps when hit.
    let (_, outcome) = run_translated("{ let p := pc() sstore(0, p) }");
    assert_eq!(outcome.unwrap_err(), InterpError::Unreachable);
}

#[test]
fn loops_and_conditions_translate() {
    let source = r#"
{
    let total := 0
    for { let i := 0 } lt(i, 5) { i := add(i, 1) } {
        if eq(i, 3) { continue }
        total := add(total, i)
    }
    sstore(0, total)
}
"#;
    let (interp, outcome) = run_translated(source);
    assert!(outcome.is_ok());
    // 0 + 1 + 2 + 4, with 3 skipped.
    assert_eq!(storage_at(&interp, 0), Some(U256::from(7u64)));
}

#[test]
fn switches_lower_to_limb_comparisons() {
    let source = r#"
{
    let x := 2
    switch x
    case 1 { sstore(0, 11) }
    case 2 { sstore(0, 22) }
    default { sstore(0, 33) }
}
"#;
    let (interp, outcome) = run_translated(source);
    assert!(outcome.is_ok());
    assert_eq!(storage_at(&interp, 0), Some(U256::from(22u64)));
}

#[test]
fn memory_round_trip_through_scratch_offset() {
    let source = r#"
{
    mstore(0, 0x112233)
    let v := mload(0)
    sstore(0, v)
}
"#;
    let (interp, outcome) = run_translated(source);
    assert!(outcome.is_ok());
    assert_eq!(storage_at(&interp, 0), Some(U256::from(0x112233u64)));
    // User offset 0 lives at physical offset 64, past the scratch area.
    assert_eq!(interp.state.memory[64..96].iter().filter(|&&b| b != 0).count(), 3);
}

#[test]
fn user_functions_expand_by_four() {
    let source = r#"
{
    function double(x) -> y {
        y := add(x, x)
    }
    sstore(0, double(21))
}
"#;
    let (interp, outcome) = run_translated(source);
    assert!(outcome.is_ok());
    assert_eq!(storage_at(&interp, 0), Some(U256::from(42u64)));
}

#[test]
fn user_bindings_colliding_with_polyfill_names_are_displaced() {
    let source = r#"
{
    function or_bool(a) -> r {
        r := add(a, 1)
    }
    let mload_internal := 5
    sstore(0, or_bool(mload_internal))
}
"#;
    let (interp, outcome) = run_translated(source);
    assert!(outcome.is_ok());
    assert_eq!(storage_at(&interp, 0), Some(U256::from(6u64)));
}

#[test]
fn return_data_flows_through_finish() {
    let source = r#"
{
    mstore(0, 7)
    return(0, 32)
}
"#;
    let (_, outcome) = run_translated(source);
    let CallOutcome::Finished(data) = outcome.unwrap() else {
        panic!("expected a finish outcome");
    };
    assert_eq!(data.len(), 32);
    assert_eq!(U256::from_be_slice(&data), U256::from(7u64));
}

#[test]
fn builtin_closure_holds_in_output() {
    let translated = translate_source(
        r#"
{
    let a := calldataload(0)
    let b := mulmod(a, a, 7)
    sstore(0, b)
    log1(0, 32, b)
}
"#,
    );

    let defined = defined_functions(&translated);
    let wasm = Dialect::wasm64();
    let mut callees = CalleeCollector::default();
    callees.visit_block(&translated.code);
    for callee in &callees.0 {
        assert!(
            defined.contains(callee) || wasm.is_builtin(callee),
            "callee `{callee}` is neither defined nor a target builtin"
        );
    }
}

#[test]
fn missing_polyfill_builtin_is_reported() {
    let object = parse_program("{ sstore(0, sdiv(1, 2)) }").unwrap();
    let err = translate_object(&object).unwrap_err();
    assert!(matches!(err, TranslationError::MissingPolyfill(name) if name == "sdiv"));
}

#[test]
fn subobjects_translate_recursively_and_data_passes_through() {
    let source = r#"
object "root" {
    code {
        let x := 1
    }
    object "child" {
        code {
            sstore(0, 9)
        }
    }
    data "meta" hex"c0ffee"
}
"#;
    let object = parse_object(source).unwrap();
    let translated = translate_object(&object).unwrap();

    assert_eq!(translated.sub_index_by_name, object.sub_index_by_name);
    assert_eq!(translated.subobjects.len(), 2);

    let sasm_data::ObjectMember::Object(child) = &translated.subobjects[0] else {
        panic!("expected translated child object");
    };
    analyze_block(&Dialect::wasm64(), &child.code).expect("child analyzes");
    let mut interp = Interpreter::new(&child.code);
    interp.run_main().unwrap();
    assert_eq!(storage_at(&interp, 0), Some(U256::from(9u64)));

    let sasm_data::ObjectMember::Data(data) = &translated.subobjects[1] else {
        panic!("expected data member");
    };
    assert_eq!(data.contents, vec![0xc0, 0xff, 0xee]);
}

#[test]
fn polyfill_parses_once_per_translator() {
    let object_a = parse_program("{ let x := 0 }").unwrap();
    let object_b = parse_program("{ let y := add(1, 1) pop(y) }").unwrap();

    let mut translator = Translator::new();
    translator.translate(&object_a).unwrap();
    translator.translate(&object_b).unwrap();
    assert_eq!(translator.polyfill_parse_count(), 1);
}

fn defined_functions(object: &Object) -> HashSet<String> {
    object
        .code
        .statements
        .iter()
        .filter_map(|statement| match statement {
            Statement::FunctionDefinition(function) => Some(function.name.clone()),
            _ => None,
        })
        .collect()
}

#[derive(Default)]
struct CalleeCollector(HashSet<String>);

impl Visitor for CalleeCollector {
    fn visit_statement(&mut self, statement: &Statement) {
        if let Statement::Expression(call) = statement {
            self.0.insert(call.name.clone());
        }
        visitor::walk_statement(self, statement);
    }

    fn visit_expression(&mut self, expression: &sasm_data::Expression) {
        if let sasm_data::Expression::FunctionCall(call) = expression {
            self.0.insert(call.name.clone());
        }
        visitor::walk_expression(self, expression);
    }
}
