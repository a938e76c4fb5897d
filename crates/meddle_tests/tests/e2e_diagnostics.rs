//! Diagnostics across the error taxonomy: lexical, syntactic, resolution,
//! semantic and lowering failures, each rendered as
//! `<file>:<line>:<col>: error: <message>`.

use meddle_tests::compile_err;

#[test]
fn unknown_character_is_lexical() {
    let err = compile_err("`");
    assert!(err.contains("unknown token"), "error was: {err}");
    assert!(err.starts_with("test.mdl:1:"), "error was: {err}");
}

#[test]
fn bad_escape_is_lexical() {
    let err = compile_err(r"test::() { fix c: char = '\q'; }");
    assert!(err.contains("unknown escape sequence"), "error was: {err}");
}

#[test]
fn missing_semicolon_is_syntactic() {
    let err = compile_err("test::() i64 { ret 0 }");
    assert!(
        err.contains("expected ';' after return statement"),
        "error was: {err}"
    );
}

#[test]
fn empty_template_parameter_list_is_syntactic() {
    let err = compile_err("id<> :: (x: i64) i64 { ret x; }");
    assert!(
        err.contains("template must have at least one parameter"),
        "error was: {err}"
    );
}

#[test]
fn unresolved_reference_is_fatal() {
    let err = compile_err("test::() i64 { ret missing; }");
    assert!(
        err.contains("unresolved reference: missing"),
        "error was: {err}"
    );
}

#[test]
fn unresolved_type_reports_the_spelling_site() {
    let err = compile_err("test::(p: Thing) { }");
    assert!(err.contains("unresolved type: Thing"), "error was: {err}");
}

#[test]
fn duplicate_declaration_is_fatal() {
    let err = compile_err("test::() { } test::() { }");
    assert!(err.contains("redeclaration of 'test'"), "error was: {err}");
}

#[test]
fn shadowing_an_outer_name_is_fatal() {
    let err = compile_err("test::(x: i64) { fix x: i64 = 1; }");
    assert!(
        err.contains("declaration of 'x' shadows an outer declaration"),
        "error was: {err}"
    );
}

#[test]
fn break_outside_a_loop_is_semantic() {
    let err = compile_err("test::() { break; }");
    assert!(err.contains("'break' outside of a loop"), "error was: {err}");
}

#[test]
fn continue_outside_a_loop_is_semantic() {
    let err = compile_err("test::() { continue; }");
    assert!(
        err.contains("'continue' outside of a loop"),
        "error was: {err}"
    );
}

#[test]
fn returning_a_value_from_a_void_function() {
    let err = compile_err("test::() { ret 1; }");
    assert!(
        err.contains("cannot return a value from a void function"),
        "error was: {err}"
    );
}

#[test]
fn type_mismatch_names_both_types() {
    let err = compile_err(
        "P { a: i64 } test::() { fix x: i64 = P { a: 1 }; }",
    );
    assert!(
        err.contains("type mismatch: expected 'i64', found 'P'"),
        "error was: {err}"
    );
}

#[test]
fn invalid_cast_is_fatal() {
    let err =
        compile_err("P { a: i64 } test::(p: P) { fix x: i64 = cast<i64> p; }");
    assert!(
        err.contains("invalid cast from type 'P' to 'i64'"),
        "error was: {err}"
    );
}

#[test]
fn global_initialiser_must_be_constant() {
    let err = compile_err("g :: fix i64 = f(); test::() { }");
    assert!(
        err.contains("global variable must be initialized with a constant"),
        "error was: {err}"
    );
}

#[test]
fn immutable_local_requires_an_initialiser() {
    let err = compile_err("test::() { fix x: i64; }");
    assert!(
        err.contains("immutable variable must be initialized: x"),
        "error was: {err}"
    );
}

#[test]
fn match_patterns_must_be_constant() {
    let err =
        compile_err("test::(x: i64) { match x { x -> { ret; } } }");
    assert!(
        err.contains("'match' pattern must be constant"),
        "error was: {err}"
    );
}

#[test]
fn missing_return_is_a_lowering_error() {
    let err = compile_err("test::() i64 { }");
    assert!(
        err.contains("function does not return a value: test"),
        "error was: {err}"
    );
}

#[test]
fn assignment_requires_an_lvalue() {
    let err = compile_err("test::() { 1 = 2; }");
    assert!(
        err.contains("expression is not assignable"),
        "error was: {err}"
    );
}

#[test]
fn field_access_requires_a_struct() {
    let err = compile_err("test::(x: i64) { fix y: i64 = x.a; }");
    assert!(
        err.contains("field access requires a struct or pointer to struct"),
        "error was: {err}"
    );
}

#[test]
fn unknown_field_names_the_struct() {
    let err = compile_err(
        "P { a: i64 } test::(p: P) { fix y: i64 = p.b; }",
    );
    assert!(
        err.contains("no field 'b' on struct 'P'"),
        "error was: {err}"
    );
}

#[test]
fn wrong_argument_count_is_semantic() {
    let err = compile_err(
        "f::(x: i64) i64 { ret x; } test::() i64 { ret f(1, 2); }",
    );
    assert!(
        err.contains("wrong number of arguments to 'f': expected 1, found 2"),
        "error was: {err}"
    );
}

#[test]
fn method_templates_are_rejected_at_parse() {
    let err = compile_err("S { a: i64, m<T> :: (x: T) T { ret x; } }");
    assert!(
        err.contains("method templates are not supported"),
        "error was: {err}"
    );
}

#[test]
fn enums_cannot_be_templated() {
    let err = compile_err("E<T> :: i64 { A }");
    assert!(
        err.contains("enum cannot be made a template"),
        "error was: {err}"
    );
}
