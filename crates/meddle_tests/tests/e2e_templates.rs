//! Template instantiation: on-demand monomorphisation of functions and
//! structs, spec caching, and deterministic emission order.

use meddle_tests::{compile_err, compile_named};
use pretty_assertions::assert_eq;

#[test]
fn template_function_specialises_on_call() {
    let mir = compile_named(
        "id<T> :: (x: T) T { ret x; } \
         test::() i64 { ret id<i64>(7); }",
    )
    .unwrap();
    let expected = "\
target :: x86_64 linux system_v

test :: () -> i64 {
entry:
    %call.tmp := call i64 @id<i64>, i64 7
    ret i64 %call.tmp
}

id<i64> :: (i64 %x) -> i64 {
    $x := slot i64, align 8

entry:
    store i64 %x -> i64* $x
    %x.val := load i64, i64* $x
    ret i64 %x.val
}
";
    assert_eq!(mir, expected);
}

#[test]
fn repeated_instantiation_reuses_the_specialisation() {
    let mir = compile_named(
        "id<T> :: (x: T) T { ret x; } \
         test::() i64 { ret id<i64>(1) + id<i64>(2); }",
    )
    .unwrap();
    // Exactly one `id<i64>` definition.
    let count = mir.matches("id<i64> :: (i64 %x) -> i64 {").count();
    assert_eq!(count, 1, "listing was:\n{mir}");
}

#[test]
fn distinct_arguments_create_distinct_specialisations() {
    let mir = compile_named(
        "id<T> :: (x: T) T { ret x; } \
         test::() i64 { fix a: i32 = id<i32>(cast<i32> 1); ret id<i64>(2); }",
    )
    .unwrap();
    assert!(mir.contains("id<i32> :: (i32 %x) -> i32 {"), "listing was:\n{mir}");
    assert!(mir.contains("id<i64> :: (i64 %x) -> i64 {"), "listing was:\n{mir}");
}

#[test]
fn template_struct_specialises_and_lowers() {
    let mir = compile_named(
        "Box<T> { val: T } \
         test::() i64 { mut b: Box<i64> = Box<i64> { val: 42 }; ret b.val; }",
    )
    .unwrap();
    assert!(
        mir.contains("struct Box<i64> { i64 }"),
        "listing was:\n{mir}"
    );
    assert!(
        mir.contains("$b := slot Box<i64>, align 8"),
        "listing was:\n{mir}"
    );
    assert!(
        mir.contains("store i64 42 -> i64* %agg.elem"),
        "listing was:\n{mir}"
    );
    assert!(
        mir.contains("%val.val := load i64, i64* %access.ptr"),
        "listing was:\n{mir}"
    );
}

#[test]
fn template_struct_methods_specialise_with_the_struct() {
    let mir = compile_named(
        "Box<T> { val: T, get :: () T { ret val; } } \
         test::() i64 { mut b: Box<i64> = Box<i64> { val: 3 }; ret b.get(); }",
    )
    .unwrap();
    assert!(
        mir.contains("Box<i64>.get :: (Box<i64>* %self) -> i64 {"),
        "listing was:\n{mir}"
    );
    assert!(
        mir.contains("%call.tmp := call i64 @Box<i64>.get, Box<i64>* $b"),
        "listing was:\n{mir}"
    );
}

#[test]
fn nested_template_arguments() {
    let mir = compile_named(
        "Box<T> { val: T } \
         test::() { mut b: Box<Box<i64>> = Box<Box<i64>> { val: Box<i64> { val: 1 } }; }",
    )
    .unwrap();
    assert!(
        mir.contains("struct Box<i64> { i64 }"),
        "listing was:\n{mir}"
    );
    assert!(
        mir.contains("struct Box<Box<i64>> { Box<i64> }"),
        "listing was:\n{mir}"
    );
}

#[test]
fn templates_cannot_be_called_without_arguments() {
    let err = compile_err(
        "id<T> :: (x: T) T { ret x; } \
         test::() i64 { ret id(7); }",
    );
    assert!(
        err.contains("missing template arguments for 'id'"),
        "error was: {err}"
    );
}

#[test]
fn wrong_template_arity_is_fatal() {
    let err = compile_err(
        "pair<A, B> :: (a: A, b: B) A { ret a; } \
         test::() i64 { ret pair<i64>(1, 2); }",
    );
    assert!(
        err.contains("wrong number of template arguments for 'pair'"),
        "error was: {err}"
    );
}

#[test]
fn globals_cannot_be_templated() {
    let err = compile_err("g<T> :: fix i64 = 0;");
    assert!(
        err.contains("global variable cannot be made a template"),
        "error was: {err}"
    );
}
