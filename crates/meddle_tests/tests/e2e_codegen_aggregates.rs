//! Aggregates: struct initialisers, arrays, the `AArg`/`ARet` conventions
//! and method calls.

use meddle_tests::compile_named;
use pretty_assertions::assert_eq;

#[test]
fn struct_initialiser_writes_through_ap() {
    let mir = compile_named(
        "Pair { a: i64, b: i64 } \
         test::() i64 { mut p: Pair = Pair { a: 1, b: 2 }; ret p.a; }",
    )
    .unwrap();
    let expected = "\
target :: x86_64 linux system_v

struct Pair { i64, i64 }

test :: () -> i64 {
    $p := slot Pair, align 8

entry:
    %agg.elem := ap i64*, Pair* $p, i64 0
    store i64 1 -> i64* %agg.elem
    %agg.elem1 := ap i64*, Pair* $p, i64 1
    store i64 2 -> i64* %agg.elem1
    %access.ptr := ap i64*, Pair* $p, i64 0
    %a.val := load i64, i64* %access.ptr
    ret i64 %a.val
}
";
    assert_eq!(mir, expected);
}

#[test]
fn array_initialiser_and_subscript() {
    let mir = compile_named(
        "test::() i64 { fix xs: i64[3] = [1, 2, 3]; ret xs[1]; }",
    )
    .unwrap();
    let expected = "\
target :: x86_64 linux system_v

test :: () -> i64 {
    $xs := slot i64[3], align 8

entry:
    %agg.elem := ap i64*, i64[3]* $xs, i64 0
    store i64 1 -> i64* %agg.elem
    %agg.elem1 := ap i64*, i64[3]* $xs, i64 1
    store i64 2 -> i64* %agg.elem1
    %agg.elem2 := ap i64*, i64[3]* $xs, i64 2
    store i64 3 -> i64* %agg.elem2
    %ss.ptr := ap i64*, i64[3]* $xs, i64 1
    %ss.val := load i64, i64* %ss.ptr
    ret i64 %ss.val
}
";
    assert_eq!(mir, expected);
}

#[test]
fn aggregate_parameter_copies_on_entry() {
    let mir =
        compile_named("sum::(xs: i64[4]) i64 { ret xs[0]; }").unwrap();
    let expected = "\
target :: x86_64 linux system_v

sum :: (aarg i64[4]* %xs) -> i64 {
    $xs := slot i64[4], align 8

entry:
    cpy i64 32, i64[4]* %xs, align 8 -> i64[4]* $xs, align 8
    %ss.ptr := ap i64*, i64[4]* $xs, i64 0
    %ss.val := load i64, i64* %ss.ptr
    ret i64 %ss.val
}
";
    assert_eq!(mir, expected);
}

#[test]
fn aggregate_return_threads_an_aret_pointer() {
    let mir = compile_named(
        "make::() i64[2] { ret [1, 2]; } \
         test::() i64 { fix xs: i64[2] = make(); ret xs[1]; }",
    )
    .unwrap();
    let expected = "\
target :: x86_64 linux system_v

make :: (aret i64[2]* %aret.ptr) {
entry:
    %agg.elem := ap i64*, i64[2]* %aret.ptr, i64 0
    store i64 1 -> i64* %agg.elem
    %agg.elem1 := ap i64*, i64[2]* %aret.ptr, i64 1
    store i64 2 -> i64* %agg.elem1
    ret
}

test :: () -> i64 {
    $xs := slot i64[2], align 8

entry:
    call void @make, i64[2]* $xs
    %ss.ptr := ap i64*, i64[2]* $xs, i64 1
    %ss.val := load i64, i64* %ss.ptr
    ret i64 %ss.val
}
";
    assert_eq!(mir, expected);
}

#[test]
fn aggregate_argument_is_cloned_by_the_caller() {
    let mir = compile_named(
        "sum::(xs: i64[2]) i64 { ret xs[0]; } \
         test::() i64 { fix xs: i64[2] = [4, 5]; ret sum(xs); }",
    )
    .unwrap();
    assert!(
        mir.contains("$aarg.tmp := slot i64[2], align 8"),
        "listing was:\n{mir}"
    );
    assert!(
        mir.contains(
            "cpy i64 16, i64[2]* $xs, align 8 -> i64[2]* $aarg.tmp, align 8"
        ),
        "listing was:\n{mir}"
    );
    assert!(
        mir.contains("%call.tmp := call i64 @sum, i64[2]* $aarg.tmp"),
        "listing was:\n{mir}"
    );
}

#[test]
fn method_call_passes_the_receiver() {
    let mir = compile_named(
        "Counter { value: i64, get :: () i64 { ret value; } } \
         test::() i64 { mut c: Counter = Counter { value: 5 }; ret c.get(); }",
    )
    .unwrap();
    // The method mangles through its struct and takes a pointer receiver.
    assert!(
        mir.contains("Counter.get :: (Counter* %self) -> i64 {"),
        "listing was:\n{mir}"
    );
    assert!(
        mir.contains("%call.tmp := call i64 @Counter.get, Counter* $c"),
        "listing was:\n{mir}"
    );
    // The body reaches the field through the spilled receiver pointer.
    assert!(
        mir.contains("store Counter* %self -> Counter** $self"),
        "listing was:\n{mir}"
    );
    assert!(mir.contains("%0 := load Counter*, Counter** $self"));
    assert!(mir.contains("%1 := ap i64*, Counter* %0, i64 0"));
    assert!(mir.contains("%2 := load i64, i64* %1"));
}

#[test]
fn associated_function_takes_no_receiver() {
    let mir = compile_named(
        "Vec2 { x: i64, y: i64, $associated zero :: () i64 { ret 0; } } \
         test::() i64 { ret Vec2::zero(); }",
    )
    .unwrap();
    assert!(
        mir.contains("Vec2.zero :: () -> i64 {"),
        "listing was:\n{mir}"
    );
    assert!(
        mir.contains("%call.tmp := call i64 @Vec2.zero"),
        "listing was:\n{mir}"
    );
}

#[test]
fn field_defaults_fill_missing_initialiser_fields() {
    let mir = compile_named(
        "Point { x: i64, y: i64 = 9 } \
         test::() i64 { mut p: Point = Point { x: 1 }; ret p.y; }",
    )
    .unwrap();
    assert!(
        mir.contains("store i64 9 -> i64* %agg.elem1"),
        "listing was:\n{mir}"
    );
}

#[test]
fn global_aggregate_data() {
    let mir = compile_named(
        "table :: fix i64[3] = [1, 2, 3]; test::() {}",
    )
    .unwrap();
    assert!(
        mir.contains("table :: readonly i64[3] [ i64 1, i64 2, i64 3 ], align 8"),
        "listing was:\n{mir}"
    );
}
