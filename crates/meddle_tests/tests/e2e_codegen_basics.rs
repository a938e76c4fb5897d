//! Golden MIR listings for the basic lowering paths: literals, locals,
//! casts, arithmetic and calls.

use meddle_tests::compile_named;
use pretty_assertions::assert_eq;

#[test]
fn return_literal() {
    let mir = compile_named("test::() i64 { ret 0; }").unwrap();
    let expected = "\
target :: x86_64 linux system_v

test :: () -> i64 {
entry:
    ret i64 0
}
";
    assert_eq!(mir, expected);
}

#[test]
fn local_variable_and_return() {
    let mir =
        compile_named("test::() i64 { fix x: i64 = 42; ret x; }").unwrap();
    let expected = "\
target :: x86_64 linux system_v

test :: () -> i64 {
    $x := slot i64, align 8

entry:
    store i64 42 -> i64* $x
    %x.val := load i64, i64* $x
    ret i64 %x.val
}
";
    assert_eq!(mir, expected);
}

#[test]
fn parameters_spill_to_slots() {
    let mir =
        compile_named("add::(a: i64, b: i64) i64 { ret a + b; }").unwrap();
    let expected = "\
target :: x86_64 linux system_v

add :: (i64 %a, i64 %b) -> i64 {
    $a := slot i64, align 8
    $b := slot i64, align 8

entry:
    store i64 %a -> i64* $a
    store i64 %b -> i64* $b
    %a.val := load i64, i64* $a
    %b.val := load i64, i64* $b
    %add := add i64 %a.val, i64 %b.val
    ret i64 %add
}
";
    assert_eq!(mir, expected);
}

#[test]
fn truncate_integer() {
    let mir =
        compile_named("test::() { fix x: i32 = cast<i32> 5; }").unwrap();
    let expected = "\
target :: x86_64 linux system_v

test :: () {
    $x := slot i32, align 4

entry:
    %cast.trunc := trunc i64 5 -> i32
    store i32 %cast.trunc -> i32* $x
    ret
}
";
    assert_eq!(mir, expected);
}

#[test]
fn truncate_then_sign_extend() {
    let mir =
        compile_named("test::() { fix x: i64 = cast<i64> cast<i32> 5; }")
            .unwrap();
    let expected = "\
target :: x86_64 linux system_v

test :: () {
    $x := slot i64, align 8

entry:
    %cast.trunc := trunc i64 5 -> i32
    %cast.sext := sext i32 %cast.trunc -> i64
    store i64 %cast.sext -> i64* $x
    ret
}
";
    assert_eq!(mir, expected);
}

#[test]
fn float_truncate_and_extend() {
    let mir =
        compile_named("test::() { fix x: f32 = cast<f32> 3.14; }").unwrap();
    let expected = "\
target :: x86_64 linux system_v

test :: () {
    $x := slot f32, align 4

entry:
    %cast.ftrunc := ftrunc f64 3.14 -> f32
    store f32 %cast.ftrunc -> f32* $x
    ret
}
";
    assert_eq!(mir, expected);
}

#[test]
fn implicit_float_to_int_conversion() {
    let mir = compile_named("test::() { fix x: i64 = 3.14; }").unwrap();
    let expected = "\
target :: x86_64 linux system_v

test :: () {
    $x := slot i64, align 8

entry:
    %cast.cvt := fp2si f64 3.14 -> i64
    store i64 %cast.cvt -> i64* $x
    ret
}
";
    assert_eq!(mir, expected);
}

#[test]
fn string_initialiser_copies_from_data() {
    let mir =
        compile_named(r#"test::() { fix x: char[7] = "hello\n"; }"#).unwrap();
    let expected = "\
target :: x86_64 linux system_v

str :: readonly i8[7] \"hello\\n\\0\", align 1

test :: () {
    $x := slot i8[7], align 1

entry:
    cpy i64 7, i8[7]* @str, align 1 -> i8[7]* $x, align 1
    ret
}
";
    assert_eq!(mir, expected);
}

#[test]
fn direct_call() {
    let mir = compile_named(
        "foo::() i64 { ret 7; } test::() i64 { ret foo(); }",
    )
    .unwrap();
    let expected = "\
target :: x86_64 linux system_v

foo :: () -> i64 {
entry:
    ret i64 7
}

test :: () -> i64 {
entry:
    %call.tmp := call i64 @foo
    ret i64 %call.tmp
}
";
    assert_eq!(mir, expected);
}

#[test]
fn global_variable_data() {
    let mir = compile_named(
        "g :: fix i64 = 42; test::() i64 { ret g; }",
    )
    .unwrap();
    let expected = "\
target :: x86_64 linux system_v

g :: readonly i64 42, align 8

test :: () -> i64 {
entry:
    %g.val := load i64, i64* @g
    ret i64 %g.val
}
";
    assert_eq!(mir, expected);
}

#[test]
fn enum_variant_is_a_constant() {
    let mir = compile_named(
        "Color :: i64 { Red, Green = 5, Blue } test::() i64 { ret Color::Green; }",
    )
    .unwrap();
    assert!(mir.contains("ret i64 5"), "listing was:\n{mir}");
}

#[test]
fn sizeof_folds_to_a_constant() {
    let mir = compile_named(
        "test::() u64 { ret sizeof<i64[4]>; }",
    )
    .unwrap();
    assert!(mir.contains("ret i64 32"), "listing was:\n{mir}");
}

#[test]
fn pointer_roundtrip() {
    let mir = compile_named(
        "test::() i64 { mut x: i64 = 41; mut p: i64* = &x; *p = *p + 1; ret x; }",
    )
    .unwrap();
    assert!(mir.contains("store i64* $x -> i64** $p"));
    assert!(mir.contains("%deref := load i64, i64* %p.val1"));
    assert!(mir.contains("store i64 %add -> i64* %p.val"));
    assert!(mir.contains("%x.val := load i64, i64* $x"));
    assert!(mir.ends_with("    ret i64 %x.val\n}\n"), "listing was:\n{mir}");
}

#[test]
fn syscall_expression() {
    let mir = compile_named(
        "test::() i64 { ret $syscall(60, 0); }",
    )
    .unwrap();
    assert!(
        mir.contains("%syscall := syscall i64 60, i64 0"),
        "listing was:\n{mir}"
    );
    assert!(mir.contains("ret i64 %syscall"), "listing was:\n{mir}");
}
