//! Cross-unit `use` resolution: flat, listed and aliased imports, cycle
//! detection, visibility, and external function shells.

use meddle_base::Options;
use meddle_tests::{compile_files, compile_files_at};
use pretty_assertions::assert_eq;

#[test]
fn flat_import_calls_an_external_shell() {
    let listings = compile_files(&[
        ("bar.mdl", "$public bar :: () i64 { ret 42; }"),
        ("foo.mdl", "use \"bar\"; foo :: () i64 { ret bar(); }"),
    ])
    .unwrap();

    let expected_foo = "\
target :: x86_64 linux system_v

foo :: () -> i64 {
entry:
    %call.tmp := call i64 @bar
    ret i64 %call.tmp
}

bar :: () -> i64;
";
    assert_eq!(listings[1], expected_foo);
    assert!(listings[0].contains("bar :: () -> i64 {"));
    assert!(listings[0].contains("ret i64 42"));
}

#[test]
fn listed_import_picks_named_symbols() {
    let listings = compile_files(&[
        (
            "other.mdl",
            "$public foo :: () i64 { ret 0; } $public bar :: () i64 { ret 1; }",
        ),
        (
            "zoo.mdl",
            "use { bar } = \"other\"; zoo :: () i64 { ret bar(); }",
        ),
    ])
    .unwrap();
    assert!(listings[1].contains("call i64 @bar"));
}

#[test]
fn listed_import_does_not_bring_unlisted_names() {
    let err = compile_files(&[
        (
            "other.mdl",
            "$public foo :: () i64 { ret 0; } $public bar :: () i64 { ret 1; }",
        ),
        (
            "zoo.mdl",
            "use { foo } = \"other\"; zoo :: () i64 { ret bar(); }",
        ),
    ])
    .unwrap_err();
    assert!(err.contains("unresolved reference: bar"), "error was: {err}");
}

#[test]
fn private_symbols_do_not_import() {
    let err = compile_files(&[
        ("bar.mdl", "bar :: () i64 { ret 42; }"),
        ("foo.mdl", "use { bar } = \"bar\"; foo :: () i64 { ret bar(); }"),
    ])
    .unwrap_err();
    assert!(
        err.contains("name 'bar' exists, but is not marked public"),
        "error was: {err}"
    );
}

#[test]
fn flat_import_of_private_symbol_is_invisible() {
    let err = compile_files(&[
        ("bar.mdl", "bar :: () i64 { ret 42; }"),
        ("foo.mdl", "use \"bar\"; foo :: () i64 { ret bar(); }"),
    ])
    .unwrap_err();
    assert!(err.contains("unresolved reference: bar"), "error was: {err}");
}

#[test]
fn aliased_import_resolves_through_the_alias() {
    let listings = compile_files(&[
        ("math.mdl", "$public double :: (x: i64) i64 { ret x * 2; }"),
        (
            "main.mdl",
            "use M = \"math\"; main :: () i64 { ret M::double(21); }",
        ),
    ])
    .unwrap();
    assert!(
        listings[1].contains("%call.tmp := call i64 @double, i64 21"),
        "listing was:\n{}",
        listings[1]
    );
}

#[test]
fn aliased_import_does_not_leak_flat_names() {
    let err = compile_files(&[
        ("math.mdl", "$public double :: (x: i64) i64 { ret x * 2; }"),
        (
            "main.mdl",
            "use M = \"math\"; main :: () i64 { ret double(21); }",
        ),
    ])
    .unwrap_err();
    assert!(
        err.contains("unresolved reference: double"),
        "error was: {err}"
    );
}

#[test]
fn imported_struct_types_cross_units() {
    let listings = compile_files(&[
        (
            "geo.mdl",
            "$public Point { x: i64, y: i64 } \
             $public origin :: () Point { ret Point { x: 0, y: 0 }; }",
        ),
        (
            "main.mdl",
            "use \"geo\"; main :: () i64 { mut p: Point = origin(); ret p.x; }",
        ),
    ])
    .unwrap();
    let main = &listings[1];
    assert!(
        main.contains("struct Point { i64, i64 }"),
        "listing was:\n{main}"
    );
    assert!(main.contains("$p := slot Point, align 8"));
    // The imported function is an external shell with the return slot
    // threaded through.
    assert!(main.contains("call void @origin, Point* $p"));
    assert!(main.contains("origin :: (aret Point* %aret.ptr);"));
}

#[test]
fn cyclic_use_is_fatal() {
    let err = compile_files(&[
        ("a.mdl", "use \"b\"; $public fa :: () i64 { ret 0; }"),
        ("b.mdl", "use \"a\"; $public fb :: () i64 { ret 1; }"),
    ])
    .unwrap_err();
    assert!(err.contains("cyclical use"), "error was: {err}");
}

#[test]
fn unresolved_unit_is_fatal() {
    let err = compile_files(&[(
        "a.mdl",
        "use \"missing\"; fa :: () i64 { ret 0; }",
    )])
    .unwrap_err();
    assert!(err.contains("unresolved unit: missing"), "error was: {err}");
}

#[test]
fn on_disk_imports_resolve_relative_to_the_importer() {
    let dir = tempfile::tempdir().expect("temp dir");
    let bar = dir.path().join("bar.mdl");
    let foo = dir.path().join("foo.mdl");
    std::fs::write(&bar, "$public bar :: () i64 { ret 42; }").unwrap();
    std::fs::write(&foo, "use \"bar\"; foo :: () i64 { ret bar(); }")
        .unwrap();

    let listings = compile_files_at(
        dir.path(),
        &[
            ("bar.mdl", "$public bar :: () i64 { ret 42; }"),
            ("foo.mdl", "use \"bar\"; foo :: () i64 { ret bar(); }"),
        ],
        Options::named(),
    )
    .unwrap();
    assert!(listings[1].contains("call i64 @bar"));
}
