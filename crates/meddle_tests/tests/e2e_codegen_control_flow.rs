//! Golden MIR listings for control flow: if/else, until loops, match
//! chains and short-circuit logic.

use meddle_tests::compile_named;
use pretty_assertions::assert_eq;

#[test]
fn if_then_only() {
    let mir = compile_named("test::() { if 1 { ret; } }").unwrap();
    let expected = "\
target :: x86_64 linux system_v

test :: () {
entry:
    brif i64 1, if.then, if.merge

if.then:
    ret

if.merge:
    ret
}
";
    assert_eq!(mir, expected);
}

#[test]
fn if_then_else_drops_unused_merge() {
    let mir =
        compile_named("test::() { if 1 { ret; } else { ret; } }").unwrap();
    let expected = "\
target :: x86_64 linux system_v

test :: () {
entry:
    brif i64 1, if.then, if.else

if.then:
    ret

if.else:
    ret
}
";
    assert_eq!(mir, expected);
}

#[test]
fn else_if_chains_disambiguate_block_names() {
    let mir = compile_named(
        "test::() { if 1 { ret; } else if 2 { ret; } else { ret; } }",
    )
    .unwrap();
    let expected = "\
target :: x86_64 linux system_v

test :: () {
entry:
    brif i64 1, if.then, if.else

if.then:
    ret

if.else:
    brif i64 2, if.then1, if.else1

if.then1:
    ret

if.else1:
    ret
}
";
    assert_eq!(mir, expected);
}

#[test]
fn until_basic() {
    let mir = compile_named("test::() { until 1 { ret; } }").unwrap();
    let expected = "\
target :: x86_64 linux system_v

test :: () {
entry:
    jmp until.cond

until.cond:
    brif i64 1, until.merge, until.body

until.body:
    ret

until.merge:
    ret
}
";
    assert_eq!(mir, expected);
}

#[test]
fn until_continue_jumps_to_cond() {
    let mir = compile_named("test::() { until 1 { continue; } }").unwrap();
    let expected = "\
target :: x86_64 linux system_v

test :: () {
entry:
    jmp until.cond

until.cond:
    brif i64 1, until.merge, until.body

until.body:
    jmp until.cond

until.merge:
    ret
}
";
    assert_eq!(mir, expected);
}

#[test]
fn until_break_jumps_to_merge() {
    let mir = compile_named("test::() { until 1 { break; } }").unwrap();
    let expected = "\
target :: x86_64 linux system_v

test :: () {
entry:
    jmp until.cond

until.cond:
    brif i64 1, until.merge, until.body

until.body:
    jmp until.merge

until.merge:
    ret
}
";
    assert_eq!(mir, expected);
}

#[test]
fn until_with_if_continue_and_break() {
    let mir = compile_named(
        "test::() { until 1 { if 2 { continue; } else break; } }",
    )
    .unwrap();
    let expected = "\
target :: x86_64 linux system_v

test :: () {
entry:
    jmp until.cond

until.cond:
    brif i64 1, until.merge, until.body

until.body:
    brif i64 2, if.then, if.else

if.then:
    jmp until.cond

if.else:
    jmp until.merge

until.merge:
    ret
}
";
    assert_eq!(mir, expected);
}

#[test]
fn until_counts_with_compound_assign() {
    let mir = compile_named(
        "test::() i64 { mut i: i64 = 0; until i == 3 { i += 1; } ret i; }",
    )
    .unwrap();
    let expected = "\
target :: x86_64 linux system_v

test :: () -> i64 {
    $i := slot i64, align 8

entry:
    store i64 0 -> i64* $i
    jmp until.cond

until.cond:
    %i.val := load i64, i64* $i
    %cmp.eq := icmp_eq i64 %i.val, i64 3
    brif i1 %cmp.eq, until.merge, until.body

until.body:
    %i.val1 := load i64, i64* $i
    %add.asn := add i64 %i.val1, i64 1
    store i64 %add.asn -> i64* $i
    jmp until.cond

until.merge:
    %i.val2 := load i64, i64* $i
    ret i64 %i.val2
}
";
    assert_eq!(mir, expected);
}

#[test]
fn match_lowers_to_a_compare_chain() {
    let mir = compile_named(
        "test::(x: i64) i64 { match x { 1 -> { ret 10; }, 2 -> { ret 20; }, _ -> { ret 0; } } }",
    )
    .unwrap();
    let expected = "\
target :: x86_64 linux system_v

test :: (i64 %x) -> i64 {
    $x := slot i64, align 8

entry:
    store i64 %x -> i64* $x
    %x.val := load i64, i64* $x
    jmp match.chain

match.chain:
    %match.cmp := icmp_eq i64 %x.val, i64 1
    brif i1 %match.cmp, match.case, match.chain1

match.case:
    ret i64 10

match.chain1:
    %match.cmp1 := icmp_eq i64 %x.val, i64 2
    brif i1 %match.cmp1, match.case1, match.def

match.case1:
    ret i64 20

match.def:
    ret i64 0
}
";
    assert_eq!(mir, expected);
}

#[test]
fn logical_and_short_circuits_through_a_phi() {
    let mir = compile_named(
        "test::(a: i64, b: i64) bool { ret a && b; }",
    )
    .unwrap();
    let expected = "\
target :: x86_64 linux system_v

test :: (i64 %a, i64 %b) -> i1 {
    $a := slot i64, align 8
    $b := slot i64, align 8

entry:
    store i64 %a -> i64* $a
    store i64 %b -> i64* $b
    %a.val := load i64, i64* $a
    %int.cmp := icmp_ne i64 %a.val, i64 0
    brif i1 %int.cmp, land.rhs, land.merge

land.rhs:
    %b.val := load i64, i64* $b
    %int.cmp1 := icmp_ne i64 %b.val, i64 0
    jmp land.merge

land.merge:
    %land.result := phi i1 [ entry, i1 0 ], [ land.rhs, i1 %int.cmp1 ]
    ret i1 %land.result
}
";
    assert_eq!(mir, expected);
}

#[test]
fn logical_or_short_circuits_through_a_phi() {
    let mir = compile_named(
        "test::(a: i64, b: i64) bool { ret a || b; }",
    )
    .unwrap();
    assert!(
        mir.contains("brif i1 %int.cmp, lor.merge, lor.rhs"),
        "listing was:\n{mir}"
    );
    assert!(
        mir.contains(
            "%lor.result := phi i1 [ entry, i1 1 ], [ lor.rhs, i1 %int.cmp1 ]"
        ),
        "listing was:\n{mir}"
    );
}
