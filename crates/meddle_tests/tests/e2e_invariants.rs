//! Pipeline-level invariants: verifier acceptance of everything the test
//! corpus lowers, sema idempotence, and lex/parse round-trip stability.

use meddle_base::{Options, Session};
use meddle_mir::{lower, print, verify};
use meddle_sema::UnitManager;
use meddle_syntax::{lexer, parser};
use pretty_assertions::assert_eq;

const CORPUS: &[&str] = &[
    "test::() i64 { ret 0; }",
    "test::() i64 { fix x: i64 = 42; ret x; }",
    "test::() { if 1 { ret; } }",
    "test::() { until 1 { if 2 { continue; } else break; } }",
    "test::(a: i64, b: i64) bool { ret a && b || a == b; }",
    "Pair { a: i64, b: i64 } test::() i64 { mut p: Pair = Pair { a: 1, b: 2 }; ret p.b; }",
    "sum::(xs: i64[4]) i64 { ret xs[0] + xs[1]; } test::() i64 { fix xs: i64[4] = [1, 2, 3, 4]; ret sum(xs); }",
    "make::() i64[2] { ret [1, 2]; } test::() i64 { fix xs: i64[2] = make(); ret xs[0]; }",
    "id<T> :: (x: T) T { ret x; } test::() i64 { ret id<i64>(5); }",
    "test::(x: i64) i64 { match x { 1 -> { ret 1; }, _ -> { ret 0; } } }",
];

fn pipeline(source: &str, sema_runs: u32) -> (String, String) {
    let mut sess = Session::new(Options::named());
    let file = sess.sources.add("test.mdl", "/virtual/test.mdl", source);
    let mut units = UnitManager::new();
    let unit = units.create_unit(&sess, file).expect("unit registers");
    let tokens = lexer::lex(&mut sess, file).expect("lexes");
    parser::parse_unit(&mut sess, units.unit_mut(unit), &tokens)
        .expect("parses");
    units.drive(&mut sess).expect("analyses");
    for _ in 1..sema_runs {
        meddle_sema::sema::run(&mut units, &mut sess)
            .expect("sema re-runs cleanly");
    }
    let segment = lower::lower_unit(&units, &sess, unit).expect("lowers");
    let verdict = verify::verify_segment(&segment)
        .map(|_| String::new())
        .unwrap_or_else(|e| e);
    (print::print_segment(&segment), verdict)
}

#[test]
fn every_corpus_program_verifies() {
    for source in CORPUS {
        let (_, verdict) = pipeline(source, 1);
        assert!(verdict.is_empty(), "{source}\nviolation: {verdict}");
    }
}

#[test]
fn sema_is_idempotent() {
    for source in CORPUS {
        let (once, _) = pipeline(source, 1);
        let (twice, _) = pipeline(source, 2);
        assert_eq!(once, twice, "sema changed observable output: {source}");
    }
}

#[test]
fn lexing_is_stable_over_token_text() {
    // Re-lexing the token texts of a declaration yields the same shape.
    let source = "test::(a: i64) i64 { ret a + 1; }";
    let mut sess = Session::new(Options::default());
    let file = sess.sources.add("test.mdl", "/virtual/test.mdl", source);
    let tokens = lexer::lex(&mut sess, file).expect("lexes");

    let mut reconstructed = String::new();
    for token in &tokens {
        let text = match token.kind {
            meddle_syntax::TokenKind::Ident => {
                sess.interner.resolve(token.text).to_string()
            }
            meddle_syntax::TokenKind::Literal => {
                sess.interner.resolve(token.text).to_string()
            }
            meddle_syntax::TokenKind::Eof => continue,
            kind => spell(kind).to_string(),
        };
        reconstructed.push_str(&text);
        reconstructed.push(' ');
    }

    let file2 =
        sess.sources.add("re.mdl", "/virtual/re.mdl", reconstructed.clone());
    let tokens2 = lexer::lex(&mut sess, file2).expect("re-lexes");
    let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
    let kinds2: Vec<_> = tokens2.iter().map(|t| t.kind).collect();
    assert_eq!(kinds, kinds2);
}

fn spell(kind: meddle_syntax::TokenKind) -> &'static str {
    use meddle_syntax::TokenKind::*;
    match kind {
        Plus => "+",
        Path => "::",
        LParen => "(",
        RParen => ")",
        LBrace => "{",
        RBrace => "}",
        Colon => ":",
        Comma => ",",
        Semi => ";",
        _ => "?",
    }
}
