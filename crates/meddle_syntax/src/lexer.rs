//! Single-pass, non-backtracking lexer.
//!
//! Works directly over the source bytes; meddle tokens are byte-sized, so
//! multi-byte UTF-8 only ever appears inside string literals and comments.
//! Unknown characters and bad escapes are fatal with their location.

use crate::token::{LiteralKind, Token, TokenKind};
use meddle_base::{Diagnostic, FileId, Interner, Result, Session, SourceLoc};

/// Lexes a registered file into a token stream ending in an EOF sentinel.
pub fn lex(sess: &mut Session, file: FileId) -> Result<Vec<Token>> {
    let Session {
        ref sources,
        ref mut interner,
        ..
    } = *sess;
    let contents = &sources.file(file).contents;
    let mut lexer = Lexer::new(contents, file, interner);
    lexer.run()
}

struct Lexer<'a> {
    bytes: &'a [u8],
    pos: usize,
    loc: SourceLoc,
    interner: &'a mut Interner,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, file: FileId, interner: &'a mut Interner) -> Self {
        Self {
            bytes: source.as_bytes(),
            pos: 0,
            loc: SourceLoc::start_of(file),
            interner,
        }
    }

    fn curr(&self) -> u8 {
        self.bytes.get(self.pos).copied().unwrap_or(0)
    }

    fn peek(&self, n: usize) -> u8 {
        self.bytes.get(self.pos + n).copied().unwrap_or(0)
    }

    fn bump(&mut self) {
        if self.curr() == b'\n' {
            self.loc.line += 1;
            self.loc.col = 1;
        } else {
            self.loc.col += 1;
        }
        self.pos += 1;
    }

    fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn err(&self, msg: impl Into<String>, loc: SourceLoc) -> Diagnostic {
        Diagnostic::error(msg, loc)
    }

    fn run(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.at_end() {
                tokens.push(Token::new(TokenKind::Eof, self.loc));
                return Ok(tokens);
            }
            tokens.push(self.next_token()?);
        }
    }

    /// Skips whitespace, newlines and comments.
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.curr() {
                b' ' | b'\t' | b'\r' | b'\n' => self.bump(),
                b'/' if self.peek(1) == b'/' => {
                    while !self.at_end() && self.curr() != b'\n' {
                        self.bump();
                    }
                }
                b'/' if self.peek(1) == b'*' => {
                    let start = self.loc;
                    self.bump_n(2);
                    loop {
                        if self.at_end() {
                            return Err(
                                self.err("unterminated block comment", start)
                            );
                        }
                        if self.curr() == b'*' && self.peek(1) == b'/' {
                            self.bump_n(2);
                            break;
                        }
                        self.bump();
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        let start = self.loc;
        let kind = match self.curr() {
            b'+' => match self.peek(1) {
                b'+' => self.punct(TokenKind::PlusPlus, 2),
                b'=' => self.punct(TokenKind::PlusEq, 2),
                _ => self.punct(TokenKind::Plus, 1),
            },
            b'-' => {
                if self.peek(1).is_ascii_digit() {
                    return self.lex_number(start);
                }
                match self.peek(1) {
                    b'-' => self.punct(TokenKind::MinusMinus, 2),
                    b'=' => self.punct(TokenKind::MinusEq, 2),
                    b'>' => self.punct(TokenKind::Arrow, 2),
                    _ => self.punct(TokenKind::Minus, 1),
                }
            }
            b'*' => match self.peek(1) {
                b'=' => self.punct(TokenKind::StarEq, 2),
                _ => self.punct(TokenKind::Star, 1),
            },
            b'/' => match self.peek(1) {
                b'=' => self.punct(TokenKind::SlashEq, 2),
                _ => self.punct(TokenKind::Slash, 1),
            },
            b'<' => match (self.peek(1), self.peek(2)) {
                (b'<', b'=') => self.punct(TokenKind::ShlEq, 3),
                (b'<', _) => self.punct(TokenKind::Shl, 2),
                (b'=', _) => self.punct(TokenKind::Le, 2),
                _ => self.punct(TokenKind::Lt, 1),
            },
            b'>' => match (self.peek(1), self.peek(2)) {
                (b'>', b'=') => self.punct(TokenKind::ShrEq, 3),
                (b'>', _) => self.punct(TokenKind::Shr, 2),
                (b'=', _) => self.punct(TokenKind::Ge, 2),
                _ => self.punct(TokenKind::Gt, 1),
            },
            b'&' => match self.peek(1) {
                b'&' => self.punct(TokenKind::AmpAmp, 2),
                b'=' => self.punct(TokenKind::AmpEq, 2),
                _ => self.punct(TokenKind::Amp, 1),
            },
            b'|' => match self.peek(1) {
                b'|' => self.punct(TokenKind::PipePipe, 2),
                b'=' => self.punct(TokenKind::PipeEq, 2),
                _ => self.punct(TokenKind::Pipe, 1),
            },
            b'^' => match self.peek(1) {
                b'=' => self.punct(TokenKind::CaretEq, 2),
                _ => self.punct(TokenKind::Caret, 1),
            },
            b'%' => match self.peek(1) {
                b'=' => self.punct(TokenKind::PercentEq, 2),
                _ => self.punct(TokenKind::Percent, 1),
            },
            b'=' => match self.peek(1) {
                b'=' => self.punct(TokenKind::EqEq, 2),
                b'>' => self.punct(TokenKind::FatArrow, 2),
                _ => self.punct(TokenKind::Eq, 1),
            },
            b'!' => match self.peek(1) {
                b'=' => self.punct(TokenKind::BangEq, 2),
                _ => self.punct(TokenKind::Bang, 1),
            },
            b':' => match self.peek(1) {
                b':' => self.punct(TokenKind::Path, 2),
                _ => self.punct(TokenKind::Colon, 1),
            },
            b'.' => match self.peek(1) {
                b'.' => self.punct(TokenKind::DotDot, 2),
                _ => self.punct(TokenKind::Dot, 1),
            },
            b'~' => self.punct(TokenKind::Tilde, 1),
            b'(' => self.punct(TokenKind::LParen, 1),
            b')' => self.punct(TokenKind::RParen, 1),
            b'{' => self.punct(TokenKind::LBrace, 1),
            b'}' => self.punct(TokenKind::RBrace, 1),
            b'[' => self.punct(TokenKind::LBrack, 1),
            b']' => self.punct(TokenKind::RBrack, 1),
            b',' => self.punct(TokenKind::Comma, 1),
            b';' => self.punct(TokenKind::Semi, 1),
            b'?' => self.punct(TokenKind::Question, 1),
            b'@' => self.punct(TokenKind::At, 1),
            b'#' => self.punct(TokenKind::Hash, 1),
            b'$' => self.punct(TokenKind::Dollar, 1),
            b'\'' => return self.lex_char(start),
            b'"' => return self.lex_string(start),
            c if c.is_ascii_digit() => return self.lex_number(start),
            c if c.is_ascii_alphabetic() || c == b'_' => {
                return self.lex_ident(start)
            }
            c => {
                return Err(self.err(
                    format!("unknown token: '{}'", c as char),
                    start,
                ))
            }
        };
        Ok(Token::new(kind, start))
    }

    fn punct(&mut self, kind: TokenKind, len: usize) -> TokenKind {
        self.bump_n(len);
        kind
    }

    fn lex_ident(&mut self, start: SourceLoc) -> Result<Token> {
        let begin = self.pos;
        while self.curr().is_ascii_alphanumeric() || self.curr() == b'_' {
            self.bump();
        }
        let text = std::str::from_utf8(&self.bytes[begin..self.pos])
            .expect("identifier bytes are ASCII");
        let sym = self.interner.intern(text);
        Ok(Token::ident(sym, start))
    }

    /// Integer or float. An optional leading `-` was already checked by the
    /// caller; exactly one `.` followed by a digit makes a float.
    fn lex_number(&mut self, start: SourceLoc) -> Result<Token> {
        let begin = self.pos;
        let mut literal = LiteralKind::Int;
        if self.curr() == b'-' {
            self.bump();
        }
        loop {
            let c = self.curr();
            if c.is_ascii_digit() {
                self.bump();
            } else if c == b'.' {
                if !self.peek(1).is_ascii_digit()
                    || literal == LiteralKind::Float
                {
                    break;
                }
                literal = LiteralKind::Float;
                self.bump();
            } else {
                break;
            }
        }
        let text = std::str::from_utf8(&self.bytes[begin..self.pos])
            .expect("number bytes are ASCII");
        let sym = self.interner.intern(text);
        Ok(Token::literal(literal, sym, start))
    }

    fn escape(&mut self, start: SourceLoc) -> Result<u8> {
        self.bump(); // '\'
        let c = match self.curr() {
            b'0' => 0,
            b'n' => b'\n',
            b't' => b'\t',
            b'r' => b'\r',
            b'b' => 0x08,
            b'f' => 0x0c,
            b'v' => 0x0b,
            b'\\' => b'\\',
            b'\'' => b'\'',
            b'"' => b'"',
            c => {
                return Err(self.err(
                    format!("unknown escape sequence: '\\{}'", c as char),
                    start,
                ))
            }
        };
        self.bump();
        Ok(c)
    }

    fn lex_char(&mut self, start: SourceLoc) -> Result<Token> {
        self.bump(); // opening quote
        if self.at_end() {
            return Err(self.err("unterminated character literal", start));
        }
        let value = if self.curr() == b'\\' {
            self.escape(start)?
        } else {
            let c = self.curr();
            self.bump();
            c
        };
        if self.curr() != b'\'' {
            return Err(self.err("unterminated character literal", start));
        }
        self.bump(); // closing quote
        let buf = [value];
        let text = std::str::from_utf8(&buf).unwrap_or("\u{fffd}");
        let sym = self.interner.intern(text);
        Ok(Token::literal(LiteralKind::Char, sym, start))
    }

    fn lex_string(&mut self, start: SourceLoc) -> Result<Token> {
        self.bump(); // opening quote
        let mut value = Vec::new();
        loop {
            if self.at_end() {
                return Err(self.err("unterminated string literal", start));
            }
            match self.curr() {
                b'"' => {
                    self.bump();
                    break;
                }
                b'\\' => value.push(self.escape(start)?),
                c => {
                    value.push(c);
                    self.bump();
                }
            }
        }
        let text = String::from_utf8_lossy(&value).into_owned();
        let sym = self.interner.intern(&text);
        Ok(Token::literal(LiteralKind::Str, sym, start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meddle_base::Options;

    fn lex_str(src: &str) -> (Session, Vec<Token>) {
        let mut sess = Session::new(Options::default());
        let file = sess.sources.add("test.mdl", "test.mdl", src);
        let toks = lex(&mut sess, file).expect("lexes");
        (sess, toks)
    }

    fn kinds(toks: &[Token]) -> Vec<TokenKind> {
        toks.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_source_is_just_eof() {
        let (_, toks) = lex_str("");
        assert_eq!(kinds(&toks), vec![TokenKind::Eof]);
    }

    #[test]
    fn identifiers_and_punctuation() {
        let (sess, toks) = lex_str("main :: () i64 { ret 0; }");
        assert_eq!(
            kinds(&toks),
            vec![
                TokenKind::Ident,
                TokenKind::Path,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Ident,
                TokenKind::LBrace,
                TokenKind::Ident,
                TokenKind::Literal,
                TokenKind::Semi,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
        assert_eq!(sess.interner.resolve(toks[0].text), "main");
    }

    #[test]
    fn compound_operators() {
        let (_, toks) = lex_str("<<= >>= << >> <= >= == != && || ++ -- ->");
        assert_eq!(
            kinds(&toks),
            vec![
                TokenKind::ShlEq,
                TokenKind::ShrEq,
                TokenKind::Shl,
                TokenKind::Shr,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::EqEq,
                TokenKind::BangEq,
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::Arrow,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn integer_and_float_literals() {
        let (sess, toks) = lex_str("42 -7 3.14 1..2");
        assert_eq!(toks[0].literal, LiteralKind::Int);
        assert_eq!(sess.interner.resolve(toks[0].text), "42");
        assert_eq!(toks[1].literal, LiteralKind::Int);
        assert_eq!(sess.interner.resolve(toks[1].text), "-7");
        assert_eq!(toks[2].literal, LiteralKind::Float);
        assert_eq!(sess.interner.resolve(toks[2].text), "3.14");
        // `1..2` is integer, range, integer.
        assert_eq!(toks[3].literal, LiteralKind::Int);
        assert_eq!(toks[4].kind, TokenKind::DotDot);
        assert_eq!(toks[5].literal, LiteralKind::Int);
    }

    #[test]
    fn char_literals_with_escapes() {
        let (sess, toks) = lex_str(r"'a' '\n' '\\'");
        assert_eq!(sess.interner.resolve(toks[0].text), "a");
        assert_eq!(sess.interner.resolve(toks[1].text), "\n");
        assert_eq!(sess.interner.resolve(toks[2].text), "\\");
    }

    #[test]
    fn string_literal_with_escapes() {
        let (sess, toks) = lex_str(r#""hello\n""#);
        assert_eq!(toks[0].literal, LiteralKind::Str);
        assert_eq!(sess.interner.resolve(toks[0].text), "hello\n");
    }

    #[test]
    fn comments_are_discarded() {
        let (_, toks) = lex_str("a // line\nb /* block\nstill */ c");
        assert_eq!(
            kinds(&toks),
            vec![
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn locations_track_lines_and_columns() {
        let (_, toks) = lex_str("a\n  b");
        assert_eq!((toks[0].loc.line, toks[0].loc.col), (1, 1));
        assert_eq!((toks[1].loc.line, toks[1].loc.col), (2, 3));
    }

    #[test]
    fn unknown_character_is_fatal() {
        let mut sess = Session::new(Options::default());
        let file = sess.sources.add("test.mdl", "test.mdl", "`");
        assert!(lex(&mut sess, file).is_err());
    }

    #[test]
    fn bad_escape_is_fatal() {
        let mut sess = Session::new(Options::default());
        let file = sess.sources.add("test.mdl", "test.mdl", r"'\q'");
        assert!(lex(&mut sess, file).is_err());
    }
}
