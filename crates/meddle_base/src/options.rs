//! Compile options shared by all phases.

/// Options carried through a compiler invocation.
///
/// `named_mir` gives MIR blocks and values mnemonic names (`if.then`,
/// `%x.val`) instead of print-time numbers; the golden test suite relies on
/// it.
#[derive(Clone, Copy, Default, Debug)]
pub struct Options {
    pub named_mir: bool,
    pub debug: bool,
    pub time: bool,
}

impl Options {
    pub fn named() -> Self {
        Self {
            named_mir: true,
            ..Self::default()
        }
    }
}
