/*!

# regvm - an EcmaScript regex compiler and bytecode matcher

This crate compiles EcmaScript (aka JavaScript) regular expressions into a
compact, byte-encoded program, and runs that program with a classical
backtracking interpreter.

# Example: finding a match

```rust
use regvm::Regex;
let re = Regex::new(r"(\d{4})-(\d{2})").unwrap();
let text = "released 2021-06, patched 2022-01";
let m = re.find(text).unwrap();
assert_eq!(&text[m.range()], "2021-06");
// Captures are byte ranges into the searched string.
assert_eq!(&text[m.group(2).unwrap()], "06");
```

# Example: all matches, with named groups

```rust
use regvm::Regex;
let re = Regex::with_flags(r"(?<word>[a-z]+)=\k<word>", "i").unwrap();
let text = "x=x ab=AB no=yes";
let words: Vec<_> = re
    .find_iter(text)
    .map(|m| &text[m.named_group("word").unwrap()])
    .collect();
assert_eq!(words, vec!["x", "ab"]);
```

# Example: inspecting the bytecode

```rust
use regvm::Regex;
let re = Regex::with_flags("ab+", "i").unwrap();
print!("{}", re.program());
// Header: marked: 0 loops: 1 flags: 1 constraints: 4
// 0000  MatchCharICase8 'A'
// ...
```

# Example: bounding the work of a search

```rust
use regvm::{MatchError, MatchOptions, Regex};
let re = Regex::new("(a*)*b").unwrap();
let options = MatchOptions { backtrack_limit: Some(1000), depth_limit: None };
let res = re.try_find(&"a".repeat(32), 0, &options);
assert!(matches!(res, Err(MatchError::BudgetExceeded { .. })));
```

# Inputs

Programs run over sequences of code units. `&str` searches use the narrow
(one byte per unit) path when the text is ASCII, and otherwise transcode to
UTF-16 and map offsets back to bytes. `find_utf16` and `find_latin1` search
unit slices directly and report unit offsets.

# Architecture

regvm has a parser producing a syntax tree, a lowering pass to an
intermediate representation, a bytecode emitter, and the backtracking
interpreter. Backtracking uses an explicit stack; only lookarounds recurse.

*/

#![warn(clippy::all)]
#![allow(clippy::upper_case_acronyms, clippy::match_like_matches_macro)]
// Clippy's manual_range_contains suggestion produces worse codegen.
#![allow(clippy::manual_range_contains)]

pub use crate::api::*;
pub use crate::disasm::disassemble;
pub use crate::error::MatchError;
pub use crate::indexing::{InputIndexer, Latin1Input, Utf16Input};
pub use crate::insn::{Constraints, Header, Insn, Opcode, Program};

#[macro_use]
mod util;

mod api;
pub mod ast;
mod charclasses;
mod classicalbacktrack;
mod codepointset;
mod cursor;
mod disasm;
mod emit;
mod error;
mod exec;
mod folds;
mod indexing;
mod insn;
mod ir;
mod matchers;
pub mod parse;
mod scm;
mod startpredicate;
mod types;

// Access to the individual compilation stages, for tooling.
#[doc(hidden)]
pub mod backends {
    pub use crate::emit::emit;
    pub use crate::ir::lower;
    pub use crate::parse::try_parse;
}
