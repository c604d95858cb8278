//! cfg-membership decides whether a string belongs to the language of a
//! context-free grammar.
//!
//! Starting from the start variable, the leftmost variable of each sentential
//! form is rewritten with every one of its productions until the target
//! string appears or the bounded search space runs out. Both a breadth-first
//! and a depth-first search are available; each keeps a visited set and a
//! length bound, so the search terminates even on cyclic grammars.
//!
//! # Example
//!
//! ```rust
//! use cfg_membership::{render_trail, test_membership, GrammarBuilder, Strategy};
//!
//! let grammar = GrammarBuilder::new("S")
//!     .terminals(&["0", "1"])
//!     .add_rule("S", &["0S1", "λ"])
//!     .build()
//!     .unwrap();
//!
//! let result = test_membership(&grammar, "0011", Strategy::BreadthFirst).unwrap();
//! assert!(result.accepted());
//! assert_eq!(
//!     render_trail(result.trail().unwrap()),
//!     "  |- S\n  |- 0S1\n  |- 00S11\n  |- 0011"
//! );
//!
//! let result = test_membership(&grammar, "010", Strategy::DepthFirst).unwrap();
//! assert!(!result.accepted());
//! ```

pub mod derivation;
pub mod grammar;
pub mod notation;
pub mod search;
pub mod symbol;
pub mod utils;

pub use derivation::{DerivationTrail, SententialForm, render_trail};
pub use grammar::{Grammar, GrammarBuilder, Production, RuleEntry, RuleIndex, render_grammar};
pub use search::{
    Membership, MembershipReport, SearchConfig, SearchStats, Strategy, Verdict, test_membership,
    test_membership_with,
};
pub use symbol::{Symbol, SymbolId, SymbolKind, SymbolTable};
pub use utils::{ErrorKind, GrammarError, Result};
