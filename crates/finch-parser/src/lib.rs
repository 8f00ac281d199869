//! finch-parser: JavaScript ingestion front end for lint analysis.
//!
//! The parser consumes UTF-8 JavaScript source and produces two outputs: a
//! stream of semantic events (declarations, uses, assignments, property
//! declarations, scope boundaries) delivered to a [`ParseVisitor`], and a
//! list of syntax diagnostics pinned to byte ranges. Downstream passes walk
//! the event stream to perform name-resolution checks; this crate does not
//! resolve names, evaluate code, or build a symbol table.
//!
//! # Design
//!
//! 1. **Events, not trees.** The visitor is the sole output channel. A small
//!    expression tree exists per statement, allocated in a bump arena, only
//!    so the parser can decide late whether `{a: b}` was a literal, a
//!    destructuring pattern, or an arrow parameter list.
//!
//! 2. **Lexing on demand.** The lexer prepares exactly one token at a time,
//!    which enables context-sensitive re-lexing (regexp vs division,
//!    template continuations) and per-token line-terminator tracking for
//!    automatic semicolon insertion.
//!
//! 3. **No failure.** Malformed input produces diagnostics and a finite
//!    event stream with balanced scopes; there is no fatal error path.
//!
//! # Example
//!
//! ```
//! use finch_parser::{Arena, Parser, SpyVisitor};
//!
//! let arena = Arena::new();
//! let mut parser = Parser::new(&arena, "let x = x");
//! let mut visitor = SpyVisitor::new();
//! parser.parse_and_visit_module(&mut visitor);
//!
//! assert_eq!(
//!     visitor.visits,
//!     ["visit_variable_use", "visit_variable_declaration", "visit_end_of_module"],
//! );
//! assert!(parser.errors().is_empty());
//! ```

mod diag;
mod expr;
mod lexer;
mod parser;
mod span;
mod token;
mod visit;

pub use diag::{Diag, DiagKind, DiagList};
pub use expr::Arena;
pub use lexer::Lexer;
pub use parser::Parser;
pub use span::{SourceLocator, Span, SpanLocation};
pub use token::{keyword_from_str, Token, TokenKind};
pub use visit::{
    replay_events, BufferingVisitor, Event, Identifier, ParseVisitor, SpyVisitor, VarKind,
    VisitedDeclaration,
};

/// Parse a whole module into `visitor` and return the diagnostics.
///
/// Expression nodes are allocated in `arena`; the caller may reset it
/// afterwards.
pub fn parse_module<'a, V: ParseVisitor<'a>>(
    arena: &'a Arena,
    source: &'a str,
    visitor: &mut V,
) -> Vec<Diag> {
    let mut parser = Parser::new(arena, source);
    parser.parse_and_visit_module(visitor);
    parser.errors().to_vec()
}
