//! Syntax diagnostics.
//!
//! Diagnostics are data, not control flow: the lexer and parser append
//! `(kind, span)` records to a `DiagList` and keep going. Every diagnostic
//! pins a half-open byte range; zero-width ranges are legal and mark a
//! position (used for missing-semicolon reports).

use crate::span::Span;
use thiserror::Error;

/// The kind of a syntax diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DiagKind {
    #[error("let statement has no bindings")]
    LetWithNoBindings,
    #[error("stray comma in let statement")]
    StrayCommaInLetStatement,
    #[error("invalid binding in let statement")]
    InvalidBindingInLetStatement,
    #[error("missing operand for operator")]
    MissingOperandForOperator,
    #[error("unmatched parenthesis")]
    UnmatchedParenthesis,
    #[error("missing semicolon after expression")]
    MissingSemicolonAfterExpression,
    #[error("unexpected identifier")]
    UnexpectedIdentifier,
    #[error("unclosed block comment")]
    UnclosedBlockComment,
    #[error("unclosed string literal")]
    UnclosedStringLiteral,
    #[error("unclosed template literal")]
    UnclosedTemplate,
    #[error("unclosed regexp literal")]
    UnclosedRegexpLiteral,
}

/// A diagnostic: a kind pinned to a source range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diag {
    pub kind: DiagKind,
    pub span: Span,
}

/// Append-only collection of diagnostics, in emission order.
#[derive(Debug, Default)]
pub struct DiagList {
    diags: Vec<Diag>,
}

impl DiagList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: DiagKind, span: Span) {
        self.diags.push(Diag { kind, span });
    }

    pub fn len(&self) -> usize {
        self.diags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diags.is_empty()
    }

    pub fn as_slice(&self) -> &[Diag] {
        &self.diags
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diag> {
        self.diags.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_stable() {
        assert_eq!(
            DiagKind::LetWithNoBindings.to_string(),
            "let statement has no bindings"
        );
        assert_eq!(
            DiagKind::MissingSemicolonAfterExpression.to_string(),
            "missing semicolon after expression"
        );
    }

    #[test]
    fn list_preserves_emission_order() {
        let mut diags = DiagList::new();
        diags.push(DiagKind::UnmatchedParenthesis, Span::new(9, 10));
        diags.push(DiagKind::UnmatchedParenthesis, Span::new(4, 5));
        let spans: Vec<Span> = diags.iter().map(|d| d.span).collect();
        assert_eq!(spans, [Span::new(9, 10), Span::new(4, 5)]);
    }
}
