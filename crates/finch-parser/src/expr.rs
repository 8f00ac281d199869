//! Arena-allocated expression trees.
//!
//! The parser builds a small expression tree per statement so that it can
//! decide late what a construct means: `{a: b}` is an object literal until a
//! following `=` turns it into a destructuring pattern, and `(a, b)` is a
//! parenthesized sequence until `=>` turns it into a parameter list. Nodes
//! are immutable; the reinterpretations are read-only walks that emit the
//! events of the chosen reading.
//!
//! Children are arena references, never back-pointers, and every node
//! carries its source span. Function-scoped nodes hold their scope's events
//! pre-recorded, so replaying them at the walk position preserves source
//! order.

use crate::span::Span;
use crate::visit::{replay_events, Event, Identifier, ParseVisitor, VarKind};
use bumpalo::Bump;

/// Bump region backing the expression trees of one parse session.
///
/// Nodes live only until the enclosing statement's events have been
/// emitted, so nothing is freed individually: the parser plants nodes,
/// child lists, and buffered scope events here, and the whole region is
/// reclaimed when the caller resets or drops the arena. The arena outlives
/// the parser borrowing it.
pub struct Arena {
    bump: Bump,
}

impl Arena {
    pub fn new() -> Self {
        Self { bump: Bump::new() }
    }

    /// Move a node into the arena, handing back the reference other nodes
    /// store as a child.
    pub(crate) fn alloc_node<'a>(&'a self, expr: Expr<'a>) -> &'a Expr<'a> {
        self.bump.alloc(expr)
    }

    /// Start a list of child expressions: call arguments, array elements,
    /// sequence items, template substitutions.
    pub(crate) fn expr_list<'a>(&'a self) -> bumpalo::collections::Vec<'a, Expr<'a>> {
        bumpalo::collections::Vec::new_in(&self.bump)
    }

    /// Start a list of object literal entries.
    pub(crate) fn entry_list<'a>(&'a self) -> bumpalo::collections::Vec<'a, ObjectEntry<'a>> {
        bumpalo::collections::Vec::new_in(&self.bump)
    }

    /// Persist a buffered function scope's events so the tree walk can
    /// replay them at the function's source position.
    pub(crate) fn alloc_events<'a>(&'a self, events: &[Event<'a>]) -> &'a [Event<'a>] {
        self.bump.alloc_slice_copy(events)
    }

    /// Reclaim every node at once. Requires exclusive access, so no parser
    /// may still be borrowing the arena.
    pub fn reset(&mut self) {
        self.bump.reset();
    }

    /// Bytes claimed by this session's expression trees so far.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }
}

/// An expression node.
#[derive(Debug, Clone, Copy)]
pub struct Expr<'a> {
    pub kind: ExprKind<'a>,
    pub span: Span,
}

impl<'a> Expr<'a> {
    pub fn new(kind: ExprKind<'a>, span: Span) -> Self {
        Self { kind, span }
    }

    /// An error placeholder where an operand was expected.
    pub fn missing(at: u32) -> Self {
        Self::new(ExprKind::Missing, Span::empty(at))
    }

    pub fn is_missing(&self) -> bool {
        matches!(self.kind, ExprKind::Missing)
    }
}

/// Expression kinds.
#[derive(Debug, Clone, Copy)]
pub enum ExprKind<'a> {
    /// Synthesized placeholder for a missing operand.
    Missing,
    /// Number, string, regexp, template-without-substitution, `null`,
    /// `true`, or `false`. Literals produce no events.
    Literal,
    /// `this`. No event.
    This,
    /// An identifier in expression position.
    Variable(Identifier<'a>),
    /// Prefix `+ - ! ~ typeof void delete`.
    Unary { operand: &'a Expr<'a> },
    /// `await expr`.
    Await { operand: &'a Expr<'a> },
    /// `++x`, `x--`, and friends.
    Update { operand: &'a Expr<'a>, prefix: bool },
    /// Any binary operator, including `,`-free sequences like `a + b`.
    Binary { left: &'a Expr<'a>, right: &'a Expr<'a> },
    /// `test ? consequent : alternate`.
    Conditional {
        test: &'a Expr<'a>,
        consequent: &'a Expr<'a>,
        alternate: &'a Expr<'a>,
    },
    /// Comma sequence `a, b, c`.
    Sequence { items: &'a [Expr<'a>] },
    /// `target = rhs`.
    Assignment { target: &'a Expr<'a>, rhs: &'a Expr<'a> },
    /// `target op= rhs`.
    CompoundAssignment { target: &'a Expr<'a>, rhs: &'a Expr<'a> },
    /// `object.property`. The property name is not a variable.
    Dot {
        object: &'a Expr<'a>,
        property: Identifier<'a>,
    },
    /// `object[subscript]`.
    Index {
        object: &'a Expr<'a>,
        subscript: &'a Expr<'a>,
    },
    /// `callee(args...)`.
    Call {
        callee: &'a Expr<'a>,
        args: &'a [Expr<'a>],
    },
    /// `new callee(args...)`.
    New {
        callee: &'a Expr<'a>,
        args: &'a [Expr<'a>],
    },
    /// `[a, b, ...c]`.
    Array { elements: &'a [Expr<'a>] },
    /// `{a: b, [k]: v, c, ...d, m() {}}`.
    Object { entries: &'a [ObjectEntry<'a>] },
    /// `...operand` in call arguments, array literals, and patterns.
    Spread { operand: &'a Expr<'a> },
    /// Parenthesized expression; `inner` is None for `()`.
    Paren { inner: Option<&'a Expr<'a>> },
    /// Function expression; its scope's events are pre-recorded.
    Function { events: &'a [Event<'a>] },
    /// Arrow function; its scope's events are pre-recorded.
    Arrow { events: &'a [Event<'a>] },
    /// Template literal with substitutions.
    Template { substitutions: &'a [Expr<'a>] },
}

/// One entry of an object literal.
#[derive(Debug, Clone, Copy)]
pub struct ObjectEntry<'a> {
    pub kind: ObjectEntryKind<'a>,
    pub span: Span,
}

/// Object literal entry kinds.
#[derive(Debug, Clone, Copy)]
pub enum ObjectEntryKind<'a> {
    /// `key: value`. The key is a fixed name, not a variable.
    Named { value: &'a Expr<'a> },
    /// `[key]: value`.
    Computed {
        key: &'a Expr<'a>,
        value: &'a Expr<'a>,
    },
    /// `name` or the cover form `name = default`.
    Shorthand {
        name: Identifier<'a>,
        default: Option<&'a Expr<'a>>,
    },
    /// `...operand`.
    Spread { operand: &'a Expr<'a> },
    /// Method shorthand `name() {}`; `key` is set for computed names.
    Method {
        key: Option<&'a Expr<'a>>,
        events: &'a [Event<'a>],
    },
}

/// Emit the events of an expression read as a value, in source order.
pub fn visit_expression<'a, V: ParseVisitor<'a>>(expr: &Expr<'a>, v: &mut V) {
    match expr.kind {
        ExprKind::Missing | ExprKind::Literal | ExprKind::This => {}
        ExprKind::Variable(name) => v.visit_variable_use(name),
        ExprKind::Unary { operand }
        | ExprKind::Await { operand }
        | ExprKind::Spread { operand } => visit_expression(operand, v),
        ExprKind::Update { operand, .. } => match target_identifier(operand) {
            Some(name) => {
                v.visit_variable_use(name);
                v.visit_variable_assignment(name);
            }
            None => visit_expression(operand, v),
        },
        ExprKind::Binary { left, right } => {
            visit_expression(left, v);
            visit_expression(right, v);
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            visit_expression(test, v);
            visit_expression(consequent, v);
            visit_expression(alternate, v);
        }
        ExprKind::Sequence { items } => {
            for item in items {
                visit_expression(item, v);
            }
        }
        ExprKind::Assignment { target, rhs } => {
            visit_target_uses(target, v);
            visit_expression(rhs, v);
            visit_target_assignments(target, v);
        }
        ExprKind::CompoundAssignment { target, rhs } => {
            // The target of a compound assignment is read as well as written.
            match target_identifier(target) {
                Some(name) => v.visit_variable_use(name),
                None => visit_target_uses(target, v),
            }
            visit_expression(rhs, v);
            visit_target_assignments(target, v);
        }
        ExprKind::Dot { object, .. } => visit_expression(object, v),
        ExprKind::Index { object, subscript } => {
            visit_expression(object, v);
            visit_expression(subscript, v);
        }
        ExprKind::Call { callee, args } | ExprKind::New { callee, args } => {
            visit_expression(callee, v);
            for arg in args {
                visit_expression(arg, v);
            }
        }
        ExprKind::Array { elements } => {
            for element in elements {
                visit_expression(element, v);
            }
        }
        ExprKind::Object { entries } => {
            for entry in entries {
                match entry.kind {
                    ObjectEntryKind::Named { value } => visit_expression(value, v),
                    ObjectEntryKind::Computed { key, value } => {
                        visit_expression(key, v);
                        visit_expression(value, v);
                    }
                    ObjectEntryKind::Shorthand { name, default } => {
                        v.visit_variable_use(name);
                        if let Some(default) = default {
                            visit_expression(default, v);
                        }
                    }
                    ObjectEntryKind::Spread { operand } => visit_expression(operand, v),
                    ObjectEntryKind::Method { key, events } => {
                        if let Some(key) = key {
                            visit_expression(key, v);
                        }
                        replay_events(events, v);
                    }
                }
            }
        }
        ExprKind::Paren { inner } => {
            if let Some(inner) = inner {
                visit_expression(inner, v);
            }
        }
        ExprKind::Function { events } | ExprKind::Arrow { events } => replay_events(events, v),
        ExprKind::Template { substitutions } => {
            for substitution in substitutions {
                visit_expression(substitution, v);
            }
        }
    }
}

/// The bare identifier behind an assignment target, unwrapping parentheses.
pub fn target_identifier<'a>(expr: &Expr<'a>) -> Option<Identifier<'a>> {
    match expr.kind {
        ExprKind::Variable(name) => Some(name),
        ExprKind::Paren { inner: Some(inner) } => target_identifier(inner),
        _ => None,
    }
}

/// Emit the reads performed by an assignment target before the right-hand
/// side runs: member objects, computed keys, and pattern defaults. Bare
/// identifier targets read nothing; their assignment events come after the
/// right-hand side via [`visit_target_assignments`].
pub fn visit_target_uses<'a, V: ParseVisitor<'a>>(expr: &Expr<'a>, v: &mut V) {
    match expr.kind {
        ExprKind::Missing | ExprKind::Variable(_) => {}
        ExprKind::Paren { inner } => {
            if let Some(inner) = inner {
                visit_target_uses(inner, v);
            }
        }
        ExprKind::Dot { object, .. } => visit_expression(object, v),
        ExprKind::Index { object, subscript } => {
            visit_expression(object, v);
            visit_expression(subscript, v);
        }
        ExprKind::Object { entries } => {
            for entry in entries {
                match entry.kind {
                    ObjectEntryKind::Named { value } => visit_target_uses(value, v),
                    ObjectEntryKind::Computed { key, value } => {
                        visit_expression(key, v);
                        visit_target_uses(value, v);
                    }
                    ObjectEntryKind::Shorthand { default, .. } => {
                        if let Some(default) = default {
                            visit_expression(default, v);
                        }
                    }
                    ObjectEntryKind::Spread { operand } => visit_target_uses(operand, v),
                    ObjectEntryKind::Method { key, events } => {
                        if let Some(key) = key {
                            visit_expression(key, v);
                        }
                        replay_events(events, v);
                    }
                }
            }
        }
        ExprKind::Array { elements } => {
            for element in elements {
                visit_target_uses(element, v);
            }
        }
        ExprKind::Spread { operand } => visit_target_uses(operand, v),
        ExprKind::Assignment { target, rhs } => {
            // Pattern default: `[a = fallback] = xs`.
            visit_target_uses(target, v);
            visit_expression(rhs, v);
        }
        // Not a reinterpretable target; it only produces reads.
        _ => visit_expression(expr, v),
    }
}

/// Emit the assignment events of a target, after its right-hand side.
pub fn visit_target_assignments<'a, V: ParseVisitor<'a>>(expr: &Expr<'a>, v: &mut V) {
    match expr.kind {
        ExprKind::Variable(name) => v.visit_variable_assignment(name),
        ExprKind::Paren { inner: Some(inner) } => visit_target_assignments(inner, v),
        ExprKind::Object { entries } => {
            for entry in entries {
                match entry.kind {
                    ObjectEntryKind::Named { value } => visit_target_assignments(value, v),
                    ObjectEntryKind::Computed { value, .. } => visit_target_assignments(value, v),
                    ObjectEntryKind::Shorthand { name, .. } => v.visit_variable_assignment(name),
                    ObjectEntryKind::Spread { operand } => visit_target_assignments(operand, v),
                    ObjectEntryKind::Method { .. } => {}
                }
            }
        }
        ExprKind::Array { elements } => {
            for element in elements {
                visit_target_assignments(element, v);
            }
        }
        ExprKind::Spread { operand } => visit_target_assignments(operand, v),
        ExprKind::Assignment { target, .. } => visit_target_assignments(target, v),
        _ => {}
    }
}

/// Reinterpret an expression as a function parameter list and emit its
/// declarations: identifiers become parameters, `x = e` becomes a defaulted
/// parameter (default visited first), object/array literals become
/// destructuring parameters, `...x` becomes a rest parameter.
pub fn declare_parameters<'a, V: ParseVisitor<'a>>(expr: &Expr<'a>, v: &mut V) {
    match expr.kind {
        ExprKind::Paren { inner } => {
            if let Some(inner) = inner {
                declare_parameters(inner, v);
            }
        }
        ExprKind::Sequence { items } => {
            for item in items {
                declare_parameters(item, v);
            }
        }
        ExprKind::Variable(name) => v.visit_variable_declaration(name, VarKind::Parameter),
        ExprKind::Assignment { target, rhs } => {
            visit_expression(rhs, v);
            declare_parameters(target, v);
        }
        ExprKind::Object { .. } | ExprKind::Array { .. } => {
            declare_pattern(expr, v, VarKind::Parameter)
        }
        ExprKind::Spread { operand } => declare_parameters(operand, v),
        // An async arrow's parameter list parses as a call to `async`.
        ExprKind::Call { callee, args } => {
            if matches!(callee.kind, ExprKind::Variable(name) if name.text == "async") {
                for arg in args {
                    declare_parameters(arg, v);
                }
            }
        }
        _ => {}
    }
}

/// Reinterpret an expression as a binding pattern, declaring each bound
/// name with the given kind. Defaults and computed keys are visited as
/// uses before the names they guard.
pub fn declare_pattern<'a, V: ParseVisitor<'a>>(expr: &Expr<'a>, v: &mut V, kind: VarKind) {
    match expr.kind {
        ExprKind::Variable(name) => v.visit_variable_declaration(name, kind),
        ExprKind::Paren { inner } => {
            if let Some(inner) = inner {
                declare_pattern(inner, v, kind);
            }
        }
        ExprKind::Object { entries } => {
            for entry in entries {
                match entry.kind {
                    ObjectEntryKind::Named { value } => declare_pattern(value, v, kind),
                    ObjectEntryKind::Computed { key, value } => {
                        visit_expression(key, v);
                        declare_pattern(value, v, kind);
                    }
                    ObjectEntryKind::Shorthand { name, default } => {
                        if let Some(default) = default {
                            visit_expression(default, v);
                        }
                        v.visit_variable_declaration(name, kind);
                    }
                    ObjectEntryKind::Spread { operand } => declare_pattern(operand, v, kind),
                    ObjectEntryKind::Method { .. } => {}
                }
            }
        }
        ExprKind::Array { elements } => {
            for element in elements {
                declare_pattern(element, v, kind);
            }
        }
        ExprKind::Assignment { target, rhs } => {
            visit_expression(rhs, v);
            declare_pattern(target, v, kind);
        }
        ExprKind::Spread { operand } => declare_pattern(operand, v, kind),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    #[test]
    fn nodes_and_child_lists_share_the_session_arena() {
        let arena = Arena::new();
        let name = Identifier::new("x", Span::new(0, 1));
        let operand = arena.alloc_node(Expr::new(ExprKind::Variable(name), Span::new(0, 1)));
        let update = Expr::new(
            ExprKind::Update {
                operand,
                prefix: true,
            },
            Span::new(0, 1),
        );
        let mut items = arena.expr_list();
        items.push(update);
        let items = items.into_bump_slice();
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0].kind, ExprKind::Update { .. }));
    }

    #[test]
    fn buffered_scope_events_survive_in_the_arena() {
        let arena = Arena::new();
        let name = Identifier::new("f", Span::new(0, 1));
        let events = arena.alloc_events(&[
            Event::EnterNamedFunctionScope(name),
            Event::ExitFunctionScope,
        ]);
        assert_eq!(
            events,
            [Event::EnterNamedFunctionScope(name), Event::ExitFunctionScope]
        );
    }

    #[test]
    fn reset_reclaims_the_session() {
        let mut arena = Arena::new();
        arena.alloc_node(Expr::missing(0));
        assert!(arena.allocated_bytes() > 0);
        arena.reset();
    }
}
