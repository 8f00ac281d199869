//! The visitor contract: the parser's sole output channel.
//!
//! The parser drives a `ParseVisitor` with semantic events in source order
//! as it commits to each interpretation. Visitors must not fail; anything
//! that needs to signal errors buffers them and surfaces them after the
//! parse returns.

use crate::span::Span;

/// A name occurring in the source. `text` is a subslice of the source
/// buffer (zero-copy); names compare by byte equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identifier<'src> {
    pub text: &'src str,
    pub span: Span,
}

impl<'src> Identifier<'src> {
    pub fn new(text: &'src str, span: Span) -> Self {
        Self { text, span }
    }
}

/// How a variable was introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VarKind {
    Let,
    Var,
    Const,
    Function,
    Class,
    Parameter,
    Catch,
    Import,
}

/// Receiver of the semantic event stream.
///
/// Events arrive in source-syntactic order, with one deliberate exception:
/// a declaration's initializer is visited before the declaration itself, so
/// `let x = x` produces a use of `x` and then its declaration. Scope enter
/// events always get a matching exit, even on error recovery.
pub trait ParseVisitor<'src> {
    fn visit_variable_declaration(&mut self, name: Identifier<'src>, kind: VarKind);
    fn visit_variable_use(&mut self, name: Identifier<'src>);
    fn visit_variable_assignment(&mut self, name: Identifier<'src>);
    fn visit_property_declaration(&mut self, name: Identifier<'src>);
    fn visit_enter_block_scope(&mut self);
    fn visit_exit_block_scope(&mut self);
    fn visit_enter_for_scope(&mut self);
    fn visit_exit_for_scope(&mut self);
    fn visit_enter_class_scope(&mut self);
    fn visit_exit_class_scope(&mut self);
    fn visit_enter_function_scope(&mut self);
    fn visit_enter_named_function_scope(&mut self, name: Identifier<'src>);
    fn visit_exit_function_scope(&mut self);
    fn visit_end_of_module(&mut self);
}

/// One recorded event, as buffered by `BufferingVisitor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'src> {
    VariableDeclaration(Identifier<'src>, VarKind),
    VariableUse(Identifier<'src>),
    VariableAssignment(Identifier<'src>),
    PropertyDeclaration(Identifier<'src>),
    EnterBlockScope,
    ExitBlockScope,
    EnterForScope,
    ExitForScope,
    EnterClassScope,
    ExitClassScope,
    EnterFunctionScope,
    EnterNamedFunctionScope(Identifier<'src>),
    ExitFunctionScope,
    EndOfModule,
}

/// Replay a recorded event sequence into another visitor.
pub fn replay_events<'src, V: ParseVisitor<'src>>(events: &[Event<'src>], v: &mut V) {
    for &event in events {
        match event {
            Event::VariableDeclaration(name, kind) => v.visit_variable_declaration(name, kind),
            Event::VariableUse(name) => v.visit_variable_use(name),
            Event::VariableAssignment(name) => v.visit_variable_assignment(name),
            Event::PropertyDeclaration(name) => v.visit_property_declaration(name),
            Event::EnterBlockScope => v.visit_enter_block_scope(),
            Event::ExitBlockScope => v.visit_exit_block_scope(),
            Event::EnterForScope => v.visit_enter_for_scope(),
            Event::ExitForScope => v.visit_exit_for_scope(),
            Event::EnterClassScope => v.visit_enter_class_scope(),
            Event::ExitClassScope => v.visit_exit_class_scope(),
            Event::EnterFunctionScope => v.visit_enter_function_scope(),
            Event::EnterNamedFunctionScope(name) => v.visit_enter_named_function_scope(name),
            Event::ExitFunctionScope => v.visit_exit_function_scope(),
            Event::EndOfModule => v.visit_end_of_module(),
        }
    }
}

/// Records events for later replay.
///
/// Function bodies nested inside expressions are parsed before the
/// surrounding expression's events may be emitted; the parser buffers their
/// events here and replays them when the tree walk reaches the function in
/// source order.
#[derive(Debug, Default)]
pub struct BufferingVisitor<'src> {
    events: Vec<Event<'src>>,
}

impl<'src> BufferingVisitor<'src> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event<'src>] {
        &self.events
    }

    /// Replay every recorded event into `v`, in order.
    pub fn replay_into<V: ParseVisitor<'src>>(&self, v: &mut V) {
        replay_events(&self.events, v);
    }
}

impl<'src> ParseVisitor<'src> for BufferingVisitor<'src> {
    fn visit_variable_declaration(&mut self, name: Identifier<'src>, kind: VarKind) {
        self.events.push(Event::VariableDeclaration(name, kind));
    }
    fn visit_variable_use(&mut self, name: Identifier<'src>) {
        self.events.push(Event::VariableUse(name));
    }
    fn visit_variable_assignment(&mut self, name: Identifier<'src>) {
        self.events.push(Event::VariableAssignment(name));
    }
    fn visit_property_declaration(&mut self, name: Identifier<'src>) {
        self.events.push(Event::PropertyDeclaration(name));
    }
    fn visit_enter_block_scope(&mut self) {
        self.events.push(Event::EnterBlockScope);
    }
    fn visit_exit_block_scope(&mut self) {
        self.events.push(Event::ExitBlockScope);
    }
    fn visit_enter_for_scope(&mut self) {
        self.events.push(Event::EnterForScope);
    }
    fn visit_exit_for_scope(&mut self) {
        self.events.push(Event::ExitForScope);
    }
    fn visit_enter_class_scope(&mut self) {
        self.events.push(Event::EnterClassScope);
    }
    fn visit_exit_class_scope(&mut self) {
        self.events.push(Event::ExitClassScope);
    }
    fn visit_enter_function_scope(&mut self) {
        self.events.push(Event::EnterFunctionScope);
    }
    fn visit_enter_named_function_scope(&mut self, name: Identifier<'src>) {
        self.events.push(Event::EnterNamedFunctionScope(name));
    }
    fn visit_exit_function_scope(&mut self) {
        self.events.push(Event::ExitFunctionScope);
    }
    fn visit_end_of_module(&mut self) {
        self.events.push(Event::EndOfModule);
    }
}

/// A declaration observed by `SpyVisitor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitedDeclaration<'src> {
    pub name: &'src str,
    pub kind: VarKind,
}

/// Test visitor: records every event name in order, plus structured
/// records for declarations, uses, assignments, properties, and named
/// function scopes.
#[derive(Debug, Default)]
pub struct SpyVisitor<'src> {
    pub visits: Vec<&'static str>,
    pub variable_declarations: Vec<VisitedDeclaration<'src>>,
    pub variable_uses: Vec<&'src str>,
    pub variable_assignments: Vec<&'src str>,
    pub property_declarations: Vec<&'src str>,
    pub enter_named_function_scopes: Vec<&'src str>,
}

impl<'src> SpyVisitor<'src> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<'src> ParseVisitor<'src> for SpyVisitor<'src> {
    fn visit_variable_declaration(&mut self, name: Identifier<'src>, kind: VarKind) {
        self.visits.push("visit_variable_declaration");
        self.variable_declarations.push(VisitedDeclaration {
            name: name.text,
            kind,
        });
    }
    fn visit_variable_use(&mut self, name: Identifier<'src>) {
        self.visits.push("visit_variable_use");
        self.variable_uses.push(name.text);
    }
    fn visit_variable_assignment(&mut self, name: Identifier<'src>) {
        self.visits.push("visit_variable_assignment");
        self.variable_assignments.push(name.text);
    }
    fn visit_property_declaration(&mut self, name: Identifier<'src>) {
        self.visits.push("visit_property_declaration");
        self.property_declarations.push(name.text);
    }
    fn visit_enter_block_scope(&mut self) {
        self.visits.push("visit_enter_block_scope");
    }
    fn visit_exit_block_scope(&mut self) {
        self.visits.push("visit_exit_block_scope");
    }
    fn visit_enter_for_scope(&mut self) {
        self.visits.push("visit_enter_for_scope");
    }
    fn visit_exit_for_scope(&mut self) {
        self.visits.push("visit_exit_for_scope");
    }
    fn visit_enter_class_scope(&mut self) {
        self.visits.push("visit_enter_class_scope");
    }
    fn visit_exit_class_scope(&mut self) {
        self.visits.push("visit_exit_class_scope");
    }
    fn visit_enter_function_scope(&mut self) {
        self.visits.push("visit_enter_function_scope");
    }
    fn visit_enter_named_function_scope(&mut self, name: Identifier<'src>) {
        self.visits.push("visit_enter_named_function_scope");
        self.enter_named_function_scopes.push(name.text);
    }
    fn visit_exit_function_scope(&mut self) {
        self.visits.push("visit_exit_function_scope");
    }
    fn visit_end_of_module(&mut self) {
        self.visits.push("visit_end_of_module");
    }
}
