//! Recursive-descent parser driving the semantic event stream.
//!
//! Statements dispatch on the current token; expressions use precedence
//! climbing over the token table. Expressions are first built as arena
//! trees and then walked to emit events, which lets the parser decide late
//! whether `{a: b}` was an object literal, a destructuring pattern, or an
//! arrow parameter list.
//!
//! The parser never fails: every malformed input produces diagnostics and a
//! finite event stream with balanced scopes. Recovery is local: skip the
//! offending token, synthesize a missing operand, or break at a statement
//! boundary via automatic semicolon insertion.

use crate::diag::{Diag, DiagKind, DiagList};
use crate::expr::{
    declare_parameters, declare_pattern, visit_expression, visit_target_assignments,
    visit_target_uses, Arena, Expr, ExprKind, ObjectEntry, ObjectEntryKind,
};
use crate::lexer::Lexer;
use crate::span::{SourceLocator, Span};
use crate::token::{Token, TokenKind};
use crate::visit::{BufferingVisitor, Identifier, ParseVisitor, VarKind};

/// One parse session over one source buffer.
///
/// The arena backs the expression trees built during the session and must
/// outlive the parser; the caller may reset it once the parser is dropped.
pub struct Parser<'a> {
    arena: &'a Arena,
    source: &'a str,
    lexer: Lexer<'a>,
    locator: SourceLocator,
    diags: DiagList,
    /// End offset of the most recently consumed token; anchors ASI
    /// diagnostics and node spans.
    prev_end: u32,
}

impl<'a> Parser<'a> {
    /// Create a parser over `source`. The locator index is built here with
    /// one scan of the buffer.
    pub fn new(arena: &'a Arena, source: &'a str) -> Self {
        let locator = SourceLocator::new(source);
        let mut diags = DiagList::new();
        let lexer = Lexer::new(source, &mut diags);
        Self {
            arena,
            source,
            lexer,
            locator,
            diags,
            prev_end: 0,
        }
    }

    /// Parse statements until end of file, then emit `end_of_module`.
    pub fn parse_and_visit_module<V: ParseVisitor<'a>>(&mut self, v: &mut V) {
        let _span = tracing::trace_span!("parse_module", len = self.source.len()).entered();
        while self.peek().kind != TokenKind::Eof {
            self.parse_and_visit_statement(v);
        }
        v.visit_end_of_module();
    }

    /// Translate spans to line/column positions.
    pub fn locator(&self) -> &SourceLocator {
        &self.locator
    }

    /// The diagnostics produced so far, in emission order.
    pub fn errors(&self) -> &[Diag] {
        self.diags.as_slice()
    }

    /// True once all input is consumed; `parse_and_visit_statement` is a
    /// no-op from here on. Callers partitioning work statement by statement
    /// check this between calls.
    pub fn at_end_of_file(&self) -> bool {
        self.lexer.peek().kind == TokenKind::Eof
    }

    // =========================================================================
    // Token handling
    // =========================================================================

    fn peek(&self) -> Token {
        self.lexer.peek()
    }

    fn advance(&mut self) {
        self.prev_end = self.lexer.peek().span.end;
        self.lexer.advance(&mut self.diags);
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn text(&self, span: Span) -> &'a str {
        &self.source[span.begin as usize..span.end as usize]
    }

    fn identifier(&self, token: Token) -> Identifier<'a> {
        Identifier::new(self.text(token.span), token.span)
    }

    fn alloc(&self, expr: Expr<'a>) -> &'a Expr<'a> {
        self.arena.alloc_node(expr)
    }

    fn diag(&mut self, kind: DiagKind, span: Span) {
        tracing::debug!(?kind, begin = span.begin, end = span.end, "syntax diagnostic");
        self.diags.push(kind, span);
    }

    /// Satisfy a statement terminator: an explicit `;`, a closing `}`, end
    /// of file, or a token on a new line. Otherwise report a zero-width
    /// missing-semicolon diagnostic at the end of the completed expression
    /// and continue as if one were present.
    fn consume_semicolon(&mut self, end_of_expr: u32) {
        let t = self.peek();
        match t.kind {
            TokenKind::Semicolon => self.advance(),
            TokenKind::RBrace | TokenKind::Eof => {}
            _ if t.has_newline_before => {}
            _ => self.diag(
                DiagKind::MissingSemicolonAfterExpression,
                Span::empty(end_of_expr),
            ),
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// Parse exactly one statement, emitting its events.
    pub fn parse_and_visit_statement<V: ParseVisitor<'a>>(&mut self, v: &mut V) {
        match self.peek().kind {
            TokenKind::Let => self.parse_and_visit_declaration(v, VarKind::Let),
            TokenKind::Var => self.parse_and_visit_declaration(v, VarKind::Var),
            TokenKind::Const => self.parse_and_visit_declaration(v, VarKind::Const),
            TokenKind::Function => self.parse_and_visit_function_declaration(v),
            TokenKind::Async => {
                // `async function f() {}`; a lone `async` prefix otherwise
                // contributes nothing observable.
                self.advance();
                if self.peek().kind == TokenKind::Function {
                    self.parse_and_visit_function_declaration(v);
                } else {
                    self.parse_and_visit_expression_statement(v);
                }
            }
            TokenKind::Class => self.parse_and_visit_class(v),
            TokenKind::Return => {
                self.advance();
                let t = self.peek();
                let has_operand = !matches!(
                    t.kind,
                    TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
                ) && !t.has_newline_before;
                if has_operand {
                    let operand = self.parse_expression(false);
                    visit_expression(&operand, v);
                    self.consume_semicolon(operand.span.end);
                } else {
                    self.eat(TokenKind::Semicolon);
                }
            }
            TokenKind::Throw => {
                self.advance();
                let operand = self.parse_expression(false);
                visit_expression(&operand, v);
                self.consume_semicolon(operand.span.end);
            }
            TokenKind::Import => self.parse_and_visit_import(v),
            TokenKind::Export => self.parse_and_visit_export(v),
            TokenKind::If => {
                self.advance();
                self.eat(TokenKind::LParen);
                let cond = self.parse_expression(false);
                visit_expression(&cond, v);
                self.eat(TokenKind::RParen);
                self.parse_and_visit_statement(v);
                if self.eat(TokenKind::Else) {
                    self.parse_and_visit_statement(v);
                }
            }
            TokenKind::Do => {
                self.advance();
                if self.peek().kind == TokenKind::LBrace {
                    self.parse_and_visit_block(v);
                } else {
                    v.visit_enter_block_scope();
                    self.parse_and_visit_statement(v);
                    v.visit_exit_block_scope();
                }
                if self.eat(TokenKind::While) {
                    self.eat(TokenKind::LParen);
                    let cond = self.parse_expression(false);
                    visit_expression(&cond, v);
                    self.eat(TokenKind::RParen);
                }
                self.eat(TokenKind::Semicolon);
            }
            TokenKind::While => {
                self.advance();
                self.eat(TokenKind::LParen);
                let cond = self.parse_expression(false);
                visit_expression(&cond, v);
                self.eat(TokenKind::RParen);
                self.parse_and_visit_statement(v);
            }
            TokenKind::For => self.parse_and_visit_for(v),
            TokenKind::Try => self.parse_and_visit_try(v),
            TokenKind::Switch => self.parse_and_visit_switch(v),
            TokenKind::LBrace => self.parse_and_visit_block(v),
            TokenKind::Break | TokenKind::Continue => {
                self.advance();
                let t = self.peek();
                if t.kind == TokenKind::Identifier && !t.has_newline_before {
                    self.advance(); // label operand
                }
                self.eat(TokenKind::Semicolon);
            }
            TokenKind::Debugger => {
                self.advance();
                self.eat(TokenKind::Semicolon);
            }
            TokenKind::Semicolon => self.advance(),
            TokenKind::Eof => {}
            _ => self.parse_and_visit_expression_statement(v),
        }
    }

    fn parse_and_visit_expression_statement<V: ParseVisitor<'a>>(&mut self, v: &mut V) {
        let first = self.peek();
        let expr = self.parse_expression(false);
        // Labeled statement: a lone identifier directly followed by `:`.
        // The label is not a variable.
        if matches!(expr.kind, ExprKind::Variable(_)) && self.peek().kind == TokenKind::Colon {
            self.advance();
            self.parse_and_visit_statement(v);
            return;
        }
        if expr.is_missing() && self.peek().span == first.span {
            tracing::debug!(kind = ?first.kind, "skipping token that cannot start a statement");
            self.advance();
            return;
        }
        visit_expression(&expr, v);
        self.consume_semicolon(expr.span.end);
    }

    fn parse_and_visit_block<V: ParseVisitor<'a>>(&mut self, v: &mut V) {
        self.advance(); // {
        v.visit_enter_block_scope();
        while !matches!(self.peek().kind, TokenKind::RBrace | TokenKind::Eof) {
            self.parse_and_visit_statement(v);
        }
        self.eat(TokenKind::RBrace);
        v.visit_exit_block_scope();
    }

    // === Variable declarations ===

    fn is_binding_terminator(kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
        )
    }

    fn parse_and_visit_declaration<V: ParseVisitor<'a>>(&mut self, v: &mut V, kind: VarKind) {
        let keyword_span = self.peek().span;
        self.advance();
        let mut declared_any = false;
        let mut reported_bad_binding = false;
        loop {
            let t = self.peek();
            if t.kind.is_identifier_like()
                || matches!(t.kind, TokenKind::LBrace | TokenKind::LBracket)
            {
                self.parse_and_visit_single_declarator(v, kind, false);
                declared_any = true;
            } else if Self::is_binding_terminator(t.kind) {
                if !declared_any && !reported_bad_binding {
                    self.diag(DiagKind::LetWithNoBindings, keyword_span);
                }
                break;
            } else {
                self.diag(DiagKind::InvalidBindingInLetStatement, t.span);
                reported_bad_binding = true;
                self.advance();
            }

            if self.peek().kind == TokenKind::Comma {
                let comma_span = self.peek().span;
                self.advance();
                if Self::is_binding_terminator(self.peek().kind) {
                    self.diag(DiagKind::StrayCommaInLetStatement, comma_span);
                    break;
                }
            } else {
                break;
            }
        }
        self.consume_semicolon(self.prev_end);
    }

    /// Parse one declarator: a name or destructuring pattern with an
    /// optional initializer. The initializer is visited before the names it
    /// initializes. Returns false if no declarator starts here.
    fn parse_and_visit_single_declarator<V: ParseVisitor<'a>>(
        &mut self,
        v: &mut V,
        kind: VarKind,
        no_in: bool,
    ) -> bool {
        let t = self.peek();
        if t.kind.is_identifier_like() {
            let name = self.identifier(t);
            self.advance();
            if self.eat(TokenKind::Eq) {
                let init = self.parse_assignment(no_in);
                visit_expression(&init, v);
            }
            v.visit_variable_declaration(name, kind);
            true
        } else if matches!(t.kind, TokenKind::LBrace | TokenKind::LBracket) {
            let pattern = self.parse_assignment(no_in);
            if let ExprKind::Assignment { target, rhs } = pattern.kind {
                visit_expression(rhs, v);
                declare_pattern(target, v, kind);
            } else {
                declare_pattern(&pattern, v, kind);
            }
            true
        } else {
            false
        }
    }

    // === Functions ===

    /// Current token is `function`. Declares the name (if any) in the
    /// enclosing scope, then parses parameters and body inside a function
    /// scope.
    fn parse_and_visit_function_declaration<V: ParseVisitor<'a>>(&mut self, v: &mut V) {
        self.advance(); // function
        self.eat(TokenKind::Star);
        let t = self.peek();
        if t.kind.is_identifier_like() {
            let name = self.identifier(t);
            self.advance();
            v.visit_variable_declaration(name, VarKind::Function);
        }
        v.visit_enter_function_scope();
        self.parse_and_visit_parameters_and_body(v);
        v.visit_exit_function_scope();
    }

    /// Parse `(params) { body }`. Parameters declare into the current
    /// (function) scope; default values are visited before the parameter
    /// they guard. The body shares the function scope.
    fn parse_and_visit_parameters_and_body<V: ParseVisitor<'a>>(&mut self, v: &mut V) {
        if self.eat(TokenKind::LParen) {
            loop {
                match self.peek().kind {
                    TokenKind::RParen => {
                        self.advance();
                        break;
                    }
                    TokenKind::Eof => break,
                    TokenKind::Comma => self.advance(),
                    _ => {
                        let before = self.peek().span;
                        let param = self.parse_assignment(false);
                        declare_parameters(&param, v);
                        if param.is_missing() && self.peek().span == before {
                            self.advance();
                        }
                    }
                }
            }
        }
        if self.eat(TokenKind::LBrace) {
            while !matches!(self.peek().kind, TokenKind::RBrace | TokenKind::Eof) {
                self.parse_and_visit_statement(v);
            }
            self.eat(TokenKind::RBrace);
        }
    }

    /// Parse a function expression's scope into a buffer for replay at the
    /// tree-walk position. Current token is `function`.
    fn parse_function_expression(&mut self) -> Expr<'a> {
        let begin = self.peek().span.begin;
        self.advance(); // function
        self.eat(TokenKind::Star);
        let mut buffer = BufferingVisitor::new();
        let t = self.peek();
        if t.kind.is_identifier_like() {
            let name = self.identifier(t);
            self.advance();
            buffer.visit_enter_named_function_scope(name);
        } else {
            buffer.visit_enter_function_scope();
        }
        self.parse_and_visit_parameters_and_body(&mut buffer);
        buffer.visit_exit_function_scope();
        let events = self.arena.alloc_events(buffer.events());
        Expr::new(
            ExprKind::Function { events },
            Span::new(begin, self.prev_end),
        )
    }

    /// Parse a method's function scope into a buffer. Current token is `(`.
    fn parse_method_events(&mut self) -> &'a [crate::visit::Event<'a>] {
        let mut buffer = BufferingVisitor::new();
        buffer.visit_enter_function_scope();
        self.parse_and_visit_parameters_and_body(&mut buffer);
        buffer.visit_exit_function_scope();
        self.arena.alloc_events(buffer.events())
    }

    /// Reinterpret an already-parsed expression as an arrow parameter list
    /// and parse the body. Current token is `=>`.
    fn parse_arrow_body(&mut self, params: Expr<'a>) -> Expr<'a> {
        let begin = params.span.begin;
        self.advance(); // =>
        let mut buffer = BufferingVisitor::new();
        buffer.visit_enter_function_scope();
        declare_parameters(&params, &mut buffer);
        if self.peek().kind == TokenKind::LBrace {
            self.advance();
            while !matches!(self.peek().kind, TokenKind::RBrace | TokenKind::Eof) {
                self.parse_and_visit_statement(&mut buffer);
            }
            self.eat(TokenKind::RBrace);
        } else {
            let body = self.parse_assignment(false);
            visit_expression(&body, &mut buffer);
        }
        buffer.visit_exit_function_scope();
        let events = self.arena.alloc_events(buffer.events());
        Expr::new(ExprKind::Arrow { events }, Span::new(begin, self.prev_end))
    }

    // === Classes ===

    /// Current token is `class`. The `extends` base is visited before the
    /// class name is declared.
    fn parse_and_visit_class<V: ParseVisitor<'a>>(&mut self, v: &mut V) {
        self.advance(); // class
        let mut name = None;
        let t = self.peek();
        if t.kind.is_identifier_like() {
            name = Some(self.identifier(t));
            self.advance();
        }
        if self.eat(TokenKind::Extends) {
            let primary = self.parse_primary(false);
            let base = self.parse_member_chain(primary, true);
            visit_expression(&base, v);
        }
        if let Some(name) = name {
            v.visit_variable_declaration(name, VarKind::Class);
        }
        v.visit_enter_class_scope();
        self.eat(TokenKind::LBrace);
        self.parse_and_visit_class_members(v);
        self.eat(TokenKind::RBrace);
        v.visit_exit_class_scope();
    }

    fn parse_and_visit_class_members<V: ParseVisitor<'a>>(&mut self, v: &mut V) {
        loop {
            let t = self.peek();
            match t.kind {
                TokenKind::RBrace | TokenKind::Eof => break,
                TokenKind::Semicolon | TokenKind::Star => {
                    self.advance();
                }
                TokenKind::LBracket => {
                    // Computed member name: the key is an expression; no
                    // property event is emitted for it.
                    self.advance();
                    let key = self.parse_assignment(false);
                    visit_expression(&key, v);
                    self.eat(TokenKind::RBracket);
                    if self.peek().kind == TokenKind::LParen {
                        v.visit_enter_function_scope();
                        self.parse_and_visit_parameters_and_body(v);
                        v.visit_exit_function_scope();
                    }
                }
                k if k.is_property_name()
                    || matches!(k, TokenKind::String | TokenKind::Number) =>
                {
                    self.advance();
                    let next = self.peek().kind;
                    let is_modifier = matches!(t.kind, TokenKind::Static | TokenKind::Async)
                        && !matches!(next, TokenKind::LParen | TokenKind::Eq)
                        && next != TokenKind::Semicolon
                        && next != TokenKind::RBrace;
                    if is_modifier {
                        continue; // static/async prefix; the member follows
                    }
                    let name = if t.kind.is_property_name() {
                        Some(self.identifier(t))
                    } else {
                        None // string/number key
                    };
                    match self.peek().kind {
                        TokenKind::LParen => {
                            if let Some(name) = name {
                                v.visit_property_declaration(name);
                            }
                            v.visit_enter_function_scope();
                            self.parse_and_visit_parameters_and_body(v);
                            v.visit_exit_function_scope();
                        }
                        TokenKind::Eq => {
                            // Field with initializer.
                            if let Some(name) = name {
                                v.visit_property_declaration(name);
                            }
                            self.advance();
                            let init = self.parse_assignment(false);
                            visit_expression(&init, v);
                            self.eat(TokenKind::Semicolon);
                        }
                        _ => {
                            // Bare field.
                            if let Some(name) = name {
                                v.visit_property_declaration(name);
                            }
                            self.eat(TokenKind::Semicolon);
                        }
                    }
                }
                _ => {
                    tracing::debug!(kind = ?t.kind, "skipping token in class body");
                    self.advance();
                }
            }
        }
    }

    // === Modules ===

    fn parse_and_visit_import<V: ParseVisitor<'a>>(&mut self, v: &mut V) {
        self.advance(); // import
        if self.peek().kind == TokenKind::String {
            // Side-effect import declares nothing.
            self.advance();
            self.eat(TokenKind::Semicolon);
            return;
        }
        let t = self.peek();
        if t.kind.is_identifier_like() {
            let name = self.identifier(t);
            self.advance();
            v.visit_variable_declaration(name, VarKind::Import);
            if self.eat(TokenKind::Comma) {
                self.parse_and_visit_import_bindings(v);
            }
        } else {
            self.parse_and_visit_import_bindings(v);
        }
        if self.eat(TokenKind::From) && self.peek().kind == TokenKind::String {
            self.advance();
        }
        self.eat(TokenKind::Semicolon);
    }

    /// `* as name` or `{ a, b as c }`.
    fn parse_and_visit_import_bindings<V: ParseVisitor<'a>>(&mut self, v: &mut V) {
        match self.peek().kind {
            TokenKind::Star => {
                self.advance();
                if self.eat(TokenKind::As) {
                    let t = self.peek();
                    if t.kind.is_identifier_like() {
                        let name = self.identifier(t);
                        self.advance();
                        v.visit_variable_declaration(name, VarKind::Import);
                    }
                }
            }
            TokenKind::LBrace => {
                self.advance();
                loop {
                    let t = self.peek();
                    match t.kind {
                        TokenKind::RBrace => {
                            self.advance();
                            break;
                        }
                        TokenKind::Eof => break,
                        TokenKind::Comma => self.advance(),
                        k if k.is_property_name() => {
                            self.advance();
                            if self.eat(TokenKind::As) {
                                let local = self.peek();
                                if local.kind.is_identifier_like() {
                                    let name = self.identifier(local);
                                    self.advance();
                                    v.visit_variable_declaration(name, VarKind::Import);
                                }
                            } else if t.kind.is_identifier_like() {
                                v.visit_variable_declaration(self.identifier(t), VarKind::Import);
                            }
                        }
                        _ => self.advance(),
                    }
                }
            }
            _ => {}
        }
    }

    fn parse_and_visit_export<V: ParseVisitor<'a>>(&mut self, v: &mut V) {
        self.advance(); // export
        match self.peek().kind {
            TokenKind::Function => self.parse_and_visit_function_declaration(v),
            TokenKind::Async => {
                self.advance();
                if self.peek().kind == TokenKind::Function {
                    self.parse_and_visit_function_declaration(v);
                }
            }
            TokenKind::Class => self.parse_and_visit_class(v),
            TokenKind::Let => self.parse_and_visit_declaration(v, VarKind::Let),
            TokenKind::Var => self.parse_and_visit_declaration(v, VarKind::Var),
            TokenKind::Const => self.parse_and_visit_declaration(v, VarKind::Const),
            TokenKind::Default => {
                self.advance();
                self.parse_and_visit_expression_statement(v);
            }
            TokenKind::LBrace => {
                // Re-export list: the names are not variable uses here.
                self.advance();
                while !matches!(self.peek().kind, TokenKind::RBrace | TokenKind::Eof) {
                    self.advance();
                }
                self.eat(TokenKind::RBrace);
                if self.eat(TokenKind::From) && self.peek().kind == TokenKind::String {
                    self.advance();
                }
                self.eat(TokenKind::Semicolon);
            }
            TokenKind::Star => {
                self.advance();
                if self.eat(TokenKind::As) && self.peek().kind.is_identifier_like() {
                    self.advance();
                }
                if self.eat(TokenKind::From) && self.peek().kind == TokenKind::String {
                    self.advance();
                }
                self.eat(TokenKind::Semicolon);
            }
            _ => {}
        }
    }

    // === Control flow ===

    fn parse_and_visit_try<V: ParseVisitor<'a>>(&mut self, v: &mut V) {
        self.advance(); // try
        if self.peek().kind == TokenKind::LBrace {
            self.parse_and_visit_block(v);
        }
        if self.eat(TokenKind::Catch) {
            v.visit_enter_block_scope();
            if self.eat(TokenKind::LParen) {
                let t = self.peek();
                if t.kind.is_identifier_like() {
                    let name = self.identifier(t);
                    self.advance();
                    v.visit_variable_declaration(name, VarKind::Catch);
                } else if matches!(t.kind, TokenKind::LBrace | TokenKind::LBracket) {
                    let pattern = self.parse_assignment(false);
                    declare_pattern(&pattern, v, VarKind::Catch);
                }
                self.eat(TokenKind::RParen);
            }
            if self.eat(TokenKind::LBrace) {
                while !matches!(self.peek().kind, TokenKind::RBrace | TokenKind::Eof) {
                    self.parse_and_visit_statement(v);
                }
                self.eat(TokenKind::RBrace);
            }
            v.visit_exit_block_scope();
        }
        if self.eat(TokenKind::Finally) && self.peek().kind == TokenKind::LBrace {
            self.parse_and_visit_block(v);
        }
    }

    fn parse_and_visit_switch<V: ParseVisitor<'a>>(&mut self, v: &mut V) {
        self.advance(); // switch
        self.eat(TokenKind::LParen);
        let discriminant = self.parse_expression(false);
        visit_expression(&discriminant, v);
        self.eat(TokenKind::RParen);
        self.eat(TokenKind::LBrace);
        v.visit_enter_block_scope();
        loop {
            match self.peek().kind {
                TokenKind::Case => {
                    self.advance();
                    let label = self.parse_expression(false);
                    visit_expression(&label, v);
                    self.eat(TokenKind::Colon);
                }
                TokenKind::Default => {
                    self.advance();
                    self.eat(TokenKind::Colon);
                }
                TokenKind::RBrace => {
                    self.advance();
                    break;
                }
                TokenKind::Eof => break,
                _ => self.parse_and_visit_statement(v),
            }
        }
        v.visit_exit_block_scope();
    }

    fn parse_and_visit_for<V: ParseVisitor<'a>>(&mut self, v: &mut V) {
        self.advance(); // for
        self.eat(TokenKind::LParen);
        match self.peek().kind {
            TokenKind::Semicolon => {
                self.advance();
                self.parse_and_visit_c_style_for_rest(v);
            }
            TokenKind::Let | TokenKind::Const | TokenKind::Var => {
                let decl_kind = match self.peek().kind {
                    TokenKind::Let => VarKind::Let,
                    TokenKind::Const => VarKind::Const,
                    _ => VarKind::Var,
                };
                // Declared let/const loop variables live in a for scope;
                // var and bare forms do not.
                let scoped = decl_kind != VarKind::Var;
                if scoped {
                    v.visit_enter_for_scope();
                }
                self.advance();
                self.parse_and_visit_for_after_declaration(v, decl_kind);
                if scoped {
                    v.visit_exit_for_scope();
                }
            }
            _ => {
                let init = self.parse_expression(true);
                match self.peek().kind {
                    TokenKind::In | TokenKind::Of => {
                        self.advance();
                        let iterable = self.parse_expression(false);
                        visit_expression(&iterable, v);
                        visit_target_uses(&init, v);
                        visit_target_assignments(&init, v);
                        self.eat(TokenKind::RParen);
                        self.parse_and_visit_statement(v);
                    }
                    _ => {
                        if !init.is_missing() {
                            visit_expression(&init, v);
                        }
                        self.eat(TokenKind::Semicolon);
                        self.parse_and_visit_c_style_for_rest(v);
                    }
                }
            }
        }
    }

    /// The piece after `for (let`/`const`/`var`: either an `in`/`of` loop
    /// (iterable visited before the binding declares) or the C-style
    /// declarator list.
    fn parse_and_visit_for_after_declaration<V: ParseVisitor<'a>>(
        &mut self,
        v: &mut V,
        decl_kind: VarKind,
    ) {
        let t = self.peek();
        if t.kind.is_identifier_like() {
            let name = self.identifier(t);
            self.advance();
            match self.peek().kind {
                TokenKind::In | TokenKind::Of => {
                    self.advance();
                    let iterable = self.parse_expression(false);
                    visit_expression(&iterable, v);
                    v.visit_variable_declaration(name, decl_kind);
                    self.eat(TokenKind::RParen);
                    self.parse_and_visit_statement(v);
                    return;
                }
                TokenKind::Eq => {
                    self.advance();
                    let init = self.parse_assignment(true);
                    visit_expression(&init, v);
                    v.visit_variable_declaration(name, decl_kind);
                }
                _ => v.visit_variable_declaration(name, decl_kind),
            }
        } else if matches!(t.kind, TokenKind::LBrace | TokenKind::LBracket) {
            let pattern = self.parse_assignment(true);
            match self.peek().kind {
                TokenKind::In | TokenKind::Of => {
                    self.advance();
                    let iterable = self.parse_expression(false);
                    visit_expression(&iterable, v);
                    declare_pattern(&pattern, v, decl_kind);
                    self.eat(TokenKind::RParen);
                    self.parse_and_visit_statement(v);
                    return;
                }
                _ => {
                    if let ExprKind::Assignment { target, rhs } = pattern.kind {
                        visit_expression(rhs, v);
                        declare_pattern(target, v, decl_kind);
                    } else {
                        declare_pattern(&pattern, v, decl_kind);
                    }
                }
            }
        }
        while self.eat(TokenKind::Comma) {
            if !self.parse_and_visit_single_declarator(v, decl_kind, true) {
                break;
            }
        }
        self.eat(TokenKind::Semicolon);
        self.parse_and_visit_c_style_for_rest(v);
    }

    /// Condition and update of a C-style `for`, then the body. The update
    /// expression is parsed in header order but visited after the body.
    fn parse_and_visit_c_style_for_rest<V: ParseVisitor<'a>>(&mut self, v: &mut V) {
        if !matches!(
            self.peek().kind,
            TokenKind::Semicolon | TokenKind::RParen | TokenKind::Eof
        ) {
            let cond = self.parse_expression(false);
            visit_expression(&cond, v);
        }
        self.eat(TokenKind::Semicolon);
        let update = if !matches!(self.peek().kind, TokenKind::RParen | TokenKind::Eof) {
            Some(self.parse_expression(false))
        } else {
            None
        };
        self.eat(TokenKind::RParen);
        self.parse_and_visit_statement(v);
        if let Some(update) = update {
            visit_expression(&update, v);
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Parse one expression and emit its events. No statement terminator is
    /// consumed.
    pub fn parse_and_visit_expression<V: ParseVisitor<'a>>(&mut self, v: &mut V) {
        let expr = self.parse_expression(false);
        visit_expression(&expr, v);
    }

    /// Comma level. `no_in` masks `in`/`of` so `for` headers can detect
    /// them as loop keywords.
    fn parse_expression(&mut self, no_in: bool) -> Expr<'a> {
        let first = self.parse_assignment(no_in);
        if self.peek().kind != TokenKind::Comma {
            return first;
        }
        let mut items = self.arena.expr_list();
        items.push(first);
        while self.eat(TokenKind::Comma) {
            items.push(self.parse_assignment(no_in));
        }
        let span = items[0].span.merge(items[items.len() - 1].span);
        Expr::new(
            ExprKind::Sequence {
                items: items.into_bump_slice(),
            },
            span,
        )
    }

    /// Assignment level, right associative. Also the point where `=>` after
    /// a complete expression turns it into an arrow parameter list.
    fn parse_assignment(&mut self, no_in: bool) -> Expr<'a> {
        if self.peek().kind == TokenKind::Spread {
            let spread_span = self.peek().span;
            self.advance();
            let operand = self.parse_assignment(no_in);
            let span = spread_span.merge(operand.span);
            return Expr::new(
                ExprKind::Spread {
                    operand: self.alloc(operand),
                },
                span,
            );
        }

        let lhs = self.parse_conditional(no_in);
        let t = self.peek();
        match t.kind {
            TokenKind::Arrow if !t.has_newline_before => self.parse_arrow_body(lhs),
            TokenKind::Eq => {
                self.advance();
                let rhs = self.parse_assignment(no_in);
                if rhs.is_missing() {
                    self.diag(DiagKind::MissingOperandForOperator, t.span);
                }
                let span = lhs.span.merge(rhs.span);
                Expr::new(
                    ExprKind::Assignment {
                        target: self.alloc(lhs),
                        rhs: self.alloc(rhs),
                    },
                    span,
                )
            }
            k if k.is_compound_assignment() => {
                self.advance();
                let rhs = self.parse_assignment(no_in);
                if rhs.is_missing() {
                    self.diag(DiagKind::MissingOperandForOperator, t.span);
                }
                let span = lhs.span.merge(rhs.span);
                Expr::new(
                    ExprKind::CompoundAssignment {
                        target: self.alloc(lhs),
                        rhs: self.alloc(rhs),
                    },
                    span,
                )
            }
            _ => lhs,
        }
    }

    fn parse_conditional(&mut self, no_in: bool) -> Expr<'a> {
        let test = self.parse_binary(0, no_in);
        if !self.eat(TokenKind::Question) {
            return test;
        }
        let consequent = self.parse_assignment(false);
        let alternate = if self.eat(TokenKind::Colon) {
            self.parse_assignment(no_in)
        } else {
            Expr::missing(self.peek().span.begin)
        };
        let span = test.span.merge(alternate.span).merge(consequent.span);
        Expr::new(
            ExprKind::Conditional {
                test: self.alloc(test),
                consequent: self.alloc(consequent),
                alternate: self.alloc(alternate),
            },
            span,
        )
    }

    /// Precedence climbing over binary operators. A missing operand is
    /// reported on the operator token and replaced by a placeholder; at
    /// most one report per operator.
    fn parse_binary(&mut self, min_precedence: u8, no_in: bool) -> Expr<'a> {
        let mut lhs = self.parse_unary(no_in);
        loop {
            let t = self.peek();
            let Some(precedence) = t.kind.binary_precedence() else {
                break;
            };
            if no_in && matches!(t.kind, TokenKind::In | TokenKind::Of) {
                break;
            }
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let next_min = if t.kind.is_right_associative() {
                precedence
            } else {
                precedence + 1
            };
            let rhs = self.parse_binary(next_min, no_in);
            if lhs.is_missing() || rhs.is_missing() {
                self.diag(DiagKind::MissingOperandForOperator, t.span);
            }
            let span = lhs.span.merge(rhs.span);
            lhs = Expr::new(
                ExprKind::Binary {
                    left: self.alloc(lhs),
                    right: self.alloc(rhs),
                },
                span,
            );
        }
        lhs
    }

    fn parse_unary(&mut self, no_in: bool) -> Expr<'a> {
        let t = self.peek();
        match t.kind {
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                self.advance();
                let operand = self.parse_unary(no_in);
                if operand.is_missing() {
                    self.diag(DiagKind::MissingOperandForOperator, t.span);
                }
                let span = t.span.merge(operand.span);
                Expr::new(
                    ExprKind::Update {
                        operand: self.alloc(operand),
                        prefix: true,
                    },
                    span,
                )
            }
            TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Bang
            | TokenKind::Tilde
            | TokenKind::Typeof
            | TokenKind::Void
            | TokenKind::Delete => {
                self.advance();
                let operand = self.parse_unary(no_in);
                if operand.is_missing() {
                    self.diag(DiagKind::MissingOperandForOperator, t.span);
                }
                let span = t.span.merge(operand.span);
                Expr::new(
                    ExprKind::Unary {
                        operand: self.alloc(operand),
                    },
                    span,
                )
            }
            TokenKind::Await => {
                self.advance();
                let operand = self.parse_unary(no_in);
                let span = t.span.merge(operand.span);
                Expr::new(
                    ExprKind::Await {
                        operand: self.alloc(operand),
                    },
                    span,
                )
            }
            _ => self.parse_postfix(no_in),
        }
    }

    fn parse_postfix(&mut self, no_in: bool) -> Expr<'a> {
        let primary = self.parse_primary(no_in);
        let expr = self.parse_member_chain(primary, true);
        let t = self.peek();
        // A postfix ++/-- never attaches across a line terminator;
        // `x \n ++ y` is two statements.
        if matches!(t.kind, TokenKind::PlusPlus | TokenKind::MinusMinus)
            && !t.has_newline_before
            && !expr.is_missing()
        {
            self.advance();
            let span = expr.span.merge(t.span);
            return Expr::new(
                ExprKind::Update {
                    operand: self.alloc(expr),
                    prefix: false,
                },
                span,
            );
        }
        expr
    }

    /// `.name`, `[subscript]`, and (when allowed) call suffixes.
    fn parse_member_chain(&mut self, base: Expr<'a>, allow_call: bool) -> Expr<'a> {
        let mut expr = base;
        loop {
            match self.peek().kind {
                TokenKind::Dot => {
                    self.advance();
                    let t = self.peek();
                    if t.kind.is_property_name() {
                        let property = self.identifier(t);
                        self.advance();
                        let span = expr.span.merge(t.span);
                        expr = Expr::new(
                            ExprKind::Dot {
                                object: self.alloc(expr),
                                property,
                            },
                            span,
                        );
                    } else {
                        break;
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let subscript = self.parse_expression(false);
                    self.eat(TokenKind::RBracket);
                    let span = Span::new(expr.span.begin, self.prev_end);
                    expr = Expr::new(
                        ExprKind::Index {
                            object: self.alloc(expr),
                            subscript: self.alloc(subscript),
                        },
                        span,
                    );
                }
                TokenKind::LParen if allow_call => {
                    let args = self.parse_call_arguments();
                    let span = Span::new(expr.span.begin, self.prev_end);
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: self.alloc(expr),
                            args,
                        },
                        span,
                    );
                }
                _ => break,
            }
        }
        expr
    }

    /// Consume `( args )`. An argument list cut off by end of file reports
    /// the opening parenthesis as unmatched.
    fn parse_call_arguments(&mut self) -> &'a [Expr<'a>] {
        let lparen = self.peek().span;
        self.advance(); // (
        let mut args = self.arena.expr_list();
        loop {
            match self.peek().kind {
                TokenKind::RParen => {
                    self.advance();
                    break;
                }
                TokenKind::Eof => {
                    self.diag(DiagKind::UnmatchedParenthesis, lparen);
                    break;
                }
                TokenKind::Comma => self.advance(),
                _ => {
                    let before = self.peek().span;
                    let arg = self.parse_assignment(false);
                    if arg.is_missing() && self.peek().span == before {
                        self.advance();
                    } else {
                        args.push(arg);
                    }
                }
            }
        }
        args.into_bump_slice()
    }

    fn parse_primary(&mut self, no_in: bool) -> Expr<'a> {
        let t = self.peek();
        match t.kind {
            TokenKind::Async => {
                // `async function` expression; otherwise `async` is a name.
                self.advance();
                if self.peek().kind == TokenKind::Function {
                    self.parse_function_expression()
                } else {
                    Expr::new(ExprKind::Variable(self.identifier(t)), t.span)
                }
            }
            k if k.is_identifier_like() => {
                self.advance();
                Expr::new(ExprKind::Variable(self.identifier(t)), t.span)
            }
            TokenKind::Number
            | TokenKind::String
            | TokenKind::TemplateNoSub
            | TokenKind::Null
            | TokenKind::True
            | TokenKind::False => {
                self.advance();
                Expr::new(ExprKind::Literal, t.span)
            }
            TokenKind::Slash | TokenKind::SlashEq => {
                // Operand position: `/` opens a regexp literal.
                self.lexer.reparse_as_regexp(&mut self.diags);
                let regexp = self.peek();
                self.advance();
                Expr::new(ExprKind::Literal, regexp.span)
            }
            TokenKind::This => {
                self.advance();
                Expr::new(ExprKind::This, t.span)
            }
            TokenKind::TemplateHead => self.parse_template(),
            TokenKind::Function => self.parse_function_expression(),
            TokenKind::New => {
                self.advance();
                let callee_primary = self.parse_primary(false);
                let callee = self.parse_member_chain(callee_primary, false);
                let args = if self.peek().kind == TokenKind::LParen {
                    self.parse_call_arguments()
                } else {
                    &[]
                };
                Expr::new(
                    ExprKind::New {
                        callee: self.alloc(callee),
                        args,
                    },
                    Span::new(t.span.begin, self.prev_end),
                )
            }
            TokenKind::LParen => self.parse_paren(),
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_object_literal(),
            _ => Expr::missing(t.span.begin),
        }
    }

    /// `( expression )`, also the cover grammar for arrow parameter lists.
    fn parse_paren(&mut self) -> Expr<'a> {
        let lparen = self.peek().span;
        self.advance();
        if self.peek().kind == TokenKind::RParen {
            self.advance();
            return Expr::new(
                ExprKind::Paren { inner: None },
                Span::new(lparen.begin, self.prev_end),
            );
        }
        let inner = self.parse_expression(false);
        loop {
            match self.peek().kind {
                TokenKind::RParen => {
                    self.advance();
                    break;
                }
                TokenKind::Eof => {
                    self.diag(DiagKind::UnmatchedParenthesis, lparen);
                    break;
                }
                TokenKind::Identifier => {
                    let t = self.peek();
                    self.diag(DiagKind::UnexpectedIdentifier, t.span);
                    self.advance();
                }
                _ => {
                    tracing::debug!("skipping token inside parenthesized expression");
                    self.advance();
                }
            }
        }
        Expr::new(
            ExprKind::Paren {
                inner: Some(self.alloc(inner)),
            },
            Span::new(lparen.begin, self.prev_end),
        )
    }

    /// Template with substitutions: `` `a${e}b${f}c` ``. Each `}` closing a
    /// substitution re-lexes as the next template piece.
    fn parse_template(&mut self) -> Expr<'a> {
        let head = self.peek();
        self.advance();
        let mut substitutions = self.arena.expr_list();
        loop {
            let substitution = self.parse_expression(false);
            substitutions.push(substitution);
            if self.peek().kind != TokenKind::RBrace {
                self.diag(DiagKind::UnclosedTemplate, head.span);
                break;
            }
            self.lexer.next_template_piece(&mut self.diags);
            let piece = self.peek();
            self.advance();
            if piece.kind != TokenKind::TemplateMiddle {
                break; // tail
            }
        }
        Expr::new(
            ExprKind::Template {
                substitutions: substitutions.into_bump_slice(),
            },
            Span::new(head.span.begin, self.prev_end),
        )
    }

    fn parse_array_literal(&mut self) -> Expr<'a> {
        let begin = self.peek().span.begin;
        self.advance(); // [
        let mut elements = self.arena.expr_list();
        loop {
            match self.peek().kind {
                TokenKind::RBracket => {
                    self.advance();
                    break;
                }
                TokenKind::Eof => break,
                TokenKind::Comma => self.advance(), // elision
                _ => {
                    let before = self.peek().span;
                    let element = self.parse_assignment(false);
                    if element.is_missing() && self.peek().span == before {
                        self.advance();
                    } else {
                        elements.push(element);
                    }
                }
            }
        }
        Expr::new(
            ExprKind::Array {
                elements: elements.into_bump_slice(),
            },
            Span::new(begin, self.prev_end),
        )
    }

    fn parse_object_literal(&mut self) -> Expr<'a> {
        let begin = self.peek().span.begin;
        self.advance(); // {
        let mut entries = self.arena.entry_list();
        loop {
            let t = self.peek();
            match t.kind {
                TokenKind::RBrace => {
                    self.advance();
                    break;
                }
                TokenKind::Eof => break,
                TokenKind::Comma => self.advance(),
                TokenKind::Spread => {
                    self.advance();
                    let operand = self.parse_assignment(false);
                    let span = t.span.merge(operand.span);
                    entries.push(ObjectEntry {
                        kind: ObjectEntryKind::Spread {
                            operand: self.alloc(operand),
                        },
                        span,
                    });
                }
                TokenKind::LBracket => {
                    self.advance();
                    let key = self.parse_assignment(false);
                    self.eat(TokenKind::RBracket);
                    if self.eat(TokenKind::Colon) {
                        let value = self.parse_assignment(false);
                        let span = Span::new(t.span.begin, self.prev_end);
                        entries.push(ObjectEntry {
                            kind: ObjectEntryKind::Computed {
                                key: self.alloc(key),
                                value: self.alloc(value),
                            },
                            span,
                        });
                    } else if self.peek().kind == TokenKind::LParen {
                        let events = self.parse_method_events();
                        let span = Span::new(t.span.begin, self.prev_end);
                        entries.push(ObjectEntry {
                            kind: ObjectEntryKind::Method {
                                key: Some(self.alloc(key)),
                                events,
                            },
                            span,
                        });
                    } else {
                        let span = Span::new(t.span.begin, self.prev_end);
                        entries.push(ObjectEntry {
                            kind: ObjectEntryKind::Computed {
                                key: self.alloc(key),
                                value: self.alloc(Expr::missing(self.prev_end)),
                            },
                            span,
                        });
                    }
                }
                k if k.is_property_name()
                    || matches!(k, TokenKind::String | TokenKind::Number) =>
                {
                    self.advance();
                    match self.peek().kind {
                        TokenKind::Colon => {
                            self.advance();
                            let value = self.parse_assignment(false);
                            let span = t.span.merge(value.span);
                            entries.push(ObjectEntry {
                                kind: ObjectEntryKind::Named {
                                    value: self.alloc(value),
                                },
                                span,
                            });
                        }
                        TokenKind::LParen => {
                            let events = self.parse_method_events();
                            let span = Span::new(t.span.begin, self.prev_end);
                            entries.push(ObjectEntry {
                                kind: ObjectEntryKind::Method { key: None, events },
                                span,
                            });
                        }
                        TokenKind::Eq if t.kind.is_identifier_like() => {
                            // Cover form `{name = default}`; only meaningful
                            // once reinterpreted as a pattern.
                            self.advance();
                            let default = self.parse_assignment(false);
                            let span = t.span.merge(default.span);
                            entries.push(ObjectEntry {
                                kind: ObjectEntryKind::Shorthand {
                                    name: self.identifier(t),
                                    default: Some(self.alloc(default)),
                                },
                                span,
                            });
                        }
                        next => {
                            if t.kind == TokenKind::Async && next.is_property_name() {
                                // `async name() {}` method
                                let name_token = self.peek();
                                self.advance();
                                if self.peek().kind == TokenKind::LParen {
                                    let events = self.parse_method_events();
                                    let span = Span::new(name_token.span.begin, self.prev_end);
                                    entries.push(ObjectEntry {
                                        kind: ObjectEntryKind::Method { key: None, events },
                                        span,
                                    });
                                }
                            } else if t.kind.is_identifier_like() {
                                entries.push(ObjectEntry {
                                    kind: ObjectEntryKind::Shorthand {
                                        name: self.identifier(t),
                                        default: None,
                                    },
                                    span: t.span,
                                });
                            }
                            // String/number keys without a value are dropped.
                        }
                    }
                }
                _ => {
                    tracing::debug!(kind = ?t.kind, "skipping token in object literal");
                    self.advance();
                }
            }
        }
        Expr::new(
            ExprKind::Object {
                entries: entries.into_bump_slice(),
            },
            Span::new(begin, self.prev_end),
        )
    }
}
