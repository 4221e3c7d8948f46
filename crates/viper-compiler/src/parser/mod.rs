//! Recursive-descent parser.
//!
//! Parsing resolves scopes as it goes: assignments and annotations declare
//! variables, `def` and `class` allocate definitions in the pool and insert
//! symbols into the enclosing scope, loop targets become semi-scoped
//! variables. The lowering engine receives a fully scope-resolved program.

pub mod ast;
mod expr;

#[cfg(test)]
mod parser_tests;

use viper_core::{Interner, Name, SourceFile, Span};

use crate::analyze::object_model::ObjectModel;
use crate::analyze::scopes::ScopeStack;
use crate::analyze::symbol_table::Symbol;
use crate::analyze::types::{Signature, TypeInfo};
use crate::diagnostics::CompileError;
use crate::lexer::{Keyword, Token, TokenKind, lex};
use crate::op::Op;
use crate::pool::{
    ClassDef, ClassId, FunctionDef, LexicalScope, Pool, ScopeId, ScopeKind, VarId,
    VarKind, Variable,
};

use ast::{
    Block, Conditional, ExceptClause, ItGroup, ItIdentifier, Operand, Statement,
    StmtKind, TryStmt,
};

/// A fully parsed, scope-resolved program.
#[derive(Debug)]
pub struct Parsed {
    pub statements: Vec<Statement>,
    pub pool: Pool,
    pub interner: Interner,
    pub module_scope: ScopeId,
}

/// Parse one source file.
pub fn parse(source: &SourceFile) -> Result<Parsed, CompileError> {
    let tokens = lex(source.text())?;
    Parser::new(source.text(), tokens).parse_module()
}

pub(crate) struct Parser<'s> {
    text: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    pool: Pool,
    interner: Interner,
    scopes: ScopeStack,
    /// Enclosing definition names, joined for mangled idents.
    ns: Vec<String>,
    /// Innermost enclosing class while parsing its body.
    class_stack: Vec<ClassId>,
}

impl<'s> Parser<'s> {
    fn new(text: &'s str, tokens: Vec<Token>) -> Self {
        Self {
            text,
            tokens,
            pos: 0,
            pool: Pool::new(),
            interner: Interner::new(),
            scopes: ScopeStack::new(),
            ns: Vec::new(),
            class_stack: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // token plumbing

    pub(crate) fn peek(&self) -> Token {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(crate) fn nth(&self, n: usize) -> Token {
        self.tokens[(self.pos + n).min(self.tokens.len() - 1)]
    }

    pub(crate) fn bump(&mut self) -> Token {
        let token = self.peek();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(
        &mut self,
        kind: TokenKind,
        what: &str,
    ) -> Result<Token, CompileError> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(CompileError::syntax(
                self.peek().span,
                format!("expecting {what}"),
            ))
        }
    }

    pub(crate) fn text_of(&self, token: Token) -> &'s str {
        &self.text[token.span.range()]
    }

    pub(crate) fn intern_token(&mut self, token: Token) -> Name {
        let text = &self.text[token.span.range()];
        self.interner.intern(text)
    }

    fn ns_ident(&self, name: &str) -> String {
        if self.ns.is_empty() {
            name.to_owned()
        } else {
            format!("{}_{}", self.ns.join("_"), name)
        }
    }

    // ------------------------------------------------------------------
    // scope plumbing

    fn push_scope(&mut self, kind: ScopeKind) -> ScopeId {
        let id = self.pool.alloc_scope(LexicalScope::new(kind));
        self.scopes.push(id);
        id
    }

    fn pop_scope(&mut self) {
        let id = self.scopes.pop().expect("scope underflow");
        self.pool.scope_mut(id).table.finalize();
    }

    /// Declare a variable in the current scope; a duplicate put is a no-op
    /// and the existing variable is returned.
    fn declare_var(&mut self, name: Name, kind: VarKind, type_info: TypeInfo) -> VarId {
        let scope_id = self.scopes.current();
        let key = self.interner.resolve(name).to_owned();

        if let Some(index) = self.pool.scope(scope_id).table.get(&key) {
            if let Symbol::Variable(id) | Symbol::Global(id) =
                self.pool.scope(scope_id).table.symbol(index)
            {
                return *id;
            }
        }

        let kind = if self.pool.scope(scope_id).kind == ScopeKind::ClosureParent
            && kind != VarKind::SemiScoped
        {
            VarKind::Closure
        } else {
            kind
        };

        let var_id = self.pool.alloc_var(Variable {
            ident: name,
            kind,
            type_info,
            compiled_name: key.clone(),
            closure_offset: 0,
            directly_in_scope: false,
        });
        self.pool
            .scope_mut(scope_id)
            .table
            .put(&key, Symbol::Variable(var_id));
        var_id
    }

    /// Functions defined inside a function capture its locals; the enclosing
    /// scope becomes a closure parent and its variables move into the
    /// context block.
    fn mark_closure_parent(&mut self, scope_id: ScopeId) {
        let scope = self.pool.scope(scope_id);
        if scope.kind != ScopeKind::Function {
            return;
        }
        self.pool.scope_mut(scope_id).kind = ScopeKind::ClosureParent;

        let var_ids: Vec<VarId> = self
            .pool
            .scope(scope_id)
            .table
            .iter()
            .filter_map(|sym| match sym {
                Symbol::Variable(id) => Some(*id),
                _ => None,
            })
            .collect();
        for id in var_ids {
            let var = self.pool.var_mut(id);
            if var.kind != VarKind::SemiScoped {
                var.kind = VarKind::Closure;
            }
        }
    }

    // ------------------------------------------------------------------
    // statements

    fn parse_module(mut self) -> Result<Parsed, CompileError> {
        let module_scope = self.push_scope(ScopeKind::Module);
        let mut statements = Vec::new();

        while !self.at(TokenKind::Eof) {
            if self.eat(TokenKind::Newline) {
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        self.pop_scope();

        Ok(Parsed {
            statements,
            pool: self.pool,
            interner: self.interner,
            module_scope,
        })
    }

    fn parse_statement(&mut self) -> Result<Statement, CompileError> {
        let start = self.peek();
        let kind = match start.kind {
            TokenKind::Keyword(Keyword::If) => self.parse_if()?,
            TokenKind::Keyword(Keyword::While) => self.parse_while()?,
            TokenKind::Keyword(Keyword::For) => self.parse_for()?,
            TokenKind::Keyword(Keyword::Try) => self.parse_try()?,
            TokenKind::Keyword(Keyword::Assert) => {
                self.bump();
                let value = self.parse_expression()?;
                self.expect(TokenKind::Newline, "end of line after assert")?;
                StmtKind::Assert(value)
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.bump();
                let value = if self.at(TokenKind::Newline) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect(TokenKind::Newline, "end of line after return")?;
                StmtKind::Return(value)
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.bump();
                self.expect(TokenKind::Newline, "end of line after break")?;
                StmtKind::Break
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.bump();
                self.expect(TokenKind::Newline, "end of line after continue")?;
                StmtKind::Continue
            }
            TokenKind::Keyword(Keyword::Pass) => {
                self.bump();
                self.expect(TokenKind::Newline, "end of line after pass")?;
                StmtKind::NoOp
            }
            TokenKind::Keyword(Keyword::Def) => self.parse_def()?,
            TokenKind::Keyword(Keyword::Class) => self.parse_class()?,
            TokenKind::Keyword(Keyword::Import) | TokenKind::Keyword(Keyword::From) => {
                // recognized so lowering can reject it with a clear message
                while !self.at(TokenKind::Newline) && !self.at(TokenKind::Eof) {
                    self.bump();
                }
                self.eat(TokenKind::Newline);
                StmtKind::Import
            }
            TokenKind::Keyword(Keyword::With) => self.parse_with()?,
            TokenKind::Keyword(
                kw @ (Keyword::Del
                | Keyword::Raise
                | Keyword::Global
                | Keyword::Nonlocal
                | Keyword::Yield
                | Keyword::Lambda),
            ) => {
                return Err(CompileError::syntax(
                    start.span,
                    format!("`{kw:?}` statements are not part of the language subset")
                        .to_lowercase(),
                ));
            }
            TokenKind::Ident if self.nth(1).kind == TokenKind::Colon => {
                self.parse_annotation()?
            }
            _ => self.parse_expression_statement()?,
        };

        let end = self.tokens[self.pos.saturating_sub(1)].span;
        Ok(Statement {
            kind,
            span: start.span.cover(end),
        })
    }

    /// Expression statement or assignment.
    fn parse_expression_statement(&mut self) -> Result<StmtKind, CompileError> {
        let target = self.parse_expression()?;

        let op = match self.peek().kind {
            TokenKind::Op(op) if op.is_assignment() => {
                self.bump();
                op
            }
            _ => {
                self.expect(TokenKind::Newline, "end of statement")?;
                return Ok(StmtKind::Expr(target));
            }
        };

        let value = self.parse_expression()?;
        self.expect(TokenKind::Newline, "end of assignment")?;

        if target.operations.is_empty() {
            let ident = match target.operands.first() {
                Some(Operand::Token(token)) if token.kind == TokenKind::Ident => *token,
                _ => {
                    return Err(CompileError::syntax(
                        target.span(),
                        "cannot assign to this expression",
                    ));
                }
            };
            if op == Op::Assign {
                let name = self.intern_token(ident);
                self.declare_var(name, VarKind::Regular, TypeInfo::Untyped);
            }
        }

        Ok(StmtKind::Assignment { target, op, value })
    }

    /// `name: type` / `name: type = value` outside class bodies.
    fn parse_annotation(&mut self) -> Result<StmtKind, CompileError> {
        let ident = self.expect(TokenKind::Ident, "an identifier")?;
        let name = self.intern_token(ident);
        self.expect(TokenKind::Colon, "`:`")?;
        let type_info = self.parse_type()?;

        let initial = if self.eat(TokenKind::Op(Op::Assign)) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(TokenKind::Newline, "end of annotation")?;

        let var_id = self.declare_var(name, VarKind::Regular, type_info.clone());
        let var = self.pool.var_mut(var_id);
        if var.type_info.is_untyped() {
            var.type_info = type_info;
        } else if !var.type_info.compatible(&type_info) {
            return Err(CompileError::type_error(
                ident.span,
                format!(
                    "`{}` annotated as `{}` but already has type `{}`",
                    self.interner.resolve(name),
                    type_info.describe(),
                    self.pool.var(var_id).type_info.describe(),
                ),
            ));
        }

        Ok(StmtKind::Annotation { name, initial })
    }

    /// `: NEWLINE INDENT stmt+ DEDENT`
    fn parse_block(&mut self) -> Result<Block, CompileError> {
        self.expect(TokenKind::Colon, "`:`")?;
        self.expect(TokenKind::Newline, "a newline before an indented block")?;
        self.expect(TokenKind::BlockBegin, "an indented block")?;

        let mut stmts = Vec::new();
        while !self.at(TokenKind::BlockEnd) && !self.at(TokenKind::Eof) {
            if self.eat(TokenKind::Newline) {
                continue;
            }
            stmts.push(self.parse_statement()?);
        }
        self.expect(TokenKind::BlockEnd, "end of block")?;
        Ok(Block { stmts })
    }

    fn parse_if(&mut self) -> Result<StmtKind, CompileError> {
        self.bump(); // if
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;

        let mut elifs = Vec::new();
        while self.at(TokenKind::Keyword(Keyword::Elif)) {
            self.bump();
            let elif_condition = self.parse_expression()?;
            let elif_body = self.parse_block()?;
            elifs.push((elif_condition, elif_body));
        }

        let else_body = if self.at(TokenKind::Keyword(Keyword::Else)) {
            self.bump();
            self.parse_block()?
        } else {
            Block::default()
        };

        Ok(StmtKind::If(Conditional {
            condition,
            body,
            elifs,
            else_body,
        }))
    }

    fn parse_while(&mut self) -> Result<StmtKind, CompileError> {
        self.bump(); // while
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(StmtKind::While { condition, body })
    }

    fn parse_for(&mut self) -> Result<StmtKind, CompileError> {
        self.bump(); // for
        let it = self.parse_it_group()?;
        self.expect(TokenKind::Keyword(Keyword::In), "`in`")?;
        let iterable = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(StmtKind::For { it, iterable, body })
    }

    /// Loop targets; each bare identifier becomes a semi-scoped variable in
    /// the current scope.
    pub(crate) fn parse_it_group(&mut self) -> Result<ItGroup, CompileError> {
        let mut identifiers = Vec::new();
        loop {
            if self.eat(TokenKind::OpenParen) {
                let group = self.parse_it_group()?;
                self.expect(TokenKind::CloseParen, "`)` after unpack targets")?;
                identifiers.push(ItIdentifier::Group(group));
            } else {
                let token = self.expect(TokenKind::Ident, "a loop variable name")?;
                let name = self.intern_token(token);
                self.declare_var(name, VarKind::SemiScoped, TypeInfo::Untyped);
                identifiers.push(ItIdentifier::Id(name, token.span));
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(ItGroup { identifiers })
    }

    fn parse_try(&mut self) -> Result<StmtKind, CompileError> {
        self.bump(); // try
        let body = self.parse_block()?;

        let mut excepts = Vec::new();
        while self.at(TokenKind::Keyword(Keyword::Except)) {
            let except_token = self.bump();
            let mut exceptions = Vec::new();

            if self.eat(TokenKind::OpenParen) {
                loop {
                    let token = self.expect(TokenKind::Ident, "an exception class")?;
                    exceptions.push((self.intern_token(token), token.span));
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::CloseParen, "`)` after exception classes")?;
            } else if self.at(TokenKind::Ident) {
                let token = self.bump();
                exceptions.push((self.intern_token(token), token.span));
            }

            let as_name = if self.eat(TokenKind::Keyword(Keyword::As)) {
                let token = self.expect(TokenKind::Ident, "a capture name")?;
                Some(self.intern_token(token))
            } else {
                None
            };

            let except_body = self.parse_block()?;
            excepts.push(ExceptClause {
                span: except_token.span,
                exceptions,
                as_name,
                body: except_body,
            });
        }

        let finally = if self.at(TokenKind::Keyword(Keyword::Finally)) {
            self.bump();
            self.parse_block()?
        } else {
            Block::default()
        };

        if excepts.is_empty() && finally.stmts.is_empty() {
            return Err(CompileError::syntax(
                self.peek().span,
                "try statement needs at least one except or finally clause",
            ));
        }

        Ok(StmtKind::Try(TryStmt {
            body,
            excepts,
            finally,
        }))
    }

    fn parse_with(&mut self) -> Result<StmtKind, CompileError> {
        self.bump(); // with
        let manager = self.parse_expression()?;
        let as_name = if self.eat(TokenKind::Keyword(Keyword::As)) {
            let token = self.expect(TokenKind::Ident, "a context name")?;
            Some(self.intern_token(token))
        } else {
            None
        };
        let body = self.parse_block()?;
        Ok(StmtKind::With {
            manager,
            as_name,
            body,
        })
    }

    // ------------------------------------------------------------------
    // definitions

    fn parse_def(&mut self) -> Result<StmtKind, CompileError> {
        self.bump(); // def
        let name_token = self.expect(TokenKind::Ident, "a function name")?;
        let name = self.intern_token(name_token);
        let name_text = self.interner.resolve(name).to_owned();
        let ns_ident = self.ns_ident(&name_text);

        // a def nested inside a function turns that function into a
        // closure parent
        let enclosing = self.scopes.current();
        let enclosing_kind = self.pool.scope(enclosing).kind;
        let nested = matches!(
            enclosing_kind,
            ScopeKind::Function | ScopeKind::ClosureParent | ScopeKind::ClosureChild
        );
        if nested {
            self.mark_closure_parent(enclosing);
        }

        let scope_kind = if nested {
            ScopeKind::ClosureChild
        } else {
            ScopeKind::Function
        };

        let is_method = enclosing_kind == ScopeKind::Class;

        let scope_id = self.push_scope(scope_kind);
        self.ns.push(name_text.clone());

        let (sig, self_param, self_type) = self.parse_signature(name_token.span, is_method)?;

        let func_id = self.pool.alloc_func(FunctionDef {
            name,
            ns_ident,
            sig,
            scope: scope_id,
            self_param,
            self_type,
        });
        self.pool.scope_mut(scope_id).func = Some(func_id);

        // visible in the enclosing scope before the body parses so
        // recursion resolves
        let key = name_text.clone();
        self.pool
            .scope_mut(enclosing)
            .table
            .put(&key, Symbol::Function(func_id));

        let body = self.parse_block()?;

        self.ns.pop();
        self.pop_scope();

        if is_method {
            let class_id = *self.class_stack.last().expect("method implies a class");
            if let Some(slot) = ObjectModel::lookup(&name_text) {
                self.pool.class_mut(class_id).object_model[slot.index()] = Some(func_id);
            }
        }

        Ok(StmtKind::Function {
            func: func_id,
            body,
        })
    }

    /// `(params) [-> type]` with the function scope already pushed; declares
    /// argument variables as it goes.
    fn parse_signature(
        &mut self,
        def_span: Span,
        is_method: bool,
    ) -> Result<(Signature, Option<Name>, TypeInfo), CompileError> {
        self.expect(TokenKind::OpenParen, "`(` after the function name")?;

        let mut params = Vec::new();
        let mut types = Vec::new();
        let mut defaults = Vec::new();
        let mut self_param = None;
        let mut self_type = TypeInfo::Untyped;
        let mut first = true;

        while !self.at(TokenKind::CloseParen) {
            let param_token = self.expect(TokenKind::Ident, "a parameter name")?;
            let param_name = self.intern_token(param_token);

            let is_self = first && is_method && self.text_of(param_token) == "self";
            first = false;

            if is_self {
                let class_id = *self.class_stack.last().expect("inside a class body");
                self_param = Some(param_name);
                self_type = TypeInfo::Object(class_id);
                self.declare_var(param_name, VarKind::Regular, self_type.clone());
                if !self.eat(TokenKind::Comma) {
                    break;
                }
                continue;
            }

            self.expect(TokenKind::Colon, "`:` and a type for the parameter")?;
            let param_type = self.parse_type()?;

            if self.eat(TokenKind::Op(Op::Assign)) {
                defaults.push(self.parse_expression()?);
            } else if !defaults.is_empty() {
                return Err(CompileError::syntax(
                    param_token.span,
                    "parameter without a default follows one with a default",
                ));
            }

            self.declare_var(param_name, VarKind::Argument, param_type.clone());
            params.push(param_name);
            types.push(param_type);

            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CloseParen, "`)` after parameters")?;

        let return_type = if self.eat(TokenKind::Arrow) {
            self.parse_type()?
        } else {
            TypeInfo::None
        };

        if self_param.is_none() && is_method {
            return Err(CompileError::syntax(
                def_span,
                "methods take `self` as their first parameter",
            ));
        }

        Ok((
            Signature {
                params: Some(params),
                types,
                defaults,
                return_type,
            },
            self_param,
            self_type,
        ))
    }

    fn parse_class(&mut self) -> Result<StmtKind, CompileError> {
        self.bump(); // class
        let name_token = self.expect(TokenKind::Ident, "a class name")?;
        let name = self.intern_token(name_token);
        let name_text = self.interner.resolve(name).to_owned();
        let ns_ident = self.ns_ident(&name_text);

        let enclosing = self.scopes.current();
        let scope_id = self.push_scope(ScopeKind::Class);

        let class_id = self.pool.alloc_class(ClassDef {
            name,
            ns_ident,
            scope: scope_id,
            sig: Signature::default(),
            nbytes: 0,
            object_model: [None; ObjectModel::COUNT],
            fmtstr_index: None,
        });
        self.pool
            .scope_mut(enclosing)
            .table
            .put(&name_text, Symbol::Class(class_id));

        self.class_stack.push(class_id);
        self.ns.push(name_text);

        let (body, sig) = self.parse_class_body(class_id, name_token.span)?;

        self.ns.pop();
        self.class_stack.pop();
        self.pop_scope();

        self.pool.class_mut(class_id).sig = sig;

        Ok(StmtKind::Class {
            class: class_id,
            body,
        })
    }

    /// Class bodies hold member annotations and method definitions; member
    /// annotations become `Member` symbols and the synthesized signature.
    fn parse_class_body(
        &mut self,
        class_id: ClassId,
        class_span: Span,
    ) -> Result<(Block, Signature), CompileError> {
        self.expect(TokenKind::Colon, "`:`")?;
        self.expect(TokenKind::Newline, "a newline before the class body")?;
        self.expect(TokenKind::BlockBegin, "an indented class body")?;

        let mut stmts = Vec::new();
        let mut params = Vec::new();
        let mut types = Vec::new();
        let mut defaults = Vec::new();

        while !self.at(TokenKind::BlockEnd) && !self.at(TokenKind::Eof) {
            if self.eat(TokenKind::Newline) {
                continue;
            }
            let start = self.peek();
            match start.kind {
                TokenKind::Ident if self.nth(1).kind == TokenKind::Colon => {
                    let member_token = self.bump();
                    let member_name = self.intern_token(member_token);
                    self.bump(); // colon
                    let member_type = self.parse_type()?;

                    let initial = if self.eat(TokenKind::Op(Op::Assign)) {
                        Some(self.parse_expression()?)
                    } else {
                        None
                    };
                    self.expect(TokenKind::Newline, "end of member annotation")?;

                    match initial {
                        Some(default) => defaults.push(default),
                        None if !defaults.is_empty() => {
                            return Err(CompileError::syntax(
                                member_token.span,
                                "member without a default follows one with a default",
                            ));
                        }
                        None => {}
                    }

                    let key = self.interner.resolve(member_name).to_owned();
                    self.pool.scope_mut(self.scopes.current()).table.put(
                        &key,
                        Symbol::Member(member_name, member_type.clone()),
                    );
                    params.push(member_name);
                    types.push(member_type);

                    let end = self.tokens[self.pos.saturating_sub(1)].span;
                    stmts.push(Statement {
                        kind: StmtKind::Annotation {
                            name: member_name,
                            initial: None,
                        },
                        span: start.span.cover(end),
                    });
                }
                TokenKind::Keyword(Keyword::Pass) => {
                    self.bump();
                    self.expect(TokenKind::Newline, "end of line after pass")?;
                }
                _ => {
                    // anything else (methods included) parses as a normal
                    // statement; lowering rejects what a class body cannot
                    // hold
                    stmts.push(self.parse_statement()?);
                }
            }
        }
        self.expect(TokenKind::BlockEnd, "end of class body")?;

        if params.is_empty() {
            return Err(CompileError::unsupported(
                class_span,
                "class defined without any annotated members",
            ));
        }

        let sig = Signature {
            params: Some(params),
            types,
            defaults,
            return_type: TypeInfo::Object(class_id),
        };
        Ok((Block { stmts }, sig))
    }

    // ------------------------------------------------------------------
    // type annotations

    pub(crate) fn parse_type(&mut self) -> Result<TypeInfo, CompileError> {
        let token = self.bump();
        match token.kind {
            TokenKind::Keyword(Keyword::None) => Ok(TypeInfo::None),
            TokenKind::Ident => {
                let text = self.text_of(token);
                match text {
                    "int" => Ok(TypeInfo::Int),
                    "float" => Ok(TypeInfo::Float),
                    "str" => Ok(TypeInfo::String),
                    "bool" => Ok(TypeInfo::Bool),
                    "list" => {
                        self.expect(TokenKind::OpenSquare, "`[` after `list`")?;
                        let element = self.parse_type()?;
                        self.expect(TokenKind::CloseSquare, "`]`")?;
                        Ok(TypeInfo::List(Box::new(element)))
                    }
                    "dict" => {
                        self.expect(TokenKind::OpenSquare, "`[` after `dict`")?;
                        let key = self.parse_type()?;
                        self.expect(TokenKind::Comma, "`,` between key and value types")?;
                        let value = self.parse_type()?;
                        self.expect(TokenKind::CloseSquare, "`]`")?;
                        Ok(TypeInfo::Dict(Box::new(key), Box::new(value)))
                    }
                    "tuple" => {
                        self.expect(TokenKind::OpenSquare, "`[` after `tuple`")?;
                        let mut inner = vec![self.parse_type()?];
                        while self.eat(TokenKind::Comma) {
                            inner.push(self.parse_type()?);
                        }
                        self.expect(TokenKind::CloseSquare, "`]`")?;
                        Ok(TypeInfo::Tuple(inner))
                    }
                    _ => {
                        match self.scopes.get(&self.pool, text) {
                            Some(Symbol::Class(class_id)) => {
                                Ok(TypeInfo::Object(class_id))
                            }
                            _ => Err(CompileError::name_error(
                                token.span,
                                format!("unknown type `{text}`"),
                            )),
                        }
                    }
                }
            }
            _ => Err(CompileError::syntax(token.span, "expecting a type")),
        }
    }
}
