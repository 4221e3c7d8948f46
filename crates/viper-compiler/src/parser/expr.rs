//! Expression parsing into the flat operand/operation layout.
//!
//! Operations are collected into per-precedence buckets and concatenated in
//! descending precedence when the expression is finished. Walking the final
//! operation list front to back therefore evaluates tighter-binding
//! operations first; the lowering engine's per-operand record stitches the
//! results together without any tree.

use viper_core::Span;

use super::Parser;
use super::ast::{
    Arguments, Comprehension, Enclosure, EnclosureKind, Expression, Operand, Operation,
    SliceOperand,
};
use crate::diagnostics::CompileError;
use crate::lexer::{Keyword, TokenKind};
use crate::op::{MAX_PRECEDENCE, Op};

/// Accumulates operands and precedence-bucketed operations.
struct ExprBuilder {
    operands: Vec<Operand>,
    buckets: Vec<Vec<Operation>>,
}

impl ExprBuilder {
    fn new() -> Self {
        Self {
            operands: Vec::new(),
            buckets: (0..=MAX_PRECEDENCE).map(|_| Vec::new()).collect(),
        }
    }

    fn push_operand(&mut self, operand: Operand) -> usize {
        self.operands.push(operand);
        self.operands.len() - 1
    }

    fn push_operation(&mut self, op: Op, span: Span, left: usize, right: usize) {
        self.buckets[op.precedence() as usize].push(Operation {
            op,
            span,
            left,
            right,
        });
    }

    fn finish(self) -> Expression {
        let mut operations = Vec::new();
        for bucket in self.buckets.into_iter().rev() {
            operations.extend(bucket);
        }
        Expression {
            operands: self.operands,
            operations,
        }
    }
}

impl Parser<'_> {
    /// Parse one expression. Stops at commas, colons, closers, newlines, and
    /// assignment operators; callers own those.
    pub(crate) fn parse_expression(&mut self) -> Result<Expression, CompileError> {
        let mut builder = ExprBuilder::new();
        let mut prev = self.parse_unary_chain(&mut builder)?;

        while let Some((op, span)) = self.peek_infix() {
            self.bump();
            let rhs = self.parse_unary_chain(&mut builder)?;
            builder.push_operation(op, span, prev, rhs);
            prev = rhs;
        }

        Ok(builder.finish())
    }

    /// An infix operator at the current position, if any.
    fn peek_infix(&self) -> Option<(Op, Span)> {
        let token = self.peek();
        let op = match token.kind {
            TokenKind::Op(op)
                if !op.is_assignment() && op != Op::BitwiseNot && op.precedence() > 0 =>
            {
                op
            }
            TokenKind::Keyword(Keyword::And) => Op::LogicalAnd,
            TokenKind::Keyword(Keyword::Or) => Op::LogicalOr,
            TokenKind::Keyword(Keyword::In) => Op::In,
            TokenKind::Keyword(Keyword::Is) => Op::Is,
            _ => return None,
        };
        Some((op, token.span))
    }

    /// Prefix operators, an atom, then the postfix chain. Returns the final
    /// operand index of the chain.
    fn parse_unary_chain(
        &mut self,
        builder: &mut ExprBuilder,
    ) -> Result<usize, CompileError> {
        let mut prefixes = Vec::new();
        loop {
            let token = self.peek();
            let op = match token.kind {
                TokenKind::Op(Op::Minus) => Op::Negative,
                TokenKind::Op(Op::BitwiseNot) => Op::BitwiseNot,
                TokenKind::Keyword(Keyword::Not) => Op::LogicalNot,
                _ => break,
            };
            self.bump();
            prefixes.push((op, token.span));
        }

        let atom = self.parse_atom(builder)?;
        for (op, span) in prefixes {
            builder.push_operation(op, span, atom, atom);
        }
        self.parse_postfix(builder, atom)
    }

    fn parse_atom(&mut self, builder: &mut ExprBuilder) -> Result<usize, CompileError> {
        let token = self.peek();
        match token.kind {
            TokenKind::Ident
            | TokenKind::Number
            | TokenKind::Str
            | TokenKind::Keyword(Keyword::True)
            | TokenKind::Keyword(Keyword::False)
            | TokenKind::Keyword(Keyword::None) => {
                self.bump();
                Ok(builder.push_operand(Operand::Token(token)))
            }
            TokenKind::OpenParen => self.parse_parenthesized(builder),
            TokenKind::OpenSquare => self.parse_list_literal(builder),
            TokenKind::OpenCurly => self.parse_dict_literal(builder),
            _ => Err(CompileError::syntax(token.span, "expecting an expression")),
        }
    }

    /// `( expr )` grouping, `()` / `(a, b)` tuple literals.
    fn parse_parenthesized(
        &mut self,
        builder: &mut ExprBuilder,
    ) -> Result<usize, CompileError> {
        let open = self.bump();

        if self.at(TokenKind::CloseParen) {
            let close = self.bump();
            return Ok(builder.push_operand(Operand::Enclosure(Box::new(Enclosure {
                kind: EnclosureKind::Tuple,
                span: open.span.cover(close.span),
                expressions: Vec::new(),
            }))));
        }

        let first = self.parse_expression()?;

        if self.at(TokenKind::Comma) {
            let mut expressions = vec![first];
            while self.eat(TokenKind::Comma) {
                if self.at(TokenKind::CloseParen) {
                    break;
                }
                expressions.push(self.parse_expression()?);
            }
            let close = self.expect(TokenKind::CloseParen, "`)` after tuple literal")?;
            return Ok(builder.push_operand(Operand::Enclosure(Box::new(Enclosure {
                kind: EnclosureKind::Tuple,
                span: open.span.cover(close.span),
                expressions,
            }))));
        }

        self.expect(TokenKind::CloseParen, "`)`")?;
        Ok(builder.push_operand(Operand::Expr(Box::new(first))))
    }

    fn parse_list_literal(
        &mut self,
        builder: &mut ExprBuilder,
    ) -> Result<usize, CompileError> {
        let open = self.bump();

        if self.at(TokenKind::CloseSquare) {
            let close = self.bump();
            return Ok(builder.push_operand(Operand::Enclosure(Box::new(Enclosure {
                kind: EnclosureKind::List,
                span: open.span.cover(close.span),
                expressions: Vec::new(),
            }))));
        }

        let first = self.parse_expression()?;

        if self.at(TokenKind::Keyword(Keyword::For)) {
            let comp = self.parse_comprehension(EnclosureKind::List, first, None, open.span)?;
            let close = self.expect(TokenKind::CloseSquare, "`]` after comprehension")?;
            let mut comp = comp;
            comp.span = comp.span.cover(close.span);
            return Ok(builder.push_operand(Operand::Comprehension(Box::new(comp))));
        }

        let mut expressions = vec![first];
        while self.eat(TokenKind::Comma) {
            if self.at(TokenKind::CloseSquare) {
                break;
            }
            expressions.push(self.parse_expression()?);
        }
        let close = self.expect(TokenKind::CloseSquare, "`]` after list literal")?;
        Ok(builder.push_operand(Operand::Enclosure(Box::new(Enclosure {
            kind: EnclosureKind::List,
            span: open.span.cover(close.span),
            expressions,
        }))))
    }

    fn parse_dict_literal(
        &mut self,
        builder: &mut ExprBuilder,
    ) -> Result<usize, CompileError> {
        let open = self.bump();

        if self.at(TokenKind::CloseCurly) {
            let close = self.bump();
            return Ok(builder.push_operand(Operand::Enclosure(Box::new(Enclosure {
                kind: EnclosureKind::Dict,
                span: open.span.cover(close.span),
                expressions: Vec::new(),
            }))));
        }

        let first_key = self.parse_expression()?;
        self.expect(TokenKind::Colon, "`:` between dict key and value")?;
        let first_value = self.parse_expression()?;

        if self.at(TokenKind::Keyword(Keyword::For)) {
            let comp = self.parse_comprehension(
                EnclosureKind::Dict,
                first_key,
                Some(first_value),
                open.span,
            )?;
            let close = self.expect(TokenKind::CloseCurly, "`}` after comprehension")?;
            let mut comp = comp;
            comp.span = comp.span.cover(close.span);
            return Ok(builder.push_operand(Operand::Comprehension(Box::new(comp))));
        }

        let mut expressions = vec![first_key, first_value];
        while self.eat(TokenKind::Comma) {
            if self.at(TokenKind::CloseCurly) {
                break;
            }
            expressions.push(self.parse_expression()?);
            self.expect(TokenKind::Colon, "`:` between dict key and value")?;
            expressions.push(self.parse_expression()?);
        }
        let close = self.expect(TokenKind::CloseCurly, "`}` after dict literal")?;
        Ok(builder.push_operand(Operand::Enclosure(Box::new(Enclosure {
            kind: EnclosureKind::Dict,
            span: open.span.cover(close.span),
            expressions,
        }))))
    }

    fn parse_comprehension(
        &mut self,
        kind: EnclosureKind,
        element: Expression,
        value: Option<Expression>,
        open: Span,
    ) -> Result<Comprehension, CompileError> {
        self.expect(TokenKind::Keyword(Keyword::For), "`for`")?;
        let it = self.parse_it_group()?;
        self.expect(TokenKind::Keyword(Keyword::In), "`in`")?;
        let iterable = self.parse_expression()?;
        let condition = if self.eat(TokenKind::Keyword(Keyword::If)) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(Comprehension {
            kind,
            span: open,
            element,
            value,
            it,
            iterable,
            condition,
        })
    }

    /// Calls, subscripts, and attribute access, left to right.
    fn parse_postfix(
        &mut self,
        builder: &mut ExprBuilder,
        mut last: usize,
    ) -> Result<usize, CompileError> {
        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::OpenParen => {
                    let args = self.parse_arguments()?;
                    let span = args.span;
                    let index = builder.push_operand(Operand::Args(Box::new(args)));
                    builder.push_operation(Op::Call, span, last, index);
                    last = index;
                }
                TokenKind::OpenSquare => {
                    let index = self.parse_subscript(builder)?;
                    builder.push_operation(Op::GetItem, token.span, last, index);
                    last = index;
                }
                TokenKind::Dot => {
                    self.bump();
                    let attr = self.expect(TokenKind::Ident, "an attribute name")?;
                    let index = builder.push_operand(Operand::Token(attr));
                    builder.push_operation(Op::GetAttr, token.span, last, index);
                    last = index;
                }
                _ => return Ok(last),
            }
        }
    }

    fn parse_arguments(&mut self) -> Result<Arguments, CompileError> {
        let open = self.expect(TokenKind::OpenParen, "`(`")?;
        let mut values = Vec::new();
        let mut kwds = Vec::new();
        let mut n_positional = 0;

        while !self.at(TokenKind::CloseParen) {
            let is_kwarg = self.at(TokenKind::Ident)
                && self.nth(1).kind == TokenKind::Op(Op::Assign);
            if is_kwarg {
                let kwd_token = self.bump();
                let kwd = self.intern_token(kwd_token);
                self.bump(); // `=`
                kwds.push(kwd);
                values.push(self.parse_expression()?);
            } else {
                if !kwds.is_empty() {
                    return Err(CompileError::syntax(
                        self.peek().span,
                        "positional argument follows keyword argument",
                    ));
                }
                values.push(self.parse_expression()?);
                n_positional += 1;
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        let close = self.expect(TokenKind::CloseParen, "`)` after arguments")?;

        Ok(Arguments {
            span: open.span.cover(close.span),
            values,
            n_positional,
            kwds,
        })
    }

    /// `[item]` or `[start:stop:step]`; returns the pushed operand index.
    fn parse_subscript(
        &mut self,
        builder: &mut ExprBuilder,
    ) -> Result<usize, CompileError> {
        let open = self.expect(TokenKind::OpenSquare, "`[`")?;

        let start = if self.at(TokenKind::Colon) {
            None
        } else {
            Some(self.parse_expression()?)
        };

        if self.eat(TokenKind::Colon) {
            let stop = if self.at(TokenKind::Colon) || self.at(TokenKind::CloseSquare) {
                None
            } else {
                Some(self.parse_expression()?)
            };
            let step = if self.eat(TokenKind::Colon) {
                if self.at(TokenKind::CloseSquare) {
                    None
                } else {
                    Some(self.parse_expression()?)
                }
            } else {
                None
            };
            let close = self.expect(TokenKind::CloseSquare, "`]` after slice")?;
            return Ok(builder.push_operand(Operand::Slice(Box::new(SliceOperand {
                span: open.span.cover(close.span),
                start,
                stop,
                step,
            }))));
        }

        self.expect(TokenKind::CloseSquare, "`]` after subscript")?;
        let item = start.expect("subscript without colon has an item expression");
        Ok(builder.push_operand(Operand::Expr(Box::new(item))))
    }
}
