//! Operators and the precedence table.

use serde::Serialize;

/// Every operator the expression grammar knows about, including the synthetic
/// call/get-item/get-attr operations the parser manufactures for postfix
/// syntax. Assignment operators never appear inside expressions; they live on
/// assignment statements only.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub enum Op {
    Plus,
    Minus,
    Mult,
    Div,
    Mod,
    Pow,
    FloorDiv,
    Assign,
    PlusAssign,
    MinusAssign,
    MultAssign,
    DivAssign,
    ModAssign,
    FloorDivAssign,
    PowAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    RshiftAssign,
    LshiftAssign,
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseNot,
    ConditionalIf,
    ConditionalElse,
    Lshift,
    Rshift,
    Call,
    GetItem,
    GetAttr,
    LogicalAnd,
    LogicalOr,
    LogicalNot,
    In,
    Is,
    Negative,
}

/// Highest precedence level; the table spans 0..=MAX_PRECEDENCE.
pub const MAX_PRECEDENCE: u32 = 16;

impl Op {
    /// Binding strength, higher binds tighter. Assignment operators are level
    /// 0 and are rejected by the expression parser before this matters.
    pub fn precedence(self) -> u32 {
        match self {
            Op::Call | Op::GetItem | Op::GetAttr => 16,
            Op::Pow => 14,
            Op::Negative | Op::BitwiseNot => 13,
            Op::Mult | Op::Div | Op::Mod | Op::FloorDiv => 12,
            Op::Plus | Op::Minus => 11,
            Op::Lshift | Op::Rshift => 10,
            Op::BitwiseAnd => 9,
            Op::BitwiseXor => 8,
            Op::BitwiseOr => 7,
            Op::Equal
            | Op::NotEqual
            | Op::Greater
            | Op::Less
            | Op::GreaterEqual
            | Op::LessEqual
            | Op::In
            | Op::Is => 6,
            Op::LogicalNot => 5,
            Op::LogicalAnd => 4,
            Op::LogicalOr => 3,
            Op::ConditionalIf | Op::ConditionalElse => 2,
            Op::Assign
            | Op::PlusAssign
            | Op::MinusAssign
            | Op::MultAssign
            | Op::DivAssign
            | Op::ModAssign
            | Op::FloorDivAssign
            | Op::PowAssign
            | Op::AndAssign
            | Op::OrAssign
            | Op::XorAssign
            | Op::RshiftAssign
            | Op::LshiftAssign => 0,
        }
    }

    /// True for `=` and the compound assignment operators.
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            Op::Assign
                | Op::PlusAssign
                | Op::MinusAssign
                | Op::MultAssign
                | Op::DivAssign
                | Op::ModAssign
                | Op::FloorDivAssign
                | Op::PowAssign
                | Op::AndAssign
                | Op::OrAssign
                | Op::XorAssign
                | Op::RshiftAssign
                | Op::LshiftAssign
        )
    }

    /// True for the three prefix operators; their operations only use the
    /// right operand slot.
    pub fn is_unary(self) -> bool {
        matches!(self, Op::LogicalNot | Op::Negative | Op::BitwiseNot)
    }

    /// The plain operator a compound assignment applies, e.g. `+=` -> `+`.
    pub fn assignment_inner(self) -> Option<Op> {
        match self {
            Op::PlusAssign => Some(Op::Plus),
            Op::MinusAssign => Some(Op::Minus),
            Op::MultAssign => Some(Op::Mult),
            Op::DivAssign => Some(Op::Div),
            Op::ModAssign => Some(Op::Mod),
            Op::FloorDivAssign => Some(Op::FloorDiv),
            Op::PowAssign => Some(Op::Pow),
            Op::AndAssign => Some(Op::BitwiseAnd),
            Op::OrAssign => Some(Op::BitwiseOr),
            Op::XorAssign => Some(Op::BitwiseXor),
            Op::RshiftAssign => Some(Op::Rshift),
            Op::LshiftAssign => Some(Op::Lshift),
            _ => None,
        }
    }

    /// Source spelling, used in diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Plus => "+",
            Op::Minus => "-",
            Op::Mult => "*",
            Op::Div => "/",
            Op::Mod => "%",
            Op::Pow => "**",
            Op::FloorDiv => "//",
            Op::Assign => "=",
            Op::PlusAssign => "+=",
            Op::MinusAssign => "-=",
            Op::MultAssign => "*=",
            Op::DivAssign => "/=",
            Op::ModAssign => "%=",
            Op::FloorDivAssign => "//=",
            Op::PowAssign => "**=",
            Op::AndAssign => "&=",
            Op::OrAssign => "|=",
            Op::XorAssign => "^=",
            Op::RshiftAssign => ">>=",
            Op::LshiftAssign => "<<=",
            Op::Equal => "==",
            Op::NotEqual => "!=",
            Op::Greater => ">",
            Op::Less => "<",
            Op::GreaterEqual => ">=",
            Op::LessEqual => "<=",
            Op::BitwiseAnd => "&",
            Op::BitwiseOr => "|",
            Op::BitwiseXor => "^",
            Op::BitwiseNot => "~",
            Op::ConditionalIf => "if",
            Op::ConditionalElse => "else",
            Op::Lshift => "<<",
            Op::Rshift => ">>",
            Op::Call => "(",
            Op::GetItem => "[",
            Op::GetAttr => ".",
            Op::LogicalAnd => "and",
            Op::LogicalOr => "or",
            Op::LogicalNot => "not",
            Op::In => "in",
            Op::Is => "is",
            Op::Negative => "-",
        }
    }
}
