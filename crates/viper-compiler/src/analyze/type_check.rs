//! Operator and operand type resolution.
//!
//! `resolve_operation` is a pure function over `(left, right, op)`; an
//! `Untyped` result means the combination is unsupported and the caller
//! raises a TypeError at the operation's location. Object operands never
//! reach this table; they divert to object-model dispatch first.

use crate::analyze::types::TypeInfo;
use crate::op::Op;

fn untyped() -> TypeInfo {
    TypeInfo::Untyped
}

fn resolve_plus(left: &TypeInfo, right: &TypeInfo) -> TypeInfo {
    match left {
        TypeInfo::Int => match right {
            TypeInfo::Int => TypeInfo::Int,
            TypeInfo::Float => TypeInfo::Float,
            _ => untyped(),
        },
        TypeInfo::Float => {
            if right.is_number() {
                left.clone()
            } else {
                untyped()
            }
        }
        TypeInfo::String => {
            if matches!(right, TypeInfo::String) {
                TypeInfo::String
            } else {
                untyped()
            }
        }
        TypeInfo::List(_) => {
            if left.compatible(right) {
                left.clone()
            } else {
                untyped()
            }
        }
        _ => untyped(),
    }
}

fn resolve_minus(left: &TypeInfo, right: &TypeInfo) -> TypeInfo {
    match left {
        TypeInfo::Int => match right {
            TypeInfo::Int => TypeInfo::Int,
            TypeInfo::Float => TypeInfo::Float,
            _ => untyped(),
        },
        TypeInfo::Float => {
            if right.is_number() {
                left.clone()
            } else {
                untyped()
            }
        }
        _ => untyped(),
    }
}

fn resolve_multiply(left: &TypeInfo, right: &TypeInfo) -> TypeInfo {
    match left {
        TypeInfo::Int => match right {
            TypeInfo::Int => TypeInfo::Int,
            TypeInfo::Float => TypeInfo::Float,
            // int * str and int * list repeat the sequence
            TypeInfo::String | TypeInfo::List(_) => right.clone(),
            _ => untyped(),
        },
        TypeInfo::Float => {
            if right.is_number() {
                left.clone()
            } else {
                untyped()
            }
        }
        TypeInfo::String | TypeInfo::List(_) => {
            if matches!(right, TypeInfo::Int) {
                left.clone()
            } else {
                untyped()
            }
        }
        _ => untyped(),
    }
}

fn resolve_divide(left: &TypeInfo, right: &TypeInfo) -> TypeInfo {
    match left {
        TypeInfo::Int => {
            if right.is_number() {
                TypeInfo::Float
            } else {
                untyped()
            }
        }
        TypeInfo::Float => {
            if right.is_number() {
                left.clone()
            } else {
                untyped()
            }
        }
        _ => untyped(),
    }
}

fn resolve_modulo(left: &TypeInfo, right: &TypeInfo) -> TypeInfo {
    match left {
        TypeInfo::Int | TypeInfo::Float => {
            if matches!(right, TypeInfo::Int) {
                left.clone()
            } else {
                untyped()
            }
        }
        // str % has no format-string sugar; unsupported
        _ => untyped(),
    }
}

fn resolve_power(left: &TypeInfo, right: &TypeInfo) -> TypeInfo {
    if !(left.is_number() && right.is_number()) {
        return untyped();
    }
    if matches!(left, TypeInfo::Float) || matches!(right, TypeInfo::Float) {
        TypeInfo::Float
    } else {
        TypeInfo::Int
    }
}

fn resolve_floordiv(left: &TypeInfo, right: &TypeInfo) -> TypeInfo {
    if left.is_number() && right.is_number() {
        TypeInfo::Int
    } else {
        untyped()
    }
}

fn resolve_equal(left: &TypeInfo, right: &TypeInfo) -> TypeInfo {
    if (left.is_number() && right.is_number()) || left.compatible(right) {
        TypeInfo::Bool
    } else {
        untyped()
    }
}

fn resolve_ordering(left: &TypeInfo, right: &TypeInfo) -> TypeInfo {
    if left.is_number() && right.is_number() {
        TypeInfo::Bool
    } else if matches!(left, TypeInfo::String) && matches!(right, TypeInfo::String) {
        TypeInfo::Bool
    } else {
        untyped()
    }
}

fn resolve_bits(left: &TypeInfo, right: &TypeInfo) -> TypeInfo {
    if matches!(left, TypeInfo::Int) && matches!(right, TypeInfo::Int) {
        TypeInfo::Int
    } else {
        untyped()
    }
}

fn resolve_membership(left: &TypeInfo, right: &TypeInfo) -> TypeInfo {
    match right {
        TypeInfo::String => {
            if matches!(left, TypeInfo::String) {
                TypeInfo::Bool
            } else {
                untyped()
            }
        }
        TypeInfo::List(element) => {
            if left.compatible(element) {
                TypeInfo::Bool
            } else {
                untyped()
            }
        }
        TypeInfo::Dict(key, _) => {
            if left.compatible(key) {
                TypeInfo::Bool
            } else {
                untyped()
            }
        }
        _ => untyped(),
    }
}

fn resolve_identity(left: &TypeInfo, right: &TypeInfo) -> TypeInfo {
    match left {
        TypeInfo::List(_) | TypeInfo::Dict(_, _) | TypeInfo::Object(_) | TypeInfo::Bool => {
            if left.compatible(right) {
                TypeInfo::Bool
            } else {
                untyped()
            }
        }
        _ => untyped(),
    }
}

fn resolve_get_item(left: &TypeInfo, right: &TypeInfo) -> TypeInfo {
    match left {
        TypeInfo::List(element) => match right {
            TypeInfo::Int => (**element).clone(),
            TypeInfo::Slice => left.clone(),
            _ => untyped(),
        },
        TypeInfo::Dict(key, value) => {
            if right.compatible(key) {
                (**value).clone()
            } else {
                untyped()
            }
        }
        _ => untyped(),
    }
}

/// Resolve the result type of a binary or unary operation over non-object
/// operands. Unary operators only consult `right`.
pub fn resolve_operation(left: &TypeInfo, right: &TypeInfo, op: Op) -> TypeInfo {
    if op.is_unary() {
        if right.is_untyped() {
            return untyped();
        }
        return match op {
            Op::Negative => {
                if right.is_number() {
                    right.clone()
                } else {
                    untyped()
                }
            }
            Op::BitwiseNot => {
                if matches!(right, TypeInfo::Int) {
                    TypeInfo::Int
                } else {
                    untyped()
                }
            }
            Op::LogicalNot => TypeInfo::Bool,
            _ => unreachable!("is_unary covers exactly these three"),
        };
    }

    if left.is_untyped() || right.is_untyped() {
        return untyped();
    }

    match op {
        Op::Plus => resolve_plus(left, right),
        Op::Minus => resolve_minus(left, right),
        Op::Mult => resolve_multiply(left, right),
        Op::Div => resolve_divide(left, right),
        Op::Mod => resolve_modulo(left, right),
        Op::Pow => resolve_power(left, right),
        Op::FloorDiv => resolve_floordiv(left, right),
        Op::Equal | Op::NotEqual => resolve_equal(left, right),
        Op::Greater | Op::Less | Op::GreaterEqual | Op::LessEqual => {
            resolve_ordering(left, right)
        }
        Op::BitwiseAnd | Op::BitwiseOr | Op::BitwiseXor | Op::Lshift | Op::Rshift => {
            resolve_bits(left, right)
        }
        Op::In => resolve_membership(left, right),
        Op::Is => resolve_identity(left, right),
        Op::GetItem => resolve_get_item(left, right),
        Op::LogicalAnd | Op::LogicalOr => TypeInfo::Bool,
        Op::ConditionalIf => left.clone(),
        Op::ConditionalElse => right.clone(),
        Op::Call | Op::GetAttr => {
            // handled structurally by the lowering engine, never through the
            // operator matrix
            untyped()
        }
        Op::Negative | Op::BitwiseNot | Op::LogicalNot => {
            unreachable!("unary operators resolved above")
        }
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
        | Op::LshiftAssign => {
            unreachable!("assignment operators are statement-level only")
        }
    }
}
