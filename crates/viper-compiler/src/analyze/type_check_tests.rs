//! Unit tests for the operator result matrix.

use super::type_check::resolve_operation;
use super::types::TypeInfo;
use crate::op::Op;

fn list_of(t: TypeInfo) -> TypeInfo {
    TypeInfo::List(Box::new(t))
}

fn dict_of(k: TypeInfo, v: TypeInfo) -> TypeInfo {
    TypeInfo::Dict(Box::new(k), Box::new(v))
}

#[test]
fn arithmetic_promotion() {
    let r = resolve_operation(&TypeInfo::Int, &TypeInfo::Int, Op::Plus);
    assert!(matches!(r, TypeInfo::Int));
    let r = resolve_operation(&TypeInfo::Int, &TypeInfo::Float, Op::Plus);
    assert!(matches!(r, TypeInfo::Float));
    let r = resolve_operation(&TypeInfo::Float, &TypeInfo::Int, Op::Minus);
    assert!(matches!(r, TypeInfo::Float));
}

#[test]
fn division_is_always_float_floordiv_always_int() {
    let r = resolve_operation(&TypeInfo::Int, &TypeInfo::Int, Op::Div);
    assert!(matches!(r, TypeInfo::Float));
    let r = resolve_operation(&TypeInfo::Float, &TypeInfo::Float, Op::FloorDiv);
    assert!(matches!(r, TypeInfo::Int));
}

#[test]
fn string_concat_and_repetition() {
    let r = resolve_operation(&TypeInfo::String, &TypeInfo::String, Op::Plus);
    assert!(matches!(r, TypeInfo::String));
    let r = resolve_operation(&TypeInfo::Int, &TypeInfo::String, Op::Mult);
    assert!(matches!(r, TypeInfo::String));
    let r = resolve_operation(&TypeInfo::String, &TypeInfo::Int, Op::Mult);
    assert!(matches!(r, TypeInfo::String));
}

#[test]
fn string_mod_is_unsupported() {
    let r = resolve_operation(&TypeInfo::String, &TypeInfo::String, Op::Mod);
    assert!(r.is_untyped());
    let r = resolve_operation(&TypeInfo::String, &TypeInfo::Int, Op::Mod);
    assert!(r.is_untyped());
}

#[test]
fn list_concat_requires_matching_content() {
    let ints = list_of(TypeInfo::Int);
    let r = resolve_operation(&ints, &list_of(TypeInfo::Int), Op::Plus);
    assert!(matches!(r, TypeInfo::List(_)));
    let r = resolve_operation(&ints, &list_of(TypeInfo::Float), Op::Plus);
    assert!(r.is_untyped());
}

#[test]
fn symmetric_ops_commute_for_non_objects() {
    let pairs = [
        (TypeInfo::Int, TypeInfo::Float),
        (TypeInfo::String, TypeInfo::String),
        (TypeInfo::Int, TypeInfo::Int),
        (TypeInfo::Bool, TypeInfo::Bool),
        (list_of(TypeInfo::Int), list_of(TypeInfo::Int)),
    ];
    for op in [Op::Plus, Op::Mult, Op::Equal, Op::NotEqual] {
        for (a, b) in &pairs {
            let lr = resolve_operation(a, b, op);
            let rl = resolve_operation(b, a, op);
            assert!(
                lr.compatible(&rl),
                "{} not symmetric over {} / {}",
                op.as_str(),
                a.describe(),
                b.describe()
            );
        }
    }
}

#[test]
fn asymmetric_division() {
    // int / list is untyped both ways, but float % int differs from
    // int % float
    let r = resolve_operation(&TypeInfo::Float, &TypeInfo::Int, Op::Mod);
    assert!(matches!(r, TypeInfo::Float));
    let r = resolve_operation(&TypeInfo::Int, &TypeInfo::Float, Op::Mod);
    assert!(r.is_untyped());
}

#[test]
fn membership() {
    let r = resolve_operation(&TypeInfo::String, &TypeInfo::String, Op::In);
    assert!(matches!(r, TypeInfo::Bool));
    let r = resolve_operation(&TypeInfo::Int, &list_of(TypeInfo::Int), Op::In);
    assert!(matches!(r, TypeInfo::Bool));
    let r = resolve_operation(
        &TypeInfo::String,
        &dict_of(TypeInfo::String, TypeInfo::Int),
        Op::In,
    );
    assert!(matches!(r, TypeInfo::Bool));
    let r = resolve_operation(&TypeInfo::Float, &list_of(TypeInfo::Int), Op::In);
    assert!(r.is_untyped());
}

#[test]
fn identity_limited_to_reference_like_types() {
    let ints = list_of(TypeInfo::Int);
    let r = resolve_operation(&ints, &ints, Op::Is);
    assert!(matches!(r, TypeInfo::Bool));
    let r = resolve_operation(&TypeInfo::Int, &TypeInfo::Int, Op::Is);
    assert!(r.is_untyped());
}

#[test]
fn unary_operators() {
    let r = resolve_operation(&TypeInfo::Untyped, &TypeInfo::Int, Op::Negative);
    assert!(matches!(r, TypeInfo::Int));
    let r = resolve_operation(&TypeInfo::Untyped, &TypeInfo::Float, Op::Negative);
    assert!(matches!(r, TypeInfo::Float));
    let r = resolve_operation(&TypeInfo::Untyped, &TypeInfo::Int, Op::BitwiseNot);
    assert!(matches!(r, TypeInfo::Int));
    let r = resolve_operation(&TypeInfo::Untyped, &TypeInfo::Float, Op::BitwiseNot);
    assert!(r.is_untyped());
    let r = resolve_operation(&TypeInfo::Untyped, &TypeInfo::String, Op::LogicalNot);
    assert!(matches!(r, TypeInfo::Bool));
}

#[test]
fn untyped_operand_poisons_the_result() {
    let r = resolve_operation(&TypeInfo::Untyped, &TypeInfo::Int, Op::Plus);
    assert!(r.is_untyped());
    let r = resolve_operation(&TypeInfo::Int, &TypeInfo::Untyped, Op::Plus);
    assert!(r.is_untyped());
}

#[test]
fn get_item_results() {
    let r = resolve_operation(&list_of(TypeInfo::Int), &TypeInfo::Int, Op::GetItem);
    assert!(matches!(r, TypeInfo::Int));
    let r = resolve_operation(
        &dict_of(TypeInfo::String, TypeInfo::Float),
        &TypeInfo::String,
        Op::GetItem,
    );
    assert!(matches!(r, TypeInfo::Float));
    let r = resolve_operation(
        &dict_of(TypeInfo::String, TypeInfo::Float),
        &TypeInfo::Int,
        Op::GetItem,
    );
    assert!(r.is_untyped());
}
