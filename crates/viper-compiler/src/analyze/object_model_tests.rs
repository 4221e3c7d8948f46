//! Unit tests for object-model slot lookup and operator dispatch.

use viper_core::Name;

use super::object_model::{
    ObjectModel, find_contains_function, find_object_op_function, op_assignment_slot,
};
use super::types::Signature;
use crate::op::Op;
use crate::pool::{ClassDef, FuncId, ScopeId};

#[test]
fn lookup_known_slots() {
    assert_eq!(ObjectModel::lookup("__add__"), Some(ObjectModel::Add));
    assert_eq!(ObjectModel::lookup("__radd__"), Some(ObjectModel::RAdd));
    assert_eq!(ObjectModel::lookup("__init__"), Some(ObjectModel::Init));
    assert_eq!(ObjectModel::lookup("__str__"), Some(ObjectModel::Str));
    assert_eq!(ObjectModel::lookup("__getitem__"), Some(ObjectModel::GetItem));
    assert_eq!(ObjectModel::lookup("__invert__"), Some(ObjectModel::Invert));
}

#[test]
fn lookup_rejects_non_slots() {
    assert_eq!(ObjectModel::lookup("__missing__"), None);
    assert_eq!(ObjectModel::lookup("add"), None);
    assert_eq!(ObjectModel::lookup("__add"), None);
    assert_eq!(ObjectModel::lookup(""), None);
}

#[test]
fn slot_table_is_sorted_and_complete() {
    // binary search relies on the ordering; the table must cover every slot
    let table = super::object_model::SLOT_TABLE;
    assert_eq!(table.len(), ObjectModel::COUNT);
    for pair in table.windows(2) {
        assert!(pair[0].0 < pair[1].0, "{} >= {}", pair[0].0, pair[1].0);
    }
}

#[test]
fn method_name_round_trips() {
    for name in ["__add__", "__iadd__", "__rxor__", "__trunc__"] {
        let slot = ObjectModel::lookup(name).unwrap();
        assert_eq!(slot.method_name(), name);
    }
}

#[test]
fn op_assignment_maps_to_inplace_slots() {
    assert_eq!(op_assignment_slot(Op::PlusAssign), Some(ObjectModel::IAdd));
    assert_eq!(op_assignment_slot(Op::PowAssign), Some(ObjectModel::IPow));
    assert_eq!(op_assignment_slot(Op::LshiftAssign), Some(ObjectModel::ILshift));
    assert_eq!(op_assignment_slot(Op::Plus), None);
}

fn class_with(slots: &[(ObjectModel, u32)]) -> ClassDef {
    let mut object_model = [None; ObjectModel::COUNT];
    for &(slot, func) in slots {
        object_model[slot.index()] = Some(FuncId::from_raw(func));
    }
    ClassDef {
        name: Name::from_raw(0),
        ns_ident: "Foo".into(),
        scope: ScopeId::from_raw(0),
        sig: Signature::default(),
        nbytes: 0,
        object_model,
        fmtstr_index: None,
    }
}

#[test]
fn primary_slot_dispatch() {
    let foo = class_with(&[(ObjectModel::Add, 3)]);
    let hit = find_object_op_function(Some(&foo), None, Op::Plus).unwrap();
    assert_eq!(hit.func, FuncId::from_raw(3));
    assert!(!hit.is_rop);
    assert!(!hit.is_unary);
}

#[test]
fn reflected_slot_dispatch() {
    // left operand is not an object; right carries __radd__
    let foo = class_with(&[(ObjectModel::RAdd, 9)]);
    let hit = find_object_op_function(None, Some(&foo), Op::Plus).unwrap();
    assert_eq!(hit.func, FuncId::from_raw(9));
    assert!(hit.is_rop);
}

#[test]
fn missing_both_slots_is_none() {
    let foo = class_with(&[]);
    assert!(find_object_op_function(Some(&foo), Some(&foo), Op::Plus).is_none());
}

#[test]
fn primary_wins_over_reflected() {
    let left = class_with(&[(ObjectModel::Add, 1)]);
    let right = class_with(&[(ObjectModel::RAdd, 2)]);
    let hit = find_object_op_function(Some(&left), Some(&right), Op::Plus).unwrap();
    assert_eq!(hit.func, FuncId::from_raw(1));
    assert!(!hit.is_rop);
}

#[test]
fn unary_dispatch() {
    let foo = class_with(&[(ObjectModel::Neg, 5)]);
    let hit = find_object_op_function(Some(&foo), None, Op::Negative).unwrap();
    assert!(hit.is_unary);
}

#[test]
fn contains_dispatches_on_the_container() {
    let foo = class_with(&[(ObjectModel::Contains, 8)]);
    let hit = find_contains_function(Some(&foo)).unwrap();
    assert_eq!(hit.func, FuncId::from_raw(8));
    assert!(hit.is_rop);
}

#[test]
fn comparison_reflection_swaps_direction() {
    // a < b with only b.__gt__ defined binds self to b
    let right = class_with(&[(ObjectModel::Gt, 4)]);
    let hit = find_object_op_function(None, Some(&right), Op::Less).unwrap();
    assert_eq!(hit.func, FuncId::from_raw(4));
    assert!(hit.is_rop);
}
