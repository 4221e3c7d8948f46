//! The object model: the fixed set of special method slots recognized on
//! user-defined classes, and operator dispatch through them.

use crate::op::Op;
use crate::pool::{ClassDef, FuncId};

/// Every recognized `__x__` slot. Discriminants index the per-class method
/// table.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(usize)]
pub enum ObjectModel {
    Abs,
    Add,
    And,
    Bool,
    Call,
    Ceil,
    Contains,
    DelItem,
    DivMod,
    Enter,
    Eq,
    Exit,
    Float,
    Floor,
    FloorDiv,
    Ge,
    GetItem,
    Gt,
    Hash,
    IAdd,
    IAnd,
    IFloorDiv,
    ILshift,
    IMod,
    IMul,
    Init,
    Int,
    Invert,
    IOr,
    IPow,
    IRshift,
    ISub,
    Iter,
    ITrueDiv,
    IXor,
    Le,
    Len,
    Lshift,
    Lt,
    Mod,
    Mul,
    Ne,
    Neg,
    Next,
    Or,
    Pow,
    RAdd,
    RAnd,
    Repr,
    RFloorDiv,
    RLshift,
    RMod,
    RMul,
    ROr,
    Round,
    RPow,
    RRshift,
    Rshift,
    RSub,
    RTrueDiv,
    RXor,
    SetItem,
    Str,
    Sub,
    TrueDiv,
    Trunc,
    Xor,
}

impl ObjectModel {
    /// Number of method slots; sizes the per-class table.
    pub const COUNT: usize = ObjectModel::Xor as usize + 1;

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Map a method name to its slot. Names that are not dunders, or dunders
    /// outside the model, return `None`.
    pub fn lookup(name: &str) -> Option<ObjectModel> {
        SLOT_TABLE
            .binary_search_by_key(&name, |(key, _)| key)
            .ok()
            .map(|i| SLOT_TABLE[i].1)
    }

    /// Source spelling of the slot.
    pub fn method_name(self) -> &'static str {
        SLOT_TABLE
            .iter()
            .find(|(_, slot)| *slot == self)
            .map(|(name, _)| *name)
            .expect("every slot appears in the table")
    }
}

/// Sorted `(name, slot)` pairs; `lookup` binary searches on the name.
pub(crate) static SLOT_TABLE: &[(&str, ObjectModel)] = &[
    ("__abs__", ObjectModel::Abs),
    ("__add__", ObjectModel::Add),
    ("__and__", ObjectModel::And),
    ("__bool__", ObjectModel::Bool),
    ("__call__", ObjectModel::Call),
    ("__ceil__", ObjectModel::Ceil),
    ("__contains__", ObjectModel::Contains),
    ("__delitem__", ObjectModel::DelItem),
    ("__divmod__", ObjectModel::DivMod),
    ("__enter__", ObjectModel::Enter),
    ("__eq__", ObjectModel::Eq),
    ("__exit__", ObjectModel::Exit),
    ("__float__", ObjectModel::Float),
    ("__floor__", ObjectModel::Floor),
    ("__floordiv__", ObjectModel::FloorDiv),
    ("__ge__", ObjectModel::Ge),
    ("__getitem__", ObjectModel::GetItem),
    ("__gt__", ObjectModel::Gt),
    ("__hash__", ObjectModel::Hash),
    ("__iadd__", ObjectModel::IAdd),
    ("__iand__", ObjectModel::IAnd),
    ("__ifloordiv__", ObjectModel::IFloorDiv),
    ("__ilshift__", ObjectModel::ILshift),
    ("__imod__", ObjectModel::IMod),
    ("__imul__", ObjectModel::IMul),
    ("__init__", ObjectModel::Init),
    ("__int__", ObjectModel::Int),
    ("__invert__", ObjectModel::Invert),
    ("__ior__", ObjectModel::IOr),
    ("__ipow__", ObjectModel::IPow),
    ("__irshift__", ObjectModel::IRshift),
    ("__isub__", ObjectModel::ISub),
    ("__iter__", ObjectModel::Iter),
    ("__itruediv__", ObjectModel::ITrueDiv),
    ("__ixor__", ObjectModel::IXor),
    ("__le__", ObjectModel::Le),
    ("__len__", ObjectModel::Len),
    ("__lshift__", ObjectModel::Lshift),
    ("__lt__", ObjectModel::Lt),
    ("__mod__", ObjectModel::Mod),
    ("__mul__", ObjectModel::Mul),
    ("__ne__", ObjectModel::Ne),
    ("__neg__", ObjectModel::Neg),
    ("__next__", ObjectModel::Next),
    ("__or__", ObjectModel::Or),
    ("__pow__", ObjectModel::Pow),
    ("__radd__", ObjectModel::RAdd),
    ("__rand__", ObjectModel::RAnd),
    ("__repr__", ObjectModel::Repr),
    ("__rfloordiv__", ObjectModel::RFloorDiv),
    ("__rlshift__", ObjectModel::RLshift),
    ("__rmod__", ObjectModel::RMod),
    ("__rmul__", ObjectModel::RMul),
    ("__ror__", ObjectModel::ROr),
    ("__round__", ObjectModel::Round),
    ("__rpow__", ObjectModel::RPow),
    ("__rrshift__", ObjectModel::RRshift),
    ("__rshift__", ObjectModel::Rshift),
    ("__rsub__", ObjectModel::RSub),
    ("__rtruediv__", ObjectModel::RTrueDiv),
    ("__rxor__", ObjectModel::RXor),
    ("__setitem__", ObjectModel::SetItem),
    ("__str__", ObjectModel::Str),
    ("__sub__", ObjectModel::Sub),
    ("__truediv__", ObjectModel::TrueDiv),
    ("__trunc__", ObjectModel::Trunc),
    ("__xor__", ObjectModel::Xor),
];

/// Compound assignment operator to its in-place slot.
pub fn op_assignment_slot(op: Op) -> Option<ObjectModel> {
    let slot = match op {
        Op::PlusAssign => ObjectModel::IAdd,
        Op::MinusAssign => ObjectModel::ISub,
        Op::MultAssign => ObjectModel::IMul,
        Op::DivAssign => ObjectModel::ITrueDiv,
        Op::ModAssign => ObjectModel::IMod,
        Op::FloorDivAssign => ObjectModel::IFloorDiv,
        Op::PowAssign => ObjectModel::IPow,
        Op::AndAssign => ObjectModel::IAnd,
        Op::OrAssign => ObjectModel::IOr,
        Op::XorAssign => ObjectModel::IXor,
        Op::RshiftAssign => ObjectModel::IRshift,
        Op::LshiftAssign => ObjectModel::ILshift,
        _ => return None,
    };
    Some(slot)
}

/// Primary and reflected slots for a binary operator, unary flag for the
/// prefix operators. `In` dispatches to `__contains__` on the right operand,
/// so its "reflected" form is the primary one.
fn op_slots(op: Op) -> Option<(ObjectModel, Option<ObjectModel>, bool)> {
    let slots = match op {
        Op::Plus => (ObjectModel::Add, Some(ObjectModel::RAdd), false),
        Op::Minus => (ObjectModel::Sub, Some(ObjectModel::RSub), false),
        Op::Mult => (ObjectModel::Mul, Some(ObjectModel::RMul), false),
        Op::Div => (ObjectModel::TrueDiv, Some(ObjectModel::RTrueDiv), false),
        Op::Mod => (ObjectModel::Mod, Some(ObjectModel::RMod), false),
        Op::Pow => (ObjectModel::Pow, Some(ObjectModel::RPow), false),
        Op::FloorDiv => (ObjectModel::FloorDiv, Some(ObjectModel::RFloorDiv), false),
        Op::BitwiseAnd => (ObjectModel::And, Some(ObjectModel::RAnd), false),
        Op::BitwiseOr => (ObjectModel::Or, Some(ObjectModel::ROr), false),
        Op::BitwiseXor => (ObjectModel::Xor, Some(ObjectModel::RXor), false),
        Op::Lshift => (ObjectModel::Lshift, Some(ObjectModel::RLshift), false),
        Op::Rshift => (ObjectModel::Rshift, Some(ObjectModel::RRshift), false),
        Op::Equal => (ObjectModel::Eq, Some(ObjectModel::Eq), false),
        Op::NotEqual => (ObjectModel::Ne, Some(ObjectModel::Ne), false),
        Op::Greater => (ObjectModel::Gt, Some(ObjectModel::Lt), false),
        Op::Less => (ObjectModel::Lt, Some(ObjectModel::Gt), false),
        Op::GreaterEqual => (ObjectModel::Ge, Some(ObjectModel::Le), false),
        Op::LessEqual => (ObjectModel::Le, Some(ObjectModel::Ge), false),
        Op::GetItem => (ObjectModel::GetItem, None, false),
        Op::Negative => (ObjectModel::Neg, None, true),
        Op::BitwiseNot => (ObjectModel::Invert, None, true),
        _ => return None,
    };
    Some(slots)
}

/// Outcome of object operator dispatch: the method to call and how to bind
/// `self`.
#[derive(Clone, Copy, Debug)]
pub struct ObjectOpFunction {
    pub func: FuncId,
    /// `self` binds to the right operand and the left becomes the argument.
    pub is_rop: bool,
    /// The method takes no argument beyond `self`.
    pub is_unary: bool,
}

/// Resolve the method a binary/unary operation over objects dispatches to:
/// try the primary slot on the left class; if absent and the operator has a
/// reflected form, the reflected slot on the right class.
pub fn find_object_op_function(
    left: Option<&ClassDef>,
    right: Option<&ClassDef>,
    op: Op,
) -> Option<ObjectOpFunction> {
    let (primary, reflected, is_unary) = op_slots(op)?;

    if let Some(class) = left {
        if let Some(func) = class.object_model[primary.index()] {
            return Some(ObjectOpFunction {
                func,
                is_rop: false,
                is_unary,
            });
        }
    }
    if let (Some(slot), Some(class)) = (reflected, right) {
        if let Some(func) = class.object_model[slot.index()] {
            return Some(ObjectOpFunction {
                func,
                is_rop: true,
                is_unary,
            });
        }
    }
    None
}

/// Membership over an object container: `__contains__` on the right operand
/// with `self` bound to it.
pub fn find_contains_function(right: Option<&ClassDef>) -> Option<ObjectOpFunction> {
    let class = right?;
    let func = class.object_model[ObjectModel::Contains.index()]?;
    Some(ObjectOpFunction {
        func,
        is_rop: true,
        is_unary: false,
    })
}
