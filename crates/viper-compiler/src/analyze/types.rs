//! Type representation and compatibility.

use crate::parser::ast::Expression;
use crate::pool::ClassId;

/// The resolved type of a value.
///
/// Composite variants own their element types; `Object` back-references its
/// class through the pool; `Function` carries its signature so call sites can
/// marshal arguments and cast the address without another lookup.
#[derive(Clone, Debug, Default)]
pub enum TypeInfo {
    #[default]
    Untyped,
    None,
    Int,
    Unsigned,
    Float,
    Bool,
    String,
    Byte,
    Pointer,
    CStr,
    List(Box<TypeInfo>),
    Dict(Box<TypeInfo>, Box<TypeInfo>),
    Tuple(Vec<TypeInfo>),
    DictItems(Box<TypeInfo>, Box<TypeInfo>),
    Iter(Box<TypeInfo>),
    Slice,
    Object(ClassId),
    Function(Box<Signature>),
    Context,
    Exception,
}

impl TypeInfo {
    #[inline]
    pub fn is_untyped(&self) -> bool {
        matches!(self, TypeInfo::Untyped)
    }

    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, TypeInfo::Int | TypeInfo::Float)
    }

    /// Structural compatibility: containers require matching element types,
    /// objects the same class; function types are interchangeable (the call
    /// site re-checks against the concrete signature).
    pub fn compatible(&self, other: &TypeInfo) -> bool {
        match (self, other) {
            (TypeInfo::List(a), TypeInfo::List(b)) => a.compatible(b),
            (TypeInfo::Iter(a), TypeInfo::Iter(b)) => a.compatible(b),
            (TypeInfo::Dict(ka, va), TypeInfo::Dict(kb, vb)) => {
                ka.compatible(kb) && va.compatible(vb)
            }
            (TypeInfo::DictItems(ka, va), TypeInfo::DictItems(kb, vb)) => {
                ka.compatible(kb) && va.compatible(vb)
            }
            (TypeInfo::Tuple(xs), TypeInfo::Tuple(ys)) => {
                xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| x.compatible(y))
            }
            (TypeInfo::Object(a), TypeInfo::Object(b)) => a == b,
            (TypeInfo::Function(_), TypeInfo::Function(_)) => true,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }

    /// C size of a value of this type, per the runtime ABI. `None` for types
    /// that never occupy a member or closure slot.
    pub fn size_of(&self) -> Option<usize> {
        let size = match self {
            TypeInfo::Int | TypeInfo::Unsigned => 8,
            TypeInfo::Float => 8,
            TypeInfo::Bool | TypeInfo::Byte => 1,
            TypeInfo::Pointer | TypeInfo::CStr => 8,
            TypeInfo::String => 24,
            TypeInfo::List(_) | TypeInfo::Dict(_, _) => 8,
            TypeInfo::Object(_) => 8,
            TypeInfo::Function(_) => 24,
            TypeInfo::Context => 16,
            TypeInfo::Iter(_) => 24,
            TypeInfo::DictItems(_, _) => 16,
            TypeInfo::Exception => 8,
            TypeInfo::Untyped
            | TypeInfo::None
            | TypeInfo::Tuple(_)
            | TypeInfo::Slice => return Option::None,
        };
        Some(size)
    }

    /// Short display name used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TypeInfo::Untyped => "untyped".into(),
            TypeInfo::None => "None".into(),
            TypeInfo::Int => "int".into(),
            TypeInfo::Unsigned => "unsigned".into(),
            TypeInfo::Float => "float".into(),
            TypeInfo::Bool => "bool".into(),
            TypeInfo::String => "str".into(),
            TypeInfo::Byte => "byte".into(),
            TypeInfo::Pointer => "pointer".into(),
            TypeInfo::CStr => "cstr".into(),
            TypeInfo::List(inner) => format!("list[{}]", inner.describe()),
            TypeInfo::Dict(k, v) => format!("dict[{}, {}]", k.describe(), v.describe()),
            TypeInfo::Tuple(xs) => {
                let inner: Vec<_> = xs.iter().map(|t| t.describe()).collect();
                format!("tuple[{}]", inner.join(", "))
            }
            TypeInfo::DictItems(k, v) => {
                format!("dict_items[{}, {}]", k.describe(), v.describe())
            }
            TypeInfo::Iter(inner) => format!("iter[{}]", inner.describe()),
            TypeInfo::Slice => "slice".into(),
            TypeInfo::Object(_) => "object".into(),
            TypeInfo::Function(_) => "function".into(),
            TypeInfo::Context => "context".into(),
            TypeInfo::Exception => "exception".into(),
        }
    }
}

/// A callable's shape.
///
/// `params` is present for user-written `def`s and class member signatures;
/// a signature synthesized from a bare type hint has no parameter names and
/// accepts positional arguments only. `defaults` apply to the trailing
/// parameter slots.
#[derive(Clone, Debug, Default)]
pub struct Signature {
    pub params: Option<Vec<viper_core::Name>>,
    pub types: Vec<TypeInfo>,
    pub defaults: Vec<Expression>,
    pub return_type: TypeInfo,
}

impl Signature {
    #[inline]
    pub fn param_count(&self) -> usize {
        self.types.len()
    }

    /// Parameters without defaults; always a prefix of the parameter list.
    #[inline]
    pub fn required_count(&self) -> usize {
        self.types.len() - self.defaults.len()
    }
}
