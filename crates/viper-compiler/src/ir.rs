//! The linear instruction IR handed to the C writer.
//!
//! Lowering turns statements and expressions into sequences of these
//! instructions; nested constructs (loops, conditionals, function bodies)
//! carry their own sub-sequences. The writer walks the tree once, branching
//! on each tag.

use indexmap::IndexMap;

use crate::analyze::types::{Signature, TypeInfo};
use crate::op::Op;
use crate::pool::VarId;

/// Identity of a rendered value: a name, a literal, or a variable
/// reference, together with its resolved type. `reference` requests
/// address-of in the emitted C.
#[derive(Clone, Debug)]
pub struct StorageIdent {
    pub kind: IdentKind,
    pub reference: bool,
    pub info: TypeInfo,
}

#[derive(Clone, Debug)]
pub enum IdentKind {
    /// A raw C identifier: synthesized temporaries, runtime globals,
    /// mangled definition names.
    CStr(String),
    Var(VarId),
    IntLiteral(i64),
    FloatLiteral(f64),
    /// Index into the string-constant table.
    StrLiteral(usize),
}

impl StorageIdent {
    pub fn cstr(name: impl Into<String>, info: TypeInfo) -> Self {
        Self {
            kind: IdentKind::CStr(name.into()),
            reference: false,
            info,
        }
    }

    pub fn var(id: VarId, info: TypeInfo) -> Self {
        Self {
            kind: IdentKind::Var(id),
            reference: false,
            info,
        }
    }

    pub fn int_literal(value: i64, info: TypeInfo) -> Self {
        Self {
            kind: IdentKind::IntLiteral(value),
            reference: false,
            info,
        }
    }

    pub fn float_literal(value: f64) -> Self {
        Self {
            kind: IdentKind::FloatLiteral(value),
            reference: false,
            info: TypeInfo::Float,
        }
    }

    pub fn str_literal(index: usize) -> Self {
        Self {
            kind: IdentKind::StrLiteral(index),
            reference: false,
            info: TypeInfo::String,
        }
    }

    /// The same storage, passed by address.
    pub fn by_reference(mut self) -> Self {
        self.reference = true;
        self
    }
}

/// Optional destination for an expression's result. With no destination the
/// renderer invents a fresh identifier and emits a `DeclAssignment`; a
/// destination hint emits a plain `Assignment` into it. `Typed` constrains
/// the result type without naming a destination.
#[derive(Clone, Debug, Default)]
pub enum StorageHint {
    #[default]
    None,
    Typed(TypeInfo),
    Dest(StorageIdent),
}

impl StorageHint {
    /// The type expectation carried by this hint, if any.
    pub fn expected(&self) -> TypeInfo {
        match self {
            StorageHint::None => TypeInfo::Untyped,
            StorageHint::Typed(info) => info.clone(),
            StorageHint::Dest(ident) => ident.info.clone(),
        }
    }

    /// Whether a concrete destination is present.
    #[inline]
    pub fn has_dest(&self) -> bool {
        matches!(self, StorageHint::Dest(_))
    }
}

/// A computation that produces (or performs) one C expression.
#[derive(Clone, Debug)]
pub enum OperationInst {
    /// Maps to a plain C operator. `left` is absent for unary operators.
    Intrinsic {
        op: Op,
        left: Option<StorageIdent>,
        right: StorageIdent,
    },
    /// Call through a function object: cast `.addr`, pass `.ctx` first.
    FunctionCall {
        function: StorageIdent,
        args: Vec<StorageIdent>,
    },
    /// Direct call of a named runtime function.
    CCall {
        name: &'static str,
        args: Vec<StorageIdent>,
    },
    /// Single-argument runtime call; common enough to carry inline.
    CCall1 {
        name: &'static str,
        arg: StorageIdent,
    },
    GetAttr {
        object: StorageIdent,
        attr: String,
    },
    SetAttr {
        object: StorageIdent,
        attr: String,
        value: StorageIdent,
    },
    Copy(StorageIdent),
    /// `*((T*)ref)`
    Deref {
        reference: StorageIdent,
        pointee: TypeInfo,
    },
}

pub type InstructionSequence = Vec<Instruction>;

#[derive(Clone, Debug)]
pub enum Instruction {
    NoOp,
    /// Writer decides placement by scope (module-level declares hoist out of
    /// the init section).
    DeclareVariable(StorageIdent),
    Assignment {
        left: StorageIdent,
        right: OperationInst,
    },
    /// Assignment that also declares its destination.
    DeclAssignment {
        left: StorageIdent,
        right: OperationInst,
    },
    /// An operation as a statement; the result is discarded.
    Operation(OperationInst),
    Return {
        value: StorageIdent,
        should_free_closure: bool,
    },
    If {
        condition: StorageIdent,
        negate: bool,
        body: InstructionSequence,
    },
    Else(InstructionSequence),
    Goto(String),
    Label(String),
    Break,
    /// Emitted as a goto to the innermost loop's after-label.
    Continue,
    Loop {
        condition: StorageIdent,
        after_label: String,
        init: InstructionSequence,
        before: InstructionSequence,
        body: InstructionSequence,
        after: InstructionSequence,
    },
    DefineFunction {
        /// The emitted C function's name.
        function_name: String,
        /// The module-level function object variable.
        var_ident: StorageIdent,
        signature: Signature,
        body: InstructionSequence,
    },
    DefineClass {
        /// The emitted struct typedef name.
        class_name: String,
        signature: Signature,
        body: InstructionSequence,
    },
    /// Advance an iterator and unpack its next value, if any.
    IterNext {
        iter: StorageIdent,
        unpack: StorageIdent,
    },
    /// Allocate the closure context block. The byte size is not known until
    /// the owning body finishes lowering, so it lives in a side table.
    InitClosure {
        size_slot: usize,
    },
}

/// Library requirements discovered during lowering.
#[derive(Clone, Copy, Debug, Default)]
pub struct Requirements {
    /// Emitted code calls into `<math.h>` (`pow`, `fmod`).
    pub math: bool,
}

/// Deduplicating, insertion-ordered string-constant table. Indices are dense
/// and stable; the writer emits the table in order.
#[derive(Debug, Default)]
pub struct StrConstants {
    map: IndexMap<String, ()>,
}

impl StrConstants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a literal, returning its dense index.
    pub fn put(&mut self, s: &str) -> usize {
        if let Some(index) = self.map.get_index_of(s) {
            return index;
        }
        let (index, _) = self.map.insert_full(s.to_owned(), ());
        index
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(|s| s.as_str())
    }
}

/// Everything the writer consumes.
#[derive(Debug)]
pub struct CompiledInstructions {
    pub str_constants: StrConstants,
    pub seq: InstructionSequence,
    pub req: Requirements,
    /// Closure block sizes, indexed by `Instruction::InitClosure::size_slot`.
    pub closure_sizes: Vec<usize>,
}
