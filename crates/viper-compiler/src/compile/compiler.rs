//! Engine state and the instruction sequence stack.

use viper_core::{Interner, Name, SourceFile, Span, abi};

use crate::analyze::scopes::ScopeStack;
use crate::analyze::symbol_table::Symbol;
use crate::analyze::types::TypeInfo;
use crate::diagnostics::CompileError;
use crate::ir::{
    CompiledInstructions, IdentKind, Instruction, InstructionSequence, OperationInst,
    Requirements, StorageHint, StorageIdent, StrConstants,
};
use crate::parser::Parsed;
use crate::parser::ast::Statement;
use crate::pool::{FuncId, Pool, VarId, VarKind};

/// Bound on lowering nesting depth.
const SEQ_STACK_CAP: usize = 128;

/// Lowering output: the writer's input bundle plus the definition store the
/// writer resolves variables and signatures through.
#[derive(Debug)]
pub struct Lowered {
    pub instructions: CompiledInstructions,
    pub pool: Pool,
    pub interner: Interner,
}

/// Lower a parsed program.
pub fn compile(parsed: Parsed, source: &SourceFile) -> Result<Lowered, CompileError> {
    let Parsed {
        statements,
        pool,
        interner,
        module_scope,
    } = parsed;

    let mut compiler = Compiler {
        pool,
        interner,
        source,
        scopes: ScopeStack::new(),
        str_constants: StrConstants::new(),
        seq_stack: vec![Vec::new()],
        unique_counter: 0,
        excepts_goto: None,
        reqs: Requirements::default(),
        closure_sizes: Vec::new(),
        current_stmt_span: Span::point(0),
        current_op_span: Span::point(0),
    };

    compiler.scopes.push(module_scope);
    compiler.declare_scope_variables(module_scope);
    compiler.compile_statements(&statements)?;

    debug_assert_eq!(compiler.seq_stack.len(), 1, "unbalanced sequence stack");
    let seq = compiler.seq_stack.pop().expect("root sequence");

    Ok(Lowered {
        instructions: CompiledInstructions {
            str_constants: compiler.str_constants,
            seq,
            req: compiler.reqs,
            closure_sizes: compiler.closure_sizes,
        },
        pool: compiler.pool,
        interner: compiler.interner,
    })
}

pub struct Compiler<'s> {
    pub(super) pool: Pool,
    pub(super) interner: Interner,
    pub(super) source: &'s SourceFile,
    pub(super) scopes: ScopeStack,
    pub(super) str_constants: StrConstants,
    pub(super) seq_stack: Vec<InstructionSequence>,
    pub(super) unique_counter: usize,
    /// Label of the innermost enclosing except dispatcher.
    pub(super) excepts_goto: Option<String>,
    pub(super) reqs: Requirements,
    pub(super) closure_sizes: Vec<usize>,
    pub(super) current_stmt_span: Span,
    pub(super) current_op_span: Span,
}

impl<'s> Compiler<'s> {
    pub(super) fn compile_statements(
        &mut self,
        statements: &[Statement],
    ) -> Result<(), CompileError> {
        for statement in statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // sequence stack

    /// Collect the instructions `f` emits into their own sequence.
    pub(super) fn with_sequence(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<(), CompileError>,
    ) -> Result<InstructionSequence, CompileError> {
        if self.seq_stack.len() >= SEQ_STACK_CAP {
            return Err(CompileError::syntax(
                self.current_stmt_span,
                "construct nesting exceeds the compiler's sequence stack",
            ));
        }
        self.seq_stack.push(Vec::new());
        f(self)?;
        Ok(self.seq_stack.pop().expect("sequence pushed above"))
    }

    pub(super) fn add_instruction(&mut self, inst: Instruction) {
        if let Instruction::DeclareVariable(ident) = &inst {
            assert!(
                !(matches!(ident.kind, IdentKind::CStr(_)) && ident.info.is_untyped()),
                "declaring an untyped temporary"
            );
        }
        self.seq_stack
            .last_mut()
            .expect("sequence stack is never empty")
            .push(inst);
    }

    /// Emit `left = right`, declaring `left` when the hint carried no
    /// destination.
    pub(super) fn add_assignment(
        &mut self,
        hint: &StorageHint,
        left: StorageIdent,
        right: OperationInst,
    ) {
        let inst = if hint.has_dest() {
            Instruction::Assignment { left, right }
        } else {
            Instruction::DeclAssignment { left, right }
        };
        self.add_instruction(inst);
    }

    // ------------------------------------------------------------------
    // identifiers and storage

    /// Fresh synthesized identifier, unique within the compilation.
    pub(super) fn unique_id(&mut self) -> String {
        let id = format!("_np_{}", self.unique_counter);
        self.unique_counter += 1;
        id
    }

    /// `None` rendered as its runtime representation.
    pub(super) fn none_ident(&self) -> StorageIdent {
        StorageIdent::int_literal(0, TypeInfo::None)
    }

    /// Resolve a hint into a concrete output address, inventing a fresh
    /// identifier when the hint has no destination.
    pub(super) fn storage_ident_from_hint(&mut self, hint: &StorageHint) -> StorageIdent {
        match hint {
            StorageHint::Dest(ident) => ident.clone(),
            StorageHint::Typed(info) => {
                let name = self.unique_id();
                StorageIdent::cstr(name, info.clone())
            }
            StorageHint::None => {
                let name = self.unique_id();
                StorageIdent::cstr(name, TypeInfo::Untyped)
            }
        }
    }

    pub(super) fn storage_ident_from_variable(&self, id: VarId) -> StorageIdent {
        let var = self.pool.var(id);
        match var.kind {
            VarKind::SemiScoped => {
                StorageIdent::cstr(var.compiled_name.clone(), var.type_info.clone())
            }
            VarKind::Regular | VarKind::Argument | VarKind::Closure => {
                StorageIdent::var(id, var.type_info.clone())
            }
        }
    }

    pub(super) fn storage_ident_from_func(&self, id: FuncId) -> StorageIdent {
        let func = self.pool.func(id);
        StorageIdent::cstr(
            func.ns_ident.clone(),
            TypeInfo::Function(Box::new(func.sig.clone())),
        )
    }

    /// Fix a storage's type. A variable destination takes the type on its
    /// first assignment; later assignments must stay compatible.
    pub(super) fn set_storage_type_info(
        &mut self,
        ident: &mut StorageIdent,
        info: TypeInfo,
    ) -> Result<(), CompileError> {
        debug_assert!(!info.is_untyped(), "setting storage to untyped");

        ident.info = info.clone();
        if let IdentKind::Var(var_id) = ident.kind {
            let span = self.current_op_span;
            let var = self.pool.var_mut(var_id);
            if var.type_info.is_untyped() {
                var.type_info = info;
            } else if !var.type_info.compatible(&info) {
                let var = self.pool.var(var_id);
                return Err(CompileError::type_error(
                    span,
                    format!(
                        "variable `{}` of previously defined type `{}` trying to have \
                         type `{}` assigned",
                        self.interner.resolve(var.ident),
                        var.type_info.describe(),
                        info.describe(),
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Require `ident` to hold `type_info`, fixing it when still untyped.
    pub(super) fn check_storage_type_info(
        &mut self,
        ident: &mut StorageIdent,
        type_info: &TypeInfo,
    ) -> Result<(), CompileError> {
        debug_assert!(!type_info.is_untyped(), "checking storage against untyped");

        if ident.info.is_untyped() {
            return self.set_storage_type_info(ident, type_info.clone());
        }
        if let IdentKind::Var(var_id) = ident.kind {
            if self.pool.var(var_id).type_info.is_untyped() {
                self.pool.var_mut(var_id).type_info = type_info.clone();
            }
        }
        if !ident.info.compatible(type_info) {
            return Err(CompileError::type_error(
                self.current_op_span,
                format!(
                    "expecting type `{}` but got type `{}`",
                    ident.info.describe(),
                    type_info.describe(),
                ),
            ));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // scope access

    pub(super) fn get_symbol(&self, key: &str) -> Option<Symbol> {
        self.scopes.get(&self.pool, key)
    }

    pub(super) fn resolve_name(&self, name: Name) -> &str {
        self.interner.resolve(name)
    }

    /// Emit declarations for every variable of a scope; the writer decides
    /// placement (module-level hoisting, parameter and closure-slot
    /// skipping). Semi-scoped variables are declared at their loop instead.
    pub(super) fn declare_scope_variables(&mut self, scope: crate::pool::ScopeId) {
        let vars: Vec<VarId> = self
            .pool
            .scope(scope)
            .table
            .iter()
            .filter_map(|sym| match sym {
                Symbol::Variable(id) | Symbol::Global(id) => Some(*id),
                _ => None,
            })
            .collect();
        for id in vars {
            if self.pool.var(id).kind == VarKind::SemiScoped {
                continue;
            }
            let ident = StorageIdent::var(id, self.pool.var(id).type_info.clone());
            self.add_instruction(Instruction::DeclareVariable(ident));
        }
    }

    pub(super) fn require_math_lib(&mut self) {
        self.reqs.math = true;
    }

    // ------------------------------------------------------------------
    // shared renderers

    /// Copy a global function object into fresh (or hinted) storage.
    pub(super) fn render_function_object_copy(
        &mut self,
        hint: &StorageHint,
        func: FuncId,
    ) -> Result<StorageIdent, CompileError> {
        let mut rtval = self.storage_ident_from_hint(hint);
        let func_type = TypeInfo::Function(Box::new(self.pool.func(func).sig.clone()));
        self.check_storage_type_info(&mut rtval, &func_type)?;

        let source = self.storage_ident_from_func(func);
        self.add_assignment(hint, rtval.clone(), OperationInst::Copy(source));
        Ok(rtval)
    }

    /// Write `self` through a function object's context slot.
    pub(super) fn bind_self_to_function_object(
        &mut self,
        self_ident: StorageIdent,
        func_ident: StorageIdent,
    ) -> Result<(), CompileError> {
        let hint = StorageHint::Typed(TypeInfo::Context);
        let ctx = self.storage_ident_from_hint(&hint);
        self.add_instruction(Instruction::DeclAssignment {
            left: ctx.clone(),
            right: OperationInst::GetAttr {
                object: func_ident.clone(),
                attr: "ctx".into(),
            },
        });
        self.add_instruction(Instruction::Operation(OperationInst::SetAttr {
            object: ctx.clone(),
            attr: "self".into(),
            value: self_ident,
        }));
        self.add_instruction(Instruction::Operation(OperationInst::SetAttr {
            object: func_ident,
            attr: "ctx".into(),
            value: ctx,
        }));
        Ok(())
    }

    /// Reduce a value to something C can branch on.
    pub(super) fn convert_to_truthy(
        &mut self,
        id: StorageIdent,
    ) -> Result<StorageIdent, CompileError> {
        match &id.info {
            TypeInfo::CStr
            | TypeInfo::Unsigned
            | TypeInfo::Byte
            | TypeInfo::Pointer
            | TypeInfo::Exception
            | TypeInfo::Int
            | TypeInfo::Float
            | TypeInfo::Bool => Ok(id),
            TypeInfo::None => Ok(StorageIdent::int_literal(0, TypeInfo::Int)),
            TypeInfo::Function(_) => {
                let attr = self.read_attr_to_temp(id, "addr", TypeInfo::Pointer);
                Ok(attr)
            }
            TypeInfo::String => {
                let attr = self.read_attr_to_temp(id, "length", TypeInfo::Int);
                Ok(attr)
            }
            TypeInfo::List(_) | TypeInfo::Dict(_, _) => {
                let attr = self.read_attr_to_temp(id, "count", TypeInfo::Int);
                Ok(attr)
            }
            TypeInfo::Object(class_id) => {
                let class_id = *class_id;
                let bool_slot = crate::analyze::object_model::ObjectModel::Bool;
                let Some(func) = self.pool.class(class_id).object_model[bool_slot.index()]
                else {
                    return Ok(id);
                };
                let hint = StorageHint::Typed(TypeInfo::Bool);
                let rtval = self.storage_ident_from_hint(&hint);
                let func_ident =
                    self.render_function_object_copy(&StorageHint::None, func)?;
                self.bind_self_to_function_object(id, func_ident.clone())?;
                self.add_instruction(Instruction::DeclAssignment {
                    left: rtval.clone(),
                    right: OperationInst::FunctionCall {
                        function: func_ident,
                        args: Vec::new(),
                    },
                });
                Ok(rtval)
            }
            TypeInfo::Iter(_)
            | TypeInfo::DictItems(_, _)
            | TypeInfo::Tuple(_)
            | TypeInfo::Slice => Err(CompileError::unsupported(
                self.current_op_span,
                format!(
                    "truthiness is not implemented for type `{}`",
                    id.info.describe()
                ),
            )),
            TypeInfo::Untyped | TypeInfo::Context => Err(CompileError::type_error(
                self.current_op_span,
                "value has no usable truth value",
            )),
        }
    }

    fn read_attr_to_temp(
        &mut self,
        object: StorageIdent,
        attr: &str,
        info: TypeInfo,
    ) -> StorageIdent {
        let hint = StorageHint::Typed(info);
        let rtval = self.storage_ident_from_hint(&hint);
        self.add_instruction(Instruction::DeclAssignment {
            left: rtval.clone(),
            right: OperationInst::GetAttr {
                object,
                attr: attr.into(),
            },
        });
        rtval
    }

    /// The exception class flag for a name in an except clause.
    pub(super) fn exception_flag(
        &self,
        name: Name,
        span: Span,
    ) -> Result<u64, CompileError> {
        match abi::ExceptionFlag::from_class_name(self.interner.resolve(name)) {
            Some(flag) => Ok(flag.bit()),
            None => Err(CompileError::unsupported(
                span,
                format!(
                    "unrecognized exception type `{}`",
                    self.interner.resolve(name)
                ),
            )),
        }
    }
}
