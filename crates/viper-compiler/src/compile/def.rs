//! Function and class lowering.

use crate::analyze::symbol_table::Symbol;
use crate::analyze::types::TypeInfo;
use crate::diagnostics::CompileError;
use crate::ir::{Instruction, OperationInst, StorageIdent};
use crate::parser::ast::{Block, StmtKind};
use crate::pool::{ClassId, FuncId, ScopeId, ScopeKind, VarKind};

use super::compiler::Compiler;

impl Compiler<'_> {
    /// Lower a `def`: declare the module-level function object, emit the C
    /// function definition with the lowered body, and - for closure parents -
    /// resolve the context block layout once every type is known.
    pub(super) fn compile_function(
        &mut self,
        func: FuncId,
        body: &Block,
    ) -> Result<(), CompileError> {
        let scope_id = self.pool.func(func).scope;
        let scope_kind = self.pool.scope(scope_id).kind;
        let sig = self.pool.func(func).sig.clone();
        let self_param = self.pool.func(func).self_param;
        let self_type = self.pool.func(func).self_type.clone();

        self.scopes.push(scope_id);

        let function_name = self.unique_id();
        let fn_variable = self.storage_ident_from_func(func);

        self.add_instruction(Instruction::DeclareVariable(fn_variable.clone()));
        self.add_instruction(Instruction::Operation(OperationInst::SetAttr {
            object: fn_variable.clone(),
            attr: "addr".into(),
            value: StorageIdent::cstr(function_name.clone(), TypeInfo::Pointer),
        }));
        if scope_kind == ScopeKind::ClosureChild {
            // closure children run against their parent's context block
            self.add_instruction(Instruction::Operation(OperationInst::SetAttr {
                object: fn_variable.clone(),
                attr: "ctx".into(),
                value: StorageIdent::cstr("__ctx__", TypeInfo::Context),
            }));
        }

        let mut closure_slot = None;

        let body_seq = self.with_sequence(|c| {
            if scope_kind == ScopeKind::ClosureParent {
                let slot = c.closure_sizes.len();
                c.closure_sizes.push(0);
                c.add_instruction(Instruction::InitClosure { size_slot: slot });
                closure_slot = Some(slot);
            }

            c.declare_scope_variables(scope_id);

            // closure parents re-home their C parameters into the context
            // block so nested functions can reach them
            if scope_kind == ScopeKind::ClosureParent {
                if let Some(params) = sig.params.clone() {
                    for (i, param) in params.iter().enumerate() {
                        let key = c.resolve_name(*param).to_owned();
                        if let Some(Symbol::Variable(var_id)) = c.get_symbol(&key) {
                            if c.pool.var(var_id).kind == VarKind::Closure {
                                let dest = c.storage_ident_from_variable(var_id);
                                c.add_instruction(Instruction::Assignment {
                                    left: dest,
                                    right: OperationInst::Copy(StorageIdent::cstr(
                                        key,
                                        sig.types[i].clone(),
                                    )),
                                });
                            }
                        }
                    }
                }
            }

            if let Some(self_name) = self_param {
                // unpack `self` out of the context
                let key = c.resolve_name(self_name).to_owned();
                let Some(Symbol::Variable(var_id)) = c.get_symbol(&key) else {
                    unreachable!("the parser declares `self` in the method scope");
                };
                let mut dest = c.storage_ident_from_variable(var_id);
                c.check_storage_type_info(&mut dest, &self_type)?;
                c.add_instruction(Instruction::Assignment {
                    left: dest,
                    right: OperationInst::GetAttr {
                        object: StorageIdent::cstr("__ctx__", TypeInfo::Context),
                        attr: "self".into(),
                    },
                });
            }

            c.compile_statements(&body.stmts)?;

            if matches!(sig.return_type, TypeInfo::None) {
                let none = c.none_ident();
                c.add_instruction(Instruction::Return {
                    value: none,
                    should_free_closure: scope_kind == ScopeKind::ClosureParent,
                });
            }
            Ok(())
        })?;

        self.add_instruction(Instruction::DefineFunction {
            function_name,
            var_ident: fn_variable,
            signature: sig,
            body: body_seq,
        });

        if let Some(slot) = closure_slot {
            // every type is resolved now; lay out the context block
            let mut total = 0;
            self.assign_closure_offsets(scope_id, &mut total)?;
            self.closure_sizes[slot] = total;
        }

        self.scopes.pop();
        Ok(())
    }

    /// Walk a scope tree and hand each closure variable its byte offset in
    /// the context block; nested function scopes continue the same block.
    fn assign_closure_offsets(
        &mut self,
        scope_id: ScopeId,
        running: &mut usize,
    ) -> Result<(), CompileError> {
        let symbols: Vec<Symbol> =
            self.pool.scope(scope_id).table.iter().cloned().collect();
        for symbol in symbols {
            match symbol {
                Symbol::Variable(var_id)
                    if self.pool.var(var_id).kind == VarKind::Closure =>
                {
                    let info = self.pool.var(var_id).type_info.clone();
                    let size = info.size_of().ok_or_else(|| {
                        CompileError::type_error(
                            self.current_stmt_span,
                            format!(
                                "size data for type `{}` not specified",
                                info.describe()
                            ),
                        )
                    })?;
                    self.pool.var_mut(var_id).closure_offset = *running;
                    *running += size;
                }
                Symbol::Function(func_id) => {
                    let nested = self.pool.func(func_id).scope;
                    self.assign_closure_offsets(nested, running)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Lower a `class`: fix the byte size, then emit the class definition
    /// whose body holds the method definitions. Member annotations were
    /// consumed during scope setup.
    pub(super) fn compile_class(
        &mut self,
        class: ClassId,
        body: &Block,
    ) -> Result<(), CompileError> {
        let sig = self.pool.class(class).sig.clone();

        let mut nbytes = 0;
        for member_type in &sig.types {
            nbytes += member_type.size_of().ok_or_else(|| {
                CompileError::type_error(
                    self.current_stmt_span,
                    format!(
                        "size data for type `{}` not specified",
                        member_type.describe()
                    ),
                )
            })?;
        }
        self.pool.class_mut(class).nbytes = nbytes;

        let scope_id = self.pool.class(class).scope;
        self.scopes.push(scope_id);

        let body_seq = self.with_sequence(|c| {
            for stmt in &body.stmts {
                match &stmt.kind {
                    StmtKind::Function { func, body } => {
                        c.current_stmt_span = stmt.span;
                        c.compile_function(*func, body)?;
                    }
                    StmtKind::Annotation { .. } | StmtKind::NoOp => {}
                    _ => {
                        return Err(CompileError::unsupported(
                            stmt.span,
                            "only function definitions and annotations are \
                             implemented within a class body",
                        ));
                    }
                }
            }
            Ok(())
        })?;

        let class_name = self.pool.class(class).ns_ident.clone();
        self.add_instruction(Instruction::DefineClass {
            class_name,
            signature: sig,
            body: body_seq,
        });

        self.scopes.pop();
        Ok(())
    }
}
