//! Statement lowering.

use viper_core::{Name, abi};

use crate::analyze::object_model::op_assignment_slot;
use crate::analyze::symbol_table::Symbol;
use crate::analyze::types::TypeInfo;
use crate::diagnostics::CompileError;
use crate::ir::{Instruction, OperationInst, StorageHint, StorageIdent};
use crate::op::Op;
use crate::parser::ast::{
    Conditional, Expression, ItGroup, ItIdentifier, Operand, Statement, StmtKind,
    TryStmt,
};
use crate::pool::{ScopeKind, VarKind};

use super::compiler::Compiler;

impl Compiler<'_> {
    pub(super) fn compile_statement(
        &mut self,
        stmt: &Statement,
    ) -> Result<(), CompileError> {
        self.current_stmt_span = stmt.span;
        self.current_op_span = stmt.span;

        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.render_expression(&StorageHint::None, expr)?;
                Ok(())
            }
            StmtKind::Assignment { target, op, value } => {
                self.compile_assignment(target, *op, value)
            }
            StmtKind::Annotation { name, initial } => {
                self.compile_annotation(*name, initial.as_ref())
            }
            StmtKind::Return(value) => self.compile_return(value.as_ref()),
            StmtKind::For { it, iterable, body } => {
                self.compile_for_loop(it, iterable, &body.stmts)
            }
            StmtKind::While { condition, body } => {
                self.compile_while(condition, &body.stmts)
            }
            StmtKind::If(conditional) => self.compile_if(conditional),
            StmtKind::Try(try_stmt) => self.compile_try(try_stmt),
            StmtKind::Assert(value) => self.compile_assert(value),
            StmtKind::Break => {
                self.add_instruction(Instruction::Break);
                Ok(())
            }
            StmtKind::Continue => {
                self.add_instruction(Instruction::Continue);
                Ok(())
            }
            StmtKind::NoOp => Ok(()),
            StmtKind::Function { func, body } => self.compile_function(*func, body),
            StmtKind::Class { class, body } => self.compile_class(*class, body),
            StmtKind::Import => Err(CompileError::unsupported(
                stmt.span,
                "import compilation is not implemented",
            )),
            StmtKind::With { .. } => Err(CompileError::unsupported(
                stmt.span,
                "with statements are not implemented",
            )),
        }
    }

    // ------------------------------------------------------------------
    // assignments

    fn compile_assignment(
        &mut self,
        target: &Expression,
        op: Op,
        value: &Expression,
    ) -> Result<(), CompileError> {
        if !target.operations.is_empty() {
            return self.compile_complex_assignment(target, op, value);
        }
        if op == Op::Assign {
            self.compile_simple_assignment(target, value)
        } else {
            self.compile_simple_op_assignment(target, op, value)
        }
    }

    fn target_symbol(&self, target: &Expression) -> Result<Symbol, CompileError> {
        let Some(Operand::Token(token)) = target.operands.first() else {
            return Err(CompileError::syntax(
                target.span(),
                "cannot assign to this expression",
            ));
        };
        let key = self.source.slice(token.span);
        self.get_symbol(key).ok_or_else(|| {
            CompileError::name_error(token.span, format!("undefined symbol `{key}`"))
        })
    }

    fn compile_simple_assignment(
        &mut self,
        target: &Expression,
        value: &Expression,
    ) -> Result<(), CompileError> {
        let symbol = self.target_symbol(target)?;
        let (Symbol::Variable(var_id) | Symbol::Global(var_id)) = symbol else {
            return Err(CompileError::type_error(
                target.span(),
                "assignment target is not a variable",
            ));
        };
        let dest = self.storage_ident_from_variable(var_id);
        self.render_expression(&StorageHint::Dest(dest), value)?;
        Ok(())
    }

    fn compile_simple_op_assignment(
        &mut self,
        target: &Expression,
        op: Op,
        value: &Expression,
    ) -> Result<(), CompileError> {
        let symbol = self.target_symbol(target)?;
        let (Symbol::Variable(var_id) | Symbol::Global(var_id)) = symbol else {
            return Err(CompileError::type_error(
                target.span(),
                "assignment target is not a variable",
            ));
        };

        let var_ident = self.storage_ident_from_variable(var_id);
        let other = self.render_expression(&StorageHint::None, value)?;

        if matches!(var_ident.info, TypeInfo::Object(_)) {
            return self.compile_object_op_assignment(var_ident, other, op);
        }

        let inner = op
            .assignment_inner()
            .expect("compound assignments carry an inner operator");
        self.render_operation(
            &StorageHint::Dest(var_ident.clone()),
            inner,
            Some(var_ident),
            other,
        )?;
        Ok(())
    }

    /// In-place operator on an object: dispatch to `__iadd__` and friends,
    /// assigning the result back over the receiver.
    fn compile_object_op_assignment(
        &mut self,
        obj_ident: StorageIdent,
        other: StorageIdent,
        op: Op,
    ) -> Result<(), CompileError> {
        let TypeInfo::Object(class_id) = obj_ident.info else {
            unreachable!("in-place object dispatch needs an object receiver");
        };

        let slot = op_assignment_slot(op).expect("compound assignment operator");
        let Some(func) = self.pool.class(class_id).object_model[slot.index()] else {
            return Err(CompileError::type_error(
                self.current_stmt_span,
                format!(
                    "type `{}` does not support `{}`",
                    obj_ident.info.describe(),
                    op.as_str(),
                ),
            ));
        };

        let sig = self.pool.func(func).sig.clone();
        if sig.param_count() != 1 || !other.info.compatible(&sig.types[0]) {
            return Err(CompileError::type_error(
                self.current_stmt_span,
                format!(
                    "type `{}` does not support `{}` with a `{}` operand",
                    obj_ident.info.describe(),
                    op.as_str(),
                    other.info.describe(),
                ),
            ));
        }
        if !sig.return_type.compatible(&obj_ident.info) {
            return Err(CompileError::type_error(
                self.current_stmt_span,
                format!(
                    "expecting `{}` to return type `{}` but it returns `{}`",
                    slot.method_name(),
                    obj_ident.info.describe(),
                    sig.return_type.describe(),
                ),
            ));
        }

        let func_ident = self.render_function_object_copy(&StorageHint::None, func)?;
        self.bind_self_to_function_object(obj_ident.clone(), func_ident.clone())?;
        self.add_instruction(Instruction::Assignment {
            left: obj_ident,
            right: OperationInst::FunctionCall {
                function: func_ident,
                args: vec![other],
            },
        });
        Ok(())
    }

    /// Assignment whose target carries operations: `xs[i] = v`,
    /// `obj.member += v`, and friends. All but the last target operation
    /// render to a container value; the final accessor becomes a
    /// set-item/set-attr.
    fn compile_complex_assignment(
        &mut self,
        target: &Expression,
        op: Op,
        value: &Expression,
    ) -> Result<(), CompileError> {
        let last_op = *target
            .operations
            .last()
            .expect("complex targets have at least one operation");
        let last_operand = &target.operands[last_op.right];

        let mut container_expr = target.clone();
        container_expr.operations.pop();
        let container = self.render_expression(&StorageHint::None, &container_expr)?;

        match last_op.op {
            Op::GetItem => {
                let (key_type, value_type) = match &container.info {
                    TypeInfo::List(element) => (TypeInfo::Int, (**element).clone()),
                    TypeInfo::Dict(key, value) => ((**key).clone(), (**value).clone()),
                    other => {
                        return Err(CompileError::unsupported(
                            self.current_stmt_span,
                            format!(
                                "item assignment is not implemented for type `{}`",
                                other.describe()
                            ),
                        ));
                    }
                };

                let key =
                    self.render_operand(&StorageHint::Typed(key_type), last_operand)?;

                let rendered_value = if op == Op::Assign {
                    self.render_expression(&StorageHint::Typed(value_type), value)?
                } else {
                    // read-modify-write
                    let current = self.render_operation(
                        &StorageHint::Typed(value_type.clone()),
                        Op::GetItem,
                        Some(container.clone()),
                        key.clone(),
                    )?;
                    let other = self.render_expression(&StorageHint::None, value)?;

                    if matches!(current.info, TypeInfo::Object(_)) {
                        return self.compile_object_op_assignment(current, other, op);
                    }
                    let inner = op
                        .assignment_inner()
                        .expect("compound assignment operator");
                    self.render_operation(
                        &StorageHint::Typed(value_type),
                        inner,
                        Some(current),
                        other,
                    )?
                };

                self.compile_set_item(container, key, rendered_value)
            }
            Op::GetAttr => {
                let TypeInfo::Object(class_id) = container.info else {
                    return Err(CompileError::unsupported(
                        self.current_stmt_span,
                        format!(
                            "attribute assignment is not implemented for type `{}`",
                            container.info.describe()
                        ),
                    ));
                };
                let attr = match last_operand {
                    Operand::Token(token) => self.source.slice(token.span).to_owned(),
                    _ => {
                        return Err(CompileError::syntax(
                            self.current_stmt_span,
                            "cannot assign to this expression",
                        ));
                    }
                };
                let (member_type, method) = self.class_member_type(class_id, &attr)?;
                if method.is_some() {
                    return Err(CompileError::type_error(
                        self.current_stmt_span,
                        "cannot assign over a method",
                    ));
                }

                if op == Op::Assign {
                    let rendered_value = self
                        .render_expression(&StorageHint::Typed(member_type), value)?;
                    self.add_instruction(Instruction::Operation(
                        OperationInst::SetAttr {
                            object: container,
                            attr,
                            value: rendered_value,
                        },
                    ));
                    return Ok(());
                }

                let other = self.render_expression(&StorageHint::None, value)?;
                let current = self.render_get_attr_operation(
                    &StorageHint::Typed(member_type.clone()),
                    container.clone(),
                    &attr,
                )?;

                if matches!(member_type, TypeInfo::Object(_)) {
                    return self.compile_object_op_assignment(current, other, op);
                }

                let inner = op
                    .assignment_inner()
                    .expect("compound assignment operator");
                let combined = self.render_operation(
                    &StorageHint::Typed(member_type),
                    inner,
                    Some(current),
                    other,
                )?;
                self.add_instruction(Instruction::Operation(OperationInst::SetAttr {
                    object: container,
                    attr,
                    value: combined,
                }));
                Ok(())
            }
            _ => Err(CompileError::unsupported(
                self.current_stmt_span,
                "cannot assign through this operation",
            )),
        }
    }

    /// `container[key] = value` through the runtime.
    pub(super) fn compile_set_item(
        &mut self,
        container: StorageIdent,
        key: StorageIdent,
        value: StorageIdent,
    ) -> Result<(), CompileError> {
        match &container.info {
            TypeInfo::List(_) => {
                self.add_instruction(Instruction::Operation(OperationInst::CCall {
                    name: abi::LIST_SET_ITEM,
                    args: vec![container, key, value.by_reference()],
                }));
                Ok(())
            }
            TypeInfo::Dict(_, _) => {
                self.add_instruction(Instruction::Operation(OperationInst::CCall {
                    name: abi::DICT_SET_ITEM,
                    args: vec![container, key.by_reference(), value.by_reference()],
                }));
                Ok(())
            }
            other => Err(CompileError::unsupported(
                self.current_stmt_span,
                format!(
                    "item assignment is not implemented for type `{}`",
                    other.describe()
                ),
            )),
        }
    }

    // ------------------------------------------------------------------
    // annotations and returns

    fn compile_annotation(
        &mut self,
        name: Name,
        initial: Option<&Expression>,
    ) -> Result<(), CompileError> {
        // class members are declared by class lowering
        if self.scopes.in_class_body(&self.pool) {
            return Ok(());
        }

        let key = self.resolve_name(name).to_owned();
        let Some(symbol) = self.get_symbol(&key) else {
            return Err(CompileError::name_error(
                self.current_stmt_span,
                format!("undefined symbol `{key}`"),
            ));
        };
        let (Symbol::Variable(var_id) | Symbol::Global(var_id)) = symbol else {
            return Err(CompileError::syntax(
                self.current_stmt_span,
                "unexpected annotation",
            ));
        };

        if let Some(initial) = initial {
            let dest = self.storage_ident_from_variable(var_id);
            self.render_expression(&StorageHint::Dest(dest), initial)?;
        }
        Ok(())
    }

    fn compile_return(
        &mut self,
        value: Option<&Expression>,
    ) -> Result<(), CompileError> {
        let scope = self.pool.scope(self.scopes.current());
        let Some(func) = scope.func else {
            return Err(CompileError::syntax(
                self.current_stmt_span,
                "return outside of a function",
            ));
        };
        let should_free_closure = scope.kind == ScopeKind::ClosureParent;
        let return_type = self.pool.func(func).sig.return_type.clone();

        let rtval = match value {
            Some(value) => {
                self.render_expression(&StorageHint::Typed(return_type), value)?
            }
            None => self.none_ident(),
        };
        self.add_instruction(Instruction::Return {
            value: rtval,
            should_free_closure,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // loops

    /// Make an iterator out of an iterable value.
    fn convert_to_iterator(
        &mut self,
        hint: &StorageHint,
        iterable: StorageIdent,
    ) -> Result<StorageIdent, CompileError> {
        match &iterable.info {
            TypeInfo::List(element) => {
                let info = TypeInfo::Iter(element.clone());
                let mut rtval = self.storage_ident_from_hint(hint);
                self.check_storage_type_info(&mut rtval, &info)?;
                self.add_assignment(
                    hint,
                    rtval.clone(),
                    OperationInst::CCall1 {
                        name: abi::LIST_ITER,
                        arg: iterable,
                    },
                );
                Ok(rtval)
            }
            TypeInfo::Dict(key, _) => {
                let info = TypeInfo::Iter(key.clone());
                let mut rtval = self.storage_ident_from_hint(hint);
                self.check_storage_type_info(&mut rtval, &info)?;
                self.add_assignment(
                    hint,
                    rtval.clone(),
                    OperationInst::CCall1 {
                        name: abi::DICT_KEYS,
                        arg: iterable,
                    },
                );
                Ok(rtval)
            }
            TypeInfo::Iter(_) => {
                let info = iterable.info.clone();
                let mut rtval = self.storage_ident_from_hint(hint);
                self.check_storage_type_info(&mut rtval, &info)?;
                if hint.has_dest() {
                    self.add_instruction(Instruction::Assignment {
                        left: rtval.clone(),
                        right: OperationInst::Copy(iterable),
                    });
                    Ok(rtval)
                } else {
                    Ok(iterable)
                }
            }
            other => Err(CompileError::type_error(
                self.current_stmt_span,
                format!(
                    "iteration is implemented only for lists and dicts, got `{}`",
                    other.describe()
                ),
            )),
        }
    }

    /// Bring a loop target to life for the duration of its loop.
    fn init_semi_scoped_variable(
        &mut self,
        name: Name,
        type_info: TypeInfo,
    ) -> Result<(), CompileError> {
        let key = self.resolve_name(name).to_owned();
        let Some(Symbol::Variable(var_id)) = self.get_symbol(&key) else {
            return Err(CompileError::name_error(
                self.current_stmt_span,
                format!("undefined symbol `{key}`"),
            ));
        };
        if self.pool.var(var_id).kind != VarKind::SemiScoped {
            return Ok(());
        }

        let compiled_name = self.unique_id();
        let var = self.pool.var_mut(var_id);
        var.compiled_name = compiled_name;
        var.type_info = type_info;
        var.directly_in_scope = true;

        let ident = self.storage_ident_from_variable(var_id);
        self.add_instruction(Instruction::DeclareVariable(ident));
        Ok(())
    }

    fn release_semi_scoped_variable(&mut self, name: Name) {
        let key = self.resolve_name(name).to_owned();
        if let Some(Symbol::Variable(var_id)) = self.get_symbol(&key) {
            self.pool.var_mut(var_id).directly_in_scope = false;
        }
    }

    /// The two unpack targets of a dict-items loop, flattened.
    fn dict_items_targets(
        &self,
        it: &ItGroup,
    ) -> Result<(Name, Name), CompileError> {
        let ids: Vec<Name> = match it.identifiers.as_slice() {
            [ItIdentifier::Group(group)] => group
                .identifiers
                .iter()
                .filter_map(|id| match id {
                    ItIdentifier::Id(name, _) => Some(*name),
                    ItIdentifier::Group(_) => None,
                })
                .collect(),
            ids => ids
                .iter()
                .filter_map(|id| match id {
                    ItIdentifier::Id(name, _) => Some(*name),
                    ItIdentifier::Group(_) => None,
                })
                .collect(),
        };
        match ids.as_slice() {
            [key, value] => Ok((*key, *value)),
            _ => Err(CompileError::syntax(
                self.current_stmt_span,
                "expecting 2 values to unpack for dict items",
            )),
        }
    }

    fn compile_for_loop(
        &mut self,
        it: &ItGroup,
        iterable: &Expression,
        body: &[Statement],
    ) -> Result<(), CompileError> {
        let after_label = self.unique_id();

        let mut iterator_ident = None;
        let mut next_ident = None;

        let init = self.with_sequence(|c| {
            let iterable_ident = c.render_expression(&StorageHint::None, iterable)?;
            let iterator = c.convert_to_iterator(&StorageHint::None, iterable_ident)?;

            let TypeInfo::Iter(item) = iterator.info.clone() else {
                unreachable!("convert_to_iterator always yields an iterator");
            };
            let item = *item;

            // declare the loop-bound variables before the body references
            // them
            if let TypeInfo::DictItems(key, value) = &item {
                let (key_name, value_name) = c.dict_items_targets(it)?;
                c.init_semi_scoped_variable(key_name, (**key).clone())?;
                c.init_semi_scoped_variable(value_name, (**value).clone())?;

                // unpack through a temporary DictItem first
                let hint = StorageHint::Typed(item.clone());
                let temp = c.storage_ident_from_hint(&hint);
                c.add_instruction(Instruction::DeclareVariable(temp.clone()));
                next_ident = Some(temp);
            } else {
                let [ItIdentifier::Id(name, _)] = it.identifiers.as_slice() else {
                    return Err(CompileError::unsupported(
                        c.current_stmt_span,
                        "multiple loop variables are only supported for dict items",
                    ));
                };
                let name = *name;
                c.init_semi_scoped_variable(name, item.clone())?;
                let key = c.resolve_name(name).to_owned();
                let Some(Symbol::Variable(var_id)) = c.get_symbol(&key) else {
                    unreachable!("loop target declared above");
                };
                next_ident = Some(c.storage_ident_from_variable(var_id));
            }

            iterator_ident = Some(iterator);
            Ok(())
        })?;

        let iterator = iterator_ident.expect("set while lowering init");
        let unpack = next_ident.expect("set while lowering init");
        let TypeInfo::Iter(item) = iterator.info.clone() else {
            unreachable!("convert_to_iterator always yields an iterator");
        };
        let item = *item;

        let before = self.with_sequence(|c| {
            c.add_instruction(Instruction::IterNext {
                iter: iterator.clone(),
                unpack: unpack.clone(),
            });

            // break when the iterator is exhausted
            let hint = StorageHint::Typed(TypeInfo::Pointer);
            let stop = c.storage_ident_from_hint(&hint);
            c.add_instruction(Instruction::DeclAssignment {
                left: stop.clone(),
                right: OperationInst::GetAttr {
                    object: iterator.clone(),
                    attr: "next_data".into(),
                },
            });
            let break_body = c.with_sequence(|c| {
                c.add_instruction(Instruction::Break);
                Ok(())
            })?;
            c.add_instruction(Instruction::If {
                condition: stop,
                negate: true,
                body: break_body,
            });

            if let TypeInfo::DictItems(_, _) = &item {
                let (key_name, value_name) = c.dict_items_targets(it)?;
                let key_ident = c.semi_scoped_ident(key_name)?;
                let value_ident = c.semi_scoped_ident(value_name)?;

                let ptr_hint = StorageHint::Typed(TypeInfo::Pointer);
                let pointer = c.storage_ident_from_hint(&ptr_hint);
                c.add_instruction(Instruction::DeclAssignment {
                    left: pointer.clone(),
                    right: OperationInst::GetAttr {
                        object: unpack.clone(),
                        attr: "key".into(),
                    },
                });
                c.add_instruction(Instruction::Assignment {
                    left: key_ident.clone(),
                    right: OperationInst::Deref {
                        reference: pointer.clone(),
                        pointee: key_ident.info.clone(),
                    },
                });
                c.add_instruction(Instruction::Assignment {
                    left: pointer.clone(),
                    right: OperationInst::GetAttr {
                        object: unpack.clone(),
                        attr: "val".into(),
                    },
                });
                c.add_instruction(Instruction::Assignment {
                    left: value_ident.clone(),
                    right: OperationInst::Deref {
                        reference: pointer,
                        pointee: value_ident.info.clone(),
                    },
                });
            }
            Ok(())
        })?;

        let after = self.with_sequence(|c| {
            c.add_instruction(Instruction::Label(after_label.clone()));
            Ok(())
        })?;

        let body_seq = self.with_sequence(|c| c.compile_statements(body))?;

        // the loop targets die with the loop
        if matches!(item, TypeInfo::DictItems(_, _)) {
            let (key_name, value_name) = self.dict_items_targets(it)?;
            self.release_semi_scoped_variable(key_name);
            self.release_semi_scoped_variable(value_name);
        } else if let ItIdentifier::Id(name, _) = &it.identifiers[0] {
            self.release_semi_scoped_variable(*name);
        }

        self.add_instruction(Instruction::Loop {
            condition: StorageIdent::int_literal(1, TypeInfo::Int),
            after_label,
            init,
            before,
            body: body_seq,
            after,
        });
        Ok(())
    }

    fn semi_scoped_ident(&self, name: Name) -> Result<StorageIdent, CompileError> {
        let key = self.resolve_name(name).to_owned();
        match self.get_symbol(&key) {
            Some(Symbol::Variable(var_id)) => Ok(self.storage_ident_from_variable(var_id)),
            _ => Err(CompileError::name_error(
                self.current_stmt_span,
                format!("undefined symbol `{key}`"),
            )),
        }
    }

    fn compile_while(
        &mut self,
        condition: &Expression,
        body: &[Statement],
    ) -> Result<(), CompileError> {
        let after_label = self.unique_id();

        let before = self.with_sequence(|c| {
            let rendered = c.render_expression(&StorageHint::None, condition)?;
            let truthy = c.convert_to_truthy(rendered)?;
            let break_body = c.with_sequence(|c| {
                c.add_instruction(Instruction::Break);
                Ok(())
            })?;
            c.add_instruction(Instruction::If {
                condition: truthy,
                negate: true,
                body: break_body,
            });
            Ok(())
        })?;

        let body_seq = self.with_sequence(|c| c.compile_statements(body))?;
        let after = self.with_sequence(|c| {
            c.add_instruction(Instruction::Label(after_label.clone()));
            Ok(())
        })?;

        self.add_instruction(Instruction::Loop {
            condition: StorageIdent::int_literal(1, TypeInfo::Int),
            after_label,
            init: Vec::new(),
            before,
            body: body_seq,
            after,
        });
        Ok(())
    }

    fn compile_if(&mut self, conditional: &Conditional) -> Result<(), CompileError> {
        let needs_exit =
            !conditional.else_body.stmts.is_empty() || !conditional.elifs.is_empty();
        let exit_label = needs_exit.then(|| self.unique_id());

        let rendered =
            self.render_expression(&StorageHint::None, &conditional.condition)?;
        let truthy = self.convert_to_truthy(rendered)?;
        let body = self.with_sequence(|c| {
            c.compile_statements(&conditional.body.stmts)?;
            if let Some(label) = &exit_label {
                c.add_instruction(Instruction::Goto(label.clone()));
            }
            Ok(())
        })?;
        self.add_instruction(Instruction::If {
            condition: truthy,
            negate: false,
            body,
        });

        for (elif_condition, elif_body) in &conditional.elifs {
            let rendered = self.render_expression(&StorageHint::None, elif_condition)?;
            let truthy = self.convert_to_truthy(rendered)?;
            let body = self.with_sequence(|c| {
                c.compile_statements(&elif_body.stmts)?;
                if let Some(label) = &exit_label {
                    c.add_instruction(Instruction::Goto(label.clone()));
                }
                Ok(())
            })?;
            self.add_instruction(Instruction::If {
                condition: truthy,
                negate: false,
                body,
            });
        }

        if !conditional.else_body.stmts.is_empty() {
            let body =
                self.with_sequence(|c| c.compile_statements(&conditional.else_body.stmts))?;
            self.add_instruction(Instruction::Else(body));
        }

        if let Some(label) = exit_label {
            self.add_instruction(Instruction::Label(label));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // exceptions

    /// After every statement of a try body: jump to the except dispatcher if
    /// the runtime raised.
    fn check_exceptions(&mut self) -> Result<(), CompileError> {
        let target = self
            .excepts_goto
            .clone()
            .expect("exception checks only run inside a try body");
        let body = self.with_sequence(|c| {
            c.add_instruction(Instruction::Goto(target));
            Ok(())
        })?;
        self.add_instruction(Instruction::If {
            condition: StorageIdent::cstr(abi::GLOBAL_EXCEPTION, TypeInfo::Exception),
            negate: false,
            body,
        });
        Ok(())
    }

    fn compile_try(&mut self, try_stmt: &TryStmt) -> Result<(), CompileError> {
        let old_goto = self.excepts_goto.take();
        let finally_label = self.unique_id();
        let excepts_label = self.unique_id();
        self.excepts_goto = Some(excepts_label.clone());

        let current_excepts =
            StorageIdent::cstr(abi::CURRENT_EXCEPTS, TypeInfo::Unsigned);

        // remember the old excepts bitmask
        let old_hint = StorageHint::Typed(TypeInfo::Unsigned);
        let old_excepts = self.storage_ident_from_hint(&old_hint);
        self.add_instruction(Instruction::DeclAssignment {
            left: old_excepts.clone(),
            right: OperationInst::Copy(current_excepts.clone()),
        });

        // build the new bitmask: zero, then OR in every caught class
        self.add_instruction(Instruction::Assignment {
            left: current_excepts.clone(),
            right: OperationInst::Copy(StorageIdent::int_literal(0, TypeInfo::Unsigned)),
        });
        for except in &try_stmt.excepts {
            for &(name, span) in &except.exceptions {
                let flag = self.exception_flag(name, span)?;
                self.add_instruction(Instruction::Assignment {
                    left: current_excepts.clone(),
                    right: OperationInst::Intrinsic {
                        op: Op::BitwiseOr,
                        left: Some(current_excepts.clone()),
                        right: StorageIdent::int_literal(flag as i64, TypeInfo::Unsigned),
                    },
                });
            }
        }

        // try body, an exception check after every statement
        for stmt in &try_stmt.body.stmts {
            self.compile_statement(stmt)?;
            self.check_exceptions()?;
        }

        // nothing raised: straight to finally
        let goto_finally = self.with_sequence(|c| {
            c.add_instruction(Instruction::Goto(finally_label.clone()));
            Ok(())
        })?;
        self.add_instruction(Instruction::If {
            condition: StorageIdent::cstr(abi::GLOBAL_EXCEPTION, TypeInfo::Exception),
            negate: true,
            body: goto_finally,
        });

        // dispatcher: read the live exception, test each block's bitmask
        self.add_instruction(Instruction::Label(excepts_label));
        let exception_hint = StorageHint::Typed(TypeInfo::Exception);
        let exception = self.storage_ident_from_hint(&exception_hint);
        self.add_instruction(Instruction::DeclAssignment {
            left: exception.clone(),
            right: OperationInst::CCall {
                name: abi::GET_EXCEPTION,
                args: Vec::new(),
            },
        });

        let mask_hint = StorageHint::Typed(TypeInfo::Unsigned);
        let block_mask = self.storage_ident_from_hint(&mask_hint);
        self.add_instruction(Instruction::DeclareVariable(block_mask.clone()));

        for except in &try_stmt.excepts {
            if except.as_name.is_some() {
                return Err(CompileError::unsupported(
                    except.span,
                    "capturing an exception with `as` is not implemented",
                ));
            }

            self.add_instruction(Instruction::Assignment {
                left: block_mask.clone(),
                right: OperationInst::Copy(StorageIdent::int_literal(
                    0,
                    TypeInfo::Unsigned,
                )),
            });
            for &(name, span) in &except.exceptions {
                let flag = self.exception_flag(name, span)?;
                self.add_instruction(Instruction::Assignment {
                    left: block_mask.clone(),
                    right: OperationInst::Intrinsic {
                        op: Op::BitwiseOr,
                        left: Some(block_mask.clone()),
                        right: StorageIdent::int_literal(flag as i64, TypeInfo::Unsigned),
                    },
                });
            }

            let type_hint = StorageHint::Typed(TypeInfo::Unsigned);
            let exc_type = self.storage_ident_from_hint(&type_hint);
            self.add_instruction(Instruction::DeclAssignment {
                left: exc_type.clone(),
                right: OperationInst::GetAttr {
                    object: exception.clone(),
                    attr: "type".into(),
                },
            });
            let hit_hint = StorageHint::Typed(TypeInfo::Unsigned);
            let hit = self.storage_ident_from_hint(&hit_hint);
            self.add_instruction(Instruction::DeclAssignment {
                left: hit.clone(),
                right: OperationInst::Intrinsic {
                    op: Op::BitwiseAnd,
                    left: Some(exc_type),
                    right: block_mask.clone(),
                },
            });
            let condition = self.convert_to_truthy(hit)?;

            let body = self.with_sequence(|c| {
                c.compile_statements(&except.body.stmts)?;
                c.add_instruction(Instruction::Goto(finally_label.clone()));
                Ok(())
            })?;
            self.add_instruction(Instruction::If {
                condition,
                negate: false,
                body,
            });
        }

        // finally runs on every path and restores the outer mask
        self.add_instruction(Instruction::Label(finally_label));
        self.compile_statements(&try_stmt.finally.stmts)?;
        self.add_instruction(Instruction::Assignment {
            left: current_excepts,
            right: OperationInst::Copy(old_excepts),
        });

        self.excepts_goto = old_goto;
        Ok(())
    }

    fn compile_assert(&mut self, value: &Expression) -> Result<(), CompileError> {
        let line = self.source.line_of(self.current_stmt_span);
        let rendered = self.render_expression(&StorageHint::None, value)?;
        let truthy = self.convert_to_truthy(rendered)?;

        let body = self.with_sequence(|c| {
            c.add_instruction(Instruction::Operation(OperationInst::CCall1 {
                name: abi::ASSERTION_ERROR,
                arg: StorageIdent::int_literal(line as i64, TypeInfo::Int),
            }));
            Ok(())
        })?;
        self.add_instruction(Instruction::If {
            condition: truthy,
            negate: true,
            body,
        });
        Ok(())
    }
}
