//! Expression rendering.

use viper_core::abi;

use crate::analyze::object_model::{find_contains_function, find_object_op_function};
use crate::analyze::symbol_table::Symbol;
use crate::analyze::type_check::resolve_operation;
use crate::analyze::types::TypeInfo;
use crate::diagnostics::CompileError;
use crate::ir::{Instruction, OperationInst, StorageHint, StorageIdent};
use crate::lexer::{Keyword, Token, TokenKind};
use crate::op::Op;
use crate::parser::ast::{Enclosure, EnclosureKind, Expression, Operand, Operation};
use crate::pool::ClassId;

use super::compiler::Compiler;

/// Tracks, per operand index, the latest rendered result covering it, so
/// shared subexpressions within one expression collapse to one store.
struct ExpressionRecord {
    results: Vec<StorageIdent>,
    by_operand: Vec<Option<usize>>,
}

impl ExpressionRecord {
    fn new(expr: &Expression) -> Self {
        Self {
            results: Vec::with_capacity(expr.operations.len()),
            by_operand: vec![None; expr.operands.len()],
        }
    }

    fn update(&mut self, current: StorageIdent, operation: &Operation) {
        self.results.push(current);
        let slot = self.results.len() - 1;
        if !operation.op.is_unary() {
            self.by_operand[operation.left] = Some(slot);
        }
        self.by_operand[operation.right] = Some(slot);
    }

    fn previous(&self, operand: usize) -> Option<StorageIdent> {
        self.by_operand[operand].map(|slot| self.results[slot].clone())
    }

    fn final_result(self) -> StorageIdent {
        self.results.into_iter().last().expect("at least one operation rendered")
    }
}

impl Compiler<'_> {
    /// Render an expression; the returned storage holds its value.
    pub(super) fn render_expression(
        &mut self,
        hint: &StorageHint,
        expr: &Expression,
    ) -> Result<StorageIdent, CompileError> {
        if expr.is_simple() {
            return self.render_simple_expression(hint, expr);
        }

        let mut record = ExpressionRecord::new(expr);

        let mut i = 0;
        while i < expr.operations.len() {
            let operation = &expr.operations[i];
            self.current_op_span = operation.span;
            let is_last = i == expr.operations.len() - 1;
            let current_hint = if is_last { hint.clone() } else { StorageHint::None };

            match operation.op {
                Op::Call => {
                    let result = match record.previous(operation.left) {
                        None => self.render_call_from_operands(
                            &current_hint,
                            &expr.operands[operation.left],
                            &expr.operands[operation.right],
                        )?,
                        Some(left) => {
                            let args = expect_args(&expr.operands[operation.right]);
                            self.render_call_operation(&current_hint, left, args)?
                        }
                    };
                    record.update(result, operation);
                }
                Op::GetAttr => {
                    let left = match record.previous(operation.left) {
                        Some(prev) => prev,
                        None => self.render_operand(
                            &StorageHint::None,
                            &expr.operands[operation.left],
                        )?,
                    };
                    match &left.info {
                        TypeInfo::List(_) | TypeInfo::Dict(_, _) => {
                            // container methods exist only as immediate
                            // calls; the method name and the call's
                            // arguments lower as one unit
                            if is_last {
                                return Err(CompileError::type_error(
                                    self.current_op_span,
                                    "container methods cannot be referenced",
                                ));
                            }
                            let next_operation = &expr.operations[i + 1];
                            if next_operation.op != Op::Call {
                                return Err(CompileError::syntax(
                                    next_operation.span,
                                    "expecting a method call",
                                ));
                            }
                            let call_hint = if i + 1 == expr.operations.len() - 1 {
                                hint.clone()
                            } else {
                                StorageHint::None
                            };
                            self.current_op_span = next_operation.span;

                            let method = token_text_of(
                                self.source.text(),
                                &expr.operands[operation.right],
                            );
                            let args = expect_args(&expr.operands[next_operation.right]);
                            let result = if matches!(left.info, TypeInfo::List(_)) {
                                self.render_list_builtin(&call_hint, left, &method, args)?
                            } else {
                                self.render_dict_builtin(&call_hint, left, &method, args)?
                            };
                            record.update(result.clone(), operation);
                            record.update(result, next_operation);
                            i += 2;
                            continue;
                        }
                        TypeInfo::Object(_) => {
                            let attr = token_text_of(
                                self.source.text(),
                                &expr.operands[operation.right],
                            );
                            let result =
                                self.render_get_attr_operation(&current_hint, left, &attr)?;
                            record.update(result, operation);
                        }
                        other => {
                            return Err(CompileError::unsupported(
                                self.current_op_span,
                                format!(
                                    "attribute access is not implemented for type `{}`",
                                    other.describe()
                                ),
                            ));
                        }
                    }
                }
                op => {
                    let left = if op.is_unary() {
                        None
                    } else {
                        Some(match record.previous(operation.left) {
                            Some(prev) => prev,
                            None => self.render_operand(
                                &StorageHint::None,
                                &expr.operands[operation.left],
                            )?,
                        })
                    };
                    let right = match record.previous(operation.right) {
                        Some(prev) => prev,
                        None => self.render_operand(
                            &StorageHint::None,
                            &expr.operands[operation.right],
                        )?,
                    };
                    let result = self.render_operation(&current_hint, op, left, right)?;
                    record.update(result, operation);
                }
            }
            i += 1;
        }

        Ok(record.final_result())
    }

    fn render_simple_expression(
        &mut self,
        hint: &StorageHint,
        expr: &Expression,
    ) -> Result<StorageIdent, CompileError> {
        debug_assert!(expr.is_simple());

        if expr.operations.is_empty() {
            return self.render_operand(hint, &expr.operands[0]);
        }

        let operation = expr.operations[0];
        self.current_op_span = operation.span;

        if operation.op == Op::Call {
            return self.render_call_from_operands(
                hint,
                &expr.operands[operation.left],
                &expr.operands[operation.right],
            );
        }

        if operation.op == Op::GetAttr {
            let left_type = self.resolve_operand_type(&expr.operands[operation.left])?;
            let left = self.render_operand(
                &StorageHint::Typed(left_type),
                &expr.operands[operation.left],
            )?;
            let attr = token_text_of(self.source.text(), &expr.operands[operation.right]);
            return self.render_get_attr_operation(hint, left, &attr);
        }

        let left = if operation.op.is_unary() {
            None
        } else {
            Some(self.render_operand(&StorageHint::None, &expr.operands[operation.left])?)
        };
        let right =
            self.render_operand(&StorageHint::None, &expr.operands[operation.right])?;
        self.render_operation(hint, operation.op, left, right)
    }

    // ------------------------------------------------------------------
    // operands

    pub(super) fn render_operand(
        &mut self,
        hint: &StorageHint,
        operand: &Operand,
    ) -> Result<StorageIdent, CompileError> {
        match operand {
            Operand::Enclosure(enclosure) => {
                if enclosure.expressions.is_empty() {
                    if hint.expected().is_untyped() {
                        return Err(CompileError::type_error(
                            enclosure.span,
                            "empty containers must have their type annotated when \
                             initialized",
                        ));
                    }
                    return self.render_empty_enclosure(hint, enclosure);
                }
                match enclosure.kind {
                    EnclosureKind::List => self.render_list_literal(hint, enclosure),
                    EnclosureKind::Dict => self.render_dict_literal(hint, enclosure),
                    EnclosureKind::Tuple => Err(CompileError::unsupported(
                        enclosure.span,
                        "tuple literals are not implemented",
                    )),
                }
            }
            Operand::Comprehension(comp) => Err(CompileError::unsupported(
                comp.span,
                "comprehensions are not implemented",
            )),
            Operand::Slice(slice) => Err(CompileError::unsupported(
                slice.span,
                "slices are not implemented",
            )),
            Operand::Expr(expr) => self.render_expression(hint, expr),
            Operand::Token(token) => self.render_token_operand(hint, *token),
            Operand::Args(args) => Err(CompileError::syntax(
                args.span,
                "arguments are only valid in a call",
            )),
        }
    }

    /// The resolved type of a leaf operand.
    pub(super) fn resolve_operand_type(
        &self,
        operand: &Operand,
    ) -> Result<TypeInfo, CompileError> {
        let Operand::Token(token) = operand else {
            return Ok(TypeInfo::Untyped);
        };
        Ok(match token.kind {
            TokenKind::Str => TypeInfo::String,
            TokenKind::Number => {
                let text = self.source.slice(token.span);
                if text.contains('.') || text.ends_with('f') {
                    TypeInfo::Float
                } else {
                    TypeInfo::Int
                }
            }
            TokenKind::Keyword(Keyword::True) | TokenKind::Keyword(Keyword::False) => {
                TypeInfo::Bool
            }
            TokenKind::Keyword(Keyword::None) => TypeInfo::None,
            TokenKind::Ident => {
                let key = self.source.slice(token.span);
                match self.get_symbol(key) {
                    Some(Symbol::Variable(id)) | Some(Symbol::Global(id)) => {
                        self.pool.var(id).type_info.clone()
                    }
                    Some(Symbol::Function(id)) => {
                        TypeInfo::Function(Box::new(self.pool.func(id).sig.clone()))
                    }
                    Some(Symbol::Class(_)) | Some(Symbol::Member(_, _)) | None => {
                        TypeInfo::Untyped
                    }
                }
            }
            _ => TypeInfo::Untyped,
        })
    }

    fn render_token_operand(
        &mut self,
        hint: &StorageHint,
        token: Token,
    ) -> Result<StorageIdent, CompileError> {
        let operand = Operand::Token(token);
        let resolved = self.resolve_operand_type(&operand)?;
        if resolved.is_untyped() {
            return Err(CompileError::type_error(
                token.span,
                format!(
                    "unable to resolve the type for `{}`",
                    self.source.slice(token.span)
                ),
            ));
        }

        let value = if matches!(resolved, TypeInfo::None) {
            self.none_ident()
        } else {
            match token.kind {
                TokenKind::Ident => {
                    let key = self.source.slice(token.span).to_owned();
                    match self.get_symbol(&key) {
                        Some(Symbol::Variable(id)) | Some(Symbol::Global(id)) => {
                            self.storage_ident_from_variable(id)
                        }
                        Some(Symbol::Function(id)) => self.storage_ident_from_func(id),
                        Some(Symbol::Class(_)) => {
                            return Err(CompileError::unsupported(
                                token.span,
                                "type objects cannot be used as values",
                            ));
                        }
                        Some(Symbol::Member(_, _)) | None => {
                            return Err(CompileError::name_error(
                                token.span,
                                format!("undefined symbol `{key}`"),
                            ));
                        }
                    }
                }
                TokenKind::Number => {
                    let text: String = self
                        .source
                        .slice(token.span)
                        .chars()
                        .filter(|c| *c != '_')
                        .collect();
                    if matches!(resolved, TypeInfo::Int) {
                        let value = text.parse::<i64>().map_err(|_| {
                            CompileError::syntax(token.span, "integer literal out of range")
                        })?;
                        StorageIdent::int_literal(value, TypeInfo::Int)
                    } else {
                        let value =
                            text.trim_end_matches('f').parse::<f64>().map_err(|_| {
                                CompileError::syntax(token.span, "malformed float literal")
                            })?;
                        StorageIdent::float_literal(value)
                    }
                }
                TokenKind::Str => {
                    let text = self.source.slice(token.span);
                    // the span includes the quotes
                    let index = self.str_constants.put(&text[1..text.len() - 1]);
                    StorageIdent::str_literal(index)
                }
                TokenKind::Keyword(Keyword::True) => {
                    StorageIdent::int_literal(1, TypeInfo::Bool)
                }
                TokenKind::Keyword(Keyword::False) => {
                    StorageIdent::int_literal(0, TypeInfo::Bool)
                }
                _ => {
                    return Err(CompileError::syntax(
                        token.span,
                        "expecting a value here",
                    ));
                }
            }
        };

        let mut rtval = self.storage_ident_from_hint(hint);
        self.check_storage_type_info(&mut rtval, &resolved)?;
        self.add_assignment(hint, rtval.clone(), OperationInst::Copy(value));
        Ok(rtval)
    }

    // ------------------------------------------------------------------
    // operations

    /// Lower one operation over rendered operands. `left` is absent for
    /// unary operators.
    pub(super) fn render_operation(
        &mut self,
        hint: &StorageHint,
        op: Op,
        left: Option<StorageIdent>,
        right: StorageIdent,
    ) -> Result<StorageIdent, CompileError> {
        let left_is_object =
            left.as_ref().is_some_and(|l| matches!(l.info, TypeInfo::Object(_)));
        if left_is_object || matches!(right.info, TypeInfo::Object(_)) {
            return self.render_object_operation(hint, op, left, right);
        }

        let left_info = left.as_ref().map(|l| l.info.clone()).unwrap_or_default();
        let resolved = resolve_operation(&left_info, &right.info, op);
        if resolved.is_untyped() {
            return Err(self.operand_type_error(op, left.as_ref(), &right));
        }

        let mut rtval = self.storage_ident_from_hint(hint);
        self.check_storage_type_info(&mut rtval, &resolved)?;

        match op {
            Op::LogicalNot => {
                let truthy = self.convert_to_truthy(right)?;
                self.add_assignment(
                    hint,
                    rtval.clone(),
                    OperationInst::Intrinsic {
                        op: Op::LogicalNot,
                        left: None,
                        right: truthy,
                    },
                );
                Ok(rtval)
            }
            Op::Is => {
                let mut left = left.expect("`is` is binary");
                let mut right = right;
                if matches!(left.info, TypeInfo::String) {
                    left = left.by_reference();
                    right = right.by_reference();
                }
                self.add_assignment(
                    hint,
                    rtval.clone(),
                    OperationInst::Intrinsic {
                        op: Op::Equal,
                        left: Some(left),
                        right,
                    },
                );
                Ok(rtval)
            }
            Op::Plus if matches!(left_info, TypeInfo::String) => {
                self.emit_lib_call2(hint, rtval, abi::STR_ADD, left, right)
            }
            Op::Plus if matches!(left_info, TypeInfo::List(_)) => {
                self.emit_lib_call2(hint, rtval, abi::LIST_ADD, left, right)
            }
            Op::Mod if matches!(resolved, TypeInfo::Float) => {
                self.require_math_lib();
                self.emit_lib_call2(hint, rtval, abi::FMOD, left, right)
            }
            Op::Pow => {
                self.require_math_lib();
                self.emit_lib_call2(hint, rtval, abi::POW, left, right)
            }
            Op::Equal if matches!(left_info, TypeInfo::String) => {
                self.emit_lib_call2(hint, rtval, abi::STR_EQ, left, right)
            }
            Op::NotEqual if matches!(left_info, TypeInfo::String) => {
                // no runtime inequality entry point; negate the equality
                let eq_hint = StorageHint::Typed(TypeInfo::Bool);
                let eq = self.storage_ident_from_hint(&eq_hint);
                let left = left.expect("`!=` is binary");
                self.add_instruction(Instruction::DeclAssignment {
                    left: eq.clone(),
                    right: OperationInst::CCall {
                        name: abi::STR_EQ,
                        args: vec![left, right],
                    },
                });
                self.add_assignment(
                    hint,
                    rtval.clone(),
                    OperationInst::Intrinsic {
                        op: Op::LogicalNot,
                        left: None,
                        right: eq,
                    },
                );
                Ok(rtval)
            }
            Op::Greater if matches!(left_info, TypeInfo::String) => {
                self.emit_lib_call2(hint, rtval, abi::STR_GT, left, right)
            }
            Op::GreaterEqual if matches!(left_info, TypeInfo::String) => {
                self.emit_lib_call2(hint, rtval, abi::STR_GTE, left, right)
            }
            Op::Less if matches!(left_info, TypeInfo::String) => {
                self.emit_lib_call2(hint, rtval, abi::STR_LT, left, right)
            }
            Op::LessEqual if matches!(left_info, TypeInfo::String) => {
                self.emit_lib_call2(hint, rtval, abi::STR_LTE, left, right)
            }
            Op::GetItem => {
                let left = left.expect("subscript has a container");
                match &left.info {
                    TypeInfo::List(_) => {
                        if matches!(right.info, TypeInfo::Slice) {
                            return Err(CompileError::unsupported(
                                self.current_op_span,
                                "list slicing is not implemented",
                            ));
                        }
                        if !hint.has_dest() {
                            self.add_instruction(Instruction::DeclareVariable(
                                rtval.clone(),
                            ));
                        }
                        self.add_instruction(Instruction::Operation(
                            OperationInst::CCall {
                                name: abi::LIST_GET_ITEM,
                                args: vec![left, right, rtval.clone().by_reference()],
                            },
                        ));
                        Ok(rtval)
                    }
                    TypeInfo::Dict(_, _) => {
                        if !hint.has_dest() {
                            self.add_instruction(Instruction::DeclareVariable(
                                rtval.clone(),
                            ));
                        }
                        self.add_instruction(Instruction::Operation(
                            OperationInst::CCall {
                                name: abi::DICT_GET_ITEM,
                                args: vec![
                                    left,
                                    right.by_reference(),
                                    rtval.clone().by_reference(),
                                ],
                            },
                        ));
                        Ok(rtval)
                    }
                    other => Err(CompileError::unsupported(
                        self.current_op_span,
                        format!(
                            "subscripting is not implemented for type `{}`",
                            other.describe()
                        ),
                    )),
                }
            }
            _ => {
                self.add_assignment(
                    hint,
                    rtval.clone(),
                    OperationInst::Intrinsic { op, left, right },
                );
                Ok(rtval)
            }
        }
    }

    fn emit_lib_call2(
        &mut self,
        hint: &StorageHint,
        rtval: StorageIdent,
        name: &'static str,
        left: Option<StorageIdent>,
        right: StorageIdent,
    ) -> Result<StorageIdent, CompileError> {
        let left = left.expect("runtime-routed operators are binary");
        self.add_assignment(
            hint,
            rtval.clone(),
            OperationInst::CCall {
                name,
                args: vec![left, right],
            },
        );
        Ok(rtval)
    }

    fn operand_type_error(
        &self,
        op: Op,
        left: Option<&StorageIdent>,
        right: &StorageIdent,
    ) -> CompileError {
        match left {
            Some(left) => CompileError::type_error(
                self.current_op_span,
                format!(
                    "unsupported operand types for `{}`: `{}` and `{}`",
                    op.as_str(),
                    left.info.describe(),
                    right.info.describe(),
                ),
            ),
            None => CompileError::type_error(
                self.current_op_span,
                format!(
                    "unsupported operand type for `{}`: `{}`",
                    op.as_str(),
                    right.info.describe(),
                ),
            ),
        }
    }

    /// Either operand is an object: dispatch through the object model.
    fn render_object_operation(
        &mut self,
        hint: &StorageHint,
        op: Op,
        left: Option<StorageIdent>,
        right: StorageIdent,
    ) -> Result<StorageIdent, CompileError> {
        let left_class = left.as_ref().and_then(|l| object_class(&l.info));
        let right_class = object_class(&right.info);

        let found = if op == Op::In {
            find_contains_function(right_class.map(|id| self.pool.class(id)))
        } else {
            find_object_op_function(
                left_class.map(|id| self.pool.class(id)),
                right_class.map(|id| self.pool.class(id)),
                op,
            )
        };
        let Some(found) = found else {
            return Err(self.operand_type_error(op, left.as_ref(), &right));
        };

        let (self_ident, args) = if found.is_unary {
            (right, Vec::new())
        } else if found.is_rop {
            let left = left.expect("binary object operation");
            (right, vec![left])
        } else {
            let left = left.expect("binary object operation");
            (left, vec![right])
        };

        let return_type = self.pool.func(found.func).sig.return_type.clone();
        let mut rtval = self.storage_ident_from_hint(hint);
        self.check_storage_type_info(&mut rtval, &return_type)?;

        let func_ident =
            self.render_function_object_copy(&StorageHint::None, found.func)?;
        self.bind_self_to_function_object(self_ident, func_ident.clone())?;
        self.add_assignment(
            hint,
            rtval.clone(),
            OperationInst::FunctionCall {
                function: func_ident,
                args,
            },
        );
        Ok(rtval)
    }

    /// Attribute access on an object: read a member or materialize a bound
    /// method copy.
    pub(super) fn render_get_attr_operation(
        &mut self,
        hint: &StorageHint,
        object: StorageIdent,
        attr: &str,
    ) -> Result<StorageIdent, CompileError> {
        let TypeInfo::Object(class_id) = object.info else {
            return Err(CompileError::type_error(
                self.current_op_span,
                format!(
                    "attribute access is not implemented for type `{}`",
                    object.info.describe()
                ),
            ));
        };

        let (member_type, method) = self.class_member_type(class_id, attr)?;

        let mut rtval = self.storage_ident_from_hint(hint);
        self.check_storage_type_info(&mut rtval, &member_type)?;

        if let Some(func) = method {
            // copy the global function object and bind `self` to the copy
            let source = self.storage_ident_from_func(func);
            self.add_assignment(hint, rtval.clone(), OperationInst::Copy(source));
            self.bind_self_to_function_object(object, rtval.clone())?;
        } else {
            self.add_assignment(
                hint,
                rtval.clone(),
                OperationInst::GetAttr {
                    object,
                    attr: attr.into(),
                },
            );
        }
        Ok(rtval)
    }

    /// Declared type of a class member or method, by name.
    pub(super) fn class_member_type(
        &self,
        class_id: ClassId,
        member: &str,
    ) -> Result<(TypeInfo, Option<crate::pool::FuncId>), CompileError> {
        let class = self.pool.class(class_id);
        let scope = self.pool.scope(class.scope);
        if let Some(index) = scope.table.get(member) {
            match scope.table.symbol(index) {
                Symbol::Member(_, info) => return Ok((info.clone(), None)),
                Symbol::Function(func_id) => {
                    let sig = self.pool.func(*func_id).sig.clone();
                    return Ok((TypeInfo::Function(Box::new(sig)), Some(*func_id)));
                }
                _ => {}
            }
        }
        Err(CompileError::name_error(
            self.current_stmt_span,
            format!(
                "unknown member `{member}` for type `{}`",
                self.pool.class(class_id).ns_ident
            ),
        ))
    }

    // ------------------------------------------------------------------
    // container literals

    pub(super) fn render_empty_enclosure(
        &mut self,
        hint: &StorageHint,
        enclosure: &Enclosure,
    ) -> Result<StorageIdent, CompileError> {
        let expected = hint.expected();
        match enclosure.kind {
            EnclosureKind::List => {
                let TypeInfo::List(element) = &expected else {
                    return Err(CompileError::type_error(
                        enclosure.span,
                        format!(
                            "expecting type `{}` but got a list literal",
                            expected.describe()
                        ),
                    ));
                };
                let element = (**element).clone();
                let size = self.sized(&element, enclosure.span)?;
                let args = vec![
                    StorageIdent::int_literal(size as i64, TypeInfo::Int),
                    StorageIdent::cstr(sort_fn_for(&element, false), TypeInfo::Pointer),
                    StorageIdent::cstr(sort_fn_for(&element, true), TypeInfo::Pointer),
                    StorageIdent::cstr(voidptr_cmp_for(&element), TypeInfo::Pointer),
                ];

                let mut rtval = self.storage_ident_from_hint(hint);
                self.check_storage_type_info(&mut rtval, &expected)?;
                self.add_assignment(
                    hint,
                    rtval.clone(),
                    OperationInst::CCall {
                        name: abi::LIST_INIT,
                        args,
                    },
                );
                Ok(rtval)
            }
            EnclosureKind::Dict => {
                let TypeInfo::Dict(key, value) = &expected else {
                    return Err(CompileError::type_error(
                        enclosure.span,
                        format!(
                            "expecting type `{}` but got a dict literal",
                            expected.describe()
                        ),
                    ));
                };
                let key = (**key).clone();
                let value = (**value).clone();
                let key_size = self.sized(&key, enclosure.span)?;
                let value_size = self.sized(&value, enclosure.span)?;
                let args = vec![
                    StorageIdent::int_literal(key_size as i64, TypeInfo::Int),
                    StorageIdent::int_literal(value_size as i64, TypeInfo::Int),
                    StorageIdent::cstr(voidptr_cmp_for(&key), TypeInfo::Pointer),
                ];

                let mut rtval = self.storage_ident_from_hint(hint);
                self.check_storage_type_info(&mut rtval, &expected)?;
                self.add_assignment(
                    hint,
                    rtval.clone(),
                    OperationInst::CCall {
                        name: abi::DICT_INIT,
                        args,
                    },
                );
                Ok(rtval)
            }
            EnclosureKind::Tuple => Err(CompileError::unsupported(
                enclosure.span,
                "tuple literals are not implemented",
            )),
        }
    }

    fn render_list_literal(
        &mut self,
        hint: &StorageHint,
        enclosure: &Enclosure,
    ) -> Result<StorageIdent, CompileError> {
        let expected = hint.expected();
        let element_hint = match &expected {
            TypeInfo::List(element) => StorageHint::Typed((**element).clone()),
            _ => StorageHint::None,
        };

        let mut element = self.render_expression(&element_hint, &enclosure.expressions[0])?;

        // the first element's type is the defining occurrence when the hint
        // was silent
        let list_hint = match hint.clone() {
            StorageHint::Dest(mut ident) => {
                if ident.info.is_untyped() {
                    ident.info = TypeInfo::List(Box::new(element.info.clone()));
                }
                StorageHint::Dest(ident)
            }
            StorageHint::Typed(info) => StorageHint::Typed(info),
            StorageHint::None => {
                StorageHint::Typed(TypeInfo::List(Box::new(element.info.clone())))
            }
        };

        let rtval = self.render_empty_enclosure(&list_hint, enclosure)?;

        let mut index = 1;
        loop {
            self.add_instruction(Instruction::Operation(OperationInst::CCall {
                name: abi::LIST_APPEND,
                args: vec![rtval.clone(), element.clone().by_reference()],
            }));
            if index == enclosure.expressions.len() {
                break;
            }
            element = self.render_expression(
                &StorageHint::Dest(element.clone()),
                &enclosure.expressions[index],
            )?;
            index += 1;
        }

        Ok(rtval)
    }

    fn render_dict_literal(
        &mut self,
        hint: &StorageHint,
        enclosure: &Enclosure,
    ) -> Result<StorageIdent, CompileError> {
        let expected = hint.expected();
        let (key_hint, value_hint) = match &expected {
            TypeInfo::Dict(key, value) => (
                StorageHint::Typed((**key).clone()),
                StorageHint::Typed((**value).clone()),
            ),
            _ => (StorageHint::None, StorageHint::None),
        };

        let mut key = self.render_expression(&key_hint, &enclosure.expressions[0])?;
        let mut value = self.render_expression(&value_hint, &enclosure.expressions[1])?;

        let dict_hint = match hint.clone() {
            StorageHint::Dest(mut ident) => {
                if ident.info.is_untyped() {
                    ident.info = TypeInfo::Dict(
                        Box::new(key.info.clone()),
                        Box::new(value.info.clone()),
                    );
                }
                StorageHint::Dest(ident)
            }
            StorageHint::Typed(info) => StorageHint::Typed(info),
            StorageHint::None => StorageHint::Typed(TypeInfo::Dict(
                Box::new(key.info.clone()),
                Box::new(value.info.clone()),
            )),
        };

        let rtval = self.render_empty_enclosure(&dict_hint, enclosure)?;

        let mut index = 2;
        loop {
            self.compile_set_item(rtval.clone(), key.clone(), value.clone())?;
            if index == enclosure.expressions.len() {
                break;
            }
            key = self.render_expression(
                &StorageHint::Dest(key.clone()),
                &enclosure.expressions[index],
            )?;
            value = self.render_expression(
                &StorageHint::Dest(value.clone()),
                &enclosure.expressions[index + 1],
            )?;
            index += 2;
        }

        Ok(rtval)
    }

    fn sized(&self, info: &TypeInfo, span: viper_core::Span) -> Result<usize, CompileError> {
        info.size_of().ok_or_else(|| {
            CompileError::type_error(
                span,
                format!("size data for type `{}` not specified", info.describe()),
            )
        })
    }
}

fn object_class(info: &TypeInfo) -> Option<ClassId> {
    match info {
        TypeInfo::Object(id) => Some(*id),
        _ => None,
    }
}

/// Source text of a token operand (attribute and method names).
fn token_text_of(source: &str, operand: &Operand) -> String {
    match operand {
        Operand::Token(token) => source[token.span.range()].to_owned(),
        _ => String::new(),
    }
}

fn expect_args(operand: &Operand) -> &crate::parser::ast::Arguments {
    match operand {
        Operand::Args(args) => args,
        _ => unreachable!("the parser pairs every call with an arguments operand"),
    }
}

/// Element sort functions for `np_list_init`; only the primitive types have
/// entries, anything else sorts as NULL.
fn sort_fn_for(info: &TypeInfo, reversed: bool) -> &'static str {
    match (info, reversed) {
        (TypeInfo::Int, false) => abi::INT_SORT,
        (TypeInfo::Int, true) => abi::INT_SORT_REV,
        (TypeInfo::Float, false) => abi::FLOAT_SORT,
        (TypeInfo::Float, true) => abi::FLOAT_SORT_REV,
        (TypeInfo::Bool, false) => abi::BOOL_SORT,
        (TypeInfo::Bool, true) => abi::BOOL_SORT_REV,
        (TypeInfo::String, false) => abi::STR_SORT,
        (TypeInfo::String, true) => abi::STR_SORT_REV,
        _ => "NULL",
    }
}

fn voidptr_cmp_for(info: &TypeInfo) -> &'static str {
    match info {
        TypeInfo::Int => abi::VOID_INT_EQ,
        TypeInfo::Float => abi::VOID_FLOAT_EQ,
        TypeInfo::Bool => abi::VOID_BOOL_EQ,
        TypeInfo::String => abi::VOID_STR_EQ,
        _ => "NULL",
    }
}
