//! Callable lowering: free functions, bound methods, class construction,
//! and argument marshalling against signatures.

use crate::analyze::object_model::ObjectModel;
use crate::analyze::symbol_table::Symbol;
use crate::analyze::types::{Signature, TypeInfo};
use crate::diagnostics::CompileError;
use crate::ir::{Instruction, OperationInst, StorageHint, StorageIdent};
use crate::lexer::TokenKind;
use crate::parser::ast::{Arguments, Operand};
use crate::pool::{ClassId, FuncId};

use super::compiler::Compiler;
use viper_core::abi;

impl Compiler<'_> {
    /// A call whose callee is a bare operand: a named function, variable,
    /// class constructor, or builtin.
    pub(super) fn render_call_from_operands(
        &mut self,
        hint: &StorageHint,
        callee: &Operand,
        args_operand: &Operand,
    ) -> Result<StorageIdent, CompileError> {
        let Operand::Args(args) = args_operand else {
            unreachable!("the parser pairs every call with an arguments operand");
        };

        // non-identifier callees render as expressions first
        let Operand::Token(token) = callee else {
            let callee_ident = self.render_operand(&StorageHint::None, callee)?;
            return self.render_call_operation(hint, callee_ident, args);
        };
        if token.kind != TokenKind::Ident {
            let callee_ident = self.render_operand(&StorageHint::None, callee)?;
            return self.render_call_operation(hint, callee_ident, args);
        }

        let key = self.source.slice(token.span).to_owned();
        let Some(symbol) = self.get_symbol(&key) else {
            return self.render_builtin(hint, &key, args);
        };

        let callee_ident = match symbol {
            Symbol::Function(func_id) => self.storage_ident_from_func(func_id),
            Symbol::Variable(var_id) | Symbol::Global(var_id) => {
                self.storage_ident_from_variable(var_id)
            }
            Symbol::Class(class_id) => {
                return self.render_object_creation(hint, class_id, args);
            }
            Symbol::Member(_, _) => {
                return Err(CompileError::name_error(
                    token.span,
                    format!("`{key}` is not callable here"),
                ));
            }
        };
        self.render_call_operation(hint, callee_ident, args)
    }

    /// Call through a function-typed value.
    pub(super) fn render_call_operation(
        &mut self,
        hint: &StorageHint,
        callee: StorageIdent,
        args: &Arguments,
    ) -> Result<StorageIdent, CompileError> {
        let TypeInfo::Function(sig) = &callee.info else {
            return Err(CompileError::type_error(
                self.current_op_span,
                format!("a value of type `{}` is not callable", callee.info.describe()),
            ));
        };
        let sig = (**sig).clone();

        let mut rtval = self.storage_ident_from_hint(hint);
        self.check_storage_type_info(&mut rtval, &sig.return_type)?;

        let rendered = self.render_callable_args(args, &sig, None)?;
        self.add_assignment(
            hint,
            rtval.clone(),
            OperationInst::FunctionCall {
                function: callee,
                args: rendered,
            },
        );
        Ok(rtval)
    }

    /// Marshal call-site arguments against a signature, yielding one value
    /// per parameter slot.
    pub(super) fn render_callable_args(
        &mut self,
        args: &Arguments,
        sig: &Signature,
        callable_name: Option<&str>,
    ) -> Result<Vec<StorageIdent>, CompileError> {
        let display = callable_name.unwrap_or("callable");

        if sig.param_count() == 0 && args.values.is_empty() {
            return Ok(Vec::new());
        }

        let Some(params) = &sig.params else {
            // signature synthesized from a type hint: positional only,
            // exact arity
            return self.render_hint_signature_args(args, sig, display);
        };

        if args.n_positional > sig.param_count() {
            return Err(CompileError::type_error(
                self.current_op_span,
                format!(
                    "`{display}` takes {} arguments but {} were given",
                    sig.param_count(),
                    args.values.len(),
                ),
            ));
        }

        let mut fulfilled = vec![false; sig.param_count()];
        let mut rendered: Vec<Option<StorageIdent>> = vec![None; sig.param_count()];

        // positional arguments fill the leading slots
        for (i, value) in args.values[..args.n_positional].iter().enumerate() {
            let hint = StorageHint::Typed(sig.types[i].clone());
            rendered[i] = Some(self.render_expression(&hint, value)?);
            fulfilled[i] = true;
        }

        // keyword arguments fill by name
        for (kwd_index, value) in args.values[args.n_positional..].iter().enumerate() {
            let kwd = args.kwds[kwd_index];
            let Some(param_index) = params.iter().position(|p| *p == kwd) else {
                return Err(CompileError::type_error(
                    self.current_op_span,
                    format!(
                        "`{display}` was given an unexpected keyword argument `{}`",
                        self.resolve_name(kwd),
                    ),
                ));
            };
            let hint = StorageHint::Typed(sig.types[param_index].clone());
            rendered[param_index] = Some(self.render_expression(&hint, value)?);
            fulfilled[param_index] = true;
        }

        // every required parameter must be satisfied
        let required = sig.required_count();
        for i in 0..required {
            if !fulfilled[i] {
                return Err(CompileError::type_error(
                    self.current_op_span,
                    format!(
                        "`{display}` missing required param `{}`",
                        self.resolve_name(params[i]),
                    ),
                ));
            }
        }

        // unfilled defaulted parameters render from their default
        // expressions with the declared type as hint
        for i in required..sig.param_count() {
            if !fulfilled[i] {
                let hint = StorageHint::Typed(sig.types[i].clone());
                let default = sig.defaults[i - required].clone();
                rendered[i] = Some(self.render_expression(&hint, &default)?);
            }
        }

        Ok(rendered
            .into_iter()
            .map(|r| r.expect("every slot filled above"))
            .collect())
    }

    fn render_hint_signature_args(
        &mut self,
        args: &Arguments,
        sig: &Signature,
        display: &str,
    ) -> Result<Vec<StorageIdent>, CompileError> {
        if args.values.len() != sig.param_count() {
            return Err(CompileError::type_error(
                self.current_op_span,
                format!(
                    "`{display}` takes {} arguments but {} were given",
                    sig.param_count(),
                    args.values.len(),
                ),
            ));
        }
        if args.values.len() != args.n_positional {
            return Err(CompileError::type_error(
                self.current_op_span,
                format!(
                    "`{display}` derives its type from a type hint and does not take \
                     keyword arguments",
                ),
            ));
        }

        let mut rendered = Vec::with_capacity(args.values.len());
        for (i, value) in args.values.iter().enumerate() {
            let hint = StorageHint::Typed(sig.types[i].clone());
            rendered.push(self.render_expression(&hint, value)?);
        }
        Ok(rendered)
    }

    /// Call a method with `self` already rendered: copy the function object,
    /// bind `self` through its context, call.
    pub(super) fn render_object_method_call(
        &mut self,
        hint: &StorageHint,
        self_ident: StorageIdent,
        func: FuncId,
        args: &Arguments,
    ) -> Result<StorageIdent, CompileError> {
        let sig = self.pool.func(func).sig.clone();
        let name = self.resolve_name(self.pool.func(func).name).to_owned();

        let func_hint = StorageHint::Typed(TypeInfo::Function(Box::new(sig.clone())));
        let func_ident = self.render_function_object_copy(&func_hint, func)?;
        self.bind_self_to_function_object(self_ident, func_ident.clone())?;

        let mut rtval = self.storage_ident_from_hint(hint);
        self.check_storage_type_info(&mut rtval, &sig.return_type)?;

        let rendered = self.render_callable_args(args, &sig, Some(&name))?;
        self.add_assignment(
            hint,
            rtval.clone(),
            OperationInst::FunctionCall {
                function: func_ident,
                args: rendered,
            },
        );
        Ok(rtval)
    }

    /// A class identifier used as a callable: allocate, then either run the
    /// user `__init__` (after seeding defaulted members) or set each member
    /// from the marshalled arguments.
    pub(super) fn render_object_creation(
        &mut self,
        hint: &StorageHint,
        class_id: ClassId,
        args: &Arguments,
    ) -> Result<StorageIdent, CompileError> {
        let sig = self.pool.class(class_id).sig.clone();
        let nbytes = self.pool.class(class_id).nbytes;
        let class_name = self.resolve_name(self.pool.class(class_id).name).to_owned();

        let mut rtval = self.storage_ident_from_hint(hint);
        self.check_storage_type_info(&mut rtval, &sig.return_type)?;

        self.add_assignment(
            hint,
            rtval.clone(),
            OperationInst::CCall1 {
                name: abi::ALLOC,
                arg: StorageIdent::int_literal(nbytes as i64, TypeInfo::Int),
            },
        );

        let init = self.pool.class(class_id).object_model[ObjectModel::Init.index()];
        if let Some(init) = init {
            // seed the trailing defaulted members, then hand off to __init__
            let params = sig.params.as_ref().expect("class signatures are named");
            for i in 0..sig.defaults.len() {
                let member_index = sig.param_count() - 1 - i;
                let member_hint = StorageHint::Typed(sig.types[member_index].clone());
                let default_index = member_index - sig.required_count();
                let default = sig.defaults[default_index].clone();
                let value = self.render_expression(&member_hint, &default)?;
                self.add_instruction(Instruction::Operation(OperationInst::SetAttr {
                    object: rtval.clone(),
                    attr: self.resolve_name(params[member_index]).to_owned(),
                    value,
                }));
            }
            self.render_object_method_call(
                &StorageHint::Typed(TypeInfo::None),
                rtval.clone(),
                init,
                args,
            )?;
            return Ok(rtval);
        }

        // default construction: one member per signature slot
        let rendered = self.render_callable_args(args, &sig, Some(&class_name))?;
        let params = sig.params.as_ref().expect("class signatures are named");
        for (i, value) in rendered.into_iter().enumerate() {
            self.add_instruction(Instruction::Operation(OperationInst::SetAttr {
                object: rtval.clone(),
                attr: self.resolve_name(params[i]).to_owned(),
                value,
            }));
        }
        Ok(rtval)
    }
}
