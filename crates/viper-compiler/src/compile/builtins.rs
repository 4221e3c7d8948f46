//! `print` and the fixed container method tables.

use viper_core::abi;

use crate::analyze::object_model::ObjectModel;
use crate::analyze::types::TypeInfo;
use crate::diagnostics::CompileError;
use crate::ir::{Instruction, OperationInst, StorageHint, StorageIdent};
use crate::parser::ast::Arguments;

use super::compiler::Compiler;

impl Compiler<'_> {
    /// A call to an identifier bound in no scope: the builtin table.
    pub(super) fn render_builtin(
        &mut self,
        hint: &StorageHint,
        fn_name: &str,
        args: &Arguments,
    ) -> Result<StorageIdent, CompileError> {
        if fn_name == "print" {
            return self.render_builtin_print(hint, args);
        }
        Err(CompileError::name_error(
            self.current_op_span,
            format!("`{fn_name}` is not defined"),
        ))
    }

    /// All arguments are converted to strings and handed to the runtime
    /// print along with their count.
    fn render_builtin_print(
        &mut self,
        hint: &StorageHint,
        args: &Arguments,
    ) -> Result<StorageIdent, CompileError> {
        if args.values.len() != args.n_positional {
            return Err(CompileError::type_error(
                self.current_op_span,
                "print keyword arguments are not implemented",
            ));
        }

        let mut rtval = self.storage_ident_from_hint(hint);
        self.check_storage_type_info(&mut rtval, &TypeInfo::None)?;

        let argc = if args.values.is_empty() { 1 } else { args.values.len() };
        let mut call_args = Vec::with_capacity(argc + 1);
        call_args.push(StorageIdent::int_literal(argc as i64, TypeInfo::Int));

        if args.values.is_empty() {
            let empty = self.str_constants.put("");
            call_args.push(StorageIdent::str_literal(empty));
        } else {
            for value in &args.values {
                let rendered = self.render_expression(&StorageHint::None, value)?;
                let as_string = if matches!(rendered.info, TypeInfo::String) {
                    rendered
                } else {
                    self.convert_to_string(rendered)?
                };
                call_args.push(as_string);
            }
        }

        self.add_assignment(
            hint,
            rtval.clone(),
            OperationInst::CCall {
                name: abi::PRINT,
                args: call_args,
            },
        );
        Ok(rtval)
    }

    /// Convert a value to its string representation, via the runtime
    /// converters, `__str__`, or the default formatted representation.
    pub(super) fn convert_to_string(
        &mut self,
        id: StorageIdent,
    ) -> Result<StorageIdent, CompileError> {
        let converter = match &id.info {
            TypeInfo::String => return Ok(id),
            TypeInfo::Int => abi::INT_TO_STR,
            TypeInfo::Float => abi::FLOAT_TO_STR,
            TypeInfo::Bool => abi::BOOL_TO_STR,
            TypeInfo::Object(class_id) => {
                let class_id = *class_id;
                let user_str =
                    self.pool.class(class_id).object_model[ObjectModel::Str.index()];
                return match user_str {
                    Some(func) => {
                        let empty = Arguments {
                            span: self.current_op_span,
                            values: Vec::new(),
                            n_positional: 0,
                            kwds: Vec::new(),
                        };
                        self.render_object_method_call(
                            &StorageHint::None,
                            id,
                            func,
                            &empty,
                        )
                    }
                    None => self.render_default_object_repr(&StorageHint::None, id),
                };
            }
            other => {
                return Err(CompileError::unsupported(
                    self.current_stmt_span,
                    format!(
                        "type conversion from `{}` to `str` is not implemented",
                        other.describe()
                    ),
                ));
            }
        };

        let hint = StorageHint::Typed(TypeInfo::String);
        let result = self.storage_ident_from_hint(&hint);
        self.add_instruction(Instruction::DeclAssignment {
            left: result.clone(),
            right: OperationInst::CCall1 {
                name: converter,
                arg: id,
            },
        });
        Ok(result)
    }

    /// `ClassName(member=value, ...)` built through the runtime formatter:
    /// every member converts to a string, then to a C string, then one
    /// `np_str_fmt` call fills the cached format string.
    fn render_default_object_repr(
        &mut self,
        hint: &StorageHint,
        object: StorageIdent,
    ) -> Result<StorageIdent, CompileError> {
        let TypeInfo::Object(class_id) = object.info else {
            unreachable!("default repr is only rendered for objects");
        };

        // lazily build "ClassName(a=%s, b=%s)" and intern it
        let fmt_index = match self.pool.class(class_id).fmtstr_index {
            Some(index) => index,
            None => {
                let class = self.pool.class(class_id);
                let params = class.sig.params.clone().expect("class signatures are named");
                let name = self.resolve_name(class.name).to_owned();
                let members: Vec<String> = params
                    .iter()
                    .map(|p| format!("{}=%s", self.resolve_name(*p)))
                    .collect();
                let fmtstr = format!("{name}({})", members.join(", "));
                let index = self.str_constants.put(&fmtstr);
                self.pool.class_mut(class_id).fmtstr_index = Some(index);
                index
            }
        };

        let sig = self.pool.class(class_id).sig.clone();
        let params = sig.params.as_ref().expect("class signatures are named");

        // the format string itself is passed as a raw C string
        let fmt_hint = StorageHint::Typed(TypeInfo::CStr);
        let fmt_ident = self.storage_ident_from_hint(&fmt_hint);
        self.add_instruction(Instruction::DeclAssignment {
            left: fmt_ident.clone(),
            right: OperationInst::GetAttr {
                object: StorageIdent::str_literal(fmt_index),
                attr: "data".into(),
            },
        });

        let mut call_args = Vec::with_capacity(sig.param_count() + 1);
        call_args.push(fmt_ident);

        for (i, member_type) in sig.types.iter().enumerate() {
            let member_hint = StorageHint::Typed(member_type.clone());
            let member_ident = self.storage_ident_from_hint(&member_hint);
            self.add_instruction(Instruction::DeclAssignment {
                left: member_ident.clone(),
                right: OperationInst::GetAttr {
                    object: object.clone(),
                    attr: self.resolve_name(params[i]).to_owned(),
                },
            });

            let as_string = self.convert_to_string(member_ident)?;

            let cstr_hint = StorageHint::Typed(TypeInfo::CStr);
            let as_cstr = self.storage_ident_from_hint(&cstr_hint);
            self.add_instruction(Instruction::DeclAssignment {
                left: as_cstr.clone(),
                right: OperationInst::CCall1 {
                    name: abi::STR_TO_CSTR,
                    arg: as_string,
                },
            });
            call_args.push(as_cstr);
        }

        let mut rtval = self.storage_ident_from_hint(hint);
        self.check_storage_type_info(&mut rtval, &TypeInfo::String)?;
        self.add_assignment(
            hint,
            rtval.clone(),
            OperationInst::CCall {
                name: abi::STR_FMT,
                args: call_args,
            },
        );
        Ok(rtval)
    }

    fn expect_arg_count(
        &self,
        method: &str,
        args: &Arguments,
        count: usize,
    ) -> Result<(), CompileError> {
        if args.values.len() != count {
            return Err(CompileError::type_error(
                self.current_op_span,
                format!(
                    "`{method}` expecting {count} arguments but got {}",
                    args.values.len()
                ),
            ));
        }
        Ok(())
    }

    /// `list.method(...)` dispatch.
    pub(super) fn render_list_builtin(
        &mut self,
        hint: &StorageHint,
        list: StorageIdent,
        method: &str,
        args: &Arguments,
    ) -> Result<StorageIdent, CompileError> {
        let TypeInfo::List(element) = &list.info else {
            unreachable!("list builtins are dispatched on list receivers");
        };
        let element = (**element).clone();

        match method {
            "append" => {
                self.expect_arg_count(method, args, 1)?;
                let item = self.render_expression(
                    &StorageHint::Typed(element),
                    &args.values[0],
                )?;
                self.add_instruction(Instruction::Operation(OperationInst::CCall {
                    name: abi::LIST_APPEND,
                    args: vec![list, item.by_reference()],
                }));
                Ok(self.none_ident())
            }
            "clear" => {
                self.expect_arg_count(method, args, 0)?;
                self.add_instruction(Instruction::Operation(OperationInst::CCall1 {
                    name: abi::LIST_CLEAR,
                    arg: list,
                }));
                Ok(self.none_ident())
            }
            "copy" => {
                self.expect_arg_count(method, args, 0)?;
                let mut rtval = self.storage_ident_from_hint(hint);
                self.check_storage_type_info(&mut rtval, &list.info.clone())?;
                self.add_assignment(
                    hint,
                    rtval.clone(),
                    OperationInst::CCall1 {
                        name: abi::LIST_COPY,
                        arg: list,
                    },
                );
                Ok(rtval)
            }
            "count" => {
                self.expect_arg_count(method, args, 1)?;
                let item = self.render_expression(
                    &StorageHint::Typed(element),
                    &args.values[0],
                )?;
                let mut rtval = self.storage_ident_from_hint(hint);
                self.check_storage_type_info(&mut rtval, &TypeInfo::Int)?;
                self.add_assignment(
                    hint,
                    rtval.clone(),
                    OperationInst::CCall {
                        name: abi::LIST_COUNT,
                        args: vec![list, item.by_reference()],
                    },
                );
                Ok(rtval)
            }
            "extend" => {
                self.expect_arg_count(method, args, 1)?;
                let other = self.render_expression(
                    &StorageHint::Typed(list.info.clone()),
                    &args.values[0],
                )?;
                self.add_instruction(Instruction::Operation(OperationInst::CCall {
                    name: abi::LIST_EXTEND,
                    args: vec![list, other],
                }));
                Ok(self.none_ident())
            }
            "index" => {
                self.expect_arg_count(method, args, 1)?;
                let item = self.render_expression(
                    &StorageHint::Typed(element),
                    &args.values[0],
                )?;
                let mut rtval = self.storage_ident_from_hint(hint);
                self.check_storage_type_info(&mut rtval, &TypeInfo::Int)?;
                self.add_assignment(
                    hint,
                    rtval.clone(),
                    OperationInst::CCall {
                        name: abi::LIST_INDEX,
                        args: vec![list, item.by_reference()],
                    },
                );
                Ok(rtval)
            }
            "insert" => {
                self.expect_arg_count(method, args, 2)?;
                let index = self.render_expression(
                    &StorageHint::Typed(TypeInfo::Int),
                    &args.values[0],
                )?;
                let item = self.render_expression(
                    &StorageHint::Typed(element),
                    &args.values[1],
                )?;
                self.add_instruction(Instruction::Operation(OperationInst::CCall {
                    name: abi::LIST_INSERT,
                    args: vec![list, index, item.by_reference()],
                }));
                Ok(self.none_ident())
            }
            "pop" => {
                let index = match args.values.len() {
                    0 => StorageIdent::int_literal(-1, TypeInfo::Int),
                    1 => self.render_expression(
                        &StorageHint::Typed(TypeInfo::Int),
                        &args.values[0],
                    )?,
                    _ => return Err(self.pop_arity_error(args)),
                };
                let mut rtval = self.storage_ident_from_hint(hint);
                self.check_storage_type_info(&mut rtval, &element)?;
                if !hint.has_dest() {
                    self.add_instruction(Instruction::DeclareVariable(rtval.clone()));
                }
                self.add_instruction(Instruction::Operation(OperationInst::CCall {
                    name: abi::LIST_POP,
                    args: vec![list, index, rtval.clone().by_reference()],
                }));
                Ok(rtval)
            }
            "remove" => {
                self.expect_arg_count(method, args, 1)?;
                let item = self.render_expression(
                    &StorageHint::Typed(element),
                    &args.values[0],
                )?;
                self.add_instruction(Instruction::Operation(OperationInst::CCall {
                    name: abi::LIST_REMOVE,
                    args: vec![list, item.by_reference()],
                }));
                Ok(self.none_ident())
            }
            "reverse" => {
                self.expect_arg_count(method, args, 0)?;
                self.add_instruction(Instruction::Operation(OperationInst::CCall1 {
                    name: abi::LIST_REVERSE,
                    arg: list,
                }));
                Ok(self.none_ident())
            }
            "sort" => {
                let reverse = self.render_sort_reverse_flag(args)?;
                self.add_instruction(Instruction::Operation(OperationInst::CCall {
                    name: abi::LIST_SORT,
                    args: vec![list, reverse],
                }));
                Ok(self.none_ident())
            }
            _ => Err(CompileError::name_error(
                self.current_op_span,
                format!("unknown list method `{method}`"),
            )),
        }
    }

    fn pop_arity_error(&self, args: &Arguments) -> CompileError {
        CompileError::type_error(
            self.current_op_span,
            format!("`pop` expecting at most 1 argument but got {}", args.values.len()),
        )
    }

    /// `sort()` takes nothing or `reverse=<bool>`.
    fn render_sort_reverse_flag(
        &mut self,
        args: &Arguments,
    ) -> Result<StorageIdent, CompileError> {
        if args.values.is_empty() {
            return Ok(StorageIdent::int_literal(0, TypeInfo::Bool));
        }
        let keyword_ok = args.values.len() == 1
            && args.n_positional == 0
            && self.resolve_name(args.kwds[0]) == "reverse";
        if !keyword_ok {
            return Err(CompileError::type_error(
                self.current_op_span,
                "`sort` takes no positional arguments and only the `reverse` keyword",
            ));
        }
        self.render_expression(&StorageHint::Typed(TypeInfo::Bool), &args.values[0])
    }

    /// `dict.method(...)` dispatch.
    pub(super) fn render_dict_builtin(
        &mut self,
        hint: &StorageHint,
        dict: StorageIdent,
        method: &str,
        args: &Arguments,
    ) -> Result<StorageIdent, CompileError> {
        let TypeInfo::Dict(key, value) = &dict.info else {
            unreachable!("dict builtins are dispatched on dict receivers");
        };
        let key = (**key).clone();
        let value = (**value).clone();

        match method {
            "clear" => {
                self.expect_arg_count(method, args, 0)?;
                self.add_instruction(Instruction::Operation(OperationInst::CCall1 {
                    name: abi::DICT_CLEAR,
                    arg: dict,
                }));
                Ok(self.none_ident())
            }
            "copy" => {
                self.expect_arg_count(method, args, 0)?;
                let mut rtval = self.storage_ident_from_hint(hint);
                self.check_storage_type_info(&mut rtval, &dict.info.clone())?;
                self.add_assignment(
                    hint,
                    rtval.clone(),
                    OperationInst::CCall1 {
                        name: abi::DICT_COPY,
                        arg: dict,
                    },
                );
                Ok(rtval)
            }
            "get" => Err(CompileError::unsupported(
                self.current_op_span,
                "`dict.get` is not implemented",
            )),
            "items" => {
                self.expect_arg_count(method, args, 0)?;
                let info = TypeInfo::Iter(Box::new(TypeInfo::DictItems(
                    Box::new(key),
                    Box::new(value),
                )));
                self.render_dict_iter(hint, dict, abi::DICT_ITEMS, info)
            }
            "keys" => {
                self.expect_arg_count(method, args, 0)?;
                let info = TypeInfo::Iter(Box::new(key));
                self.render_dict_iter(hint, dict, abi::DICT_KEYS, info)
            }
            "values" => {
                self.expect_arg_count(method, args, 0)?;
                let info = TypeInfo::Iter(Box::new(value));
                self.render_dict_iter(hint, dict, abi::DICT_VALUES, info)
            }
            "pop" => {
                self.expect_arg_count(method, args, 1)?;
                let key_ident = self.render_expression(
                    &StorageHint::Typed(key),
                    &args.values[0],
                )?;
                let mut rtval = self.storage_ident_from_hint(hint);
                self.check_storage_type_info(&mut rtval, &value)?;
                if !hint.has_dest() {
                    self.add_instruction(Instruction::DeclareVariable(rtval.clone()));
                }
                self.add_instruction(Instruction::Operation(OperationInst::CCall {
                    name: abi::DICT_POP,
                    args: vec![
                        dict,
                        key_ident.by_reference(),
                        rtval.clone().by_reference(),
                    ],
                }));
                Ok(rtval)
            }
            "popitem" => Err(CompileError::unsupported(
                self.current_op_span,
                "`dict.popitem` is not implemented",
            )),
            "update" => {
                self.expect_arg_count(method, args, 1)?;
                let other = self.render_expression(
                    &StorageHint::Typed(dict.info.clone()),
                    &args.values[0],
                )?;
                self.add_instruction(Instruction::Operation(OperationInst::CCall {
                    name: abi::DICT_UPDATE,
                    args: vec![dict, other],
                }));
                Ok(self.none_ident())
            }
            _ => Err(CompileError::name_error(
                self.current_op_span,
                format!("unknown dict method `{method}`"),
            )),
        }
    }

    fn render_dict_iter(
        &mut self,
        hint: &StorageHint,
        dict: StorageIdent,
        name: &'static str,
        info: TypeInfo,
    ) -> Result<StorageIdent, CompileError> {
        let mut rtval = self.storage_ident_from_hint(hint);
        self.check_storage_type_info(&mut rtval, &info)?;
        self.add_assignment(
            hint,
            rtval.clone(),
            OperationInst::CCall1 { name, arg: dict },
        );
        Ok(rtval)
    }
}
