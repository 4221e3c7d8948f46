//! Lowering tests for control flow, closures, and object dispatch.

use indoc::indoc;
use viper_core::abi;

use crate::analyze::symbol_table::Symbol;
use crate::analyze::types::TypeInfo;
use crate::diagnostics::ErrorKind;
use crate::ir::{IdentKind, Instruction, OperationInst};
use crate::pool::{ScopeId, VarKind};

use super::compile_tests::{flatten, lower, lower_err};

#[test]
fn while_loop_negated_condition_break() {
    let lowered = lower(indoc! {"
        n = 0
        while n < 10:
            n += 1
    "});

    let (before, after_label, after) = lowered
        .instructions
        .seq
        .iter()
        .find_map(|inst| match inst {
            Instruction::Loop {
                before,
                after_label,
                after,
                ..
            } => Some((before, after_label, after)),
            _ => None,
        })
        .expect("while lowers to a Loop");

    // the negated condition break lives in `before`
    let guard = before
        .iter()
        .find_map(|inst| match inst {
            Instruction::If { negate, body, .. } => Some((negate, body)),
            _ => None,
        })
        .expect("condition guard");
    assert!(*guard.0);
    assert!(matches!(guard.1[0], Instruction::Break));

    // the continue label sits in `after`
    assert!(matches!(&after[0], Instruction::Label(label) if label == after_label));
}

#[test]
fn if_elif_else_produces_exit_gotos() {
    let lowered = lower(indoc! {"
        x = 1
        if x == 1:
            y = 1
        elif x == 2:
            y = 2
        else:
            y = 3
    "});
    let seq = &lowered.instructions.seq;

    let ifs: Vec<_> = seq
        .iter()
        .filter(|inst| matches!(inst, Instruction::If { .. }))
        .collect();
    assert_eq!(ifs.len(), 2);
    assert!(seq.iter().any(|inst| matches!(inst, Instruction::Else(_))));

    // each taken branch jumps to the shared exit label
    let exit_label = seq
        .iter()
        .find_map(|inst| match inst {
            Instruction::Label(label) => Some(label.clone()),
            _ => None,
        })
        .expect("exit label");
    for inst in &ifs {
        let Instruction::If { body, .. } = inst else { unreachable!() };
        assert!(matches!(
            body.last(),
            Some(Instruction::Goto(label)) if *label == exit_label
        ));
    }
}

#[test]
fn plain_if_has_no_exit_label() {
    let lowered = lower(indoc! {"
        x = 1
        if x == 1:
            y = 2
    "});
    assert!(
        !lowered
            .instructions
            .seq
            .iter()
            .any(|inst| matches!(inst, Instruction::Label(_)))
    );
}

#[test]
fn assert_raises_through_the_runtime() {
    let lowered = lower("assert 1 == 2\n");
    let guard = lowered
        .instructions
        .seq
        .iter()
        .find_map(|inst| match inst {
            Instruction::If { negate, body, .. } => Some((negate, body)),
            _ => None,
        })
        .expect("assert guard");
    assert!(*guard.0);
    let Instruction::Operation(OperationInst::CCall1 { name, arg }) = &guard.1[0] else {
        panic!("assert failure calls the runtime");
    };
    assert_eq!(*name, abi::ASSERTION_ERROR);
    assert!(matches!(arg.kind, IdentKind::IntLiteral(1))); // line number
}

#[test]
fn break_and_continue_lower_to_raw_instructions() {
    let lowered = lower(indoc! {"
        n = 0
        while n < 3:
            if n == 1:
                break
            continue
    "});
    let all = flatten(&lowered.instructions.seq);
    assert!(all.iter().any(|i| matches!(i, Instruction::Break)));
    assert!(all.iter().any(|i| matches!(i, Instruction::Continue)));
}

// ----------------------------------------------------------------------
// closures

#[test]
fn closure_offsets_accumulate_by_size() {
    let lowered = lower(indoc! {"
        def outer() -> int:
            count: int = 1
            label: str = \"x\"
            flag: bool = True
            def inner() -> int:
                if flag:
                    return count
                return 0
            return inner()
    "});

    // module scope is allocated first; outer's scope holds the closure vars
    let module = lowered.pool.scope(ScopeId::from_raw(0));
    let Symbol::Function(outer_id) = module.table.symbol(module.table.get("outer").unwrap())
    else {
        panic!("outer is a function");
    };
    let outer_scope = lowered.pool.scope(lowered.pool.func(*outer_id).scope);

    let offsets: Vec<(String, usize, usize)> = outer_scope
        .table
        .iter_entries()
        .filter_map(|(key, sym)| match sym {
            Symbol::Variable(id) => {
                let var = lowered.pool.var(*id);
                (var.kind == VarKind::Closure).then(|| {
                    (
                        key.to_owned(),
                        var.closure_offset,
                        var.type_info.size_of().unwrap(),
                    )
                })
            }
            _ => None,
        })
        .collect();

    // declaration order: count (int, 8), label (str, 24), flag (bool, 1)
    assert_eq!(offsets.len(), 3);
    assert_eq!(offsets[0], ("count".into(), 0, 8));
    assert_eq!(offsets[1], ("label".into(), 8, 24));
    assert_eq!(offsets[2], ("flag".into(), 32, 1));

    // the InitClosure slot carries the total
    assert_eq!(lowered.instructions.closure_sizes, vec![33]);

    // the parent body starts with the closure allocation
    let outer_body = lowered
        .instructions
        .seq
        .iter()
        .find_map(|inst| match inst {
            Instruction::DefineFunction { body, .. } => Some(body),
            _ => None,
        })
        .expect("outer is defined");
    assert!(matches!(outer_body[0], Instruction::InitClosure { size_slot: 0 }));

    // returns from the parent free the closure
    let frees_closure = flatten(outer_body).into_iter().any(|inst| {
        matches!(
            inst,
            Instruction::Return {
                should_free_closure: true,
                ..
            }
        )
    });
    assert!(frees_closure);
}

#[test]
fn closure_child_copies_the_context() {
    let lowered = lower(indoc! {"
        def outer() -> int:
            total: int = 3
            def inner() -> int:
                return total
            return inner()
    "});

    // inner's function object takes the live __ctx__ at definition time
    let sets_ctx = flatten(&lowered.instructions.seq).into_iter().any(|inst| {
        matches!(
            inst,
            Instruction::Operation(OperationInst::SetAttr { attr, value, .. })
                if attr == "ctx"
                    && matches!(&value.kind, IdentKind::CStr(name) if name == "__ctx__")
        )
    });
    assert!(sets_ctx);
}

// ----------------------------------------------------------------------
// object operator dispatch

const VEC_CLASS: &str = indoc! {"
    class Vec:
        x: int
        def __add__(self, other: Vec) -> Vec:
            return Vec(self.x + other.x)
"};

#[test]
fn object_add_dispatches_to_dunder() {
    let source = format!("{VEC_CLASS}a = Vec(1)\nb = Vec(2)\nc = a + b\n");
    let lowered = lower(&source);

    // the operation becomes a bound call on the method's function object
    let calls = flatten(&lowered.instructions.seq)
        .into_iter()
        .filter(|inst| {
            matches!(
                inst,
                Instruction::Assignment {
                    right: OperationInst::FunctionCall { .. },
                    ..
                } | Instruction::DeclAssignment {
                    right: OperationInst::FunctionCall { .. },
                    ..
                }
            )
        })
        .count();
    assert!(calls >= 1);

    // self is bound through the context slot
    let binds_self = flatten(&lowered.instructions.seq).into_iter().any(|inst| {
        matches!(
            inst,
            Instruction::Operation(OperationInst::SetAttr { attr, .. }) if attr == "self"
        )
    });
    assert!(binds_self);
}

#[test]
fn object_add_without_slot_is_a_type_error() {
    let source = indoc! {"
        class Pt:
            x: int
        a = Pt(1)
        b = a + 3
    "};
    let err = lower_err(source);
    assert_eq!(err.kind, ErrorKind::Type);
}

#[test]
fn reflected_add_binds_self_to_the_right_operand() {
    let source = indoc! {"
        class Wrap:
            v: int
            def __radd__(self, other: int) -> int:
                return self.v + other
        w = Wrap(1)
        r = 3 + w
    "};
    let lowered = lower(source);
    // the result type comes from __radd__'s return annotation
    let module = lowered.pool.scope(ScopeId::from_raw(0));
    let Symbol::Variable(r) = module.table.symbol(module.table.get("r").unwrap()) else {
        panic!("r is a variable");
    };
    assert!(matches!(lowered.pool.var(*r).type_info, TypeInfo::Int));
}

#[test]
fn object_iadd_dispatches_in_place() {
    let source = indoc! {"
        class Acc:
            v: int
            def __iadd__(self, other: int) -> Acc:
                return Acc(self.v + other)
        a = Acc(0)
        a += 5
    "};
    let lowered = lower(source);
    // the receiver is reassigned from the bound call's result
    let reassigned = flatten(&lowered.instructions.seq).into_iter().any(|inst| {
        matches!(
            inst,
            Instruction::Assignment {
                left,
                right: OperationInst::FunctionCall { .. },
            } if matches!(left.kind, IdentKind::Var(_))
        )
    });
    assert!(reassigned);
}

#[test]
fn init_runs_after_allocation() {
    let source = indoc! {"
        class P:
            x: int
            def __init__(self, x: int) -> None:
                self.x = x * 2
        p = P(4)
    "};
    let lowered = lower(source);
    let seq = &lowered.instructions.seq;

    let alloc_pos = seq.iter().position(|inst| {
        matches!(
            inst,
            Instruction::Assignment {
                right: OperationInst::CCall1 { name, .. },
                ..
            } | Instruction::DeclAssignment {
                right: OperationInst::CCall1 { name, .. },
                ..
            } if *name == abi::ALLOC
        )
    });
    assert!(alloc_pos.is_some());

    // a bound call follows the allocation at module level
    let call_pos = seq.iter().position(|inst| {
        matches!(
            inst,
            Instruction::Assignment {
                right: OperationInst::FunctionCall { .. },
                ..
            } | Instruction::DeclAssignment {
                right: OperationInst::FunctionCall { .. },
                ..
            }
        )
    });
    assert!(call_pos.unwrap() > alloc_pos.unwrap());
}

#[test]
fn dict_items_loop_unpacks_key_and_value() {
    let lowered = lower(indoc! {"
        d: dict[str, int] = {\"a\": 1}
        for k, v in d.items():
            print(k, v)
    "});

    let before = lowered
        .instructions
        .seq
        .iter()
        .find_map(|inst| match inst {
            Instruction::Loop { before, .. } => Some(before),
            _ => None,
        })
        .expect("for lowers to a Loop");

    // key and val pointers are read off the DictItem and deref'd
    let reads_key = before.iter().any(|inst| {
        matches!(
            inst,
            Instruction::DeclAssignment {
                right: OperationInst::GetAttr { attr, .. },
                ..
            } | Instruction::Assignment {
                right: OperationInst::GetAttr { attr, .. },
                ..
            } if attr == "key"
        )
    });
    let derefs = before
        .iter()
        .filter(|inst| {
            matches!(
                inst,
                Instruction::Assignment {
                    right: OperationInst::Deref { .. },
                    ..
                }
            )
        })
        .count();
    assert!(reads_key);
    assert_eq!(derefs, 2);
}

#[test]
fn semi_scoped_loop_variable_is_released() {
    let lowered = lower(indoc! {"
        xs: list[int] = [1]
        for x in xs:
            print(x)
    "});
    let module = lowered.pool.scope(ScopeId::from_raw(0));
    let Symbol::Variable(x) = module.table.symbol(module.table.get("x").unwrap()) else {
        panic!("x is a variable");
    };
    let var = lowered.pool.var(*x);
    assert_eq!(var.kind, VarKind::SemiScoped);
    assert!(!var.directly_in_scope);
    // the loop gave it a mangled name
    assert!(var.compiled_name.starts_with("_np_"));
}

#[test]
fn except_as_capture_is_unsupported() {
    let err = lower_err(indoc! {"
        try:
            x = 1
        except KeyError as e:
            pass
    "});
    assert_eq!(err.kind, ErrorKind::Unsupported);
}

#[test]
fn unknown_exception_class_is_rejected() {
    let err = lower_err(indoc! {"
        try:
            x = 1
        except FrobnicationError:
            pass
    "});
    assert_eq!(err.kind, ErrorKind::Unsupported);
}

#[test]
fn return_outside_function_is_a_syntax_error() {
    let err = lower_err("return 1\n");
    assert_eq!(err.kind, ErrorKind::Syntax);
}
