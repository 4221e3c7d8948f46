//! Lowering tests over whole-program scenarios.

use indoc::indoc;
use viper_core::{SourceFile, abi};

use crate::analyze::types::TypeInfo;
use crate::diagnostics::ErrorKind;
use crate::ir::{IdentKind, Instruction, OperationInst};
use crate::op::Op;
use crate::parser::parse;

use super::{Lowered, compile};

pub(crate) fn lower(source: &str) -> Lowered {
    let file = SourceFile::new("test.vp", source);
    let parsed = parse(&file).expect("source should parse");
    compile(parsed, &file).expect("source should lower")
}

pub(crate) fn lower_err(source: &str) -> crate::diagnostics::CompileError {
    let file = SourceFile::new("test.vp", source);
    match parse(&file) {
        Err(err) => err,
        Ok(parsed) => {
            compile(parsed, &file).expect_err("lowering should fail")
        }
    }
}

/// Every instruction in the whole tree, flattened.
pub(crate) fn flatten(seq: &[Instruction]) -> Vec<&Instruction> {
    let mut out = Vec::new();
    for inst in seq {
        out.push(inst);
        match inst {
            Instruction::If { body, .. } | Instruction::Else(body) => {
                out.extend(flatten(body));
            }
            Instruction::Loop {
                init,
                before,
                body,
                after,
                ..
            } => {
                out.extend(flatten(init));
                out.extend(flatten(before));
                out.extend(flatten(body));
                out.extend(flatten(after));
            }
            Instruction::DefineFunction { body, .. }
            | Instruction::DefineClass { body, .. } => {
                out.extend(flatten(body));
            }
            _ => {}
        }
    }
    out
}

fn ccalls<'a>(seq: &'a [Instruction]) -> Vec<&'a str> {
    flatten(seq)
        .into_iter()
        .filter_map(|inst| match inst {
            Instruction::Assignment { right, .. }
            | Instruction::DeclAssignment { right, .. }
            | Instruction::Operation(right) => match right {
                OperationInst::CCall { name, .. } => Some(*name),
                OperationInst::CCall1 { name, .. } => Some(*name),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

// ----------------------------------------------------------------------
// scenario: annotated arithmetic assignment

#[test]
fn annotated_int_assignment() {
    let lowered = lower("a: int = 1 + 2\n");
    let seq = &lowered.instructions.seq;

    // the module variable is declared up front...
    let Instruction::DeclareVariable(decl) = &seq[0] else {
        panic!("expected a module-level declaration first");
    };
    let IdentKind::Var(var_id) = &decl.kind else {
        panic!("module declarations reference variables");
    };
    assert!(matches!(lowered.pool.var(*var_id).type_info, TypeInfo::Int));

    // the literals render into fresh temporaries first
    let literal_copies = seq
        .iter()
        .filter(|inst| {
            matches!(
                inst,
                Instruction::DeclAssignment {
                    right: OperationInst::Copy(source),
                    ..
                } if matches!(source.kind, IdentKind::IntLiteral(1 | 2))
            )
        })
        .count();
    assert_eq!(literal_copies, 2);

    // ...and the destination variable takes the sum without a second
    // declaration
    let assignment = seq
        .iter()
        .find_map(|inst| match inst {
            Instruction::Assignment { left, right } => Some((left, right)),
            _ => None,
        })
        .expect("initializer lowers to a plain assignment");
    assert!(matches!(assignment.0.kind, IdentKind::Var(_)));
    let OperationInst::Intrinsic { op, left, right } = assignment.1 else {
        panic!("1 + 2 lowers to an intrinsic");
    };
    assert_eq!(*op, Op::Plus);
    assert!(left.is_some());
    assert!(matches!(right.kind, IdentKind::CStr(_)));

    // and no string constants
    assert!(lowered.instructions.str_constants.is_empty());
}

// ----------------------------------------------------------------------
// scenario: print with a conversion

#[test]
fn print_converts_non_string_arguments() {
    let lowered = lower("print(\"x\", 1)\n");
    let seq = &lowered.instructions.seq;

    let names = ccalls(seq);
    assert!(names.contains(&abi::INT_TO_STR));
    assert!(names.contains(&abi::PRINT));

    // exactly one interned string constant
    let constants: Vec<&str> = lowered.instructions.str_constants.iter().collect();
    assert_eq!(constants, vec!["x"]);

    // print receives the argument count first
    let print_args = flatten(seq)
        .into_iter()
        .find_map(|inst| match inst {
            Instruction::Assignment { right, .. }
            | Instruction::DeclAssignment { right, .. } => match right {
                OperationInst::CCall { name, args } if *name == abi::PRINT => Some(args),
                _ => None,
            },
            _ => None,
        })
        .expect("print lowers to a runtime call");
    assert!(matches!(print_args[0].kind, IdentKind::IntLiteral(2)));
    assert_eq!(print_args.len(), 3);
}

// ----------------------------------------------------------------------
// scenario: for loop over a list literal

#[test]
fn for_loop_over_list_literal() {
    let lowered = lower(indoc! {"
        for x in [1, 2, 3]:
            print(x)
    "});
    let seq = &lowered.instructions.seq;

    let (init, before, body) = seq
        .iter()
        .find_map(|inst| match inst {
            Instruction::Loop {
                init, before, body, ..
            } => Some((init, before, body)),
            _ => None,
        })
        .expect("the for loop lowers to a Loop instruction");

    let init_calls = ccalls(init);
    assert!(init_calls.contains(&abi::LIST_INIT));
    assert_eq!(
        init_calls.iter().filter(|n| **n == abi::LIST_APPEND).count(),
        3
    );
    assert!(init_calls.contains(&abi::LIST_ITER));

    // before: advance, then break when exhausted
    assert!(
        before
            .iter()
            .any(|inst| matches!(inst, Instruction::IterNext { .. }))
    );
    let break_guard = before
        .iter()
        .find_map(|inst| match inst {
            Instruction::If { negate, body, .. } => Some((negate, body)),
            _ => None,
        })
        .expect("exhaustion check");
    assert!(*break_guard.0);
    assert!(matches!(break_guard.1[0], Instruction::Break));

    assert!(ccalls(body).contains(&abi::PRINT));
}

// ----------------------------------------------------------------------
// scenario: function definition

#[test]
fn function_definition_shape() {
    let lowered = lower(indoc! {"
        def f(n: int) -> int:
            return n * n
    "});
    let seq = &lowered.instructions.seq;

    // module-level function object declaration named after the def
    let Instruction::DeclareVariable(decl) = &seq[0] else {
        panic!("function object declared first");
    };
    assert!(matches!(&decl.kind, IdentKind::CStr(name) if name == "f"));
    assert!(matches!(decl.info, TypeInfo::Function(_)));

    // its address points at the generated C function
    let addr = seq
        .iter()
        .find_map(|inst| match inst {
            Instruction::Operation(OperationInst::SetAttr { attr, value, .. })
                if attr == "addr" =>
            {
                Some(value)
            }
            _ => None,
        })
        .expect("the function object address is assigned");
    let IdentKind::CStr(addr_name) = &addr.kind else {
        panic!("address is a raw name");
    };

    let (function_name, body) = seq
        .iter()
        .find_map(|inst| match inst {
            Instruction::DefineFunction {
                function_name,
                body,
                ..
            } => Some((function_name, body)),
            _ => None,
        })
        .expect("the def lowers to DefineFunction");
    assert_eq!(function_name, addr_name);

    // body computes n * n and returns it
    let has_mult = flatten(body).into_iter().any(|inst| {
        matches!(
            inst,
            Instruction::Assignment {
                right: OperationInst::Intrinsic { op: Op::Mult, .. },
                ..
            } | Instruction::DeclAssignment {
                right: OperationInst::Intrinsic { op: Op::Mult, .. },
                ..
            }
        )
    });
    assert!(has_mult);
    assert!(
        body.iter()
            .any(|inst| matches!(inst, Instruction::Return { .. }))
    );
}

// ----------------------------------------------------------------------
// scenario: class definition and member access

#[test]
fn class_definition_and_member_sum() {
    let lowered = lower(indoc! {"
        class C:
            x: int
            y: int
        c = C(1, 2)
        print(c.x + c.y)
    "});
    let seq = &lowered.instructions.seq;

    let class_name = seq
        .iter()
        .find_map(|inst| match inst {
            Instruction::DefineClass { class_name, signature, .. } => {
                assert_eq!(signature.param_count(), 2);
                Some(class_name.clone())
            }
            _ => None,
        })
        .expect("the class lowers to DefineClass");
    assert_eq!(class_name, "C");

    // two ints -> 16 bytes; the module scope is always the first allocated
    let module = lowered.pool.scope(crate::pool::ScopeId::from_raw(0));
    let index = module.table.get("C").unwrap();
    let crate::analyze::symbol_table::Symbol::Class(class_id) = module.table.symbol(index)
    else {
        panic!("C is a class");
    };
    assert_eq!(lowered.pool.class(*class_id).nbytes, 16);

    // construction: alloc + one set_attr per member
    let calls = ccalls(seq);
    assert!(calls.contains(&abi::ALLOC));
    let set_attrs = flatten(seq)
        .into_iter()
        .filter(|inst| {
            matches!(
                inst,
                Instruction::Operation(OperationInst::SetAttr { attr, .. })
                    if attr == "x" || attr == "y"
            )
        })
        .count();
    assert_eq!(set_attrs, 2);

    // the sum reads both members and adds ints
    let get_attrs = flatten(seq)
        .into_iter()
        .filter(|inst| {
            matches!(
                inst,
                Instruction::Assignment {
                    right: OperationInst::GetAttr { attr, .. },
                    ..
                } | Instruction::DeclAssignment {
                    right: OperationInst::GetAttr { attr, .. },
                    ..
                } if attr == "x" || attr == "y"
            )
        })
        .count();
    assert_eq!(get_attrs, 2);
    assert!(calls.contains(&abi::INT_TO_STR));
}

// ----------------------------------------------------------------------
// scenario: try/except over a dict lookup

#[test]
fn try_except_key_error() {
    let lowered = lower(indoc! {"
        d: dict[str, int] = {\"k\": 1}
        x: int = 0
        try:
            x = d[\"k\"]
        except KeyError:
            pass
    "});
    let seq = &lowered.instructions.seq;

    // the caught-class bit is OR'd into the live mask
    let key_error_bit = abi::ExceptionFlag::KeyError.bit() as i64;
    let or_mask = flatten(seq).into_iter().any(|inst| {
        matches!(
            inst,
            Instruction::Assignment {
                right: OperationInst::Intrinsic {
                    op: Op::BitwiseOr,
                    right: ir_right,
                    ..
                },
                ..
            } if matches!(ir_right.kind, IdentKind::IntLiteral(bit) if bit == key_error_bit)
        )
    });
    assert!(or_mask);

    // the try body statement is followed by an exception check that jumps
    // to the dispatcher
    let has_exception_guard = flatten(seq).into_iter().any(|inst| {
        matches!(
            inst,
            Instruction::If { condition, negate: false, body, .. }
                if matches!(&condition.kind, IdentKind::CStr(name) if name == abi::GLOBAL_EXCEPTION)
                    && matches!(body.first(), Some(Instruction::Goto(_)))
        )
    });
    assert!(has_exception_guard);

    // the dispatcher reads the live exception and its type field
    assert!(ccalls(seq).contains(&abi::GET_EXCEPTION));
    let reads_type = flatten(seq).into_iter().any(|inst| {
        matches!(
            inst,
            Instruction::DeclAssignment {
                right: OperationInst::GetAttr { attr, .. },
                ..
            } if attr == "type"
        )
    });
    assert!(reads_type);

    // the mask is restored at the end
    let restores = flatten(seq)
        .into_iter()
        .filter(|inst| {
            matches!(
                inst,
                Instruction::Assignment { left, right: OperationInst::Copy(_), .. }
                    if matches!(&left.kind, IdentKind::CStr(name) if name == abi::CURRENT_EXCEPTS)
            )
        })
        .count();
    assert!(restores >= 2); // zeroing plus the restore
}

// ----------------------------------------------------------------------
// fatal type errors

#[test]
fn untyped_operation_is_fatal() {
    let err = lower_err("x = 1 + \"s\"\n");
    assert_eq!(err.kind, ErrorKind::Type);
}

#[test]
fn undefined_name_is_fatal() {
    let err = lower_err("x = missing + 1\n");
    assert_eq!(err.kind, ErrorKind::Type); // unresolvable operand type
}

#[test]
fn incompatible_reassignment_is_fatal() {
    let err = lower_err("x = 1\nx = \"s\"\n");
    assert_eq!(err.kind, ErrorKind::Type);
}

#[test]
fn calling_a_non_callable_is_fatal() {
    let err = lower_err("x = 1\ny = x()\n");
    assert_eq!(err.kind, ErrorKind::Type);
}

#[test]
fn empty_container_without_annotation_is_fatal() {
    let err = lower_err("xs = []\n");
    assert_eq!(err.kind, ErrorKind::Type);
}

#[test]
fn unknown_container_method_is_a_name_error() {
    let err = lower_err("xs: list[int] = [1]\nxs.frobnicate()\n");
    assert_eq!(err.kind, ErrorKind::Name);
}

#[test]
fn bare_container_method_reference_is_a_type_error() {
    let err = lower_err("xs: list[int] = [1]\nf = xs.append\n");
    assert_eq!(err.kind, ErrorKind::Type);
}

#[test]
fn unsupported_features_fail_fast() {
    assert_eq!(lower_err("import os\n").kind, ErrorKind::Unsupported);
    assert_eq!(
        lower_err("xs: list[int] = [1]\nys = [x for x in xs]\n").kind,
        ErrorKind::Unsupported
    );
    assert_eq!(
        lower_err("t = (1, 2)\n").kind,
        ErrorKind::Unsupported
    );
    assert_eq!(
        lower_err("xs: list[int] = [1, 2]\nys = xs[0:1]\n").kind,
        ErrorKind::Unsupported
    );
}

// ----------------------------------------------------------------------
// string operators route through the runtime

#[test]
fn string_operators_use_runtime_calls() {
    let lowered = lower(indoc! {"
        a: str = \"x\"
        b: str = \"y\"
        c = a + b
        t = a < b
    "});
    let calls = ccalls(&lowered.instructions.seq);
    assert!(calls.contains(&abi::STR_ADD));
    assert!(calls.contains(&abi::STR_LT));
}

#[test]
fn power_and_float_mod_require_math() {
    let lowered = lower("x = 2 ** 3\n");
    assert!(lowered.instructions.req.math);
    assert!(ccalls(&lowered.instructions.seq).contains(&abi::POW));

    let lowered = lower("x = 1.5 % 1\n");
    assert!(lowered.instructions.req.math);
    assert!(ccalls(&lowered.instructions.seq).contains(&abi::FMOD));

    let lowered = lower("x = 7 % 3\n");
    assert!(!lowered.instructions.req.math);
}

#[test]
fn subscripts_route_through_the_runtime() {
    let lowered = lower(indoc! {"
        xs: list[int] = [1, 2]
        d: dict[str, int] = {\"k\": 1}
        a = xs[0]
        b = d[\"k\"]
        xs[1] = 5
        d[\"j\"] = 2
    "});
    let calls = ccalls(&lowered.instructions.seq);
    assert!(calls.contains(&abi::LIST_GET_ITEM));
    assert!(calls.contains(&abi::DICT_GET_ITEM));
    assert!(calls.contains(&abi::LIST_SET_ITEM));
    assert!(calls.contains(&abi::DICT_SET_ITEM));
}
