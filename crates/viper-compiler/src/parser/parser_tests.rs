//! Unit tests for the parser and scope construction.

use indoc::indoc;
use viper_core::SourceFile;

use super::ast::{Operand, StmtKind};
use super::{Parsed, parse};
use crate::analyze::object_model::ObjectModel;
use crate::analyze::symbol_table::Symbol;
use crate::analyze::types::TypeInfo;
use crate::op::Op;
use crate::pool::{ScopeKind, VarKind};

fn parse_ok(source: &str) -> Parsed {
    parse(&SourceFile::new("test.vp", source)).expect("source should parse")
}

#[test]
fn operations_ordered_by_descending_precedence() {
    let parsed = parse_ok("x = 1 + 2 * 3\n");
    let StmtKind::Assignment { value, .. } = &parsed.statements[0].kind else {
        panic!("expected an assignment");
    };
    let ops: Vec<Op> = value.operations.iter().map(|o| o.op).collect();
    assert_eq!(ops, vec![Op::Mult, Op::Plus]);
    assert_eq!(value.operands.len(), 3);
}

#[test]
fn same_precedence_keeps_source_order() {
    let parsed = parse_ok("x = 1 - 2 + 3\n");
    let StmtKind::Assignment { value, .. } = &parsed.statements[0].kind else {
        panic!("expected an assignment");
    };
    let ops: Vec<Op> = value.operations.iter().map(|o| o.op).collect();
    assert_eq!(ops, vec![Op::Minus, Op::Plus]);
    // left-assoc wiring: `-` over (0,1), `+` over (1,2)
    assert_eq!(
        (value.operations[0].left, value.operations[0].right),
        (0, 1)
    );
    assert_eq!(
        (value.operations[1].left, value.operations[1].right),
        (1, 2)
    );
}

#[test]
fn postfix_chain_wiring() {
    let parsed = parse_ok("y = a.b(c)\n");
    let StmtKind::Assignment { value, .. } = &parsed.statements[0].kind else {
        panic!("expected an assignment");
    };
    let ops: Vec<Op> = value.operations.iter().map(|o| o.op).collect();
    assert_eq!(ops, vec![Op::GetAttr, Op::Call]);
    // get_attr(a, b) then call over the attr result and the arguments
    assert_eq!(value.operands.len(), 3);
    assert!(matches!(value.operands[2], Operand::Args(_)));
}

#[test]
fn prefix_binds_looser_than_pow() {
    let parsed = parse_ok("x = -n ** 2\n");
    let StmtKind::Assignment { value, .. } = &parsed.statements[0].kind else {
        panic!("expected an assignment");
    };
    let ops: Vec<Op> = value.operations.iter().map(|o| o.op).collect();
    assert_eq!(ops, vec![Op::Pow, Op::Negative]);
}

#[test]
fn assignment_declares_a_variable() {
    let parsed = parse_ok("counter = 0\n");
    let scope = parsed.pool.scope(parsed.module_scope);
    let index = scope.table.get("counter").expect("counter is declared");
    assert!(matches!(scope.table.symbol(index), Symbol::Variable(_)));
}

#[test]
fn annotation_fixes_the_type() {
    let parsed = parse_ok("a: int = 1 + 2\n");
    let scope = parsed.pool.scope(parsed.module_scope);
    let index = scope.table.get("a").unwrap();
    let Symbol::Variable(var_id) = scope.table.symbol(index) else {
        panic!("expected a variable");
    };
    assert!(matches!(parsed.pool.var(*var_id).type_info, TypeInfo::Int));
}

#[test]
fn composite_annotations() {
    let parsed = parse_ok("xs: list[int] = []\nd: dict[str, float] = {}\n");
    let scope = parsed.pool.scope(parsed.module_scope);
    let Symbol::Variable(xs) = scope.table.symbol(scope.table.get("xs").unwrap()) else {
        panic!();
    };
    assert!(matches!(
        &parsed.pool.var(*xs).type_info,
        TypeInfo::List(inner) if matches!(**inner, TypeInfo::Int)
    ));
    let Symbol::Variable(d) = scope.table.symbol(scope.table.get("d").unwrap()) else {
        panic!();
    };
    assert!(matches!(&parsed.pool.var(*d).type_info, TypeInfo::Dict(_, _)));
}

#[test]
fn def_builds_function_scope_and_symbol() {
    let parsed = parse_ok(indoc! {"
        def square(n: int) -> int:
            return n * n
    "});
    let scope = parsed.pool.scope(parsed.module_scope);
    let Symbol::Function(func_id) =
        scope.table.symbol(scope.table.get("square").unwrap())
    else {
        panic!("expected a function symbol");
    };
    let func = parsed.pool.func(*func_id);
    assert_eq!(func.sig.param_count(), 1);
    assert!(matches!(func.sig.return_type, TypeInfo::Int));

    let fn_scope = parsed.pool.scope(func.scope);
    assert_eq!(fn_scope.kind, ScopeKind::Function);
    let Symbol::Variable(param) =
        fn_scope.table.symbol(fn_scope.table.get("n").unwrap())
    else {
        panic!("expected the parameter variable");
    };
    assert_eq!(parsed.pool.var(*param).kind, VarKind::Argument);
}

#[test]
fn shadowing_resolves_to_the_inner_scope() {
    let parsed = parse_ok(indoc! {"
        x: int = 1
        def f() -> int:
            x: float = 2.0
            return 3
    "});
    let module = parsed.pool.scope(parsed.module_scope);
    let Symbol::Variable(outer) = module.table.symbol(module.table.get("x").unwrap())
    else {
        panic!();
    };
    assert!(matches!(parsed.pool.var(*outer).type_info, TypeInfo::Int));

    let Symbol::Function(func_id) =
        module.table.symbol(module.table.get("f").unwrap())
    else {
        panic!();
    };
    let inner_scope = parsed.pool.scope(parsed.pool.func(*func_id).scope);
    let Symbol::Variable(inner) =
        inner_scope.table.symbol(inner_scope.table.get("x").unwrap())
    else {
        panic!();
    };
    assert!(matches!(parsed.pool.var(*inner).type_info, TypeInfo::Float));
}

#[test]
fn nested_def_marks_closure_scopes() {
    let parsed = parse_ok(indoc! {"
        def outer() -> int:
            total: int = 0
            def inner() -> int:
                return total
            return inner()
    "});
    let module = parsed.pool.scope(parsed.module_scope);
    let Symbol::Function(outer_id) =
        module.table.symbol(module.table.get("outer").unwrap())
    else {
        panic!();
    };
    let outer_scope_id = parsed.pool.func(*outer_id).scope;
    let outer_scope = parsed.pool.scope(outer_scope_id);
    assert_eq!(outer_scope.kind, ScopeKind::ClosureParent);

    let Symbol::Variable(total) =
        outer_scope.table.symbol(outer_scope.table.get("total").unwrap())
    else {
        panic!();
    };
    assert_eq!(parsed.pool.var(*total).kind, VarKind::Closure);

    let Symbol::Function(inner_id) =
        outer_scope.table.symbol(outer_scope.table.get("inner").unwrap())
    else {
        panic!();
    };
    assert_eq!(
        parsed.pool.scope(parsed.pool.func(*inner_id).scope).kind,
        ScopeKind::ClosureChild
    );
}

#[test]
fn class_members_and_dunder_table() {
    let parsed = parse_ok(indoc! {"
        class Vec:
            x: int
            y: int
            def __add__(self, other: Vec) -> Vec:
                return Vec(self.x + other.x, self.y + other.y)
    "});
    let module = parsed.pool.scope(parsed.module_scope);
    let Symbol::Class(class_id) = module.table.symbol(module.table.get("Vec").unwrap())
    else {
        panic!("expected a class symbol");
    };
    let class = parsed.pool.class(*class_id);
    assert_eq!(class.sig.param_count(), 2);
    assert!(matches!(class.sig.return_type, TypeInfo::Object(_)));
    assert!(class.object_model[ObjectModel::Add.index()].is_some());
    assert!(class.object_model[ObjectModel::Sub.index()].is_none());

    let class_scope = parsed.pool.scope(class.scope);
    assert!(matches!(
        class_scope.table.symbol(class_scope.table.get("x").unwrap()),
        Symbol::Member(_, TypeInfo::Int)
    ));
}

#[test]
fn method_self_is_typed_to_the_class() {
    let parsed = parse_ok(indoc! {"
        class C:
            v: int
            def get(self) -> int:
                return self.v
    "});
    let module = parsed.pool.scope(parsed.module_scope);
    let Symbol::Class(class_id) = module.table.symbol(module.table.get("C").unwrap())
    else {
        panic!();
    };
    let class_scope = parsed.pool.scope(parsed.pool.class(*class_id).scope);
    let Symbol::Function(get_id) =
        class_scope.table.symbol(class_scope.table.get("get").unwrap())
    else {
        panic!();
    };
    let get = parsed.pool.func(*get_id);
    assert!(get.self_param.is_some());
    assert!(matches!(get.self_type, TypeInfo::Object(id) if id == *class_id));
    // self is not part of the marshalled signature
    assert_eq!(get.sig.param_count(), 0);
}

#[test]
fn for_loop_declares_semi_scoped_targets() {
    let parsed = parse_ok(indoc! {"
        xs: list[int] = [1]
        for x in xs:
            pass
    "});
    let module = parsed.pool.scope(parsed.module_scope);
    let Symbol::Variable(x) = module.table.symbol(module.table.get("x").unwrap())
    else {
        panic!();
    };
    assert_eq!(parsed.pool.var(*x).kind, VarKind::SemiScoped);
}

#[test]
fn unknown_type_is_a_name_error() {
    let err = parse(&SourceFile::new("test.vp", "a: Widget = 1\n")).unwrap_err();
    assert_eq!(err.kind, crate::diagnostics::ErrorKind::Name);
}

#[test]
fn class_without_members_is_rejected() {
    let source = indoc! {"
        class Empty:
            pass
    "};
    assert!(parse(&SourceFile::new("test.vp", source)).is_err());
}

#[test]
fn keyword_arguments_parse() {
    let parsed = parse_ok("r = f(1, 2, scale=3)\n");
    let StmtKind::Assignment { value, .. } = &parsed.statements[0].kind else {
        panic!();
    };
    let Operand::Args(args) = &value.operands[1] else {
        panic!("expected call arguments");
    };
    assert_eq!(args.n_positional, 2);
    assert_eq!(args.kwds.len(), 1);
    assert_eq!(args.values.len(), 3);
}

#[test]
fn try_except_finally_shape() {
    let parsed = parse_ok(indoc! {"
        try:
            x = 1
        except KeyError:
            x = 2
        except (IndexError, ValueError):
            x = 3
        finally:
            x = 4
    "});
    let StmtKind::Try(try_stmt) = &parsed.statements[0].kind else {
        panic!("expected a try statement");
    };
    assert_eq!(try_stmt.excepts.len(), 2);
    assert_eq!(try_stmt.excepts[1].exceptions.len(), 2);
    assert_eq!(try_stmt.finally.stmts.len(), 1);
}
