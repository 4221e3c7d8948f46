//! Emitter tests: section placement, hoisting, casts.

use indoc::indoc;
use viper_core::SourceFile;

use super::write_c_program;
use crate::compile::{Lowered, compile};
use crate::parser::parse;

fn emit(source: &str) -> String {
    let file = SourceFile::new("test.vp", source);
    let parsed = parse(&file).expect("source should parse");
    let lowered: Lowered = compile(parsed, &file).expect("source should lower");
    write_c_program(&lowered).expect("lowered program should emit")
}

#[test]
fn sections_appear_in_order() {
    let c = emit("a: int = 1\n");
    let forward = c.find("// FORWARD").unwrap();
    let typedefs = c.find("// TYPEDEFS").unwrap();
    let decls = c.find("// DECLARATIONS").unwrap();
    let defs = c.find("// FUNCTION DEFINITIONS").unwrap();
    let init = c.find("// INIT MODULE").unwrap();
    let main = c.find("// MAIN FUNCTION").unwrap();
    assert!(forward < typedefs && typedefs < decls && decls < defs);
    assert!(defs < init && init < main);
}

#[test]
fn runtime_header_always_included() {
    let c = emit("a: int = 1\n");
    assert!(c.contains("#include <not_python.h>"));
    assert!(!c.contains("#include <math.h>"));
}

#[test]
fn math_header_included_on_demand() {
    let c = emit("x = 2 ** 8\n");
    assert!(c.contains("#include <math.h>"));
    assert!(c.contains("pow("));
}

#[test]
fn module_variables_hoist_out_of_init() {
    let c = emit("a: int = 1 + 2\n");
    let decls_start = c.find("// DECLARATIONS").unwrap();
    let init_start = c.find("init_module").unwrap();
    let decl_pos = c.find("NpInt a;").expect("module variable declared");
    assert!(decl_pos > decls_start && decl_pos < init_start);
    // the assignment itself stays in init, over the rendered operand temps
    let assign_pos = c.find("a = _np_0 + _np_1;").expect("initializer assigned");
    assert!(assign_pos > init_start);
}

#[test]
fn string_constants_table_is_emitted() {
    let c = emit("s: str = \"hello\"\n");
    assert!(c.contains("NpString NOT_PYTHON_STRING_CONSTANTS[] = {"));
    assert!(c.contains("{.data=\"hello\", .length=5}"));
    assert!(c.contains("NOT_PYTHON_STRING_CONSTANTS[0]"));
}

#[test]
fn division_casts_to_float() {
    let c = emit("x = 7 / 2\n");
    assert!(c.contains("((NpFloat)_np_0) / ((NpFloat)_np_1)"));
}

#[test]
fn floor_division_truncates_through_int_cast() {
    let c = emit("x = 7 // 2\n");
    assert!(c.contains("(NpInt)(((NpFloat)_np_0) / ((NpFloat)_np_1))"));
}

#[test]
fn function_call_casts_through_addr() {
    let c = emit(indoc! {"
        def double(n: int) -> int:
            return n + n
        x = double(3)
    "});
    // definition takes the context first
    assert!(c.contains("NpInt _np_0(NpContext __ctx__, NpInt n)"));
    // call site casts the object's addr and passes its ctx first
    assert!(c.contains("((NpInt (*)(NpContext, NpInt))double.addr)(double.ctx, "));
}

#[test]
fn class_typedef_lists_members() {
    let c = emit(indoc! {"
        class C:
            x: int
            y: float
        c = C(1, 2.0)
    "});
    assert!(c.contains("typedef struct { NpInt x; NpFloat y; } C;"));
    assert!(c.contains("np_alloc(16)"));
    assert!(c.contains("->x = "));
}

#[test]
fn while_loop_renders_with_break_guard() {
    let c = emit(indoc! {"
        n = 0
        while n < 3:
            n = n + 1
    "});
    assert!(c.contains("while (1) {"));
    assert!(c.contains("break;"));
    // the continue label trails the body
    assert!(c.contains("_np_0:;"));
}

#[test]
fn continue_jumps_to_the_loop_after_label() {
    let c = emit(indoc! {"
        n = 0
        while n < 3:
            n = n + 1
            continue
    "});
    assert!(c.contains("goto _np_0;"));
}

#[test]
fn closure_variables_read_through_the_context_block() {
    let c = emit(indoc! {"
        def outer() -> int:
            total: int = 0
            def inner() -> int:
                return total
            return inner()
    "});
    assert!(c.contains("__ctx__.closure = np_alloc("));
    assert!(c.contains("(*(NpInt*)((char*)__ctx__.closure + 0))"));
    assert!(c.contains("np_free(__ctx__.closure);"));
}

#[test]
fn iter_next_advances_and_unpacks() {
    let c = emit(indoc! {"
        xs: list[int] = [1, 2]
        for x in xs:
            print(x)
    "});
    assert!(c.contains(".next_data = "));
    assert!(c.contains("np_list_iter("));
    // unpack through the iterator's element type
    assert!(c.contains("*((NpInt*)"));
}

#[test]
fn assert_emits_line_number() {
    let c = emit("a = 1\nassert a == 1\n");
    assert!(c.contains("assertion_error(2);"));
}

#[test]
fn main_calls_init_module() {
    let c = emit("a: int = 1\n");
    assert!(c.contains("int main(void) {\ninit_module();\n"));
    assert!(c.contains("return 0;\n}"));
}
