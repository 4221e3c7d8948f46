//! The C writer.
//!
//! Walks the instruction sequence once and emits C text into six sections:
//! forward (includes and the string-constant table), typedefs (class
//! structs), declarations (module-level variables), function definitions,
//! the `init_module` body, and the `main` body. Everything is dictated by
//! the IR: label generation happened during lowering, variable placement
//! follows the declare-hoisting rule, call sites cast through the function
//! object's `addr`.

use std::fmt::Write;

use viper_core::{Interner, abi};

use crate::analyze::types::{Signature, TypeInfo};
use crate::compile::Lowered;
use crate::ir::{
    CompiledInstructions, IdentKind, Instruction, OperationInst, StorageIdent,
};
use crate::op::Op;
use crate::pool::{Pool, VarKind};

/// Emission failures are internal defects (an untyped value escaped
/// lowering), not user errors.
#[derive(Debug, Clone, thiserror::Error)]
#[error("emit error: {0}")]
pub struct EmitError(String);

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Forward,
    Typedefs,
    Declarations,
    Defs,
    Init,
    Main,
}

const SECTION_COUNT: usize = 6;

/// Render a complete, standalone C translation unit.
pub fn write_c_program(lowered: &Lowered) -> Result<String, EmitError> {
    let mut writer = Writer {
        instructions: &lowered.instructions,
        pool: &lowered.pool,
        interner: &lowered.interner,
        sections: std::array::from_fn(|_| String::new()),
        def_stack: Vec::new(),
        current_loop_after: None,
    };
    writer.run()
}

struct Writer<'a> {
    instructions: &'a CompiledInstructions,
    pool: &'a Pool,
    interner: &'a Interner,
    sections: [String; SECTION_COUNT],
    /// In-progress function definitions. A nested definition completes (and
    /// lands in the defs section) before its parent, so the emitted text
    /// keeps definitions as siblings, inner first.
    def_stack: Vec<String>,
    current_loop_after: Option<String>,
}

impl Writer<'_> {
    fn run(&mut self) -> Result<String, EmitError> {
        self.push(Section::Forward, "// FORWARD COMPILER SECTION\n");
        self.push(
            Section::Forward,
            &format!("#include <{}>\n", abi::RUNTIME_HEADER),
        );
        if self.instructions.req.math {
            self.push(Section::Forward, "#include <math.h>\n");
        }
        self.write_string_constants();

        self.push(Section::Typedefs, "\n// TYPEDEFS COMPILER SECTION\n");
        self.push(Section::Declarations, "\n// DECLARATIONS COMPILER SECTION\n");
        self.push(Section::Defs, "\n// FUNCTION DEFINITIONS COMPILER SECTION\n");
        self.push(Section::Init, "\n// INIT MODULE FUNCTION COMPILER SECTION\n");
        self.push(Section::Init, "static void init_module(void) {\n");
        self.push(Section::Main, "\n// MAIN FUNCTION COMPILER SECTION\n");
        self.push(Section::Main, "int main(void) {\ninit_module();\n");

        let instructions = self.instructions;
        for inst in &instructions.seq {
            self.write_instruction(Section::Init, inst)?;
        }

        self.push(Section::Init, "}\n");
        self.push(Section::Main, "return 0;\n}\n");

        Ok(self.sections.join(""))
    }

    fn push(&mut self, section: Section, text: &str) {
        if section == Section::Defs {
            if let Some(top) = self.def_stack.last_mut() {
                top.push_str(text);
                return;
            }
        }
        self.sections[section as usize].push_str(text);
    }

    fn write_string_constants(&mut self) {
        let out = &mut self.sections[Section::Forward as usize];
        if self.instructions.str_constants.is_empty() {
            return;
        }
        let _ = write!(
            out,
            "{} {}[] = {{\n",
            abi::TYPE_STRING,
            abi::STRING_CONSTANTS_TABLE
        );
        for (i, s) in self.instructions.str_constants.iter().enumerate() {
            if i > 0 {
                out.push_str(",\n");
            }
            let _ = write!(out, "{{.data=\"{}\", .length={}}}", s, s.len());
        }
        out.push_str("};\n");
    }

    // ------------------------------------------------------------------
    // leaf renderers

    fn type_name(&self, info: &TypeInfo) -> Result<String, EmitError> {
        let name = match info {
            TypeInfo::Untyped => {
                return Err(EmitError("untyped value reached the writer".into()));
            }
            TypeInfo::None => abi::TYPE_NONE.into(),
            TypeInfo::Int => abi::TYPE_INT.into(),
            TypeInfo::Unsigned => abi::TYPE_UNSIGNED.into(),
            TypeInfo::Float => abi::TYPE_FLOAT.into(),
            TypeInfo::Bool => abi::TYPE_BOOL.into(),
            TypeInfo::String => abi::TYPE_STRING.into(),
            TypeInfo::Byte => abi::TYPE_BYTE.into(),
            TypeInfo::Pointer => abi::TYPE_POINTER.into(),
            TypeInfo::CStr => abi::TYPE_CSTR.into(),
            TypeInfo::List(_) => abi::TYPE_LIST.into(),
            TypeInfo::Dict(_, _) => abi::TYPE_DICT.into(),
            TypeInfo::DictItems(_, _) => abi::TYPE_DICT_ITEMS.into(),
            TypeInfo::Iter(_) => abi::TYPE_ITER.into(),
            TypeInfo::Function(_) => abi::TYPE_FUNCTION.into(),
            TypeInfo::Context => abi::TYPE_CONTEXT.into(),
            TypeInfo::Exception => abi::TYPE_EXCEPTION.into(),
            TypeInfo::Object(class_id) => {
                format!("{}*", self.pool.class(*class_id).ns_ident)
            }
            TypeInfo::Tuple(_) | TypeInfo::Slice => {
                return Err(EmitError(format!(
                    "no C syntax for type `{}`",
                    info.describe()
                )));
            }
        };
        Ok(name)
    }

    fn ident(&self, ident: &StorageIdent) -> Result<String, EmitError> {
        let mut out = String::new();
        if ident.reference {
            out.push('&');
        }
        match &ident.kind {
            IdentKind::CStr(name) => out.push_str(name),
            IdentKind::Var(var_id) => {
                let var = self.pool.var(*var_id);
                if var.kind == VarKind::Closure {
                    // closure variables live in the context block at a
                    // fixed offset
                    let type_name = self.type_name(&var.type_info)?;
                    let _ = write!(
                        out,
                        "(*({type_name}*)((char*)__ctx__.closure + {}))",
                        var.closure_offset
                    );
                } else {
                    out.push_str(&var.compiled_name);
                }
            }
            IdentKind::IntLiteral(value) => {
                let _ = write!(out, "{value}");
            }
            IdentKind::FloatLiteral(value) => {
                let _ = write!(out, "{value:?}");
            }
            IdentKind::StrLiteral(index) => {
                let _ = write!(out, "{}[{index}]", abi::STRING_CONSTANTS_TABLE);
            }
        }
        Ok(out)
    }

    fn casted_ident(
        &self,
        cast: &TypeInfo,
        ident: &StorageIdent,
    ) -> Result<String, EmitError> {
        Ok(format!(
            "(({}){})",
            self.type_name(cast)?,
            self.ident(ident)?
        ))
    }

    /// Attribute access picks `.` or `->` by the object's representation.
    fn ident_attr(&self, object: &StorageIdent, attr: &str) -> Result<String, EmitError> {
        let accessor = match &object.info {
            TypeInfo::String
            | TypeInfo::Iter(_)
            | TypeInfo::Function(_)
            | TypeInfo::Context
            | TypeInfo::DictItems(_, _) => ".",
            TypeInfo::List(_)
            | TypeInfo::Dict(_, _)
            | TypeInfo::Object(_)
            | TypeInfo::Exception
            | TypeInfo::Pointer => "->",
            other => {
                return Err(EmitError(format!(
                    "unexpected attribute access on `{}`",
                    other.describe()
                )));
            }
        };
        Ok(format!("{}{}{}", self.ident(object)?, accessor, attr))
    }

    fn intrinsic(
        &self,
        op: Op,
        left: Option<&StorageIdent>,
        right: &StorageIdent,
    ) -> Result<String, EmitError> {
        let binary = |symbol: &str| -> Result<String, EmitError> {
            let left = left.ok_or_else(|| {
                EmitError(format!("binary `{}` without a left operand", op.as_str()))
            })?;
            Ok(format!(
                "{} {symbol} {}",
                self.ident(left)?,
                self.ident(right)?
            ))
        };

        match op {
            Op::Plus => binary("+"),
            Op::Minus => binary("-"),
            Op::Mult => binary("*"),
            Op::Mod => binary("%"),
            Op::Equal => binary("=="),
            Op::NotEqual => binary("!="),
            Op::Greater => binary(">"),
            Op::Less => binary("<"),
            Op::GreaterEqual => binary(">="),
            Op::LessEqual => binary("<="),
            Op::BitwiseAnd => binary("&"),
            Op::BitwiseOr => binary("|"),
            Op::BitwiseXor => binary("^"),
            Op::Lshift => binary("<<"),
            Op::Rshift => binary(">>"),
            Op::LogicalAnd => binary("&&"),
            Op::LogicalOr => binary("||"),
            Op::Div => {
                let left = left
                    .ok_or_else(|| EmitError("`/` without a left operand".into()))?;
                Ok(format!(
                    "{} / {}",
                    self.casted_ident(&TypeInfo::Float, left)?,
                    self.casted_ident(&TypeInfo::Float, right)?
                ))
            }
            Op::FloorDiv => {
                let left = left
                    .ok_or_else(|| EmitError("`//` without a left operand".into()))?;
                Ok(format!(
                    "({})({} / {})",
                    abi::TYPE_INT,
                    self.casted_ident(&TypeInfo::Float, left)?,
                    self.casted_ident(&TypeInfo::Float, right)?
                ))
            }
            Op::LogicalNot => Ok(format!("!{}", self.ident(right)?)),
            Op::Negative => Ok(format!("-{}", self.ident(right)?)),
            Op::BitwiseNot => Ok(format!("~{}", self.ident(right)?)),
            Op::Is => binary("=="),
            other => Err(EmitError(format!(
                "`{}` has no intrinsic rendering",
                other.as_str()
            ))),
        }
    }

    fn operation(&self, operation: &OperationInst) -> Result<String, EmitError> {
        match operation {
            OperationInst::Intrinsic { op, left, right } => {
                self.intrinsic(*op, left.as_ref(), right)
            }
            OperationInst::FunctionCall { function, args } => {
                let TypeInfo::Function(sig) = &function.info else {
                    return Err(EmitError(
                        "call through a non-function value reached the writer".into(),
                    ));
                };

                // ((ret (*)(NpContext, params...))f.addr)(f.ctx, args...)
                let mut out = String::from("((");
                out.push_str(&self.type_name(&sig.return_type)?);
                out.push_str(" (*)(");
                out.push_str(abi::TYPE_CONTEXT);
                for param_type in &sig.types {
                    out.push_str(", ");
                    out.push_str(&self.type_name(param_type)?);
                }
                out.push_str("))");
                out.push_str(&self.ident_attr(function, "addr")?);
                out.push_str(")(");
                out.push_str(&self.ident_attr(function, "ctx")?);
                for arg in args {
                    out.push_str(", ");
                    out.push_str(&self.ident(arg)?);
                }
                out.push(')');
                Ok(out)
            }
            OperationInst::CCall { name, args } => {
                let rendered: Result<Vec<_>, _> =
                    args.iter().map(|arg| self.ident(arg)).collect();
                Ok(format!("{name}({})", rendered?.join(", ")))
            }
            OperationInst::CCall1 { name, arg } => {
                Ok(format!("{name}({})", self.ident(arg)?))
            }
            OperationInst::GetAttr { object, attr } => self.ident_attr(object, attr),
            OperationInst::SetAttr {
                object,
                attr,
                value,
            } => Ok(format!(
                "{} = {}",
                self.ident_attr(object, attr)?,
                self.ident(value)?
            )),
            OperationInst::Copy(source) => self.ident(source),
            OperationInst::Deref { reference, pointee } => Ok(format!(
                "*(({}*){})",
                self.type_name(pointee)?,
                self.ident(reference)?
            )),
        }
    }

    // ------------------------------------------------------------------
    // instructions

    fn write_instruction(
        &mut self,
        section: Section,
        inst: &Instruction,
    ) -> Result<(), EmitError> {
        match inst {
            Instruction::NoOp => Ok(()),
            Instruction::DeclareVariable(ident) => self.write_declare(section, ident),
            Instruction::Assignment { left, right } => {
                let text =
                    format!("{} = {};\n", self.ident(left)?, self.operation(right)?);
                self.push(section, &text);
                Ok(())
            }
            Instruction::DeclAssignment { left, right } => {
                self.write_declare(section, left)?;
                let text =
                    format!("{} = {};\n", self.ident(left)?, self.operation(right)?);
                self.push(section, &text);
                Ok(())
            }
            Instruction::Operation(operation) => {
                let text = format!("{};\n", self.operation(operation)?);
                self.push(section, &text);
                Ok(())
            }
            Instruction::Return {
                value,
                should_free_closure,
            } => {
                if *should_free_closure {
                    let text = format!("{}(__ctx__.closure);\n", abi::FREE);
                    self.push(section, &text);
                }
                let text = format!("return {};\n", self.ident(value)?);
                self.push(section, &text);
                Ok(())
            }
            Instruction::If {
                condition,
                negate,
                body,
            } => {
                let bang = if *negate { "!" } else { "" };
                let text = format!("if ({bang}{}) {{\n", self.ident(condition)?);
                self.push(section, &text);
                for inst in body {
                    self.write_instruction(section, inst)?;
                }
                self.push(section, "}\n");
                Ok(())
            }
            Instruction::Else(body) => {
                // taken branches jump over this via their exit goto, so the
                // else body runs inline with no `else` keyword of its own
                for inst in body {
                    self.write_instruction(section, inst)?;
                }
                Ok(())
            }
            Instruction::Goto(label) => {
                let text = format!("goto {label};\n");
                self.push(section, &text);
                Ok(())
            }
            Instruction::Label(label) => {
                let text = format!("{label}:;\n");
                self.push(section, &text);
                Ok(())
            }
            Instruction::Break => {
                self.push(section, "break;\n");
                Ok(())
            }
            Instruction::Continue => {
                let label = self
                    .current_loop_after
                    .clone()
                    .ok_or_else(|| EmitError("continue outside of a loop".into()))?;
                let text = format!("goto {label};\n");
                self.push(section, &text);
                Ok(())
            }
            Instruction::Loop {
                condition,
                after_label,
                init,
                before,
                body,
                after,
            } => {
                let enclosing = self.current_loop_after.take();
                self.current_loop_after = Some(after_label.clone());

                for inst in init {
                    self.write_instruction(section, inst)?;
                }
                let text = format!("while ({}) {{\n", self.ident(condition)?);
                self.push(section, &text);
                for inst in before {
                    self.write_instruction(section, inst)?;
                }
                for inst in body {
                    self.write_instruction(section, inst)?;
                }
                for inst in after {
                    self.write_instruction(section, inst)?;
                }
                self.push(section, "}\n");

                self.current_loop_after = enclosing;
                Ok(())
            }
            Instruction::DefineFunction {
                function_name,
                var_ident: _,
                signature,
                body,
            } => self.write_function_def(function_name, signature, body),
            Instruction::DefineClass {
                class_name,
                signature,
                body,
            } => {
                self.write_class_typedef(class_name, signature)?;
                for inst in body {
                    self.write_instruction(section, inst)?;
                }
                Ok(())
            }
            Instruction::IterNext { iter, unpack } => {
                // iter.next_data = iter.next(iter.iter);
                // if (iter.next_data) unpack = *((T*)iter.next_data);
                let TypeInfo::Iter(item) = &iter.info else {
                    return Err(EmitError(
                        "iterator advance over a non-iterator".into(),
                    ));
                };
                let item_type = self.type_name(item)?;
                let text = format!(
                    "{next_data} = {next}({inner});\nif ({next_data}) {unpack} = \
                     *(({item_type}*){next_data});\n",
                    next_data = self.ident_attr(iter, "next_data")?,
                    next = self.ident_attr(iter, "next")?,
                    inner = self.ident_attr(iter, "iter")?,
                    unpack = self.ident(unpack)?,
                );
                self.push(section, &text);
                Ok(())
            }
            Instruction::InitClosure { size_slot } => {
                let size = self.instructions.closure_sizes[*size_slot];
                let text =
                    format!("__ctx__.closure = {}({size});\n", abi::ALLOC);
                self.push(section, &text);
                Ok(())
            }
        }
    }

    /// A declaration in the init section for a scoped variable hoists into
    /// the declarations section; parameters and closure slots are never
    /// declared (the C signature and the context block own them).
    fn write_declare(
        &mut self,
        section: Section,
        ident: &StorageIdent,
    ) -> Result<(), EmitError> {
        let (type_info, target) = match &ident.kind {
            IdentKind::Var(var_id) => {
                let var = self.pool.var(*var_id);
                match var.kind {
                    VarKind::Argument | VarKind::Closure => return Ok(()),
                    VarKind::Regular | VarKind::SemiScoped => {}
                }
                let target = if section == Section::Init {
                    Section::Declarations
                } else {
                    section
                };
                (var.type_info.clone(), target)
            }
            IdentKind::CStr(_)
                if section == Section::Init
                    && matches!(ident.info, TypeInfo::Function(_)) =>
            {
                // module-level function objects are referenced from every
                // emitted function; they live at file scope
                (ident.info.clone(), Section::Declarations)
            }
            _ => (ident.info.clone(), section),
        };

        let text = format!(
            "{} {};\n",
            self.type_name(&type_info)?,
            self.ident(&StorageIdent {
                reference: false,
                ..ident.clone()
            })?
        );
        self.push(target, &text);
        Ok(())
    }

    fn write_function_def(
        &mut self,
        function_name: &str,
        signature: &Signature,
        body: &[Instruction],
    ) -> Result<(), EmitError> {
        // collect this definition in its own buffer; any nested definition
        // completes first and lands in the defs section ahead of us
        self.def_stack.push(String::new());

        let mut header = String::new();
        header.push_str(&self.type_name(&signature.return_type)?);
        let _ = write!(
            header,
            " {function_name}({} __ctx__",
            abi::TYPE_CONTEXT
        );
        if let Some(params) = &signature.params {
            for (param, param_type) in params.iter().zip(&signature.types) {
                let _ = write!(
                    header,
                    ", {} {}",
                    self.type_name(param_type)?,
                    self.interner.resolve(*param)
                );
            }
        } else {
            for (i, param_type) in signature.types.iter().enumerate() {
                let _ = write!(header, ", {} _np_arg_{i}", self.type_name(param_type)?);
            }
        }
        header.push_str(") {\n");
        self.push(Section::Defs, &header);

        // a function body never hoists; loop labels do not cross the
        // function boundary
        let enclosing = self.current_loop_after.take();
        for inst in body {
            self.write_instruction(Section::Defs, inst)?;
        }
        self.current_loop_after = enclosing;

        self.push(Section::Defs, "}\n");

        let done = self.def_stack.pop().expect("definition buffer pushed above");
        self.sections[Section::Defs as usize].push_str(&done);
        Ok(())
    }

    fn write_class_typedef(
        &mut self,
        class_name: &str,
        signature: &Signature,
    ) -> Result<(), EmitError> {
        let mut out = String::from("typedef struct { ");
        if let Some(params) = &signature.params {
            for (param, param_type) in params.iter().zip(&signature.types) {
                let _ = write!(
                    out,
                    "{} {}; ",
                    self.type_name(param_type)?,
                    self.interner.resolve(*param)
                );
            }
        }
        let _ = write!(out, "}} {class_name};\n");
        self.push(Section::Typedefs, &out);
        Ok(())
    }

}
