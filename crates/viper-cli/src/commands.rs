//! Pipeline driving: dumps, the C build step, and execution.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::Command;

use viper_compiler::analyze::symbol_table::Symbol;
use viper_compiler::pool::{Pool, ScopeId};
use viper_compiler::{ErrorPrinter, compile_source, parse, write_c_program};
use viper_core::SourceFile;

use crate::cli::{DumpMode, Params};

const BUILD_DIR: &str = "viperc_build";

/// Run the whole front-end; returns the process exit code.
pub fn run(params: Params) -> i32 {
    match try_run(&params) {
        Ok(()) => 0,
        Err(message) => {
            eprintln!("{message}");
            1
        }
    }
}

fn try_run(params: &Params) -> Result<(), String> {
    let text = std::fs::read_to_string(&params.input)
        .map_err(|e| format!("unable to read `{}`: {e}", params.input.display()))?;
    let source = SourceFile::new(params.input.display().to_string(), text);

    if let Some(mode) = params.dump {
        return dump(mode, &source);
    }

    let c_program = compile(&source)?;
    let out = output_path(params);
    build(&c_program, &out)?;

    if params.run {
        let status = Command::new(&out)
            .status()
            .map_err(|e| format!("unable to run `{}`: {e}", out.display()))?;
        if !status.success() {
            return Err(format!(
                "`{}` exited with {}",
                out.display(),
                status.code().unwrap_or(1)
            ));
        }
    }
    Ok(())
}

fn compile(source: &SourceFile) -> Result<String, String> {
    match viper_compiler::compile_to_c(source) {
        Ok(c_program) => Ok(c_program),
        Err(viper_compiler::Error::Compile(err)) => {
            let colored = std::io::stderr().is_terminal();
            Err(ErrorPrinter::new(&err, source).colored(colored).render())
        }
        Err(viper_compiler::Error::Emit(err)) => Err(err.to_string()),
    }
}

fn dump(mode: DumpMode, source: &SourceFile) -> Result<(), String> {
    match mode {
        DumpMode::Tokens => {
            let tokens = viper_compiler::lexer::lex(source.text())
                .map_err(|err| render_error(&err, source))?;
            let json = serde_json::to_string_pretty(&tokens)
                .map_err(|e| format!("serialization failed: {e}"))?;
            println!("{json}");
        }
        DumpMode::Ast => {
            let parsed = parse(source).map_err(|err| render_error(&err, source))?;
            println!("{:#?}", parsed.statements);
        }
        DumpMode::Scopes => {
            let lowered =
                compile_source(source).map_err(|err| render_error(&err, source))?;
            print_scope(&lowered.pool, &lowered.interner, ScopeId::from_raw(0), 0);
        }
        DumpMode::C => {
            let lowered =
                compile_source(source).map_err(|err| render_error(&err, source))?;
            let c_program = write_c_program(&lowered).map_err(|e| e.to_string())?;
            println!("{c_program}");
        }
    }
    Ok(())
}

fn render_error(err: &viper_compiler::CompileError, source: &SourceFile) -> String {
    let colored = std::io::stderr().is_terminal();
    ErrorPrinter::new(err, source).colored(colored).render()
}

fn print_scope(pool: &Pool, interner: &viper_core::Interner, scope: ScopeId, depth: usize) {
    let indent = "    ".repeat(depth);
    for (key, symbol) in pool.scope(scope).table.iter_entries() {
        match symbol {
            Symbol::Variable(id) | Symbol::Global(id) => {
                let var = pool.var(*id);
                println!(
                    "{indent}{key}: {:?} {}",
                    var.kind,
                    var.type_info.describe()
                );
            }
            Symbol::Function(id) => {
                let func = pool.func(*id);
                println!("{indent}{key}: function -> {}", func.sig.return_type.describe());
                print_scope(pool, interner, func.scope, depth + 1);
            }
            Symbol::Class(id) => {
                let class = pool.class(*id);
                println!("{indent}{key}: class ({} bytes)", class.nbytes);
                print_scope(pool, interner, class.scope, depth + 1);
            }
            Symbol::Member(name, info) => {
                println!(
                    "{indent}{}: member {}",
                    interner.resolve(*name),
                    info.describe()
                );
            }
        }
    }
}

/// Default output name: input basename, extension stripped.
pub(crate) fn output_path(params: &Params) -> PathBuf {
    match &params.out {
        Some(out) => out.clone(),
        None => {
            let stem = params
                .input
                .file_stem()
                .map(|s| s.to_owned())
                .unwrap_or_else(|| "a.out".into());
            PathBuf::from(stem)
        }
    }
}

/// Write the intermediate C and hand it to the system C compiler, linked
/// against the runtime library.
fn build(c_program: &str, out: &Path) -> Result<(), String> {
    std::fs::create_dir_all(BUILD_DIR)
        .map_err(|e| format!("failed to make {BUILD_DIR} directory: {e}"))?;
    let intermediate = Path::new(BUILD_DIR).join("intermediate.c");
    std::fs::write(&intermediate, c_program)
        .map_err(|e| format!("unable to write `{}`: {e}", intermediate.display()))?;

    let runtime_dir = std::env::var("VIPER_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/usr/local"));

    let status = Command::new("cc")
        .arg(&intermediate)
        .arg("-I")
        .arg(runtime_dir.join("include"))
        .arg("-L")
        .arg(runtime_dir.join("lib"))
        .arg("-lnot_python")
        .arg("-lm")
        .arg("-o")
        .arg(out)
        .status()
        .map_err(|e| format!("unable to run the C compiler: {e}"))?;

    if !status.success() {
        return Err(format!(
            "cc exited with {}",
            status.code().unwrap_or(1)
        ));
    }
    Ok(())
}
