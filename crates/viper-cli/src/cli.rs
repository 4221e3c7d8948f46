//! Argument surface of `viperc`.

use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command};

pub fn build_cli() -> Command {
    Command::new("viperc")
        .about("Compile viper source to a standalone C program")
        .arg(
            Arg::new("input")
                .value_name("FILE")
                .required(true)
                .help("Source file to compile"),
        )
        .arg(
            Arg::new("out")
                .short('o')
                .long("out")
                .value_name("PATH")
                .help("Output executable name (default: input basename)"),
        )
        .arg(
            Arg::new("run")
                .short('r')
                .long("run")
                .action(ArgAction::SetTrue)
                .help("Compile and immediately execute"),
        )
        .arg(
            Arg::new("dump-tokens")
                .long("dump-tokens")
                .action(ArgAction::SetTrue)
                .help("Print the token stream as JSON and exit"),
        )
        .arg(
            Arg::new("dump-ast")
                .long("dump-ast")
                .action(ArgAction::SetTrue)
                .help("Print the parsed statements and exit"),
        )
        .arg(
            Arg::new("dump-scopes")
                .long("dump-scopes")
                .action(ArgAction::SetTrue)
                .help("Print the resolved scopes and exit"),
        )
        .arg(
            Arg::new("dump-c")
                .long("dump-c")
                .action(ArgAction::SetTrue)
                .help("Print the generated C instead of building it"),
        )
}

/// What to print instead of building, if anything.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DumpMode {
    Tokens,
    Ast,
    Scopes,
    C,
}

pub struct Params {
    pub input: PathBuf,
    pub out: Option<PathBuf>,
    pub run: bool,
    pub dump: Option<DumpMode>,
}

impl Params {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let dump = if matches.get_flag("dump-tokens") {
            Some(DumpMode::Tokens)
        } else if matches.get_flag("dump-ast") {
            Some(DumpMode::Ast)
        } else if matches.get_flag("dump-scopes") {
            Some(DumpMode::Scopes)
        } else if matches.get_flag("dump-c") {
            Some(DumpMode::C)
        } else {
            None
        };

        Self {
            input: PathBuf::from(
                matches
                    .get_one::<String>("input")
                    .expect("input is required"),
            ),
            out: matches.get_one::<String>("out").map(PathBuf::from),
            run: matches.get_flag("run"),
            dump,
        }
    }
}
