mod cli;
mod commands;

#[cfg(test)]
mod dispatch_tests;

use cli::{Params, build_cli};

fn main() {
    let matches = build_cli().get_matches();
    let params = Params::from_matches(&matches);
    std::process::exit(commands::run(params));
}
