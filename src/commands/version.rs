// src/commands/version.rs

use std::process::ExitCode;

pub fn print_version() -> ExitCode {
    println!("stubgen {}", env!("CARGO_PKG_VERSION"));
    ExitCode::SUCCESS
}
