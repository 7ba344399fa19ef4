use clap::Parser;
use retriever::cli::{exit_code, UserArgs};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = UserArgs::parse();
    exit_code(args.run())
}
