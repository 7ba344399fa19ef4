use clap::Parser;
use retriever::cli::{exit_code, SubredditArgs};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = SubredditArgs::parse();
    exit_code(args.run())
}
