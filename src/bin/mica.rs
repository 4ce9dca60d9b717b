use std::process;

use clap::Parser;

use mica::compiler::Command;

fn main() {
    let command = Command::parse();

    let default_filter = if command.verbose() { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match command.run() {
        Ok(output) => print!("{}", output),
        Err(error) => {
            eprintln!("error: {}", error);
            process::exit(1);
        }
    }
}
