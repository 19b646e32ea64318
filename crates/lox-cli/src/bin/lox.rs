//! The bytecode-VM front end: Lox's default, "production" interpreter.

use std::{
    env, fs,
    io::{self, Write as _},
    process::ExitCode,
};

use lox::{Vm, bytecode, io::StdPrint};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => run_repl(),
        2 => run_file(&args[1]),
        _ => {
            eprintln!("Usage: lox [script]");
            ExitCode::from(64)
        }
    }
}

fn run_file(path: &str) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Error reading {path}: {err}");
            return ExitCode::from(74);
        }
    };

    let mut vm = Vm::new();
    let mut output = StdPrint;
    let outcome = bytecode::run(&source, &mut vm, &mut output);
    outcome.report();
    ExitCode::from(outcome.exit_code())
}

fn run_repl() -> ExitCode {
    let mut vm = Vm::new();
    let mut output = StdPrint;

    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            return ExitCode::from(74);
        }

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => {
                println!();
                return ExitCode::SUCCESS;
            }
            Ok(_) => bytecode::run(&line, &mut vm, &mut output).report(),
            Err(_) => return ExitCode::from(74),
        }
    }
}
