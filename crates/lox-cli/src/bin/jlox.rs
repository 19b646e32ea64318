//! The tree-walking front end, mirroring the book's `jlox`.

use std::{
    env, fs,
    io::{self, Write as _},
    process::ExitCode,
};

use lox::{TreeWalker, io::StdPrint, repl::ReplSession};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => run_repl(),
        2 => run_file(&args[1]),
        _ => {
            eprintln!("Usage: jlox [script]");
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

    let mut session = TreeWalker::new();
    let mut output = StdPrint;
    let outcome = session.run(&source, &mut output);
    outcome.report();
    ExitCode::from(outcome.exit_code())
}

fn run_repl() -> ExitCode {
    // Every line read from stdin must outlive `session`, since its tokens,
    // lexemes, and interned strings borrow straight from the source text.
    let lines = ReplSession::new();
    let mut session = TreeWalker::new();
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
            Ok(_) => {
                let line = lines.push_line(&line);
                session.run(line, &mut output).report();
            }
            Err(_) => return ExitCode::from(74),
        }
    }
}
