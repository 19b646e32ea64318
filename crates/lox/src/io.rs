//! Output abstraction for the `print` statement.
//!
//! Both tiers write through a `PrintWriter` instead of calling `println!`
//! directly, so tests can capture output and assert the byte-identical-stdout
//! property between the tree-walker and the bytecode VM.

use std::io::{self, Write as _};

/// Receives the text produced by `print` statements.
///
/// Implement this to capture or redirect interpreter output; the default
/// `StdPrint` writes straight to the process's stdout.
pub trait PrintWriter {
    /// Writes one already-newline-terminated line of output.
    fn print_line(&mut self, line: &str);
}

/// Writes directly to stdout.
#[derive(Debug, Default)]
pub struct StdPrint;

impl PrintWriter for StdPrint {
    fn print_line(&mut self, line: &str) {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        let _ = handle.write_all(line.as_bytes());
        let _ = handle.write_all(b"\n");
    }
}

/// Collects every printed line into an owned string, for tests.
#[derive(Debug, Default)]
pub struct CollectStringPrint(String);

impl CollectStringPrint {
    #[must_use]
    pub fn new() -> Self {
        Self(String::new())
    }

    #[must_use]
    pub fn output(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_output(self) -> String {
        self.0
    }
}

impl PrintWriter for CollectStringPrint {
    fn print_line(&mut self, line: &str) {
        self.0.push_str(line);
        self.0.push('\n');
    }
}

/// Discards all output.
#[derive(Debug, Default)]
pub struct NoPrint;

impl PrintWriter for NoPrint {
    fn print_line(&mut self, _line: &str) {}
}
