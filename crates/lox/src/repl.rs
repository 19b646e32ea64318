//! Source-retention buffer for interactive sessions.
//!
//! The tree-walker borrows tokens, lexemes, and `Value::String` slices
//! straight out of the source text, so a REPL that wants to keep variables
//! alive across lines needs every line's text to outlive the session itself.
//! Growing a `Vec<String>` would move earlier lines' buffers around as it
//! reallocates, invalidating borrows already handed out; a bump arena gives
//! each line a stable address for the process's lifetime instead.

use bumpalo::Bump;

/// Owns every line of source ever read by one REPL run.
#[derive(Default)]
pub struct ReplSession {
    arena: Bump,
}

impl ReplSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies `line` into the arena and returns a reference valid for the
    /// rest of the session.
    pub fn push_line(&self, line: &str) -> &str {
        self.arena.alloc_str(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_stay_valid_across_further_pushes() {
        let session = ReplSession::new();
        let first = session.push_line("var a = 1;");
        let second = session.push_line("print a;");
        assert_eq!(first, "var a = 1;");
        assert_eq!(second, "print a;");
    }
}
