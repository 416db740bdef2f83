//! Indent-aware line builder for the emitted TypeScript.
//!
//! Two-space indentation; every write is a whole line.

pub struct CodeWriter {
    buf: String,
    depth: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self {
            buf: String::with_capacity(2048),
            depth: 0,
        }
    }

    /// Write a complete line at the current depth.
    pub fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.buf.push_str("  ");
        }
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    /// `// text`, one line per input line.
    pub fn comment(&mut self, text: &str) {
        for part in text.lines() {
            self.line(&format!("// {}", part.trim_end()));
        }
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Write `text {` and indent.
    pub fn open(&mut self, text: &str) {
        self.line(&format!("{} {{", text));
        self.indent();
    }

    /// Write `text` as-is and indent, for openers that do not end in `{`.
    pub fn open_raw(&mut self, text: &str) {
        self.line(text);
        self.indent();
    }

    /// Dedent and write `}`.
    pub fn close(&mut self) {
        self.close_with("}");
    }

    /// Dedent and write a custom closer such as `})(),` or `]),`.
    pub fn close_with(&mut self, closer: &str) {
        self.dedent();
        self.line(closer);
    }

    /// Dedent, write `} else {` and indent again.
    pub fn else_branch(&mut self) {
        self.dedent();
        self.line("} else {");
        self.indent();
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

impl Default for CodeWriter {
    fn default() -> Self {
        Self::new()
    }
}
