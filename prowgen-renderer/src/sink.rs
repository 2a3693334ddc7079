//! Append-only text accumulator for generated output.

/// Collects output lines and counts them.
///
/// Whitespace-only writes are dropped, so templates may leave blank lines
/// around control tags without affecting the output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sink {
    buffer: String,
    count: usize,
}

impl Sink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `line` plus a newline, unless it is blank.
    pub fn write(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        self.buffer.push_str(line);
        self.buffer.push('\n');
        self.count += 1;
    }

    /// Write each line of `text`.
    pub fn write_block(&mut self, text: &str) {
        for line in text.lines() {
            self.write(line);
        }
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.count = 0;
    }

    /// Number of lines written so far.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn into_string(self) -> String {
        self.buffer
    }
}
