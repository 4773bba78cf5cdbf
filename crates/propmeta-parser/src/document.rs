//! TextDocument: ropey::Rope buffer for an open configuration file.

use propmeta_types::FileType;
use ropey::{Rope, RopeSlice};

/// Holds the current text of one open `.properties` or YAML file.
pub struct TextDocument {
    rope: Rope,
    file_type: FileType,
}

impl TextDocument {
    pub fn new(file_type: FileType) -> Self {
        TextDocument {
            rope: Rope::new(),
            file_type,
        }
    }

    /// Replace the whole text (used on didOpen and full-sync changes).
    pub fn set_text(&mut self, source: &str) {
        self.rope = Rope::from_str(source);
    }

    /// Apply an incremental edit from LSP didChange.
    ///
    /// Positions are 0-based (line, character) pairs; characters are
    /// counted in UTF-16 code units, as LSP sends them, and clamped to the line.
    pub fn apply_edit(
        &mut self,
        start_line: u32,
        start_char: u32,
        end_line: u32,
        end_char: u32,
        new_text: &str,
    ) {
        let start = self.position_to_char(start_line as usize, start_char as usize);
        let end = self.position_to_char(end_line as usize, end_char as usize);
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        self.rope.remove(start..end);
        self.rope.insert(start, new_text);
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// Get the current source as a String.
    pub fn source(&self) -> String {
        self.rope.to_string()
    }

    /// Number of lines in the buffer.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Text of `line` without its line terminator; empty past the end.
    pub fn line(&self, line: usize) -> String {
        if line >= self.rope.len_lines() {
            return String::new();
        }
        let text = self.rope.line(line).to_string();
        text.trim_end_matches(&['\n', '\r'][..]).to_string()
    }

    /// Text of `line` up to the UTF-16 column `character`.
    pub fn line_prefix(&self, line: usize, character: usize) -> String {
        if line >= self.rope.len_lines() {
            return String::new();
        }
        let slice = self.rope.line(line);
        let end = utf16_to_char(slice, character);
        let text = slice.slice(..end).to_string();
        text.trim_end_matches(&['\n', '\r'][..]).to_string()
    }

    /// Convert (line, UTF-16 column) to a char index in the rope.
    fn position_to_char(&self, line: usize, character: usize) -> usize {
        if line >= self.rope.len_lines() {
            return self.rope.len_chars();
        }
        self.rope.line_to_char(line) + utf16_to_char(self.rope.line(line), character)
    }
}

/// Char offset within `line` of a UTF-16 column, clamped to the line.
fn utf16_to_char(line: RopeSlice<'_>, character: usize) -> usize {
    line.utf16_cu_to_char(character.min(line.len_utf16_cu()))
}
