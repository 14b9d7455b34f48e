//! Text buffer implementation using ropey.
//!
//! Every mutation returns a [`BufferEdit`] describing which lines it touched;
//! the retokenization driver consumes these notifications. The engine reads
//! text back through the [`LineSource`] trait only.

use ropey::Rope;
use std::fs;
use std::io::{self, BufReader};
use std::path::Path;

/// Read access the engine needs from a document.
///
/// Offsets are character indices into the whole document.
pub trait LineSource {
    /// Counter bumped on every mutation.
    fn revision(&self) -> u64;

    /// Number of lines (at least 1).
    fn line_count(&self) -> usize;

    /// Offset of the first character of `line`.
    fn line_start(&self, line: usize) -> usize;

    /// Length of `line` in characters, excluding its line break.
    fn line_len(&self, line: usize) -> usize;

    /// Line containing `offset`.
    fn line_of_offset(&self, offset: usize) -> usize;

    /// Characters in `start..start + len`.
    fn text_range(&self, start: usize, len: usize) -> Vec<char>;

    /// Characters of `line` without its line break.
    fn line_chars(&self, line: usize) -> Option<Vec<char>> {
        if line >= self.line_count() {
            return None;
        }
        Some(self.text_range(self.line_start(line), self.line_len(line)))
    }
}

/// Characters ropey treats as line breaks.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\u{0B}' | '\u{0C}' | '\r' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Kind of buffer mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Insert,
    Remove,
}

/// Edit notification: what changed and which lines it touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferEdit {
    pub kind: EditKind,
    /// Character offset of the edit.
    pub offset: usize,
    /// Characters inserted or removed.
    pub len: usize,
    /// Line containing `offset` before the edit.
    pub start_line: usize,
    /// Lines created by an insertion.
    pub lines_added: usize,
    /// Lines merged away by a removal.
    pub lines_removed: usize,
}

impl BufferEdit {
    /// Whether the edit stayed within one line.
    pub fn is_single_line(&self) -> bool {
        self.lines_added == 0 && self.lines_removed == 0
    }

    /// Last line (after the edit) whose text the edit changed.
    pub fn last_changed_line(&self) -> usize {
        self.start_line + self.lines_added
    }
}

/// A text buffer backed by a rope data structure.
/// Provides efficient text operations for large files.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    rope: Rope,
    revision: u64,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextBuffer {
    /// Creates a new empty text buffer.
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            revision: 0,
        }
    }

    /// Creates a text buffer from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            revision: 0,
        }
    }

    /// Loads a text buffer from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = fs::File::open(path)?;
        let reader = BufReader::new(file);
        let rope = Rope::from_reader(reader)?;
        Ok(Self { rope, revision: 0 })
    }

    /// Returns the total number of characters in the buffer.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Returns the total number of lines in the buffer.
    pub fn len_lines(&self) -> usize {
        self.rope.len_lines()
    }

    /// Returns true if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Inserts a string at the given character index.
    pub fn insert(&mut self, char_idx: usize, text: &str) -> BufferEdit {
        let idx = char_idx.min(self.len_chars());
        let start_line = self.rope.char_to_line(idx);
        let lines_before = self.len_lines();
        self.rope.insert(idx, text);
        self.revision += 1;
        BufferEdit {
            kind: EditKind::Insert,
            offset: idx,
            len: text.chars().count(),
            start_line,
            lines_added: self.len_lines() - lines_before,
            lines_removed: 0,
        }
    }

    /// Removes text in the given character range.
    pub fn remove(&mut self, start: usize, end: usize) -> BufferEdit {
        let start = start.min(self.len_chars());
        let end = end.min(self.len_chars()).max(start);
        let start_line = self.rope.char_to_line(start);
        let lines_before = self.len_lines();
        if start < end {
            self.rope.remove(start..end);
            self.revision += 1;
        }
        BufferEdit {
            kind: EditKind::Remove,
            offset: start,
            len: end - start,
            start_line,
            lines_added: 0,
            lines_removed: lines_before - self.len_lines(),
        }
    }

    /// Returns the length of a line in characters (excluding its line break).
    pub fn line_len_chars(&self, line: usize) -> usize {
        if line >= self.len_lines() {
            return 0;
        }
        let line_slice = self.rope.line(line);
        let len = line_slice.len_chars();
        if len == 0 || !is_line_break(line_slice.char(len - 1)) {
            return len;
        }
        // CRLF is a single break.
        if len > 1 && line_slice.char(len - 1) == '\n' && line_slice.char(len - 2) == '\r' {
            len - 2
        } else {
            len - 1
        }
    }

    /// Returns the line at the given index as a string, without its line break.
    pub fn line(&self, line: usize) -> Option<String> {
        self.line_chars(line).map(|chars| chars.into_iter().collect())
    }

    /// Returns the entire buffer as a string.
    #[allow(clippy::inherent_to_string)]
    pub fn to_string(&self) -> String {
        self.rope.to_string()
    }
}

impl LineSource for TextBuffer {
    fn revision(&self) -> u64 {
        self.revision
    }

    fn line_count(&self) -> usize {
        self.len_lines()
    }

    fn line_start(&self, line: usize) -> usize {
        if line >= self.len_lines() {
            self.len_chars()
        } else {
            self.rope.line_to_char(line)
        }
    }

    fn line_len(&self, line: usize) -> usize {
        self.line_len_chars(line)
    }

    fn line_of_offset(&self, offset: usize) -> usize {
        self.rope.char_to_line(offset.min(self.len_chars()))
    }

    fn text_range(&self, start: usize, len: usize) -> Vec<char> {
        let start = start.min(self.len_chars());
        let end = (start + len).min(self.len_chars());
        self.rope.slice(start..end).chars().collect()
    }
}
