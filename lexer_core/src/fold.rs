//! Code folding support.
//!
//! Fold regions are bookkeeping owned by the editor. The engine only asks
//! whether a line is hidden, through [`FoldQuery`].

use crate::buffer::{BufferEdit, EditKind, LineSource};
use crate::error::Result;
use crate::syntax::{SyntaxHighlighter, TokenKind};

/// Predicate consulted by navigation features such as bracket matching.
pub trait FoldQuery {
    /// Whether `line` is inside a collapsed region (the region's first line
    /// stays visible).
    fn is_line_hidden(&self, line: usize) -> bool;
}

/// No folding at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFolds;

impl FoldQuery for NoFolds {
    fn is_line_hidden(&self, _line: usize) -> bool {
        false
    }
}

/// A foldable region in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldRegion {
    /// Start line of the fold (inclusive).
    pub start_line: usize,
    /// End line of the fold (inclusive).
    pub end_line: usize,
    /// Whether this region is currently folded.
    pub is_folded: bool,
}

impl FoldRegion {
    /// Creates a new fold region.
    pub fn new(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            end_line,
            is_folded: false,
        }
    }

    /// Returns the number of lines in this fold region.
    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }

    /// Returns the number of hidden lines when folded.
    pub fn hidden_lines(&self) -> usize {
        if self.is_folded {
            self.end_line - self.start_line
        } else {
            0
        }
    }

    fn hides(&self, line: usize) -> bool {
        self.is_folded && line > self.start_line && line <= self.end_line
    }
}

/// Manages code folding for a buffer.
#[derive(Debug, Clone, Default)]
pub struct FoldManager {
    /// All fold regions, sorted by start line.
    regions: Vec<FoldRegion>,
}

impl FoldManager {
    /// Creates a new fold manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all fold regions.
    pub fn clear(&mut self) {
        self.regions.clear();
    }

    /// Returns all fold regions.
    pub fn regions(&self) -> &[FoldRegion] {
        &self.regions
    }

    /// Adds a region, keeping the list sorted. Single-line regions are
    /// ignored.
    pub fn add_region(&mut self, region: FoldRegion) {
        if region.end_line <= region.start_line {
            return;
        }
        let idx = self
            .regions
            .partition_point(|r| r.start_line < region.start_line);
        self.regions.insert(idx, region);
    }

    /// Toggles the fold state at the given line.
    /// Returns true if a fold was toggled.
    pub fn toggle_fold_at_line(&mut self, line: usize) -> bool {
        match self.regions.iter_mut().find(|r| r.start_line == line) {
            Some(region) => {
                region.is_folded = !region.is_folded;
                true
            }
            None => false,
        }
    }

    /// Folds all regions.
    pub fn fold_all(&mut self) {
        for region in &mut self.regions {
            region.is_folded = true;
        }
    }

    /// Returns true if the given line is folded.
    pub fn is_line_folded(&self, line: usize) -> bool {
        self.regions.iter().any(|r| r.start_line == line && r.is_folded)
    }

    /// Detects regions from structural `{`/`}` separator tokens.
    ///
    /// Braces inside comments and strings are never separators, so they
    /// cannot open or close a region. Existing folded state is kept for
    /// regions that survive detection.
    pub fn detect_brace_folds<S: LineSource + ?Sized>(
        &mut self,
        source: &S,
        highlighter: &SyntaxHighlighter,
    ) -> Result<()> {
        let folded: Vec<usize> = self
            .regions
            .iter()
            .filter(|r| r.is_folded)
            .map(|r| r.start_line)
            .collect();
        self.regions.clear();

        if !highlighter.lexer().uses_curly_braces() {
            return Ok(());
        }

        let mut open: Vec<usize> = Vec::new();
        for line in 0..source.line_count() {
            let chars = source.line_chars(line).unwrap_or_default();
            if !chars.iter().any(|c| matches!(c, '{' | '}')) {
                continue;
            }
            let seq = highlighter.token_sequence_for_line(source, line)?;
            for token in seq.iter() {
                if token.kind != TokenKind::Separator || !token.is_single_char() {
                    continue;
                }
                match chars.get(token.start).copied() {
                    Some('{') => open.push(line),
                    Some('}') => {
                        if let Some(start_line) = open.pop() {
                            self.add_region(FoldRegion::new(start_line, line));
                        }
                    }
                    _ => {}
                }
            }
        }

        for region in &mut self.regions {
            region.is_folded = folded.contains(&region.start_line);
        }
        log::debug!("Detected {} fold region(s)", self.regions.len());
        Ok(())
    }

    /// Shifts regions for an edit. Regions whose lines were merged away are
    /// dropped.
    pub fn adjust_for_edit(&mut self, edit: &BufferEdit) {
        let pivot = edit.start_line;
        match edit.kind {
            EditKind::Insert if edit.lines_added > 0 => {
                let delta = edit.lines_added;
                for region in &mut self.regions {
                    if region.start_line > pivot {
                        region.start_line += delta;
                    }
                    if region.end_line > pivot {
                        region.end_line += delta;
                    }
                }
            }
            EditKind::Remove if edit.lines_removed > 0 => {
                let gone = pivot + 1..=pivot + edit.lines_removed;
                let delta = edit.lines_removed;
                self.regions.retain(|r| {
                    !gone.contains(&r.start_line) && !gone.contains(&r.end_line)
                });
                for region in &mut self.regions {
                    if region.start_line > pivot {
                        region.start_line -= delta;
                    }
                    if region.end_line > pivot {
                        region.end_line -= delta;
                    }
                }
                self.regions.retain(|r| r.end_line > r.start_line);
            }
            _ => {}
        }
    }

    /// Converts a buffer line to a visual line (accounting for folded regions).
    pub fn buffer_line_to_visual(&self, buffer_line: usize) -> usize {
        let line = self
            .regions
            .iter()
            .find(|r| r.hides(buffer_line))
            .map_or(buffer_line, |r| r.start_line);
        line - self.hidden_through(line)
    }

    /// Converts a visual line to a buffer line (accounting for folded regions).
    pub fn visual_line_to_buffer(&self, visual_line: usize) -> usize {
        let mut line = visual_line;
        loop {
            let mapped = visual_line + self.hidden_through(line);
            if mapped == line {
                return line;
            }
            line = mapped;
        }
    }

    /// Returns the total number of visible lines (accounting for folds).
    pub fn visible_line_count(&self, total_lines: usize) -> usize {
        let hidden = match total_lines {
            0 => 0,
            n => self.hidden_through(n - 1),
        };
        total_lines.saturating_sub(hidden).max(1)
    }

    /// Hidden lines at or before `line`. Nested regions are counted once.
    fn hidden_through(&self, line: usize) -> usize {
        let mut hidden = 0;
        let mut covered_to = 0;
        for region in self.regions.iter().filter(|r| r.is_folded) {
            let start = (region.start_line + 1).max(covered_to);
            let end = region.end_line.min(line);
            if end >= start {
                hidden += end - start + 1;
            }
            covered_to = covered_to.max(region.end_line + 1);
        }
        hidden
    }
}

impl FoldQuery for FoldManager {
    fn is_line_hidden(&self, line: usize) -> bool {
        self.regions.iter().any(|r| r.hides(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::TextBuffer;

    fn rust(text: &str) -> (TextBuffer, SyntaxHighlighter) {
        let buffer = TextBuffer::from_str(text);
        let mut highlighter = SyntaxHighlighter::default();
        highlighter.set_language("text/rust", &buffer).unwrap();
        (buffer, highlighter)
    }

    #[test]
    fn test_fold_region() {
        let mut region = FoldRegion::new(5, 10);
        assert_eq!(region.line_count(), 6);
        assert_eq!(region.hidden_lines(), 0);

        region.is_folded = true;
        assert_eq!(region.hidden_lines(), 5);
    }

    #[test]
    fn test_fold_manager_toggle() {
        let mut manager = FoldManager::new();
        manager.add_region(FoldRegion::new(10, 15));
        manager.add_region(FoldRegion::new(0, 5));
        assert_eq!(manager.regions()[0].start_line, 0);

        assert!(!manager.is_line_folded(0));
        assert!(manager.toggle_fold_at_line(0));
        assert!(manager.is_line_folded(0));
        assert!(!manager.toggle_fold_at_line(1));

        assert!(!manager.is_line_hidden(0));
        assert!(manager.is_line_hidden(3));
        assert!(!manager.is_line_hidden(7));
    }

    #[test]
    fn test_brace_fold_detection() {
        let (buffer, highlighter) = rust("fn main() {\n    println!(\"Hello\");\n}\n");
        let mut manager = FoldManager::new();
        manager.detect_brace_folds(&buffer, &highlighter).unwrap();

        assert_eq!(manager.regions().len(), 1);
        assert_eq!(manager.regions()[0].start_line, 0);
        assert_eq!(manager.regions()[0].end_line, 2);
    }

    #[test]
    fn test_braces_in_comments_and_strings_do_not_fold() {
        let (buffer, highlighter) = rust("// {\nlet s = \"{\";\n/* }\n} */\nx();");
        let mut manager = FoldManager::new();
        manager.detect_brace_folds(&buffer, &highlighter).unwrap();
        assert!(manager.regions().is_empty());
    }

    #[test]
    fn test_detection_keeps_folded_state() {
        let (buffer, highlighter) = rust("a {\nb\n}\nc {\nd\n}");
        let mut manager = FoldManager::new();
        manager.detect_brace_folds(&buffer, &highlighter).unwrap();
        manager.toggle_fold_at_line(3);
        manager.detect_brace_folds(&buffer, &highlighter).unwrap();
        assert!(!manager.is_line_folded(0));
        assert!(manager.is_line_folded(3));
    }

    #[test]
    fn test_adjust_for_edit() {
        let mut buffer = TextBuffer::from_str("a\nb\nc\nd\ne\nf");
        let mut manager = FoldManager::new();
        manager.add_region(FoldRegion::new(2, 4));

        let edit = buffer.insert(0, "\n\n");
        manager.adjust_for_edit(&edit);
        assert_eq!(manager.regions()[0], FoldRegion::new(4, 6));

        let edit = buffer.remove(0, 2);
        manager.adjust_for_edit(&edit);
        assert_eq!(manager.regions()[0], FoldRegion::new(2, 4));

        // Merging the region's first line into the line above drops it.
        let start = buffer.line_start(2);
        let edit = buffer.remove(start - 1, start);
        manager.adjust_for_edit(&edit);
        assert!(manager.regions().is_empty());
    }

    #[test]
    fn test_visual_mapping() {
        let mut manager = FoldManager::new();
        manager.add_region(FoldRegion::new(2, 4));
        manager.add_region(FoldRegion::new(8, 9));
        manager.fold_all();

        assert_eq!(manager.buffer_line_to_visual(1), 1);
        assert_eq!(manager.buffer_line_to_visual(3), 2);
        assert_eq!(manager.buffer_line_to_visual(5), 3);
        assert_eq!(manager.buffer_line_to_visual(10), 7);

        assert_eq!(manager.visual_line_to_buffer(2), 2);
        assert_eq!(manager.visual_line_to_buffer(3), 5);
        assert_eq!(manager.visual_line_to_buffer(6), 8);
        assert_eq!(manager.visual_line_to_buffer(7), 10);

        assert_eq!(manager.visible_line_count(12), 9);
    }
}
