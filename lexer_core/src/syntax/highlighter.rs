//! Incremental retokenization driver.
//!
//! Keeps the [`LineStateCache`] consistent with the buffer as it is edited.
//! Tokens themselves are never stored: [`SyntaxHighlighter::token_sequence_for_line`]
//! regenerates them from the line text and the cached state of the line above.

use super::hyperlink::mark_hyperlinks;
use super::language::{Language, LanguageRegistry};
use super::lexer::{last_state_capped, tokenize_capped, LexState, Lexer};
use super::state_cache::LineStateCache;
use super::token::{TokenKind, TokenSequence, TokenSequenceBuilder};
use crate::buffer::{BufferEdit, LineSource};
use crate::config::EngineConfig;
use crate::error::{LexerError, Result};
use std::cell::Cell;
use std::sync::Arc;

/// Inclusive range of lines whose tokens may have changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Damage {
    pub first_line: usize,
    pub last_line: usize,
}

impl Damage {
    pub fn new(first_line: usize, last_line: usize) -> Self {
        Self {
            first_line,
            last_line,
        }
    }

    /// Smallest range covering both.
    pub fn union(self, other: Damage) -> Damage {
        Damage {
            first_line: self.first_line.min(other.first_line),
            last_line: self.last_line.max(other.last_line),
        }
    }

    /// Whether `line` falls inside the range.
    pub fn contains(&self, line: usize) -> bool {
        line >= self.first_line && line <= self.last_line
    }

    /// Number of lines covered.
    pub fn line_count(&self) -> usize {
        self.last_line - self.first_line + 1
    }
}

/// Drives incremental retokenization for one buffer.
pub struct SyntaxHighlighter {
    /// Available scanners.
    registry: LanguageRegistry,
    /// Identifier of the active language.
    language_id: String,
    /// Scanner for the active language.
    lexer: Arc<dyn Lexer>,
    /// State after each line.
    states: LineStateCache,
    config: EngineConfig,
    /// Damage not yet collected by the painter.
    pending: Option<Damage>,
    /// Set when the cache can no longer be trusted; the next edit rebuilds.
    needs_rebuild: Cell<bool>,
    /// Number of full rebuilds triggered by detected inconsistencies.
    repairs: usize,
}

impl std::fmt::Debug for SyntaxHighlighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxHighlighter")
            .field("language_id", &self.language_id)
            .field("lines", &self.states.len())
            .field("pending", &self.pending)
            .field("repairs", &self.repairs)
            .finish()
    }
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl SyntaxHighlighter {
    /// Creates a plain-text highlighter with the built-in languages.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_registry(LanguageRegistry::with_builtin(), config)
    }

    /// Creates a plain-text highlighter using a custom registry.
    pub fn with_registry(registry: LanguageRegistry, config: EngineConfig) -> Self {
        let plain = Language::PlainText;
        let lexer = registry.get(plain.id()).unwrap_or_else(|_| plain.lexer());
        Self {
            registry,
            language_id: plain.id().to_string(),
            lexer,
            states: LineStateCache::new(),
            config,
            pending: None,
            needs_rebuild: Cell::new(false),
            repairs: 0,
        }
    }

    /// Returns the active language identifier.
    pub fn language_id(&self) -> &str {
        &self.language_id
    }

    /// Returns the active scanner.
    pub fn lexer(&self) -> &dyn Lexer {
        self.lexer.as_ref()
    }

    /// Returns the registry.
    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the state cache.
    pub fn states(&self) -> &LineStateCache {
        &self.states
    }

    /// Number of repairs performed so far.
    pub fn repairs(&self) -> usize {
        self.repairs
    }

    /// Whether the next edit will rebuild from scratch.
    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild.get()
    }

    /// Switches language and rebuilds the whole state cache.
    pub fn set_language<S: LineSource + ?Sized>(&mut self, id: &str, source: &S) -> Result<()> {
        if self.language_id == id && !self.needs_rebuild() {
            return Ok(());
        }
        let lexer = self.registry.get(id)?;
        log::info!("Switching language {} -> {}", self.language_id, id);
        self.language_id = id.to_string();
        self.lexer = lexer;
        self.rebuild(source)
    }

    /// Recomputes every line state from scratch.
    pub fn rebuild<S: LineSource + ?Sized>(&mut self, source: &S) -> Result<()> {
        let states = self.full_pass(source)?;
        let lines = states.len();
        self.states.replace(states);
        self.needs_rebuild.set(false);
        self.add_damage(Damage::new(0, lines.saturating_sub(1)));
        Ok(())
    }

    /// Brings the cache up to date after a buffer edit.
    ///
    /// Returns the lines whose tokens may have changed. The same range is
    /// also accumulated for [`take_damage`](Self::take_damage).
    ///
    /// If the buffer changes while the pass runs, the pass stops with
    /// [`LexerError::BufferChanged`] and the cache is rebuilt on the next
    /// call.
    pub fn on_edit<S: LineSource + ?Sized>(
        &mut self,
        source: &S,
        edit: &BufferEdit,
    ) -> Result<Damage> {
        if self.needs_rebuild() {
            log::debug!(
                "Cache marked stale, rebuilding before edit at line {}",
                edit.start_line
            );
            self.rebuild(source)?;
            return Ok(Damage::new(0, source.line_count().saturating_sub(1)));
        }

        match self.apply_edit(source, edit) {
            Ok(damage) => {
                self.add_damage(damage);
                Ok(damage)
            }
            Err(err @ LexerError::BufferChanged { .. }) => {
                log::warn!("{}; retokenization deferred", err);
                self.needs_rebuild.set(true);
                Err(err)
            }
            Err(err) if err.is_repairable() => {
                log::warn!(
                    "Invariant violation during retokenization ({}); rebuilding",
                    err
                );
                self.repairs += 1;
                self.rebuild(source)?;
                Ok(Damage::new(0, source.line_count().saturating_sub(1)))
            }
            Err(err) => Err(err),
        }
    }

    fn apply_edit<S: LineSource + ?Sized>(
        &mut self,
        source: &S,
        edit: &BufferEdit,
    ) -> Result<Damage> {
        let at = edit.start_line + 1;
        if edit.lines_removed > 0 {
            self.states.remove_lines(at, edit.lines_removed)?;
        }
        if edit.lines_added > 0 {
            self.states.insert_lines(at, edit.lines_added)?;
        }

        let line_count = source.line_count();
        if self.states.len() != line_count {
            return Err(LexerError::LineOutOfRange {
                line: line_count,
                len: self.states.len(),
            });
        }

        let first = edit.start_line;
        let mut touch_through = edit.last_changed_line();
        if !edit.is_single_line() {
            touch_through += 1;
        }
        let touch_through = touch_through.min(line_count - 1);

        let revision = source.revision();
        let lexer = Arc::clone(&self.lexer);
        let cap = self.config.max_line_scan;
        let result = self.states.propagate(first, touch_through, |line, state_in| {
            let chars = source
                .line_chars(line)
                .ok_or(LexerError::LineOutOfRange { line, len: line_count })?;
            if source.revision() != revision {
                return Err(LexerError::BufferChanged {
                    expected: revision,
                    found: source.revision(),
                });
            }
            Ok(last_state_capped(lexer.as_ref(), &chars, state_in, cap))
        })?;

        log::debug!(
            "Edit at line {}: re-lexed {} line(s), damage {}..={}{}",
            first,
            result.relexed,
            result.first,
            result.last,
            if result.stabilized { "" } else { " (reached end)" }
        );
        Ok(Damage::new(result.first, result.last))
    }

    /// Generates the tokens of `line` from its text and the cached state of
    /// the line above.
    ///
    /// A sequence that fails validation is replaced by a single error token
    /// and the cache is marked for rebuild.
    pub fn token_sequence_for_line<S: LineSource + ?Sized>(
        &self,
        source: &S,
        line: usize,
    ) -> Result<TokenSequence> {
        let chars = source.line_chars(line).ok_or(LexerError::LineOutOfRange {
            line,
            len: source.line_count(),
        })?;
        let state = self.states.state_before(line)?;
        let line_start = source.line_start(line);
        let mut seq = tokenize_capped(
            self.lexer.as_ref(),
            &chars,
            state,
            line_start,
            self.config.max_line_scan,
        );

        if self.config.detect_hyperlinks {
            mark_hyperlinks(&mut seq, &chars);
        }

        if self.config.should_validate() {
            if let Err(reason) = seq.validate(chars.len()) {
                let err = LexerError::malformed(line, reason);
                log::warn!("{}; marking cache for rebuild", err);
                self.needs_rebuild.set(true);
                let mut builder = TokenSequenceBuilder::new(line_start);
                builder.push(TokenKind::ErrorIdentifier, 0, chars.len());
                seq = builder.finish(chars.len(), seq.end_state());
            }
        }
        Ok(seq)
    }

    /// State in effect after `line`.
    pub fn state_after(&self, line: usize) -> Result<LexState> {
        self.states.get(line)
    }

    /// Lexes the whole document from scratch without touching the cache.
    pub fn full_pass<S: LineSource + ?Sized>(&self, source: &S) -> Result<Vec<LexState>> {
        let revision = source.revision();
        let mut state = LexState::NEUTRAL;
        let mut states = Vec::with_capacity(source.line_count());
        for line in 0..source.line_count() {
            let chars = source.line_chars(line).ok_or(LexerError::LineOutOfRange {
                line,
                len: source.line_count(),
            })?;
            let cap = self.config.max_line_scan;
            state = last_state_capped(self.lexer.as_ref(), &chars, state, cap);
            states.push(state);
        }
        if source.revision() != revision {
            return Err(LexerError::BufferChanged {
                expected: revision,
                found: source.revision(),
            });
        }
        Ok(states)
    }

    /// Compares the cache against a from-scratch pass, repairing it on
    /// mismatch. Returns whether the cache was already consistent.
    pub fn verify<S: LineSource + ?Sized>(&mut self, source: &S) -> Result<bool> {
        let expected = self.full_pass(source)?;
        if expected.as_slice() == self.states.as_slice() && !self.needs_rebuild() {
            return Ok(true);
        }
        log::warn!("Line state cache out of sync with buffer; repairing");
        self.repairs += 1;
        let lines = expected.len();
        self.states.replace(expected);
        self.needs_rebuild.set(false);
        self.add_damage(Damage::new(0, lines.saturating_sub(1)));
        Ok(false)
    }

    /// Collects damage accumulated since the last call.
    pub fn take_damage(&mut self) -> Option<Damage> {
        self.pending.take()
    }

    fn add_damage(&mut self, damage: Damage) {
        self.pending = Some(match self.pending {
            Some(pending) => pending.union(damage),
            None => damage,
        });
    }
}
