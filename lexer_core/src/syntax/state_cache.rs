//! Per-line lexer state cache.
//!
//! `state[i]` holds the lexer state in effect right after line `i`. The state
//! before line 0 is always [`LexState::NEUTRAL`]. The cache is kept valid by
//! [`LineStateCache::propagate`], which re-lexes forward from an edit until the
//! recomputed end state matches what was cached before.

use super::lexer::LexState;
use crate::error::{LexerError, Result};

/// Outcome of a propagation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Propagation {
    /// First line re-lexed.
    pub first: usize,
    /// Last line re-lexed. Its tokens may have changed even when its end
    /// state did not.
    pub last: usize,
    /// Number of lines re-lexed.
    pub relexed: usize,
    /// Whether the pass stopped on a fixpoint rather than at document end.
    pub stabilized: bool,
}

/// Dense cache of end-of-line lexer states, one per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineStateCache {
    states: Vec<LexState>,
}

impl Default for LineStateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LineStateCache {
    /// Creates a cache for a one-line document.
    pub fn new() -> Self {
        Self::with_lines(1)
    }

    /// Creates a cache of `lines` neutral entries.
    pub fn with_lines(lines: usize) -> Self {
        Self {
            states: vec![LexState::NEUTRAL; lines.max(1)],
        }
    }

    /// Number of lines tracked.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether no lines are tracked. Never true in practice: every
    /// constructor and mutation keeps at least one entry.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// All cached states.
    pub fn as_slice(&self) -> &[LexState] {
        &self.states
    }

    /// State after `line`.
    pub fn get(&self, line: usize) -> Result<LexState> {
        self.states
            .get(line)
            .copied()
            .ok_or(LexerError::LineOutOfRange {
                line,
                len: self.states.len(),
            })
    }

    /// State in effect at the start of `line`.
    pub fn state_before(&self, line: usize) -> Result<LexState> {
        if line == 0 {
            Ok(LexState::NEUTRAL)
        } else {
            self.get(line - 1)
        }
    }

    /// Overwrites the state after `line`.
    pub fn set(&mut self, line: usize, state: LexState) -> Result<()> {
        let len = self.states.len();
        let slot = self
            .states
            .get_mut(line)
            .ok_or(LexerError::LineOutOfRange { line, len })?;
        *slot = state;
        Ok(())
    }

    /// Inserts `count` placeholder entries before index `at`.
    pub fn insert_lines(&mut self, at: usize, count: usize) -> Result<()> {
        if at > self.states.len() {
            return Err(LexerError::LineOutOfRange {
                line: at,
                len: self.states.len(),
            });
        }
        self.states
            .splice(at..at, std::iter::repeat(LexState::NEUTRAL).take(count));
        Ok(())
    }

    /// Removes `count` entries starting at index `at`. At least one entry
    /// always remains.
    pub fn remove_lines(&mut self, at: usize, count: usize) -> Result<()> {
        let end = at + count;
        if end > self.states.len() || count >= self.states.len() {
            return Err(LexerError::LineOutOfRange {
                line: end,
                len: self.states.len(),
            });
        }
        self.states.drain(at..end);
        Ok(())
    }

    /// Discards every state and resizes to `lines` neutral entries.
    pub fn reset(&mut self, lines: usize) {
        self.states.clear();
        self.states.resize(lines.max(1), LexState::NEUTRAL);
    }

    /// Replaces the whole cache.
    pub fn replace(&mut self, states: Vec<LexState>) {
        if states.is_empty() {
            self.reset(1);
        } else {
            self.states = states;
        }
    }

    /// Re-lexes forward from `first` until the cache is consistent again.
    ///
    /// `relex(line, state_in)` must return the state after `line` when it is
    /// lexed starting from `state_in`. Lines up to and including
    /// `touch_through` are always re-lexed; past that, the pass stops at the
    /// first line whose recomputed state equals its cached one.
    pub fn propagate<F>(
        &mut self,
        first: usize,
        touch_through: usize,
        mut relex: F,
    ) -> Result<Propagation>
    where
        F: FnMut(usize, LexState) -> Result<LexState>,
    {
        let len = self.states.len();
        if first >= len {
            return Err(LexerError::LineOutOfRange { line: first, len });
        }

        let mut state_in = self.state_before(first)?;
        let mut line = first;
        let mut relexed = 0;
        loop {
            let state_out = relex(line, state_in)?;
            relexed += 1;

            if line >= touch_through && state_out == self.states[line] {
                return Ok(Propagation {
                    first,
                    last: line,
                    relexed,
                    stabilized: true,
                });
            }

            log::trace!(
                "line {}: state {} -> {}",
                line,
                self.states[line],
                state_out
            );
            self.states[line] = state_out;
            state_in = state_out;

            if line + 1 >= len {
                return Ok(Propagation {
                    first,
                    last: line,
                    relexed,
                    stabilized: false,
                });
            }
            line += 1;
        }
    }
}
