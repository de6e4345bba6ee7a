use std::io;

use super::source::{CharSource, REPLACEMENT};

/// Normalizing character reader with unbounded pushback.
///
/// Applies CSS input preprocessing on the fly: NUL becomes U+FFFD, and CR,
/// FF and CR-LF become a single LF. Characters handed back with
/// [`push_back`](Self::push_back) are returned in last-in, first-out order
/// before the source is read again.
pub struct CharacterScanner<S> {
    source: S,
    /// Characters deferred via pushback; the top of the stack is read next.
    /// `None` entries are pushed-back EOF markers.
    pushed_back: Vec<Option<char>>,
    /// Number of characters consumed and not pushed back.
    position: u32,
    /// 1-based line of the next unread character.
    line: u32,
    /// The previous raw character was a CR, so a following LF is swallowed.
    skip_lf: bool,
}

impl<S: CharSource> CharacterScanner<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            pushed_back: Vec::new(),
            position: 0,
            line: 1,
            skip_lf: false,
        }
    }

    /// Consume and return the next normalized character, or `None` at EOF.
    pub fn next_char(&mut self) -> io::Result<Option<char>> {
        let ch = match self.pushed_back.pop() {
            Some(deferred) => deferred,
            None => self.read_normalized()?,
        };
        if let Some(c) = ch {
            self.position = self.position.checked_add(1).ok_or_else(too_long)?;
            if c == '\n' {
                self.line = self.line.checked_add(1).ok_or_else(too_long)?;
            }
        }
        Ok(ch)
    }

    /// Hand `ch` back so that the next [`next_char`](Self::next_char) returns it.
    ///
    /// Pushing back EOF (`None`) leaves position and line untouched.
    pub fn push_back(&mut self, ch: Option<char>) {
        if let Some(c) = ch {
            self.position = self.position.saturating_sub(1);
            if c == '\n' {
                self.line = self.line.saturating_sub(1).max(1);
            }
        }
        self.pushed_back.push(ch);
    }

    /// Number of characters consumed so far.
    pub fn position(&self) -> u32 {
        self.position
    }

    /// Current 1-based line number.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Number of characters currently deferred via pushback.
    pub fn pending(&self) -> usize {
        self.pushed_back.len()
    }

    /// Consume the next character if it equals `expected`.
    pub fn eat(&mut self, expected: char) -> io::Result<bool> {
        let ch = self.next_char()?;
        if ch == Some(expected) {
            Ok(true)
        } else {
            self.push_back(ch);
            Ok(false)
        }
    }

    fn read_normalized(&mut self) -> io::Result<Option<char>> {
        loop {
            let raw = self.source.read_char()?;
            let skip_lf = std::mem::replace(&mut self.skip_lf, false);
            return Ok(match raw {
                Some('\n') if skip_lf => continue,
                Some('\r') => {
                    self.skip_lf = true;
                    Some('\n')
                }
                Some('\u{c}') => Some('\n'),
                Some('\0') => Some(REPLACEMENT),
                other => other,
            });
        }
    }
}

fn too_long() -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("input exceeds {} characters", u32::MAX),
    )
}
