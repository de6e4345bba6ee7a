//! Raw character sources feeding the [`CharacterScanner`](super::cursor::CharacterScanner).
//!
//! A source yields code points exactly as they appear in the input. Newline
//! and NUL normalization happens one layer up, so every source kind is
//! observed identically by the tokenizer.

use std::io::{self, BufReader, Bytes, Read};
use std::str::Chars;

use tracing::debug;

use crate::error::LexError;

/// Replacement character substituted for undecodable input.
pub const REPLACEMENT: char = '\u{FFFD}';

/// A pull-based source of raw code points.
pub trait CharSource {
    /// Read the next raw character, or `None` once the source is exhausted.
    ///
    /// After returning `None` a source keeps returning `None`.
    fn read_char(&mut self) -> io::Result<Option<char>>;
}

/// In-memory text.
#[derive(Debug, Clone)]
pub struct StrSource<'a> {
    chars: Chars<'a>,
}

impl<'a> StrSource<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars(),
        }
    }
}

impl CharSource for StrSource<'_> {
    fn read_char(&mut self) -> io::Result<Option<char>> {
        Ok(self.chars.next())
    }
}

/// A bounded window `lo..hi` over a character array.
#[derive(Debug, Clone)]
pub struct CharArraySource<'a> {
    chars: &'a [char],
    index: usize,
    limit: usize,
}

impl<'a> CharArraySource<'a> {
    /// Create a source over `chars[lo..hi]`.
    pub fn new(chars: &'a [char], lo: usize, hi: usize) -> Result<Self, LexError> {
        if lo > hi || hi > chars.len() {
            return Err(LexError::InvalidRange {
                lo,
                hi,
                len: chars.len(),
            });
        }
        Ok(Self {
            chars,
            index: lo,
            limit: hi,
        })
    }

    /// Create a source over the whole array.
    pub fn whole(chars: &'a [char]) -> Self {
        Self {
            chars,
            index: 0,
            limit: chars.len(),
        }
    }

    /// Number of characters not yet read.
    pub fn remaining(&self) -> usize {
        self.limit - self.index
    }

    /// Split off the first half of the unread window.
    ///
    /// The returned source covers `index..mid`; `self` continues at `mid`.
    /// Returns `None` when fewer than two characters remain.
    pub fn try_split(&mut self) -> Option<CharArraySource<'a>> {
        let lo = self.index;
        let mid = lo + (self.limit - lo) / 2;
        if lo >= mid {
            return None;
        }
        self.index = mid;
        Some(CharArraySource {
            chars: self.chars,
            index: lo,
            limit: mid,
        })
    }
}

impl CharSource for CharArraySource<'_> {
    fn read_char(&mut self) -> io::Result<Option<char>> {
        if self.index < self.limit {
            let ch = self.chars[self.index];
            self.index += 1;
            Ok(Some(ch))
        } else {
            Ok(None)
        }
    }
}

/// A streaming reader decoded as UTF-8.
///
/// Malformed byte sequences decode to [`REPLACEMENT`]; a byte that breaks a
/// multi-byte sequence starts the next character.
pub struct ReaderSource<R> {
    bytes: Bytes<BufReader<R>>,
    /// A byte read past a broken sequence, to be decoded next.
    pending: Option<u8>,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self::with_capacity(crate::DEFAULT_READER_BUFFER_SIZE, reader)
    }

    pub fn with_capacity(capacity: usize, reader: R) -> Self {
        Self {
            bytes: BufReader::with_capacity(capacity, reader).bytes(),
            pending: None,
        }
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        if let Some(byte) = self.pending.take() {
            return Ok(Some(byte));
        }
        self.bytes.next().transpose()
    }
}

impl<R: Read> CharSource for ReaderSource<R> {
    fn read_char(&mut self) -> io::Result<Option<char>> {
        let Some(lead) = self.next_byte()? else {
            return Ok(None);
        };
        if lead.is_ascii() {
            return Ok(Some(char::from(lead)));
        }

        let width = utf8_char_width(lead);
        if width == 1 {
            debug!(byte = lead, "invalid UTF-8 lead byte replaced");
            return Ok(Some(REPLACEMENT));
        }

        let mut buf = [lead, 0, 0, 0];
        for slot in buf.iter_mut().take(width).skip(1) {
            match self.next_byte()? {
                Some(byte) if byte & 0xC0 == 0x80 => *slot = byte,
                Some(byte) => {
                    debug!(lead, "truncated UTF-8 sequence replaced");
                    self.pending = Some(byte);
                    return Ok(Some(REPLACEMENT));
                }
                None => {
                    debug!(lead, "UTF-8 sequence cut off by end of input");
                    return Ok(Some(REPLACEMENT));
                }
            }
        }

        let decoded = std::str::from_utf8(&buf[..width])
            .ok()
            .and_then(|s| s.chars().next());
        if decoded.is_none() {
            debug!(lead, "overlong or out-of-range UTF-8 sequence replaced");
        }
        Ok(Some(decoded.unwrap_or(REPLACEMENT)))
    }
}

/// Returns the number of bytes in the UTF-8 sequence starting with `byte`.
///
/// ASCII, continuation bytes and invalid lead bytes report 1.
fn utf8_char_width(byte: u8) -> usize {
    match byte {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 1,
    }
}
