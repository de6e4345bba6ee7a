//! CSS tokenizer.
//!
//! Two layers: a [`CharacterScanner`] that normalizes input and supports
//! unbounded pushback, and a [`Tokenizer`] that classifies the normalized
//! characters into CSS tokens with one token of replay.

pub mod diagnostics;
pub mod error;
pub mod lexer;

pub use diagnostics::report_malformed;
pub use error::LexError;
pub use lexer::escape::{serialize_identifier, serialize_string};
pub use lexer::source::{CharArraySource, CharSource, ReaderSource, StrSource};
pub use lexer::{CharacterScanner, Number, Token, TokenKind, Tokenizer};
pub use stylescan_common::config::DEFAULT_READER_BUFFER_SIZE;
