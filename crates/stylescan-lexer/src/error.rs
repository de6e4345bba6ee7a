use std::io;

/// Errors returned by the character scanner and tokenizer.
///
/// Malformed CSS is never an error: it degrades to `BadString`, `BadUrl`
/// and `BadComment` tokens. These variants cover I/O failures and misuse
/// of the token stream.
#[derive(Debug, thiserror::Error)]
pub enum LexError {
    #[error("failed to read input: {0}")]
    Io(#[from] io::Error),
    #[error("a token is already pending replay")]
    ReplayPending,
    #[error("no token has been read yet")]
    NothingToReplay,
    #[error("character window {lo}..{hi} is out of bounds for an array of length {len}")]
    InvalidRange { lo: usize, hi: usize, len: usize },
    #[error("malformed numeric literal `{0}`")]
    MalformedNumber(String),
}
