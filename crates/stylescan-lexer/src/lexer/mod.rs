pub mod cursor;
pub mod escape;
pub mod source;
pub mod token;

mod scanner;

pub use cursor::CharacterScanner;
pub use scanner::Tokenizer;
pub use token::{Number, Token, TokenKind};
