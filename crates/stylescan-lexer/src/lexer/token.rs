use std::fmt;

use serde::Serialize;
use stylescan_common::Span;

use super::escape::{escape_code_point, serialize_identifier, serialize_name, serialize_string};

/// A single token produced by the tokenizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Decoded text payload; see [`TokenKind`] for what each kind carries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Numeric value of `Number`, `Percentage` and `Dimension` tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<Number>,
    /// The number literal as read, sign and leading dot included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
    pub span: Span,
    /// 1-based line of the token's first character.
    pub line: u32,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        text: Option<String>,
        number: Option<Number>,
        span: Span,
        line: u32,
    ) -> Self {
        Self {
            kind,
            text,
            number,
            literal: None,
            span,
            line,
        }
    }

    pub fn with_literal(mut self, literal: impl Into<String>) -> Self {
        self.literal = Some(literal.into());
        self
    }

    /// The text payload, or `""` when the token carries none.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Render the token back to CSS source that tokenizes to an equal token.
    ///
    /// Malformed tokens are rendered as far as they were read, so the output
    /// reproduces the malformation.
    pub fn to_css(&self) -> String {
        let text = self.text();
        match self.kind {
            TokenKind::Ident => serialize_identifier(text),
            TokenKind::Function => format!("{}(", serialize_identifier(text)),
            TokenKind::AtKeyword => format!("@{}", serialize_identifier(text)),
            TokenKind::Hash => format!("#{}", serialize_name(text)),
            TokenKind::String => serialize_string(text),
            TokenKind::BadString => {
                let mut quoted = serialize_string(text);
                quoted.pop();
                quoted
            }
            TokenKind::Url => format!("url({})", serialize_string(text)),
            // The empty comment stops the url before the next token.
            TokenKind::BadUrl => format!("url({}/**/", serialize_string(text)),
            TokenKind::Number => self.number_css(),
            TokenKind::Percentage => format!("{}%", self.number_css()),
            TokenKind::Dimension => format!("{}{}", self.number_css(), serialize_unit(text)),
            TokenKind::Comment => format!("/*{text}*/"),
            TokenKind::BadComment => format!("/*{text}"),
            TokenKind::Eof => String::new(),
            _ => text.to_owned(),
        }
    }

    /// The literal keeps an explicit `+` and a leading `.`, which the value
    /// alone would lose.
    fn number_css(&self) -> String {
        match (&self.literal, self.number) {
            (Some(literal), _) => literal.clone(),
            (None, Some(number)) => number.to_string(),
            (None, None) => String::new(),
        }
    }
}

/// A unit directly follows its number, so a leading `e` that would read as
/// an exponent marker is escaped.
fn serialize_unit(unit: &str) -> String {
    let ident = serialize_identifier(unit);
    let mut chars = ident.chars();
    let marker = chars.next();
    let exponent_like = match (chars.next(), chars.next()) {
        (Some(d), _) if d.is_ascii_digit() => true,
        (Some('-'), Some(d)) => d.is_ascii_digit(),
        _ => false,
    };
    match marker {
        Some(marker @ ('e' | 'E')) if exponent_like => {
            let mut out = String::new();
            escape_code_point(marker, &mut out);
            out.push_str(&ident[1..]);
            out
        }
        _ => ident,
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        match (&self.text, self.number) {
            (Some(text), Some(number)) => write!(f, "({number}, {text:?})"),
            (Some(text), None) => write!(f, "({text:?})"),
            (None, Some(number)) => write!(f, "({number})"),
            (None, None) => Ok(()),
        }
    }
}

/// Numeric value of a number literal.
///
/// A literal without a fraction or exponent is an integer; an integer literal
/// too large for `i64` is kept as a float.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Integer(v) => v as f64,
            Number::Float(v) => v,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, Number::Integer(_))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Number::Integer(v) => write!(f, "{v}"),
            // Debug formatting keeps a fraction or exponent, so the literal
            // reads back as a float.
            Number::Float(v) if v.is_finite() => write!(f, "{v:?}"),
            Number::Float(v) if v.is_sign_negative() => write!(f, "{:?}", f64::MIN),
            Number::Float(_) => write!(f, "{:?}", f64::MAX),
        }
    }
}

/// All CSS token kinds.
///
/// Text payloads by kind:
/// - `Ident`, `Function`, `AtKeyword`, `Hash`: the decoded name, without the
///   `(`, `@` or `#` markup.
/// - `String`, `BadString`, `Url`, `BadUrl`, `Comment`, `BadComment`: the
///   decoded body, partial for the malformed kinds.
/// - `Whitespace`: the whitespace run.
/// - `Percentage`: `%`. `Dimension`: the unit. `Number`: none.
/// - operators, `Cdo`, `Cdc`: the operator text. `Delim(c)`: `c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // === Names ===
    Ident,
    Function,
    AtKeyword,
    Hash,

    // === Literals ===
    String,
    BadString,
    Url,
    BadUrl,
    Number,
    Percentage,
    Dimension,

    // === Insignificant ===
    Whitespace,
    Comment,
    BadComment,
    /// `<!--`
    Cdo,
    /// `-->`
    Cdc,

    // === Operators ===
    /// `~=`
    IncludeMatch,
    /// `|=`
    DashMatch,
    /// `^=`
    PrefixMatch,
    /// `$=`
    SuffixMatch,
    /// `*=`
    SubstringMatch,
    /// `||`
    Column,

    /// Any other single character.
    Delim(char),

    Eof,
}

impl TokenKind {
    /// Tokens that [`Tokenizer::next`](super::Tokenizer::next) skips over.
    pub fn is_insignificant(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace
                | TokenKind::Comment
                | TokenKind::BadComment
                | TokenKind::Cdo
                | TokenKind::Cdc
        )
    }

    /// Tokens produced from malformed input.
    pub fn is_malformed(self) -> bool {
        matches!(
            self,
            TokenKind::BadString | TokenKind::BadUrl | TokenKind::BadComment
        )
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            TokenKind::Number | TokenKind::Percentage | TokenKind::Dimension
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Delim(c) => write!(f, "'{c}'"),
            other => write!(f, "{other:?}"),
        }
    }
}
