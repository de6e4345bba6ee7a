use std::io::Read;
use std::num::IntErrorKind;

use stylescan_common::Span;
use tracing::{debug, trace};

use super::cursor::CharacterScanner;
use super::source::{CharArraySource, CharSource, ReaderSource, StrSource, REPLACEMENT};
use super::token::{Number, Token, TokenKind};
use crate::error::LexError;

/// The CSS tokenizer.
///
/// Pulls characters from a [`CharacterScanner`] and classifies them into
/// [`Token`]s. The most recent token can be handed back once with
/// [`push_back`](Self::push_back) and is then returned again by the next
/// fetch.
pub struct Tokenizer<S> {
    input: CharacterScanner<S>,
    current: Option<Token>,
    mode: Mode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Fetch a fresh token from the input.
    Normal,
    /// Return `current` once more.
    Replay,
}

/// Outcome of a production that degrades instead of failing.
enum Lexed {
    Matched(String),
    /// Input ended or broke off early; carries the text read so far.
    Partial(String),
}

/// Kind and payload of a token before its span is known.
struct Lexeme {
    kind: TokenKind,
    text: Option<String>,
    number: Option<Number>,
    literal: Option<String>,
}

impl Lexeme {
    fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: Some(text.into()),
            number: None,
            literal: None,
        }
    }

    fn delim(c: char) -> Self {
        Self::new(TokenKind::Delim(c), c)
    }

    fn degraded(kind: TokenKind, bad_kind: TokenKind, lexed: Lexed) -> Self {
        match lexed {
            Lexed::Matched(text) => Self::new(kind, text),
            Lexed::Partial(text) => Self::new(bad_kind, text),
        }
    }
}

impl<'a> Tokenizer<StrSource<'a>> {
    pub fn from_text(text: &'a str) -> Self {
        Self::new(CharacterScanner::new(StrSource::new(text)))
    }
}

impl<'a> Tokenizer<CharArraySource<'a>> {
    /// Tokenize `chars[lo..hi]`.
    pub fn from_char_array(chars: &'a [char], lo: usize, hi: usize) -> Result<Self, LexError> {
        Ok(Self::new(CharacterScanner::new(CharArraySource::new(
            chars, lo, hi,
        )?)))
    }
}

impl<R: Read> Tokenizer<ReaderSource<R>> {
    pub fn from_reader(reader: R) -> Self {
        Self::new(CharacterScanner::new(ReaderSource::new(reader)))
    }

    pub fn from_reader_with_capacity(capacity: usize, reader: R) -> Self {
        Self::new(CharacterScanner::new(ReaderSource::with_capacity(
            capacity, reader,
        )))
    }
}

impl<S: CharSource> Tokenizer<S> {
    pub fn new(input: CharacterScanner<S>) -> Self {
        Self {
            input,
            current: None,
            mode: Mode::Normal,
        }
    }

    /// Return the next significant token.
    ///
    /// Whitespace, comments, `<!--` and `-->` are skipped.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Token, LexError> {
        loop {
            let token = self.next_no_skip()?;
            if !token.kind.is_insignificant() {
                return Ok(token);
            }
        }
    }

    /// Return the next token, including insignificant ones.
    ///
    /// Once the input is exhausted every call returns an `Eof` token.
    pub fn next_no_skip(&mut self) -> Result<Token, LexError> {
        if self.mode == Mode::Replay {
            self.mode = Mode::Normal;
            if let Some(token) = &self.current {
                trace!(kind = %token.kind, span = %token.span, "replay");
                return Ok(token.clone());
            }
        }

        let line = self.input.line();
        let start = self.input.position();
        let lexeme = self.scan()?;
        let span = Span::new(start, self.input.position());
        let mut token = Token::new(lexeme.kind, lexeme.text, lexeme.number, span, line);
        if let Some(literal) = lexeme.literal {
            token = token.with_literal(literal);
        }

        trace!(kind = %token.kind, span = %span, line, "token");
        if token.kind.is_malformed() {
            debug!(kind = %token.kind, span = %span, line, "malformed token");
        }
        self.current = Some(token.clone());
        Ok(token)
    }

    /// Mark the current token for replay by the next fetch.
    pub fn push_back(&mut self) -> Result<(), LexError> {
        if self.mode == Mode::Replay {
            return Err(LexError::ReplayPending);
        }
        if self.current.is_none() {
            return Err(LexError::NothingToReplay);
        }
        self.mode = Mode::Replay;
        Ok(())
    }

    /// Kind of the current token.
    pub fn current(&self) -> Option<TokenKind> {
        self.current.as_ref().map(|t| t.kind)
    }

    pub fn current_string(&self) -> Option<&str> {
        self.current.as_ref().and_then(|t| t.text.as_deref())
    }

    pub fn current_number(&self) -> Option<Number> {
        self.current.as_ref().and_then(|t| t.number)
    }

    /// Line of the current token, or of the next character before any token.
    pub fn line_number(&self) -> u32 {
        self.current.as_ref().map_or(self.input.line(), |t| t.line)
    }

    pub fn start_position(&self) -> u32 {
        self.current
            .as_ref()
            .map_or(self.input.position(), |t| t.span.start)
    }

    pub fn end_position(&self) -> u32 {
        self.current
            .as_ref()
            .map_or(self.input.position(), |t| t.span.end)
    }

    /// Snapshot of the current token.
    pub fn token(&self) -> Option<Token> {
        self.current.clone()
    }

    /// Tokenize the remaining input, insignificant tokens included.
    ///
    /// The returned list ends with the `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_no_skip()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    // ---------------------------------------------------------------
    // Dispatch
    // ---------------------------------------------------------------

    fn scan(&mut self) -> Result<Lexeme, LexError> {
        let Some(c) = self.input.next_char()? else {
            return Ok(Lexeme {
                kind: TokenKind::Eof,
                text: None,
                number: None,
                literal: None,
            });
        };

        let lexeme = match c {
            ' ' | '\t' | '\n' => {
                let mut run = String::from(c);
                self.whitespace(&mut run)?;
                Lexeme::new(TokenKind::Whitespace, run)
            }
            '"' | '\'' => {
                let lexed = self.string(c)?;
                Lexeme::degraded(TokenKind::String, TokenKind::BadString, lexed)
            }
            '#' => match self.name()? {
                Some(name) => Lexeme::new(TokenKind::Hash, name),
                None => Lexeme::delim(c),
            },
            '@' => match self.ident()? {
                Some(name) => Lexeme::new(TokenKind::AtKeyword, name),
                None => Lexeme::delim(c),
            },
            '~' => self.operator(c, '=', TokenKind::IncludeMatch)?,
            '^' => self.operator(c, '=', TokenKind::PrefixMatch)?,
            '$' => self.operator(c, '=', TokenKind::SuffixMatch)?,
            '*' => self.operator(c, '=', TokenKind::SubstringMatch)?,
            '|' => {
                if self.input.eat('=')? {
                    Lexeme::new(TokenKind::DashMatch, "|=")
                } else {
                    self.operator(c, '|', TokenKind::Column)?
                }
            }
            '/' => {
                if self.input.eat('*')? {
                    let lexed = self.comment()?;
                    Lexeme::degraded(TokenKind::Comment, TokenKind::BadComment, lexed)
                } else {
                    Lexeme::delim(c)
                }
            }
            '<' => self.cdo()?,
            '-' => self.minus()?,
            '+' | '.' | '0'..='9' => {
                self.input.push_back(Some(c));
                match self.numeric()? {
                    Some(lexeme) => lexeme,
                    None => self.delim_again()?,
                }
            }
            c if c == '\\' || is_name_start(c) => {
                self.input.push_back(Some(c));
                match self.ident()? {
                    Some(name) => self.ident_like(name)?,
                    None => self.delim_again()?,
                }
            }
            c => Lexeme::delim(c),
        };
        Ok(lexeme)
    }

    /// Re-read a character that a failed production handed back and emit it
    /// as a delimiter.
    fn delim_again(&mut self) -> Result<Lexeme, LexError> {
        let c = self.input.next_char()?.unwrap_or(REPLACEMENT);
        Ok(Lexeme::delim(c))
    }

    /// `first` followed by `second` is `kind`; otherwise `first` is a delimiter.
    fn operator(&mut self, first: char, second: char, kind: TokenKind) -> Result<Lexeme, LexError> {
        if self.input.eat(second)? {
            Ok(Lexeme::new(kind, format!("{first}{second}")))
        } else {
            Ok(Lexeme::delim(first))
        }
    }

    /// After `<`: `<!--` or a delimiter.
    fn cdo(&mut self) -> Result<Lexeme, LexError> {
        let bang = self.input.next_char()?;
        if bang == Some('!') {
            let dash1 = self.input.next_char()?;
            if dash1 == Some('-') && self.input.eat('-')? {
                return Ok(Lexeme::new(TokenKind::Cdo, "<!--"));
            }
            self.input.push_back(dash1);
        }
        self.input.push_back(bang);
        Ok(Lexeme::delim('<'))
    }

    /// After `-`: `-->`, a `--name` identifier, a number, an identifier or a
    /// function, or a delimiter.
    fn minus(&mut self) -> Result<Lexeme, LexError> {
        let second = self.input.next_char()?;
        if second == Some('-') && self.input.eat('>')? {
            return Ok(Lexeme::new(TokenKind::Cdc, "-->"));
        }
        self.input.push_back(second);
        self.input.push_back(Some('-'));

        if let Some(lexeme) = self.numeric()? {
            return Ok(lexeme);
        }
        match self.ident()? {
            Some(name) => self.ident_like(name),
            None => self.delim_again(),
        }
    }

    /// An identifier followed by `(` is a function, or a url when the name
    /// is `url` in any case.
    fn ident_like(&mut self, name: String) -> Result<Lexeme, LexError> {
        if !self.input.eat('(')? {
            return Ok(Lexeme::new(TokenKind::Ident, name));
        }
        if name.eq_ignore_ascii_case("url") {
            let lexed = self.url()?;
            Ok(Lexeme::degraded(TokenKind::Url, TokenKind::BadUrl, lexed))
        } else {
            Ok(Lexeme::new(TokenKind::Function, name))
        }
    }

    // ---------------------------------------------------------------
    // Names
    // ---------------------------------------------------------------

    /// `[-] nmstart nmchar*`, or `--` followed by name characters or EOF.
    ///
    /// Consumes nothing on failure.
    fn ident(&mut self) -> Result<Option<String>, LexError> {
        let mut text = String::new();
        let dash = self.input.eat('-')?;
        if dash {
            text.push('-');
            if self.input.eat('-')? {
                text.push('-');
                return self.custom_property(text);
            }
        }

        if !self.name_start(&mut text)? {
            if dash {
                self.input.push_back(Some('-'));
            }
            return Ok(None);
        }
        while self.name_char(&mut text)? {}
        Ok(Some(text))
    }

    /// After `--`.
    fn custom_property(&mut self, mut text: String) -> Result<Option<String>, LexError> {
        if self.name_char(&mut text)? {
            while self.name_char(&mut text)? {}
            return Ok(Some(text));
        }
        let next = self.input.next_char()?;
        self.input.push_back(next);
        if next.is_none() {
            return Ok(Some(text));
        }
        self.input.push_back(Some('-'));
        self.input.push_back(Some('-'));
        Ok(None)
    }

    /// One or more name characters.
    fn name(&mut self) -> Result<Option<String>, LexError> {
        let mut text = String::new();
        while self.name_char(&mut text)? {}
        Ok((!text.is_empty()).then_some(text))
    }

    fn name_start(&mut self, out: &mut String) -> Result<bool, LexError> {
        self.name_with(out, is_name_start)
    }

    fn name_char(&mut self, out: &mut String) -> Result<bool, LexError> {
        self.name_with(out, is_name_char)
    }

    fn name_with(&mut self, out: &mut String, accept: fn(char) -> bool) -> Result<bool, LexError> {
        let ch = self.input.next_char()?;
        match ch {
            Some(c) if accept(c) => {
                out.push(c);
                Ok(true)
            }
            Some('\\') => {
                self.input.push_back(ch);
                self.escape(out)
            }
            _ => {
                self.input.push_back(ch);
                Ok(false)
            }
        }
    }

    /// `\` followed by a hex escape or any character but a newline.
    ///
    /// Appends the decoded character on success; consumes nothing on failure.
    fn escape(&mut self, out: &mut String) -> Result<bool, LexError> {
        let backslash = self.input.next_char()?;
        if backslash != Some('\\') {
            self.input.push_back(backslash);
            return Ok(false);
        }
        let ch = self.input.next_char()?;
        match ch {
            None | Some('\n') => {
                self.input.push_back(ch);
                self.input.push_back(backslash);
                Ok(false)
            }
            Some(c) => match c.to_digit(16) {
                Some(digit) => {
                    out.push(self.hex_escape(digit)?);
                    Ok(true)
                }
                None => {
                    out.push(c);
                    Ok(true)
                }
            },
        }
    }

    /// Decode up to six hex digits, the first already read, plus one
    /// optional trailing whitespace character.
    fn hex_escape(&mut self, first: u32) -> Result<char, LexError> {
        let mut scalar = first;
        let mut digits = 1;
        while digits < 6 {
            let ch = self.input.next_char()?;
            match ch.and_then(|c| c.to_digit(16)) {
                Some(digit) => {
                    scalar = (scalar << 4) | digit;
                    digits += 1;
                }
                None => {
                    self.input.push_back(ch);
                    break;
                }
            }
        }
        if digits < 6 {
            let ch = self.input.next_char()?;
            if !matches!(ch, Some(' ' | '\t' | '\n')) {
                self.input.push_back(ch);
            }
        }
        // Surrogates and values past U+10FFFF are not scalar values.
        Ok(char::from_u32(scalar).unwrap_or(REPLACEMENT))
    }

    // ---------------------------------------------------------------
    // Numbers
    // ---------------------------------------------------------------

    /// A number followed by `%` or a unit.
    ///
    /// Consumes nothing when no number is present.
    fn numeric(&mut self) -> Result<Option<Lexeme>, LexError> {
        let Some((number, literal)) = self.num()? else {
            return Ok(None);
        };
        let lexeme = if self.input.eat('%')? {
            Lexeme::new(TokenKind::Percentage, "%")
        } else if let Some(unit) = self.ident()? {
            Lexeme::new(TokenKind::Dimension, unit)
        } else {
            Lexeme {
                kind: TokenKind::Number,
                text: None,
                number: None,
                literal: None,
            }
        };
        Ok(Some(Lexeme {
            number: Some(number),
            literal: Some(literal),
            ..lexeme
        }))
    }

    /// `[+-] digits [. digits] [(e|E) [+-] digits]`, with at least one digit
    /// before or after the dot. Returns the value and the literal as read.
    fn num(&mut self) -> Result<Option<(Number, String)>, LexError> {
        let mut literal = String::new();
        let mut ch = self.input.next_char()?;
        if let Some(sign @ ('+' | '-')) = ch {
            literal.push(sign);
            ch = self.input.next_char()?;
        }

        let mut integer_digits = false;
        while let Some(d) = ch.filter(char::is_ascii_digit) {
            literal.push(d);
            integer_digits = true;
            ch = self.input.next_char()?;
        }

        let mut is_float = false;
        if ch == Some('.') {
            let next = self.input.next_char()?;
            if next.is_some_and(|c| c.is_ascii_digit()) {
                literal.push('.');
                is_float = true;
                ch = next;
                while let Some(d) = ch.filter(char::is_ascii_digit) {
                    literal.push(d);
                    ch = self.input.next_char()?;
                }
            } else {
                // A dot without digits belongs to the next token.
                self.input.push_back(next);
            }
        }

        if !integer_digits && !is_float {
            self.input.push_back(ch);
            for c in literal.chars().rev() {
                self.input.push_back(Some(c));
            }
            return Ok(None);
        }

        if let Some(marker @ ('e' | 'E')) = ch {
            let mut next = self.input.next_char()?;
            let sign = match next {
                Some(s @ ('+' | '-')) => {
                    next = self.input.next_char()?;
                    Some(s)
                }
                _ => None,
            };
            if next.is_some_and(|c| c.is_ascii_digit()) {
                literal.push('e');
                literal.extend(sign);
                is_float = true;
                ch = next;
                while let Some(d) = ch.filter(char::is_ascii_digit) {
                    literal.push(d);
                    ch = self.input.next_char()?;
                }
            } else {
                self.input.push_back(next);
                if let Some(s) = sign {
                    self.input.push_back(Some(s));
                }
                ch = Some(marker);
            }
        }
        self.input.push_back(ch);

        let number = parse_number(&literal, is_float)?;
        Ok(Some((number, literal)))
    }

    // ---------------------------------------------------------------
    // Strings, urls, comments
    // ---------------------------------------------------------------

    /// After the opening quote. An unescaped newline or EOF ends the string
    /// early; the newline is left unconsumed.
    fn string(&mut self, quote: char) -> Result<Lexed, LexError> {
        let mut text = String::new();
        loop {
            let ch = self.input.next_char()?;
            match ch {
                None => return Ok(Lexed::Partial(text)),
                Some('\n') => {
                    self.input.push_back(ch);
                    return Ok(Lexed::Partial(text));
                }
                Some('\\') => {
                    self.input.push_back(ch);
                    if !self.escape(&mut text)? {
                        let backslash = self.input.next_char()?;
                        let next = self.input.next_char()?;
                        if next == Some('\n') {
                            text.push('\n');
                        } else {
                            // Backslash at EOF: leave it for the next token.
                            self.input.push_back(next);
                            self.input.push_back(backslash);
                            return Ok(Lexed::Partial(text));
                        }
                    }
                }
                Some(c) if c == quote => return Ok(Lexed::Matched(text)),
                Some(c) => text.push(c),
            }
        }
    }

    /// After `url(`. The character that breaks a malformed url is left
    /// unconsumed.
    fn url(&mut self) -> Result<Lexed, LexError> {
        let mut discard = String::new();
        self.whitespace(&mut discard)?;

        let mut text = String::new();
        let ch = self.input.next_char()?;
        match ch {
            Some(quote @ ('"' | '\'')) => match self.string(quote)? {
                Lexed::Matched(body) => text = body,
                partial => return Ok(partial),
            },
            _ => {
                self.input.push_back(ch);
                loop {
                    let ch = self.input.next_char()?;
                    match ch {
                        Some(c) if is_url_char(c) => text.push(c),
                        Some('\\') => {
                            self.input.push_back(ch);
                            if !self.escape(&mut text)? {
                                break;
                            }
                        }
                        _ => {
                            self.input.push_back(ch);
                            break;
                        }
                    }
                }
            }
        }

        self.whitespace(&mut discard)?;
        if self.input.eat(')')? {
            Ok(Lexed::Matched(text))
        } else {
            Ok(Lexed::Partial(text))
        }
    }

    /// After `/*`.
    fn comment(&mut self) -> Result<Lexed, LexError> {
        let mut text = String::new();
        loop {
            match self.input.next_char()? {
                None => return Ok(Lexed::Partial(text)),
                Some('*') => {
                    if self.input.eat('/')? {
                        return Ok(Lexed::Matched(text));
                    }
                    text.push('*');
                }
                Some(c) => text.push(c),
            }
        }
    }

    fn whitespace(&mut self, out: &mut String) -> Result<(), LexError> {
        loop {
            let ch = self.input.next_char()?;
            match ch {
                Some(c @ (' ' | '\t' | '\n')) => out.push(c),
                _ => {
                    self.input.push_back(ch);
                    return Ok(());
                }
            }
        }
    }
}

fn parse_number(literal: &str, is_float: bool) -> Result<Number, LexError> {
    let malformed = || LexError::MalformedNumber(literal.to_owned());
    if is_float {
        return literal.parse().map(Number::Float).map_err(|_| malformed());
    }
    match literal.parse::<i64>() {
        Ok(value) => Ok(Number::Integer(value)),
        Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
            literal.parse().map(Number::Float).map_err(|_| malformed())
        }
        Err(_) => Err(malformed()),
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || u32::from(c) >= 160
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c == '-'
}

fn is_url_char(c: char) -> bool {
    matches!(c, '!' | '#' | '$' | '%' | '&' | '*'..='[' | ']'..='~') || u32::from(c) >= 160
}
