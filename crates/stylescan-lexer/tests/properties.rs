//! Property tests for the tokenizer and the serializers.

use proptest::prelude::*;
use stylescan_lexer::{
    serialize_identifier, serialize_string, Number, Token, TokenKind, Tokenizer,
};

/// Characters that exercise every branch of the dispatch.
const CSS_ALPHABET: &[char] = &[
    'a', 'e', 'u', 'r', 'l', 'x', 'E', 'F', '0', '1', '9', ' ', '\t', '\n', '\r', '\u{c}', '\0',
    '\\', '"', '\'', '(', ')', '{', '}', ':', ';', '.', ',', '#', '@', '<', '>', '!', '*', '/',
    '+', '-', '~', '|', '^', '$', '%', '=', '_', '\u{e9}', '\u{1F600}',
];

fn css_like() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(CSS_ALPHABET), 0..48)
        .prop_map(|chars| chars.into_iter().collect())
}

fn any_input() -> impl Strategy<Value = String> {
    prop_oneof![css_like(), any::<String>()]
}

fn non_empty_text() -> impl Strategy<Value = String> {
    prop::collection::vec(any::<char>(), 1..24).prop_map(|chars| chars.into_iter().collect())
}

fn tokenize(source: &str) -> Vec<Token> {
    Tokenizer::from_text(source).tokenize().unwrap()
}

/// Kind and payload of each significant token.
fn significant(tokens: &[Token]) -> Vec<(TokenKind, Option<String>, Option<Number>)> {
    tokens
        .iter()
        .filter(|t| !t.kind.is_insignificant())
        .map(|t| (t.kind, t.text.clone(), t.number))
        .collect()
}

proptest! {
    #[test]
    fn serialized_identifier_reads_back(text in non_empty_text()) {
        let tokens = tokenize(&serialize_identifier(&text));
        prop_assert_eq!(tokens.len(), 2);
        prop_assert_eq!(tokens[0].kind, TokenKind::Ident);
        prop_assert_eq!(tokens[0].text(), text.as_str());
        prop_assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn plain_identifier_is_unchanged(text in "-?[a-zA-Z_\u{e9}][a-zA-Z0-9_-]{0,12}") {
        prop_assert_eq!(serialize_identifier(&text), text);
    }

    #[test]
    fn serialized_string_reads_back(text in any::<String>()) {
        let tokens = tokenize(&serialize_string(&text));
        prop_assert_eq!(tokens.len(), 2);
        prop_assert_eq!(tokens[0].kind, TokenKind::String);
        prop_assert_eq!(tokens[0].text(), text.as_str());
    }

    #[test]
    fn tokens_tile_the_normalized_input(source in any_input()) {
        let tokens = tokenize(&source);
        let mut end = 0;
        let mut line = 1;
        for token in &tokens {
            prop_assert_eq!(token.span.start, end);
            prop_assert!(token.line >= line);
            end = token.span.end;
            line = token.line;
        }
        let normalized = source.replace("\r\n", "\n").chars().count();
        prop_assert_eq!(end as usize, normalized);
        prop_assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn push_back_replays_every_token(source in css_like()) {
        let mut tokenizer = Tokenizer::from_text(&source);
        loop {
            let token = tokenizer.next_no_skip().unwrap();
            tokenizer.push_back().unwrap();
            prop_assert!(tokenizer.push_back().is_err());
            let replayed = tokenizer.next_no_skip().unwrap();
            prop_assert_eq!(&replayed, &token);
            if token.kind == TokenKind::Eof {
                break;
            }
        }
    }

    #[test]
    fn next_returns_only_significant_tokens(source in css_like()) {
        let expected: Vec<Token> = tokenize(&source)
            .into_iter()
            .filter(|t| !t.kind.is_insignificant())
            .collect();
        let mut tokenizer = Tokenizer::from_text(&source);
        let mut actual = Vec::new();
        loop {
            let token = tokenizer.next().unwrap();
            let done = token.kind == TokenKind::Eof;
            actual.push(token);
            if done {
                break;
            }
        }
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn all_sources_agree(source in any_input()) {
        let chars: Vec<char> = source.chars().collect();
        let from_text = tokenize(&source);
        let from_chars = Tokenizer::from_char_array(&chars, 0, chars.len())
            .unwrap()
            .tokenize()
            .unwrap();
        let from_reader = Tokenizer::from_reader_with_capacity(3, source.as_bytes())
            .tokenize()
            .unwrap();
        prop_assert_eq!(&from_chars, &from_text);
        prop_assert_eq!(&from_reader, &from_text);
    }

    #[test]
    fn css_output_reads_back_to_the_same_tokens(source in css_like()) {
        let tokens = tokenize(&source);
        let css: String = tokens.iter().map(Token::to_css).collect();
        let reparsed = tokenize(&css);
        prop_assert_eq!(significant(&reparsed), significant(&tokens), "css: {:?}", css);
    }

    #[test]
    fn numbers_are_integers_exactly_without_fraction_or_exponent(
        digits in "[1-9][0-9]{0,9}",
        fraction in prop::option::of("[0-9]{1,3}"),
        exponent in prop::option::of(0u32..5),
    ) {
        let mut literal = digits.clone();
        if let Some(f) = &fraction {
            literal.push('.');
            literal.push_str(f);
        }
        if let Some(e) = exponent {
            literal.push_str(&format!("e{e}"));
        }
        let tokens = tokenize(&literal);
        prop_assert_eq!(tokens[0].kind, TokenKind::Number);
        let number = tokens[0].number.unwrap();
        prop_assert_eq!(number.is_integer(), fraction.is_none() && exponent.is_none());
        let expected: f64 = literal.parse().unwrap();
        prop_assert_eq!(number.as_f64(), expected);
    }
}
