//! Tokenizing whole style sheets through the public API.

use pretty_assertions::assert_eq;
use stylescan_lexer::{Token, TokenKind, Tokenizer};

const SHEET: &str = r#"@import url("theme.css");
:root { --accent: #0af; }
/* buttons */
a.button:hover > span[data-x~="y"] {
  margin: -0.5em auto 10%;
  font: 12px/1.5 "Helvetica Neue", sans-serif;
  width: calc(100% - 2px);
}
"#;

/// Compact rendering: delimiters as themselves, other tokens as kind plus payload.
fn render(token: &Token) -> String {
    match (token.kind, token.number) {
        (TokenKind::Delim(c), _) => c.to_string(),
        (kind, Some(number)) => format!("{kind:?} {number}{}", token.text()),
        (kind, None) if token.text.is_some() => format!("{kind:?} {}", token.text()),
        (kind, None) => format!("{kind:?}"),
    }
}

fn significant(source: &str) -> Vec<Token> {
    let mut tokenizer = Tokenizer::from_text(source);
    let mut tokens = Vec::new();
    loop {
        let token = tokenizer.next().unwrap();
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return tokens;
        }
    }
}

#[test]
fn significant_tokens_of_style_sheet() {
    let rendered: Vec<String> = significant(SHEET).iter().map(render).collect();
    let expected = [
        "AtKeyword import",
        "Url theme.css",
        ";",
        ":",
        "Ident root",
        "{",
        "Ident --accent",
        ":",
        "Hash 0af",
        ";",
        "}",
        "Ident a",
        ".",
        "Ident button",
        ":",
        "Ident hover",
        ">",
        "Ident span",
        "[",
        "Ident data-x",
        "IncludeMatch ~=",
        "String y",
        "]",
        "{",
        "Ident margin",
        ":",
        "Dimension -0.5em",
        "Ident auto",
        "Percentage 10%",
        ";",
        "Ident font",
        ":",
        "Dimension 12px",
        "/",
        "Number 1.5",
        "String Helvetica Neue",
        ",",
        "Ident sans-serif",
        ";",
        "Ident width",
        ":",
        "Function calc",
        "Percentage 100%",
        "-",
        "Dimension 2px",
        ")",
        ";",
        "}",
        "Eof",
    ];
    assert_eq!(rendered, expected);
}

#[test]
fn lines_track_source() {
    let tokens = significant(SHEET);
    let line_of = |text: &str| {
        tokens
            .iter()
            .find(|t| t.text.as_deref() == Some(text))
            .map(|t| t.line)
    };
    assert_eq!(line_of("import"), Some(1));
    assert_eq!(line_of("root"), Some(2));
    assert_eq!(line_of("button"), Some(4));
    assert_eq!(line_of("width"), Some(7));
    assert_eq!(tokens.last().map(|t| t.line), Some(9));
}

#[test]
fn comments_visible_without_skipping() {
    let tokens = Tokenizer::from_text(SHEET).tokenize().unwrap();
    let comment = tokens
        .iter()
        .find(|t| t.kind == TokenKind::Comment)
        .unwrap();
    assert_eq!(comment.text(), " buttons ");
    assert_eq!(comment.line, 3);
}

#[test]
fn spans_cover_input_without_gaps() {
    let tokens = Tokenizer::from_text(SHEET).tokenize().unwrap();
    let mut end = 0;
    for token in &tokens {
        assert_eq!(token.span.start, end, "gap before {token}");
        end = token.span.end;
    }
    assert_eq!(end as usize, SHEET.chars().count());
}

#[test]
fn sources_agree_on_crlf_input() {
    let source = SHEET.replace('\n', "\r\n");
    let chars: Vec<char> = source.chars().collect();

    let from_text = Tokenizer::from_text(&source).tokenize().unwrap();
    let from_chars = Tokenizer::from_char_array(&chars, 0, chars.len())
        .unwrap()
        .tokenize()
        .unwrap();
    let from_reader = Tokenizer::from_reader(source.as_bytes()).tokenize().unwrap();

    assert_eq!(from_chars, from_text);
    assert_eq!(from_reader, from_text);
    // CR-LF counts as one character, so spans match the LF-only sheet.
    assert_eq!(from_text, Tokenizer::from_text(SHEET).tokenize().unwrap());
}

#[test]
fn css_output_tokenizes_back() {
    let tokens = Tokenizer::from_text(SHEET).tokenize().unwrap();
    let css: String = tokens.iter().map(Token::to_css).collect();
    let reparsed = Tokenizer::from_text(&css).tokenize().unwrap();

    let render_all = |tokens: &[Token]| tokens.iter().map(render).collect::<Vec<_>>();
    assert_eq!(render_all(&reparsed), render_all(&tokens));
}

/// Significant tokens of `source` after a trip through `to_css`, next to
/// those of `source` itself.
fn css_round_trip(source: &str) -> (Vec<String>, Vec<String>) {
    let css: String = Tokenizer::from_text(source)
        .tokenize()
        .unwrap()
        .iter()
        .map(Token::to_css)
        .collect();
    let render_all = |text: &str| significant(text).iter().map(render).collect::<Vec<_>>();
    (render_all(&css), render_all(source))
}

#[test]
fn explicit_sign_and_leading_dot_survive_css_output() {
    for source in ["li:nth-child(2n+1)", "1..5", "a.5", "1-0", "+.5em"] {
        let (reparsed, original) = css_round_trip(source);
        assert_eq!(reparsed, original, "source: {source:?}");
    }
}

#[test]
fn malformed_urls_survive_css_output() {
    for source in ["url(\"a b", "url(a b)", "url(a\"b)", "url(\"a\" b)", "url(a\\\n)", "url(\"a\n)"] {
        let (reparsed, original) = css_round_trip(source);
        assert_eq!(reparsed, original, "source: {source:?}");
    }
}

#[test]
fn escaped_double_dash_survives_css_output() {
    for source in ["-\\- x", "\\-->", "@-\\-;"] {
        let (reparsed, original) = css_round_trip(source);
        assert_eq!(reparsed, original, "source: {source:?}");
    }
}

#[test]
fn malformed_sheet_keeps_going() {
    let source = "a { content: \"open\n  color: red; }\nb { background: url(x y) }";
    let kinds: Vec<TokenKind> = significant(source).iter().map(|t| t.kind).collect();
    assert!(kinds.contains(&TokenKind::BadString));
    assert!(kinds.contains(&TokenKind::BadUrl));
    assert_eq!(kinds.last(), Some(&TokenKind::Eof));
    assert_eq!(
        kinds.iter().filter(|k| **k == TokenKind::Delim('}')).count(),
        2
    );
}
