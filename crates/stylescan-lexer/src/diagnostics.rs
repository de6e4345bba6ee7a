use stylescan_common::{Diagnostic, DiagnosticBag, Severity};

use crate::lexer::{Token, TokenKind};

/// Report every malformed token in `tokens` at `severity`.
///
/// Tokenizing never fails on bad input; this turns the `BadString`,
/// `BadUrl` and `BadComment` tokens it degrades to into diagnostics
/// anchored at their span.
pub fn report_malformed(tokens: &[Token], severity: Severity) -> DiagnosticBag {
    let mut bag = DiagnosticBag::new();
    for token in tokens {
        let (message, suggestion) = match token.kind {
            TokenKind::BadString => (
                "unterminated string",
                "close the string before the line break, or escape the newline with `\\`",
            ),
            TokenKind::BadUrl => (
                "malformed url",
                "quote the url, or escape spaces, quotes and parentheses with `\\`",
            ),
            TokenKind::BadComment => ("unterminated comment", "close the comment with `*/`"),
            _ => continue,
        };
        bag.report(
            Diagnostic::new(severity, message)
                .with_span(token.span)
                .with_line(token.line)
                .with_suggestion(suggestion),
        );
    }
    bag
}
