use crate::span::Span;

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// A diagnostic about the tokenized input, anchored at a token span.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Option<Span>,
    /// 1-based line of the span start, when known.
    pub line: Option<u32>,
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            span: None,
            line: None,
            suggestion: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        match (self.line, self.span) {
            (Some(line), Some(span)) => write!(f, "\n  --> line {line}, chars {span}")?,
            (Some(line), None) => write!(f, "\n  --> line {line}")?,
            (None, Some(span)) => write!(f, "\n  --> chars {span}")?,
            (None, None) => {}
        }
        Ok(())
    }
}

/// Collector for diagnostics produced while scanning one input.
#[derive(Debug, Default)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bag_counts_errors_only() {
        let mut bag = DiagnosticBag::new();
        bag.report(Diagnostic::warning("unterminated comment"));
        assert!(!bag.has_errors());
        bag.report(Diagnostic::error("unterminated string").with_span(Span::new(0, 4)));
        assert!(bag.has_errors());
        assert_eq!(bag.error_count(), 1);
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn display_with_location() {
        let diag = Diagnostic::error("unterminated string")
            .with_span(Span::new(4, 9))
            .with_line(2);
        assert_eq!(
            diag.to_string(),
            "error: unterminated string\n  --> line 2, chars 4..9"
        );
    }

    #[test]
    fn display_without_location() {
        let diag = Diagnostic::warning("malformed url");
        assert_eq!(diag.to_string(), "warning: malformed url");
    }
}
