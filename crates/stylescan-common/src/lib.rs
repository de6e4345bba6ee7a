pub mod config;
pub mod errors;
pub mod span;

pub use config::{ConfigError, MalformedPolicy, OutputFormat, StylescanConfig};
pub use errors::{Diagnostic, DiagnosticBag, Severity};
pub use span::Span;
