use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{Parser, ValueEnum};
use tracing::debug;

use stylescan_common::config::{self, ConfigError};
use stylescan_common::{Diagnostic, DiagnosticBag, MalformedPolicy, OutputFormat, StylescanConfig};
use stylescan_lexer::{report_malformed, CharSource, LexError, Token, TokenKind, Tokenizer};

/// CSS tokenizer.
///
/// Prints the token stream of a style sheet and reports malformed tokens.
#[derive(Parser)]
#[command(
    name = "stylescan",
    version,
    about,
    long_about = "CSS tokenizer.\n\nPrints the token stream of a style sheet and reports unterminated strings,\nmalformed urls and unterminated comments.\n\nExamples:\n  stylescan site.css                One line per significant token\n  stylescan site.css --all          Include whitespace and comments\n  stylescan site.css --format json  One JSON object per token\n  stylescan site.css --check        Report malformed tokens only\n  cat site.css | stylescan          Tokenize standard input"
)]
struct Cli {
    /// Input style sheet; reads standard input when omitted or `-`.
    input: Option<PathBuf>,

    /// Include whitespace, comments, `<!--` and `-->` tokens.
    #[arg(long)]
    all: bool,

    /// Output format (default: from Stylescan.toml, else text).
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Configuration file (default: nearest Stylescan.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Suppress warning output.
    #[arg(short, long)]
    quiet: bool,

    /// Report malformed tokens without printing the token stream.
    #[arg(long)]
    check: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Text,
    Json,
    Css,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Css => OutputFormat::Css,
        }
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let input = cli
        .input
        .as_deref()
        .filter(|path| path.as_os_str() != "-");

    let config = match resolve_config(cli.config.as_deref(), input) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    if let Some(path) = &config.source {
        debug!(path = %path.display(), "loaded configuration");
    }

    let format = cli.format.map_or(config.output.format, OutputFormat::from);
    // CSS output must keep separators to tokenize back.
    let skip = config.tokenizer.skip_insignificant && !cli.all && format != OutputFormat::Css;

    // === Tokenize ===
    let (tokens, source, file_name) = match input {
        Some(path) => {
            let source = match fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("error: could not read '{}': {}", path.display(), e);
                    process::exit(1);
                }
            };
            let file_name = path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            let tokens = collect_tokens(Tokenizer::from_text(&source), skip);
            (tokens, Some(source), file_name)
        }
        None => {
            let stdin = io::stdin().lock();
            let tokenizer =
                Tokenizer::from_reader_with_capacity(config.tokenizer.reader_buffer_size, stdin);
            (collect_tokens(tokenizer, skip), None, "<stdin>".to_string())
        }
    };
    let tokens = match tokens {
        Ok(tokens) => tokens,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    if !cli.check {
        if let Err(e) = emit_tokens(&tokens, format) {
            // A closed pipe ends output quietly.
            if e.kind() != io::ErrorKind::BrokenPipe {
                eprintln!("error: could not write tokens: {}", e);
                process::exit(1);
            }
        }
    }

    // === Diagnostics ===
    let diags = diagnose(&tokens, config.diagnostics.malformed);
    let display_source = source.as_deref().map(normalize_for_display);
    for diag in diags.diagnostics() {
        if diag.is_error() || !cli.quiet {
            print_diagnostic(diag, display_source.as_deref(), &file_name);
        }
    }

    if diags.has_errors() {
        process::exit(1);
    }
    if cli.check {
        println!("No errors found.");
    }
}

/// Malformed-token diagnostics under `policy`; `Ignore` yields an empty bag.
fn diagnose(tokens: &[Token], policy: MalformedPolicy) -> DiagnosticBag {
    match policy.severity() {
        Some(severity) => report_malformed(tokens, severity),
        None => DiagnosticBag::new(),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(EnvFilter::from_default_env())
            .init();
    }
}

/// An explicit `--config` must load. Otherwise the nearest Stylescan.toml
/// above the input (or the working directory for stdin) is used if present.
fn resolve_config(
    explicit: Option<&Path>,
    input: Option<&Path>,
) -> Result<StylescanConfig, ConfigError> {
    if let Some(path) = explicit {
        return config::load_config(path);
    }
    let found = match input {
        Some(path) => {
            let abs = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
            config::find_and_load_config(&abs)
        }
        None => {
            let cwd = std::env::current_dir().map_err(ConfigError::ReadError)?;
            match config::find_config(&cwd) {
                Some(path) => config::load_config(&path),
                None => Err(ConfigError::NotFound(cwd.display().to_string())),
            }
        }
    };
    match found {
        Err(ConfigError::NotFound(_)) => Ok(StylescanConfig::default()),
        other => other,
    }
}

fn collect_tokens<S: CharSource>(
    mut tokenizer: Tokenizer<S>,
    skip_insignificant: bool,
) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    loop {
        let token = if skip_insignificant {
            tokenizer.next()?
        } else {
            tokenizer.next_no_skip()?
        };
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

fn emit_tokens(tokens: &[Token], format: OutputFormat) -> io::Result<()> {
    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Text => {
            for token in tokens {
                writeln!(
                    out,
                    "{:>4} {:<11} {}",
                    token.line,
                    token.span.to_string(),
                    token
                )?;
            }
        }
        OutputFormat::Json => {
            for token in tokens {
                serde_json::to_writer(&mut out, token)?;
                writeln!(out)?;
            }
        }
        OutputFormat::Css => {
            for token in tokens {
                write!(out, "{}", token.to_css())?;
            }
        }
    }
    out.flush()
}

/// Apply the tokenizer's input preprocessing so that token spans index the
/// rendered source one character per offset.
fn normalize_for_display(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                chars.next_if_eq(&'\n');
                out.push('\n');
            }
            '\u{c}' => out.push('\n'),
            '\0' => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    out
}

fn print_diagnostic(diag: &Diagnostic, source: Option<&str>, file_name: &str) {
    let (Some(span), Some(source)) = (diag.span, source) else {
        eprintln!("{}", diag);
        if let Some(ref suggestion) = diag.suggestion {
            eprintln!("   = help: {}", suggestion);
        }
        eprintln!();
        return;
    };

    let kind = if diag.is_error() {
        ReportKind::Error
    } else {
        ReportKind::Warning
    };
    let color = if diag.is_error() {
        Color::Red
    } else {
        Color::Yellow
    };
    // An empty span still gets a one-character label.
    let mut range = span.range();
    if span.is_empty() {
        range.end = range.start + 1;
    }

    let mut report = Report::build(kind, file_name, range.start)
        .with_message(&diag.message)
        .with_label(
            Label::new((file_name, range))
                .with_message(&diag.message)
                .with_color(color),
        );
    if let Some(ref suggestion) = diag.suggestion {
        report = report.with_help(suggestion);
    }

    if let Err(e) = report
        .finish()
        .eprint((file_name, Source::from(source)))
    {
        debug!(error = %e, "falling back to plain diagnostic output");
        eprintln!("{}", diag);
    }
}
