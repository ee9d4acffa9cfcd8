//! Turns the `[log]` section into a `tracing` subscriber.
//!
//! The section keeps the familiar `%(key)s` pattern syntax so an existing
//! settings file carries over unchanged:
//!
//! ```toml
//! [log]
//! format = "%(asctime)s %(levelname)s [%(funcName)s]: %(message)s"
//! datefmt = "%I:%M%p %Ss"
//! level = "INFO"
//! ```
//!
//! Supported placeholders:
//!
//! | Placeholder      | Rendered as                                        |
//! |------------------|----------------------------------------------------|
//! | `asctime`        | local time formatted with `datefmt` (strftime)     |
//! | `levelname`      | `TRACE`, `DEBUG`, `INFO`, `WARNING`, `ERROR`       |
//! | `name`           | event target                                       |
//! | `module`         | module path, falling back to the target            |
//! | `funcName`       | innermost span name, falling back to the target    |
//! | `message`        | the event message and its fields                   |
//! | `pathname`       | source file                                        |
//! | `filename`       | last component of the source file                  |
//! | `lineno`         | source line                                        |
//! | `threadName`     | name of the emitting thread                        |
//!
//! A width can be given as in `%(levelname)-8s` (left-aligned) or
//! `%(lineno)4d` (right-aligned), up to [`MAX_FIELD_WIDTH`] columns. `%%` is a
//! literal percent sign.
//!
//! `RUST_LOG`, when set, takes precedence over `level`.

use std::fmt::{self, Write as _};
use std::path::Path;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, TimeZone};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use crate::error::ConfigError;
use crate::settings::LogSettings;

/// Maps a level name to a filter. Case-insensitive; `WARNING`/`WARN`,
/// `CRITICAL`/`FATAL` (→ error) and `NOTSET` (→ trace) are accepted.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] for any other name.
pub fn parse_level(name: &str) -> Result<LevelFilter, ConfigError> {
    match name.trim().to_ascii_uppercase().as_str() {
        "NOTSET" | "TRACE" => Ok(LevelFilter::TRACE),
        "DEBUG" => Ok(LevelFilter::DEBUG),
        "INFO" => Ok(LevelFilter::INFO),
        "WARN" | "WARNING" => Ok(LevelFilter::WARN),
        "ERROR" | "CRITICAL" | "FATAL" => Ok(LevelFilter::ERROR),
        "OFF" => Ok(LevelFilter::OFF),
        _ => Err(ConfigError::Invalid {
            key: "log.level".to_string(),
            reason: format!("unknown level '{name}'"),
        }),
    }
}

/// Rejects strftime patterns chrono cannot render.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] for `log.datefmt`.
pub fn check_datefmt(datefmt: &str) -> Result<(), ConfigError> {
    if StrftimeItems::new(datefmt).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigError::Invalid {
            key: "log.datefmt".to_string(),
            reason: format!("'{datefmt}' is not a valid strftime pattern"),
        });
    }
    Ok(())
}

/// Formats `when` with a strftime pattern already accepted by [`check_datefmt`].
pub fn format_timestamp<Tz>(datefmt: &str, when: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut out = String::new();
    // An unrenderable item yields fmt::Error here instead of a panic.
    if write!(out, "{}", when.format(datefmt)).is_err() {
        out.clear();
    }
    out
}

// ── Pattern ───────────────────────────────────────────────────────────────────

/// Largest padding width a placeholder may request.
pub const MAX_FIELD_WIDTH: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    AscTime,
    LevelName,
    Name,
    Module,
    FuncName,
    Message,
    PathName,
    FileName,
    LineNo,
    ThreadName,
}

impl Field {
    fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "asctime" => Self::AscTime,
            "levelname" => Self::LevelName,
            "name" => Self::Name,
            "module" => Self::Module,
            "funcName" => Self::FuncName,
            "message" => Self::Message,
            "pathname" => Self::PathName,
            "filename" => Self::FileName,
            "lineno" => Self::LineNo,
            "threadName" => Self::ThreadName,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Field {
        field: Field,
        width: usize,
        left_align: bool,
    },
}

/// A parsed `log.format` pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPattern {
    tokens: Vec<Token>,
}

impl LogPattern {
    /// Parses a `%(key)s` pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidLogFormat`] for an unknown key, an
    /// unterminated placeholder or a stray `%`.
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }
            match chars.next() {
                Some('%') => literal.push('%'),
                Some('(') => {
                    let mut key = String::new();
                    loop {
                        match chars.next() {
                            Some(')') => break,
                            Some(k) => key.push(k),
                            None => {
                                return Err(ConfigError::InvalidLogFormat(format!(
                                    "unterminated placeholder '%({key}'"
                                )))
                            }
                        }
                    }
                    let field = Field::from_key(&key).ok_or_else(|| {
                        ConfigError::InvalidLogFormat(format!("unsupported placeholder '%({key})'"))
                    })?;

                    let left_align = chars.next_if_eq(&'-').is_some();
                    let mut width = 0usize;
                    while let Some(d) = chars.next_if(char::is_ascii_digit) {
                        width = width
                            .checked_mul(10)
                            .and_then(|w| w.checked_add(d.to_digit(10).unwrap_or(0) as usize))
                            .filter(|w| *w <= MAX_FIELD_WIDTH)
                            .ok_or_else(|| {
                                ConfigError::InvalidLogFormat(format!(
                                    "width of '%({key})' exceeds {MAX_FIELD_WIDTH}"
                                ))
                            })?;
                    }
                    match chars.next() {
                        Some('s' | 'd' | 'r') => {}
                        other => {
                            return Err(ConfigError::InvalidLogFormat(format!(
                                "placeholder '%({key})' needs a conversion (s, d or r), found {other:?}"
                            )))
                        }
                    }

                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    tokens.push(Token::Field {
                        field,
                        width,
                        left_align,
                    });
                }
                _ => {
                    return Err(ConfigError::InvalidLogFormat(format!(
                        "stray '%' in '{pattern}'"
                    )))
                }
            }
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }
        Ok(Self { tokens })
    }

    fn uses(&self, wanted: Field) -> bool {
        self.tokens
            .iter()
            .any(|t| matches!(t, Token::Field { field, .. } if *field == wanted))
    }
}

// ── Event formatter ───────────────────────────────────────────────────────────

/// `FormatEvent` implementation driven by a [`LogPattern`].
#[derive(Debug, Clone)]
pub struct PatternFormatter {
    pattern: LogPattern,
    datefmt: String,
}

impl PatternFormatter {
    /// Builds a formatter from the `[log]` section.
    ///
    /// # Errors
    ///
    /// Returns an error when `format` or `datefmt` cannot be used.
    pub fn from_settings(settings: &LogSettings) -> Result<Self, ConfigError> {
        check_datefmt(&settings.datefmt)?;
        Ok(Self {
            pattern: LogPattern::parse(&settings.format)?,
            datefmt: settings.datefmt.clone(),
        })
    }
}

fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "TRACE",
        Level::DEBUG => "DEBUG",
        Level::INFO => "INFO",
        Level::WARN => "WARNING",
        Level::ERROR => "ERROR",
    }
}

impl<S, N> FormatEvent<S, N> for PatternFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let asctime = if self.pattern.uses(Field::AscTime) {
            format_timestamp(&self.datefmt, &Local::now())
        } else {
            String::new()
        };

        for token in &self.pattern.tokens {
            let (field, width, left_align) = match token {
                Token::Literal(text) => {
                    writer.write_str(text)?;
                    continue;
                }
                Token::Field {
                    field,
                    width,
                    left_align,
                } => (*field, *width, *left_align),
            };

            let mut value = String::new();
            match field {
                Field::AscTime => value.push_str(&asctime),
                Field::LevelName => value.push_str(level_name(meta.level())),
                Field::Name => value.push_str(meta.target()),
                Field::Module => value.push_str(meta.module_path().unwrap_or(meta.target())),
                Field::FuncName => match ctx.lookup_current() {
                    Some(span) => value.push_str(span.name()),
                    None => value.push_str(meta.target()),
                },
                Field::Message => {
                    ctx.field_format()
                        .format_fields(Writer::new(&mut value), event)?;
                }
                Field::PathName => value.push_str(meta.file().unwrap_or("<unknown>")),
                Field::FileName => value.push_str(
                    meta.file()
                        .and_then(|f| Path::new(f).file_name())
                        .and_then(|f| f.to_str())
                        .unwrap_or("<unknown>"),
                ),
                Field::LineNo => match meta.line() {
                    Some(line) => write!(value, "{line}")?,
                    None => value.push('?'),
                },
                Field::ThreadName => {
                    value.push_str(std::thread::current().name().unwrap_or("unnamed"))
                }
            }

            if left_align {
                write!(writer, "{value:<width$}")?;
            } else {
                write!(writer, "{value:>width$}")?;
            }
        }
        writeln!(writer)
    }
}

/// Installs the global subscriber described by `settings`, writing to stderr.
///
/// # Errors
///
/// Returns the validation errors of the section, or
/// [`ConfigError::LoggingInit`] when a global subscriber is already set.
pub fn init_logging(settings: &LogSettings) -> Result<(), ConfigError> {
    let level = parse_level(&settings.level)?;
    let formatter = PatternFormatter::from_settings(settings)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .event_format(formatter)
        .try_init()
        .map_err(|e| ConfigError::LoggingInit(e.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
