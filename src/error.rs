//! Error types for definition files and template bodies

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// A failure to parse a definition file or a snippet body.
///
/// Both variants carry the file name and the 1-based line the problem was
/// found on, plus the byte span inside the definition file so the error can
/// be rendered with context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("{file}:{line}: {message}")]
    Syntax {
        file: String,
        line: usize,
        span: Span,
        message: String,
    },

    /// Malformed `${...}` form inside a snippet body
    #[error("{file}:{line}: invalid tabstop: {message}")]
    InvalidTabstop {
        file: String,
        line: usize,
        span: Span,
        message: String,
    },
}

impl ParseError {
    pub fn syntax(file: &str, line: usize, span: Span, message: impl Into<String>) -> Self {
        Self::Syntax {
            file: file.to_string(),
            line,
            span,
            message: message.into(),
        }
    }

    pub fn invalid_tabstop(file: &str, line: usize, span: Span, message: impl Into<String>) -> Self {
        Self::InvalidTabstop {
            file: file.to_string(),
            line,
            span,
            message: message.into(),
        }
    }

    pub fn file(&self) -> &str {
        match self {
            Self::Syntax { file, .. } | Self::InvalidTabstop { file, .. } => file,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Self::Syntax { line, .. } | Self::InvalidTabstop { line, .. } => *line,
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            Self::Syntax { span, .. } | Self::InvalidTabstop { span, .. } => span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Syntax { message, .. } | Self::InvalidTabstop { message, .. } => message,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str) -> String {
        let filename = self.file();
        let span = self.span().clone();
        let label = match self {
            Self::Syntax { message, .. } => message.clone(),
            Self::InvalidTabstop { message, .. } => format!("invalid tabstop: {}", message),
        };

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(&label)
            .with_label(
                Label::new((filename, span))
                    .with_message(label.clone())
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

/// 1-based line number of a byte offset
pub(crate) fn line_of(source: &str, offset: usize) -> usize {
    let offset = offset.min(source.len());
    source.as_bytes()[..offset]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}
