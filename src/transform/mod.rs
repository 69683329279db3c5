//! Regex transformations bound to a placeholder, `${1/regex/replacement/flags}`

mod replacement;

pub use replacement::{CaseDirective, Piece, Replacement};

use regex::{Regex, RegexBuilder};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("unknown transformation flag '{0}'")]
    UnknownFlag(char),

    #[error("invalid transformation regex: {0}")]
    InvalidRegex(String),
}

/// A regex substitution view over the canonical value of a placeholder
#[derive(Debug, Clone)]
pub struct Transformation {
    /// Placeholder number this transformation mirrors
    pub number: u32,
    pub global: bool,
    pattern: String,
    flags: String,
    regex: Regex,
    replacement: Replacement,
}

impl Transformation {
    /// Compile a transformation. `pattern` must already have its escaped
    /// slashes resolved; `template` is the raw replacement field.
    pub fn new(
        number: u32,
        pattern: &str,
        template: &str,
        flags: &str,
    ) -> Result<Self, TransformError> {
        let mut builder = RegexBuilder::new(pattern);
        let mut global = false;
        for flag in flags.chars() {
            match flag {
                'g' => global = true,
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'a' => {
                    builder.unicode(false);
                }
                other => return Err(TransformError::UnknownFlag(other)),
            }
        }
        let regex = builder
            .build()
            .map_err(|e| TransformError::InvalidRegex(e.to_string()))?;

        Ok(Self {
            number,
            global,
            pattern: pattern.to_string(),
            flags: flags.to_string(),
            regex,
            replacement: Replacement::parse(template),
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn flags(&self) -> &str {
        &self.flags
    }

    pub fn replacement(&self) -> &Replacement {
        &self.replacement
    }

    /// Apply to the current value of the mirrored placeholder.
    ///
    /// Only the expanded replacements are kept; text outside the matches is
    /// dropped, and no match at all yields an empty string.
    pub fn apply(&self, text: &str) -> String {
        if self.global {
            self.regex
                .captures_iter(text)
                .map(|caps| self.replacement.expand(&caps))
                .collect()
        } else {
            self.regex
                .captures(text)
                .map(|caps| self.replacement.expand(&caps))
                .unwrap_or_default()
        }
    }
}
