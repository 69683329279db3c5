//! Line-oriented parser for snippet definition files
//!
//! A definition file is a sequence of top-level statements:
//!
//! ```text
//! # comment
//! priority -50
//! extends c, cpp
//!
//! global !p
//! def fmt(x): return x.upper()
//! endglobal
//!
//! pre_expand "snip.buffer[snip.line] = ''"
//! snippet main "entry point" b
//! int main() {
//! 	${0}
//! }
//! endsnippet
//! ```
//!
//! Snippet and global bodies are kept as raw text; bodies are parsed lazily
//! when a snippet is first expanded.

use crate::error::ParseError;
use crate::parser::ast::SourceLocation;
use crate::template::Snippet;

/// One top-level statement of a definition file
#[derive(Debug, Clone)]
pub enum Statement {
    Priority(i64),
    Extends(Vec<String>),
    Global(Global),
    Snippet(Snippet),
    Action(Action),
}

/// A `global` block that seeds the shared state of a filetype scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Global {
    pub tag: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    PreExpand,
    PostExpand,
    PostJump,
}

impl ActionKind {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::PreExpand => "pre_expand",
            Self::PostExpand => "post_expand",
            Self::PostJump => "post_jump",
        }
    }

    fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "pre_expand" => Some(Self::PreExpand),
            "post_expand" => Some(Self::PostExpand),
            "post_jump" => Some(Self::PostJump),
            _ => None,
        }
    }
}

/// Script attached to the snippet that follows it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub kind: ActionKind,
    pub code: String,
}

/// Parse a whole definition file
pub fn parse_document(source: &str, filename: &str) -> Result<Vec<Statement>, ParseError> {
    DocumentParser::new(source, filename).parse()
}

struct Line<'a> {
    offset: usize,
    text: &'a str,
}

struct DocumentParser<'a> {
    filename: &'a str,
    source: &'a str,
    lines: Vec<Line<'a>>,
    statements: Vec<Statement>,
}

impl<'a> DocumentParser<'a> {
    fn new(source: &'a str, filename: &'a str) -> Self {
        let mut lines = Vec::new();
        let mut offset = 0;
        for raw in source.split('\n') {
            lines.push(Line {
                offset,
                text: raw.strip_suffix('\r').unwrap_or(raw),
            });
            offset += raw.len() + 1;
        }
        Self {
            filename,
            source,
            lines,
            statements: Vec::new(),
        }
    }

    fn error(&self, i: usize, message: impl Into<String>) -> ParseError {
        let line = &self.lines[i];
        ParseError::syntax(
            self.filename,
            i + 1,
            line.offset..line.offset + line.text.len(),
            message,
        )
    }

    fn parse(mut self) -> Result<Vec<Statement>, ParseError> {
        let mut i = 0;
        while i < self.lines.len() {
            let stripped = self.lines[i].text.trim();
            if stripped.is_empty() || stripped.starts_with('#') {
                i += 1;
                continue;
            }

            let keyword = stripped.split_whitespace().next().unwrap_or_default();
            i = match keyword {
                "priority" => self.priority(i)?,
                "extends" => self.extends(i)?,
                "global" => self.global(i)?,
                "snippet" => self.snippet(i)?,
                word => match ActionKind::from_keyword(word) {
                    Some(kind) => self.action(i, kind)?,
                    None => return Err(self.error(i, "unknown syntax")),
                },
            };
        }
        Ok(self.statements)
    }

    fn priority(&mut self, i: usize) -> Result<usize, ParseError> {
        let text = self.lines[i].text.trim();
        let value = text
            .split_whitespace()
            .nth(1)
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or_else(|| self.error(i, format!("invalid priority `{}`", text)))?;
        self.statements.push(Statement::Priority(value));
        Ok(i + 1)
    }

    fn extends(&mut self, i: usize) -> Result<usize, ParseError> {
        let text = self.lines[i].text.trim();
        let types: Vec<String> = text
            .split_once(char::is_whitespace)
            .map(|(_, rest)| rest)
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();
        if types.is_empty() {
            return Err(self.error(i, "invalid extends"));
        }
        self.statements.push(Statement::Extends(types));
        Ok(i + 1)
    }

    fn global(&mut self, i: usize) -> Result<usize, ParseError> {
        let parts: Vec<&str> = self.lines[i].text.split_whitespace().collect();
        let tag = match parts.as_slice() {
            [_, tag] => tag.to_string(),
            _ => "unknown".to_string(),
        };
        let (body, next) = self
            .block(i, "endglobal")
            .ok_or_else(|| self.error(i, "no endglobal found"))?;
        self.statements.push(Statement::Global(Global { tag, body }));
        Ok(next)
    }

    fn snippet(&mut self, i: usize) -> Result<usize, ParseError> {
        let (trigger, description, options) = self.header(i)?;
        let (body, next) = self
            .block(i, "endsnippet")
            .ok_or_else(|| self.error(i, "no endsnippet found"))?;

        let offset = self
            .lines
            .get(i + 1)
            .map_or(self.source.len(), |line| line.offset);
        let location = SourceLocation::new(self.filename, i + 2, offset);
        let snippet = Snippet::new(trigger, description, options, body).with_location(location);
        self.statements.push(Statement::Snippet(snippet));
        Ok(next)
    }

    fn action(&mut self, i: usize, kind: ActionKind) -> Result<usize, ParseError> {
        let invalid = || self.error(i, format!("invalid {} definition", kind.keyword()));
        let content = self.lines[i]
            .text
            .trim()
            .split_once(char::is_whitespace)
            .map(|(_, rest)| rest.trim())
            .ok_or_else(invalid)?;
        let code = content
            .strip_prefix('"')
            .and_then(|c| c.strip_suffix('"'))
            .ok_or_else(invalid)?;
        self.statements.push(Statement::Action(Action {
            kind,
            code: code.to_string(),
        }));
        Ok(i + 1)
    }

    /// Collect the lines after `i` up to a terminator, returning the joined
    /// body and the index of the line after the terminator
    fn block(&self, i: usize, terminator: &str) -> Option<(String, usize)> {
        let end = (i + 1..self.lines.len())
            .find(|&j| self.lines[j].text.trim_end().starts_with(terminator))?;
        let body = self.lines[i + 1..end]
            .iter()
            .map(|line| line.text)
            .collect::<Vec<_>>()
            .join("\n");
        Some((body, end + 1))
    }

    /// Split a `snippet` header into trigger, description and options
    fn header(&self, i: usize) -> Result<(String, String, String), ParseError> {
        let text = self.lines[i].text.trim();
        let mut options = "";

        let (trigger, description) = if text.ends_with('"') {
            split_description(text, text)
        } else {
            let (remain, opt) = text
                .rsplit_once(char::is_whitespace)
                .map(|(remain, opt)| (remain.trim_end(), opt))
                .ok_or_else(|| self.error(i, "invalid snippet definition"))?;
            if remain.ends_with('"') {
                let (trigger, description) = split_description(text, remain);
                if !description.is_empty() {
                    options = opt;
                }
                (trigger, description)
            } else {
                (&text[KEYWORD_LEN..], "")
            }
        };

        let mut trigger = trigger.trim();
        if trigger.split_whitespace().count() > 1 || options.contains('r') {
            let first = trigger.chars().next();
            let last = trigger.chars().next_back();
            if first != last {
                return Err(self.error(
                    i,
                    format!("invalid snippet trigger definition `{}`", trigger),
                ));
            }
            // strip the surrounding quote characters
            trigger = match first {
                Some(q) if trigger.len() >= 2 * q.len_utf8() => {
                    &trigger[q.len_utf8()..trigger.len() - q.len_utf8()]
                }
                _ => "",
            };
        }

        if trigger.is_empty() {
            return Err(self.error(i, "snippet no trigger defined"));
        }

        Ok((
            trigger.to_string(),
            description.to_string(),
            options.to_string(),
        ))
    }
}

const KEYWORD_LEN: usize = "snippet".len();

/// Find a trailing quoted description in `remain` (which ends with a quote).
///
/// The description's opening quote must follow whitespace and something
/// must precede it; otherwise the whole header after the keyword is the
/// trigger.
fn split_description<'t>(text: &'t str, remain: &'t str) -> (&'t str, &'t str) {
    let fallback = (&text[KEYWORD_LEN..], "");
    let closing = remain.len() - 1;
    let Some(index) = remain[..closing].rfind('"') else {
        return fallback;
    };
    if index == 0 || !matches!(remain.as_bytes()[index - 1], b' ' | b'\t') {
        return fallback;
    }
    match remain.get(KEYWORD_LEN..index).map(str::trim) {
        Some(trigger) if !trigger.is_empty() => (trigger, &remain[index + 1..closing]),
        _ => fallback,
    }
}
