//! Lexer for snippet bodies using logos

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    /// Backslash followed by any character
    #[regex(r"\\(.|\n)", |lex| lex.slice()[1..].chars().next())]
    Escape(char),

    /// Trailing backslash with nothing left to escape
    #[token("\\")]
    Backslash,

    /// Bare tab-stop, `$1`
    #[regex(r"\$[0-9]+", |lex| lex.slice()[1..].to_string())]
    Tabstop(String),

    #[token("${")]
    PlaceholderOpen,

    /// `$` not starting a tab-stop
    #[token("$")]
    Dollar,

    #[token("`")]
    Backtick,

    #[token("}")]
    BraceClose,

    #[token(":")]
    Colon,

    #[token("/")]
    Slash,

    #[regex(r"[^\\$`}:/]+", |lex| lex.slice().to_string())]
    Text(String),
}

/// Lex input string into tokens with spans
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input)
        .spanned()
        .filter_map(|(tok, span)| tok.ok().map(|t| (t, span)))
}
