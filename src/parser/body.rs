//! Snippet body parser
//!
//! The token stream from the lexer is parsed with chumsky into a tree of
//! [`Item`]s, nested defaults through `recursive`. The tree is then lowered
//! into a [`Body`] arena, children pushed before their parent, so the arena is
//! complete before any registry is derived from it. Tab-stop numbers and
//! transformations are validated while lowering so their errors point at the
//! whole `${...}` form.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::{line_of, ParseError};
use crate::interpolation::Interpolation;
use crate::parser::ast::{Body, Node, NodeId, NodeKind, Placeholder, SourceLocation, Span, VISUAL};
use crate::parser::lexer::{lex, Token};
use crate::transform::Transformation;

/// Parse a snippet body
pub fn parse_body(source: &str, location: &SourceLocation) -> Result<Body, ParseError> {
    let len = source.len();
    let token_iter = lex(source).map(|(tok, span)| (tok, span.into()));
    let token_stream = Stream::from_iter(token_iter).map((len..len).into(), |(t, s): (_, _)| (t, s));

    let mut lowering = Lowering {
        source,
        location,
        nodes: Vec::new(),
    };
    let items = body_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| lowering.syntax_error(errs))?;
    let roots = lowering.sequence(items, 0)?;
    Ok(Body {
        nodes: lowering.nodes,
        roots,
    })
}

/// Parsed body element, before lowering into the arena
#[derive(Debug, Clone)]
enum Item {
    /// A token that stands for literal text
    Literal(Token, Span),
    /// `$N`
    Tabstop(String, Span),
    /// Backtick-delimited code with the tokens between the backticks
    Interpolation(Vec<(Token, Span)>, Span),
    /// `${...}` with the raw number token, if any
    Placeholder {
        number: Option<(String, Span)>,
        tail: Tail,
        span: Span,
    },
}

/// What follows the number inside `${...}`
#[derive(Debug, Clone)]
enum Tail {
    Empty,
    Default(Vec<Item>),
    /// `/regex/replacement/flags`, read back from the source while lowering
    Transformation,
}

fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> Span {
    e.start()..e.end()
}

fn body_parser<'a, I>() -> impl Parser<'a, I, Vec<Item>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let number = select! { Token::Text(s) => s }
        .map_with(|s, e| (s, span_range(&e.span())))
        .or_not();

    // An unterminated interpolation falls through to a literal backtick
    let interpolation = just(Token::Backtick)
        .ignore_then(
            none_of([Token::Backtick])
                .map_with(|tok, e| (tok, span_range(&e.span())))
                .repeated()
                .collect::<Vec<_>>(),
        )
        .then_ignore(just(Token::Backtick))
        .map_with(|pieces, e| Item::Interpolation(pieces, span_range(&e.span())));

    let tabstop = select! { Token::Tabstop(digits) => digits }
        .map_with(|digits, e| Item::Tabstop(digits, span_range(&e.span())));

    let transformation = just(Token::Slash)
        .then(none_of([Token::Slash]).repeated())
        .then(just(Token::Slash))
        .then(none_of([Token::Slash]).repeated())
        .then(just(Token::Slash))
        .then(none_of([Token::BraceClose]).repeated())
        .then(just(Token::BraceClose))
        .to(Tail::Transformation);

    let item = recursive(|item| {
        let default = item
            .repeated()
            .collect::<Vec<_>>()
            .then_ignore(just(Token::BraceClose))
            .map(Tail::Default);

        let tail = choice((
            just(Token::BraceClose).to(Tail::Empty),
            just(Token::Colon).ignore_then(default),
            transformation,
        ));

        let placeholder = just(Token::PlaceholderOpen)
            .ignore_then(number)
            .then(tail)
            .map_with(|(number, tail), e| Item::Placeholder {
                number,
                tail,
                span: span_range(&e.span()),
            });

        choice((
            placeholder,
            interpolation,
            tabstop,
            none_of([Token::PlaceholderOpen, Token::BraceClose])
                .map_with(|tok, e| Item::Literal(tok, span_range(&e.span()))),
        ))
    });

    // `}` only closes a default; at the top level it is text
    item.or(just(Token::BraceClose).map_with(|tok, e| Item::Literal(tok, span_range(&e.span()))))
        .repeated()
        .collect::<Vec<_>>()
        .then_ignore(end())
}

/// Consecutive literal pieces waiting to become one text node
#[derive(Default)]
struct PendingText {
    text: String,
    start: Option<usize>,
    end: usize,
}

impl PendingText {
    fn push(&mut self, s: &str, span: &Span) {
        self.start.get_or_insert(span.start);
        self.end = span.end;
        self.text.push_str(s);
    }
}

struct Lowering<'a> {
    source: &'a str,
    location: &'a SourceLocation,
    nodes: Vec<Node>,
}

impl<'a> Lowering<'a> {
    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn flush(&mut self, pending: &mut PendingText, out: &mut Vec<NodeId>) {
        if let Some(start) = pending.start.take() {
            let text = std::mem::take(&mut pending.text);
            let id = self.push(Node::new(NodeKind::Text, start..pending.end, text));
            out.push(id);
        }
    }

    fn error(&self, span: Span, message: impl Into<String>) -> ParseError {
        ParseError::invalid_tabstop(
            &self.location.file,
            self.location.line + line_of(self.source, span.start) - 1,
            self.location.offset + span.start..self.location.offset + span.end,
            message,
        )
    }

    fn syntax_error(&self, errs: Vec<Rich<'_, Token>>) -> ParseError {
        let Some(err) = errs.into_iter().next() else {
            return self.error(0..self.source.len(), "invalid snippet body");
        };
        let span = span_range(err.span());
        match err.found() {
            None => self.error(span, "unterminated placeholder"),
            Some(_) => {
                let found = self.source.get(span.clone()).unwrap_or_default();
                self.error(span, format!("unexpected `{}` in placeholder", found))
            }
        }
    }

    /// Lower parsed items at `depth` (0 for the top level) into the arena
    fn sequence(&mut self, items: Vec<Item>, depth: usize) -> Result<Vec<NodeId>, ParseError> {
        let mut out = Vec::new();
        let mut pending = PendingText::default();

        for item in items {
            match item {
                Item::Literal(token, span) => {
                    let text = match token {
                        Token::Text(s) => s,
                        Token::Escape('n') => "\\n".to_string(),
                        Token::Escape('t') => "\\t".to_string(),
                        Token::Escape(c) => c.to_string(),
                        _ => self.source[span.clone()].to_string(),
                    };
                    pending.push(&text, &span);
                }
                Item::Tabstop(digits, span) => {
                    self.flush(&mut pending, &mut out);
                    let number = self.number(&digits, &span)?;
                    let node = Node::new(
                        NodeKind::Placeholder(Placeholder {
                            number,
                            default: Vec::new(),
                            transform: None,
                            depth,
                        }),
                        span.clone(),
                        &self.source[span],
                    );
                    out.push(self.push(node));
                }
                Item::Interpolation(pieces, span) => {
                    self.flush(&mut pending, &mut out);
                    let content: String = pieces
                        .iter()
                        .map(|(token, span)| match token {
                            Token::Escape('`') => "`",
                            _ => &self.source[span.clone()],
                        })
                        .collect();
                    let node = Node::new(
                        NodeKind::Interpolation(Interpolation::parse(&content)),
                        span,
                        content,
                    );
                    out.push(self.push(node));
                }
                Item::Placeholder { number, tail, span } => {
                    self.flush(&mut pending, &mut out);
                    let id = self.placeholder(number, tail, span, depth)?;
                    out.push(id);
                }
            }
        }

        self.flush(&mut pending, &mut out);
        Ok(out)
    }

    fn number(&self, digits: &str, span: &Span) -> Result<u32, ParseError> {
        match digits.parse::<u32>() {
            Ok(n) if n != VISUAL => Ok(n),
            _ => Err(self.error(span.clone(), format!("tabstop number {} is too large", digits))),
        }
    }

    fn placeholder(
        &mut self,
        number: Option<(String, Span)>,
        tail: Tail,
        span: Span,
        depth: usize,
    ) -> Result<NodeId, ParseError> {
        let (number, number_span) = match number {
            Some((s, number_span)) if s == "VISUAL" => (VISUAL, number_span),
            Some((s, number_span)) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
                (self.number(&s, &number_span)?, number_span)
            }
            _ => return Err(self.error(span, "expected a tabstop number or VISUAL")),
        };

        let (default, transform) = match tail {
            Tail::Empty => (Vec::new(), None),
            Tail::Default(items) => (self.sequence(items, depth + 1)?, None),
            Tail::Transformation => {
                let transform = self.transformation(number, number_span.end + 1, &span)?;
                (Vec::new(), Some(transform))
            }
        };

        let node = Node::new(
            NodeKind::Placeholder(Placeholder {
                number,
                default,
                transform,
                depth,
            }),
            span.clone(),
            &self.source[span],
        );
        Ok(self.push(node))
    }

    /// Read `regex/replacement/flags}` back from the source, starting right
    /// after the first slash
    fn transformation(&self, number: u32, from: usize, span: &Span) -> Result<Transformation, ParseError> {
        let unterminated = || self.error(span.clone(), "unterminated transformation");

        let (pattern, after_pattern) = scan_field(self.source, from, '/', true).ok_or_else(unterminated)?;
        let (replacement, after_replacement) =
            scan_field(self.source, after_pattern, '/', false).ok_or_else(unterminated)?;
        let flags = self
            .source
            .get(after_replacement..span.end - 1)
            .ok_or_else(unterminated)?;

        Transformation::new(number, &pattern, &replacement, flags)
            .map_err(|e| self.error(span.clone(), e.to_string()))
    }
}

/// Read up to an unescaped `delim`, returning the field and the offset after
/// the delimiter. With `unescape_delim`, `\<delim>` becomes `<delim>`; every
/// other escape is kept as written.
fn scan_field(source: &str, from: usize, delim: char, unescape_delim: bool) -> Option<(String, usize)> {
    let mut field = String::new();
    let mut chars = source[from..].char_indices();
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some((_, next)) if next == delim && unescape_delim => field.push(next),
                Some((_, next)) => {
                    field.push('\\');
                    field.push(next);
                }
                None => field.push('\\'),
            }
        } else if c == delim {
            return Some((field, from + i + c.len_utf8()));
        } else {
            field.push(c);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Body {
        parse_body(source, &SourceLocation::default()).unwrap()
    }

    fn describe(body: &Body, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|&id| {
                let node = body.node(id);
                match &node.kind {
                    NodeKind::Text => format!("text {:?}", node.literal),
                    NodeKind::Interpolation(i) => format!("{} {:?}", i.kind(), i.code()),
                    NodeKind::Placeholder(p) => {
                        let number = if p.is_visual() {
                            "VISUAL".to_string()
                        } else {
                            p.number.to_string()
                        };
                        if p.transform.is_some() {
                            format!("transform {}", number)
                        } else {
                            format!("ph {} [{}]", number, describe(body, &p.default).join(", "))
                        }
                    }
                }
            })
            .collect()
    }

    #[test]
    fn test_plain_text_is_one_node() {
        let body = parse("Indent is: here");
        assert_eq!(describe(&body, &body.roots), vec![r#"text "Indent is: here""#]);
    }

    #[test]
    fn test_bare_and_braced_tabstops() {
        let body = parse("a $1 ${2} ${3:x}");
        assert_eq!(
            describe(&body, &body.roots),
            vec![
                r#"text "a ""#,
                "ph 1 []",
                r#"text " ""#,
                "ph 2 []",
                r#"text " ""#,
                r#"ph 3 [text "x"]"#,
            ]
        );
    }

    #[test]
    fn test_nested_defaults_track_depth() {
        let body = parse("${1:a ${2:b ${3}}}");
        assert_eq!(
            describe(&body, &body.roots),
            vec![r#"ph 1 [text "a ", ph 2 [text "b ", ph 3 []]]"#]
        );
        let depths: Vec<usize> = body
            .walk()
            .into_iter()
            .filter_map(|id| body.node(id).placeholder().map(|p| p.depth))
            .collect();
        assert_eq!(depths, vec![0, 1, 2]);
    }

    #[test]
    fn test_escapes() {
        let body = parse(r"\$1 \} \\ \n\t");
        assert_eq!(body.node(body.roots[0]).literal, r"$1 } \ \n\t");
    }

    #[test]
    fn test_close_brace_outside_default_is_literal() {
        let body = parse("fn() {}");
        assert_eq!(describe(&body, &body.roots), vec![r#"text "fn() {}""#]);
    }

    #[test]
    fn test_colon_and_slash_inside_default_are_text() {
        let body = parse("${1:a:b/c}");
        assert_eq!(describe(&body, &body.roots), vec![r#"ph 1 [text "a:b/c"]"#]);
    }

    #[test]
    fn test_interpolation() {
        let body = parse(r#"Indent is: `!v indent(".")`."#);
        assert_eq!(
            describe(&body, &body.roots),
            vec![
                r#"text "Indent is: ""#,
                r#"host query "indent(\".\")""#,
                r#"text ".""#,
            ]
        );
        assert_eq!(body.node(body.roots[1]).literal, r#"!v indent(".")"#);
    }

    #[test]
    fn test_escaped_backtick_inside_interpolation() {
        let body = parse(r"`!p snip.rv = \`aaa\``");
        assert_eq!(body.node(body.roots[0]).literal, "!p snip.rv = `aaa`");
    }

    #[test]
    fn test_interpolation_is_verbatim() {
        let body = parse(r#"`!p snip.rv = "${1}\n"`"#);
        assert_eq!(body.node(body.roots[0]).literal, r#"!p snip.rv = "${1}\n""#);
    }

    #[test]
    fn test_unterminated_interpolation_degrades_to_text() {
        let body = parse("a `b $1");
        assert_eq!(
            describe(&body, &body.roots),
            vec![r#"text "a `b ""#, "ph 1 []"]
        );
    }

    #[test]
    fn test_interpolation_inside_default_may_contain_brace() {
        let body = parse("${1:`!p x}`} ${2:`y}");
        assert_eq!(
            describe(&body, &body.roots),
            vec![
                r#"ph 1 [script "x}"]"#,
                r#"text " ""#,
                r#"ph 2 [text "`y"]"#,
            ]
        );
    }

    #[test]
    fn test_interpolation_between_placeholders() {
        let body = parse("def ${1:fname}(`!p snip.rv = \"self, \" if snip.indent else \"\"`$2):\n\t$0");
        let roots = describe(&body, &body.roots);
        assert_eq!(roots[3], r#"script "snip.rv = \"self, \" if snip.indent else \"\"""#);
        assert_eq!(roots[4], "ph 2 []");
    }

    #[test]
    fn test_visual() {
        let body = parse("${VISUAL} ${VISUAL:pass}");
        assert_eq!(
            describe(&body, &body.roots),
            vec!["ph VISUAL []", r#"text " ""#, r#"ph VISUAL [text "pass"]"#]
        );
    }

    #[test]
    fn test_transformation() {
        let body = parse(r"${1:foo} ${1/(\w+)\/x/\u$1/g}!");
        assert_eq!(
            describe(&body, &body.roots),
            vec![r#"ph 1 [text "foo"]"#, r#"text " ""#, "transform 1", r#"text "!""#]
        );
        let node = body.node(body.roots[2]);
        let t = node.placeholder().unwrap().transform.as_ref().unwrap();
        assert_eq!(t.pattern(), r"(\w+)/x");
        assert_eq!(t.flags(), "g");
        assert!(t.global);
    }

    #[test]
    fn test_transformation_regex_may_contain_braces() {
        let body = parse(r"${1/a{2}/b/} end");
        assert_eq!(
            describe(&body, &body.roots),
            vec!["transform 1", r#"text " end""#]
        );
    }

    #[test]
    fn test_source_offsets() {
        let body = parse("ab${1:cd}ef");
        let ph = body.node(body.roots[1]);
        assert_eq!(ph.source, 2..9);
        assert_eq!(ph.literal, "${1:cd}");
        assert_eq!(body.node(body.roots[2]).source, 9..11);
    }

    #[test]
    fn test_missing_number_is_invalid_tabstop() {
        let location = SourceLocation::new("t.snippets", 10, 100);
        let err = parse_body("line\n${x}", &location).unwrap_err();
        assert!(matches!(err, ParseError::InvalidTabstop { .. }));
        assert_eq!(err.line(), 11);
        assert_eq!(err.file(), "t.snippets");
        assert_eq!(err.span().start, 105);
    }

    #[test]
    fn test_unterminated_default_is_error() {
        let err = parse_body("${1:abc", &SourceLocation::default()).unwrap_err();
        assert!(err.message().contains("unterminated"));
    }

    #[test]
    fn test_empty_braces_is_error() {
        assert!(parse_body("${}", &SourceLocation::default()).is_err());
        assert!(parse_body("${", &SourceLocation::default()).is_err());
        assert!(parse_body("${1 }", &SourceLocation::default()).is_err());
    }

    #[test]
    fn test_bad_flag_is_error() {
        let err = parse_body("${1/a/b/q}", &SourceLocation::default()).unwrap_err();
        assert!(err.message().contains("flag"));
    }
}
