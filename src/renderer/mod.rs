//! Two-pass snippet renderer
//!
//! Pass 1 resolves every canonical placeholder in source order, rendering
//! its default locally so mirrors, transformations and interpolations can
//! read its value. Placeholders referenced before they are resolved read as
//! empty text.
//!
//! Pass 2 walks the top-level sequence, emitting text and recording the
//! absolute span of every placeholder and interpolation. Top-level mirrors,
//! transformations and interpolations are evaluated again here against the
//! complete set of values; nested ones repeat their pass-1 text so a stop
//! always shows its resolved value. The output is then indentation-normalised line by line and the
//! recorded spans are shifted to match.

mod config;
pub mod indent;

pub use config::RenderContext;

use std::collections::BTreeMap;

use tracing::trace;

use crate::interpolation::{EvalEnv, EvalError, Evaluators, Interpolation, SharedScope};
use crate::parser::ast::{Body, NodeId, NodeKind, Placeholder, Pos};
use crate::template::Registry;

/// Final text of a render plus the column the cursor ends on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub content: String,
    /// Column right after the snippet body on its last line
    pub end_col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Pass 1: local rendering of a canonical default
    Resolve,
    /// Pass 2: absolute emission; `nested` is set below a placeholder
    Emit { nested: bool },
}

/// Output buffer that tracks the line/column of its end
#[derive(Debug, Default)]
struct Cursor {
    text: String,
    line: usize,
    column: usize,
}

impl Cursor {
    fn push(&mut self, s: &str) {
        match s.rfind('\n') {
            Some(last) => {
                self.line += s.matches('\n').count();
                self.column = s.len() - last - 1;
            }
            None => self.column += s.len(),
        }
        self.text.push_str(s);
    }

    fn pos(&self) -> Pos {
        Pos::new(self.line, self.column)
    }
}

pub struct Renderer<'a> {
    body: &'a mut Body,
    registry: &'a Registry,
    context: &'a RenderContext,
    scope: &'a SharedScope,
    evaluators: &'a Evaluators,
}

impl<'a> Renderer<'a> {
    pub fn new(
        body: &'a mut Body,
        registry: &'a Registry,
        context: &'a RenderContext,
        scope: &'a SharedScope,
        evaluators: &'a Evaluators,
    ) -> Self {
        Self {
            body,
            registry,
            context,
            scope,
            evaluators,
        }
    }

    pub fn render(mut self) -> Result<Rendered, EvalError> {
        for node in &mut self.body.nodes {
            node.reset();
        }

        for &id in self.registry.source_order() {
            if self.body.node(id).resolved.is_none() {
                self.emit(id, &mut Cursor::default(), Mode::Resolve)?;
            }
        }

        let mut out = Cursor::default();
        for id in self.body.roots.clone() {
            self.emit(id, &mut out, Mode::Emit { nested: false })?;
        }

        let (mut content, shifts) = indent::normalize(&out.text, self.context);
        for node in self.body.nodes.iter_mut().filter(|n| n.placed) {
            node.start.column = shifts[node.start.line].map(node.start.column, self.context);
            node.end.column = shifts[node.end.line].map(node.end.column, self.context);
        }
        let end_col = shifts
            .last()
            .map_or(0, |shift| shift.map(out.column, self.context));
        content.push_str(&self.context.suffix);

        Ok(Rendered { content, end_col })
    }

    fn emit(&mut self, id: NodeId, out: &mut Cursor, mode: Mode) -> Result<(), EvalError> {
        let start = out.pos();
        match self.body.node(id).kind.clone() {
            NodeKind::Text => out.push(&self.body.node(id).literal),
            NodeKind::Interpolation(interpolation) => {
                let cached = match mode {
                    Mode::Emit { nested: false } => None,
                    _ => self.body.node(id).resolved.clone(),
                };
                let text = match cached {
                    Some(text) => text,
                    None => self.evaluate(&interpolation)?,
                };
                out.push(&text);
                self.body.node_mut(id).resolved = Some(text);
            }
            NodeKind::Placeholder(placeholder) => self.emit_placeholder(id, &placeholder, out, mode)?,
        }

        let node = self.body.node_mut(id);
        node.start = start;
        node.end = out.pos();
        node.placed = matches!(mode, Mode::Emit { .. });
        Ok(())
    }

    fn emit_placeholder(
        &mut self,
        id: NodeId,
        placeholder: &Placeholder,
        out: &mut Cursor,
        mode: Mode,
    ) -> Result<(), EvalError> {
        let child_mode = match mode {
            Mode::Resolve => Mode::Resolve,
            Mode::Emit { .. } => Mode::Emit { nested: true },
        };

        if placeholder.is_visual() {
            match (&placeholder.transform, &self.context.visual) {
                (Some(transform), visual) => {
                    out.push(&transform.apply(visual.as_deref().unwrap_or("")));
                }
                (None, Some(visual)) => out.push(visual),
                (None, None) => {
                    for &child in &placeholder.default {
                        self.emit(child, out, child_mode)?;
                    }
                }
            }
            return Ok(());
        }

        if placeholder.transform.is_some() || !self.registry.is_canonical(placeholder.number, id) {
            // below a canonical default, pass 2 repeats the text pass 1 produced
            let cached = match mode {
                Mode::Emit { nested: true } => self.body.node(id).resolved.clone(),
                _ => None,
            };
            let text = match cached {
                Some(text) => text,
                None => {
                    let value = self.value(placeholder.number);
                    match &placeholder.transform {
                        Some(transform) => transform.apply(&value),
                        None => value,
                    }
                }
            };
            out.push(&text);
            if mode == Mode::Resolve {
                self.body.node_mut(id).resolved = Some(text);
            }
            return Ok(());
        }

        if mode == Mode::Resolve {
            if let Some(text) = &self.body.node(id).resolved {
                out.push(text);
                return Ok(());
            }
        }

        let offset = out.text.len();
        for &child in &placeholder.default {
            self.emit(child, out, child_mode)?;
        }
        if mode == Mode::Resolve {
            let text = out.text[offset..].to_string();
            trace!(number = placeholder.number, value = %text, "resolved placeholder");
            self.body.node_mut(id).resolved = Some(text);
        }
        Ok(())
    }

    /// Current value of a placeholder number, empty when unresolved
    fn value(&self, number: u32) -> String {
        self.registry
            .get(number)
            .and_then(|id| self.body.node(id).resolved.clone())
            .unwrap_or_default()
    }

    fn evaluate(&self, interpolation: &Interpolation) -> Result<String, EvalError> {
        let values: BTreeMap<u32, String> = self
            .registry
            .numbers()
            .map(|n| (n, self.value(n)))
            .collect();
        let mut env = EvalEnv {
            placeholders: &values,
            context: self.context,
            scope: self.scope,
            evaluators: self.evaluators,
        };
        trace!(kind = interpolation.kind(), code = interpolation.code(), "evaluating interpolation");
        interpolation.evaluate(&mut env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::testing;
    use crate::parser::ast::SourceLocation;
    use crate::parser::body::parse_body;
    use pretty_assertions::assert_eq;

    struct Fixture {
        body: Body,
        registry: Registry,
        rendered: Rendered,
    }

    fn render_with(source: &str, context: RenderContext) -> Result<Fixture, EvalError> {
        let mut body = parse_body(source, &SourceLocation::default()).unwrap();
        let registry = Registry::build(&body);
        let scope = SharedScope::new();
        let evaluators = testing::evaluators();
        let rendered = Renderer::new(&mut body, &registry, &context, &scope, &evaluators).render()?;
        Ok(Fixture {
            body,
            registry,
            rendered,
        })
    }

    fn render(source: &str) -> Fixture {
        render_with(source, RenderContext::default()).unwrap()
    }

    fn span(f: &Fixture, number: u32) -> (Pos, Pos) {
        let node = f.body.node(f.registry.get(number).unwrap());
        (node.start, node.end)
    }

    #[test]
    fn test_literal_renders_to_itself() {
        let f = render("just some text");
        assert_eq!(f.rendered.content, "just some text");
        assert_eq!(f.rendered.end_col, 14);
        assert!(f.registry.is_empty());
    }

    #[test]
    fn test_mirror_reads_canonical() {
        let f = render("${1:a}${1}");
        assert_eq!(f.rendered.content, "aa");
        assert_eq!(f.registry.len(), 1);
    }

    #[test]
    fn test_forward_reference_reads_empty() {
        let f = render("${1:[$2]} ${2:x}");
        assert_eq!(f.rendered.content, "[] x");
    }

    #[test]
    fn test_stop_shows_the_value_its_mirrors_see() {
        let f = render("${1:[$2]} ${2:x} $1 ${1/(.*)/<$1>/}");
        assert_eq!(f.rendered.content, "[] x [] <[]>");
        assert_eq!(span(&f, 1), (Pos::new(0, 0), Pos::new(0, 2)));
        let id = f.registry.get(1).unwrap();
        assert_eq!(f.body.node(id).resolved.as_deref(), Some("[]"));
    }

    #[test]
    fn test_shallow_bare_stop_is_canonical() {
        let f = render("${1:a ${2:b}} $2 `!p upper 2`");
        assert_eq!(f.rendered.content, "a   ");
        let id = f.registry.get(2).unwrap();
        assert_eq!(f.body.node(id).placeholder().unwrap().depth, 0);
    }

    #[test]
    fn test_backward_reference_reads_value() {
        let f = render("${1:x} ${2:[$1]}");
        assert_eq!(f.rendered.content, "x [x]");
    }

    #[test]
    fn test_nested_spans_are_absolute() {
        let f = render("ab ${1:cd ${2:ef}} gh");
        assert_eq!(f.rendered.content, "ab cd ef gh");
        assert_eq!(span(&f, 1), (Pos::new(0, 3), Pos::new(0, 8)));
        assert_eq!(span(&f, 2), (Pos::new(0, 6), Pos::new(0, 8)));
    }

    #[test]
    fn test_multiline_spans() {
        let f = render("a\n${1:b\nc} $2");
        assert_eq!(f.rendered.content, "a\nb\nc ");
        assert_eq!(span(&f, 1), (Pos::new(1, 0), Pos::new(2, 1)));
        assert_eq!(span(&f, 2), (Pos::new(2, 2), Pos::new(2, 2)));
        assert_eq!(f.rendered.end_col, 2);
    }

    #[test]
    fn test_transformation_mirrors_value() {
        let f = render(r"${1:hello} ${1/(.*)/\u$1/}");
        assert_eq!(f.rendered.content, "hello Hello");
    }

    #[test]
    fn test_transformation_without_match_is_empty() {
        let f = render(r"${1:abc}|${1/xyz/Q/}|");
        assert_eq!(f.rendered.content, "abc||");
    }

    #[test]
    fn test_indentation_shifts_spans() {
        let context = RenderContext::default()
            .with_shiftwidth(2)
            .with_indent(4)
            .with_prefix("    ");
        let f = render_with("if ${1:x}:\n\t${2:pass}", context).unwrap();
        assert_eq!(f.rendered.content, "    if x:\n      pass");
        assert_eq!(span(&f, 1), (Pos::new(0, 7), Pos::new(0, 8)));
        assert_eq!(span(&f, 2), (Pos::new(1, 6), Pos::new(1, 10)));
    }

    #[test]
    fn test_prefix_and_suffix() {
        let context = RenderContext::default().with_prefix("x = ").with_suffix(";");
        let f = render_with("${1:1} + 2", context).unwrap();
        assert_eq!(f.rendered.content, "x = 1 + 2;");
        assert_eq!(span(&f, 1), (Pos::new(0, 4), Pos::new(0, 5)));
        assert_eq!(f.rendered.end_col, 9);
    }

    #[test]
    fn test_escaped_newline_is_not_a_line_break() {
        let f = render(r"a\nb");
        assert_eq!(f.rendered.content, "a\\nb");
        assert_eq!(f.rendered.content.lines().count(), 1);
    }

    #[test]
    fn test_visual_uses_selection_or_default() {
        let f = render("<${VISUAL:none}>");
        assert_eq!(f.rendered.content, "<none>");

        let context = RenderContext::default().with_visual("sel");
        let f = render_with("<${VISUAL:none}>", context).unwrap();
        assert_eq!(f.rendered.content, "<sel>");
        assert!(f.registry.is_empty());
    }

    #[test]
    fn test_interpolation_sees_placeholders() {
        let f = render("${1:abc} `!p upper 1`");
        assert_eq!(f.rendered.content, "abc ABC");
    }

    #[test]
    fn test_interpolation_inside_default() {
        let f = render("${1:a} ${2:<`!p len 1`>}");
        assert_eq!(f.rendered.content, "a <1>");
    }

    #[test]
    fn test_interpolation_span_recorded() {
        let f = render("x`!v now`y");
        let node = f.body.node(f.body.roots[1]);
        assert_eq!(f.rendered.content, "x<now>y");
        assert_eq!((node.start, node.end), (Pos::new(0, 1), Pos::new(0, 6)));
    }

    #[test]
    fn test_failing_interpolation_is_an_error() {
        let err = render_with("`!p fail`", RenderContext::default()).err().unwrap();
        assert!(matches!(err, EvalError::Script(_)));
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut body = parse_body("${1:a ${2:b}} $1 `!p upper 2`", &SourceLocation::default()).unwrap();
        let registry = Registry::build(&body);
        let context = RenderContext::default();
        let scope = SharedScope::new();
        let evaluators = testing::evaluators();
        let first = Renderer::new(&mut body, &registry, &context, &scope, &evaluators)
            .render()
            .unwrap();
        let second = Renderer::new(&mut body, &registry, &context, &scope, &evaluators)
            .render()
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first.content, "a b a b B");
    }
}
