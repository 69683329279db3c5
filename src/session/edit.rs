//! Live re-render after the user types over the active stop

use std::collections::BTreeSet;

use tracing::debug;

use crate::parser::ast::{Node, NodeId, NodeKind};
use crate::template::Registry;
use crate::Error;

use super::{Expansion, Session};

impl Session {
    /// Replace the content of the active stop with `text` and render again.
    ///
    /// `text` is the complete current content of the stop, so repeated calls
    /// supersede each other. Placeholders that were only reachable through
    /// the stop's old default leave the registry and the stop list. Returns
    /// `None` when there is no active stop.
    pub fn rerender(&mut self, text: &str) -> Result<Option<Expansion>, Error> {
        let Some(number) = self.current_stop() else {
            return Ok(None);
        };
        let Some(active) = self.registry.get(number) else {
            return Ok(None);
        };

        let literal = self.literal_node(active, text);
        let node = self.body.node_mut(active);
        if let NodeKind::Placeholder(placeholder) = &mut node.kind {
            placeholder.default = vec![literal];
        }
        node.edited = true;

        let previous = self.registry.number_set();
        self.registry = Registry::build_filtered(&self.body, |n| previous.contains(&n));
        let removed: BTreeSet<u32> = previous
            .difference(&self.registry.number_set())
            .copied()
            .collect();

        if !removed.is_empty() {
            self.stops.retain(|n| !removed.contains(n));
            self.retarget(number);
        }
        debug!(
            trigger = %self.trigger,
            stop = number,
            removed = ?removed,
            "rerender"
        );

        self.render()?;
        Ok(Some(self.expansion()))
    }

    /// Reuse the literal left by a previous edit, or add a new one
    fn literal_node(&mut self, active: NodeId, text: &str) -> NodeId {
        let node = self.body.node(active);
        let source = node.source.clone();
        let reusable = match node.placeholder().map(|p| p.default.as_slice()) {
            Some(&[child]) if node.edited => {
                matches!(self.body.node(child).kind, NodeKind::Text).then_some(child)
            }
            _ => None,
        };
        if let Some(child) = reusable {
            self.body.node_mut(child).literal = text.to_string();
            return child;
        }

        let id = self.body.nodes.len();
        self.body.nodes.push(Node::new(NodeKind::Text, source, text));
        id
    }

    /// Point the navigation index back at `number` after the stop list shrank
    fn retarget(&mut self, number: u32) {
        let Some(index) = self.stops.iter().position(|&n| n == number) else {
            self.reset();
            return;
        };
        let index = index as i64;
        self.current = if self.current < 0 {
            index - self.stops.len() as i64
        } else {
            index
        };
    }
}

#[cfg(test)]
mod tests {
    use crate::interpolation::{testing, SharedScope};
    use crate::renderer::RenderContext;
    use crate::session::{Direction, JumpPosition, Session};
    use crate::template::Snippet;
    use pretty_assertions::assert_eq;

    fn session(body: &str) -> Session {
        Session::expand(&Snippet::new("t", "", "", body), RenderContext::default()).unwrap()
    }

    #[test]
    fn test_edit_updates_mirrors() {
        let mut s = session("${1:name} = $1;");
        let expansion = s.rerender("count").unwrap().unwrap();
        assert_eq!(expansion.content, "count = count;");
        assert_eq!(
            expansion.position,
            JumpPosition {
                line: 0,
                orig_col: 0,
                col: 5,
                length: 0
            }
        );
    }

    #[test]
    fn test_edits_supersede() {
        let mut twice = session("<${1:a}> ${2:b} $1");
        twice.rerender("x").unwrap();
        let twice = twice.rerender("xy").unwrap();

        let mut once = session("<${1:a}> ${2:b} $1");
        let once = once.rerender("xy").unwrap();

        assert_eq!(twice, once);
        assert_eq!(once.map(|e| e.content), Some("<xy> b xy".to_string()));
    }

    #[test]
    fn test_edit_removes_nested_stops() {
        let mut s = session("${1:a ${2:b ${3:c}}} ${4:d}");
        assert_eq!(s.stops(), &[1, 2, 3, 4]);
        s.rerender("z").unwrap();
        assert_eq!(s.stops(), &[1, 4]);
        assert_eq!(s.current_stop(), Some(1));
        s.jump(Direction::Forward);
        assert_eq!(s.current_stop(), Some(4));
        assert_eq!(s.content(), "z d");
    }

    #[test]
    fn test_nested_number_used_elsewhere_survives() {
        let mut s = session("${1:${2:x}} ${3:[$2]}");
        s.rerender("y").unwrap();
        assert_eq!(s.stops(), &[1, 2, 3]);
        assert_eq!(s.content(), "y []");
    }

    #[test]
    fn test_edit_keeps_negative_index_convention() {
        let mut s = session("${1:a} ${2:${3:b}} ${4:c}");
        s.jump(Direction::Backward);
        s.jump(Direction::Backward);
        s.jump(Direction::Backward);
        assert_eq!(s.current_stop(), Some(2));
        s.rerender("q").unwrap();
        assert_eq!(s.stops(), &[1, 2, 4]);
        assert_eq!(s.current_stop(), Some(2));
        s.jump(Direction::Backward);
        assert_eq!(s.current_stop(), Some(1));
    }

    #[test]
    fn test_edit_recomputes_dependents() {
        let mut s = session("${1:ab} ${2:[$1]} ${1/b/B/g}");
        assert_eq!(s.content(), "ab [ab] B");
        s.rerender("bob").unwrap();
        assert_eq!(s.value(1), Some("bob"));
        assert_eq!(s.value(2), Some("[bob]"));
        assert_eq!(s.content(), "bob [bob] BB");
    }

    #[test]
    fn test_multiline_edit_reevaluates_and_shifts_later_stops() {
        let snippet = Snippet::new("t", "", "", "a ${1:x} ${2:y} `!p upper 1`");
        let mut s = Session::start(
            &snippet,
            RenderContext::default(),
            SharedScope::new(),
            testing::evaluators(),
        )
        .unwrap();
        assert_eq!(s.content(), "a x y X");

        let expansion = s.rerender("p\nq").unwrap().unwrap();
        assert_eq!(expansion.content, "a p\nq y P\nQ");
        assert_eq!(expansion.position, JumpPosition::NONE);

        let position = s.jump(Direction::Forward);
        assert_eq!(s.current_stop(), Some(2));
        assert_eq!(
            (position.line, position.col, position.length),
            (1, 2, 1)
        );
    }

    #[test]
    fn test_no_active_stop() {
        let mut s = session("plain");
        assert_eq!(s.rerender("x").unwrap(), None);
    }
}
