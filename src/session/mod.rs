//! One active snippet expansion
//!
//! A [`Session`] owns a private copy of the snippet's node arena and
//! registry, the ordered stop list and the navigation index. The host keeps
//! it for as long as the user is navigating the expansion and drops it when
//! done or when another expansion starts.

mod edit;
pub mod navigation;

pub use navigation::{Direction, JumpPosition};

use tracing::debug;

use crate::interpolation::{Evaluators, SharedScope};
use crate::parser::ast::Body;
use crate::parser::document::Action;
use crate::renderer::{RenderContext, Rendered, Renderer};
use crate::template::{Registry, Snippet};
use crate::Error;

/// What the host needs after an expansion or an edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub content: String,
    /// Column after the snippet body, for when no stop is navigable
    pub end_col: usize,
    pub position: JumpPosition,
}

#[derive(Debug)]
pub struct Session {
    trigger: String,
    body: Body,
    registry: Registry,
    /// Navigable numbers, ascending
    stops: Vec<u32>,
    /// Index into `stops`; negative values count from the end
    current: i64,
    context: RenderContext,
    scope: SharedScope,
    evaluators: Evaluators,
    actions: Vec<Action>,
    rendered: Rendered,
}

impl Session {
    /// Clone the snippet's prototype and render it for the first time
    pub fn start(
        snippet: &Snippet,
        context: RenderContext,
        scope: SharedScope,
        evaluators: Evaluators,
    ) -> Result<Self, Error> {
        let tree = snippet.tree()?;
        let stops: Vec<u32> = tree.registry.numbers().collect();
        let mut session = Self {
            trigger: snippet.trigger.clone(),
            body: tree.body.clone(),
            registry: tree.registry.clone(),
            stops,
            current: 0,
            context,
            scope,
            evaluators,
            actions: snippet.actions.clone(),
            rendered: Rendered::default(),
        };
        session.reset();
        session.render()?;
        debug!(
            trigger = %session.trigger,
            stops = ?session.stops,
            "expanded snippet"
        );
        Ok(session)
    }

    /// Expand a snippet with no scripting, host or shell support beyond the
    /// defaults
    pub fn expand(snippet: &Snippet, context: RenderContext) -> Result<Self, Error> {
        Self::start(snippet, context, SharedScope::new(), Evaluators::new())
    }

    fn render(&mut self) -> Result<(), Error> {
        self.rendered = Renderer::new(
            &mut self.body,
            &self.registry,
            &self.context,
            &self.scope,
            &self.evaluators,
        )
        .render()?;
        Ok(())
    }

    pub fn expansion(&self) -> Expansion {
        Expansion {
            content: self.rendered.content.clone(),
            end_col: self.rendered.end_col,
            position: self.jump_position(),
        }
    }

    pub fn content(&self) -> &str {
        &self.rendered.content
    }

    pub fn end_col(&self) -> usize {
        self.rendered.end_col
    }

    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    pub fn stops(&self) -> &[u32] {
        &self.stops
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Resolved value of a placeholder in the latest render
    pub fn value(&self, number: u32) -> Option<&str> {
        let id = self.registry.get(number)?;
        self.body.node(id).resolved.as_deref()
    }
}
