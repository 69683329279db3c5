//! Snippet definitions and their parsed prototype

use std::sync::{Arc, OnceLock};

use crate::error::ParseError;
use crate::parser::ast::{Body, SourceLocation};
use crate::parser::body::parse_body;
use crate::parser::document::Action;

use super::Registry;

/// Parsed body and registry shared by every expansion of one snippet
#[derive(Debug)]
pub struct SnippetTree {
    pub body: Body,
    pub registry: Registry,
}

/// A snippet as declared in a definition file
#[derive(Debug, Clone)]
pub struct Snippet {
    pub trigger: String,
    pub description: String,
    /// Option letters, e.g. `b` (beginning of line only) or `r` (regex trigger)
    pub options: String,
    /// Raw body text between the header and `endsnippet`
    pub body: String,
    pub location: SourceLocation,
    /// Actions declared right before this snippet
    pub actions: Vec<Action>,
    tree: OnceLock<Arc<SnippetTree>>,
}

impl Snippet {
    pub fn new(
        trigger: impl Into<String>,
        description: impl Into<String>,
        options: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            trigger: trigger.into(),
            description: description.into(),
            options: options.into(),
            body: body.into(),
            location: SourceLocation::default(),
            actions: Vec::new(),
            tree: OnceLock::new(),
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }

    pub fn is_block(&self) -> bool {
        self.options.contains('b')
    }

    pub fn is_regex(&self) -> bool {
        self.options.contains('r')
    }

    /// Parse the body on first use and hand out the cached prototype
    pub fn tree(&self) -> Result<Arc<SnippetTree>, ParseError> {
        if let Some(tree) = self.tree.get() {
            return Ok(Arc::clone(tree));
        }
        let body = parse_body(&self.body, &self.location)?;
        let registry = Registry::build(&body);
        let tree = Arc::new(SnippetTree { body, registry });
        Ok(Arc::clone(self.tree.get_or_init(|| tree)))
    }
}
