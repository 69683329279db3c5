//! Snippet library: per-filetype scopes and trigger lookup
//!
//! Definition files are loaded into a scope named after their filetype.
//! A lookup searches the filetype's scope, then the scopes it extends, then
//! the shared `all` scope.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Range;
use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};

use crate::interpolation::{EvalError, Evaluators, SharedScope};
use crate::parser::document::{parse_document, Action, Global, Statement};
use crate::renderer::RenderContext;
use crate::session::Session;
use crate::template::Snippet;
use crate::Error;

/// Scope searched for every filetype
pub const ALL: &str = "all";

/// A regex-triggered snippet with its trigger compiled to match at the cursor
#[derive(Debug)]
struct RegexTrigger {
    priority: i64,
    regex: Regex,
    snippet: Snippet,
}

/// Snippets, globals and shared state of one filetype
#[derive(Debug, Default)]
pub struct Scope {
    snippets: BTreeMap<String, (i64, Snippet)>,
    regex_snippets: Vec<RegexTrigger>,
    extends: Vec<String>,
    globals: Vec<Global>,
    state: SharedScope,
}

impl Scope {
    /// Merge parsed statements into this scope.
    ///
    /// `priority` applies to every snippet after it in the same file. A
    /// snippet replaces one with the same trigger unless the existing one
    /// has a higher priority. Actions attach to the next snippet.
    pub fn add(&mut self, statements: Vec<Statement>, evaluators: &Evaluators) -> Result<(), EvalError> {
        let mut priority = 0;
        let mut pending: Vec<Action> = Vec::new();

        for statement in statements {
            match statement {
                Statement::Priority(p) => priority = p,
                Statement::Extends(types) => {
                    for t in types {
                        if !self.extends.contains(&t) {
                            self.extends.push(t);
                        }
                    }
                }
                Statement::Global(global) => {
                    self.seed(&global, evaluators)?;
                    self.globals.push(global);
                }
                Statement::Action(action) => pending.push(action),
                Statement::Snippet(mut snippet) => {
                    snippet.actions = std::mem::take(&mut pending);
                    self.insert(priority, snippet);
                }
            }
        }
        Ok(())
    }

    fn insert(&mut self, priority: i64, snippet: Snippet) {
        if snippet.is_regex() {
            let regex = match Regex::new(&format!("(?:{})$", snippet.trigger)) {
                Ok(regex) => regex,
                Err(err) => {
                    warn!(trigger = %snippet.trigger, error = %err, "invalid regex trigger");
                    return;
                }
            };
            let entry = RegexTrigger {
                priority,
                regex,
                snippet,
            };
            match self
                .regex_snippets
                .iter_mut()
                .find(|t| t.snippet.trigger == entry.snippet.trigger)
            {
                Some(existing) if existing.priority > priority => {}
                Some(existing) => *existing = entry,
                None => self.regex_snippets.push(entry),
            }
            return;
        }

        match self.snippets.get(&snippet.trigger) {
            Some((existing, _)) if *existing > priority => {
                debug!(trigger = %snippet.trigger, "kept higher-priority snippet");
            }
            _ => {
                self.snippets.insert(snippet.trigger.clone(), (priority, snippet));
            }
        }
    }

    fn seed(&self, global: &Global, evaluators: &Evaluators) -> Result<(), EvalError> {
        if global.tag != "!p" {
            return Ok(());
        }
        match &evaluators.script {
            Some(engine) => engine.seed(&mut self.state.lock(), &global.body),
            None => {
                debug!("no script engine, global block not evaluated");
                Ok(())
            }
        }
    }

    /// Snippet with exactly this (non-regex) trigger
    pub fn get(&self, trigger: &str) -> Option<&Snippet> {
        self.snippets.get(trigger).map(|(_, s)| s)
    }

    /// Every snippet, plain triggers in order first, then regex triggers
    pub fn snippets(&self) -> impl Iterator<Item = &Snippet> {
        self.snippets
            .values()
            .map(|(_, s)| s)
            .chain(self.regex_snippets.iter().map(|t| &t.snippet))
    }

    pub fn extends(&self) -> &[String] {
        &self.extends
    }

    pub fn globals(&self) -> &[Global] {
        &self.globals
    }

    pub fn state(&self) -> &SharedScope {
        &self.state
    }

    /// Find the snippet whose trigger ends at the cursor, returning it with
    /// the byte range of the trigger
    fn find(&self, before: &str) -> Option<(&Snippet, Range<usize>)> {
        let whole = before.trim();
        if !whole.is_empty() {
            if let Some(snippet) = self.get(whole) {
                let end = before.trim_end().len();
                return Some((snippet, end - whole.len()..end));
            }
        }

        let word = trailing(before, |c| !c.is_whitespace());
        let ident = trailing(before, |c| c.is_alphanumeric() || c == '_');
        for candidate in [word, ident] {
            if candidate.is_empty() || candidate == whole {
                continue;
            }
            if let Some(snippet) = self.get(candidate).filter(|s| !s.is_block()) {
                return Some((snippet, before.len() - candidate.len()..before.len()));
            }
        }

        self.regex_snippets.iter().find_map(|trigger| {
            let found = trigger.regex.find(before)?;
            if trigger.snippet.is_block() && !before[..found.start()].trim().is_empty() {
                return None;
            }
            Some((&trigger.snippet, found.range()))
        })
    }
}

/// Longest suffix of `text` whose characters all satisfy `keep`
fn trailing(text: &str, keep: impl Fn(char) -> bool) -> &str {
    let start = text
        .char_indices()
        .rev()
        .take_while(|&(_, c)| keep(c))
        .last()
        .map_or(text.len(), |(i, _)| i);
    &text[start..]
}

/// A request to expand whatever trigger ends at the cursor
#[derive(Debug, Clone)]
pub struct ExpandRequest {
    /// The line the cursor is on
    pub line: String,
    /// Byte column of the cursor
    pub column: usize,
    pub filetype: String,
    /// Indentation settings, base indent and visual text; prefix, suffix and
    /// filetype are filled in from the match
    pub context: RenderContext,
}

impl ExpandRequest {
    pub fn new(line: impl Into<String>, column: usize, filetype: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            column,
            filetype: filetype.into(),
            context: RenderContext::default(),
        }
    }

    /// Request with the cursor at the end of `line`
    pub fn at_end(line: impl Into<String>, filetype: impl Into<String>) -> Self {
        let line = line.into();
        let column = line.len();
        Self::new(line, column, filetype)
    }

    pub fn with_context(mut self, context: RenderContext) -> Self {
        self.context = context;
        self
    }
}

/// A trigger match: the snippet, its scope and where the trigger sits
#[derive(Debug)]
pub struct TriggerMatch<'a> {
    pub snippet: &'a Snippet,
    pub scope: &'a Scope,
    pub start: usize,
    /// End of the trigger; whitespace between it and the cursor is kept
    pub end: usize,
}

#[derive(Debug, Default)]
pub struct Library {
    scopes: HashMap<String, Scope>,
    evaluators: Evaluators,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_evaluators(evaluators: Evaluators) -> Self {
        Self {
            scopes: HashMap::new(),
            evaluators,
        }
    }

    pub fn evaluators(&self) -> &Evaluators {
        &self.evaluators
    }

    pub fn scope(&self, filetype: &str) -> Option<&Scope> {
        self.scopes.get(filetype)
    }

    /// Parse definition text and merge it into the scope of `filetype`
    pub fn add_source(&mut self, filetype: &str, source: &str, filename: &str) -> Result<(), Error> {
        let statements = parse_document(source, filename)?;
        let evaluators = &self.evaluators;
        self.scopes
            .entry(filetype.to_string())
            .or_default()
            .add(statements, evaluators)?;
        Ok(())
    }

    pub fn load_file(&mut self, filetype: &str, path: &Path) -> Result<(), Error> {
        let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.add_source(filetype, &source, &path.display().to_string())
    }

    /// Load several files into one scope, skipping the ones that fail.
    /// Returns how many loaded.
    pub fn load_files<P: AsRef<Path>>(&mut self, filetype: &str, paths: &[P]) -> usize {
        let mut loaded = 0;
        for path in paths {
            let path = path.as_ref();
            match self.load_file(filetype, path) {
                Ok(()) => loaded += 1,
                Err(err) => warn!(path = %path.display(), error = %err, "skipping snippet file"),
            }
        }
        loaded
    }

    /// Scopes searched for `filetype`, in lookup order
    fn chain(&self, filetype: &str) -> Vec<&Scope> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: Vec<&str> = vec![filetype];
        let mut chain = Vec::new();
        while !queue.is_empty() {
            let name = queue.remove(0);
            if !seen.insert(name) {
                continue;
            }
            if let Some(scope) = self.scopes.get(name) {
                queue.extend(scope.extends.iter().map(String::as_str));
                chain.push(scope);
            }
        }
        if seen.insert(ALL) {
            chain.extend(self.scopes.get(ALL));
        }
        chain
    }

    /// Find the snippet whose trigger ends at `column` of `line`
    pub fn find(&self, filetype: &str, line: &str, column: usize) -> Option<TriggerMatch<'_>> {
        let before = line.get(..column)?;
        self.chain(filetype).into_iter().find_map(|scope| {
            scope.find(before).map(|(snippet, range)| TriggerMatch {
                snippet,
                scope,
                start: range.start,
                end: range.end,
            })
        })
    }

    /// Snippets visible from `filetype` whose trigger starts with `token`,
    /// nearest scope first, for completion menus
    pub fn candidates(&self, filetype: &str, token: &str) -> Vec<&Snippet> {
        let mut seen: HashSet<&str> = HashSet::new();
        self.chain(filetype)
            .into_iter()
            .flat_map(|scope| scope.snippets.values().map(|(_, s)| s))
            .filter(|s| s.trigger.starts_with(token))
            .filter(|s| seen.insert(s.trigger.as_str()))
            .collect()
    }

    /// Expand the trigger before the cursor, if any
    pub fn expand(&self, request: &ExpandRequest) -> Result<Option<Session>, Error> {
        let Some(found) = self.find(&request.filetype, &request.line, request.column) else {
            debug!(line = %request.line, column = request.column, "no trigger matched");
            return Ok(None);
        };

        let context = request
            .context
            .clone()
            .with_prefix(&request.line[..found.start])
            .with_suffix(&request.line[found.end..])
            .with_filetype(&request.filetype);
        let session = Session::start(
            found.snippet,
            context,
            found.scope.state().clone(),
            self.evaluators.clone(),
        )?;
        Ok(Some(session))
    }
}
