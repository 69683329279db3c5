//! Interpolations: backtick spans whose output becomes rendered text
//!
//! The content of an interpolation is dispatched on its tag:
//!
//! ```text
//! `!p snip.rv = t[1].upper()`   scripted computation
//! `!v strftime("%Y")`           host query
//! `date +%Y`                    shell command (no tag, or `!sh`)
//! ```
//!
//! Scripted computations and host queries are executed by the embedding
//! editor through [`ScriptEngine`] and [`HostQuery`]; shell commands run
//! through the built-in [`ShellRunner`].

mod shell;

pub use shell::ShellRunner;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;

use crate::renderer::RenderContext;

/// Errors raised while evaluating an interpolation or a `global` block
#[derive(Debug, Error)]
pub enum EvalError {
    /// The host did not wire an evaluator for this kind of interpolation
    #[error("no evaluator available for {kind} interpolations")]
    Unsupported { kind: &'static str },

    #[error("script failed: {0}")]
    Script(String),

    #[error("host query failed: {0}")]
    HostQuery(String),

    #[error("failed to spawn shell command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("shell command '{command}' exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("shell command '{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

/// An interpolation, tagged by how it is evaluated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpolation {
    /// `!p` code run by the host's script engine
    Script(String),
    /// `!v` expression evaluated by the host editor
    HostQuery(String),
    /// Anything else is a shell command
    Shell(String),
}

impl Interpolation {
    /// Classify the raw content found between the backticks
    pub fn parse(content: &str) -> Self {
        if let Some(code) = strip_tag(content, "!p") {
            Self::Script(code.trim_start().to_string())
        } else if let Some(expr) = strip_tag(content, "!v") {
            Self::HostQuery(expr.trim().to_string())
        } else if let Some(command) = strip_tag(content, "!sh") {
            Self::Shell(command.trim_start().to_string())
        } else {
            Self::Shell(content.to_string())
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Script(_) => "script",
            Self::HostQuery(_) => "host query",
            Self::Shell(_) => "shell",
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Script(code) | Self::HostQuery(code) | Self::Shell(code) => code,
        }
    }

    pub fn evaluate(&self, env: &mut EvalEnv<'_>) -> Result<String, EvalError> {
        match self {
            Self::Script(code) => {
                let engine = env
                    .evaluators
                    .script
                    .as_ref()
                    .ok_or(EvalError::Unsupported { kind: self.kind() })?;
                let mut snip = SnipUtil::new(env.placeholders, env.context);
                let mut state = env.scope.lock();
                engine.run(code, &mut state, &mut snip)?;
                Ok(snip.rv)
            }
            Self::HostQuery(expr) => {
                let host = env
                    .evaluators
                    .host
                    .as_ref()
                    .ok_or(EvalError::Unsupported { kind: self.kind() })?;
                host.query(expr)
            }
            Self::Shell(command) => env.evaluators.shell.run(command),
        }
    }
}

fn strip_tag<'a>(content: &'a str, tag: &str) -> Option<&'a str> {
    let rest = content.strip_prefix(tag)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest),
        Some(_) => None,
    }
}

/// Runs `!p` code. Implemented by the embedding editor.
pub trait ScriptEngine: Send + Sync {
    /// Execute a `global` block once for a filetype scope
    fn seed(&self, state: &mut ScopeState, body: &str) -> Result<(), EvalError>;

    /// Execute interpolation code; output goes to `snip.rv`
    fn run(&self, code: &str, state: &mut ScopeState, snip: &mut SnipUtil<'_>)
        -> Result<(), EvalError>;
}

/// Evaluates `!v` expressions in the embedding editor
pub trait HostQuery: Send + Sync {
    fn query(&self, expr: &str) -> Result<String, EvalError>;
}

/// Shared evaluation state of one filetype scope, seeded by `global` blocks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeState {
    vars: HashMap<String, String>,
}

impl ScopeState {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(|s| s.as_str())
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Handle to a scope's state shared between the library and its sessions
#[derive(Debug, Clone, Default)]
pub struct SharedScope(Arc<Mutex<ScopeState>>);

impl SharedScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, ScopeState> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// The `snip` object handed to scripted computations
#[derive(Debug)]
pub struct SnipUtil<'a> {
    /// Output accumulator
    pub rv: String,
    placeholders: &'a BTreeMap<u32, String>,
    context: &'a RenderContext,
    indent: String,
}

impl<'a> SnipUtil<'a> {
    pub fn new(placeholders: &'a BTreeMap<u32, String>, context: &'a RenderContext) -> Self {
        Self {
            rv: String::new(),
            placeholders,
            context,
            indent: context.indent_string(context.indent),
        }
    }

    /// Current value of placeholder `n`, empty when unresolved
    pub fn t(&self, n: u32) -> &str {
        self.placeholders.get(&n).map_or("", |s| s.as_str())
    }

    pub fn placeholders(&self) -> &BTreeMap<u32, String> {
        self.placeholders
    }

    pub fn filename(&self) -> &str {
        &self.context.filename
    }

    /// File name without its extension
    pub fn basename(&self) -> &str {
        let name = self.context.filename.as_str();
        match name.rfind('.') {
            Some(dot) if dot > 0 => &name[..dot],
            _ => name,
        }
    }

    pub fn filetype(&self) -> &str {
        &self.context.filetype
    }

    /// Text of the visual selection, if the host supplied one
    pub fn visual(&self) -> &str {
        self.context.visual.as_deref().unwrap_or("")
    }

    pub fn indent(&self) -> &str {
        &self.indent
    }

    /// Increase the indentation used by [`SnipUtil::mkline`] by `levels`
    pub fn shift(&mut self, levels: usize) {
        let width = self.indent_width() + levels * self.context.shift_width();
        self.indent = self.context.indent_string(width);
    }

    /// Decrease the indentation used by [`SnipUtil::mkline`] by `levels`
    pub fn unshift(&mut self, levels: usize) {
        let width = self
            .indent_width()
            .saturating_sub(levels * self.context.shift_width());
        self.indent = self.context.indent_string(width);
    }

    /// Prefix `line` with the current indentation
    pub fn mkline(&self, line: &str) -> String {
        format!("{}{}", self.indent, line)
    }

    /// Append a new, indented line to the output
    pub fn push_line(&mut self, line: &str) {
        if !self.rv.is_empty() {
            self.rv.push('\n');
        }
        let line = self.mkline(line);
        self.rv.push_str(&line);
    }

    fn indent_width(&self) -> usize {
        self.indent
            .chars()
            .map(|c| if c == '\t' { self.context.tabstop } else { 1 })
            .sum()
    }
}

/// The interpolation variants a host has wired up
#[derive(Clone, Default)]
pub struct Evaluators {
    pub script: Option<Arc<dyn ScriptEngine>>,
    pub host: Option<Arc<dyn HostQuery>>,
    pub shell: ShellRunner,
}

impl std::fmt::Debug for Evaluators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluators")
            .field("script", &self.script.is_some())
            .field("host", &self.host.is_some())
            .field("shell", &self.shell)
            .finish()
    }
}

impl Evaluators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script_engine(mut self, engine: Arc<dyn ScriptEngine>) -> Self {
        self.script = Some(engine);
        self
    }

    pub fn with_host_query(mut self, host: Arc<dyn HostQuery>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn with_shell(mut self, shell: ShellRunner) -> Self {
        self.shell = shell;
        self
    }
}

/// Everything an interpolation may read while it is evaluated
pub struct EvalEnv<'a> {
    /// Resolved placeholder values, keyed by number
    pub placeholders: &'a BTreeMap<u32, String>,
    pub context: &'a RenderContext,
    pub scope: &'a SharedScope,
    pub evaluators: &'a Evaluators,
}
