//! snips - a snippet template engine
//!
//! This library parses snippet definition files, renders snippet bodies with
//! exact positions for every tab-stop, and drives navigation and live
//! re-rendering while the user fills the stops in.
//!
//! # Example
//!
//! ```rust
//! use snips::expand;
//!
//! let source = "snippet foo \"desc\" b\nHello ${1:world}!\nendsnippet\n";
//! let expansion = expand(source, "foo").unwrap().unwrap();
//! assert_eq!(expansion.content, "Hello world!");
//! assert_eq!((expansion.position.col, expansion.position.length), (6, 5));
//! ```

pub mod error;
pub mod interpolation;
pub mod library;
pub mod parser;
pub mod renderer;
pub mod session;
pub mod settings;
pub mod template;
pub mod transform;

pub use error::ParseError;
pub use interpolation::{EvalError, Evaluators, HostQuery, ScriptEngine, SharedScope, ShellRunner};
pub use library::{ExpandRequest, Library, ALL};
pub use parser::{parse_body, parse_document, Statement};
pub use renderer::RenderContext;
pub use session::{Direction, Expansion, JumpPosition, Session};
pub use settings::{Settings, SettingsError};
pub use template::Snippet;

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or expanding snippets
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed definition file or snippet body
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// An interpolation or `global` block failed
    #[error("evaluation failed: {0}")]
    Eval(#[from] EvalError),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Expand `trigger` from definition text with default settings
///
/// Every snippet in `source` is available regardless of filetype.
pub fn expand(source: &str, trigger: &str) -> Result<Option<Expansion>, Error> {
    let mut library = Library::new();
    library.add_source(ALL, source, "<input>")?;
    let request = ExpandRequest::at_end(trigger, ALL);
    Ok(library.expand(&request)?.map(|session| session.expansion()))
}
