//! Snippet prototypes and their placeholder registry

mod registry;
mod snippet;

pub use registry::Registry;
pub use snippet::{Snippet, SnippetTree};
