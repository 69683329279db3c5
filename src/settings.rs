//! TOML settings for the command line front end
//!
//! ```toml
//! [indent]
//! tabstop = 8
//! shiftwidth = 4
//! expandtab = true
//!
//! [shell]
//! enabled = true
//! program = "sh"
//! timeout_ms = 5000
//!
//! [library]
//! files = ["snippets/python.snippets", "snippets/all.snippets"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::interpolation::{Evaluators, ShellRunner};
use crate::renderer::RenderContext;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse settings TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub tabstop: usize,
    pub shiftwidth: usize,
    pub expandtab: bool,
    pub shell_enabled: bool,
    pub shell_program: String,
    pub shell_timeout: Duration,
    /// Definition files to load, in order
    pub files: Vec<PathBuf>,
}

#[derive(Deserialize)]
struct TomlSettings {
    indent: Option<TomlIndent>,
    shell: Option<TomlShell>,
    library: Option<TomlLibrary>,
}

#[derive(Deserialize)]
struct TomlIndent {
    tabstop: Option<usize>,
    shiftwidth: Option<usize>,
    expandtab: Option<bool>,
}

#[derive(Deserialize)]
struct TomlShell {
    enabled: Option<bool>,
    program: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Deserialize)]
struct TomlLibrary {
    #[serde(default)]
    files: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let context = RenderContext::default();
        let shell = ShellRunner::default();
        Self {
            tabstop: context.tabstop,
            shiftwidth: context.shiftwidth,
            expandtab: context.expandtab,
            shell_enabled: shell.enabled,
            shell_program: shell.program,
            shell_timeout: shell.timeout,
            files: Vec::new(),
        }
    }
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse settings, keeping defaults for anything not given
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, SettingsError> {
        let parsed: TomlSettings = toml::from_str(content)?;
        let mut settings = Self::default();

        if let Some(indent) = parsed.indent {
            settings.tabstop = indent.tabstop.unwrap_or(settings.tabstop);
            settings.shiftwidth = indent.shiftwidth.unwrap_or(settings.shiftwidth);
            settings.expandtab = indent.expandtab.unwrap_or(settings.expandtab);
        }
        if let Some(shell) = parsed.shell {
            settings.shell_enabled = shell.enabled.unwrap_or(settings.shell_enabled);
            if let Some(program) = shell.program {
                settings.shell_program = program;
            }
            if let Some(ms) = shell.timeout_ms {
                settings.shell_timeout = Duration::from_millis(ms);
            }
        }
        if let Some(library) = parsed.library {
            settings.files = library.files;
        }

        Ok(settings)
    }

    /// Render context carrying the indentation settings
    pub fn render_context(&self) -> RenderContext {
        RenderContext::new()
            .with_tabstop(self.tabstop)
            .with_shiftwidth(self.shiftwidth)
            .with_expandtab(self.expandtab)
    }

    pub fn shell_runner(&self) -> ShellRunner {
        let runner = if self.shell_enabled {
            ShellRunner::new()
        } else {
            ShellRunner::disabled()
        };
        runner
            .with_program(self.shell_program.clone())
            .with_timeout(self.shell_timeout)
    }

    pub fn evaluators(&self) -> Evaluators {
        Evaluators::new().with_shell(self.shell_runner())
    }
}

/// Filetype a definition file belongs to: `python.snippets` and
/// `python_django.snippets` both belong to `python`
pub fn filetype_of(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.split_once('_') {
        Some((filetype, _)) if !filetype.is_empty() => filetype.to_string(),
        _ => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.shell_timeout, Duration::from_secs(5));
        assert!(settings.files.is_empty());
    }

    #[test]
    fn test_parse_all_sections() {
        let toml = r#"
[indent]
tabstop = 4
shiftwidth = 2
expandtab = false

[shell]
enabled = false
timeout_ms = 250

[library]
files = ["a.snippets", "b/c.snippets"]
"#;
        let settings = Settings::from_str(toml).unwrap();
        assert_eq!(settings.tabstop, 4);
        assert_eq!(settings.shiftwidth, 2);
        assert!(!settings.expandtab);
        assert!(!settings.shell_enabled);
        assert_eq!(settings.shell_timeout, Duration::from_millis(250));
        assert_eq!(
            settings.files,
            vec![PathBuf::from("a.snippets"), PathBuf::from("b/c.snippets")]
        );

        let context = settings.render_context();
        assert_eq!(context.indent_string(6), "\t  ");
        assert!(!settings.shell_runner().enabled);
    }

    #[test]
    fn test_invalid_toml_error() {
        let err = Settings::from_str("[indent\ntabstop = ").unwrap_err();
        assert!(matches!(err, SettingsError::Toml(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snips.toml");
        std::fs::write(&path, "[indent]\nshiftwidth = 8\n").unwrap();
        assert_eq!(Settings::from_file(&path).unwrap().shiftwidth, 8);
        assert!(matches!(
            Settings::from_file(&dir.path().join("missing.toml")),
            Err(SettingsError::Io(_))
        ));
    }

    #[test]
    fn test_filetype_of() {
        assert_eq!(filetype_of(Path::new("snippets/python.snippets")), "python");
        assert_eq!(filetype_of(Path::new("python_django.snippets")), "python");
        assert_eq!(filetype_of(Path::new("all.snippets")), "all");
    }
}
