//! Render context for snippet expansion

/// Indentation settings and surrounding text for one expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    /// Display width of a tab character
    pub tabstop: usize,

    /// Width of one indentation level; 0 means "use `tabstop`"
    pub shiftwidth: usize,

    /// Indent with spaces instead of tabs
    pub expandtab: bool,

    /// Base indentation width of the line the snippet expands on
    pub indent: usize,

    /// Untouched text before the trigger on the first line
    pub prefix: String,

    /// Untouched text after the cursor on the last line
    pub suffix: String,

    /// Text selected in the host before expansion, for `${VISUAL}`
    pub visual: Option<String>,

    pub filename: String,
    pub filetype: String,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            tabstop: 8,
            shiftwidth: 4,
            expandtab: true,
            indent: 0,
            prefix: String::new(),
            suffix: String::new(),
            visual: None,
            filename: String::new(),
            filetype: String::new(),
        }
    }
}

impl RenderContext {
    /// Create a new context with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tabstop(mut self, tabstop: usize) -> Self {
        self.tabstop = tabstop;
        self
    }

    pub fn with_shiftwidth(mut self, shiftwidth: usize) -> Self {
        self.shiftwidth = shiftwidth;
        self
    }

    pub fn with_expandtab(mut self, expandtab: bool) -> Self {
        self.expandtab = expandtab;
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn with_visual(mut self, visual: impl Into<String>) -> Self {
        self.visual = Some(visual.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn with_filetype(mut self, filetype: impl Into<String>) -> Self {
        self.filetype = filetype.into();
        self
    }

    /// Effective width of one indentation level
    pub fn shift_width(&self) -> usize {
        if self.shiftwidth == 0 {
            self.tabstop
        } else {
            self.shiftwidth
        }
    }

    /// Whitespace covering `width` columns, tabs first unless `expandtab`
    pub fn indent_string(&self, width: usize) -> String {
        if self.expandtab || self.tabstop == 0 {
            return " ".repeat(width);
        }
        let mut s = "\t".repeat(width / self.tabstop);
        s.push_str(&" ".repeat(width % self.tabstop));
        s
    }
}
