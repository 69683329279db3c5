//! Per-line indentation normalisation of rendered text
//!
//! Leading tabs in a snippet body stand for indentation levels. Each level
//! becomes one shift-width, written with the host's tabs-vs-spaces setting.
//! Lines after the first also receive the base indentation of the line the
//! snippet expands on; the first line receives the prefix instead.

use super::RenderContext;

/// How the leading whitespace of one line changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineShift {
    first: bool,
    old_lead: usize,
    new_lead: usize,
}

impl LineShift {
    /// Map a pre-normalisation column on this line to its final column
    pub fn map(&self, column: usize, context: &RenderContext) -> usize {
        if column >= self.old_lead {
            column - self.old_lead + self.new_lead
        } else {
            lead(self.first, column, context).len()
        }
    }
}

fn lead(first: bool, levels: usize, context: &RenderContext) -> String {
    let width = levels * context.shift_width();
    if first {
        format!("{}{}", context.prefix, context.indent_string(width))
    } else {
        context.indent_string(context.indent + width)
    }
}

/// Normalise every line of `text`, returning the new text and one shift per line
pub fn normalize(text: &str, context: &RenderContext) -> (String, Vec<LineShift>) {
    let mut out = String::with_capacity(text.len() + context.prefix.len());
    let mut shifts = Vec::new();

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let tabs = line.bytes().take_while(|&b| b == b'\t').count();
        let new_lead = lead(i == 0, tabs, context);
        out.push_str(&new_lead);
        out.push_str(&line[tabs..]);
        shifts.push(LineShift {
            first: i == 0,
            old_lead: tabs,
            new_lead: new_lead.len(),
        });
    }

    (out, shifts)
}
