//! Indented text dumps of IR.

use std::fmt::{self, Formatter};

#[derive(Debug, Clone)]
pub struct PrettyOptions {
    /// Spaces per nesting level.
    pub indent_size: usize,
    /// Append the source span of every instruction.
    pub show_spans: bool,
    /// Append the lowered type of every instruction result.
    pub show_types: bool,
}

impl Default for PrettyOptions {
    fn default() -> Self {
        Self {
            indent_size: 2,
            show_spans: false,
            show_types: true,
        }
    }
}

/// Writes whole lines at the current nesting depth.
pub struct LineWriter<'a, 'f> {
    f: &'a mut Formatter<'f>,
    pub options: &'a PrettyOptions,
    depth: usize,
}

impl<'a, 'f> LineWriter<'a, 'f> {
    pub fn new(f: &'a mut Formatter<'f>, options: &'a PrettyOptions) -> Self {
        Self {
            f,
            options,
            depth: 0,
        }
    }

    pub fn line(&mut self, text: impl AsRef<str>) -> fmt::Result {
        let width = self.depth * self.options.indent_size;
        writeln!(self.f, "{:width$}{}", "", text.as_ref(), width = width)
    }

    /// Runs `body` one level deeper.
    pub fn nested(&mut self, body: impl FnOnce(&mut Self) -> fmt::Result) -> fmt::Result {
        self.depth += 1;
        let result = body(self);
        self.depth -= 1;
        result
    }
}

pub trait PrettyPrintable {
    fn fmt_pretty(&self, out: &mut LineWriter<'_, '_>) -> fmt::Result;
}

/// `Display` adapter returned by [`pretty`].
pub struct PrettyDisplay<'a, T> {
    value: &'a T,
    options: PrettyOptions,
}

impl<T: PrettyPrintable> fmt::Display for PrettyDisplay<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.value.fmt_pretty(&mut LineWriter::new(f, &self.options))
    }
}

pub fn pretty<T: PrettyPrintable>(value: &T, options: PrettyOptions) -> PrettyDisplay<'_, T> {
    PrettyDisplay { value, options }
}
