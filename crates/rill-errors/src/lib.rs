use std::fmt::Display;

pub use annotate_snippets::Renderer;
use annotate_snippets::{Level, Snippet};
pub use text_size::{TextRange, TextSize};

/// How serious a diagnostic is.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Severity {
    Error,
    Warning,
}

/// A single problem found while lexing or parsing.
///
/// The range is relative to whatever owns the diagnostic: a diagnostic stored
/// on a token or node is expressed in that node's local coordinates and is
/// re-based with [`Diagnostic::with_offset`] when it is hoisted into an
/// enclosing coordinate space.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Diagnostic {
    severity: Severity,
    message: String,
    range: TextRange,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, range: TextRange) -> Self {
        Self { severity: Severity::Error, message: message.into(), range }
    }

    pub fn warning(message: impl Into<String>, range: TextRange) -> Self {
        Self { severity: Severity::Warning, message: message.into(), range }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn range(&self) -> TextRange {
        self.range
    }

    /// Re-expresses this diagnostic in the coordinates of an enclosing owner
    /// that starts `offset` bytes before the current one.
    pub fn with_offset(&self, offset: TextSize) -> Self {
        Self { severity: self.severity, message: self.message.clone(), range: self.range + offset }
    }

    /// Rendering only makes sense for diagnostics whose range is absolute.
    pub fn render<'a>(
        &'a self,
        renderer: &'a Renderer,
        path: &'a str,
        text: &'a str,
    ) -> impl Display + 'a {
        let level = match self.severity {
            Severity::Error => Level::Error,
            Severity::Warning => Level::Warning,
        };
        let message = level.title(&self.message).snippet(
            Snippet::source(text)
                .origin(path)
                .annotation(level.span(self.range.into()).label("here"))
                .fold(true),
        );
        renderer.render(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebase_shifts_range() {
        let diagnostic = Diagnostic::error("oops", TextRange::new(2.into(), 4.into()));
        let rebased = diagnostic.with_offset(10.into());
        assert_eq!(rebased.range(), TextRange::new(12.into(), 14.into()));
        assert_eq!(rebased.message(), "oops");
        assert_eq!(rebased.severity(), Severity::Error);
    }
}
