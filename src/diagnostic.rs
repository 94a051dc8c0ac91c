use crate::span::Span;

/// An input error pointing into the text that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(message: String, span: Span) -> Self {
        Self {
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    /// Shift the span, for diagnostics raised on a substring.
    pub fn offset(mut self, offset: usize) -> Self {
        self.span = self.span.offset(offset);
        self
    }

    /// Render the diagnostic to stderr using ariadne.
    ///
    /// `origin` names where the text came from (`"<braid>"`, `"--target"`).
    pub fn render(&self, origin: &str, source: &str) {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        let end = (self.span.end as usize).min(source.len());
        let start = (self.span.start as usize).min(end);

        let mut report = Report::build(ReportKind::Error, origin, start)
            .with_message(&self.message)
            .with_label(
                Label::new((origin, start..end))
                    .with_message(&self.message)
                    .with_color(Color::Red),
            );

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        // stderr may be closed; nothing useful to do about it
        let _ = report.finish().eprint((origin, Source::from(source)));
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (at {}..{})", self.message, self.span.start, self.span.end)?;
        if let Some(help) = &self.help {
            write!(f, "; help: {}", help)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let d = Diagnostic::error("generator out of range".to_string(), Span::new(10, 15));
        assert_eq!(d.message, "generator out of range");
        assert_eq!(d.span.start, 10);
        assert_eq!(d.span.end, 15);
        assert!(d.notes.is_empty());
        assert!(d.help.is_none());
    }

    #[test]
    fn test_chained_builders() {
        let d = Diagnostic::error("hint".to_string(), Span::new(0, 5))
            .with_note("note 1".to_string())
            .with_help("help text".to_string())
            .with_note("note 2".to_string());
        assert_eq!(d.notes.len(), 2);
        assert_eq!(d.help.as_deref(), Some("help text"));
    }

    #[test]
    fn test_offset_shifts_span() {
        let d = Diagnostic::error("bad".to_string(), Span::new(1, 2)).offset(7);
        assert_eq!(d.span, Span::new(8, 9));
    }

    #[test]
    fn test_display_includes_help() {
        let d = Diagnostic::error("zero is not a generator".to_string(), Span::new(2, 3))
            .with_help("use 1..n-1 or -1..-(n-1)".to_string());
        let text = d.to_string();
        assert!(text.contains("zero is not a generator"));
        assert!(text.contains("help: use"));
    }

    #[test]
    fn test_render_does_not_panic() {
        let source = "1 -2 0 3";
        let d = Diagnostic::error("zero is not a generator".to_string(), Span::new(5, 6))
            .with_note("generators are signed strand indices".to_string());
        d.render("<braid>", source);
    }

    #[test]
    fn test_render_clamps_span_past_end() {
        let d = Diagnostic::error("unexpected end".to_string(), Span::new(40, 50));
        d.render("<braid>", "1 2");
    }
}
