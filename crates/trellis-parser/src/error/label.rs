//! Labeled source locations for diagnostic messages.
//!
//! A label associates a message with the element that caused a diagnostic.
//! The element's [`Origin`] carries its file, byte span and line, so the
//! renderer can show the offending start tag.

use trellis_core::Origin;

/// A labeled location in a source file.
///
/// # Primary vs Secondary Labels
///
/// - **Primary labels** mark the main location of an error or warning.
///   There should typically be one primary label per diagnostic.
/// - **Secondary labels** provide additional context, such as "first defined here".
///
/// Elements created by the preprocessor itself have no origin; a label for
/// such an element keeps only its message.
#[derive(Debug, Clone)]
pub struct Label {
    origin: Option<Origin>,
    message: String,
    is_primary: bool,
}

impl Label {
    /// Create a new primary label.
    pub fn primary(origin: Option<Origin>, message: impl Into<String>) -> Self {
        Self {
            origin,
            message: message.into(),
            is_primary: true,
        }
    }

    /// Create a new secondary label.
    pub fn secondary(origin: Option<Origin>, message: impl Into<String>) -> Self {
        Self {
            origin,
            message: message.into(),
            is_primary: false,
        }
    }

    /// Get the location this label applies to.
    pub fn origin(&self) -> Option<Origin> {
        self.origin
    }

    /// Get the label message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Check if this is a primary label.
    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    /// Check if this is a secondary label.
    pub fn is_secondary(&self) -> bool {
        !self.is_primary
    }
}

#[cfg(test)]
mod tests {
    use trellis_core::{SourceMap, Span};

    use super::*;

    #[test]
    fn test_primary_label() {
        let mut sources = SourceMap::new();
        let file = sources.add("main.xml", "<Root/>");
        let label = Label::primary(Some(Origin::new(file, Span::new(10..20), 2)), "error here");

        let origin = label.origin().expect("label has an origin");
        assert_eq!(origin.span().start(), 10);
        assert_eq!(origin.line(), 2);
        assert_eq!(label.message(), "error here");
        assert!(label.is_primary());
        assert!(!label.is_secondary());
    }

    #[test]
    fn test_secondary_label_without_origin() {
        let label = Label::secondary(None, "generated element");

        assert!(label.origin().is_none());
        assert!(label.is_secondary());
    }
}
