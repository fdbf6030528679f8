//! Macro constructs recognized in Trellis documents.
//!
//! Every element is classified by its tag name into a [`Construct`]. The
//! preprocessing phases match on this enum instead of comparing tag strings,
//! and anything that is not a macro construct falls through to
//! [`Construct::Element`].

use std::fmt;

/// Attribute names used by the macro constructs.
pub mod attr {
    /// Identifier of a `<Symbol>`.
    pub const ID: &str = "id";
    /// Target of `<Use>`, `<Delete>`, `<Transform>` and `<Import>`.
    pub const HREF: &str = "href";
    /// Attribute set by a `<Transform>`.
    pub const TARGET: &str = "target";
    /// Value written by a `<Transform>`.
    pub const VALUE: &str = "value";
    /// Loop variable of a `<Repeat>`.
    pub const FOR: &str = "for";
    /// Iterable expression of a `<Repeat>`.
    pub const IN: &str = "in";
    /// Condition of an `<If>`.
    pub const CONDITION: &str = "condition";
}

/// The kind of an element, derived from its tag name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Construct {
    /// `<Symbol id="...">`: a named, reusable fragment.
    Symbol,
    /// `<Use href="#...">`: a reference to a fragment.
    Use,
    /// `<Delete href="path">`: removes nodes from one fragment instance.
    Delete,
    /// `<Transform href="path" target="attr" value="v">`: sets an attribute
    /// in one fragment instance.
    Transform,
    /// `<Repeat for="var" in="expr">`: clones its body once per value.
    Repeat,
    /// `<Define>`: sublanguage source executed into the environment.
    Define,
    /// `<If condition="...">`: keeps or discards its subtree.
    If,
    /// `<Import href="file">`: splices another file in place.
    Import,
    /// `<Dummy>`: a transparent wrapper whose children replace it.
    Dummy,
    /// Any other element, copied to the output.
    Element,
}

impl Construct {
    /// Classify an element by its tag name.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "Symbol" => Construct::Symbol,
            "Use" => Construct::Use,
            "Delete" => Construct::Delete,
            "Transform" => Construct::Transform,
            "Repeat" => Construct::Repeat,
            "Define" => Construct::Define,
            "If" => Construct::If,
            "Import" => Construct::Import,
            "Dummy" => Construct::Dummy,
            _ => Construct::Element,
        }
    }

    /// The tag name of this construct, or `None` for ordinary elements.
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Construct::Symbol => Some("Symbol"),
            Construct::Use => Some("Use"),
            Construct::Delete => Some("Delete"),
            Construct::Transform => Some("Transform"),
            Construct::Repeat => Some("Repeat"),
            Construct::Define => Some("Define"),
            Construct::If => Some("If"),
            Construct::Import => Some("Import"),
            Construct::Dummy => Some("Dummy"),
            Construct::Element => None,
        }
    }

    /// Whether splicing this element inserts its children instead of itself.
    pub fn is_transparent(&self) -> bool {
        matches!(self, Construct::Dummy)
    }

    /// Whether this is a macro construct rather than an output element.
    pub fn is_macro(&self) -> bool {
        !matches!(self, Construct::Element)
    }
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag() {
            Some(tag) => write!(f, "<{tag}>"),
            None => write!(f, "element"),
        }
    }
}
