use crate::scene::ElementId;

/// Configuration errors raised while constructing or attaching a widget.
///
/// These are fatal for the widget being built: the constructor returns the
/// error and no instance exists afterwards.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The referenced element is not registered in the scene.
    #[error("element {0} is not in the scene")]
    MissingElement(ElementId),

    /// A required attribute is absent.
    #[error("element {element} is missing required attribute `{name}`")]
    MissingAttribute { element: ElementId, name: String },

    /// An attribute is present but cannot be interpreted.
    #[error("attribute `{name}` on element {element} has invalid value `{value}`: {reason}")]
    InvalidAttribute {
        element: ElementId,
        name: String,
        value: String,
        reason: String,
    },

    /// The element tree does not have the shape the widget expects.
    #[error("element {element} must contain exactly {expected} {what}, found {found}")]
    Structure {
        element: ElementId,
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// A trigger kind name that is not recognised.
    #[error("unknown trigger kind `{0}`")]
    UnknownTrigger(String),

    /// A trigger kind that is recognised but meaningless in this position.
    #[error("`{kind}` cannot be used as a {phase} trigger")]
    UnsupportedTrigger { kind: &'static str, phase: &'static str },
}
