use serde_json::Value;

/// Failures surfaced by the overlay engine.
///
/// Per-entry geometry problems are not errors: the affected entry is skipped
/// and counted in the reconciliation summary.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A dataset did not have the shape the layer requires.
    InputShape {
        layer: String,
        expected: &'static str,
        found: String,
    },
    /// A required capability is missing or misconfigured.
    Configuration(String),
    UnknownLayer(String),
    OptionsMismatch { layer: String },
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InputShape {
                layer,
                expected,
                found,
            } => {
                write!(f, "{layer} data must be {expected}, found {found}")
            }
            EngineError::Configuration(msg) => write!(f, "map configuration error: {msg}"),
            EngineError::UnknownLayer(name) => write!(f, "no renderer registered for layer `{name}`"),
            EngineError::OptionsMismatch { layer } => {
                write!(f, "options supplied to layer `{layer}` have the wrong type")
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// A popup template failed to produce content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateError(pub String);

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "popup template failed: {}", self.0)
    }
}

impl std::error::Error for TemplateError {}

/// Short description of a JSON value's type, for error messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
