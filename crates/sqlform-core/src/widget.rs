//! Form widget declarations.

use serde::Serialize;

/// Rendering widget a synthesized form field should use.
///
/// The adapter only carries the declaration; rendering itself belongs to the
/// host framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Widget {
    /// Single-line text input.
    TextInput,
    /// Multi-line text area.
    Textarea,
    /// Numeric input.
    NumberInput,
    /// Checkbox.
    CheckboxInput,
    /// Single-choice select.
    Select,
    /// Multiple-choice select.
    SelectMultiple,
    /// Date picker input.
    DateInput,
    /// Time input.
    TimeInput,
    /// Combined date and time input.
    DateTimeInput,
    /// Password input (masked).
    PasswordInput,
    /// Hidden input.
    HiddenInput,
    /// Email input.
    EmailInput,
    /// URL input.
    UrlInput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_serializes_as_name() {
        let json = serde_json::to_value(Widget::Textarea).unwrap();
        assert_eq!(json, serde_json::json!("Textarea"));
    }
}
