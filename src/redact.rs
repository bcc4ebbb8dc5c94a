//! Secret redaction for PINs and keys in logs and debug output.
//!
//! Wrap values in [`Redacted`] before they reach a `tracing` field, an error
//! message, or serialized output. Every form prints `"<redacted>"`.

use std::fmt::{self, Debug, Display};

/// Wrapper that redacts its inner value when formatted or serialized.
///
/// # Example
///
/// ```ignore
/// use kanban_bridge::redact::Redacted;
///
/// let pin = Redacted("1234".to_string());
/// tracing::debug!(pin = %pin, "Unlocking session");
/// // Logs: pin = <redacted>
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Redacted<T>(pub T);

impl<T> Redacted<T> {
    /// Borrow the secret for the one place that needs it
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> serde::Serialize for Redacted<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        "<redacted>".serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_hides_value_everywhere() {
        let pin = Redacted("2468".to_string());
        assert_eq!(format!("{}", pin), "<redacted>");
        assert_eq!(format!("{:?}", pin), "<redacted>");
        assert_eq!(serde_json::to_string(&pin).unwrap(), "\"<redacted>\"");
        assert_eq!(pin.expose(), "2468");
    }
}
