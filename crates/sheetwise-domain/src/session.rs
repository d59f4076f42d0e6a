//! Document-processing session identifiers

use std::fmt;

/// Identifier of one document-processing session, based on UUIDv7
///
/// A new session starts every time the document index is rebuilt. UUIDv7
/// ordering means a later session always compares greater than an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u128);

impl SessionId {
    /// Generate a new session id
    ///
    /// # Examples
    ///
    /// ```
    /// use sheetwise_domain::SessionId;
    ///
    /// let id = SessionId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a SessionId from a raw u128 value
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a SessionId from its hyphenated string form
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid session id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }

    /// Milliseconds since Unix epoch at which the session started
    pub fn timestamp(&self) -> u64 {
        (self.0 >> 80) as u64
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_chronological() {
        let first = SessionId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = SessionId::new();

        assert!(first < second);
        assert!(first.timestamp() <= second.timestamp());
    }

    #[test]
    fn test_session_id_display_and_parse() {
        let id = SessionId::new();
        let text = id.to_string();
        assert_eq!(text.len(), 36);
        assert_eq!(SessionId::from_string(&text).unwrap(), id);
    }

    #[test]
    fn test_session_id_invalid_string() {
        assert!(SessionId::from_string("session-one").is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_session_string_roundtrip(value: u128) {
            let id = SessionId::from_value(value);
            match SessionId::from_string(&id.to_string()) {
                Ok(parsed) => prop_assert_eq!(id, parsed),
                Err(e) => return Err(TestCaseError::fail(e)),
            }
        }
    }
}
