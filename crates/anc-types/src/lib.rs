//! Validated text types shared across the ANC crates.
//!
//! These types are checked once at the boundary (API request, CLI argument) so the rest of the
//! system can rely on their invariants without re-validating.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The input text exceeded the maximum permitted length
    #[error("Text exceeds maximum length of {max} characters")]
    TooLong { max: usize },
}

/// Stable identifier assigned to a pregnancy at registration.
///
/// Correlates the registration with every visit report. Any text is accepted once trimmed, as
/// long as it is non-empty and at most [`PregnancyId::MAX_LEN`] characters. Stores must not use
/// it as a path component directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PregnancyId(String);

impl PregnancyId {
    pub const MAX_LEN: usize = 128;

    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        if trimmed.chars().count() > Self::MAX_LEN {
            return Err(TextError::TooLong { max: Self::MAX_LEN });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PregnancyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl serde::Serialize for PregnancyId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for PregnancyId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PregnancyId::new(&s).map_err(serde::de::Error::custom)
    }
}
