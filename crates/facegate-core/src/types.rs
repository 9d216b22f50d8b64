use crate::{constants::MAX_PAYLOAD_LEN, error::ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of an enrolled person.
///
/// The name doubles as the reference image's file stem and as the payload of
/// an accept frame, so it must be non-empty, usable as a file name and at most
/// [`MAX_PAYLOAD_LEN`] UTF-8 bytes. It is also the first field of an audit
/// line, so commas and control characters are refused. Surrounding
/// whitespace is trimmed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Create a new identity with validation.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] if the trimmed name is empty, contains a
    /// path separator, comma or control character, starts with `.`, or is
    /// longer than 255 bytes.
    pub fn new(name: impl AsRef<str>) -> Result<Self, ValidationError> {
        let name = name.as_ref().trim();

        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if name.starts_with('.')
            || name.contains(['/', '\\', ','])
            || name.chars().any(char::is_control)
        {
            return Err(ValidationError::InvalidCharacters(name.to_string()));
        }
        if name.len() > MAX_PAYLOAD_LEN {
            return Err(ValidationError::NameTooLong {
                len: name.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }

        Ok(Identity(name.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// UTF-8 bytes as carried in an accept frame.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Identity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Identity::new(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Identity::new(value)
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.0
    }
}

/// What a recognition attempt concluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchLabel {
    /// A reference scored at or above the acceptance threshold.
    Identity(Identity),

    /// Nobody scored high enough, or nobody is enrolled.
    Unknown,

    /// There was no usable probe image; the capture failed upstream.
    NoProbe,
}

/// Outcome of scoring one probe against the enrolled references.
///
/// `score` is the best similarity seen, or 0.0 when nothing was scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub label: MatchLabel,
    pub score: f64,
}

impl MatchResult {
    pub fn identity(identity: Identity, score: f64) -> Self {
        Self {
            label: MatchLabel::Identity(identity),
            score,
        }
    }

    pub fn unknown(score: f64) -> Self {
        Self {
            label: MatchLabel::Unknown,
            score,
        }
    }

    pub fn no_probe() -> Self {
        Self {
            label: MatchLabel::NoProbe,
            score: 0.0,
        }
    }

    /// The matched identity, if any.
    #[must_use]
    pub fn matched(&self) -> Option<&Identity> {
        match &self.label {
            MatchLabel::Identity(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_match(&self) -> bool {
        self.matched().is_some()
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.label {
            MatchLabel::Identity(id) => write!(f, "{id} ({:.4})", self.score),
            MatchLabel::Unknown => write!(f, "unknown ({:.4})", self.score),
            MatchLabel::NoProbe => write!(f, "no probe"),
        }
    }
}
