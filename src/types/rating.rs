use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Feedback on an answer.
///
/// On the wire a rating is `true`, `false` or `null`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum Rating {
    /// Thumbs up.
    Up,

    /// Thumbs down.
    Down,

    /// No rating.
    #[default]
    Unset,
}

impl Rating {
    /// The boolean-or-unset view of the rating.
    pub fn as_option(&self) -> Option<bool> {
        match self {
            Rating::Up => Some(true),
            Rating::Down => Some(false),
            Rating::Unset => None,
        }
    }

    /// Returns true if no rating has been given.
    pub fn is_unset(&self) -> bool {
        matches!(self, Rating::Unset)
    }
}

impl From<Option<bool>> for Rating {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Rating::Up,
            Some(false) => Rating::Down,
            None => Rating::Unset,
        }
    }
}

impl From<Rating> for Option<bool> {
    fn from(rating: Rating) -> Self {
        rating.as_option()
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rating::Up => write!(f, "thumbs up"),
            Rating::Down => write!(f, "thumbs down"),
            Rating::Unset => write!(f, "unrated"),
        }
    }
}

impl Serialize for Rating {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.as_option().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<bool>::deserialize(deserializer).map(Rating::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form() {
        assert_eq!(serde_json::to_string(&Rating::Up).unwrap(), "true");
        assert_eq!(serde_json::to_string(&Rating::Down).unwrap(), "false");
        assert_eq!(serde_json::to_string(&Rating::Unset).unwrap(), "null");
        let rating: Rating = serde_json::from_str("null").unwrap();
        assert!(rating.is_unset());
    }
}
