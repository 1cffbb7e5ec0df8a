use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

/// The backend's classification of a dialog turn.
///
/// The classification decides which retrieval approach the backend used, and the
/// backend may suggest a different one when a search comes back empty.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ApproachType {
    /// Answered from structured data.
    Structured,

    /// Answered from unstructured documents.
    Unstructured,

    /// Small talk, answered without retrieval.
    ChitChat,

    /// A continuation of the previous turn.
    Continuation,

    /// The question was rejected as inappropriate.
    Inappropriate,
}

impl ApproachType {
    /// The snake_case name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApproachType::Structured => "structured",
            ApproachType::Unstructured => "unstructured",
            ApproachType::ChitChat => "chit_chat",
            ApproachType::Continuation => "continuation",
            ApproachType::Inappropriate => "inappropriate",
        }
    }
}

impl fmt::Display for ApproachType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an invalid approach type string.
#[derive(Debug)]
pub struct ApproachTypeParseError {
    /// The invalid string value that could not be parsed.
    pub invalid_value: String,
}

impl fmt::Display for ApproachTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown approach type: {}", self.invalid_value)
    }
}

impl std::error::Error for ApproachTypeParseError {}

impl FromStr for ApproachType {
    type Err = ApproachTypeParseError;

    /// Accepts the snake_case names, the upper-case enum names, and the numeric codes the
    /// backend emits for suggested classifications.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "structured" | "1" => Ok(ApproachType::Structured),
            "unstructured" | "2" => Ok(ApproachType::Unstructured),
            "chit_chat" | "chitchat" | "3" => Ok(ApproachType::ChitChat),
            "continuation" | "4" => Ok(ApproachType::Continuation),
            "inappropriate" | "5" => Ok(ApproachType::Inappropriate),
            _ => Err(ApproachTypeParseError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

impl Serialize for ApproachType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawApproach {
    Text(String),
    Code(u64),
    Other(de::IgnoredAny),
}

impl RawApproach {
    fn parse(self) -> Option<Result<ApproachType, ApproachTypeParseError>> {
        match self {
            RawApproach::Text(text) => Some(text.parse()),
            RawApproach::Code(code) => Some(code.to_string().parse()),
            RawApproach::Other(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for ApproachType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawApproach::deserialize(deserializer)?.parse() {
            Some(parsed) => parsed.map_err(de::Error::custom),
            None => Err(de::Error::custom("classification must be a string or number")),
        }
    }
}

/// Decode an optional classification, reading values this client does not know as `None`.
///
/// For response fields, where a newer backend classification must not make the whole
/// response unreadable.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Option<ApproachType>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawApproach>::deserialize(deserializer)?
        .and_then(RawApproach::parse)
        .and_then(Result::ok))
}
