//! Role vocabularies for the three places a message identity appears.
//!
//! The same utterance wears three different labels depending on where it is
//! looked at: the storage layer, the model wire format, and the caller-facing
//! API. These are deliberately separate enums with explicit mapping functions
//! so no layer's strings leak into another.

use serde::{Deserialize, Serialize};

/// Role as persisted in the messages table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoredRole {
    /// Authored by the trainee therapist (the human user).
    User,
    /// Authored by the simulated client persona.
    Persona,
}

impl StoredRole {
    /// The tag this role carries in the model request.
    pub fn speaker_tag(self) -> SpeakerTag {
        match self {
            Self::User => SpeakerTag::Therapist,
            Self::Persona => SpeakerTag::Client,
        }
    }

    /// The label this role is exposed under in API responses.
    pub fn display_role(self) -> DisplayRole {
        match self {
            Self::User => DisplayRole::Therapist,
            Self::Persona => DisplayRole::Client,
        }
    }
}

impl std::fmt::Display for StoredRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Persona => write!(f, "persona"),
        }
    }
}

impl std::str::FromStr for StoredRole {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "persona" => Ok(Self::Persona),
            other => Err(format!("unknown stored role: {other}")),
        }
    }
}

/// Speaker tag in the model-facing turn sequence.
///
/// The generative model needs to tell "my own prior utterances" apart from
/// "the therapist's utterances"; these two tags are that distinction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerTag {
    Therapist,
    Client,
}

impl SpeakerTag {
    /// Role string in the Gemini request body.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Therapist => "user",
            Self::Client => "model",
        }
    }
}

/// Role vocabulary exposed to API callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayRole {
    Therapist,
    Client,
}
