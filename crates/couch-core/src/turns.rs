use serde::{Deserialize, Serialize};

use crate::roles::SpeakerTag;

/// One model-facing turn: a speaker tag plus the utterance text.
///
/// Turns are what the gateway receives as established context. They carry the
/// model vocabulary, never the storage or display one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub tag: SpeakerTag,
    pub text: String,
}

impl Turn {
    pub fn therapist(text: impl Into<String>) -> Self {
        Self {
            tag: SpeakerTag::Therapist,
            text: text.into(),
        }
    }

    pub fn client(text: impl Into<String>) -> Self {
        Self {
            tag: SpeakerTag::Client,
            text: text.into(),
        }
    }
}
