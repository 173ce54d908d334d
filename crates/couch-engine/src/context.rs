//! Context assembly: persisted history becomes the model-facing turn
//! sequence.

use couch_core::roles::StoredRole;
use couch_core::turns::Turn;
use couch_store::messages::MessageRow;

/// Map persisted messages to prior turns, preserving commit order exactly.
///
/// The new user utterance is not part of the result: it travels to the
/// gateway as the final turn of the stateful-continuation call, and is not
/// committed to storage until generation succeeds.
pub fn assemble(history: &[MessageRow]) -> Vec<Turn> {
    history
        .iter()
        .map(|msg| Turn {
            tag: msg.role.speaker_tag(),
            text: msg.content.clone(),
        })
        .collect()
}

/// Count of therapist-authored messages in the persisted history.
/// The orchestrator adds one for the in-flight message before deriving the
/// phase, so boundaries apply to the very message that crosses them.
pub fn user_turn_count(history: &[MessageRow]) -> u32 {
    history
        .iter()
        .filter(|msg| msg.role == StoredRole::User)
        .count() as u32
}
