//! Behavioral phase derivation.
//!
//! The persona's guardedness is a pure function of how many therapist turns
//! have passed, never stored: it must always reflect the live count,
//! including the in-flight message being answered.

use serde::{Deserialize, Serialize};

/// Number of therapist turns after which the persona winds the session down.
pub const WRAP_UP_INTERVAL: u32 = 35;

/// Discrete behavioral stage of the simulated client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Guarded,
    WarmingUp,
    Vulnerable,
}

impl Phase {
    /// Derive the phase for a 1-indexed therapist turn number.
    ///
    /// The orchestrator counts the message about to be sent, so the boundary
    /// applies to the very turn that crosses it: turn 21 is already
    /// WarmingUp, turn 41 already Vulnerable.
    pub fn for_turn(turn_count: u32) -> Self {
        debug_assert!(turn_count >= 1, "turn numbers are 1-indexed");
        match turn_count {
            0..=20 => Self::Guarded,
            21..=40 => Self::WarmingUp,
            _ => Self::Vulnerable,
        }
    }

    /// Label injected into the system instruction. A fixed vocabulary, so the
    /// model gets a machine-consistent signal rather than inferring its stage
    /// from raw history length.
    pub fn label(self) -> &'static str {
        match self {
            Self::Guarded => "Phase 1: Guarded",
            Self::WarmingUp => "Phase 2: Warming Up",
            Self::Vulnerable => "Phase 3: Vulnerable",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Guarded => write!(f, "guarded"),
            Self::WarmingUp => write!(f, "warming_up"),
            Self::Vulnerable => write!(f, "vulnerable"),
        }
    }
}

/// True when the session-length advisory should be injected for this turn.
/// Soft timeout only: expressed through instruction content, the orchestrator
/// never closes a session itself.
pub fn wrap_up_due(turn_count: u32) -> bool {
    turn_count > 0 && turn_count % WRAP_UP_INTERVAL == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries() {
        assert_eq!(Phase::for_turn(1), Phase::Guarded);
        assert_eq!(Phase::for_turn(20), Phase::Guarded);
        assert_eq!(Phase::for_turn(21), Phase::WarmingUp);
        assert_eq!(Phase::for_turn(40), Phase::WarmingUp);
        assert_eq!(Phase::for_turn(41), Phase::Vulnerable);
        assert_eq!(Phase::for_turn(500), Phase::Vulnerable);
    }

    #[test]
    fn monotonically_non_decreasing() {
        let mut prev = Phase::for_turn(1);
        for t in 2..200 {
            let cur = Phase::for_turn(t);
            assert!(cur >= prev, "phase regressed at turn {t}");
            prev = cur;
        }
    }

    #[test]
    fn transitions_exactly_at_21_and_41() {
        // The only turns whose phase differs from the previous turn's.
        let transition_points: Vec<u32> = (2..200)
            .filter(|&t| Phase::for_turn(t) != Phase::for_turn(t - 1))
            .collect();
        assert_eq!(transition_points, vec![21, 41]);
    }

    #[test]
    fn wrap_up_every_35_turns() {
        assert!(!wrap_up_due(1));
        assert!(!wrap_up_due(34));
        assert!(wrap_up_due(35));
        assert!(!wrap_up_due(36));
        assert!(wrap_up_due(70));
        assert!(wrap_up_due(105));
        assert!(!wrap_up_due(0));
    }

    #[test]
    fn labels_are_distinct() {
        let labels = [
            Phase::Guarded.label(),
            Phase::WarmingUp.label(),
            Phase::Vulnerable.label(),
        ];
        assert_eq!(labels.len(), 3);
        assert_ne!(labels[0], labels[1]);
        assert_ne!(labels[1], labels[2]);
    }

    #[test]
    fn phase_serde() {
        assert_eq!(serde_json::to_string(&Phase::Guarded).unwrap(), r#""guarded""#);
        assert_eq!(serde_json::to_string(&Phase::WarmingUp).unwrap(), r#""warming_up""#);
        assert_eq!(serde_json::to_string(&Phase::Vulnerable).unwrap(), r#""vulnerable""#);
    }
}
