//! Notification classification and trigger-phrase detection.

use crate::models::{NotificationType, SignalState};

const NEGATIVE_KEYWORDS: &[&str] = &[
    "accident",
    "delay",
    "traffic",
    "camera",
    "reduce speed",
    "weather",
];

const POSITIVE_KEYWORDS: &[&str] = &["speed up", "green", "clear road", "faster"];

/// Banner text shown in place of an accident message.
pub const ACCIDENT_BANNER: &str = "Accident Ahead! Rerouting!";

/// Side effects a notification message can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Reroute away from an accident.
    AccidentReroute,
    /// Reroute to the terminal's parking area.
    ParkingAvailable,
    /// Stop at a rest area.
    PullOver,
}

/// Classify a message, preferring an explicit upstream signal state.
///
/// The state wins even when the text reads the other way (a "clear road"
/// message tagged red is negative).
pub fn classify(message: &str, state: Option<SignalState>) -> NotificationType {
    match state {
        Some(state) => state.notification_type(),
        None => classify_text(message),
    }
}

/// Keyword scan of free text; negative keywords take precedence.
pub fn classify_text(message: &str) -> NotificationType {
    let lower = message.to_lowercase();
    if NEGATIVE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        NotificationType::Negative
    } else if POSITIVE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        NotificationType::Positive
    } else {
        NotificationType::Neutral
    }
}

/// Trigger phrases contained in `message`, in the order they fire.
pub fn triggers(message: &str) -> Vec<Trigger> {
    let lower = message.to_lowercase();
    let mut found = Vec::new();

    if lower.contains("accident") {
        found.push(Trigger::AccidentReroute);
    }
    // Case-sensitive on purpose: "no parking available" must not reroute.
    if message.contains("Parking available") {
        found.push(Trigger::ParkingAvailable);
    }
    if lower.contains("pull over near rest area") {
        found.push(Trigger::PullOver);
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_code_wins_over_text() {
        assert_eq!(
            classify("Clear road ahead", Some(SignalState::Red)),
            NotificationType::Negative
        );
        assert_eq!(
            classify("Heavy traffic", Some(SignalState::Green)),
            NotificationType::Positive
        );
    }

    #[test]
    fn test_keyword_classification() {
        assert_eq!(classify_text("Bad Weather"), NotificationType::Negative);
        assert_eq!(classify_text("Speed camera ahead"), NotificationType::Negative);
        assert_eq!(
            classify_text("Speed up! Green signal ahead"),
            NotificationType::Positive
        );
        assert_eq!(classify_text("Maintain lane for 1 mile"), NotificationType::Neutral);
    }

    #[test]
    fn test_negative_keyword_beats_positive() {
        assert_eq!(
            classify_text("Traffic signal turning green"),
            NotificationType::Negative
        );
    }

    #[test]
    fn test_airport_messages_trigger_actions() {
        assert_eq!(
            triggers("Aircraft delayed. Parking available at Terminal B."),
            vec![Trigger::ParkingAvailable]
        );
        assert_eq!(
            triggers("Aircraft delayed & no parking available. Pull over near rest area!"),
            vec![Trigger::PullOver]
        );
        assert_eq!(
            triggers("Please pull over near rest area!"),
            vec![Trigger::PullOver]
        );
        assert!(triggers("Aircraft is on time. Proceed to Bay Area at Terminal A.").is_empty());
    }

    #[test]
    fn test_accident_trigger_is_case_insensitive() {
        assert_eq!(triggers("Accident Ahead"), vec![Trigger::AccidentReroute]);
        assert_eq!(
            triggers("accident reported - Rerouting!"),
            vec![Trigger::AccidentReroute]
        );
    }
}
