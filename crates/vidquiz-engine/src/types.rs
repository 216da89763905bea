//! Common Types and Constants
//!
//! Shared data structures used across the engine modules.

use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Delimiter marking a blank inside a fill-in-the-blanks template
pub const BLANK_DELIMITER: &str = "_____";

/// Fallback delay before auto-advancing to the next question in a slot
pub const AUTO_ADVANCE_DELAY_MS: u64 = 5_000;

/// Auto-resume delay after the slot's last answer was correct
pub const RESUME_DELAY_CORRECT_MS: u64 = 30_000;

/// Auto-resume delay after the slot's last answer was incorrect
pub const RESUME_DELAY_INCORRECT_MS: u64 = 25_000;

// ==================== Identifiers ====================

/// Stable question identifier, unique across the question bank
pub type QuestionId = u32;

// ==================== Time Slots ====================

/// Authoring unit for a time-slot trigger
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
}

impl TimeUnit {
    /// Convert an authored value in this unit to canonical seconds
    pub fn to_seconds(self, value: f64) -> f64 {
        match self {
            TimeUnit::Seconds => value,
            TimeUnit::Minutes => value * 60.0,
            TimeUnit::Hours => value * 3600.0,
        }
    }
}

/// A playback-time threshold paired with the ordered questions to
/// present once that threshold is crossed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Elapsed-time threshold in canonical seconds (non-negative)
    pub trigger_seconds: f64,
    /// Presentation order of the slot's questions
    pub question_ids: Vec<QuestionId>,
}

impl TimeSlot {
    /// Create a slot from a threshold already expressed in seconds
    pub fn new(trigger_seconds: f64, question_ids: Vec<QuestionId>) -> Self {
        Self {
            trigger_seconds: trigger_seconds.max(0.0),
            question_ids,
        }
    }

    /// Create a slot from an authored value + unit, normalizing to
    /// seconds at the boundary
    pub fn authored(value: f64, unit: TimeUnit, question_ids: Vec<QuestionId>) -> Self {
        Self::new(unit.to_seconds(value), question_ids)
    }
}

// ==================== Quiz Definition ====================

/// Opaque video reference; the engine never interprets it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRef {
    /// Provider tag, e.g. "youtube", "vimeo", "mp4"
    pub provider: String,
    /// Provider-specific URL or embeddable id
    pub source: String,
}

/// The quiz a session plays: a video plus its time slots
///
/// Slot order in the vector is irrelevant to triggering; activation is
/// decided by threshold comparison alone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuizDefinition {
    pub quiz_id: u32,
    pub video: VideoRef,
    pub time_slots: Vec<TimeSlot>,
}

// ==================== Settings ====================

/// Session configuration, supplied once at start and immutable after
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizSettings {
    /// Whether the learner may skip a presented question
    pub allow_skipping: bool,
    /// Whether feedback may include the canonical answer text
    pub show_correct_answers: bool,
    /// Optional message shown on the results overlay
    pub completion_message: Option<String>,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            allow_skipping: false,
            show_correct_answers: true,
            completion_message: None,
        }
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_unit_to_seconds() {
        assert_eq!(TimeUnit::Seconds.to_seconds(45.0), 45.0);
        assert_eq!(TimeUnit::Minutes.to_seconds(2.0), 120.0);
        assert_eq!(TimeUnit::Hours.to_seconds(1.5), 5400.0);
    }

    #[test]
    fn test_authored_slot_normalizes_to_seconds() {
        let slot = TimeSlot::authored(3.0, TimeUnit::Minutes, vec![1, 2]);
        assert_eq!(slot.trigger_seconds, 180.0);
        assert_eq!(slot.question_ids, vec![1, 2]);
    }

    #[test]
    fn test_negative_trigger_clamps_to_zero() {
        let slot = TimeSlot::new(-5.0, vec![]);
        assert_eq!(slot.trigger_seconds, 0.0);
    }

    #[test]
    fn test_settings_default() {
        let settings = QuizSettings::default();
        assert!(!settings.allow_skipping);
        assert!(settings.show_correct_answers);
        assert!(settings.completion_message.is_none());
    }

    #[test]
    fn test_settings_deserialize_partial() {
        let settings: QuizSettings = serde_json::from_str(r#"{"allow_skipping": true}"#).unwrap();
        assert!(settings.allow_skipping);
        assert!(settings.show_correct_answers);
    }
}
