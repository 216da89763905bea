//! Question Model and Validators
//!
//! Type-tagged question variants plus the kind-specific answer rules:
//!
//! - `is_answer_complete` - may the learner submit yet
//! - `score` - is a submitted answer correct
//!
//! Canonical answers arrive as authored JSON strings and are parsed
//! defensively here; a malformed payload is reported to the log and
//! scored incorrect, never propagated as a panic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{QuestionId, BLANK_DELIMITER};

// ==================== Question Kinds ====================

/// The nine supported question kinds plus a catch-all for
/// unrecognized or empty tags. An `Unknown` question can be loaded
/// but never scored correct and is never presented as scoreable
/// content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionKind {
    TrueFalse,
    MultipleChoice,
    ShortAnswer,
    FillBlanks,
    MatchPair,
    MatchImageLabel,
    DragDrop,
    DragDropImage,
    Sorting,
    Unknown,
}

impl QuestionKind {
    /// Map a wire tag to a kind; anything unrecognized (including the
    /// empty string) becomes `Unknown`
    pub fn from_wire(tag: &str) -> Self {
        match tag {
            "true_false" => QuestionKind::TrueFalse,
            "multiple_choice" => QuestionKind::MultipleChoice,
            "short_answer" => QuestionKind::ShortAnswer,
            "fill_blanks" => QuestionKind::FillBlanks,
            "match_pair" => QuestionKind::MatchPair,
            "match_image_label" => QuestionKind::MatchImageLabel,
            "drag_drop" => QuestionKind::DragDrop,
            "drag_drop_image" => QuestionKind::DragDropImage,
            "sorting" => QuestionKind::Sorting,
            _ => QuestionKind::Unknown,
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            QuestionKind::TrueFalse => "true_false",
            QuestionKind::MultipleChoice => "multiple_choice",
            QuestionKind::ShortAnswer => "short_answer",
            QuestionKind::FillBlanks => "fill_blanks",
            QuestionKind::MatchPair => "match_pair",
            QuestionKind::MatchImageLabel => "match_image_label",
            QuestionKind::DragDrop => "drag_drop",
            QuestionKind::DragDropImage => "drag_drop_image",
            QuestionKind::Sorting => "sorting",
            QuestionKind::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, QuestionKind::Unknown)
    }
}

impl From<String> for QuestionKind {
    fn from(tag: String) -> Self {
        QuestionKind::from_wire(&tag)
    }
}

impl From<QuestionKind> for String {
    fn from(kind: QuestionKind) -> Self {
        kind.as_wire().to_string()
    }
}

// ==================== Question Record ====================

/// A question as supplied by the bank provider, immutable for the
/// session. `options` carries the kind-dependent payload: a JSON
/// array of choice strings for multiple-choice, the blank-delimited
/// template text for fill-blanks, nothing for the other kinds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub title: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: Option<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl Question {
    /// Choice texts for a multiple-choice question
    pub fn choice_options(&self) -> Result<Vec<String>, AnswerFormatError> {
        let raw = self.options.as_deref().unwrap_or_default();
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| AnswerFormatError::MalformedJson(e.to_string()))?;
        serde_json::from_value(value).map_err(|_| AnswerFormatError::MalformedOptions)
    }

    /// Template text for a fill-blanks question
    pub fn blanks_template(&self) -> &str {
        self.options.as_deref().unwrap_or_default()
    }

    /// Number of blanks the template asks for
    pub fn blank_count(&self) -> usize {
        self.blanks_template().matches(BLANK_DELIMITER).count()
    }
}

/// One item of an image-ordering answer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderedImage {
    pub id: i64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub label: Option<String>,
}

// ==================== Errors ====================

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AnswerFormatError {
    #[error("question kind is unknown or empty")]
    UnknownKind,
    #[error("canonical answer is not valid JSON: {0}")]
    MalformedJson(String),
    #[error("canonical answer shape does not match kind {}", .kind.as_wire())]
    ShapeMismatch { kind: QuestionKind },
    #[error("raw answer shape does not match kind {}", .kind.as_wire())]
    RawShapeMismatch { kind: QuestionKind },
    #[error("options payload is not a JSON array of strings")]
    MalformedOptions,
}

// ==================== Canonical Answers ====================

/// Parsed, kind-shaped view of a question's stored correct answer
#[derive(Clone, Debug, PartialEq)]
pub enum CanonicalAnswer {
    Boolean(bool),
    ChoiceIndex(i64),
    AcceptableTexts(Vec<String>),
    BlankFills(Vec<String>),
    Pairs(BTreeMap<String, String>),
    ImageLabels(BTreeMap<String, String>),
    Ordering(Vec<String>),
    ImageOrdering(Vec<OrderedImage>),
}

/// Parse the authored `correct_answer` string into the shape its kind
/// requires. Never panics: malformed payloads come back as `Err`.
pub fn parse_canonical(kind: QuestionKind, raw: &str) -> Result<CanonicalAnswer, AnswerFormatError> {
    match kind {
        QuestionKind::TrueFalse => match raw.trim() {
            "true" => Ok(CanonicalAnswer::Boolean(true)),
            "false" => Ok(CanonicalAnswer::Boolean(false)),
            _ => Err(AnswerFormatError::ShapeMismatch { kind }),
        },
        QuestionKind::MultipleChoice => raw
            .trim()
            .parse::<i64>()
            .map(CanonicalAnswer::ChoiceIndex)
            .map_err(|_| AnswerFormatError::ShapeMismatch { kind }),
        QuestionKind::ShortAnswer => match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::String(s)) => Ok(CanonicalAnswer::AcceptableTexts(vec![s])),
            Ok(value @ serde_json::Value::Array(_)) => serde_json::from_value(value)
                .map(CanonicalAnswer::AcceptableTexts)
                .map_err(|_| AnswerFormatError::ShapeMismatch { kind }),
            Ok(_) => Err(AnswerFormatError::ShapeMismatch { kind }),
            // Authors may store a bare, unquoted answer; accept it as
            // the single acceptable text.
            Err(_) => Ok(CanonicalAnswer::AcceptableTexts(vec![raw.to_string()])),
        },
        QuestionKind::FillBlanks => {
            parse_string_list(kind, raw).map(CanonicalAnswer::BlankFills)
        }
        QuestionKind::MatchPair => parse_string_map(kind, raw).map(CanonicalAnswer::Pairs),
        QuestionKind::MatchImageLabel => {
            parse_string_map(kind, raw).map(CanonicalAnswer::ImageLabels)
        }
        QuestionKind::DragDrop | QuestionKind::Sorting => {
            parse_string_list(kind, raw).map(CanonicalAnswer::Ordering)
        }
        QuestionKind::DragDropImage => {
            let value = parse_json(raw)?;
            serde_json::from_value::<Vec<OrderedImage>>(value)
                .map(CanonicalAnswer::ImageOrdering)
                .map_err(|_| AnswerFormatError::ShapeMismatch { kind })
        }
        QuestionKind::Unknown => Err(AnswerFormatError::UnknownKind),
    }
}

fn parse_json(raw: &str) -> Result<serde_json::Value, AnswerFormatError> {
    serde_json::from_str(raw).map_err(|e| AnswerFormatError::MalformedJson(e.to_string()))
}

fn parse_string_list(kind: QuestionKind, raw: &str) -> Result<Vec<String>, AnswerFormatError> {
    let value = parse_json(raw)?;
    serde_json::from_value(value).map_err(|_| AnswerFormatError::ShapeMismatch { kind })
}

fn parse_string_map(
    kind: QuestionKind,
    raw: &str,
) -> Result<BTreeMap<String, String>, AnswerFormatError> {
    let value = parse_json(raw)?;
    serde_json::from_value(value).map_err(|_| AnswerFormatError::ShapeMismatch { kind })
}

// ==================== Raw Answers ====================

/// A learner-provided answer in the shape the interaction surface
/// produces for its kind, before scoring
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RawAnswer {
    /// Selected radio value: "true"/"false" or a choice index
    Choice(String),
    /// Free text
    Text(String),
    /// One entry per blank, in template order
    Blanks(Vec<String>),
    /// Matched left item -> right item
    Pairs(BTreeMap<String, String>),
    /// Image reference -> dropped label
    Labels(BTreeMap<String, String>),
    /// Item texts in the learner's chosen order
    Ordering(Vec<String>),
    /// One entry per answer slot; `None` is a still-empty slot
    ImageOrdering(Vec<Option<OrderedImage>>),
}

impl RawAnswer {
    /// The flattened wire value used in submission payloads: the bare
    /// answer without the kind tag
    pub fn wire_value(&self) -> serde_json::Value {
        match self {
            RawAnswer::Choice(s) | RawAnswer::Text(s) => serde_json::Value::String(s.clone()),
            RawAnswer::Blanks(items) | RawAnswer::Ordering(items) => {
                serde_json::json!(items)
            }
            RawAnswer::Pairs(map) | RawAnswer::Labels(map) => serde_json::json!(map),
            RawAnswer::ImageOrdering(slots) => serde_json::json!(slots),
        }
    }
}

// ==================== Completeness ====================

/// Whether the learner's current answer state is submittable for the
/// question's kind. Re-run on every interaction; submission stays
/// disabled until this holds.
pub fn is_answer_complete(question: &Question, raw: &RawAnswer) -> bool {
    match (question.kind, raw) {
        (QuestionKind::TrueFalse | QuestionKind::MultipleChoice, RawAnswer::Choice(value)) => {
            !value.is_empty()
        }
        (QuestionKind::ShortAnswer, RawAnswer::Text(text)) => !text.is_empty(),
        (QuestionKind::FillBlanks, RawAnswer::Blanks(entries)) => {
            let expected = question.blank_count();
            expected > 0
                && entries.len() == expected
                && entries.iter().all(|entry| !entry.trim().is_empty())
        }
        (QuestionKind::MatchPair, RawAnswer::Pairs(pairs)) => {
            match parse_canonical(question.kind, &question.correct_answer) {
                Ok(CanonicalAnswer::Pairs(canonical)) => {
                    !canonical.is_empty() && pairs.len() == canonical.len()
                }
                _ => false,
            }
        }
        (QuestionKind::MatchImageLabel, RawAnswer::Labels(labels)) => {
            match parse_canonical(question.kind, &question.correct_answer) {
                Ok(CanonicalAnswer::ImageLabels(canonical)) => {
                    !canonical.is_empty()
                        && labels.len() == canonical.len()
                        && labels.values().all(|label| !label.trim().is_empty())
                }
                _ => false,
            }
        }
        (QuestionKind::DragDrop | QuestionKind::Sorting, RawAnswer::Ordering(items)) => {
            match parse_canonical(question.kind, &question.correct_answer) {
                Ok(CanonicalAnswer::Ordering(canonical)) => {
                    !canonical.is_empty() && items.len() == canonical.len()
                }
                _ => false,
            }
        }
        (QuestionKind::DragDropImage, RawAnswer::ImageOrdering(slots)) => {
            !slots.is_empty() && slots.iter().all(|slot| slot.is_some())
        }
        _ => false,
    }
}

// ==================== Scoring ====================

/// Score a submitted answer. Malformed canonical data and shape
/// mismatches are logged and scored incorrect; this function never
/// panics and never aborts a session.
pub fn score(question: &Question, raw: &RawAnswer) -> bool {
    match try_score(question, raw) {
        Ok(correct) => correct,
        Err(err) => {
            log::warn!("question {} cannot be scored: {}", question.id, err);
            false
        }
    }
}

/// Scoring with the failure cause exposed, for callers that want to
/// distinguish "wrong" from "unscorable"
pub fn try_score(question: &Question, raw: &RawAnswer) -> Result<bool, AnswerFormatError> {
    let canonical = parse_canonical(question.kind, &question.correct_answer)?;
    match (&canonical, raw) {
        (CanonicalAnswer::Boolean(expected), RawAnswer::Choice(value)) => {
            let expected = if *expected { "true" } else { "false" };
            Ok(value == expected)
        }
        (CanonicalAnswer::ChoiceIndex(expected), RawAnswer::Choice(value)) => {
            // Loose numeric compare: the selected index may arrive
            // string- or number-typed on the wire.
            Ok(value.trim().parse::<i64>().map_or(false, |v| v == *expected))
        }
        (CanonicalAnswer::AcceptableTexts(accepted), RawAnswer::Text(text)) => {
            Ok(accepted.iter().any(|candidate| eq_fold_trim(candidate, text)))
        }
        (CanonicalAnswer::BlankFills(expected), RawAnswer::Blanks(entries)) => {
            Ok(entries.len() == expected.len()
                && expected
                    .iter()
                    .zip(entries.iter())
                    .all(|(want, got)| eq_fold_trim(want, got)))
        }
        (CanonicalAnswer::Pairs(expected), RawAnswer::Pairs(pairs)) => {
            Ok(pairs.len() == expected.len()
                && expected
                    .iter()
                    .all(|(left, right)| pairs.get(left).map_or(false, |got| got == right)))
        }
        (CanonicalAnswer::ImageLabels(expected), RawAnswer::Labels(labels)) => {
            Ok(labels.len() == expected.len()
                && expected.iter().all(|(image, want)| {
                    labels.get(image).map_or(false, |got| eq_fold_trim(want, got))
                }))
        }
        (CanonicalAnswer::Ordering(expected), RawAnswer::Ordering(items)) => Ok(items == expected),
        (CanonicalAnswer::ImageOrdering(expected), RawAnswer::ImageOrdering(slots)) => {
            // An empty slot anywhere forces the whole answer incorrect.
            Ok(slots.len() == expected.len()
                && expected.iter().zip(slots.iter()).all(|(want, got)| {
                    got.as_ref().map_or(false, |item| item.id == want.id)
                }))
        }
        _ => Err(AnswerFormatError::RawShapeMismatch {
            kind: question.kind,
        }),
    }
}

fn eq_fold_trim(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

// ==================== Feedback Text ====================

/// Display string for the canonical answer, used in feedback when the
/// session is configured to reveal it. Falls back to "Unknown" for
/// unscorable questions.
pub fn correct_answer_text(question: &Question) -> String {
    let canonical = match parse_canonical(question.kind, &question.correct_answer) {
        Ok(canonical) => canonical,
        Err(_) => return "Unknown".to_string(),
    };
    match canonical {
        CanonicalAnswer::Boolean(true) => "True".to_string(),
        CanonicalAnswer::Boolean(false) => "False".to_string(),
        CanonicalAnswer::ChoiceIndex(index) => question
            .choice_options()
            .ok()
            .and_then(|options| usize::try_from(index).ok().and_then(|i| options.get(i).cloned()))
            .unwrap_or_else(|| index.to_string()),
        CanonicalAnswer::AcceptableTexts(texts) => texts.join(" OR "),
        CanonicalAnswer::BlankFills(fills) => fills.join(", "),
        CanonicalAnswer::Pairs(pairs) => pairs
            .iter()
            .map(|(left, right)| format!("{} -> {}", left, right))
            .collect::<Vec<_>>()
            .join(", "),
        CanonicalAnswer::ImageLabels(labels) => {
            labels.values().cloned().collect::<Vec<_>>().join(", ")
        }
        CanonicalAnswer::Ordering(items) => items.join(" -> "),
        CanonicalAnswer::ImageOrdering(items) => {
            if items.is_empty() {
                "Correct Order".to_string()
            } else {
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let label = item
                            .label
                            .clone()
                            .unwrap_or_else(|| format!("Image {}", i + 1));
                        format!("{}. {}", i + 1, label)
                    })
                    .collect::<Vec<_>>()
                    .join("  ")
            }
        }
    }
}

// ==================== Question Bank ====================

/// Question records keyed by id. Slot question lists may reference ids
/// missing from the bank; lookups simply return `None` and callers
/// skip.
#[derive(Clone, Debug, Default)]
pub struct QuestionBank {
    by_id: BTreeMap<QuestionId, Question>,
}

impl QuestionBank {
    pub fn from_records(records: Vec<Question>) -> Self {
        let mut by_id = BTreeMap::new();
        for question in records {
            by_id.insert(question.id, question);
        }
        Self { by_id }
    }

    pub fn get(&self, id: QuestionId) -> Option<&Question> {
        self.by_id.get(&id)
    }

    pub fn contains(&self, id: QuestionId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

// ==================== Tests ====================
