//! Scoring & Results Aggregator
//!
//! Folds per-question correctness into the final score and builds the
//! flattened payload handed to the submission collaborator. Also hosts
//! the collaborator-side re-check that grades a submitted answer map
//! against the full quiz definition.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::question::{correct_answer_text, score, QuestionBank, RawAnswer};
use crate::session::AnswerLog;
use crate::types::{QuestionId, QuizDefinition};

// ==================== Session Summary ====================

/// Final score for the questions actually presented and answered.
/// Questions never reached before the video ended are excluded, not
/// penalized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsSummary {
    pub score: u32,
    pub total: u32,
    /// Rounded percent; zero answers short-circuit to 0
    pub percentage: u32,
}

impl ResultsSummary {
    pub fn from_answers(answers: &AnswerLog) -> Self {
        let total = answers.len() as u32;
        let score = answers.correct_count();
        Self {
            score,
            total,
            percentage: percentage(score, total),
        }
    }
}

fn percentage(score: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((score as f64 / total as f64) * 100.0).round() as u32
}

// ==================== Submission Payload ====================

/// What goes to the submission sink: the bare raw answers keyed by
/// question id, without the correctness wrapper
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub quiz_id: u32,
    pub answers: BTreeMap<QuestionId, serde_json::Value>,
}

impl SubmissionPayload {
    pub fn from_answers(quiz_id: u32, answers: &AnswerLog) -> Self {
        let answers = answers
            .iter()
            .map(|(id, record)| (*id, record.raw.wire_value()))
            .collect();
        Self { quiz_id, answers }
    }
}

// ==================== Offline Grading ====================

/// Per-question outcome of an offline grading pass
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub user_answer: Option<serde_json::Value>,
    pub correct_answer: String,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

/// Result of grading a submitted answer map against the definition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradedOutcome {
    pub score: u32,
    pub total: u32,
    pub percentage: u32,
    pub results: Vec<QuestionResult>,
}

/// Grade an answer map the way the submission collaborator re-checks
/// one: walk every slot question present in the bank, treat a missing
/// answer as incorrect. Slot references to unknown bank ids are
/// skipped, never fatal.
pub fn grade_submission(
    definition: &QuizDefinition,
    bank: &QuestionBank,
    answers: &BTreeMap<QuestionId, RawAnswer>,
) -> GradedOutcome {
    let mut total = 0u32;
    let mut correct = 0u32;
    let mut results = Vec::new();

    for slot in &definition.time_slots {
        for &question_id in &slot.question_ids {
            let question = match bank.get(question_id) {
                Some(question) => question,
                None => {
                    log::warn!(
                        "grading: question {} is not in the bank; skipping",
                        question_id
                    );
                    continue;
                }
            };
            total += 1;
            let user_answer = answers.get(&question_id);
            let is_correct = user_answer.map_or(false, |raw| score(question, raw));
            if is_correct {
                correct += 1;
            }
            results.push(QuestionResult {
                question_id,
                user_answer: user_answer.map(RawAnswer::wire_value),
                correct_answer: correct_answer_text(question),
                is_correct,
                explanation: question.explanation.clone(),
            });
        }
    }

    GradedOutcome {
        score: correct,
        total,
        percentage: percentage(correct, total),
        results,
    }
}

// ==================== Tests ====================
