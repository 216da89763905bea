//! Quiz Session State Machine
//!
//! The central component. Tracks the active slot, the question cursor,
//! the answered set and the per-question answer records, and drives
//! the transitions between playing, awaiting an answer, scored and
//! completed.
//!
//! The machine is a pure event-driven core: every input event returns
//! an ordered list of [`Effect`] commands for the host to execute.
//! Pausing is always issued before a question surface is shown, and
//! playback resumes only once the active slot's questions are
//! exhausted. Timers never live inside the engine; it asks the host to
//! start one with a token and ignores any token that is no longer
//! armed, so a stale auto-advance can never race a user action into a
//! double transition.

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::question::{
    correct_answer_text, is_answer_complete, score, QuestionBank, RawAnswer,
};
use crate::render::{QuestionRenderer, QuestionSurface, RendererOptions};
use crate::results::{ResultsSummary, SubmissionPayload};
use crate::scheduler::TimeSlotScheduler;
use crate::types::{
    QuestionId, QuizDefinition, QuizSettings, AUTO_ADVANCE_DELAY_MS, RESUME_DELAY_CORRECT_MS,
    RESUME_DELAY_INCORRECT_MS,
};

// ==================== Timers ====================

/// Opaque handle for a host-side timer
pub type TimerToken = u32;

/// What a timer will do when it fires, so hosts can label it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPurpose {
    AdvanceQuestion,
    ResumeVideo,
}

/// Which continuation the feedback surface offers the learner
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContinuationKind {
    NextQuestion,
    ResumeVideo,
}

// ==================== Answer Records ====================

/// The stored outcome for one answered question
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub raw: RawAnswer,
    pub is_correct: bool,
}

/// Answer records in answer order. Writing an id twice replaces the
/// record in place (last write wins), though the already-submitted
/// guard keeps that from happening during a session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnswerLog {
    entries: Vec<(QuestionId, AnswerRecord)>,
}

impl AnswerLog {
    pub fn insert(&mut self, id: QuestionId, record: AnswerRecord) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = record,
            None => self.entries.push((id, record)),
        }
    }

    pub fn get(&self, id: QuestionId) -> Option<&AnswerRecord> {
        self.entries
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, record)| record)
    }

    pub fn contains(&self, id: QuestionId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(QuestionId, AnswerRecord)> {
        self.entries.iter()
    }

    pub fn correct_count(&self) -> u32 {
        self.entries
            .iter()
            .filter(|(_, record)| record.is_correct)
            .count() as u32
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ==================== Effects ====================

/// A command for the host to execute, in order. The engine issues
/// pause before any question surface and play only on resumption.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    PauseVideo,
    PlayVideo,
    SeekToStart,
    ShowQuestion {
        question_id: QuestionId,
        surface: QuestionSurface,
        can_skip: bool,
    },
    /// Shown in place of a question whose payload failed to render;
    /// the learner can always move forward past it
    ShowInlineError {
        question_id: QuestionId,
        message: String,
        can_skip: bool,
    },
    SetSubmitEnabled {
        enabled: bool,
    },
    ShowFeedback {
        question_id: QuestionId,
        is_correct: bool,
        explanation: Option<String>,
        /// Canonical answer text, present only when the session is
        /// configured to reveal it and the answer was wrong
        correct_answer: Option<String>,
        continuation: ContinuationKind,
    },
    HideOverlay,
    StartTimer {
        token: TimerToken,
        delay_ms: u64,
        purpose: TimerPurpose,
    },
    CancelTimer {
        token: TimerToken,
    },
    ShowResults {
        summary: ResultsSummary,
        completion_message: Option<String>,
    },
    SubmitResults {
        payload: SubmissionPayload,
    },
}

// ==================== Phases ====================

/// Where the session currently is. `SlotActive` and `Resuming` are
/// transient; between events the machine rests in one of the other
/// four.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Playing,
    SlotActive { slot: usize },
    Presenting { slot: usize, question: QuestionId },
    Scored { slot: usize, question: QuestionId },
    Resuming,
    Completed,
}

// ==================== Session State ====================

/// The single owned mutable session state. Created at session init,
/// cleared on restart, discarded when the session ends. Mutated only
/// by [`QuizSession`]; everything else reads what it is handed.
#[derive(Clone, Debug, Default)]
pub struct QuizSessionState {
    pub current_slot_index: Option<usize>,
    pub question_cursor: usize,
    pub answered_question_ids: BTreeSet<QuestionId>,
    pub answers: AnswerLog,
}

impl QuizSessionState {
    fn clear(&mut self) {
        self.current_slot_index = None;
        self.question_cursor = 0;
        self.answered_question_ids.clear();
        self.answers.clear();
    }
}

// ==================== Session ====================

/// One active quiz playback
pub struct QuizSession {
    definition: QuizDefinition,
    bank: QuestionBank,
    settings: QuizSettings,
    renderer: QuestionRenderer,
    scheduler: TimeSlotScheduler,
    state: QuizSessionState,
    phase: SessionPhase,
    /// Slots that fired while another slot was still presenting
    pending_slots: VecDeque<usize>,
    armed_timer: Option<(TimerToken, TimerPurpose)>,
    next_token: TimerToken,
    draft: Option<RawAnswer>,
    presenting_error: bool,
}

impl QuizSession {
    pub fn new(
        definition: QuizDefinition,
        bank: QuestionBank,
        settings: QuizSettings,
        renderer_options: RendererOptions,
    ) -> Self {
        let scheduler = TimeSlotScheduler::new(&definition.time_slots);
        Self {
            definition,
            bank,
            settings,
            renderer: QuestionRenderer::new(renderer_options),
            scheduler,
            state: QuizSessionState::default(),
            phase: SessionPhase::Playing,
            pending_slots: VecDeque::new(),
            armed_timer: None,
            next_token: 0,
            draft: None,
            presenting_error: false,
        }
    }

    // ========== Accessors ==========

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.phase, SessionPhase::Completed)
    }

    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    pub fn definition(&self) -> &QuizDefinition {
        &self.definition
    }

    /// Read-only view of the session state
    pub fn session_state(&self) -> &QuizSessionState {
        &self.state
    }

    pub fn answers(&self) -> &AnswerLog {
        &self.state.answers
    }

    pub fn answered_question_ids(&self) -> &BTreeSet<QuestionId> {
        &self.state.answered_question_ids
    }

    /// Score so far, from the answers recorded up to now
    pub fn summary(&self) -> ResultsSummary {
        ResultsSummary::from_answers(&self.state.answers)
    }

    // ========== Playback events ==========

    /// Observed playback time, in seconds. Fires slot activations.
    pub fn on_time_update(&mut self, seconds: f64) -> Vec<Effect> {
        if !matches!(self.phase, SessionPhase::Playing) {
            return Vec::new();
        }
        let fired = self.scheduler.observe(seconds);
        if fired.is_empty() {
            return Vec::new();
        }
        self.pending_slots.extend(fired);
        let mut effects = Vec::new();
        self.activate_next_slot_or_resume(&mut effects);
        effects
    }

    /// The video reached its end: aggregate and submit
    pub fn on_video_ended(&mut self) -> Vec<Effect> {
        if matches!(self.phase, SessionPhase::Completed) {
            return Vec::new();
        }
        let mut effects = Vec::new();
        self.cancel_timer(&mut effects);
        self.phase = SessionPhase::Completed;

        let summary = ResultsSummary::from_answers(&self.state.answers);
        let payload = SubmissionPayload::from_answers(self.definition.quiz_id, &self.state.answers);
        effects.push(Effect::HideOverlay);
        effects.push(Effect::ShowResults {
            summary,
            completion_message: self.settings.completion_message.clone(),
        });
        effects.push(Effect::SubmitResults { payload });
        effects
    }

    // ========== Interaction events ==========

    /// The interaction surface reported a new raw answer state
    pub fn on_answer_changed(&mut self, raw: RawAnswer) -> Vec<Effect> {
        let question = match self.phase {
            SessionPhase::Presenting { question, .. } if !self.presenting_error => question,
            _ => return Vec::new(),
        };
        let enabled = match self.bank.get(question) {
            Some(q) => is_answer_complete(q, &raw),
            None => false,
        };
        self.draft = Some(raw);
        vec![Effect::SetSubmitEnabled { enabled }]
    }

    /// Submit the current draft answer. No-op unless the draft is
    /// complete; idempotent once the question has been scored.
    pub fn on_submit(&mut self) -> Vec<Effect> {
        let (slot, question_id) = match self.phase {
            SessionPhase::Presenting { slot, question } => (slot, question),
            _ => return Vec::new(),
        };
        if self.presenting_error || self.state.answered_question_ids.contains(&question_id) {
            return Vec::new();
        }
        let question = match self.bank.get(question_id) {
            Some(q) => q.clone(),
            None => return Vec::new(),
        };
        let raw = match &self.draft {
            Some(raw) if is_answer_complete(&question, raw) => raw.clone(),
            _ => return Vec::new(),
        };

        let is_correct = score(&question, &raw);
        self.state
            .answers
            .insert(question_id, AnswerRecord { raw, is_correct });
        self.state.answered_question_ids.insert(question_id);
        self.phase = SessionPhase::Scored { slot, question: question_id };
        self.draft = None;

        let continuation = if self
            .next_presentable(slot, self.state.question_cursor + 1)
            .is_some()
        {
            ContinuationKind::NextQuestion
        } else {
            ContinuationKind::ResumeVideo
        };

        let mut effects = vec![Effect::SetSubmitEnabled { enabled: false }];
        effects.push(Effect::ShowFeedback {
            question_id,
            is_correct,
            explanation: question.explanation.clone(),
            correct_answer: if !is_correct && self.settings.show_correct_answers {
                Some(correct_answer_text(&question))
            } else {
                None
            },
            continuation,
        });

        let (delay_ms, purpose) = match continuation {
            ContinuationKind::NextQuestion => (AUTO_ADVANCE_DELAY_MS, TimerPurpose::AdvanceQuestion),
            ContinuationKind::ResumeVideo => {
                // Incorrect answers get the shorter review window.
                let delay = if is_correct {
                    RESUME_DELAY_CORRECT_MS
                } else {
                    RESUME_DELAY_INCORRECT_MS
                };
                (delay, TimerPurpose::ResumeVideo)
            }
        };
        self.arm_timer(delay_ms, purpose, &mut effects);
        effects
    }

    /// Skip the presented question. Gated by configuration except on
    /// an inline error surface, which must always be escapable.
    pub fn on_skip(&mut self) -> Vec<Effect> {
        let question_id = match self.phase {
            SessionPhase::Presenting { question, .. } => question,
            _ => return Vec::new(),
        };
        if !self.settings.allow_skipping && !self.presenting_error {
            return Vec::new();
        }
        // Counts as answered for sequencing; no answer record, so the
        // question does not enter the score total.
        self.state.answered_question_ids.insert(question_id);
        log::debug!("question {} skipped", question_id);

        let mut effects = Vec::new();
        self.advance(&mut effects);
        effects
    }

    /// Explicit continue action on the feedback surface
    pub fn on_continue(&mut self) -> Vec<Effect> {
        if !matches!(self.phase, SessionPhase::Scored { .. }) {
            return Vec::new();
        }
        let mut effects = Vec::new();
        self.cancel_timer(&mut effects);
        self.advance(&mut effects);
        effects
    }

    /// Dismiss the overlay. Abandons the rest of the current slot and
    /// resumes playback (or presents the next already-fired slot).
    pub fn on_close(&mut self) -> Vec<Effect> {
        if !matches!(
            self.phase,
            SessionPhase::Presenting { .. } | SessionPhase::Scored { .. }
        ) {
            return Vec::new();
        }
        let mut effects = Vec::new();
        self.cancel_timer(&mut effects);
        self.activate_next_slot_or_resume(&mut effects);
        effects
    }

    /// A host timer fired. Stale tokens are ignored, so a timer that
    /// lost the race against a user action cannot transition twice.
    pub fn on_timer_fired(&mut self, token: TimerToken) -> Vec<Effect> {
        match self.armed_timer {
            Some((armed, _)) if armed == token => {}
            _ => return Vec::new(),
        }
        self.armed_timer = None;
        if !matches!(self.phase, SessionPhase::Scored { .. }) {
            return Vec::new();
        }
        let mut effects = Vec::new();
        self.advance(&mut effects);
        effects
    }

    /// Restart from scratch: clear all session state, re-arm every
    /// slot, seek to the beginning and play
    pub fn on_restart(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.cancel_timer(&mut effects);
        self.scheduler.reset();
        self.state.clear();
        self.pending_slots.clear();
        self.draft = None;
        self.presenting_error = false;
        self.phase = SessionPhase::Playing;

        effects.push(Effect::HideOverlay);
        effects.push(Effect::SeekToStart);
        effects.push(Effect::PlayVideo);
        effects
    }

    // ========== Sequencing ==========

    /// First presentable question at or after `from` in the slot's
    /// list: unanswered, present in the bank, with a known kind.
    /// Missing and unscorable questions are skipped, never fatal.
    fn next_presentable(&self, slot: usize, from: usize) -> Option<(usize, QuestionId)> {
        let ids = &self.definition.time_slots.get(slot)?.question_ids;
        for (cursor, &question_id) in ids.iter().enumerate().skip(from) {
            if self.state.answered_question_ids.contains(&question_id) {
                continue;
            }
            match self.bank.get(question_id) {
                None => {
                    log::warn!(
                        "slot {} references question {} missing from the bank; skipping",
                        slot,
                        question_id
                    );
                }
                Some(question) if !question.kind.is_known() => {
                    log::warn!("question {} has an unknown kind; skipping", question_id);
                }
                Some(_) => return Some((cursor, question_id)),
            }
        }
        None
    }

    fn present(&mut self, slot: usize, question_id: QuestionId, effects: &mut Vec<Effect>) {
        let question = match self.bank.get(question_id) {
            Some(q) => q.clone(),
            None => return,
        };
        self.draft = None;
        self.presenting_error = false;

        // Pause first; the overlay must never appear over a running video.
        effects.push(Effect::PauseVideo);
        match self.renderer.render(&question) {
            Ok(surface) => {
                effects.push(Effect::ShowQuestion {
                    question_id,
                    surface,
                    can_skip: self.settings.allow_skipping,
                });
                effects.push(Effect::SetSubmitEnabled { enabled: false });
            }
            Err(err) => {
                log::warn!("failed to render question {}: {}", question_id, err);
                self.presenting_error = true;
                effects.push(Effect::ShowInlineError {
                    question_id,
                    message: "This question could not be displayed.".to_string(),
                    can_skip: true,
                });
            }
        }
        self.phase = SessionPhase::Presenting { slot, question: question_id };
    }

    /// Move past the current question: next unanswered in the slot, or
    /// hand over to the next fired slot / playback
    fn advance(&mut self, effects: &mut Vec<Effect>) {
        let slot = match self.state.current_slot_index {
            Some(slot) => slot,
            None => {
                self.resume_playback(effects);
                return;
            }
        };
        match self.next_presentable(slot, self.state.question_cursor + 1) {
            Some((cursor, question_id)) => {
                self.state.question_cursor = cursor;
                self.present(slot, question_id, effects);
            }
            None => self.activate_next_slot_or_resume(effects),
        }
    }

    /// Begin the next fired-but-unserved slot, or resume playback when
    /// none remains. Slots whose questions are all answered resolve to
    /// resumption without an overlay.
    fn activate_next_slot_or_resume(&mut self, effects: &mut Vec<Effect>) {
        while let Some(slot) = self.pending_slots.pop_front() {
            self.phase = SessionPhase::SlotActive { slot };
            self.state.current_slot_index = Some(slot);
            self.state.question_cursor = 0;
            if let Some((cursor, question_id)) = self.next_presentable(slot, 0) {
                self.state.question_cursor = cursor;
                self.present(slot, question_id, effects);
                return;
            }
        }
        self.resume_playback(effects);
    }

    fn resume_playback(&mut self, effects: &mut Vec<Effect>) {
        self.phase = SessionPhase::Resuming;
        self.state.current_slot_index = None;
        self.state.question_cursor = 0;
        self.draft = None;
        self.presenting_error = false;
        effects.push(Effect::HideOverlay);
        effects.push(Effect::PlayVideo);
        self.phase = SessionPhase::Playing;
    }

    // ========== Timers ==========

    fn arm_timer(&mut self, delay_ms: u64, purpose: TimerPurpose, effects: &mut Vec<Effect>) {
        self.cancel_timer(effects);
        self.next_token += 1;
        let token = self.next_token;
        self.armed_timer = Some((token, purpose));
        effects.push(Effect::StartTimer { token, delay_ms, purpose });
    }

    fn cancel_timer(&mut self, effects: &mut Vec<Effect>) {
        if let Some((token, _)) = self.armed_timer.take() {
            effects.push(Effect::CancelTimer { token });
        }
    }
}

// ==================== Tests ====================
