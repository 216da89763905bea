#![deny(clippy::all)]

//! # vidquiz-engine - In-Video Quiz Playback Engine
//!
//! This crate provides the pure-Rust core of the interactive video
//! quiz player:
//!
//! - **Question Model & Validators** - nine question kinds with
//!   kind-specific completeness and scoring rules
//! - **Question Renderer** - DOM-agnostic interaction surfaces with
//!   randomized presentation order where the kind calls for it
//! - **Time-Slot Scheduler** - fires each playback-time slot exactly
//!   once as the observed time crosses its threshold
//! - **Quiz Session State Machine** - pauses playback, sequences the
//!   questions of the active slot, scores answers and resumes
//! - **Scoring & Results Aggregator** - final score, percentage and
//!   the flattened submission payload
//!
//! The engine is event-driven and single-threaded: hosts feed it
//! playback and interaction events and execute the [`Effect`] commands
//! each event returns. No platform bindings live here; see the
//! companion wasm crate for the browser surface.
//!
//! ## Module structure
//!
//! - [`types`] - shared ids, timing constants, quiz definition
//! - [`question`] - question model, canonical/raw answers, validators
//! - [`render`] - interaction surface construction and shuffling
//! - [`scheduler`] - threshold-crossing slot activation
//! - [`session`] - the session state machine and effect stream
//! - [`results`] - aggregation, submission payload, offline grading

pub mod question;
pub mod render;
pub mod results;
pub mod scheduler;
pub mod session;
pub mod types;

pub use question::{
    correct_answer_text, is_answer_complete, parse_canonical, score, try_score, AnswerFormatError,
    CanonicalAnswer, OrderedImage, Question, QuestionBank, QuestionKind, RawAnswer,
};
pub use render::{ChoiceOption, QuestionRenderer, QuestionSurface, RendererOptions};
pub use results::{grade_submission, GradedOutcome, QuestionResult, ResultsSummary, SubmissionPayload};
pub use scheduler::TimeSlotScheduler;
pub use session::{
    AnswerLog, AnswerRecord, ContinuationKind, Effect, QuizSession, SessionPhase, TimerPurpose,
    TimerToken,
};
pub use types::*;
