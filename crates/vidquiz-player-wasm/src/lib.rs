//! Browser bindings for the in-video quiz playback engine.
//!
//! The JS host owns the actual video element and the overlay DOM; it
//! forwards playback and interaction events to [`QuizPlayer`] and
//! executes the effect commands each call returns, in order.

mod player;

pub use player::*;
